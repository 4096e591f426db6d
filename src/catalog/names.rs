/// Words sites put in front of channel names
const LEADING_FILLER: &[&str] = &["ver", "canal", "watch", "channel"];

/// Phrases sites append to channel names, as lowercase word sequences
const TRAILING_FILLER: &[&[&str]] = &[
    &["en", "vivo"],
    &["live"],
    &["hd"],
    &["gratis"],
    &["online"],
    &["free"],
];

/// Separators left dangling once filler is removed
const SEPARATORS: &[char] = &['-', '|', ':'];

/// Words always written in capitals
const ACRONYMS: &[&str] = &[
    "ESPN", "CNN", "MTV", "HBO", "TNT", "FX", "TV", "HD", "JR", "TUDN", "BBC", "NBC", "ABC",
    "CBS", "AXN", "TYC", "DW", "ECDF", "CHV", "TLC", "AMC", "USA", "TVE", "RCN", "TVN", "ATV",
];

/// Normalizes a listed channel name into its canonical form
///
/// # Normalization Steps
///
/// 1. Split on whitespace (which also trims and collapses it)
/// 2. Repeatedly strip leading filler words (`ver`, `canal`, `watch`, `channel`) and separators
/// 3. Repeatedly strip trailing filler (`en vivo`, `live`, `hd`, `gratis`, `online`, `free`)
///    and dangling separators (`-`, `|`, `:`)
/// 4. Title-case every word and capitalize known acronyms
///
/// If stripping leaves nothing, the title-cased input is used instead.
///
/// # Examples
///
/// ```
/// use stream_harvest::catalog::normalize_name;
///
/// assert_eq!(normalize_name("Ver ESPN 2 En Vivo HD"), "ESPN 2");
/// assert_eq!(normalize_name("  canal   tyc sports | live "), "TYC Sports");
/// assert_eq!(normalize_name("Live"), "Live");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let original: Vec<&str> = raw.split_whitespace().collect();
    let mut words: Vec<&str> = original.clone();

    // Step 2: Leading filler and separators
    loop {
        match words.first() {
            Some(first) if is_separator(first) || is_leading_filler(first) => {
                words.remove(0);
            }
            _ => break,
        }
    }

    // Step 3: Trailing filler and separators
    loop {
        let Some(last) = words.last().copied() else {
            break;
        };

        let trimmed = last.trim_end_matches(SEPARATORS);
        if trimmed.is_empty() {
            words.pop();
            continue;
        }
        if trimmed.len() != last.len() {
            let index = words.len() - 1;
            words[index] = trimmed;
            continue;
        }

        if let Some(len) = trailing_filler_len(&words) {
            words.truncate(words.len() - len);
            continue;
        }

        break;
    }

    if words.is_empty() {
        words = original;
    }

    words
        .iter()
        .map(|word| title_case_word(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the grouping key of a canonical name (lowercase, whitespace removed)
pub fn name_key(canonical: &str) -> String {
    canonical
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_separator(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| SEPARATORS.contains(&c))
}

fn is_leading_filler(word: &str) -> bool {
    let lower = word.to_lowercase();
    LEADING_FILLER.contains(&lower.as_str())
}

/// Returns the number of words of the filler phrase ending the list, if any
fn trailing_filler_len(words: &[&str]) -> Option<usize> {
    TRAILING_FILLER.iter().find_map(|phrase| {
        if phrase.len() > words.len() {
            return None;
        }

        let tail = &words[words.len() - phrase.len()..];
        let matches = tail
            .iter()
            .zip(phrase.iter())
            .all(|(word, filler)| word.to_lowercase() == *filler);

        matches.then_some(phrase.len())
    })
}

fn title_case_word(word: &str) -> String {
    let upper = word.to_uppercase();
    if ACRONYMS.contains(&upper.as_str()) {
        return upper;
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
