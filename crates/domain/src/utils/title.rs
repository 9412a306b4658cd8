//! Pure string utility functions for title extraction and manipulation

use crate::constants::{MAX_TITLE_LENGTH, TITLE_TRUNCATE_SUFFIX};

/// Truncate a title to the maximum length.
///
/// Counts characters rather than bytes so Polish diacritics never split.
///
/// ```
/// use kiddo_domain::utils::title::truncate_title;
///
/// assert_eq!(truncate_title("Zebranie z rodzicami"), "Zebranie z rodzicami");
///
/// let long = "ż".repeat(300);
/// assert_eq!(truncate_title(&long).chars().count(), 120);
/// ```
#[must_use]
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_LENGTH {
        return title.to_string();
    }

    let keep = MAX_TITLE_LENGTH - TITLE_TRUNCATE_SUFFIX.chars().count();
    let mut truncated: String = title.chars().take(keep).collect();
    truncated.push_str(TITLE_TRUNCATE_SUFFIX);
    truncated
}

/// First non-empty line of a block of text, trimmed.
#[must_use]
pub fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Strip reply/forward prefixes ("Re:", "Fwd:", "Odp:", "PD:") from a mail
/// subject.
#[must_use]
pub fn clean_subject(subject: &str) -> &str {
    const PREFIXES: [&str; 5] = ["re:", "fwd:", "fw:", "odp:", "pd:"];

    let mut current = subject.trim();
    loop {
        let lower = current.to_lowercase();
        match PREFIXES.iter().find(|prefix| lower.starts_with(*prefix)) {
            Some(prefix) => current = current[prefix.len()..].trim_start(),
            None => return current,
        }
    }
}
