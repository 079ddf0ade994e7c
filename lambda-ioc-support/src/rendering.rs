//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format dependency chains, type names,
//! and suggestions for keys that were probably mistyped.

/// Renders a dependency chain as a readable string.
///
/// # Examples
/// ```
/// use lambda_ioc_support::rendering::render_chain;
///
/// let chain = vec!["service", "repo", "db", "service"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "service → repo → db → service");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a list of keys as a quoted, comma separated list.
///
/// ```
/// use lambda_ioc_support::rendering::render_key_list;
///
/// assert_eq!(render_key_list(&["a", "g:b"]), r#""a", "g:b""#);
/// ```
pub fn render_key_list(keys: &[impl AsRef<str>]) -> String {
    keys.iter()
        .map(|k| format!("{:?}", k.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use lambda_ioc_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Quick check whether two strings are "close enough" to be a typo of
/// each other: lengths within 3 and at least 60% positional matches.
///
/// Not a full Levenshtein.
pub fn is_near_miss(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    if a_len.abs_diff(b_len) > 3 {
        return false;
    }

    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return true;
    }

    let common = a
        .chars()
        .zip(b.chars())
        .filter(|(ca, cb)| ca == cb)
        .count();

    common * 100 / max_len >= 60
}

/// Generates "did you mean?" suggestions for a requested key.
///
/// Candidates are scored by substring containment, shared prefix and
/// near-miss spelling; the best `max_suggestions` are returned, ties in
/// the order they appear in `available`.
///
/// ```
/// use lambda_ioc_support::rendering::suggest_similar;
///
/// let suggestions = suggest_similar("databse", &["database", "logger"], 3);
/// assert_eq!(suggestions, vec!["database".to_string()]);
/// ```
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            if name_lower == requested_lower {
                return None;
            }

            if !requested_lower.is_empty()
                && (name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower))
            {
                return Some((name, 100));
            }

            if is_near_miss(&requested_lower, &name_lower) {
                return Some((name, 90));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    // stable: equal scores keep registration order
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
