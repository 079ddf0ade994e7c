//! Binding keys and the group query mini-grammar.
//!
//! Keys are plain strings. A key of the form `"group:label"` makes the
//! binding a member of `group`. Appending one of the reserved suffixes to a
//! group name turns the key into a query over the whole group:
//!
//! | key       | query                                  |
//! |-----------|----------------------------------------|
//! | `"g:*"`   | every value in `g`                     |
//! | `"g:#"`   | every `(label, value)` pair in `g`     |
//! | `"g:@"`   | the labels of `g`                      |
//!
//! # Examples
//! ```
//! use lambda_ioc_container::key::KeyQuery;
//!
//! assert_eq!(KeyQuery::parse("db"), KeyQuery::Plain("db"));
//! assert_eq!(KeyQuery::parse("handlers:*"), KeyQuery::GroupAll("handlers"));
//! assert_eq!(KeyQuery::parse("handlers:#"), KeyQuery::GroupLabelled("handlers"));
//! assert_eq!(KeyQuery::parse("handlers:@"), KeyQuery::GroupLabels("handlers"));
//! ```

use crate::error::{InvalidKeyError, InvalidKeyReason};

/// Separates a group name from a member label.
pub const GROUP_SEPARATOR: char = ':';

/// Suffix marker querying every value of a group.
pub const ALL_SUFFIX: char = '*';

/// Suffix marker querying `(label, value)` pairs of a group.
pub const LABELLED_SUFFIX: char = '#';

/// Suffix marker querying the labels of a group.
pub const LABELS_SUFFIX: char = '@';

/// A parsed resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyQuery<'a> {
    /// A single binding.
    Plain(&'a str),
    /// `prefix:*`
    GroupAll(&'a str),
    /// `prefix:#`
    GroupLabelled(&'a str),
    /// `prefix:@`
    GroupLabels(&'a str),
}

impl<'a> KeyQuery<'a> {
    /// Parses a requested key. Never fails: anything that is not a group
    /// query is looked up as a plain key.
    pub fn parse(key: &'a str) -> Self {
        let Some((prefix, marker)) = split_suffix(key) else {
            return KeyQuery::Plain(key);
        };

        match marker {
            ALL_SUFFIX => KeyQuery::GroupAll(prefix),
            LABELLED_SUFFIX => KeyQuery::GroupLabelled(prefix),
            LABELS_SUFFIX => KeyQuery::GroupLabels(prefix),
            _ => KeyQuery::Plain(key),
        }
    }

    /// Returns `true` for the three group queries.
    #[inline]
    pub fn is_group(&self) -> bool {
        !matches!(self, KeyQuery::Plain(_))
    }
}

/// Splits `"prefix:X"` into `("prefix", 'X')` when `X` is a single char.
fn split_suffix(key: &str) -> Option<(&str, char)> {
    let mut chars = key.chars();
    let marker = chars.next_back()?;
    let rest = chars.as_str();
    let prefix = rest.strip_suffix(GROUP_SEPARATOR)?;
    Some((prefix, marker))
}

/// Checks that `key` may be used to register a binding.
///
/// Rejected: the empty key, keys starting with `:` and keys ending in `:`
/// or in one of the reserved query suffixes.
///
/// ```
/// use lambda_ioc_container::key::validate_key;
///
/// assert!(validate_key("db").is_ok());
/// assert!(validate_key("handlers:auth").is_ok());
/// assert!(validate_key("handlers:*").is_err());
/// assert!(validate_key(":x").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), InvalidKeyError> {
    let reason = if key.is_empty() {
        Some(InvalidKeyReason::Empty)
    } else if key.starts_with(GROUP_SEPARATOR) {
        Some(InvalidKeyReason::LeadingSeparator)
    } else if key.ends_with(GROUP_SEPARATOR) || KeyQuery::parse(key).is_group() {
        Some(InvalidKeyReason::ReservedSuffix)
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidKeyError {
            key: key.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Returns the label of `key` within group `prefix`, if `key` is a member.
///
/// The key is split on its first separator; `"groupedStuff"` is not a member
/// of `"group"`, and neither is the bare `"group"` key.
///
/// ```
/// use lambda_ioc_container::key::group_label;
///
/// assert_eq!(group_label("g:a", "g"), Some("a"));
/// assert_eq!(group_label("g:a:b", "g"), Some("a:b"));
/// assert_eq!(group_label("g", "g"), None);
/// assert_eq!(group_label("gg:a", "g"), None);
/// ```
pub fn group_label<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    let (group, label) = key.split_once(GROUP_SEPARATOR)?;
    (group == prefix && !label.is_empty()).then_some(label)
}
