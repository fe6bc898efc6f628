//! Name normalization shared by the action resolver, the registry and delegation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator between namespace segments of a controller path.
pub const NS_SEPARATOR: &str = "::";

/// Prefix prepended to a normalized action name to form its handler member name.
pub const ACTION_PREFIX: &str = "action";

static WORD_BREAK: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[^A-Za-z0-9]+").unwrap()
});

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap()
});

/// Convert `show-post`, `show_post` or `show post` into `ShowPost`.
///
/// Only the first letter of each word is touched, so `showPost` becomes `ShowPost`.
#[must_use]
pub fn camelize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in WORD_BREAK.split(raw).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Handler member name for a normalized action name: `Index` -> `actionIndex`.
#[must_use]
pub fn action_method_name(action: &str) -> String {
    format!("{ACTION_PREFIX}{action}")
}

/// Whether a URL segment reads as a number (`12573`, `-4`, `1.5e3`).
#[must_use]
pub fn is_numeric(s: &str) -> bool {
    NUMERIC.is_match(s)
}

/// Namespace with its last segment removed: `app::www::controller` -> `app::www`.
#[must_use]
pub fn parent_namespace(namespace: &str) -> &str {
    match namespace.rfind(NS_SEPARATOR) {
        Some(idx) => &namespace[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camelize_variants() {
        assert_eq!(camelize("index"), "Index");
        assert_eq!(camelize("show-post"), "ShowPost");
        assert_eq!(camelize("show_post"), "ShowPost");
        assert_eq!(camelize("showPost"), "ShowPost");
        assert_eq!(camelize("  edit  me "), "EditMe");
        assert_eq!(camelize(""), "");
    }

    #[test]
    fn test_action_method_name() {
        assert_eq!(action_method_name("Index"), "actionIndex");
    }

    #[test]
    fn test_is_numeric() {
        assert!(is_numeric("12573"));
        assert!(is_numeric("-4"));
        assert!(is_numeric("1.5e3"));
        assert!(!is_numeric("Where-Have-You-Been"));
        assert!(!is_numeric(""));
    }

    #[test]
    fn test_parent_namespace() {
        assert_eq!(parent_namespace("app::www::controller"), "app::www");
        assert_eq!(parent_namespace("app"), "");
    }
}
