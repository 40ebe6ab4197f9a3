//! Inline image marker rewriting.
//!
//! OCR page text references figures with standard Markdown image syntax,
//! `![alt](target)`, where `target` contains the image id, sometimes with a
//! provider-specific prefix or suffix. Once an image has been written, every
//! marker for it is replaced by a wiki-style embed of the stored file,
//! `![[path]]`. If the image could not be resolved or written, the marker is
//! removed so the document never points at data that does not exist.

use regex::{NoExpand, Regex};
use std::borrow::Cow;
use tracing::warn;

/// Build the wiki-style embed for a stored file.
pub fn embed_marker(path: &str) -> String {
    format!("![[{path}]]")
}

/// Replace or remove every image marker whose target contains `identifier`.
///
/// A marker matches when its alt text contains no `]` and its parenthesised
/// target contains `identifier` as a literal substring. Regex metacharacters
/// in the identifier are escaped.
///
/// - `Some(replacement)` substitutes the whole marker with `replacement`
///   verbatim (no `$` expansion).
/// - `None` deletes the marker.
///
/// A blank identifier matches nothing and the text is returned unchanged.
pub fn rewrite_or_remove_marker<'a>(
    text: &'a str,
    identifier: &str,
    replacement: Option<&str>,
) -> Cow<'a, str> {
    if identifier.trim().is_empty() {
        return Cow::Borrowed(text);
    }

    let pattern = format!(r"!\[[^\]]*\]\([^)]*{}[^)]*\)", regex::escape(identifier));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(identifier, "Could not build marker pattern: {}", e);
            return Cow::Borrowed(text);
        }
    };

    re.replace_all(text, NoExpand(replacement.unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_marker_with_embed() {
        let text = "Intro\n\n![p](img-0.jpeg)\n\nOutro";
        let out = rewrite_or_remove_marker(text, "img-0.jpeg", Some("![[imgs/doc_img-0.png]]"));
        assert_eq!(out, "Intro\n\n![[imgs/doc_img-0.png]]\n\nOutro");
    }

    #[test]
    fn test_matches_identifier_as_substring_of_target() {
        let text = "see ![fig](./media/img-0.jpeg?raw=1) here";
        let out = rewrite_or_remove_marker(text, "img-0.jpeg", Some("X"));
        assert_eq!(out, "see X here");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let text = "![a](img-1.png) and ![b](img-1.png)";
        let out = rewrite_or_remove_marker(text, "img-1.png", Some("E"));
        assert_eq!(out, "E and E");
    }

    #[test]
    fn test_removal_leaves_surrounding_text() {
        let text = "before ![x](img-2.png) after";
        assert_eq!(rewrite_or_remove_marker(text, "img-2.png", None), "before  after");
    }

    #[test]
    fn test_other_markers_untouched() {
        let text = "![a](img-1.png) ![b](img-10.png) [link](img-1.png)";
        let out = rewrite_or_remove_marker(text, "img-10.png", None);
        assert_eq!(out, "![a](img-1.png)  [link](img-1.png)");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let text = "![a](a+b(1).png) ![b](aab1.png) ![c](x.*y)";
        // `.` must not match arbitrary characters
        let out = rewrite_or_remove_marker(text, "a.b", None);
        assert_eq!(out, text);
        let out = rewrite_or_remove_marker(text, "x.*y", Some("S"));
        assert_eq!(out, "![a](a+b(1).png) ![b](aab1.png) S");
        let out = rewrite_or_remove_marker("![q]([img]^$|?.png)", "[img]^$|?", Some("Z"));
        assert_eq!(out, "Z");
    }

    #[test]
    fn test_replacement_is_not_expanded() {
        let out = rewrite_or_remove_marker("![a](img.png)", "img.png", Some("![[$0 ${1}]]"));
        assert_eq!(out, "![[$0 ${1}]]");
    }

    #[test]
    fn test_blank_identifier_is_noop() {
        let text = "![a](img-0.png)";
        assert!(matches!(rewrite_or_remove_marker(text, "  ", None), Cow::Borrowed(_)));
        assert_eq!(rewrite_or_remove_marker(text, "", Some("X")), text);
    }

    #[test]
    fn test_no_match_borrows() {
        let text = "plain text";
        assert!(matches!(
            rewrite_or_remove_marker(text, "img-0.png", None),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_embed_marker() {
        assert_eq!(embed_marker("a/b.png"), "![[a/b.png]]");
    }
}
