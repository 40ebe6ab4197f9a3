//! Filename and vault-path helpers.
//!
//! OCR image identifiers and source file names are arbitrary strings. Before
//! they become part of an output path they are reduced to a fragment that is
//! safe on every common filesystem and inside a wiki-style `![[...]]` embed.
//!
//! Vault paths are `/`-separated, relative to the storage root, with no
//! leading or trailing separator. An empty string is the root itself.

/// Characters replaced by `_`: path separators, characters reserved on
/// Windows, and the characters that terminate or re-target a wiki link.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Map an arbitrary identifier into a filesystem-safe fragment.
///
/// - reserved punctuation and control characters become `_`
/// - runs of whitespace collapse to a single space
/// - leading/trailing whitespace and trailing dots are removed
///
/// The result may be empty; callers supply their own fallback.
pub fn sanitize_fragment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_space = false;

    for c in input.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if c.is_control() || RESERVED.contains(&c) {
            out.push('_');
        } else {
            out.push(c);
        }
    }

    out.trim()
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Sanitised document base name, never empty.
pub fn document_base_name(input: &str) -> String {
    let s = sanitize_fragment(strip_extension(input));
    if s.is_empty() {
        "document".to_string()
    } else {
        s
    }
}

/// Fallback identifier for an image with a blank or clashing id.
pub fn fallback_image_id(page_index: i64, position: usize) -> String {
    format!("img-{page_index}-{position}")
}

/// Drop a trailing `.ext` (1–5 alphanumeric characters) from a name.
///
/// Only the final path component is considered, and a leading dot
/// (`.hidden`) is not treated as an extension separator.
pub fn strip_extension(name: &str) -> &str {
    match split_extension(name) {
        Some((stem, _)) => stem,
        None => name,
    }
}

/// The lowercase trailing extension of a name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    split_extension(name).map(|(_, ext)| ext.to_ascii_lowercase())
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    let name = name.trim_end();
    let file_start = name.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let dot = name.rfind('.')?;
    if dot <= file_start {
        return None;
    }
    let ext = &name[dot + 1..];
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((&name[..dot], ext))
}

/// Normalise a vault path: unify separators, drop empty and `.` segments.
pub fn normalize_path(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a folder and a name into a normalised vault path.
/// An empty folder means the storage root.
pub fn join_path(folder: &str, name: &str) -> String {
    let folder = normalize_path(folder);
    let name = normalize_path(name);
    match (folder.is_empty(), name.is_empty()) {
        (true, _) => name,
        (false, true) => folder,
        (false, false) => format!("{folder}/{name}"),
    }
}

/// The final component of a vault or filesystem path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_reserved() {
        assert_eq!(sanitize_fragment("File/Name:Test"), "File_Name_Test");
        assert_eq!(sanitize_fragment(r#"a\b*c?d"e<f>g|h"#), "a_b_c_d_e_f_g_h");
        assert_eq!(sanitize_fragment("fig[1]#2^x"), "fig_1__2_x");
    }

    #[test]
    fn test_sanitize_control_chars() {
        assert_eq!(sanitize_fragment("a\u{0000}b\u{001F}c"), "a_b_c");
    }

    #[test]
    fn test_sanitize_whitespace_and_trailing_dots() {
        assert_eq!(sanitize_fragment("  My:Doc / v2.. "), "My_Doc _ v2");
        assert_eq!(sanitize_fragment("a \t\n b"), "a b");
        assert_eq!(sanitize_fragment("report. . ."), "report");
    }

    #[test]
    fn test_sanitize_can_be_empty() {
        assert_eq!(sanitize_fragment("   "), "");
        assert_eq!(sanitize_fragment("..."), "");
    }

    #[test]
    fn test_document_base_name() {
        assert_eq!(document_base_name("Annual Report.pdf"), "Annual Report");
        assert_eq!(document_base_name("a:b.PDF"), "a_b");
        assert_eq!(document_base_name(" .pdf"), "document");
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(strip_extension("img-0.jpeg"), "img-0");
        assert_eq!(extension_of("img-0.JPEG").as_deref(), Some("jpeg"));
        assert_eq!(strip_extension("img-0"), "img-0");
        assert_eq!(extension_of("img-0"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("dir.v2/file"), None);
        assert_eq!(extension_of("x.not an ext"), None);
    }

    #[test]
    fn test_fallback_image_id() {
        assert_eq!(fallback_image_id(3, 0), "img-3-0");
        assert_eq!(fallback_image_id(-1, 2), "img--1-2");
    }

    #[test]
    fn test_join_and_normalize() {
        assert_eq!(join_path("", "a.md"), "a.md");
        assert_eq!(join_path("notes/", "a.md"), "notes/a.md");
        assert_eq!(join_path("/notes//sub/", "a.md"), "notes/sub/a.md");
        assert_eq!(join_path(r"notes\sub", "./x"), "notes/sub/x");
        assert_eq!(join_path("notes", ""), "notes");
        assert_eq!(normalize_path("/"), "");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("a/b/c.pdf"), "c.pdf");
        assert_eq!(file_name(r"C:\docs\scan.pdf"), "scan.pdf");
        assert_eq!(file_name("c.pdf"), "c.pdf");
    }
}
