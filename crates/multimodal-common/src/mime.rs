//! MIME utilities for guessing media types by extension and matching allow-lists.
//!
//! The extension table covers the media kinds the part types deal with
//! (images, audio, video) plus the common document formats that end up in
//! binary parts. Lookups are case-insensitive.

use std::path::Path;

/// Extension to MIME type table. The first entry for a MIME type is its
/// preferred extension.
const MIME_TYPES: &[(&str, &str)] = &[
    // Images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/vnd.microsoft.icon"),
    ("avif", "image/avif"),
    ("svg", "image/svg+xml"),
    // Audio
    ("wav", "audio/wav"),
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/opus"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("aiff", "audio/aiff"),
    ("aif", "audio/aiff"),
    ("weba", "audio/webm"),
    // Video
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("ts", "video/mp2t"),
    // Documents and data
    ("pdf", "application/pdf"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("xml", "application/xml"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

/// MIME types whose aliases should resolve to the same extensions.
const MIME_ALIASES: &[(&str, &str)] = &[
    ("audio/x-wav", "audio/wav"),
    ("audio/wave", "audio/wav"),
    ("audio/vnd.wave", "audio/wav"),
    ("audio/mp3", "audio/mpeg"),
    ("audio/x-flac", "audio/flac"),
    ("image/jpg", "image/jpeg"),
];

/// Guess a MIME type from a file extension (without the leading dot).
///
/// # Examples
///
/// ```
/// use multimodal_common::mime::guess_from_extension;
///
/// assert_eq!(guess_from_extension("PNG"), Some("image/png"));
/// assert_eq!(guess_from_extension("unknown"), None);
/// ```
pub fn guess_from_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim_start_matches('.').to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Guess a MIME type from a path's extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use multimodal_common::mime::guess_from_path;
///
/// assert_eq!(guess_from_path(Path::new("/tmp/doc.pdf")), Some("application/pdf"));
/// assert_eq!(guess_from_path(Path::new("README")), None);
/// ```
pub fn guess_from_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(guess_from_extension)
}

/// Guess a MIME type from the path component of a URL.
///
/// Query strings and fragments are ignored, so
/// `https://host/a.png?size=large` resolves to `image/png`.
pub fn guess_from_url(url: &str) -> Option<&'static str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    let after_scheme = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    // Host-only URLs have no path to guess from.
    let (_, path) = after_scheme.split_once('/')?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    guess_from_extension(ext)
}

/// All known extensions for a MIME type, preferred extension first.
///
/// # Examples
///
/// ```
/// use multimodal_common::mime::extensions_for;
///
/// assert_eq!(extensions_for("image/jpeg"), vec!["jpg", "jpeg", "jpe"]);
/// assert_eq!(extensions_for("audio/x-wav"), vec!["wav"]);
/// ```
pub fn extensions_for(mime: &str) -> Vec<&'static str> {
    let mime = essence(mime);
    let canonical = MIME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == mime)
        .map(|(_, target)| *target)
        .unwrap_or(mime.as_str());
    MIME_TYPES
        .iter()
        .filter(|(_, m)| *m == canonical)
        .map(|(ext, _)| *ext)
        .collect()
}

/// Strip parameters from a content type and lowercase it.
///
/// `"Text/HTML; charset=utf-8"` becomes `"text/html"`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Check that a string is a syntactically valid `type/subtype` MIME type.
///
/// Parameters after `;` are allowed.
pub fn is_valid(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    let token_ok = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+*".contains(c))
    };
    token_ok(kind) && token_ok(subtype)
}

/// Match a MIME type against a shell-style glob (`*` and `?` wildcards).
///
/// # Examples
///
/// ```
/// use multimodal_common::mime::mime_matches;
///
/// assert!(mime_matches("image/*", "image/png"));
/// assert!(mime_matches("*", "application/pdf"));
/// assert!(!mime_matches("audio/*", "video/mp4"));
/// ```
pub fn mime_matches(pattern: &str, mime: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = mime.to_lowercase().chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_t = 0usize;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_t = t;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Check a MIME type against a list of glob patterns.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], mime: &str) -> bool {
    patterns.iter().any(|p| mime_matches(p.as_ref(), mime))
}
