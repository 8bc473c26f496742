//! Best-effort conversion of free text into message parts.
//!
//! `@path`, `@"quoted path"` and `@https://url` references become image,
//! audio or video parts. A reference that cannot be resolved is logged and
//! kept as literal text, so one bad reference never fails the whole query.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use multimodal_av::{Capabilities, DecodeHints};
use multimodal_common::{mime, Error, Result};
use regex::Regex;

use crate::fetch::Downloader;
use crate::parts::{AudioPart, ImagePart, MessagePart, TextPart, VideoPart};

/// What an `@` reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Path(PathBuf),
    Url(String),
}

/// One `@` reference found in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Byte range of the whole reference, `@` included.
    pub span: Range<usize>,
    pub target: Target,
}

fn reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"@(?:"([^"]+)"|(https?://\S*[^\s`!()\[\]{};:'".,<>?])|(\S+))"#).ok())
        .as_ref()
}

/// Find every `@` reference that starts a word. `user@host` is not one.
///
/// URLs never end in sentence punctuation or a closing bracket; those stay
/// in the surrounding text.
pub fn find_references(query: &str) -> Vec<Reference> {
    let Some(pattern) = reference_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(query)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let starts_word = query[..whole.start()]
                .chars()
                .next_back()
                .map_or(true, char::is_whitespace);
            if !starts_word {
                return None;
            }
            let target = if let Some(quoted) = caps.get(1) {
                Target::Path(PathBuf::from(quoted.as_str()))
            } else if let Some(url) = caps.get(2) {
                Target::Url(url.as_str().to_string())
            } else {
                Target::Path(PathBuf::from(caps.get(3)?.as_str()))
            };
            Some(Reference {
                span: whole.range(),
                target,
            })
        })
        .collect()
}

/// Split `query` into text and media parts.
///
/// Text between references is kept verbatim. Segments that are empty or
/// whitespace-only are dropped.
pub async fn parts_from_query(
    query: &str,
    downloader: &dyn Downloader,
    capabilities: &Capabilities,
) -> Vec<MessagePart> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut cursor = 0;

    for reference in find_references(query) {
        text.push_str(&query[cursor..reference.span.start]);
        cursor = reference.span.end;

        let resolved = match &reference.target {
            Target::Path(path) => part_from_path(path, capabilities),
            Target::Url(url) => part_from_url(url, downloader, capabilities).await,
        };
        match resolved {
            Ok(part) => {
                flush_text(&mut parts, &mut text);
                parts.push(part);
            }
            Err(e) => {
                let literal = &query[reference.span.clone()];
                tracing::warn!("Keeping {} as text: {}", literal, e);
                text.push_str(literal);
            }
        }
    }

    text.push_str(&query[cursor..]);
    flush_text(&mut parts, &mut text);
    parts
}

fn flush_text(parts: &mut Vec<MessagePart>, text: &mut String) {
    let segment = std::mem::take(text);
    if !segment.trim().is_empty() {
        parts.push(TextPart::new(segment).into());
    }
}

fn unsupported(mime: &str) -> Error {
    Error::media_format(
        mime,
        &["image/*".to_string(), "audio/*".to_string(), "video/*".to_string()],
    )
}

fn part_from_path(path: &Path, capabilities: &Capabilities) -> Result<MessagePart> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = Path::new(&expanded);
    if !path.is_file() {
        return Err(Error::invalid_input(format!(
            "{} is not a file",
            path.display()
        )));
    }
    let mime = mime::guess_from_path(path).ok_or_else(|| {
        Error::configuration(format!(
            "The file type of {} could not be determined",
            path.display()
        ))
    })?;

    match mime.split('/').next() {
        Some("image") => Ok(ImagePart::from_file(path)?.into()),
        Some("audio") => Ok(AudioPart::from_file(path, &DecodeHints::default(), capabilities)?.into()),
        Some("video") => Ok(VideoPart::from_file(path, Some(mime))?
            .with_capabilities(capabilities.clone())
            .into()),
        _ => Err(unsupported(mime)),
    }
}

async fn part_from_url(
    url: &str,
    downloader: &dyn Downloader,
    capabilities: &Capabilities,
) -> Result<MessagePart> {
    let mime = downloader.probe_mime(url).await?;
    tracing::debug!("Resolved {} to {}", url, mime);

    match mime.split('/').next() {
        Some("image") => Ok(ImagePart::from_url(downloader, url, None).await?.into()),
        Some("audio") => Ok(AudioPart::from_url(
            downloader,
            url,
            None,
            &DecodeHints::default(),
            capabilities,
        )
        .await?
        .into()),
        Some("video") => Ok(VideoPart::from_url(downloader, url, None)
            .await?
            .with_capabilities(capabilities.clone())
            .into()),
        _ => Err(unsupported(&mime)),
    }
}
