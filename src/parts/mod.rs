//! Message part types.
//!
//! Every media part can be built from a file, raw bytes, base64, a data URI
//! or a URL, and converts to and from a JSON-safe saved form (see [`wire`]).
//! [`MessagePart`] is the polymorphic envelope handed to a host message
//! framework.

pub mod audio;
pub mod binary;
pub mod image;
pub mod text;
pub mod video;
pub mod wire;

pub use audio::AudioPart;
pub use binary::{BinaryPart, ReadSeek};
pub use image::ImagePart;
pub use text::TextPart;
pub use video::VideoPart;
pub use wire::DataPart;

use multimodal_common::Extra;
use serde::{Deserialize, Serialize};

/// Any part of a message, tagged by `type` when serialized.
///
/// ```
/// use multimodal::parts::{MessagePart, TextPart};
///
/// let part = MessagePart::Text(TextPart::new("hi"));
/// let json = serde_json::to_string(&part)?;
/// assert_eq!(json, r#"{"type":"text","text":"hi"}"#);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text(TextPart),
    Binary(BinaryPart),
    Audio(AudioPart),
    Image(ImagePart),
    Video(VideoPart),
}

impl MessagePart {
    /// The `type` tag of this part.
    pub fn kind(&self) -> &'static str {
        match self {
            MessagePart::Text(_) => "text",
            MessagePart::Binary(_) => "binary",
            MessagePart::Audio(_) => "audio",
            MessagePart::Image(_) => "image",
            MessagePart::Video(_) => "video",
        }
    }

    pub fn extra(&self) -> &Extra {
        match self {
            MessagePart::Text(p) => &p.extra,
            MessagePart::Binary(p) => &p.extra,
            MessagePart::Audio(p) => &p.extra,
            MessagePart::Image(p) => &p.extra,
            MessagePart::Video(p) => p.extra(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text(p) => Some(&p.text),
            _ => None,
        }
    }
}

impl From<TextPart> for MessagePart {
    fn from(part: TextPart) -> Self {
        MessagePart::Text(part)
    }
}

impl From<BinaryPart> for MessagePart {
    fn from(part: BinaryPart) -> Self {
        MessagePart::Binary(part)
    }
}

impl From<AudioPart> for MessagePart {
    fn from(part: AudioPart) -> Self {
        MessagePart::Audio(part)
    }
}

impl From<ImagePart> for MessagePart {
    fn from(part: ImagePart) -> Self {
        MessagePart::Image(part)
    }
}

impl From<VideoPart> for MessagePart {
    fn from(part: VideoPart) -> Self {
        MessagePart::Video(part)
    }
}
