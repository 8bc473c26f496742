//! Multimodal - typed media parts for chat messages
//!
//! Audio, image, video and opaque binary parts that can be built from files,
//! bytes, base64 or URLs and round-trip through a JSON-safe saved form.

pub mod config;
pub mod fetch;
pub mod ingest;
pub mod parts;
pub mod pcm;

pub use multimodal_av::{Capabilities, DecodeHints};
pub use multimodal_common::{Error, Extra, Resolution, Result};
pub use parts::{AudioPart, BinaryPart, DataPart, ImagePart, MessagePart, TextPart, VideoPart};
