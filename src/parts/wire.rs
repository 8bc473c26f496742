//! JSON-safe representation of every part type.
//!
//! Each type has one canonical saved shape:
//!
//! | Part | Shape |
//! |---|---|
//! | binary, video | `{"mime": .., "compression": "gzip", "data": base64(zlib(bytes))}` |
//! | audio | `{"wav_data": "data:audio/wav;base64,.."}` |
//! | image | `{"img_data": "data:image/png;base64,.."}` |
//!
//! Loading checks for the canonical shape first and then falls back to the
//! plain field forms a caller might write by hand (a bare data URI, an
//! uncompressed `{"mime", "data"}` object, raw PCM). Loading never touches
//! the filesystem; a local file becomes a part only through `from_file`.
//! A non-empty `extra` map is written next to the payload and restored on
//! load.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use multimodal_common::{data_uri, Error, Extra, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{AudioPart, BinaryPart, ImagePart, TextPart, VideoPart};

/// Value of the `compression` key. The payload is actually a zlib stream;
/// the name is kept for compatibility with existing saved data.
pub const COMPRESSION_TAG: &str = "gzip";

/// Conversion to and from the JSON-safe saved form.
pub trait DataPart: Sized {
    fn to_json(&self) -> Result<Value>;
    fn from_json(value: Value) -> Result<Self>;
}

/// zlib-compress `data` at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate a zlib stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::encoding(format!("invalid zlib data: {e}")))?;
    Ok(out)
}

fn object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::format(format!(
            "expected a {what} object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn take_str(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::format(format!(
            "{key:?} must be a string, got {}",
            json_kind(&other)
        ))),
    }
}

fn take_extra(map: &mut Map<String, Value>) -> Result<Extra> {
    match map.remove("extra") {
        None | Some(Value::Null) => Ok(Extra::new()),
        Some(Value::Object(extra)) => Ok(extra),
        Some(other) => Err(Error::format(format!(
            "\"extra\" must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn with_extra(mut map: Map<String, Value>, extra: &Extra) -> Value {
    if !extra.is_empty() {
        map.insert("extra".into(), Value::Object(extra.clone()));
    }
    Value::Object(map)
}

fn binary_to_json(part: &BinaryPart) -> Result<Value> {
    let bytes = part.as_bytes()?;
    let compressed = compress(&bytes)?;
    tracing::trace!(
        "Compressed {} bytes of {} to {}",
        bytes.len(),
        part.mime(),
        compressed.len()
    );

    let mut map = Map::new();
    map.insert("mime".into(), Value::String(part.mime().to_string()));
    map.insert("compression".into(), Value::String(COMPRESSION_TAG.into()));
    map.insert("data".into(), Value::String(data_uri::encode_b64(&compressed)));
    Ok(with_extra(map, &part.extra))
}

fn binary_from_json(value: Value) -> Result<BinaryPart> {
    let mut map = match value {
        Value::String(uri) => return BinaryPart::from_b64_uri(&uri),
        other => object(other, "binary part")?,
    };
    let extra = take_extra(&mut map)?;

    let part = if let Some(data) = take_str(&mut map, "data")? {
        let mime = take_str(&mut map, "mime")?
            .ok_or_else(|| Error::format("saved binary data has no \"mime\""))?;
        let bytes = match take_str(&mut map, "compression")?.as_deref() {
            None => data_uri::decode_b64(&data)?,
            Some(COMPRESSION_TAG) => decompress(&data_uri::decode_b64(&data)?)?,
            Some(other) => {
                return Err(Error::format(format!("unsupported compression {other:?}")))
            }
        };
        BinaryPart::from_bytes(bytes, &mime)?
    } else {
        return Err(Error::format("binary part needs \"data\""));
    };
    Ok(part.with_extra(extra))
}

impl DataPart for BinaryPart {
    fn to_json(&self) -> Result<Value> {
        binary_to_json(self)
    }

    fn from_json(value: Value) -> Result<Self> {
        binary_from_json(value)
    }
}

impl DataPart for VideoPart {
    fn to_json(&self) -> Result<Value> {
        binary_to_json(self.binary())
    }

    fn from_json(value: Value) -> Result<Self> {
        binary_from_json(value).map(VideoPart::from)
    }
}

impl DataPart for AudioPart {
    fn to_json(&self) -> Result<Value> {
        let mut map = Map::new();
        map.insert("wav_data".into(), Value::String(self.as_wav_b64_uri()?));
        Ok(with_extra(map, &self.extra))
    }

    fn from_json(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::String(uri) => return AudioPart::from_wav_b64_uri(&uri),
            other => object(other, "audio part")?,
        };
        let extra = take_extra(&mut map)?;

        let part = if let Some(uri) = take_str(&mut map, "wav_data")? {
            AudioPart::from_wav_b64_uri(&uri)?
        } else if let Some(raw) = take_str(&mut map, "raw")? {
            let sample_rate = map
                .get("sample_rate")
                .and_then(Value::as_u64)
                .and_then(|sr| u32::try_from(sr).ok())
                .ok_or_else(|| Error::format("raw audio needs an integer \"sample_rate\""))?;
            AudioPart::from_b64(&raw, sample_rate)?
        } else {
            return Err(Error::format(
                "audio part needs either \"wav_data\" or \"raw\" and \"sample_rate\"",
            ));
        };
        Ok(part.with_extra(extra))
    }
}

impl DataPart for ImagePart {
    fn to_json(&self) -> Result<Value> {
        let mut map = Map::new();
        map.insert("img_data".into(), Value::String(self.as_b64_uri("png")?));
        Ok(with_extra(map, &self.extra))
    }

    fn from_json(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::String(uri) => return ImagePart::from_b64_uri(&uri),
            other => object(other, "image part")?,
        };
        let extra = take_extra(&mut map)?;

        let uri = take_str(&mut map, "img_data")?
            .ok_or_else(|| Error::format("image part needs \"img_data\""))?;
        Ok(ImagePart::from_b64_uri(&uri)?.with_extra(extra))
    }
}

impl DataPart for TextPart {
    fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(TextPart::new(text)),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

/// Serialize and deserialize through [`DataPart`].
macro_rules! serde_via_json {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                    self.to_json()
                        .map_err(serde::ser::Error::custom)?
                        .serialize(serializer)
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                    let value = Value::deserialize(deserializer)?;
                    <$ty>::from_json(value).map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

serde_via_json!(BinaryPart, VideoPart, AudioPart, ImagePart);
