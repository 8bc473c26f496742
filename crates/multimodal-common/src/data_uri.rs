//! Base64 data URIs (`data:<mime>;base64,<payload>`).

use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// A parsed base64 data URI borrowing from its source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    /// Declared MIME type (everything between `data:` and `;base64,`).
    pub mime: &'a str,
    /// Base64 payload, not yet decoded.
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Parse a data URI.
    ///
    /// The MIME type must be present and the `;base64` flag is mandatory;
    /// anything else fails with [`Error::Format`].
    ///
    /// # Examples
    ///
    /// ```
    /// use multimodal_common::DataUri;
    ///
    /// let uri = DataUri::parse("data:image/png;base64,iVBORw0KGgo=")?;
    /// assert_eq!(uri.mime, "image/png");
    /// assert!(DataUri::parse("data:image/png,iVBORw0KGgo=").is_err());
    /// # Ok::<(), multimodal_common::Error>(())
    /// ```
    pub fn parse(uri: &'a str) -> Result<Self> {
        let rest = uri.strip_prefix(SCHEME).ok_or_else(|| {
            Error::format(
                "Data URI must begin with a MIME type indicating Base64 encoding (`data:mime/type;base64,`)",
            )
        })?;
        let marker = rest.rfind(BASE64_MARKER).ok_or_else(|| {
            Error::format("Data URI is missing the `;base64,` marker")
        })?;
        let mime = &rest[..marker];
        if mime.is_empty() {
            return Err(Error::format("Data URI is missing its MIME type"));
        }
        Ok(Self {
            mime,
            payload: &rest[marker + BASE64_MARKER.len()..],
        })
    }

    /// Parse a data URI and require a specific top-level media type
    /// (`"image"`, `"audio"`, ...).
    pub fn parse_kind(uri: &'a str, kind: &str) -> Result<Self> {
        let parsed = Self::parse(uri)?;
        match parsed.mime.split_once('/') {
            Some((top, sub)) if top.eq_ignore_ascii_case(kind) && !sub.is_empty() => Ok(parsed),
            _ => Err(Error::format(format!(
                "Data URI must begin with an {kind} MIME type (`data:{kind}/*;base64,`), got {:?}",
                parsed.mime
            ))),
        }
    }

    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_b64(self.payload)
    }
}

/// Build a data URI from a MIME type and raw bytes.
pub fn encode(mime: &str, data: &[u8]) -> String {
    format!("{SCHEME}{mime}{BASE64_MARKER}{}", STANDARD.encode(data))
}

/// Encode bytes as standard base64.
pub fn encode_b64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64, failing with [`Error::Encoding`] on malformed input.
pub fn decode_b64(data: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(data.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let uri = DataUri::parse("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(uri.mime, "application/pdf");
        assert_eq!(uri.payload, "JVBERi0=");
        assert_eq!(uri.decode().unwrap(), b"%PDF-");
    }

    #[test]
    fn test_parse_rejects_bad_prefix() {
        assert!(matches!(
            DataUri::parse("image/png;base64,AAAA"),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            DataUri::parse("data:image/png,AAAA"),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            DataUri::parse("data:;base64,AAAA"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_parse_kind() {
        assert!(DataUri::parse_kind("data:image/png;base64,AAAA", "image").is_ok());
        assert!(matches!(
            DataUri::parse_kind("data:audio/wav;base64,AAAA", "image"),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            DataUri::parse_kind("data:image/;base64,AAAA", "image"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_malformed_payload_is_encoding_error() {
        let uri = DataUri::parse("data:image/png;base64,@@@").unwrap();
        assert!(matches!(uri.decode(), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("text/plain", b"hi"), "data:text/plain;base64,aGk=");
        let uri = encode("application/octet-stream", &[0, 1, 2, 255]);
        let parsed = DataUri::parse(&uri).unwrap();
        assert_eq!(parsed.decode().unwrap(), vec![0, 1, 2, 255]);
    }
}
