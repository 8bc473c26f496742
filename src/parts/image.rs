//! Decoded raster images.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use multimodal_common::{data_uri, mime, DataUri, Error, Extra, Result};
use ndarray::Array3;

use crate::fetch::{self, Downloader};

/// Encoding used when no format is requested, and for serialization.
pub const DEFAULT_FORMAT: &str = "png";

/// A decoded raster image plus the container format it was read from.
#[derive(Clone, PartialEq)]
pub struct ImagePart {
    image: DynamicImage,
    format: Option<ImageFormat>,
    pub extra: Extra,
}

fn decode_error(err: ImageError) -> Error {
    match err {
        ImageError::IoError(e) => Error::Io(e),
        other => Error::format(format!("invalid image data: {other}")),
    }
}

impl ImagePart {
    /// Wrap an already-decoded image. It has no source format.
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image,
            format: None,
            extra: Extra::new(),
        }
    }

    /// Open a local image; the format is detected from the content, then
    /// the extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)?
            .with_guessed_format()?;
        let format = reader.format().or_else(|| ImageFormat::from_path(path).ok());
        let image = reader.decode().map_err(decode_error)?;
        tracing::debug!(
            "Loaded {}x{} image from {}",
            image.width(),
            image.height(),
            path.display()
        );
        Ok(Self {
            image,
            format,
            extra: Extra::new(),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_hint(data, None)
    }

    /// Decode bytes, falling back to `hint` when the content does not
    /// identify its own format.
    pub fn from_bytes_with_hint(data: &[u8], hint: Option<ImageFormat>) -> Result<Self> {
        let mut reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        if reader.format().is_none() {
            if let Some(hint) = hint {
                reader.set_format(hint);
            }
        }
        let format = reader.format();
        let image = reader.decode().map_err(decode_error)?;
        Ok(Self {
            image,
            format,
            extra: Extra::new(),
        })
    }

    pub fn from_b64(data: &str) -> Result<Self> {
        Self::from_bytes(&data_uri::decode_b64(data)?)
    }

    /// Parse `data:image/<type>;base64,<payload>`. The declared MIME type is
    /// used as a format hint.
    pub fn from_b64_uri(uri: &str) -> Result<Self> {
        let parsed = DataUri::parse_kind(uri, "image")?;
        let hint = ImageFormat::from_mime_type(parsed.mime);
        Self::from_bytes_with_hint(&parsed.decode()?, hint)
    }

    /// Download an image into memory and decode it.
    ///
    /// `allowed_mime` defaults to `["image/*"]`.
    pub async fn from_url(
        downloader: &dyn Downloader,
        url: &str,
        allowed_mime: Option<&[String]>,
    ) -> Result<Self> {
        let images_only = ["image/*".to_string()];
        let allowed = allowed_mime.unwrap_or(&images_only);
        let (data, content_type) = fetch::fetch_to_memory(downloader, url, allowed).await?;
        Self::from_bytes_with_hint(&data, ImageFormat::from_mime_type(&content_type))
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Container format the image was decoded from, if known.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    /// MIME type of the source format; `image/png` when the image was not
    /// decoded from a container.
    pub fn mime(&self) -> String {
        match self.format {
            Some(format) => format.to_mime_type().to_string(),
            None => mime_for_format(DEFAULT_FORMAT),
        }
    }

    /// Re-encode to the format named by `format` (an extension such as
    /// `"png"`, `"jpeg"`, `"webp"`).
    pub fn as_bytes(&self, format: &str) -> Result<Vec<u8>> {
        let target = ImageFormat::from_extension(format.to_ascii_lowercase())
            .ok_or_else(|| Error::format(format!("unknown image format {format:?}")))?;
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, target).map_err(|e| match e {
            ImageError::IoError(e) => Error::Io(e),
            other => Error::format(format!("cannot encode image as {format}: {other}")),
        })?;
        Ok(buf.into_inner())
    }

    /// Base64 of [`as_bytes`](Self::as_bytes). Not a data URI.
    pub fn as_b64(&self, format: &str) -> Result<String> {
        Ok(data_uri::encode_b64(&self.as_bytes(format)?))
    }

    /// `data:<mime>;base64,<payload>` with the MIME type derived from
    /// `format`.
    pub fn as_b64_uri(&self, format: &str) -> Result<String> {
        let format = format.to_ascii_lowercase();
        Ok(data_uri::encode(
            &mime_for_format(&format),
            &self.as_bytes(&format)?,
        ))
    }

    /// Pixels in height x width x channel order, 8 bits per channel.
    ///
    /// Not interchangeable with [`as_tensor`](Self::as_tensor), which puts
    /// channels first.
    pub fn as_ndarray(&self) -> Result<Array3<u8>> {
        let (width, height) = self.size();
        let (channels, bytes) = pixels_u8(&self.image);
        Array3::from_shape_vec((height as usize, width as usize, channels), bytes)
            .map_err(|e| Error::format(format!("pixel buffer does not match image size: {e}")))
    }

    /// Pixels in channel x height x width order.
    pub fn as_tensor(&self) -> Result<Array3<u8>> {
        Ok(self
            .as_ndarray()?
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned())
    }
}

/// Interleaved 8-bit samples and their channel count. Wider color types are
/// narrowed, keeping alpha and grayscale as they are.
fn pixels_u8(image: &DynamicImage) -> (usize, Vec<u8>) {
    match image {
        DynamicImage::ImageLuma8(buf) => (1, buf.as_raw().clone()),
        DynamicImage::ImageLumaA8(buf) => (2, buf.as_raw().clone()),
        DynamicImage::ImageRgb8(buf) => (3, buf.as_raw().clone()),
        DynamicImage::ImageRgba8(buf) => (4, buf.as_raw().clone()),
        DynamicImage::ImageLuma16(_) => (1, image.to_luma8().into_raw()),
        DynamicImage::ImageLumaA16(_) => (2, image.to_luma_alpha8().into_raw()),
        other if other.color().has_alpha() => (4, other.to_rgba8().into_raw()),
        other => (3, other.to_rgb8().into_raw()),
    }
}

/// MIME type for an image format name.
fn mime_for_format(format: &str) -> String {
    ImageFormat::from_extension(format)
        .map(|f| f.to_mime_type().to_string())
        .or_else(|| mime::guess_from_extension(format).map(str::to_string))
        .unwrap_or_else(|| format!("image/{format}"))
}

impl fmt::Debug for ImagePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.size();
        f.debug_struct("ImagePart")
            .field("size", &format_args!("{width}x{height}"))
            .field("color", &self.image.color())
            .field("format", &self.format)
            .field("extra", &self.extra)
            .finish()
    }
}
