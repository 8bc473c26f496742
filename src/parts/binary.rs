//! Opaque file-backed content.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use multimodal_av::ProbeInput;
use multimodal_common::{data_uri, mime, DataUri, Error, Extra, Result};
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::fetch::{self, Downloader};

/// Anything a [`BinaryPart`] can read from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// A detached copy of a part's content that can move to a blocking thread.
pub(crate) enum Source {
    File(File),
    Bytes(Vec<u8>),
}

impl Source {
    pub(crate) fn probe_input(&self) -> ProbeInput<'_> {
        match self {
            Source::File(file) => ProbeInput::File(file),
            Source::Bytes(bytes) => ProbeInput::Bytes(bytes),
        }
    }

    /// Copy the whole content into `out`.
    pub(crate) fn copy_to(self, out: &mut impl Write) -> Result<()> {
        match self {
            Source::File(mut file) => {
                file.seek(SeekFrom::Start(0))?;
                io::copy(&mut file, out)?;
            }
            Source::Bytes(bytes) => out.write_all(&bytes)?,
        }
        Ok(())
    }
}

enum Backing {
    Memory(Cursor<Vec<u8>>),
    File { file: File, path: Option<PathBuf> },
    Temp(NamedTempFile),
    Stream(Box<dyn ReadSeek>),
}

impl Backing {
    fn kind(&self) -> &'static str {
        match self {
            Backing::Memory(_) => "memory",
            Backing::File { .. } => "file",
            Backing::Temp(_) => "tempfile",
            Backing::Stream(_) => "stream",
        }
    }

    fn reader(&mut self) -> &mut dyn ReadSeek {
        match self {
            Backing::Memory(cursor) => cursor,
            Backing::File { file, .. } => file,
            Backing::Temp(temp) => temp.as_file_mut(),
            Backing::Stream(stream) => stream.as_mut(),
        }
    }

    fn descriptor(&self) -> Option<&File> {
        match self {
            Backing::File { file, .. } => Some(file),
            Backing::Temp(temp) => Some(temp.as_file()),
            Backing::Memory(_) | Backing::Stream(_) => None,
        }
    }
}

/// Arbitrary binary content plus its MIME type.
///
/// The bytes are never cached: every read seeks the backing stream to the
/// start and reads it in full. The stream is released exactly once, when the
/// part is dropped.
pub struct BinaryPart {
    backing: Mutex<Backing>,
    mime: String,
    pub extra: Extra,
}

impl BinaryPart {
    fn new(backing: Backing, mime: &str) -> Result<Self> {
        if !mime::is_valid(mime) {
            return Err(Error::invalid_input(format!("invalid MIME type {mime:?}")));
        }
        Ok(Self {
            backing: Mutex::new(backing),
            mime: mime.to_string(),
            extra: Extra::new(),
        })
    }

    /// Open a local file. The MIME type is guessed from the extension when
    /// not given.
    pub fn from_file(path: impl AsRef<Path>, mime: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let mime = match mime {
            Some(m) => m,
            None => mime::guess_from_path(path).ok_or_else(|| {
                Error::configuration(format!(
                    "The file type of {:?} could not be determined; pass a MIME type explicitly",
                    path
                ))
            })?,
        };
        let file = File::open(path)?;
        tracing::debug!("Opened {} as {}", path.display(), mime);
        Self::new(
            Backing::File {
                file,
                path: Some(path.to_path_buf()),
            },
            mime,
        )
    }

    /// Wrap an already-open file. There is no name to guess from, so the
    /// MIME type is required.
    pub fn from_handle(file: File, mime: Option<&str>) -> Result<Self> {
        let mime = require_mime(mime)?;
        Self::new(Backing::File { file, path: None }, mime)
    }

    /// Wrap any seekable reader. The MIME type is required.
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R, mime: Option<&str>) -> Result<Self> {
        let mime = require_mime(mime)?;
        Self::new(Backing::Stream(Box::new(reader)), mime)
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>, mime: &str) -> Result<Self> {
        Self::new(Backing::Memory(Cursor::new(data.into())), mime)
    }

    /// Decode standard base64.
    pub fn from_b64(data: &str, mime: &str) -> Result<Self> {
        Self::from_bytes(data_uri::decode_b64(data)?, mime)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_b64_uri(uri: &str) -> Result<Self> {
        let parsed = DataUri::parse(uri)?;
        Self::from_bytes(parsed.decode()?, parsed.mime)
    }

    /// Download a URL into a temporary file that lives as long as the part.
    ///
    /// `allowed_mime` defaults to `["*"]`.
    pub async fn from_url(
        downloader: &dyn Downloader,
        url: &str,
        allowed_mime: Option<&[String]>,
    ) -> Result<Self> {
        let any = ["*".to_string()];
        let allowed = allowed_mime.unwrap_or(&any);
        let (temp, mime) = fetch::fetch_to_tempfile(downloader, url, allowed).await?;
        Self::new(Backing::Temp(temp), &mime)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }

    /// The full content. Re-reads the stream on every call.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut backing = self.backing.lock();
        let reader = backing.reader();
        reader.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Standard base64 of [`as_bytes`](Self::as_bytes). Not a data URI.
    pub fn as_b64(&self) -> Result<String> {
        Ok(data_uri::encode_b64(&self.as_bytes()?))
    }

    /// `data:<mime>;base64,<payload>`.
    pub fn as_b64_uri(&self) -> Result<String> {
        Ok(data_uri::encode(&self.mime, &self.as_bytes()?))
    }

    /// Size of the content in bytes.
    ///
    /// File-backed parts answer from filesystem metadata. Parts wrapping an
    /// arbitrary reader seek it to the end and report the offset, so the
    /// stream's position is undefined afterwards; reseek before reading it
    /// through any other handle.
    pub fn filesize(&self) -> Result<u64> {
        let mut backing = self.backing.lock();
        match &mut *backing {
            Backing::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Backing::File { file, .. } => Ok(file.metadata()?.len()),
            Backing::Temp(temp) => Ok(temp.as_file().metadata()?.len()),
            Backing::Stream(stream) => Ok(stream.seek(SeekFrom::End(0))?),
        }
    }

    /// Path of the backing file, when there is one on disk.
    pub fn path(&self) -> Option<PathBuf> {
        match &*self.backing.lock() {
            Backing::File { path, .. } => path.clone(),
            Backing::Temp(temp) => Some(temp.path().to_path_buf()),
            Backing::Memory(_) | Backing::Stream(_) => None,
        }
    }

    /// Run `f` with the cheapest probe input: the file descriptor when the
    /// part has one, the materialized bytes otherwise.
    pub(crate) fn with_probe_input<T>(
        &self,
        f: impl FnOnce(ProbeInput<'_>) -> Result<T>,
    ) -> Result<T> {
        {
            let backing = self.backing.lock();
            if let Some(file) = backing.descriptor() {
                return f(ProbeInput::File(file));
            }
        }
        let bytes = self.as_bytes()?;
        f(ProbeInput::Bytes(&bytes))
    }

    /// Detach the content: a duplicated descriptor for file-backed parts,
    /// the bytes otherwise. Arbitrary streams are read in full here.
    pub(crate) fn detach(&self) -> Result<Source> {
        {
            let backing = self.backing.lock();
            match &*backing {
                Backing::Memory(cursor) => return Ok(Source::Bytes(cursor.get_ref().clone())),
                Backing::File { file, .. } => return Ok(Source::File(file.try_clone()?)),
                Backing::Temp(temp) => return Ok(Source::File(temp.as_file().try_clone()?)),
                Backing::Stream(_) => {}
            }
        }
        Ok(Source::Bytes(self.as_bytes()?))
    }
}

fn require_mime(mime: Option<&str>) -> Result<&str> {
    mime.ok_or_else(|| {
        Error::configuration(
            "The file type cannot be guessed from an open stream; pass a MIME type explicitly",
        )
    })
}

impl fmt::Debug for BinaryPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryPart")
            .field("mime", &self.mime)
            .field("backing", &self.backing.lock().kind())
            .field("extra", &self.extra)
            .finish()
    }
}
