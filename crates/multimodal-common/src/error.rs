//! Common error types used throughout multimodal.
//!
//! Every acquisition, encoding and capability failure surfaces as one of the
//! variants below. Callers that ingest media on a best-effort basis can match
//! on the variant to decide whether to warn, retry, or ask the user to install
//! a missing tool.

/// Common error type for multimodal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The caller omitted information needed to disambiguate the input.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A value that should encode a structured format does not.
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed base64 or other textual encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A fetched resource's content type is not in the allow-list.
    #[error("Invalid MIME type: expected one of {allowed:?}, got {mime:?}")]
    MediaFormat { mime: String, allowed: Vec<String> },

    /// An optional external capability is not installed or reachable.
    #[error("Capability unavailable: {capability}: {message}")]
    CapabilityUnavailable { capability: String, message: String },

    /// An installed external tool rejected the input.
    #[error("Tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// Output of an external tool could not be understood.
    #[error("Failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },

    /// Invalid input was provided to a constructor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// PCM processing (resampling, normalization) failed.
    #[error("Audio error: {0}")]
    Audio(String),

    /// The transport failed before a content type could be checked.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new Configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Format error.
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Self::Format(msg.into())
    }

    /// Create a new Encoding error.
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new MediaFormat error for a rejected content type.
    pub fn media_format<S: Into<String>>(mime: S, allowed: &[String]) -> Self {
        Self::MediaFormat {
            mime: mime.into(),
            allowed: allowed.to_vec(),
        }
    }

    /// Create a new CapabilityUnavailable error.
    pub fn capability_unavailable(
        capability: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CapabilityUnavailable {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Audio error.
    pub fn audio<S: Into<String>>(msg: S) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a new Http error.
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error means a tool is missing rather than the input being bad.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable { .. })
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
