//! Multimodal-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across multimodal:
//!
//! - **Error Handling**: The error taxonomy shared by every part type
//! - **MIME Utilities**: Extension lookups and glob matching for allow-lists
//! - **Data URIs**: Parsing and building `data:<mime>;base64,` strings
//! - **Core Types**: The opaque `Extra` mapping carried by every part
//!
//! # Examples
//!
//! ```
//! use multimodal_common::mime::{guess_from_path, mime_matches};
//! use multimodal_common::data_uri::DataUri;
//! use std::path::Path;
//!
//! assert_eq!(guess_from_path(Path::new("doc.pdf")), Some("application/pdf"));
//! assert!(mime_matches("image/*", "image/png"));
//!
//! let uri = DataUri::parse("data:text/plain;base64,aGk=")?;
//! assert_eq!(uri.mime, "text/plain");
//! assert_eq!(uri.decode()?, b"hi");
//! # Ok::<(), multimodal_common::Error>(())
//! ```

pub mod data_uri;
pub mod error;
pub mod mime;
pub mod types;

pub use data_uri::DataUri;
pub use error::{Error, Result};
pub use types::*;
