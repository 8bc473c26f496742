//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers the locations of `ffmpeg` and `ffprobe`
//! once and hands them to the capability implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use multimodal_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Tool path overrides (the `[tools]` config section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    /// Path to the ffprobe executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffprobe_path: Option<PathBuf>,
}

impl ToolsConfig {
    /// The configured override for a tool, if any.
    pub fn path_for(&self, name: &str) -> Option<&Path> {
        match name {
            "ffmpeg" => self.ffmpeg_path.as_deref(),
            "ffprobe" => self.ffprobe_path.as_deref(),
            _ => None,
        }
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// A configured path is used only if it exists; otherwise [`which::which`]
    /// locates the tool in `PATH`. Tools that are not found are omitted.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let resolved = match config.path_for(name) {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                _ => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                #[cfg(feature = "tracing")]
                tracing::debug!("Found {} at {}", name, path.display());
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// A registry that knows about no tools at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a tool at an explicit path.
    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.into(), path.into());
        self
    }

    /// Path of a discovered tool, if any.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(PathBuf::as_path)
    }

    /// Return the path of the given tool, or
    /// [`Error::CapabilityUnavailable`] if it was not found during discovery.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.get(name).ok_or_else(|| {
            Error::capability_unavailable(
                name,
                format!("{name} not found; is it installed and in PATH?"),
            )
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("-version").output().ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

/// Map a spawn failure to the error callers expect: a missing executable is
/// an unavailable capability, anything else is plain I/O.
pub(crate) fn spawn_error(tool: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::capability_unavailable(tool, format!("{tool} could not be executed: {err}"))
    } else {
        Error::Io(err)
    }
}

/// Run a prepared command to completion and return its stdout.
///
/// When `input` is given it is written to the child's stdin from a scoped
/// thread so large payloads cannot deadlock against a full stdout pipe.
/// A non-zero exit becomes [`Error::ToolFailed`] carrying stderr.
pub(crate) fn run_captured(tool: &str, cmd: &mut Command, input: Option<&[u8]>) -> Result<Vec<u8>> {
    use std::io::Write;
    use std::process::Stdio;

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Running {}: {:?}", tool, cmd);

    let mut child = cmd.spawn().map_err(|e| spawn_error(tool, e))?;

    let output = match (input, child.stdin.take()) {
        (Some(data), Some(mut stdin)) => std::thread::scope(|scope| {
            scope.spawn(move || {
                // The child may exit before consuming everything (e.g. ffprobe
                // reads only the header); a broken pipe here is expected.
                let _ = stdin.write_all(data);
            });
            child.wait_with_output()
        })?,
        _ => child.wait_with_output()?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(tool, stderr.trim().to_string()));
    }

    Ok(output.stdout)
}
