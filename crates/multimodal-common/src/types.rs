//! Shared value types.

use serde::{Deserialize, Serialize};

/// Free-form metadata carried alongside a part and serialized with it.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Frame size of a video or image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes in one packed RGB24 frame of this size.
    pub fn rgb24_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
