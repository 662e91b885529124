//! Clipboard payload types shared by every backend.

use serde::{Deserialize, Serialize};

/// Logical type for plain text. Always UTF-8 at this layer.
pub const TEXT_PLAIN: &str = "text/plain";
/// Logical type for PNG-encoded images.
pub const IMAGE_PNG: &str = "image/png";
/// Logical type for HTML fragments (native bridge only).
pub const TEXT_HTML: &str = "text/html";
/// Logical type for RTF documents (native bridge only).
pub const TEXT_RTF: &str = "text/rtf";

/// One typed payload on the clipboard.
///
/// `kind` is the platform-independent logical type name (serialized as
/// `type`). Items are immutable once built and move between layers by
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

impl ClipboardItem {
    pub fn new(kind: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Plain-text item from a UTF-8 string.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TEXT_PLAIN, text.into().into_bytes())
    }

    /// Logical type name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Split into `(kind, data)`, handing ownership of the bytes onward.
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.kind, self.data)
    }
}

/// Ordered sequence of items: insertion order on write, enumeration
/// order on read.
pub type ClipboardItems = Vec<ClipboardItem>;
