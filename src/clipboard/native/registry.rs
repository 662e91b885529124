//! Format registry: logical type names <-> native format ids.
//!
//! Built once from [`FORMAT_TABLE`]. Entries with a fixed OS id are used
//! as-is; the rest are registered by name, one `register_format` call
//! each. After the build both lookup directions are pure.

use std::collections::HashMap;

use super::memory::BlockLayout;
use super::{FormatId, NativeApi};
use crate::clipboard::ClipboardError;
use crate::clipboard::item::{IMAGE_PNG, TEXT_HTML, TEXT_PLAIN, TEXT_RTF};

/// Predefined Win32 id for UTF-16 text.
pub const CF_UNICODETEXT: FormatId = 13;

/// How a logical type obtains its native id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeName {
    /// Fixed by the OS, never registered.
    Fixed(FormatId),
    /// Registered at runtime under this name.
    Registered(&'static str),
}

/// One row of the static format table.
#[derive(Debug, Clone, Copy)]
pub struct FormatSpec {
    pub logical: &'static str,
    pub native: NativeName,
    pub layout: BlockLayout,
}

/// Every logical type the native bridge understands.
///
/// `"HTML Format"` and `"Rich Text Format"` are the names other Windows
/// applications register; `"PNG"` is the de facto image name used by
/// browsers and Office.
pub const FORMAT_TABLE: &[FormatSpec] = &[
    FormatSpec {
        logical: TEXT_PLAIN,
        native: NativeName::Fixed(CF_UNICODETEXT),
        layout: BlockLayout::Utf16Text,
    },
    FormatSpec {
        logical: TEXT_HTML,
        native: NativeName::Registered("HTML Format"),
        layout: BlockLayout::NulTerminated,
    },
    FormatSpec {
        logical: TEXT_RTF,
        native: NativeName::Registered("Rich Text Format"),
        layout: BlockLayout::NulTerminated,
    },
    FormatSpec {
        logical: IMAGE_PNG,
        native: NativeName::Registered("PNG"),
        layout: BlockLayout::Sized,
    },
];

/// A resolved native format: id plus the byte layout of its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    pub id: FormatId,
    pub layout: BlockLayout,
}

/// Bidirectional logical type <-> native id mapping.
#[derive(Debug)]
pub struct FormatRegistry {
    by_type: HashMap<&'static str, NativeFormat>,
    by_id: HashMap<FormatId, (&'static str, NativeFormat)>,
}

impl FormatRegistry {
    /// Build the mapping from [`FORMAT_TABLE`], registering named formats.
    ///
    /// # Errors
    ///
    /// `Initialization` if any registration fails or two logical types
    /// end up on the same native id.
    pub fn build(api: &(impl NativeApi + ?Sized)) -> Result<Self, ClipboardError> {
        Self::from_table(api, FORMAT_TABLE)
    }

    fn from_table(
        api: &(impl NativeApi + ?Sized),
        table: &[FormatSpec],
    ) -> Result<Self, ClipboardError> {
        let mut by_type = HashMap::with_capacity(table.len());
        let mut by_id = HashMap::with_capacity(table.len());

        for entry in table {
            let id = match entry.native {
                NativeName::Fixed(id) => id,
                NativeName::Registered(name) => {
                    let id = api.register_format(name).map_err(|e| {
                        ClipboardError::Initialization(format!("register {name:?}: {e}"))
                    })?;
                    tracing::debug!(name, id, "registered clipboard format");
                    id
                }
            };

            let format = NativeFormat {
                id,
                layout: entry.layout,
            };
            if let Some((existing, _)) = by_id.insert(id, (entry.logical, format)) {
                return Err(ClipboardError::Initialization(format!(
                    "{} and {} both map to format {id}",
                    existing, entry.logical
                )));
            }
            by_type.insert(entry.logical, format);
        }

        Ok(Self { by_type, by_id })
    }

    /// Native format for a logical type, or `None` if unknown.
    pub fn resolve(&self, logical: &str) -> Option<NativeFormat> {
        self.by_type.get(logical).copied()
    }

    /// Logical type for a native id, or `None` if unrecognized.
    pub fn resolve_back(&self, id: FormatId) -> Option<&'static str> {
        self.resolve_id(id).map(|(logical, _)| logical)
    }

    /// Logical type and resolved format for a native id, in one lookup.
    pub fn resolve_id(&self, id: FormatId) -> Option<(&'static str, NativeFormat)> {
        self.by_id.get(&id).copied()
    }
}
