//! Clipboard backends: pluggable platform adapters behind one contract.
//!
//! Every backend implements [`ClipboardBackend`]. The platform variant is
//! chosen once at startup via [`Backend::platform_default`]; on Windows
//! that is the native bridge in [`native`], elsewhere the `arboard`-backed
//! [`portable`] adapter.

pub mod item;
pub mod native;
pub mod portable;

pub use item::{ClipboardItem, ClipboardItems};
pub use native::NativeError;

/// Errors returned by clipboard backends.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// Format registration failed. Fatal for the process; the failure is
    /// cached and returned by every later `initialize`.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Logical type has no native mapping on this backend. No OS call
    /// was made.
    #[error("clipboard type {0} is unsupported")]
    UnsupportedType(String),

    /// Backend limited to `max` items received `got`. No OS call was made.
    #[error("multi-item clipboard is unsupported (max {max}, got {got})")]
    UnsupportedMultiItem { max: usize, got: usize },

    /// Exclusive clipboard access could not be acquired. Transient;
    /// callers may retry with backoff.
    #[error("clipboard busy: {0}")]
    ResourceBusy(NativeError),

    /// Allocation, lock or copy failure at the OS memory boundary.
    #[error("memory {op} failed: {source}")]
    Memory {
        op: &'static str,
        #[source]
        source: NativeError,
    },

    /// Any other native call failure.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Failure from a backend library that reports no OS error code.
    #[error("{call} failed: {reason}")]
    Platform { call: &'static str, reason: String },

    /// `read_all`/`write_all` called before `initialize`.
    #[error("clipboard backend not initialized")]
    NotInitialized,

    /// Payload bytes do not match their declared type.
    #[error("invalid {kind} payload: {reason}")]
    InvalidData { kind: String, reason: String },
}

impl ClipboardError {
    /// Whether the caller may reasonably retry the same operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ResourceBusy(_))
    }

    pub(crate) fn memory(op: &'static str, source: NativeError) -> Self {
        Self::Memory { op, source }
    }
}

/// Reads and writes the system clipboard.
///
/// `Send + Sync` because one backend instance is shared process-wide and
/// serializes its own OS access internally.
pub trait ClipboardBackend: Send + Sync {
    /// One-time setup. Must succeed before `read_all`/`write_all`.
    fn initialize(&self) -> Result<(), ClipboardError>;

    /// Read every recognized item currently on the clipboard.
    fn read_all(&self) -> Result<ClipboardItems, ClipboardError>;

    /// Replace the clipboard contents with `items`.
    fn write_all(&self, items: ClipboardItems) -> Result<(), ClipboardError>;

    /// Logical type names this backend can read and write.
    fn supported_types(&self) -> Vec<&'static str>;

    /// Maximum number of items accepted by one `write_all`.
    fn max_items(&self) -> usize {
        usize::MAX
    }
}

/// Reject item lists the backend cannot store, before any OS call.
pub(crate) fn check_item_count(backend_max: usize, got: usize) -> Result<(), ClipboardError> {
    if got > backend_max {
        Err(ClipboardError::UnsupportedMultiItem {
            max: backend_max,
            got,
        })
    } else {
        Ok(())
    }
}

/// The fixed set of platform backends.
pub enum Backend {
    /// Direct Win32 bridge: clipboard session, movable memory, format
    /// registration.
    #[cfg(windows)]
    Native(native::NativeBackend<native::win32::Win32Api>),
    /// `arboard`-backed adapter for text and PNG images.
    Portable(portable::PortableBackend),
}

impl Backend {
    /// The backend for the platform this binary was built for.
    #[cfg(windows)]
    pub fn platform_default() -> Self {
        Self::Native(native::NativeBackend::new(native::win32::Win32Api))
    }

    /// The backend for the platform this binary was built for.
    #[cfg(not(windows))]
    pub fn platform_default() -> Self {
        Self::Portable(portable::PortableBackend::new())
    }

    /// Short backend name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(windows)]
            Self::Native(_) => "native",
            Self::Portable(_) => "portable",
        }
    }

    /// Write `items`, keeping them served as `serve` asks on platforms
    /// where the writer owns the selection. The native bridge hands data
    /// to the OS and ignores `serve`.
    pub fn write_serving(
        &self,
        items: ClipboardItems,
        serve: portable::Serve,
    ) -> Result<(), ClipboardError> {
        match self {
            #[cfg(windows)]
            Self::Native(b) => b.write_all(items),
            Self::Portable(b) => b.write_serving(items, serve),
        }
    }

    fn inner(&self) -> &dyn ClipboardBackend {
        match self {
            #[cfg(windows)]
            Self::Native(b) => b,
            Self::Portable(b) => b,
        }
    }
}

impl ClipboardBackend for Backend {
    fn initialize(&self) -> Result<(), ClipboardError> {
        self.inner().initialize()
    }

    fn read_all(&self) -> Result<ClipboardItems, ClipboardError> {
        self.inner().read_all()
    }

    fn write_all(&self, items: ClipboardItems) -> Result<(), ClipboardError> {
        self.inner().write_all(items)
    }

    fn supported_types(&self) -> Vec<&'static str> {
        self.inner().supported_types()
    }

    fn max_items(&self) -> usize {
        self.inner().max_items()
    }
}
