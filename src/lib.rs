//! Typed access to the host clipboard.
//!
//! The clipboard is one process-wide store of typed items. This crate
//! reads and replaces it through a platform backend chosen once per
//! process (see [`clipboard::Backend`]):
//!
//! ```no_run
//! use clipbridge::{ClipboardItem, initialize, read_clipboard, write_clipboard};
//!
//! initialize()?;
//! write_clipboard(vec![ClipboardItem::text("hello")])?;
//! for item in read_clipboard()? {
//!     println!("{}: {} bytes", item.kind(), item.data().len());
//! }
//! # Ok::<(), clipbridge::ClipboardError>(())
//! ```

pub mod clipboard;
pub mod dump;
pub mod retry;

use std::sync::OnceLock;

pub use clipboard::item::{IMAGE_PNG, TEXT_HTML, TEXT_PLAIN, TEXT_RTF};
pub use clipboard::portable::Serve;
pub use clipboard::{Backend, ClipboardBackend, ClipboardError, ClipboardItem, ClipboardItems};

static BACKEND: OnceLock<Backend> = OnceLock::new();

/// The process-wide backend, created on first use.
pub fn backend() -> &'static Backend {
    BACKEND.get_or_init(Backend::platform_default)
}

/// One-time backend setup. Must succeed before reading or writing.
///
/// Repeated calls are cheap and return the first outcome.
pub fn initialize() -> Result<(), ClipboardError> {
    backend().initialize()
}

/// Read every recognized item currently on the clipboard.
///
/// # Errors
///
/// `NotInitialized` before [`initialize`]; `ResourceBusy` if another
/// application holds the clipboard.
pub fn read_clipboard() -> Result<ClipboardItems, ClipboardError> {
    backend().read_all()
}

/// Replace the clipboard contents with `items`, in order.
///
/// An empty list is a no-op. Writes are not atomic: a failure partway
/// through can leave the clipboard cleared and partially written.
pub fn write_clipboard(items: ClipboardItems) -> Result<(), ClipboardError> {
    backend().write_all(items)
}

/// [`write_clipboard`] for short-lived writers: on X11 and Wayland the
/// call blocks per `serve` so the data outlives this process.
pub fn write_clipboard_serving(items: ClipboardItems, serve: Serve) -> Result<(), ClipboardError> {
    backend().write_serving(items, serve)
}
