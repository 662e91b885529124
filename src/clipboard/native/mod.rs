//! Native clipboard bridge: direct access to the OS clipboard store.
//!
//! Layers, leaf first:
//!
//! - [`NativeApi`]: one fallible method per OS entry point. [`win32`]
//!   implements it over `user32`/`kernel32`.
//! - [`registry`]: logical type <-> native format id, built once.
//! - [`memory`]: movable-block allocation and scoped lock/copy/unlock.
//! - [`session`]: exclusive clipboard ownership with guaranteed release.
//! - [`NativeBackend`]: composes the above into `read_all`/`write_all`.

#[cfg(test)]
pub(crate) mod fake;
pub mod memory;
pub mod registry;
pub mod session;
#[cfg(windows)]
pub mod win32;

use std::fmt;
use std::sync::{Mutex, OnceLock};

use super::{ClipboardBackend, ClipboardError, ClipboardItem, ClipboardItems};
use registry::FormatRegistry;
use session::ClipboardSession;

/// Native clipboard format identifier. `0` is the enumeration sentinel.
pub type FormatId = u32;

/// Opaque reference to an OS-owned movable memory block.
///
/// Never dereferenced directly; bytes are reached only through
/// [`memory::LockedBlock`]. Not `Copy`: handing a block to the store or
/// freeing it consumes the handle, so it cannot be touched afterwards.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MemHandle(pub(crate) usize);

impl MemHandle {
    /// Raw OS value, for comparing handles in tests.
    #[cfg(test)]
    pub(crate) fn raw(&self) -> usize {
        self.0
    }
}

/// A failed native call: the entry point name and the OS error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub call: &'static str,
    pub code: u32,
}

impl NativeError {
    pub fn new(call: &'static str, code: u32) -> Self {
        Self { call, code }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed (os error {})", self.call, self.code)
    }
}

impl std::error::Error for NativeError {}

/// The OS clipboard and global-memory entry points used by the bridge.
///
/// Each method maps to exactly one native call and translates failure
/// into [`NativeError`]. Implementations do no retrying and hold no
/// state about sessions; sequencing is the caller's job.
pub trait NativeApi: Send + Sync {
    /// Take exclusive ownership of the clipboard.
    fn open_clipboard(&self) -> Result<(), NativeError>;

    /// Release clipboard ownership.
    fn close_clipboard(&self) -> Result<(), NativeError>;

    /// Discard all clipboard contents. Requires ownership.
    fn empty_clipboard(&self) -> Result<(), NativeError>;

    /// Next format after `previous` (`0` starts), or `0` at the end.
    fn enum_formats(&self, previous: FormatId) -> Result<FormatId, NativeError>;

    /// OS-owned block holding the data for `format`.
    fn get_data(&self, format: FormatId) -> Result<MemHandle, NativeError>;

    /// Hand `handle` to the clipboard store. On success the OS owns it;
    /// on failure the caller still does.
    fn set_data(&self, format: FormatId, handle: &MemHandle) -> Result<(), NativeError>;

    /// Register (or look up) a named format, systemwide.
    fn register_format(&self, name: &str) -> Result<FormatId, NativeError>;

    /// Allocate a movable, zero-initialized block of `size` bytes.
    fn alloc(&self, size: usize) -> Result<MemHandle, NativeError>;

    /// Lock `handle`, returning a stable address valid until `unlock`.
    fn lock(&self, handle: &MemHandle) -> Result<*mut u8, NativeError>;

    fn unlock(&self, handle: &MemHandle) -> Result<(), NativeError>;

    /// Size of the block in bytes. May exceed the requested size.
    fn size(&self, handle: &MemHandle) -> Result<usize, NativeError>;

    /// Free a block the process still owns.
    fn free(&self, handle: MemHandle) -> Result<(), NativeError>;
}

/// Clipboard backend that drives the OS clipboard through [`NativeApi`].
///
/// Holds the process-lifetime [`FormatRegistry`] and a mutex that
/// serializes every session opened from this process.
pub struct NativeBackend<A: NativeApi> {
    api: A,
    registry: OnceLock<Result<FormatRegistry, String>>,
    session_lock: Mutex<()>,
}

impl<A: NativeApi> NativeBackend<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            registry: OnceLock::new(),
            session_lock: Mutex::new(()),
        }
    }

    /// The registry, or `NotInitialized` if `initialize` has not run.
    fn registry(&self) -> Result<&FormatRegistry, ClipboardError> {
        match self.registry.get() {
            Some(Ok(registry)) => Ok(registry),
            Some(Err(reason)) => Err(ClipboardError::Initialization(reason.clone())),
            None => Err(ClipboardError::NotInitialized),
        }
    }

    /// Run `f` with the process-local session lock held.
    ///
    /// A poisoned lock only means another thread panicked mid-session;
    /// its session guard has already closed the clipboard.
    fn serialized<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self
            .session_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    #[cfg(test)]
    pub(crate) fn api(&self) -> &A {
        &self.api
    }
}

impl<A: NativeApi> ClipboardBackend for NativeBackend<A> {
    fn initialize(&self) -> Result<(), ClipboardError> {
        let outcome = self.registry.get_or_init(|| {
            FormatRegistry::build(&self.api).map_err(|e| {
                tracing::error!(error = %e, "clipboard format registration failed");
                e.to_string()
            })
        });
        match outcome {
            Ok(_) => Ok(()),
            Err(reason) => Err(ClipboardError::Initialization(reason.clone())),
        }
    }

    fn read_all(&self) -> Result<ClipboardItems, ClipboardError> {
        let registry = self.registry()?;

        self.serialized(|| -> Result<ClipboardItems, ClipboardError> {
            let session = ClipboardSession::open(&self.api)?;
            let mut items = ClipboardItems::new();

            for id in session.formats() {
                let id = id?;
                let Some((kind, format)) = registry.resolve_id(id) else {
                    tracing::trace!(format = id, "skipping unrecognized format");
                    continue;
                };
                let handle = session.get(id)?;
                let data = memory::read_block(&self.api, format.layout, &handle)?;
                tracing::debug!(kind, bytes = data.len(), "read clipboard item");
                items.push(ClipboardItem::new(kind, data));
            }

            session.close()?;
            Ok(items)
        })
    }

    fn write_all(&self, items: ClipboardItems) -> Result<(), ClipboardError> {
        if items.is_empty() {
            return Ok(());
        }
        let registry = self.registry()?;
        super::check_item_count(self.max_items(), items.len())?;

        // Resolve and validate everything up front so a bad item never
        // clears the clipboard.
        let resolved = items
            .into_iter()
            .map(|item| {
                let (kind, data) = item.into_parts();
                let Some(format) = registry.resolve(&kind) else {
                    return Err(ClipboardError::UnsupportedType(kind));
                };
                if let Err(reason) = format.layout.check(&data) {
                    return Err(ClipboardError::InvalidData {
                        kind,
                        reason: reason.to_string(),
                    });
                }
                Ok((kind, format, data))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.serialized(|| -> Result<(), ClipboardError> {
            let mut session = ClipboardSession::open(&self.api)?;
            session.clear()?;

            for (kind, format, data) in &resolved {
                let handle = memory::write_block(&self.api, format.layout, data)?;
                session.set(format.id, handle)?;
                tracing::debug!(kind = %kind, bytes = data.len(), "stored clipboard item");
            }

            session.close()?;
            Ok(())
        })
    }

    fn supported_types(&self) -> Vec<&'static str> {
        registry::FORMAT_TABLE.iter().map(|f| f.logical).collect()
    }
}
