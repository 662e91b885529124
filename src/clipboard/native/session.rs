//! Clipboard session: one bounded period of exclusive clipboard ownership.
//!
//! `Closed -> Opened -> (Cleared) -> Closed`. [`ClipboardSession::open`]
//! is the only way in; the guard closes the clipboard on drop, so every
//! early return releases the systemwide lock.

use super::memory::free_quietly;
use super::{FormatId, MemHandle, NativeApi};
use crate::clipboard::ClipboardError;

/// Exclusive ownership of the OS clipboard.
pub struct ClipboardSession<'a, A: NativeApi + ?Sized> {
    api: &'a A,
    open: bool,
}

impl<'a, A: NativeApi + ?Sized> ClipboardSession<'a, A> {
    /// Acquire clipboard ownership.
    ///
    /// # Errors
    ///
    /// `ResourceBusy` if another window holds the clipboard. No retry is
    /// attempted here.
    pub fn open(api: &'a A) -> Result<Self, ClipboardError> {
        api.open_clipboard().map_err(ClipboardError::ResourceBusy)?;
        tracing::debug!("clipboard session opened");
        Ok(Self { api, open: true })
    }

    /// Discard the current contents. The OS frees the blocks it owned.
    pub fn clear(&mut self) -> Result<(), ClipboardError> {
        self.api.empty_clipboard()?;
        Ok(())
    }

    /// Lazily enumerate the format ids currently on the clipboard.
    pub fn formats(&self) -> Formats<'_, A> {
        Formats {
            api: self.api,
            previous: 0,
            done: false,
        }
    }

    /// The OS-owned block for `format`. The block stays owned by the OS.
    pub fn get(&self, format: FormatId) -> Result<MemHandle, ClipboardError> {
        Ok(self.api.get_data(format)?)
    }

    /// Hand `handle` to the clipboard store under `format`.
    ///
    /// Consumes the handle either way. On success ownership moves to the
    /// OS; on failure the block is still ours and is freed here.
    pub fn set(&mut self, format: FormatId, handle: MemHandle) -> Result<(), ClipboardError> {
        if let Err(e) = self.api.set_data(format, &handle) {
            free_quietly(self.api, handle);
            return Err(e.into());
        }
        Ok(())
    }

    /// Release ownership and report failure.
    pub fn close(mut self) -> Result<(), ClipboardError> {
        self.open = false;
        self.api.close_clipboard()?;
        tracing::debug!("clipboard session closed");
        Ok(())
    }
}

impl<A: NativeApi + ?Sized> Drop for ClipboardSession<'_, A> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.api.close_clipboard() {
            Ok(()) => tracing::debug!("clipboard session closed on early return"),
            Err(e) => tracing::warn!(error = %e, "failed to release clipboard"),
        }
    }
}

/// Format ids present on the clipboard, ending at the `0` sentinel.
///
/// Not restartable. A failing enumeration call yields its error once and
/// then ends.
pub struct Formats<'s, A: NativeApi + ?Sized> {
    api: &'s A,
    previous: FormatId,
    done: bool,
}

impl<A: NativeApi + ?Sized> Iterator for Formats<'_, A> {
    type Item = Result<FormatId, ClipboardError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.api.enum_formats(self.previous) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(id) => {
                self.previous = id;
                Some(Ok(id))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}
