//! Win32 implementation of [`NativeApi`] over `user32` and `kernel32`.
//!
//! One method per entry point. Failures carry the `GetLastError` code.

use windows::Win32::Foundation::{GetLastError, HANDLE, HGLOBAL, HWND};
use windows::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, EnumClipboardFormats, GetClipboardData, OpenClipboard,
    RegisterClipboardFormatW, SetClipboardData,
};
use windows::Win32::System::Memory::{
    GMEM_MOVEABLE, GMEM_ZEROINIT, GlobalAlloc, GlobalFree, GlobalLock, GlobalSize, GlobalUnlock,
};
use windows::core::{HSTRING, PCWSTR};

use super::{FormatId, MemHandle, NativeApi, NativeError};

/// Win32 clipboard and global-memory calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Api;

fn last_error(call: &'static str) -> NativeError {
    // SAFETY: reads thread-local error state only.
    let code = unsafe { GetLastError() };
    NativeError::new(call, code.0)
}

fn from_result(call: &'static str, err: windows::core::Error) -> NativeError {
    // Win32 errors surface as HRESULT_FROM_WIN32; keep the low word.
    NativeError::new(call, (err.code().0 as u32) & 0xFFFF)
}

fn hglobal(handle: &MemHandle) -> HGLOBAL {
    HGLOBAL(handle.0 as *mut _)
}

impl NativeApi for Win32Api {
    fn open_clipboard(&self) -> Result<(), NativeError> {
        // SAFETY: a null owner window is allowed; ownership is per thread.
        unsafe { OpenClipboard(HWND::default()) }.map_err(|e| from_result("OpenClipboard", e))
    }

    fn close_clipboard(&self) -> Result<(), NativeError> {
        // SAFETY: no pointers involved.
        unsafe { CloseClipboard() }.map_err(|e| from_result("CloseClipboard", e))
    }

    fn empty_clipboard(&self) -> Result<(), NativeError> {
        // SAFETY: no pointers involved.
        unsafe { EmptyClipboard() }.map_err(|e| from_result("EmptyClipboard", e))
    }

    fn enum_formats(&self, previous: FormatId) -> Result<FormatId, NativeError> {
        // SAFETY: no pointers involved.
        let next = unsafe { EnumClipboardFormats(previous) };
        if next == 0 {
            // Zero is both the end marker and the failure value.
            let err = last_error("EnumClipboardFormats");
            if err.code != 0 {
                return Err(err);
            }
        }
        Ok(next)
    }

    fn get_data(&self, format: FormatId) -> Result<MemHandle, NativeError> {
        // SAFETY: the returned handle is owned by the clipboard and only
        // used while the session is open.
        let handle = unsafe { GetClipboardData(format) }
            .map_err(|e| from_result("GetClipboardData", e))?;
        Ok(MemHandle(handle.0 as usize))
    }

    fn set_data(&self, format: FormatId, handle: &MemHandle) -> Result<(), NativeError> {
        // SAFETY: `handle` is an unlocked GMEM_MOVEABLE block we own.
        unsafe { SetClipboardData(format, HANDLE(handle.0 as *mut _)) }
            .map(|_| ())
            .map_err(|e| from_result("SetClipboardData", e))
    }

    fn register_format(&self, name: &str) -> Result<FormatId, NativeError> {
        let wide = HSTRING::from(name);
        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let id = unsafe { RegisterClipboardFormatW(PCWSTR(wide.as_ptr())) };
        if id == 0 {
            return Err(last_error("RegisterClipboardFormatW"));
        }
        Ok(id)
    }

    fn alloc(&self, size: usize) -> Result<MemHandle, NativeError> {
        // Zero-byte movable blocks cannot be locked.
        let size = size.max(1);
        // SAFETY: no pointers involved.
        let block = unsafe { GlobalAlloc(GMEM_MOVEABLE | GMEM_ZEROINIT, size) }
            .map_err(|e| from_result("GlobalAlloc", e))?;
        Ok(MemHandle(block.0 as usize))
    }

    fn lock(&self, handle: &MemHandle) -> Result<*mut u8, NativeError> {
        // SAFETY: an invalid handle makes GlobalLock return null, which
        // is reported as an error.
        let ptr = unsafe { GlobalLock(hglobal(handle)) };
        if ptr.is_null() {
            return Err(last_error("GlobalLock"));
        }
        Ok(ptr.cast())
    }

    fn unlock(&self, handle: &MemHandle) -> Result<(), NativeError> {
        // SAFETY: paired with a successful `lock` on the same handle.
        match unsafe { GlobalUnlock(hglobal(handle)) } {
            Ok(()) => Ok(()),
            // A zero return with NO_ERROR means the lock count reached zero.
            Err(e) if e.code().is_ok() => Ok(()),
            Err(e) => Err(from_result("GlobalUnlock", e)),
        }
    }

    fn size(&self, handle: &MemHandle) -> Result<usize, NativeError> {
        // SAFETY: no pointers involved.
        let size = unsafe { GlobalSize(hglobal(handle)) };
        if size == 0 {
            return Err(last_error("GlobalSize"));
        }
        Ok(size)
    }

    fn free(&self, handle: MemHandle) -> Result<(), NativeError> {
        // SAFETY: only called for blocks the clipboard never accepted.
        unsafe { GlobalFree(hglobal(&handle)) }
            .map(|_| ())
            .map_err(|e| from_result("GlobalFree", e))
    }
}
