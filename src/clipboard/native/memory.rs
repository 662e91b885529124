//! Memory bridge: moving bytes in and out of OS movable memory blocks.
//!
//! A block is only touched through a [`LockedBlock`], which unlocks on
//! drop. No pointer outlives its lock.

use std::ptr::NonNull;

use super::{MemHandle, NativeApi, NativeError};
use crate::clipboard::ClipboardError;

/// Byte layout of a clipboard block for one format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLayout {
    /// UTF-16LE text ending in a NUL code unit. Callers exchange UTF-8;
    /// the bridge converts in both directions.
    Utf16Text,
    /// Bytes ending in a single NUL.
    NulTerminated,
    /// Raw bytes; the length is the block size reported by the OS.
    /// Never empty, since the OS cannot hand out a zero-byte block.
    Sized,
}

impl BlockLayout {
    /// Reject payloads this layout cannot store faithfully.
    pub fn check(self, data: &[u8]) -> Result<(), &'static str> {
        match self {
            Self::Sized if data.is_empty() => Err("sized clipboard blocks cannot be empty"),
            _ => Ok(()),
        }
    }

    /// Encode caller bytes into the on-clipboard representation,
    /// terminator included.
    fn encode(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Utf16Text => {
                let text = String::from_utf8_lossy(data);
                let mut out = Vec::with_capacity((text.len() + 1) * 2);
                for unit in text.encode_utf16().chain(std::iter::once(0)) {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
            Self::NulTerminated => {
                let mut out = Vec::with_capacity(data.len() + 1);
                out.extend_from_slice(data);
                out.push(0);
                out
            }
            Self::Sized => data.to_vec(),
        }
    }

    /// Decode a locked block's bytes back into caller bytes.
    fn decode(self, raw: &[u8]) -> Vec<u8> {
        match self {
            Self::Utf16Text => {
                let units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .take_while(|&unit| unit != 0)
                    .collect();
                String::from_utf16_lossy(&units).into_bytes()
            }
            Self::NulTerminated => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                raw[..end].to_vec()
            }
            Self::Sized => raw.to_vec(),
        }
    }
}

/// A locked movable block. Unlocks exactly once, on [`unlock`] or drop.
///
/// [`unlock`]: LockedBlock::unlock
pub struct LockedBlock<'a, A: NativeApi + ?Sized> {
    api: &'a A,
    handle: &'a MemHandle,
    ptr: NonNull<u8>,
    len: usize,
    locked: bool,
}

impl<'a, A: NativeApi + ?Sized> LockedBlock<'a, A> {
    /// Lock `handle` and capture its current size.
    pub fn lock(api: &'a A, handle: &'a MemHandle) -> Result<Self, ClipboardError> {
        let len = api
            .size(handle)
            .map_err(|e| ClipboardError::memory("size", e))?;
        let raw = api
            .lock(handle)
            .map_err(|e| ClipboardError::memory("lock", e))?;
        let ptr = NonNull::new(raw)
            .ok_or_else(|| ClipboardError::memory("lock", NativeError::new("GlobalLock", 0)))?;

        Ok(Self {
            api,
            handle,
            ptr,
            len,
            locked: true,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the OS guarantees `len` bytes at `ptr` while the block
        // stays locked, and the lock lives as long as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` makes this the only view.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Unlock now and report failure.
    pub fn unlock(mut self) -> Result<(), ClipboardError> {
        self.locked = false;
        self.api
            .unlock(self.handle)
            .map_err(|e| ClipboardError::memory("unlock", e))
    }
}

impl<A: NativeApi + ?Sized> Drop for LockedBlock<'_, A> {
    fn drop(&mut self) {
        if self.locked
            && let Err(e) = self.api.unlock(self.handle)
        {
            tracing::warn!(error = %e, "unlock on early return failed");
        }
    }
}

/// Allocate a block holding `data` in `layout`'s representation.
///
/// The block is freed on any failure after allocation. On success the
/// caller owns the handle until it is handed to the clipboard store.
/// Callers run [`BlockLayout::check`] first; an empty sized payload
/// would read back as the OS's one-byte minimum block.
pub fn write_block(
    api: &(impl NativeApi + ?Sized),
    layout: BlockLayout,
    data: &[u8],
) -> Result<MemHandle, ClipboardError> {
    let encoded = layout.encode(data);
    let handle = api
        .alloc(encoded.len())
        .map_err(|e| ClipboardError::memory("alloc", e))?;

    if let Err(e) = fill_block(api, &handle, &encoded) {
        free_quietly(api, handle);
        return Err(e);
    }
    Ok(handle)
}

fn fill_block(
    api: &(impl NativeApi + ?Sized),
    handle: &MemHandle,
    encoded: &[u8],
) -> Result<(), ClipboardError> {
    let mut block = LockedBlock::lock(api, handle)?;
    if block.len < encoded.len() {
        return Err(ClipboardError::memory(
            "copy",
            NativeError::new("GlobalSize", 0),
        ));
    }
    block.as_mut_slice()[..encoded.len()].copy_from_slice(encoded);
    block.unlock()
}

/// Copy the contents of an OS-owned block out in `layout`'s convention.
pub fn read_block(
    api: &(impl NativeApi + ?Sized),
    layout: BlockLayout,
    handle: &MemHandle,
) -> Result<Vec<u8>, ClipboardError> {
    let block = LockedBlock::lock(api, handle)?;
    let data = layout.decode(block.as_slice());
    block.unlock()?;
    Ok(data)
}

/// Free a block the process still owns, logging failure.
pub(crate) fn free_quietly(api: &(impl NativeApi + ?Sized), handle: MemHandle) {
    if let Err(e) = api.free(handle) {
        tracing::warn!(error = %e, "failed to free clipboard block");
    }
}
