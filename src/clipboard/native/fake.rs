//! In-memory stand-in for the OS clipboard, for tests.
//!
//! Models the pieces the bridge depends on: exclusive ownership, an
//! ordered format store, movable blocks with lock counts and an
//! ownership flag, and systemwide format registration. Allocation rounds
//! like `GlobalAlloc`: never below one byte, optionally padded. Individual
//! calls can be made to fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{FormatId, MemHandle, NativeApi, NativeError};

const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_HANDLE: u32 = 6;
const ERROR_NOT_LOCKED: u32 = 158;
const ERROR_CLIPBOARD_NOT_OPEN: u32 = 1418;
const INJECTED: u32 = 31;

struct Block {
    data: Box<[u8]>,
    locks: u32,
    os_owned: bool,
}

#[derive(Default)]
struct FakeState {
    blocks: HashMap<usize, Block>,
    next_handle: usize,
    store: Vec<(FormatId, usize)>,
    registered: HashMap<String, FormatId>,
    registrations: Vec<String>,
    next_format: FormatId,
    alloc_padding: usize,
    open: bool,
    held_elsewhere: bool,
    overlap: bool,
    opens: usize,
    closes: usize,
    failing_calls: HashSet<&'static str>,
    failing_registrations: HashSet<String>,
    sets_before_failure: Option<usize>,
}

impl FakeState {
    fn check(&self, call: &'static str) -> Result<(), NativeError> {
        if self.failing_calls.contains(call) {
            Err(NativeError::new(call, INJECTED))
        } else {
            Ok(())
        }
    }

    fn require_open(&self, call: &'static str) -> Result<(), NativeError> {
        self.check(call)?;
        if self.open {
            Ok(())
        } else {
            Err(NativeError::new(call, ERROR_CLIPBOARD_NOT_OPEN))
        }
    }

    fn block_mut(
        &mut self,
        call: &'static str,
        handle: &MemHandle,
    ) -> Result<&mut Block, NativeError> {
        self.blocks
            .get_mut(&handle.0)
            .ok_or(NativeError::new(call, ERROR_INVALID_HANDLE))
    }

    fn insert_block(&mut self, data: Box<[u8]>, os_owned: bool) -> usize {
        self.next_handle += 1;
        self.blocks.insert(
            self.next_handle,
            Block {
                data,
                locks: 0,
                os_owned,
            },
        );
        self.next_handle
    }
}

/// Simulated OS clipboard implementing [`NativeApi`].
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_format: 0xC001,
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Make every call to `call` fail from now on.
    pub fn fail_call(&self, call: &'static str) {
        self.state().failing_calls.insert(call);
    }

    pub fn fail_register(&self, name: &str) {
        self.state().failing_registrations.insert(name.to_string());
    }

    /// Let `count` more `set_data` calls succeed, then fail the rest.
    pub fn fail_set_after(&self, count: usize) {
        self.state().sets_before_failure = Some(count);
    }

    /// Report every later block as `extra` bytes larger than requested,
    /// as `GlobalSize` is allowed to.
    pub fn pad_allocations(&self, extra: usize) {
        self.state().alloc_padding = extra;
    }

    /// Simulate another application holding the clipboard.
    pub fn hold_elsewhere(&self, held: bool) {
        self.state().held_elsewhere = held;
    }

    /// Put raw bytes on the clipboard as if another application had.
    pub fn seed(&self, format: FormatId, data: Vec<u8>) {
        let mut state = self.state();
        let raw = state.insert_block(data.into_boxed_slice(), true);
        state.store.push((format, raw));
    }

    /// Raw bytes stored under `format`.
    pub fn stored(&self, format: FormatId) -> Option<Vec<u8>> {
        let state = self.state();
        let (_, raw) = state.store.iter().find(|(id, _)| *id == format)?;
        state.blocks.get(raw).map(|b| b.data.to_vec())
    }

    pub fn block_bytes(&self, handle: &MemHandle) -> Option<Vec<u8>> {
        self.state().blocks.get(&handle.0).map(|b| b.data.to_vec())
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Number of `register_format` calls made.
    pub fn registrations(&self) -> usize {
        self.state().registrations.len()
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.state().registrations.clone()
    }

    /// Whether an open was attempted while this process already held
    /// the clipboard.
    pub fn saw_overlap(&self) -> bool {
        self.state().overlap
    }

    pub fn all_unlocked(&self) -> bool {
        self.state().blocks.values().all(|b| b.locks == 0)
    }

    /// Blocks allocated by the process and never handed to the store.
    pub fn live_blocks_owned_by_process(&self) -> usize {
        self.state().blocks.values().filter(|b| !b.os_owned).count()
    }
}

impl NativeApi for FakeApi {
    fn open_clipboard(&self) -> Result<(), NativeError> {
        let mut state = self.state();
        state.check("OpenClipboard")?;
        if state.open {
            state.overlap = true;
            return Err(NativeError::new("OpenClipboard", ERROR_ACCESS_DENIED));
        }
        if state.held_elsewhere {
            return Err(NativeError::new("OpenClipboard", ERROR_ACCESS_DENIED));
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    fn close_clipboard(&self) -> Result<(), NativeError> {
        let mut state = self.state();
        state.require_open("CloseClipboard")?;
        state.open = false;
        state.closes += 1;
        Ok(())
    }

    fn empty_clipboard(&self) -> Result<(), NativeError> {
        let mut state = self.state();
        state.require_open("EmptyClipboard")?;
        let stored = std::mem::take(&mut state.store);
        for (_, raw) in stored {
            state.blocks.remove(&raw);
        }
        Ok(())
    }

    fn enum_formats(&self, previous: FormatId) -> Result<FormatId, NativeError> {
        let state = self.state();
        state.require_open("EnumClipboardFormats")?;
        let next = if previous == 0 {
            state.store.first()
        } else {
            state
                .store
                .iter()
                .position(|(id, _)| *id == previous)
                .and_then(|i| state.store.get(i + 1))
        };
        Ok(next.map_or(0, |(id, _)| *id))
    }

    fn get_data(&self, format: FormatId) -> Result<MemHandle, NativeError> {
        let state = self.state();
        state.require_open("GetClipboardData")?;
        state
            .store
            .iter()
            .find(|(id, _)| *id == format)
            .map(|&(_, raw)| MemHandle(raw))
            .ok_or(NativeError::new("GetClipboardData", ERROR_INVALID_HANDLE))
    }

    fn set_data(&self, format: FormatId, handle: &MemHandle) -> Result<(), NativeError> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.require_open("SetClipboardData")?;
        match state.sets_before_failure {
            Some(0) => return Err(NativeError::new("SetClipboardData", INJECTED)),
            Some(n) => state.sets_before_failure = Some(n - 1),
            None => {}
        }

        let block = state.block_mut("SetClipboardData", handle)?;
        if block.os_owned || block.locks != 0 {
            return Err(NativeError::new("SetClipboardData", ERROR_INVALID_HANDLE));
        }
        block.os_owned = true;

        if let Some(slot) = state.store.iter_mut().find(|(id, _)| *id == format) {
            let old = std::mem::replace(&mut slot.1, handle.0);
            state.blocks.remove(&old);
        } else {
            state.store.push((format, handle.0));
        }
        Ok(())
    }

    fn register_format(&self, name: &str) -> Result<FormatId, NativeError> {
        let mut state = self.state();
        state.check("RegisterClipboardFormatW")?;
        state.registrations.push(name.to_string());
        if state.failing_registrations.contains(name) {
            return Err(NativeError::new("RegisterClipboardFormatW", INJECTED));
        }
        if let Some(&id) = state.registered.get(name) {
            return Ok(id);
        }
        let id = state.next_format;
        state.next_format += 1;
        state.registered.insert(name.to_string(), id);
        Ok(id)
    }

    fn alloc(&self, size: usize) -> Result<MemHandle, NativeError> {
        let mut state = self.state();
        state.check("GlobalAlloc")?;
        let size = size.max(1) + state.alloc_padding;
        let raw = state.insert_block(vec![0u8; size].into_boxed_slice(), false);
        Ok(MemHandle(raw))
    }

    fn lock(&self, handle: &MemHandle) -> Result<*mut u8, NativeError> {
        let mut state = self.state();
        state.check("GlobalLock")?;
        let block = state.block_mut("GlobalLock", handle)?;
        block.locks += 1;
        Ok(block.data.as_mut_ptr())
    }

    fn unlock(&self, handle: &MemHandle) -> Result<(), NativeError> {
        let mut state = self.state();
        state.check("GlobalUnlock")?;
        let block = state.block_mut("GlobalUnlock", handle)?;
        if block.locks == 0 {
            return Err(NativeError::new("GlobalUnlock", ERROR_NOT_LOCKED));
        }
        block.locks -= 1;
        Ok(())
    }

    fn size(&self, handle: &MemHandle) -> Result<usize, NativeError> {
        let mut state = self.state();
        state.check("GlobalSize")?;
        Ok(state.block_mut("GlobalSize", handle)?.data.len())
    }

    fn free(&self, handle: MemHandle) -> Result<(), NativeError> {
        let mut state = self.state();
        state.check("GlobalFree")?;
        let ours = state.blocks.get(&handle.0).is_some_and(|b| !b.os_owned);
        if !ours {
            return Err(NativeError::new("GlobalFree", ERROR_INVALID_HANDLE));
        }
        state.blocks.remove(&handle.0);
        Ok(())
    }
}
