//! Invocation context — the single object every hook receives.
//!
//! Wraps one call's [`InvocationStorage`] together with the process-wide
//! runtime-bridge handle, and carries the stop flag a Before-phase hook uses
//! to signal early termination. Created once per intercepted call at the
//! trampoline entry; destroyed when the call completes.
//!
//! # Declared layout
//!
//! Runtime-handle pointer (0), exclusively owned storage pointer (8), stop
//! flag (16).

use std::cell::Cell;
use std::mem;

use crate::error::AbiResult;
use crate::marshal::Marshal;
use crate::storage::InvocationStorage;
use crate::types::RuntimeHandle;

/// Per-call context handed to every hook and to the dispatcher.
///
/// A call executes on whatever thread the host used to make it; the context
/// never leaves that call, so the interior-mutable stop flag needs no
/// synchronization.
#[repr(C)]
pub struct InvocationContext {
    /// Non-owning; valid for the process lifetime once `init` has run
    runtime: *const RuntimeHandle,
    /// Exclusively owned; freed on drop
    storage: *mut InvocationStorage,
    /// False at creation, transitions false→true at most once, never reset
    stopped: Cell<bool>,
}

const _: () = {
    assert!(mem::offset_of!(InvocationContext, runtime) == 0);
    assert!(mem::offset_of!(InvocationContext, storage) == 8);
    assert!(mem::offset_of!(InvocationContext, stopped) == 16);
};

impl InvocationContext {
    pub(crate) fn new(runtime: *const RuntimeHandle, storage: InvocationStorage) -> Self {
        InvocationContext {
            runtime,
            storage: Box::into_raw(Box::new(storage)),
            stopped: Cell::new(false),
        }
    }

    fn storage(&self) -> &InvocationStorage {
        // Exclusively owned for the duration of the call; only freed by Drop.
        unsafe { &*self.storage }
    }

    /// The global runtime-bridge handle, for reflection calls made while a
    /// hook is running.
    pub fn global_context(&self) -> &RuntimeHandle {
        unsafe { &*self.runtime }
    }

    /// Number of arguments marshaled for this call.
    pub fn arg_count(&self) -> u32 {
        self.storage().arg_count()
    }

    /// Read argument `index` as a `T`.
    pub fn arg<T: Marshal>(&self, index: u32) -> AbiResult<T> {
        self.storage().arg(index)
    }

    /// Overwrite argument `index`; later hooks and the original function see
    /// the new value.
    pub fn set_arg<T: Marshal>(&self, index: u32, value: T) -> AbiResult<()> {
        self.storage().set_arg(index, value)
    }

    /// Read the current return value.
    pub fn return_value<T: Marshal>(&self) -> T {
        self.storage().return_value()
    }

    /// Overwrite the return value.
    pub fn set_return<T: Marshal>(&self, value: T) {
        self.storage().set_return(value)
    }

    pub(crate) unsafe fn arg_unchecked<T: Marshal>(&self, index: u32) -> T {
        self.storage().arg_unchecked(index)
    }

    /// Ask the dispatcher not to invoke the original function. Idempotent.
    pub fn stop_execution(&self) {
        self.stopped.set(true);
    }

    /// Whether a hook earlier in the chain stopped execution.
    pub fn did_stop_execution(&self) -> bool {
        self.stopped.get()
    }
}

impl Drop for InvocationContext {
    fn drop(&mut self) {
        // Reclaims the storage handed out in `new`.
        drop(unsafe { Box::from_raw(self.storage) });
    }
}
