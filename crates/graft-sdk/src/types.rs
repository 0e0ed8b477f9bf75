//! Handle types shared across the module boundary.
//!
//! `RuntimeHandle` and `ClassHandle` are owned by the host's reflection
//! layer; the SDK only moves pointers to them around. `Receiver` is the
//! typed view of an instance method's implicit first argument.

use std::ffi::c_void;

/// Opaque handle to the global runtime-bridge environment.
///
/// The host owns the pointee; callbacks receive a reference through
/// [`InvocationContext::global_context`](crate::InvocationContext::global_context)
/// and hand it to the reflection layer for class/field/string lookups.
/// Never constructed on this side of the boundary.
#[repr(C)]
pub struct RuntimeHandle {
    _private: [u8; 0],
}

/// Opaque handle to a managed class, owned by the host's reflection layer.
#[repr(C)]
pub struct ClassHandle {
    _private: [u8; 0],
}

/// The receiver of an instance-call hook: the managed object the intercepted
/// method was invoked on.
///
/// Null only on the static-call path, where no hook ever sees one.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receiver(*mut c_void);

impl Receiver {
    /// Wrap a raw managed-object pointer.
    pub fn from_raw(ptr: *mut c_void) -> Self {
        Receiver(ptr)
    }

    /// Raw managed-object pointer, for handing to the reflection layer.
    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    /// Whether the host passed a null object.
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// When a hook runs relative to the original function.
///
/// Exactly two values by contract; the 4-byte width is part of the
/// [`HookNode`](crate::HookNode) layout.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Run before the original function; may stop the chain
    Before = 0,
    /// Run after the original function; observes or overrides its return
    After = 1,
}
