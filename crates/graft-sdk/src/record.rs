//! The module-boundary ABI contract: the call record a registration hands to
//! the external dispatcher, the host vtable the SDK imports, and the
//! function-pointer shapes both sides call through.
//!
//! Every layout in this file is byte-exact by contract. The const assertions
//! turn any drift into a build failure; the version field carried in every
//! record is the runtime mitigation for modules built against different SDK
//! revisions (a dispatcher must refuse records whose major version it does
//! not understand).

use std::ffi::{c_char, c_void};
use std::mem;

use crate::context::InvocationContext;
use crate::hook::HookNode;
use crate::types::{ClassHandle, RuntimeHandle};
use crate::version::BindingVersion;

/// Dispatcher entry point: runs the full hook chain for the method whose
/// trampoline built `ctx`, honoring the two-convention contract
/// ([`InvokeNodeFn`]/[`InvokeOriginalFn`]). `receiver` is null for static
/// calls.
pub type InvokeChainFn = unsafe extern "C" fn(ctx: *mut InvocationContext, receiver: *mut c_void);

/// Host accessor for the process-wide runtime-bridge handle. Resolved once
/// during [`init`](crate::init) and cached.
pub type RuntimeHandleFn = unsafe extern "C" fn() -> *const RuntimeHandle;

/// Host registration entry point: installs a hook against the method named
/// by `(namespace, class, method, arg_count)`. The host copies the record;
/// the pointer is only valid for the duration of the call.
pub type RegisterHookFn = unsafe extern "C" fn(
    namespace_name: *const c_char,
    class_name: *const c_char,
    method_name: *const c_char,
    arg_count: u32,
    record: *const CallRecord,
);

/// Re-specializing thunk for one hook node: recovers the concrete argument
/// types from `ctx`, calls the node's callback, and writes a present
/// optional return back into the context. The dispatcher calls this without
/// knowing any argument type.
pub type InvokeNodeFn =
    unsafe extern "C" fn(ctx: *mut InvocationContext, receiver: *mut c_void, payload: *mut c_void);

/// Re-specializing thunk for the original function: casts `original` back to
/// its true native signature, calls it with the marshaled arguments, and
/// writes its return into the context unconditionally.
pub type InvokeOriginalFn =
    unsafe extern "C" fn(ctx: *mut InvocationContext, receiver: *mut c_void, original: *mut c_void);

/// The three entry points a module imports from its host environment.
///
/// Declared layout: chain invoker (0), runtime-handle accessor (8),
/// registration function (16).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HostVtable {
    /// Runs a method's full hook chain
    pub invoke_chain: InvokeChainFn,
    /// Returns the process-wide runtime handle
    pub runtime_handle: RuntimeHandleFn,
    /// Installs one registration
    pub register_hook: RegisterHookFn,
}

const _: () = {
    assert!(mem::offset_of!(HostVtable, invoke_chain) == 0);
    assert!(mem::offset_of!(HostVtable, runtime_handle) == 8);
    assert!(mem::offset_of!(HostVtable, register_hook) == 16);
};

/// The descriptor one registration produces and hands across the module
/// boundary.
///
/// The dispatcher appends `node` to the chain for the named method (never
/// replaces it — registrations against one method coexist), installs the
/// trampoline as the method's entry point, and fills `original_fn` with the
/// pre-hook entry point before any chain invocation occurs.
///
/// Declared layout: original_fn (0), trampoline (8), node (16), class (24),
/// id (32), invoke_node (40), invoke_original (48), version (56).
#[repr(C)]
pub struct CallRecord {
    /// The intercepted method's pre-hook entry point; null until the
    /// dispatcher installs it
    pub original_fn: *mut c_void,
    /// Generated call-site trampoline for this signature
    pub trampoline: *mut c_void,
    /// Head of the chain contribution: the node this registration created
    pub node: *mut HookNode,
    /// Owning class handle; null until the dispatcher resolves the method
    pub class: *const ClassHandle,
    /// Process-unique registration id
    pub id: u64,
    /// Thunk that can call any node of this signature
    pub invoke_node: InvokeNodeFn,
    /// Thunk that can call the original function of this signature
    pub invoke_original: InvokeOriginalFn,
    /// Binding version the producing module was compiled against
    pub version: BindingVersion,
}

const _: () = {
    assert!(mem::offset_of!(CallRecord, original_fn) == 0);
    assert!(mem::offset_of!(CallRecord, trampoline) == 8);
    assert!(mem::offset_of!(CallRecord, node) == 16);
    assert!(mem::offset_of!(CallRecord, class) == 24);
    assert!(mem::offset_of!(CallRecord, id) == 32);
    assert!(mem::offset_of!(CallRecord, invoke_node) == 40);
    assert!(mem::offset_of!(CallRecord, invoke_original) == 48);
    assert!(mem::offset_of!(CallRecord, version) == 56);
    assert!(mem::size_of::<CallRecord>() == 72);
};
