//! Registration facade — the only entry points an extension module uses.
//!
//! Each binding validates the callback signature at compile time, allocates
//! the hook node, assembles the [`CallRecord`] for this signature, and hands
//! everything to the host's registration function. Multiple registrations
//! against the same method coexist; the dispatcher appends, never replaces.
//!
//! ```no_run
//! use graft_sdk::{InvocationContext, Phase, Receiver};
//!
//! // Cap incoming damage at 10.
//! graft_sdk::bind_class_function(
//!     "Game",
//!     "Player",
//!     "TakeDamage",
//!     Phase::Before,
//!     |ctx: &InvocationContext, _this: Receiver, amount: f32| -> Option<f32> {
//!         if amount > 10.0 {
//!             ctx.set_arg(0, 10.0f32).ok()?;
//!         }
//!         None // pass through to the original
//!     },
//! )?;
//! # Ok::<(), graft_sdk::AbiError>(())
//! ```
//!
//! A callback whose first parameter is not `&InvocationContext` is rejected
//! at compile time:
//!
//! ```compile_fail
//! use graft_sdk::Phase;
//!
//! fn wrong_first(x: i32) -> Option<i32> {
//!     Some(x + 1)
//! }
//! let _ = graft_sdk::bind_static_function("Game", "Score", "Add", Phase::Before, wrong_first);
//! ```
//!
//! So is an instance-call callback missing the `Receiver` second parameter:
//!
//! ```compile_fail
//! use graft_sdk::{InvocationContext, Phase};
//!
//! fn no_receiver(_ctx: &InvocationContext, x: i32) -> Option<i32> {
//!     Some(x)
//! }
//! let _ = graft_sdk::bind_class_function("Game", "Score", "Add", Phase::Before, no_receiver);
//! ```
//!
//! And so is a return type that is neither `()` nor `Option<T>`:
//!
//! ```compile_fail
//! use graft_sdk::{InvocationContext, Phase};
//!
//! fn bare_return(_ctx: &InvocationContext, x: i32) -> i32 {
//!     x
//! }
//! let _ = graft_sdk::bind_static_function("Game", "Score", "Add", Phase::Before, bare_return);
//! ```

use std::ffi::{c_void, CString};
use std::ptr;

use crate::binder::{InstanceHook, StaticHook};
use crate::env;
use crate::error::{AbiError, AbiResult};
use crate::hook::{new_instance_node, new_static_node, HookNode};
use crate::invoke::{
    invoke_instance_node, invoke_instance_original, invoke_static_node, invoke_static_original,
    CallShape,
};
use crate::record::{CallRecord, InvokeNodeFn, InvokeOriginalFn};
use crate::types::Phase;
use crate::version::BINDING_VERSION;

/// Priority used by the convenience bindings.
pub const DEFAULT_PRIORITY: i32 = 0;

fn to_cstring(name: &str) -> AbiResult<CString> {
    CString::new(name).map_err(|_| AbiError::InvalidName(name.to_owned()))
}

/// Validated method coordinates. Built before any allocation a failed
/// binding could strand in the arena.
struct Target {
    namespace: CString,
    class: CString,
    method: CString,
}

impl Target {
    fn new(namespace_name: &str, class_name: &str, method_name: &str) -> AbiResult<Self> {
        Ok(Target {
            namespace: to_cstring(namespace_name)?,
            class: to_cstring(class_name)?,
            method: to_cstring(method_name)?,
        })
    }
}

/// Everything after signature validation is identical for both families.
fn register(
    target: Target,
    arg_count: u32,
    node: *mut HookNode,
    trampoline: *mut c_void,
    invoke_node: InvokeNodeFn,
    invoke_original: InvokeOriginalFn,
) -> AbiResult<()> {
    let env = env::env()?;
    env.arena().adopt(node);

    let record = CallRecord {
        original_fn: ptr::null_mut(),
        trampoline,
        node,
        class: ptr::null(),
        id: env.next_id(),
        invoke_node,
        invoke_original,
        version: BINDING_VERSION,
    };

    unsafe {
        (env.vtable().register_hook)(
            target.namespace.as_ptr(),
            target.class.as_ptr(),
            target.method.as_ptr(),
            arg_count,
            &record,
        );
    }
    log::debug!(
        "registered hook #{} on {}.{}::{} ({arg_count} args)",
        record.id,
        target.namespace.to_string_lossy(),
        target.class.to_string_lossy(),
        target.method.to_string_lossy(),
    );
    Ok(())
}

/// Register a hook against an instance method, with an explicit priority.
///
/// The callback must match the instance-call family:
/// `Fn(&InvocationContext, Receiver, Args...) -> ()` or `-> Option<T>`.
pub fn bind_class_function_with_priority<A, F>(
    namespace_name: &str,
    class_name: &str,
    method_name: &str,
    phase: Phase,
    priority: i32,
    callback: F,
) -> AbiResult<()>
where
    A: CallShape,
    F: InstanceHook<A>,
{
    env::env()?;
    let target = Target::new(namespace_name, class_name, method_name)?;
    let trampoline = A::instance_trampoline::<F::Native>();
    let node = new_instance_node::<A, F>(callback, phase, priority);
    register(
        target,
        A::COUNT,
        node,
        trampoline,
        invoke_instance_node::<A>,
        invoke_instance_original::<F::Native, A>,
    )
}

/// Register a hook against an instance method at [`DEFAULT_PRIORITY`].
pub fn bind_class_function<A, F>(
    namespace_name: &str,
    class_name: &str,
    method_name: &str,
    phase: Phase,
    callback: F,
) -> AbiResult<()>
where
    A: CallShape,
    F: InstanceHook<A>,
{
    bind_class_function_with_priority(
        namespace_name,
        class_name,
        method_name,
        phase,
        DEFAULT_PRIORITY,
        callback,
    )
}

/// Register a hook against a static method, with an explicit priority.
///
/// The callback must match the static-call family:
/// `Fn(&InvocationContext, Args...) -> ()` or `-> Option<T>`.
pub fn bind_static_function_with_priority<A, F>(
    namespace_name: &str,
    class_name: &str,
    method_name: &str,
    phase: Phase,
    priority: i32,
    callback: F,
) -> AbiResult<()>
where
    A: CallShape,
    F: StaticHook<A>,
{
    env::env()?;
    let target = Target::new(namespace_name, class_name, method_name)?;
    let trampoline = A::static_trampoline::<F::Native>();
    let node = new_static_node::<A, F>(callback, phase, priority);
    register(
        target,
        A::COUNT,
        node,
        trampoline,
        invoke_static_node::<A>,
        invoke_static_original::<F::Native, A>,
    )
}

/// Register a hook against a static method at [`DEFAULT_PRIORITY`].
pub fn bind_static_function<A, F>(
    namespace_name: &str,
    class_name: &str,
    method_name: &str,
    phase: Phase,
    callback: F,
) -> AbiResult<()>
where
    A: CallShape,
    F: StaticHook<A>,
{
    bind_static_function_with_priority(
        namespace_name,
        class_name,
        method_name,
        phase,
        DEFAULT_PRIORITY,
        callback,
    )
}
