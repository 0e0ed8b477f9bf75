//! Per-signature generated functions: call-site trampolines and the
//! re-specializing thunks that recover concrete types from an erased call.
//!
//! Everything here is generated once per distinct
//! `(is_instance, ReturnType, ArgTypes...)` instantiation, so each function
//! is a plain function pointer with no captured state — the property the
//! module-boundary ABI depends on.

use std::ffi::c_void;
use std::ptr;

use crate::context::InvocationContext;
use crate::env;
use crate::hook::{InstanceHolder, StaticHolder};
use crate::marshal::{for_each_arity, ArgPack, Marshal};
use crate::storage::InvocationStorage;
use crate::types::Receiver;

/// Shared body of every call-site trampoline: pack the native arguments into
/// fresh storage, build a context bound to the process-wide runtime handle,
/// hand the chain to the dispatcher, and extract the (possibly modified)
/// typed return for the original caller.
pub(crate) unsafe fn run_chain<R: Marshal, A: ArgPack>(receiver: *mut c_void, args: A) -> R {
    let env = env::env_for_call();
    let storage = InvocationStorage::for_call::<R, A>(args);
    let mut ctx = InvocationContext::new(env.runtime(), storage);
    (env.vtable().invoke_chain)(&mut ctx as *mut InvocationContext, receiver);
    ctx.return_value::<R>()
}

/// The native calling shapes of one argument list: its two call-site
/// trampolines and the casts back to the true original-function signatures.
///
/// Like [`ArgPack`], implemented per tuple arity; the two traits split
/// marshaling (what the buffer looks like) from invocation (what the native
/// frames look like).
pub trait CallShape: ArgPack {
    /// Address of the instance-call trampoline for return type `R`, suitable
    /// for installing as the hooked method's entry point.
    #[doc(hidden)]
    fn instance_trampoline<R: Marshal>() -> *mut c_void;

    /// Address of the static-call trampoline for return type `R`.
    #[doc(hidden)]
    fn static_trampoline<R: Marshal>() -> *mut c_void;

    /// Call `original` as `extern "C" fn(receiver, args...) -> R`.
    ///
    /// # Safety
    /// `original` must be the pre-hook entry point of a method with exactly
    /// this signature.
    #[doc(hidden)]
    unsafe fn call_original_instance<R: Marshal>(
        original: *mut c_void,
        receiver: *mut c_void,
        args: Self,
    ) -> R;

    /// Call `original` as `extern "C" fn(args...) -> R`.
    ///
    /// # Safety
    /// As [`CallShape::call_original_instance`], minus the receiver.
    #[doc(hidden)]
    unsafe fn call_original_static<R: Marshal>(original: *mut c_void, args: Self) -> R;
}

macro_rules! impl_call_shape {
    ($($A:ident $idx:tt),*) => {
        impl<$($A: Marshal),*> CallShape for ($($A,)*) {
            fn instance_trampoline<R: Marshal>() -> *mut c_void {
                // Address must stay stable once installed as the hooked
                // entry point.
                #[inline(never)]
                #[allow(non_snake_case)]
                unsafe extern "C" fn trampoline<R: Marshal, $($A: Marshal),*>(
                    receiver: *mut c_void,
                    $($A: $A),*
                ) -> R {
                    run_chain::<R, ($($A,)*)>(receiver, ($($A,)*))
                }
                let f: unsafe extern "C" fn(*mut c_void $(, $A)*) -> R =
                    trampoline::<R $(, $A)*>;
                f as *mut c_void
            }

            fn static_trampoline<R: Marshal>() -> *mut c_void {
                #[inline(never)]
                #[allow(non_snake_case)]
                unsafe extern "C" fn trampoline<R: Marshal, $($A: Marshal),*>(
                    $($A: $A),*
                ) -> R {
                    run_chain::<R, ($($A,)*)>(ptr::null_mut(), ($($A,)*))
                }
                let f: unsafe extern "C" fn($($A),*) -> R = trampoline::<R $(, $A)*>;
                f as *mut c_void
            }

            unsafe fn call_original_instance<R: Marshal>(
                original: *mut c_void,
                receiver: *mut c_void,
                args: Self,
            ) -> R {
                let f: unsafe extern "C" fn(*mut c_void $(, $A)*) -> R =
                    std::mem::transmute(original);
                let _ = &args;
                f(receiver $(, args.$idx)*)
            }

            unsafe fn call_original_static<R: Marshal>(original: *mut c_void, args: Self) -> R {
                let f: unsafe extern "C" fn($($A),*) -> R = std::mem::transmute(original);
                let _ = &args;
                f($(args.$idx),*)
            }
        }
    };
}
for_each_arity!(impl_call_shape);

/// Re-specializing thunk: call an instance-call node's callback with
/// concrete types recovered from the context. Held as a plain function
/// pointer in the [`CallRecord`](crate::CallRecord); the dispatcher calls it
/// knowing nothing about the argument types.
///
/// # Safety
/// `ctx` must be the live context of a call whose storage was packed with
/// `A`; `payload` must be the payload of a node registered with the same
/// instantiation.
pub(crate) unsafe extern "C" fn invoke_instance_node<A: ArgPack>(
    ctx: *mut InvocationContext,
    receiver: *mut c_void,
    payload: *mut c_void,
) {
    let ctx = &*ctx;
    let holder = &*(payload as *const InstanceHolder<A>);
    let args = A::unpack(ctx);
    (holder.callback)(ctx, Receiver::from_raw(receiver), args);
}

/// Re-specializing thunk for a static-call node. The receiver slot is part
/// of the uniform thunk shape and ignored here.
///
/// # Safety
/// As [`invoke_instance_node`].
pub(crate) unsafe extern "C" fn invoke_static_node<A: ArgPack>(
    ctx: *mut InvocationContext,
    receiver: *mut c_void,
    payload: *mut c_void,
) {
    let _ = receiver;
    let ctx = &*ctx;
    let holder = &*(payload as *const StaticHolder<A>);
    let args = A::unpack(ctx);
    (holder.callback)(ctx, args);
}

/// Re-specializing thunk: call the pre-hook original function with the
/// marshaled (possibly hook-modified) arguments and write its return into
/// the context unconditionally. A `()` return suppresses the write.
///
/// # Safety
/// `ctx` as [`invoke_instance_node`]; `original` must be the method's
/// pre-hook entry point with exactly this signature.
pub(crate) unsafe extern "C" fn invoke_instance_original<R: Marshal, A: CallShape>(
    ctx: *mut InvocationContext,
    receiver: *mut c_void,
    original: *mut c_void,
) {
    let ctx = &*ctx;
    let args = A::unpack(ctx);
    let ret: R = A::call_original_instance::<R>(original, receiver, args);
    ctx.set_return(ret);
}

/// Static-call counterpart of [`invoke_instance_original`].
///
/// # Safety
/// As [`invoke_instance_original`].
pub(crate) unsafe extern "C" fn invoke_static_original<R: Marshal, A: CallShape>(
    ctx: *mut InvocationContext,
    receiver: *mut c_void,
    original: *mut c_void,
) {
    let _ = receiver;
    let ctx = &*ctx;
    let args = A::unpack(ctx);
    let ret: R = A::call_original_static::<R>(original, args);
    ctx.set_return(ret);
}
