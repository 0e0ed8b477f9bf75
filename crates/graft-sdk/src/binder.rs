//! Compile-time signature validation and canonicalization of hook callbacks.
//!
//! A callback registers through one of two canonical families:
//!
//! - instance-call: `Fn(&InvocationContext, Receiver, Args...) -> R`
//! - static-call: `Fn(&InvocationContext, Args...) -> R`
//!
//! where `R` is `()` or `Option<T>`. The three checks the original contract
//! names — context first, receiver second for instance calls, return shape —
//! are each enforced by trait resolution here, before a hook node is ever
//! constructed. A callback that fails them never reaches the registration
//! path, so a malformed signature can never corrupt a
//! [`CallRecord`](crate::CallRecord).

use crate::context::InvocationContext;
use crate::marshal::{for_each_arity, ArgPack, Marshal};
use crate::types::Receiver;

mod sealed {
    pub trait Sealed {}
}

/// Valid hook return shapes: `()` or `Option<T: Marshal>`.
///
/// `Some(v)` overrides the call's current return value; `None` leaves
/// whatever the previous hook (or the original function) produced — that is
/// how a hook passes through without altering the result. `()` never touches
/// the slot.
#[diagnostic::on_unimplemented(
    message = "invalid hook signature: `{Self}` is not a valid hook return type",
    note = "hooks must return `()` or `Option<T>` where `T` is the intercepted method's return type"
)]
pub trait HookReturn: sealed::Sealed + 'static {
    /// The intercepted method's native return type.
    type Native: Marshal;

    /// Fold this return into the context's return slot.
    fn store(self, ctx: &InvocationContext);
}

impl sealed::Sealed for () {}

impl HookReturn for () {
    type Native = ();

    fn store(self, _ctx: &InvocationContext) {}
}

impl<T: Marshal> sealed::Sealed for Option<T> {}

impl<T: Marshal> HookReturn for Option<T> {
    type Native = T;

    fn store(self, ctx: &InvocationContext) {
        if let Some(value) = self {
            ctx.set_return(value);
        }
    }
}

/// Canonical instance-call hook: context first, receiver second, then the
/// intercepted method's arguments.
#[diagnostic::on_unimplemented(
    message = "invalid hook signature for an instance-call binding",
    note = "the first parameter must be `&InvocationContext`",
    note = "the second parameter must be `Receiver`",
    note = "the return type must be `()` or `Option<T>`"
)]
pub trait InstanceHook<A: ArgPack>: Send + Sync + 'static {
    /// Native return type of the intercepted method.
    type Native: Marshal;

    /// Run the callback and fold its return into the context.
    fn invoke(&self, ctx: &InvocationContext, receiver: Receiver, args: A);
}

/// Canonical static-call hook: context first, then the intercepted method's
/// arguments.
#[diagnostic::on_unimplemented(
    message = "invalid hook signature for a static-call binding",
    note = "the first parameter must be `&InvocationContext`",
    note = "the return type must be `()` or `Option<T>`"
)]
pub trait StaticHook<A: ArgPack>: Send + Sync + 'static {
    /// Native return type of the intercepted method.
    type Native: Marshal;

    /// Run the callback and fold its return into the context.
    fn invoke(&self, ctx: &InvocationContext, args: A);
}

macro_rules! impl_hook_families {
    ($($A:ident $idx:tt),*) => {
        impl<F, R, $($A: Marshal),*> InstanceHook<($($A,)*)> for F
        where
            F: Fn(&InvocationContext, Receiver $(, $A)*) -> R + Send + Sync + 'static,
            R: HookReturn,
        {
            type Native = R::Native;

            fn invoke(&self, ctx: &InvocationContext, receiver: Receiver, args: ($($A,)*)) {
                let _ = &args;
                (self)(ctx, receiver $(, args.$idx)*).store(ctx);
            }
        }

        impl<F, R, $($A: Marshal),*> StaticHook<($($A,)*)> for F
        where
            F: Fn(&InvocationContext $(, $A)*) -> R + Send + Sync + 'static,
            R: HookReturn,
        {
            type Native = R::Native;

            fn invoke(&self, ctx: &InvocationContext, args: ($($A,)*)) {
                let _ = &args;
                (self)(ctx $(, args.$idx)*).store(ctx);
            }
        }
    };
}
for_each_arity!(impl_hook_families);
