//! Graft SDK - write extension modules that intercept managed-runtime
//! method calls
//!
//! An extension module registers callbacks against methods of the managed
//! runtime embedded in the host process; many modules' callbacks compose
//! into one ordered chain per method without any module knowing about the
//! others. Concrete native signatures are erased into a small, fixed set of
//! function-pointer shapes that stay binary-compatible across independently
//! compiled modules, and are re-specialized back into type-safe calls at the
//! two points that need concrete types: registration and invocation.
//!
//! # Example
//!
//! ```no_run
//! use graft_sdk::{InvocationContext, Phase};
//!
//! // `Score.Add(int)` returns its argument plus one, unless the chain
//! // stops earlier.
//! graft_sdk::bind_static_function(
//!     "Game",
//!     "Score",
//!     "Add",
//!     Phase::Before,
//!     |_ctx: &InvocationContext, x: i32| -> Option<i32> { Some(x + 1) },
//! )?;
//! # Ok::<(), graft_sdk::AbiError>(())
//! ```
//!
//! # Boundaries
//!
//! This crate owns marshaling, signature validation, the generated
//! trampolines/thunks, and the [`CallRecord`] contract. The chain-walking
//! dispatcher, the reflection layer behind [`RuntimeHandle`], and process
//! attachment live on the host side; the SDK reaches them only through the
//! [`HostVtable`] handed to [`init`].
//!
//! # Lifetime
//!
//! Registered hooks live until process exit by design — the dispatcher may
//! reference them at any future time, so there is no unregistration path.

#![warn(missing_docs)]

mod binder;
mod binding;
mod context;
mod env;
mod error;
mod hook;
mod invoke;
mod marshal;
mod record;
mod storage;
mod types;
mod version;

pub use binder::{HookReturn, InstanceHook, StaticHook};
pub use binding::{
    bind_class_function, bind_class_function_with_priority, bind_static_function,
    bind_static_function_with_priority, DEFAULT_PRIORITY,
};
pub use context::InvocationContext;
pub use env::{init, is_initialized};
pub use error::{AbiError, AbiResult};
pub use hook::HookNode;
pub use invoke::CallShape;
pub use marshal::{ArgPack, Marshal};
pub use record::{
    CallRecord, HostVtable, InvokeChainFn, InvokeNodeFn, InvokeOriginalFn, RegisterHookFn,
    RuntimeHandleFn,
};
pub use storage::InvocationStorage;
pub use types::{ClassHandle, Phase, Receiver, RuntimeHandle};
pub use version::{BindingVersion, ModDeclaration, BINDING_VERSION};
