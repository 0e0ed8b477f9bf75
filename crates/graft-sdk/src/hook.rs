//! Hook nodes — one registered callback each, linked into per-method chains.
//!
//! The node is the ABI-stable part: an intrusive singly linked list cell the
//! external dispatcher threads into the right method's chain. The payload it
//! points at is opaque outside the module that registered it; only the
//! matching re-specializing thunks in [`invoke`](crate::invoke) know its
//! real type.
//!
//! Nodes and payloads are created at registration time and adopted by the
//! process-wide arena; chains are additive for the life of the process, so
//! nothing here is ever freed.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use crate::binder::{InstanceHook, StaticHook};
use crate::context::InvocationContext;
use crate::marshal::ArgPack;
use crate::types::{Phase, Receiver};

/// One registered hook in a method's chain.
///
/// Declared layout: next (0), phase (8), priority (12), payload (16). Fields
/// are public because the external dispatcher partitions chains by phase and
/// orders them by priority; ordering direction and tie-break are dispatcher
/// policy, this core only guarantees the two fields are there to sort on.
#[repr(C)]
#[derive(Debug)]
pub struct HookNode {
    /// Next node in the chain; the dispatcher owns the linking
    pub next: *mut HookNode,
    /// When the callback runs relative to the original function
    pub phase: Phase,
    /// Orderable within a phase; default 0
    pub priority: i32,
    /// Type-erased callback holder; only the record's thunks may touch it
    pub payload: *mut c_void,
}

const _: () = {
    assert!(mem::offset_of!(HookNode, next) == 0);
    assert!(mem::offset_of!(HookNode, phase) == 8);
    assert!(mem::offset_of!(HookNode, priority) == 12);
    assert!(mem::offset_of!(HookNode, payload) == 16);
    assert!(mem::size_of::<HookNode>() == 24);
};

/// Payload behind an instance-call node: the callback with its return
/// handling already folded in.
pub(crate) struct InstanceHolder<A: ArgPack> {
    pub(crate) callback: Box<dyn Fn(&InvocationContext, Receiver, A) + Send + Sync>,
}

/// Payload behind a static-call node.
pub(crate) struct StaticHolder<A: ArgPack> {
    pub(crate) callback: Box<dyn Fn(&InvocationContext, A) + Send + Sync>,
}

fn new_node(phase: Phase, priority: i32, payload: *mut c_void) -> *mut HookNode {
    Box::into_raw(Box::new(HookNode {
        next: ptr::null_mut(),
        phase,
        priority,
        payload,
    }))
}

/// Allocate the type-erased holder and node for an instance-call hook.
/// The caller (binding facade) hands the node to the arena and the
/// dispatcher; neither allocation is ever freed.
pub(crate) fn new_instance_node<A: ArgPack, F: InstanceHook<A>>(
    hook: F,
    phase: Phase,
    priority: i32,
) -> *mut HookNode {
    let holder: Box<InstanceHolder<A>> = Box::new(InstanceHolder {
        callback: Box::new(move |ctx, receiver, args| hook.invoke(ctx, receiver, args)),
    });
    new_node(phase, priority, Box::into_raw(holder) as *mut c_void)
}

/// Allocate the type-erased holder and node for a static-call hook.
pub(crate) fn new_static_node<A: ArgPack, F: StaticHook<A>>(
    hook: F,
    phase: Phase,
    priority: i32,
) -> *mut HookNode {
    let holder: Box<StaticHolder<A>> = Box::new(StaticHolder {
        callback: Box::new(move |ctx, args| hook.invoke(ctx, args)),
    });
    new_node(phase, priority, Box::into_raw(holder) as *mut c_void)
}
