//! Layout pinning for every ABI-crossing structure.
//!
//! These mirror the const assertions inside the crate, but run against the
//! public surface: if any offset here moves, independently compiled modules
//! stop agreeing on memory and the major binding version must be bumped.

use std::mem::{offset_of, size_of};

use graft_sdk::{
    BindingVersion, CallRecord, HookNode, HostVtable, InvocationContext, InvocationStorage,
    ModDeclaration, Phase, Receiver,
};

#[test]
fn test_call_record_layout() {
    assert_eq!(offset_of!(CallRecord, original_fn), 0);
    assert_eq!(offset_of!(CallRecord, trampoline), 8);
    assert_eq!(offset_of!(CallRecord, node), 16);
    assert_eq!(offset_of!(CallRecord, class), 24);
    assert_eq!(offset_of!(CallRecord, id), 32);
    assert_eq!(offset_of!(CallRecord, invoke_node), 40);
    assert_eq!(offset_of!(CallRecord, invoke_original), 48);
    assert_eq!(offset_of!(CallRecord, version), 56);
    assert_eq!(size_of::<CallRecord>(), 72);
}

#[test]
fn test_hook_node_layout() {
    assert_eq!(offset_of!(HookNode, next), 0);
    assert_eq!(offset_of!(HookNode, phase), 8);
    assert_eq!(offset_of!(HookNode, priority), 12);
    assert_eq!(offset_of!(HookNode, payload), 16);
    assert_eq!(size_of::<HookNode>(), 24);
}

#[test]
fn test_host_vtable_layout() {
    assert_eq!(offset_of!(HostVtable, invoke_chain), 0);
    assert_eq!(offset_of!(HostVtable, runtime_handle), 8);
    assert_eq!(offset_of!(HostVtable, register_hook), 16);
    assert_eq!(size_of::<HostVtable>(), 24);
}

#[test]
fn test_version_and_declaration_layout() {
    assert_eq!(size_of::<BindingVersion>(), 12);
    assert_eq!(offset_of!(BindingVersion, major), 0);
    assert_eq!(offset_of!(BindingVersion, minor), 4);
    assert_eq!(offset_of!(BindingVersion, patch), 8);
    assert_eq!(offset_of!(ModDeclaration, version), 0);
    assert_eq!(offset_of!(ModDeclaration, name), 16);
}

#[test]
fn test_context_and_storage_sizes() {
    // Field offsets are asserted inside the crate where the fields are
    // visible; the total widths are part of the same declared contract.
    assert_eq!(size_of::<InvocationContext>(), 24);
    assert_eq!(size_of::<InvocationStorage>(), 40);
}

#[test]
fn test_scalar_abi_types() {
    assert_eq!(size_of::<Phase>(), 4);
    assert_eq!(size_of::<Receiver>(), 8);
}
