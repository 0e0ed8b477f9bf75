//! Binding version triple and the module declaration record.
//!
//! Every [`CallRecord`](crate::CallRecord) carries the `BindingVersion` it
//! was compiled against. A dispatcher that does not understand a record's
//! major version must refuse it — this is the only defense against layout
//! drift between modules built against different SDK revisions.

use std::ffi::{c_char, CStr};
use std::fmt;

/// Version of the binding ABI compiled into this SDK.
///
/// Bump the MAJOR number whenever the layout of any `#[repr(C)]` type that
/// crosses the module boundary changes. The const assertions in
/// [`record`](crate::record) exist to force that conversation at build time.
pub const BINDING_VERSION: BindingVersion = BindingVersion::new(2, 1, 0);

/// Semantic version triple with a fixed `#[repr(C)]` layout.
///
/// The `semver` crate is deliberately not used here: its `Version` owns
/// heap-allocated pre-release strings and has no layout guarantee, while this
/// triple is embedded directly in ABI-crossing structs.
///
/// Comparison is field-by-field (derived lexicographic ordering on
/// major, minor, patch).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingVersion {
    /// Incremented on ABI-breaking layout changes
    pub major: u32,
    /// Incremented on backward-compatible additions
    pub minor: u32,
    /// Incremented on behavior fixes
    pub patch: u32,
}

impl BindingVersion {
    /// Create a version triple.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        BindingVersion {
            major,
            minor,
            patch,
        }
    }

    /// Whether a record produced under `other` can be trusted to have the
    /// layout this SDK expects. Major versions must match exactly; minor and
    /// patch revisions only add behavior.
    pub const fn is_compatible_with(&self, other: &BindingVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for BindingVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Record a module exports so the host can version-check it before calling
/// the module's entry point.
///
/// Declared layout: `version` at offset 0, `name` at offset 16.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModDeclaration {
    /// Binding version the module was compiled against
    pub version: BindingVersion,
    /// Module name, NUL-terminated, static lifetime
    pub name: *const c_char,
}

impl ModDeclaration {
    /// Declare a module under the currently compiled [`BINDING_VERSION`].
    pub const fn new(name: &'static CStr) -> Self {
        ModDeclaration {
            version: BINDING_VERSION,
            name: name.as_ptr(),
        }
    }
}

// The declaration crosses the module boundary by value before any version
// check can happen, so its own layout is pinned here.
const _: () = {
    assert!(std::mem::offset_of!(ModDeclaration, version) == 0);
    assert!(std::mem::offset_of!(ModDeclaration, name) == 16);
    assert!(std::mem::size_of::<BindingVersion>() == 12);
};
