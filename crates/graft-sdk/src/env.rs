//! Process-wide binding environment.
//!
//! The original design kept the runtime handle in a lazily mutated hidden
//! static; here the host injects it explicitly through [`init`], once, and
//! the environment lives untouched until process exit. The environment also
//! owns the hook arena: every node and callback holder ever registered is
//! adopted here and deliberately never reclaimed, because the external
//! dispatcher may reference them at any future time.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{AbiError, AbiResult};
use crate::hook::HookNode;
use crate::record::HostVtable;
use crate::types::RuntimeHandle;
use crate::version::BINDING_VERSION;

/// Process-lifetime owner of every registered hook node.
///
/// The mutex guards registration bookkeeping only; the invocation path never
/// touches the arena.
pub(crate) struct HookArena {
    nodes: Mutex<Vec<*mut HookNode>>,
}

// The arena stores the pointers without ever dereferencing them; the nodes
// themselves are immutable after registration apart from dispatcher-owned
// linking.
unsafe impl Send for HookArena {}
unsafe impl Sync for HookArena {}

impl HookArena {
    fn new() -> Self {
        HookArena {
            nodes: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn adopt(&self, node: *mut HookNode) {
        self.nodes.lock().push(node);
    }
}

pub(crate) struct GlobalEnv {
    vtable: HostVtable,
    runtime: *const RuntimeHandle,
    arena: HookArena,
    next_id: AtomicU64,
}

// The host contract requires the vtable entry points to be callable from any
// thread, and the runtime handle is read-only process-wide state.
unsafe impl Send for GlobalEnv {}
unsafe impl Sync for GlobalEnv {}

impl GlobalEnv {
    pub(crate) fn vtable(&self) -> &HostVtable {
        &self.vtable
    }

    pub(crate) fn runtime(&self) -> *const RuntimeHandle {
        self.runtime
    }

    pub(crate) fn arena(&self) -> &HookArena {
        &self.arena
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

static ENV: OnceCell<GlobalEnv> = OnceCell::new();

/// Install the host environment. Must run before any `bind_*` call; the
/// runtime handle is resolved once here and cached for every future
/// trampoline entry.
pub fn init(vtable: HostVtable) -> AbiResult<()> {
    let runtime = unsafe { (vtable.runtime_handle)() };
    if runtime.is_null() {
        return Err(AbiError::NullRuntimeHandle);
    }
    ENV.set(GlobalEnv {
        vtable,
        runtime,
        arena: HookArena::new(),
        next_id: AtomicU64::new(1),
    })
    .map_err(|_| AbiError::AlreadyInitialized)?;
    log::debug!("binding environment initialized, binding version {BINDING_VERSION}");
    Ok(())
}

/// Whether [`init`] has run.
pub fn is_initialized() -> bool {
    ENV.get().is_some()
}

pub(crate) fn env() -> AbiResult<&'static GlobalEnv> {
    ENV.get().ok_or(AbiError::NotInitialized)
}

/// Environment accessor for the call path.
///
/// Trampolines only exist after a successful registration, which requires
/// `init`, so this is unreachable for any dispatcher that installs entry
/// points in contract order. A trampoline has no error channel (its
/// signature is the hooked method's), so the one way this can fire is a
/// host installing entry points it was never handed; panicking with the
/// contract violation named beats calling through a null runtime handle.
pub(crate) fn env_for_call() -> &'static GlobalEnv {
    ENV.get()
        .expect("trampoline invoked before graft_sdk::init")
}
