//! End-to-end chain laws, driven through a minimal reference dispatcher.
//!
//! The dispatcher here is the executable form of the contract the SDK
//! publishes for its external host: it owns per-method chains keyed by
//! namespace/class/method, appends (never replaces) each registered node,
//! walks Before-phase hooks in priority order (higher first, ties in
//! registration order), invokes the original through the record's
//! re-specializing thunk unless a hook stopped execution, then walks the
//! After phase. It knows no concrete argument type — every call goes through
//! the two function pointers carried by the `CallRecord`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{LazyLock, Mutex};

use graft_sdk::{
    AbiError, HookNode, HostVtable, InvocationContext, InvokeNodeFn, InvokeOriginalFn, Phase,
    Receiver, RuntimeHandle, BINDING_VERSION,
};

// ---------------------------------------------------------------------------
// Reference dispatcher
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct HookEntry {
    node: *mut HookNode,
    invoke_node: InvokeNodeFn,
}

struct Method {
    /// Head of the intrusive chain, linked in registration order
    head: *mut HookNode,
    entries: Vec<HookEntry>,
    trampoline: *mut c_void,
    invoke_original: InvokeOriginalFn,
    original: *mut c_void,
}

// Raw pointers to arena-owned nodes and generated code; valid for the whole
// process by the SDK's own lifetime contract.
unsafe impl Send for Method {}

static METHODS: LazyLock<Mutex<HashMap<String, Method>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

thread_local! {
    // The real host resolves the chain from the patched entry point; the
    // reference dispatcher is told explicitly which method is being called.
    static ACTIVE_METHOD: RefCell<Option<String>> = const { RefCell::new(None) };
}

unsafe extern "C" fn runtime_handle() -> *const RuntimeHandle {
    // Opaque to the SDK; any stable non-null pointer will do for tests.
    static TOKEN: u8 = 0;
    &TOKEN as *const u8 as *const RuntimeHandle
}

unsafe fn cstr<'a>(ptr: *const c_char) -> &'a str {
    CStr::from_ptr(ptr).to_str().expect("host received non-UTF8 name")
}

unsafe extern "C" fn register_hook(
    namespace_name: *const c_char,
    class_name: *const c_char,
    method_name: *const c_char,
    _arg_count: u32,
    record: *const graft_sdk::CallRecord,
) {
    let record = &*record;
    assert!(
        record.version.is_compatible_with(&BINDING_VERSION),
        "record produced by an incompatible binding"
    );
    assert!(record.original_fn.is_null(), "dispatcher owns this slot");

    let key = format!(
        "{}.{}.{}",
        cstr(namespace_name),
        cstr(class_name),
        cstr(method_name)
    );
    let mut methods = METHODS.lock().unwrap();
    let method = methods.entry(key).or_insert(Method {
        head: ptr::null_mut(),
        entries: Vec::new(),
        trampoline: record.trampoline,
        invoke_original: record.invoke_original,
        original: ptr::null_mut(),
    });

    // Append, never replace: registrations against one method coexist.
    if method.head.is_null() {
        method.head = record.node;
    } else {
        let mut tail = method.head;
        while !(*tail).next.is_null() {
            tail = (*tail).next;
        }
        (*tail).next = record.node;
    }
    method.entries.push(HookEntry {
        node: record.node,
        invoke_node: record.invoke_node,
    });
}

unsafe extern "C" fn invoke_chain(ctx: *mut InvocationContext, receiver: *mut c_void) {
    let key = ACTIVE_METHOD
        .with(|m| m.borrow().clone())
        .expect("chain invoked with no active method");

    // Snapshot under the lock, walk outside it: hooks may re-enter the host.
    let (entries, invoke_original, original) = {
        let methods = METHODS.lock().unwrap();
        let method = methods.get(&key).expect("chain invoked for unknown method");
        (
            method.entries.clone(),
            method.invoke_original,
            method.original,
        )
    };

    let phase_of = |entry: &HookEntry| unsafe { (*entry.node).phase };
    let priority_of = |entry: &HookEntry| unsafe { (*entry.node).priority };

    // Policy: higher priority first; stable sort keeps registration order
    // for ties.
    let mut before: Vec<HookEntry> = entries
        .iter()
        .copied()
        .filter(|e| phase_of(e) == Phase::Before)
        .collect();
    before.sort_by(|a, b| priority_of(b).cmp(&priority_of(a)));
    for entry in &before {
        (entry.invoke_node)(ctx, receiver, (*entry.node).payload);
    }

    if !(*ctx).did_stop_execution() && !original.is_null() {
        (invoke_original)(ctx, receiver, original);
    }

    let mut after: Vec<HookEntry> = entries
        .iter()
        .copied()
        .filter(|e| phase_of(e) == Phase::After)
        .collect();
    after.sort_by(|a, b| priority_of(b).cmp(&priority_of(a)));
    for entry in &after {
        (entry.invoke_node)(ctx, receiver, (*entry.node).payload);
    }
}

fn setup() {
    match graft_sdk::init(HostVtable {
        invoke_chain,
        runtime_handle,
        register_hook,
    }) {
        Ok(()) | Err(AbiError::AlreadyInitialized) => {}
        Err(e) => panic!("init failed: {e}"),
    }
}

fn install_original(key: &str, original: *mut c_void) {
    let mut methods = METHODS.lock().unwrap();
    methods
        .get_mut(key)
        .expect("installing original for unregistered method")
        .original = original;
}

fn trampoline_of(key: &str) -> *mut c_void {
    let methods = METHODS.lock().unwrap();
    methods.get(key).expect("unregistered method").trampoline
}

fn chain_len(key: &str) -> usize {
    let methods = METHODS.lock().unwrap();
    let mut node = methods.get(key).expect("unregistered method").head;
    let mut len = 0;
    while !node.is_null() {
        len += 1;
        node = unsafe { (*node).next };
    }
    len
}

/// Call `key`'s installed trampoline as a static `fn(i32) -> i32`.
fn call_static_i32(key: &str, x: i32) -> i32 {
    let trampoline = trampoline_of(key);
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = Some(key.to_owned()));
    let f: unsafe extern "C" fn(i32) -> i32 = unsafe { mem::transmute(trampoline) };
    let result = unsafe { f(x) };
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = None);
    result
}

/// Call `key`'s installed trampoline as an instance `fn(this, i32) -> i32`.
fn call_instance_i32(key: &str, this: *mut c_void, x: i32) -> i32 {
    let trampoline = trampoline_of(key);
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = Some(key.to_owned()));
    let f: unsafe extern "C" fn(*mut c_void, i32) -> i32 = unsafe { mem::transmute(trampoline) };
    let result = unsafe { f(this, x) };
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = None);
    result
}

// ---------------------------------------------------------------------------
// Originals used by the scenarios
// ---------------------------------------------------------------------------

static DOUBLE_CALLS: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn original_double(x: i32) -> i32 {
    DOUBLE_CALLS.fetch_add(1, Ordering::SeqCst);
    x * 2
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_stop_skips_original_and_keeps_hook_value() {
    setup();
    static ORIGINAL_RAN: AtomicUsize = AtomicUsize::new(0);
    unsafe extern "C" fn original(x: i32) -> i32 {
        ORIGINAL_RAN.fetch_add(1, Ordering::SeqCst);
        x * 2
    }

    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "AddStopped",
        Phase::Before,
        |ctx: &InvocationContext, x: i32| -> Option<i32> {
            ctx.stop_execution();
            Some(x + 1)
        },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) -> i32 = original;
    install_original("Game.Score.AddStopped", original as *mut c_void);

    assert_eq!(call_static_i32("Game.Score.AddStopped", 41), 42);
    assert_eq!(ORIGINAL_RAN.load(Ordering::SeqCst), 0);
}

#[test]
fn test_no_stop_runs_original_which_overwrites() {
    setup();
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Add",
        Phase::Before,
        |_: &InvocationContext, x: i32| -> Option<i32> { Some(x + 1) },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Add", original as *mut c_void);

    let calls_before = DOUBLE_CALLS.load(Ordering::SeqCst);
    // The hook writes 42, then the original runs with the unmodified
    // argument and overwrites the slot unconditionally.
    assert_eq!(call_static_i32("Game.Score.Add", 41), 82);
    assert_eq!(DOUBLE_CALLS.load(Ordering::SeqCst), calls_before + 1);
}

#[test]
fn test_absent_optional_passes_through_to_original() {
    setup();
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Passthrough",
        Phase::Before,
        |_: &InvocationContext, _x: i32| -> Option<i32> { None },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Passthrough", original as *mut c_void);

    // The return slot holds exactly what the original set.
    assert_eq!(call_static_i32("Game.Score.Passthrough", 21), 42);
}

#[test]
fn test_before_hook_can_rewrite_arguments_for_the_original() {
    setup();
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Clamped",
        Phase::Before,
        |ctx: &InvocationContext, x: i32| -> Option<i32> {
            if x > 10 {
                ctx.set_arg::<i32>(0, 10).unwrap();
            }
            None
        },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Clamped", original as *mut c_void);

    assert_eq!(call_static_i32("Game.Score.Clamped", 500), 20);
    assert_eq!(call_static_i32("Game.Score.Clamped", 3), 6);
}

#[test]
fn test_after_hook_observes_and_overrides_original_return() {
    setup();
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Audited",
        Phase::After,
        |ctx: &InvocationContext, _x: i32| -> Option<i32> {
            Some(ctx.return_value::<i32>() + 1)
        },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Audited", original as *mut c_void);

    assert_eq!(call_static_i32("Game.Score.Audited", 10), 21);
}

#[test]
fn test_two_registrations_coexist_and_chain_is_reachable() {
    setup();
    static FIRST: AtomicUsize = AtomicUsize::new(0);
    static SECOND: AtomicUsize = AtomicUsize::new(0);

    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Shared",
        Phase::Before,
        |_: &InvocationContext, _x: i32| -> Option<i32> {
            FIRST.fetch_add(1, Ordering::SeqCst);
            None
        },
    )
    .unwrap();
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Shared",
        Phase::Before,
        |_: &InvocationContext, _x: i32| -> Option<i32> {
            SECOND.fetch_add(1, Ordering::SeqCst);
            None
        },
    )
    .unwrap();

    assert_eq!(chain_len("Game.Score.Shared"), 2);

    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Shared", original as *mut c_void);
    assert_eq!(call_static_i32("Game.Score.Shared", 4), 8);
    assert_eq!(FIRST.load(Ordering::SeqCst), 1);
    assert_eq!(SECOND.load(Ordering::SeqCst), 1);
}

#[test]
fn test_priority_orders_within_a_phase() {
    setup();
    static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    graft_sdk::bind_static_function_with_priority(
        "Game",
        "Score",
        "Ordered",
        Phase::Before,
        1,
        |_: &InvocationContext, _x: i32| -> Option<i32> {
            ORDER.lock().unwrap().push("low");
            None
        },
    )
    .unwrap();
    graft_sdk::bind_static_function_with_priority(
        "Game",
        "Score",
        "Ordered",
        Phase::Before,
        5,
        |_: &InvocationContext, _x: i32| -> Option<i32> {
            ORDER.lock().unwrap().push("high");
            None
        },
    )
    .unwrap();

    let original: unsafe extern "C" fn(i32) -> i32 = original_double;
    install_original("Game.Score.Ordered", original as *mut c_void);
    call_static_i32("Game.Score.Ordered", 1);
    assert_eq!(*ORDER.lock().unwrap(), vec!["high", "low"]);
}

#[test]
fn test_instance_call_receives_the_receiver() {
    setup();
    // "Object layout": a single u64 field the original reads.
    unsafe extern "C" fn original_read(this: *mut c_void, add: i32) -> i32 {
        (*(this as *mut u64)) as i32 + add
    }

    static SEEN_NULL: AtomicUsize = AtomicUsize::new(0);
    graft_sdk::bind_class_function(
        "Game",
        "Player",
        "Health",
        Phase::Before,
        |_: &InvocationContext, this: Receiver, _add: i32| -> Option<i32> {
            if this.is_null() {
                SEEN_NULL.fetch_add(1, Ordering::SeqCst);
            }
            None
        },
    )
    .unwrap();
    let original: unsafe extern "C" fn(*mut c_void, i32) -> i32 = original_read;
    install_original("Game.Player.Health", original as *mut c_void);

    let mut object: u64 = 40;
    let this = &mut object as *mut u64 as *mut c_void;
    assert_eq!(call_instance_i32("Game.Player.Health", this, 2), 42);
    assert_eq!(SEEN_NULL.load(Ordering::SeqCst), 0);
}

#[test]
fn test_interior_nul_name_never_reaches_the_host() {
    setup();
    let result = graft_sdk::bind_static_function(
        "Game",
        "Bad\0Class",
        "Add",
        Phase::Before,
        |_: &InvocationContext, x: i32| -> Option<i32> { Some(x) },
    );
    assert_eq!(
        result,
        Err(AbiError::InvalidName("Bad\0Class".to_owned()))
    );
    // The rejection happens before anything is allocated or handed over, so
    // the host never saw a registration.
    let methods = METHODS.lock().unwrap();
    assert!(!methods.keys().any(|k| k.contains("Bad")));
}

#[test]
fn test_void_return_method_runs_hook_and_original() {
    setup();
    static RAN: AtomicUsize = AtomicUsize::new(0);
    unsafe extern "C" fn original_noop(_x: i32) {
        RAN.fetch_add(1, Ordering::SeqCst);
    }

    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Reset",
        Phase::Before,
        |_: &InvocationContext, _x: i32| {
            RAN.fetch_add(1, Ordering::SeqCst);
        },
    )
    .unwrap();
    let original: unsafe extern "C" fn(i32) = original_noop;
    install_original("Game.Score.Reset", original as *mut c_void);

    let trampoline = trampoline_of("Game.Score.Reset");
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = Some("Game.Score.Reset".to_owned()));
    let f: unsafe extern "C" fn(i32) = unsafe { mem::transmute(trampoline) };
    unsafe { f(7) };
    ACTIVE_METHOD.with(|m| *m.borrow_mut() = None);

    assert_eq!(RAN.load(Ordering::SeqCst), 2);
}
