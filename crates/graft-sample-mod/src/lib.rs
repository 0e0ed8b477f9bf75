//! Sample extension module built against the Graft SDK.
//!
//! Compiled as a `cdylib`, this is the shape of a real module: the host
//! loads the library, calls [`graft_mod_declaration`] to version-check it,
//! then calls [`graft_mod_entry`] with its vtable. Everything after that
//! goes through the SDK's registration surface.

use std::ffi::c_void;

use graft_sdk::{
    AbiError, HostVtable, InvocationContext, ModDeclaration, Phase, Receiver,
};

const MOD_NAME: &std::ffi::CStr = c"graft-sample-mod";

/// Version-check record the host reads before running any module code.
#[no_mangle]
pub extern "C" fn graft_mod_declaration() -> ModDeclaration {
    ModDeclaration::new(MOD_NAME)
}

/// Module entry point. Returns `0` on success, `-1` if the host environment
/// was rejected or any registration failed.
///
/// # Safety
/// `vtable` must point to a [`HostVtable`] that stays valid for this call;
/// its function pointers must stay valid for the life of the process.
#[no_mangle]
pub unsafe extern "C" fn graft_mod_entry(vtable: *const HostVtable) -> i32 {
    if vtable.is_null() {
        return -1;
    }
    match install(*vtable) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{MOD_NAME:?} failed to install: {e}");
            -1
        }
    }
}

fn install(vtable: HostVtable) -> Result<(), AbiError> {
    match graft_sdk::init(vtable) {
        // Another module in the same image may have initialized first.
        Ok(()) | Err(AbiError::AlreadyInitialized) => {}
        Err(e) => return Err(e),
    }

    // Cap incoming damage before the game logic sees it.
    graft_sdk::bind_class_function(
        "Game",
        "Player",
        "TakeDamage",
        Phase::Before,
        |ctx: &InvocationContext, _this: Receiver, amount: f32| -> Option<f32> {
            if amount > 50.0 {
                log::debug!("clamping damage {amount} to 50");
                if ctx.set_arg(0, 50.0f32).is_err() {
                    return None;
                }
            }
            None
        },
    )?;

    // Double every score award and log what the original produced.
    graft_sdk::bind_static_function(
        "Game",
        "Score",
        "Award",
        Phase::After,
        |ctx: &InvocationContext, _points: i32| -> Option<i32> {
            Some(ctx.return_value::<i32>() * 2)
        },
    )?;

    // Block a method outright: stop the chain and supply the return.
    graft_sdk::bind_static_function_with_priority(
        "Game",
        "Telemetry",
        "Upload",
        Phase::Before,
        100,
        |ctx: &InvocationContext, _payload: *mut c_void| -> Option<bool> {
            ctx.stop_execution();
            Some(false)
        },
    )?;

    log::info!("{MOD_NAME:?} installed");
    Ok(())
}
