//! Shutdown signal handling
//!
//! SIGINT and SIGTERM only record which signal arrived. The control loop
//! polls [`shutdown_flag`] between read attempts and returns; resources are
//! released when the bridge is dropped.

use nix::libc::c_int;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static RECEIVED: AtomicI32 = AtomicI32::new(0);

extern "C" fn on_signal(signo: c_int) {
    RECEIVED.store(signo, Ordering::SeqCst);
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install the SIGINT and SIGTERM handlers
pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // The handler only touches atomics
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

/// Set once a shutdown signal has been received
pub fn shutdown_flag() -> &'static AtomicBool {
    &SHUTDOWN
}

/// Exit status for a signal-driven shutdown: 128 + signal number
pub fn exit_code() -> i32 {
    128 + RECEIVED.load(Ordering::SeqCst)
}
