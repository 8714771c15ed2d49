//! Unix signal handling.
//!
//! SIGINT and SIGQUIT request a graceful stop; SIGUSR1 requests a full
//! memory dump. Handlers only set atomic flags; the CPU loop polls them
//! between instructions.

use std::sync::atomic::{AtomicBool, Ordering};

static STOP: AtomicBool = AtomicBool::new(false);
static DUMP: AtomicBool = AtomicBool::new(false);

/// Install the process signal handlers.
#[cfg(unix)]
#[allow(unsafe_code)] // sigaction registration is inherently unsafe
pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, handle_stop as libc::sighandler_t);
        libc::signal(libc::SIGQUIT, handle_stop as libc::sighandler_t);
        libc::signal(libc::SIGUSR1, handle_dump as libc::sighandler_t);
    }
}

#[cfg(not(unix))]
pub fn install() {}

#[cfg(unix)]
extern "C" fn handle_stop(_sig: libc::c_int) {
    STOP.store(true, Ordering::Relaxed);
}

#[cfg(unix)]
extern "C" fn handle_dump(_sig: libc::c_int) {
    DUMP.store(true, Ordering::Relaxed);
}

/// Whether a stop signal has arrived.
#[must_use]
pub fn stop_requested() -> bool {
    STOP.load(Ordering::Relaxed)
}

/// Consume a pending dump request, if any.
#[must_use]
pub fn take_dump_request() -> bool {
    DUMP.swap(false, Ordering::Relaxed)
}
