//! Shutdown flag: a single atomic cell set from an async-signal-safe
//! handler and polled cooperatively by every worker and the event loop.
//!
//! `SIGINT` and `SIGTERM` both set the flag; no other signal is handled and
//! everything else keeps its default disposition.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn bridge_signal_handler(_: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Installs the `SIGINT`/`SIGTERM` handlers. Must be called once, early in
/// `main`, before any worker thread starts polling [`is_shutdown`].
pub fn install_handlers() {
    unsafe {
        let nomask: libc::sigset_t = std::mem::zeroed();
        let action = libc::sigaction {
            sa_sigaction: bridge_signal_handler as usize,
            sa_mask: nomask,
            sa_flags: 0,
            sa_restorer: None,
        };
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
        libc::sigaction(libc::SIGTERM, &action, std::ptr::null_mut());
    }
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Sets the flag from ordinary (non-signal) code. Used by `main` so that a
/// WebSocket listener failure shuts the whole bridge down exactly as a
/// signal would, instead of leaving the broker workers spinning forever
/// against a queue nobody will ever close.
pub fn trigger() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Test-only escape hatch: the real flag is process-global (signal handlers
/// cannot target a specific `AtomicBool` instance), so tests that need to
/// exercise flag-observing loops set it directly rather than raising a
/// signal.
#[cfg(test)]
pub fn set_shutdown_for_test() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

#[cfg(test)]
pub fn reset_for_test() {
    SHUTDOWN.store(false, Ordering::SeqCst);
}
