/// Signal forwarding to the live child process
///
/// An interrupt delivered to the tool must reach the running child,
/// and the tool must observe the child's termination and run cleanup
/// before exiting itself. The handler therefore never exits while a
/// pipeline is mid-flight: it forwards the signal to the registered
/// child, or records it when no child is live, and lets the executor
/// abort through its cleanup path.
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

static CHILD_PID: AtomicI32 = AtomicI32::new(0);
static INTERRUPT_SIGNAL: AtomicI32 = AtomicI32::new(0);
static PIPELINE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Record the currently running child so the handler can forward to it.
pub fn register_child(pid: u32) {
    CHILD_PID.store(pid as i32, Ordering::SeqCst);
}

pub fn clear_child() {
    CHILD_PID.store(0, Ordering::SeqCst);
}

/// Mark the span during which an executor owns artifacts and cleanup.
/// Entering the span clears any stale recorded interrupt.
pub fn set_pipeline_active(active: bool) {
    if active {
        INTERRUPT_SIGNAL.store(0, Ordering::SeqCst);
    }
    PIPELINE_ACTIVE.store(active, Ordering::SeqCst);
}

/// The signal received during execution, if any.
pub fn pending_interrupt() -> Option<i32> {
    match INTERRUPT_SIGNAL.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Only with no live child and no active pipeline is there nothing to
/// forward to and nothing to clean up; only then may the handler exit
/// the process directly.
fn exit_directly(pipeline_active: bool, child_pid: i32) -> bool {
    child_pid <= 0 && !pipeline_active
}

extern "C" fn forward_signal(sig: i32) {
    // ASYNC-SIGNAL SAFETY: only atomics, kill(2) and _exit(2) here.
    // No stdio, no allocation, no std::process::exit.
    INTERRUPT_SIGNAL.store(sig, Ordering::SeqCst);
    let pid = CHILD_PID.load(Ordering::SeqCst);
    if pid > 0 {
        unsafe {
            libc::kill(pid, sig);
        }
    } else if exit_directly(PIPELINE_ACTIVE.load(Ordering::SeqCst), pid) {
        unsafe {
            libc::_exit(128 + sig);
        }
    }
    // Active pipeline with no live child (between stages, or during
    // cleanup): the recorded signal is observed by the executor, which
    // aborts before the next spawn and still runs cleanup.
}

pub fn install_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, forward_signal as usize);
        libc::signal(libc::SIGTERM, forward_signal as usize);
    }
}
