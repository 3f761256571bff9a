//! Interrupt handling for graceful shutdown
//!
//! The first Ctrl+C cancels the run token so the orchestrator stops before its
//! next step; a second one exits immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::status::ExitStatus;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Check if the application was interrupted (Ctrl+C pressed)
#[inline]
pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Record an interrupt and cancel the token.
///
/// Returns true when an interrupt had already been recorded.
pub fn interrupt(cancel: &CancellationToken) -> bool {
    let repeated = INTERRUPTED.swap(true, Ordering::SeqCst);
    cancel.cancel();
    repeated
}

#[inline]
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Install the Ctrl+C handler for the process
pub fn install(cancel: CancellationToken) {
    let installed = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        if interrupt(&cancel) {
            std::process::exit(ExitStatus::Interrupted as i32);
        }
    });
    if let Err(e) = installed {
        tracing::debug!(error = %e, "Ctrl+C handler not installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_cancels_token() {
        reset_interrupted();
        let cancel = CancellationToken::new();

        assert!(!interrupt(&cancel));
        assert!(cancel.is_cancelled());
        assert!(was_interrupted());
        assert!(interrupt(&cancel));

        reset_interrupted();
        assert!(!was_interrupted());
    }
}
