//! Shutdown on SIGINT/SIGTERM.
//!
//! Raw mode swallows Ctrl+C as a key press, so these handlers mostly
//! matter for `kill` and for the window before the terminal is set up.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Register termination handlers and return the flag they raise.
///
/// The event loop polls the flag and leaves through its normal cleanup
/// path. A second signal while the flag is set exits with status 1.
pub fn setup_shutdown_handlers() -> Result<Arc<AtomicBool>, std::io::Error> {
    let requested = Arc::new(AtomicBool::new(false));

    for sig in TERM_SIGNALS {
        // Registered first so it only fires once the flag is already raised
        flag::register_conditional_shutdown(*sig, 1, Arc::clone(&requested))?;
        flag::register(*sig, Arc::clone(&requested))?;
    }

    Ok(requested)
}
