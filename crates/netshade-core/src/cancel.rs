//! Cooperative cancellation.
//!
//! Long-running operations poll a shared flag at each loop iteration and
//! unwind with [`CancelledError`] when it has been set. There is no hard
//! deadline: cancellation takes effect at the next poll point.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Shared stop flag polled by worker loops.
pub type CancelFlag = Arc<AtomicBool>;

#[derive(Debug, Error)]
#[error("operation cancelled")]
pub struct CancelledError;

/// Fresh, unset cancellation flag.
pub fn new_cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// Return `Err(CancelledError)` if the flag has been raised.
pub fn check_cancel(cancel: Option<&CancelFlag>) -> Result<(), CancelledError> {
    if let Some(flag) = cancel {
        if flag.load(Ordering::Relaxed) {
            return Err(CancelledError);
        }
    }
    Ok(())
}

/// Sleep for `duration`, waking every 100ms to honour a stop request.
pub fn cancel_sleep(cancel: Option<&CancelFlag>, duration: Duration) -> Result<(), CancelledError> {
    if duration.is_zero() {
        return check_cancel(cancel);
    }

    let start = Instant::now();
    let tick = Duration::from_millis(100);
    while start.elapsed() < duration {
        check_cancel(cancel)?;
        let remaining = duration.saturating_sub(start.elapsed());
        std::thread::sleep(tick.min(remaining));
    }
    check_cancel(cancel)
}
