use crate::error::PingError;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared stop flag. Set once by the interrupt handler, polled by the engine
/// at every point where it may block.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancels `token` on SIGINT/SIGTERM. The handler does nothing but store the
/// flag; all reporting happens on the engine's side.
pub fn cancel_on_interrupt(token: &CancelToken) -> Result<(), PingError> {
    let token = token.clone();
    ctrlc::set_handler(move || token.cancel())?;
    Ok(())
}
