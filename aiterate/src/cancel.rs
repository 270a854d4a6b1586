//! Cooperative cancellation shared by the controller and its collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AiterateError, Result};

/// Cloneable flag; every clone observes the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return [`AiterateError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(AiterateError::Cancelled);
        }
        Ok(())
    }
}

/// Route SIGINT to `token` instead of terminating the process.
///
/// SIGINT is blocked on the calling thread and handled by a watcher thread, so this must run
/// before any other thread is spawned. A second interrupt exits with
/// [`exit_codes::CANCELLED`](crate::exit_codes::CANCELLED).
#[cfg(unix)]
pub fn cancel_on_interrupt(token: CancelToken) -> anyhow::Result<()> {
    use anyhow::Context;
    use nix::sys::signal::{SigSet, Signal};
    use tracing::warn;

    let mut set = SigSet::empty();
    set.add(Signal::SIGINT);
    set.thread_block().context("block SIGINT")?;

    std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            loop {
                match set.wait() {
                    Ok(_) if token.is_cancelled() => {
                        std::process::exit(crate::exit_codes::CANCELLED)
                    }
                    Ok(_) => {
                        eprintln!("Interrupted; stopping after the current step (Ctrl+C again to quit)");
                        warn!("interrupt received, cancelling");
                        token.cancel();
                    }
                    Err(err) => {
                        warn!(%err, "waiting for SIGINT failed");
                        return;
                    }
                }
            }
        })
        .context("spawn interrupt watcher")?;
    Ok(())
}
