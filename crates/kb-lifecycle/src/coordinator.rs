// coordinator.rs — ShutdownCoordinator: waits for the first shutdown trigger.
//
// The running state is a single `select!` over the OS interrupt future and
// the shared signal. Whichever resolves first decides the trigger; an
// interrupt also fires the signal so every other task observes it.

use std::fmt;
use std::future::Future;

use crate::signal::{ShutdownSignal, CAUSE_USER_STOP};

/// Which OS signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptKind {
    Sigint,
    Sigterm,
}

impl fmt::Display for InterruptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptKind::Sigint => write!(f, "SIGINT"),
            InterruptKind::Sigterm => write!(f, "SIGTERM"),
        }
    }
}

/// What ended the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The process received an OS signal.
    Interrupt(InterruptKind),
    /// The shared signal fired from inside the process.
    Cancelled,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Interrupt(kind) => write!(f, "interrupt ({})", kind),
            ShutdownTrigger::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub struct ShutdownCoordinator {
    signal: ShutdownSignal,
}

impl ShutdownCoordinator {
    pub fn new(signal: ShutdownSignal) -> Self {
        Self { signal }
    }

    /// Block until an interrupt arrives or the signal fires.
    ///
    /// If the signal already fired, returns `Cancelled` without polling the
    /// interrupt.
    pub async fn wait<I>(&self, interrupt: I) -> ShutdownTrigger
    where
        I: Future<Output = InterruptKind>,
    {
        tokio::select! {
            biased;
            _ = self.signal.fired() => {
                tracing::info!(cause = self.signal.cause().unwrap_or(""), "shutdown signal observed");
                ShutdownTrigger::Cancelled
            }
            kind = interrupt => {
                tracing::info!(signal = %kind, "interrupt received");
                self.signal.fire(CAUSE_USER_STOP);
                ShutdownTrigger::Interrupt(kind)
            }
        }
    }
}

/// Install SIGINT and SIGTERM handlers and return a future that resolves on
/// the first of them.
///
/// Handlers are installed before this returns, so a signal delivered during
/// startup is not lost.
#[cfg(unix)]
pub fn os_interrupt() -> std::io::Result<impl Future<Output = InterruptKind> + Send> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => InterruptKind::Sigint,
            _ = sigterm.recv() => InterruptKind::Sigterm,
        }
    })
}

#[cfg(not(unix))]
pub fn os_interrupt() -> std::io::Result<impl Future<Output = InterruptKind> + Send> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        InterruptKind::Sigint
    })
}
