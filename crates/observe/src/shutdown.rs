//! Termination signals that stop the polling services.

use std::fmt::{self, Display, Formatter};

/// The signal a shutdown was requested with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Interrupt,
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
        })
    }
}

/// Resolves with the first termination signal the process receives.
///
/// # Panics
///
/// Panics if the signal listeners can not be registered.
#[cfg(unix)]
pub async fn wait_for_signal() -> Signal {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to listen for SIGTERM");
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to listen for SIGINT");
    tokio::select! {
        _ = terminate.recv() => Signal::Terminate,
        _ = interrupt.recv() => Signal::Interrupt,
    }
}

/// Resolves once Ctrl+C is pressed.
///
/// # Panics
///
/// Panics if the Ctrl+C listener can not be registered.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Signal {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for Ctrl+C");
    Signal::Interrupt
}
