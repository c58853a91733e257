/*
 * This file is part of pifan.
 *
 * Copyright (C) 2025 pifan contributors
 *
 * pifan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * pifan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with pifan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Termination signal handling
//!
//! SIGKILL and SIGSTOP cannot be caught, and SIGSEGV is not a request to
//! stop, so none of them are registered.

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tracing::info;

use crate::error::{PifanError, Result};

const MONITORED: &[(&str, fn() -> SignalKind)] = &[
    ("SIGHUP", SignalKind::hangup),
    ("SIGINT", SignalKind::interrupt),
    ("SIGTERM", SignalKind::terminate),
    ("SIGQUIT", SignalKind::quit),
    ("SIGUSR1", SignalKind::user_defined1),
    ("SIGUSR2", SignalKind::user_defined2),
];

/// Registered listeners for every monitored signal.
///
/// Registration happens up front so a signal delivered before the first
/// `recv` still counts.
pub struct TerminationSignals {
    streams: Vec<(&'static str, Signal)>,
}

impl TerminationSignals {
    /// Must be called from within a tokio runtime.
    pub fn register() -> Result<Self> {
        let mut streams = Vec::with_capacity(MONITORED.len());
        for (name, kind) in MONITORED {
            let stream =
                signal(kind()).map_err(|e| PifanError::Signal(format!("{}: {}", name, e)))?;
            streams.push((*name, stream));
        }
        Ok(Self { streams })
    }

    /// Wait for the first monitored signal and return its name.
    pub async fn recv(&mut self) -> &'static str {
        std::future::poll_fn(|cx| {
            for (name, stream) in self.streams.iter_mut() {
                if stream.poll_recv(cx).is_ready() {
                    return std::task::Poll::Ready(*name);
                }
            }
            std::task::Poll::Pending
        })
        .await
    }
}

/// Register the monitored signals and spawn a task that flips the returned
/// channel to `true` on the first one.
///
/// Call this before touching hardware: from here on a signal no longer kills
/// the process but waits for the control loop to run its shutdown sequence.
pub fn shutdown_channel() -> Result<watch::Receiver<bool>> {
    let mut signals = TerminationSignals::register()?;
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let name = signals.recv().await;
        info!(signal = name, "SIGNAL: received termination signal - initiating shutdown");
        let _ = tx.send(true);
    });
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::controller::{ControlParams, Controller};
    use crate::hw::Level;
    use crate::service::FanService;
    use crate::test_utils::{RecordingSink, ScriptedSource, SinkCall};
    use serial_test::serial;
    use std::time::Duration;

    #[tokio::test]
    #[serial]
    async fn test_receives_sigusr2() {
        let mut signals = TerminationSignals::register().unwrap();
        // SAFETY: raise only delivers a signal to this process; a handler is
        // registered above so the default action does not run.
        let rc = unsafe { libc::raise(libc::SIGUSR2) };
        assert_eq!(rc, 0);

        let name = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap();
        assert_eq!(name, "SIGUSR2");
    }

    #[tokio::test]
    #[serial]
    async fn test_signal_before_loop_still_runs_shutdown() {
        let mut shutdown = shutdown_channel().unwrap();

        // Delivered while the pin would still be getting set up
        // SAFETY: SIGUSR1 has a handler registered by shutdown_channel.
        let rc = unsafe { libc::raise(libc::SIGUSR1) };
        assert_eq!(rc, 0);
        tokio::time::timeout(Duration::from_secs(5), shutdown.changed())
            .await
            .unwrap()
            .unwrap();

        let controller = Controller::new(ControlParams::from_settings(&Settings::default()));
        let sink = RecordingSink::new();
        let service = FanService::new(
            controller,
            ScriptedSource::new(&[Some(70.0)]),
            sink.clone(),
            Duration::from_secs(5),
        );
        let report = service.run(shutdown).await;

        assert_eq!(report.ticks, 0);
        assert_eq!(sink.calls(), vec![SinkCall::Level(Level::High), SinkCall::Halt]);
    }
}
