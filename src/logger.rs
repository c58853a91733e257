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

//! Diagnostic logging and the JSON-lines event log
//!
//! Tracing goes to journald when systemd started the process and to stderr
//! otherwise. The event log is a separate, optional file of one JSON object
//! per control event.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use lazy_static::lazy_static;
use serde_json::{json, Value};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::constants::{defaults, paths};

lazy_static! {
    static ref EVENT_LOG: Mutex<Option<File>> = Mutex::new(None);
}

/// Where diagnostic output ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Journald,
    Stderr,
}

/// Pick the log filter: explicit flag, then PIFAN_LOG, then info.
pub fn resolve_log_level(flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| std::env::var(defaults::LOG_ENV).ok())
        .unwrap_or_else(|| defaults::LOG_LEVEL.to_string())
}

/// Journald only when systemd started us and its socket is reachable.
fn running_under_systemd() -> bool {
    std::env::var_os("INVOCATION_ID").is_some() && Path::new(paths::JOURNALD_SOCKET).exists()
}

/// Install the global tracing subscriber.
pub fn init_tracing(level: &str) -> LogTarget {
    if running_under_systemd() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(EnvFilter::new(level))
                    .init();
                return LogTarget::Journald;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stderr", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_env_filter(EnvFilter::new(level))
        .init();
    LogTarget::Stderr
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Open (append) the JSON-lines event log.
pub fn init_event_log(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut guard) = EVENT_LOG.lock() {
        *guard = Some(file);
    }
    Ok(())
}

/// Stop writing events; later calls to [`log_event`] are dropped.
pub fn close_event_log() {
    if let Ok(mut guard) = EVENT_LOG.lock() {
        *guard = None;
    }
}

/// Append one event if the event log is open. Write failures are ignored.
pub fn log_event(event: &str, data: Value) {
    let line = json!({
        "ts_ms": now_millis(),
        "event": event,
        "data": data,
    })
    .to_string();

    if let Ok(mut guard) = EVENT_LOG.lock() {
        if let Some(f) = guard.as_mut() {
            let _ = writeln!(f, "{}", line);
        }
    }
}
