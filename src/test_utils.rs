//! Shared fakes for unit tests

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::controller::Duty;
use crate::error::{PifanError, Result};
use crate::hw::{Level, PwmSink, TemperatureSource};

/// Call recorded by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Duty(Duty),
    Level(Level),
    Halt,
}

#[derive(Debug, Default)]
struct SinkState {
    calls: Vec<SinkCall>,
    fail_duty: bool,
    fail_shutdown: bool,
}

/// In-memory PWM sink; clones share the same call log
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn fail_duty_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_duty = fail;
    }

    pub fn fail_shutdown(&self, fail: bool) {
        self.state.lock().unwrap().fail_shutdown = fail;
    }
}

impl PwmSink for RecordingSink {
    fn set_duty(&mut self, duty: Duty, _frequency_hz: u32) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Duty(duty));
        if state.fail_duty {
            return Err(PifanError::pwm("fake", "injected duty failure"));
        }
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Level(level));
        if state.fail_shutdown {
            return Err(PifanError::gpio("fake", "injected level failure"));
        }
        Ok(())
    }

    fn halt(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(SinkCall::Halt);
        if state.fail_shutdown {
            return Err(PifanError::pwm("fake", "injected halt failure"));
        }
        Ok(())
    }
}

/// Replays a fixed list of readings; `None` is a read failure.
/// The last entry repeats once the list is exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    remaining: VecDeque<Option<f64>>,
    last: Option<f64>,
}

impl ScriptedSource {
    pub fn new(readings: &[Option<f64>]) -> Self {
        Self {
            remaining: readings.iter().copied().collect(),
            last: readings.last().copied().flatten(),
        }
    }
}

impl TemperatureSource for ScriptedSource {
    fn read_celsius(&mut self) -> Result<f64> {
        let next = match self.remaining.pop_front() {
            Some(r) => r,
            None => self.last,
        };
        next.ok_or_else(|| PifanError::TemperatureRead {
            path: PathBuf::from("/fake/temp"),
            reason: "scripted failure".to_string(),
        })
    }
}
