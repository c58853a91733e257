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

//! Periodic control loop
//!
//! One task owns the controller, the sensor and the PWM output. Shutdown is
//! observed between ticks, so the final pin-high/halt sequence never races a
//! duty write.

use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::constants::limits::MAX_PERIOD_SECS;
use crate::controller::{Controller, Duty};
use crate::hw::{sample, Level, PwmSink, TemperatureSource};
use crate::logger::log_event;

/// Summary returned once the loop has shut down
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReport {
    pub ticks: u64,
    pub final_duty: Duty,
    pub sensor_faults: u64,
    pub pwm_failures: u64,
}

pub struct FanService<T, P> {
    controller: Controller,
    source: T,
    sink: P,
    period: Duration,
    ticks: u64,
    sensor_faults: u64,
    pwm_failures: u64,
}

impl<T: TemperatureSource, P: PwmSink> FanService<T, P> {
    /// `period` is capped at [`MAX_PERIOD_SECS`] so the first deadline
    /// always fits in an `Instant`.
    pub fn new(controller: Controller, source: T, sink: P, period: Duration) -> Self {
        Self {
            controller,
            source,
            sink,
            period: period.min(Duration::from_secs(MAX_PERIOD_SECS)),
            ticks: 0,
            sensor_faults: 0,
            pwm_failures: 0,
        }
    }

    /// Take one sample and seed the controller from it.
    pub fn seed(&mut self) -> Duty {
        let reading = sample(&mut self.source);
        if reading.is_fail_safe() {
            self.sensor_faults += 1;
        }
        if self.controller.seed(reading.celsius) {
            info!(
                temp_c = reading.celsius,
                duty = %self.controller.duty(),
                "above target-temp at startup, seeding duty"
            );
        }
        log_event(
            "seed",
            json!({ "temp_c": reading.celsius, "duty": self.controller.duty() }),
        );
        self.controller.duty()
    }

    /// Sample, update and push once.
    pub fn tick(&mut self) -> Duty {
        self.ticks += 1;
        let reading = sample(&mut self.source);
        if reading.is_fail_safe() {
            self.sensor_faults += 1;
        }

        let result = self.controller.tick(reading.celsius, &mut self.sink);
        let duty = self.controller.duty();
        info!(temp_c = reading.celsius, duty = %duty, units = duty.units(), "tick");

        if let Err(e) = &result {
            self.pwm_failures += 1;
            error!(error = %e, duty = %duty, "failed to set PWM duty");
        }

        log_event(
            "tick",
            json!({
                "temp_c": reading.celsius,
                "fail_safe": reading.is_fail_safe(),
                "duty": duty,
                "pwm_ok": result.is_ok(),
            }),
        );
        duty
    }

    /// Force the fan to full and release the pin. Failures are only logged.
    pub fn shutdown(&mut self) {
        info!("setting PWM pin high");
        if let Err(e) = self.sink.set_level(Level::High) {
            warn!(error = %e, "failed to set PWM pin high");
        }
        info!("halting PWM pin");
        if let Err(e) = self.sink.halt() {
            warn!(error = %e, "failed to halt PWM pin");
        }
        log_event("shutdown", json!({ "ticks": self.ticks, "duty": self.controller.duty() }));
    }

    fn report(&self) -> ServiceReport {
        ServiceReport {
            ticks: self.ticks,
            final_duty: self.controller.duty(),
            sensor_faults: self.sensor_faults,
            pwm_failures: self.pwm_failures,
        }
    }

    /// Tick every period until `shutdown` flips to true (or its sender goes
    /// away), then run the shutdown sequence.
    ///
    /// The first tick fires one period after the call.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ServiceReport {
        let start = Instant::now()
            .checked_add(self.period)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(MAX_PERIOD_SECS));
        let mut interval = time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_s = self.period.as_secs_f64(), "control loop started");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }

        info!(ticks = self.ticks, "control loop stopped");
        self.shutdown();
        self.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::controller::ControlParams;
    use crate::test_utils::{RecordingSink, ScriptedSource, SinkCall};
    use serial_test::serial;

    const PERIOD: Duration = Duration::from_secs(5);

    type TestService = FanService<ScriptedSource, RecordingSink>;

    fn service_with_period(
        temps: &[Option<f64>],
        period: Duration,
    ) -> (TestService, RecordingSink) {
        let controller = Controller::new(ControlParams::from_settings(&Settings::default()));
        let sink = RecordingSink::new();
        let svc = FanService::new(controller, ScriptedSource::new(temps), sink.clone(), period);
        (svc, sink)
    }

    fn service(temps: &[Option<f64>]) -> (TestService, RecordingSink) {
        service_with_period(temps, PERIOD)
    }

    #[test]
    #[serial]
    fn test_seed_then_ticks_follow_scenario() {
        let (mut svc, sink) = service(&[Some(65.0), Some(65.0), Some(50.0)]);
        assert_eq!(svc.seed().units(), 5000);
        assert!(sink.calls().is_empty());

        assert_eq!(svc.tick().units(), 5200);
        assert_eq!(svc.tick().units(), 5100);
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Duty(Duty::from_units(5200)),
                SinkCall::Duty(Duty::from_units(5100)),
            ]
        );
    }

    #[test]
    #[serial]
    fn test_sensor_failure_drives_duty_up() {
        let (mut svc, _sink) = service(&[Some(30.0), None]);
        assert_eq!(svc.seed(), Duty::ZERO);
        // 100°C fail-safe: kick-start to 1000 plus one increase step
        assert_eq!(svc.tick().units(), 1200);
        assert_eq!(svc.report().sensor_faults, 1);
    }

    #[test]
    #[serial]
    fn test_pwm_failure_keeps_duty() {
        let (mut svc, sink) = service(&[Some(70.0)]);
        sink.fail_duty_writes(true);
        assert_eq!(svc.tick().units(), 1200);
        sink.fail_duty_writes(false);
        assert_eq!(svc.tick().units(), 1400);
        assert_eq!(svc.report().pwm_failures, 1);
    }

    #[test]
    #[serial]
    fn test_shutdown_errors_are_swallowed() {
        let (mut svc, sink) = service(&[Some(50.0)]);
        sink.fail_shutdown(true);
        svc.shutdown();
        assert_eq!(sink.calls(), vec![SinkCall::Level(Level::High), SinkCall::Halt]);
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_run_ticks_until_shutdown() {
        let (svc, sink) = service(&[Some(65.0)]);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(svc.run(rx));

        time::sleep(PERIOD * 3 + Duration::from_millis(500)).await;
        tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.ticks, 3);
        assert_eq!(report.final_duty.units(), 1600);
        let calls = sink.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], SinkCall::Duty(Duty::from_units(1200)));
        assert_eq!(calls[3], SinkCall::Level(Level::High));
        assert_eq!(calls[4], SinkCall::Halt);
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_run_stops_when_sender_dropped() {
        let (svc, sink) = service(&[Some(20.0)]);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(svc.run(rx));

        time::sleep(PERIOD + Duration::from_millis(10)).await;
        drop(tx);
        let report = handle.await.unwrap();

        assert_eq!(report.ticks, 1);
        assert_eq!(report.final_duty, Duty::ZERO);
        assert_eq!(sink.calls().last(), Some(&SinkCall::Halt));
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_run_already_cancelled() {
        let (svc, sink) = service(&[Some(20.0)]);
        let (_tx, rx) = watch::channel(true);
        let report = svc.run(rx).await;
        assert_eq!(report.ticks, 0);
        assert_eq!(sink.calls(), vec![SinkCall::Level(Level::High), SinkCall::Halt]);
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_run_with_huge_period_still_shuts_down() {
        let (svc, sink) = service_with_period(&[Some(70.0)], Duration::MAX);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(svc.run(rx));

        time::sleep(Duration::from_secs(3600)).await;
        tx.send(true).unwrap();
        let report = handle.await.unwrap();

        assert_eq!(report.ticks, 0);
        assert_eq!(sink.calls(), vec![SinkCall::Level(Level::High), SinkCall::Halt]);
    }
}
