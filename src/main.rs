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

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};

use pifan::cli::Cli;
use pifan::config::Settings;
use pifan::controller::{ControlParams, Controller};
use pifan::hw::{init_host, RppalPwm, ThermalZone};
use pifan::logger::{self, init_tracing, log_event, resolve_log_level};
use pifan::service::FanService;
use pifan::signals::shutdown_channel;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Usage errors exit 1 like every other startup failure; help/version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let log_level = resolve_log_level(cli.log_level.as_deref());
    let target = init_tracing(&log_level);
    info!(
        "STARTUP: pifan {} starting (logging to {:?}, level {})",
        VERSION, target, log_level
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Before any hardware access, so an early SIGTERM still gets the
    // pin-high shutdown instead of the default action
    let shutdown = shutdown_channel().context("signal setup failed")?;

    let settings: Settings = cli.settings().context("invalid configuration")?;

    if let Some(path) = &cli.event_log {
        logger::init_event_log(path)
            .with_context(|| format!("cannot open event log {}", path.display()))?;
    }
    log_event("startup", json!({ "version": VERSION, "settings": settings }));

    // SAFETY: geteuid is always safe - it just returns the effective user ID of the process.
    if unsafe { libc::geteuid() } != 0 {
        warn!("not running as root; claiming the PWM channel may fail");
    }

    let board = init_host().context("PWM driver initialization failed")?;
    let pin = RppalPwm::open(&settings.pmw_pin, settings.pwm_chip)
        .with_context(|| format!("PWM pin {} lookup failed", settings.pmw_pin))?;
    let mapping = pin.mapping();
    info!(
        model = %board.model(),
        pin = pin.pin(),
        bcm = mapping.bcm,
        channel = mapping.index,
        "STARTUP: PWM pin ready"
    );

    let controller = Controller::new(ControlParams::from_settings(&settings));
    let source = ThermalZone::new(&settings.thermal_zone);
    info!(path = %source.path().display(), "STARTUP: reading CPU temperature");
    let mut service = FanService::new(controller, source, pin, settings.period_duration());
    service.seed();

    let report = service.run(shutdown).await;
    info!(
        ticks = report.ticks,
        final_duty = %report.final_duty,
        sensor_faults = report.sensor_faults,
        pwm_failures = report.pwm_failures,
        "SHUTDOWN: pifan terminated"
    );
    logger::close_event_log();
    Ok(())
}
