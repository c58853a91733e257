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

//! Command line interface
//!
//! Every flag is optional. Values given here override the settings file,
//! which in turn overrides the built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{load_base_settings, Settings};
use crate::error::Result;

#[derive(Parser, Debug, Default)]
#[command(name = "pifan", version, about = "Temperature-driven PWM fan controller")]
pub struct Cli {
    /// Target CPU temperature in °C (0 < t <= 80) [default: 60]
    #[arg(long = "target-temp", allow_negative_numbers = true)]
    pub target_temp: Option<f64>,

    /// Fan PWM pin in BCM numbering [default: 18]
    #[arg(long = "pmw-pin", visible_alias = "pwm-pin")]
    pub pmw_pin: Option<String>,

    /// Seconds between temperature reads and duty adjustments [default: 5]
    #[arg(long, allow_negative_numbers = true)]
    pub period: Option<i64>,

    /// Percent added each tick while at or above target-temp [default: 2]
    #[arg(long = "increase-step", allow_negative_numbers = true)]
    pub increase_step: Option<i64>,

    /// Percent removed each tick while below target-temp [default: 1]
    #[arg(long = "decrease-step", allow_negative_numbers = true)]
    pub decrease_step: Option<i64>,

    /// Start the fan once the CPU reaches this temperature [default: 40]
    #[arg(long = "start-temp", allow_negative_numbers = true)]
    pub start_temp: Option<f64>,

    /// Minimum running duty in percent (0 < m <= 99) [default: 10]
    #[arg(long = "min-duty", allow_negative_numbers = true)]
    pub min_duty: Option<i64>,

    /// JSON settings file (defaults to /etc/pifan/config.json when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Thermal zone file reporting millidegrees Celsius
    #[arg(long = "thermal-zone")]
    pub thermal_zone: Option<PathBuf>,

    /// Claim the channel on /sys/class/pwm/pwmchipN instead of the board default
    #[arg(long = "pwm-chip")]
    pub pwm_chip: Option<u8>,

    /// Log filter (trace, debug, info, warn, error); overrides PIFAN_LOG
    #[arg(long = "log-level")]
    pub log_level: Option<String>,

    /// Append JSON-lines control events to this file
    #[arg(long = "event-log")]
    pub event_log: Option<PathBuf>,
}

impl Cli {
    /// Overlay the flags that were given on top of `base`.
    pub fn apply(&self, mut base: Settings) -> Settings {
        if let Some(v) = self.target_temp {
            base.target_temp = v;
        }
        if let Some(v) = &self.pmw_pin {
            base.pmw_pin = v.clone();
        }
        if let Some(v) = self.period {
            base.period = v;
        }
        if let Some(v) = self.increase_step {
            base.increase_step = v;
        }
        if let Some(v) = self.decrease_step {
            base.decrease_step = v;
        }
        if let Some(v) = self.start_temp {
            base.start_temp = v;
        }
        if let Some(v) = self.min_duty {
            base.min_duty = v;
        }
        if let Some(v) = &self.thermal_zone {
            base.thermal_zone = v.clone();
        }
        if let Some(v) = self.pwm_chip {
            base.pwm_chip = Some(v);
        }
        base
    }

    /// Resolve and validate the effective settings.
    pub fn settings(&self) -> Result<Settings> {
        let base = load_base_settings(self.config.as_deref())?;
        let settings = self.apply(base);
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PifanError;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["pifan"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_flags_keeps_base() {
        let cli = parse(&[]);
        assert_eq!(cli.apply(Settings::default()), Settings::default());
    }

    #[test]
    fn test_all_control_flags() {
        let cli = parse(&[
            "--target-temp",
            "55",
            "--pmw-pin",
            "12",
            "--period",
            "3",
            "--increase-step",
            "4",
            "--decrease-step",
            "2",
            "--start-temp",
            "35.5",
            "--min-duty",
            "25",
        ]);
        let s = cli.apply(Settings::default());
        assert_eq!(s.target_temp, 55.0);
        assert_eq!(s.pmw_pin, "12");
        assert_eq!(s.period, 3);
        assert_eq!(s.increase_step, 4);
        assert_eq!(s.decrease_step, 2);
        assert_eq!(s.start_temp, 35.5);
        assert_eq!(s.min_duty, 25);
    }

    #[test]
    fn test_pwm_chip_override() {
        let s = parse(&[]).apply(Settings::default());
        assert_eq!(s.pwm_chip, None);

        let s = parse(&["--pwm-chip", "2"]).apply(Settings::default());
        assert_eq!(s.pwm_chip, Some(2));
    }

    #[test]
    fn test_pwm_pin_alias() {
        let cli = parse(&["--pwm-pin", "13"]);
        assert_eq!(cli.pmw_pin.as_deref(), Some("13"));
    }

    #[test]
    fn test_negative_values_reach_validation() {
        let cli = parse(&["--period", "-1"]);
        assert_eq!(cli.period, Some(-1));
        match cli.settings() {
            Err(PifanError::InvalidConfig { field, .. }) => assert_eq!(field, "period"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target-temp": 50, "start-temp": 30, "period": 9 }}"#).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["--config", &path, "--period", "2"]);
        let s = cli.settings().unwrap();
        assert_eq!(s.target_temp, 50.0);
        assert_eq!(s.start_temp, 30.0);
        assert_eq!(s.period, 2);
    }

    #[test]
    fn test_unknown_flag_is_error() {
        assert!(Cli::try_parse_from(["pifan", "--bogus"]).is_err());
    }
}
