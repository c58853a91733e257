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

//! Startup settings
//!
//! Built-in defaults, an optional JSON settings file and range validation.
//! Command line overrides are layered on top by [`crate::cli`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, limits, paths, temperature};
use crate::error::{PifanError, Result};

/// Startup parameters. Immutable once validated.
///
/// Keys in the JSON settings file use the same kebab-case names as the
/// command line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    /// Temperature the controller steers towards (°C)
    pub target_temp: f64,
    /// Pin name in BCM numbering
    #[serde(alias = "pwm-pin")]
    pub pmw_pin: String,
    /// Seconds between control ticks
    pub period: i64,
    /// Percent added per tick while at or above target
    pub increase_step: i64,
    /// Percent removed per tick while below target
    pub decrease_step: i64,
    /// Temperature at which a stopped fan is kicked on (°C)
    pub start_temp: f64,
    /// Lowest running duty in percent
    pub min_duty: i64,
    pub thermal_zone: PathBuf,
    /// `pwmchipN` to claim the channel on; the board default when unset
    pub pwm_chip: Option<u8>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_temp: defaults::TARGET_TEMP,
            pmw_pin: defaults::PWM_PIN.to_string(),
            period: defaults::PERIOD_SECS,
            increase_step: defaults::INCREASE_STEP,
            decrease_step: defaults::DECREASE_STEP,
            start_temp: defaults::START_TEMP,
            min_duty: defaults::MIN_DUTY_PERCENT,
            thermal_zone: PathBuf::from(paths::THERMAL_ZONE),
            pwm_chip: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| PifanError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Check every parameter against its accepted range.
    ///
    /// Returns the first violation found; nothing touches hardware here.
    pub fn validate(&self) -> Result<()> {
        if !(self.target_temp > 0.0) {
            return Err(PifanError::invalid_config("target-temp", "must be higher than 0"));
        }
        if self.target_temp > temperature::MAX_TARGET_CELSIUS {
            return Err(PifanError::invalid_config(
                "target-temp",
                format!("must not be higher than {}", temperature::MAX_TARGET_CELSIUS),
            ));
        }
        if self.period <= 0 {
            return Err(PifanError::invalid_config("period", "must be higher than 0"));
        }
        if self.increase_step <= 0 {
            return Err(PifanError::invalid_config("increase-step", "must be higher than 0"));
        }
        if self.decrease_step <= 0 {
            return Err(PifanError::invalid_config("decrease-step", "must be higher than 0"));
        }
        if !(self.start_temp < self.target_temp) {
            return Err(PifanError::invalid_config("start-temp", "must be lower than target-temp"));
        }
        if self.min_duty <= 0 {
            return Err(PifanError::invalid_config("min-duty", "must be higher than 0"));
        }
        if self.min_duty > limits::MAX_MIN_DUTY_PERCENT {
            return Err(PifanError::invalid_config(
                "min-duty",
                format!("must not be higher than {}", limits::MAX_MIN_DUTY_PERCENT),
            ));
        }
        if self.pmw_pin.trim().is_empty() {
            return Err(PifanError::invalid_config("pmw-pin", "must not be empty"));
        }
        Ok(())
    }

    /// Tick interval, capped at [`limits::MAX_PERIOD_SECS`].
    pub fn period_duration(&self) -> Duration {
        Duration::from_secs((self.period.max(1) as u64).min(limits::MAX_PERIOD_SECS))
    }
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from(paths::SYSTEM_CONFIG)
}

/// Base settings before command line overrides.
///
/// An explicit path must exist; the system-wide file is only read when present.
pub fn load_base_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => Settings::from_file(path),
        None => {
            let system = system_config_path();
            if system.exists() {
                Settings::from_file(&system)
            } else {
                Ok(Settings::default())
            }
        }
    }
}
