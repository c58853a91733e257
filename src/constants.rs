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

//! Constants and configuration values for pifan
//!
//! Centralizes paths, duty-cycle scaling and startup defaults.

/// System paths
pub mod paths {
    /// CPU thermal zone, reports millidegrees Celsius as text
    pub const THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

    /// System-wide settings file, read when present
    pub const SYSTEM_CONFIG: &str = "/etc/pifan/config.json";

    /// systemd journal socket
    pub const JOURNALD_SOCKET: &str = "/run/systemd/journal/socket";
}

/// Duty cycle scaling
pub mod duty {
    /// Integer duty value representing 100.00%
    pub const DUTY_MAX: u32 = 10_000;

    /// Duty seeded at startup when the first sample is already above target
    pub const SEED_DUTY: u32 = DUTY_MAX / 2;

    /// Bias applied before dividing by 100 when converting percent to duty units
    pub const ROUNDING_BIAS: i64 = 49;
}

/// PWM output parameters
pub mod pwm {
    /// Fixed output frequency (16 kHz)
    pub const FREQUENCY_HZ: u32 = 16_000;
}

/// Temperature handling
pub mod temperature {
    /// Divisor for converting millidegrees to degrees Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;

    /// Reading substituted when the sensor cannot be read
    pub const FAIL_SAFE_CELSIUS: f64 = 100.0;

    /// Upper bound accepted for the target temperature
    pub const MAX_TARGET_CELSIUS: f64 = 80.0;
}

/// Built-in defaults for every setting
pub mod defaults {
    pub const TARGET_TEMP: f64 = 60.0;
    pub const PWM_PIN: &str = "18";
    pub const PERIOD_SECS: i64 = 5;
    pub const INCREASE_STEP: i64 = 2;
    pub const DECREASE_STEP: i64 = 1;
    pub const START_TEMP: f64 = 40.0;
    pub const MIN_DUTY_PERCENT: i64 = 10;
    pub const LOG_LEVEL: &str = "info";

    /// Environment variable consulted for the log filter
    pub const LOG_ENV: &str = "PIFAN_LOG";
}

/// Validation limits
pub mod limits {
    /// Largest accepted min-duty percentage
    pub const MAX_MIN_DUTY_PERCENT: i64 = 99;

    /// Longest tick interval the loop schedules; longer periods are capped
    pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;
}
