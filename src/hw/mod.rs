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

//! Hardware interaction modules
//!
//! The controller only sees the two traits below; the thermal zone reader and
//! the rppal-backed PWM channel are the production implementations.

pub mod pwm;
pub mod thermal;

use crate::controller::Duty;
use crate::error::Result;

pub use pwm::{duty_fraction, init_host, resolve_channel, PinChannel, RppalPwm};
pub use thermal::{sample, Reading, ThermalZone};

/// Steady output level for a PWM pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Something that can drive a fan with a duty cycle
#[cfg_attr(test, mockall::automock)]
pub trait PwmSink {
    /// Output `duty` at `frequency_hz`
    fn set_duty(&mut self, duty: Duty, frequency_hz: u32) -> Result<()>;

    /// Hold the pin at a steady level
    fn set_level(&mut self, level: Level) -> Result<()>;

    /// Release the pin
    fn halt(&mut self) -> Result<()>;
}

/// Source of CPU temperature readings in °C
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureSource {
    fn read_celsius(&mut self) -> Result<f64>;
}
