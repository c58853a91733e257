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

//! pifan - temperature-driven PWM fan control for Raspberry Pi class boards
//!
//! This library reads the CPU thermal zone, steps a fan duty cycle towards a
//! target temperature and drives a Raspberry Pi hardware PWM channel.

pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod hw;
pub mod logger;
pub mod service;
pub mod signals;

#[cfg(test)]
pub mod test_utils;

pub use controller::{duty_units, ControlParams, Controller, Duty};
pub use error::{PifanError, Result};
