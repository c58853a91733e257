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

//! Step-adjustment fan controller
//!
//! Each tick the duty moves by a fixed step towards cooling or quieting:
//!
//! 1. **Kick-start**: a stopped fan at or above the start temperature jumps
//!    to the minimum running duty.
//! 2. **Step**: below target the duty drops by the decrease step, otherwise it
//!    rises by the increase step. This applies in the same tick as a
//!    kick-start.
//! 3. **Floor/ceiling**: at or below the minimum duty the fan either stops
//!    (below start temperature) or holds the minimum; above 100% it clamps.
//!
//! Duty is kept as an integer fraction of [`DUTY_MAX`] so repeated additive
//! updates never drift.

use std::fmt;

use serde::Serialize;

use crate::config::Settings;
use crate::constants::duty::{DUTY_MAX, ROUNDING_BIAS, SEED_DUTY};
use crate::constants::pwm::FREQUENCY_HZ;
use crate::error::Result;
use crate::hw::PwmSink;

/// PWM duty cycle in units of 1/[`DUTY_MAX`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Duty(u32);

impl Duty {
    pub const ZERO: Duty = Duty(0);
    pub const MAX: Duty = Duty(DUTY_MAX);

    /// Build a duty from raw units, clamping into `0..=DUTY_MAX`.
    pub fn from_units(units: i64) -> Self {
        Duty(units.clamp(0, DUTY_MAX as i64) as u32)
    }

    /// Percent of full scale, rounded half-up to the nearest unit
    pub fn from_percent(percent: i64) -> Self {
        Self::from_units(duty_units(percent))
    }

    pub fn units(self) -> u32 {
        self.0
    }

    pub fn percent(self) -> f64 {
        self.0 as f64 * 100.0 / DUTY_MAX as f64
    }
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.percent())
    }
}

/// Convert a percentage step into duty units: `(s * DUTY_MAX + 49) / 100`.
pub fn duty_units(step: i64) -> i64 {
    step.saturating_mul(DUTY_MAX as i64).saturating_add(ROUNDING_BIAS) / 100
}

/// Policy parameters derived once from validated settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    pub target_temp: f64,
    pub start_temp: f64,
    /// Duty units added per tick at or above target
    pub increase: i64,
    /// Duty units removed per tick below target
    pub decrease: i64,
    pub min_duty: Duty,
}

impl ControlParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            target_temp: settings.target_temp,
            start_temp: settings.start_temp,
            increase: duty_units(settings.increase_step),
            decrease: duty_units(settings.decrease_step),
            min_duty: Duty::from_percent(settings.min_duty),
        }
    }
}

/// Owns the current duty and applies the step policy once per tick
#[derive(Debug, Clone)]
pub struct Controller {
    params: ControlParams,
    duty: Duty,
}

impl Controller {
    /// New controller with the fan stopped
    pub fn new(params: ControlParams) -> Self {
        Self { params, duty: Duty::ZERO }
    }

    pub fn duty(&self) -> Duty {
        self.duty
    }

    /// Seed from the first sample: above target starts at 50% instead of
    /// ramping up from zero. Returns true if the seed was applied.
    pub fn seed(&mut self, temp_c: f64) -> bool {
        if temp_c > self.params.target_temp {
            self.duty = Duty(SEED_DUTY);
            true
        } else {
            false
        }
    }

    /// Apply one step of the policy and return the new duty.
    pub fn update(&mut self, temp_c: f64) -> Duty {
        let p = &self.params;
        let min = p.min_duty.units() as i64;
        let mut duty = self.duty.units() as i64;

        if temp_c >= p.start_temp && duty == 0 {
            duty = min;
        }

        if temp_c < p.target_temp {
            duty -= p.decrease;
        } else {
            duty += p.increase;
        }

        if duty <= min {
            duty = if temp_c < p.start_temp { 0 } else { min };
        }

        self.duty = Duty::from_units(duty);
        self.duty
    }

    /// Update from a sample and push the result to the sink.
    ///
    /// A sink error is returned but the new duty is kept for the next tick.
    pub fn tick<P: PwmSink + ?Sized>(&mut self, temp_c: f64, sink: &mut P) -> Result<Duty> {
        let duty = self.update(temp_c);
        sink.set_duty(duty, FREQUENCY_HZ)?;
        Ok(duty)
    }
}
