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

//! Thermal zone temperature source
//!
//! The kernel reports temperatures in millidegrees (e.g. 45000 = 45.0°C).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::TemperatureSource;
use crate::constants::temperature::{FAIL_SAFE_CELSIUS, MILLIDEGREE_DIVISOR};
use crate::error::{PifanError, Result};

/// Reads a thermal zone `temp` attribute
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemperatureSource for ThermalZone {
    fn read_celsius(&mut self) -> Result<f64> {
        let content = fs::read_to_string(&self.path).map_err(|e| PifanError::TemperatureRead {
            path: self.path.clone(),
            reason: format!("Failed to read: {}", e),
        })?;

        let millidegrees = content.trim().parse::<f64>().map_err(|e| PifanError::TemperatureRead {
            path: self.path.clone(),
            reason: format!("Failed to parse '{}': {}", content.trim(), e),
        })?;

        Ok(millidegrees / MILLIDEGREE_DIVISOR)
    }
}

/// One temperature sample as seen by the controller
#[derive(Debug)]
pub struct Reading {
    pub celsius: f64,
    /// Set when the sensor failed and `celsius` is the fail-safe value
    pub fault: Option<PifanError>,
}

impl Reading {
    pub fn is_fail_safe(&self) -> bool {
        self.fault.is_some()
    }
}

/// Sample `source`, substituting the fail-safe-high temperature on error.
///
/// A failed read is reported as 100°C so the controller pushes the fan up
/// rather than trusting a sensor that is not answering.
pub fn sample<T: TemperatureSource + ?Sized>(source: &mut T) -> Reading {
    match source.read_celsius() {
        Ok(celsius) => Reading { celsius, fault: None },
        Err(e) => {
            warn!(
                error = %e,
                fail_safe_c = FAIL_SAFE_CELSIUS,
                "temperature read failed, assuming fail-safe temperature"
            );
            Reading {
                celsius: FAIL_SAFE_CELSIUS,
                fault: Some(e),
            }
        }
    }
}
