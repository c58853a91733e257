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

//! Unified error handling for pifan
//!
//! A single error type shared by the configuration layer, the hardware
//! adapters and the control loop.

use std::io;
use std::path::PathBuf;

/// Result type alias using PifanError
pub type Result<T> = std::result::Result<T, PifanError>;

#[derive(thiserror::Error, Debug)]
pub enum PifanError {
    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to read temperature from {path}: {reason}")]
    TemperatureRead {
        path: PathBuf,
        reason: String,
    },

    #[error("PWM error on pin {pin}: {reason}")]
    Pwm {
        pin: String,
        reason: String,
    },

    #[error("GPIO error on pin {pin}: {reason}")]
    Gpio {
        pin: String,
        reason: String,
    },

    #[error("Hardware not found: {0}")]
    HardwareNotFound(String),

    #[error("Invalid PWM pin '{pin}': {reason}")]
    InvalidPin {
        pin: String,
        reason: String,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Process Errors
    // ============================================================================
    #[error("Failed to install signal handler: {0}")]
    Signal(String),
}

impl PifanError {
    /// Create an invalid config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a PWM channel error
    pub fn pwm(pin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pwm {
            pin: pin.into(),
            reason: reason.into(),
        }
    }

    /// Create a GPIO error
    pub fn gpio(pin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Gpio {
            pin: pin.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid pin error
    pub fn invalid_pin(pin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPin {
            pin: pin.into(),
            reason: reason.into(),
        }
    }
}
