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

//! Raspberry Pi hardware PWM output
//!
//! The two hardware channels are routed to BCM pins 12/18 (channel 0) and
//! 13/19 (channel 1). Duty updates go through `rppal::pwm`; steady levels
//! switch the pin to a plain GPIO output through `rppal::gpio`, which keeps
//! its level after the channel is released.

use rppal::gpio::{Gpio, OutputPin};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::system::DeviceInfo;
use tracing::{debug, info, warn};

use super::{Level, PwmSink};
use crate::constants::duty::DUTY_MAX;
use crate::controller::Duty;
use crate::error::{PifanError, Result};

/// A BCM pin together with the hardware PWM channel it is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinChannel {
    pub bcm: u8,
    pub index: u8,
}

impl PinChannel {
    pub fn channel(&self) -> Channel {
        match self.index {
            0 => Channel::Pwm0,
            _ => Channel::Pwm1,
        }
    }
}

/// Map a BCM pin name to its hardware PWM channel.
///
/// Accepts `18`, `GPIO18` and `BCM18` (case-insensitive prefixes).
pub fn resolve_channel(pin: &str) -> Result<PinChannel> {
    let name = pin.trim();
    let upper = name.to_ascii_uppercase();
    let digits = upper
        .strip_prefix("GPIO")
        .or_else(|| upper.strip_prefix("BCM"))
        .unwrap_or(&upper);

    let bcm = digits.parse::<u8>().map_err(|_| {
        PifanError::invalid_pin(name, "expected a BCM pin number such as 18 or GPIO18")
    })?;

    let index = match bcm {
        12 | 18 => 0,
        13 | 19 => 1,
        n => {
            return Err(PifanError::invalid_pin(
                name,
                format!("BCM pin {} has no hardware PWM channel (use 12, 13, 18 or 19)", n),
            ))
        }
    };
    Ok(PinChannel { bcm, index })
}

/// Duty as the 0.0..=1.0 fraction the PWM driver expects
pub fn duty_fraction(duty: Duty) -> f64 {
    duty.units() as f64 / DUTY_MAX as f64
}

/// Duty that matches a steady output level
pub fn level_duty(level: Level) -> Duty {
    match level {
        Level::High => Duty::MAX,
        Level::Low => Duty::ZERO,
    }
}

/// One-time check that we are running on a supported Raspberry Pi.
pub fn init_host() -> Result<DeviceInfo> {
    let info = DeviceInfo::new()
        .map_err(|e| PifanError::HardwareNotFound(format!("unsupported board: {}", e)))?;
    debug!(model = %info.model(), "board detected");
    Ok(info)
}

/// A claimed hardware PWM channel
pub struct RppalPwm {
    pin: String,
    mapping: PinChannel,
    pwm: Option<Pwm>,
    /// Present while the pin is held at a steady level as a GPIO output
    output: Option<OutputPin>,
    enabled: bool,
}

impl RppalPwm {
    /// Claim the channel behind `pin`.
    ///
    /// With `chip` unset rppal picks the controller for the detected board;
    /// otherwise channel `index` of `/sys/class/pwm/pwmchip<chip>` is used.
    pub fn open(pin: &str, chip: Option<u8>) -> Result<Self> {
        let mapping = resolve_channel(pin)?;
        let pwm = match chip {
            Some(chip) => Pwm::with_pwmchip(chip, mapping.index),
            None => Pwm::new(mapping.channel()),
        }
        .map_err(|e| {
            PifanError::pwm(pin, format!("cannot claim channel {}: {}", mapping.index, e))
        })?;
        pwm.set_polarity(Polarity::Normal)
            .map_err(|e| PifanError::pwm(pin, e.to_string()))?;

        info!(pin = pin, bcm = mapping.bcm, channel = mapping.index, "claimed PWM channel");
        Ok(Self {
            pin: pin.trim().to_string(),
            mapping,
            pwm: Some(pwm),
            output: None,
            enabled: false,
        })
    }

    pub fn pin(&self) -> &str {
        &self.pin
    }

    pub fn mapping(&self) -> PinChannel {
        self.mapping
    }

    fn channel(&self) -> Result<&Pwm> {
        self.pwm
            .as_ref()
            .ok_or_else(|| PifanError::pwm(&self.pin, "channel already released"))
    }

    /// Hand the pin back to the PWM function if a level was being held.
    fn release_output(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.set_reset_on_drop(true);
        }
    }
}

impl PwmSink for RppalPwm {
    fn set_duty(&mut self, duty: Duty, frequency_hz: u32) -> Result<()> {
        if frequency_hz == 0 {
            return Err(PifanError::pwm(&self.pin, "frequency must be non-zero"));
        }
        self.channel()?;
        self.release_output();

        let pwm = self.channel()?;
        pwm.set_frequency(frequency_hz as f64, duty_fraction(duty))
            .map_err(|e| PifanError::pwm(&self.pin, format!("cannot set {}: {}", duty, e)))?;
        if !self.enabled {
            pwm.enable()
                .map_err(|e| PifanError::pwm(&self.pin, format!("cannot enable: {}", e)))?;
            self.enabled = true;
        }
        Ok(())
    }

    /// Drive the pin as a GPIO output. The level outlives both the channel
    /// and the process, so a fan left high keeps running at full speed.
    fn set_level(&mut self, level: Level) -> Result<()> {
        // Matching duty first, in case the GPIO cannot be claimed
        let fallback = self.channel()?.set_duty_cycle(duty_fraction(level_duty(level)));
        if let Err(e) = fallback {
            warn!(pin = %self.pin, error = %e, "cannot set matching PWM duty");
        }

        if let Some(output) = self.output.as_mut() {
            match level {
                Level::High => output.set_high(),
                Level::Low => output.set_low(),
            }
            return Ok(());
        }

        let gpio_err = |e: rppal::gpio::Error| PifanError::gpio(&self.pin, e.to_string());
        let pin = Gpio::new().map_err(gpio_err)?.get(self.mapping.bcm).map_err(gpio_err)?;
        let mut output = match level {
            Level::High => pin.into_output_high(),
            Level::Low => pin.into_output_low(),
        };
        output.set_reset_on_drop(false);
        self.output = Some(output);
        Ok(())
    }

    /// Stop and release the channel. A level set through `set_level` stays
    /// on the pin.
    fn halt(&mut self) -> Result<()> {
        let pwm = self
            .pwm
            .take()
            .ok_or_else(|| PifanError::pwm(&self.pin, "channel already released"))?;
        let disabled = pwm.disable();
        drop(pwm);
        drop(self.output.take());
        self.enabled = false;
        debug!(channel = self.mapping.index, "PWM channel released");
        disabled.map_err(|e| PifanError::pwm(&self.pin, format!("cannot disable: {}", e)))
    }
}

impl std::fmt::Debug for RppalPwm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RppalPwm")
            .field("pin", &self.pin)
            .field("mapping", &self.mapping)
            .field("released", &self.pwm.is_none())
            .field("holding_level", &self.output.is_some())
            .finish()
    }
}
