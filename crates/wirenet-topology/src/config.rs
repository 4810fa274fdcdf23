//! Wireless range configuration.
//!
//! A modem's reception range grows with altitude: below the high-altitude
//! threshold it is the base range, and above it the range is interpolated
//! linearly up to the high-altitude range at the build ceiling. Thunderstorms
//! switch both ends of the interpolation to their storm values.

use crate::error::{Error, Result};

/// Ranges, in blocks, for wireless modems.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeConfig {
    /// Range at or below the high-altitude threshold.
    pub range: f64,
    /// Range at the build ceiling.
    pub high_altitude_range: f64,
    /// `range` during a thunderstorm.
    pub range_during_storm: f64,
    /// `high_altitude_range` during a thunderstorm.
    pub high_altitude_range_during_storm: f64,
    /// Altitude above which range starts to grow.
    pub high_altitude_threshold: f64,
    /// Highest altitude an endpoint can be at.
    pub ceiling: f64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            range: 64.0,
            high_altitude_range: 384.0,
            range_during_storm: 64.0,
            high_altitude_range_during_storm: 384.0,
            high_altitude_threshold: 96.0,
            ceiling: 255.0,
        }
    }
}

impl RangeConfig {
    /// Defaults overridden by environment variables:
    ///
    /// - `WIRENET_MODEM_RANGE`
    /// - `WIRENET_MODEM_HIGH_ALTITUDE_RANGE`
    /// - `WIRENET_MODEM_RANGE_DURING_STORM`
    /// - `WIRENET_MODEM_HIGH_ALTITUDE_RANGE_DURING_STORM`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let overrides: [(&'static str, &mut f64); 4] = [
            ("WIRENET_MODEM_RANGE", &mut config.range),
            ("WIRENET_MODEM_HIGH_ALTITUDE_RANGE", &mut config.high_altitude_range),
            ("WIRENET_MODEM_RANGE_DURING_STORM", &mut config.range_during_storm),
            (
                "WIRENET_MODEM_HIGH_ALTITUDE_RANGE_DURING_STORM",
                &mut config.high_altitude_range_during_storm,
            ),
        ];

        for (key, field) in overrides {
            if let Some(value) = lookup(key) {
                *field = parse_range(key, &value)?;
            }
        }
        Ok(config)
    }

    /// Reception range of a modem at `altitude`.
    pub fn range_at(&self, altitude: f64, storming: bool) -> f64 {
        let (low, high) = if storming {
            (self.range_during_storm, self.high_altitude_range_during_storm)
        } else {
            (self.range, self.high_altitude_range)
        };

        let span = self.ceiling - self.high_altitude_threshold;
        if altitude > self.high_altitude_threshold && high > low && span > 0.0 {
            let climb = altitude.min(self.ceiling) - self.high_altitude_threshold;
            low + climb * ((high - low) / span)
        } else {
            low
        }
    }
}

fn parse_range(key: &'static str, value: &str) -> Result<f64> {
    match value.trim().parse::<f64>() {
        Ok(range) if range.is_finite() && range >= 0.0 => Ok(range),
        _ => Err(Error::InvalidConfig {
            key,
            value: value.to_string(),
        }),
    }
}
