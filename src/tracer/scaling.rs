//! # Measurement Scaling
//!
//! Status replies carry voltages and currents as raw 16-bit device units.
//! Firmware revisions document them either as hundredths (raw / 100 gives volts
//! and amps) or as tens of milli-units (raw × 10 gives millivolts and
//! milliamps), so the conversion is a per-device configuration value rather
//! than a constant.

use crate::tracer::reply::StatusReply;
use serde::{Deserialize, Serialize};

/// Raw-to-engineering-unit conversion: `raw * multiplier / divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scaling {
    pub multiplier: f64,
    pub divisor: f64,
    pub voltage_unit: &'static str,
    pub current_unit: &'static str,
}

impl Scaling {
    /// raw / 100, in V and A
    pub const CENTI: Scaling = Scaling {
        multiplier: 1.0,
        divisor: 100.0,
        voltage_unit: "V",
        current_unit: "A",
    };

    /// raw × 10, in mV and mA
    pub const MILLI: Scaling = Scaling {
        multiplier: 10.0,
        divisor: 1.0,
        voltage_unit: "mV",
        current_unit: "mA",
    };

    pub fn apply(&self, raw: u16) -> f64 {
        f64::from(raw) * self.multiplier / self.divisor
    }

    pub fn power_unit(&self) -> &'static str {
        if self.voltage_unit == "mV" {
            "µW"
        } else {
            "W"
        }
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Scaling::CENTI
    }
}

/// Configurable choice of scaling convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingPreset {
    #[default]
    Centi,
    Milli,
}

impl ScalingPreset {
    pub fn scaling(self) -> Scaling {
        match self {
            ScalingPreset::Centi => Scaling::CENTI,
            ScalingPreset::Milli => Scaling::MILLI,
        }
    }
}

/// A status reply converted to engineering units, with derived values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurements {
    pub battery_voltage: f64,
    pub panel_voltage: f64,
    pub battery_min_voltage: f64,
    pub battery_max_voltage: f64,
    pub load_current: f64,
    pub pv_current: f64,
    pub panel_power: f64,
    /// `None` when the controller reports min == max
    pub battery_level_percent: Option<f64>,
    /// Positive while charging, negative while discharging
    pub battery_flow_power: f64,
    pub temperature: i16,
}

impl StatusReply {
    pub fn measurements(&self, scaling: &Scaling) -> Measurements {
        let battery = scaling.apply(self.battery_voltage);
        let panel = scaling.apply(self.panel_voltage);
        let min = scaling.apply(self.battery_min_voltage);
        let max = scaling.apply(self.battery_max_voltage);
        let load = scaling.apply(self.load_current);
        let pv = scaling.apply(self.pv_current);

        let level = if self.battery_max_voltage != self.battery_min_voltage {
            Some(100.0 * (battery - min) / (max - min))
        } else {
            None
        };

        // A full battery absorbs nothing; only the discharge component counts.
        let flow_current = pv - load;
        let flow_current = if self.battery_full {
            flow_current.min(0.0)
        } else {
            flow_current
        };

        Measurements {
            battery_voltage: battery,
            panel_voltage: panel,
            battery_min_voltage: min,
            battery_max_voltage: max,
            load_current: load,
            pv_current: pv,
            panel_power: panel * pv,
            battery_level_percent: level,
            battery_flow_power: flow_current * battery,
            temperature: self.temperature,
        }
    }
}
