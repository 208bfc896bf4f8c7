//! Differential output level planning for the Q/Q! outputs.
//!
//! The CG635 has no command that sets the Q/Q! rails to absolute voltages.
//! Selecting LVDS resets them to 1.07 V / 1.43 V, and from there each rail is
//! walked to its target in 10 mV steps. The instrument holds the differential
//! between 0.20 V and 1.00 V at all times, so once the low rail has moved the
//! high rail may no longer be at its factory value; the planner re-anchors it
//! before counting high-rail steps.
//!
//! All arithmetic is in hundredths of a volt. The plan is computed from the
//! known defaults alone; the instrument is never read back.

use crate::error::{Cg635Error, Cg635Result};

/// Low rail after selecting LVDS, in hundredths of a volt
pub const LVDS_DEFAULT_LOW: i32 = 107;
/// High rail after selecting LVDS, in hundredths of a volt
pub const LVDS_DEFAULT_HIGH: i32 = 143;
/// Smallest differential the instrument accepts, in hundredths of a volt
pub const MIN_DIFFERENTIAL: i32 = 20;
/// Largest differential the instrument accepts, in hundredths of a volt
pub const MAX_DIFFERENTIAL: i32 = 100;
/// Largest rail magnitude the planner accepts, in hundredths of a volt
pub const MAX_RAIL_MAGNITUDE: i32 = 1000;
/// Step size programmed on both rails, in volts
pub const LEVEL_STEP_VOLTS: f64 = 0.01;

// Absorbs binary representation error so 0.29 V maps to 29, not 28.
const TRUNCATION_GUARD: f64 = 1e-9;

/// Truncate a voltage to whole hundredths of a volt (0.205 V -> 20).
///
/// Returns `None` for NaN, infinities and values too large for an `i32`.
pub fn to_hundredths(volts: f64) -> Option<i32> {
    if !volts.is_finite() {
        return None;
    }
    let scaled = volts * 100.0;
    let truncated = (scaled + TRUNCATION_GUARD.copysign(scaled)).trunc();
    if truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        return None;
    }
    Some(truncated as i32)
}

/// Step counts that move the LVDS rails from their defaults to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifferentialPlan {
    /// Low rail target, hundredths of a volt
    pub low_target: i32,
    /// High rail target, hundredths of a volt
    pub high_target: i32,
    /// High rail position assumed once the low rail has been stepped
    pub high_anchor: i32,
    /// Signed low-rail steps (negative steps down)
    pub low_delta: i32,
    /// Signed high-rail steps (negative steps down)
    pub high_delta: i32,
}

impl DifferentialPlan {
    /// Plan the steps for `low_volts` / `high_volts`.
    ///
    /// Fails with `DifferentialOutOfRange` when the truncated differential is
    /// outside [0.20 V, 1.00 V], when either voltage is not finite, or when a
    /// rail lies beyond ±10 V.
    pub fn new(low_volts: f64, high_volts: f64) -> Cg635Result<Self> {
        Self::plan(low_volts, high_volts).ok_or(Cg635Error::DifferentialOutOfRange {
            low: low_volts,
            high: high_volts,
        })
    }

    fn plan(low_volts: f64, high_volts: f64) -> Option<Self> {
        let low_target = to_hundredths(low_volts)?;
        let high_target = to_hundredths(high_volts)?;

        let rail = -MAX_RAIL_MAGNITUDE..=MAX_RAIL_MAGNITUDE;
        if !rail.contains(&low_target) || !rail.contains(&high_target) {
            return None;
        }

        let differential = high_target - low_target;
        if !(MIN_DIFFERENTIAL..=MAX_DIFFERENTIAL).contains(&differential) {
            return None;
        }

        let high_anchor = if low_target > LVDS_DEFAULT_HIGH {
            low_target + MIN_DIFFERENTIAL
        } else if LVDS_DEFAULT_HIGH - low_target > MAX_DIFFERENTIAL {
            low_target + MAX_DIFFERENTIAL
        } else {
            LVDS_DEFAULT_HIGH
        };

        Some(Self {
            low_target,
            high_target,
            high_anchor,
            low_delta: low_target - LVDS_DEFAULT_LOW,
            high_delta: high_target - high_anchor,
        })
    }

    /// Total single-step commands the plan issues
    pub fn step_count(&self) -> u32 {
        self.low_delta.unsigned_abs() + self.high_delta.unsigned_abs()
    }
}
