//! Fade curve implementations for music bed fades
//!
//! Both curves map a normalized position (0.0 = fade start, 1.0 = fade end)
//! to a gain multiplier. A run picks one curve and uses it for every fade-in
//! and fade-out it applies.

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Fade curve types
///
/// - Linear: constant rate of change, v(t) = t
/// - EqualPower: constant perceived loudness, v(t) = sin(t × π/2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    #[default]
    Linear,
    EqualPower,
}

impl FadeCurve {
    /// Fade-in multiplier at `position` (0.0 to 1.0), rising from 0.0 to 1.0
    pub fn calculate_fade_in(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Fade-out multiplier at `position` (0.0 to 1.0), falling from 1.0 to 0.0
    pub fn calculate_fade_out(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }
}
