//! Visual Rotation Values
//!
//! A trial either rotates the feedback cursor by a fixed angle or gives
//! error-clamped feedback. Data files encode the clamp as `NaN` (JSON
//! `null`); inside the crate it is a distinct variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual perturbation applied on one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Rotation {
    /// No rotation; feedback is clamped to the home-target line.
    Clamped,
    /// Rigid rotation of the cursor about home, in degrees (counter-clockwise).
    Degrees(f64),
}

impl Rotation {
    /// Interpret a raw angle, mapping `NaN` to [`Rotation::Clamped`].
    pub fn from_degrees(deg: f64) -> Self {
        if deg.is_nan() {
            Rotation::Clamped
        } else {
            Rotation::Degrees(deg)
        }
    }

    /// Raw angle in degrees, `NaN` for clamped trials.
    pub fn degrees(&self) -> f64 {
        match self {
            Rotation::Clamped => f64::NAN,
            Rotation::Degrees(deg) => *deg,
        }
    }

    pub fn radians(&self) -> Option<f64> {
        match self {
            Rotation::Clamped => None,
            Rotation::Degrees(deg) => Some(deg.to_radians()),
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Rotation::Clamped)
    }

    /// Multiply by a sign. Clamped stays clamped.
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            Rotation::Clamped => Rotation::Clamped,
            // Only nonzero rotations carry a sign.
            Rotation::Degrees(deg) if *deg == 0.0 => Rotation::Degrees(0.0),
            Rotation::Degrees(deg) => Rotation::Degrees(deg * factor),
        }
    }
}

impl From<Option<f64>> for Rotation {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Rotation::Clamped, Rotation::from_degrees)
    }
}

impl From<Rotation> for Option<f64> {
    fn from(value: Rotation) -> Self {
        match value {
            Rotation::Clamped => None,
            Rotation::Degrees(deg) => Some(deg),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rotation::Clamped => write!(f, "clamp"),
            Rotation::Degrees(deg) => write!(f, "{}°", deg),
        }
    }
}
