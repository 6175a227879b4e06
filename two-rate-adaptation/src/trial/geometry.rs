//! Workspace Geometry
//!
//! Positions are in normalised screen units: the shorter screen side spans
//! 1.0 and the origin is the screen centre. The reach workspace is a 2:1
//! rectangle inside the central two thirds of the screen; its height sets
//! the home-target distance.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// 2D point / vector in normalised screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from the origin in direction `angle_rad`.
    pub fn polar(radius: f64, angle_rad: f64) -> Self {
        Self {
            x: radius * angle_rad.cos(),
            y: radius * angle_rad.sin(),
        }
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).norm()
    }

    /// Rotate counter-clockwise about the origin.
    pub fn rotate(&self, angle_rad: f64) -> Self {
        let (sin, cos) = angle_rad.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Rotate counter-clockwise about `center`.
    pub fn rotate_about(&self, center: Point, angle_rad: f64) -> Self {
        center + (*self - center).rotate(angle_rad)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Parameters that size the workspace from the screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Screen width in pixels
    pub screen_width: f64,
    /// Screen height in pixels
    pub screen_height: f64,
    /// Fraction of each normalised screen side available to the workspace
    pub usable_fraction: f64,
    /// Workspace width / height
    pub aspect: f64,
    /// Home sits this fraction of the workspace height below the centre
    pub home_offset: f64,
    /// Cursor (and acquisition) radius as a fraction of the home-target distance
    pub cursor_radius_fraction: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            screen_width: 1920.0,
            screen_height: 1080.0,
            usable_fraction: 2.0 / 3.0,
            aspect: 2.0,
            home_offset: 0.35,
            cursor_radius_fraction: 0.025,
        }
    }
}

/// Resolved workspace for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub width: f64,
    pub height: f64,
    pub home: Point,
    pub home_target_distance: f64,
    pub cursor_radius: f64,
}

impl Workspace {
    /// Lay out the workspace for the given screen.
    pub fn from_layout(params: &LayoutParams) -> Self {
        let short_side = params.screen_width.min(params.screen_height);
        let screen_w = params.screen_width / short_side;
        let screen_h = params.screen_height / short_side;

        let mut width = params.usable_fraction * screen_w;
        let mut height = params.usable_fraction * screen_h;
        if height * params.aspect < width {
            width = height * params.aspect;
        } else {
            height = width / params.aspect;
        }

        Self {
            width,
            height,
            home: Point::new(0.0, -params.home_offset * height),
            home_target_distance: height,
            cursor_radius: height * params.cursor_radius_fraction,
        }
    }

    /// Target location for a target angle in degrees (0° = right, CCW).
    pub fn target_position(&self, angle_deg: f64) -> Point {
        self.home + Point::polar(self.home_target_distance, angle_deg.to_radians())
    }

    /// Position relative to home, scaled so the home-target distance is 1.
    pub fn normalise(&self, p: Point) -> Point {
        (p - self.home) * (1.0 / self.home_target_distance)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::from_layout(&LayoutParams::default())
    }
}
