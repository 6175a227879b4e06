//! Feedback Cursor Geometry
//!
//! Derives what the participant sees in place of the pointer:
//!
//! - Rotated trials: the pointer rotated rigidly about home.
//! - Clamped trials, outward reach: the cursor slides along the home-target
//!   line at the pointer's distance from home, so no directional error is
//!   visible.
//! - Clamped trials, near home: beyond a threshold only a ring centred on
//!   home shows how far away the pointer is; inside it the true pointer is
//!   shown for fine positioning.

use super::geometry::{Point, Workspace};
use super::state::TrialStep;
use crate::schedule::Rotation;
use serde::{Deserialize, Serialize};

/// Tunables for clamped feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackParams {
    /// Ring appears beyond this fraction of the home-target distance
    pub ring_threshold: f64,
    /// Opacity of the distance ring
    pub ring_opacity: f64,
}

impl Default for FeedbackParams {
    fn default() -> Self {
        Self {
            ring_threshold: 0.20,
            ring_opacity: 0.2,
        }
    }
}

/// Which rule produced the cursor pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// Pointer rotated about home
    Rotated,
    /// Projected onto the home-target line
    Clamped,
    /// Distance-only ring centred on home
    Ring,
    /// True pointer position
    Veridical,
    /// Not yet shown
    Hidden,
}

/// Pose of the feedback cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCursor {
    pub position: Point,
    pub radius: f64,
    pub opacity: f64,
    pub mode: FeedbackMode,
}

impl FeedbackCursor {
    /// Off-screen starting pose used before the first frame.
    pub fn offscreen(radius: f64) -> Self {
        Self {
            position: Point::new(1.5, 1.5),
            radius,
            opacity: 1.0,
            mode: FeedbackMode::Hidden,
        }
    }
}

/// Compute the feedback cursor for one frame.
pub fn feedback_cursor(
    workspace: &Workspace,
    params: &FeedbackParams,
    step: TrialStep,
    pointer: Point,
    target_angle_deg: f64,
    rotation: Rotation,
) -> FeedbackCursor {
    let home = workspace.home;
    let marker = workspace.cursor_radius;

    if let Some(theta) = rotation.radians() {
        return FeedbackCursor {
            position: pointer.rotate_about(home, theta),
            radius: marker,
            opacity: 1.0,
            mode: FeedbackMode::Rotated,
        };
    }

    let home_distance = pointer.distance(home);
    match step {
        // Without a target direction there is no line to clamp onto.
        TrialStep::TargetReach if target_angle_deg.is_finite() => FeedbackCursor {
            position: home + Point::polar(home_distance, target_angle_deg.to_radians()),
            radius: marker,
            opacity: 1.0,
            mode: FeedbackMode::Clamped,
        },
        TrialStep::TargetReach => veridical(pointer, marker),
        TrialStep::HomeAcquire | TrialStep::HomeReturn => {
            if home_distance > params.ring_threshold * workspace.home_target_distance {
                FeedbackCursor {
                    position: home,
                    radius: home_distance,
                    opacity: params.ring_opacity,
                    mode: FeedbackMode::Ring,
                }
            } else {
                veridical(pointer, marker)
            }
        }
    }
}

fn veridical(pointer: Point, radius: f64) -> FeedbackCursor {
    FeedbackCursor {
        position: pointer,
        radius,
        opacity: 1.0,
        mode: FeedbackMode::Veridical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn origin_workspace() -> Workspace {
        Workspace {
            width: 2.0,
            height: 1.0,
            home: Point::ORIGIN,
            home_target_distance: 1.0,
            cursor_radius: 0.025,
        }
    }

    #[test]
    fn test_rotated_feedback_thirty_degrees() {
        let ws = origin_workspace();
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            Point::new(1.0, 0.0),
            90.0,
            Rotation::Degrees(30.0),
        );
        assert!((fb.position.x - 30f64.to_radians().cos()).abs() < EPS);
        assert!((fb.position.y - 30f64.to_radians().sin()).abs() < EPS);
        assert_eq!(fb.radius, ws.cursor_radius);
        assert_eq!(fb.opacity, 1.0);
        assert_eq!(fb.mode, FeedbackMode::Rotated);
    }

    #[test]
    fn test_rotation_applies_in_every_step() {
        let ws = origin_workspace();
        for step in [TrialStep::HomeAcquire, TrialStep::TargetReach, TrialStep::HomeReturn] {
            let fb = feedback_cursor(
                &ws,
                &FeedbackParams::default(),
                step,
                Point::new(0.0, 0.5),
                40.0,
                Rotation::Degrees(-90.0),
            );
            assert!((fb.position.x - 0.5).abs() < EPS);
            assert!(fb.position.y.abs() < EPS);
        }
    }

    #[test]
    fn test_rotation_about_offset_home() {
        let ws = Workspace::default();
        let pointer = ws.home + Point::new(0.1, 0.0);
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            pointer,
            40.0,
            Rotation::Degrees(90.0),
        );
        let rel = fb.position - ws.home;
        assert!(rel.x.abs() < EPS);
        assert!((rel.y - 0.1).abs() < EPS);
    }

    #[test]
    fn test_clamped_reach_lies_on_target_line() {
        let ws = origin_workspace();
        let pointer = Point::new(-0.3, 0.4);
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            pointer,
            40.0,
            Rotation::Clamped,
        );
        let angle = fb.position.y.atan2(fb.position.x).to_degrees();
        assert!((angle - 40.0).abs() < EPS);
        assert!((fb.position.norm() - 0.5).abs() < EPS);
        assert_eq!(fb.mode, FeedbackMode::Clamped);
    }

    #[test]
    fn test_clamped_home_far_shows_ring() {
        let ws = origin_workspace();
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::HomeReturn,
            Point::new(0.0, 0.6),
            130.0,
            Rotation::Clamped,
        );
        assert_eq!(fb.position, ws.home);
        assert!((fb.radius - 0.6).abs() < EPS);
        assert_eq!(fb.opacity, 0.2);
        assert_eq!(fb.mode, FeedbackMode::Ring);
    }

    #[test]
    fn test_clamped_home_near_shows_pointer() {
        let ws = origin_workspace();
        let pointer = Point::new(0.05, 0.1);
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::HomeAcquire,
            pointer,
            130.0,
            Rotation::Clamped,
        );
        assert_eq!(fb.position, pointer);
        assert_eq!(fb.radius, ws.cursor_radius);
        assert_eq!(fb.opacity, 1.0);
    }

    #[test]
    fn test_clamped_without_target_angle_is_veridical() {
        let ws = origin_workspace();
        let pointer = Point::new(0.3, 0.3);
        let fb = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            pointer,
            f64::NAN,
            Rotation::Clamped,
        );
        assert_eq!(fb.position, pointer);
        assert_eq!(fb.mode, FeedbackMode::Veridical);
    }
}
