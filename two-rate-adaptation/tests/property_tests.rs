//! Property tests for schedule generation and feedback geometry.
//!
//! Reproduce: `PROPTEST_SEED=<seed> cargo test -p two-rate-adaptation --test property_tests`

use proptest::prelude::*;
use two_rate_adaptation::schedule::{ConditionCode, Rotation, ScheduleGenerator, TaskType};
use two_rate_adaptation::trial::{
    feedback_cursor, FeedbackMode, FeedbackParams, Point, TrialStep, Workspace,
};

const EPS: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════
// Property 1: The code decomposes into its three choices
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn test_condition_decomposition(code in 0u32..1_000_000) {
        let c = ConditionCode::new(code);
        prop_assert_eq!(c.order_choice(), (code % 6) as usize);
        prop_assert_eq!(c.target_choice(), ((code / 6) % 2) as usize);
        prop_assert_eq!(c.rotation_choice(), ((code / 12) % 2) as usize);
        prop_assert_eq!(c.task_order().ids()[0], 0);
        let cell = ConditionCode::new(code % 24);
        prop_assert_eq!(c.task_order(), cell.task_order());
        prop_assert_eq!(c.rotation_sign(), cell.rotation_sign());
    }

    #[test]
    fn test_parse_accepts_decimal_text(code in 0u32..1_000_000, suffix in "[a-z ]{0,4}") {
        let text = format!("  {}{}", code, suffix);
        prop_assert_eq!(ConditionCode::parse(&text).unwrap().value(), code);
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 2: Each block is a permutation of the task's target set
// ═══════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_target_counts_per_angle(code in 0u32..48, seed in any::<u64>()) {
        let schedule = ScheduleGenerator::with_seed(seed)
            .generate(ConditionCode::new(code))
            .unwrap();
        for task in &schedule.tasks {
            let mut distinct: Vec<f64> = task.target_angles.clone();
            distinct.sort_by(|a, b| a.partial_cmp(b).unwrap());
            distinct.dedup();
            let per_angle = task.len() / distinct.len();
            for angle in &distinct {
                let n = task.target_angles.iter().filter(|a| *a == angle).count();
                prop_assert_eq!(n, per_angle);
            }
            for block in task.target_angles.chunks(distinct.len()) {
                let mut sorted = block.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
                prop_assert_eq!(&sorted, &distinct);
            }
        }
    }

    #[test]
    fn test_ramp_is_linear(code in 0u32..24, seed in any::<u64>()) {
        let schedule = ScheduleGenerator::with_seed(seed)
            .generate(ConditionCode::new(code))
            .unwrap();
        for task in schedule.tasks.iter().filter(|t| t.task_type == TaskType::Ramped) {
            for k in 1..=48usize {
                let expected = k as f64 * 0.625 * task.sign;
                prop_assert!((task.rotations[31 + k].degrees() - expected).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_rotation_sequences_ignore_seed(code in 0u32..24, a in any::<u64>(), b in any::<u64>()) {
        let x = ScheduleGenerator::with_seed(a).generate(ConditionCode::new(code)).unwrap();
        let y = ScheduleGenerator::with_seed(b).generate(ConditionCode::new(code)).unwrap();
        for (tx, ty) in x.tasks.iter().zip(&y.tasks) {
            prop_assert_eq!(&tx.rotations, &ty.rotations);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Property 3: Feedback geometry
// ═══════════════════════════════════════════════════════════════

fn pointer_strategy() -> impl Strategy<Value = Point> {
    (-1.0f64..1.0, -1.0f64..1.0).prop_map(|(x, y)| Point::new(x, y))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn test_rotation_preserves_distance_from_home(
        pointer in pointer_strategy(),
        degrees in -90.0f64..90.0,
    ) {
        let ws = Workspace::default();
        let cursor = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            pointer,
            50.0,
            Rotation::Degrees(degrees),
        );
        prop_assert_eq!(cursor.mode, FeedbackMode::Rotated);
        prop_assert!((cursor.position.distance(ws.home) - pointer.distance(ws.home)).abs() < EPS);
    }

    #[test]
    fn test_clamp_lies_on_target_line(
        pointer in pointer_strategy(),
        angle in prop::sample::select(vec![40.0f64, 50.0, 130.0, 140.0]),
    ) {
        let ws = Workspace::default();
        let cursor = feedback_cursor(
            &ws,
            &FeedbackParams::default(),
            TrialStep::TargetReach,
            pointer,
            angle,
            Rotation::Clamped,
        );
        let offset = cursor.position - ws.home;
        let d = pointer.distance(ws.home);
        prop_assert!((offset.norm() - d).abs() < EPS);
        let direction = Point::polar(1.0, angle.to_radians());
        // Cross product with the target direction vanishes on the line
        prop_assert!((offset.x * direction.y - offset.y * direction.x).abs() < EPS);
        prop_assert!(offset.x * direction.x + offset.y * direction.y >= -EPS);
    }

    #[test]
    fn test_home_feedback_ring_threshold(pointer in pointer_strategy()) {
        let ws = Workspace::default();
        let params = FeedbackParams::default();
        let cursor = feedback_cursor(
            &ws,
            &params,
            TrialStep::HomeReturn,
            pointer,
            130.0,
            Rotation::Clamped,
        );
        let d = pointer.distance(ws.home);
        if d > params.ring_threshold * ws.home_target_distance {
            prop_assert_eq!(cursor.mode, FeedbackMode::Ring);
            prop_assert_eq!(cursor.position, ws.home);
            prop_assert!((cursor.radius - d).abs() < EPS);
        } else {
            prop_assert_eq!(cursor.mode, FeedbackMode::Veridical);
            prop_assert_eq!(cursor.position, pointer);
        }
    }
}
