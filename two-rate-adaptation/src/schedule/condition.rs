//! Condition Codes & Counterbalancing
//!
//! A single non-negative integer selects the counterbalancing cell of a
//! participant: the order of the three tasks, which sign the rotations of the
//! second and third task carry, and which target-angle pair each of those
//! tasks uses.
//!
//! ```text
//! order_choice    = code mod 6
//! target_choice   = floor(code / 6)  mod 2
//! rotation_choice = floor(code / 12) mod 2
//! ```
//!
//! The decomposition is total, so codes 0..24 enumerate every cell and larger
//! codes wrap around.

use super::task_type::TaskType;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six admissible task orders. Baseline always comes first.
pub const TASK_ORDERS: [[TaskType; 3]; 6] = [
    [TaskType::Baseline, TaskType::Abrupt, TaskType::Ramped],
    [TaskType::Baseline, TaskType::Abrupt, TaskType::Stepped],
    [TaskType::Baseline, TaskType::Ramped, TaskType::Abrupt],
    [TaskType::Baseline, TaskType::Ramped, TaskType::Stepped],
    [TaskType::Baseline, TaskType::Stepped, TaskType::Abrupt],
    [TaskType::Baseline, TaskType::Stepped, TaskType::Ramped],
];

/// Number of distinct counterbalancing cells (6 orders x 2 targets x 2 signs).
pub const CONDITION_CELLS: u32 = 24;

/// Counterbalancing selector supplied by the experimenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ConditionCode(u32);

impl ConditionCode {
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Parse a condition code from free-form text.
    ///
    /// Leading whitespace is skipped and the leading run of digits is used,
    /// so `"13"`, `" 13"` and `"13b"` all give 13. Text without a leading
    /// integer, negative values and values that overflow are rejected.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim_start();
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 {
            return Err(Error::InvalidConditionCode(format!(
                "'{}' does not start with an integer",
                input
            )));
        }

        let digits = &rest[..digits_len];
        if negative && digits.bytes().any(|b| b != b'0') {
            return Err(Error::InvalidConditionCode(format!(
                "'{}' is negative",
                input
            )));
        }

        digits.parse::<u32>().map(Self).map_err(|e| {
            Error::InvalidConditionCode(format!("'{}' is out of range: {}", input, e))
        })
    }

    /// Parse a condition code, falling back to code 0 when the text is not a
    /// usable integer.
    pub fn parse_or_default(input: &str) -> Self {
        match Self::parse(input) {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!(input = %input, error = %err, "Falling back to condition code 0");
                Self::default()
            }
        }
    }

    /// Index into [`TASK_ORDERS`].
    pub const fn order_choice(&self) -> usize {
        (self.0 % 6) as usize
    }

    /// 0 = first target pair on task 1, 1 = pairs swapped.
    pub const fn target_choice(&self) -> usize {
        ((self.0 / 6) % 2) as usize
    }

    /// 0 = `[+1, -1]`, 1 = `[-1, +1]`.
    pub const fn rotation_choice(&self) -> usize {
        ((self.0 / 12) % 2) as usize
    }

    pub fn task_order(&self) -> TaskOrder {
        TaskOrder(TASK_ORDERS[self.order_choice()])
    }

    pub fn rotation_sign(&self) -> RotationSign {
        match self.rotation_choice() {
            0 => RotationSign::PositiveFirst,
            _ => RotationSign::NegativeFirst,
        }
    }

    /// Full decomposition of the code.
    pub fn counterbalance(&self) -> Counterbalance {
        Counterbalance {
            code: *self,
            order_choice: self.order_choice(),
            target_choice: self.target_choice(),
            rotation_choice: self.rotation_choice(),
            order: self.task_order(),
            sign: self.rotation_sign(),
        }
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ConditionCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Ordered sequence of the three task types run in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOrder(pub [TaskType; 3]);

impl TaskOrder {
    pub fn task_type(&self, task_index: usize) -> Option<TaskType> {
        self.0.get(task_index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskType> + '_ {
        self.0.iter().copied()
    }

    /// Numeric identifiers (0 = baseline .. 3 = stepped).
    pub fn ids(&self) -> [u8; 3] {
        [self.0[0].id(), self.0[1].id(), self.0[2].id()]
    }
}

/// Sign multipliers for the rotations of task index 1 and task index 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationSign {
    /// `[+1, -1]`
    PositiveFirst,
    /// `[-1, +1]`
    NegativeFirst,
}

impl RotationSign {
    pub fn as_pair(&self) -> [f64; 2] {
        match self {
            RotationSign::PositiveFirst => [1.0, -1.0],
            RotationSign::NegativeFirst => [-1.0, 1.0],
        }
    }

    /// Multiplier applied to the rotations of the task at `task_index`.
    ///
    /// Task index `i >= 1` uses entry `i - 1` of the pair. Task index 0 is
    /// always the baseline task, which carries no signed rotation.
    pub fn for_task(&self, task_index: usize) -> f64 {
        match task_index {
            0 => 1.0,
            i => self.as_pair().get(i - 1).copied().unwrap_or(1.0),
        }
    }
}

/// Everything derived from one condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterbalance {
    pub code: ConditionCode,
    pub order_choice: usize,
    pub target_choice: usize,
    pub rotation_choice: usize,
    pub order: TaskOrder,
    pub sign: RotationSign,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_code_zero() {
        let code = ConditionCode::new(0);
        assert_eq!(code.order_choice(), 0);
        assert_eq!(code.target_choice(), 0);
        assert_eq!(code.rotation_choice(), 0);
        assert_eq!(code.task_order().ids(), [0, 1, 2]);
        assert_eq!(code.rotation_sign().as_pair(), [1.0, -1.0]);
    }

    #[test]
    fn test_decomposition_code_thirteen() {
        let code = ConditionCode::new(13);
        assert_eq!(code.order_choice(), 1);
        assert_eq!(code.target_choice(), 0);
        assert_eq!(code.rotation_choice(), 1);
        assert_eq!(code.task_order().ids(), [0, 1, 3]);
        assert_eq!(code.rotation_sign(), RotationSign::NegativeFirst);
    }

    #[test]
    fn test_all_six_orders() {
        let expected = [[0, 1, 2], [0, 1, 3], [0, 2, 1], [0, 2, 3], [0, 3, 1], [0, 3, 2]];
        for (choice, ids) in expected.iter().enumerate() {
            let code = ConditionCode::new(choice as u32);
            assert_eq!(&code.task_order().ids(), ids, "order choice {}", choice);
        }
    }

    #[test]
    fn test_target_choice_cycles_every_six() {
        assert_eq!(ConditionCode::new(5).target_choice(), 0);
        assert_eq!(ConditionCode::new(6).target_choice(), 1);
        assert_eq!(ConditionCode::new(11).target_choice(), 1);
        assert_eq!(ConditionCode::new(12).target_choice(), 0);
    }

    #[test]
    fn test_codes_wrap_after_all_cells() {
        for code in 0..CONDITION_CELLS {
            let a = ConditionCode::new(code).counterbalance();
            let b = ConditionCode::new(code + CONDITION_CELLS).counterbalance();
            assert_eq!(a.order, b.order);
            assert_eq!(a.sign, b.sign);
            assert_eq!(a.target_choice, b.target_choice);
        }
    }

    #[test]
    fn test_parse_plain_and_prefixed() {
        assert_eq!(ConditionCode::parse("13").unwrap().value(), 13);
        assert_eq!(ConditionCode::parse("  7").unwrap().value(), 7);
        assert_eq!(ConditionCode::parse("21abc").unwrap().value(), 21);
        assert_eq!(ConditionCode::parse("+4").unwrap().value(), 4);
        assert_eq!(ConditionCode::parse("-0").unwrap().value(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ConditionCode::parse("abc"),
            Err(Error::InvalidConditionCode(_))
        ));
        assert!(matches!(
            ConditionCode::parse(""),
            Err(Error::InvalidConditionCode(_))
        ));
        assert!(matches!(
            ConditionCode::parse("-3"),
            Err(Error::InvalidConditionCode(_))
        ));
        assert!(matches!(
            ConditionCode::parse("99999999999999"),
            Err(Error::InvalidConditionCode(_))
        ));
    }

    #[test]
    fn test_parse_or_default_falls_back_to_zero() {
        assert_eq!(ConditionCode::parse_or_default("test").value(), 0);
        assert_eq!(ConditionCode::parse_or_default("-5").value(), 0);
        assert_eq!(ConditionCode::parse_or_default("17").value(), 17);
    }

    #[test]
    fn test_sign_for_task() {
        let sign = RotationSign::PositiveFirst;
        assert_eq!(sign.for_task(0), 1.0);
        assert_eq!(sign.for_task(1), 1.0);
        assert_eq!(sign.for_task(2), -1.0);

        let sign = RotationSign::NegativeFirst;
        assert_eq!(sign.for_task(1), -1.0);
        assert_eq!(sign.for_task(2), 1.0);
    }

    #[test]
    fn test_counterbalance_serializes() {
        let cb = ConditionCode::new(19).counterbalance();
        let json = serde_json::to_string(&cb).unwrap();
        assert!(json.contains("\"code\":19"));
        assert!(json.contains("negative_first"));
        assert!(json.contains("\"order\":[\"baseline\",\"abrupt\",\"stepped\"]"));
    }
}
