//! Exact equality and ordering between scalar values.
//!
//! Integers of either signedness compare by mathematical value. An integer and a float
//! compare without rounding the integer: a float equals an integer only when its
//! fractional part is exactly zero.

use std::cmp::Ordering;

use docmock_core::value::Value;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Int64(value) => Some(Number::Int(*value as i128)),
        Value::UInt64(value) => Some(Number::Int(*value as i128)),
        Value::Float64(value) => Some(Number::Float(*value)),
        _ => None,
    }
}

/// Orders an integer against a float. `None` when the float is NaN.
fn compare_int_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }

    let floor = float.floor();
    if floor >= i128::MAX as f64 {
        return Some(Ordering::Less);
    }
    if floor < i128::MIN as f64 {
        return Some(Ordering::Greater);
    }

    match int.cmp(&(floor as i128)) {
        Ordering::Equal if float.fract() == 0.0 => Some(Ordering::Equal),
        // The float sits strictly between `floor` and `floor + 1`.
        Ordering::Equal => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

/// Orders two numeric values of any representation.
pub fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (number(left)?, number(right)?) {
        (Number::Int(left), Number::Int(right)) => Some(left.cmp(&right)),
        (Number::Float(left), Number::Float(right)) => left.partial_cmp(&right),
        (Number::Int(left), Number::Float(right)) => compare_int_float(left, right),
        (Number::Float(left), Number::Int(right)) => {
            compare_int_float(right, left).map(Ordering::reverse)
        }
    }
}

/// Orders values for `$gt`, `$gte`, `$lt` and `$lte`.
///
/// Numbers order numerically, timestamps chronologically and strings lexicographically.
/// Every other pairing is unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Timestamp(left), Value::Timestamp(right)) => Some(left.cmp(right)),
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        _ => compare_numbers(left, right),
    }
}

/// Scalar equality: exact kind and value, except that numbers compare across representations.
pub fn scalar_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::String(left), Value::String(right)) => left == right,
        (Value::ObjectId(left), Value::ObjectId(right)) => left == right,
        (Value::Timestamp(left), Value::Timestamp(right)) => left == right,
        (left, right) if left.is_number() && right.is_number() => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn integers_compare_across_signedness() {
        assert_eq!(compare_numbers(&Value::UInt64(7), &Value::Int64(5)), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&Value::Int64(-1), &Value::UInt64(0)), Some(Ordering::Less));
        assert_eq!(
            compare_numbers(&Value::Int64(i64::MAX), &Value::UInt64(u64::MAX)),
            Some(Ordering::Less)
        );
        assert!(scalar_eq(&Value::UInt64(7), &Value::Int64(7)));
    }

    #[test]
    fn floats_equal_integers_only_when_whole() {
        assert!(scalar_eq(&Value::Float64(1.0), &Value::Int64(1)));
        assert!(!scalar_eq(&Value::Float64(0.5), &Value::Int64(0)));
        assert!(!scalar_eq(&Value::Float64(0.0005), &Value::Int64(0)));
        assert!(!scalar_eq(&Value::Float64(2.0005), &Value::UInt64(2)));
    }

    #[test]
    fn mixed_ordering_uses_the_fractional_part() {
        assert_eq!(compare_numbers(&Value::Int64(3), &Value::Float64(3.5)), Some(Ordering::Less));
        assert_eq!(compare_numbers(&Value::Int64(4), &Value::Float64(3.5)), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&Value::Int64(-4), &Value::Float64(-3.5)), Some(Ordering::Less));
        assert_eq!(compare_numbers(&Value::Int64(-3), &Value::Float64(-3.5)), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&Value::Float64(3.5), &Value::UInt64(3)), Some(Ordering::Greater));
    }

    #[test]
    fn large_integers_do_not_round_through_floats() {
        // 2^53 + 1 is not representable as f64; the float below is exactly 2^53.
        let int = Value::Int64((1 << 53) + 1);
        let float = Value::Float64(9_007_199_254_740_992.0);

        assert_eq!(compare_numbers(&int, &float), Some(Ordering::Greater));
        assert!(!scalar_eq(&int, &float));
    }

    #[test]
    fn special_floats() {
        assert_eq!(compare_numbers(&Value::Int64(1), &Value::Float64(f64::NAN)), None);
        assert_eq!(
            compare_numbers(&Value::UInt64(u64::MAX), &Value::Float64(f64::INFINITY)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_numbers(&Value::Int64(i64::MIN), &Value::Float64(f64::NEG_INFINITY)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn non_numeric_ordering() {
        let earlier = Value::Timestamp(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let later = Value::Timestamp(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());

        assert_eq!(compare_values(&earlier, &later), Some(Ordering::Less));
        assert_eq!(compare_values(&Value::from("b"), &Value::from("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::from("1"), &Value::Int64(1)), None);
        assert_eq!(compare_values(&Value::Bool(true), &Value::Bool(false)), None);
        assert!(!scalar_eq(&Value::from("1"), &Value::Int64(1)));
    }
}
