//! Compile-time constant folding: the re-architected closed sum of
//! evaluable values replacing the source's dynamic `Any` container.
//!
//! Failure (overflow, mismatched operand kinds) is reported as `None`
//! rather than by exception, per the design note's resolution.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalValue {
    Signed(i64),
    Unsigned(u64),
    Double(f64),
}

impl EvalValue {
    pub fn add(self, rhs: EvalValue) -> Option<EvalValue> {
        self.fold(rhs, i64::checked_add, u64::checked_add, |a, b| Some(a + b))
    }

    pub fn sub(self, rhs: EvalValue) -> Option<EvalValue> {
        self.fold(rhs, i64::checked_sub, u64::checked_sub, |a, b| Some(a - b))
    }

    pub fn mul(self, rhs: EvalValue) -> Option<EvalValue> {
        self.fold(rhs, i64::checked_mul, u64::checked_mul, |a, b| Some(a * b))
    }

    pub fn div(self, rhs: EvalValue) -> Option<EvalValue> {
        self.fold(
            rhs,
            i64::checked_div,
            u64::checked_div,
            |a, b| if b == 0.0 { None } else { Some(a / b) },
        )
    }

    /// `0 - operand`, used by unary `-`; `0 + operand` (identity) by unary `+`.
    pub fn negate(self) -> Option<EvalValue> {
        EvalValue::Signed(0).sub(self)
    }

    fn fold(
        self,
        rhs: EvalValue,
        signed: impl Fn(i64, i64) -> Option<i64>,
        unsigned: impl Fn(u64, u64) -> Option<u64>,
        double: impl Fn(f64, f64) -> Option<f64>,
    ) -> Option<EvalValue> {
        match (self, rhs) {
            (EvalValue::Signed(a), EvalValue::Signed(b)) => signed(a, b).map(EvalValue::Signed),
            (EvalValue::Unsigned(a), EvalValue::Unsigned(b)) => {
                unsigned(a, b).map(EvalValue::Unsigned)
            }
            (EvalValue::Double(a), EvalValue::Double(b)) => double(a, b).map(EvalValue::Double),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_same_kind() {
        assert_eq!(
            EvalValue::Signed(1).add(EvalValue::Signed(2)),
            Some(EvalValue::Signed(3))
        );
    }

    #[test]
    fn mismatched_kinds_fail() {
        assert_eq!(EvalValue::Signed(1).add(EvalValue::Unsigned(2)), None);
    }

    #[test]
    fn overflow_fails() {
        assert_eq!(EvalValue::Signed(i64::MAX).add(EvalValue::Signed(1)), None);
    }

    #[test]
    fn negate_is_zero_minus_operand() {
        assert_eq!(EvalValue::Signed(5).negate(), Some(EvalValue::Signed(-5)));
    }
}
