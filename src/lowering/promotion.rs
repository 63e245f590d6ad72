//! Numeric-type promotion for binary arithmetic (`+ - * /`).
//!
//! This is the re-architected closed-form version of the promotion table:
//! rather than a literal pairwise table, the four governing rules from the
//! front-end's design are encoded directly as match arms. Mixed combinations
//! the rules leave undefined (e.g. `long × half`) return `None`, which
//! callers surface as a promotion failure (a type error).

use crate::ast::types::{PrimitiveIdentifier::*, SimpleType};

/// Computes the result type of a binary arithmetic operation over two
/// primitive operand types, or `None` if the combination is outside the
/// table.
pub fn promote(lhs: SimpleType, rhs: SimpleType) -> Option<SimpleType> {
    if lhs.identifier == Void || rhs.identifier == Void {
        return None;
    }

    // Rule 1: double dominates, with the preserved quirk that `double × int`
    // yields `int` rather than `double`. This is flagged as almost certainly
    // a bug upstream and preserved verbatim rather than silently "fixed".
    if lhs.identifier == Double || rhs.identifier == Double {
        let other = if lhs.identifier == Double { rhs } else { lhs };
        return Some(if other.identifier == Int {
            other
        } else {
            SimpleType::signed(Double)
        });
    }

    // Rule 2: single beats any remaining integer type.
    if lhs.identifier == Single || rhs.identifier == Single {
        return Some(SimpleType::signed(Single));
    }

    // Rule 3: half interacts only with the 8-bit types (and itself).
    if lhs.identifier == Half || rhs.identifier == Half {
        let other = if lhs.identifier == Half { rhs } else { lhs };
        return if other.identifier == Half || other.width() == 8 {
            Some(SimpleType::signed(Half))
        } else {
            None
        };
    }

    // Rule 4: integer promotion. Widest width wins; ties go to the unsigned
    // variant; an 8-bit operand paired with something 16-bit-or-wider
    // promotes to the wider (and therefore signed-capable) type.
    let (lw, rw) = (lhs.width(), rhs.width());
    match lw.cmp(&rw) {
        std::cmp::Ordering::Equal => Some(if lhs.is_unsigned { lhs } else { rhs }),
        std::cmp::Ordering::Greater => Some(lhs),
        std::cmp::Ordering::Less => Some(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::SimpleType as S;

    #[test]
    fn double_dominates() {
        let r = promote(S::signed(Double), S::signed(Long)).unwrap();
        assert_eq!(r.identifier, Double);
    }

    #[test]
    fn double_times_int_quirk_preserved() {
        let r = promote(S::signed(Double), S::signed(Int)).unwrap();
        assert_eq!(r.identifier, Int);
        let r2 = promote(S::signed(Int), S::signed(Double)).unwrap();
        assert_eq!(r2.identifier, Int);
    }

    #[test]
    fn single_beats_integers() {
        let r = promote(S::signed(Single), S::signed(Long)).unwrap();
        assert_eq!(r.identifier, Single);
    }

    #[test]
    fn half_with_char_is_half() {
        let r = promote(S::signed(Half), S::signed(Char)).unwrap();
        assert_eq!(r.identifier, Half);
    }

    #[test]
    fn half_with_wide_integer_is_a_promotion_failure() {
        assert!(promote(S::signed(Half), S::signed(Long)).is_none());
    }

    #[test]
    fn widest_width_wins() {
        let r = promote(S::signed(Char), S::signed(Long)).unwrap();
        assert_eq!(r.identifier, Long);
    }

    #[test]
    fn equal_width_unsigned_wins() {
        let r = promote(S::signed(Int), S::new(Int, true)).unwrap();
        assert!(r.is_unsigned);
    }

    #[test]
    fn mixed_outside_table_is_none() {
        assert!(promote(S::signed(Long), S::signed(Half)).is_none());
    }
}
