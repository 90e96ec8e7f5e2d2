//! Typed comparison of encoded values.
//!
//! `compare` is shared by the table sorter and by filter evaluation, so it must stay a pure
//! function of its inputs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{Display, EnumString};

use crate::param_type::ParamType;
use crate::value::Value;

/// Comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display, Deserialize, Serialize)]
pub enum CmpOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    /// Substring match, for strings and buffers.
    Contains,

    /// Case insensitive substring match, for strings and buffers.
    IContains,

    /// Prefix match, for strings and buffers.
    StartsWith,
}

/// Compare `a` to `b`, both encoded as `ty`: `a op b`.
///
/// Numbers and times compare by magnitude with their own signedness, strings and buffers by
/// content. Operators that have no meaning for a type, like `Contains` on an integer,
/// evaluate to `false`. Composite types only support `Eq` and `Ne` on raw bytes.
pub fn compare(op: CmpOperator, ty: ParamType, a: &[u8], b: &[u8]) -> bool {
    if ty.is_composite() {
        return match op {
            CmpOperator::Eq => a == b,
            CmpOperator::Ne => a != b,
            _ => false,
        };
    }

    match (Value::decode(ty, a), Value::decode(ty, b)) {
        (Value::Int(x), Value::Int(y)) => apply_ordering(op, x.cmp(&y)),
        (Value::UInt(x), Value::UInt(y))
        | (Value::RelTime(x), Value::RelTime(y))
        | (Value::AbsTime(x), Value::AbsTime(y)) => apply_ordering(op, x.cmp(&y)),
        (Value::Bool(x), Value::Bool(y)) => apply_ordering(op, x.cmp(&y)),
        (Value::Ipv4(x), Value::Ipv4(y)) => apply_ordering(op, x.cmp(&y)),
        (Value::Str(x), Value::Str(y)) | (Value::Bytes(x), Value::Bytes(y)) => {
            compare_content(op, x, y)
        }
        _ => false,
    }
}

#[inline]
fn apply_ordering(op: CmpOperator, ord: Ordering) -> bool {
    match op {
        CmpOperator::Eq => ord == Ordering::Equal,
        CmpOperator::Ne => ord != Ordering::Equal,
        CmpOperator::Lt => ord == Ordering::Less,
        CmpOperator::Le => ord != Ordering::Greater,
        CmpOperator::Gt => ord == Ordering::Greater,
        CmpOperator::Ge => ord != Ordering::Less,
        CmpOperator::Contains | CmpOperator::IContains | CmpOperator::StartsWith => false,
    }
}

fn compare_content(op: CmpOperator, a: &[u8], b: &[u8]) -> bool {
    match op {
        CmpOperator::Contains => contains(a, b),
        CmpOperator::IContains => {
            contains(&a.to_ascii_lowercase(), &b.to_ascii_lowercase())
        }
        CmpOperator::StartsWith => a.starts_with(b),
        _ => apply_ordering(op, a.cmp(b)),
    }
}

#[inline]
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
