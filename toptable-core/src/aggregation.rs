//! In place aggregation of stored values.
//!
//! The dispatch is a `match` over the whole type catalog, so a new `ParamType` has to be
//! handled here before the crate compiles. The schema compiler refuses `Sum` and `TimeAvg`
//! on types that are not summable, so the panicking arms are only reachable through a
//! schema that skipped validation.

use bytemuck::Pod;
use num_traits::{AsPrimitive, WrappingAdd};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::param_type::ParamType;
use crate::value::{read_pod, write_pod};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// How values of a field are combined when its key occurs again in the same window.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, Display, Deserialize, Serialize,
)]
pub enum Aggregation {
    /// Keep the first value of the window.
    #[default]
    None,

    /// Wrapping sum over the window.
    Sum,

    /// Sum over the window, reported as a per second rate when the window closes.
    TimeAvg,
}

impl Aggregation {
    /// Aggregation selected by a format string prefix character.
    pub fn from_prefix(c: u8) -> Option<Self> {
        match c {
            b'S' => Some(Aggregation::Sum),
            b'T' => Some(Aggregation::TimeAvg),
            _ => None,
        }
    }

    /// Whether the field needs the window level rate conversion.
    #[inline]
    pub fn is_time_avg(self) -> bool {
        self == Aggregation::TimeAvg
    }
}

/// Combine the freshly extracted `src` into the stored `dst`.
pub fn add_fields(aggregation: Aggregation, ty: ParamType, dst: &mut [u8], src: &[u8]) {
    match aggregation {
        Aggregation::None => {}
        Aggregation::Sum | Aggregation::TimeAvg => add_fields_sum(ty, dst, src),
    }
}

#[inline]
fn wrapping_add_in_place<T: Pod + WrappingAdd>(dst: &mut [u8], src: &[u8]) {
    let a: T = read_pod(dst);
    let b: T = read_pod(src);
    write_pod(dst, a.wrapping_add(&b));
}

/// `dst += src` with the width and signedness of `ty`, wrapping on overflow.
pub fn add_fields_sum(ty: ParamType, dst: &mut [u8], src: &[u8]) {
    match ty {
        ParamType::Int8 => wrapping_add_in_place::<i8>(dst, src),
        ParamType::Int16 => wrapping_add_in_place::<i16>(dst, src),
        ParamType::Int32 => wrapping_add_in_place::<i32>(dst, src),
        ParamType::Int64 => wrapping_add_in_place::<i64>(dst, src),
        ParamType::UInt8 => wrapping_add_in_place::<u8>(dst, src),
        ParamType::UInt16 => wrapping_add_in_place::<u16>(dst, src),
        ParamType::UInt32 => wrapping_add_in_place::<u32>(dst, src),
        ParamType::UInt64 | ParamType::RelTime | ParamType::AbsTime => {
            wrapping_add_in_place::<u64>(dst, src)
        }
        ParamType::Flags8
        | ParamType::Flags16
        | ParamType::Flags32
        | ParamType::Bool
        | ParamType::Ipv4Addr
        | ParamType::CharBuf
        | ParamType::ByteBuf
        | ParamType::Fd
        | ParamType::Pid
        | ParamType::Errno
        | ParamType::SigType
        | ParamType::Port
        | ParamType::SyscallId
        | ParamType::SockAddr
        | ParamType::SockTuple
        | ParamType::FdList
        | ParamType::FsPath => panic!("sum is not defined for {} values", ty),
    }
}

#[inline]
fn rate_in_place<T>(dst: &mut [u8], interval_ns: u64)
where
    T: Pod + AsPrimitive<i128>,
    i128: AsPrimitive<T>,
{
    let total: i128 = read_pod::<T>(dst).as_();
    let rate = total * NANOS_PER_SEC / interval_ns as i128;
    write_pod::<T>(dst, rate.as_());
}

/// Turn a window total into a per second rate over a window of `interval_ns`.
///
/// The division happens in 128 bits and the result is truncated to the width of `ty`.
pub fn time_avg_to_rate(ty: ParamType, dst: &mut [u8], interval_ns: u64) {
    assert!(interval_ns > 0, "zero window length");

    match ty {
        ParamType::Int8 => rate_in_place::<i8>(dst, interval_ns),
        ParamType::Int16 => rate_in_place::<i16>(dst, interval_ns),
        ParamType::Int32 => rate_in_place::<i32>(dst, interval_ns),
        ParamType::Int64 => rate_in_place::<i64>(dst, interval_ns),
        ParamType::UInt8 => rate_in_place::<u8>(dst, interval_ns),
        ParamType::UInt16 => rate_in_place::<u16>(dst, interval_ns),
        ParamType::UInt32 => rate_in_place::<u32>(dst, interval_ns),
        ParamType::UInt64 | ParamType::RelTime | ParamType::AbsTime => {
            rate_in_place::<u64>(dst, interval_ns)
        }
        ParamType::Flags8
        | ParamType::Flags16
        | ParamType::Flags32
        | ParamType::Bool
        | ParamType::Ipv4Addr
        | ParamType::CharBuf
        | ParamType::ByteBuf
        | ParamType::Fd
        | ParamType::Pid
        | ParamType::Errno
        | ParamType::SigType
        | ParamType::Port
        | ParamType::SyscallId
        | ParamType::SockAddr
        | ParamType::SockTuple
        | ParamType::FdList
        | ParamType::FsPath => panic!("time average is not defined for {} values", ty),
    }
}
