//! Typed decoding of encoded values.
//!
//! Every read of stored bytes goes through `Value::decode`, which dispatches on the
//! declared `ParamType`. Fixed width integers are read unaligned with `bytemuck`, so
//! values can live at any offset of an arena.

use bytemuck::Pod;
use std::fmt;

use crate::param_type::ParamType;

/// A decoded value, borrowing string and buffer content from the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    /// All signed integers, including `Fd`, `Pid` and `Errno`.
    Int(i64),

    /// All unsigned integers and flag sets, including `SigType`, `Port` and `SyscallId`.
    UInt(u64),

    RelTime(u64),

    AbsTime(u64),

    Bool(bool),

    Ipv4([u8; 4]),

    /// String content without the terminator.
    Str(&'a [u8]),

    Bytes(&'a [u8]),
}

/// Read a `T` from the start of `bytes`.
#[inline]
pub(crate) fn read_pod<T: Pod>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<T>()])
}

/// Overwrite the start of `bytes` with `value`.
#[inline]
pub(crate) fn write_pod<T: Pod>(bytes: &mut [u8], value: T) {
    bytes[..std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&value));
}

/// String content of a null terminated value.
#[inline]
pub(crate) fn str_content(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

impl<'a> Value<'a> {
    /// Decode `bytes` as a value of type `ty`.
    ///
    /// Panics for composite types.
    pub fn decode(ty: ParamType, bytes: &'a [u8]) -> Self {
        match ty {
            ParamType::Int8 => Value::Int(read_pod::<i8>(bytes) as i64),
            ParamType::Int16 => Value::Int(read_pod::<i16>(bytes) as i64),
            ParamType::Int32 => Value::Int(read_pod::<i32>(bytes) as i64),
            ParamType::Int64 | ParamType::Fd | ParamType::Pid | ParamType::Errno => {
                Value::Int(read_pod::<i64>(bytes))
            }
            ParamType::UInt8 | ParamType::Flags8 | ParamType::SigType => {
                Value::UInt(read_pod::<u8>(bytes) as u64)
            }
            ParamType::UInt16 | ParamType::Flags16 | ParamType::Port | ParamType::SyscallId => {
                Value::UInt(read_pod::<u16>(bytes) as u64)
            }
            ParamType::UInt32 | ParamType::Flags32 => Value::UInt(read_pod::<u32>(bytes) as u64),
            ParamType::UInt64 => Value::UInt(read_pod::<u64>(bytes)),
            ParamType::RelTime => Value::RelTime(read_pod::<u64>(bytes)),
            ParamType::AbsTime => Value::AbsTime(read_pod::<u64>(bytes)),
            ParamType::Bool => Value::Bool(read_pod::<u32>(bytes) != 0),
            ParamType::Ipv4Addr => Value::Ipv4([bytes[0], bytes[1], bytes[2], bytes[3]]),
            ParamType::CharBuf => Value::Str(str_content(bytes)),
            ParamType::ByteBuf => Value::Bytes(bytes),
            ParamType::SockAddr | ParamType::SockTuple | ParamType::FdList | ParamType::FsPath => {
                panic!("cannot decode {} value", ty)
            }
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) | Value::RelTime(v) | Value::AbsTime(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Ipv4(ip) => write!(f, "{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]),
            Value::Str(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Value::Bytes(b) => {
                for &c in b.iter() {
                    if c.is_ascii_graphic() || c == b' ' {
                        write!(f, "{}", c as char)?;
                    } else {
                        write!(f, ".")?;
                    }
                }
                Ok(())
            }
        }
    }
}
