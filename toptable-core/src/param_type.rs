use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumString, FromRepr};

/// Semantic type of an encoded value.
///
/// The catalog is shared with the extraction side of the system: every extracted value is
/// declared with one of these types, and its bytes are only ever interpreted through it.
/// Integers are stored in native byte order.
///
/// The composite types at the end are valid extraction results but can never be fields of
/// a table.
#[derive(
    Clone,
    Copy,
    FromRepr,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumCount,
    EnumString,
    Deserialize,
    Serialize,
    Display,
)]
#[repr(u8)]
pub enum ParamType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    /// A duration in nanoseconds, `u64`.
    RelTime,

    /// An absolute timestamp in nanoseconds, `u64`.
    AbsTime,

    Flags8,
    Flags16,
    Flags32,

    /// Boolean stored as a 4 bytes integer.
    Bool,

    /// IPv4 address, 4 bytes in network order.
    Ipv4Addr,

    /// Null terminated string.
    CharBuf,

    /// Byte buffer, the length comes with the extracted value.
    ByteBuf,

    /// File descriptor, `i64`.
    Fd,

    /// Process id, `i64`.
    Pid,

    /// Error number, `i64`.
    Errno,

    /// Signal number, `u8`.
    SigType,

    /// Port number, `u16`.
    Port,

    /// Syscall id, `u16`.
    SyscallId,

    SockAddr,
    SockTuple,
    FdList,
    FsPath,
}

/// How the byte length of a value of some type is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldLen {
    /// Always this many bytes.
    Fixed(usize),

    /// Content up to and including the first zero byte.
    NulTerminated,

    /// The length of the extracted span.
    Carried,

    /// Not representable in a table.
    Composite,
}

impl ParamType {
    pub fn field_len(self) -> FieldLen {
        match self {
            ParamType::Int8 | ParamType::UInt8 | ParamType::Flags8 | ParamType::SigType => {
                FieldLen::Fixed(1)
            }
            ParamType::Int16
            | ParamType::UInt16
            | ParamType::Flags16
            | ParamType::Port
            | ParamType::SyscallId => FieldLen::Fixed(2),
            ParamType::Int32
            | ParamType::UInt32
            | ParamType::Flags32
            | ParamType::Bool
            | ParamType::Ipv4Addr => FieldLen::Fixed(4),
            ParamType::Int64
            | ParamType::UInt64
            | ParamType::RelTime
            | ParamType::AbsTime
            | ParamType::Fd
            | ParamType::Pid
            | ParamType::Errno => FieldLen::Fixed(8),
            ParamType::CharBuf => FieldLen::NulTerminated,
            ParamType::ByteBuf => FieldLen::Carried,
            ParamType::SockAddr | ParamType::SockTuple | ParamType::FdList | ParamType::FsPath => {
                FieldLen::Composite
            }
        }
    }

    /// Width in bytes for fixed width types.
    #[inline]
    pub fn fixed_len(self) -> Option<usize> {
        match self.field_len() {
            FieldLen::Fixed(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn is_composite(self) -> bool {
        self.field_len() == FieldLen::Composite
    }

    /// Whether `Sum` is defined for this type.
    pub fn is_summable(self) -> bool {
        matches!(
            self,
            ParamType::Int8
                | ParamType::Int16
                | ParamType::Int32
                | ParamType::Int64
                | ParamType::UInt8
                | ParamType::UInt16
                | ParamType::UInt32
                | ParamType::UInt64
                | ParamType::RelTime
                | ParamType::AbsTime
        )
    }

    /// Default sort direction when a column of this type is selected.
    ///
    /// Numbers and times sort biggest first, everything else alphabetically.
    pub fn default_ascending(self) -> bool {
        !self.is_summable()
    }

    /// Length of the value stored in `bytes`.
    ///
    /// Panics for composite types, and when `bytes` is shorter than a fixed width type
    /// requires. Both mean the extractor and the schema disagree on the type.
    pub fn resolve_len(self, bytes: &[u8]) -> usize {
        match self.field_len() {
            FieldLen::Fixed(n) => {
                assert!(
                    bytes.len() >= n,
                    "extracted {} bytes for {} value, need {}",
                    bytes.len(),
                    self,
                    n
                );
                n
            }
            FieldLen::NulTerminated => match bytes.iter().position(|&b| b == 0) {
                Some(pos) => pos + 1,
                None => bytes.len(),
            },
            FieldLen::Carried => bytes.len(),
            FieldLen::Composite => panic!("type {} cannot be stored in a table", self),
        }
    }
}

/// Name and type of a field, as reported by its extractor.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,

    /// Data type.
    pub ty: ParamType,
}

impl FieldInfo {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}
