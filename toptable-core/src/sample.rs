use std::cmp::Ordering;
use std::io::{self, Write};

use crate::arena::{ArenaStore, ValueHandle};
use crate::compare::{compare, CmpOperator};
use crate::param_type::ParamType;
use crate::schema::FieldDescriptor;
use crate::tool::SAMPLE_SEPARATOR;
use crate::value::Value;

/// One aggregated row of a closed window.
///
/// `SampleRow` only holds handles into the arena generation of the window it comes from.
/// The bytes are read through `Sample` and `SampleRowView`, which borrow the table, so a
/// row can never be read after the flush that reclaims its generation.
#[derive(Clone, Debug)]
pub struct SampleRow {
    /// The key.
    pub(crate) key: ValueHandle,

    /// Values of the non key fields, in schema order.
    pub(crate) values: Vec<ValueHandle>,
}

impl SampleRow {
    #[inline]
    pub fn new(key: ValueHandle, values: Vec<ValueHandle>) -> Self {
        Self { key, values }
    }
}

/// Sort `rows` by the non key column `col` of type `ty`.
///
/// The order is defined by the typed compare primitive, with `Lt` for ascending and `Gt`
/// for descending, so it matches what a filter on the same column would see.
pub(crate) fn sort_rows(
    rows: &mut [SampleRow],
    arena: &ArenaStore,
    ty: ParamType,
    col: usize,
    ascending: bool,
) {
    let op = if ascending {
        CmpOperator::Lt
    } else {
        CmpOperator::Gt
    };

    rows.sort_by(|a, b| {
        let va = arena.get(&a.values[col]);
        let vb = arena.get(&b.values[col]);

        if compare(op, ty, va, vb) {
            Ordering::Less
        } else if compare(op, ty, vb, va) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
}

/// Read access to the sample of the last closed window.
#[derive(Clone, Copy)]
pub struct Sample<'a> {
    rows: &'a [SampleRow],
    arena: &'a ArenaStore,
    descriptors: &'a [FieldDescriptor],
}

impl<'a> Sample<'a> {
    pub(crate) fn new(
        rows: &'a [SampleRow],
        arena: &'a ArenaStore,
        descriptors: &'a [FieldDescriptor],
    ) -> Self {
        Self {
            rows,
            arena,
            descriptors,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<SampleRowView<'a>> {
        self.rows.get(index).map(|row| SampleRowView {
            row,
            arena: self.arena,
            descriptors: self.descriptors,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = SampleRowView<'a>> + 'a {
        let rows = self.rows;
        let arena = self.arena;
        let descriptors = self.descriptors;

        rows.iter().map(move |row| SampleRowView {
            row,
            arena,
            descriptors,
        })
    }

    /// Print the rows.
    ///
    /// Each value of a row is followed by a space, each row by a newline, and the sample by
    /// a separator line.
    pub fn print<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for row in self.iter() {
            for value in row.values() {
                write!(out, "{} ", value)?;
            }

            writeln!(out)?;
        }

        writeln!(out, "{}", SAMPLE_SEPARATOR)
    }
}

/// One row of a `Sample`.
#[derive(Clone, Copy)]
pub struct SampleRowView<'a> {
    row: &'a SampleRow,
    arena: &'a ArenaStore,
    descriptors: &'a [FieldDescriptor],
}

impl<'a> SampleRowView<'a> {
    /// Raw bytes of the key.
    #[inline]
    pub fn key(&self) -> &'a [u8] {
        self.arena.get(&self.row.key)
    }

    #[inline]
    pub fn key_value(&self) -> Value<'a> {
        Value::decode(self.descriptors[0].ty(), self.key())
    }

    #[inline]
    pub fn num_values(&self) -> usize {
        self.row.values.len()
    }

    /// Raw bytes of the value column `col`, counted from `0` without the key.
    #[inline]
    pub fn value_bytes(&self, col: usize) -> Option<&'a [u8]> {
        self.row.values.get(col).map(|h| self.arena.get(h))
    }

    #[inline]
    pub fn value(&self, col: usize) -> Option<Value<'a>> {
        let ty = self.descriptors.get(col + 1)?.ty();
        self.value_bytes(col).map(|bytes| Value::decode(ty, bytes))
    }

    /// All decoded values, in schema order.
    pub fn values(&self) -> impl Iterator<Item = Value<'a>> + 'a {
        let row = self.row;
        let arena = self.arena;
        let descriptors = self.descriptors;

        row.values
            .iter()
            .zip(descriptors[1..].iter())
            .map(move |(h, d)| Value::decode(d.ty(), arena.get(h)))
    }
}
