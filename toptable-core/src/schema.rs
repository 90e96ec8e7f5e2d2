use log::{error, info};

use crate::aggregation::Aggregation;
use crate::error::ConfigError;
use crate::error_bail;
use crate::extractor::{ExtractorFactory, FieldExtractor};
use crate::param_type::{FieldInfo, ParamType};

/// Marks the key field in a format string.
const KEY_MARKER: u8 = b'*';

/// Type and aggregation of one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name and type as reported by the extractor.
    pub info: FieldInfo,

    /// How the field is combined inside a window. Always `None` for the key.
    pub aggregation: Aggregation,
}

impl FieldDescriptor {
    #[inline]
    pub fn ty(&self) -> ParamType {
        self.info.ty
    }
}

/// The compiled layout of a table.
///
/// Field `0` is the key, the rest are values in the order of the format string. The
/// descriptors and the extractors are kept in two parallel `Vec`s, so the engine can hold
/// the extracted values of all fields, which borrow the extractors, while it reads the
/// descriptors.
pub struct Schema<E> {
    pub(crate) descriptors: Vec<FieldDescriptor>,

    pub(crate) extractors: Vec<Box<dyn FieldExtractor<E>>>,

    /// Bytes of the fixed width values of one row. Variable length values are not counted.
    row_fixed_size: usize,
}

#[inline]
fn is_separator(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b','
}

#[inline]
fn skip_separators(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_separator(bytes[pos]) {
        pos += 1;
    }

    pos
}

/// The token starting at `text`, for error messages.
fn token(text: &str) -> String {
    text.split(|c: char| c.is_ascii() && is_separator(c as u8))
        .next()
        .unwrap_or("")
        .to_string()
}

impl<E> Schema<E> {
    /// Compile a format string.
    ///
    /// The format string is a list of tokens separated by spaces, tabs or commas. Each token
    /// is a field name, optionally prefixed by `*` for the key, `S` for `Sum` or `T` for
    /// `TimeAvg`. Exactly one key is required, and at least one value.
    ///
    /// Examples:
    ///
    /// *proc.name,Sproc.count,evt.type
    ///
    /// The prefix is taken from the first character, so a field whose name starts with `S`
    /// or `T` must be written with an explicit prefix.
    pub fn compile<F>(fmt: &str, factory: &F) -> Result<Self, ConfigError>
    where
        F: ExtractorFactory<E> + ?Sized,
    {
        if fmt.is_empty() {
            error_bail!(ConfigError::EmptyFormat);
        }

        let bytes = fmt.as_bytes();

        let mut is_key_present = false;
        let mut descriptors: Vec<FieldDescriptor> = Vec::new();
        let mut extractors: Vec<Box<dyn FieldExtractor<E>>> = Vec::new();

        let mut j = skip_separators(bytes, 0);

        while j < bytes.len() {
            let mut preamble_len = 0;
            let mut is_this_the_key = false;
            let mut aggregation = Aggregation::None;

            if bytes[j] == KEY_MARKER {
                if is_key_present {
                    error_bail!(ConfigError::DuplicateKey);
                }

                is_key_present = true;
                is_this_the_key = true;
                preamble_len = 1;
            } else if let Some(ag) = Aggregation::from_prefix(bytes[j]) {
                aggregation = ag;
                preamble_len = 1;
            }

            let rest = match fmt.get(j + preamble_len..) {
                Some(rest) => rest,
                None => error_bail!(ConfigError::UnresolvableField(token(
                    fmt.get(j..).unwrap_or("")
                ))),
            };

            let mut chk = match factory.new_extractor(rest) {
                Some(chk) => chk,
                None => error_bail!(ConfigError::UnresolvableField(token(rest))),
            };

            let consumed = match chk.parse_field_name(rest) {
                Ok(consumed) if consumed > 0 && rest.is_char_boundary(consumed) => consumed,
                Ok(_) => error_bail!(ConfigError::UnresolvableField(token(rest))),
                Err(e) => error_bail!(e),
            };

            let info = chk.field_info().clone();

            if info.ty.is_composite() {
                error_bail!(ConfigError::UnsupportedFieldType {
                    name: info.name,
                    ty: info.ty,
                });
            }

            if aggregation != Aggregation::None && !info.ty.is_summable() {
                error_bail!(ConfigError::InvalidAggregation {
                    name: info.name,
                    ty: info.ty,
                    aggregation,
                });
            }

            j = skip_separators(bytes, j + preamble_len + consumed);

            let descriptor = FieldDescriptor { info, aggregation };

            if is_this_the_key {
                descriptors.insert(0, descriptor);
                extractors.insert(0, chk);
            } else {
                descriptors.push(descriptor);
                extractors.push(chk);
            }
        }

        if !is_key_present {
            error_bail!(ConfigError::MissingKey);
        }

        if descriptors.len() < 2 {
            error_bail!(ConfigError::NoValues);
        }

        let row_fixed_size = descriptors[1..]
            .iter()
            .map(|d| d.ty().fixed_len().unwrap_or(0))
            .sum();

        info!(
            "compiled table schema, key: {} ({}), values: [{}]",
            descriptors[0].info.name,
            descriptors[0].ty(),
            descriptors[1..]
                .iter()
                .map(|d| format!("{} ({}, {})", d.info.name, d.ty(), d.aggregation))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            descriptors,
            extractors,
            row_fixed_size,
        })
    }

    /// Number of fields, key included.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Never true for a compiled schema, there are always at least two fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    #[inline]
    pub fn key(&self) -> &FieldDescriptor {
        &self.descriptors[0]
    }

    /// Descriptors of the value fields, without the key.
    #[inline]
    pub fn values(&self) -> &[FieldDescriptor] {
        &self.descriptors[1..]
    }

    /// All descriptors, key first.
    #[inline]
    pub fn descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    #[inline]
    pub fn row_fixed_size(&self) -> usize {
        self.row_fixed_size
    }
}
