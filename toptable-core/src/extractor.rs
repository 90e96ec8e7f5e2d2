//! Field extraction capability.
//!
//! The table never knows how a value is pulled out of an event. It is given an
//! `ExtractorFactory` when the schema is compiled, and asks it for one `FieldExtractor` per
//! token of the format string.
//!
//! `FieldRegistry` is a ready made factory mapping field names to closures.

use bytemuck::Pod;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::param_type::{FieldInfo, ParamType};

/// An event with a timestamp in nanoseconds.
pub trait TimestampedEvent {
    fn timestamp(&self) -> u64;
}

/// Extracts one typed field from events.
pub trait FieldExtractor<E> {
    /// Parse the field name at the start of `text`, returning the number of bytes consumed.
    ///
    /// `text` is the rest of the format string, so it usually continues after the name.
    fn parse_field_name(&mut self, text: &str) -> Result<usize, ConfigError>;

    /// Bytes of the field in `event`, or `None` if the event has no such value.
    ///
    /// The span must be encoded as the declared type: at least the fixed width for fixed
    /// width types, a null terminated string for `CharBuf`, the exact buffer for `ByteBuf`.
    fn extract<'a>(&'a mut self, event: &'a E) -> Option<&'a [u8]>;

    fn field_info(&self) -> &FieldInfo;
}

/// Resolves field names to extractors.
pub trait ExtractorFactory<E> {
    /// Create an extractor for the field name at the start of `text`, or `None` if no field
    /// matches.
    fn new_extractor(&self, text: &str) -> Option<Box<dyn FieldExtractor<E>>>;
}

/// Writes the encoded value of a field into the buffer, returns `false` if absent.
type ExtractFn<E> = Arc<dyn Fn(&E, &mut Vec<u8>) -> bool>;

struct RegisteredField<E> {
    info: FieldInfo,
    extract: ExtractFn<E>,
}

/// The registry of fields known to a table.
///
/// Lookup is by exact name, ending either at the end of the text or at a separator of the
/// format string. When several registered names match, the longest one wins.
pub struct FieldRegistry<E> {
    fields: Vec<RegisteredField<E>>,
}

impl<E: 'static> FieldRegistry<E> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register a field with a raw extraction closure.
    pub fn register<F>(&mut self, name: &str, ty: ParamType, extract: F) -> &mut Self
    where
        F: Fn(&E, &mut Vec<u8>) -> bool + 'static,
    {
        self.fields.push(RegisteredField {
            info: FieldInfo::new(name, ty),
            extract: Arc::new(extract),
        });

        self
    }

    /// Register a fixed width field, the value is stored in native byte order.
    pub fn register_pod<T, F>(&mut self, name: &str, ty: ParamType, extract: F) -> &mut Self
    where
        T: Pod,
        F: Fn(&E) -> Option<T> + 'static,
    {
        self.register(name, ty, move |evt, buf| match extract(evt) {
            Some(v) => {
                buf.extend_from_slice(bytemuck::bytes_of(&v));
                true
            }
            None => false,
        })
    }

    /// Register a `CharBuf` field. The terminator is added.
    pub fn register_str<F>(&mut self, name: &str, extract: F) -> &mut Self
    where
        F: for<'e> Fn(&'e E) -> Option<&'e str> + 'static,
    {
        self.register(name, ParamType::CharBuf, move |evt, buf| match extract(evt) {
            Some(s) => {
                buf.extend_from_slice(s.as_bytes());
                buf.push(0);
                true
            }
            None => false,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn lookup(&self, text: &str) -> Option<&RegisteredField<E>> {
        self.fields
            .iter()
            .filter(|field| name_matches(&field.info.name, text))
            .max_by_key(|field| field.info.name.len())
    }
}

impl<E: 'static> Default for FieldRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn is_separator(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b','
}

fn name_matches(name: &str, text: &str) -> bool {
    if !text.starts_with(name) {
        return false;
    }

    match text.as_bytes().get(name.len()) {
        Some(&c) => is_separator(c),
        None => true,
    }
}

impl<E: 'static> ExtractorFactory<E> for FieldRegistry<E> {
    fn new_extractor(&self, text: &str) -> Option<Box<dyn FieldExtractor<E>>> {
        self.lookup(text).map(|field| {
            Box::new(RegistryExtractor {
                info: field.info.clone(),
                extract: field.extract.clone(),
                buf: Vec::with_capacity(16),
            }) as Box<dyn FieldExtractor<E>>
        })
    }
}

/// Extractor created by `FieldRegistry`, owns the buffer the value is written into.
struct RegistryExtractor<E> {
    info: FieldInfo,
    extract: ExtractFn<E>,
    buf: Vec<u8>,
}

impl<E> FieldExtractor<E> for RegistryExtractor<E> {
    fn parse_field_name(&mut self, text: &str) -> Result<usize, ConfigError> {
        if name_matches(&self.info.name, text) {
            Ok(self.info.name.len())
        } else {
            Err(ConfigError::UnresolvableField(text.to_string()))
        }
    }

    fn extract<'a>(&'a mut self, event: &'a E) -> Option<&'a [u8]> {
        self.buf.clear();

        if (self.extract)(event, &mut self.buf) {
            Some(self.buf.as_slice())
        } else {
            None
        }
    }

    fn field_info(&self) -> &FieldInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Evt {
        name: String,
        count: Option<u32>,
    }

    fn registry() -> FieldRegistry<Evt> {
        let mut registry = FieldRegistry::new();
        registry
            .register_str("proc.name", |e: &Evt| Some(e.name.as_str()))
            .register_pod("proc.count", ParamType::UInt32, |e: &Evt| e.count)
            .register_pod("proc.countx", ParamType::UInt64, |e: &Evt| {
                e.count.map(|c| c as u64)
            });
        registry
    }

    #[test]
    fn test_lookup_respects_boundaries() {
        let registry = registry();

        let mut chk = registry.new_extractor("proc.count,proc.name").unwrap();
        assert_eq!(chk.field_info().ty, ParamType::UInt32);
        assert_eq!(chk.parse_field_name("proc.count,proc.name").unwrap(), 10);

        let chk = registry.new_extractor("proc.countx").unwrap();
        assert_eq!(chk.field_info().ty, ParamType::UInt64);

        assert!(registry.new_extractor("proc.cou").is_none());
        assert!(registry.new_extractor("proc.names").is_none());
    }

    #[test]
    fn test_extract() {
        let registry = registry();
        let evt = Evt {
            name: "bash".to_string(),
            count: None,
        };

        let mut name = registry.new_extractor("proc.name").unwrap();
        assert_eq!(name.extract(&evt), Some(&b"bash\0"[..]));

        let mut count = registry.new_extractor("proc.count").unwrap();
        assert_eq!(count.extract(&evt), None);
    }
}
