pub mod aggregation;
pub mod arena;
pub mod compare;
pub mod config;
pub mod error;
pub mod extractor;
pub mod param_type;
pub mod sample;
pub mod schema;
pub mod table;
pub mod tool;
pub mod value;

pub use aggregation::Aggregation;
pub use compare::{compare, CmpOperator};
pub use config::TableConfig;
pub use error::{ConfigError, TableError};
pub use extractor::{ExtractorFactory, FieldExtractor, FieldRegistry, TimestampedEvent};
pub use param_type::{FieldInfo, ParamType};
pub use sample::{Sample, SampleRowView};
pub use schema::{FieldDescriptor, Schema};
pub use table::TopTable;
pub use value::Value;
