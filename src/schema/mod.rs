pub mod field;
pub mod infer;
pub mod store;

pub use field::{BaseType, SchemaField, TypeSet};
pub use infer::{infer_schema, merge_schemas, schema_hash};
pub use store::{EndpointSchema, SchemaStore};
