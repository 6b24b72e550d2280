// Schema construction: type nodes, builders, extension and introspection
//
// Typical usage goes through the builder helpers re-exported here:
//
// ```
// use atlas_config_schema::schema;
// use atlas_config_schema::Value;
//
// let config = schema::object([("name", schema::string())]);
// let validated = config.validate(Some(&Value::object([("name", Value::from("test"))])))?;
// ```

pub mod extend;
pub mod helpers;
pub mod structure;
pub mod types;

pub use helpers::*;
pub use structure::StructureEntry;
pub use types::*;
