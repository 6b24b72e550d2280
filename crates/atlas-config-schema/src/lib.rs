//! Declarative runtime configuration schema validation.
//!
//! Schemas are immutable trees of type nodes built through the [`schema`]
//! builder helpers. A schema parses, validates, defaults and coerces nested
//! configuration values: primitives with constraints, objects with
//! unknown-key policies, sibling and context references resolved at
//! validation time, tagged unions, conditionals, and deferred
//! self-referential schemas.
//!
//! ```
//! use atlas_config_schema::schema::TypeNode;
//! use atlas_config_schema::{schema, Value};
//!
//! let config = schema::object([
//!     ("host", TypeNode::from(schema::string().default_value("localhost"))),
//!     ("port", TypeNode::from(schema::number().min(0.0).max(65535.0))),
//! ]);
//!
//! let input = Value::object([("port", Value::from(5601))]);
//! let validated = config.validate(Some(&input)).unwrap();
//! assert_eq!(
//!     validated,
//!     Value::object([
//!         ("host", Value::from("localhost")),
//!         ("port", Value::from(5601)),
//!     ])
//! );
//! ```

pub mod error;
pub mod reference;
pub mod schema;
pub mod validator;
pub mod value;

pub use error::{KeyPath, ValidationError, ValidationErrorKind, ValidationResult};
pub use reference::{ContextBag, DefaultValue, Reference};
pub use validator::ValidateOptions;
pub use value::{StreamHandle, Value};
