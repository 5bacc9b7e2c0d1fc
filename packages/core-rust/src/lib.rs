//! Joshua core: value model, call context, response envelope, params schema
//! and validator.

pub mod checksum;
pub mod context;
pub mod envelope;
pub mod schema;
pub mod traits;
pub mod types;
pub mod validator;

pub use context::CallRequest;
pub use envelope::{Envelope, ErrorBody, ErrorOptions, Response};
pub use schema::{ParamField, ParamOpts, ParamSchema, ParamType, SchemaBuilder, SchemaError};
pub use traits::HostAdapter;
pub use types::{ErrorCode, Params, Scope, Value};
pub use validator::{CheckError, Locale, ModelHook, Validated, Validator};
