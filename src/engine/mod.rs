//! Test execution
//!
//! Builds requests from parsed tests, drives the wait/retry loop, validates
//! assertions and propagates saved values through a [`VariableStore`].

mod executor;
mod transport;
mod validate;
mod values;
mod vars;

pub use executor::Executor;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use validate::{parse_json_object, validate, validate_all, ResponseView};
pub use values::{apply_transforms, display_value, parse_expected, values_equal};
pub use vars::{extract, interpolate, VariableStore};
