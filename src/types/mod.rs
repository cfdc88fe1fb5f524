//! XMP value types
//!
//! This module defines the values and query results crossing the API.

pub mod property;
pub mod value;

pub use property::XmpProperty;
pub use value::{ValueType, XmpValue};
