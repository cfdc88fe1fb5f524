//! Utility functions and types
//!
//! Date-time values, and the document-level helpers of [`XmpUtils`].

pub mod datetime;
pub mod xmp_utils;

pub use datetime::XmpDateTime;
pub use xmp_utils::{AppendOptions, RemoveOptions, SeparateOptions, XmpUtils};
