//! File format handlers
//!
//! Smart handlers know the container layout of their format. Everything
//! else goes through the packet scanner.

#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png")]
pub mod png;
pub mod scanner;
