//! Foundation types for marklet.
//!
//! Platform-agnostic types shared by every marklet crate: the error
//! enum, screen geometry, and colors.

pub mod color;
pub mod error;
pub mod geometry;

pub use color::Color;
pub use error::{ErrorKind, MarkletError, Result};
pub use geometry::{Point, Rect};
