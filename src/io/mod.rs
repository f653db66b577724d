//! File I/O for dragonfly models and project folders.
//!
//! This module provides functions for reading and writing models as DFJSON
//! or POMF, and the locked, atomic writes used for project folders.

pub mod dfjson;
pub mod pomf;
pub mod project;

pub use dfjson::{from_dfjson_string, read_dfjson, to_dfjson_string, write_dfjson};
pub use pomf::{read_pomf, write_pomf};
pub use project::{ProjectFolder, write_atomic};
