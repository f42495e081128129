//! Byte-level access to method bytecode.
//!
//! - [`parser::Parser`] - bounds-checked cursor used by the instruction decoder
//! - [`io`] - big-endian primitive reads and in-place writes

pub mod io;
pub mod parser;
