//! Low-level byte stream parser for method bytecode.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used by the instruction decoder. It offers bounds-checked access to big-endian
//! operands and the 4-byte alignment that `tableswitch` and `lookupswitch` payloads require.
//!
//! # Examples
//!
//! ```rust
//! use pathcond::Parser;
//!
//! let code = [0x11, 0x01, 0x00, 0xAC]; // sipush 256; ireturn
//! let mut parser = Parser::new(&code);
//!
//! assert_eq!(parser.read_be::<u8>()?, 0x11);
//! assert_eq!(parser.read_be::<i16>()?, 256);
//! assert_eq!(parser.pos(), 3);
//! # Ok::<(), pathcond::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, CodeIO},
    Result,
};

/// A cursor over a byte slice with bounds-checked big-endian reads.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns true if the cursor has not reached the end of the data.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the step would leave the data.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if self.position + step > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position += step;
        Ok(())
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Skip padding until the cursor is a multiple of `alignment`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the padding runs past the data.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        if self.position + padding > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        self.position += padding;
        Ok(())
    }

    /// Read a big-endian value and advance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
    pub fn read_be<T: CodeIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Number of bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }
}
