//! Symbolic labels.

use std::{fmt, sync::Arc};

use crate::{Error, Result};

/// An opaque, immutable label marking a value as symbolic.
///
/// Tags are cheap to clone; every clone shares the same label string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Create a tag for `label`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLabel`] if the label is empty or contains whitespace.
    pub fn new(label: &str) -> Result<Self> {
        validate_label(label)?;
        Ok(Tag(Arc::from(label)))
    }

    /// The label this tag was created from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.label()).finish()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check that `label` is non-empty and free of whitespace.
///
/// # Errors
///
/// Returns [`Error::InvalidLabel`] otherwise.
pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return Err(Error::InvalidLabel(label.to_string()));
    }
    Ok(())
}
