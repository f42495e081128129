//! The tag store interface consumed by the dispatcher.
//!
//! Label propagation through assignments, arrays and fields belongs to the host's tagging
//! engine. This crate only needs to attach a [`Tag`] to a value and ask whether a value
//! carries one, which is what [`TagStore`] captures. [`ValueTagStore`] is the in-memory
//! implementation used when no external engine is plugged in: it labels concrete values by
//! identity of their bits.

use dashmap::DashMap;

use crate::{
    runtime::{Tag, Value},
    Result,
};

/// Association between values and tags.
///
/// Implementations must be safe to query from many application threads at once; lookups sit
/// on the dispatcher's hot path.
pub trait TagStore: Send + Sync {
    /// Label `value` with `tag`, replacing any previous label.
    fn attach(&self, value: Value, tag: Tag);

    /// Remove the label of `value`, returning it.
    fn detach(&self, value: &Value) -> Option<Tag>;

    /// The label of `value`, if any.
    ///
    /// # Errors
    ///
    /// Implementations backed by an external engine may fail; callers on the hot path treat
    /// a failure as "not labeled".
    fn lookup(&self, value: &Value) -> Result<Option<Tag>>;

    /// Remove all labels.
    fn clear(&self);

    /// Number of labeled values.
    fn len(&self) -> usize;

    /// Returns true if no value is labeled.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`TagStore`] keyed by concrete value.
#[derive(Debug, Default)]
pub struct ValueTagStore {
    tags: DashMap<Value, Tag>,
}

impl ValueTagStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TagStore for ValueTagStore {
    fn attach(&self, value: Value, tag: Tag) {
        self.tags.insert(value, tag);
    }

    fn detach(&self, value: &Value) -> Option<Tag> {
        self.tags.remove(value).map(|(_, tag)| tag)
    }

    fn lookup(&self, value: &Value) -> Result<Option<Tag>> {
        Ok(self.tags.get(value).map(|entry| entry.value().clone()))
    }

    fn clear(&self) {
        self.tags.clear();
    }

    fn len(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn attach_lookup_detach() {
        let store = ValueTagStore::new();
        let tag = Tag::new("x").unwrap();

        store.attach(Value::Double(12.0), tag.clone());
        assert_eq!(store.lookup(&Value::Double(12.0)).unwrap(), Some(tag.clone()));
        assert_eq!(store.lookup(&Value::Float(12.0)).unwrap(), None);
        assert_eq!(store.len(), 1);

        assert_eq!(store.detach(&Value::Double(12.0)), Some(tag));
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_attach() {
        let store = Arc::new(ValueTagStore::new());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let tag = Tag::new(&format!("t{t}_{i}")).unwrap();
                        store.attach(Value::Int(t * 1000 + i), tag);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 400);
        store.clear();
        assert!(store.is_empty());
    }
}
