//! Per-thread path condition storage.
//!
//! Each application thread owns an ordered list of [`Constraint`]s. Appends are in program
//! order for that thread and never contend with other threads. Storage that cannot be reached
//! (the thread is tearing down, or the list is already borrowed by a re-entrant call) makes
//! the operation a no-op rather than a panic, since these functions are called from inside
//! instrumented application code.

use std::cell::RefCell;

use crate::runtime::Constraint;

thread_local! {
    static PATH_CONDITION: RefCell<Vec<Constraint>> = const { RefCell::new(Vec::new()) };
}

/// Append `constraint` to the calling thread's path condition.
///
/// Returns false if the constraint could not be stored.
pub fn append(constraint: Constraint) -> bool {
    PATH_CONDITION
        .try_with(|cell| match cell.try_borrow_mut() {
            Ok(mut constraints) => {
                constraints.push(constraint);
                true
            }
            Err(_) => false,
        })
        .unwrap_or(false)
}

/// A snapshot of the calling thread's path condition, without clearing it.
#[must_use]
pub fn peek() -> Vec<Constraint> {
    PATH_CONDITION
        .try_with(|cell| {
            cell.try_borrow()
                .map(|constraints| constraints.clone())
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

/// Take the calling thread's path condition, leaving it empty.
#[must_use]
pub fn drain() -> Vec<Constraint> {
    PATH_CONDITION
        .try_with(|cell| {
            cell.try_borrow_mut()
                .map(|mut constraints| std::mem::take(&mut *constraints))
                .unwrap_or_default()
        })
        .unwrap_or_default()
}

/// Clear the calling thread's path condition.
pub fn reset() {
    let _ = PATH_CONDITION.try_with(|cell| {
        if let Ok(mut constraints) = cell.try_borrow_mut() {
            constraints.clear();
        }
    });
}

/// Number of constraints on the calling thread's path condition.
#[must_use]
pub fn size() -> usize {
    PATH_CONDITION
        .try_with(|cell| cell.try_borrow().map(|c| c.len()).unwrap_or(0))
        .unwrap_or(0)
}

/// Returns true if the calling thread has no recorded constraints.
#[must_use]
pub fn is_empty() -> bool {
    size() == 0
}

/// Read access to a path condition, as consumed by the symbolic manager.
pub trait ConstraintSource: Send + Sync {
    /// Snapshot without clearing.
    fn current(&self) -> Vec<Constraint>;

    /// Take all constraints, leaving the source empty.
    fn flush(&self) -> Vec<Constraint>;

    /// Number of constraints held.
    fn count(&self) -> usize;

    /// Discard all constraints.
    fn clear(&self);
}

/// [`ConstraintSource`] over the calling thread's path condition.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPathCondition;

impl ConstraintSource for ThreadPathCondition {
    fn current(&self) -> Vec<Constraint> {
        peek()
    }

    fn flush(&self) -> Vec<Constraint> {
        drain()
    }

    fn count(&self) -> usize {
        size()
    }

    fn clear(&self) {
        reset();
    }
}
