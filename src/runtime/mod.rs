//! Runtime side of comparison tracking.
//!
//! Rewritten code calls into [`dispatch`] in place of its comparison instructions. The
//! dispatcher asks a [`TagStore`] whether either operand is labeled and, if so, appends a
//! [`Constraint`] to the calling thread's [`path_condition`].
//!
//! # Key Types
//!
//! - [`Value`] - a concrete operand, hashable bit-exactly
//! - [`Tag`] - a symbolic label
//! - [`TagStore`] / [`ValueTagStore`] - value-to-tag association
//! - [`Constraint`] - one recorded comparison outcome
//! - [`Dispatcher`] - comparison semantics plus recording

pub mod dispatch;
pub mod path_condition;

mod constraint;
mod store;
mod tag;
mod value;

pub use constraint::{Constraint, ConstraintOperand, Operation, Relation};
pub use dispatch::{DispatchConfig, Detection, Dispatcher};
pub use path_condition::{ConstraintSource, ThreadPathCondition};
pub use store::{TagStore, ValueTagStore};
pub use tag::{validate_label, Tag};
pub use value::{ObjectId, Value, ValueKind};
