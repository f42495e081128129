//! Shared fixtures for unit tests.

#![allow(dead_code)]

use std::sync::Arc;

use crate::{
    rewriter::{DispatcherRefs, DEFAULT_DISPATCHER_OWNER},
    runtime::{Constraint, ConstraintOperand, Operation, Tag, Value, ValueTagStore},
    symbolic::SymbolicManager,
};

pub const REF_LCMP: u16 = 20;
pub const REF_FCMPL: u16 = 21;
pub const REF_FCMPG: u16 = 22;
pub const REF_DCMPL: u16 = 23;
pub const REF_DCMPG: u16 = 24;
pub const REF_ICMP_JUMP: u16 = 25;
pub const REF_ACMP_JUMP: u16 = 26;

// Helper function to create dispatcher refs with fixed constant-pool indices
pub fn dispatcher_refs() -> DispatcherRefs {
    DispatcherRefs::from_indices(
        DEFAULT_DISPATCHER_OWNER,
        [
            REF_LCMP,
            REF_FCMPL,
            REF_FCMPG,
            REF_DCMPL,
            REF_DCMPG,
            REF_ICMP_JUMP,
            REF_ACMP_JUMP,
        ],
    )
}

// Helper function to create a constraint operand carrying `label`
pub fn labeled(value: Value, label: &str) -> ConstraintOperand {
    ConstraintOperand::new(value, Some(Tag::new(label).unwrap()))
}

// Helper function to create an untagged constraint operand
pub fn plain(value: Value) -> ConstraintOperand {
    ConstraintOperand::new(value, None)
}

// Helper function to create a constraint
pub fn constraint(
    operand1: ConstraintOperand,
    operand2: ConstraintOperand,
    operation: Operation,
    result: i32,
) -> Constraint {
    Constraint::new(operand1, operand2, operation, result)
}

// Helper function to create a manager with its own tag store and the interval solver
pub fn manager() -> (SymbolicManager, Arc<ValueTagStore>) {
    let tags = Arc::new(ValueTagStore::new());
    let manager = SymbolicManager::builder().tags(tags.clone()).build();
    (manager, tags)
}
