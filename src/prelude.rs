//! # pathcond Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! pathcond library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pathcond operations
pub use crate::Error;

/// The result type used throughout pathcond
pub use crate::Result;

/// Session wiring and its configuration
pub use crate::{Config, Session};

// ================================================================================================
// Rewriting
// ================================================================================================

/// Method bodies and the rewriter
pub use crate::rewriter::{
    DispatcherRefs, ExceptionHandler, MethodBody, RewriteConfig, RewrittenMethod, Rewriter,
    Transformation,
};

// ================================================================================================
// Runtime
// ================================================================================================

/// Values, tags and recorded constraints
pub use crate::runtime::{
    path_condition, Constraint, DispatchConfig, Dispatcher, ObjectId, Operation, Relation, Tag,
    TagStore, Value, ValueKind, ValueTagStore,
};

// ================================================================================================
// Symbolic
// ================================================================================================

/// Symbolic values, expressions and solvers
pub use crate::symbolic::{
    Expression, ExpressionBridge, IntervalSolver, LiteralPolicy, SolveOutcome, Solver,
    SolverConfig, SocketSolver, SymbolicManager,
};
