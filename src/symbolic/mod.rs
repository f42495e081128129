//! Symbolic values, expressions and solving.
//!
//! This module is used by analysis code, off the dispatcher's hot path:
//!
//! - [`SymbolicManager`] registers labeled inputs and answers questions about the calling
//!   thread's path condition
//! - [`ExpressionBridge`] converts recorded constraints into [`Expression`] atoms
//! - [`Solver`] implementations find values satisfying a path condition
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pathcond::{
//!     runtime::{path_condition, DispatchConfig, Dispatcher, ValueTagStore},
//!     symbolic::SymbolicManager,
//! };
//!
//! let tags = Arc::new(ValueTagStore::new());
//! let manager = SymbolicManager::builder().tags(tags.clone()).build();
//! let dispatcher = Dispatcher::new(Some(tags), DispatchConfig::default());
//!
//! manager.make_double("thickness", 12.0)?;
//! path_condition::reset();
//! dispatcher.dcmpl(12.0, 10.0);
//!
//! let formula = manager.path_condition_expression().unwrap();
//! assert_eq!(formula.to_string(), "(thickness > 10)");
//!
//! let solution = manager.solve_current_path_condition().unwrap();
//! assert!(solution["thickness"].as_f64() > 10.0);
//! # Ok::<(), pathcond::Error>(())
//! ```

mod bridge;
mod expression;
mod manager;
mod solver;

pub use bridge::{ExpressionBridge, ExpressionLookup, LiteralPolicy};
pub use expression::{Expression, Operator, Sort, Variable};
pub use manager::{Statistics, SymbolicManager, SymbolicManagerBuilder, SymbolicValue};
pub use solver::{
    IntervalSolver, Solution, SolveOutcome, SolvedValue, Solver, SolverConfig, SocketSolver,
};
