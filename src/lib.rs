// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # pathcond
//!
//! Concolic comparison tracking for JVM-style bytecode.
//!
//! `pathcond` follows labeled ("symbolic") values through a running program by replacing
//! every comparison instruction with a call into a runtime dispatcher. The dispatcher
//! computes exactly what the original instruction would have, and whenever an operand carries
//! a label it appends the outcome to a per-thread path condition. The path condition can then
//! be turned into a formula and handed to a constraint solver to find inputs that drive the
//! program down other paths.
//!
//! ## Features
//!
//! - **Bytecode rewriting** - `lcmp`/`fcmp<op>`/`dcmp<op>` and `if_icmp<cond>`/`if_acmp<cond>`
//!   are replaced by dispatcher calls, with branch relocation and exception-table remapping
//! - **Exact comparison semantics** - including both `NaN` conventions of the ordered compares
//! - **Thread-local path conditions** - appends never contend between threads
//! - **Expression bridge** - constraints become relational atoms recording the branch taken
//! - **Solver channel** - line-delimited JSON over TCP, or an in-process interval solver
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use pathcond::prelude::*;
//!
//! let tags = Arc::new(ValueTagStore::new());
//! let manager = SymbolicManager::builder().tags(tags.clone()).build();
//! let dispatcher = Dispatcher::new(Some(tags), DispatchConfig::default());
//!
//! manager.make_double("thickness", 12.0)?;
//! path_condition::reset();
//!
//! // The rewritten `if (thickness > 10.0)` evaluates through the dispatcher
//! if dispatcher.dcmpl(12.0, 10.0) > 0 {
//!     let formula = manager.path_condition_expression().unwrap();
//!     assert_eq!(formula.to_string(), "(thickness > 10)");
//! }
//! # Ok::<(), pathcond::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - opcode table, instruction decoder and label-based encoder
//! - [`rewriter`] - the comparison rewriting pass over method bodies
//! - [`runtime`] - values, tags, constraints, the dispatcher and the path condition store
//! - [`symbolic`] - symbolic value registry, expression bridge and solvers
//! - [`Session`] - wires all of the above together for one process
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`](Result). Only misuse surfaces as an error
//! at runtime (invalid or duplicate labels, installing the dispatcher twice); rewrite failures
//! leave a class unchanged and solver failures mean "no solution".
//!
//! ```rust
//! use pathcond::{Error, symbolic::SymbolicManager};
//!
//! let manager = SymbolicManager::default();
//! match manager.make_int("two words", 1) {
//!     Err(Error::InvalidLabel(label)) => println!("rejected {label}"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use pathcond::prelude::*;
///
/// let manager = SymbolicManager::default();
/// let tag = manager.make_int("x", 3)?;
/// assert_eq!(tag.label(), "x");
/// # Ok::<(), pathcond::Error>(())
/// ```
pub mod prelude;

/// Instruction model, decoder and encoder for method bytecode.
pub mod assembly;

/// Replacement of comparison instructions by dispatcher calls.
pub mod rewriter;

/// Runtime values, tags, constraints and the comparison dispatcher.
pub mod runtime;

/// Symbolic values, expressions and solving.
pub mod symbolic;

mod config;
mod session;

/// `pathcond` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `pathcond` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Configuration of a tracking session.
pub use config::Config;

/// A running tracking session.
pub use session::Session;

/// Bounds-checked big-endian cursor over a code array.
///
/// # Example
///
/// ```rust
/// use pathcond::{Parser, assembly::decode_instruction};
/// let code = [0xB1]; // return
/// let mut parser = Parser::new(&code);
/// let instruction = decode_instruction(&mut parser)?;
/// assert_eq!(instruction.mnemonic, "return");
/// # Ok::<(), pathcond::Error>(())
/// ```
pub use file::parser::Parser;
