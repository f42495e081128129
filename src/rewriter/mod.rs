//! Bytecode rewriting of comparison instructions.
//!
//! The [`Rewriter`] runs once per loaded class, before any of its code executes. It turns
//! each ordered compare and each two-operand conditional branch into a call to the matching
//! entry point of [`crate::runtime::dispatch`], keeping stack effects and branch targets
//! intact. A class either has all of its methods rewritten or none: any failure leaves it as
//! it was loaded.
//!
//! The class-file layer stays outside this crate. It hands over [`MethodBody`] values and the
//! constant-pool indices of the dispatcher methods ([`DispatcherRefs`]), and receives
//! [`RewrittenMethod`]s with an offset map for its own attribute remapping.

mod body;
mod refs;
#[allow(clippy::module_inception)]
mod rewriter;

pub use body::{ExceptionHandler, MethodBody, RewriteStats, RewrittenMethod};
pub use refs::{DispatcherRefs, DEFAULT_DISPATCHER_OWNER, DISPATCHER_METHODS};
pub use rewriter::{RewriteConfig, Rewriter, Transformation};
