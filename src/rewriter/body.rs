//! Method bodies as exchanged with the class-file layer.

use std::collections::BTreeMap;

/// One row of a method's exception table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// First covered code offset (inclusive)
    pub start_pc: u16,
    /// End of the covered range (exclusive)
    pub end_pc: u16,
    /// Offset of the handler code
    pub handler_pc: u16,
    /// Constant-pool index of the caught class, 0 for any
    pub catch_type: u16,
}

/// The parts of a `Code` attribute the rewriter reads and produces.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodBody {
    /// Raw bytecode
    pub code: Vec<u8>,
    /// Operand stack depth
    pub max_stack: u16,
    /// Local variable slots
    pub max_locals: u16,
    /// Exception handlers in table order
    pub exception_table: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Create a body without exception handlers.
    #[must_use]
    pub fn new(code: Vec<u8>, max_stack: u16, max_locals: u16) -> Self {
        Self {
            code,
            max_stack,
            max_locals,
            exception_table: Vec::new(),
        }
    }

    /// Attach an exception table.
    #[must_use]
    pub fn with_exception_table(mut self, handlers: Vec<ExceptionHandler>) -> Self {
        self.exception_table = handlers;
        self
    }
}

/// Counters for one rewritten method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteStats {
    /// `lcmp`/`fcmp<op>`/`dcmp<op>` replaced
    pub ordered_compares: usize,
    /// `if_icmp<cond>`/`if_acmp<cond>` replaced
    pub branches: usize,
}

impl RewriteStats {
    /// Total replaced instructions.
    #[must_use]
    pub fn total(&self) -> usize {
        self.ordered_compares + self.branches
    }
}

impl std::ops::AddAssign for RewriteStats {
    fn add_assign(&mut self, rhs: Self) {
        self.ordered_compares += rhs.ordered_compares;
        self.branches += rhs.branches;
    }
}

/// A method after comparison rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenMethod {
    /// The new body
    pub body: MethodBody,
    /// Old instruction offset (and old code length) to new offset
    pub offset_map: BTreeMap<u32, u32>,
    /// What was replaced
    pub stats: RewriteStats,
}

impl RewrittenMethod {
    /// New offset of the instruction that started at `old_offset`.
    #[must_use]
    pub fn map_offset(&self, old_offset: u32) -> Option<u32> {
        self.offset_map.get(&old_offset).copied()
    }
}
