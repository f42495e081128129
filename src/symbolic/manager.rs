//! Registry of symbolic values.

use std::{fmt, sync::Arc, sync::Mutex};

use dashmap::{mapref::entry::Entry, DashMap};
use log::debug;

use crate::{
    runtime::{
        validate_label, Constraint, ConstraintSource, ObjectId, Tag, TagStore,
        ThreadPathCondition, Value, ValueKind, ValueTagStore,
    },
    symbolic::{
        Expression, ExpressionBridge, ExpressionLookup, IntervalSolver, LiteralPolicy, Solution,
        SolveOutcome, Solver, Sort,
    },
    Error, Result,
};

/// A registered symbolic value.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicValue {
    /// Unique label
    pub label: String,
    /// Kind requested at registration
    pub kind: ValueKind,
    /// Sort of the bound variable
    pub sort: Sort,
    /// Concrete value at registration
    pub value: Value,
    /// Tag attached to the value
    pub tag: Tag,
    /// Contents of a registered string
    pub text: Option<String>,
}

/// Read-only counters of a [`SymbolicManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    /// Registered symbolic values
    pub symbolic_values: usize,
    /// Tags with a bound expression
    pub expression_bindings: usize,
    /// Constraints on the calling thread's path condition
    pub path_constraints: usize,
    /// Whether the solver holds an open connection, `None` for an in-process solver
    pub solver_connected: Option<bool>,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symbolic values:     {}", self.symbolic_values)?;
        writeln!(f, "Expression bindings: {}", self.expression_bindings)?;
        writeln!(f, "Path constraints:    {}", self.path_constraints)?;
        match self.solver_connected {
            Some(connected) => write!(f, "Solver connected:    {connected}"),
            None => write!(f, "Solver connected:    n/a"),
        }
    }
}

/// Builder for [`SymbolicManager`].
pub struct SymbolicManagerBuilder {
    tags: Option<Arc<dyn TagStore>>,
    source: Option<Arc<dyn ConstraintSource>>,
    solver: Option<Box<dyn Solver>>,
    policy: LiteralPolicy,
}

impl SymbolicManagerBuilder {
    /// Attach tags to values in `tags`.
    #[must_use]
    pub fn tags(mut self, tags: Arc<dyn TagStore>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Read constraints from `source`.
    #[must_use]
    pub fn source(mut self, source: Arc<dyn ConstraintSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Solve with `solver`.
    #[must_use]
    pub fn solver(mut self, solver: Box<dyn Solver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Materialize unlabeled operands with `policy`.
    #[must_use]
    pub fn policy(mut self, policy: LiteralPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the manager, defaulting to a private [`ValueTagStore`], the calling thread's
    /// path condition and the [`IntervalSolver`].
    #[must_use]
    pub fn build(self) -> SymbolicManager {
        SymbolicManager {
            tags: self
                .tags
                .unwrap_or_else(|| Arc::new(ValueTagStore::new())),
            source: self.source.unwrap_or_else(|| Arc::new(ThreadPathCondition)),
            solver: self.solver.unwrap_or_else(|| Box::new(IntervalSolver::new())),
            policy: self.policy,
            registration: Mutex::new(()),
            symbols: DashMap::new(),
            expressions: DashMap::new(),
        }
    }
}

/// Creates symbolic values and turns path conditions into solver queries.
///
/// Registration and [`SymbolicManager::reset`] are serialized; lookups run concurrently with
/// them. Path-condition operations act on the calling thread's constraints.
///
/// # Example
///
/// ```rust
/// use pathcond::symbolic::SymbolicManager;
///
/// let manager = SymbolicManager::default();
/// let tag = manager.make_double("thickness", 12.0)?;
///
/// assert_eq!(manager.expression_for(&tag).unwrap().to_string(), "thickness");
/// assert_eq!(manager.statistics().symbolic_values, 1);
/// # Ok::<(), pathcond::Error>(())
/// ```
pub struct SymbolicManager {
    tags: Arc<dyn TagStore>,
    source: Arc<dyn ConstraintSource>,
    solver: Box<dyn Solver>,
    policy: LiteralPolicy,
    registration: Mutex<()>,
    symbols: DashMap<String, SymbolicValue>,
    expressions: DashMap<Tag, Expression>,
}

impl Default for SymbolicManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for SymbolicManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicManager")
            .field("symbols", &self.symbols.len())
            .field("expressions", &self.expressions.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SymbolicManager {
    /// Start building a manager.
    #[must_use]
    pub fn builder() -> SymbolicManagerBuilder {
        SymbolicManagerBuilder {
            tags: None,
            source: None,
            solver: None,
            policy: LiteralPolicy::default(),
        }
    }

    /// The tag store values are labeled in.
    #[must_use]
    pub fn tags(&self) -> &Arc<dyn TagStore> {
        &self.tags
    }

    /// Register `value` as symbolic under `label`.
    ///
    /// Attaches a fresh tag to the value and binds the tag to a variable named `label`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLabel`] if `label` is empty or contains whitespace
    /// - [`Error::KindMismatch`] if `value` is not of kind `kind`
    /// - [`Error::DuplicateLabel`] if `label` was registered since the last reset
    pub fn create_symbolic(&self, kind: ValueKind, label: &str, value: Value) -> Result<Tag> {
        validate_label(label)?;
        if value.kind() != kind {
            return Err(Error::KindMismatch {
                kind: kind.to_string(),
                value: value.to_string(),
            });
        }

        self.register(kind, Sort::from(kind), label, value, None)
    }

    fn register(
        &self,
        kind: ValueKind,
        sort: Sort,
        label: &str,
        value: Value,
        text: Option<String>,
    ) -> Result<Tag> {
        let _guard = lock!(self.registration);
        let Entry::Vacant(slot) = self.symbols.entry(label.to_string()) else {
            return Err(Error::DuplicateLabel(label.to_string()));
        };

        let tag = Tag::new(label)?;
        self.expressions
            .insert(tag.clone(), Expression::variable(label, sort));
        self.tags.attach(value, tag.clone());

        match &text {
            Some(text) => debug!("registered symbolic {sort} '{label}' = {value} {text:?}"),
            None => debug!("registered symbolic {kind} '{label}' = {value}"),
        }
        slot.insert(SymbolicValue {
            label: label.to_string(),
            kind,
            sort,
            value,
            tag: tag.clone(),
            text,
        });
        Ok(tag)
    }

    /// Register a symbolic `int`.
    ///
    /// # Errors
    ///
    /// See [`SymbolicManager::create_symbolic`].
    pub fn make_int(&self, label: &str, value: i32) -> Result<Tag> {
        self.create_symbolic(ValueKind::Int, label, Value::Int(value))
    }

    /// Register a symbolic `long`.
    ///
    /// # Errors
    ///
    /// See [`SymbolicManager::create_symbolic`].
    pub fn make_long(&self, label: &str, value: i64) -> Result<Tag> {
        self.create_symbolic(ValueKind::Long, label, Value::Long(value))
    }

    /// Register a symbolic `float`.
    ///
    /// # Errors
    ///
    /// See [`SymbolicManager::create_symbolic`].
    pub fn make_float(&self, label: &str, value: f32) -> Result<Tag> {
        self.create_symbolic(ValueKind::Float, label, Value::Float(value))
    }

    /// Register a symbolic `double`.
    ///
    /// # Errors
    ///
    /// See [`SymbolicManager::create_symbolic`].
    pub fn make_double(&self, label: &str, value: f64) -> Result<Tag> {
        self.create_symbolic(ValueKind::Double, label, Value::Double(value))
    }

    /// Register a symbolic object reference.
    ///
    /// # Errors
    ///
    /// See [`SymbolicManager::create_symbolic`].
    pub fn make_reference(&self, label: &str, object: ObjectId) -> Result<Tag> {
        self.create_symbolic(ValueKind::Reference, label, Value::Reference(Some(object)))
    }

    /// Register a symbolic string held by `object`.
    ///
    /// The string is tracked by the identity of `object` and bound to a string-sorted
    /// variable. `contents` is kept with the registration.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLabel`] if `label` is empty or contains whitespace
    /// - [`Error::DuplicateLabel`] if `label` was registered since the last reset
    pub fn make_string(&self, label: &str, object: ObjectId, contents: &str) -> Result<Tag> {
        validate_label(label)?;
        self.register(
            ValueKind::Reference,
            Sort::String,
            label,
            Value::Reference(Some(object)),
            Some(contents.to_string()),
        )
    }

    /// The registration for `label`.
    #[must_use]
    pub fn symbolic(&self, label: &str) -> Option<SymbolicValue> {
        self.symbols.get(label).map(|entry| entry.value().clone())
    }

    /// The expression bound to `tag`.
    #[must_use]
    pub fn expression_for(&self, tag: &Tag) -> Option<Expression> {
        self.expressions.get(tag).map(|entry| entry.value().clone())
    }

    /// The tag attached to `value`; lookup failures count as untagged.
    #[must_use]
    pub fn tag_for(&self, value: &Value) -> Option<Tag> {
        self.tags.lookup(value).ok().flatten()
    }

    /// Bind `expression` to `tag`, replacing any previous binding.
    pub fn associate(&self, tag: Tag, expression: Expression) {
        let _guard = lock!(self.registration);
        debug!("bound {tag} to {expression}");
        self.expressions.insert(tag, expression);
    }

    /// Number of registered symbolic values.
    #[must_use]
    pub fn symbolic_values(&self) -> usize {
        self.symbols.len()
    }

    /// Number of tags with a bound expression.
    #[must_use]
    pub fn expression_bindings(&self) -> usize {
        self.expressions.len()
    }

    /// Snapshot of the calling thread's path condition.
    #[must_use]
    pub fn path_condition(&self) -> Vec<Constraint> {
        self.source.current()
    }

    /// Take the calling thread's path condition, leaving it empty.
    #[must_use]
    pub fn flush_path_condition(&self) -> Vec<Constraint> {
        self.source.flush()
    }

    /// The calling thread's path condition as one conjunction.
    #[must_use]
    pub fn path_condition_expression(&self) -> Option<Expression> {
        self.bridge().conjunction(&self.source.current())
    }

    /// Every atom of the calling thread's path condition, in order.
    #[must_use]
    pub fn path_condition_atoms(&self) -> Vec<Expression> {
        self.bridge().convert_all(&self.source.current())
    }

    /// Numeric literals of the calling thread's path condition.
    #[must_use]
    pub fn thresholds(&self) -> Vec<f64> {
        self.path_condition_expression()
            .map(|expression| expression.thresholds())
            .unwrap_or_default()
    }

    /// Solve the calling thread's path condition.
    ///
    /// Returns the values the solver chose for registered labels, or `None` if there is
    /// nothing to solve, the formula is unsatisfiable, or the solver is unavailable.
    #[must_use]
    pub fn solve_current_path_condition(&self) -> Option<Solution> {
        let formula = self.path_condition_expression()?;
        debug!("solving {formula}");

        match self.solver.solve(&formula) {
            SolveOutcome::Sat(solution) => Some(
                solution
                    .into_iter()
                    .filter(|(name, _)| self.symbols.contains_key(name))
                    .collect(),
            ),
            SolveOutcome::Unsat => {
                debug!("path condition is unsatisfiable");
                None
            }
            SolveOutcome::Unavailable => None,
        }
    }

    /// Drop every registration and the calling thread's path condition.
    pub fn reset(&self) {
        let _guard = lock!(self.registration);
        for entry in &self.symbols {
            self.tags.detach(&entry.value().value);
        }
        self.symbols.clear();
        self.expressions.clear();
        self.source.clear();
        debug!("symbolic state reset");
    }

    /// Current counters.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        Statistics {
            symbolic_values: self.symbols.len(),
            expression_bindings: self.expressions.len(),
            path_constraints: self.source.count(),
            solver_connected: self.solver.is_connected(),
        }
    }

    /// Close the solver connection and reset. Safe to call repeatedly.
    pub fn close(&self) {
        self.solver.close();
        self.reset();
    }

    fn bridge(&self) -> ExpressionBridge<'_, Self> {
        ExpressionBridge::new(self, self.policy)
    }
}

impl ExpressionLookup for SymbolicManager {
    fn expression_for(&self, tag: &Tag) -> Option<Expression> {
        SymbolicManager::expression_for(self, tag)
    }

    fn is_registered(&self, label: &str) -> bool {
        self.symbols.contains_key(label)
    }
}
