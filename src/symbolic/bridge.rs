//! Conversion of recorded constraints into expressions.
//!
//! Each [`Constraint`] becomes one relational atom describing the outcome that actually
//! happened: a branch that was not taken yields the complement of its relation, and an
//! ordered compare yields `<`, `==` or `>` according to its result.
//!
//! Operands are materialized as follows:
//!
//! - a labeled operand becomes the expression bound to its tag, or a variable named after
//!   the label when nothing is bound
//! - an unlabeled numeric operand admitted by the [`LiteralPolicy`] becomes a constant
//! - any other unlabeled operand becomes a free variable whose name is derived from the value,
//!   so equal values share a variable

use log::trace;

use crate::{
    runtime::{Constraint, ConstraintOperand, Operation, Tag, Value},
    symbolic::{Expression, Operator, Sort},
};

/// Window of unlabeled values that are kept as constants.
///
/// Values must be integral and lie within `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralPolicy {
    /// Smallest value kept as a constant
    pub min: i64,
    /// Largest value kept as a constant
    pub max: i64,
}

impl Default for LiteralPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl LiteralPolicy {
    /// The `-10..=10` window.
    #[must_use]
    pub const fn new() -> Self {
        Self { min: -10, max: 10 }
    }

    /// A custom window.
    #[must_use]
    pub const fn window(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Returns true if `value` is kept as a constant.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn admits(&self, value: &Value) -> bool {
        match value {
            Value::Int(v) => (self.min..=self.max).contains(&i64::from(*v)),
            Value::Long(v) => (self.min..=self.max).contains(v),
            Value::Float(_) | Value::Double(_) => value.as_f64().is_some_and(|v| {
                v.is_finite() && v.fract() == 0.0 && v >= self.min as f64 && v <= self.max as f64
            }),
            Value::Reference(_) => false,
        }
    }
}

/// Read access to tag bindings, as needed by [`ExpressionBridge`].
pub trait ExpressionLookup {
    /// The expression bound to `tag`.
    fn expression_for(&self, tag: &Tag) -> Option<Expression>;

    /// Returns true if `label` names a registered symbolic value.
    fn is_registered(&self, label: &str) -> bool;
}

/// Builds expressions from constraints.
pub struct ExpressionBridge<'a, L: ExpressionLookup + ?Sized> {
    lookup: &'a L,
    policy: LiteralPolicy,
}

impl<'a, L: ExpressionLookup + ?Sized> ExpressionBridge<'a, L> {
    /// Create a bridge resolving tags through `lookup`.
    pub fn new(lookup: &'a L, policy: LiteralPolicy) -> Self {
        Self { lookup, policy }
    }

    /// Convert one constraint, `None` if it is malformed.
    pub fn convert(&self, constraint: &Constraint) -> Option<Expression> {
        if !compatible(&constraint.operand1.value, &constraint.operand2.value) {
            trace!("skipping constraint with mismatched operands: {constraint}");
            return None;
        }

        let op = if constraint.operation.is_ordered_compare() {
            match constraint.result {
                r if r < 0 => Operator::Lt,
                r if r > 0 => Operator::Gt,
                _ => Operator::Eq,
            }
        } else {
            let taken = relation_operator(constraint.operation)?;
            if constraint.taken() {
                taken
            } else {
                taken.complement()?
            }
        };

        let left = self.operand(&constraint.operand1);
        let right = self.operand(&constraint.operand2);
        match (left, right) {
            (Some(left), Some(right)) => Some(Expression::binary(op, left, right)),
            _ => {
                trace!("skipping constraint with unrepresentable operand: {constraint}");
                None
            }
        }
    }

    /// Convert every well-formed constraint, in order.
    pub fn convert_all(&self, constraints: &[Constraint]) -> Vec<Expression> {
        constraints.iter().filter_map(|c| self.convert(c)).collect()
    }

    /// The conjunction of all well-formed constraints, `None` if there are none.
    pub fn conjunction(&self, constraints: &[Constraint]) -> Option<Expression> {
        Expression::conjunction(self.convert_all(constraints))
    }

    fn operand(&self, operand: &ConstraintOperand) -> Option<Expression> {
        let sort = Sort::from(operand.value.kind());

        if let Some(tag) = &operand.tag {
            return Some(
                self.lookup
                    .expression_for(tag)
                    .unwrap_or_else(|| Expression::variable(tag.label(), sort)),
            );
        }

        let value = &operand.value;
        if self.policy.admits(value) {
            return match value {
                Value::Int(v) => Some(Expression::IntConstant(i64::from(*v))),
                Value::Long(v) => Some(Expression::IntConstant(*v)),
                _ => value.as_f64().map(Expression::RealConstant),
            };
        }

        if value.as_f64().is_some_and(|v| !v.is_finite()) {
            return None;
        }
        Some(Expression::variable(self.free_name(value), sort))
    }

    fn free_name(&self, value: &Value) -> String {
        let base = match value {
            Value::Reference(Some(id)) => format!("ref_{:x}", id.0),
            Value::Reference(None) => "ref_null".to_string(),
            other => format!("lit_{}", other.to_string().replace('-', "m").replace('.', "_")),
        };

        let mut name = base;
        while self.lookup.is_registered(&name) {
            name.insert(0, '_');
        }
        name
    }
}

fn relation_operator(operation: Operation) -> Option<Operator> {
    match operation {
        Operation::Eq | Operation::AcmpEq => Some(Operator::Eq),
        Operation::Ne | Operation::AcmpNe => Some(Operator::Ne),
        Operation::Lt => Some(Operator::Lt),
        Operation::Ge => Some(Operator::Ge),
        Operation::Gt => Some(Operator::Gt),
        Operation::Le => Some(Operator::Le),
        _ => None,
    }
}

fn compatible(a: &Value, b: &Value) -> bool {
    Sort::from(a.kind()) == Sort::from(b.kind())
}
