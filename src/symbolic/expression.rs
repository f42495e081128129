//! Solver-facing expression trees.

use std::{collections::BTreeSet, fmt};

use strum::{Display, EnumIter, EnumString};

use crate::runtime::ValueKind;

/// Sort of a solver variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Sort {
    /// Mathematical integer
    Int,
    /// Real number
    Real,
    /// Object identity
    Reference,
    /// Character string, compared by identity
    String,
}

impl From<ValueKind> for Sort {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Int | ValueKind::Long => Sort::Int,
            ValueKind::Float | ValueKind::Double => Sort::Real,
            ValueKind::Reference => Sort::Reference,
        }
    }
}

/// A named solver variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable {
    /// Name, unique within a formula
    pub name: String,
    /// Sort
    pub sort: Sort,
}

/// Binary operators of [`Expression::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Boolean conjunction
    And,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl Operator {
    /// The textual symbol used in rendered formulas.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::And => "&&",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
        }
    }

    /// Returns true for the six comparison operators.
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Lt
                | Operator::Le
                | Operator::Gt
                | Operator::Ge
        )
    }

    /// The logical negation of a relation, `None` for other operators.
    #[must_use]
    pub const fn complement(self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Lt => Some(Operator::Ge),
            Operator::Ge => Some(Operator::Lt),
            Operator::Gt => Some(Operator::Le),
            Operator::Le => Some(Operator::Gt),
            _ => None,
        }
    }

    /// The relation with its operands swapped, `a OP b` == `b OP' a`.
    #[must_use]
    pub const fn mirrored(self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Eq),
            Operator::Ne => Some(Operator::Ne),
            Operator::Lt => Some(Operator::Gt),
            Operator::Gt => Some(Operator::Lt),
            Operator::Le => Some(Operator::Ge),
            Operator::Ge => Some(Operator::Le),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An immutable formula tree.
///
/// Renders in infix form with every binary node parenthesized, e.g.
/// `((thickness > 10) && (width <= 3))`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal
    IntConstant(i64),
    /// Real literal
    RealConstant(f64),
    /// Free variable
    Variable(Variable),
    /// Binary node
    Binary {
        /// Operator
        op: Operator,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },
    /// Conjunction of its children, rendered as a left-nested `&&` chain
    And(Vec<Expression>),
}

impl Expression {
    /// A variable node.
    #[must_use]
    pub fn variable(name: impl Into<String>, sort: Sort) -> Self {
        Expression::Variable(Variable {
            name: name.into(),
            sort,
        })
    }

    /// A binary node.
    #[must_use]
    pub fn binary(op: Operator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conjunction of `atoms`, `None` when empty.
    ///
    /// A single atom is returned as is. The children are held flat, so path conditions of any
    /// length build, render and drop without deep recursion.
    pub fn conjunction(atoms: impl IntoIterator<Item = Expression>) -> Option<Self> {
        let mut atoms: Vec<Expression> = atoms.into_iter().collect();
        match atoms.len() {
            0 => None,
            1 => atoms.pop(),
            _ => Some(Expression::And(atoms)),
        }
    }

    /// Returns true for literal nodes.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expression::IntConstant(_) | Expression::RealConstant(_)
        )
    }

    /// The numeric value of a literal node.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Expression::IntConstant(v) => Some(*v as f64),
            Expression::RealConstant(v) => Some(*v),
            _ => None,
        }
    }

    /// The conjuncts of a conjunction, in order; any other node is its own single atom.
    #[must_use]
    pub fn atoms(&self) -> Vec<&Expression> {
        let mut atoms = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expression::Binary {
                    op: Operator::And,
                    left,
                    right,
                } => {
                    stack.push(right);
                    stack.push(left);
                }
                Expression::And(children) => stack.extend(children.iter().rev()),
                other => atoms.push(other),
            }
        }
        atoms
    }

    /// Every numeric literal in the tree, in pre-order. Repeated literals are kept.
    #[must_use]
    pub fn thresholds(&self) -> Vec<f64> {
        let mut thresholds = Vec::new();
        self.walk(|node| {
            if let Some(value) = node.as_f64() {
                thresholds.push(value);
            }
        });
        thresholds
    }

    /// Distinct variables in the tree, sorted by name.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        let mut variables = BTreeSet::new();
        self.walk(|node| {
            if let Expression::Variable(variable) = node {
                variables.insert(variable.clone());
            }
        });
        variables.into_iter().collect()
    }

    fn walk<'a>(&'a self, mut visit: impl FnMut(&'a Expression)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visit(node);
            match node {
                Expression::Binary { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                Expression::And(children) => stack.extend(children.iter().rev()),
                _ => {}
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::IntConstant(v) => write!(f, "{v}"),
            Expression::RealConstant(v) => write!(f, "{v}"),
            Expression::Variable(variable) => f.write_str(&variable.name),
            Expression::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expression::And(children) => {
                let Some((first, rest)) = children.split_first() else {
                    return f.write_str("true");
                };
                for _ in rest {
                    f.write_str("(")?;
                }
                write!(f, "{first}")?;
                for child in rest {
                    write!(f, " {} {child})", Operator::And)?;
                }
                Ok(())
            }
        }
    }
}
