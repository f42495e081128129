//! Recorded comparison outcomes.
//!
//! Every comparison the dispatcher observes on a labeled operand becomes one [`Constraint`]:
//! the two concrete operands with the tags they carried at that moment, the [`Operation`]
//! that compared them and the concrete outcome. Branching comparisons record `1` when the
//! branch was taken and `0` otherwise; ordered comparisons record the `-1`/`0`/`1` the
//! instruction produced.

use std::{
    cmp::Ordering,
    fmt,
    sync::OnceLock,
    time::Instant,
};

use strum::{Display, EnumIter, EnumString};

use crate::runtime::{Tag, Value};

/// The relation tested by a compare-and-branch instruction.
///
/// Each relation has a stable integer selector that the rewriter pushes as the third argument
/// of the branch dispatch calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// `a == b`
    Eq,
    /// `a != b`
    Ne,
    /// `a < b`
    Lt,
    /// `a >= b`
    Ge,
    /// `a > b`
    Gt,
    /// `a <= b`
    Le,
    /// Reference identity
    AcmpEq,
    /// Reference non-identity
    AcmpNe,
}

impl Relation {
    /// The integer selector passed to the branch dispatch calls.
    #[must_use]
    pub const fn selector(self) -> i32 {
        match self {
            Relation::Eq => 0,
            Relation::Ne => 1,
            Relation::Lt => 2,
            Relation::Ge => 3,
            Relation::Gt => 4,
            Relation::Le => 5,
            Relation::AcmpEq => 6,
            Relation::AcmpNe => 7,
        }
    }

    /// Inverse of [`Relation::selector`].
    #[must_use]
    pub const fn from_selector(selector: i32) -> Option<Self> {
        match selector {
            0 => Some(Relation::Eq),
            1 => Some(Relation::Ne),
            2 => Some(Relation::Lt),
            3 => Some(Relation::Ge),
            4 => Some(Relation::Gt),
            5 => Some(Relation::Le),
            6 => Some(Relation::AcmpEq),
            7 => Some(Relation::AcmpNe),
            _ => None,
        }
    }

    /// Returns true for the two reference relations.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Relation::AcmpEq | Relation::AcmpNe)
    }

    /// Evaluate the relation on two comparable operands.
    ///
    /// The reference relations behave like [`Relation::Eq`] and [`Relation::Ne`].
    pub fn evaluate<T: PartialOrd>(self, a: &T, b: &T) -> bool {
        match self {
            Relation::Eq | Relation::AcmpEq => a == b,
            Relation::Ne | Relation::AcmpNe => a != b,
            Relation::Lt => a < b,
            Relation::Ge => a >= b,
            Relation::Gt => a > b,
            Relation::Le => a <= b,
        }
    }
}

/// The comparison that produced a [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// Integer `==` branch
    Eq,
    /// Integer `!=` branch
    Ne,
    /// Integer `<` branch
    Lt,
    /// Integer `>=` branch
    Ge,
    /// Integer `>` branch
    Gt,
    /// Integer `<=` branch
    Le,
    /// `long` three-way compare
    Lcmp,
    /// `float` three-way compare, `NaN` yields -1
    Fcmpl,
    /// `float` three-way compare, `NaN` yields 1
    Fcmpg,
    /// `double` three-way compare, `NaN` yields -1
    Dcmpl,
    /// `double` three-way compare, `NaN` yields 1
    Dcmpg,
    /// Reference identity branch
    AcmpEq,
    /// Reference non-identity branch
    AcmpNe,
}

impl Operation {
    /// Returns true for the three-way compares whose result is `-1`, `0` or `1`.
    #[must_use]
    pub const fn is_ordered_compare(self) -> bool {
        matches!(
            self,
            Operation::Lcmp
                | Operation::Fcmpl
                | Operation::Fcmpg
                | Operation::Dcmpl
                | Operation::Dcmpg
        )
    }

    /// The branch relation this operation records, `None` for ordered compares.
    #[must_use]
    pub const fn relation(self) -> Option<Relation> {
        match self {
            Operation::Eq => Some(Relation::Eq),
            Operation::Ne => Some(Relation::Ne),
            Operation::Lt => Some(Relation::Lt),
            Operation::Ge => Some(Relation::Ge),
            Operation::Gt => Some(Relation::Gt),
            Operation::Le => Some(Relation::Le),
            Operation::AcmpEq => Some(Relation::AcmpEq),
            Operation::AcmpNe => Some(Relation::AcmpNe),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Operation::Eq => "==",
            Operation::Ne => "!=",
            Operation::AcmpEq => "===",
            Operation::AcmpNe => "!==",
            Operation::Lt => "<",
            Operation::Ge => ">=",
            Operation::Gt => ">",
            Operation::Le => "<=",
            _ => "cmp",
        }
    }
}

impl From<Relation> for Operation {
    fn from(relation: Relation) -> Self {
        match relation {
            Relation::Eq => Operation::Eq,
            Relation::Ne => Operation::Ne,
            Relation::Lt => Operation::Lt,
            Relation::Ge => Operation::Ge,
            Relation::Gt => Operation::Gt,
            Relation::Le => Operation::Le,
            Relation::AcmpEq => Operation::AcmpEq,
            Relation::AcmpNe => Operation::AcmpNe,
        }
    }
}

/// One side of a recorded comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintOperand {
    /// The concrete value
    pub value: Value,
    /// The tag the value carried when the comparison executed
    pub tag: Option<Tag>,
}

impl ConstraintOperand {
    /// Create an operand.
    #[must_use]
    pub fn new(value: Value, tag: Option<Tag>) -> Self {
        Self { value, tag }
    }

    /// The label of the operand's tag, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.tag.as_ref().map(Tag::label)
    }
}

impl fmt::Display for ConstraintOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}[{}]", tag, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A recorded comparison outcome.
///
/// Two constraints compare equal when operands, operation and result agree; the timestamp is
/// ignored.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Left-hand operand
    pub operand1: ConstraintOperand,
    /// Right-hand operand
    pub operand2: ConstraintOperand,
    /// The comparison performed
    pub operation: Operation,
    /// `-1`/`0`/`1` for ordered compares, `1`/`0` for branch taken/not taken
    pub result: i32,
    /// Nanoseconds since the first constraint of the process was created
    pub timestamp: u64,
}

impl Constraint {
    /// Create a constraint stamped with the current time.
    #[must_use]
    pub fn new(
        operand1: ConstraintOperand,
        operand2: ConstraintOperand,
        operation: Operation,
        result: i32,
    ) -> Self {
        Self {
            operand1,
            operand2,
            operation,
            result,
            timestamp: now_nanos(),
        }
    }

    /// Returns true if either operand carries a tag.
    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.operand1.tag.is_some() || self.operand2.tag.is_some()
    }

    /// Returns true if the comparison branch was taken, or for ordered compares if the result
    /// is non-zero.
    #[must_use]
    pub fn taken(&self) -> bool {
        self.result != 0
    }

    /// The ordering recorded by an ordered compare.
    #[must_use]
    pub fn ordering(&self) -> Option<Ordering> {
        if !self.operation.is_ordered_compare() {
            return None;
        }
        Some(self.result.cmp(&0))
    }

    /// A human-readable rendering of the comparison outcome.
    ///
    /// Branch constraints render as `a OP b`, negated with `!` when the branch was not taken.
    /// Ordered compares render as `cmp(a, b) == r`.
    #[must_use]
    pub fn to_expression_string(&self) -> String {
        if self.operation.is_ordered_compare() {
            return format!(
                "{}({}, {}) == {}",
                self.operation.to_string().to_lowercase(),
                self.operand1,
                self.operand2,
                self.result
            );
        }

        let expression = format!(
            "{} {} {}",
            self.operand1,
            self.operation.symbol(),
            self.operand2
        );
        if self.taken() {
            expression
        } else {
            format!("!({expression})")
        }
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.operand1 == other.operand1
            && self.operand2 == other.operand2
            && self.operation == other.operation
            && self.result == other.result
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Constraint{{{} {} {} -> {}}}",
            self.operand1, self.operation, self.operand2, self.result
        )
    }
}

fn now_nanos() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn labeled(value: Value, label: &str) -> ConstraintOperand {
        ConstraintOperand::new(value, Some(Tag::new(label).unwrap()))
    }

    #[test]
    fn selectors_round_trip() {
        for relation in Relation::iter() {
            assert_eq!(Relation::from_selector(relation.selector()), Some(relation));
        }
        assert_eq!(Relation::from_selector(8), None);
        assert_eq!(Relation::from_selector(-1), None);
    }

    #[test]
    fn relation_evaluation() {
        assert!(Relation::Gt.evaluate(&12, &10));
        assert!(!Relation::Le.evaluate(&12, &10));
        assert!(Relation::Ge.evaluate(&10, &10));
        assert!(Relation::AcmpEq.evaluate(&None::<u64>, &None));
        assert!(Relation::AcmpNe.evaluate(&Some(1u64), &None));
    }

    #[test]
    fn operation_names() {
        assert_eq!(Operation::Fcmpl.to_string(), "FCMPL");
        assert_eq!(Operation::AcmpEq.to_string(), "ACMP_EQ");
        assert_eq!("DCMPG".parse::<Operation>().unwrap(), Operation::Dcmpg);
        assert_eq!(Operation::from(Relation::Le), Operation::Le);
        assert!(Operation::Lcmp.relation().is_none());
    }

    #[test]
    fn rendering() {
        let taken = Constraint::new(
            labeled(Value::Int(12), "x"),
            ConstraintOperand::new(Value::Int(10), None),
            Operation::Gt,
            1,
        );
        assert_eq!(taken.to_expression_string(), "x[12] > 10");
        assert_eq!(taken.to_string(), "Constraint{x[12] GT 10 -> 1}");

        let not_taken = Constraint::new(
            labeled(Value::Int(3), "x"),
            ConstraintOperand::new(Value::Int(10), None),
            Operation::Gt,
            0,
        );
        assert_eq!(not_taken.to_expression_string(), "!(x[3] > 10)");

        let ordered = Constraint::new(
            labeled(Value::Double(12.0), "thickness"),
            ConstraintOperand::new(Value::Double(10.0), None),
            Operation::Dcmpl,
            1,
        );
        assert_eq!(
            ordered.to_expression_string(),
            "dcmpl(thickness[12], 10) == 1"
        );
        assert_eq!(ordered.ordering(), Some(Ordering::Greater));
    }

    #[test]
    fn equality_ignores_timestamp() {
        let make = || {
            Constraint::new(
                labeled(Value::Long(5), "n"),
                ConstraintOperand::new(Value::Long(7), None),
                Operation::Lcmp,
                -1,
            )
        };
        let first = make();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let second = make();

        assert!(second.timestamp >= first.timestamp);
        assert_eq!(first, second);
        assert!(first.is_labeled());
    }
}
