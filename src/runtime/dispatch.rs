//! The comparison dispatcher.
//!
//! Rewritten methods call one of the free functions of this module wherever a comparison
//! instruction used to be. Each function returns exactly what the replaced instruction would
//! have produced and, when an operand is labeled, appends a [`Constraint`] to the calling
//! thread's path condition.
//!
//! The functions route to a process-wide [`Dispatcher`] registered once with [`install`].
//! Until then they route to an untracked dispatcher that only compares.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pathcond::runtime::{path_condition, DispatchConfig, Dispatcher, Tag, TagStore, Value, ValueTagStore};
//!
//! let tags = Arc::new(ValueTagStore::new());
//! tags.attach(Value::Double(12.0), Tag::new("thickness")?);
//!
//! let dispatcher = Dispatcher::new(Some(tags), DispatchConfig::default());
//! path_condition::reset();
//!
//! assert_eq!(dispatcher.dcmpl(12.0, 10.0), 1);
//! assert_eq!(dispatcher.dcmpl(12.0, f64::NAN), -1);
//! assert_eq!(path_condition::size(), 2);
//! # Ok::<(), pathcond::Error>(())
//! ```

use std::{
    cmp::Ordering,
    sync::{Arc, OnceLock},
};

use log::trace;

use crate::{
    runtime::{
        path_condition, Constraint, ConstraintOperand, ObjectId, Operation, Relation, Tag,
        TagStore, Value,
    },
    Error, Result,
};

/// How the dispatcher decides whether a comparison is worth recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// Record when at least one operand carries a tag in the tag store.
    TagPresence,
    /// Record when an operand is floating-point, or an integer exceeding `threshold` in magnitude.
    ///
    /// No tag lookups are made, so recorded constraints carry no tags.
    Magnitude {
        /// Magnitude above which an integral value is recorded
        threshold: f64,
    },
}

/// Dispatcher behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Record constraints at all
    pub enabled: bool,
    /// Recording criterion
    pub detection: Detection,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchConfig {
    /// Tag-presence recording.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            detection: Detection::TagPresence,
        }
    }

    /// Compare only, never record.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            detection: Detection::TagPresence,
        }
    }

    /// Magnitude-heuristic recording.
    #[must_use]
    pub const fn magnitude(threshold: f64) -> Self {
        Self {
            enabled: true,
            detection: Detection::Magnitude { threshold },
        }
    }
}

/// Performs comparisons and records those that involve labeled values.
pub struct Dispatcher {
    tags: Option<Arc<dyn TagStore>>,
    config: DispatchConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tags", &self.tags.as_ref().map(|tags| tags.len()))
            .field("config", &self.config)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher consulting `tags`.
    ///
    /// Without a tag store and with [`Detection::TagPresence`] nothing is ever recorded.
    #[must_use]
    pub fn new(tags: Option<Arc<dyn TagStore>>, config: DispatchConfig) -> Self {
        Self { tags, config }
    }

    /// A dispatcher that compares and never records.
    #[must_use]
    pub const fn untracked() -> Self {
        Self {
            tags: None,
            config: DispatchConfig::disabled(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// `lcmp`: signed three-way compare of two `long`s.
    pub fn lcmp(&self, a: i64, b: i64) -> i32 {
        let result = ordering_result(a.cmp(&b));
        self.record(Value::Long(a), Value::Long(b), Operation::Lcmp, result);
        result
    }

    /// `fcmpl`: three-way compare of two `float`s, `-1` if either is `NaN`.
    pub fn fcmpl(&self, a: f32, b: f32) -> i32 {
        let result = ordered_compare(a, b, -1);
        self.record(Value::Float(a), Value::Float(b), Operation::Fcmpl, result);
        result
    }

    /// `fcmpg`: three-way compare of two `float`s, `1` if either is `NaN`.
    pub fn fcmpg(&self, a: f32, b: f32) -> i32 {
        let result = ordered_compare(a, b, 1);
        self.record(Value::Float(a), Value::Float(b), Operation::Fcmpg, result);
        result
    }

    /// `dcmpl`: three-way compare of two `double`s, `-1` if either is `NaN`.
    pub fn dcmpl(&self, a: f64, b: f64) -> i32 {
        let result = ordered_compare(a, b, -1);
        self.record(Value::Double(a), Value::Double(b), Operation::Dcmpl, result);
        result
    }

    /// `dcmpg`: three-way compare of two `double`s, `1` if either is `NaN`.
    pub fn dcmpg(&self, a: f64, b: f64) -> i32 {
        let result = ordered_compare(a, b, 1);
        self.record(Value::Double(a), Value::Double(b), Operation::Dcmpg, result);
        result
    }

    /// `if_icmp<cond>`: whether the branch is taken for `a relation b`.
    ///
    /// Reference relations are evaluated as plain equality on the integers.
    pub fn icmp_jump(&self, a: i32, b: i32, relation: Relation) -> bool {
        let taken = relation.evaluate(&a, &b);
        self.record(
            Value::Int(a),
            Value::Int(b),
            Operation::from(relation),
            i32::from(taken),
        );
        taken
    }

    /// `if_acmp<cond>`: whether the branch is taken for reference identity.
    ///
    /// Only [`Relation::AcmpEq`] and [`Relation::AcmpNe`] (and their integer counterparts
    /// [`Relation::Eq`] and [`Relation::Ne`]) are meaningful; ordered relations are never
    /// taken and never recorded.
    pub fn acmp_jump(&self, a: Option<ObjectId>, b: Option<ObjectId>, relation: Relation) -> bool {
        let (taken, operation) = match relation {
            Relation::AcmpEq | Relation::Eq => (a == b, Operation::AcmpEq),
            Relation::AcmpNe | Relation::Ne => (a != b, Operation::AcmpNe),
            _ => return false,
        };
        self.record(
            Value::Reference(a),
            Value::Reference(b),
            operation,
            i32::from(taken),
        );
        taken
    }

    fn record(&self, a: Value, b: Value, operation: Operation, result: i32) {
        if !self.config.enabled {
            return;
        }

        let (tag1, tag2) = match self.config.detection {
            Detection::TagPresence => {
                let tag1 = self.lookup(&a);
                let tag2 = self.lookup(&b);
                if tag1.is_none() && tag2.is_none() {
                    return;
                }
                (tag1, tag2)
            }
            Detection::Magnitude { threshold } => {
                if !might_be_symbolic(&a, threshold) && !might_be_symbolic(&b, threshold) {
                    return;
                }
                (None, None)
            }
        };

        let constraint = Constraint::new(
            ConstraintOperand::new(a, tag1),
            ConstraintOperand::new(b, tag2),
            operation,
            result,
        );
        trace!("{constraint}");
        path_condition::append(constraint);
    }

    fn lookup(&self, value: &Value) -> Option<Tag> {
        let tags = self.tags.as_ref()?;
        match tags.lookup(value) {
            Ok(tag) => tag,
            Err(error) => {
                trace!("tag lookup for {value} failed: {error}");
                None
            }
        }
    }
}

fn ordering_result(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

fn ordered_compare<T: PartialOrd>(a: T, b: T, unordered: i32) -> i32 {
    a.partial_cmp(&b).map_or(unordered, ordering_result)
}

fn might_be_symbolic(value: &Value, threshold: f64) -> bool {
    match value {
        Value::Int(_) | Value::Long(_) => value.as_f64().is_some_and(|v| v.abs() > threshold),
        Value::Float(_) | Value::Double(_) => true,
        Value::Reference(_) => false,
    }
}

static INSTALLED: OnceLock<Dispatcher> = OnceLock::new();
static UNTRACKED: Dispatcher = Dispatcher::untracked();

/// Register the process-wide dispatcher.
///
/// # Errors
///
/// Returns [`Error::AlreadyInstalled`] if a dispatcher was registered before.
pub fn install(dispatcher: Dispatcher) -> Result<()> {
    INSTALLED
        .set(dispatcher)
        .map_err(|_| Error::AlreadyInstalled)
}

/// Returns true once [`install`] has succeeded.
#[must_use]
pub fn is_installed() -> bool {
    INSTALLED.get().is_some()
}

/// The process-wide dispatcher, or the untracked one before installation.
#[must_use]
pub fn installed() -> &'static Dispatcher {
    INSTALLED.get().unwrap_or(&UNTRACKED)
}

/// Replacement for `lcmp`.
pub fn lcmp(a: i64, b: i64) -> i32 {
    installed().lcmp(a, b)
}

/// Replacement for `fcmpl`.
pub fn fcmpl(a: f32, b: f32) -> i32 {
    installed().fcmpl(a, b)
}

/// Replacement for `fcmpg`.
pub fn fcmpg(a: f32, b: f32) -> i32 {
    installed().fcmpg(a, b)
}

/// Replacement for `dcmpl`.
pub fn dcmpl(a: f64, b: f64) -> i32 {
    installed().dcmpl(a, b)
}

/// Replacement for `dcmpg`.
pub fn dcmpg(a: f64, b: f64) -> i32 {
    installed().dcmpg(a, b)
}

/// Replacement for the `if_icmp<cond>` family, `selector` as pushed by the rewriter.
///
/// Unknown selectors are never taken.
pub fn icmp_jump(a: i32, b: i32, selector: i32) -> bool {
    match Relation::from_selector(selector) {
        Some(relation) => installed().icmp_jump(a, b, relation),
        None => false,
    }
}

/// Replacement for the `if_acmp<cond>` family, `selector` as pushed by the rewriter.
///
/// Unknown selectors are never taken.
pub fn acmp_jump(a: Option<ObjectId>, b: Option<ObjectId>, selector: i32) -> bool {
    match Relation::from_selector(selector) {
        Some(relation) => installed().acmp_jump(a, b, relation),
        None => false,
    }
}
