//! Constraint solver channel.
//!
//! A [`Solver`] takes a formula and answers with a satisfying assignment, with
//! "unsatisfiable", or with "unavailable". Failures never surface as errors to callers: a
//! solver that cannot be reached is simply unavailable.
//!
//! [`SocketSolver`] talks to an external solver process over TCP. Each request and each
//! response is one JSON object on its own line:
//!
//! ```text
//! -> {"formula":"((thickness > 10) && (thickness < 60))","variables":["thickness"]}
//! <- {"status":"sat","values":{"thickness":11.5}}
//! <- {"status":"unsat"}
//! <- {"status":"unknown"}
//! ```
//!
//! [`IntervalSolver`] answers in-process for conjunctions of `variable OP constant` atoms.

use std::{
    collections::{BTreeMap, HashMap},
    env, fmt,
    io::{BufRead, BufReader, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    sync::Mutex,
    time::Duration,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    symbolic::{Expression, Operator, Sort, Variable},
    Error, Result,
};

/// A value chosen by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SolvedValue {
    /// Integer-sorted value
    Int(i64),
    /// Real-sorted value
    Real(f64),
}

impl SolvedValue {
    /// The value as `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match self {
            SolvedValue::Int(v) => *v as f64,
            SolvedValue::Real(v) => *v,
        }
    }
}

impl fmt::Display for SolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvedValue::Int(v) => write!(f, "{v}"),
            SolvedValue::Real(v) => write!(f, "{v}"),
        }
    }
}

/// Variable name to chosen value.
pub type Solution = BTreeMap<String, SolvedValue>;

/// Answer of a [`Solver`].
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    /// Satisfiable, with an assignment
    Sat(Solution),
    /// Proven unsatisfiable
    Unsat,
    /// No answer: unreachable, timed out, or formula out of scope
    Unavailable,
}

impl SolveOutcome {
    /// The assignment, if satisfiable.
    #[must_use]
    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SolveOutcome::Sat(solution) => Some(solution),
            _ => None,
        }
    }
}

/// A constraint solver.
pub trait Solver: Send + Sync {
    /// Solve `formula`.
    fn solve(&self, formula: &Expression) -> SolveOutcome;

    /// Whether a connection to the solver is currently open, `None` for solvers that run
    /// in-process and never connect.
    fn is_connected(&self) -> Option<bool>;

    /// Release any connection. Safe to call repeatedly.
    fn close(&self);
}

/// Where and how to reach the external solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Use the external solver rather than the in-process one
    pub enabled: bool,
    /// Host name or address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
    /// Timeout for each read and write
    pub io_timeout: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverConfig {
    /// `127.0.0.1:9090`, external solver disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 9090,
            connect_timeout: Duration::from_secs(2),
            io_timeout: Duration::from_secs(10),
        }
    }

    /// An enabled configuration for `host:port`.
    #[must_use]
    pub fn remote(host: impl Into<String>, port: u16) -> Self {
        Self {
            enabled: true,
            host: host.into(),
            port,
            ..Self::new()
        }
    }

    /// Defaults overridden by `SAT_SERVER` and `SAT_PORT`.
    ///
    /// Setting either variable enables the external solver. An unparsable port is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(host) = env::var("SAT_SERVER") {
            config.host = host;
            config.enabled = true;
        }
        if let Ok(port) = env::var("SAT_PORT") {
            match port.parse() {
                Ok(port) => {
                    config.port = port;
                    config.enabled = true;
                }
                Err(_) => warn!("ignoring invalid SAT_PORT value '{port}'"),
            }
        }
        config
    }

    /// `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Serialize)]
struct Request<'a> {
    formula: String,
    variables: Vec<&'a str>,
}

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Response {
    Sat { values: Solution },
    Unsat,
    Unknown,
}

/// [`Solver`] backed by an external process over TCP.
///
/// A single connection is shared by all callers. It is opened on first use and reopened
/// after any failure.
#[derive(Debug)]
pub struct SocketSolver {
    config: SolverConfig,
    connection: Mutex<Option<BufReader<TcpStream>>>,
}

impl SocketSolver {
    /// Create a solver; no connection is made until the first request.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn connect(&self) -> Result<BufReader<TcpStream>> {
        let address = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Solver(format!("no address for {}", self.config.address())))?;

        let stream = TcpStream::connect_timeout(&address, self.config.connect_timeout)?;
        stream.set_read_timeout(Some(self.config.io_timeout))?;
        stream.set_write_timeout(Some(self.config.io_timeout))?;
        stream.set_nodelay(true)?;
        debug!("connected to solver at {}", self.config.address());
        Ok(BufReader::new(stream))
    }

    fn exchange(connection: &mut BufReader<TcpStream>, request: &Request<'_>) -> Result<Response> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        let stream = connection.get_mut();
        stream.write_all(&line)?;
        stream.flush()?;

        let mut reply = String::new();
        if connection.read_line(&mut reply)? == 0 {
            return Err(Error::Solver("connection closed by solver".to_string()));
        }
        Ok(serde_json::from_str(reply.trim_end())?)
    }

    fn request(&self, formula: &Expression) -> Result<Response> {
        let variables = formula.variables();
        let request = Request {
            formula: formula.to_string(),
            variables: variables.iter().map(|v| v.name.as_str()).collect(),
        };

        let mut guard = lock!(self.connection);
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        let Some(connection) = guard.as_mut() else {
            return Err(Error::Solver("no connection".to_string()));
        };

        let response = Self::exchange(connection, &request);
        if response.is_err() {
            *guard = None;
        }
        response
    }
}

impl Solver for SocketSolver {
    fn solve(&self, formula: &Expression) -> SolveOutcome {
        match self.request(formula) {
            Ok(Response::Sat { values }) => SolveOutcome::Sat(values),
            Ok(Response::Unsat) => SolveOutcome::Unsat,
            Ok(Response::Unknown) => SolveOutcome::Unavailable,
            Err(error) => {
                warn!("solver at {} unavailable: {error}", self.config.address());
                SolveOutcome::Unavailable
            }
        }
    }

    fn is_connected(&self) -> Option<bool> {
        Some(lock!(self.connection).is_some())
    }

    fn close(&self) {
        if let Some(connection) = lock!(self.connection).take() {
            let _ = connection.get_ref().shutdown(Shutdown::Both);
            debug!("closed solver connection to {}", self.config.address());
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    value: f64,
    strict: bool,
}

#[derive(Debug, Default)]
struct Domain {
    lower: Option<Bound>,
    upper: Option<Bound>,
    equal: Option<f64>,
    excluded: Vec<f64>,
}

impl Domain {
    fn restrict(&mut self, op: Operator, value: f64) -> bool {
        match op {
            Operator::Eq => match self.equal {
                Some(existing) if existing != value => return false,
                _ => self.equal = Some(value),
            },
            Operator::Ne => self.excluded.push(value),
            Operator::Gt | Operator::Ge => {
                let bound = Bound {
                    value,
                    strict: op == Operator::Gt,
                };
                if self.lower.map_or(true, |l| tighter_lower(bound, l)) {
                    self.lower = Some(bound);
                }
            }
            Operator::Lt | Operator::Le => {
                let bound = Bound {
                    value,
                    strict: op == Operator::Lt,
                };
                if self.upper.map_or(true, |u| tighter_upper(bound, u)) {
                    self.upper = Some(bound);
                }
            }
            _ => {}
        }
        true
    }

    fn admits(&self, candidate: f64) -> bool {
        let above = self.lower.map_or(true, |l| {
            candidate > l.value || (!l.strict && candidate == l.value)
        });
        let below = self.upper.map_or(true, |u| {
            candidate < u.value || (!u.strict && candidate == u.value)
        });
        above && below && !self.excluded.contains(&candidate)
    }

    /// A value in the domain; `Err(true)` when provably empty, `Err(false)` when unsure.
    fn pick(&self, sort: Sort) -> std::result::Result<f64, bool> {
        if let Some(value) = self.equal {
            let integral = sort != Sort::Int || value.fract() == 0.0;
            return if integral && self.admits(value) {
                Ok(value)
            } else {
                Err(true)
            };
        }

        let (low, high) = match sort {
            Sort::Int => (
                self.lower
                    .map(|l| if l.strict { l.value.floor() + 1.0 } else { l.value.ceil() }),
                self.upper
                    .map(|u| if u.strict { u.value.ceil() - 1.0 } else { u.value.floor() }),
            ),
            _ => (self.lower.map(|l| l.value), self.upper.map(|u| u.value)),
        };

        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                return Err(true);
            }
        }

        let start = match (sort, low, high) {
            (Sort::Int, Some(low), _) => low,
            (Sort::Int, None, Some(high)) => high,
            (_, Some(low), Some(high)) => (low + high) / 2.0,
            (_, Some(low), None) => {
                if self.lower.is_some_and(|l| l.strict) {
                    low + 1.0
                } else {
                    low
                }
            }
            (_, None, Some(high)) => {
                if self.upper.is_some_and(|u| u.strict) {
                    high - 1.0
                } else {
                    high
                }
            }
            (_, None, None) => 0.0,
        };

        let step = if sort == Sort::Int {
            1.0
        } else {
            match (low, high) {
                (Some(low), Some(high)) if high > low => (high - low) / 64.0,
                _ => 1.0,
            }
        };

        for i in 0..=self.excluded.len() * 2 + 1 {
            #[allow(clippy::cast_precision_loss)]
            let offset = step * ((i / 2) as f64) * if i % 2 == 0 { 1.0 } else { -1.0 };
            let candidate = start + offset;
            if self.admits(candidate) {
                return Ok(candidate);
            }
        }

        Err(low == high && self.lower.is_some_and(|l| l.strict))
    }
}

fn tighter_lower(new: Bound, old: Bound) -> bool {
    new.value > old.value || (new.value == old.value && new.strict && !old.strict)
}

fn tighter_upper(new: Bound, old: Bound) -> bool {
    new.value < old.value || (new.value == old.value && new.strict && !old.strict)
}

/// In-process [`Solver`] for conjunctions of `variable OP constant` atoms.
///
/// Each variable gets an interval with optional excluded points; the solver picks a value
/// inside it. Formulas with any other shape (variables compared to variables, arithmetic,
/// reference- or string-sorted variables) are [`SolveOutcome::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalSolver;

impl IntervalSolver {
    /// Create a solver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Solver for IntervalSolver {
    fn solve(&self, formula: &Expression) -> SolveOutcome {
        let mut domains: HashMap<Variable, Domain> = HashMap::new();

        for atom in formula.atoms() {
            let Expression::Binary { op, left, right } = atom else {
                return SolveOutcome::Unavailable;
            };
            let (variable, op, value) = match (left.as_ref(), right.as_ref()) {
                (Expression::Variable(v), constant) if constant.is_constant() => {
                    (v, *op, constant.as_f64())
                }
                (constant, Expression::Variable(v)) if constant.is_constant() => {
                    match op.mirrored() {
                        Some(mirrored) => (v, mirrored, constant.as_f64()),
                        None => return SolveOutcome::Unavailable,
                    }
                }
                _ => return SolveOutcome::Unavailable,
            };
            let Some(value) = value else {
                return SolveOutcome::Unavailable;
            };
            if !op.is_relational() || matches!(variable.sort, Sort::Reference | Sort::String) {
                return SolveOutcome::Unavailable;
            }

            if !domains.entry(variable.clone()).or_default().restrict(op, value) {
                return SolveOutcome::Unsat;
            }
        }

        let mut solution = Solution::new();
        for (variable, domain) in &domains {
            match domain.pick(variable.sort) {
                #[allow(clippy::cast_possible_truncation)]
                Ok(value) if variable.sort == Sort::Int => {
                    solution.insert(variable.name.clone(), SolvedValue::Int(value as i64));
                }
                Ok(value) => {
                    solution.insert(variable.name.clone(), SolvedValue::Real(value));
                }
                Err(true) => return SolveOutcome::Unsat,
                Err(false) => return SolveOutcome::Unavailable,
            }
        }
        SolveOutcome::Sat(solution)
    }

    fn is_connected(&self) -> Option<bool> {
        None
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::BufRead, net::TcpListener, thread};

    fn atom(op: Operator, name: &str, sort: Sort, constant: Expression) -> Expression {
        Expression::binary(op, Expression::variable(name, sort), constant)
    }

    fn real(name: &str, op: Operator, value: f64) -> Expression {
        atom(op, name, Sort::Real, Expression::RealConstant(value))
    }

    fn int(name: &str, op: Operator, value: i64) -> Expression {
        atom(op, name, Sort::Int, Expression::IntConstant(value))
    }

    fn solve(atoms: Vec<Expression>) -> SolveOutcome {
        IntervalSolver::new().solve(&Expression::conjunction(atoms).unwrap())
    }

    #[test]
    fn interval_lower_bound() {
        let SolveOutcome::Sat(solution) = solve(vec![real("thickness", Operator::Gt, 10.0)]) else {
            panic!("expected sat");
        };
        assert!(solution["thickness"].as_f64() > 10.0);
    }

    #[test]
    fn interval_between_bounds() {
        let SolveOutcome::Sat(solution) = solve(vec![
            real("t", Operator::Gt, 10.0),
            real("t", Operator::Lt, 60.0),
            real("t", Operator::Ne, 35.0),
        ]) else {
            panic!("expected sat");
        };
        let value = solution["t"].as_f64();
        assert!(value > 10.0 && value < 60.0 && value != 35.0);
    }

    #[test]
    fn interval_integers() {
        let SolveOutcome::Sat(solution) = solve(vec![
            int("n", Operator::Gt, 3),
            int("n", Operator::Ne, 4),
            int("n", Operator::Le, 9),
        ]) else {
            panic!("expected sat");
        };
        assert_eq!(solution["n"], SolvedValue::Int(5));

        assert_eq!(
            solve(vec![int("n", Operator::Gt, 3), int("n", Operator::Lt, 4)]),
            SolveOutcome::Unsat
        );
    }

    #[test]
    fn interval_constant_on_left() {
        let formula = Expression::binary(
            Operator::Lt,
            Expression::IntConstant(7),
            Expression::variable("k", Sort::Int),
        );
        let SolveOutcome::Sat(solution) = IntervalSolver::new().solve(&formula) else {
            panic!("expected sat");
        };
        assert_eq!(solution["k"], SolvedValue::Int(8));
    }

    #[test]
    fn interval_contradictions() {
        assert_eq!(
            solve(vec![real("x", Operator::Eq, 1.0), real("x", Operator::Eq, 2.0)]),
            SolveOutcome::Unsat
        );
        assert_eq!(
            solve(vec![real("x", Operator::Eq, 1.0), real("x", Operator::Gt, 2.0)]),
            SolveOutcome::Unsat
        );
        assert_eq!(
            solve(vec![real("x", Operator::Ge, 5.0), real("x", Operator::Le, 4.0)]),
            SolveOutcome::Unsat
        );
    }

    #[test]
    fn interval_out_of_scope() {
        let formula = Expression::binary(
            Operator::Lt,
            Expression::variable("a", Sort::Int),
            Expression::variable("b", Sort::Int),
        );
        assert_eq!(IntervalSolver::new().solve(&formula), SolveOutcome::Unavailable);

        let text = atom(Operator::Ne, "name", Sort::String, Expression::IntConstant(0));
        assert_eq!(IntervalSolver::new().solve(&text), SolveOutcome::Unavailable);
        assert_eq!(IntervalSolver::new().is_connected(), None);
    }

    #[test]
    fn config_defaults() {
        let config = SolverConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.address(), "127.0.0.1:9090");
        assert!(SolverConfig::remote("solver", 1).enabled);
    }

    #[test]
    fn socket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let request: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["formula"], "(thickness > 10)");
            assert_eq!(request["variables"][0], "thickness");
            writer
                .write_all(b"{\"status\":\"sat\",\"values\":{\"thickness\":11.5}}\n")
                .unwrap();

            line.clear();
            reader.read_line(&mut line).unwrap();
            writer.write_all(b"{\"status\":\"unsat\"}\n").unwrap();
        });

        let solver = SocketSolver::new(SolverConfig::remote("127.0.0.1", port));
        let formula = real("thickness", Operator::Gt, 10.0);

        let SolveOutcome::Sat(solution) = solver.solve(&formula) else {
            panic!("expected sat");
        };
        assert_eq!(solution["thickness"], SolvedValue::Real(11.5));
        assert_eq!(solver.is_connected(), Some(true));
        assert_eq!(solver.solve(&formula), SolveOutcome::Unsat);

        server.join().unwrap();
        solver.close();
        solver.close();
        assert_eq!(solver.is_connected(), Some(false));
    }

    #[test]
    fn socket_unreachable_is_unavailable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = SolverConfig::remote("127.0.0.1", port);
        config.connect_timeout = Duration::from_millis(200);

        let solver = SocketSolver::new(config);
        assert_eq!(
            solver.solve(&real("x", Operator::Gt, 1.0)),
            SolveOutcome::Unavailable
        );
        assert_eq!(solver.is_connected(), Some(false));
    }
}
