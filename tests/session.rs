//! Process-wide session tests.
//!
//! The dispatcher can be installed once per process, so everything touching the global entry
//! points lives in a single test.

use pathcond::{
    rewriter::{DispatcherRefs, MethodBody, DEFAULT_DISPATCHER_OWNER},
    runtime::{dispatch, path_condition, Relation},
    Config, Error, Result, Session,
};

fn refs() -> DispatcherRefs {
    DispatcherRefs::from_indices(DEFAULT_DISPATCHER_OWNER, [1, 2, 3, 4, 5, 6, 7])
}

#[test]
fn session_lifecycle() -> Result<()> {
    assert!(!dispatch::is_installed());

    // Entry points work before any session exists, they just never record
    assert_eq!(dispatch::lcmp(1, 2), -1);
    assert!(!dispatch::icmp_jump(1, 2, 99));

    let session = Session::start(Config::default(), refs())?;
    assert!(dispatch::is_installed());
    assert!(matches!(
        Session::start(Config::default(), refs()),
        Err(Error::AlreadyInstalled)
    ));

    let manager = session.manager();
    manager.make_int("age", 30)?;
    manager.make_double("score", 0.5)?;
    path_condition::reset();

    assert!(dispatch::icmp_jump(30, 18, Relation::Ge.selector()));
    assert_eq!(dispatch::dcmpg(0.5, 1.0), -1);
    assert_eq!(dispatch::fcmpl(1.0, 2.0), -1);

    let statistics = manager.statistics();
    assert_eq!(statistics.symbolic_values, 2);
    assert_eq!(statistics.path_constraints, 2);
    // The in-process solver has no connection to report
    assert_eq!(statistics.solver_connected, None);

    let formula = manager.path_condition_expression().expect("two atoms");
    assert_eq!(formula.to_string(), "((age >= lit_18) && (score < 1))");

    // Rewriting is available from the same session
    let body = MethodBody::new(vec![0x1E, 0x20, 0x94, 0xAC], 4, 4);
    let rewritten = session
        .rewriter()
        .rewrite_method(&body)?
        .expect("lcmp is rewritten");
    assert_eq!(rewritten.body.code, vec![0x1E, 0x20, 0xB8, 0x00, 0x01, 0xAC]);

    drop(session);
    assert!(path_condition::is_empty());
    Ok(())
}
