//! End-to-end tracking tests.
//!
//! Each test wires its own tag store, manager and dispatcher, then plays the role of rewritten
//! code by calling the dispatcher directly. Path conditions are per thread, so tests running
//! in parallel never see each other's constraints.

use std::{sync::Arc, thread};

use pathcond::{
    runtime::{
        path_condition, Constraint, DispatchConfig, Dispatcher, ObjectId, Operation, Relation,
        ValueTagStore,
    },
    symbolic::{LiteralPolicy, SymbolicManager},
    Error, Result,
};

fn tracking(policy: LiteralPolicy) -> (SymbolicManager, Dispatcher) {
    let tags = Arc::new(ValueTagStore::new());
    let manager = SymbolicManager::builder()
        .tags(tags.clone())
        .policy(policy)
        .build();
    let dispatcher = Dispatcher::new(Some(tags), DispatchConfig::default());
    path_condition::reset();
    (manager, dispatcher)
}

#[test]
fn thickness_between_bounds() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::window(-100, 100));
    manager.make_double("thickness", 12.0)?;

    // if (thickness > 10.0 && thickness < 60.0)
    assert_eq!(dispatcher.dcmpl(12.0, 10.0), 1);
    assert_eq!(dispatcher.dcmpg(12.0, 60.0), -1);
    assert_eq!(path_condition::size(), 2);

    let constraints = manager.path_condition();
    assert_eq!(constraints[0].operation, Operation::Dcmpl);
    assert_eq!(
        constraints[0].to_expression_string(),
        "dcmpl(thickness[12], 10) == 1"
    );

    let formula = manager.path_condition_expression().expect("two atoms");
    assert_eq!(
        formula.to_string(),
        "((thickness > 10) && (thickness < 60))"
    );
    assert_eq!(manager.thresholds(), vec![10.0, 60.0]);

    let solution = manager
        .solve_current_path_condition()
        .expect("satisfiable");
    assert_eq!(solution.len(), 1);
    let thickness = solution["thickness"].as_f64();
    assert!(thickness > 10.0 && thickness < 60.0);
    Ok(())
}

#[test]
fn unlabeled_comparisons_are_not_recorded() {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());

    assert_eq!(dispatcher.dcmpl(12.0, 60.0), -1);
    assert!(dispatcher.icmp_jump(3, 3, Relation::Eq));
    assert_eq!(path_condition::size(), 0);
    assert!(manager.path_condition_expression().is_none());
    assert!(manager.solve_current_path_condition().is_none());
}

#[test]
fn untracked_dispatcher_computes_without_recording() -> Result<()> {
    let tags = Arc::new(ValueTagStore::new());
    let manager = SymbolicManager::builder().tags(tags.clone()).build();
    let dispatcher = Dispatcher::new(Some(tags), DispatchConfig::disabled());
    path_condition::reset();

    manager.make_long("offset", 7)?;
    assert_eq!(dispatcher.lcmp(7, 9), -1);
    assert_eq!(path_condition::size(), 0);
    Ok(())
}

#[test]
fn literal_window_decides_constants() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());
    manager.make_double("x", 1.5)?;

    dispatcher.dcmpl(1.5, 5.0);
    dispatcher.dcmpl(1.5, 137.4);
    dispatcher.dcmpl(1.5, -20.0);

    let atoms: Vec<String> = manager
        .path_condition_atoms()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        atoms,
        vec!["(x < 5)", "(x < lit_137_4)", "(x > lit_m20)"]
    );
    assert_eq!(manager.thresholds(), vec![5.0]);
    Ok(())
}

#[test]
fn branch_not_taken_records_complement() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::window(-100, 100));
    manager.make_int("n", 3)?;

    // if (n > 10) falls through
    assert!(!dispatcher.icmp_jump(3, 10, Relation::Gt));

    let constraints = manager.path_condition();
    assert_eq!(constraints.len(), 1);
    assert!(!constraints[0].taken());
    assert_eq!(constraints[0].to_expression_string(), "!(n[3] > 10)");

    let formula = manager.path_condition_expression().expect("one atom");
    assert_eq!(formula.to_string(), "(n <= 10)");

    let solution = manager.solve_current_path_condition().expect("satisfiable");
    assert!(solution["n"].as_f64() <= 10.0);
    Ok(())
}

#[test]
fn labels_are_unique_until_reset() -> Result<()> {
    let (manager, _) = tracking(LiteralPolicy::default());

    manager.make_int("x", 1)?;
    assert!(matches!(
        manager.make_long("x", 2),
        Err(Error::DuplicateLabel(label)) if label == "x"
    ));
    assert!(matches!(
        manager.make_int("", 2),
        Err(Error::InvalidLabel(_))
    ));
    assert_eq!(manager.symbolic_values(), 1);

    manager.reset();
    assert_eq!(manager.symbolic_values(), 0);
    manager.make_long("x", 2)?;
    assert_eq!(manager.symbolic("x").map(|s| s.label), Some("x".to_string()));
    Ok(())
}

#[test]
fn nan_operands_never_reach_formulas() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());
    manager.make_double("d", 2.0)?;

    assert_eq!(dispatcher.dcmpl(2.0, f64::NAN), -1);
    assert_eq!(dispatcher.dcmpg(2.0, f64::NAN), 1);

    assert_eq!(path_condition::size(), 2);
    assert!(manager.path_condition_atoms().is_empty());
    assert!(manager.path_condition_expression().is_none());
    Ok(())
}

#[test]
fn flushing_empties_the_path_condition() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());
    manager.make_int("i", 4)?;

    dispatcher.icmp_jump(4, 0, Relation::Ge);
    dispatcher.icmp_jump(4, 8, Relation::Lt);

    let flushed = manager.flush_path_condition();
    assert_eq!(flushed.len(), 2);
    assert!(flushed[0].timestamp <= flushed[1].timestamp);
    assert!(manager.path_condition().is_empty());
    assert!(path_condition::is_empty());
    Ok(())
}

#[test]
fn threads_keep_separate_path_conditions() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());
    manager.make_int("shared", 42)?;

    dispatcher.icmp_jump(42, 0, Relation::Ne);

    let recorded_elsewhere = thread::scope(|scope| {
        scope
            .spawn(|| {
                dispatcher.icmp_jump(42, 1, Relation::Eq);
                dispatcher.icmp_jump(42, 2, Relation::Eq);
                path_condition::size()
            })
            .join()
            .expect("worker thread")
    });

    assert_eq!(recorded_elsewhere, 2);
    assert_eq!(path_condition::size(), 1);
    Ok(())
}

fn replay(manager: &SymbolicManager, dispatcher: &Dispatcher) -> Result<Vec<Constraint>> {
    manager.make_int("count", 7)?;
    manager.make_double("ratio", 0.25)?;
    manager.make_reference("handle", ObjectId(3))?;

    assert!(dispatcher.icmp_jump(7, 5, Relation::Gt));
    assert!(!dispatcher.icmp_jump(7, 9, Relation::Ge));
    assert!(dispatcher.icmp_jump(1, 2, Relation::Lt));
    assert_eq!(dispatcher.dcmpl(0.25, 1.0), -1);
    assert!(dispatcher.acmp_jump(Some(ObjectId(3)), None, Relation::AcmpNe));
    Ok(path_condition::drain())
}

#[test]
fn replay_after_reset_records_equal_constraints() -> Result<()> {
    let (manager, dispatcher) = tracking(LiteralPolicy::default());

    let first = replay(&manager, &dispatcher)?;
    manager.reset();
    let second = replay(&manager, &dispatcher)?;

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    let operations: Vec<_> = second.iter().map(|c| c.operation).collect();
    assert_eq!(
        operations,
        vec![
            Operation::Gt,
            Operation::Ge,
            Operation::Dcmpl,
            Operation::AcmpNe
        ]
    );
    Ok(())
}

#[test]
fn long_loops_stay_solvable() -> Result<()> {
    const ITERATIONS: usize = 200_000;
    let (manager, dispatcher) = tracking(LiteralPolicy::window(0, 1_000_000));
    manager.make_int("i", 5)?;

    // for (...) { if (i < 1_000_000) ... }
    for _ in 0..ITERATIONS {
        assert!(dispatcher.icmp_jump(5, 1_000_000, Relation::Lt));
    }
    assert_eq!(path_condition::size(), ITERATIONS);

    let thresholds = manager.thresholds();
    assert_eq!(thresholds.len(), ITERATIONS);
    assert!(thresholds.iter().all(|&t| t == 1_000_000.0));

    let formula = manager.path_condition_expression().expect("atoms");
    assert_eq!(formula.atoms().len(), ITERATIONS);
    drop(formula);

    let solution = manager.solve_current_path_condition().expect("satisfiable");
    assert!(solution["i"].as_f64() < 1_000_000.0);
    Ok(())
}
