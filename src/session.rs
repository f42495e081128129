//! Process-level wiring of the tracking components.

use std::sync::Arc;

use log::info;

use crate::{
    config::Config,
    rewriter::{DispatcherRefs, Rewriter},
    runtime::{dispatch, Dispatcher, ValueTagStore},
    symbolic::{IntervalSolver, SocketSolver, Solver, SymbolicManager},
    Result,
};

/// A running tracking session.
///
/// Starting a session installs the process-wide dispatcher, so at most one session can be
/// started per process. Dropping it closes the solver connection and clears all symbolic
/// state.
///
/// # Example
///
/// ```rust,no_run
/// use pathcond::{rewriter::{DispatcherRefs, DEFAULT_DISPATCHER_OWNER}, Config, Session};
///
/// let refs = DispatcherRefs::from_indices(DEFAULT_DISPATCHER_OWNER, [1, 2, 3, 4, 5, 6, 7]);
/// let session = Session::start(Config::from_env(), refs)?;
///
/// session.manager().make_double("thickness", 12.0)?;
/// println!("{}", session.manager().statistics());
/// # Ok::<(), pathcond::Error>(())
/// ```
pub struct Session {
    manager: SymbolicManager,
    rewriter: Rewriter,
    tags: Arc<ValueTagStore>,
}

impl Session {
    /// Start a session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AlreadyInstalled`] if a dispatcher was installed before.
    pub fn start(config: Config, refs: DispatcherRefs) -> Result<Session> {
        let tags = Arc::new(ValueTagStore::new());
        dispatch::install(Dispatcher::new(Some(tags.clone()), config.dispatch))?;

        let solver: Box<dyn Solver> = if config.solver.enabled {
            info!("using external solver at {}", config.solver.address());
            Box::new(SocketSolver::new(config.solver))
        } else {
            Box::new(IntervalSolver::new())
        };

        let manager = SymbolicManager::builder()
            .tags(tags.clone())
            .solver(solver)
            .policy(config.literals)
            .build();

        Ok(Session {
            manager,
            rewriter: Rewriter::new(refs, config.rewrite),
            tags,
        })
    }

    /// The symbolic value manager.
    #[must_use]
    pub fn manager(&self) -> &SymbolicManager {
        &self.manager
    }

    /// The bytecode rewriter.
    #[must_use]
    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// The tag store consulted by the installed dispatcher.
    #[must_use]
    pub fn tags(&self) -> &Arc<ValueTagStore> {
        &self.tags
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.manager.close();
    }
}
