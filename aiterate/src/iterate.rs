//! Generate → write → run → record → repair controller.
//!
//! One pass per test run. A pass that fails is followed by a joint repair unless it
//! was the last allowed pass, so the workspace always holds the sources of the last
//! recorded iteration when the loop returns.

use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::core::session::Session;
use crate::error::{AiterateError, Result};
use crate::generator::Generator;
use crate::io::completion::CompletionService;
use crate::io::dependencies::DependencyUpdater;
use crate::io::session_store::SessionStore;
use crate::io::test_runner::TestExecutor;
use crate::io::workspace::Workspace;

/// Progress notifications emitted as the controller changes phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    GeneratingTests,
    GeneratingImplementation,
    Running { iteration: u32, max_iterations: u32 },
    Recorded { iteration: u32, success: bool, output: String },
    Repairing { iteration: u32 },
}

/// Reason why [`run_loop`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// Tests passed on this iteration.
    Passed { iteration: u32 },
    /// Every allowed iteration ran and failed.
    Exhausted { iterations: u32 },
}

impl LoopStop {
    pub fn passed(self) -> bool {
        matches!(self, LoopStop::Passed { .. })
    }
}

/// Summary of a finished loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub stop: LoopStop,
    /// Sources of the last recorded iteration.
    pub tests: String,
    pub code: String,
    /// Output of the last test run.
    pub last_output: String,
}

/// Injected collaborators for one run.
pub struct Collaborators<'a, C, E, D> {
    pub generator: &'a Generator<C>,
    pub executor: &'a E,
    pub dependencies: &'a D,
    pub store: &'a SessionStore,
}

/// Drive `session` to `Passed` or `Exhausted` within `max_iterations` test runs.
///
/// Test failures drive repair and are never errors. Any collaborator error aborts the
/// loop; iterations recorded before it stay persisted.
#[instrument(skip_all, fields(session = %session.id, language = %session.language, max_iterations = max_iterations))]
pub fn run_loop<C, E, D, F>(
    collab: &Collaborators<'_, C, E, D>,
    session: &Session,
    workspace: &Workspace,
    max_iterations: u32,
    cancel: &CancelToken,
    mut on_event: F,
) -> Result<LoopOutcome>
where
    C: CompletionService,
    E: TestExecutor,
    D: DependencyUpdater,
    F: FnMut(&LoopEvent),
{
    if max_iterations == 0 {
        return Err(AiterateError::Configuration(
            "max_iterations must be > 0".to_string(),
        ));
    }
    let language = session.language;

    cancel.check()?;
    on_event(&LoopEvent::GeneratingTests);
    let mut tests = collab
        .generator
        .generate_tests(&session.description, language, cancel)?;

    cancel.check()?;
    on_event(&LoopEvent::GeneratingImplementation);
    let mut code = collab
        .generator
        .generate_implementation(&session.description, &tests, language, cancel)?;

    let mut iteration = 0;
    loop {
        iteration += 1;
        cancel.check()?;
        workspace.write_sources(&tests, &code)?;
        collab
            .dependencies
            .update(workspace.path(), language, &code, &tests, cancel)?;

        cancel.check()?;
        on_event(&LoopEvent::Running {
            iteration,
            max_iterations,
        });
        let result = collab
            .executor
            .run_tests(workspace.path(), language, cancel)?;

        let recorded = collab.store.add_iteration(
            &session.id,
            &tests,
            &code,
            &result.output,
            result.success,
        )?;
        on_event(&LoopEvent::Recorded {
            iteration: recorded.number,
            success: result.success,
            output: result.output.clone(),
        });

        if result.success {
            info!(iteration, "tests passed");
            return Ok(LoopOutcome {
                stop: LoopStop::Passed { iteration },
                tests,
                code,
                last_output: result.output,
            });
        }

        if iteration >= max_iterations {
            warn!(iterations = max_iterations, "iteration budget exhausted");
            return Ok(LoopOutcome {
                stop: LoopStop::Exhausted {
                    iterations: max_iterations,
                },
                tests,
                code,
                last_output: result.output,
            });
        }

        cancel.check()?;
        on_event(&LoopEvent::Repairing { iteration });
        let repaired = collab
            .generator
            .repair(&code, &tests, &result.output, language, cancel)?;
        code = repaired.code;
        tests = repaired.tests;
    }
}
