//! Orchestration for `aiterate new`.
//!
//! A run creates a session, prepares a workspace, picks an output directory name,
//! drives the loop, and copies the final test and implementation files out. The
//! workspace is released on every path.

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::core::language::Language;
use crate::error::{AiterateError, Result};
use crate::io::completion::CompletionService;
use crate::io::config::AiterateConfig;
use crate::io::dependencies::DependencyUpdater;
use crate::io::test_runner::TestExecutor;
use crate::io::workspace::{Workspace, WorkspaceOptions};
use crate::iterate::{Collaborators, LoopEvent, LoopOutcome, run_loop};

/// Knobs for one `new` run, usually derived from [`AiterateConfig`].
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_iterations: u32,
    /// Parent of the generated output directory.
    pub output_root: PathBuf,
    pub workspace: WorkspaceOptions,
}

impl RunSettings {
    pub fn from_config(cfg: &AiterateConfig) -> Self {
        Self {
            max_iterations: cfg.max_iterations,
            output_root: cfg.output_root.clone(),
            workspace: WorkspaceOptions {
                setup_timeout: cfg.setup_timeout(),
                output_limit_bytes: cfg.output_limit_bytes,
                run_setup: true,
            },
        }
    }
}

/// Outcome of `aiterate new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub session_id: String,
    /// Directory holding the final `main_test.<ext>` and `main.<ext>`.
    pub output_dir: PathBuf,
    pub outcome: LoopOutcome,
}

/// Events surfaced to the caller in addition to loop progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    SessionCreated { id: String },
    OutputDirectory { path: PathBuf },
    Loop(LoopEvent),
}

/// Run one full session for `description` in `language`.
#[instrument(skip_all, fields(language = %language))]
pub fn run_new<C, E, D, F>(
    description: &str,
    language: Language,
    settings: &RunSettings,
    collab: &Collaborators<'_, C, E, D>,
    cancel: &CancelToken,
    mut on_event: F,
) -> Result<RunReport>
where
    C: CompletionService,
    E: TestExecutor,
    D: DependencyUpdater,
    F: FnMut(&RunEvent),
{
    let description = description.trim();
    if description.is_empty() {
        return Err(AiterateError::Configuration(
            "description is required".to_string(),
        ));
    }

    let session = collab.store.create_session(description, language)?;
    info!(id = %session.id, "session created");
    on_event(&RunEvent::SessionCreated {
        id: session.id.clone(),
    });

    let workspace = Workspace::create(language, settings.workspace, cancel)?;
    debug!(workspace = %workspace.path().display(), "workspace created");

    let slug = collab.generator.directory_name(description, cancel)?;
    let output_dir = settings.output_root.join(&slug);
    on_event(&RunEvent::OutputDirectory {
        path: output_dir.clone(),
    });

    let outcome = run_loop(
        collab,
        &session,
        &workspace,
        settings.max_iterations,
        cancel,
        |event| on_event(&RunEvent::Loop(event.clone())),
    )?;

    workspace.copy_sources_to(&output_dir)?;
    workspace.close()?;

    info!(
        id = %session.id,
        output = %output_dir.display(),
        passed = outcome.stop.passed(),
        "run finished"
    );
    Ok(RunReport {
        session_id: session.id,
        output_dir,
        outcome,
    })
}
