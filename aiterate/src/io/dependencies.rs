//! Reconciles the workspace manifest with the packages generated code imports.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::core::imports::external_go_packages;
use crate::core::language::Language;
use crate::error::{AiterateError, Result};
use crate::io::process::{describe_command, launch_error, run_command_with_timeout};

pub trait DependencyUpdater {
    /// Make every package imported by `code` or `tests` resolvable in `workspace`.
    fn update(
        &self,
        workspace: &Path,
        language: Language,
        code: &str,
        tests: &str,
        cancel: &CancelToken,
    ) -> Result<()>;
}

impl<T: DependencyUpdater + ?Sized> DependencyUpdater for &T {
    fn update(
        &self,
        workspace: &Path,
        language: Language,
        code: &str,
        tests: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        (**self).update(workspace, language, code, tests, cancel)
    }
}

/// `go get` for each external package, then `go mod tidy`.
///
/// Languages whose capability entry does not scan dependencies are left untouched.
#[derive(Debug, Clone)]
pub struct ToolchainDependencyUpdater {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl DependencyUpdater for ToolchainDependencyUpdater {
    #[instrument(skip_all, fields(language = %language))]
    fn update(
        &self,
        workspace: &Path,
        language: Language,
        code: &str,
        tests: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        if !language.spec().scans_dependencies {
            debug!("dependency scanning disabled for language");
            return Ok(());
        }

        let packages = external_go_packages(code, tests);
        info!(count = packages.len(), "resolving external packages");
        for pkg in &packages {
            cancel.check()?;
            self.run_go(workspace, &["get", pkg.as_str()], cancel)?;
        }
        cancel.check()?;
        self.run_go(workspace, &["mod", "tidy"], cancel)
    }
}

impl ToolchainDependencyUpdater {
    fn run_go(&self, workspace: &Path, args: &[&str], cancel: &CancelToken) -> Result<()> {
        let mut cmd = Command::new("go");
        cmd.args(args).current_dir(workspace);
        let described = describe_command(&cmd);

        let output = run_command_with_timeout(
            cmd,
            self.timeout,
            self.output_limit_bytes,
            cancel,
        )
        .map_err(|err| launch_error(&described, &err))?;

        if output.cancelled {
            return Err(AiterateError::Cancelled);
        }
        if output.timed_out {
            return Err(AiterateError::DependencyResolution(format!(
                "`{described}` timed out after {}s",
                self.timeout.as_secs()
            )));
        }
        if !output.success() {
            return Err(AiterateError::DependencyResolution(format!(
                "`{described}` exited with {}:\n{}",
                output.status,
                output.combined()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_scanning_language_runs_nothing() {
        let updater = ToolchainDependencyUpdater {
            timeout: Duration::from_secs(1),
            output_limit_bytes: 1000,
        };
        // The path does not exist, so any spawned command would fail.
        let missing = Path::new("/nonexistent/aiterate-workspace");
        updater
            .update(
                missing,
                Language::Python,
                "import requests",
                "import pytest",
                &CancelToken::new(),
            )
            .expect("python is a no-op");
    }

    #[test]
    fn cancellation_is_checked_before_go_commands() {
        let updater = ToolchainDependencyUpdater {
            timeout: Duration::from_secs(1),
            output_limit_bytes: 1000,
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = updater
            .update(
                Path::new("/nonexistent/aiterate-workspace"),
                Language::Go,
                "package main\nimport \"github.com/google/uuid\"",
                "package main\nimport \"testing\"",
                &cancel,
            )
            .unwrap_err();
        assert!(matches!(err, AiterateError::Cancelled));
    }
}
