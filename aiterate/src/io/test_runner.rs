//! Runs the language test tool inside a workspace.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::cancel::CancelToken;
use crate::core::language::Language;
use crate::core::types::TestResult;
use crate::error::{AiterateError, Result};
use crate::io::process::{
    CommandOutput, describe_command, launch_error, run_command_with_timeout,
};

/// Executes the generated tests and classifies the outcome.
///
/// A failing test run is `Ok(TestResult { success: false, .. })`, never an error.
pub trait TestExecutor {
    fn run_tests(
        &self,
        workspace: &Path,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<TestResult>;
}

impl<T: TestExecutor + ?Sized> TestExecutor for &T {
    fn run_tests(
        &self,
        workspace: &Path,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<TestResult> {
        (**self).run_tests(workspace, language, cancel)
    }
}

/// Invokes the real toolchain (`go test`, `pytest`).
#[derive(Debug, Clone)]
pub struct ToolchainExecutor {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl TestExecutor for ToolchainExecutor {
    #[instrument(skip_all, fields(language = %language, workspace = %workspace.display()))]
    fn run_tests(
        &self,
        workspace: &Path,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<TestResult> {
        let Some((program, args)) = language.spec().test_command.split_first() else {
            return Err(AiterateError::Configuration(format!(
                "no test command for {language}"
            )));
        };
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(workspace);
        let described = describe_command(&cmd);

        let output = run_command_with_timeout(
            cmd,
            self.timeout,
            self.output_limit_bytes,
            cancel,
        )
        .map_err(|err| launch_error(&described, &err))?;
        classify_run(&output, self.timeout)
    }
}

/// Turn a finished test process into a [`TestResult`].
///
/// A timed-out run is a failed result whose output ends with a notice; a cancelled one is
/// [`AiterateError::Cancelled`].
fn classify_run(output: &CommandOutput, timeout: Duration) -> Result<TestResult> {
    if output.cancelled {
        return Err(AiterateError::Cancelled);
    }

    let mut combined = output.combined();
    if output.timed_out {
        warn!(timeout_secs = timeout.as_secs(), "test run timed out");
        combined.push_str(&format!(
            "\n[test run timed out after {timeout:?} and was killed]\n"
        ));
        return Ok(TestResult::failed(combined));
    }

    let success = output.success();
    info!(success, exit_code = ?output.status.code(), "test run finished");
    Ok(TestResult { success, output: combined })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn executor() -> ToolchainExecutor {
        ToolchainExecutor {
            timeout: Duration::from_secs(30),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn missing_toolchain_is_a_launch_error_not_a_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        // A workspace path that does not exist makes spawning fail regardless of PATH.
        let missing = temp.path().join("gone");
        let err = executor()
            .run_tests(&missing, Language::Go, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, AiterateError::ExecutionLaunch { ref command, .. }
            if command.starts_with("go test")));
    }

    fn sh(script: &str, timeout: Duration, cancel: &CancelToken) -> CommandOutput {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        run_command_with_timeout(cmd, timeout, 10_000, cancel).expect("run")
    }

    #[test]
    fn timed_out_run_is_a_failure_with_a_notice() {
        let timeout = Duration::from_millis(200);
        let output = sh("echo started; sleep 5", timeout, &CancelToken::new());

        let result = classify_run(&output, timeout).expect("classified");
        assert!(!result.success);
        assert!(result.output.starts_with("started\n"));
        assert!(result.output.contains("[test run timed out after 200ms and was killed]"));
    }

    #[test]
    fn cancelled_run_is_an_error() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let output = sh("sleep 5", Duration::from_secs(30), &cancel);
        assert!(matches!(
            classify_run(&output, Duration::from_secs(30)),
            Err(AiterateError::Cancelled)
        ));
    }

    #[test]
    fn exit_status_decides_success() {
        let timeout = Duration::from_secs(30);
        let passed = classify_run(&sh("echo ok", timeout, &CancelToken::new()), timeout)
            .expect("classified");
        assert!(passed.success);
        assert_eq!(passed.output, "ok\n");

        let failed = classify_run(&sh("echo FAIL; exit 1", timeout, &CancelToken::new()), timeout)
            .expect("classified");
        assert!(!failed.success);
    }
}
