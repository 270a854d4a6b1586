//! Ephemeral per-run directory holding one test file, one implementation file,
//! and the language manifest.
//!
//! Backed by [`TempDir`], so the directory is removed on every exit path.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::Context;
use tempfile::TempDir;
use tracing::{debug, info, instrument};

use crate::cancel::CancelToken;
use crate::core::language::Language;
use crate::error::{AiterateError, Result};
use crate::io::process::{describe_command, launch_error, run_command_with_timeout};

#[derive(Debug, Clone, Copy)]
pub struct WorkspaceOptions {
    /// Deadline for each setup command.
    pub setup_timeout: Duration,
    pub output_limit_bytes: usize,
    /// Run the language's setup commands (e.g. `pip install`) after seeding manifests.
    pub run_setup: bool,
}

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    language: Language,
}

impl Workspace {
    /// Create a fresh directory, write the language manifest, and run setup commands.
    #[instrument(skip_all, fields(language = %language))]
    pub fn create(
        language: Language,
        options: WorkspaceOptions,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("aiterate-")
            .tempdir()
            .context("create workspace directory")
            .map_err(AiterateError::workspace)?;
        let workspace = Self { dir, language };

        for (name, contents) in language.spec().manifest_files {
            let path = workspace.path().join(name);
            fs::write(&path, contents)
                .with_context(|| format!("write {}", path.display()))
                .map_err(AiterateError::workspace)?;
        }

        if options.run_setup {
            for argv in language.spec().setup_commands {
                cancel.check()?;
                workspace.run_setup(argv, options, cancel)?;
            }
        }

        info!(path = %workspace.path().display(), "workspace ready");
        Ok(workspace)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn test_path(&self) -> PathBuf {
        self.path().join(self.language.test_file_name())
    }

    pub fn impl_path(&self) -> PathBuf {
        self.path().join(self.language.impl_file_name())
    }

    /// Overwrite the canonical test and implementation files.
    pub fn write_sources(&self, tests: &str, code: &str) -> Result<()> {
        write_file(&self.test_path(), tests)?;
        write_file(&self.impl_path(), code)?;
        debug!(
            test_bytes = tests.len(),
            code_bytes = code.len(),
            "sources written"
        );
        Ok(())
    }

    /// Copy the current test and implementation files into `dest`, creating it if needed.
    ///
    /// Existing files with the canonical names are overwritten.
    pub fn copy_sources_to(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)
            .with_context(|| format!("create output directory {}", dest.display()))
            .map_err(AiterateError::workspace)?;
        for src in [self.test_path(), self.impl_path()] {
            let Some(name) = src.file_name() else {
                continue;
            };
            let target = dest.join(name);
            fs::copy(&src, &target)
                .with_context(|| format!("copy {} to {}", src.display(), target.display()))
                .map_err(AiterateError::workspace)?;
        }
        info!(dest = %dest.display(), "sources copied out");
        Ok(())
    }

    /// Remove the directory now, reporting failures instead of ignoring them on drop.
    pub fn close(self) -> Result<()> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("remove workspace {}", path.display()))
            .map_err(AiterateError::workspace)
    }

    fn run_setup(
        &self,
        argv: &[&str],
        options: WorkspaceOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        let Some((program, args)) = argv.split_first() else {
            return Ok(());
        };
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(self.path());
        let described = describe_command(&cmd);

        let output = run_command_with_timeout(
            cmd,
            options.setup_timeout,
            options.output_limit_bytes,
            cancel,
        )
        .map_err(|err| launch_error(&described, &err))?;

        if output.cancelled {
            return Err(AiterateError::Cancelled);
        }
        if output.timed_out {
            return Err(AiterateError::Workspace(format!(
                "`{described}` timed out after {}s",
                options.setup_timeout.as_secs()
            )));
        }
        if !output.success() {
            return Err(AiterateError::Workspace(format!(
                "`{described}` exited with {}:\n{}",
                output.status,
                output.combined()
            )));
        }
        Ok(())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .with_context(|| format!("write {}", path.display()))
        .map_err(AiterateError::workspace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> WorkspaceOptions {
        WorkspaceOptions {
            setup_timeout: Duration::from_secs(10),
            output_limit_bytes: 10_000,
            run_setup: false,
        }
    }

    #[test]
    fn go_workspace_is_seeded_with_module_file() {
        let workspace =
            Workspace::create(Language::Go, options(), &CancelToken::new()).expect("create");
        let go_mod = fs::read_to_string(workspace.path().join("go.mod")).expect("go.mod");
        assert!(go_mod.starts_with("module "));
        assert!(workspace.test_path().ends_with("main_test.go"));
        assert!(workspace.impl_path().ends_with("main.go"));
    }

    #[test]
    fn python_workspace_seeds_requirements_without_setup() {
        let workspace =
            Workspace::create(Language::Python, options(), &CancelToken::new()).expect("create");
        let requirements =
            fs::read_to_string(workspace.path().join("requirements.txt")).expect("requirements");
        assert!(requirements.contains("pytest"));
        assert!(workspace.test_path().ends_with("main_test.py"));
    }

    #[test]
    fn write_then_copy_overwrites_destination() {
        let workspace =
            Workspace::create(Language::Go, options(), &CancelToken::new()).expect("create");
        let out = tempfile::tempdir().expect("tempdir");
        let dest = out.path().join("add-two-ints");
        fs::create_dir_all(&dest).expect("mkdir");
        fs::write(dest.join("main.go"), "stale").expect("seed");

        workspace
            .write_sources("package main // tests", "package main // impl")
            .expect("write");
        workspace.copy_sources_to(&dest).expect("copy");

        assert_eq!(
            fs::read_to_string(dest.join("main_test.go")).expect("tests"),
            "package main // tests"
        );
        assert_eq!(
            fs::read_to_string(dest.join("main.go")).expect("impl"),
            "package main // impl"
        );
    }

    #[test]
    fn close_removes_directory() {
        let workspace =
            Workspace::create(Language::Go, options(), &CancelToken::new()).expect("create");
        let path = workspace.path().to_path_buf();
        workspace.close().expect("close");
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory() {
        let path = {
            let workspace =
                Workspace::create(Language::Go, options(), &CancelToken::new()).expect("create");
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
