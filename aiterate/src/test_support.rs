//! Scripted collaborators for driving the controller without network or toolchains.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::core::language::Language;
use crate::core::types::TestResult;
use crate::error::{AiterateError, Result};
use crate::io::completion::CompletionService;
use crate::io::dependencies::DependencyUpdater;
use crate::io::test_runner::TestExecutor;

/// Replies to prompts from a fixed queue and records every prompt it saw.
pub struct ScriptedCompletion {
    replies: RefCell<VecDeque<std::result::Result<String, String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RefCell::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// A service whose first reply is a `Service` error.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: RefCell::new(VecDeque::from([Err(message.to_string())])),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.borrow_mut().push_back(Ok(reply.into()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, prompt: &str, cancel: &CancelToken) -> Result<String> {
        cancel.check()?;
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AiterateError::Service(message)),
            None => Err(AiterateError::Service("scripted replies exhausted".to_string())),
        }
    }
}

/// Sources present in the workspace when a scripted test run happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRun {
    pub tests: String,
    pub code: String,
}

/// Returns queued results and snapshots the workspace sources at each run.
pub struct ScriptedTestExecutor {
    results: RefCell<VecDeque<TestResult>>,
    runs: RefCell<Vec<ObservedRun>>,
    cancel_on_run: Option<CancelToken>,
}

impl ScriptedTestExecutor {
    pub fn new(results: impl IntoIterator<Item = TestResult>) -> Self {
        Self {
            results: RefCell::new(results.into_iter().collect()),
            runs: RefCell::new(Vec::new()),
            cancel_on_run: None,
        }
    }

    /// Trigger `token` during the first run, as an interrupt would.
    pub fn cancelling(token: CancelToken, results: impl IntoIterator<Item = TestResult>) -> Self {
        Self {
            cancel_on_run: Some(token),
            ..Self::new(results)
        }
    }

    pub fn runs(&self) -> Vec<ObservedRun> {
        self.runs.borrow().clone()
    }
}

impl TestExecutor for ScriptedTestExecutor {
    fn run_tests(
        &self,
        workspace: &Path,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<TestResult> {
        let read = |name: String| {
            fs::read_to_string(workspace.join(&name)).map_err(|err| {
                AiterateError::Workspace(format!("read {name}: {err}"))
            })
        };
        self.runs.borrow_mut().push(ObservedRun {
            tests: read(language.test_file_name())?,
            code: read(language.impl_file_name())?,
        });
        if let Some(token) = &self.cancel_on_run {
            token.cancel();
        }
        cancel.check()?;
        self.results
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| AiterateError::Workspace("scripted test results exhausted".to_string()))
    }
}

/// Accepts every update and counts calls.
#[derive(Default)]
pub struct NoopDependencyUpdater {
    calls: Cell<u32>,
}

impl NoopDependencyUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl DependencyUpdater for NoopDependencyUpdater {
    fn update(
        &self,
        _workspace: &Path,
        _language: Language,
        _code: &str,
        _tests: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

/// Rejects every update with a `DependencyResolution` error and counts calls.
pub struct FailingDependencyUpdater {
    message: String,
    calls: Cell<u32>,
}

impl FailingDependencyUpdater {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl DependencyUpdater for FailingDependencyUpdater {
    fn update(
        &self,
        _workspace: &Path,
        _language: Language,
        _code: &str,
        _tests: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        cancel.check()?;
        self.calls.set(self.calls.get() + 1);
        Err(AiterateError::DependencyResolution(self.message.clone()))
    }
}
