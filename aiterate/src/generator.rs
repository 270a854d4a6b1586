//! Turns descriptions and failing runs into clean source text via the completion service.

use tracing::{debug, instrument, warn};

use crate::cancel::CancelToken;
use crate::core::fence::strip_code_fence;
use crate::core::language::Language;
use crate::core::repair::{RepairedSources, parse_repair_response};
use crate::core::slug::{DEFAULT_DIRECTORY_NAME, sanitize_slug};
use crate::error::{AiterateError, Result};
use crate::io::completion::CompletionService;
use crate::io::prompt::PromptEngine;

pub struct Generator<C> {
    completion: C,
    prompts: PromptEngine,
}

impl<C: CompletionService> Generator<C> {
    pub fn new(completion: C) -> Self {
        Self {
            completion,
            prompts: PromptEngine::new(),
        }
    }

    /// Test-only source covering normal, boundary, and error cases.
    #[instrument(skip_all, fields(language = %language))]
    pub fn generate_tests(
        &self,
        description: &str,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<String> {
        let prompt = self.prompts.render_tests(description, language)?;
        self.complete_source(&prompt, "tests", cancel)
    }

    /// Implementation source conditioned on the generated tests.
    #[instrument(skip_all, fields(language = %language))]
    pub fn generate_implementation(
        &self,
        description: &str,
        tests: &str,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<String> {
        let prompt = self
            .prompts
            .render_implementation(description, tests, language)?;
        self.complete_source(&prompt, "implementation", cancel)
    }

    /// Repair the implementation alone, keeping the tests fixed.
    #[instrument(skip_all, fields(language = %language))]
    pub fn fix_implementation(
        &self,
        code: &str,
        tests: &str,
        output: &str,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<String> {
        let prompt = self
            .prompts
            .render_fix_implementation(code, tests, output, language)?;
        self.complete_source(&prompt, "implementation", cancel)
    }

    /// Repair implementation and tests together from one failing run.
    #[instrument(skip_all, fields(language = %language))]
    pub fn repair(
        &self,
        code: &str,
        tests: &str,
        output: &str,
        language: Language,
        cancel: &CancelToken,
    ) -> Result<RepairedSources> {
        let prompt = self.prompts.render_repair(code, tests, output, language)?;
        let response = self.completion.complete(&prompt, cancel)?;
        let repaired = parse_repair_response(&response)?;
        debug!(
            code_bytes = repaired.code.len(),
            test_bytes = repaired.tests.len(),
            "repair parsed"
        );
        Ok(repaired)
    }

    /// Output directory name for `description`.
    ///
    /// Never fails except on cancellation: any other problem yields
    /// [`DEFAULT_DIRECTORY_NAME`].
    #[instrument(skip_all)]
    pub fn directory_name(&self, description: &str, cancel: &CancelToken) -> Result<String> {
        let attempt = self
            .prompts
            .render_directory_name(description)
            .and_then(|prompt| self.completion.complete(&prompt, cancel));
        match attempt {
            Ok(raw) => match sanitize_slug(&raw) {
                Some(slug) => Ok(slug),
                None => {
                    warn!(raw = %raw.trim(), "unusable directory name, using default");
                    Ok(DEFAULT_DIRECTORY_NAME.to_string())
                }
            },
            Err(AiterateError::Cancelled) => Err(AiterateError::Cancelled),
            Err(err) => {
                warn!(err = %err, "directory name generation failed, using default");
                Ok(DEFAULT_DIRECTORY_NAME.to_string())
            }
        }
    }

    fn complete_source(
        &self,
        prompt: &str,
        what: &'static str,
        cancel: &CancelToken,
    ) -> Result<String> {
        let response = self.completion.complete(prompt, cancel)?;
        let source = strip_code_fence(&response);
        if source.is_empty() {
            return Err(AiterateError::EmptyGeneration(what));
        }
        debug!(bytes = source.len(), what, "source generated");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedCompletion;

    #[test]
    fn generated_sources_are_fence_stripped() {
        let completion = ScriptedCompletion::new(["```go\npackage main\n\nfunc Add() {}\n```"]);
        let generator = Generator::new(&completion);
        let code = generator
            .generate_implementation("add", "tests", Language::Go, &CancelToken::new())
            .expect("code");
        assert_eq!(code, "package main\n\nfunc Add() {}");
        assert!(completion.prompts()[0].contains("Given these Go tests:\ntests"));
    }

    #[test]
    fn fence_only_reply_is_an_empty_generation() {
        let completion = ScriptedCompletion::new(["```python"]);
        let generator = Generator::new(&completion);
        let err = generator
            .generate_tests("add", Language::Python, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, AiterateError::EmptyGeneration("tests")));
    }

    #[test]
    fn repair_returns_both_sections() {
        let completion = ScriptedCompletion::new([
            "---IMPLEMENTATION---\n```go\npackage main // fixed\n```\n---TESTS---\npackage main // tests\n---END---",
        ]);
        let generator = Generator::new(&completion);
        let repaired = generator
            .repair("old", "old tests", "FAIL", Language::Go, &CancelToken::new())
            .expect("repair");
        assert_eq!(repaired.code, "package main // fixed");
        assert_eq!(repaired.tests, "package main // tests");
    }

    #[test]
    fn directory_name_is_sanitized() {
        let completion = ScriptedCompletion::new(["  Reverse_String!! "]);
        let generator = Generator::new(&completion);
        let name = generator
            .directory_name("reverse a string", &CancelToken::new())
            .expect("name");
        assert_eq!(name, "reverse-string");
    }

    #[test]
    fn directory_name_falls_back_on_service_error_or_garbage() {
        let failing = ScriptedCompletion::failing("boom");
        let name = Generator::new(&failing)
            .directory_name("x", &CancelToken::new())
            .expect("fallback");
        assert_eq!(name, DEFAULT_DIRECTORY_NAME);

        let garbage = ScriptedCompletion::new(["!!!"]);
        let name = Generator::new(&garbage)
            .directory_name("x", &CancelToken::new())
            .expect("fallback");
        assert_eq!(name, DEFAULT_DIRECTORY_NAME);
    }

    #[test]
    fn directory_name_propagates_cancellation() {
        let completion = ScriptedCompletion::new(["never-used"]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Generator::new(&completion)
            .directory_name("x", &cancel)
            .unwrap_err();
        assert!(matches!(err, AiterateError::Cancelled));
    }
}
