//! Prompt rendering for generation and repair requests.

use minijinja::{Environment, context};

use crate::core::language::Language;
use crate::core::repair::{END_MARKER, IMPLEMENTATION_MARKER, TESTS_MARKER};
use crate::core::slug::MAX_SLUG_LEN;
use crate::error::{AiterateError, Result};

const TESTS_TEMPLATE: &str = include_str!("prompts/tests.md");
const IMPLEMENTATION_TEMPLATE: &str = include_str!("prompts/implementation.md");
const FIX_IMPLEMENTATION_TEMPLATE: &str = include_str!("prompts/fix_implementation.md");
const REPAIR_TEMPLATE: &str = include_str!("prompts/repair.md");
const DIRECTORY_NAME_TEMPLATE: &str = include_str!("prompts/directory_name.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("tests", TESTS_TEMPLATE)
            .expect("tests template should be valid");
        env.add_template("implementation", IMPLEMENTATION_TEMPLATE)
            .expect("implementation template should be valid");
        env.add_template("fix_implementation", FIX_IMPLEMENTATION_TEMPLATE)
            .expect("fix_implementation template should be valid");
        env.add_template("repair", REPAIR_TEMPLATE)
            .expect("repair template should be valid");
        env.add_template("directory_name", DIRECTORY_NAME_TEMPLATE)
            .expect("directory_name template should be valid");
        Self { env }
    }

    pub fn render_tests(&self, description: &str, language: Language) -> Result<String> {
        self.render(
            "tests",
            context! {
                language => language.as_str(),
                display_name => language.display_name(),
                description => description.trim(),
            },
        )
    }

    pub fn render_implementation(
        &self,
        description: &str,
        tests: &str,
        language: Language,
    ) -> Result<String> {
        self.render(
            "implementation",
            context! {
                language => language.as_str(),
                display_name => language.display_name(),
                description => description.trim(),
                tests => tests,
            },
        )
    }

    pub fn render_fix_implementation(
        &self,
        code: &str,
        tests: &str,
        output: &str,
        language: Language,
    ) -> Result<String> {
        self.render(
            "fix_implementation",
            context! {
                display_name => language.display_name(),
                code => code,
                tests => tests,
                output => output,
            },
        )
    }

    pub fn render_repair(
        &self,
        code: &str,
        tests: &str,
        output: &str,
        language: Language,
    ) -> Result<String> {
        self.render(
            "repair",
            context! {
                display_name => language.display_name(),
                code => code,
                tests => tests,
                output => output,
                implementation_marker => IMPLEMENTATION_MARKER,
                tests_marker => TESTS_MARKER,
                end_marker => END_MARKER,
            },
        )
    }

    pub fn render_directory_name(&self, description: &str) -> Result<String> {
        self.render(
            "directory_name",
            context! {
                description => description.trim(),
                max_len => MAX_SLUG_LEN,
            },
        )
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|err| AiterateError::Prompt(format!("{name}: {err}")))?;
        template
            .render(ctx)
            .map_err(|err| AiterateError::Prompt(format!("{name}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tests_prompt_carries_language_guidance() {
        let engine = PromptEngine::new();
        let go = engine
            .render_tests("add two integers", Language::Go)
            .expect("render");
        assert!(go.contains("in Go for the following functionality:\nadd two integers"));
        assert!(go.contains("\"testing\" package"));
        assert!(!go.contains("pytest"));

        let py = engine
            .render_tests("add two integers", Language::Python)
            .expect("render");
        assert!(py.contains("Use pytest for testing"));
        assert!(py.contains("Return ONLY the test code"));
    }

    #[test]
    fn every_language_gets_numbered_guidance() {
        let engine = PromptEngine::new();
        for language in Language::ALL {
            let tests = engine.render_tests("noop", language).expect("render");
            assert!(tests.contains("\n1. "), "{language} tests prompt has no guidance");
            let implementation = engine
                .render_implementation("noop", "tests", language)
                .expect("render");
            assert!(
                implementation.contains("\n1. "),
                "{language} implementation prompt has no guidance"
            );
        }
    }

    #[test]
    fn implementation_prompt_embeds_tests() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_implementation("adder", "func TestAdd(t *testing.T) {}", Language::Go)
            .expect("render");
        assert!(prompt.starts_with("Given these Go tests:\nfunc TestAdd(t *testing.T) {}"));
        assert!(prompt.contains("package main"));
    }

    #[test]
    fn repair_prompt_names_every_marker() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_repair("code", "tests", "FAIL", Language::Python)
            .expect("render");
        let impl_at = prompt.find(IMPLEMENTATION_MARKER).expect("impl marker");
        let tests_at = prompt.find(TESTS_MARKER).expect("tests marker");
        let end_at = prompt.find(END_MARKER).expect("end marker");
        assert!(impl_at < tests_at && tests_at < end_at);
        assert!(prompt.contains("Test Output (errors):\nFAIL"));
    }

    #[test]
    fn fix_prompt_includes_failing_output() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_fix_implementation("def f(): pass", "def test_f(): ...", "E assert", Language::Python)
            .expect("render");
        assert!(prompt.starts_with("The following Python code failed some tests:"));
        assert!(prompt.contains("E assert"));
    }

    #[test]
    fn directory_name_prompt_states_length_cap() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_directory_name("reverse a string")
            .expect("render");
        assert!(prompt.contains("\"reverse a string\""));
        assert!(prompt.contains(&format!("under {MAX_SLUG_LEN} characters")));
    }
}
