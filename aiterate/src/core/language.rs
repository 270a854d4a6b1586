//! Supported target languages and their toolchain capabilities.
//!
//! Every language-specific decision (file names, test command, manifest seeding,
//! dependency scanning) is read from [`LanguageSpec`] instead of branching on tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AiterateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    Python,
}

/// Static capability table entry for a [`Language`].
#[derive(Debug)]
pub struct LanguageSpec {
    /// Lowercase tag used on the CLI and in session records.
    pub tag: &'static str,
    /// Human-readable name used in prompts.
    pub display_name: &'static str,
    /// Source file extension without the dot.
    pub extension: &'static str,
    /// Test invocation, run from the workspace root.
    pub test_command: &'static [&'static str],
    /// Files written into a fresh workspace before anything else.
    pub manifest_files: &'static [(&'static str, &'static str)],
    /// Commands run once after the manifest files are written.
    pub setup_commands: &'static [&'static [&'static str]],
    /// Whether generated imports must be declared in the manifest before testing.
    pub scans_dependencies: bool,
}

const GO_MOD: &str = "module aiterate/workspace\n\ngo 1.21\n";
const PYTHON_REQUIREMENTS: &str = "pytest>=7.0.0\n";

static GO: LanguageSpec = LanguageSpec {
    tag: "go",
    display_name: "Go",
    extension: "go",
    test_command: &["go", "test", "-v", "./..."],
    manifest_files: &[("go.mod", GO_MOD)],
    setup_commands: &[],
    scans_dependencies: true,
};

static PYTHON: LanguageSpec = LanguageSpec {
    tag: "python",
    display_name: "Python",
    extension: "py",
    test_command: &["python", "-m", "pytest", "main_test.py", "-v"],
    manifest_files: &[("requirements.txt", PYTHON_REQUIREMENTS)],
    setup_commands: &[&["python", "-m", "pip", "install", "-r", "requirements.txt"]],
    scans_dependencies: false,
};

impl Language {
    pub const ALL: [Language; 2] = [Language::Go, Language::Python];

    pub fn spec(self) -> &'static LanguageSpec {
        match self {
            Language::Go => &GO,
            Language::Python => &PYTHON,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.spec().tag
    }

    pub fn display_name(self) -> &'static str {
        self.spec().display_name
    }

    /// Canonical test file name (`main_test.<ext>`).
    pub fn test_file_name(self) -> String {
        format!("main_test.{}", self.spec().extension)
    }

    /// Canonical implementation file name (`main.<ext>`).
    pub fn impl_file_name(self) -> String {
        format!("main.{}", self.spec().extension)
    }

    /// Comma-separated list of supported tags, for error and help text.
    pub fn supported_tags() -> String {
        Self::ALL
            .iter()
            .map(|lang| lang.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AiterateError;

    /// Case-insensitive, whitespace-tolerant parse of a language tag.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == tag)
            .ok_or(AiterateError::UnsupportedLanguage(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!("go".parse::<Language>().unwrap(), Language::Go);
        assert_eq!("  Python \n".parse::<Language>().unwrap(), Language::Python);
    }

    #[test]
    fn rejects_unknown_tags() {
        let err = "rust".parse::<Language>().unwrap_err();
        assert!(matches!(err, AiterateError::UnsupportedLanguage(ref tag) if tag == "rust"));
        assert!(err.to_string().contains("supported: go, python"));
    }

    #[test]
    fn canonical_file_names_follow_extension() {
        assert_eq!(Language::Go.test_file_name(), "main_test.go");
        assert_eq!(Language::Go.impl_file_name(), "main.go");
        assert_eq!(Language::Python.test_file_name(), "main_test.py");
        assert_eq!(Language::Python.impl_file_name(), "main.py");
    }

    #[test]
    fn python_test_command_targets_canonical_test_file() {
        let spec = Language::Python.spec();
        assert!(
            spec.test_command
                .contains(&Language::Python.test_file_name().as_str())
        );
    }

    #[test]
    fn only_go_scans_dependencies() {
        assert!(Language::Go.spec().scans_dependencies);
        assert!(!Language::Python.spec().scans_dependencies);
    }

    #[test]
    fn serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&Language::Python).unwrap();
        assert_eq!(json, "\"python\"");
    }
}
