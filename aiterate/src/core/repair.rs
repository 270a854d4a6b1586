//! Strict parsing of joint repair responses.
//!
//! The repair prompt asks for:
//!
//! ```text
//! ---IMPLEMENTATION---
//! <implementation source>
//! ---TESTS---
//! <test source>
//! ---END---
//! ```
//!
//! Each section runs until the next marker (or end of text) and is passed through
//! [`strip_code_fence`].

use std::sync::LazyLock;

use regex::Regex;

use crate::core::fence::strip_code_fence;
use crate::error::{AiterateError, Result};

pub const IMPLEMENTATION_MARKER: &str = "---IMPLEMENTATION---";
pub const TESTS_MARKER: &str = "---TESTS---";
pub const END_MARKER: &str = "---END---";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"---\s*(IMPLEMENTATION|TESTS|END)\s*---").expect("marker regex is valid")
});

/// Implementation and test source extracted from one repair response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedSources {
    pub code: String,
    pub tests: String,
}

/// Parse a joint repair response into both sources.
///
/// Fails with [`AiterateError::MalformedRepairResponse`] when either section is
/// absent or empty after cleaning. The first occurrence of each marker wins.
pub fn parse_repair_response(response: &str) -> Result<RepairedSources> {
    let markers: Vec<(&str, usize, usize)> = MARKER_RE
        .captures_iter(response)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?.as_str();
            Some((name, whole.start(), whole.end()))
        })
        .collect();

    let code = section_body(response, &markers, "IMPLEMENTATION").ok_or(
        AiterateError::MalformedRepairResponse {
            missing: "implementation",
        },
    )?;
    let tests = section_body(response, &markers, "TESTS")
        .ok_or(AiterateError::MalformedRepairResponse { missing: "tests" })?;

    Ok(RepairedSources { code, tests })
}

fn section_body(response: &str, markers: &[(&str, usize, usize)], name: &str) -> Option<String> {
    let idx = markers.iter().position(|(marker, _, _)| *marker == name)?;
    let start = markers[idx].2;
    let end = markers
        .get(idx + 1)
        .map(|(_, next_start, _)| *next_start)
        .unwrap_or(response.len());
    let body = strip_code_fence(&response[start..end]);
    (!body.is_empty()).then_some(body)
}
