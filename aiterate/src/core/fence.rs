//! Normalization of model responses into bare source text.

const FENCE: &str = "```";

/// Strip one surrounding fenced-code block from a model response.
///
/// - Input is trimmed first.
/// - If it opens with a fence, the opening line (with any language tag) is dropped,
///   and everything from the last line that is exactly a closing fence is dropped.
/// - A response that is only an opening fence yields an empty string.
/// - Text without a leading fence is returned trimmed and otherwise unchanged.
pub fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();
    if !trimmed.starts_with(FENCE) {
        return trimmed.to_string();
    }

    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() <= 1 {
        return String::new();
    }
    lines.remove(0);

    if let Some(close) = lines.iter().rposition(|line| line.trim() == FENCE) {
        lines.truncate(close);
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let raw = "```go\npackage main\n\nfunc Add(a, b int) int { return a + b }\n```";
        assert_eq!(
            strip_code_fence(raw),
            "package main\n\nfunc Add(a, b int) int { return a + b }"
        );
    }

    #[test]
    fn strips_bare_fence_and_surrounding_whitespace() {
        let raw = "\n\n```\n  x = 1\n```\n\n";
        assert_eq!(strip_code_fence(raw), "x = 1");
    }

    #[test]
    fn only_opening_fence_yields_empty() {
        assert_eq!(strip_code_fence("```python"), "");
        assert_eq!(strip_code_fence("  ```  \n"), "");
    }

    #[test]
    fn text_without_fence_is_trimmed_only() {
        let raw = "  def add(a, b):\n    return a + b\n";
        assert_eq!(strip_code_fence(raw), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn missing_closing_fence_keeps_body() {
        assert_eq!(strip_code_fence("```go\npackage main\n"), "package main");
    }

    #[test]
    fn inner_fences_before_the_last_close_are_kept() {
        let raw = "```md\nsee:\n```\ninner\n```\n```";
        assert_eq!(strip_code_fence(raw), "see:\n```\ninner\n```");
    }
}
