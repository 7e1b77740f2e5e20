//! Strip markdown fences and comment-only lines from a model reply so the
//! queue agent can push bare Strudel code to the editor.

/// Remove ```javascript / ```js / ``` fences and lines that hold only a `//`
/// comment, then trim.
pub fn clean_code_response(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let t = line.trim();
            !is_fence(t) && !t.starts_with("//")
        })
        .map(|line| strip_inline_fences(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn is_fence(trimmed: &str) -> bool {
    match trimmed.strip_prefix("```") {
        Some(lang) => lang.is_empty() || lang == "javascript" || lang == "js",
        None => false,
    }
}

// Models sometimes glue the fence onto the code: "```s(\"bd\")```".
fn strip_inline_fences(line: &str) -> &str {
    let line = line.strip_prefix("```").unwrap_or(line);
    line.strip_suffix("```").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_javascript_fence() {
        let raw = "```javascript\ns(\"bd sd\").fast(2)\n```";
        assert_eq!(clean_code_response(raw), "s(\"bd sd\").fast(2)");
    }

    #[test]
    fn removes_js_and_bare_fences() {
        assert_eq!(clean_code_response("```js\nnote(\"c3\")\n```\n"), "note(\"c3\")");
        assert_eq!(clean_code_response("```\ns(\"hh*8\")\n```"), "s(\"hh*8\")");
    }

    #[test]
    fn drops_comment_only_lines_but_keeps_trailing_comments() {
        let raw = "// kick pattern\nstack(\n  s(\"bd*4\"), // four on the floor\n  s(\"~ cp\")\n)";
        assert_eq!(
            clean_code_response(raw),
            "stack(\n  s(\"bd*4\"), // four on the floor\n  s(\"~ cp\")\n)"
        );
    }

    #[test]
    fn plain_code_is_unchanged() {
        assert_eq!(clean_code_response("  s(\"bd\")  "), "s(\"bd\")");
    }

    #[test]
    fn glued_fences_are_stripped() {
        assert_eq!(clean_code_response("```s(\"bd\")```"), "s(\"bd\")");
    }
}
