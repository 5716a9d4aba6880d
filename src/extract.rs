//! Recovers the JSON object from a noisy language-model response.

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;

/// Returns the first balanced JSON object in `raw`, a best-effort candidate
/// when the response was truncated, or the trimmed text when no object is
/// found at all. Never fails; malformed input surfaces at the JSON decoder.
pub fn extract(raw: &str) -> String {
    let content = strip_code_fences(raw);
    let content = content.trim();

    if let Some(object) = balanced_object(content) {
        return object.to_string();
    }

    if let Some(candidate) = accumulate_lines(content) {
        debug!("no balanced object found; using line-accumulated candidate");
        return candidate;
    }

    content.to_string()
}

/// Removes lines that hold nothing but a fence marker. A JSON string
/// cannot span lines, so fences quoted inside values are left alone.
fn strip_code_fences(raw: &str) -> String {
    match fence_regex() {
        Ok(re) => re.replace_all(raw, "").into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn fence_regex() -> Result<&'static Regex, regex::Error> {
    static FENCE_RE: OnceCell<Regex> = OnceCell::new();
    FENCE_RE.get_or_try_init(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z0-9_-]*[ \t]*\r?$"))
}

/// Scans from the first `{` and stops where depth returns to zero.
/// Braces inside string literals do not count.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Line-oriented fallback. Counts braces per line without string
/// tracking, so a brace inside a narration can end it early.
fn accumulate_lines(text: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut depth: i64 = 0;
    let mut in_json = false;

    for line in text.lines() {
        let line = line.trim();
        if !in_json && line.starts_with('{') {
            in_json = true;
            depth = 0;
        }
        if !in_json {
            continue;
        }

        lines.push(line);
        depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
        if depth <= 0 && line.ends_with('}') {
            break;
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
