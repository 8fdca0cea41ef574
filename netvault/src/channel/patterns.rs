//! Prompt pattern helpers.

use memchr::memrchr;
use regex::bytes::Regex;

/// Compile a prompt pattern string into a regex.
///
/// Patterns without an end anchor get `\s*$` appended, so a prompt is
/// only recognised at the end of a line.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("(?:{})\\s*$", pattern)
    };

    Regex::new(&pattern)
}

/// Return the last line of `data` that contains something besides whitespace.
///
/// Line terminators (`\r`, `\n`) are not part of the returned slice.
pub fn last_non_empty_line(data: &[u8]) -> Option<&[u8]> {
    let mut end = data.len();
    loop {
        let start = memrchr(b'\n', &data[..end]).map_or(0, |pos| pos + 1);
        let line = trim_line_end(&data[start..end]);
        if !line.iter().all(u8::is_ascii_whitespace) {
            return Some(line);
        }
        if start == 0 {
            return None;
        }
        end = start - 1;
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}
