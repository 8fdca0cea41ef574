//! Response type for command execution results.

use std::time::Duration;

use crate::channel::last_non_empty_line;
use crate::error::{ChannelError, Result};

/// Response from one command sent on the interactive shell.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output with the command echo and trailing prompt removed.
    pub result: String,

    /// The raw output before echo/prompt removal.
    pub raw_result: String,

    /// The prompt line that ended the output (empty on timeout).
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Whether the timeout elapsed before the prompt came back.
    ///
    /// `result` then holds whatever partial output arrived.
    pub timed_out: bool,
}

impl Response {
    /// Build a response from the raw bytes read after sending `command`.
    pub fn from_output(
        command: impl Into<String>,
        raw: &[u8],
        prompt_matched: bool,
        elapsed: Duration,
    ) -> Self {
        let command = command.into();
        let raw_result = String::from_utf8_lossy(raw).into_owned();

        let prompt = if prompt_matched {
            last_non_empty_line(raw)
                .map(|line| String::from_utf8_lossy(line).trim().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let result = strip_echo_and_prompt(&raw_result, &command, prompt_matched);

        Self {
            command,
            result,
            raw_result,
            prompt,
            elapsed,
            timed_out: !prompt_matched,
        }
    }

    /// Turn a timed-out response into a `PromptTimeout` error.
    pub fn complete(self, timeout: Duration) -> Result<Self> {
        if self.timed_out {
            return Err(ChannelError::PromptTimeout {
                command: self.command,
                timeout,
            }
            .into());
        }
        Ok(self)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

fn strip_echo_and_prompt(raw: &str, command: &str, prompt_matched: bool) -> String {
    let output = raw.trim_start_matches(['\r', '\n']);
    let output = if command.is_empty() {
        output
    } else {
        output.strip_prefix(command).unwrap_or(output)
    };
    let output = output.trim_start_matches(['\r', '\n']);

    if !prompt_matched {
        return output.to_string();
    }

    // Drop the trailing prompt line along with any blank lines after it
    let trimmed = output.trim_end();
    match trimmed.rfind('\n') {
        Some(pos) => trimmed[..pos].trim_end_matches(['\r', '\n']).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_and_prompt_removed() {
        let raw = b"show running-config\nhostname r1\ninterface Gi0/1\nr1#";
        let response =
            Response::from_output("show running-config", raw, true, Duration::from_millis(5));
        assert_eq!(response.result, "hostname r1\ninterface Gi0/1");
        assert_eq!(response.prompt, "r1#");
        assert!(!response.timed_out);
    }

    #[test]
    fn test_command_without_output() {
        let raw = b"terminal length 0\nr1#";
        let response = Response::from_output("terminal length 0", raw, true, Duration::ZERO);
        assert_eq!(response.result, "");
        assert_eq!(response.prompt, "r1#");
    }

    #[test]
    fn test_timed_out_keeps_partial_output() {
        let raw = b"show running-config\nhostname r1\ninterf";
        let response = Response::from_output("show running-config", raw, false, Duration::ZERO);
        assert!(response.timed_out);
        assert_eq!(response.result, "hostname r1\ninterf");

        let err = response.complete(Duration::from_secs(120)).unwrap_err();
        assert!(err.is_prompt_timeout());
    }
}
