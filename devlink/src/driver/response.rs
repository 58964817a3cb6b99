//! Response type for command execution results.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// The raw output before normalization.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure message if the command failed (based on failure patterns).
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a new successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Create a failed response.
    pub fn failed(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: Some(failure_message.into()),
        }
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the command echo and the trailing prompt line from raw output.
///
/// Line endings are normalised to `\n`. The first line is treated as the
/// echo when it ends with `command` (some devices repeat the prompt in
/// front of it).
pub fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = text.split('\n').collect();

    let echoed = lines
        .first()
        .is_some_and(|first| !command.is_empty() && first.trim_end().ends_with(command.trim()));
    if echoed {
        lines.remove(0);
    }

    // Last line is the prompt the read stopped at
    lines.pop();

    lines.join("\n").trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show clock\r\n*10:21:07.123 UTC Mon Oct 19 2026\r\nrouter#";
        assert_eq!(
            normalize_output(raw, "show clock"),
            "*10:21:07.123 UTC Mon Oct 19 2026"
        );
    }

    #[test]
    fn test_normalize_echo_behind_prompt() {
        let raw = "router#show users\r\n    Line  User\r\n* 1 vty 0  admin\r\nrouter#";
        assert_eq!(
            normalize_output(raw, "show users"),
            "    Line  User\n* 1 vty 0  admin"
        );
    }

    #[test]
    fn test_normalize_without_echo() {
        assert_eq!(normalize_output("output\nrouter>", "show x"), "output");
        assert_eq!(normalize_output("router>", "terminal length 0"), "");
    }

    #[test]
    fn test_response_failure_flag() {
        let ok = Response::new("show x", "", "", "router#", Duration::ZERO);
        assert!(ok.is_success());

        let failed = Response::failed(
            "show x",
            "% Invalid input",
            "",
            "router#",
            Duration::ZERO,
            "% Invalid input",
        );
        assert!(!failed.is_success());
        assert_eq!(failed.to_string(), "% Invalid input");
    }
}
