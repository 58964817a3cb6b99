//! Platform definition for vendor-specific configurations.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;

/// Fallback prompt pattern for platforms without privilege levels.
const FALLBACK_PROMPT: &str = r"[$#>%]\s*$";

/// Platform definition containing all vendor-specific configuration.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "linux", "cisco_ios", "juniper_junos").
    pub name: String,

    /// Privilege levels for this platform.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Default privilege level after connection.
    pub default_privilege: String,

    /// Level entered with the enable secret, if the platform has one.
    pub enable_privilege: Option<String>,

    /// Level that accepts configuration commands, if any.
    pub config_privilege: Option<String>,

    /// Command that applies a configuration batch before leaving config mode.
    pub commit_command: Option<String>,

    /// Command that discards an uncommitted batch after a rejected command.
    pub abort_command: Option<String>,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established.
    pub on_open_commands: Vec<String>,

    /// Commands to run before connection is closed.
    pub on_close_commands: Vec<String>,

    /// Alternation of every level's prompt pattern.
    prompt_pattern: Regex,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            enable_privilege: None,
            config_privilege: None,
            commit_command: None,
            abort_command: None,
            failed_when_contains: vec![],
            on_open_commands: vec![],
            on_close_commands: vec![],
            prompt_pattern: fallback_prompt(),
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self.prompt_pattern = Self::build_combined_pattern(&self.privilege_levels);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Set the level reached with the enable secret.
    pub fn with_enable_privilege(mut self, name: impl Into<String>) -> Self {
        self.enable_privilege = Some(name.into());
        self
    }

    /// Set the configuration level.
    pub fn with_config_privilege(mut self, name: impl Into<String>) -> Self {
        self.config_privilege = Some(name.into());
        self
    }

    /// Set the command that commits a configuration batch.
    pub fn with_commit_command(mut self, command: impl Into<String>) -> Self {
        self.commit_command = Some(command.into());
        self
    }

    /// Set the command that discards a failed configuration batch.
    pub fn with_abort_command(mut self, command: impl Into<String>) -> Self {
        self.abort_command = Some(command.into());
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Add an on_close command.
    pub fn with_on_close_command(mut self, command: impl Into<String>) -> Self {
        self.on_close_commands.push(command.into());
        self
    }

    /// Get a privilege level by name.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// A pattern matching the prompt of any privilege level.
    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    /// First failure pattern found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Build a combined regex pattern that matches any privilege level's prompt.
    fn build_combined_pattern(levels: &IndexMap<String, PrivilegeLevel>) -> Regex {
        if levels.is_empty() {
            return fallback_prompt();
        }

        let combined = levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");

        Regex::new(&combined).unwrap_or_else(|_| fallback_prompt())
    }
}

fn fallback_prompt() -> Regex {
    Regex::new(FALLBACK_PROMPT).expect("fallback prompt pattern is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_prompt() {
        let platform = PlatformDefinition::new("test")
            .with_privilege(PrivilegeLevel::new("exec", r">\s*$").unwrap())
            .with_privilege(
                PrivilegeLevel::new("privilege_exec", r"#\s*$")
                    .unwrap()
                    .with_parent("exec"),
            );

        assert!(platform.prompt_pattern().is_match(b"router>"));
        assert!(platform.prompt_pattern().is_match(b"router#"));
        assert!(!platform.prompt_pattern().is_match(b"Password:"));
    }

    #[test]
    fn test_empty_platform_uses_fallback() {
        let platform = PlatformDefinition::new("bare");
        assert!(platform.prompt_pattern().is_match(b"$ "));
    }

    #[test]
    fn test_detect_failure() {
        let platform = PlatformDefinition::new("test").with_failure_pattern("% Invalid input");
        assert_eq!(
            platform.detect_failure("foo\n% Invalid input detected"),
            Some("% Invalid input")
        );
        assert_eq!(platform.detect_failure("all good"), None);
    }
}
