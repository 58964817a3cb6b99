//! Privilege tracking and routing.
//!
//! A platform's privilege levels form a tree: every level except the root
//! names its parent. Moving between two levels means dropping down to their
//! closest shared ancestor, then climbing to the target.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::DriverError;
use crate::platform::PrivilegeLevel;

/// One command that moves the session to an adjacent level.
#[derive(Debug, Clone)]
pub struct PrivilegeStep {
    /// Level the session should be at once the command completes.
    pub to: String,

    /// Command to send.
    pub command: String,

    /// Secret prompt the device may show in reply (enable, sudo).
    pub secret_prompt: Option<Regex>,
}

/// Knows the privilege tree of one platform and which level the session is
/// at, as last shown by the device prompt.
#[derive(Debug)]
pub struct PrivilegeTracker {
    levels: IndexMap<String, PrivilegeLevel>,
    current: Option<String>,
}

impl PrivilegeTracker {
    /// Start at the root level until a prompt says otherwise.
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        let current = levels
            .values()
            .find(|level| level.previous_priv.is_none())
            .map(|level| level.name.clone());

        Self { levels, current }
    }

    /// The first level whose pattern matches `prompt`.
    pub fn level_for(&self, prompt: &str) -> Option<&PrivilegeLevel> {
        self.levels.values().find(|level| level.matches(prompt))
    }

    /// Record the level shown by `prompt` as current.
    ///
    /// An unrecognised prompt leaves the current level untouched.
    pub fn observe_prompt(&mut self, prompt: &str) -> Option<&str> {
        let name = self.level_for(prompt)?.name.clone();
        self.current = Some(name);
        self.current.as_deref()
    }

    /// Name of the current privilege level.
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Commands that take the session from `from` to `to`, in order.
    ///
    /// Empty when the two are the same level.
    pub fn route(&self, from: &str, to: &str) -> Result<Vec<PrivilegeStep>, DriverError> {
        let no_path = || DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        };

        let down = self.lineage(from).ok_or_else(no_path)?;
        let up = self.lineage(to).ok_or_else(no_path)?;

        // Closest level both lineages pass through
        let (down_len, up_len) = down
            .iter()
            .enumerate()
            .find_map(|(i, name)| up.iter().position(|n| n == name).map(|j| (i, j)))
            .ok_or_else(no_path)?;

        let mut steps = Vec::with_capacity(down_len + up_len);

        for pair in down[..=down_len].windows(2) {
            let (leaving, parent) = (pair[0], pair[1]);
            let command = self.levels[leaving]
                .deescalate_command
                .clone()
                .ok_or_else(no_path)?;
            steps.push(PrivilegeStep {
                to: parent.to_string(),
                command,
                secret_prompt: None,
            });
        }

        for &entering in up[..up_len].iter().rev() {
            let level = &self.levels[entering];
            let command = level.escalate_command.clone().ok_or_else(no_path)?;
            steps.push(PrivilegeStep {
                to: entering.to_string(),
                command,
                secret_prompt: level.escalate_prompt.clone(),
            });
        }

        Ok(steps)
    }

    /// `name` followed by each of its ancestors up to the root. `None` for an
    /// unknown level or a parent chain that never reaches a root.
    fn lineage(&self, name: &str) -> Option<Vec<&str>> {
        let mut chain = vec![self.levels.get(name)?.name.as_str()];

        while let Some(parent) = self.levels[chain[chain.len() - 1]].previous_priv.as_deref() {
            if chain.len() > self.levels.len() || !self.levels.contains_key(parent) {
                return None;
            }
            chain.push(parent);
        }

        Some(chain)
    }
}
