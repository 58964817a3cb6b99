//! Named command sets per device type.
//!
//! A catalog is a JSON object keyed by device type:
//!
//! ```json
//! {
//!   "cisco_ios": [
//!     {"id": "version", "text": "show version", "description": "Software version", "output_type": "text"}
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::platform::DeviceProfile;

/// One command in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub id: String,
    /// Text sent to the device.
    pub text: String,
    #[serde(default)]
    pub description: String,
    /// How callers should present the output (`text`, `table`, ...).
    #[serde(default = "default_output_type")]
    pub output_type: String,
}

fn default_output_type() -> String {
    "text".to_string()
}

/// Command sets keyed by device type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandCatalog {
    sets: IndexMap<String, Vec<CommandDefinition>>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json(&json)?)
    }

    /// Add a command to the set for `device_type`.
    pub fn insert(&mut self, device_type: impl Into<String>, command: CommandDefinition) {
        self.sets.entry(device_type.into()).or_default().push(command);
    }

    /// Commands for `device_type`.
    ///
    /// Falls back to the set stored under the canonical profile name, so a
    /// catalog keyed by `cisco_ios` also serves `ios` and `cisco_xe`.
    pub fn commands(&self, device_type: &str) -> &[CommandDefinition] {
        if let Some(set) = self.sets.get(device_type) {
            return set;
        }

        DeviceProfile::from_device_type(Some(device_type))
            .and_then(|profile| self.sets.get(profile.name()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up one command.
    pub fn find(&self, device_type: &str, id: &str) -> Option<&CommandDefinition> {
        self.commands(device_type)
            .iter()
            .find(|command| command.id == id)
    }

    /// Device types with a command set.
    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}
