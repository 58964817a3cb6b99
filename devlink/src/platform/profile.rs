//! Protocol profiles: the closed set of device families devlink can drive.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::definition::PlatformDefinition;
use super::vendors;
use crate::transport::TransportKind;

/// A device family with its own prompts and privilege graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceProfile {
    /// Cisco-like CLI with loose prompt matching. Used when the device type
    /// is unknown or unsupported.
    #[default]
    Generic,
    CiscoIos,
    CiscoNxos,
    AristaEos,
    JuniperJunos,
    Linux,
}

/// Device-type strings (and common aliases) to profiles.
const PROFILE_TABLE: &[(&str, DeviceProfile)] = &[
    ("generic", DeviceProfile::Generic),
    ("autodetect", DeviceProfile::Generic),
    ("cisco_ios", DeviceProfile::CiscoIos),
    ("cisco_xe", DeviceProfile::CiscoIos),
    ("cisco_iosxe", DeviceProfile::CiscoIos),
    ("ios", DeviceProfile::CiscoIos),
    ("cisco", DeviceProfile::CiscoIos),
    ("cisco_nxos", DeviceProfile::CiscoNxos),
    ("nxos", DeviceProfile::CiscoNxos),
    ("arista_eos", DeviceProfile::AristaEos),
    ("arista", DeviceProfile::AristaEos),
    ("eos", DeviceProfile::AristaEos),
    ("juniper_junos", DeviceProfile::JuniperJunos),
    ("juniper", DeviceProfile::JuniperJunos),
    ("junos", DeviceProfile::JuniperJunos),
    ("linux", DeviceProfile::Linux),
];

impl DeviceProfile {
    /// Map a device-type string to a profile.
    ///
    /// A missing or blank type means [`DeviceProfile::Generic`]. Matching is
    /// case-insensitive and ignores a trailing `_telnet`. Unknown types
    /// return `None`.
    pub fn from_device_type(device_type: Option<&str>) -> Option<Self> {
        let device_type = device_type.map(str::trim).unwrap_or_default();
        if device_type.is_empty() {
            return Some(DeviceProfile::Generic);
        }

        let lowered = device_type.to_ascii_lowercase();
        let base = lowered.strip_suffix("_telnet").unwrap_or(&lowered);

        PROFILE_TABLE
            .iter()
            .find(|(name, _)| *name == base)
            .map(|(_, profile)| *profile)
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceProfile::Generic => "generic",
            DeviceProfile::CiscoIos => "cisco_ios",
            DeviceProfile::CiscoNxos => "cisco_nxos",
            DeviceProfile::AristaEos => "arista_eos",
            DeviceProfile::JuniperJunos => "juniper_junos",
            DeviceProfile::Linux => "linux",
        }
    }

    /// Transport-specific identifier, or `None` when the profile has no
    /// variant for this transport.
    pub fn identifier(&self, kind: TransportKind) -> Option<&'static str> {
        match (self, kind) {
            (profile, TransportKind::Ssh) => Some(profile.name()),
            (DeviceProfile::Generic, TransportKind::Telnet) => Some("generic_telnet"),
            (DeviceProfile::CiscoIos, TransportKind::Telnet) => Some("cisco_ios_telnet"),
            (DeviceProfile::CiscoNxos, TransportKind::Telnet) => Some("cisco_nxos_telnet"),
            (DeviceProfile::AristaEos, TransportKind::Telnet) => Some("arista_eos_telnet"),
            (DeviceProfile::JuniperJunos, TransportKind::Telnet) => Some("juniper_junos_telnet"),
            (DeviceProfile::Linux, TransportKind::Telnet) => None,
        }
    }

    /// Platform definition (prompts, privilege graph, failure patterns).
    pub fn platform(&self) -> PlatformDefinition {
        match self {
            DeviceProfile::Generic => vendors::generic::platform(),
            DeviceProfile::CiscoIos => vendors::cisco_ios::platform(),
            DeviceProfile::CiscoNxos => vendors::cisco_nxos::platform(),
            DeviceProfile::AristaEos => vendors::arista_eos::platform(),
            DeviceProfile::JuniperJunos => vendors::juniper_junos::platform(),
            DeviceProfile::Linux => vendors::linux::platform(),
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
