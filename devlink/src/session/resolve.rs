//! Layered credential lookup: device, then subnet, then group, then default.

use log::debug;

use super::DeviceDescriptor;
use crate::subnet::is_in_subnet;
use crate::vault::{CredentialRecord, CredentialScope, CredentialVault};

/// Find the credential for `device`, together with the scope it came from.
///
/// The device tier checks the inventory id before the address. Subnets
/// are tried in the order they were stored; the first one containing the
/// address wins.
pub(crate) fn resolve_credential(
    vault: &CredentialVault,
    device: &DeviceDescriptor,
) -> Option<(CredentialRecord, CredentialScope)> {
    let address = device.address.trim();

    let device_keys = device.id.as_deref().into_iter().chain([address]);
    for key in device_keys {
        if let Some(record) = vault.get(key) {
            return Some(found(record, CredentialScope::Device(key.to_string())));
        }
    }

    for cidr in vault.subnets() {
        if is_in_subnet(address, &cidr) {
            if let Some(record) = vault.get_by_subnet(&cidr) {
                return Some(found(record, CredentialScope::Subnet(cidr)));
            }
        }
    }

    if let Some(group) = device.group.as_deref() {
        if let Some(record) = vault.get_by_group(group) {
            return Some(found(record, CredentialScope::Group(group.to_string())));
        }
    }

    vault
        .get_default()
        .map(|record| found(record, CredentialScope::Default))
}

fn found(record: CredentialRecord, scope: CredentialScope) -> (CredentialRecord, CredentialScope) {
    debug!("credential resolved from '{}'", scope.key());
    (record, scope)
}
