//! Session registry and connection lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use indexmap::IndexMap;
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex as AsyncMutex;

use super::resolve::resolve_credential;
use super::{
    DeviceDescriptor, ManagerConfig, SessionId, SessionInfo, SessionManagerBuilder, SessionState,
    SessionStatus,
};
use crate::driver::DeviceDriver;
use crate::error::{ConnectError, DisconnectError, TransportError};
use crate::platform::DeviceProfile;
use crate::transport::{Connector, TransportConfig, TransportKind};
use crate::vault::{CredentialRecord, CredentialVault};

/// Upper bound on a best-effort close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected device, owned by the registry.
pub(crate) struct LiveSession {
    pub(crate) driver: DeviceDriver,
    pub(crate) credential: CredentialRecord,
}

/// Sessions are locked individually so commands on one device never wait
/// on another device.
pub(crate) type SharedSession = Arc<AsyncMutex<LiveSession>>;

struct SessionEntry {
    info: SessionInfo,
    session: SharedSession,
}

/// Opens, tracks and tears down device sessions.
///
/// The registry lock only ever guards map operations. Network I/O runs
/// under the per-session lock, so two devices connect in parallel and a
/// slow command on one session never blocks another. Commands on the same
/// session are serialized, and a [`disconnect`](Self::disconnect) waits for
/// an in-flight command to finish before closing the transport.
pub struct SessionManager {
    vault: Arc<CredentialVault>,
    connector: Arc<dyn Connector>,
    config: ManagerConfig,
    registry: Mutex<IndexMap<SessionId, SessionEntry>>,
}

impl SessionManager {
    pub fn new(
        vault: Arc<CredentialVault>,
        connector: Arc<dyn Connector>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            vault,
            connector,
            config,
            registry: Mutex::new(IndexMap::new()),
        }
    }

    /// Start a [`SessionManagerBuilder`].
    pub fn builder(vault: Arc<CredentialVault>) -> SessionManagerBuilder {
        SessionManagerBuilder::new(vault)
    }

    /// The vault credentials are resolved from.
    pub fn vault(&self) -> &Arc<CredentialVault> {
        &self.vault
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Connect to `device` over `kind`, or return the live session already
    /// registered for it.
    ///
    /// `credential` bypasses vault resolution. Otherwise the credential
    /// comes from the first tier that has one: device, subnet, group,
    /// default.
    pub async fn connect(
        &self,
        device: &DeviceDescriptor,
        kind: TransportKind,
        credential: Option<CredentialRecord>,
    ) -> Result<SessionId, ConnectError> {
        let address = device.address.trim();
        if address.is_empty() {
            return Err(ConnectError::InvalidDevice {
                reason: "device address is empty".to_string(),
            });
        }

        let id = match device.port {
            Some(port) if port != self.config.port(kind) => {
                SessionId::with_port(address, port, kind)
            }
            _ => SessionId::new(address, kind),
        };

        if let Some(existing) = self.lookup(&id) {
            if self.probe(&id, &existing).await {
                debug!("{}: reusing live session", id);
                return Ok(id);
            }
            info!("{}: registered session is dead, reconnecting", id);
            self.evict(&id, &existing);
            close_quietly(&id, existing).await;
        }

        let credential = match credential {
            Some(credential) => credential,
            None => resolve_credential(&self.vault, device)
                .map(|(record, _)| record)
                .ok_or_else(|| ConnectError::NoCredentials {
                    device: address.to_string(),
                })?,
        };

        debug!("{}: {} -> {}", id, SessionState::Disconnected, SessionState::Connecting);

        let (mut driver, profile) = match self.open_driver(device, kind, &credential).await {
            Ok(opened) => opened,
            Err(e) => {
                debug!("{}: {} -> {} ({})", id, SessionState::Connecting, SessionState::Disconnected, e);
                return Err(e);
            }
        };

        let state = enter_privileged(&id, &mut driver, &credential).await;

        let info = SessionInfo {
            id: id.clone(),
            address: address.to_string(),
            transport: kind,
            profile: profile.identifier(kind).unwrap_or(profile.name()).to_string(),
            state,
            username: credential.username.clone(),
            opened_at: Utc::now(),
        };
        let session = Arc::new(AsyncMutex::new(LiveSession { driver, credential }));

        let raced = {
            let mut registry = self.registry();
            if registry.contains_key(&id) {
                Some(session)
            } else {
                info!(
                    "{}: connected as '{}' ({}, {})",
                    id, info.username, info.profile, info.state
                );
                registry.insert(id.clone(), SessionEntry { info, session });
                None
            }
        };

        // Another caller registered this id while we were connecting
        if let Some(newcomer) = raced {
            debug!("{}: keeping the session registered first", id);
            close_quietly(&id, newcomer).await;
        }

        Ok(id)
    }

    /// Connect to every device concurrently. Results are in input order.
    pub async fn connect_many(
        &self,
        devices: &[DeviceDescriptor],
        kind: TransportKind,
    ) -> Vec<Result<SessionId, ConnectError>> {
        join_all(devices.iter().map(|device| self.connect(device, kind, None))).await
    }

    /// Close and unregister a session.
    ///
    /// Close failures are logged and swallowed; the session is always
    /// removed.
    pub async fn disconnect(&self, id: &SessionId) -> Result<(), DisconnectError> {
        let entry = self
            .registry()
            .shift_remove(id)
            .ok_or_else(|| DisconnectError::NotConnected {
                session: id.to_string(),
            })?;

        close_quietly(id, entry.session).await;
        info!("{}: disconnected", id);
        Ok(())
    }

    /// Close every session and leave the registry empty. Never fails.
    pub async fn close_all(&self) {
        let drained: Vec<(SessionId, SessionEntry)> = self.registry().drain(..).collect();
        if drained.is_empty() {
            return;
        }

        info!("closing {} sessions", drained.len());
        join_all(
            drained
                .into_iter()
                .map(|(id, entry)| async move { close_quietly(&id, entry.session).await }),
        )
        .await;
    }

    /// Probe a session. A session that fails the probe is evicted.
    pub async fn get_status(&self, id: &SessionId) -> SessionStatus {
        let Some(session) = self.lookup(id) else {
            return SessionStatus::ConnectionLost;
        };

        if self.probe(id, &session).await {
            return SessionStatus::Connected;
        }

        warn!("{}: liveness probe failed, evicting session", id);
        self.evict(id, &session);
        close_quietly(id, session).await;
        SessionStatus::ConnectionLost
    }

    /// Whether `id` is registered. Does no I/O.
    pub fn is_connected(&self, id: &SessionId) -> bool {
        self.registry().contains_key(id)
    }

    /// Snapshot of every registered session, in connection order.
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.registry()
            .values()
            .map(|entry| entry.info.clone())
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    pub(crate) fn lookup(&self, id: &SessionId) -> Option<SharedSession> {
        self.registry()
            .get(id)
            .map(|entry| Arc::clone(&entry.session))
    }

    fn registry(&self) -> MutexGuard<'_, IndexMap<SessionId, SessionEntry>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `id` only if it still maps to `session`.
    fn evict(&self, id: &SessionId, session: &SharedSession) {
        let mut registry = self.registry();
        if registry
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(&entry.session, session))
        {
            registry.shift_remove(id);
        }
    }

    async fn probe(&self, id: &SessionId, session: &SharedSession) -> bool {
        let mut session = session.lock().await;
        match session.driver.probe(self.config.probe_timeout()).await {
            Ok(()) => true,
            Err(e) => {
                debug!("{}: probe failed: {}", id, e);
                false
            }
        }
    }

    /// Open a transport and a driver on it, falling back to the generic
    /// profile when the requested one cannot be used.
    async fn open_driver(
        &self,
        device: &DeviceDescriptor,
        kind: TransportKind,
        credential: &CredentialRecord,
    ) -> Result<(DeviceDriver, DeviceProfile), ConnectError> {
        let device_type = device.device_type.as_deref();
        let requested = DeviceProfile::from_device_type(device_type);
        if requested.is_none() {
            warn!(
                "unknown device type '{}', using the generic profile",
                device_type.unwrap_or_default()
            );
        }

        let mut candidates = Vec::with_capacity(2);
        candidates.extend(requested);
        if !candidates.contains(&DeviceProfile::Generic) {
            candidates.push(DeviceProfile::Generic);
        }

        let config = self.transport_config(device, kind, credential);

        for profile in candidates {
            if !self.connector.supports(profile, kind) {
                warn!("profile '{}' is not supported over {}", profile, kind);
                continue;
            }

            let opened = tokio::time::timeout(
                self.config.connect_timeout(),
                self.connector.open(kind, profile, &config),
            )
            .await
            .unwrap_or(Err(TransportError::Timeout(self.config.connect_timeout())));

            let transport = match opened {
                Ok(transport) => transport,
                Err(TransportError::UnsupportedPlatform { platform }) => {
                    warn!("transport rejected profile '{}' over {}", platform, kind);
                    continue;
                }
                Err(e) => return Err(ConnectError::TransportFailure(e.to_string())),
            };

            let driver =
                DeviceDriver::open(transport, profile.platform(), self.config.command_timeout())
                    .await
                    .map_err(|e| ConnectError::TransportFailure(e.to_string()))?;

            return Ok((driver, profile));
        }

        Err(ConnectError::UnsupportedDeviceType {
            device_type: device_type.unwrap_or("generic").to_string(),
            transport: kind.to_string(),
        })
    }

    fn transport_config(
        &self,
        device: &DeviceDescriptor,
        kind: TransportKind,
        credential: &CredentialRecord,
    ) -> TransportConfig {
        TransportConfig {
            host: device.address.trim().to_string(),
            port: device.port.unwrap_or_else(|| self.config.port(kind)),
            username: credential.username.clone(),
            password: SecretString::from(credential.password.expose_secret().to_owned()),
            timeout: self.config.connect_timeout(),
            terminal_width: self.config.terminal_width,
            terminal_height: self.config.terminal_height,
            host_key_verification: self.config.host_key_verification.clone(),
            known_hosts_path: self.config.known_hosts_path.clone(),
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        let open = self
            .registry
            .get_mut()
            .map(|registry| registry.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len());
        if open > 0 {
            warn!(
                "SessionManager dropped with {} open sessions; call close_all() before shutdown",
                open
            );
        }
    }
}

/// Enter privileged mode when the credential carries an enable secret.
///
/// Failure leaves the session usable at the authenticated level.
async fn enter_privileged(
    id: &SessionId,
    driver: &mut DeviceDriver,
    credential: &CredentialRecord,
) -> SessionState {
    if driver.is_privileged() {
        return SessionState::Privileged;
    }

    let Some(secret) = credential.enable_password.as_ref() else {
        return SessionState::Authenticated;
    };
    if driver.platform().enable_privilege.is_none() {
        debug!("{}: platform has no privileged mode, enable secret unused", id);
        return SessionState::Authenticated;
    }

    match driver.enable(secret).await {
        Ok(()) => SessionState::Privileged,
        Err(e) => {
            warn!("{}: could not enter privileged mode: {}", id, e);
            SessionState::Authenticated
        }
    }
}

/// Close a session, logging instead of propagating any failure.
pub(crate) async fn close_quietly(id: &SessionId, session: SharedSession) {
    let mut session = session.lock().await;
    match tokio::time::timeout(CLOSE_TIMEOUT, session.driver.close()).await {
        Ok(Ok(())) => debug!("{}: closed", id),
        Ok(Err(e)) => warn!("{}: error while closing session (ignored): {}", id, e),
        Err(_) => warn!("{}: close timed out after {:?} (ignored)", id, CLOSE_TIMEOUT),
    }
}
