//! Command execution on registered sessions.

use std::sync::Arc;

use log::{debug, warn};

use crate::catalog::CommandCatalog;
use crate::driver::Response;
use crate::error::ExecError;
use crate::session::{SessionId, SessionManager, SharedSession};

/// Runs commands on sessions owned by a [`SessionManager`].
///
/// A failed command never evicts its session. Liveness is only reassessed
/// by [`SessionManager::get_status`] or a later connect.
#[derive(Clone)]
pub struct CommandExecutor {
    manager: Arc<SessionManager>,
}

impl CommandExecutor {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// The manager whose sessions this executor uses.
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Run one command and return its normalized output.
    pub async fn execute_command(&self, id: &SessionId, command: &str) -> Result<String, ExecError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;

        let response = session
            .driver
            .send_command(command)
            .await
            .map_err(|e| failure(id, e))?;

        check(&response)?;
        Ok(response.result)
    }

    /// Run `commands` in order as one configuration batch.
    ///
    /// The returned transcript holds each command followed by its output.
    /// Commands already applied before a rejected one stay applied unless
    /// the platform commits batches atomically.
    pub async fn execute_config_commands<S: AsRef<str>>(
        &self,
        id: &SessionId,
        commands: &[S],
    ) -> Result<String, ExecError> {
        let session = self.session(id)?;
        if commands.is_empty() {
            return Ok(String::new());
        }

        let commands: Vec<String> = commands.iter().map(|c| c.as_ref().to_string()).collect();
        let mut session = session.lock().await;
        let session = &mut *session;

        let responses = session
            .driver
            .send_config(&commands, session.credential.enable_password.as_ref())
            .await
            .map_err(|e| failure(id, e))?;

        responses.iter().try_for_each(check)?;

        let transcript = responses
            .iter()
            .map(|response| {
                if response.result.is_empty() {
                    response.command.clone()
                } else {
                    format!("{}\n{}", response.command, response.result)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(transcript)
    }

    /// Look up `command_id` for `device_type` in `catalog` and run it.
    pub async fn execute_catalog_command(
        &self,
        id: &SessionId,
        catalog: &CommandCatalog,
        device_type: &str,
        command_id: &str,
    ) -> Result<String, ExecError> {
        let definition = catalog.find(device_type, command_id).ok_or_else(|| {
            ExecError::ExecutionFailure(format!(
                "command '{}' is not defined for device type '{}'",
                command_id, device_type
            ))
        })?;

        debug!("{}: catalog command '{}' -> '{}'", id, command_id, definition.text);
        self.execute_command(id, &definition.text).await
    }

    fn session(&self, id: &SessionId) -> Result<SharedSession, ExecError> {
        self.manager
            .lookup(id)
            .ok_or_else(|| ExecError::NotConnected {
                session: id.to_string(),
            })
    }
}

fn failure(id: &SessionId, error: impl std::fmt::Display) -> ExecError {
    warn!("{}: command failed: {}", id, error);
    ExecError::ExecutionFailure(error.to_string())
}

/// Turn a device-side rejection into an error.
fn check(response: &Response) -> Result<(), ExecError> {
    match &response.failure_message {
        Some(reason) => Err(ExecError::ExecutionFailure(format!(
            "device rejected '{}' ({}): {}",
            response.command, reason, response.result
        ))),
        None => Ok(()),
    }
}
