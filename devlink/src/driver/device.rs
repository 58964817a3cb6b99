//! Driver for one interactive device session.

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::privilege::PrivilegeTracker;
use super::response::{Response, normalize_output};
use crate::channel::Channel;
use crate::error::{DriverError, TransportError};
use crate::platform::PlatformDefinition;
use crate::transport::Transport;

/// Number of answers given to a secret prompt before giving up.
const MAX_SECRET_ATTEMPTS: usize = 3;

/// Drives a device CLI over an open transport.
///
/// Handles:
/// - Prompt detection and privilege tracking
/// - Command execution with output normalization and failure detection
/// - Privilege navigation, including secret prompts (enable, sudo)
/// - Configuration batches
pub struct DeviceDriver {
    channel: Channel,
    platform: PlatformDefinition,
    privileges: PrivilegeTracker,
    timeout: Duration,
}

impl DeviceDriver {
    /// Take over an authenticated transport.
    ///
    /// Waits for the first prompt, records the privilege level it shows, then
    /// runs the platform's on-open commands. A rejected on-open command is
    /// logged and skipped.
    pub async fn open(
        transport: Box<dyn Transport>,
        platform: PlatformDefinition,
        timeout: Duration,
    ) -> Result<Self, DriverError> {
        let privileges = PrivilegeTracker::new(platform.privilege_levels.clone());
        let mut driver = Self {
            channel: Channel::new(transport),
            platform,
            privileges,
            timeout,
        };

        let data = driver.read_prompt().await?;
        let prompt = last_line(&data);
        match driver.privileges.observe_prompt(&prompt) {
            Some(level) => debug!("initial prompt '{}' is level '{}'", prompt, level),
            None => debug!("initial prompt '{}' matches no privilege level", prompt),
        }

        for command in driver.platform.on_open_commands.clone() {
            let response = driver.send_command(&command).await?;
            if let Some(reason) = &response.failure_message {
                warn!("on-open command '{}' rejected: {}", command, reason);
            }
        }

        Ok(driver)
    }

    /// Platform this driver speaks.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Name of the privilege level shown by the last prompt.
    pub fn current_privilege(&self) -> Option<&str> {
        self.privileges.current_name()
    }

    /// Whether the session sits at the platform's privileged level.
    pub fn is_privileged(&self) -> bool {
        match (&self.platform.enable_privilege, self.current_privilege()) {
            (Some(enable), Some(current)) => enable == current,
            _ => false,
        }
    }

    /// Send a command and wait for the prompt.
    ///
    /// A device-side rejection (a failure pattern in the output) is reported
    /// in [`Response::failure_message`], not as an error.
    pub async fn send_command(&mut self, command: &str) -> Result<Response, DriverError> {
        let start = Instant::now();
        debug!("sending command: {}", command);

        self.channel.send(command).await?;
        let data = self.read_prompt().await?;

        let elapsed = start.elapsed();
        let raw_result = String::from_utf8_lossy(&data).into_owned();
        let prompt = last_line(&data);
        self.privileges.observe_prompt(&prompt);

        let result = normalize_output(&raw_result, command);
        let failure = self.platform.detect_failure(&result).map(str::to_string);

        Ok(match failure {
            Some(pattern) => {
                debug!("command '{}' failed: matched '{}'", command, pattern);
                Response::failed(command, result, raw_result, prompt, elapsed, pattern)
            }
            None => Response::new(command, result, raw_result, prompt, elapsed),
        })
    }

    /// Navigate to privilege level `target`.
    ///
    /// `secret` answers any secret prompt met on the way.
    pub async fn acquire_privilege(
        &mut self,
        target: &str,
        secret: Option<&SecretString>,
    ) -> Result<(), DriverError> {
        let current = self.privileges.current_name().unwrap_or_default().to_string();
        if current == target {
            return Ok(());
        }

        let mut from = current;
        for step in self.privileges.route(&from, target)? {
            debug!("privilege {} -> {} via '{}'", from, step.to, step.command);
            self.channel.send(&step.command).await?;

            let data = match &step.secret_prompt {
                Some(prompt) => self.answer_secret(prompt, secret, &step.to).await?,
                None => self.read_prompt().await?,
            };

            let reached = self.privileges.observe_prompt(&last_line(&data));
            if reached != Some(step.to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: step.to });
            }
            from = step.to;
        }

        info!("acquired privilege level '{}'", target);
        Ok(())
    }

    /// Enter the platform's privileged level with `secret`.
    pub async fn enable(&mut self, secret: &SecretString) -> Result<(), DriverError> {
        let target = self
            .platform
            .enable_privilege
            .clone()
            .ok_or_else(|| DriverError::InvalidConfig {
                message: format!("platform '{}' has no privileged mode", self.platform.name),
            })?;

        self.acquire_privilege(&target, Some(secret)).await
    }

    /// Run `commands` in configuration mode, then return to the level the
    /// session started at.
    ///
    /// Every command is sent even if an earlier one is rejected; the
    /// returned responses carry the per-command verdicts. On platforms with
    /// a commit step the batch is committed only when nothing was rejected,
    /// otherwise it is discarded with the platform's abort command.
    ///
    /// If the batch fails partway (timeout, transport error) the driver still
    /// tries to discard the candidate and leave configuration mode before
    /// returning the error.
    pub async fn send_config(
        &mut self,
        commands: &[String],
        secret: Option<&SecretString>,
    ) -> Result<Vec<Response>, DriverError> {
        let config = self
            .platform
            .config_privilege
            .clone()
            .ok_or_else(|| DriverError::InvalidConfig {
                message: format!(
                    "platform '{}' has no configuration mode",
                    self.platform.name
                ),
            })?;

        let original = self.current_privilege().map(str::to_string);
        let outcome = self.apply_config(&config, commands, secret).await;

        let Some(original) = original else {
            return outcome;
        };
        match outcome {
            Ok(responses) => {
                self.acquire_privilege(&original, secret).await?;
                Ok(responses)
            }
            Err(e) => {
                self.recover(&config, &original, secret).await;
                Err(e)
            }
        }
    }

    async fn apply_config(
        &mut self,
        config: &str,
        commands: &[String],
        secret: Option<&SecretString>,
    ) -> Result<Vec<Response>, DriverError> {
        self.acquire_privilege(config, secret).await?;

        let mut responses = Vec::with_capacity(commands.len() + 1);
        for command in commands {
            responses.push(self.send_command(command).await?);
        }

        let rejected = responses.iter().any(|r| !r.is_success());
        if let Some(commit) = self.platform.commit_command.clone() {
            if !rejected {
                responses.push(self.send_command(&commit).await?);
            } else if let Some(abort) = self.platform.abort_command.clone() {
                warn!("configuration batch rejected, discarding candidate");
                self.send_command(&abort).await?;
            }
        }

        Ok(responses)
    }

    /// Best effort after a failed batch: drop the candidate, get back to
    /// `original`. Errors are logged only.
    async fn recover(&mut self, config: &str, original: &str, secret: Option<&SecretString>) {
        if self.current_privilege() == Some(config) {
            if let Some(abort) = self.platform.abort_command.clone() {
                if let Err(e) = self.send_command(&abort).await {
                    debug!("discarding candidate after failed batch: {}", e);
                }
            }
        }

        match self.acquire_privilege(original, secret).await {
            Ok(()) => debug!("returned to '{}' after failed batch", original),
            Err(e) => warn!("could not return to '{}' after failed batch: {}", original, e),
        }
    }

    /// Cheap liveness check: send an empty line and expect a prompt back
    /// within `timeout`.
    pub async fn probe(&mut self, timeout: Duration) -> Result<(), DriverError> {
        if !self.channel.is_alive() {
            return Err(TransportError::Disconnected.into());
        }

        self.channel.send("").await?;
        let data = self
            .channel
            .read_until(self.platform.prompt_pattern(), timeout)
            .await?;
        self.privileges.observe_prompt(&last_line(&data));
        Ok(())
    }

    /// Send the on-close commands (without waiting for replies) and close
    /// the transport.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        if self.channel.is_alive() {
            for command in self.platform.on_close_commands.clone() {
                if let Err(e) = self.channel.send(&command).await {
                    debug!("on-close command '{}' not sent: {}", command, e);
                    break;
                }
            }
        }

        self.channel.close().await?;
        Ok(())
    }

    async fn read_prompt(&mut self) -> Result<Vec<u8>, DriverError> {
        let data = self
            .channel
            .read_until(self.platform.prompt_pattern(), self.timeout)
            .await?;
        Ok(data)
    }

    /// Answer a secret prompt, or accept a prompt that shows up without one.
    async fn answer_secret(
        &mut self,
        auth: &Regex,
        secret: Option<&SecretString>,
        target: &str,
    ) -> Result<Vec<u8>, DriverError> {
        let either = Regex::new(&format!(
            "(?:{})|(?:{})",
            auth.as_str(),
            self.platform.prompt_pattern().as_str()
        ))
        .map_err(|e| DriverError::InvalidConfig {
            message: format!("secret prompt pattern: {e}"),
        })?;

        let mut data = self.channel.read_until(&either, self.timeout).await?;
        let mut attempts = 0;

        while auth.is_match(last_line(&data).as_bytes()) {
            if attempts == MAX_SECRET_ATTEMPTS {
                return Err(DriverError::PrivilegeAcquisitionFailed {
                    target: target.to_string(),
                });
            }

            // Only the first answer is the real secret; the rest walk the
            // device back to a prompt.
            let answer = match secret {
                Some(secret) if attempts == 0 => secret.expose_secret(),
                _ => "",
            };
            self.channel.send(answer).await?;
            attempts += 1;

            data = self.channel.read_until(&either, self.timeout).await?;
        }

        Ok(data)
    }
}

impl std::fmt::Debug for DeviceDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDriver")
            .field("platform", &self.platform.name)
            .field("transport", &self.channel.kind())
            .field("privilege", &self.current_privilege())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Last non-empty line of `data`, trimmed.
fn last_line(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
