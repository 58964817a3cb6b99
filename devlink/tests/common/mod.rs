//! Scripted in-memory devices for integration tests.
//!
//! [`MockConnector`] hands out [`MockTransport`]s that behave like a small
//! Cisco-style or JUNOS-style CLI. Every opened line is kept so tests can
//! kill it, make it fail, or inspect what was sent.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use devlink::error::TransportError;
use devlink::{
    Connector, CredentialVault, DeviceProfile, ManagerConfig, SessionManager, Transport,
    TransportConfig, TransportKind,
};

/// Largest chunk a read returns, so prompts arrive split across reads.
const CHUNK: usize = 48;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Encoded-mode vault in a fresh temp dir.
pub fn vault() -> (tempfile::TempDir, Arc<CredentialVault>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = CredentialVault::open_encoded(dir.path().join("credentials.enc"));
    (dir, Arc::new(vault))
}

/// Manager over `connector` with short timeouts.
pub fn manager(connector: &Arc<MockConnector>, vault: &Arc<CredentialVault>) -> Arc<SessionManager> {
    let config = ManagerConfig {
        connect_timeout_secs: 2,
        command_timeout_secs: 1,
        probe_timeout_secs: 1,
        ..ManagerConfig::default()
    };
    let connector: Arc<dyn Connector> = connector.clone();
    Arc::new(
        SessionManager::builder(Arc::clone(vault))
            .connector(connector)
            .config(config)
            .build(),
    )
}

/// One opened connection, as seen from the device side.
#[derive(Debug, Default)]
pub struct Line {
    pub profile: Mutex<Option<DeviceProfile>>,
    dead: AtomicBool,
    silent: AtomicBool,
    fail_next_write: AtomicBool,
    fail_write_of: Mutex<Option<String>>,
    closed: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl Line {
    /// Drop the connection; every further operation fails.
    pub fn kill(&self) {
        self.dead.store(true, Ordering::SeqCst);
    }

    /// Accept input but never answer.
    pub fn go_silent(&self) {
        self.silent.store(true, Ordering::SeqCst);
    }

    /// Fail the next write with an I/O error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Fail the write of `command` with an I/O error, once.
    pub fn fail_write_of(&self, command: &str) {
        *self.fail_write_of.lock().unwrap() = Some(command.to_string());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every line written to the device, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[derive(Debug, Default)]
pub struct MockConnector {
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    pub fail_close: AtomicBool,
    pub start_privileged: AtomicBool,
    fail_open: Mutex<Option<String>>,
    enable_secret: Mutex<Option<String>>,
    unsupported: Mutex<Vec<(DeviceProfile, TransportKind)>>,
    rejected: Mutex<Vec<DeviceProfile>>,
    logins: Mutex<Vec<(String, String)>>,
    ports: Mutex<Vec<u16>>,
    outputs: Mutex<HashMap<String, String>>,
    open_delay: Mutex<Duration>,
    lines: Mutex<Vec<Arc<Line>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every open with an authentication error.
    pub fn fail_open(&self) {
        *self.fail_open.lock().unwrap() = Some("bad password".to_string());
    }

    /// Secret the device accepts for `enable`.
    pub fn set_enable_secret(&self, secret: &str) {
        *self.enable_secret.lock().unwrap() = Some(secret.to_string());
    }

    /// Report `profile` over `kind` as unsupported.
    pub fn unsupported(&self, profile: DeviceProfile, kind: TransportKind) {
        self.unsupported.lock().unwrap().push((profile, kind));
    }

    /// Claim support for `profile` but reject it when opening.
    pub fn reject_on_open(&self, profile: DeviceProfile) {
        self.rejected.lock().unwrap().push(profile);
    }

    pub fn set_output(&self, command: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert(command.to_string(), output.to_string());
    }

    pub fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().unwrap() = delay;
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// `(username, password)` of every open attempt.
    pub fn logins(&self) -> Vec<(String, String)> {
        self.logins.lock().unwrap().clone()
    }

    /// Port of every open attempt.
    pub fn ports(&self) -> Vec<u16> {
        self.ports.lock().unwrap().clone()
    }

    pub fn last_username(&self) -> Option<String> {
        self.logins().last().map(|(user, _)| user.clone())
    }

    pub fn lines(&self) -> Vec<Arc<Line>> {
        self.lines.lock().unwrap().clone()
    }

    pub fn last_line(&self) -> Arc<Line> {
        self.lines().last().cloned().expect("no line opened")
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn supports(&self, profile: DeviceProfile, kind: TransportKind) -> bool {
        !self.unsupported.lock().unwrap().contains(&(profile, kind))
    }

    async fn open(
        &self,
        kind: TransportKind,
        profile: DeviceProfile,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.logins.lock().unwrap().push((
            config.username.clone(),
            config.password.expose_secret().to_string(),
        ));
        self.ports.lock().unwrap().push(config.port);

        let delay = *self.open_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail_open.lock().unwrap().is_some() {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            });
        }
        if self.rejected.lock().unwrap().contains(&profile) {
            return Err(TransportError::UnsupportedPlatform {
                platform: profile.to_string(),
            });
        }

        let line = Arc::new(Line::default());
        *line.profile.lock().unwrap() = Some(profile);
        self.lines.lock().unwrap().push(Arc::clone(&line));

        let style = match profile {
            DeviceProfile::JuniperJunos => Style::Junos,
            _ => Style::Cisco,
        };
        let mode = if self.start_privileged.load(Ordering::SeqCst) {
            Mode::Privileged
        } else {
            Mode::Exec
        };

        let mut transport = MockTransport {
            kind,
            line,
            style,
            mode,
            awaiting_secret: false,
            enable_secret: self.enable_secret.lock().unwrap().clone(),
            outputs: self.outputs.lock().unwrap().clone(),
            fail_close: self.fail_close.load(Ordering::SeqCst),
            closes: Arc::clone(&self.closes),
            pending: Vec::new(),
        };
        transport.pending = format!("\r\nWelcome to the lab\r\n{}", transport.prompt()).into_bytes();

        Ok(Box::new(transport))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Cisco,
    Junos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Exec,
    Privileged,
    Config,
}

/// Device side of one connection.
pub struct MockTransport {
    kind: TransportKind,
    line: Arc<Line>,
    style: Style,
    mode: Mode,
    awaiting_secret: bool,
    enable_secret: Option<String>,
    outputs: HashMap<String, String>,
    fail_close: bool,
    closes: Arc<AtomicUsize>,
    pending: Vec<u8>,
}

impl MockTransport {
    fn prompt(&self) -> &'static str {
        match (self.style, self.mode) {
            (Style::Cisco, Mode::Exec) => "router>",
            (Style::Cisco, Mode::Privileged) => "router#",
            (Style::Cisco, Mode::Config) => "router(config)#",
            (Style::Junos, Mode::Config) => "[edit]\r\nadmin@vmx# ",
            (Style::Junos, _) => "admin@vmx> ",
        }
    }

    /// Build the device's answer to one input line.
    fn respond(&mut self, input: &str) {
        if self.awaiting_secret {
            self.awaiting_secret = false;
            let mut out = String::from("\r\n");
            if self.enable_secret.as_deref() == Some(input) {
                self.mode = Mode::Privileged;
            } else {
                out.push_str("% Access denied\r\n");
            }
            out.push_str(self.prompt());
            self.pending.extend_from_slice(out.as_bytes());
            return;
        }

        let mut out = format!("{}\r\n", input);
        let body = match self.style {
            Style::Cisco => self.cisco(input),
            Style::Junos => self.junos(input),
        };
        if let Some(body) = body {
            out.push_str(&body);
            if !self.awaiting_secret {
                out.push_str("\r\n");
            }
        }
        if !self.awaiting_secret {
            out.push_str(self.prompt());
        }
        self.pending.extend_from_slice(out.as_bytes());
    }

    fn cisco(&mut self, input: &str) -> Option<String> {
        const INVALID: &str = "% Invalid input detected at '^' marker.";
        match input {
            "" => None,
            "enable" if self.mode == Mode::Exec => {
                self.awaiting_secret = true;
                Some("Password: ".to_string())
            }
            "enable" => None,
            "disable" => {
                self.mode = Mode::Exec;
                None
            }
            "configure terminal" if self.mode == Mode::Privileged => {
                self.mode = Mode::Config;
                Some("Enter configuration commands, one per line.  End with CNTL/Z.".to_string())
            }
            "configure terminal" => Some(INVALID.to_string()),
            "end" if self.mode == Mode::Config => {
                self.mode = Mode::Privileged;
                None
            }
            cmd if cmd.starts_with("bogus") => Some(INVALID.to_string()),
            cmd if cmd.starts_with("terminal ") => None,
            _ if self.mode == Mode::Config => None,
            cmd => Some(self.output(cmd)),
        }
    }

    fn junos(&mut self, input: &str) -> Option<String> {
        match input {
            "" => None,
            "configure" => {
                self.mode = Mode::Config;
                Some("Entering configuration mode".to_string())
            }
            "exit configuration-mode" => {
                self.mode = Mode::Exec;
                Some("Exiting configuration mode".to_string())
            }
            "commit" => Some("commit complete".to_string()),
            "rollback 0" => Some("load complete".to_string()),
            cmd if cmd.starts_with("bogus") => {
                Some("syntax error, expecting <command>.".to_string())
            }
            cmd if cmd.starts_with("set cli") => None,
            _ if self.mode == Mode::Config => None,
            cmd => Some(self.output(cmd)),
        }
    }

    fn output(&self, command: &str) -> String {
        self.outputs
            .get(command)
            .cloned()
            .unwrap_or_else(|| format!("output of {}", command))
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.line.dead.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        if self.line.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection reset by peer",
            )));
        }

        let text = String::from_utf8_lossy(data);
        let input = text.trim_end_matches(['\r', '\n']).to_string();

        let mut fail_on = self.line.fail_write_of.lock().unwrap();
        if fail_on.as_deref() == Some(input.as_str()) {
            *fail_on = None;
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection reset by peer",
            )));
        }
        drop(fail_on);

        self.line.sent.lock().unwrap().push(input.clone());

        if !self.line.silent.load(Ordering::SeqCst) {
            self.respond(&input);
        }
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.pending.is_empty() {
            let n = self.pending.len().min(CHUNK);
            return Ok(self.pending.drain(..n).collect());
        }
        if self.line.dead.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }

        tokio::time::sleep(timeout).await;
        Err(TransportError::Timeout(timeout))
    }

    fn is_alive(&self) -> bool {
        !self.line.dead.load(Ordering::SeqCst) && !self.line.closed.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.line.closed.store(true, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(TransportError::Io(io::Error::other("close failed")));
        }
        Ok(())
    }
}
