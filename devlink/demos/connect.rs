//! Connect to a device through the credential vault and run commands.
//!
//! The credential is resolved from the vault (device, subnet, group, then
//! default). Pass `--user`/`--password` to store a default credential first.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example connect -- --host 192.168.1.50 --type cisco_ios \
//!     --user netop --password netpass --command "show version"
//! ```

use std::env;
use std::sync::Arc;

use devlink::{
    CommandExecutor, CredentialVault, DeviceDescriptor, SessionManager, SessionStatus,
    TransportKind, VaultConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = match &args.vault_dir {
        Some(dir) => VaultConfig::in_dir(dir),
        None => VaultConfig::default_location().ok_or("no per-user config directory")?,
    };
    let vault = CredentialVault::open(config)?;
    println!("Vault: {} ({})", vault.path().display(), vault.mode());

    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        vault.set_default(user, password, args.enable.as_deref())?;
    }

    let manager = Arc::new(SessionManager::builder(Arc::new(vault)).build());
    let executor = CommandExecutor::new(Arc::clone(&manager));

    let mut device = DeviceDescriptor::new(&args.host);
    if let Some(device_type) = &args.device_type {
        device = device.with_device_type(device_type);
    }

    println!("Connecting to {} over {}...", args.host, args.transport);
    let id = manager.connect(&device, args.transport, None).await?;
    for info in manager.list_sessions() {
        println!(
            "Connected: {} as {} ({}, {})",
            info.id, info.username, info.profile, info.state
        );
    }

    for command in &args.commands {
        println!("\n{}\n{}", command, "-".repeat(50));
        match executor.execute_command(&id, command).await {
            Ok(output) => println!("{}", output),
            Err(e) => eprintln!("{}", e),
        }
    }

    if manager.get_status(&id).await == SessionStatus::ConnectionLost {
        eprintln!("\nSession was lost");
    }

    manager.close_all().await;
    println!("\nDone!");
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    host: String,
    device_type: Option<String>,
    transport: TransportKind,
    user: Option<String>,
    password: Option<String>,
    enable: Option<String>,
    vault_dir: Option<String>,
    commands: Vec<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            device_type: None,
            transport: TransportKind::Ssh,
            user: None,
            password: None,
            enable: None,
            vault_dir: None,
            commands: Vec::new(),
        };

        let mut iter = args.into_iter();
        while let Some(flag) = iter.next() {
            match flag.as_str() {
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                "--telnet" => parsed.transport = TransportKind::Telnet,
                _ => {
                    let Some(value) = iter.next() else {
                        eprintln!("Missing value for {}", flag);
                        continue;
                    };
                    match flag.as_str() {
                        "--host" | "-h" => parsed.host = value,
                        "--type" => parsed.device_type = Some(value),
                        "--user" | "-u" => parsed.user = Some(value),
                        "--password" | "-P" => parsed.password = Some(value),
                        "--enable" => parsed.enable = Some(value),
                        "--vault-dir" => parsed.vault_dir = Some(value),
                        "--command" | "-c" => parsed.commands.push(value),
                        _ => eprintln!("Unknown argument: {}", flag),
                    }
                }
            }
        }

        if parsed.commands.is_empty() {
            parsed.commands.push("show version".to_string());
        }
        parsed
    }

    fn print_help() {
        println!(
            r#"devlink connect example

USAGE:
    cargo run --example connect -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Target host [default: localhost]
    --type <TYPE>            Device type (cisco_ios, arista_eos, junos, linux, ...)
    --telnet                 Use Telnet instead of SSH
    -u, --user <USER>        Store this user as the default credential
    -P, --password <PASS>    Password for the default credential
    --enable <SECRET>        Enable secret for the default credential
    --vault-dir <DIR>        Vault directory [default: per-user config dir]
    -c, --command <CMD>      Command to run (repeatable) [default: show version]
    --help                   Print this help message
"#
        );
    }
}
