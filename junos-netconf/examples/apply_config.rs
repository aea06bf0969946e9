//! Apply-config example
//!
//! Runs one full configuration transaction against a Junos device:
//! connect, lock the candidate, load set/delete lines from stdin, commit
//! (confirmed when --confirm is given), then clear + unlock and close.
//!
//! # Usage
//!
//! ```bash
//! # Plain commit
//! echo "set system host-name fw0" | \
//!     cargo run --example apply_config -- --host fw0 --user admin --password secret
//!
//! # Confirmed commit with a 120 second device-side rollback window
//! cargo run --example apply_config -- --host fw0 --user admin --password secret --confirm 120
//!
//! # No device at all: capture the lines to a local file instead
//! cargo run --example apply_config -- --capture /tmp/fw0.conf
//! ```

use std::env;
use std::io::BufRead;

use junos_netconf::{CancelToken, Client, ClientConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let lines: Vec<String> = std::io::stdin()
        .lock()
        .lines()
        .collect::<Result<_, _>>()?;
    if lines.is_empty() {
        eprintln!("No configuration lines on stdin");
        std::process::exit(1);
    }

    let mut config = ClientConfig::new(args.host.clone().unwrap_or_default());
    if let Some(user) = &args.user {
        config.connect.username = user.clone();
    }
    if let Some(password) = args.password {
        config.connect.auth.password = Some(password.into());
    } else {
        config.connect.auth.use_agent = true;
    }
    if let Some(secs) = args.confirm {
        config.commit.confirm_timeout_secs = secs;
    }
    config.capture_file = args.capture.map(Into::into);

    let mut client = Client::new(config)?;
    let mut cancel = CancelToken::never();

    if args.host.is_some() {
        println!("Connecting...");
        client.open(&mut cancel).await?;
        if let Some(facts) = client.facts() {
            println!("Connected to {}", facts.summary());
        }
    }

    client.config_lock(&mut cancel).await?;

    let outcome = async {
        if let Some(rejected) = client.config_set(&lines).await? {
            eprintln!("Device rejected lines: {rejected}");
        }
        client.commit("apply_config example").await
    }
    .await;

    for failure in client.config_clear().await {
        eprintln!("cleanup: {failure}");
    }
    client.close().await?;

    match outcome {
        Ok(warnings) => {
            for warning in warnings {
                println!("warning: {warning}");
            }
            println!("Committed {} lines", lines.len());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

struct Args {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    confirm: Option<u16>,
    capture: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = Args {
            host: None,
            user: None,
            password: None,
            confirm: None,
            capture: None,
        };

        let mut iter = env::args().skip(1);
        while let Some(flag) = iter.next() {
            let mut value = || iter.next().unwrap_or_default();
            match flag.as_str() {
                "--host" => args.host = Some(value()),
                "--user" => args.user = Some(value()),
                "--password" => args.password = Some(value()),
                "--confirm" => args.confirm = value().parse().ok(),
                "--capture" => args.capture = Some(value()),
                other => {
                    eprintln!("Unknown flag: {other}");
                    std::process::exit(1);
                }
            }
        }

        if args.host.is_none() && args.capture.is_none() {
            eprintln!("Provide --host (live device) or --capture (fake mode)");
            std::process::exit(1);
        }
        args
    }
}
