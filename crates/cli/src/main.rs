//! CLI for the Beacon emergency contact notifier.
//!
//! Pipeline: load contacts -> snapshot directory -> resolve + check -> fan out -> report.

mod config;

use beacon_core::{BeaconError, Contact, TriggerContext};
use beacon_dispatch::sink::json_stream::JsonStreamSink;
use beacon_dispatch::{Dispatcher, Report};
use beacon_provider::{
    AccountDirectory, ContactStore, ExpoPushGateway, JsonFileContactStore, JsonFileDirectory,
    LogGateway, PushGateway,
};
use clap::{Parser, Subcommand};
use config::BeaconConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "beacon", version, about = "Notify your emergency contacts")]
struct Cli {
    /// TOML config file. Missing file means defaults.
    #[arg(short, long, env = "BEACON_CONFIG", default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Light the beacon: push a notification to every reachable contact.
    Trigger {
        #[arg(short, long, env = "BEACON_USER")]
        user: String,

        /// Name shown in the notification body, usually your email.
        #[arg(short, long, env = "BEACON_FROM")]
        from: String,

        /// Log messages instead of sending them.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        #[arg(long, default_value_t = false)]
        json: bool,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<String>,

        /// Max in-flight pushes (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-push timeout in milliseconds (overrides config).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Manage saved contacts.
    Contacts {
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Manage account records in the local directory.
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand, Debug)]
enum ContactAction {
    List {
        #[arg(short, long, env = "BEACON_USER")]
        user: String,
    },
    Add {
        #[arg(short, long, env = "BEACON_USER")]
        user: String,
        #[arg(short, long)]
        name: String,
        /// Email address or phone number.
        #[arg(short, long)]
        value: String,
    },
    Remove {
        #[arg(short, long, env = "BEACON_USER")]
        user: String,
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum AccountAction {
    /// Save a device push token for an account (creates the account if needed).
    RegisterToken {
        #[arg(short, long)]
        account: String,
        #[arg(short, long)]
        token: String,
    },
    /// Stop receiving beacon notifications.
    OptOut {
        #[arg(short, long)]
        account: String,
    },
    OptIn {
        #[arg(short, long)]
        account: String,
    },
    Show {
        #[arg(short, long)]
        account: String,
    },
}

/// Where `--sink` sends NDJSON rows.
#[derive(Debug, PartialEq)]
enum SinkTarget {
    Stdout,
    File(PathBuf),
}

impl SinkTarget {
    fn parse(spec: &str) -> Result<Self, BeaconError> {
        if spec == "ndjson" {
            return Ok(Self::Stdout);
        }
        match spec.strip_prefix("ndjson:") {
            Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
            _ => Err(BeaconError::InvalidInput(format!(
                "unknown sink {spec:?}, use 'ndjson' or 'ndjson:/path'"
            ))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = BeaconConfig::load(&cli.config)?;

    match cli.command {
        Commands::Trigger {
            user,
            from,
            dry_run,
            json,
            sink,
            concurrency,
            timeout_ms,
        } => {
            if let Some(n) = concurrency {
                cfg.dispatch.max_concurrent = n;
            }
            if let Some(ms) = timeout_ms {
                cfg.dispatch.timeout_ms = ms;
            }
            cfg.validate()?;
            let sink = sink.as_deref().map(SinkTarget::parse).transpose()?;

            let t0 = Instant::now();
            let ctx = TriggerContext::new(user, from);

            tracing::info!(user_id = %ctx.user_id, dry_run, "starting trigger");

            // 1. Collaborators.
            let contacts = JsonFileContactStore::new(cfg.contacts_path());
            let directory = JsonFileDirectory::new(cfg.accounts_path());
            let gateway: Arc<dyn PushGateway> = if dry_run {
                Arc::new(LogGateway::new())
            } else {
                let mut expo =
                    ExpoPushGateway::new(&cfg.gateway.endpoint, cfg.dispatch.timeout())?;
                if let Some(token) = &cfg.gateway.access_token {
                    expo = expo.with_access_token(token.clone());
                }
                Arc::new(expo)
            };

            // 2. Resolve + fan out.
            let dispatcher = Dispatcher::new(gateway, cfg.dispatch.clone())?;
            let outcome =
                beacon_dispatch::trigger(&ctx, &contacts, &directory, &dispatcher).await?;
            let elapsed = t0.elapsed();

            tracing::info!(
                delivered = outcome.delivered_count(),
                unreachable = outcome.unreachable_count(),
                elapsed_ms = elapsed.as_millis(),
                "trigger complete"
            );

            // 3. Report.
            let report = Report::build(&ctx, &outcome, elapsed);

            // 4. Sink output.
            if let Some(target) = sink {
                let (summary, attempts) = report.to_rows(&outcome);

                match target {
                    SinkTarget::Stdout => {
                        let mut s = JsonStreamSink::stdout();
                        s.write_summary(&summary)?;
                        s.write_attempts(&attempts)?;
                        let n = s.finish()?;
                        tracing::info!(rows = n, "ndjson sink: wrote to stdout");
                    }
                    SinkTarget::File(path) => {
                        let file = std::fs::File::create(&path)?;
                        let mut s = JsonStreamSink::new(file);
                        s.write_summary(&summary)?;
                        s.write_attempts(&attempts)?;
                        let n = s.finish()?;
                        tracing::info!(rows = n, path = %path.display(), "ndjson sink: wrote to file");
                    }
                }

                // Still print report to stderr so it's visible.
                eprint!("{}", report.render());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!("{}", report.render());
            }
        }

        Commands::Contacts { action } => {
            let store = JsonFileContactStore::new(cfg.contacts_path());
            match action {
                ContactAction::List { user } => {
                    for c in store.list(&user).await? {
                        println!(
                            "{}  {:<20} {} ({})",
                            c.id, c.name, c.identifier_value, c.identifier_kind
                        );
                    }
                }
                ContactAction::Add { user, name, value } => {
                    let contact = Contact::new(&name, &value)?;
                    let id = contact.id.clone();
                    store.add(&user, contact).await?;
                    println!("{id}");
                }
                ContactAction::Remove { user, id } => {
                    let removed = store.remove(&user, &id).await?;
                    println!("removed {}", removed.name);
                }
            }
        }

        Commands::Accounts { action } => {
            let directory = JsonFileDirectory::new(cfg.accounts_path());
            match action {
                AccountAction::RegisterToken { account, token } => {
                    directory.register_push_token(&account, &token).await?;
                }
                AccountAction::OptOut { account } => {
                    directory.set_notifications_enabled(&account, false).await?;
                }
                AccountAction::OptIn { account } => {
                    directory.set_notifications_enabled(&account, true).await?;
                }
                AccountAction::Show { account } => {
                    let record = directory
                        .lookup_by_id(&account)
                        .await?
                        .ok_or_else(|| BeaconError::NotFound(format!("account {account}")))?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_trigger_flags() {
        let cli = Cli::try_parse_from([
            "beacon",
            "trigger",
            "--user",
            "me",
            "--from",
            "me@x.com",
            "--dry-run",
            "--concurrency",
            "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Trigger {
                user,
                dry_run,
                concurrency,
                ..
            } => {
                assert_eq!(user, "me");
                assert!(dry_run);
                assert_eq!(concurrency, Some(4));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn sink_spec_parsing() {
        assert_eq!(SinkTarget::parse("ndjson").unwrap(), SinkTarget::Stdout);
        assert_eq!(
            SinkTarget::parse("ndjson:/tmp/out.ndjson").unwrap(),
            SinkTarget::File(PathBuf::from("/tmp/out.ndjson"))
        );
        for bad in ["csv", "ndjson:", "starrocks:http://x"] {
            assert!(
                matches!(SinkTarget::parse(bad), Err(BeaconError::InvalidInput(_))),
                "{bad}"
            );
        }
    }

    #[tokio::test]
    async fn dry_run_trigger_over_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BeaconConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let contacts = JsonFileContactStore::new(cfg.contacts_path());
        contacts
            .add("me", Contact::new("Alice", "alice@x.com").unwrap())
            .await
            .unwrap();
        contacts
            .add("me", Contact::new("Bob", "555-1234").unwrap())
            .await
            .unwrap();

        let directory = JsonFileDirectory::new(cfg.accounts_path());
        directory
            .upsert(beacon_core::AccountRecord::new("alice").with_email("alice@x.com"))
            .await
            .unwrap();
        directory
            .register_push_token("alice", "ExponentPushToken[a]")
            .await
            .unwrap();

        let gateway = Arc::new(LogGateway::new());
        let dispatcher = Dispatcher::new(gateway.clone(), cfg.dispatch.clone()).unwrap();
        let ctx = TriggerContext::new("me", "me@x.com");
        let outcome = beacon_dispatch::trigger(&ctx, &contacts, &directory, &dispatcher)
            .await
            .unwrap();

        assert_eq!(outcome.delivered_count(), 1);
        assert_eq!(outcome.unreachable_count(), 1);
        assert_eq!(gateway.sent(), 1);
    }
}
