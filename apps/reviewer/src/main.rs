mod commands;
mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use audit_client::{
    ClientEvent, HttpCollaborator, ManuscriptSelection, RefreshOutcome, ReviewClient,
};
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use commands::{parse_command, Command, HELP};

const STALE_HISTORY_NOTICE: &str =
    "(audit history is unavailable right now; showing the last known list)";

#[derive(Parser, Debug)]
#[command(about = "Terminal client for the manuscript audit service")]
struct Args {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Signs in on startup; requires --password.
    #[arg(long, requires = "password")]
    email: Option<String>,
    #[arg(long, requires = "email")]
    password: Option<String>,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut settings = config::load_settings(&args.config);
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "reviewer: starting");

    let collaborator = HttpCollaborator::new(&settings.server_url, settings.call_policy())
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    let client = ReviewClient::new(Arc::new(collaborator));
    spawn_event_listener(&client);

    if let (Some(email), Some(password)) = (args.email.as_deref(), args.password.as_deref()) {
        login(&client, email, password).await;
    }

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match parse_command(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => run_command(&client, command).await,
            Ok(None) => {}
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;
    Ok(())
}

fn spawn_event_listener(client: &Arc<ReviewClient>) {
    let events = client.subscribe_events();
    tokio::spawn(listen_for_events(events, || {
        println!("\n{STALE_HISTORY_NOTICE}");
    }));
}

/// Runs until the client is dropped. Falling behind skips events but keeps listening.
async fn listen_for_events(
    mut events: broadcast::Receiver<ClientEvent>,
    mut on_history_stale: impl FnMut(),
) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::HistoryStale) => on_history_stale(),
            Ok(event) => debug!(?event, "reviewer: client event"),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "reviewer: event listener fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn login(client: &ReviewClient, email: &str, password: &str) {
    match client.submit_credentials(email, password).await {
        Ok(display_name) => {
            println!("Welcome, {display_name}");
            let snapshot = client.snapshot().await;
            println!("{} past audits on record", snapshot.history.len());
        }
        Err(err) => println!("sign-in failed: {err}"),
    }
}

async fn run_command(client: &Arc<ReviewClient>, command: Command) {
    match command {
        Command::Login { email, password } => login(client, &email, &password).await,
        Command::Select { path } => match read_manuscript(&path).await {
            Ok(selection) => {
                let file_name = selection.file_name().to_string();
                match client.select_file(selection).await {
                    Ok(()) => println!("selected {file_name}"),
                    Err(err) => println!("{err}"),
                }
            }
            Err(err) => println!("{err:#}"),
        },
        Command::Submit => {
            // The analysis may take minutes; the prompt stays usable meanwhile.
            let client = Arc::clone(client);
            tokio::spawn(async move {
                match client.submit().await {
                    Ok(result) => {
                        println!("\naudit complete");
                        print!("{}", render::render_result(&result));
                    }
                    Err(err) => println!("\n{err}"),
                }
            });
            println!("submitted; type 'status' to follow progress");
        }
        Command::Result => match client.current_result().await {
            Some(result) => print!("{}", render::render_result(&result)),
            None => println!("no audit result yet"),
        },
        Command::History => {
            let snapshot = client.snapshot().await;
            print!(
                "{}",
                render::render_history(&snapshot.history, snapshot.history_freshness)
            );
        }
        Command::Trend => {
            let snapshot = client.snapshot().await;
            let summary = snapshot.trend_summary();
            print!("{}", render::render_trend(&snapshot.trend(), summary.as_ref()));
            let daily = snapshot.daily_means();
            if daily.len() > 1 {
                println!("daily means:");
                print!("{}", render::render_trend(&daily, summary.as_ref()));
            }
        }
        Command::Refresh => match client.refresh_history().await {
            Ok(RefreshOutcome::Updated { count }) => println!("history reloaded ({count} audits)"),
            Ok(RefreshOutcome::Stale) => println!("history could not be reloaded"),
            Ok(RefreshOutcome::Discarded | RefreshOutcome::Superseded) => {}
            Err(err) => println!("{err}"),
        },
        Command::Status => print!("{}", render::render_status(&client.snapshot().await)),
        Command::Logout => match client.logout().await {
            Ok(()) => println!("signed out"),
            Err(err) => println!("{err}"),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

async fn read_manuscript(path: &std::path::Path) -> Result<ManuscriptSelection> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("manuscript path has no file name")?
        .to_string();
    let selection = ManuscriptSelection::new(file_name, bytes);
    Ok(match mime_guess::from_path(path).first_raw() {
        Some(mime_type) => selection.with_mime_type(mime_type),
        None => selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_password_must_be_given_together() {
        assert!(Args::try_parse_from(["reviewer", "--email", "a@b.edu"]).is_err());
        assert!(Args::try_parse_from(["reviewer", "--password", "secret123"]).is_err());

        let args = Args::try_parse_from([
            "reviewer",
            "--email",
            "a@b.edu",
            "--password",
            "secret123",
        ])
        .expect("both flags");
        assert_eq!(args.email.as_deref(), Some("a@b.edu"));
        assert_eq!(args.password.as_deref(), Some("secret123"));
    }

    #[tokio::test]
    async fn listener_keeps_running_after_falling_behind() {
        let (tx, rx) = broadcast::channel(1);
        for _ in 0..3 {
            tx.send(ClientEvent::HistoryStale).expect("receiver alive");
        }
        drop(tx);

        let mut stale_notices = 0;
        listen_for_events(rx, || stale_notices += 1).await;

        assert_eq!(stale_notices, 1);
    }
}
