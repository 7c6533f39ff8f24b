//! contestwatch - upcoming programming contests and reminders from the terminal.
//!
//! Thin front end over `contestwatch-core`: every command builds one
//! `AppContext`, calls into it, and prints the result.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contestwatch_core::fetch::orchestrator::DEFAULT_LIMIT;
use contestwatch_core::utils::{format_countdown, now_in_display_tz, truncate_string, Urgency};
use contestwatch_core::{
    AppContext, Config, Contest, FetchOptions, LogNotifier, NotificationSink, RefreshRequest, SweepOutcome,
};

/// Width of the event column in `list` output
const EVENT_COLUMN_WIDTH: usize = 48;

#[derive(Parser)]
#[command(name = "contestwatch", version, about = "Upcoming programming contests and reminders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List upcoming contests
    List {
        /// Platform domain to include (repeatable); defaults to the configured platforms
        #[arg(long = "platform", value_name = "DOMAIN")]
        platforms: Vec<String>,
        /// Ignore valid cached data and fetch from the API
        #[arg(long, conflicts_with = "offline")]
        refresh: bool,
        /// Use cached data only, even if expired
        #[arg(long)]
        offline: bool,
        /// Contests requested per platform
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,
    },
    /// Show the supported platforms
    Platforms,
    /// Refresh cached contest data in the background and wait for it
    Sync {
        /// Refetch platforms whose cache is still valid
        #[arg(long)]
        force: bool,
    },
    /// Show when each platform was last synced
    Status,
    /// Manage contest reminders
    Remind {
        #[command(subcommand)]
        action: RemindAction,
    },
    /// Run the reminder monitor until Ctrl-C
    Watch,
    /// Delete cached contest data for one platform, or all of them
    ClearCache {
        /// Platform domain; omit to clear everything
        platform: Option<String>,
    },
    /// Send a test notification
    TestNotify,
}

#[derive(Subcommand)]
enum RemindAction {
    /// Set a reminder for a cached contest
    Add { id: String },
    /// Remove a reminder
    Remove { id: String },
    /// Show reminders with countdowns
    List,
}

/// Notification sink that prints to stdout.
struct StdoutNotifier;

impl NotificationSink for StdoutNotifier {
    fn send(&self, title: &str, text: &str) -> bool {
        println!("\n🔔 {}\n   {}", title, text);
        true
    }
}

/// Initialize the tracing subscriber for logging.
///
/// With `log_dir`, a daily-rolling file log is added next to stderr and the
/// default level drops to `info`. The returned guard must stay alive for the
/// file writer to flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default_level = if log_dir.is_some() { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "contestwatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;

    let log_dir = match cli.command {
        Command::Watch => Some(config.log_dir()?),
        _ => None,
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!("contestwatch starting");

    // Detached (e.g. `watch` under a service manager): notifications go to the log
    let sink: Arc<dyn NotificationSink> = if io::stdout().is_terminal() {
        Arc::new(StdoutNotifier)
    } else {
        Arc::new(LogNotifier)
    };
    let ctx = AppContext::new(config, sink)?;

    match cli.command {
        Command::List {
            platforms,
            refresh,
            offline,
            limit,
        } => list(&ctx, platforms, refresh, offline, limit).await,
        Command::Platforms => {
            for p in ctx.available_platforms() {
                println!("{:<16} {}", p.domain, p.name);
            }
            Ok(())
        }
        Command::Sync { force } => sync(&ctx, force).await,
        Command::Status => {
            status(&ctx);
            Ok(())
        }
        Command::Remind { action } => remind(&ctx, action).await,
        Command::Watch => watch(&ctx).await,
        Command::ClearCache { platform } => {
            ctx.clear_cache(platform.as_deref());
            match platform {
                Some(p) => println!("Cleared cache for {}", p),
                None => println!("Cleared all cached contest data"),
            }
            Ok(())
        }
        Command::TestNotify => {
            if !ctx.send_test_notification() {
                bail!("Notification could not be sent");
            }
            Ok(())
        }
    }
}

async fn list(ctx: &AppContext, platforms: Vec<String>, refresh: bool, offline: bool, limit: u32) -> Result<()> {
    let mut options = FetchOptions::default().with_limit(limit);
    if !platforms.is_empty() {
        options.platforms = Some(platforms);
    }
    if refresh {
        options = options.forced();
    }
    if offline {
        options = options.cache_only();
    }

    let contests = ctx.upcoming_contests(&options).await;
    if contests.is_empty() {
        println!("No upcoming contests found.");
        return Ok(());
    }

    for contest in &contests {
        print_contest(ctx, contest);
    }
    println!("\n{} contests. Last synced: {}", contests.len(), ctx.last_synced());
    Ok(())
}

fn print_contest(ctx: &AppContext, contest: &Contest) {
    let marker = if ctx.is_reminder_set(&contest.id) { "*" } else { " " };
    println!(
        "{} {:<26} {:<11} {:<width$} {:>8}  [{}]",
        marker,
        contest.start_datetime.as_deref().unwrap_or_default(),
        contest.platform_display_name,
        truncate_string(&contest.event, EVENT_COLUMN_WIDTH),
        contest.duration_display(),
        contest.id,
        width = EVENT_COLUMN_WIDTH,
    );
}

async fn sync(ctx: &AppContext, force: bool) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    let on_complete = move |outcome: SweepOutcome| {
        let _ = tx.send(outcome);
    };

    if force {
        ctx.start_sync(true, on_complete);
    } else if ctx.request_refresh(on_complete) == RefreshRequest::CacheStillValid {
        println!("Cache is still valid. Use --force to refresh anyway.");
        return Ok(());
    }

    match rx.await? {
        SweepOutcome::Refreshed(platforms) => println!("Refreshed: {}", platforms.join(", ")),
        SweepOutcome::Unavailable(platforms) => {
            bail!("Could not reach the contest API for {}; cached data kept", platforms.join(", "))
        }
        SweepOutcome::UpToDate => println!("Everything is up to date."),
        SweepOutcome::Rejected => println!("A sync is already in progress."),
        SweepOutcome::Failed(message) => bail!("Sync failed: {}", message),
    }
    Ok(())
}

fn status(ctx: &AppContext) {
    for platform in ctx.platforms() {
        let state = if ctx.can_refresh(platform) { "expired" } else { "valid" };
        let age = ctx
            .cache()
            .age_display(platform)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} {:<20} {:<10} {}",
            platform,
            ctx.last_refresh_display(platform),
            age,
            state
        );
    }
    println!("\nLast synced: {}", ctx.last_synced());
}

async fn remind(ctx: &AppContext, action: RemindAction) -> Result<()> {
    match action {
        RemindAction::Add { id } => {
            let Some(contest) = ctx.find_cached_contest(&id).await else {
                bail!("Contest {} not found in cached data. Run `contestwatch list` first.", id);
            };
            if !ctx.add_reminder(&contest) {
                bail!("Could not set a reminder for {}", contest.event);
            }
            println!("Reminder set for {} ({})", contest.event, contest.platform_display_name);
        }
        RemindAction::Remove { id } => {
            if ctx.remove_reminder(&id) {
                println!("Reminder removed");
            } else {
                println!("No reminder set for {}", id);
            }
        }
        RemindAction::List => {
            let reminders = ctx.reminders();
            if reminders.is_empty() {
                println!("No reminders set.");
            }
            let now = now_in_display_tz();
            for reminder in reminders {
                let countdown = match reminder.seconds_until_notification(now) {
                    Some(seconds) => {
                        let tag = match Urgency::from_seconds(seconds) {
                            Urgency::Due => "!",
                            Urgency::Soon => "~",
                            Urgency::Later => " ",
                        };
                        format!("{} {}", tag, format_countdown(seconds))
                    }
                    None => "? invalid time".to_string(),
                };
                let sent = if reminder.notified { " (sent)" } else { "" };
                println!(
                    "{:<22} {:<11} {}{}  [{}]",
                    countdown, reminder.platform, reminder.event, sent, reminder.id
                );
            }
        }
    }
    Ok(())
}

async fn watch(ctx: &AppContext) -> Result<()> {
    ctx.start_reminder_monitor();
    println!(
        "Watching {} reminder(s). Press Ctrl-C to stop.",
        ctx.reminders().len()
    );
    tokio::signal::ctrl_c().await?;
    info!("contestwatch shutting down");
    Ok(())
}
