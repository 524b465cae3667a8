//! propwatch CLI
//!
//! HF propagation and on-air activity at a glance.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use propwatch_core::{Activation, Ranked};
use propwatch_fetch::{CircuitState, SourceHealth};
use propwatch_runtime::{AppConfig, Dashboard, PropagationHub};

#[derive(Parser)]
#[command(name = "propwatch")]
#[command(author, version, about = "propwatch: HF propagation and activity aggregator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long, env = "PROPWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (0-3); RUST_LOG overrides when set
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source once and print the dashboard
    Snapshot {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Keep sources refreshing and reprint the dashboard periodically
    Watch {
        /// Seconds between dashboard prints
        #[arg(short, long, default_value = "60")]
        interval: u64,

        /// Stop after this many seconds (0 = until Ctrl-C)
        #[arg(short, long, default_value = "0")]
        duration: u64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fetch every source once and report source health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let hub = PropagationHub::from_config(&config)?;

    match cli.command {
        Commands::Snapshot { json } => {
            hub.refresh_all().await;
            print_dashboard(&hub.dashboard(), json)?;
        }
        Commands::Watch {
            interval,
            duration,
            json,
        } => {
            run_watch(&hub, interval, duration, json).await?;
        }
        Commands::Status => {
            hub.refresh_all().await;
            print_status(&hub.health());
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    // Logs go to stderr so `--json` output stays parseable
    if std::env::var_os("RUST_LOG").is_some() {
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
        return;
    }

    let log_level = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

async fn run_watch(hub: &PropagationHub, interval_secs: u64, duration_secs: u64, json: bool) -> Result<()> {
    let schedulers = hub.spawn_schedulers();
    info!("Watching {} sources", schedulers.len());

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let deadline = (duration_secs > 0).then(|| tokio::time::Instant::now() + Duration::from_secs(duration_secs));

    // Give the first refresh round a moment before the first print
    tokio::time::sleep(Duration::from_secs(2)).await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = print_dashboard(&hub.dashboard(), json) {
                    error!("Failed to render dashboard: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = sleep_until(deadline) => {
                info!("Watch duration reached");
                break;
            }
        }
    }

    for handle in schedulers {
        handle.abort();
    }

    Ok(())
}

async fn sleep_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn print_dashboard(dashboard: &Dashboard, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(dashboard)?);
        return Ok(());
    }

    let now = dashboard.generated_at;
    println!("📡 propwatch @ {}\n", now.format("%Y-%m-%d %H:%M UTC"));

    match &dashboard.solar {
        Some(solar) => {
            let reading = &solar.reading.item;
            println!(
                "☀️  Solar ({}){}",
                reading.source(),
                stale_marker(solar.provenance.stale)
            );
            println!(
                "   SFI {:.0} ({}) | K {:.1} ({}) | A {:.0} | SSN {}   score {}{}",
                reading.solar_flux(),
                solar.solar_flux_level,
                reading.k_index(),
                solar.geomagnetic_activity,
                reading.a_index(),
                reading.sunspot_number().map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                solar.reading.score,
                star(solar.reading.favorable)
            );
        }
        None => println!("☀️  Solar: no data"),
    }

    println!("\n📻 Bands{}", stale_marker(dashboard.bands.provenance.stale));
    if dashboard.bands.items.is_empty() {
        println!("   no data");
    }
    for ranked in &dashboard.bands.items {
        let band = &ranked.item;
        println!(
            "   {:<9} {:<6} {:<8} {:>3}{}",
            band.band(),
            band.notes().unwrap_or(""),
            band.rating(),
            ranked.score,
            star(ranked.favorable)
        );
    }

    let activations = &dashboard.activations;
    println!(
        "\n🏔️  Activations: {} (POTA {}, SOTA {})   score {}{}{}",
        activations.total,
        activations.pota,
        activations.sota,
        activations.score,
        star(activations.favorable),
        stale_marker(activations.provenance.stale)
    );
    for ranked in activations.top.iter().take(10) {
        println!("   {}", activation_line(ranked, now));
    }

    println!("\n☄️  Meteor showers");
    for ranked in &dashboard.meteor_showers.items {
        let shower = &ranked.item;
        println!(
            "   {:<26} {:<8} ZHR {:>3}  peak {}  {:>3}{}",
            format!("{} ({})", shower.name(), shower.code()),
            shower.status(now),
            shower.peak_zhr(),
            relative(shower.time_to_peak(now)),
            ranked.score,
            star(ranked.favorable)
        );
    }

    println!("\n🏆 Contests");
    for ranked in &dashboard.contests.items {
        let contest = &ranked.item;
        println!(
            "   {:<36} {:<8} {}  {:>3}{}",
            contest.name(),
            contest.status(now),
            contest.start().format("%b %d %H%MZ"),
            ranked.score,
            star(ranked.favorable)
        );
    }

    println!();
    print_status(&dashboard.sources);
    println!();

    Ok(())
}

fn print_status(sources: &[SourceHealth]) {
    println!("🔌 Sources");
    for health in sources {
        let icon = match (health.last_success_at, health.breaker) {
            (None, _) => "❌",
            (_, CircuitState::Open) => "⛔",
            _ if health.is_stale || health.serving_stale => "⚠️ ",
            _ => "✅",
        };
        let age = health
            .data_age_secs
            .map(|secs| format!("{} old", compact_duration(secs)))
            .unwrap_or_else(|| "never fetched".to_string());

        println!(
            "   {} {:<10} {:<24} breaker {:<9} {}  (every {})",
            icon,
            health.name,
            health.source_label,
            health.breaker,
            age,
            compact_duration(health.refresh_interval_secs as i64)
        );
    }
}

fn activation_line(ranked: &Ranked<Activation>, now: DateTime<Utc>) -> String {
    let activation = &ranked.item;
    let age = activation
        .spot_age_minutes(now)
        .map(|m| format!("{}m ago", m.max(0.0).round()))
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{:<10} {:>9.1} kHz {:<5} {:<12} {:<24} {:>8}  {:>3}{}",
        activation.callsign(),
        activation.frequency_khz(),
        activation.mode(),
        activation.location().reference(),
        truncate(activation.location().name(), 24),
        age,
        ranked.score,
        star(ranked.favorable)
    )
}

fn star(favorable: bool) -> &'static str {
    if favorable {
        " ★"
    } else {
        ""
    }
}

fn stale_marker(stale: bool) -> &'static str {
    if stale {
        " (stale)"
    } else {
        ""
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// "3d 4h", "2h 5m", "45m", "30s"
fn compact_duration(secs: i64) -> String {
    let secs = secs.abs();
    let (d, h, m) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    match (d, h, m) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m", m),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}

fn relative(delta: chrono::Duration) -> String {
    let secs = delta.num_seconds();
    if secs >= 0 {
        format!("in {}", compact_duration(secs))
    } else {
        format!("{} ago", compact_duration(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_duration() {
        assert_eq!(compact_duration(30), "30s");
        assert_eq!(compact_duration(45 * 60), "45m");
        assert_eq!(compact_duration(2 * 3600 + 5 * 60), "2h 5m");
        assert_eq!(compact_duration(3 * 86_400 + 4 * 3600 + 59), "3d 4h");
        assert_eq!(compact_duration(-90), "1m");
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative(chrono::Duration::hours(5)), "in 5h 0m");
        assert_eq!(relative(chrono::Duration::minutes(-10)), "10m ago");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Mount Si", 24), "Mount Si");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["propwatch", "-v", "2", "watch", "--interval", "30", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Watch {
                interval: 30,
                duration: 0,
                json: true
            }
        ));

        let cli = Cli::try_parse_from(["propwatch", "--config", "propwatch.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("propwatch.toml")));
    }
}
