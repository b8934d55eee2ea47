//! `swell health` -- provider health table.
//!
//! Health is tracked in memory per process, so a fresh `swell` shows every
//! configured provider as available until probed. `--probe` checks each
//! configured provider first.
//!
//! # Example
//!
//! ```text
//! swell health
//! swell health --probe
//! swell health --json
//! ```

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL};
use streamwell_llm::ProviderStatus;

use super::{build_client, load_config};

/// Arguments for the `swell health` subcommand.
#[derive(Args)]
pub struct HealthArgs {
    /// Probe every configured provider before printing.
    #[arg(long)]
    pub probe: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Run the health command.
pub async fn run(args: HealthArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).await?;
    let client = build_client(config)?;

    if args.probe {
        for status in client.health_snapshot() {
            if status.configured {
                client.check_health(status.provider).await;
            }
        }
    }

    let snapshot = client.health_snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!("{}", render_table(&snapshot));
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Table view of a health snapshot.
pub fn render_table(snapshot: &[ProviderStatus]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header([
        "PROVIDER",
        "CONFIGURED",
        "AVAILABLE",
        "FAILURES",
        "COOLDOWN",
        "LAST CHECKED",
    ]);

    for status in snapshot {
        let cooldown = if status.in_cooldown {
            format!("{}s", status.cooldown_remaining_ms.div_ceil(1000))
        } else {
            "-".to_string()
        };
        let checked = status
            .last_checked
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        table.add_row([
            status.provider.as_str(),
            yes_no(status.configured),
            yes_no(status.available),
            &status.failures.to_string(),
            &cooldown,
            &checked,
        ]);
    }
    table
}
