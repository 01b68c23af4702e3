//! `deferlink` - run one match attempt from the command line.
//!
//! ```text
//! deferlink <config.yaml> <signals.json> [--deferred] [--hardware-hash]
//! ```
//!
//! `signals.json` holds a `DeviceSignals` object. The outcome is printed as
//! JSON on stdout; logs go to stderr (`RUST_LOG` filters them,
//! `DEFERLINK_LOG_JSON=1` switches to JSON lines).

use std::error::Error;
use std::fs;
use std::time::Duration;

use deferlink::{
    DeferlinkConfig, DeviceSignals, HttpTransport, MatchClient, MatchOutcome, NoMatchReason,
    generate, hardware_fingerprint_hash, timestamp,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: deferlink <config.yaml> <signals.json> [--deferred] [--hardware-hash]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let (Some(config_path), Some(signals_path)) = (positional.first(), positional.get(1)) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let deferred = args.iter().any(|a| a == "--deferred");
    let hardware_hash = args.iter().any(|a| a == "--hardware-hash");

    let config = DeferlinkConfig::from_file(config_path)?.with_env_overrides()?;
    let mut signals: DeviceSignals = serde_json::from_str(&fs::read_to_string(signals_path)?)?;
    if hardware_hash && signals.hardware_fingerprint.is_none() {
        signals.hardware_fingerprint = Some(hardware_fingerprint_hash(&signals));
    }

    let transport = HttpTransport::new(Duration::from_secs(config.timeout_secs))?;
    let client = MatchClient::new(config, transport);
    let fingerprint = generate(&signals);

    let report = if deferred {
        let resp = client.check_deferred_deep_link(&fingerprint).await?;
        serde_json::to_value(resp)?
    } else {
        match client.request_match(&fingerprint).await? {
            MatchOutcome::Matched(found) => json!({
                "matched": true,
                "deep_link": found.deep_link,
                "confidence_score": found.confidence_score,
                "valid_until": timestamp::format(&found.valid_until),
                "attribution": found.attribution,
                "metadata": found.deeplink.map(|record| record.metadata),
            }),
            MatchOutcome::NoMatch(reason) => json!({
                "matched": false,
                "reason": describe(&reason),
            }),
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe(reason: &NoMatchReason) -> String {
    match reason {
        NoMatchReason::NoDeepLink => "no deep link in response".to_string(),
        NoMatchReason::BelowThreshold { score, threshold } => {
            format!("confidence {score:.3} below threshold {threshold:.3}")
        }
        NoMatchReason::Expired { at } => format!("expired at {}", timestamp::format(at)),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if std::env::var("DEFERLINK_LOG_JSON").is_ok_and(|v| v == "1") {
        builder.json().init();
    } else {
        builder.init();
    }
}
