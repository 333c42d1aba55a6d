//! Track command: polls the presence service for one identity.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pt_core::{Identifier, SnapshotLog, assemble, tracking_period_label};
use pt_remote::PresenceClient;
use pt_sampler::{JsonFileSink, StopReason, Tracker, read_snapshot_log, write_json_atomic};
use tokio_util::sync::CancellationToken;

use crate::commands::report::format_report;
use crate::console::ConsoleSink;
use crate::{Config, TrackArgs};

/// Identifier from the flags, if one was given.
pub fn identifier_from_args(args: &TrackArgs) -> Result<Option<Identifier>> {
    let identifier = match (&args.phone, &args.user_id) {
        (Some(phone), _) => Some(Identifier::phone(phone)?),
        (None, Some(user_id)) => Some(Identifier::user_id(user_id)?),
        (None, None) => None,
    };
    Ok(identifier)
}

/// Converts a `--window-hours` value, rejecting values that overflow.
pub fn window_from_hours(hours: u64) -> Result<Duration> {
    hours
        .checked_mul(3_600)
        .map(Duration::from_secs)
        .with_context(|| format!("tracking window of {hours} hours is too large"))
}

/// Asks for the tracking method and the identifier.
pub fn prompt_identifier<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<Identifier> {
    writeln!(writer, "Choose tracking method:")?;
    writeln!(writer, "1. Phone number")?;
    writeln!(writer, "2. User ID")?;
    let choice = prompt(reader, writer, "Enter choice (1 or 2): ")?;

    let identifier = match choice.as_str() {
        "1" => {
            let phone = prompt(reader, writer, "Enter phone number (with country code): ")?;
            Identifier::phone(&phone)?
        }
        "2" => {
            let user_id = prompt(reader, writer, "Enter user ID: ")?;
            Identifier::user_id(&user_id)?
        }
        other => bail!("invalid choice: {other:?} (expected 1 or 2)"),
    };
    Ok(identifier)
}

fn prompt<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, message: &str) -> Result<String> {
    write!(writer, "{message}")?;
    writer.flush()?;
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        bail!("unexpected end of input");
    }
    Ok(line.trim().to_string())
}

pub fn run<W: Write>(writer: &mut W, args: &TrackArgs, config: &Config) -> Result<()> {
    let identifier = match identifier_from_args(args)? {
        Some(identifier) => identifier,
        None => {
            let stdin = std::io::stdin();
            prompt_identifier(&mut stdin.lock(), writer)?
        }
    };

    let api_token = config
        .api_token()
        .ok_or_else(|| anyhow::anyhow!("missing API token (set PT_API_TOKEN or config.toml)"))?;

    let mut tracker_config = config.tracker_config();
    if let Some(hours) = args.window_hours {
        tracker_config.window = window_from_hours(hours)?;
    }
    if let Some(secs) = args.interval_secs {
        tracker_config.poll_interval = Duration::from_secs(secs);
    }
    let window =
        chrono::Duration::from_std(tracker_config.window).context("tracking window too large")?;

    let mut log = if args.resume {
        read_snapshot_log(&config.snapshot_log_path).with_context(|| {
            format!(
                "failed to read snapshot log {}",
                config.snapshot_log_path.display()
            )
        })?
    } else {
        SnapshotLog::new()
    };

    let client = PresenceClient::new(
        config.service_url.as_str(),
        api_token,
        tracker_config.resolve_timeout,
    )
    .context("failed to create presence client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;

    let account = runtime
        .block_on(client.open())
        .context("failed to authenticate with presence service")?;
    tracing::info!(account_id = account.id, "authenticated");

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            ctrl_c.cancel();
        }
    });

    writeln!(
        writer,
        "Starting tracking for {identifier} ({} window, polling every {}s)",
        tracking_period_label(window),
        tracker_config.poll_interval.as_secs()
    )?;
    writeln!(writer, "Press Ctrl+C to stop tracking early")?;
    writeln!(writer)?;

    let tracker = Tracker::new(&client, tracker_config);
    let mut sink = ConsoleSink::new(
        JsonFileSink::new(&config.snapshot_log_path),
        std::io::stdout(),
    );
    let outcome = runtime.block_on(tracker.run(&identifier, &mut log, &mut sink, &cancel));

    if let Err(e) = runtime.block_on(client.close()) {
        tracing::warn!(error = %e, "failed to close presence session");
    }
    cancel.cancel();

    if outcome.stop == StopReason::Cancelled {
        writeln!(writer, "Tracking stopped by user")?;
    }

    let report_window = outcome.observed_window(window);
    let report = assemble(log.as_slice(), &outcome.reconstruction, report_window);
    write_json_atomic(&config.report_path, &report).with_context(|| {
        format!("failed to write report {}", config.report_path.display())
    })?;

    writeln!(writer)?;
    write!(writer, "{}", format_report(&report))?;
    writeln!(writer)?;
    writeln!(writer, "Snapshots saved to {}", config.snapshot_log_path.display())?;
    writeln!(writer, "Report saved to {}", config.report_path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    #[test]
    fn prompt_phone_choice() {
        let mut input = Cursor::new("1\n+1 (555) 010-2000\n");
        let mut output = Vec::new();
        let identifier = prompt_identifier(&mut input, &mut output).unwrap();

        assert_eq!(identifier, Identifier::Phone("+15550102000".to_string()));
        let output = String::from_utf8(output).unwrap();
        assert!(output.starts_with("Choose tracking method:\n1. Phone number\n2. User ID\n"));
        assert!(output.contains("Enter phone number"));
    }

    #[test]
    fn prompt_user_id_choice() {
        let mut input = Cursor::new("2\n 123456 \n");
        let mut output = Vec::new();
        let identifier = prompt_identifier(&mut input, &mut output).unwrap();
        assert_eq!(identifier, Identifier::UserId(123_456));
    }

    #[test]
    fn prompt_rejects_other_choice() {
        let mut input = Cursor::new("3\n");
        let err = prompt_identifier(&mut input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("invalid choice"));
    }

    #[test]
    fn prompt_rejects_non_numeric_user_id() {
        let mut input = Cursor::new("2\nabc\n");
        let err = prompt_identifier(&mut input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("invalid user ID"));
    }

    #[test]
    fn prompt_fails_on_eof() {
        let mut input = Cursor::new("");
        let err = prompt_identifier(&mut input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("end of input"));
    }

    #[test]
    fn args_identifier_prefers_flags() {
        let args = TrackArgs {
            user_id: Some("42".to_string()),
            ..TrackArgs::default()
        };
        assert_eq!(
            identifier_from_args(&args).unwrap(),
            Some(Identifier::UserId(42))
        );
        assert_eq!(identifier_from_args(&TrackArgs::default()).unwrap(), None);
    }

    #[test]
    fn window_hours_overflow_is_an_error() {
        assert_eq!(window_from_hours(48).unwrap(), Duration::from_secs(172_800));
        let err = window_from_hours(u64::MAX).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn run_rejects_overflowing_window() {
        let args = TrackArgs {
            user_id: Some("42".to_string()),
            window_hours: Some(u64::MAX),
            ..TrackArgs::default()
        };
        let config = Config {
            api_token: Some("token".to_string()),
            ..Config::default()
        };
        let err = run(&mut Vec::new(), &args, &config).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn run_requires_token() {
        let args = TrackArgs {
            user_id: Some("42".to_string()),
            ..TrackArgs::default()
        };
        let config = Config {
            api_token: None,
            ..Config::default()
        };
        let err = run(&mut Vec::new(), &args, &config).unwrap_err();
        assert!(err.to_string().contains("missing API token"));
    }
}
