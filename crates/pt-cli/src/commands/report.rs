//! Report command and the human-readable report layout.
//!
//! `pt report` rebuilds the end-of-run summary from a persisted snapshot log,
//! so a run that was killed without reaching its report can still be summarized.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use pt_core::{Report, assemble, format_elapsed, reconstruct};
use pt_sampler::read_snapshot_log;

use crate::commands::track::window_from_hours;
use crate::{Config, ReportArgs};

const RULE: &str = "==================================================";

/// Renders the report for the terminal.
pub fn format_report(report: &Report) -> String {
    let mut output = String::new();

    writeln!(output, "{RULE}").unwrap();
    writeln!(output, "{}", report_title(report.window_seconds)).unwrap();
    writeln!(output, "{RULE}").unwrap();

    if report.total_data_points == 0 {
        writeln!(output, "No data collected.").unwrap();
        return output;
    }

    writeln!(output, "Total data points: {}", report.total_data_points).unwrap();
    writeln!(
        output,
        "Online sessions detected: {}",
        report.online_sessions_count
    )
    .unwrap();

    for (i, session) in report.online_sessions.iter().enumerate() {
        writeln!(output).unwrap();
        writeln!(output, "Session {}:", i + 1).unwrap();
        writeln!(
            output,
            "  Start: {}",
            session.start.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .unwrap();
        writeln!(
            output,
            "  End: {}",
            session.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
        .unwrap();
        writeln!(
            output,
            "  Duration: {}",
            format_elapsed(seconds_to_duration(session.duration_seconds))
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(
        output,
        "Total online time: {}",
        format_elapsed(seconds_to_duration(report.total_online_time_seconds))
    )
    .unwrap();
    writeln!(
        output,
        "Percentage of time online: {:.2}%",
        report.percent_online
    )
    .unwrap();

    output
}

/// Renders the report as pretty JSON, the same shape as the persisted file.
pub fn format_report_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

fn report_title(window_seconds: i64) -> String {
    if window_seconds > 0 && window_seconds % 3_600 == 0 {
        format!("{}-HOUR TRACKING REPORT", window_seconds / 3_600)
    } else {
        format!("{window_seconds}-SECOND TRACKING REPORT")
    }
}

#[allow(clippy::cast_possible_truncation)]
fn seconds_to_duration(secs: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}

/// Builds the report for `args` and writes it to `writer`.
pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, config: &Config) -> Result<()> {
    let path = args
        .log
        .clone()
        .unwrap_or_else(|| config.snapshot_log_path.clone());
    let log = read_snapshot_log(&path)
        .with_context(|| format!("failed to read snapshot log {}", path.display()))?;

    let window = match args.window_hours {
        Some(hours) => window_from_hours(hours)?,
        None => config.window(),
    };
    let window = chrono::Duration::from_std(window).context("tracking window too large")?;

    let reconstruction = reconstruct(log.as_slice());
    let report = assemble(log.as_slice(), &reconstruction, window);
    tracing::debug!(
        path = %path.display(),
        snapshots = report.total_data_points,
        sessions = report.online_sessions_count,
        "report rebuilt"
    );

    if args.json {
        writeln!(writer, "{}", format_report_json(&report)?)?;
    } else {
        write!(writer, "{}", format_report(&report))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use insta::assert_snapshot;
    use pt_core::{Identity, Presence, Snapshot};

    fn snap(minutes: i64, online: bool) -> Snapshot {
        Snapshot {
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minutes),
            identity: Identity::default(),
            presence: if online {
                Presence::Online { since: None }
            } else {
                Presence::LastSeenRecently
            },
        }
    }

    fn report_for(snapshots: &[Snapshot], window: chrono::Duration) -> Report {
        assemble(snapshots, &reconstruct(snapshots), window)
    }

    #[test]
    fn test_format_report_with_sessions() {
        let snapshots = [
            snap(0, false),
            snap(5, true),
            snap(10, true),
            snap(15, false),
            snap(20, true),
            snap(25, false),
        ];
        let output = format_report(&report_for(&snapshots, chrono::Duration::hours(48)));
        assert_snapshot!(output, @r"
        ==================================================
        48-HOUR TRACKING REPORT
        ==================================================
        Total data points: 6
        Online sessions detected: 2

        Session 1:
          Start: 2025-03-01T00:05:00Z
          End: 2025-03-01T00:15:00Z
          Duration: 10m 0s

        Session 2:
          Start: 2025-03-01T00:20:00Z
          End: 2025-03-01T00:25:00Z
          Duration: 5m 0s

        Total online time: 15m 0s
        Percentage of time online: 0.52%
        ");
    }

    #[test]
    fn test_format_report_empty() {
        let output = format_report(&report_for(&[], chrono::Duration::hours(48)));
        assert_snapshot!(output, @r"
        ==================================================
        48-HOUR TRACKING REPORT
        ==================================================
        No data collected.
        ");
    }

    #[test]
    fn test_format_report_odd_window_uses_seconds() {
        let output = format_report(&report_for(&[snap(0, false)], chrono::Duration::seconds(90)));
        assert!(output.contains("90-SECOND TRACKING REPORT"));
        assert!(output.contains("Online sessions detected: 0"));
        assert!(output.contains("Percentage of time online: 0.00%"));
    }

    #[test]
    fn test_run_reads_log_and_outputs_json() {
        let temp = tempfile::tempdir().unwrap();
        let log_path = temp.path().join("snapshots.json");
        let snapshots = vec![snap(0, true), snap(30, true), snap(60, false)];
        std::fs::write(&log_path, serde_json::to_string(&snapshots).unwrap()).unwrap();

        let args = ReportArgs {
            log: Some(log_path),
            window_hours: Some(2),
            json: true,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["trackingPeriod"], "2_hours");
        assert_eq!(value["totalDataPoints"], 3);
        assert_eq!(value["onlineSessionsCount"], 1);
        assert_eq!(value["totalOnlineTimeSeconds"], 3600.0);
        assert_eq!(value["percentOnline"], 50.0);
    }

    #[test]
    fn test_run_missing_log_reports_no_data() {
        let temp = tempfile::tempdir().unwrap();
        let args = ReportArgs {
            log: Some(temp.path().join("absent.json")),
            window_hours: None,
            json: false,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &Config::default()).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("No data collected."));
    }
}
