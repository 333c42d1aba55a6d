//! Status command for showing the configured paths and latest reading.

use std::io::Write;

use anyhow::{Context, Result};
use pt_sampler::read_snapshot_log;

use crate::Config;
use crate::console::format_reading;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let log = read_snapshot_log(&config.snapshot_log_path).with_context(|| {
        format!(
            "failed to read snapshot log {}",
            config.snapshot_log_path.display()
        )
    })?;

    writeln!(writer, "Presence tracker status")?;
    writeln!(writer, "Snapshot log: {}", config.snapshot_log_path.display())?;
    writeln!(writer, "Report: {}", config.report_path.display())?;

    let Some(latest) = log.last() else {
        writeln!(writer, "No snapshots recorded.")?;
        return Ok(());
    };

    writeln!(writer, "Snapshots: {}", log.len())?;
    writeln!(writer, "Latest reading:")?;
    write!(writer, "{}", format_reading(latest))?;

    Ok(())
}
