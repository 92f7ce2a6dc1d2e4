//! Rotate command implementation - rotates once, then prunes

use anyhow::{Context, Result};

use roller_engine::Roller;

use crate::cli::RollerArgs;
use crate::output::{print_report, print_success};

pub fn execute(args: &RollerArgs) -> Result<()> {
    let config = args.load_config()?;
    let filename = config.filename().to_path_buf();

    let existing = std::fs::metadata(&filename).map_or(0, |m| m.len());
    let roller = Roller::new(config.clone())
        .with_context(|| format!("Failed to open {}", filename.display()))?;
    // Opening may already have moved a full file aside
    if existing == 0 || roller.size() != 0 {
        roller.rotate().context("Rotation failed")?;
    }
    // Waits for the background worker, so the pass below runs alone
    roller.close()?;
    print_success(&format!("Rotated {}", filename.display()));

    let report = super::mill(&config)
        .run_once()
        .context("Retention pass failed")?;
    print_report(&report);
    Ok(())
}
