//! Prune command implementation - one retention pass

use anyhow::{Context, Result};

use crate::cli::RollerArgs;
use crate::output::{print_info, print_report};

pub fn execute(args: &RollerArgs) -> Result<()> {
    let config = args.load_config()?;
    if !config.has_retention() {
        print_info("No retention limits or compression configured");
        return Ok(());
    }

    let report = super::mill(&config)
        .run_once()
        .context("Retention pass failed")?;
    print_report(&report);
    Ok(())
}
