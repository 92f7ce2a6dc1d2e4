//! Backups command implementation - lists the backup catalog

use anyhow::{Context, Result};
use std::sync::Arc;

use roller_core::RealFs;
use roller_engine::BackupCatalog;

use crate::cli::RollerArgs;
use crate::output::print_backups;

pub fn execute(args: &RollerArgs) -> Result<()> {
    let config = args.load_config()?;
    let catalog = BackupCatalog::new(&config, Arc::new(RealFs));
    let backups = catalog
        .list()
        .with_context(|| format!("Failed to list backups of {}", config.filename().display()))?;

    print_backups(&backups);
    Ok(())
}
