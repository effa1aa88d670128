//! delete command - Delete a corpus and its subtree

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

pub fn delete(ctx: &Context, id: CorpusId) -> Result<()> {
    let manager = ctx.manager()?;
    let report = ctx
        .block_on(manager.delete(id))?
        .with_context(|| format!("failed to delete {}", id))?;

    if ctx.quiet {
        return Ok(());
    }
    println!("Deleted {} corpora", report.deleted.len());
    for deleted in &report.deleted {
        println!("  {}", deleted);
    }
    if let Some(parent) = report.detached_from {
        println!("Detached from {}", parent);
    }
    if !report.dangling.is_empty() {
        println!("Skipped {} dangling child entries", report.dangling.len());
    }
    Ok(())
}
