//! attach and detach commands - Change parent-child edges

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

/// Attach `child` under `parent`.
pub fn attach(ctx: &Context, child: CorpusId, parent: CorpusId) -> Result<()> {
    let manager = ctx.manager()?;
    ctx.block_on(manager.attach_child(child, parent))?
        .with_context(|| format!("failed to attach {} under {}", child, parent))?;

    if !ctx.quiet {
        println!("Attached {} under {}", child, parent);
    }
    Ok(())
}

/// Remove the edge `parent -> child`, optionally deleting the child.
pub fn detach(ctx: &Context, parent: CorpusId, child: CorpusId, delete: bool) -> Result<()> {
    let manager = ctx.manager()?;
    let report = ctx
        .block_on(manager.detach_child(parent, child, delete))?
        .with_context(|| format!("failed to detach {} from {}", child, parent))?;

    if !ctx.quiet {
        println!("Detached {} from {}", child, parent);
        if let Some(report) = report {
            println!("Deleted {} corpora", report.deleted.len());
        }
    }
    Ok(())
}
