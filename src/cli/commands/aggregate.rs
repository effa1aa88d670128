//! aggregate command - Merge a subtree into its root

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

pub fn aggregate(ctx: &Context, root: CorpusId, write_back: bool) -> Result<()> {
    let manager = ctx.manager()?;
    let corpus = ctx
        .block_on(manager.aggregate(root, write_back))?
        .with_context(|| format!("failed to aggregate {}", root))?;

    if ctx.quiet {
        println!("{}", corpus.vocabulary_hash());
        return Ok(());
    }
    println!(
        "Aggregated {} ({}): {} words, hash {}",
        corpus.name(),
        root,
        corpus.vocabulary().len(),
        corpus.vocabulary_hash()
    );
    if !write_back {
        println!("  (not written back)");
    }
    Ok(())
}
