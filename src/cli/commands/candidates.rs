//! candidates command - Fuzzy lookup in one corpus

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

pub fn candidates(
    ctx: &Context,
    id: CorpusId,
    query: &str,
    max_distance: Option<usize>,
) -> Result<()> {
    let manager = ctx.manager()?;
    let hits = ctx
        .block_on(manager.get_candidates(id, query, max_distance))?
        .with_context(|| format!("failed to search {}", id))?;

    if hits.is_empty() && !ctx.quiet {
        eprintln!("no candidates for '{}'", query);
    }
    for hit in hits {
        println!("{}", hit.word);
    }
    Ok(())
}
