//! hash command - Print vocabulary hash and cache key

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

pub fn hash(ctx: &Context, id: CorpusId, scope: Option<&str>) -> Result<()> {
    let manager = ctx.manager()?;
    let corpus = ctx
        .block_on(manager.get(id))?
        .with_context(|| format!("failed to load corpus {}", id))?;
    let key = corpus.cache_key(&manager.settings().hasher, scope);

    if ctx.quiet {
        println!("{}", key);
    } else {
        println!("hash: {}", corpus.vocabulary_hash());
        println!("key:  {}", key);
    }
    Ok(())
}
