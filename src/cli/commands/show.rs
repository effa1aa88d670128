//! show command - Display one corpus

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;

/// Show a corpus's metadata, its words, or its stored record.
pub fn show(ctx: &Context, id: CorpusId, words: bool, json: bool) -> Result<()> {
    let manager = ctx.manager()?;
    let corpus = ctx
        .block_on(manager.get(id))?
        .with_context(|| format!("failed to load corpus {}", id))?;

    if json {
        let record = corpus.to_record();
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    if words {
        for word in corpus.vocabulary() {
            println!("{}", word);
        }
        return Ok(());
    }

    println!("{} ({})", corpus.name(), corpus.id());
    println!("  kind:      {}", corpus.kind());
    println!("  language:  {}", corpus.language());
    println!("  master:    {}", if corpus.is_master() { "yes" } else { "no" });
    match corpus.parent() {
        Some(parent) => println!("  parent:    {}", parent),
        None => println!("  parent:    (root)"),
    }
    println!("  children:  {}", corpus.children().len());
    println!("  words:     {}", corpus.vocabulary().len());
    println!("  originals: {}", corpus.original_vocabulary().len());
    println!("  hash:      {}", corpus.vocabulary_hash());
    if let Some(version) = corpus.version() {
        println!("  version:   {}", version);
    }
    if let Some(saved_at) = corpus.saved_at() {
        println!("  saved:     {}", saved_at);
    }
    Ok(())
}
