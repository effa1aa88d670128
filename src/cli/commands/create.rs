//! create command - Create a corpus from word files

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::corpus::CorpusDraft;
use crate::core::types::{CorpusId, CorpusKind, Language};
use crate::manager::CreateOptions;

/// Arguments of `cforest create`.
#[derive(Debug)]
pub struct CreateArgs {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub kind: CorpusKind,
    pub language: Language,
    pub master: bool,
    pub parent: Option<CorpusId>,
    pub semantic_index: bool,
}

/// Split word-file text into entries.
///
/// One entry per non-blank line; `#` starts a comment line.
pub(crate) fn parse_words(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read words from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Create a corpus.
pub fn create(ctx: &Context, args: CreateArgs) -> Result<()> {
    let sources = if args.files.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        args.files
    };

    let mut words = Vec::new();
    for source in &sources {
        let text = read_source(source)?;
        words.extend(parse_words(&text).map(str::to_string));
    }
    if words.is_empty() && !args.master {
        bail!("no words given; pass word files or pipe words on stdin");
    }

    let draft = CorpusDraft::new(args.name, words)
        .kind(args.kind)
        .language(args.language)
        .master(args.master);
    let options = CreateOptions {
        parent: args.parent,
        semantic_index: args.semantic_index,
    };

    let manager = ctx.manager()?;
    let corpus = ctx
        .block_on(manager.create(draft, options))?
        .context("failed to create corpus")?;

    if ctx.quiet {
        println!("{}", corpus.id());
    } else {
        println!(
            "Created {} ({}) with {} words",
            corpus.name(),
            corpus.id(),
            corpus.vocabulary().len()
        );
        if let Some(parent) = corpus.parent() {
            println!("  under {}", parent);
        }
    }
    Ok(())
}
