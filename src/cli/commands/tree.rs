//! tree command - Display the forest

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::types::CorpusId;
use crate::manager::ForestSnapshot;

fn render(snapshot: &ForestSnapshot, root: CorpusId, out: &mut Vec<String>) {
    for (depth, id) in snapshot.graph.depth_first(root) {
        let indent = "  ".repeat(depth);
        let line = match snapshot.record(id) {
            Some(record) => format!(
                "{}{} ({}) [{}] {} words{}",
                indent,
                record.name,
                id.short(),
                record.corpus_kind,
                record.vocabulary.len(),
                if record.is_master { " *" } else { "" }
            ),
            None => format!("{}<missing {}>", indent, id.short()),
        };
        out.push(line);
    }
}

/// Print every tree, or the tree under `root`.
pub fn tree(ctx: &Context, root: Option<CorpusId>) -> Result<()> {
    let manager = ctx.manager()?;
    let snapshot = ctx
        .block_on(manager.forest())?
        .context("failed to read forest")?;

    let roots = match root {
        Some(id) if snapshot.graph.contains(id) => vec![id],
        Some(id) => bail!("corpus {} not found", id),
        None => snapshot.roots(),
    };

    if roots.is_empty() {
        if !ctx.quiet {
            println!("(no corpora)");
        }
        return Ok(());
    }

    let mut lines = Vec::new();
    for id in roots {
        render(&snapshot, id, &mut lines);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
