//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls one manager operation
//! 3. Formats and displays output
//!
//! Handlers do NOT touch the store directly.
//!
//! # Async Commands
//!
//! Manager operations are async. Handlers run them with
//! [`Context::block_on`], which drives a fresh tokio runtime.

mod aggregate;
mod candidates;
mod completion;
mod config_cmd;
mod create;
mod delete;
mod edges;
mod hash;
mod show;
mod tree;
mod verify;

pub use aggregate::aggregate;
pub use candidates::candidates;
pub use completion::completion;
pub use config_cmd::{path as config_path, set as config_set, show as config_show};
pub use create::create;
pub use delete::delete;
pub use edges::{attach, detach};
pub use hash::hash;
pub use show::show;
pub use tree::tree;
pub use verify::verify;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Create {
            name,
            files,
            kind,
            language,
            master,
            parent,
            semantic_index,
        } => create::create(
            ctx,
            create::CreateArgs {
                name,
                files,
                kind,
                language,
                master,
                parent,
                semantic_index,
            },
        ),
        Command::Show { id, words, json } => show::show(ctx, id, words, json),
        Command::Tree { root } => tree::tree(ctx, root),
        Command::Attach { child, parent } => edges::attach(ctx, child, parent),
        Command::Detach {
            parent,
            child,
            delete,
        } => edges::detach(ctx, parent, child, delete),
        Command::Aggregate {
            root,
            no_write_back,
        } => aggregate::aggregate(ctx, root, !no_write_back),
        Command::Delete { id } => delete::delete(ctx, id),
        Command::Candidates {
            id,
            query,
            max_distance,
        } => candidates::candidates(ctx, id, &query, max_distance),
        Command::Hash { id, scope } => hash::hash(ctx, id, scope.as_deref()),
        Command::Verify => verify::verify(ctx),
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(ctx),
            ConfigAction::Path => config_cmd::path(ctx),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}
