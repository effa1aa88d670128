//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--store <path>`: Store directory (overrides `[store] root`)
//! - `--config <path>`: Extra config file layered over the global one
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::types::{CorpusId, CorpusKind, Language};

/// cforest - versioned vocabulary corpora organized as a forest
#[derive(Parser, Debug)]
#[command(name = "cforest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Store directory
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Config file layered over the global config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a corpus from word files
    #[command(
        name = "create",
        long_about = "Create a corpus from newline-delimited word files.\n\n\
            Each non-empty line is one word or phrase; lines starting with '#' are \
            ignored. With no files, or with '-', words are read from stdin. Words are \
            normalized, deduplicated and indexed before the corpus is saved.",
        after_help = "\
WORKFLOW EXAMPLES:
    # A wordlist from a file
    cforest create common-words words.txt --kind wordlist

    # A master corpus that only aggregates its children
    cforest create english --kind language --master

    # Create directly under a parent
    cat rare.txt | cforest create rare --parent 5f0c..."
    )]
    Create {
        /// Corpus name
        name: String,

        /// Word files; '-' or none reads stdin
        files: Vec<PathBuf>,

        /// Corpus kind
        #[arg(long, default_value = "custom")]
        kind: CorpusKind,

        /// Language tag
        #[arg(long, default_value = "en")]
        language: Language,

        /// Exclude this corpus's own words from aggregation
        #[arg(long)]
        master: bool,

        /// Attach under this corpus
        #[arg(long, value_name = "UUID")]
        parent: Option<CorpusId>,

        /// Ask the search side to build a semantic index
        #[arg(long)]
        semantic_index: bool,
    },

    /// Show one corpus
    Show {
        id: CorpusId,

        /// Print the vocabulary, one word per line
        #[arg(long)]
        words: bool,

        /// Print the stored record as JSON
        #[arg(long, conflicts_with = "words")]
        json: bool,
    },

    /// Display the forest, or one tree
    #[command(
        name = "tree",
        after_help = "\
READING THE OUTPUT:
    english (1a2b3c4d) [language] 1200 words *   <- '*' marks a master
      common (5e6f7a8b) [wordlist] 800 words
      rare (9c0d1e2f) [wordlist] 400 words"
    )]
    Tree {
        /// Root to display; all roots when omitted
        root: Option<CorpusId>,
    },

    /// Attach a corpus under a parent, moving it if already attached
    Attach { child: CorpusId, parent: CorpusId },

    /// Remove a parent-child edge
    Detach {
        parent: CorpusId,
        child: CorpusId,

        /// Delete the detached child and its subtree
        #[arg(long)]
        delete: bool,
    },

    /// Merge a subtree's vocabularies into its root
    #[command(
        name = "aggregate",
        long_about = "Merge a subtree's vocabularies into its root.\n\n\
            Every node receives the union of its children's vocabularies plus its \
            own (masters contribute only their children's). Changed nodes are written \
            back unless --no-write-back is given."
    )]
    Aggregate {
        root: CorpusId,

        /// Compute the result without saving it
        #[arg(long)]
        no_write_back: bool,
    },

    /// Delete a corpus and all of its descendants
    Delete { id: CorpusId },

    /// Fuzzy lookup of a word in a corpus
    Candidates {
        id: CorpusId,
        query: String,

        /// Maximum edit distance
        #[arg(long, short = 'd')]
        max_distance: Option<usize>,
    },

    /// Print a corpus's vocabulary hash and cache key
    Hash {
        id: CorpusId,

        /// Scope mixed into the cache key
        #[arg(long)]
        scope: Option<String>,
    },

    /// Check the whole forest for structural damage
    Verify,

    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    cforest completion bash >> ~/.bashrc

    # Zsh
    cforest completion zsh > ~/.zfunc/_cforest"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print where configuration was loaded from
    Path,
    /// Set a value in the global config file (or the --config file)
    Set {
        /// Key such as tree.max_depth
        key: String,
        value: String,
    },
}

/// Shells for completion generation
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
