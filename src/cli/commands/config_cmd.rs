//! config command - Show, locate, or set configuration values

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::{
    CandidatesSection, Config, ForestConfig, HashingSection, RetrySection, StoreSection,
    TreeSection,
};

/// Print the effective configuration as TOML.
pub fn show(ctx: &Context) -> Result<()> {
    let effective = ctx.config.effective();
    print!("{}", toml::to_string_pretty(&effective)?);
    Ok(())
}

/// Print where configuration came from.
pub fn path(ctx: &Context) -> Result<()> {
    match ctx.config.global_config_loaded_from() {
        Some(path) => println!("global:   {}", path.display()),
        None => println!("global:   (none)"),
    }
    if let Some(path) = ctx.config.explicit_config_loaded_from() {
        println!("explicit: {}", path.display());
    }
    println!("store:    {}", ctx.store_root.display());
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid value for {}: {}", key, value))
}

/// Overlay one key onto `config`.
pub(crate) fn apply(config: &mut ForestConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "tree.max_depth" => {
            config.tree.get_or_insert_with(TreeSection::default).max_depth =
                Some(parse(key, value)?)
        }
        "hashing.sample_size" => {
            config
                .hashing
                .get_or_insert_with(HashingSection::default)
                .sample_size = Some(parse(key, value)?)
        }
        "hashing.digest_length" => {
            config
                .hashing
                .get_or_insert_with(HashingSection::default)
                .digest_length = Some(parse(key, value)?)
        }
        "candidates.max_edit_distance" => {
            config
                .candidates
                .get_or_insert_with(CandidatesSection::default)
                .max_edit_distance = Some(parse(key, value)?)
        }
        "store.root" => {
            config.store.get_or_insert_with(StoreSection::default).root = Some(value.into())
        }
        "store.offload_threshold" => {
            config
                .store
                .get_or_insert_with(StoreSection::default)
                .offload_threshold = Some(parse(key, value)?)
        }
        "retry.attempts" => {
            config.retry.get_or_insert_with(RetrySection::default).attempts =
                Some(parse(key, value)?)
        }
        "retry.initial_backoff_ms" => {
            config
                .retry
                .get_or_insert_with(RetrySection::default)
                .initial_backoff_ms = Some(parse(key, value)?)
        }
        _ => bail!("unknown configuration key: {}", key),
    }
    Ok(())
}

/// Set a value in the `--config` file, or the global file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let target = match (&ctx.config_path, ctx.config.global_config_loaded_from()) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => path.to_path_buf(),
        (None, None) => Config::global_config_path()?,
    };

    let mut file: ForestConfig = match std::fs::read_to_string(&target) {
        Ok(text) => toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", target.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ForestConfig::default(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", target.display()))
        }
    };

    apply(&mut file, key, value)?;
    Config::write(&target, &file).context("failed to write config")?;

    if !ctx.quiet {
        println!("Set {} = {} in {}", key, value, target.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_sets_nested_keys() {
        let mut config = ForestConfig::default();
        apply(&mut config, "tree.max_depth", "12").unwrap();
        apply(&mut config, "store.root", "/srv/forest").unwrap();
        assert_eq!(config.tree.unwrap().max_depth, Some(12));
        assert_eq!(
            config.store.unwrap().root,
            Some(std::path::PathBuf::from("/srv/forest"))
        );
    }

    #[test]
    fn apply_rejects_unknown_keys_and_bad_numbers() {
        let mut config = ForestConfig::default();
        assert!(apply(&mut config, "tree.width", "3").is_err());
        assert!(apply(&mut config, "retry.attempts", "many").is_err());
    }
}
