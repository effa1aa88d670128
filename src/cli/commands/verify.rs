//! verify command - Check the forest for structural damage

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;

pub fn verify(ctx: &Context) -> Result<()> {
    let manager = ctx.manager()?;
    let report = ctx
        .block_on(manager.verify())?
        .context("failed to read forest")?;

    for issue in &report.issues {
        println!("{}", issue);
    }
    if !report.ok() {
        bail!("forest has {} problem(s)", report.issues.len());
    }
    if !ctx.quiet {
        println!("OK: {} corpora checked", report.checked);
    }
    Ok(())
}
