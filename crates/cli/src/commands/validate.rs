//! Offline validation of farm configurations

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use iplb_provider::resources::http_farm::TYPE_NAME;
use iplb_provider::state::decode_dynamic_value;
use iplb_provider::IplbProvider;

use crate::output::{print_diagnostics, print_success};

#[derive(Args)]
pub struct ValidateArgs {
    /// JSON file holding an iplb_http_farm block
    file: PathBuf,
}

pub fn execute(args: ValidateArgs, provider: &IplbProvider) -> Result<()> {
    let data = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let config = decode_dynamic_value(&data)?;
    if config.as_map().is_none() {
        bail!("{} does not hold an object", args.file.display());
    }

    let diagnostics = provider.validate_resource_config(TYPE_NAME, &config)?;
    if print_diagnostics(&diagnostics) {
        bail!("{} is not a valid {}", args.file.display(), TYPE_NAME);
    }

    print_success(&format!("{} is valid", args.file.display()));
    Ok(())
}
