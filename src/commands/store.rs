//! `converge store` - direct access to the content store

use anyhow::{Context as AnyhowContext, Result};
use std::io::Write;
use std::path::Path;

use blobstore::{ContentStore, validate_hash, verify};

use crate::Context;
use crate::cli::StoreCommand;
use crate::config::ConvergeConfig;
use crate::ui;

pub fn run(ctx: &Context, cmd: StoreCommand) -> Result<()> {
    let config = ConvergeConfig::load(ctx.config.as_deref())?;
    let store = config.content_store()?;

    match cmd {
        StoreCommand::Put { path } => put(store.as_ref(), &path, ctx.quiet),
        StoreCommand::Get { hash, output } => get(store.as_ref(), &hash, output.as_deref()),
    }
}

fn put(store: &dyn ContentStore, path: &Path, quiet: bool) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;
    let hash = blobstore::hash_content(&bytes);
    let uploaded = store
        .upload_if_absent(&hash, &bytes)
        .with_context(|| format!("Could not store {}", path.display()))?;

    if !quiet {
        if uploaded {
            ui::success(&format!(
                "Stored {} ({})",
                path.display(),
                ui::format_size(bytes.len() as u64)
            ));
        } else {
            ui::info(&format!("{} already stored", path.display()));
        }
    }
    println!("{hash}");
    Ok(())
}

fn get(store: &dyn ContentStore, hash: &str, output: Option<&Path>) -> Result<()> {
    validate_hash(hash)?;
    let bytes = store
        .download(hash)
        .with_context(|| format!("Could not fetch {hash}"))?;
    verify(hash, &bytes)?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Could not write {}", path.display()))?;
            ui::success(&format!(
                "Wrote {} to {}",
                ui::format_size(bytes.len() as u64),
                path.display()
            ));
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}
