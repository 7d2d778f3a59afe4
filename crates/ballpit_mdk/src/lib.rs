//! The Ballpit MDK - mod development kit
//!
//! A command line utility for poking at a game directory the same way the editor does: taking
//! inventory of its resources, exporting decoded sprites, and packing new images.

use ballpit_assets::{AssetConfig, ResourceCache};
use ballpit_utils::{ok, AnyResult};
use clap::{Parser, Subcommand};
use commands::{export::ExportCommand, inventory::InventoryCommand, pack::PackCommand};
use log::LevelFilter;
use std::path::Path;

pub mod commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increases log verbosity, can be repeated
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Lists every resource found in a game directory
    Inventory(InventoryCommand),
    /// Decodes a sprite and saves it as a PNG
    Export(ExportCommand),
    /// Packs an image into a compressed image container
    Pack(PackCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs `ballpit_mdk` as if it was ran from the command line.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::Inventory(c) => c.run()?,
        CliCommand::Export(c) => c.run()?,
        CliCommand::Pack(c) => c.run()?,
    }
    ok()
}

/// Sets up `pretty_env_logger`. With no `-v` only info and above is shown.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(level)
        .init();
}

/// Creates a cache with the given (or default) configuration and takes inventory of `root`.
pub(crate) fn open_cache(root: &Path, config: Option<&Path>) -> AnyResult<ResourceCache> {
    let config = match config {
        Some(path) => AssetConfig::load(path)?,
        None => AssetConfig::default(),
    };

    // Per-file failures are already logged by the inventory pass
    let cache = ResourceCache::new(config);
    cache.inventory(root)?;
    Ok(cache)
}
