// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `strata`: run the encoder over a JSON scene description.
//!
//! The scene is a serialized `GeneratedScene`. Output is the recorded encoder
//! traffic as JSON; with `--out`, registered assets are written to an
//! `assets/` directory next to the output file.

mod packages;

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use strata_app_core::config::ConfigService;
use strata_cas::ArchiveCache;
use strata_config_fs::FsConfigStore;
use strata_encoder::{EncodeOptions, Encoder, RecordingSink};
use strata_geom_port::GeneratedScene;
use tracing::info;
use tracing_subscriber::EnvFilter;

use packages::UnpackedPackages;

#[derive(Parser, Debug)]
#[command(name = "strata", author, version, about = "Strata geometry encoder")]
struct Cli {
    /// Directory holding `encoder.json`; defaults to the user config directory.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a scene and write the recorded output as JSON.
    Encode(EncodeArgs),
    /// Print the effective encoder options.
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Scene description (JSON).
    scene: PathBuf,
    /// Output file; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Directory with unpacked rule packages, one subdirectory per package file.
    #[arg(long)]
    package_root: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Persist the default options before printing.
    #[arg(long)]
    write_defaults: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(io::stderr)
        .init();

    let store = match &cli.config_dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("opening config store")?;
    let config = ConfigService::new(store);

    match cli.command {
        Command::Encode(args) => encode(&config, &args),
        Command::Config(args) => show_config(&config, &args),
    }
}

fn encode(config: &ConfigService<FsConfigStore>, args: &EncodeArgs) -> Result<()> {
    let options = EncodeOptions::load(config).context("loading encoder options")?;
    let raw = fs::read(&args.scene)
        .with_context(|| format!("reading scene {}", args.scene.display()))?;
    let scene: GeneratedScene = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing scene {}", args.scene.display()))?;

    let mut archive = args
        .package_root
        .as_ref()
        .map(|root| ArchiveCache::new(UnpackedPackages::new(root)));
    let mut encoder = Encoder::new(options);
    let mut sink = RecordingSink::new();
    let summaries = encoder
        .encode_all(&scene, &mut sink, archive.as_mut())
        .context("encoding scene")?;
    encoder.finish();

    info!(
        initial_shapes = summaries.len(),
        fallbacks = summaries.iter().filter(|s| s.used_fallback).count(),
        batches = sink.batches.len(),
        assets = sink.assets.len(),
        "encode finished"
    );

    let json = serde_json::to_vec_pretty(&sink).context("serializing recording")?;
    match &args.out {
        Some(out) => {
            fs::write(out, &json).with_context(|| format!("writing {}", out.display()))?;
            write_assets(out, &sink)
        }
        None => write_stdout(&json),
    }
}

fn write_assets(out: &Path, sink: &RecordingSink) -> Result<()> {
    if sink.assets.is_empty() {
        return Ok(());
    }
    let base = out.parent().unwrap_or_else(|| Path::new("."));
    for asset in &sink.assets {
        let path = asset_destination(base, &asset.path)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::write(&path, &asset.bytes).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// `base` joined with a registered asset path, which must stay below `base`.
fn asset_destination(base: &Path, asset_path: &str) -> Result<PathBuf> {
    let relative = Path::new(asset_path);
    if relative.as_os_str().is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        bail!("refusing to write asset outside the output directory: {asset_path}");
    }
    Ok(base.join(relative))
}

fn show_config(config: &ConfigService<FsConfigStore>, args: &ConfigArgs) -> Result<()> {
    if args.write_defaults {
        EncodeOptions::default()
            .save(config)
            .context("saving default options")?;
        info!(dir = %config.store().base().display(), "wrote default encoder options");
    }
    let options = EncodeOptions::load(config).context("loading encoder options")?;
    write_stdout(&serde_json::to_vec_pretty(&options)?)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn asset_paths_stay_below_the_output_directory() {
        let base = Path::new("/out");
        assert_eq!(
            asset_destination(base, "assets/roof.jpg").unwrap(),
            PathBuf::from("/out/assets/roof.jpg")
        );
        for escaping in ["assets/../../outside.png", "/etc/passwd", "./a.png", ""] {
            assert!(asset_destination(base, escaping).is_err(), "{escaping}");
        }
    }
}
