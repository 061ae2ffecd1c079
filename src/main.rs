use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[macro_use]
extern crate anyhow;
use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};

use bitsquid_extract::constants::OFFZIP_PROGRAM;
use bitsquid_extract::extract::{self, BatchReport};
use bitsquid_extract::murmur::hash_str;
use bitsquid_extract::{
    stream, Naming, OffzipDecoder, PreDecoder, RecordLayout, SegmentedDecoder, TypeRegistry, UnpackOptions,
};

#[derive(Debug, Parser)]
#[command(name = "bitsquid-extract", version, about = "Unpack and repack Bitsquid bundles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Unpack a bundle, or every bundle in a directory
    Unpack {
        input: PathBuf,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, value_enum, env = "BITSQUID_LAYOUT", default_value = "wide")]
        layout: LayoutArg,
        #[arg(long, value_enum, default_value = "extension")]
        naming: NamingArg,
    },
    /// Pack a directory of `<name_hash>.<type>` files into a bundle
    Pack {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Unpack a legacy bundle through offzip
    Dump {
        input: PathBuf,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        #[arg(long, env = "BITSQUID_OFFZIP", default_value = OFFZIP_PROGRAM)]
        offzip: PathBuf,
        #[arg(long, value_enum, default_value = "type")]
        naming: NamingArg,
    },
    /// Show container and record information of a bundle
    Info {
        input: PathBuf,
        #[arg(long, value_enum, env = "BITSQUID_LAYOUT", default_value = "wide")]
        layout: LayoutArg,
    },
    /// Hash candidate type or resource names
    Hash {
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
    /// List known resource types
    Types,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Wide,
    Narrow,
    Dump,
}

impl From<LayoutArg> for RecordLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Wide => RecordLayout::Wide,
            LayoutArg::Narrow => RecordLayout::Narrow,
            LayoutArg::Dump => RecordLayout::Dump,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NamingArg {
    Extension,
    Type,
    Hash,
}

impl From<NamingArg> for Naming {
    fn from(arg: NamingArg) -> Self {
        match arg {
            NamingArg::Extension => Naming::Extension,
            NamingArg::Type => Naming::Type,
            NamingArg::Hash => Naming::Hash,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let registry = TypeRegistry::new();
    debug_assert_eq!(registry.lookup(hash_str("lua")).map(|e| e.extension), Some("lua"));

    info!("Starting...");
    let start_time = Instant::now();

    match cli.command {
        Commands::Unpack {
            input,
            output,
            layout,
            naming,
        } => {
            let options = UnpackOptions {
                layout: layout.into(),
                naming: naming.into(),
            };
            let decoder = SegmentedDecoder::new(options.layout);
            unpack(&decoder, &input, &output, &registry, options.naming)?;
        }
        Commands::Pack { input, output } => {
            let summary = extract::pack_directory(&input, &output)
                .with_context(|| format!("packing {}", input.display()))?;
            info!(
                "package: {} bytes, archive: {} bytes",
                summary.package_len, summary.archive_len
            );
        }
        Commands::Dump {
            input,
            output,
            offzip,
            naming,
        } => {
            let decoder = OffzipDecoder::new(offzip);
            unpack(&decoder, &input, &output, &registry, naming.into())?;
        }
        Commands::Info { input, layout } => show_info(&input, layout.into(), &registry)?,
        Commands::Hash { names } => {
            for name in names {
                let hash = TypeRegistry::hash_for(&name);
                let known = registry
                    .lookup(hash)
                    .map(|entry| format!("{} (.{})", entry.name, entry.extension))
                    .unwrap_or_else(|| "unknown type".to_owned());
                println!("{}\t{}\t{:016x}\t{}", name, hash, hash, known);
            }
        }
        Commands::Types => {
            for entry in registry.entries() {
                println!("{:016x}\t{}\t.{}", entry.hash, entry.name, entry.extension);
            }
        }
    }

    let elapsed = Instant::now() - start_time;
    info!("Time elapsed: {:.4} seconds", elapsed.as_secs_f64());
    info!("Done.");

    Ok(())
}

/// Unpack a single archive or a directory of archives.
fn unpack(
    decoder: &dyn PreDecoder,
    input: &Path,
    output: &Path,
    registry: &TypeRegistry,
    naming: Naming,
) -> anyhow::Result<()> {
    if !input.exists() {
        return Err(anyhow!("input path does not exist: {}", input.display()));
    }
    std::fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;

    if input.is_dir() {
        let report = extract::unpack_directory(input, output, registry, decoder, naming)?;
        summarize(&report);
        if report.all_failed() {
            bail!("every archive in {} failed", input.display());
        }
    } else {
        let summary = extract::unpack_with(decoder, input, output, registry, naming)
            .with_context(|| format!("unpacking {}", input.display()))?;
        if summary.mismatches > 0 {
            warn!("{} records did not match their keys", summary.mismatches);
        }
    }

    Ok(())
}

fn summarize(report: &BatchReport) {
    let resources: usize = report.unpacked.iter().map(|summary| summary.files.len()).sum();
    info!(
        "{} of {} archives unpacked, {} resources written",
        report.unpacked.len(),
        report.total(),
        resources
    );
    for (path, err) in &report.failed {
        warn!("failed: {}: {}", path.display(), err);
    }
}

fn show_info(input: &Path, layout: RecordLayout, registry: &TypeRegistry) -> anyhow::Result<()> {
    let archive = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let (header, chunks) = stream::chunks(&archive)?;
    let mut chunk_count = 0usize;
    let mut raw_count = 0usize;
    for chunk in chunks {
        chunk_count += 1;
        if chunk?.is_raw() {
            raw_count += 1;
        }
    }
    println!(
        "version {:08X}, size hint {}, {} chunks ({} raw)",
        header.version, header.size_hint, chunk_count, raw_count
    );

    let data = stream::decode(&archive)?;
    let package = bitsquid_extract::package::parse(&data, layout)?;
    println!("{} records, {} bytes", package.resources.len(), data.len());
    for resource in &package.resources {
        println!(
            "{:016x}\t{:016x}\t{}\t{}",
            resource.key.type_hash,
            resource.key.name_hash,
            registry.type_name_for(resource.key.type_hash),
            resource.len()
        );
    }

    let unnamed = package
        .resources
        .iter()
        .filter(|resource| registry.lookup(resource.key.type_hash).is_none())
        .count();
    if unnamed > 0 {
        info!("{} records have an unknown type; try `hash` on candidate names", unnamed);
    }

    Ok(())
}
