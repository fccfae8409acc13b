//! Command-line front end for nupkg-meta.
//!
//! Extracts metadata from a local package file or an HTTP URL and prints it
//! as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nupkg_meta::extractor::is_manifest_candidate;
use nupkg_meta::{
    Cli, DirectoryStore, ExtractorConfig, HttpRangeReader, LocalFileReader, MetadataExtractor,
    PackageMetadata, PackageReference, ReadAt, ZipParser, extract_from_reader, validate,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.extractor_config();

    if cli.is_http_url() {
        // Remote package via HTTP Range requests
        let reader = Arc::new(HttpRangeReader::new(cli.file.clone()).await?);

        if cli.list {
            list_entries(reader.clone(), &config).await?;
        } else {
            let reference =
                PackageReference::new(cli.file.clone(), reader.size(), cli.declared_format());
            validate(&reference, &config)?;
            let metadata = extract_from_reader(reader.clone(), &config).await?;
            print_metadata(&metadata, cli.pretty).await?;
        }

        info!(
            transferred = reader.transferred_bytes(),
            size = reader.size(),
            "remote package read"
        );
    } else {
        let path = Path::new(&cli.file);

        if cli.list {
            let reader = Arc::new(LocalFileReader::new(path)?);
            return list_entries(reader, &config).await;
        }

        let (root, id) = split_path(path)?;
        let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let reference = PackageReference::new(id, size, cli.declared_format());

        let extractor = MetadataExtractor::new(DirectoryStore::new(root), config);
        let metadata = extractor.extract(&reference).await?;
        print_metadata(&metadata, cli.pretty).await?;
    }

    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Split a local path into the directory serving as store root and the id.
fn split_path(path: &Path) -> Result<(&Path, String)> {
    let id = path
        .file_name()
        .with_context(|| format!("{} does not name a file", path.display()))?
        .to_string_lossy()
        .into_owned();
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((root, id))
}

async fn print_metadata(metadata: &PackageMetadata, pretty: bool) -> Result<()> {
    let mut json = if pretty {
        serde_json::to_string_pretty(metadata)?
    } else {
        serde_json::to_string(metadata)?
    };
    json.push('\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(json.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Print the central directory, marking manifest candidates with `*`.
async fn list_entries<R: ReadAt>(reader: Arc<R>, config: &ExtractorConfig) -> Result<()> {
    let parser = ZipParser::with_limit(reader, config.max_central_directory_size);
    let entries = parser.list_files().await?;

    let mut out = format!(
        "{:>10}  {:>10}  {:>6}  Name\n{}\n",
        "Length",
        "Size",
        "Method",
        "-".repeat(50)
    );
    for entry in &entries {
        let marker = if is_manifest_candidate(entry, &config.manifest_extension) {
            "*"
        } else {
            " "
        };
        out.push_str(&format!(
            "{:>10}  {:>10}  {:>6} {}{}\n",
            entry.uncompressed_size,
            entry.compressed_size,
            entry.compression_method.as_u16(),
            marker,
            entry.name
        ));
    }
    out.push_str(&format!("{}\n{} entries\n", "-".repeat(50), entries.len()));

    let mut stdout = tokio::io::stdout();
    stdout.write_all(out.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
