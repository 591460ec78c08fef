//! rakuten-m3u
//!
//! Scrapes the RakutenTV W3U playlist, resolves each channel's HLS master
//! manifest into quality variants, correlates the XMLTV guide feed, and
//! writes the generated playlist/guide/JSON tree for static publishing.
//!
//! The run is fully sequential: parse, resolve each channel in order,
//! correlate once, assemble (pure), persist. Only a broken source playlist
//! aborts; everything else degrades and is logged.

mod assemble;
mod config;
mod epg;
mod error;
mod fetch;
mod m3u8_parser;
mod models;
mod w3u_parser;


use assemble::Document;
use config::Config;
use error::Error;
use fetch::Fetcher;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        error!("run failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let config = Config::load();
    let fetcher = Fetcher::new(config.timeout_secs);

    info!("fetching W3U playlist from {}", config.w3u_url);
    let w3u_content = fetcher.text(&config.w3u_url)?;
    let mut channels = w3u_parser::parse_w3u(&w3u_content)?;
    info!("found {} channels in W3U playlist", channels.len());

    for channel in &mut channels {
        if let Some(master_url) = channel.stream_url.clone() {
            debug!("resolving qualities for {:?} from {}", channel.name, master_url);
            channel.qualities = m3u8_parser::resolve_qualities(&fetcher, &master_url);
        }
    }

    info!("fetching EPG feed from {}", config.epg_url);
    let epg_map = epg::build_epg_map(&fetcher, &config.epg_url, &channels);

    let documents = assemble::assemble(&channels, &epg_map, &config)?;
    write_documents(&config.output_dir, &documents)?;
    info!("wrote {} documents under {}", documents.len(), config.output_dir.display());
    Ok(())
}

/// Persist each assembled document under the output root, creating parent
/// directories as needed.
fn write_documents(root: &Path, documents: &[Document]) -> Result<(), Error> {
    for document in documents {
        let path = root.join(&document.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &document.content)?;
        debug!("file saved: {}", path.display());
    }
    Ok(())
}
