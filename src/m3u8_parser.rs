//! HLS master manifest resolver
//!
//! Parses `#EXT-X-STREAM-INF` descriptor/URL pairs out of a master
//! playlist into an ordered, URL-deduplicated quality list. Resolution
//! failures degrade to an empty list — a channel without qualities is
//! still emitted.

use crate::fetch::Fetcher;
use crate::models::Quality;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};
use url::Url;

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// Fetch and parse a master manifest. Never fatal: transport or URL
/// failures log a warning and yield no qualities.
pub fn resolve_qualities(fetcher: &Fetcher, master_url: &str) -> Vec<Quality> {
    let content = match fetcher.text(master_url) {
        Ok(content) => content,
        Err(e) => {
            warn!("failed to fetch master manifest: {}", e);
            return Vec::new();
        }
    };
    parse_master(&content, master_url)
}

/// Parse master manifest text. Variant URIs are resolved against the
/// manifest's own URL; duplicates (by absolute URL) keep the first
/// descriptor's attributes.
pub fn parse_master(content: &str, master_url: &str) -> Vec<Quality> {
    let base = match Url::parse(master_url) {
        Ok(base) => base,
        Err(e) => {
            warn!("invalid master manifest URL {:?}: {}", master_url, e);
            return Vec::new();
        }
    };

    let mut qualities = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        if let Some(attr_str) = line.strip_prefix(STREAM_INF) {
            let attributes = parse_attributes(attr_str);

            // The URL is the next non-comment, non-empty line. Another
            // descriptor line abandons this one.
            let mut j = i + 1;
            while j < lines.len() {
                let candidate = lines[j].trim();
                if candidate.is_empty() || (candidate.starts_with('#') && !candidate.starts_with(STREAM_INF)) {
                    j += 1;
                    continue;
                }
                break;
            }

            if let Some(&url_line) = lines.get(j) {
                let url_line = url_line.trim();
                if !url_line.starts_with('#') {
                    match base.join(url_line) {
                        Ok(absolute) => {
                            let absolute = absolute.to_string();
                            if seen_urls.insert(absolute.clone()) {
                                qualities.push(Quality { url: absolute, attributes });
                            } else {
                                debug!("dropping duplicate variant URL {}", absolute);
                            }
                        }
                        Err(e) => debug!("skipping unresolvable variant URI {:?}: {}", url_line, e),
                    }
                    i = j + 1;
                    continue;
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }

    qualities
}

/// Naive comma split of the descriptor attribute list; fragments without
/// `=` are dropped, values lose surrounding double quotes.
fn parse_attributes(attr_str: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for part in attr_str.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            attributes.insert(key.trim().to_string(), value.trim_matches('"').to_string());
        }
    }
    attributes
}
