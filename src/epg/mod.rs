//! EPG fetch and correlation
//!
//! Pulls the gzip-compressed XMLTV feed, parses it, and builds the
//! per-channel programme map. Any feed-level failure (transport, gzip,
//! XML) degrades to an all-empty map; the run keeps going.

mod parser;

pub use parser::GuideData;

use parser::GuideProgram;

use crate::error::Error;
use crate::fetch::Fetcher;
use crate::models::{Channel, EpgMap, ProgramEntry};
use chrono::{DateTime, FixedOffset, Utc};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, info, warn};

/// XMLTV timestamp layout: `YYYYMMDDHHMMSS +ZZZZ`.
const XMLTV_TIME_FORMAT: &str = "%Y%m%d%H%M%S %z";

/// Fetch the guide feed and correlate it against the channel list.
///
/// "Now" is captured once here; every stop-time comparison in the run
/// uses the same instant.
pub fn build_epg_map(fetcher: &Fetcher, epg_url: &str, channels: &[Channel]) -> EpgMap {
    let now = Utc::now();
    match fetch_guide(fetcher, epg_url) {
        Ok(guide) => {
            info!(
                "guide feed parsed: {} channel declarations, {} referenced channels",
                guide.channel_ids.len(),
                guide.programs.len()
            );
            correlate(channels, &guide, now)
        }
        Err(e) => {
            warn!("continuing without EPG: {}", e);
            channels
                .iter()
                .map(|c| (c.tvg_id.clone(), Vec::new()))
                .collect()
        }
    }
}

/// Fetch and decompress the feed, then parse the XMLTV document.
pub fn fetch_guide(fetcher: &Fetcher, url: &str) -> Result<GuideData, Error> {
    let compressed = fetcher.bytes(url)?;

    let mut xml = String::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_string(&mut xml)
        .map_err(|e| Error::Parse(format!("gzip decompression failed: {}", e)))?;

    parser::parse_guide(&xml)
}

/// Build the correlation map: every input channel gets an entry, holding
/// the guide programmes whose stop time is strictly after `now`.
///
/// Identifier matching is an exact string comparison after trimming both
/// sides; no case folding, no fuzzy matching.
pub fn correlate(channels: &[Channel], guide: &GuideData, now: DateTime<Utc>) -> EpgMap {
    let mut map = EpgMap::new();

    for channel in channels {
        let guide_id = channel.tvg_id.trim();
        let mut entries = Vec::new();

        if guide.channel_ids.contains(guide_id) {
            for program in guide.programs.get(guide_id).map(Vec::as_slice).unwrap_or_default() {
                // Both timestamps must parse; a programme with a garbage
                // start would otherwise be re-emitted verbatim downstream.
                match parse_guide_times(program) {
                    Ok((_, stop)) if stop > now => entries.push(ProgramEntry {
                        start_time: program.start.clone(),
                        stop_time: program.stop.clone(),
                        title: program.title.clone(),
                        description: program.description.clone(),
                        icon: program.icon.clone(),
                    }),
                    Ok(_) => {}
                    Err(e) => {
                        debug!("skipping programme {:?} on {}: {}", program.title, guide_id, e);
                    }
                }
            }
        } else {
            debug!("no guide channel declaration for {:?}", guide_id);
        }

        map.insert(channel.tvg_id.clone(), entries);
    }

    map
}

fn parse_guide_times(
    program: &GuideProgram,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), Error> {
    Ok((parse_guide_time(&program.start)?, parse_guide_time(&program.stop)?))
}

fn parse_guide_time(raw: &str) -> Result<DateTime<FixedOffset>, Error> {
    DateTime::parse_from_str(raw.trim(), XMLTV_TIME_FORMAT)
        .map_err(|_| Error::Timestamp(raw.to_string()))
}
