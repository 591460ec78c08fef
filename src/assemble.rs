//! Document assembler
//!
//! Pure composition of the whole output tree from the resolved channel
//! list and the correlation map: no network, no filesystem. Every URL
//! that documents use to reference each other is computed here, from the
//! same inputs, so cross-references agree by construction.

use crate::config::Config;
use crate::error::Error;
use crate::models::{Channel, EpgMap, ProgramEntry, Quality};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use serde::Serialize;
use std::collections::HashSet;

pub const PLAYLIST_FILE: &str = "rakuten_playlist.m3u";
pub const EPG_XML_FILE: &str = "rakuten_epg.xml";
pub const CHANNELS_JSON_FILE: &str = "rakuten_channels.json";
pub const EPG_JSON_FILE: &str = "rakuten_epg.json";
pub const CHANNEL_INDEX_FILE: &str = "rakuten_json.json";
pub const EPG_INDEX_FILE: &str = "rakuten_epg_json.json";
pub const PUBLISH_CONFIG_FILE: &str = "rakuten_config.json";

/// One output artifact: a destination path relative to the output tree
/// root, and its full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: String,
    pub content: String,
}

/// Per-channel output locations, assigned once per run and reused by every
/// document that references the channel.
struct ChannelSlot {
    json_path: String,
    json_url: String,
    epg_json_path: String,
    epg_json_url: String,
}

#[derive(Serialize)]
struct ChannelDescriptor<'a> {
    name: &'a str,
    tvg_id: &'a str,
    logo_url: &'a str,
    group_title: &'a str,
    original_master_url: &'a str,
    backup_master_url: String,
    qualities: &'a [Quality],
    json_url: &'a str,
    epg_url: &'a str,
}

#[derive(Serialize)]
struct ChannelEpgDocument<'a> {
    name: &'a str,
    tvg_id: &'a str,
    epg: &'a [ProgramEntry],
}

#[derive(Serialize)]
struct EpgChannelBlock<'a> {
    tvg_id: &'a str,
    name: &'a str,
    logo_url: &'a str,
    programs: &'a [ProgramEntry],
}

#[derive(Serialize)]
struct AggregateEpgDocument<'a> {
    channels: Vec<EpgChannelBlock<'a>>,
}

#[derive(Serialize)]
struct ChannelIndexDocument<'a> {
    channel_json_urls: Vec<&'a str>,
}

#[derive(Serialize)]
struct EpgIndexDocument<'a> {
    channel_epg_json_urls: Vec<&'a str>,
}

#[derive(Serialize)]
struct PublishConfigDocument {
    rakuten_json_url: String,
    rakuten_epg_json_url: String,
}

#[derive(Serialize)]
struct ChannelSummary<'a> {
    name: &'a str,
    tvg_id: &'a str,
    logo_url: &'a str,
    group_title: &'a str,
    stream_url: &'a str,
    backup_master_url: String,
    qualities: &'a [Quality],
}

#[derive(Serialize)]
struct MainDocument<'a> {
    channels: Vec<ChannelSummary<'a>>,
    epg_url: String,
}

/// Compose the full output document set.
pub fn assemble(channels: &[Channel], epg: &EpgMap, config: &Config) -> Result<Vec<Document>, Error> {
    let base = config.base();
    let slots = assign_slots(channels, &base);
    let epg_json_url = format!("{}{}", base, EPG_JSON_FILE);

    let mut documents = Vec::new();

    // Per-channel variant manifests, only for channels that had a primary
    // master URL; a failed resolution still gets a header-only manifest.
    for channel in channels {
        if channel.stream_url.is_some() {
            documents.push(Document {
                path: master_manifest_path(&channel.tvg_id),
                content: build_master_manifest(&channel.qualities),
            });
        }
    }

    documents.push(Document {
        path: EPG_JSON_FILE.to_string(),
        content: to_json(&AggregateEpgDocument {
            channels: channels
                .iter()
                .map(|channel| EpgChannelBlock {
                    tvg_id: &channel.tvg_id,
                    name: &channel.name,
                    logo_url: &channel.logo_url,
                    programs: programs_for(epg, &channel.tvg_id),
                })
                .collect(),
        })?,
    });

    for (channel, slot) in channels.iter().zip(&slots) {
        documents.push(Document {
            path: slot.json_path.clone(),
            content: to_json(&ChannelDescriptor {
                name: &channel.name,
                tvg_id: &channel.tvg_id,
                logo_url: &channel.logo_url,
                group_title: &channel.group_title,
                original_master_url: channel.stream_url.as_deref().unwrap_or_default(),
                backup_master_url: backup_master_url(&base, &channel.tvg_id),
                qualities: &channel.qualities,
                json_url: &slot.json_url,
                epg_url: &epg_json_url,
            })?,
        });
        documents.push(Document {
            path: slot.epg_json_path.clone(),
            content: to_json(&ChannelEpgDocument {
                name: &channel.name,
                tvg_id: &channel.tvg_id,
                epg: programs_for(epg, &channel.tvg_id),
            })?,
        });
    }

    documents.push(Document {
        path: CHANNEL_INDEX_FILE.to_string(),
        content: to_json(&ChannelIndexDocument {
            channel_json_urls: slots.iter().map(|s| s.json_url.as_str()).collect(),
        })?,
    });
    documents.push(Document {
        path: EPG_INDEX_FILE.to_string(),
        content: to_json(&EpgIndexDocument {
            channel_epg_json_urls: slots.iter().map(|s| s.epg_json_url.as_str()).collect(),
        })?,
    });
    documents.push(Document {
        path: PUBLISH_CONFIG_FILE.to_string(),
        content: to_json(&PublishConfigDocument {
            rakuten_json_url: format!("{}{}", base, CHANNEL_INDEX_FILE),
            rakuten_epg_json_url: format!("{}{}", base, EPG_INDEX_FILE),
        })?,
    });

    documents.push(Document {
        path: PLAYLIST_FILE.to_string(),
        content: build_playlist(channels, &base),
    });
    documents.push(Document {
        path: EPG_XML_FILE.to_string(),
        content: build_epg_xml(channels, epg)?,
    });
    documents.push(Document {
        path: CHANNELS_JSON_FILE.to_string(),
        content: to_json(&MainDocument {
            channels: channels
                .iter()
                .map(|channel| ChannelSummary {
                    name: &channel.name,
                    tvg_id: &channel.tvg_id,
                    logo_url: &channel.logo_url,
                    group_title: &channel.group_title,
                    stream_url: channel.stream_url.as_deref().unwrap_or_default(),
                    backup_master_url: backup_master_url(&base, &channel.tvg_id),
                    qualities: &channel.qualities,
                })
                .collect(),
            epg_url: epg_json_url,
        })?,
    });

    Ok(documents)
}

/// Sanitize a channel name for use in a path: Unicode alphanumerics,
/// underscore and hyphen survive, everything else is dropped; lowercased.
pub fn sanitize_channel_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_lowercase()
}

/// The canonical backup master URL for a channel, derived only from the
/// publish base and the identifier.
pub fn backup_master_url(base: &str, tvg_id: &str) -> String {
    format!("{}master/{}/master.m3u8", base, tvg_id)
}

fn master_manifest_path(tvg_id: &str) -> String {
    format!("master/{}/master.m3u8", tvg_id)
}

/// Assign each channel its path stem. Two channels that sanitize to the
/// same `{name}-{tvg_id}` stem get `-2`, `-3`, ... suffixes instead of
/// silently overwriting each other's documents.
fn assign_slots(channels: &[Channel], base: &str) -> Vec<ChannelSlot> {
    let mut taken: HashSet<String> = HashSet::new();

    channels
        .iter()
        .map(|channel| {
            let preferred = format!("{}-{}", sanitize_channel_name(&channel.name), channel.tvg_id);
            // A suffixed stem is reserved like any other, so it cannot
            // collide with a later channel that sanitizes to it naturally.
            let mut stem = preferred.clone();
            let mut n = 1;
            while !taken.insert(stem.clone()) {
                n += 1;
                stem = format!("{}-{}", preferred, n);
            }

            let json_path = format!("json/{}.json", stem);
            let epg_json_path = format!("epg_json/{}-epg.json", stem);
            ChannelSlot {
                json_url: format!("{}{}", base, json_path),
                epg_json_url: format!("{}{}", base, epg_json_path),
                json_path,
                epg_json_path,
            }
        })
        .collect()
}

fn programs_for<'a>(epg: &'a EpgMap, tvg_id: &str) -> &'a [ProgramEntry] {
    epg.get(tvg_id).map(Vec::as_slice).unwrap_or_default()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Io(e.into()))
}

/// Re-emit a channel's resolved variants as a master playlist.
pub fn build_master_manifest(qualities: &[Quality]) -> String {
    let mut content = String::from("#EXTM3U\n");
    for quality in qualities {
        let attributes: Vec<String> = quality
            .attributes
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value))
            .collect();
        content.push_str(&format!(
            "#EXT-X-STREAM-INF:{}\n{}\n",
            attributes.join(","),
            quality.url
        ));
    }
    content
}

/// Build the M3U playlist: one (Original) entry per channel with a primary
/// URL and one (Backup) entry for the derived backup manifest, with URL
/// de-duplication across the whole playlist (first occurrence wins).
pub fn build_playlist(channels: &[Channel], base: &str) -> String {
    let mut playlist = format!("#EXTM3U url-tvg=\"{}{}\"\n", base, EPG_XML_FILE);
    let mut seen_urls: HashSet<String> = HashSet::new();

    for channel in channels {
        if let Some(stream_url) = &channel.stream_url {
            if seen_urls.insert(stream_url.clone()) {
                playlist.push_str(&playlist_entry(channel, "Original", stream_url));
            }
        }
        let backup_url = backup_master_url(base, &channel.tvg_id);
        if seen_urls.insert(backup_url.clone()) {
            playlist.push_str(&playlist_entry(channel, "Backup", &backup_url));
        }
    }

    playlist
}

fn playlist_entry(channel: &Channel, variant: &str, url: &str) -> String {
    format!(
        "#EXTINF:-1 tvg-id=\"{}\" tvg-logo=\"{}\" group-title=\"{}\",{} ({})\n{}\n",
        channel.tvg_id, channel.logo_url, channel.group_title, channel.name, variant, url
    )
}

/// Build the XMLTV guide: a `<channel>` declaration per channel followed by
/// its retained programmes, raw timestamps re-emitted untouched.
pub fn build_epg_xml(channels: &[Channel], epg: &EpgMap) -> Result<String, Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("tv")))?;

    for channel in channels {
        let mut channel_el = BytesStart::new("channel");
        channel_el.push_attribute(("id", channel.tvg_id.as_str()));
        writer.write_event(Event::Start(channel_el))?;

        writer.write_event(Event::Start(BytesStart::new("display-name")))?;
        writer.write_event(Event::Text(BytesText::new(&channel.name)))?;
        writer.write_event(Event::End(BytesEnd::new("display-name")))?;

        let mut icon_el = BytesStart::new("icon");
        icon_el.push_attribute(("src", channel.logo_url.as_str()));
        writer.write_event(Event::Empty(icon_el))?;

        writer.write_event(Event::End(BytesEnd::new("channel")))?;

        for program in programs_for(epg, &channel.tvg_id) {
            let mut programme_el = BytesStart::new("programme");
            programme_el.push_attribute(("channel", channel.tvg_id.as_str()));
            programme_el.push_attribute(("start", program.start_time.as_str()));
            programme_el.push_attribute(("stop", program.stop_time.as_str()));
            writer.write_event(Event::Start(programme_el))?;

            writer.write_event(Event::Start(BytesStart::new("title")))?;
            writer.write_event(Event::Text(BytesText::new(&program.title)))?;
            writer.write_event(Event::End(BytesEnd::new("title")))?;

            if let Some(description) = &program.description {
                writer.write_event(Event::Start(BytesStart::new("desc")))?;
                writer.write_event(Event::Text(BytesText::new(description)))?;
                writer.write_event(Event::End(BytesEnd::new("desc")))?;
            }
            if let Some(icon) = &program.icon {
                let mut icon_el = BytesStart::new("icon");
                icon_el.push_attribute(("src", icon.as_str()));
                writer.write_event(Event::Empty(icon_el))?;
            }

            writer.write_event(Event::End(BytesEnd::new("programme")))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("tv")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
