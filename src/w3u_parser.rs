//! W3U source playlist parser
//!
//! W3U is a JSON object wrapped in arbitrary text: the parse locates the
//! first `{` and the last `}` and treats the span between them as JSON.
//! Groups hold stations; a malformed station is skipped, never fatal.

use crate::error::Error;
use crate::models::Channel;
use serde_json::Value;
use tracing::debug;

/// Wire sentinel some stations carry instead of a real stream URL.
const NO_URL_SENTINEL: &str = "# no_url";

/// Parse W3U text into the ordered channel list (qualities left empty).
pub fn parse_w3u(content: &str) -> Result<Vec<Channel>, Error> {
    let start = content
        .find('{')
        .ok_or_else(|| Error::Format("no JSON object found in W3U content".into()))?;
    let end = content
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| Error::Format("no closing brace found in W3U content".into()))?;

    let data: Value = serde_json::from_str(&content[start..=end])
        .map_err(|e| Error::Format(format!("embedded JSON is invalid: {}", e)))?;

    let mut channels = Vec::new();
    let groups = data.get("groups").and_then(Value::as_array);

    for group in groups.into_iter().flatten() {
        let group_title = group
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("No Group");

        let stations = group.get("stations").and_then(Value::as_array);
        for station in stations.into_iter().flatten() {
            if !station.is_object() {
                debug!("skipping non-object station entry in group {:?}", group_title);
                continue;
            }

            let name = station
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("No Name");

            // Identifier fallback chain: epgId, then name, then a fixed
            // placeholder; the chosen value is normalized either way.
            let raw_id = station
                .get("epgId")
                .and_then(Value::as_str)
                .or_else(|| station.get("name").and_then(Value::as_str))
                .unwrap_or("no_epg_id");

            let logo_url = station
                .get("image")
                .and_then(Value::as_str)
                .unwrap_or_default();

            let stream_url = station
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty() && *url != NO_URL_SENTINEL)
                .map(str::to_string);

            channels.push(Channel {
                name: name.to_string(),
                tvg_id: normalize_id(raw_id),
                logo_url: logo_url.to_string(),
                group_title: group_title.to_string(),
                stream_url,
                qualities: Vec::new(),
            });
        }
    }

    Ok(channels)
}

/// Normalize an identifier: spaces become hyphens, then lowercase.
fn normalize_id(raw: &str) -> String {
    raw.replace(' ', "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_w3u() {
        let content = r#"Some header text
{"groups": [{"name": "News", "stations": [
    {"name": "Ch1", "epgId": "ch1.id", "image": "http://x/logo.png", "url": "http://x/master.m3u8"}
]}]}
trailing junk"#;
        let channels = parse_w3u(content).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Ch1");
        assert_eq!(channels[0].tvg_id, "ch1.id");
        assert_eq!(channels[0].group_title, "News");
        assert_eq!(channels[0].stream_url.as_deref(), Some("http://x/master.m3u8"));
        assert!(channels[0].qualities.is_empty());
    }

    #[test]
    fn test_identifier_falls_back_to_name() {
        let content = r#"{"groups": [{"name": "G", "stations": [{"name": "My Channel HD"}]}]}"#;
        let channels = parse_w3u(content).unwrap();
        assert_eq!(channels[0].tvg_id, "my-channel-hd");
    }

    #[test]
    fn test_identifier_placeholder_when_nothing_present() {
        let content = r#"{"groups": [{"stations": [{}]}]}"#;
        let channels = parse_w3u(content).unwrap();
        assert_eq!(channels[0].tvg_id, "no_epg_id");
        assert_eq!(channels[0].name, "No Name");
        assert_eq!(channels[0].group_title, "No Group");
        assert_eq!(channels[0].logo_url, "");
        assert!(channels[0].stream_url.is_none());
    }

    #[test]
    fn test_epg_id_is_normalized_too() {
        let content = r#"{"groups": [{"name": "G", "stations": [{"name": "A", "epgId": "Some ID"}]}]}"#;
        let channels = parse_w3u(content).unwrap();
        assert_eq!(channels[0].tvg_id, "some-id");
    }

    #[test]
    fn test_no_url_sentinel_becomes_absent() {
        let content = r##"{"groups": [{"name": "G", "stations": [{"name": "A", "url": "# no_url"}]}]}"##;
        let channels = parse_w3u(content).unwrap();
        assert!(channels[0].stream_url.is_none());
    }

    #[test]
    fn test_malformed_station_is_skipped() {
        let content = r#"{"groups": [{"name": "G", "stations": [42, {"name": "Real"}]}]}"#;
        let channels = parse_w3u(content).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Real");
    }

    #[test]
    fn test_missing_braces_is_fatal() {
        assert!(matches!(parse_w3u("no json here"), Err(Error::Format(_))));
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        assert!(matches!(parse_w3u("{not valid json}"), Err(Error::Format(_))));
    }

    #[test]
    fn test_station_order_is_preserved() {
        let content = r#"{"groups": [
            {"name": "A", "stations": [{"name": "One"}, {"name": "Two"}]},
            {"name": "B", "stations": [{"name": "Three"}]}
        ]}"#;
        let channels = parse_w3u(content).unwrap();
        let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["One", "Two", "Three"]);
    }
}
