//! Streaming XMLTV guide parser
//!
//! Walks the decompressed guide document once, collecting channel
//! declaration ids and programmes grouped by their channel reference.
//! Ids and references are whitespace-trimmed; programme order within a
//! channel is the document order. Timestamps stay raw strings so the
//! guide can be re-emitted unchanged.

use crate::error::Error;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::{HashMap, HashSet};

/// Raw parse result, before any correlation or time filtering.
#[derive(Debug, Clone, Default)]
pub struct GuideData {
    /// Trimmed ids of every `<channel>` declaration.
    pub channel_ids: HashSet<String>,
    /// Programmes grouped by trimmed `channel` attribute, document order.
    pub programs: HashMap<String, Vec<GuideProgram>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideProgram {
    pub start: String,
    pub stop: String,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Root,
    Channel,
    Programme,
    Title,
    Desc,
}

/// Parse an XMLTV document. Any XML error is a feed-level parse failure;
/// the caller degrades the whole correlation map, so there is no partial
/// recovery here.
pub fn parse_guide(xml: &str) -> Result<GuideData, Error> {
    // Text is not trimmed at the reader level: entity references arrive as
    // separate GeneralRef events, and trimming would eat the whitespace
    // around them. The accumulated buffer is trimmed once per element.
    let mut reader = Reader::from_reader(xml.as_bytes());

    let mut guide = GuideData::default();
    let mut buf = Vec::with_capacity(8192);

    let mut state = State::Root;
    let mut current_channel_ref = String::new();
    let mut current: Option<GuideProgram> = None;
    let mut text_buf = String::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            // Self-closing elements get no End event, so they must not
            // change parser state.
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"channel" if state == State::Root => {
                    if let Some(id) = get_attribute(e, b"id") {
                        let id = id.trim().to_string();
                        if !id.is_empty() {
                            guide.channel_ids.insert(id);
                        }
                    }
                }
                b"icon" if state == State::Programme => {
                    if let Some(src) = get_attribute(e, b"src") {
                        if let Some(ref mut program) = current {
                            program.icon = Some(src);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"channel" if state == State::Root => {
                        if let Some(id) = get_attribute(e, b"id") {
                            let id = id.trim().to_string();
                            if !id.is_empty() {
                                guide.channel_ids.insert(id);
                            }
                        }
                        state = State::Channel;
                    }
                    b"programme" if state == State::Root => {
                        current_channel_ref = get_attribute(e, b"channel")
                            .unwrap_or_default()
                            .trim()
                            .to_string();
                        current = Some(GuideProgram {
                            start: get_attribute(e, b"start").unwrap_or_default(),
                            stop: get_attribute(e, b"stop").unwrap_or_default(),
                            title: String::new(),
                            description: None,
                            icon: None,
                        });
                        state = State::Programme;
                    }
                    b"title" if state == State::Programme => {
                        state = State::Title;
                        text_buf.clear();
                    }
                    b"desc" if state == State::Programme => {
                        state = State::Desc;
                        text_buf.clear();
                    }
                    b"icon" if state == State::Programme => {
                        if let Some(src) = get_attribute(e, b"src") {
                            if let Some(ref mut program) = current {
                                program.icon = Some(src);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if matches!(state, State::Title | State::Desc) {
                    text_buf.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            // Entity references in text content are their own events.
            Ok(Event::GeneralRef(e)) => {
                if matches!(state, State::Title | State::Desc) {
                    let raw = String::from_utf8_lossy(e.as_ref()).to_string();
                    if let Some(resolved) = resolve_entity(&raw) {
                        text_buf.push_str(&resolved);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"channel" => state = State::Root,
                    b"programme" => {
                        if let Some(mut program) = current.take() {
                            if program.title.is_empty() {
                                program.title = "No Title".to_string();
                            }
                            if !current_channel_ref.is_empty() {
                                guide
                                    .programs
                                    .entry(current_channel_ref.clone())
                                    .or_default()
                                    .push(program);
                            }
                        }
                        state = State::Root;
                    }
                    b"title" => {
                        if let Some(ref mut program) = current {
                            program.title = text_buf.trim().to_string();
                        }
                        state = State::Programme;
                    }
                    b"desc" => {
                        if let Some(ref mut program) = current {
                            let desc = text_buf.trim().to_string();
                            if !desc.is_empty() {
                                program.description = Some(desc);
                            }
                        }
                        state = State::Programme;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Parse(format!("XML error at byte {}: {}", position, e)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(guide)
}

/// Get attribute value from XML element
fn get_attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name {
            let raw = String::from_utf8(attr.value.as_ref().to_vec()).ok()?;
            return Some(decode_xml_entities(&raw));
        }
    }
    None
}

/// Decode the entities the feed actually uses. Attribute values still
/// arrive escaped; text content entities come in as GeneralRef events.
fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Resolve a general entity reference (name without `&`/`;`) to its text.
/// Unknown named entities are dropped.
fn resolve_entity(name: &str) -> Option<String> {
    let name = name.trim_start_matches('&').trim_end_matches(';');
    match name {
        "amp" => Some("&".to_string()),
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" => Some("'".to_string()),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                digits.parse::<u32>().ok()?
            };
            char::from_u32(code).map(String::from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_guide() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="ch1.id">
    <display-name>Channel One</display-name>
  </channel>
  <programme channel="ch1.id" start="20240115120000 +0000" stop="20240115130000 +0000">
    <title>News at Noon</title>
    <desc>Daily news broadcast</desc>
    <icon src="http://example.com/noon.png"/>
  </programme>
</tv>"#;

        let guide = parse_guide(xml).unwrap();
        assert!(guide.channel_ids.contains("ch1.id"));
        let programs = guide.programs.get("ch1.id").unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].title, "News at Noon");
        assert_eq!(programs[0].start, "20240115120000 +0000");
        assert_eq!(programs[0].description.as_deref(), Some("Daily news broadcast"));
        assert_eq!(programs[0].icon.as_deref(), Some("http://example.com/noon.png"));
    }

    #[test]
    fn test_ids_and_refs_are_trimmed() {
        let xml = r#"<tv>
  <channel id=" ch1 "/>
  <programme channel=" ch1 " start="20240115120000 +0000" stop="20240115130000 +0000">
    <title>Show</title>
  </programme>
</tv>"#;
        let guide = parse_guide(xml).unwrap();
        assert!(guide.channel_ids.contains("ch1"));
        assert_eq!(guide.programs.get("ch1").unwrap().len(), 1);
    }

    #[test]
    fn test_programme_order_is_document_order() {
        let xml = r#"<tv>
  <programme channel="c" start="20240115130000 +0000" stop="20240115140000 +0000"><title>B</title></programme>
  <programme channel="c" start="20240115120000 +0000" stop="20240115130000 +0000"><title>A</title></programme>
</tv>"#;
        let guide = parse_guide(xml).unwrap();
        let titles: Vec<_> = guide.programs.get("c").unwrap().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["B", "A"]);
    }

    #[test]
    fn test_missing_title_gets_placeholder() {
        let xml = r#"<tv><programme channel="c" start="1" stop="2"></programme></tv>"#;
        let guide = parse_guide(xml).unwrap();
        assert_eq!(guide.programs.get("c").unwrap()[0].title, "No Title");
    }

    #[test]
    fn test_entities_decoded() {
        let xml = r#"<tv><programme channel="c" start="1" stop="2"><title>Law &amp; Order</title></programme></tv>"#;
        let guide = parse_guide(xml).unwrap();
        assert_eq!(guide.programs.get("c").unwrap()[0].title, "Law & Order");
    }

    #[test]
    fn test_numeric_entities_decoded() {
        let xml = r#"<tv><programme channel="c" start="1" stop="2"><title>Caf&#233; &#x26; Bar</title></programme></tv>"#;
        let guide = parse_guide(xml).unwrap();
        assert_eq!(guide.programs.get("c").unwrap()[0].title, "Café & Bar");
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let result = parse_guide("<tv><programme channel=\"c\"><title>x</title></tv>");
        assert!(matches!(result, Err(Error::Parse(_))));
    }
}
