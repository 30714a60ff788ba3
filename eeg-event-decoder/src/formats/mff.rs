//! EGI MFF recording reader
//!
//! An MFF recording is a directory bundle. This reader only touches its XML
//! metadata: `info.xml` (record start), `info1.xml` (montage name) and the
//! `Events_*.xml` event tracks. Signal blocks are not decoded.
//!
//! ## Event track layout
//! ```text
//! <eventTrack>
//!   <name>ECI TCP-IP 55513</name>
//!   <event>
//!     <beginTime>2023-11-15T10:31:22.123456-08:00</beginTime>
//!     <duration>500</duration>
//!     <code>img+</code>
//!     <label>...</label>
//!     <keys><key><keyCode>cel#</keyCode><data dataType="short">1</data></key></keys>
//!   </event>
//! </eventTrack>
//! ```

use super::{EventTrack, RecordingReader};
use crate::types::{DecoderError, RawEvent, Result};
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const INFO_FILE: &str = "info.xml";
const DATA_INFO_FILE: &str = "info1.xml";
const TRACK_PREFIX: &str = "Events_";

/// Reader over an `.mff` directory
#[derive(Debug, Clone)]
pub struct MffReader {
    root: PathBuf,
}

impl MffReader {
    /// Event-track files, sorted by file name
    pub fn track_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_track = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(TRACK_PREFIX) && n.to_lowercase().ends_with(".xml"))
                .unwrap_or(false);
            if is_track && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_xml(&self, file_name: &str) -> Result<Element> {
        let path = self.root.join(file_name);
        let content = fs::read_to_string(&path).map_err(|e| {
            DecoderError::LogParseError(format!("Failed to read {:?}: {}", path, e))
        })?;
        parse_xml(&content)
            .map_err(|e| DecoderError::LogParseError(format!("{:?}: {}", path, e)))
    }
}

impl RecordingReader for MffReader {
    fn open(path: &Path) -> Result<Self> {
        log::info!("Opening MFF recording: {:?}", path);

        if !path.is_dir() {
            return Err(DecoderError::LogParseError(format!(
                "MFF recording not found or not a directory: {:?}",
                path
            )));
        }

        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    fn start_time(&self) -> Result<NaiveDateTime> {
        let info = self.read_xml(INFO_FILE)?;
        let raw = info.find("recordTime").map(Element::text).ok_or_else(|| {
            DecoderError::LogParseError(format!("{} has no recordTime", INFO_FILE))
        })?;
        crate::timestamps::parse_wall_clock(raw)
    }

    fn montage_name(&self) -> Result<Option<String>> {
        if !self.root.join(DATA_INFO_FILE).exists() {
            log::debug!("No {} in {:?}", DATA_INFO_FILE, self.root);
            return Ok(None);
        }
        let info = self.read_xml(DATA_INFO_FILE)?;
        Ok(info
            .find("montageName")
            .map(|e| e.text().to_string())
            .filter(|s| !s.is_empty()))
    }

    fn event_tracks(&self) -> Result<Vec<EventTrack>> {
        let files = self.track_files()?;
        if files.is_empty() {
            return Err(DecoderError::MissingEvents(self.root.clone()));
        }

        let mut tracks = Vec::with_capacity(files.len());
        for path in files {
            let content = fs::read_to_string(&path)?;
            let track = parse_event_track(&content, &path)?;
            log::debug!(
                "Track '{}' ({:?}): {} events",
                track.name,
                path.file_name().unwrap_or_default(),
                track.events.len()
            );
            tracks.push(track);
        }
        Ok(tracks)
    }
}

/// Parse an event-track document
pub fn parse_event_track(content: &str, path: &Path) -> Result<EventTrack> {
    let root = parse_xml(content)
        .map_err(|e| DecoderError::LogParseError(format!("{:?}: {}", path, e)))?;

    let name = root
        .child("name")
        .map(|e| e.text().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| track_name_from_path(path));

    let events = root
        .children_named("event")
        .enumerate()
        .map(|(i, e)| {
            convert_event(e).map_err(|err| {
                DecoderError::LogParseError(format!("{:?} event #{}: {}", path, i, err))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(EventTrack {
        path: path.to_path_buf(),
        name,
        events,
    })
}

fn track_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_start_matches(TRACK_PREFIX).to_string())
        .unwrap_or_default()
}

/// Convert an `<event>` element into a validated RawEvent
fn convert_event(event: &Element) -> Result<RawEvent> {
    let code = event
        .child("code")
        .map(|e| e.text().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DecoderError::InvalidData("event has no code".to_string()))?;

    let begin = event
        .child("beginTime")
        .ok_or_else(|| DecoderError::InvalidData(format!("event '{}' has no beginTime", code)))?;
    let begin_time = crate::timestamps::parse_wall_clock(begin.text())?;

    let duration_ms = match event.child("duration").map(Element::text) {
        Some(raw) if !raw.is_empty() => raw.parse::<f64>().map_err(|_| {
            DecoderError::InvalidData(format!("event '{}' has invalid duration '{}'", code, raw))
        })?,
        _ => 0.0,
    };

    let label = event
        .child("label")
        .map(|e| e.text().to_string())
        .filter(|s| !s.is_empty());

    let mut keys = BTreeMap::new();
    if let Some(key_list) = event.child("keys") {
        for key in key_list.children_named("key") {
            let key_code = key.child("keyCode").map(Element::text).unwrap_or_default();
            if key_code.is_empty() {
                continue;
            }
            let data = key.child("data").map(Element::text).unwrap_or_default();
            keys.insert(key_code.to_string(), data.to_string());
        }
    }

    RawEvent::new(code, begin_time, duration_ms, label, keys)
}

/// Minimal element tree built from a quick-xml event stream
#[derive(Debug, Default, Clone)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn text(&self) -> &str {
        self.text.trim()
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Depth-first search for the first descendant with this name
    fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn parse_xml(content: &str) -> std::result::Result<Element, String> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element {
                name: local_name(e.local_name().as_ref()),
                ..Default::default()
            }),
            Ok(Event::Empty(e)) => {
                let element = Element {
                    name: local_name(e.local_name().as_ref()),
                    ..Default::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<eventTrack xmlns="http://www.egi.com/event_mff" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <name>ECI TCP-IP 55513</name>
    <trackType>EVNT</trackType>
    <event>
        <beginTime>2023-11-15T10:31:22.000000-08:00</beginTime>
        <duration>1000</duration>
        <code>CELL</code>
        <label>match</label>
        <description></description>
        <keys>
            <key><keyCode>cel#</keyCode><data dataType="short">1</data></key>
        </keys>
    </event>
    <event>
        <beginTime>2023-11-15T10:31:25.500000-08:00</beginTime>
        <duration>500</duration>
        <code>img+</code>
        <keys>
            <key><keyCode>cel#</keyCode><data dataType="short">1</data></key>
            <key><keyCode>obs#</keyCode><data dataType="short">4</data></key>
        </keys>
    </event>
    <event>
        <beginTime>2023-11-15T10:31:26.000000-08:00</beginTime>
        <code>bgin</code>
        <keys/>
    </event>
</eventTrack>"#;

    #[test]
    fn test_parse_event_track() {
        let track = parse_event_track(TRACK, Path::new("Events_ECI TCP-IP 55513.xml")).unwrap();
        assert_eq!(track.name, "ECI TCP-IP 55513");
        assert_eq!(track.events.len(), 3);

        let legend = &track.events[0];
        assert_eq!(legend.code, "CELL");
        assert_eq!(legend.label.as_deref(), Some("match"));
        assert_eq!(legend.cell, Some(1));

        let stim = &track.events[1];
        assert_eq!(stim.code, "img+");
        assert_eq!(stim.duration_ms, 500.0);
        assert_eq!(stim.keys.get("obs#").map(String::as_str), Some("4"));

        let bgin = &track.events[2];
        assert_eq!(bgin.duration_ms, 0.0);
        assert!(bgin.keys.is_empty());
        assert_eq!(bgin.cell, None);
    }

    #[test]
    fn test_track_name_falls_back_to_file_name() {
        let doc = "<eventTrack><event><beginTime>2023-01-01T00:00:00</beginTime><code>DIN8</code></event></eventTrack>";
        let track = parse_event_track(doc, Path::new("/tmp/Events_DIN 1.xml")).unwrap();
        assert_eq!(track.name, "DIN 1");
        assert_eq!(track.events[0].code, "DIN8");
    }

    #[test]
    fn test_event_without_code_is_rejected() {
        let doc = "<eventTrack><event><beginTime>2023-01-01T00:00:00</beginTime></event></eventTrack>";
        assert!(parse_event_track(doc, Path::new("Events_x.xml")).is_err());
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_xml("<eventTrack><event></eventTrack>").is_err());
        assert!(parse_xml("").is_err());
    }

    #[test]
    fn test_find_descendant() {
        let doc = "<dataInfo><generalInformation><montageName>HydroCel GSN 128 1.0</montageName></generalInformation></dataInfo>";
        let root = parse_xml(doc).unwrap();
        assert_eq!(root.find("montageName").unwrap().text(), "HydroCel GSN 128 1.0");
        assert!(root.find("recordTime").is_none());
    }
}
