//! Decoded song bundle model
//!
//! A [`SongBundle`] is the in-memory result of decoding one song pack: the
//! opaque metadata document, typed views of the regions the player
//! interprets (song fields, track list, lyrics, presets), and every
//! uninterpreted entry kept verbatim for lossless re-encoding.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::container::Entry;
use crate::error::ArchiveError;

/// Song identity fields parsed from the metadata document
///
/// `title` and `artist` are guaranteed present and non-empty after a
/// successful decode; everything else is optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongInfo {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    /// Musical key (e.g., "Am", "C#m")
    pub key: Option<String>,
    pub duration_sec: Option<f64>,
}

/// One stem track: a payload entry plus its authoring defaults
///
/// `id` is the stable join key the mixer uses; it derives from the explicit
/// `name` descriptor in the track list, falling back to the payload
/// filename stem, and is unique within a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Stem identifier ("vocals", "drums", ...)
    pub id: String,
    /// Payload entry name inside the container
    pub source_name: String,
    /// Encoded audio bytes, verbatim. `None` if the referenced entry is
    /// absent from the container (the stem plays silent, and re-encoding
    /// must not invent an entry for it).
    pub payload: Option<Vec<u8>>,
    /// Authored default gain in dB
    pub gain_db: f32,
    /// Authored default pan (-1.0 left .. 1.0 right)
    pub pan: f32,
    pub solo: bool,
    pub mute: bool,
}

/// One timed lyric line
///
/// Bundles keep lyric lines sorted by `start_sec` ascending; sequential
/// lookup during playback relies on that ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    #[serde(rename = "start")]
    pub start_sec: f64,
    #[serde(rename = "end")]
    pub end_sec: f64,
    pub text: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(rename = "backupSinger", default)]
    pub backup_singer: bool,
}

/// Author-supplied mix defaults shipped inside a bundle
///
/// Presets are data: the mixer applies one on load only when it is flagged
/// `default`, never just because it is first in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    /// Apply this preset automatically when the song loads
    #[serde(default)]
    pub default: bool,
    /// Stem ids muted by this preset (on both buses)
    #[serde(default)]
    pub mute: Vec<String>,
    /// Per-stem gain overrides in dB
    #[serde(rename = "gainDb", default)]
    pub gain_db: BTreeMap<String, f32>,
}

/// The fully decoded, in-memory representation of one song pack
#[derive(Debug, Clone)]
pub struct SongBundle {
    /// The complete metadata document, kept opaque for lossless merging
    pub metadata: Value,
    /// Typed view of the document's `song` object
    pub song: SongInfo,
    /// Stem tracks in track-list order
    pub tracks: Vec<Track>,
    /// Timed lyrics, sorted by start time
    pub lyrics: Vec<LyricLine>,
    /// Author-supplied mix presets
    pub presets: Vec<Preset>,
    /// Everything the player does not interpret, in original order.
    /// Never contains the metadata document or a referenced track payload.
    pub raw_entries: Vec<Entry>,
}

impl SongBundle {
    /// Assemble a bundle from a parsed metadata document and the remaining
    /// container entries (everything except the metadata document itself)
    ///
    /// Fails with [`ArchiveError::InvalidBundle`] if required song fields
    /// are missing or track ids collide. A referenced payload with no
    /// matching entry logs a warning and yields a payload-less silent track.
    pub fn assemble(metadata: Value, entries: Vec<Entry>) -> Result<Self, ArchiveError> {
        let doc = metadata
            .as_object()
            .ok_or_else(|| ArchiveError::MalformedMetadata("document root is not an object".into()))?;

        let song = parse_song(doc)?;
        let track_specs = parse_track_specs(doc)?;
        let lyrics = parse_lyrics(doc)?;
        let presets = parse_presets(doc)?;

        // Split entries into referenced payloads and opaque passthrough,
        // preserving the original order of the passthrough set.
        let referenced: HashSet<&str> = track_specs.iter().map(|t| t.file.as_str()).collect();
        let mut payloads: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut raw_entries = Vec::new();
        for entry in entries {
            if referenced.contains(entry.name.as_str()) {
                payloads.insert(entry.name, entry.data);
            } else {
                raw_entries.push(entry);
            }
        }

        let mut seen_ids = HashSet::new();
        let mut tracks = Vec::with_capacity(track_specs.len());
        for spec in track_specs {
            if !seen_ids.insert(spec.id.clone()) {
                return Err(ArchiveError::InvalidBundle(format!(
                    "duplicate stem id '{}'",
                    spec.id
                )));
            }

            let payload = payloads.remove(&spec.file);
            if payload.is_none() {
                log::warn!(
                    "Track '{}' references missing payload '{}', registering silent stem",
                    spec.id,
                    spec.file
                );
            }

            tracks.push(Track {
                id: spec.id,
                source_name: spec.file,
                payload,
                gain_db: spec.gain_db,
                pan: spec.pan,
                solo: spec.solo,
                mute: spec.mute,
            });
        }

        Ok(Self {
            metadata,
            song,
            tracks,
            lyrics,
            presets,
            raw_entries,
        })
    }

    /// The preset flagged as the bundle's explicit default, if any
    pub fn default_preset(&self) -> Option<&Preset> {
        self.presets.iter().find(|p| p.default)
    }
}

/// Intermediate track-list record before payload resolution
struct TrackSpec {
    id: String,
    file: String,
    gain_db: f32,
    pan: f32,
    solo: bool,
    mute: bool,
}

fn parse_song(doc: &Map<String, Value>) -> Result<SongInfo, ArchiveError> {
    let song = doc
        .get("song")
        .and_then(Value::as_object)
        .ok_or_else(|| ArchiveError::InvalidBundle("missing 'song' object".into()))?;

    let title = required_str(song, "title")?;
    let artist = required_str(song, "artist")?;

    Ok(SongInfo {
        title,
        artist,
        album: optional_str(song, "album"),
        year: song.get("year").and_then(Value::as_i64),
        genre: optional_str(song, "genre"),
        key: optional_str(song, "key"),
        duration_sec: song.get("durationSec").and_then(Value::as_f64),
    })
}

fn parse_track_specs(doc: &Map<String, Value>) -> Result<Vec<TrackSpec>, ArchiveError> {
    let Some(value) = doc.get("tracks") else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| ArchiveError::MalformedMetadata("'tracks' is not an array".into()))?;

    let mut specs = Vec::with_capacity(items.len());
    for item in items {
        let obj = item
            .as_object()
            .ok_or_else(|| ArchiveError::MalformedMetadata("track entry is not an object".into()))?;
        let file = required_str(obj, "file").map_err(|_| {
            ArchiveError::InvalidBundle("track entry missing 'file'".into())
        })?;

        // Explicit source descriptor wins; otherwise the filename stem
        // ("vocals.ogg" -> "vocals") is the stable stem label.
        let id = optional_str(obj, "name").unwrap_or_else(|| {
            Path::new(&file)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(file.as_str())
                .to_string()
        });

        specs.push(TrackSpec {
            id,
            file,
            gain_db: obj.get("gainDb").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            pan: obj.get("pan").and_then(Value::as_f64).unwrap_or(0.0) as f32,
            solo: obj.get("solo").and_then(Value::as_bool).unwrap_or(false),
            mute: obj.get("mute").and_then(Value::as_bool).unwrap_or(false),
        });
    }
    Ok(specs)
}

fn parse_lyrics(doc: &Map<String, Value>) -> Result<Vec<LyricLine>, ArchiveError> {
    let Some(value) = doc.get("lyrics") else {
        return Ok(Vec::new());
    };
    let mut lyrics: Vec<LyricLine> = serde_json::from_value(value.clone())
        .map_err(|e| ArchiveError::MalformedMetadata(format!("lyrics: {}", e)))?;
    // Sequential playback lookup requires ascending start times.
    lyrics.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    Ok(lyrics)
}

fn parse_presets(doc: &Map<String, Value>) -> Result<Vec<Preset>, ArchiveError> {
    let Some(value) = doc.get("presets") else {
        return Ok(Vec::new());
    };
    serde_json::from_value(value.clone())
        .map_err(|e| ArchiveError::MalformedMetadata(format!("presets: {}", e)))
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String, ArchiveError> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(ArchiveError::InvalidBundle(format!(
            "missing required field '{}'",
            key
        ))),
    }
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}
