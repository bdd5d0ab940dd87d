//! Song pack decode and encode
//!
//! Decode streams entries out of a container and assembles a [`SongBundle`].
//! Encode is a merge-and-rewrite: it re-decodes the target file to obtain
//! the authoritative metadata document and passthrough entries (a
//! caller-supplied bundle could be stale), merges the patch, and writes a
//! complete new container to a temp file that is atomically renamed over
//! the original. A crash before the rename leaves the original intact; the
//! orphaned temp is left for the caller to reap.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::PoisonError;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::bundle::{LyricLine, SongBundle};
use crate::container::{ContainerReader, ContainerWriter, METADATA_ENTRY};
use crate::error::ArchiveError;
use crate::lock::write_lock;

/// Partial update to a song pack's `song` object
///
/// Only `Some` fields are written; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub key: Option<String>,
    pub duration_sec: Option<f64>,
}

impl SongPatch {
    fn apply(&self, song: &mut Map<String, Value>) {
        if let Some(v) = &self.title {
            song.insert("title".into(), json!(v));
        }
        if let Some(v) = &self.artist {
            song.insert("artist".into(), json!(v));
        }
        if let Some(v) = &self.album {
            song.insert("album".into(), json!(v));
        }
        if let Some(v) = self.year {
            song.insert("year".into(), json!(v));
        }
        if let Some(v) = &self.genre {
            song.insert("genre".into(), json!(v));
        }
        if let Some(v) = &self.key {
            song.insert("key".into(), json!(v));
        }
        if let Some(v) = self.duration_sec {
            song.insert("durationSec".into(), json!(v));
        }
    }

    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Partial update applied by [`encode`]
#[derive(Debug, Clone, Default)]
pub struct BundlePatch {
    /// Song field corrections, shallow-merged into the `song` object
    pub song: SongPatch,
    /// Extra document corrections, shallow-merged into the document root
    pub meta: Map<String, Value>,
    /// Replacement lyrics. An EMPTY vec preserves the stored lyrics rather
    /// than erasing them; wiping lyrics is not something a save can do.
    pub lyrics: Vec<LyricLine>,
}

/// Decode a song pack into a [`SongBundle`]
///
/// Decodes are read-only and may run concurrently, including against a
/// path that is currently being encoded (the rename is atomic, so a reader
/// sees either the old or the new complete file).
pub fn decode<P: AsRef<Path>>(path: P) -> Result<SongBundle, ArchiveError> {
    let path = path.as_ref();
    log::debug!("decode: reading song pack {:?}", path);

    let mut reader = ContainerReader::open(path)?;
    let entries = reader.read_all()?;

    let mut metadata: Option<Value> = None;
    let mut rest = Vec::with_capacity(entries.len());
    for entry in entries {
        if metadata.is_none() && entry.name == METADATA_ENTRY {
            let doc = serde_json::from_slice(&entry.data)
                .map_err(|e| ArchiveError::MalformedMetadata(e.to_string()))?;
            metadata = Some(doc);
        } else {
            rest.push(entry);
        }
    }

    let metadata = metadata.ok_or_else(|| {
        ArchiveError::MalformedMetadata(format!("no '{}' entry", METADATA_ENTRY))
    })?;

    SongBundle::assemble(metadata, rest)
}

/// Merge a patch into the song pack at `path` and persist it atomically
///
/// Encodes for the same path are serialized in-process: a concurrent call
/// for a busy path waits for the in-flight write to land, then re-decodes
/// and applies its own patch on top, so earlier changes accumulate and the
/// last patch wins for the fields it names.
pub fn encode<P: AsRef<Path>>(patch: &BundlePatch, path: P) -> Result<(), ArchiveError> {
    let path = path.as_ref();
    // Canonicalize so aliases of the same file queue on the same lock.
    // The target must already exist: encode updates packs, it does not
    // create them.
    let canonical = path.canonicalize()?;
    let lock = write_lock(&canonical);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

    log::debug!("encode: updating song pack {:?}", canonical);

    let bundle = decode(&canonical)?;
    let mut doc = bundle.metadata.clone();
    merge_patch(&mut doc, patch)?;
    let metadata_bytes = serde_json::to_vec_pretty(&doc)
        .map_err(|e| ArchiveError::MalformedMetadata(e.to_string()))?;

    let tmp = temp_path(&canonical);
    let result = write_container(&tmp, &metadata_bytes, &bundle)
        .and_then(|_| fs::rename(&tmp, &canonical).map_err(ArchiveError::from));
    if result.is_err() {
        // Clean up our own failed attempt; crash orphans are the caller's.
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn merge_patch(doc: &mut Value, patch: &BundlePatch) -> Result<(), ArchiveError> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| ArchiveError::MalformedMetadata("document root is not an object".into()))?;

    if !patch.song.is_empty() {
        let song = root
            .entry("song")
            .or_insert_with(|| Value::Object(Map::new()));
        let song = song
            .as_object_mut()
            .ok_or_else(|| ArchiveError::MalformedMetadata("'song' is not an object".into()))?;
        patch.song.apply(song);
    }

    for (key, value) in &patch.meta {
        root.insert(key.clone(), value.clone());
    }

    if !patch.lyrics.is_empty() {
        let lyrics = serde_json::to_value(&patch.lyrics)
            .map_err(|e| ArchiveError::MalformedMetadata(e.to_string()))?;
        root.insert("lyrics".into(), lyrics);
    }

    Ok(())
}

fn write_container(
    tmp: &Path,
    metadata_bytes: &[u8],
    bundle: &SongBundle,
) -> Result<(), ArchiveError> {
    let mut writer = ContainerWriter::create(tmp)?;
    writer.write_entry(METADATA_ENTRY, metadata_bytes)?;
    for track in &bundle.tracks {
        // A track whose source entry was absent at decode time stays
        // absent; rewriting must not invent an empty entry for it.
        if let Some(payload) = &track.payload {
            writer.write_entry(&track.source_name, payload)?;
        }
    }
    for entry in &bundle.raw_entries {
        writer.write_entry(&entry.name, &entry.data)?;
    }

    // Flush buffers and sync to disk before the rename makes it visible.
    let buf_writer = writer.finish()?;
    let file = buf_writer
        .into_inner()
        .map_err(|e| ArchiveError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Build a uniquely named temp path in the target's directory
///
/// Same directory as the target so the rename stays on one filesystem.
fn temp_path(target: &Path) -> std::path::PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("pack");
    target.with_file_name(format!(".{}.{}-{}.tmp", name, std::process::id(), n))
}
