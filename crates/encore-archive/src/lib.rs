//! Encore Archive - Song pack codec for stem-separated karaoke archives
//!
//! A song pack is a versioned flat container holding one metadata document
//! (`song.json`), the encoded audio payload for each stem, and any number
//! of opaque auxiliary entries. This crate decodes packs into
//! [`SongBundle`]s, and re-encodes partial updates losslessly: unknown
//! entries round-trip byte-for-byte, writes are temp-file-then-rename
//! atomic, and concurrent encodes for the same path are serialized.

pub mod bundle;
pub mod codec;
pub mod container;
pub mod error;
mod lock;

pub use bundle::{LyricLine, Preset, SongBundle, SongInfo, Track};
pub use codec::{decode, encode, BundlePatch, SongPatch};
pub use container::{Entry, METADATA_ENTRY};
pub use error::ArchiveError;
