//! Range-aware streaming of stored video files.
//!
//! A request flows through four steps, each of which may reject it before
//! any byte is sent: identifier validation and path confinement
//! ([`identifier`]), a size probe ([`streamer::stat`]), range parsing
//! ([`range`]), and opening a bounded reader ([`streamer::open`]). Only a
//! fully validated [`StreamDescriptor`] ever reaches the HTTP layer.

pub mod error;
pub mod identifier;
pub mod library;
pub mod range;
pub mod streamer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;

pub use error::{RangeViolation, StreamError, StreamResult};
pub use identifier::{
    IdentifierError, StorageRoot, VIDEO_EXTENSION, VideoId, normalize_lexically, resolve_path,
    validate_identifier,
};
pub use library::{VideoEntry, list_videos};
pub use range::{BYTES_UNIT_PREFIX, ByteRange, parse_range, parse_range_bytes};
pub use streamer::{
    DEFAULT_CHUNK_SIZE, RangeStreamer, StreamDescriptor, VIDEO_CONTENT_TYPE, open, stat,
};
