//! Test fixtures for streaming tests.
//!
//! Provides a throwaway video storage directory so tests across crates
//! exercise the real filesystem path.

use std::path::Path;

use super::identifier::StorageRoot;
use super::streamer::RangeStreamer;

/// Temporary storage root populated with `<id>.mp4` files.
pub struct VideoLibraryFixture {
    dir: tempfile::TempDir,
}

impl VideoLibraryFixture {
    /// Creates an empty storage directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created. Acceptable in
    /// fixtures where failure indicates an environment issue.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `data` as the video for `id`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_video(&self, id: &str, data: &[u8]) {
        std::fs::write(self.dir.path().join(format!("{id}.mp4")), data).unwrap();
    }

    /// Streamer rooted at this directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory path cannot be made absolute.
    pub fn streamer(&self) -> RangeStreamer {
        RangeStreamer::new(StorageRoot::new(self.dir.path()).unwrap())
    }
}

impl Default for VideoLibraryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic, non-repeating-per-256 byte pattern so slice mismatches
/// show up as content errors rather than passing by coincidence.
pub fn patterned_bytes(length: usize) -> Vec<u8> {
    (0..length)
        .map(|i| ((i * 31 + i / 256) % 251) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_videos() {
        let fixture = VideoLibraryFixture::new();
        fixture.write_video("clip", &patterned_bytes(10));

        let path = fixture.root().join("clip.mp4");
        assert!(path.is_file());
        assert_eq!(std::fs::read(path).unwrap().len(), 10);
    }
}
