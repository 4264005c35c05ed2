//! Listing of the videos a storage root can serve.

use serde::Serialize;
use tracing::debug;

use super::error::{StreamError, StreamResult};
use super::identifier::{StorageRoot, VIDEO_EXTENSION, validate_identifier};
use super::streamer::VIDEO_CONTENT_TYPE;

/// One streamable video. Carries the identifier only, never a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    pub size_bytes: u64,
    pub mime_type: &'static str,
}

/// Lists the top-level `<id>.mp4` files under `root`, sorted by id.
///
/// Entries that `/api/stream/{id}` would refuse are skipped: invalid
/// identifiers, non-regular files and empty files. A missing root lists as
/// empty.
///
/// # Errors
///
/// - `StreamError::Io` - Root exists but cannot be read
pub async fn list_videos(root: &StorageRoot) -> StreamResult<Vec<VideoEntry>> {
    let mut entries = match tokio::fs::read_dir(root.path()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StreamError::Io(e)),
    };

    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(VIDEO_EXTENSION) {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if validate_identifier(id).is_err() {
            continue;
        }

        // Follows symlinks the same way serving does.
        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if !metadata.is_file() || metadata.len() == 0 {
            continue;
        }

        videos.push(VideoEntry {
            id: id.to_string(),
            size_bytes: metadata.len(),
            mime_type: VIDEO_CONTENT_TYPE,
        });
    }

    videos.sort_by(|a, b| a.id.cmp(&b.id));
    debug!(count = videos.len(), "Listed storage root");
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::test_fixtures::{VideoLibraryFixture, patterned_bytes};

    #[tokio::test]
    async fn test_lists_only_servable_videos() {
        let fixture = VideoLibraryFixture::new();
        fixture.write_video("movie123", &patterned_bytes(1000));
        fixture.write_video("alpha", &patterned_bytes(10));
        fixture.write_video("blank", &[]);
        fixture.write_video("bad.name", &patterned_bytes(10));
        std::fs::write(fixture.root().join("notes.txt"), b"hello").unwrap();
        std::fs::create_dir(fixture.root().join("folder.mp4")).unwrap();

        let videos = list_videos(fixture.streamer().storage_root()).await.unwrap();

        let ids: Vec<_> = videos.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["alpha", "movie123"]);
        assert_eq!(videos[1].size_bytes, 1000);
        assert_eq!(videos[1].mime_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_missing_root_lists_empty() {
        let fixture = VideoLibraryFixture::new();
        let root = StorageRoot::new(fixture.root().join("absent")).unwrap();

        assert!(list_videos(&root).await.unwrap().is_empty());
    }
}
