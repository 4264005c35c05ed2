//! Bounded file streaming for validated byte ranges.
//!
//! [`RangeStreamer::prepare`] runs every check before returning, so the
//! caller can commit status and headers knowing the only failures left are
//! I/O errors mid-transfer. Those surface as an error item that ends the
//! body stream.

use std::fmt;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, stream};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tracing::{debug, trace};

use super::error::{StreamError, StreamResult};
use super::identifier::{StorageRoot, resolve_path};
use super::library::{VideoEntry, list_videos};
use super::range::{ByteRange, parse_range_bytes};
use crate::config::StorageConfig;

/// Default size of each chunk read from disk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024; // 64 KiB

/// Media type of every stored video.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Resolves, validates and opens video files for range delivery.
///
/// Holds only read-only configuration, so one instance is shared by all
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct RangeStreamer {
    root: StorageRoot,
    chunk_size: usize,
}

impl RangeStreamer {
    pub fn new(root: StorageRoot) -> Self {
        Self {
            root,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Builds a streamer from storage configuration.
    ///
    /// # Errors
    ///
    /// - `StreamError::Io` - Storage root cannot be made absolute
    pub fn from_config(config: &StorageConfig) -> StreamResult<Self> {
        let root = StorageRoot::new(&config.video_root)?;
        Ok(Self::new(root).with_chunk_size(config.chunk_size))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn storage_root(&self) -> &StorageRoot {
        &self.root
    }

    /// Videos this streamer can serve.
    ///
    /// # Errors
    ///
    /// - `StreamError::Io` - Storage root exists but cannot be read
    pub async fn list_videos(&self) -> StreamResult<Vec<VideoEntry>> {
        list_videos(&self.root).await
    }

    /// Resolves an untrusted identifier to its confined file path.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidIdentifier` - Identifier failed validation
    /// - `StreamError::PathTraversal` - Normalized path escapes the root
    pub fn resolve_path(&self, identifier: &str) -> StreamResult<PathBuf> {
        resolve_path(identifier, &self.root)
    }

    /// Runs resolution, size probe, range parsing and open in order.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidIdentifier` / `PathTraversal` - Identifier rejected
    /// - `StreamError::NotFound` - No regular file for the identifier
    /// - `StreamError::EmptyFile` - File has zero length
    /// - `StreamError::MalformedRange` / `InvalidRange` - Range header rejected
    /// - `StreamError::Io` - Open or positioning failed
    pub async fn prepare(
        &self,
        identifier: &str,
        range_header: Option<&str>,
    ) -> StreamResult<StreamDescriptor> {
        self.prepare_raw(identifier, range_header.map(str::as_bytes))
            .await
    }

    /// [`prepare`](Self::prepare) with the `Range` header as received on the
    /// wire. The header is only decoded after the file has been found.
    ///
    /// # Errors
    ///
    /// As for [`prepare`](Self::prepare); a non-UTF-8 header is `MalformedRange`.
    pub async fn prepare_raw(
        &self,
        identifier: &str,
        range_header: Option<&[u8]>,
    ) -> StreamResult<StreamDescriptor> {
        let path = self.resolve_path(identifier)?;
        let length = stat(&path).await?;
        let range = parse_range_bytes(range_header, length)?;
        let descriptor = open(&path, range, self.chunk_size).await?;

        debug!(
            video_id = identifier,
            start = range.start,
            end = range.end,
            length,
            partial = range.partial,
            "Prepared video stream"
        );

        Ok(descriptor)
    }
}

/// Returns the byte length of a regular file.
///
/// Read on every request; sizes are never cached.
///
/// # Errors
///
/// - `StreamError::NotFound` - Path absent or not a regular file
/// - `StreamError::Io` - Metadata lookup failed for another reason
pub async fn stat(path: &Path) -> StreamResult<u64> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
        Ok(_) => Err(StreamError::NotFound),
        Err(e) if matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        ) =>
        {
            Err(StreamError::NotFound)
        }
        Err(e) => Err(StreamError::Io(e)),
    }
}

/// Opens `path` and positions a reader bounded to `range`.
///
/// The open handle is re-checked against `range.end`: a file that shrank
/// since [`stat`] fails here instead of yielding misaligned bytes.
///
/// # Errors
///
/// - `StreamError::Io` - Open or seek failed, or the file no longer covers the range
pub async fn open(
    path: &Path,
    range: ByteRange,
    chunk_size: usize,
) -> StreamResult<StreamDescriptor> {
    let mut file = File::open(path).await?;

    let current_length = file.metadata().await?.len();
    if current_length <= range.end {
        return Err(StreamError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "file shrank to {current_length} bytes, cannot serve through byte {}",
                range.end
            ),
        )));
    }

    let position = file.seek(SeekFrom::Start(range.start)).await?;
    if position != range.start {
        return Err(StreamError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("skipped to {position} instead of {}", range.start),
        )));
    }

    Ok(StreamDescriptor {
        range,
        reader: file.take(range.content_length()),
        chunk_size: chunk_size.max(1),
    })
}

/// A validated, opened range ready to be framed and streamed.
///
/// Owns the file handle; dropping the descriptor or its stream closes it.
pub struct StreamDescriptor {
    range: ByteRange,
    reader: Take<File>,
    chunk_size: usize,
}

impl fmt::Debug for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDescriptor")
            .field("range", &self.range)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl StreamDescriptor {
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// True when a range header was present (206), false for a full reply (200).
    pub fn is_partial(&self) -> bool {
        self.range.partial
    }

    pub fn content_length(&self) -> u64 {
        self.range.content_length()
    }

    pub fn total_length(&self) -> u64 {
        self.range.length
    }

    /// `Content-Range` value for partial replies, `None` for full ones.
    pub fn content_range(&self) -> Option<String> {
        self.range.partial.then(|| self.range.content_range())
    }

    /// Converts the descriptor into a chunked byte stream.
    ///
    /// Yields exactly `content_length` bytes. If the file ends early the
    /// stream yields one `UnexpectedEof` error and stops.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let transfer = Transfer {
            remaining: self.range.content_length(),
            sent: 0,
            failed: false,
            range: self.range,
            reader: self.reader,
            chunk_size: self.chunk_size,
        };

        stream::unfold(transfer, |mut transfer| async move {
            if transfer.remaining == 0 || transfer.failed {
                return None;
            }

            let wanted = transfer.remaining.min(transfer.chunk_size as u64) as usize;
            let mut buffer = vec![0u8; wanted];

            match transfer.reader.read(&mut buffer).await {
                Ok(0) => {
                    transfer.failed = true;
                    Some((
                        Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "video file ended before the requested range was served",
                        )),
                        transfer,
                    ))
                }
                Ok(read) => {
                    buffer.truncate(read);
                    transfer.remaining -= read as u64;
                    transfer.sent += read as u64;
                    trace!(read, remaining = transfer.remaining, "Streamed chunk");
                    Some((Ok(Bytes::from(buffer)), transfer))
                }
                Err(e) => {
                    transfer.failed = true;
                    Some((Err(e), transfer))
                }
            }
        })
    }
}

/// Per-response transfer state. Dropping it releases the file handle.
struct Transfer {
    range: ByteRange,
    reader: Take<File>,
    chunk_size: usize,
    remaining: u64,
    sent: u64,
    failed: bool,
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if self.remaining == 0 {
            debug!(
                start = self.range.start,
                end = self.range.end,
                sent = self.sent,
                "Transfer complete, file handle released"
            );
        } else {
            debug!(
                start = self.range.start,
                end = self.range.end,
                sent = self.sent,
                remaining = self.remaining,
                failed = self.failed,
                "Transfer ended early, file handle released"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use proptest::prelude::*;

    use super::*;
    use crate::streaming::error::RangeViolation;
    use crate::streaming::identifier::IdentifierError;
    use crate::streaming::range::parse_range;
    use crate::streaming::test_fixtures::{VideoLibraryFixture, patterned_bytes};

    async fn collect(descriptor: StreamDescriptor) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut stream = Box::pin(descriptor.into_stream());
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }

    fn movie_library() -> (VideoLibraryFixture, Vec<u8>) {
        let fixture = VideoLibraryFixture::new();
        let data = patterned_bytes(1000);
        fixture.write_video("movie123", &data);
        (fixture, data)
    }

    #[tokio::test]
    async fn test_full_file_without_range_header() {
        let (fixture, data) = movie_library();
        let streamer = fixture.streamer().with_chunk_size(128);

        let descriptor = streamer.prepare("movie123", None).await.unwrap();
        assert!(!descriptor.is_partial());
        assert_eq!(descriptor.content_length(), 1000);
        assert_eq!(descriptor.total_length(), 1000);
        assert_eq!(descriptor.content_range(), None);

        assert_eq!(collect(descriptor).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_closed_range_returns_exact_slice() {
        let (fixture, data) = movie_library();
        let streamer = fixture.streamer();

        let descriptor = streamer
            .prepare("movie123", Some("bytes=100-199"))
            .await
            .unwrap();
        assert!(descriptor.is_partial());
        assert_eq!(
            descriptor.content_range().as_deref(),
            Some("bytes 100-199/1000")
        );

        let body = collect(descriptor).await.unwrap();
        assert_eq!(body.len(), 100);
        assert_eq!(body, &data[100..=199]);
    }

    #[tokio::test]
    async fn test_open_ended_range_streams_to_eof() {
        let (fixture, data) = movie_library();
        let descriptor = fixture
            .streamer()
            .prepare("movie123", Some("bytes=900-"))
            .await
            .unwrap();

        let body = collect(descriptor).await.unwrap();
        assert_eq!(body, &data[900..]);
    }

    #[tokio::test]
    async fn test_range_errors_are_distinguishable() {
        let (fixture, _) = movie_library();
        let streamer = fixture.streamer();

        let err = streamer
            .prepare("movie123", Some("bytes=500-100"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::InvalidRange {
                violation: RangeViolation::StartAfterEnd,
                ..
            }
        ));

        let err = streamer
            .prepare("movie123", Some("bytes=0-1000"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StreamError::InvalidRange {
                violation: RangeViolation::EndPastEof,
                ..
            }
        ));

        let err = streamer
            .prepare("movie123", Some("bytes=ab-cd"))
            .await
            .unwrap_err();
        assert!(matches!(err, StreamError::MalformedRange { .. }));
    }

    #[tokio::test]
    async fn test_missing_and_invalid_identifiers() {
        let (fixture, _) = movie_library();
        let streamer = fixture.streamer();

        assert!(matches!(
            streamer.prepare("nope", None).await,
            Err(StreamError::NotFound)
        ));
        assert!(matches!(
            streamer.prepare("../../etc/passwd", None).await,
            Err(StreamError::InvalidIdentifier(IdentifierError::PathToken))
        ));
    }

    #[tokio::test]
    async fn test_range_header_is_decoded_after_lookup() {
        let fixture = VideoLibraryFixture::new();
        fixture.write_video("movie123", &patterned_bytes(100));
        let streamer = fixture.streamer();
        let garbage: &[u8] = b"bytes=\xff-";

        assert!(matches!(
            streamer.prepare_raw("ghost", Some(garbage)).await,
            Err(StreamError::NotFound)
        ));
        assert!(matches!(
            streamer.prepare_raw("bad.id", Some(garbage)).await,
            Err(StreamError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            streamer.prepare_raw("movie123", Some(garbage)).await,
            Err(StreamError::MalformedRange { .. })
        ));
    }

    /// Descriptors in this process that currently have `path` open.
    #[cfg(target_os = "linux")]
    fn open_handles(path: &Path) -> usize {
        std::fs::read_dir("/proc/self/fd")
            .unwrap()
            .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
            .filter(|target| target == path)
            .count()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropping_stream_mid_transfer_releases_handle() {
        let fixture = VideoLibraryFixture::new();
        fixture.write_video("movie123", &patterned_bytes(64 * 1024));
        let path = std::fs::canonicalize(fixture.root().join("movie123.mp4")).unwrap();
        let streamer = fixture.streamer().with_chunk_size(1024);

        let descriptor = streamer.prepare("movie123", None).await.unwrap();
        let mut stream = Box::pin(descriptor.into_stream());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1024);
        assert_eq!(open_handles(&path), 1);

        drop(stream);

        for _ in 0..100 {
            if open_handles(&path) == 0 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("file handle still open after the body stream was dropped");
    }

    #[tokio::test]
    async fn test_directory_is_not_found() {
        let fixture = VideoLibraryFixture::new();
        std::fs::create_dir(fixture.root().join("folder.mp4")).unwrap();

        assert!(matches!(
            fixture.streamer().prepare("folder", None).await,
            Err(StreamError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_zero_length_file_is_empty_file() {
        let fixture = VideoLibraryFixture::new();
        fixture.write_video("blank", &[]);
        let streamer = fixture.streamer();

        assert!(matches!(
            streamer.prepare("blank", None).await,
            Err(StreamError::EmptyFile)
        ));
        assert!(matches!(
            streamer.prepare("blank", Some("bytes=0-")).await,
            Err(StreamError::EmptyFile)
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_file_that_shrank_after_stat() {
        let (fixture, _) = movie_library();
        let path = fixture.root().join("movie123.mp4");
        let range = parse_range(Some("bytes=500-899"), 1000).unwrap();

        std::fs::write(&path, patterned_bytes(600)).unwrap();

        let err = open(&path, range, DEFAULT_CHUNK_SIZE).await.unwrap_err();
        match err {
            StreamError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_never_reads_past_range_end_when_file_grows() {
        let (fixture, data) = movie_library();
        let path = fixture.root().join("movie123.mp4");
        let range = parse_range(Some("bytes=10-19"), 1000).unwrap();

        let descriptor = open(&path, range, 4).await.unwrap();
        let mut grown = data.clone();
        grown.extend_from_slice(&patterned_bytes(500));
        std::fs::write(&path, &grown).unwrap();

        assert_eq!(collect(descriptor).await.unwrap(), &data[10..20]);
    }

    #[tokio::test]
    async fn test_stream_fails_when_file_truncated_mid_transfer() {
        let (fixture, _) = movie_library();
        let path = fixture.root().join("movie123.mp4");
        let range = parse_range(Some("bytes=0-999"), 1000).unwrap();

        let descriptor = open(&path, range, 100).await.unwrap();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(300)
            .unwrap();

        let err = collect(descriptor).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let (fixture, _) = movie_library();
        let streamer = fixture.streamer();

        let first = streamer.prepare("movie123", None).await.unwrap();
        let second = streamer.prepare("movie123", None).await.unwrap();
        assert_eq!(first.range(), second.range());
        assert_eq!(collect(first).await.unwrap(), collect(second).await.unwrap());
    }

    #[test]
    fn test_from_config_uses_chunk_size() {
        let config = StorageConfig {
            video_root: PathBuf::from("videos"),
            chunk_size: 0,
            ..StorageConfig::default()
        };
        let streamer = RangeStreamer::from_config(&config).unwrap();
        assert!(streamer.storage_root().path().is_absolute());
        assert_eq!(streamer.chunk_size, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_streamed_bytes_match_source_slice(
            (length, start, end) in (1u64..4096).prop_flat_map(|length| {
                (Just(length), 0..length).prop_flat_map(|(length, start)| {
                    (Just(length), Just(start), start..length)
                })
            }),
            chunk_size in 1usize..512,
        ) {
            let fixture = VideoLibraryFixture::new();
            let data = patterned_bytes(length as usize);
            fixture.write_video("clip", &data);
            let streamer = fixture.streamer().with_chunk_size(chunk_size);
            let header = format!("bytes={start}-{end}");

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let body = runtime.block_on(async {
                let descriptor = streamer.prepare("clip", Some(&header)).await.unwrap();
                collect(descriptor).await.unwrap()
            });

            prop_assert_eq!(body.len() as u64, end - start + 1);
            prop_assert_eq!(&body[..], &data[start as usize..=end as usize]);
        }
    }
}
