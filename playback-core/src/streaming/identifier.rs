//! Video identifier validation and storage-root confinement.
//!
//! Identifiers arrive straight from the request path and are untrusted.
//! Resolution is purely lexical: nothing here touches the filesystem, so a
//! rejected identifier never reaches `stat` or `open`.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::error::{StreamError, StreamResult};

/// Extension appended to every identifier to form the stored file name.
pub const VIDEO_EXTENSION: &str = "mp4";

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier pattern compiles"));

/// Reasons an identifier is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,
    #[error("identifier contains a path separator or parent reference")]
    PathToken,
    #[error("identifier contains characters outside [A-Za-z0-9_-]")]
    InvalidCharacters,
}

/// Checks an identifier against the allowed character class.
///
/// Shared by every surface that accepts user or video ids.
///
/// # Errors
///
/// - `IdentifierError::Empty` - Empty or whitespace-only input
/// - `IdentifierError::PathToken` - Contains `..`, `/`, or `\`
/// - `IdentifierError::InvalidCharacters` - Anything else outside `[A-Za-z0-9_-]`
pub fn validate_identifier(raw: &str) -> Result<(), IdentifierError> {
    if raw.trim().is_empty() {
        return Err(IdentifierError::Empty);
    }
    if raw.contains("..") || raw.contains('/') || raw.contains('\\') {
        return Err(IdentifierError::PathToken);
    }
    if !IDENTIFIER_PATTERN.is_match(raw) {
        return Err(IdentifierError::InvalidCharacters);
    }
    Ok(())
}

/// A validated video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidIdentifier` - See [`validate_identifier`]
    pub fn parse(raw: &str) -> StreamResult<Self> {
        validate_identifier(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the backing file inside the storage root.
    pub fn file_name(&self) -> String {
        format!("{}.{VIDEO_EXTENSION}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves `.` and `..` segments without consulting the filesystem.
///
/// `..` directly under the root is dropped, matching how absolute paths
/// cannot climb above `/`. Leading `..` on relative paths is preserved.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(Component::ParentDir.as_os_str()),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Absolute, normalized directory that every served file must live under.
///
/// Built once at startup from configuration, never from request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot(PathBuf);

impl StorageRoot {
    /// Anchors `dir` against the working directory and normalizes it.
    ///
    /// # Errors
    ///
    /// - `std::io::Error` - `dir` is empty or the working directory is unavailable
    pub fn new(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let absolute = std::path::absolute(dir.as_ref())?;
        Ok(Self(normalize_lexically(&absolute)))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Joins `relative` onto the root and verifies the normalized result
    /// stays strictly inside it.
    ///
    /// # Errors
    ///
    /// - `StreamError::PathTraversal` - Result equals the root or lies outside it
    pub fn confine(&self, relative: &Path) -> StreamResult<PathBuf> {
        let candidate = normalize_lexically(&self.0.join(relative));
        if candidate != self.0 && candidate.starts_with(&self.0) {
            Ok(candidate)
        } else {
            Err(StreamError::PathTraversal)
        }
    }

    /// Maps a validated identifier to its file path.
    ///
    /// # Errors
    ///
    /// - `StreamError::PathTraversal` - Confinement check failed
    pub fn resolve(&self, id: &VideoId) -> StreamResult<PathBuf> {
        self.confine(Path::new(&id.file_name()))
    }
}

/// Validates `identifier` and resolves it under `root`.
///
/// # Errors
///
/// - `StreamError::InvalidIdentifier` - Identifier failed validation
/// - `StreamError::PathTraversal` - Normalized path escapes `root`
pub fn resolve_path(identifier: &str, root: &StorageRoot) -> StreamResult<PathBuf> {
    let id = VideoId::parse(identifier)?;
    root.resolve(&id)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn root() -> StorageRoot {
        StorageRoot::new("/srv/videos").unwrap()
    }

    #[test]
    fn test_valid_identifier_resolves_under_root() {
        let path = resolve_path("movie123", &root()).unwrap();
        assert_eq!(path, PathBuf::from("/srv/videos/movie123.mp4"));
    }

    #[test]
    fn test_identifier_rejections() {
        assert_eq!(validate_identifier(""), Err(IdentifierError::Empty));
        assert_eq!(validate_identifier("   "), Err(IdentifierError::Empty));
        assert_eq!(
            validate_identifier("../../etc/passwd"),
            Err(IdentifierError::PathToken)
        );
        assert_eq!(validate_identifier("a..b"), Err(IdentifierError::PathToken));
        assert_eq!(validate_identifier("a\\b"), Err(IdentifierError::PathToken));
        assert_eq!(
            validate_identifier("movie.mp4"),
            Err(IdentifierError::InvalidCharacters)
        );
        assert_eq!(
            validate_identifier("movie 1"),
            Err(IdentifierError::InvalidCharacters)
        );
        assert_eq!(
            validate_identifier("filmé"),
            Err(IdentifierError::InvalidCharacters)
        );
        assert!(validate_identifier("Movie_1-final").is_ok());
    }

    #[test]
    fn test_traversal_identifier_is_rejected_before_path_math() {
        let err = resolve_path("../../etc/passwd", &root()).unwrap_err();
        assert!(matches!(
            err,
            StreamError::InvalidIdentifier(IdentifierError::PathToken)
        ));
    }

    #[test]
    fn test_confine_rejects_escaping_paths() {
        let root = root();
        assert!(matches!(
            root.confine(Path::new("../secret.mp4")),
            Err(StreamError::PathTraversal)
        ));
        assert!(matches!(
            root.confine(Path::new("nested/../../videos-other/x.mp4")),
            Err(StreamError::PathTraversal)
        ));
        assert!(matches!(
            root.confine(Path::new("/etc/passwd")),
            Err(StreamError::PathTraversal)
        ));
        // The root itself is not a servable file.
        assert!(matches!(
            root.confine(Path::new(".")),
            Err(StreamError::PathTraversal)
        ));
    }

    #[test]
    fn test_confine_folds_inner_parent_segments() {
        let path = root().confine(Path::new("a/./b/../clip.mp4")).unwrap();
        assert_eq!(path, PathBuf::from("/srv/videos/a/clip.mp4"));
    }

    #[test]
    fn test_sibling_prefix_is_not_inside_root() {
        // "/srv/videos2" shares a string prefix but not a component prefix.
        assert!(matches!(
            root().confine(Path::new("../videos2/clip.mp4")),
            Err(StreamError::PathTraversal)
        ));
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(
            normalize_lexically(Path::new("../x/..")),
            PathBuf::from("..")
        );
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let root = StorageRoot::new("videos").unwrap();
        assert!(root.path().is_absolute());
        assert!(root.path().ends_with("videos"));
    }

    proptest! {
        #[test]
        fn prop_separator_tokens_never_resolve(
            prefix in "[A-Za-z0-9_-]{0,8}",
            token in prop::sample::select(vec!["..", "/", "\\"]),
            suffix in "[A-Za-z0-9_./\\\\-]{0,8}",
        ) {
            let identifier = format!("{prefix}{token}{suffix}");
            let result = resolve_path(&identifier, &root());
            prop_assert!(matches!(
                result,
                Err(StreamError::InvalidIdentifier(_)) | Err(StreamError::PathTraversal)
            ));
        }

        #[test]
        fn prop_valid_identifiers_stay_inside_root(identifier in "[A-Za-z0-9_-]{1,32}") {
            let root = root();
            let path = resolve_path(&identifier, &root).unwrap();
            prop_assert!(path.starts_with(root.path()));
            prop_assert_eq!(path.parent(), Some(root.path()));
        }
    }
}
