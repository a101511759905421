//! Server-relative path to local path translation
//!
//! Remote items are addressed by percent-encoded server-relative paths such
//! as `/sites/Team/Shared%20Documents/Reports/Q1%3bdraft.docx`. The
//! [`PathTranslator`] strips the library root from that path, decodes every
//! segment and joins the result onto the local mirror root.
//!
//! Translation is pure: it never touches the filesystem.

use std::borrow::Cow;
use std::path::PathBuf;

use docmirror_core::domain::{RemoteFileDescriptor, ServerRelativePath};
use tracing::warn;

/// Local location of a remote file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedPath {
    /// Directory that will contain the file
    pub directory: PathBuf,
    /// Decoded local file name
    pub file_name: String,
    /// Full local path (`directory/file_name`)
    pub path: PathBuf,
}

/// Maps server-relative paths under a remote root onto a local root
#[derive(Debug, Clone)]
pub struct PathTranslator {
    remote_root: Vec<String>,
    local_root: PathBuf,
}

impl PathTranslator {
    /// Creates a translator for the given library root and local mirror root
    pub fn new(remote_root: &ServerRelativePath, local_root: impl Into<PathBuf>) -> Self {
        let remote_root = remote_root
            .segments()
            .map(|segment| decode_segment(segment).into_owned())
            .collect();
        Self {
            remote_root,
            local_root: local_root.into(),
        }
    }

    /// Resolves the local location of a remote file
    ///
    /// Never fails: undecodable segments are kept raw and paths outside the
    /// remote root are mirrored whole, both with a warning.
    pub fn translate(&self, descriptor: &RemoteFileDescriptor) -> TranslatedPath {
        let remote_path = descriptor.server_relative_path();
        let decoded: Vec<Cow<'_, str>> = remote_path.segments().map(decode_segment).collect();

        let relative: &[Cow<'_, str>] = if self.is_under_root(&decoded) {
            &decoded[self.remote_root.len()..]
        } else {
            warn!(
                remote_path = %remote_path,
                "Remote path is outside the library root, mirroring it whole"
            );
            &decoded
        };

        let mut directory = self.local_root.clone();
        if let Some((_, parents)) = relative.split_last() {
            for segment in parents {
                if let Some(segment) = sanitize_segment(segment, remote_path) {
                    directory.push(segment.as_ref());
                }
            }
        }

        let file_name = self.file_name_for(descriptor, relative);
        let path = directory.join(&file_name);

        TranslatedPath {
            directory,
            file_name,
            path,
        }
    }

    fn is_under_root(&self, decoded: &[Cow<'_, str>]) -> bool {
        decoded.len() > self.remote_root.len()
            && self
                .remote_root
                .iter()
                .zip(decoded)
                .all(|(root, segment)| root == segment)
    }

    fn file_name_for(&self, descriptor: &RemoteFileDescriptor, relative: &[Cow<'_, str>]) -> String {
        let remote_path = descriptor.server_relative_path();
        let leaf = decode_segment(descriptor.leaf_name());
        if let Some(name) = sanitize_segment(&leaf, remote_path) {
            return name.into_owned();
        }

        // Fall back to the last path segment when the leaf name is unusable.
        relative
            .last()
            .and_then(|segment| sanitize_segment(segment, remote_path))
            .map(Cow::into_owned)
            .unwrap_or_else(|| "_".to_string())
    }
}

/// Percent-decodes one segment, keeping the raw text if it does not decode
/// to valid UTF-8
fn decode_segment(raw: &str) -> Cow<'_, str> {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(segment = raw, error = %e, "Could not percent-decode path segment, using raw text");
            Cow::Borrowed(raw)
        }
    }
}

/// Makes a decoded segment safe to use as a single local path component
///
/// Returns None for segments that must be dropped (`.`, `..`, empty).
fn sanitize_segment<'a>(segment: &'a str, remote_path: &ServerRelativePath) -> Option<Cow<'a, str>> {
    match segment {
        "" => None,
        "." | ".." => {
            warn!(remote_path = %remote_path, segment, "Ignoring relative path segment");
            None
        }
        s if s.contains(['/', '\\', '\0']) => {
            warn!(remote_path = %remote_path, segment, "Replacing separators in path segment");
            Some(Cow::Owned(s.replace(['/', '\\', '\0'], "_")))
        }
        s => Some(Cow::Borrowed(s)),
    }
}
