//! Local filesystem origin.
//!
//! Unlike [`crate::http_origin::HttpOrigin`], this backend has no upstream
//! to defer range handling to — it resolves `Range` itself via
//! [`crate::origin::parse_range`], seeks, and composes the 200/206/416
//! status before a single byte is read.

use crate::origin::{parse_range, Origin, OriginBody, OriginError, OriginResponse, RangeOutcome};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Serves files out of a fixed root directory, guarding against paths that
/// escape it via `..` or symlinks.
pub struct FilesystemOrigin {
    root: PathBuf,
}

impl FilesystemOrigin {
    /// `root` is canonicalized eagerly so every subsequent resolve only
    /// needs to canonicalize the requested path and compare prefixes.
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = std::fs::canonicalize(root.into())?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, OriginError> {
        let relative = path.trim_start_matches('/');
        let joined = self.root.join(relative);
        let canonical = joined.canonicalize().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OriginError::NotFound
            } else {
                OriginError::Io(err.to_string())
            }
        })?;
        if !canonical.starts_with(&self.root) {
            return Err(OriginError::PathTraversal);
        }
        Ok(canonical)
    }
}

#[async_trait]
impl Origin for FilesystemOrigin {
    async fn fetch(
        &self,
        path: &str,
        range_header: Option<&str>,
        chunk_size: usize,
    ) -> Result<OriginResponse, OriginError> {
        let resolved = self.resolve(path)?;
        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|err| OriginError::Io(err.to_string()))?;
        if !metadata.is_file() {
            return Err(OriginError::NotFound);
        }
        let size = metadata.len();

        let outcome = parse_range(range_header, size);
        let (status, range, start, len) = match outcome {
            RangeOutcome::Full => (200u16, None, 0u64, size),
            RangeOutcome::Satisfiable { start, end } => {
                (206u16, Some((start, end)), start, end - start + 1)
            }
            RangeOutcome::NotSatisfiable => return Err(OriginError::RangeNotSatisfiable { size }),
        };

        let mut file = File::open(&resolved)
            .await
            .map_err(|err| OriginError::Io(err.to_string()))?;
        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(|err| OriginError::Io(err.to_string()))?;
        }

        let content_type = guess_content_type(&resolved);
        let headers = vec![("content-type".to_string(), content_type)];

        let capacity = chunk_size.max(4096);
        let body: OriginBody = Box::pin(
            ReaderStream::with_capacity(file.take(len), capacity)
                .map_err(|err| OriginError::Io(err.to_string())),
        );

        Ok(OriginResponse {
            status,
            headers,
            total_size: Some(size),
            range,
            body,
        })
    }
}

fn guess_content_type(path: &Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        Some("m4s") => "video/iso.segment",
        Some("mp4") => "video/mp4",
        Some("key") => "application/octet-stream",
        _ => "application/octet-stream",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    #[tokio::test]
    async fn serves_full_file_with_status_200() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "index.m3u8", b"#EXTM3U\n");
        let origin = FilesystemOrigin::new(dir.path()).unwrap();
        let resp = origin.fetch("/index.m3u8", None, 65536).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.total_size, Some(8));
        assert!(resp.range.is_none());
    }

    #[tokio::test]
    async fn serves_partial_range_with_status_206() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "seg.ts", &vec![0u8; 1000]);
        let origin = FilesystemOrigin::new(dir.path()).unwrap();
        let resp = origin
            .fetch("/seg.ts", Some("bytes=100-199"), 65536)
            .await
            .unwrap();
        assert_eq!(resp.status, 206);
        assert_eq!(resp.range, Some((100, 199)));
    }

    #[tokio::test]
    async fn out_of_bounds_range_is_not_satisfiable() {
        let dir = tempfile::tempdir().unwrap();
        write_temp(dir.path(), "seg.ts", &vec![0u8; 10]);
        let origin = FilesystemOrigin::new(dir.path()).unwrap();
        let err = origin
            .fetch("/seg.ts", Some("bytes=100-199"), 65536)
            .await
            .unwrap_err();
        assert!(matches!(err, OriginError::RangeNotSatisfiable { size: 10 }));
    }

    #[tokio::test]
    async fn traversal_outside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("public")).unwrap();
        write_temp(dir.path(), "secret.txt", b"nope");
        let origin = FilesystemOrigin::new(dir.path().join("public")).unwrap();
        let err = origin.fetch("/../secret.txt", None, 65536).await.unwrap_err();
        assert!(matches!(err, OriginError::PathTraversal | OriginError::NotFound));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let origin = FilesystemOrigin::new(dir.path()).unwrap();
        let err = origin.fetch("/missing.ts", None, 65536).await.unwrap_err();
        assert!(matches!(err, OriginError::NotFound));
    }
}
