//! Reassembly of uploaded chunk files.
//!
//! Chunks are ordered by the number embedded in their file name, never by
//! directory enumeration order. Merging out of order produces media that often
//! still transcodes "successfully", so ordinal parsing is strict: a chunk file
//! without digits, or two chunks with the same ordinal, fail the merge.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use vconv_models::CHUNK_EXTENSION;

use crate::error::{MediaError, MediaResult};

/// One uploaded chunk file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub ordinal: u64,
    pub path: PathBuf,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub path: PathBuf,
    pub chunk_count: usize,
    pub bytes: u64,
}

/// Extract the ordinal from a chunk file name.
///
/// The ordinal is the first run of ASCII digits in the base name, so
/// `3.chunk`, `part-3.chunk` and `003.chunk` all yield 3.
pub fn chunk_ordinal(path: &Path) -> MediaResult<u64> {
    let invalid = || MediaError::InvalidChunkName(path.to_path_buf());

    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let start = name.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let rest = &name[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    rest[..end].parse().map_err(|_| invalid())
}

/// List the chunk files in `dir`, sorted by ordinal.
///
/// Symlinked chunks are followed. A `.chunk` entry that is not a regular
/// file is an error rather than a silently missing piece of the video.
pub async fn list_chunks(dir: &Path) -> MediaResult<Vec<Chunk>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut by_ordinal: BTreeMap<u64, PathBuf> = BTreeMap::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXTENSION) {
            continue;
        }
        // Follows symlinks; a dangling link fails like an unreadable chunk.
        let metadata = fs::metadata(&path)
            .await
            .map_err(|source| MediaError::ChunkRead {
                path: path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(MediaError::NotAFile(path));
        }

        let ordinal = chunk_ordinal(&path)?;
        if let Some(first) = by_ordinal.get(&ordinal) {
            return Err(MediaError::DuplicateChunk {
                ordinal,
                first: first.clone(),
                second: path,
            });
        }
        by_ordinal.insert(ordinal, path);
    }

    Ok(by_ordinal
        .into_iter()
        .map(|(ordinal, path)| Chunk { ordinal, path })
        .collect())
}

/// Concatenate every chunk in `chunk_dir`, in ordinal order, into `output`.
///
/// Gaps in the ordinal sequence are not detected. On failure the partial
/// output is left in place for the caller to dispose of.
pub async fn merge_chunks(chunk_dir: &Path, output: &Path) -> MediaResult<MergedFile> {
    let chunks = list_chunks(chunk_dir).await?;
    if chunks.is_empty() {
        return Err(MediaError::NoChunks(chunk_dir.to_path_buf()));
    }

    info!(
        path = %chunk_dir.display(),
        chunks = chunks.len(),
        "Merging chunks"
    );

    let mut merged = File::create(output).await?;
    let mut bytes = 0u64;

    for chunk in &chunks {
        let mut input = File::open(&chunk.path)
            .await
            .map_err(|source| MediaError::ChunkRead {
                path: chunk.path.clone(),
                source,
            })?;

        let copied = tokio::io::copy(&mut input, &mut merged)
            .await
            .map_err(|source| MediaError::ChunkWrite {
                path: chunk.path.clone(),
                source,
            })?;

        debug!(chunk = %chunk.path.display(), bytes = copied, "Appended chunk");
        bytes += copied;
    }

    merged.flush().await?;

    Ok(MergedFile {
        path: output.to_path_buf(),
        chunk_count: chunks.len(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_chunk_ordinal() {
        assert_eq!(chunk_ordinal(Path::new("/a/b/3.chunk")).unwrap(), 3);
        assert_eq!(chunk_ordinal(Path::new("part-12.chunk")).unwrap(), 12);
        assert_eq!(chunk_ordinal(Path::new("007.chunk")).unwrap(), 7);
        // Directory digits are not part of the base name
        assert_eq!(chunk_ordinal(Path::new("/uploads/99/1.chunk")).unwrap(), 1);
    }

    #[test]
    fn test_chunk_ordinal_rejects_names_without_digits() {
        let err = chunk_ordinal(Path::new("/a/chunk.chunk")).unwrap_err();
        assert!(matches!(err, MediaError::InvalidChunkName(_)));

        let err = chunk_ordinal(Path::new("99999999999999999999999.chunk")).unwrap_err();
        assert!(matches!(err, MediaError::InvalidChunkName(_)));
    }

    #[tokio::test]
    async fn test_merge_orders_numerically() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");

        // Written in scrambled order; 10 must come after 9, not after 1.
        let order = [7u64, 2, 10, 0, 5, 9, 1, 11, 3, 8, 4, 6];
        for i in order {
            let content = format!("<{:02}>", i);
            fs::write(dir.path().join(format!("{}.chunk", i)), content)
                .await
                .unwrap();
        }

        let merged = merge_chunks(dir.path(), &output).await.unwrap();

        let expected: String = (0..12).map(|i| format!("<{:02}>", i)).collect();
        assert_eq!(fs::read_to_string(&output).await.unwrap(), expected);
        assert_eq!(merged.chunk_count, 12);
        assert_eq!(merged.bytes, expected.len() as u64);
    }

    #[tokio::test]
    async fn test_merge_single_chunk() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"only").await.unwrap();

        merge_chunks(dir.path(), &output).await.unwrap();

        assert_eq!(fs::read(&output).await.unwrap(), b"only");
    }

    #[tokio::test]
    async fn test_merge_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"AAAA").await.unwrap();
        fs::write(dir.path().join("1.chunk"), b"BBBB").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").await.unwrap();
        fs::create_dir(dir.path().join("mpeg-dash")).await.unwrap();

        merge_chunks(dir.path(), &output).await.unwrap();

        assert_eq!(fs::read(&output).await.unwrap(), b"AAAABBBB");
    }

    #[tokio::test]
    async fn test_merge_tolerates_gaps() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"A").await.unwrap();
        fs::write(dir.path().join("5.chunk"), b"B").await.unwrap();

        let merged = merge_chunks(dir.path(), &output).await.unwrap();

        assert_eq!(merged.chunk_count, 2);
        assert_eq!(fs::read(&output).await.unwrap(), b"AB");
    }

    #[tokio::test]
    async fn test_merge_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");

        let err = merge_chunks(dir.path(), &output).await.unwrap_err();
        assert!(matches!(err, MediaError::NoChunks(_)));
    }

    #[tokio::test]
    async fn test_merge_rejects_unnumbered_chunk() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"A").await.unwrap();
        fs::write(dir.path().join("final.chunk"), b"B").await.unwrap();

        let err = merge_chunks(dir.path(), &output).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidChunkName(_)));
    }

    #[tokio::test]
    async fn test_merge_rejects_duplicate_ordinals() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("1.chunk"), b"A").await.unwrap();
        fs::write(dir.path().join("part1.chunk"), b"B").await.unwrap();

        let err = merge_chunks(dir.path(), &output).await.unwrap_err();
        assert!(matches!(err, MediaError::DuplicateChunk { ordinal: 1, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_follows_symlinked_chunks() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        let target = elsewhere.path().join("stored-1");
        fs::write(&target, b"BBBB").await.unwrap();

        fs::write(dir.path().join("0.chunk"), b"AAAA").await.unwrap();
        fs::symlink(&target, dir.path().join("1.chunk")).await.unwrap();
        fs::write(dir.path().join("2.chunk"), b"CCCC").await.unwrap();

        let merged = merge_chunks(dir.path(), &output).await.unwrap();

        assert_eq!(merged.chunk_count, 3);
        assert_eq!(fs::read(&output).await.unwrap(), b"AAAABBBBCCCC");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_merge_rejects_dangling_symlink() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"AAAA").await.unwrap();
        fs::symlink(dir.path().join("gone"), dir.path().join("1.chunk"))
            .await
            .unwrap();

        let err = merge_chunks(dir.path(), &output).await.unwrap_err();
        assert!(matches!(err, MediaError::ChunkRead { .. }));
    }

    #[tokio::test]
    async fn test_merge_rejects_directory_named_as_chunk() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("merged.mp4");
        fs::write(dir.path().join("0.chunk"), b"AAAA").await.unwrap();
        fs::create_dir(dir.path().join("1.chunk")).await.unwrap();

        let err = merge_chunks(dir.path(), &output).await.unwrap_err();
        assert!(matches!(err, MediaError::NotAFile(_)));
    }

    #[tokio::test]
    async fn test_merge_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = merge_chunks(&missing, &dir.path().join("merged.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
