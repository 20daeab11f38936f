//! Adaptive-streaming packaging.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use vconv_models::MANIFEST_FILE;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Converts an assembled source video into a streaming package.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Package `input` into `output_dir`, returning the manifest path.
    ///
    /// `output_dir` must already exist.
    async fn package(&self, input: &Path, output_dir: &Path) -> MediaResult<PathBuf>;
}

/// MPEG-DASH packaging through the `ffmpeg` CLI.
#[derive(Debug, Clone, Default)]
pub struct DashTranscoder {
    runner: FfmpegRunner,
}

impl DashTranscoder {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// The command used to package `input` into `output_dir`.
    pub fn command(input: &Path, output_dir: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output_dir.join(MANIFEST_FILE)).format("dash")
    }
}

#[async_trait]
impl Transcoder for DashTranscoder {
    async fn package(&self, input: &Path, output_dir: &Path) -> MediaResult<PathBuf> {
        let cmd = Self::command(input, output_dir);
        let started = Instant::now();

        let output = self.runner.run(&cmd).await?;
        debug!(output = %output.combined(), "FFmpeg output");

        info!(
            path = %output_dir.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Converted to MPEG-DASH"
        );

        Ok(cmd.output().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_command() {
        let cmd = DashTranscoder::command(
            Path::new("/media/uploads/1/merged.mp4"),
            Path::new("/media/uploads/1/mpeg-dash"),
        );

        let args = cmd.build_args();
        let input_pos = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[input_pos + 1], "/media/uploads/1/merged.mp4");

        let format_pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[format_pos + 1], "dash");
        assert!(format_pos > input_pos);

        assert_eq!(
            args.last().unwrap(),
            "/media/uploads/1/mpeg-dash/output.mpd"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_returns_manifest_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let transcoder = DashTranscoder::new(FfmpegRunner::new().with_program("true"));

        let manifest = transcoder
            .package(&dir.path().join("merged.mp4"), dir.path())
            .await
            .unwrap();

        assert_eq!(manifest, dir.path().join("output.mpd"));
    }
}
