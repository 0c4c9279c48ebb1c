//! Specialized HEIC/HEIF decoding.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use super::config::ConverterConfig;
use super::error::HeicError;
use super::types::quality_percent;

/// Decodes HEIC/HEIF bytes straight into another encoded image.
#[async_trait]
pub trait HeicDecoder: Send + Sync {
    /// Returns the name of this decoder implementation.
    fn name(&self) -> &str;

    /// Decodes `bytes` and re-encodes them as `target_mime` at `quality`.
    async fn decode_to(
        &self,
        bytes: &[u8],
        target_mime: &str,
        quality: f32,
    ) -> Result<Vec<u8>, HeicError>;

    /// Validates that the decoder is ready.
    async fn validate(&self) -> Result<(), HeicError> {
        Ok(())
    }
}

/// Decoder used when no HEIC support is configured. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableHeicDecoder;

#[async_trait]
impl HeicDecoder for UnavailableHeicDecoder {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn decode_to(
        &self,
        _bytes: &[u8],
        _target_mime: &str,
        _quality: f32,
    ) -> Result<Vec<u8>, HeicError> {
        Err(HeicError::Unavailable)
    }

    async fn validate(&self) -> Result<(), HeicError> {
        Err(HeicError::Unavailable)
    }
}

/// Decoder driving libheif's `heif-convert` tool through temp files.
pub struct HeifConvertDecoder {
    binary: PathBuf,
    temp_dir: PathBuf,
}

impl HeifConvertDecoder {
    /// Creates a decoder from the converter configuration.
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            binary: config.heif_convert_path.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }

    fn output_extension(target_mime: &str) -> Result<&'static str, HeicError> {
        match target_mime {
            "image/jpeg" => Ok("jpg"),
            "image/png" => Ok("png"),
            other => Err(HeicError::UnsupportedOutput {
                mime: other.to_string(),
            }),
        }
    }

    fn map_spawn_error(&self, e: std::io::Error) -> HeicError {
        if e.kind() == std::io::ErrorKind::NotFound {
            HeicError::ToolNotFound {
                path: self.binary.clone(),
            }
        } else {
            HeicError::Io(e)
        }
    }

    async fn run(&self, input: &Path, output: &Path, quality: f32) -> Result<(), HeicError> {
        let result = Command::new(&self.binary)
            .arg("-q")
            .arg(quality_percent(quality).to_string())
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(HeicError::Failed {
                reason: format!("heif-convert exited with {}", result.status),
                stderr: (!stderr.is_empty()).then_some(stderr),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl HeicDecoder for HeifConvertDecoder {
    fn name(&self) -> &str {
        "heif-convert"
    }

    async fn decode_to(
        &self,
        bytes: &[u8],
        target_mime: &str,
        quality: f32,
    ) -> Result<Vec<u8>, HeicError> {
        let ext = Self::output_extension(target_mime)?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let stem = Uuid::new_v4();
        let input = self.temp_dir.join(format!("{}.heic", stem));
        let output = self.temp_dir.join(format!("{}.{}", stem, ext));

        tokio::fs::write(&input, bytes).await?;
        debug!("Running heif-convert on {:?}", input);

        let result = match self.run(&input, &output, quality).await {
            Ok(()) => tokio::fs::read(&output).await.map_err(HeicError::from),
            Err(e) => Err(e),
        };

        let _ = tokio::fs::remove_file(&input).await;
        let _ = tokio::fs::remove_file(&output).await;
        result
    }

    async fn validate(&self) -> Result<(), HeicError> {
        let status = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.map_spawn_error(e))?;

        // Older releases print usage and exit non-zero on --version; finding the
        // binary is enough.
        debug!("heif-convert --version exited with {}", status);
        Ok(())
    }
}
