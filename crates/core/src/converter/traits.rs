//! Trait definitions for the converter module.

use async_trait::async_trait;

use super::error::ConversionError;
use super::types::{Artifact, ConversionJob};

/// Performs one conversion job and hands back the resulting artifact.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Converts the job's file into the requested operation's representation.
    async fn convert(&self, job: ConversionJob) -> Result<Artifact, ConversionError>;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConversionError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatId, Operation};
    use crate::input::InputFile;

    struct EchoConverter;

    #[async_trait]
    impl Converter for EchoConverter {
        fn name(&self) -> &str {
            "echo"
        }

        async fn convert(&self, job: ConversionJob) -> Result<Artifact, ConversionError> {
            let bytes = job.file.read().await?;
            Ok(Artifact::new(bytes, "application/octet-stream"))
        }
    }

    #[tokio::test]
    async fn test_default_validate() {
        let converter = EchoConverter;
        assert!(converter.validate().await.is_ok());
        assert_eq!(converter.name(), "echo");
    }

    #[tokio::test]
    async fn test_convert_through_trait_object() {
        let converter: Box<dyn Converter> = Box::new(EchoConverter);
        let job = ConversionJob {
            job_id: "f1#1".to_string(),
            file: InputFile::from_bytes("a.pdf", None, vec![7, 7]),
            source: FormatId::Pdf,
            operation: Operation::Compress,
        };
        let artifact = converter.convert(job).await.unwrap();
        assert_eq!(&*artifact.bytes, &[7, 7]);
    }
}
