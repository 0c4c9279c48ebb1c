//! End-to-end pipeline tests.
//!
//! Real files on disk go through detection, the strategy converter, the
//! artifact store and the download trigger into an output directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GenericImageView, ImageFormat};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use convertfun_core::{
    converter::{ImageRasterCodec, StrategyConverter},
    download::TriggerSummary,
    orchestrator::wait_all,
    testing::{fixtures, MockHeicDecoder, MockRasterCodec},
    AttemptOutcome, ConversionOrchestrator, ConversionStatus, DirectoryRetriever,
    DownloadTrigger, FailureKind, FileIdentity, InputFile, MemoryArtifactStore, Operation,
    OrchestratorConfig, OutputConfig,
};

/// Test helper holding an input and an output directory.
struct TestHarness {
    input_dir: TempDir,
    output_dir: TempDir,
    heic: Arc<MockHeicDecoder>,
    store: Arc<MemoryArtifactStore>,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            input_dir: TempDir::new().expect("Failed to create input dir"),
            output_dir: TempDir::new().expect("Failed to create output dir"),
            heic: Arc::new(MockHeicDecoder::new()),
            store: Arc::new(MemoryArtifactStore::new()),
        }
    }

    fn orchestrator(&self) -> ConversionOrchestrator {
        let converter = StrategyConverter::new(
            Arc::new(ImageRasterCodec::new()),
            self.heic.clone(),
            image::Rgb([255, 255, 255]),
        );
        ConversionOrchestrator::new(
            OrchestratorConfig::default(),
            Arc::new(converter),
            self.store.clone(),
        )
    }

    fn retriever(&self) -> Arc<DirectoryRetriever> {
        Arc::new(DirectoryRetriever::new(OutputConfig {
            directory: self.output_dir.path().to_path_buf(),
            overwrite: false,
        }))
    }

    fn write_input(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.input_dir.path().join(name);
        std::fs::write(&path, bytes).expect("Failed to write input");
        path
    }

    async fn ingest(&self, orchestrator: &ConversionOrchestrator, path: &Path) -> FileIdentity {
        let file = InputFile::from_path(path)
            .await
            .expect("Failed to stat input");
        orchestrator.add_file(file).await.expect("Failed to add file")
    }

    fn output(&self, name: &str) -> PathBuf {
        self.output_dir.path().join(name)
    }
}

/// Drops the orchestrator so the trigger drains its queue and stops.
async fn finish(
    orchestrator: ConversionOrchestrator,
    trigger: JoinHandle<TriggerSummary>,
) -> TriggerSummary {
    drop(orchestrator);
    trigger.await.expect("Download trigger panicked")
}

#[tokio::test]
async fn test_png_to_jpeg_lands_in_output_dir() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let path = harness.write_input("holiday.png", &fixtures::transparent_png_bytes(6, 4));
    let id = harness.ingest(&orchestrator, &path).await;

    let outcome = orchestrator
        .request_conversion(&id, Operation::Jpg)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(matches!(outcome, AttemptOutcome::Done(_)));

    let summary = finish(orchestrator, trigger).await;
    assert_eq!(summary.retrieved, vec![harness.output("holiday.jpg")]);

    let bytes = std::fs::read(harness.output("holiday.jpg")).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!(decoded.dimensions(), (6, 4));
    assert!(!decoded.color().has_alpha());
}

#[tokio::test]
async fn test_svg_rasterizes_to_png() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let path = harness.write_input("logo.svg", fixtures::SVG_SQUARE.as_bytes());
    let id = harness.ingest(&orchestrator, &path).await;
    orchestrator
        .request_conversion(&id, Operation::Png)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    finish(orchestrator, trigger).await;
    let decoded = image::open(harness.output("logo.png")).unwrap();
    assert_eq!(decoded.dimensions(), (8, 8));
    assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_heic_extension_beats_declared_type() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let id = orchestrator
        .add_file(InputFile::from_bytes(
            "photo.HEIC",
            Some("image/jpeg"),
            b"fake-heic-payload".to_vec(),
        ))
        .await
        .unwrap();
    let outcome = orchestrator
        .request_conversion(&id, Operation::Png)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(matches!(outcome, AttemptOutcome::Done(_)));

    let calls = harness.heic.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target_mime, "image/png");
    assert_eq!(calls[0].quality, 0.92);

    finish(orchestrator, trigger).await;
    let bytes = std::fs::read(harness.output("photo.png")).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
}

#[tokio::test]
async fn test_pdf_compress_is_passthrough() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let path = harness.write_input("archive.tar.gz", b"%PDF-1.7 pretend");
    let file = InputFile::from_path(&path)
        .await
        .unwrap()
        .with_declared_type("application/pdf");
    let id = orchestrator.add_file(file).await.unwrap();
    orchestrator
        .request_conversion(&id, Operation::Compress)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let record = orchestrator.record(&id).await.unwrap();
    assert_eq!(
        record.artifact.as_ref().map(|h| h.content_type.as_str()),
        Some("application/pdf")
    );

    finish(orchestrator, trigger).await;
    assert_eq!(
        std::fs::read(harness.output("archive.tar.pdf")).unwrap(),
        b"%PDF-1.7 pretend"
    );
}

#[tokio::test]
async fn test_corrupt_and_unknown_inputs_end_in_error() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();

    let corrupt = harness.write_input("broken.png", b"definitely not a png");
    let unknown = harness.write_input("notes.xyz", b"plain text");
    let corrupt = harness.ingest(&orchestrator, &corrupt).await;
    let unknown = harness.ingest(&orchestrator, &unknown).await;

    let attempts = vec![
        orchestrator
            .request_conversion(&corrupt, Operation::Webp)
            .await
            .unwrap(),
        orchestrator
            .request_conversion(&unknown, Operation::Png)
            .await
            .unwrap(),
    ];
    let outcomes: Vec<_> = wait_all(attempts)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Error(FailureKind::DecodeFailure),
            AttemptOutcome::Error(FailureKind::UnsupportedFormat),
        ]
    );
    for id in [&corrupt, &unknown] {
        let record = orchestrator.record(id).await.unwrap();
        assert_eq!(record.status, ConversionStatus::Error);
    }
    assert!(orchestrator.also_targets(&unknown).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redownload_writes_a_second_copy() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let path = harness.write_input("cat.jpg", &fixtures::jpeg_bytes(4, 4));
    let id = harness.ingest(&orchestrator, &path).await;
    orchestrator
        .request_conversion(&id, Operation::Png)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    orchestrator.redownload(&id).await.unwrap();

    let summary = finish(orchestrator, trigger).await;
    assert_eq!(
        summary.retrieved,
        vec![harness.output("cat.png"), harness.output("cat (1).png")]
    );
}

#[tokio::test]
async fn test_avif_converts_through_heif_decoder() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator();
    let trigger = DownloadTrigger::new(harness.store.clone(), harness.retriever())
        .spawn(orchestrator.subscribe_offers().await);

    let avif = fixtures::avif_bytes(4, 4);
    let path = harness.write_input("sky.avif", &avif);
    let id = harness.ingest(&orchestrator, &path).await;
    let outcome = orchestrator
        .request_conversion(&id, Operation::Jpg)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(matches!(outcome, AttemptOutcome::Done(_)));

    let calls = harness.heic.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target_mime, "image/jpeg");
    assert_eq!(calls[0].input_len, avif.len());

    finish(orchestrator, trigger).await;
    let bytes = std::fs::read(harness.output("sky.jpg")).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_encode_failure_is_recorded() {
    let harness = TestHarness::new();
    let raster = Arc::new(MockRasterCodec::default());
    raster.set_fail_encode(true);
    let converter = StrategyConverter::new(
        raster.clone(),
        harness.heic.clone(),
        image::Rgb([255, 255, 255]),
    );
    let orchestrator = ConversionOrchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(converter),
        harness.store.clone(),
    );

    let id = orchestrator
        .add_file(InputFile::from_bytes("shot.png", None, fixtures::png_bytes(2, 2)))
        .await
        .unwrap();
    let outcome = orchestrator
        .request_conversion(&id, Operation::Jpg)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Error(FailureKind::EncodeFailure));
    let record = orchestrator.record(&id).await.unwrap();
    assert_eq!(record.status, ConversionStatus::Error);
    assert_eq!(record.failure, Some(FailureKind::EncodeFailure));
    assert!(record.artifact.is_none());
    assert_eq!(raster.decode_count(), 1);
    assert_eq!(raster.encode_count(), 1);
    assert_eq!(harness.store.issued_count(), 0);
}
