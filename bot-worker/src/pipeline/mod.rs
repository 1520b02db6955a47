//! Dictionary pipeline: download, extract, derive variants.
//!
//! ```text
//! fetch_archive → extract_first_entry → derive_variant (×2)
//! ```
//!
//! Every run works inside a caller-provided scratch directory; all
//! artifacts are ephemeral and the caller removes the directory on both
//! success and failure.

pub mod archive;
pub mod codec;
pub mod fetch;
pub mod transcode;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::error::JobError;
use crate::Config;

pub use codec::{select_codec, DictionaryCodec, PassthroughCodec, ShiftJisCodec};
pub use transcode::VariantKind;

/// File name of the downloaded archive inside the scratch directory.
const ARCHIVE_FILE: &str = "dictionary.zip";

/// File name of the extracted dictionary text.
const EXTRACTED_FILE: &str = "dictionary.txt";

/// One deliverable produced by a pipeline run.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Short name used in follow-up messages.
    pub label: &'static str,
    pub path: PathBuf,
    pub size: u64,
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Content type reported by the dictionary host, if any.
    pub content_type: Option<String>,
    /// Name of the entry extracted from the archive.
    pub entry_name: String,
    /// Deliverables in their fixed delivery order: the extracted text
    /// first, then each derived variant.
    pub artifacts: Vec<Artifact>,
}

/// Run the full pipeline into `scratch`.
pub async fn run(
    client: &Client,
    config: &Config,
    codec: &dyn DictionaryCodec,
    scratch: &Path,
) -> Result<PipelineOutput, JobError> {
    let archive_path = scratch.join(ARCHIVE_FILE);
    let extracted_path = scratch.join(EXTRACTED_FILE);

    let content_type = fetch::fetch_archive(
        client,
        &config.dictionary_url,
        &archive_path,
        Duration::from_millis(config.download_timeout_ms),
    )
    .await?;

    let entry_name = archive::extract_first_entry(&archive_path, &extracted_path).await?;

    let extracted_size = tokio::fs::metadata(&extracted_path).await?.len();
    let mut artifacts = vec![Artifact {
        label: "dictionary",
        path: extracted_path.clone(),
        size: extracted_size,
    }];

    for kind in [VariantKind::HeadwordOnly, VariantKind::GlossOnly] {
        let dest = scratch.join(kind.file_name());
        let size = transcode::derive_variant(&extracted_path, &dest, kind, codec).await?;
        artifacts.push(Artifact {
            label: kind.label(),
            path: dest,
            size,
        });
    }

    info!(
        entry = %entry_name,
        content_type = ?content_type,
        artifact_count = artifacts.len(),
        "dictionary_pipeline_complete"
    );

    Ok(PipelineOutput {
        content_type,
        entry_name,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sjis(text: &str) -> Vec<u8> {
        ShiftJisCodec.encode(text).unwrap()
    }

    async fn dictionary_server(zip_bytes: Vec<u8>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dic.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(zip_bytes)
                    .insert_header("content-type", "application/zip"),
            )
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::from_env();
        config.dictionary_url = format!("{}/dic.txt", server.uri());
        config.download_timeout_ms = 5_000;
        config
    }

    #[tokio::test]
    async fn test_full_run_produces_three_artifacts_in_order() {
        let text = sjis("【稲妻】Lightning Bolt\n【島】Island\n");
        let zip_bytes = archive::build_zip(&[("DICALL.txt", &text), ("extra.txt", b"x")]);
        let server = dictionary_server(zip_bytes).await;
        let config = config_for(&server);

        let scratch = tempfile::tempdir().unwrap();
        let output = run(
            &Client::new(),
            &config,
            &ShiftJisCodec,
            scratch.path(),
        )
        .await
        .unwrap();

        assert_eq!(output.entry_name, "DICALL.txt");
        assert_eq!(output.content_type.as_deref(), Some("application/zip"));

        let labels: Vec<_> = output.artifacts.iter().map(|a| a.label).collect();
        assert_eq!(labels, vec!["dictionary", "headwords", "glosses"]);

        for artifact in &output.artifacts {
            assert!(artifact.path.exists());
            assert!(artifact.size > 0);
        }

        let glosses = ShiftJisCodec
            .decode(&tokio::fs::read(&output.artifacts[2].path).await.unwrap())
            .unwrap();
        assert_eq!(glosses, "Lightning Bolt\nIsland\n");
    }

    #[tokio::test]
    async fn test_rerun_produces_byte_identical_variants() {
        let text = sjis("【稲妻】Lightning Bolt\n");
        let zip_bytes = archive::build_zip(&[("DICALL.txt", &text)]);
        let server = dictionary_server(zip_bytes).await;
        let config = config_for(&server);
        let client = Client::new();

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let a = run(&client, &config, &ShiftJisCodec, first.path())
            .await
            .unwrap();
        let b = run(&client, &config, &ShiftJisCodec, second.path())
            .await
            .unwrap();

        for (x, y) in a.artifacts.iter().zip(&b.artifacts) {
            let xb = tokio::fs::read(&x.path).await.unwrap();
            let yb = tokio::fs::read(&y.path).await.unwrap();
            assert_eq!(xb, yb);
        }
    }

    #[tokio::test]
    async fn test_download_404_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let config = config_for(&server);

        let scratch = tempfile::tempdir().unwrap();
        let err = run(&Client::new(), &config, &ShiftJisCodec, scratch.path())
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Download { status: Some(404), .. }));
    }
}
