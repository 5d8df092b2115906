//! Signature image resolution for the document renderer.
//!
//! A signature reference is an opaque string on the user record: an absolute
//! URL is fetched over HTTP with a bounded timeout, anything else is read
//! from the configured signature directory. Every failure is reported to the
//! caller, who logs it and renders on without the image.

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::DynamicImage;
use memoreg_core::config::RenderingConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureFetchError {
    #[error("http client initialization failed: {0}")]
    Client(String),
    #[error("fetching `{reference}` failed: {detail}")]
    Fetch { reference: String, detail: String },
    #[error("reading `{reference}` failed: {detail}")]
    Read { reference: String, detail: String },
    #[error("decoding `{reference}` failed: {detail}")]
    Decode { reference: String, detail: String },
}

pub struct SignatureFetcher {
    client: reqwest::Client,
    signature_dir: PathBuf,
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

impl SignatureFetcher {
    pub fn new(config: &RenderingConfig) -> Result<Self, SignatureFetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| SignatureFetchError::Client(e.to_string()))?;

        Ok(Self { client, signature_dir: config.signature_dir.clone() })
    }

    pub async fn fetch(&self, reference: &str) -> Result<DynamicImage, SignatureFetchError> {
        let bytes = if is_remote(reference) {
            self.fetch_remote(reference).await?
        } else {
            self.read_local(reference).await?
        };

        image::load_from_memory(&bytes).map_err(|e| SignatureFetchError::Decode {
            reference: reference.to_string(),
            detail: e.to_string(),
        })
    }

    async fn fetch_remote(&self, reference: &str) -> Result<Vec<u8>, SignatureFetchError> {
        let response = self.client.get(reference).send().await.map_err(|e| {
            SignatureFetchError::Fetch { reference: reference.to_string(), detail: e.to_string() }
        })?;

        let response = response.error_for_status().map_err(|e| SignatureFetchError::Fetch {
            reference: reference.to_string(),
            detail: e.to_string(),
        })?;

        let bytes = response.bytes().await.map_err(|e| SignatureFetchError::Fetch {
            reference: reference.to_string(),
            detail: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn read_local(&self, reference: &str) -> Result<Vec<u8>, SignatureFetchError> {
        let path = self.resolve_local(reference);
        tokio::fs::read(&path).await.map_err(|e| SignatureFetchError::Read {
            reference: reference.to_string(),
            detail: e.to_string(),
        })
    }

    fn resolve_local(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.signature_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use memoreg_core::config::RenderingConfig;

    use super::{is_remote, SignatureFetchError, SignatureFetcher};

    fn config(signature_dir: PathBuf) -> RenderingConfig {
        RenderingConfig {
            organization_name: "Test Org".to_string(),
            organization_abbr: "TO".to_string(),
            signature_dir,
            fetch_timeout_secs: 2,
        }
    }

    #[test]
    fn url_prefixes_select_the_remote_path() {
        assert!(is_remote("https://blob.example.com/signatures/a.png"));
        assert!(is_remote("http://blob.example.com/signatures/a.png"));
        assert!(!is_remote("signatures/a.png"));
        assert!(!is_remote("/var/data/signatures/a.png"));
    }

    #[tokio::test]
    async fn missing_local_file_reports_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = SignatureFetcher::new(&config(dir.path().to_path_buf())).expect("fetcher");

        let error = fetcher.fetch("does-not-exist.png").await.expect_err("should fail");
        assert!(matches!(error, SignatureFetchError::Read { .. }));
    }

    #[tokio::test]
    async fn undecodable_bytes_report_a_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("bogus.png"), b"not an image").expect("write file");
        let fetcher = SignatureFetcher::new(&config(dir.path().to_path_buf())).expect("fetcher");

        let error = fetcher.fetch("bogus.png").await.expect_err("should fail");
        assert!(matches!(error, SignatureFetchError::Decode { .. }));
    }

    #[tokio::test]
    async fn valid_png_decodes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let png = image::DynamicImage::new_rgba8(12, 5);
        png.save(dir.path().join("sig.png")).expect("save png");
        let fetcher = SignatureFetcher::new(&config(dir.path().to_path_buf())).expect("fetcher");

        let decoded = fetcher.fetch("sig.png").await.expect("decode");
        assert_eq!(decoded.width(), 12);
        assert_eq!(decoded.height(), 5);
    }
}
