use crate::model::Dataset;
use anyhow::Context;
use flate2::read::GzDecoder;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json5,
    GzipJson5,
}

/// A dataset read from disk, with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedPayload {
    pub source_path: PathBuf,
    pub format: PayloadFormat,
    pub dataset: Dataset,
}

impl LoadedPayload {
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {path:?}"))?;
        let format = detect_format(path, &bytes);
        let text_bytes = match format {
            PayloadFormat::Json5 => bytes,
            PayloadFormat::GzipJson5 => {
                let mut decoder = GzDecoder::new(&bytes[..]);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).context("gzip decompress")?;
                out
            }
        };

        let text = std::str::from_utf8(&text_bytes).context("payload is not valid UTF-8")?;
        let dataset = Dataset::from_json5(text)?;
        tracing::info!(
            path = %path.display(),
            ?format,
            rows = dataset.row_count(),
            "loaded payload"
        );

        Ok(Self {
            source_path: path.to_path_buf(),
            format,
            dataset,
        })
    }
}

impl Dataset {
    /// Parses a `category -> node -> [row]` JSON5 object.
    pub fn from_json5(text: &str) -> anyhow::Result<Dataset> {
        json5::from_str::<Dataset>(text).context("parsing JSON5 payload")
    }

    /// The whole dataset as indented JSON, for export.
    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("serializing dataset")
    }
}

fn detect_format(path: &Path, bytes: &[u8]) -> PayloadFormat {
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        return PayloadFormat::GzipJson5;
    }
    // Gzip magic: 1F 8B
    if bytes.len() >= 2 && bytes[0] == 0x1F && bytes[1] == 0x8B {
        return PayloadFormat::GzipJson5;
    }
    PayloadFormat::Json5
}
