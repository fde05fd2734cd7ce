//! Update sources: where raw regulatory records come from.
//!
//! The engine itself never does I/O — the orchestrator performs one fetch
//! through this trait before invoking the pure pipeline. A structurally
//! malformed payload (not an array) fails fast here, so the pipeline never
//! has to recover from shape errors.

use std::path::PathBuf;

use async_trait::async_trait;

use regpulse_common::RegPulseError;

use crate::extract::RawUpdate;

#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(&self) -> Result<Vec<RawUpdate>, RegPulseError>;
}

/// Reads a JSON array of raw update records from a file.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UpdateSource for JsonFileSource {
    async fn fetch_updates(&self) -> Result<Vec<RawUpdate>, RegPulseError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            RegPulseError::Source(format!("reading {}: {e}", self.path.display()))
        })?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| RegPulseError::Source(format!("parsing update payload: {e}")))?;

        let serde_json::Value::Array(items) = value else {
            return Err(RegPulseError::Source(
                "update payload must be a JSON array".to_string(),
            ));
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|e| RegPulseError::Source(format!("malformed update record: {e}")))
            })
            .collect()
    }
}

/// In-memory source, for tests and embedding.
pub struct StaticSource {
    updates: Vec<RawUpdate>,
}

impl StaticSource {
    pub fn new(updates: Vec<RawUpdate>) -> Self {
        Self { updates }
    }
}

#[async_trait]
impl UpdateSource for StaticSource {
    async fn fetch_updates(&self) -> Result<Vec<RawUpdate>, RegPulseError> {
        Ok(self.updates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_array_payload_fails_fast() {
        let dir = std::env::temp_dir();
        let path = dir.join("regpulse_source_test_non_array.json");
        tokio::fs::write(&path, br#"{"updates": []}"#).await.unwrap();

        let err = JsonFileSource::new(&path).fetch_updates().await.unwrap_err();
        assert!(matches!(err, RegPulseError::Source(_)));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn tolerant_records_parse() {
        let dir = std::env::temp_dir();
        let path = dir.join("regpulse_source_test_records.json");
        tokio::fs::write(
            &path,
            br#"[
                {"headline": "A", "publishedDate": "2026-03-02"},
                {"title": "B", "published_date": "2026-03-03", "unknownField": 1}
            ]"#,
        )
        .await
        .unwrap();

        let updates = JsonFileSource::new(&path).fetch_updates().await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].headline.as_deref(), Some("B"));

        tokio::fs::remove_file(&path).await.ok();
    }
}
