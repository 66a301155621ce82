//! CLI entry points for the indexing pipeline.
//!
//! `pagegrep index`, `pagegrep remove` and `pagegrep ingest` all build a
//! batch of change events and run it through [`Pipeline::process`] against
//! the configured SQLite store and OCR engine.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use pagegrep_core::events::{parse_batch, ChangeEvent};
use pagegrep_core::store::DocumentStore;

use crate::config::Config;
use crate::db;
use crate::pipeline::Pipeline;
use crate::sqlite_store::SqliteStore;
use crate::textract;

/// Read an event batch file: a JSON array of events or an S3 notification.
pub fn load_events(path: &Path) -> Result<Vec<ChangeEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Events file is not valid JSON: {}", path.display()))?;
    Ok(parse_batch(&value)?)
}

/// Run `events` through the pipeline and print a one-line summary.
pub async fn run_events(config: &Config, events: Vec<ChangeEvent>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));
    store.setup().await?;
    let ocr = textract::build_engine(&config.ocr)?;
    let pipeline = Pipeline::new(ocr, store);

    let result = pipeline.process(&events).await;
    pool.close().await;
    let report = result.map_err(|e| anyhow::anyhow!("{} ({})", e, e.code()))?;

    println!(
        "events: {}  upserted: {}  deleted: {}  skipped: {}",
        events.len(),
        report.upserted,
        report.deleted,
        report.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_events_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.json");
        fs::write(
            &path,
            r#"[{"event_name": "OBJECT_REMOVED", "bucket": "b1", "key": "p.jpg"}]"#,
        )
        .unwrap();
        assert_eq!(load_events(&path).unwrap(), vec![ChangeEvent::removed("b1", "p.jpg")]);
    }

    #[test]
    fn test_load_events_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_events(&path).is_err());
        assert!(load_events(&tmp.path().join("missing.json")).is_err());
    }
}
