// CSV dataset repository - `<root>/<group>/<name>.<ext>` files with a load cache
use crate::application::dataset_repository::DatasetRepository;
use crate::domain::dataset::{Dataset, DatasetKey};
use crate::domain::error::ReportError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct CsvDatasetRepository {
    root: PathBuf,
    extension: String,
    cache: RwLock<HashMap<DatasetKey, Arc<Dataset>>>,
}

impl CsvDatasetRepository {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn path_for(&self, key: &DatasetKey) -> PathBuf {
        let mut path = self.root.clone();
        if let Some(group) = &key.group {
            path.push(group);
        }
        path.push(format!("{}.{}", key.name, self.extension));
        path
    }

    async fn read(&self, key: &DatasetKey) -> Result<Dataset, ReportError> {
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ReportError::DatasetNotFound {
                key: key.to_string(),
                path: path.display().to_string(),
            },
            _ => ReportError::DatasetUnreadable {
                key: key.to_string(),
                reason: e.to_string(),
            },
        })?;

        parse_csv(key, &bytes)
    }
}

/// Parse CSV bytes with a header row into a typed dataset
pub fn parse_csv(key: &DatasetKey, bytes: &[u8]) -> Result<Dataset, ReportError> {
    let unreadable = |e: csv::Error| ReportError::DatasetUnreadable {
        key: key.to_string(),
        reason: e.to_string(),
    };

    // Row width is checked by `Dataset::from_records`
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(unreadable)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err(ReportError::SchemaMismatch {
            key: key.to_string(),
            detail: "file has no header row".to_string(),
        });
    }

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(unreadable)?;
        records.push(record.iter().map(str::to_string).collect());
    }

    Dataset::from_records(key.clone(), headers, records)
}

#[async_trait]
impl DatasetRepository for CsvDatasetRepository {
    async fn load(&self, key: &DatasetKey) -> Result<Arc<Dataset>, ReportError> {
        if let Some(dataset) = self.cache.read().await.get(key) {
            return Ok(dataset.clone());
        }

        // Failures are not cached so a fixed file is picked up on the next request
        let dataset = Arc::new(self.read(key).await?);
        tracing::debug!(
            "Loaded dataset {} ({} rows, {} columns)",
            key,
            dataset.len(),
            dataset.columns().len()
        );

        let mut cache = self.cache.write().await;
        Ok(cache.entry(key.clone()).or_insert(dataset).clone())
    }
}
