// Repository traits for read-only report inputs
use crate::domain::dataset::{Dataset, DatasetKey};
use crate::domain::error::ReportError;
use crate::domain::geometry::Geometry;
use crate::domain::report::GeoSource;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Resolve a logical dataset key to its table
    async fn load(&self, key: &DatasetKey) -> Result<Arc<Dataset>, ReportError>;
}

#[async_trait]
pub trait GeometryRepository: Send + Sync {
    /// Fetch and index the boundary geometry named by `source`
    async fn load(&self, source: &GeoSource) -> Result<Arc<Geometry>, ReportError>;
}
