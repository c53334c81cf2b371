// Region boundary geometry for choropleth joins
use super::error::ReportError;
use super::report::GeoSource;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Geometry {
    pub document: serde_json::Value,
    regions: HashSet<String>,
}

impl Geometry {
    /// Index a GeoJSON FeatureCollection by the region name found at
    /// `source.feature_id_key` in each feature
    pub fn from_document(source: &GeoSource, document: serde_json::Value) -> Result<Self, ReportError> {
        let unavailable = |reason: &str| ReportError::GeometryUnavailable {
            location: source.location.clone(),
            reason: reason.to_string(),
        };

        let features = document
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| unavailable("document is not a FeatureCollection"))?;

        let regions = features
            .iter()
            .filter_map(|feature| lookup_path(feature, &source.feature_id_key))
            .filter_map(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();

        Ok(Self { document, regions })
    }

    pub fn contains(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

fn lookup_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}
