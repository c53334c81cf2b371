// GeoJSON geometry repository - remote URLs via reqwest, local files via tokio::fs
use crate::application::dataset_repository::GeometryRepository;
use crate::domain::error::ReportError;
use crate::domain::geometry::Geometry;
use crate::domain::report::GeoSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct GeoJsonRepository {
    client: reqwest::Client,
    cache: RwLock<HashMap<GeoSource, Arc<Geometry>>>,
}

impl GeoJsonRepository {
    /// `timeout` bounds a whole remote fetch, body included
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            cache: RwLock::default(),
        })
    }

    async fn fetch(&self, source: &GeoSource) -> Result<serde_json::Value, ReportError> {
        let unavailable = |reason: String| ReportError::GeometryUnavailable {
            location: source.location.clone(),
            reason,
        };

        if source.is_remote() {
            let response = self
                .client
                .get(&source.location)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| unavailable(e.to_string()))?;

            if !response.status().is_success() {
                return Err(unavailable(format!("request failed with status {}", response.status())));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| unavailable(e.to_string()))
        } else {
            let bytes = tokio::fs::read(&source.location)
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|e| unavailable(e.to_string()))
        }
    }
}

#[async_trait]
impl GeometryRepository for GeoJsonRepository {
    async fn load(&self, source: &GeoSource) -> Result<Arc<Geometry>, ReportError> {
        if let Some(geometry) = self.cache.read().await.get(source) {
            return Ok(geometry.clone());
        }

        let document = self.fetch(source).await?;
        let geometry = Arc::new(Geometry::from_document(source, document)?);
        tracing::debug!(
            "Loaded geometry {} ({} regions)",
            source.location,
            geometry.region_count()
        );

        let mut cache = self.cache.write().await;
        Ok(cache.entry(source.clone()).or_insert(geometry).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn local(path: &std::path::Path) -> GeoSource {
        GeoSource {
            location: path.display().to_string(),
            feature_id_key: "properties.ST_NM".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_local_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("india.geojson");
        fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"ST_NM":"Goa"},"geometry":null},
                {"type":"Feature","properties":{"ST_NM":"Kerala"},"geometry":null}
            ]}"#,
        )
        .unwrap();

        let repo = GeoJsonRepository::new(Duration::from_secs(5)).unwrap();
        let geometry = repo.load(&local(&path)).await.unwrap();
        assert_eq!(geometry.region_count(), 2);
        assert!(geometry.contains("Kerala"));

        let again = repo.load(&local(&path)).await.unwrap();
        assert!(Arc::ptr_eq(&geometry, &again));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = GeoJsonRepository::new(Duration::from_secs(5)).unwrap();
        let err = repo.load(&local(&dir.path().join("none.geojson"))).await.unwrap_err();
        assert_eq!(err.kind(), "GeometryUnavailable");
    }

    #[tokio::test]
    async fn test_invalid_json_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        fs::write(&path, "{ not json").unwrap();

        let err = GeoJsonRepository::new(Duration::from_secs(5)).unwrap().load(&local(&path)).await.unwrap_err();
        assert_eq!(err.kind(), "GeometryUnavailable");
    }

    #[tokio::test]
    async fn test_stalled_host_times_out() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let repo = GeoJsonRepository::new(Duration::from_millis(200)).unwrap();
        let source = GeoSource {
            location: format!("http://{addr}/india.geojson"),
            feature_id_key: "properties.ST_NM".to_string(),
        };

        let outcome = tokio::time::timeout(Duration::from_secs(5), repo.load(&source))
            .await
            .expect("geometry load should give up before the outer deadline");
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), "GeometryUnavailable");
        assert!(repo.cache.read().await.is_empty());
    }
}
