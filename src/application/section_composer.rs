// Section composer - renders a section's panels with per-panel failure isolation
use crate::application::dataset_repository::{DatasetRepository, GeometryRepository};
use crate::application::panel_renderer::PanelRenderer;
use crate::domain::chart::RenderedChart;
use crate::domain::dataset::{Dataset, DatasetKey};
use crate::domain::error::ReportError;
use crate::domain::geometry::Geometry;
use crate::domain::page::{PanelBody, PanelOutput, SectionOutput};
use crate::domain::report::{ChartKind, GeoSource, PanelSpec, SectionSpec};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

type Loaded<T> = Result<Arc<T>, ReportError>;

#[derive(Clone)]
pub struct SectionComposer {
    datasets: Arc<dyn DatasetRepository>,
    geometry: Arc<dyn GeometryRepository>,
    renderer: PanelRenderer,
}

impl SectionComposer {
    pub fn new(datasets: Arc<dyn DatasetRepository>, geometry: Arc<dyn GeometryRepository>) -> Self {
        Self {
            datasets,
            geometry,
            renderer: PanelRenderer::new(),
        }
    }

    pub async fn compose(&self, section: &SectionSpec) -> SectionOutput {
        let datasets = self.load_datasets(&section.panels).await;
        let geometries = self.load_geometries(&section.panels).await;

        let panels = section
            .panels
            .iter()
            .map(|panel| {
                let body = match self.render_panel(panel, &datasets, &geometries) {
                    Ok(chart) => PanelBody::Rendered(chart),
                    Err(e) => {
                        tracing::warn!(
                            "Panel {} in section {} failed: {}",
                            panel.id,
                            section.id,
                            e
                        );
                        PanelBody::failed(&e, panel.dataset.to_string())
                    }
                };
                PanelOutput {
                    id: panel.id.clone(),
                    heading: panel.heading.clone(),
                    insight: panel.insight.clone(),
                    body,
                }
            })
            .collect();

        SectionOutput {
            id: section.id.clone(),
            label: section.label.clone(),
            header: section.header.clone(),
            panels,
        }
    }

    fn render_panel(
        &self,
        panel: &PanelSpec,
        datasets: &HashMap<DatasetKey, Loaded<Dataset>>,
        geometries: &HashMap<GeoSource, Loaded<Geometry>>,
    ) -> Result<RenderedChart, ReportError> {
        let dataset = match datasets.get(&panel.dataset) {
            Some(loaded) => loaded.clone()?,
            None => return Err(not_loaded(&panel.dataset)),
        };

        let geometry = match &panel.kind {
            ChartKind::Choropleth { geo } => match geometries.get(geo) {
                Some(loaded) => Some(loaded.clone()?),
                None => None,
            },
            _ => None,
        };

        self.renderer.render(panel, &dataset, geometry.as_deref())
    }

    /// Load every distinct dataset the panels reference, concurrently
    async fn load_datasets(&self, panels: &[PanelSpec]) -> HashMap<DatasetKey, Loaded<Dataset>> {
        let mut keys: Vec<&DatasetKey> = Vec::new();
        for panel in panels {
            if !keys.contains(&&panel.dataset) {
                keys.push(&panel.dataset);
            }
        }

        let loads = keys.iter().map(|key| self.datasets.load(key));
        let results = join_all(loads).await;

        keys.into_iter().cloned().zip(results).collect()
    }

    async fn load_geometries(&self, panels: &[PanelSpec]) -> HashMap<GeoSource, Loaded<Geometry>> {
        let mut sources: Vec<&GeoSource> = Vec::new();
        for panel in panels {
            if let ChartKind::Choropleth { geo } = &panel.kind {
                if !sources.contains(&geo) {
                    sources.push(geo);
                }
            }
        }

        let loads = sources.iter().map(|source| self.geometry.load(source));
        let results = join_all(loads).await;

        sources.into_iter().cloned().zip(results).collect()
    }
}

fn not_loaded(key: &DatasetKey) -> ReportError {
    ReportError::DatasetUnreadable {
        key: key.to_string(),
        reason: "dataset was not loaded".to_string(),
    }
}
