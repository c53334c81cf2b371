// Page domain model - composed sections and navigation
use super::chart::RenderedChart;
use super::error::ReportError;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page {
    pub title: String,
    pub page_title: String,
    pub nav: Vec<NavUnit>,
}

/// One selectable tab
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavUnit {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionOutput {
    pub id: String,
    pub label: String,
    pub header: String,
    pub panels: Vec<PanelOutput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PanelOutput {
    pub id: String,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight: Option<String>,
    pub body: PanelBody,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelBody {
    Rendered(RenderedChart),
    Failed {
        kind: String,
        dataset: String,
        message: String,
    },
}

impl PanelBody {
    pub fn failed(error: &ReportError, dataset: String) -> Self {
        PanelBody::Failed {
            kind: error.kind().to_string(),
            dataset,
            message: error.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PanelBody::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedReport {
    pub page: Page,
    pub sections: Vec<SectionOutput>,
}
