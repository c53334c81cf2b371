// Report service - page shell and on-demand section rendering
use crate::application::section_composer::SectionComposer;
use crate::domain::page::{NavUnit, Page, RenderedReport, SectionOutput};
use crate::domain::report::ReportSpec;
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportService {
    report: Arc<ReportSpec>,
    composer: SectionComposer,
}

impl ReportService {
    pub fn new(report: Arc<ReportSpec>, composer: SectionComposer) -> Self {
        Self { report, composer }
    }

    /// Header and one navigation tab per section, in declared order
    pub fn page(&self) -> Page {
        Page {
            title: self.report.title.clone(),
            page_title: self.report.page_title.clone(),
            nav: self
                .report
                .sections
                .iter()
                .map(|s| NavUnit {
                    id: s.id.clone(),
                    label: s.label.clone(),
                })
                .collect(),
        }
    }

    /// Render one section; panels of other sections are not touched
    pub async fn render_section(&self, id: &str) -> Option<SectionOutput> {
        let section = self.report.section(id)?;
        tracing::debug!("Rendering section {} ({} panels)", id, section.panels.len());
        Some(self.composer.compose(section).await)
    }

    pub async fn render_report(&self) -> RenderedReport {
        let mut sections = Vec::with_capacity(self.report.sections.len());
        for section in &self.report.sections {
            sections.push(self.composer.compose(section).await);
        }
        RenderedReport {
            page: self.page(),
            sections,
        }
    }
}
