// Application layer - views, rendering and section composition
pub mod dataset_repository;
pub mod panel_renderer;
pub mod report_service;
pub mod section_composer;
pub mod transform;
