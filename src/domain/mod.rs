// Domain layer - report specs, datasets and rendered output
pub mod chart;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod page;
pub mod report;
