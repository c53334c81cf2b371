// Report domain model - declarative panels, sections and the report root
use super::dataset::DatasetKey;
use super::error::ReportError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSpec {
    pub title: String,
    pub page_title: String,
    pub sections: Vec<SectionSpec>,
}

impl ReportSpec {
    pub fn new(title: String, page_title: String, sections: Vec<SectionSpec>) -> Self {
        Self {
            title,
            page_title,
            sections,
        }
    }

    pub fn section(&self, id: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn panel_count(&self) -> usize {
        self.sections.iter().map(|s| s.panels.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub id: String,
    /// Text of the navigation tab
    pub label: String,
    /// Heading shown at the top of the section body
    pub header: String,
    pub panels: Vec<PanelSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub id: String,
    pub heading: String,
    pub title: String,
    pub insight: Option<String>,
    pub dataset: DatasetKey,
    pub views: Vec<DerivedView>,
    pub kind: ChartKind,
    pub bindings: Bindings,
    pub palette: Palette,
}

impl PanelSpec {
    /// Every column this panel reads, in binding order, without duplicates
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut candidates: Vec<&str> = Vec::new();

        for view in &self.views {
            match view {
                DerivedView::TopN { by, .. }
                | DerivedView::Sort { by, .. }
                | DerivedView::BelowMean { by }
                | DerivedView::AboveMean { by } => candidates.push(by),
                DerivedView::ArgmaxByGroup { group, by } => {
                    candidates.push(group);
                    candidates.push(by);
                }
            }
        }

        candidates.push(&self.bindings.x);
        candidates.extend(self.bindings.y.iter().map(String::as_str));
        candidates.extend(self.bindings.color.as_deref());
        candidates.extend(self.bindings.hover_name.as_deref());
        match &self.kind {
            ChartKind::Bar {
                labels: Some(BarLabels { column: Some(column), .. }),
                ..
            } => candidates.push(column),
            ChartKind::Scatter { size: Some(size) } => candidates.push(size),
            _ => {}
        }

        let mut columns: Vec<&str> = Vec::with_capacity(candidates.len());
        for name in candidates {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        columns
    }
}

/// Column bindings. For choropleth panels `x` is the region-name column.
#[derive(Debug, Clone, PartialEq)]
pub struct Bindings {
    pub x: String,
    pub y: Vec<String>,
    pub color: Option<String>,
    pub hover_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    Line {
        markers: bool,
    },
    Bar {
        mode: BarMode,
        labels: Option<BarLabels>,
        tick_angle: Option<i32>,
    },
    Scatter {
        size: Option<String>,
    },
    Choropleth {
        geo: GeoSource,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    Group,
    Stack,
    Relative,
}

impl BarMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BarMode::Group => "group",
            BarMode::Stack => "stack",
            BarMode::Relative => "relative",
        }
    }
}

impl FromStr for BarMode {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(BarMode::Group),
            "stack" => Ok(BarMode::Stack),
            "relative" => Ok(BarMode::Relative),
            other => Err(ReportError::invalid(format!("unknown bar mode {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLabels {
    /// Column whose values label the bars; the bar height when absent
    pub column: Option<String>,
    pub format: NumberFormat,
    pub position: String,
}

/// d3-style number format: `.2f` or `.2s`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFormat {
    Fixed(u8),
    Si(u8),
}

impl FromStr for NumberFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::invalid(format!("unsupported number format {}", s));
        let body = s.strip_prefix('.').ok_or_else(invalid)?;
        let suffix_at = body.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (digits, suffix) = body.split_at(suffix_at);
        let precision: u8 = digits.parse().map_err(|_| invalid())?;
        match suffix {
            "f" => Ok(NumberFormat::Fixed(precision)),
            "s" => Ok(NumberFormat::Si(precision)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberFormat::Fixed(p) => write!(f, ".{}f", p),
            NumberFormat::Si(p) => write!(f, ".{}s", p),
        }
    }
}

/// Boundary geometry used by choropleth panels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeoSource {
    /// `http(s)://` URL or local path of a GeoJSON FeatureCollection
    pub location: String,
    /// Dotted path to the region name inside each feature, e.g. `properties.ST_NM`
    pub feature_id_key: String,
}

impl GeoSource {
    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Palette {
    #[default]
    Auto,
    Discrete(BTreeMap<String, String>),
    Continuous(String),
}

/// Row selection applied to a dataset before it is charted
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedView {
    TopN { by: String, n: usize },
    Sort { by: String, descending: bool },
    BelowMean { by: String },
    AboveMean { by: String },
    ArgmaxByGroup { group: String, by: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_panel() -> PanelSpec {
        PanelSpec {
            id: "q7".to_string(),
            heading: "Query 7".to_string(),
            title: "Top brands".to_string(),
            insight: None,
            dataset: DatasetKey::new(None, "c2_q7".to_string()),
            views: vec![DerivedView::TopN {
                by: "Users".to_string(),
                n: 10,
            }],
            kind: ChartKind::Bar {
                mode: BarMode::Relative,
                labels: Some(BarLabels {
                    column: Some("Users".to_string()),
                    format: NumberFormat::Si(2),
                    position: "outside".to_string(),
                }),
                tick_angle: None,
            },
            bindings: Bindings {
                x: "Brand".to_string(),
                y: vec!["Users".to_string()],
                color: Some("Brand".to_string()),
                hover_name: None,
            },
            palette: Palette::Auto,
        }
    }

    #[test]
    fn test_number_format_parse() {
        assert_eq!(".2f".parse::<NumberFormat>().unwrap(), NumberFormat::Fixed(2));
        assert_eq!(".2s".parse::<NumberFormat>().unwrap(), NumberFormat::Si(2));
        assert_eq!(".10f".parse::<NumberFormat>().unwrap(), NumberFormat::Fixed(10));
        assert!("2f".parse::<NumberFormat>().is_err());
        assert!(".2e".parse::<NumberFormat>().is_err());
        assert!(".f".parse::<NumberFormat>().is_err());
        assert_eq!(NumberFormat::Si(2).to_string(), ".2s");
    }

    #[test]
    fn test_bar_mode_parse() {
        assert_eq!("group".parse::<BarMode>().unwrap(), BarMode::Group);
        assert_eq!("stack".parse::<BarMode>().unwrap(), BarMode::Stack);
        assert_eq!("overlay".parse::<BarMode>().unwrap_err().kind(), "ReportSpecInvalid");
    }

    #[test]
    fn test_referenced_columns_deduplicated() {
        assert_eq!(bar_panel().referenced_columns(), vec!["Users", "Brand"]);
    }

    #[test]
    fn test_geo_source_remote() {
        let geo = GeoSource {
            location: "https://example.com/india.geojson".to_string(),
            feature_id_key: "properties.ST_NM".to_string(),
        };
        assert!(geo.is_remote());
        let local = GeoSource {
            location: "geo/india.geojson".to_string(),
            ..geo
        };
        assert!(!local.is_remote());
    }
}
