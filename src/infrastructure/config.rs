use crate::domain::dataset::DatasetKey;
use crate::domain::error::ReportError;
use crate::domain::report::{
    BarLabels, BarMode, Bindings, ChartKind, DerivedView, GeoSource, NumberFormat, Palette,
    PanelSpec, ReportSpec, SectionSpec,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub geo: GeoSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataSettings {
    #[serde(default = "default_data_root")]
    pub root: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            root: default_data_root(),
            extension: default_extension(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoSettings {
    /// Upper bound on fetching one remote geometry document
    #[serde(default = "default_geo_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_geo_timeout(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_extension() -> String {
    "csv".to_string()
}

fn default_geo_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub title: String,
    pub page_title: Option<String>,
    #[serde(default)]
    pub color_maps: HashMap<String, Vec<ColorEntry>>,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColorEntry {
    pub category: String,
    pub color: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SectionConfig {
    pub id: String,
    pub label: Option<String>,
    pub header: Option<String>,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub id: String,
    pub heading: Option<String>,
    pub title: String,
    pub dataset: String,
    pub group: Option<String>,
    pub kind: String,
    pub x: Option<String>,
    pub locations: Option<String>,
    pub y: Option<OneOrMany>,
    pub color: Option<String>,
    pub hover_name: Option<String>,
    pub markers: Option<bool>,
    pub bar_mode: Option<String>,
    pub text: Option<String>,
    pub text_format: Option<String>,
    pub text_position: Option<String>,
    pub tick_angle: Option<i32>,
    pub size: Option<String>,
    pub color_map: Option<String>,
    pub color_scale: Option<String>,
    pub insight: Option<String>,
    pub geo: Option<GeoConfig>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(column) => vec![column],
            OneOrMany::Many(columns) => columns,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoConfig {
    pub source: String,
    pub feature_id_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    pub op: String,
    pub by: String,
    pub n: Option<usize>,
    pub group: Option<String>,
    pub descending: Option<bool>,
}

/// Server settings from `config/server.toml`, overridable with `DASHBOARD__*` variables
pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    build_server_config(
        config::File::with_name("config/server").required(false),
        environment(),
    )
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("DASHBOARD").separator("__")
}

fn build_server_config<S>(file: S, env: config::Environment) -> anyhow::Result<ServerConfig>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(env)
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_report_config() -> anyhow::Result<ReportSpec> {
    build_report_config(config::File::with_name("config/report"))
}

fn build_report_config<S>(source: S) -> anyhow::Result<ReportSpec>
where
    S: config::Source + Send + Sync + 'static,
{
    let settings = config::Config::builder().add_source(source).build()?;

    let report: ReportConfig = settings.try_deserialize()?;
    Ok(ReportSpec::try_from(report)?)
}

impl TryFrom<ReportConfig> for ReportSpec {
    type Error = ReportError;

    fn try_from(config: ReportConfig) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(config.sections.len());

        for section in config.sections {
            if section.id.trim().is_empty() {
                return Err(ReportError::invalid("section id must not be empty"));
            }
            if !seen.insert(section.id.clone()) {
                return Err(ReportError::invalid(format!(
                    "duplicate section id {}",
                    section.id
                )));
            }
            sections.push(section.into_spec(&config.color_maps)?);
        }

        let page_title = config.page_title.unwrap_or_else(|| config.title.clone());
        Ok(ReportSpec::new(config.title, page_title, sections))
    }
}

impl SectionConfig {
    fn into_spec(self, color_maps: &HashMap<String, Vec<ColorEntry>>) -> Result<SectionSpec, ReportError> {
        let mut seen = HashSet::new();
        let mut panels = Vec::with_capacity(self.panels.len());

        for panel in self.panels {
            if panel.id.trim().is_empty() {
                return Err(ReportError::invalid(format!(
                    "section {}: panel id must not be empty",
                    self.id
                )));
            }
            if !seen.insert(panel.id.clone()) {
                return Err(ReportError::invalid(format!(
                    "section {}: duplicate panel id {}",
                    self.id, panel.id
                )));
            }
            panels.push(panel.into_spec(&self.id, color_maps)?);
        }

        let label = self.label.unwrap_or_else(|| self.id.clone());
        let header = self.header.unwrap_or_else(|| label.clone());
        Ok(SectionSpec {
            id: self.id,
            label,
            header,
            panels,
        })
    }
}

impl PanelConfig {
    fn into_spec(
        self,
        section: &str,
        color_maps: &HashMap<String, Vec<ColorEntry>>,
    ) -> Result<PanelSpec, ReportError> {
        let context = format!("panel {}/{}", section, self.id);
        let invalid = |detail: &str| ReportError::invalid(format!("{}: {}", context, detail));

        let kind = match self.kind.as_str() {
            "line" => ChartKind::Line {
                markers: self.markers.unwrap_or(false),
            },
            "bar" => {
                let mode = match &self.bar_mode {
                    Some(mode) => mode.parse::<BarMode>().map_err(|_| invalid("unknown bar_mode"))?,
                    None => BarMode::Relative,
                };
                let labels = if self.text.is_some() || self.text_format.is_some() {
                    let format = self
                        .text_format
                        .as_deref()
                        .unwrap_or(".2s")
                        .parse::<NumberFormat>()
                        .map_err(|_| invalid("text_format must look like .2f or .2s"))?;
                    Some(BarLabels {
                        column: self.text.clone(),
                        format,
                        position: self.text_position.clone().unwrap_or_else(|| "auto".to_string()),
                    })
                } else {
                    None
                };
                ChartKind::Bar {
                    mode,
                    labels,
                    tick_angle: self.tick_angle,
                }
            }
            "scatter" => ChartKind::Scatter {
                size: self.size.clone(),
            },
            "choropleth" => {
                let geo = self.geo.as_ref().ok_or_else(|| invalid("choropleth needs [geo]"))?;
                ChartKind::Choropleth {
                    geo: GeoSource {
                        location: geo.source.clone(),
                        feature_id_key: geo.feature_id_key.clone(),
                    },
                }
            }
            other => return Err(invalid(&format!("unknown kind {}", other))),
        };

        let is_map = matches!(kind, ChartKind::Choropleth { .. });
        let x = if is_map {
            self.locations
                .clone()
                .or_else(|| self.x.clone())
                .ok_or_else(|| invalid("missing locations"))?
        } else {
            self.x.clone().ok_or_else(|| invalid("missing x"))?
        };

        let y = self.y.map(OneOrMany::into_vec).unwrap_or_default();
        if !is_map && y.is_empty() {
            return Err(invalid("at least one y column is required"));
        }
        if is_map && self.color.is_none() {
            return Err(invalid("choropleth needs a color column"));
        }

        let palette = match (&self.color_map, &self.color_scale) {
            (Some(name), _) => {
                let entries = color_maps
                    .get(name)
                    .ok_or_else(|| invalid(&format!("undefined color_map {}", name)))?;
                Palette::Discrete(
                    entries
                        .iter()
                        .map(|e| (e.category.clone(), e.color.clone()))
                        .collect::<BTreeMap<_, _>>(),
                )
            }
            (None, Some(scale)) => Palette::Continuous(scale.clone()),
            (None, None) => Palette::Auto,
        };

        let views = self
            .views
            .into_iter()
            .map(|view| view.into_view().map_err(|detail| invalid(&detail)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PanelSpec {
            heading: self.heading.unwrap_or_else(|| self.title.clone()),
            id: self.id,
            title: self.title,
            insight: self.insight,
            dataset: DatasetKey::new(self.group, self.dataset),
            views,
            kind,
            bindings: Bindings {
                x,
                y,
                color: self.color,
                hover_name: self.hover_name,
            },
            palette,
        })
    }
}

impl ViewConfig {
    fn into_view(self) -> Result<DerivedView, String> {
        match self.op.as_str() {
            "top_n" => match self.n {
                Some(n) if n > 0 => Ok(DerivedView::TopN { by: self.by, n }),
                _ => Err("top_n needs n > 0".to_string()),
            },
            "sort" => Ok(DerivedView::Sort {
                by: self.by,
                descending: self.descending.unwrap_or(false),
            }),
            "below_mean" => Ok(DerivedView::BelowMean { by: self.by }),
            "above_mean" => Ok(DerivedView::AboveMean { by: self.by }),
            "argmax_by_group" => match self.group {
                Some(group) => Ok(DerivedView::ArgmaxByGroup { group, by: self.by }),
                None => Err("argmax_by_group needs a group column".to_string()),
            },
            other => Err(format!("unknown view op {}", other)),
        }
    }
}
