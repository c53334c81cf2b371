// Panel renderer - binds dataset columns to Plotly traces
use crate::application::transform::apply_views;
use crate::domain::chart::{
    Axis, ColorBar, Figure, Geo, Layout, Legend, LineStyle, Marker, RenderedChart, Title, Trace,
};
use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::ReportError;
use crate::domain::geometry::Geometry;
use crate::domain::report::{BarLabels, ChartKind, GeoSource, Palette, PanelSpec};
use serde_json::json;

/// Bar charts with more distinct categories than this get rotated ticks
pub const ROTATE_AFTER_CATEGORIES: usize = 8;
pub const ROTATED_TICK_ANGLE: i32 = -45;

const MAX_MARKER_SIZE: f64 = 20.0;
const DEFAULT_CONTINUOUS_SCALE: &str = "Plasma";
const QUALITATIVE_COLORS: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct PanelRenderer;

impl PanelRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render one panel. `geometry` is only consulted by choropleth panels.
    pub fn render(
        &self,
        panel: &PanelSpec,
        dataset: &Dataset,
        geometry: Option<&Geometry>,
    ) -> Result<RenderedChart, ReportError> {
        for column in panel.referenced_columns() {
            dataset.require_column(column)?;
        }

        let view = apply_views(dataset, &panel.views)?;
        let frame = Frame::new(panel, &view);

        match &panel.kind {
            ChartKind::Line { markers } => frame.line(*markers),
            ChartKind::Bar {
                mode,
                labels,
                tick_angle,
            } => frame.bar(mode.as_str(), labels.as_ref(), *tick_angle),
            ChartKind::Scatter { size } => frame.scatter(size.as_deref()),
            ChartKind::Choropleth { geo } => {
                let geometry = geometry.ok_or_else(|| ReportError::GeometryUnavailable {
                    location: geo.location.clone(),
                    reason: "geometry was not loaded".to_string(),
                })?;
                frame.choropleth(geo, geometry)
            }
        }
    }
}

/// Rows of a derived view in a series: one per y column and colour group
struct Series {
    name: Option<String>,
    group: Option<String>,
    y: String,
    rows: Vec<usize>,
}

enum ColorEncoding {
    None,
    Categorical(usize),
    Continuous(usize),
}

struct Frame<'a> {
    panel: &'a PanelSpec,
    view: &'a Dataset,
    color: ColorEncoding,
}

impl<'a> Frame<'a> {
    fn new(panel: &'a PanelSpec, view: &'a Dataset) -> Self {
        let color = match panel.bindings.color.as_deref().and_then(|c| view.column_index(c)) {
            Some(idx) if view.kind_of(idx).is_numeric() => ColorEncoding::Continuous(idx),
            Some(idx) => ColorEncoding::Categorical(idx),
            None => ColorEncoding::None,
        };
        Self { panel, view, color }
    }

    fn line(&self, markers: bool) -> Result<RenderedChart, ReportError> {
        let mode = if markers { "lines+markers" } else { "lines" };
        let data = self
            .series()
            .into_iter()
            .enumerate()
            .map(|(position, series)| {
                let color = self.discrete_color(&series, position);
                Trace {
                    trace_type: "scatter",
                    mode: Some(mode),
                    name: series.name.clone(),
                    x: Some(self.pick(&self.panel.bindings.x, &series.rows)),
                    y: Some(self.pick(&series.y, &series.rows)),
                    hovertext: self.hover(&series.rows),
                    marker: color.clone().map(|c| Marker {
                        color: Some(json!(c)),
                        ..Default::default()
                    }),
                    line: color.map(|color| LineStyle { color }),
                    ..Default::default()
                }
            })
            .collect();

        Ok(self.finish(data, self.xy_layout(), Vec::new()))
    }

    fn bar(
        &self,
        barmode: &'static str,
        labels: Option<&BarLabels>,
        tick_angle: Option<i32>,
    ) -> Result<RenderedChart, ReportError> {
        let data = self
            .series()
            .into_iter()
            .enumerate()
            .map(|(position, series)| {
                let mut trace = Trace {
                    trace_type: "bar",
                    name: series.name.clone(),
                    x: Some(self.pick(&self.panel.bindings.x, &series.rows)),
                    y: Some(self.pick(&series.y, &series.rows)),
                    hovertext: self.hover(&series.rows),
                    marker: self.marker(&series, position),
                    ..Default::default()
                };
                if let Some(labels) = labels {
                    let variable = match &labels.column {
                        Some(column) => {
                            trace.text = Some(self.pick(column, &series.rows));
                            "text"
                        }
                        None => "y",
                    };
                    trace.texttemplate = Some(format!("%{{{}:{}}}", variable, labels.format));
                    trace.textposition = Some(labels.position.clone());
                }
                trace
            })
            .collect();

        let mut layout = self.xy_layout();
        layout.barmode = Some(barmode);
        let angle = tick_angle.or_else(|| self.auto_tick_angle());
        if let Some(xaxis) = layout.xaxis.as_mut() {
            xaxis.tickangle = angle;
        }
        Ok(self.finish(data, layout, Vec::new()))
    }

    fn scatter(&self, size: Option<&str>) -> Result<RenderedChart, ReportError> {
        let sizeref = size.and_then(|column| self.sizeref(column));

        let data = self
            .series()
            .into_iter()
            .enumerate()
            .map(|(position, series)| {
                let mut marker = self.marker(&series, position).unwrap_or_default();
                if let (Some(column), Some(sizeref)) = (size, sizeref) {
                    marker.size = Some(self.pick(column, &series.rows));
                    marker.sizemode = Some("area");
                    marker.sizeref = Some(sizeref);
                }
                Trace {
                    trace_type: "scatter",
                    mode: Some("markers"),
                    name: series.name.clone(),
                    x: Some(self.pick(&self.panel.bindings.x, &series.rows)),
                    y: Some(self.pick(&series.y, &series.rows)),
                    hovertext: self.hover(&series.rows),
                    marker: Some(marker),
                    ..Default::default()
                }
            })
            .collect();

        Ok(self.finish(data, self.xy_layout(), Vec::new()))
    }

    fn choropleth(&self, geo: &GeoSource, geometry: &Geometry) -> Result<RenderedChart, ReportError> {
        let location_idx = self.view.require_column(&self.panel.bindings.x)?;
        let value_column = self
            .panel
            .bindings
            .color
            .as_deref()
            .or_else(|| self.panel.bindings.y.first().map(String::as_str))
            .ok_or_else(|| {
                ReportError::invalid(format!("choropleth panel {} has no colour column", self.panel.id))
            })?;
        let value_idx = self.view.require_column(value_column)?;

        let mut matched = Vec::new();
        let mut unmatched: Vec<String> = Vec::new();
        for (row_idx, row) in self.view.rows().iter().enumerate() {
            let region = row[location_idx].label();
            // A row without a region name has nothing to join on
            if region.trim().is_empty() {
                continue;
            }
            if geometry.contains(&region) {
                matched.push(row_idx);
            } else if !unmatched.contains(&region) {
                unmatched.push(region);
            }
        }

        let mut warnings = Vec::new();
        if !unmatched.is_empty() {
            let warning = ReportError::GeometryJoinIncomplete { unmatched };
            tracing::warn!("Panel {}: {}", self.panel.id, warning);
            warnings.push(warning.to_string());
        }

        let geojson = if geo.is_remote() {
            json!(geo.location)
        } else {
            geometry.document.clone()
        };
        let base = Trace {
            trace_type: "choropleth",
            geojson: Some(geojson),
            featureidkey: Some(geo.feature_id_key.clone()),
            ..Default::default()
        };

        let data = if self.view.kind_of(value_idx).is_numeric() {
            vec![Trace {
                locations: Some(self.pick_idx(location_idx, &matched)),
                z: Some(self.pick_idx(value_idx, &matched)),
                hovertext: self.hover(&matched),
                colorscale: Some(json!(self.continuous_scale())),
                colorbar: Some(ColorBar {
                    title: Title::new(value_column),
                }),
                ..base
            }]
        } else {
            // One flat-coloured trace per category, as a discrete legend
            group_rows(self.view, value_idx, &matched)
                .into_iter()
                .enumerate()
                .map(|(position, (category, rows))| {
                    let color = self.category_color(&category, position);
                    Trace {
                        name: Some(category),
                        locations: Some(self.pick_idx(location_idx, &rows)),
                        z: Some(vec![Value::Int(1); rows.len()]),
                        hovertext: self.hover(&rows),
                        colorscale: Some(json!([[0, color], [1, color]])),
                        showscale: Some(false),
                        showlegend: Some(true),
                        ..base.clone()
                    }
                })
                .collect()
        };

        let mut layout = Layout::titled(&self.panel.title);
        layout.geo = Some(Geo {
            fitbounds: "locations",
            visible: false,
        });
        layout.legend = Some(Legend {
            title: Title::new(value_column),
        });
        Ok(self.finish(data, layout, warnings))
    }

    /// Split the view into series: per y column, and per colour group when
    /// the colour column is categorical
    fn series(&self) -> Vec<Series> {
        let ys = &self.panel.bindings.y;
        let all_rows: Vec<usize> = (0..self.view.len()).collect();

        match self.color {
            ColorEncoding::Categorical(idx) => {
                let groups = group_rows(self.view, idx, &all_rows);
                groups
                    .into_iter()
                    .flat_map(|(group, rows)| {
                        ys.iter().map(move |y| Series {
                            name: Some(if ys.len() > 1 {
                                format!("{}, {}", group, y)
                            } else {
                                group.clone()
                            }),
                            group: Some(group.clone()),
                            y: y.clone(),
                            rows: rows.clone(),
                        })
                    })
                    .collect()
            }
            _ => ys
                .iter()
                .map(|y| Series {
                    name: Some(y.clone()),
                    group: None,
                    y: y.clone(),
                    rows: all_rows.clone(),
                })
                .collect(),
        }
    }

    fn marker(&self, series: &Series, position: usize) -> Option<Marker> {
        match self.color {
            ColorEncoding::Continuous(idx) => Some(Marker {
                color: Some(json!(self.pick_idx(idx, &series.rows))),
                colorscale: Some(json!(self.continuous_scale())),
                showscale: Some(position == 0),
                colorbar: self.panel.bindings.color.as_ref().map(|c| ColorBar {
                    title: Title::new(c.as_str()),
                }),
                ..Default::default()
            }),
            _ => self.discrete_color(series, position).map(|c| Marker {
                color: Some(json!(c)),
                ..Default::default()
            }),
        }
    }

    /// Explicit colour for a categorical series, or `None` to use the default colourway
    fn discrete_color(&self, series: &Series, position: usize) -> Option<String> {
        match (&self.color, &series.group) {
            (ColorEncoding::Categorical(_), Some(group)) => Some(self.category_color(group, position)),
            _ => match &self.panel.palette {
                Palette::Discrete(map) => map.get(&series.y).cloned(),
                _ => None,
            },
        }
    }

    fn category_color(&self, category: &str, position: usize) -> String {
        if let Palette::Discrete(map) = &self.panel.palette {
            if let Some(color) = map.get(category) {
                return color.clone();
            }
        }
        QUALITATIVE_COLORS[position % QUALITATIVE_COLORS.len()].to_string()
    }

    fn continuous_scale(&self) -> String {
        match &self.panel.palette {
            Palette::Continuous(scale) => scale.clone(),
            _ => DEFAULT_CONTINUOUS_SCALE.to_string(),
        }
    }

    fn auto_tick_angle(&self) -> Option<i32> {
        let idx = self.view.column_index(&self.panel.bindings.x)?;
        let mut categories: Vec<String> = Vec::new();
        for row in self.view.rows() {
            let label = row[idx].label();
            if !categories.contains(&label) {
                categories.push(label);
            }
        }
        (categories.len() > ROTATE_AFTER_CATEGORIES).then_some(ROTATED_TICK_ANGLE)
    }

    /// Area-mode size reference so the largest marker is `MAX_MARKER_SIZE` px
    fn sizeref(&self, column: &str) -> Option<f64> {
        let idx = self.view.column_index(column)?;
        let max = self
            .view
            .rows()
            .iter()
            .filter_map(|r| r[idx].as_f64())
            .fold(f64::NEG_INFINITY, f64::max);
        (max.is_finite() && max > 0.0).then(|| 2.0 * max / (MAX_MARKER_SIZE * MAX_MARKER_SIZE))
    }

    fn xy_layout(&self) -> Layout {
        let bindings = &self.panel.bindings;
        let y_title = match bindings.y.as_slice() {
            [single] => single.clone(),
            _ => "value".to_string(),
        };

        let mut layout = Layout::titled(&self.panel.title);
        layout.xaxis = Some(Axis {
            title: Title::new(bindings.x.as_str()),
            tickangle: None,
        });
        layout.yaxis = Some(Axis {
            title: Title::new(y_title),
            tickangle: None,
        });
        layout.legend = self.legend_title();
        layout
    }

    fn legend_title(&self) -> Option<Legend> {
        match (&self.color, &self.panel.bindings.color) {
            (ColorEncoding::Categorical(_), Some(color)) => Some(Legend {
                title: Title::new(color.as_str()),
            }),
            _ if self.panel.bindings.y.len() > 1 => Some(Legend {
                title: Title::new("variable"),
            }),
            _ => None,
        }
    }

    fn hover(&self, rows: &[usize]) -> Option<Vec<Value>> {
        let column = self.panel.bindings.hover_name.as_deref()?;
        Some(self.pick(column, rows))
    }

    fn pick(&self, column: &str, rows: &[usize]) -> Vec<Value> {
        match self.view.column_index(column) {
            Some(idx) => self.pick_idx(idx, rows),
            None => Vec::new(),
        }
    }

    fn pick_idx(&self, idx: usize, rows: &[usize]) -> Vec<Value> {
        rows.iter().map(|&r| self.view.rows()[r][idx].clone()).collect()
    }

    fn finish(&self, data: Vec<Trace>, layout: Layout, warnings: Vec<String>) -> RenderedChart {
        RenderedChart::new(self.panel.id.clone(), Figure { data, layout }, warnings)
    }
}

/// Group row indices by the label in `column`, in order of first appearance
fn group_rows(dataset: &Dataset, column: usize, rows: &[usize]) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for &row in rows {
        let label = dataset.rows()[row][column].label();
        match groups.iter_mut().find(|(name, _)| *name == label) {
            Some((_, members)) => members.push(row),
            None => groups.push((label, vec![row])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::DatasetKey;
    use crate::domain::report::{BarMode, Bindings, DerivedView, NumberFormat};
    use std::collections::BTreeMap;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::from_records(
            DatasetKey::new(None, "test".to_string()),
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn panel(kind: ChartKind, x: &str, y: &[&str], color: Option<&str>) -> PanelSpec {
        PanelSpec {
            id: "p1".to_string(),
            heading: "Query".to_string(),
            title: "Chart".to_string(),
            insight: None,
            dataset: DatasetKey::new(None, "test".to_string()),
            views: Vec::new(),
            kind,
            bindings: Bindings {
                x: x.to_string(),
                y: y.iter().map(|s| s.to_string()).collect(),
                color: color.map(str::to_string),
                hover_name: None,
            },
            palette: Palette::Auto,
        }
    }

    fn bar() -> ChartKind {
        ChartKind::Bar {
            mode: BarMode::Group,
            labels: None,
            tick_angle: None,
        }
    }

    fn yearly() -> Dataset {
        dataset(
            &["Year", "Total_Transactions", "Total_Amount"],
            &[&["2018", "10", "100.5"], &["2019", "20", "250.0"]],
        )
    }

    fn india() -> Geometry {
        Geometry::from_document(
            &GeoSource {
                location: "geo/india.geojson".to_string(),
                feature_id_key: "properties.ST_NM".to_string(),
            },
            json!({"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"ST_NM": "Goa"}, "geometry": null},
                {"type": "Feature", "properties": {"ST_NM": "Assam"}, "geometry": null}
            ]}),
        )
        .unwrap()
    }

    fn choropleth_kind() -> ChartKind {
        ChartKind::Choropleth {
            geo: GeoSource {
                location: "geo/india.geojson".to_string(),
                feature_id_key: "properties.ST_NM".to_string(),
            },
        }
    }

    #[test]
    fn test_line_one_trace_per_y_column() {
        let spec = panel(
            ChartKind::Line { markers: true },
            "Year",
            &["Total_Transactions", "Total_Amount"],
            None,
        );
        let chart = PanelRenderer::new().render(&spec, &yearly(), None).unwrap();

        assert_eq!(chart.figure.data.len(), 2);
        assert_eq!(chart.figure.data[0].mode, Some("lines+markers"));
        assert_eq!(chart.figure.data[1].name.as_deref(), Some("Total_Amount"));
        let layout = &chart.figure.layout;
        assert_eq!(layout.yaxis.as_ref().unwrap().title.text, "value");
        assert_eq!(layout.legend.as_ref().unwrap().title.text, "variable");
    }

    #[test]
    fn test_line_split_by_color_group() {
        let data = dataset(
            &["Year", "State", "Total"],
            &[&["2018", "Goa", "1"], &["2018", "Assam", "2"], &["2019", "Goa", "3"]],
        );
        let spec = panel(ChartKind::Line { markers: false }, "Year", &["Total"], Some("State"));
        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();

        let names: Vec<_> = chart.figure.data.iter().map(|t| t.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Goa", "Assam"]);
        assert_eq!(chart.figure.data[0].y, Some(vec![Value::Int(1), Value::Int(3)]));
        assert_eq!(chart.figure.data[0].mode, Some("lines"));
    }

    #[test]
    fn test_missing_column_is_column_missing() {
        let spec = panel(bar(), "Year", &["Revenue"], None);
        let err = PanelRenderer::new().render(&spec, &yearly(), None).unwrap_err();
        assert_eq!(
            err,
            ReportError::ColumnMissing {
                key: "test".to_string(),
                column: "Revenue".to_string()
            }
        );
    }

    #[test]
    fn test_bar_group_mode_and_labels() {
        let spec = panel(
            ChartKind::Bar {
                mode: BarMode::Group,
                labels: Some(BarLabels {
                    column: None,
                    format: NumberFormat::Fixed(2),
                    position: "outside".to_string(),
                }),
                tick_angle: None,
            },
            "Year",
            &["Total_Transactions", "Total_Amount"],
            None,
        );
        let chart = PanelRenderer::new().render(&spec, &yearly(), None).unwrap();

        assert_eq!(chart.figure.layout.barmode, Some("group"));
        assert_eq!(chart.figure.data[0].texttemplate.as_deref(), Some("%{y:.2f}"));
        assert_eq!(chart.figure.data[0].textposition.as_deref(), Some("outside"));
        assert_eq!(chart.figure.layout.xaxis.as_ref().unwrap().tickangle, None);
    }

    #[test]
    fn test_bar_label_column_uses_text() {
        let data = dataset(&["Brand", "Users"], &[&["Vivo", "1500000"], &["Apple", "20000"]]);
        let spec = panel(
            ChartKind::Bar {
                mode: BarMode::Relative,
                labels: Some(BarLabels {
                    column: Some("Users".to_string()),
                    format: NumberFormat::Si(2),
                    position: "outside".to_string(),
                }),
                tick_angle: None,
            },
            "Brand",
            &["Users"],
            Some("Brand"),
        );
        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();

        assert_eq!(chart.figure.data.len(), 2);
        assert_eq!(chart.figure.data[0].texttemplate.as_deref(), Some("%{text:.2s}"));
        assert_eq!(chart.figure.data[0].text, Some(vec![Value::Int(1500000)]));
    }

    #[test]
    fn test_bar_rotates_ticks_after_eight_categories() {
        let names = ["A", "B", "C", "D", "E", "F", "G", "H", "I"];
        let rows: Vec<Vec<&str>> = names.iter().map(|n| vec![*n, "1"]).collect();
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let data = dataset(&["District", "Amount"], &rows);
        let spec = panel(bar(), "District", &["Amount"], None);

        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();
        assert_eq!(
            chart.figure.layout.xaxis.as_ref().unwrap().tickangle,
            Some(ROTATED_TICK_ANGLE)
        );

        let eight = data.with_rows(data.rows()[..8].to_vec());
        let chart = PanelRenderer::new().render(&spec, &eight, None).unwrap();
        assert_eq!(chart.figure.layout.xaxis.as_ref().unwrap().tickangle, None);
    }

    #[test]
    fn test_bar_explicit_tick_angle_wins() {
        let spec = panel(
            ChartKind::Bar {
                mode: BarMode::Stack,
                labels: None,
                tick_angle: Some(-30),
            },
            "Year",
            &["Total_Amount"],
            None,
        );
        let chart = PanelRenderer::new().render(&spec, &yearly(), None).unwrap();
        assert_eq!(chart.figure.layout.xaxis.as_ref().unwrap().tickangle, Some(-30));
        assert_eq!(chart.figure.layout.barmode, Some("stack"));
    }

    #[test]
    fn test_bar_numeric_color_is_continuous() {
        let mut spec = panel(bar(), "Year", &["Total_Amount"], Some("Total_Amount"));
        spec.palette = Palette::Continuous("Blues".to_string());
        let chart = PanelRenderer::new().render(&spec, &yearly(), None).unwrap();

        assert_eq!(chart.figure.data.len(), 1);
        let marker = chart.figure.data[0].marker.as_ref().unwrap();
        assert_eq!(marker.colorscale, Some(json!("Blues")));
        assert_eq!(marker.color, Some(json!([100.5, 250.0])));
        assert_eq!(marker.showscale, Some(true));
    }

    #[test]
    fn test_discrete_color_map_applied() {
        let data = dataset(&["Brand", "Users"], &[&["Vivo", "3"], &["Oppo", "2"]]);
        let mut spec = panel(bar(), "Brand", &["Users"], Some("Brand"));
        let mut map = BTreeMap::new();
        map.insert("Vivo".to_string(), "#8B5CF6".to_string());
        spec.palette = Palette::Discrete(map);

        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();
        let colors: Vec<_> = chart
            .figure
            .data
            .iter()
            .map(|t| t.marker.as_ref().unwrap().color.clone().unwrap())
            .collect();
        // Oppo is not mapped and falls back to the second default colour
        assert_eq!(colors, vec![json!("#8B5CF6"), json!(QUALITATIVE_COLORS[1])]);
    }

    #[test]
    fn test_views_applied_before_render() {
        let data = dataset(
            &["Brand", "Rate"],
            &[&["A", "1"], &["B", "5"], &["C", "3"]],
        );
        let mut spec = panel(bar(), "Brand", &["Rate"], None);
        spec.views = vec![DerivedView::TopN {
            by: "Rate".to_string(),
            n: 2,
        }];
        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();
        assert_eq!(
            chart.figure.data[0].x,
            Some(vec![Value::Text("B".to_string()), Value::Text("C".to_string())])
        );
    }

    #[test]
    fn test_scatter_size_encoding() {
        let data = dataset(
            &["Brand", "Users", "Rate"],
            &[&["Lava", "800", "0.5"], &["Micromax", "400", "0.2"]],
        );
        let mut spec = panel(
            ChartKind::Scatter {
                size: Some("Users".to_string()),
            },
            "Users",
            &["Rate"],
            Some("Brand"),
        );
        spec.bindings.hover_name = Some("Brand".to_string());
        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();

        assert_eq!(chart.figure.data.len(), 2);
        let trace = &chart.figure.data[0];
        assert_eq!(trace.mode, Some("markers"));
        assert_eq!(trace.hovertext, Some(vec![Value::Text("Lava".to_string())]));
        let marker = trace.marker.as_ref().unwrap();
        assert_eq!(marker.size, Some(vec![Value::Int(800)]));
        assert_eq!(marker.sizemode, Some("area"));
        assert_eq!(marker.sizeref, Some(2.0 * 800.0 / 400.0));
    }

    #[test]
    fn test_choropleth_unmatched_region_is_left_out() {
        let data = dataset(
            &["State", "Avg_Value"],
            &[&["Goa", "10.5"], &["Foo", "3.0"], &["Assam", "7.25"]],
        );
        let spec = panel(choropleth_kind(), "State", &[], Some("Avg_Value"));
        let chart = PanelRenderer::new().render(&spec, &data, Some(&india())).unwrap();

        let trace = &chart.figure.data[0];
        assert_eq!(trace.trace_type, "choropleth");
        assert_eq!(
            trace.locations,
            Some(vec![Value::Text("Goa".to_string()), Value::Text("Assam".to_string())])
        );
        assert_eq!(trace.z, Some(vec![Value::Float(10.5), Value::Float(7.25)]));
        assert_eq!(trace.featureidkey.as_deref(), Some("properties.ST_NM"));
        assert_eq!(chart.warnings.len(), 1);
        assert!(chart.warnings[0].contains("Foo"));
        assert_eq!(chart.figure.layout.geo.as_ref().unwrap().fitbounds, "locations");
    }

    #[test]
    fn test_choropleth_skips_rows_without_region() {
        let data = dataset(
            &["State", "Avg_Value"],
            &[&["Goa", "10.5"], &["", "4.0"], &["Foo", "3.0"]],
        );
        let spec = panel(choropleth_kind(), "State", &[], Some("Avg_Value"));
        let chart = PanelRenderer::new().render(&spec, &data, Some(&india())).unwrap();

        let trace = &chart.figure.data[0];
        assert_eq!(trace.locations, Some(vec![Value::Text("Goa".to_string())]));
        assert_eq!(chart.warnings, vec!["1 region(s) have no matching geometry: Foo".to_string()]);
    }

    #[test]
    fn test_choropleth_categorical_color() {
        let data = dataset(
            &["State", "Device_Brand"],
            &[&["Goa", "Vivo"], &["Assam", "Xiaomi"]],
        );
        let spec = panel(choropleth_kind(), "State", &[], Some("Device_Brand"));
        let chart = PanelRenderer::new().render(&spec, &data, Some(&india())).unwrap();

        assert_eq!(chart.figure.data.len(), 2);
        assert_eq!(chart.figure.data[0].name.as_deref(), Some("Vivo"));
        assert_eq!(chart.figure.data[0].showscale, Some(false));
        assert!(chart.warnings.is_empty());
    }

    #[test]
    fn test_choropleth_remote_geometry_by_url() {
        let data = dataset(&["State", "Avg_Value"], &[&["Goa", "1.5"]]);
        let geo = GeoSource {
            location: "https://example.com/india.geojson".to_string(),
            feature_id_key: "properties.ST_NM".to_string(),
        };
        let spec = panel(ChartKind::Choropleth { geo }, "State", &[], Some("Avg_Value"));
        let chart = PanelRenderer::new().render(&spec, &data, Some(&india())).unwrap();
        assert_eq!(
            chart.figure.data[0].geojson,
            Some(json!("https://example.com/india.geojson"))
        );
    }

    #[test]
    fn test_choropleth_without_geometry_fails() {
        let data = dataset(&["State", "Avg_Value"], &[&["Goa", "1.5"]]);
        let spec = panel(choropleth_kind(), "State", &[], Some("Avg_Value"));
        let err = PanelRenderer::new().render(&spec, &data, None).unwrap_err();
        assert_eq!(err.kind(), "GeometryUnavailable");
    }

    #[test]
    fn test_empty_dataset_renders() {
        let data = dataset(&["Year", "Total"], &[]);
        let spec = panel(ChartKind::Line { markers: true }, "Year", &["Total"], None);
        let chart = PanelRenderer::new().render(&spec, &data, None).unwrap();
        assert_eq!(chart.figure.data[0].x, Some(Vec::new()));
    }
}
