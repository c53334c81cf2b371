// HTML rendering for the page shell and section fragments
use crate::domain::page::{Page, PanelBody, PanelOutput, SectionOutput};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2933; background: #f7f8fa; }
header { padding: 1rem 2rem; background: #5f259f; color: #fff; }
nav { display: flex; gap: .25rem; padding: 0 2rem; background: #fff; border-bottom: 1px solid #d9dde3; }
nav button { border: 0; background: none; padding: .75rem 1rem; cursor: pointer; font-size: .95rem; }
nav button.active { border-bottom: 3px solid #5f259f; font-weight: 600; }
main { padding: 1rem 2rem; }
.panel { background: #fff; border-radius: 6px; padding: 1rem; margin-bottom: 1.5rem; }
.chart { min-height: 420px; }
.panel-error { border-left: 4px solid #dc2626; padding: .75rem; background: #fef2f2; }
.panel-warning { color: #92400e; font-size: .85rem; }
.insight p { margin: .5rem 0; }
"#;

// Sections are fetched once, on first selection
const SCRIPT: &str = r#"
const loaded = new Set();
async function showSection(id) {
  document.querySelectorAll('nav button').forEach(b => b.classList.toggle('active', b.dataset.section === id));
  let tab = null;
  document.querySelectorAll('.tab').forEach(t => {
    t.hidden = t.dataset.section !== id;
    if (!t.hidden) tab = t;
  });
  if (!tab || loaded.has(id)) return;
  loaded.add(id);
  tab.innerHTML = '<p>Loading…</p>';
  try {
    const res = await fetch('/sections/' + encodeURIComponent(id));
    if (!res.ok) throw new Error(res.status);
    tab.innerHTML = await res.text();
    tab.querySelectorAll('.chart').forEach(el => {
      const fig = JSON.parse(document.getElementById(el.dataset.figure).textContent);
      Plotly.newPlot(el, fig.data, fig.layout, { responsive: true });
    });
  } catch (e) {
    loaded.delete(id);
    tab.innerHTML = '<p class="panel-error">Section could not be loaded (' + e.message + ')</p>';
  }
}
document.querySelectorAll('nav button').forEach(b => b.addEventListener('click', () => showSection(b.dataset.section)));
const first = document.querySelector('nav button');
if (first) showSection(first.dataset.section);
"#;

/// Full page: header, one tab per section and the loader script
pub fn render_page(page: &Page) -> String {
    let mut nav = String::new();
    let mut tabs = String::new();
    for unit in &page.nav {
        let id = html_escape(&unit.id);
        nav.push_str(&format!(
            r#"<button type="button" data-section="{}">{}</button>"#,
            id,
            html_escape(&unit.label)
        ));
        tabs.push_str(&format!(
            r#"<div class="tab" data-section="{}" hidden></div>"#,
            id
        ));
    }
    if page.nav.is_empty() {
        tabs.push_str("<p>No sections are configured.</p>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{page_title}</title>
<script src="{cdn}"></script>
<style>{style}</style>
</head>
<body>
<header><h1>{title}</h1></header>
<nav>{nav}</nav>
<main>{tabs}</main>
<script>{script}</script>
</body>
</html>
"#,
        page_title = html_escape(&page.page_title),
        cdn = PLOTLY_CDN,
        style = STYLE,
        title = html_escape(&page.title),
        nav = nav,
        tabs = tabs,
        script = SCRIPT,
    )
}

/// Fragment for one section. Figures travel as JSON script blocks.
pub fn render_section(section: &SectionOutput) -> Result<String, serde_json::Error> {
    let mut html = format!(
        r#"<section class="report-section" id="section-{}"><h2>{}</h2>"#,
        html_escape(&section.id),
        html_escape(&section.header)
    );
    for panel in &section.panels {
        html.push_str(&render_panel(&section.id, panel)?);
    }
    html.push_str("</section>");
    Ok(html)
}

fn render_panel(section_id: &str, panel: &PanelOutput) -> Result<String, serde_json::Error> {
    let mut html = format!(
        r#"<article class="panel" id="panel-{}"><h3>{}</h3>"#,
        html_escape(&panel.id),
        html_escape(&panel.heading)
    );

    match &panel.body {
        PanelBody::Rendered(chart) => {
            let figure_id = html_escape(&format!("fig-{}-{}", section_id, panel.id));
            let figure = serde_json::to_string(&chart.figure)?;
            html.push_str(&format!(
                r#"<div class="chart" data-figure="{id}"></div><script type="application/json" id="{id}">{json}</script>"#,
                id = figure_id,
                json = script_safe(&figure)
            ));
            for warning in &chart.warnings {
                html.push_str(&format!(
                    r#"<p class="panel-warning">{}</p>"#,
                    html_escape(warning)
                ));
            }
        }
        PanelBody::Failed {
            kind,
            dataset,
            message,
        } => {
            html.push_str(&format!(
                r#"<div class="panel-error"><strong>{}</strong> for dataset <code>{}</code><br>{}</div>"#,
                html_escape(kind),
                html_escape(dataset),
                html_escape(message)
            ));
        }
    }

    if let Some(insight) = &panel.insight {
        html.push_str(&format!(r#"<div class="insight">{}</div>"#, render_caption(insight)));
    }
    html.push_str("</article>");
    Ok(html)
}

/// Caption text: indentation is dropped, blank lines separate paragraphs and
/// `**text**` is bold
pub fn render_caption(text: &str) -> String {
    let mut paragraphs: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if paragraphs.last().is_some_and(|p| !p.is_empty()) {
                paragraphs.push(Vec::new());
            }
        } else if let Some(current) = paragraphs.last_mut() {
            current.push(line);
        }
    }

    paragraphs
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", bold(&html_escape(&p.join(" ")))))
        .collect()
}

fn bold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut parts = text.split("**");
    let mut open = false;
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    let rest: Vec<&str> = parts.collect();
    // An unmatched trailing `**` is kept literally
    let pairs = rest.len() - rest.len() % 2;
    for (i, part) in rest.iter().enumerate() {
        if i >= pairs {
            out.push_str("**");
        } else {
            out.push_str(if open { "</strong>" } else { "<strong>" });
            open = !open;
        }
        out.push_str(part);
    }
    out
}

/// Keep embedded JSON from closing its script element
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
