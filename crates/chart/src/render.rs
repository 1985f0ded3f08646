//! Vega-Lite rendering of price series.
//!
//! Series are melted into long rows (`date`, label, `price`) and plotted as
//! lines. Clicking a legend entry highlights that series; the rest fade.

use chrono::{NaiveDate, NaiveDateTime};
use lotscout_core::Result;
use serde_json::{json, Map, Value};
use std::path::Path;

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
const SELECTION: &str = "legend_select";

/// One labelled line.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    /// Values aligned with the chart's dates.
    pub values: Vec<Option<f64>>,
}

/// Everything needed to render a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: Option<String>,
    /// Name of the field holding series labels (e.g. "name", "set").
    pub color_field: String,
    pub dates: Vec<NaiveDate>,
    pub series: Vec<ChartSeries>,
    /// Width in px; height is a third of it.
    pub width: u32,
    pub log10: bool,
    /// Approximate number of labelled x-axis ticks.
    pub tick_count: usize,
}

impl ChartSpec {
    /// Long-format rows, skipping absent values.
    pub fn long_rows(&self) -> Vec<Value> {
        let mut rows = Vec::new();
        for series in &self.series {
            for (date, value) in self.dates.iter().zip(&series.values) {
                if let Some(price) = value {
                    let mut row = Map::new();
                    row.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
                    row.insert(self.color_field.clone(), json!(series.label));
                    row.insert("price".to_string(), json!(price));
                    rows.push(Value::Object(row));
                }
            }
        }
        rows
    }

    /// Dates labelled on the x axis, evenly spaced.
    pub fn axis_ticks(&self) -> Vec<String> {
        let step = (self.dates.len() / self.tick_count.max(1)).max(1);
        self.dates
            .iter()
            .step_by(step)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect()
    }

    /// Vega-Lite chart specification.
    pub fn to_vega_lite(&self) -> Value {
        let mut y = json!({
            "field": "price",
            "type": "quantitative",
            "axis": { "orient": "right" },
        });
        if self.log10 {
            y["scale"] = json!({ "type": "log", "base": 10 });
        }

        let mut chart = json!({
            "$schema": SCHEMA,
            "width": self.width,
            "height": self.width / 3,
            "data": { "values": self.long_rows() },
            "mark": "line",
            "params": [{
                "name": SELECTION,
                "select": { "type": "point", "fields": [self.color_field] },
                "bind": "legend",
            }],
            "encoding": {
                "x": {
                    "field": "date",
                    "type": "nominal",
                    "axis": { "values": self.axis_ticks() },
                },
                "y": y,
                "color": {
                    "field": self.color_field,
                    "type": "nominal",
                    "legend": { "symbolLimit": self.series.len() + 1 },
                },
                "opacity": {
                    "condition": { "param": SELECTION, "value": 1 },
                    "value": 0.1,
                },
            },
        });
        if let Some(title) = &self.title {
            chart["title"] = json!(title);
        }
        chart
    }
}

/// Standalone HTML page embedding the chart.
pub fn render_html(spec: &ChartSpec) -> Result<String> {
    // "</" inside an inline script would end it early.
    let chart = serde_json::to_string(&spec.to_vega_lite())?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script type="text/javascript">
    vegaEmbed('#vis', {chart}).catch(console.error);
  </script>
</body>
</html>
"#
    ))
}

/// Render and write a chart, creating parent directories.
pub fn write_html(path: impl AsRef<Path>, spec: &ChartSpec) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_html(spec)?)?;
    Ok(())
}

/// `<input stem>_pricehistory_plot.html` for a watchlist chart.
pub fn watchlist_plot_file_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "watchlist".to_string());
    format!("{}_pricehistory_plot.html", stem)
}

/// `pricehistory_plot_sum_<timestamp>.html` for a set-totals chart.
pub fn set_totals_file_name(now: NaiveDateTime) -> String {
    format!("pricehistory_plot_sum_{}.html", now.format("%Y%m%d_%H%M%S"))
}
