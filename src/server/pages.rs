//! Server-side rendered HTML.

use minijinja::{context, Environment};
use serde::Serialize;

use crate::core::Result;
use crate::pipelines::sentiment::Sentiment;
use crate::reviews::{ChartSlice, ResultSet, ReviewTable, SentimentFilter, SentimentSummary};

pub const PAGE_TITLE: &str = "Customer Review Sentiment Analyzer";

const CHART_SIZE: f64 = 200.0;

const INDEX_TEMPLATE: &str = r##"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: sans-serif; margin: 2rem auto; max-width: 72rem; padding: 0 1rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; font-size: 0.9rem; }
th, td { border: 1px solid #ddd; padding: 0.3rem 0.5rem; text-align: left; vertical-align: top; }
th { background: #f6f6f6; }
.notice { background: #e8f8ef; border-left: 4px solid #2ecc71; padding: 0.6rem 1rem; }
.metrics { display: flex; gap: 2rem; margin: 1rem 0; }
.metric .value { font-size: 2rem; }
.metric .delta { color: #666; }
.legend span { display: inline-block; width: 0.8rem; height: 0.8rem; margin-right: 0.3rem; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
<p>Upload your CSV file to analyze review sentiments</p>

<form action="/upload" method="post" enctype="multipart/form-data">
  <label>Choose CSV file <input type="file" name="file" accept=".csv,text/csv" required></label>
  <button type="submit">Upload</button>
</form>

{% if notice %}<p class="notice">{{ notice }}</p>{% endif %}

{% if preview %}
<h2>Data Preview</h2>
<table>
  <tr>{% for header in preview.headers %}<th>{{ header }}</th>{% endfor %}</tr>
  {% for row in preview.rows %}
  <tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>

{% if preview.text_columns %}
<form id="analyze" action="/analyze" method="post">
  <label>Select review text column:
    <select name="column">
      {% for column in preview.text_columns %}<option value="{{ column }}">{{ column }}</option>{% endfor %}
    </select>
  </label>
  <button type="submit">Analyze Sentiments</button>
  <progress id="progress" value="0" max="1" hidden></progress>
</form>
<script>
document.getElementById("analyze").addEventListener("submit", function () {
  var bar = document.getElementById("progress");
  bar.hidden = false;
  setInterval(function () {
    fetch("/progress").then(function (r) { return r.json(); }).then(function (p) { bar.value = p.fraction; });
  }, 500);
});
</script>
{% endif %}
{% endif %}

{% if results %}
<div class="metrics">
  <div class="metric"><div>Total Reviews</div><div class="value">{{ results.total }}</div></div>
  {% for metric in results.metrics %}
  <div class="metric">
    <div>{{ metric.label }}</div>
    <div class="value">{{ metric.count }}</div>
    <div class="delta">{{ metric.percent }}%</div>
  </div>
  {% endfor %}
</div>

<h2>Sentiment Distribution</h2>
<svg width="{{ chart_size }}" height="{{ chart_size }}" viewBox="0 0 {{ chart_size }} {{ chart_size }}" role="img">
  {% for slice in results.slices %}
  {% if slice.path %}<path d="{{ slice.path }}" fill="{{ slice.color }}"><title>{{ slice.sentiment }}: {{ slice.count }}</title></path>
  {% else %}<circle cx="{{ chart_size / 2 }}" cy="{{ chart_size / 2 }}" r="{{ chart_size / 2 }}" fill="{{ slice.color }}"><title>{{ slice.sentiment }}: {{ slice.count }}</title></circle>{% endif %}
  {% endfor %}
</svg>
<p class="legend">
  {% for slice in results.slices %}<span style="background: {{ slice.color }}"></span>{{ slice.sentiment }} &nbsp; {% endfor %}
</p>

<h2>Results</h2>
<form action="/" method="get">
  <label>Filter by sentiment:
    <select name="sentiment">
      {% for option in results.filters %}<option value="{{ option }}"{% if option == results.selected %} selected{% endif %}>{{ option }}</option>{% endfor %}
    </select>
  </label>
  <button type="submit">Apply</button>
</form>
<table>
  <tr>{% for header in results.headers %}<th>{{ header }}</th>{% endfor %}</tr>
  {% for row in results.rows %}
  <tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
  {% endfor %}
</table>

<h2>Download</h2>
<p><a href="/download">Download Results</a></p>
{% endif %}
</body>
</html>
"##;

#[derive(Debug, Serialize)]
struct PreviewView {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    text_columns: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MetricView {
    label: &'static str,
    count: usize,
    percent: String,
}

#[derive(Debug, Serialize)]
struct ResultsView {
    total: usize,
    metrics: Vec<MetricView>,
    slices: Vec<ChartSlice>,
    filters: Vec<String>,
    selected: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn metric_label(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Positive",
        Sentiment::Negative => "Negative",
        Sentiment::Neutral => "Neutral",
    }
}

fn preview_view(table: &ReviewTable, rows: usize) -> PreviewView {
    PreviewView {
        headers: table.headers().to_vec(),
        rows: table.head(rows).iter().map(|r| r.cells().to_vec()).collect(),
        text_columns: table.text_columns().into_iter().map(str::to_string).collect(),
    }
}

fn results_view(results: &ResultSet, filter: SentimentFilter) -> ResultsView {
    let summary = SentimentSummary::from_results(results);
    let metrics = Sentiment::ALL
        .iter()
        .map(|&s| MetricView {
            label: metric_label(s),
            count: summary.count(s),
            percent: format!("{:.1}", summary.percentage(s)),
        })
        .collect();

    let filters = std::iter::once(SentimentFilter::All)
        .chain(results.sentiments_present().into_iter().map(SentimentFilter::Only))
        .map(|f| f.to_string())
        .collect();

    ResultsView {
        total: summary.total,
        metrics,
        slices: summary.chart_slices(CHART_SIZE),
        filters,
        selected: filter.to_string(),
        headers: results.output_headers(),
        rows: results.filter(filter).map(|r| results.output_row(r)).collect(),
    }
}

/// Compiled page templates.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn index(
        &self,
        notice: Option<&str>,
        table: Option<&ReviewTable>,
        results: Option<&ResultSet>,
        filter: SentimentFilter,
        preview_rows: usize,
    ) -> Result<String> {
        let template = self.env.get_template("index.html")?;
        let html = template.render(context! {
            title => PAGE_TITLE,
            chart_size => CHART_SIZE,
            notice => notice,
            preview => table.map(|t| preview_view(t, preview_rows)),
            results => results.map(|r| results_view(r, filter)),
        })?;
        Ok(html)
    }
}
