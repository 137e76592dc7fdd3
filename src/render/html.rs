use super::plotly::Figure;
use anyhow::{Context, Result};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON that can sit inside a `<script>` element
fn script_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).context("Failed to serialize figure")?;
    Ok(json.replace("</", "<\\/"))
}

/// Self-contained page that draws the figure with plotly.js
pub fn render_html(figure: &Figure, title: &str) -> Result<String> {
    let data = script_json(&figure.data)?;
    let layout = script_json(&figure.layout)?;
    let config = script_json(&figure.config)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<script src="{cdn}" charset="utf-8"></script>
<style>html, body {{ margin: 0; padding: 0; }} #map {{ margin: 0 auto; }}</style>
</head>
<body>
<div id="map"></div>
<script>
Plotly.newPlot("map", {data}, {layout}, {config});
</script>
</body>
</html>
"#,
        title = escape_html(title),
        cdn = PLOTLY_CDN,
    ))
}
