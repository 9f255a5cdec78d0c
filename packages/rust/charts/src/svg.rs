//! Hand-built SVG documents for the supported chart kinds.

use std::f64::consts::PI;
use std::fmt::Write as _;

use reportgen_shared::ChartRequest;
use sha2::{Digest, Sha256};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const MARGIN: f64 = 50.0;
const TITLE_Y: f64 = 30.0;

const PALETTE: [&str; 6] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948",
];

/// Deterministic placeholder data seeded from the request.
///
/// The same request always draws the same chart.
pub(crate) struct IllustrativeData {
    labels: Vec<String>,
    values: Vec<f64>,
    points: Vec<(f64, f64)>,
}

impl IllustrativeData {
    pub(crate) fn for_request(request: &ChartRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.title.as_bytes());
        if let Some(concept) = &request.data_concept {
            hasher.update(concept.as_bytes());
        }
        let seed = hasher.finalize();

        let values = seed[..5].iter().map(|b| 20.0 + f64::from(*b % 80)).collect();
        let points = seed[5..17]
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                let x = (i + 1) as f64;
                (x, x * 1.5 + f64::from(pair[0] % 6))
            })
            .collect();
        let labels = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|l| format!("Category {l}"))
            .collect();

        Self {
            labels,
            values,
            points,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn open(title: &str) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    svg.push('\n');
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{TITLE_Y}" font-size="18" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );
    svg
}

fn close(mut svg: String) -> String {
    svg.push_str("</svg>\n");
    svg
}

fn axes(svg: &mut String) {
    let bottom = HEIGHT - MARGIN;
    let _ = writeln!(
        svg,
        r##"<line x1="{MARGIN}" y1="{bottom}" x2="{}" y2="{bottom}" stroke="#333"/>"##,
        WIDTH - MARGIN
    );
    let _ = writeln!(
        svg,
        r##"<line x1="{MARGIN}" y1="{}" x2="{MARGIN}" y2="{bottom}" stroke="#333"/>"##,
        MARGIN + 10.0
    );
}

/// Map a value in `0..=max` onto the plot's vertical range.
fn scale_y(value: f64, max: f64) -> f64 {
    let plot_height = HEIGHT - 2.0 * MARGIN - 10.0;
    HEIGHT - MARGIN - (value / max) * plot_height
}

pub(crate) fn bar(title: &str, data: &IllustrativeData) -> String {
    let mut svg = open(title);
    axes(&mut svg);

    let max = data.values.iter().cloned().fold(1.0, f64::max);
    let slot = (WIDTH - 2.0 * MARGIN) / data.values.len() as f64;
    for (i, (label, value)) in data.labels.iter().zip(&data.values).enumerate() {
        let x = MARGIN + i as f64 * slot + slot * 0.15;
        let y = scale_y(*value, max);
        let _ = writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            slot * 0.7,
            HEIGHT - MARGIN - y,
            PALETTE[i % PALETTE.len()]
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
            x + slot * 0.35,
            HEIGHT - MARGIN + 16.0,
            escape(label)
        );
    }

    close(svg)
}

pub(crate) fn line(title: &str, data: &IllustrativeData) -> String {
    let mut svg = open(title);
    axes(&mut svg);

    let max = data.values.iter().cloned().fold(1.0, f64::max);
    let step = (WIDTH - 2.0 * MARGIN) / (data.values.len().max(2) - 1) as f64;
    let points: Vec<String> = data
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{:.1},{:.1}", MARGIN + i as f64 * step, scale_y(*v, max)))
        .collect();
    let _ = writeln!(
        svg,
        r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
        points.join(" "),
        PALETTE[0]
    );
    for (i, year) in (2019..).take(data.values.len()).enumerate() {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{year}</text>"#,
            MARGIN + i as f64 * step,
            HEIGHT - MARGIN + 16.0
        );
    }

    close(svg)
}

pub(crate) fn pie(title: &str, data: &IllustrativeData) -> String {
    let mut svg = open(title);

    let slices = &data.values[..4.min(data.values.len())];
    let total: f64 = slices.iter().sum();
    let (cx, cy, r) = (WIDTH / 2.0, HEIGHT / 2.0 + 15.0, 130.0);

    let mut start = -PI / 2.0;
    for (i, value) in slices.iter().enumerate() {
        let sweep = value / total * 2.0 * PI;
        let end = start + sweep;
        let large = if sweep > PI { 1 } else { 0 };
        let _ = writeln!(
            svg,
            r#"<path d="M {cx:.1} {cy:.1} L {:.1} {:.1} A {r} {r} 0 {large} 1 {:.1} {:.1} Z" fill="{}"/>"#,
            cx + r * start.cos(),
            cy + r * start.sin(),
            cx + r * end.cos(),
            cy + r * end.sin(),
            PALETTE[i % PALETTE.len()]
        );
        let mid = start + sweep / 2.0;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{} ({:.0}%)</text>"#,
            cx + (r + 30.0) * mid.cos(),
            cy + (r + 30.0) * mid.sin(),
            escape(&data.labels[i]),
            value / total * 100.0
        );
        start = end;
    }

    close(svg)
}

pub(crate) fn scatter(title: &str, data: &IllustrativeData) -> String {
    let mut svg = open(title);
    axes(&mut svg);

    let max_x = data.points.iter().map(|p| p.0).fold(1.0, f64::max);
    let max_y = data.points.iter().map(|p| p.1).fold(1.0, f64::max);
    let plot_width = WIDTH - 2.0 * MARGIN - 10.0;
    for (x, y) in &data.points {
        let _ = writeln!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="5" fill="{}"/>"#,
            MARGIN + 10.0 + x / max_x * plot_width,
            scale_y(*y, max_y),
            PALETTE[3]
        );
    }

    close(svg)
}

pub(crate) fn table(title: &str, data: &IllustrativeData) -> String {
    let mut svg = open(title);

    let headers = ["Item", "Value", "Share"];
    let total: f64 = data.values.iter().sum();
    let col_width = (WIDTH - 2.0 * MARGIN) / headers.len() as f64;
    let row_height = 32.0;
    let top = MARGIN + 10.0;

    let mut rows: Vec<[String; 3]> = vec![headers.map(str::to_string)];
    for (label, value) in data.labels.iter().zip(&data.values) {
        rows.push([
            label.clone(),
            format!("{value:.0}"),
            format!("{:.0}%", value / total * 100.0),
        ]);
    }

    for (r, row) in rows.iter().enumerate() {
        let y = top + r as f64 * row_height;
        let fill = if r == 0 { "#dde6f0" } else { "white" };
        for (c, cell) in row.iter().enumerate() {
            let x = MARGIN + c as f64 * col_width;
            let _ = writeln!(
                svg,
                r##"<rect x="{x:.1}" y="{y:.1}" width="{col_width:.1}" height="{row_height}" fill="{fill}" stroke="#999"/>"##
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">{}</text>"#,
                x + col_width / 2.0,
                y + row_height / 2.0 + 5.0,
                escape(cell)
            );
        }
    }

    close(svg)
}
