//! Single-page PDF rendering of a fit: raw samples as dots, the fitted curve
//! as a dashed red line, time labels along the bottom.

use std::fmt::Write;

use crate::estimate::Estimate;
use crate::plot::Frame;
use crate::store::Dataset;

// 12 x 8 inches at 72 points per inch.
const PAGE_W: f64 = 864.0;
const PAGE_H: f64 = 576.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 80.0;
const LABEL_SIZE: f64 = 16.0;
const TICK_SIZE: f64 = 14.0;

/// Content-stream builder. Coordinates are PDF points, origin bottom-left.
#[derive(Default)]
struct Canvas {
    ops: String,
}

impl Canvas {
    fn op(&mut self, args: std::fmt::Arguments<'_>) {
        let _ = self.ops.write_fmt(args);
        self.ops.push('\n');
    }

    fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.op(format_args!("{x0:.2} {y0:.2} m {x1:.2} {y1:.2} l S"));
    }

    fn polyline(&mut self, points: &[(f64, f64)]) {
        let Some(((x0, y0), rest)) = points.split_first() else {
            return;
        };
        let mut path = format!("{x0:.2} {y0:.2} m");
        for (x, y) in rest {
            let _ = write!(path, " {x:.2} {y:.2} l");
        }
        path.push_str(" S");
        self.op(format_args!("{path}"));
    }

    /// Filled circle from four Bézier arcs.
    fn dot(&mut self, cx: f64, cy: f64, r: f64) {
        let k = 0.5523 * r;
        self.op(format_args!(
            "{:.2} {:.2} m {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c \
             {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c {:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c f",
            cx + r, cy,
            cx + r, cy + k, cx + k, cy + r, cx, cy + r,
            cx - k, cy + r, cx - r, cy + k, cx - r, cy,
            cx - r, cy - k, cx - k, cy - r, cx, cy - r,
            cx + k, cy - r, cx + r, cy - k, cx + r, cy,
        ));
    }

    fn text(&mut self, x: f64, y: f64, size: f64, s: &str) {
        self.op(format_args!(
            "BT /F1 {size:.1} Tf {x:.2} {y:.2} Td ({}) Tj ET",
            escape(s)
        ));
    }

    /// Text rotated a quarter turn counter-clockwise, for the y-axis label.
    fn text_vertical(&mut self, x: f64, y: f64, size: f64, s: &str) {
        self.op(format_args!(
            "BT /F1 {size:.1} Tf 0 1 -1 0 {x:.2} {y:.2} Tm ({}) Tj ET",
            escape(s)
        ));
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(ch);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Rough Helvetica advance width, good enough for centring labels.
fn text_width(s: &str, size: f64) -> f64 {
    s.chars().count() as f64 * size * 0.55
}

pub fn render(dataset: &Dataset, estimate: &Estimate) -> Vec<u8> {
    let frame = Frame::new(dataset, estimate);
    let plot_w = PAGE_W - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = PAGE_H - MARGIN_TOP - MARGIN_BOTTOM;
    let px = |x: f64| MARGIN_LEFT + (x - frame.x_min) / (frame.x_max - frame.x_min) * plot_w;
    let py = |y: f64| MARGIN_BOTTOM + y / frame.y_max * plot_h;

    let mut c = Canvas::default();
    c.op(format_args!("0 0 0 RG 0 0 0 rg 1 w"));
    c.op(format_args!(
        "{MARGIN_LEFT:.2} {MARGIN_BOTTOM:.2} {plot_w:.2} {plot_h:.2} re S"
    ));

    for x in frame.x_ticks(6) {
        let sx = px(x);
        c.line(sx, MARGIN_BOTTOM, sx, MARGIN_BOTTOM - 5.0);
        let label = frame.time_label(x);
        c.text(
            sx - text_width(&label, TICK_SIZE) / 2.0,
            MARGIN_BOTTOM - 22.0,
            TICK_SIZE,
            &label,
        );
    }
    for y in frame.y_ticks(5) {
        let sy = py(y);
        c.line(MARGIN_LEFT, sy, MARGIN_LEFT - 5.0, sy);
        let label = format!("{y}");
        c.text(
            MARGIN_LEFT - 10.0 - text_width(&label, TICK_SIZE),
            sy - TICK_SIZE / 3.0,
            TICK_SIZE,
            &label,
        );
    }
    c.text(
        MARGIN_LEFT + plot_w / 2.0 - text_width("Time", LABEL_SIZE) / 2.0,
        MARGIN_BOTTOM - 52.0,
        LABEL_SIZE,
        "Time",
    );
    c.text_vertical(
        28.0,
        MARGIN_BOTTOM + plot_h / 2.0 - text_width("Files remaining", LABEL_SIZE) / 2.0,
        LABEL_SIZE,
        "Files remaining",
    );

    // Everything data-driven is clipped to the plot area.
    c.op(format_args!(
        "q {MARGIN_LEFT:.2} {MARGIN_BOTTOM:.2} {plot_w:.2} {plot_h:.2} re W n"
    ));
    c.op(format_args!("q 1 0 0 RG 2 w [8 5] 0 d"));
    let curve: Vec<(f64, f64)> = frame.curve.iter().map(|&(x, y)| (px(x), py(y))).collect();
    c.polyline(&curve);
    c.op(format_args!("Q"));
    c.op(format_args!("0.12 0.47 0.71 rg"));
    for &(x, y) in &frame.samples {
        c.dot(px(x), py(y), 4.0);
    }
    c.op(format_args!("Q"));

    let legend = format!("Estimated completion time: {}", estimate.completion_label);
    let legend_x = MARGIN_LEFT + plot_w - text_width(&legend, LABEL_SIZE) - 50.0;
    let legend_y = MARGIN_BOTTOM + plot_h - 28.0;
    c.op(format_args!("q 1 0 0 RG 2 w [8 5] 0 d"));
    c.line(legend_x, legend_y + 5.0, legend_x + 36.0, legend_y + 5.0);
    c.op(format_args!("Q"));
    c.text(legend_x + 44.0, legend_y, LABEL_SIZE, &legend);

    document(&c.ops)
}

/// Wrap a content stream in a minimal one-page document with Helvetica.
fn document(content: &str) -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_W} {PAGE_H}] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
        ),
        format!(
            "<< /Length {} >>\nstream\n{content}endstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = write!(out, "{} 0 obj\n{body}\nendobj\n", i + 1);
    }
    let xref_at = out.len();
    let _ = writeln!(out, "xref\n0 {}", objects.len() + 1);
    out.push_str("0000000000 65535 f \n");
    for off in offsets {
        let _ = writeln!(out, "{off:010} 00000 n ");
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.into_bytes()
}
