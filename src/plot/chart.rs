use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::Line;
use ratatui::widgets::{Axis, Block, Chart, Dataset as ChartSeries, GraphType, LegendPosition, Widget};

use crate::estimate::Estimate;
use crate::plot::Frame;
use crate::store::Dataset;

pub struct FitChart<'a> {
    frame: Frame,
    label: &'a str,
}

impl<'a> FitChart<'a> {
    pub fn new(dataset: &Dataset, estimate: &'a Estimate) -> Self {
        Self {
            frame: Frame::new(dataset, estimate),
            label: &estimate.completion_label,
        }
    }
}

impl Widget for FitChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = &self.frame;
        let legend = format!("Estimated completion time: {}", self.label);

        let samples = ChartSeries::default()
            .name("samples")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(&frame.samples);
        let fit = ChartSeries::default()
            .name(legend)
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&frame.curve);

        let x_labels: Vec<Line> = frame
            .x_ticks(3)
            .into_iter()
            .map(|x| Line::from(frame.time_label(x)))
            .collect();
        let y_labels: Vec<Line> = [0.0, frame.y_max / 2.0, frame.y_max]
            .iter()
            .map(|y| Line::from(format!("{y:.0}")))
            .collect();

        let chart = Chart::new(vec![samples, fit])
            .block(Block::bordered().title(" Files remaining "))
            .legend_position(Some(LegendPosition::TopRight))
            .hidden_legend_constraints((
                ratatui::layout::Constraint::Percentage(100),
                ratatui::layout::Constraint::Percentage(100),
            ))
            .x_axis(
                Axis::default()
                    .title("Time")
                    .labels(x_labels)
                    .bounds([frame.x_min, frame.x_max]),
            )
            .y_axis(
                Axis::default()
                    .labels(y_labels)
                    .bounds([0.0, frame.y_max]),
            );

        chart.render(area, buf);
    }
}

/// Draw the fit into an off-screen buffer and return it as plain text, one
/// line per row with trailing blanks trimmed.
pub fn render_chart(dataset: &Dataset, estimate: &Estimate, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width.max(20), height.max(8));
    let mut buf = Buffer::empty(area);
    FitChart::new(dataset, estimate).render(area, &mut buf);

    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut row = String::new();
        for x in area.left()..area.right() {
            row.push_str(buf[(x, y)].symbol());
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    out
}
