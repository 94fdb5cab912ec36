//! Chart Plotter Module
//! Drawing primitives shared by every chart: palette, axes ranges and the
//! line / bar / pie / heatmap / box layouts, all on plotters' bitmap backend.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Nothing to plot for {0}")]
    NoData(&'static str),
    #[error("Failed to render chart: {0}")]
    Render(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Render(err.to_string())
    }
}

pub const WIDE: (u32, u32) = (1500, 675);
pub const SQUARE: (u32, u32) = (900, 900);
pub const HEATMAP: (u32, u32) = (1800, 900);

const FONT: &str = "sans-serif";

pub const LINE_COLOR: RGBColor = RGBColor(52, 152, 219); // Blue
pub const SECONDARY_COLOR: RGBColor = RGBColor(243, 156, 18); // Orange
pub const RULE_COLOR: RGBColor = RGBColor(150, 150, 150);

pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

/// One series of a line chart.
pub struct LineSpec<'a> {
    pub label: &'a str,
    pub values: &'a [f64],
    pub color: RGBColor,
}

/// Box-plot figures for one category.
pub struct BoxSpec {
    pub label: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

/// Min/max of `values` widened by 10% so markers are not clipped.
pub fn padded_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let span = if max > min { max - min } else { max.abs().max(1.0) };
    (min - span * 0.1, max + span * 0.1)
}

/// Label for an integer tick; empty for fractional ticks or out-of-range.
fn tick_label(labels: &[String], position: f64) -> String {
    let rounded = position.round();
    if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

fn canvas(
    path: &Path,
    size: (u32, u32),
) -> Result<DrawingArea<BitMapBackend<'_>, Shift>, ChartError> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    Ok(root)
}

/// Monthly line chart; an optional second series goes on a right-hand axis.
pub fn line_chart(
    path: &Path,
    title: &str,
    x_labels: &[String],
    primary: LineSpec<'_>,
    secondary: Option<LineSpec<'_>>,
    zero_rule: bool,
) -> Result<(), ChartError> {
    if primary.values.is_empty() {
        return Err(ChartError::NoData("line chart"));
    }

    let root = canvas(path, WIDE)?;
    let x_range = -0.5f64..(x_labels.len() as f64 - 0.5);
    let (y_min, y_max) = padded_range(
        primary
            .values
            .iter()
            .copied()
            .chain(zero_rule.then_some(0.0)),
    );
    let (y2_min, y2_max) = padded_range(
        secondary
            .as_ref()
            .map(|s| s.values.to_vec())
            .unwrap_or_default(),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .right_y_label_area_size(if secondary.is_some() { 80 } else { 0 })
        .build_cartesian_2d(x_range.clone(), y_min..y_max)?
        .set_secondary_coord(x_range, y2_min..y2_max);

    let tick_count = x_labels.len().clamp(1, 24);
    chart
        .configure_mesh()
        .x_labels(tick_count)
        .x_label_formatter(&|x: &f64| tick_label(x_labels, *x))
        .x_desc("Month")
        .y_desc(primary.label)
        .draw()?;

    if zero_rule {
        let end = x_labels.len() as f64 - 0.5;
        chart.draw_series(LineSeries::new(vec![(-0.5, 0.0), (end, 0.0)], &RULE_COLOR))?;
    }

    let color = primary.color;
    chart
        .draw_series(LineSeries::new(
            primary.values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            color.stroke_width(2),
        ))?
        .label(primary.label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    chart.draw_series(
        primary
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| Circle::new((i as f64, *v), 4, color.filled())),
    )?;

    if let Some(secondary) = secondary {
        let color = secondary.color;
        chart.configure_secondary_axes().y_desc(secondary.label).draw()?;
        chart
            .draw_secondary_series(LineSeries::new(
                secondary.values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                color.stroke_width(2),
            ))?
            .label(secondary.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Horizontal bars, first entry on top.
pub fn horizontal_bar_chart(
    path: &Path,
    title: &str,
    x_desc: &str,
    bars: &[(String, f64)],
    palette_offset: usize,
) -> Result<(), ChartError> {
    if bars.is_empty() {
        return Err(ChartError::NoData("bar chart"));
    }

    let root = canvas(path, WIDE)?;
    let n = bars.len();
    let x_max = bars.iter().map(|(_, v)| *v).fold(0.0f64, f64::max).max(1.0) * 1.1;
    // Row i is drawn at y = n-1-i so the largest bar sits on top.
    let labels: Vec<String> = bars.iter().rev().map(|(label, _)| label.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(260)
        .build_cartesian_2d(0f64..x_max, -0.5f64..(n as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y: &f64| tick_label(&labels, *y))
        .x_desc(x_desc)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let y = (n - 1 - i) as f64;
        let color = PALETTE[(i + palette_offset) % PALETTE.len()];
        Rectangle::new([(0.0, y - 0.35), (*value, y + 0.35)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Pie chart of percentage slices, starting at 12 o'clock, clockwise.
pub fn pie_chart(path: &Path, title: &str, slices: &[(String, f64)]) -> Result<(), ChartError> {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Err(ChartError::NoData("pie chart"));
    }

    let root = canvas(path, SQUARE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(30)
        .build_cartesian_2d(-1.4f64..1.4f64, -1.4f64..1.4f64)?;

    let mut start = PI / 2.0;
    for (i, (label, value)) in slices.iter().enumerate() {
        let sweep = value.max(0.0) / total * 2.0 * PI;
        let end = start - sweep;
        let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;

        let mut wedge = vec![(0.0, 0.0)];
        wedge.extend((0..=steps).map(|s| {
            let angle = start - sweep * s as f64 / steps as f64;
            (angle.cos(), angle.sin())
        }));
        let color = PALETTE[i % PALETTE.len()];
        chart.draw_series(std::iter::once(Polygon::new(wedge, color.filled())))?;

        let mid = (start + end) / 2.0;
        let text = format!("{} {:.1}%", label, value);
        let anchor = (mid.cos() * 1.12 - 0.15, mid.sin() * 1.12 + 0.04);
        chart.draw_series(std::iter::once(Text::new(text, anchor, (FONT, 18).into_font())))?;

        start = end;
    }

    root.present()?;
    Ok(())
}

/// Cell-value heatmap (percentages), rows top to bottom.
pub fn heatmap(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    row_labels: &[String],
    column_labels: &[String],
    cells: &[Vec<f64>],
) -> Result<(), ChartError> {
    let columns = column_labels.len();
    if row_labels.is_empty() || columns == 0 {
        return Err(ChartError::NoData("heatmap"));
    }

    let root = canvas(path, HEATMAP)?;
    let rows = row_labels.len();
    let reversed: Vec<String> = row_labels.iter().rev().cloned().collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(120)
        .build_cartesian_2d(-0.5f64..(columns as f64 - 0.5), -0.5f64..(rows as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(columns.min(40))
        .y_labels(rows.min(40))
        .x_label_formatter(&|x: &f64| tick_label(column_labels, *x))
        .y_label_formatter(&|y: &f64| tick_label(&reversed, *y))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    let annotate = rows <= 30 && columns <= 30;
    for (r, row) in cells.iter().enumerate() {
        let y = (rows - 1 - r) as f64;
        for (c, value) in row.iter().enumerate() {
            let x = c as f64;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                heat_color(*value).filled(),
            )))?;
            if annotate {
                let ink = if *value > 55.0 { WHITE } else { BLACK };
                chart.draw_series(std::iter::once(Text::new(
                    format!("{value:.1}"),
                    (x - 0.3, y + 0.15),
                    (FONT, 13).into_font().color(&ink),
                )))?;
            }
        }
    }

    root.present()?;
    Ok(())
}

/// Yellow -> green -> blue ramp over 0..=100.
fn heat_color(percent: f64) -> RGBColor {
    let t = (percent / 100.0).clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8, t: f64| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    if t < 0.5 {
        let t = t * 2.0;
        RGBColor(lerp(255, 65, t), lerp(255, 182, t), lerp(217, 196, t))
    } else {
        let t = (t - 0.5) * 2.0;
        RGBColor(lerp(65, 8, t), lerp(182, 29, t), lerp(196, 88, t))
    }
}

/// Vertical box plots, one per category.
pub fn box_plot(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    boxes: &[BoxSpec],
) -> Result<(), ChartError> {
    if boxes.is_empty() {
        return Err(ChartError::NoData("box plot"));
    }

    let root = canvas(path, WIDE)?;
    let labels: Vec<String> = boxes.iter().map(|b| b.label.clone()).collect();
    let (y_min, y_max) = padded_range(boxes.iter().flat_map(|b| {
        [b.whisker_low, b.whisker_high]
            .into_iter()
            .chain(b.outliers.iter().copied())
    }));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..(boxes.len() as f64 - 0.5), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(boxes.len())
        .x_label_formatter(&|x: &f64| tick_label(&labels, *x))
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    for (i, spec) in boxes.iter().enumerate() {
        let x = i as f64;
        let color = PALETTE[i % PALETTE.len()];

        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.3, spec.q1), (x + 0.3, spec.q3)],
            color.mix(0.35).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.3, spec.q1), (x + 0.3, spec.q3)],
            color.stroke_width(2),
        )))?;

        let segments = [
            vec![(x - 0.3, spec.median), (x + 0.3, spec.median)],
            vec![(x, spec.q3), (x, spec.whisker_high)],
            vec![(x, spec.q1), (x, spec.whisker_low)],
            vec![(x - 0.15, spec.whisker_high), (x + 0.15, spec.whisker_high)],
            vec![(x - 0.15, spec.whisker_low), (x + 0.15, spec.whisker_low)],
        ];
        chart.draw_series(
            segments
                .into_iter()
                .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
        )?;

        chart.draw_series(
            spec.outliers
                .iter()
                .map(|v| Circle::new((x, *v), 3, color.mix(0.6).filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_handles_flat_and_empty_series() {
        assert_eq!(padded_range(Vec::<f64>::new()), (0.0, 1.0));
        let (lo, hi) = padded_range(vec![5.0, 5.0]);
        assert!(lo < 5.0 && hi > 5.0);
        let (lo, hi) = padded_range(vec![0.0, 10.0, f64::NAN]);
        assert_eq!((lo, hi), (-1.0, 11.0));
    }

    #[test]
    fn tick_labels_only_on_integer_positions() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(tick_label(&labels, 1.0), "b");
        assert_eq!(tick_label(&labels, 0.5), "");
        assert_eq!(tick_label(&labels, 2.0), "");
        assert_eq!(tick_label(&labels, -1.0), "");
    }

    #[test]
    fn heat_ramp_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(255, 255, 217));
        assert_eq!(heat_color(100.0), RGBColor(8, 29, 88));
        assert_eq!(heat_color(250.0), heat_color(100.0));
    }
}
