//! Chart descriptions and the SVG sink that draws them.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{debug, instrument};

use crate::IoError;

/// One horizontal bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Axis label.
    pub label: String,
    /// Signed bar length.
    pub value: f64,
}

/// One row of a beeswarm chart.
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmRow {
    /// Axis label.
    pub label: String,
    /// `(x, colour)` pairs; colour runs from 0.0 (low, blue) to 1.0 (high, red).
    pub points: Vec<(f64, f64)>,
}

/// A chart to render, independent of any output format.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// Annotated count grid, rows top to bottom.
    Heatmap {
        /// Chart title.
        title: String,
        /// Caption under the column labels.
        x_label: String,
        /// Caption over the row labels.
        y_label: String,
        /// One label per row.
        row_labels: Vec<String>,
        /// One label per column.
        col_labels: Vec<String>,
        /// `values[row][col]`.
        values: Vec<Vec<f64>>,
    },
    /// Horizontal bars, first bar at the top.
    Bars {
        /// Chart title.
        title: String,
        /// Caption under the value axis.
        x_label: String,
        /// Bars in display order.
        bars: Vec<Bar>,
    },
    /// Per-row point clouds along a shared x axis, first row at the top.
    Beeswarm {
        /// Chart title.
        title: String,
        /// Caption under the value axis.
        x_label: String,
        /// Rows in display order.
        rows: Vec<SwarmRow>,
    },
    /// Running total from `base`, one step per bar, first step at the top.
    Waterfall {
        /// Chart title.
        title: String,
        /// Caption under the value axis.
        x_label: String,
        /// Starting value.
        base: f64,
        /// Signed steps in display order.
        steps: Vec<Bar>,
    },
}

/// Something that turns a [`Chart`] into an image at a path.
pub trait ReportSink {
    /// Render `chart` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::RenderChart`] when drawing or saving fails.
    fn render(&self, chart: &Chart, path: &Path) -> Result<(), IoError>;
}

/// Renders charts as SVG files.
///
/// Canvas and font sizes scale with `dpi`; 100 dpi gives an 800x600 canvas.
#[derive(Debug, Clone)]
pub struct SvgReportSink {
    scale: f64,
}

impl SvgReportSink {
    /// Create a sink at the given resolution.
    #[must_use]
    pub fn new(dpi: u32) -> Self {
        Self {
            scale: f64::from(dpi.max(25)) / 100.0,
        }
    }

    fn px(&self, v: f64) -> i32 {
        (v * self.scale).round() as i32
    }
}

impl Default for SvgReportSink {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ReportSink for SvgReportSink {
    #[instrument(skip(self, chart), fields(path = %path.display()))]
    fn render(&self, chart: &Chart, path: &Path) -> Result<(), IoError> {
        let result = match chart {
            Chart::Heatmap {
                title,
                x_label,
                y_label,
                row_labels,
                col_labels,
                values,
            } => self.draw_heatmap(path, title, x_label, y_label, row_labels, col_labels, values),
            Chart::Bars {
                title,
                x_label,
                bars,
            } => self.draw_bars(path, title, x_label, bars),
            Chart::Beeswarm {
                title,
                x_label,
                rows,
            } => self.draw_beeswarm(path, title, x_label, rows),
            Chart::Waterfall {
                title,
                x_label,
                base,
                steps,
            } => self.draw_waterfall(path, title, x_label, *base, steps),
        };
        result.map_err(|e| IoError::RenderChart {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("chart written");
        Ok(())
    }
}

type DrawResult = Result<(), Box<dyn Error>>;

/// Pixel rectangle of the plotting region.
#[derive(Debug, Clone, Copy)]
struct Frame {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Frame {
    fn width(self) -> f64 {
        f64::from(self.right - self.left)
    }

    fn height(self) -> f64 {
        f64::from(self.bottom - self.top)
    }
}

/// Linear map from data `[lo, hi]` to pixel `[left, right]`.
#[derive(Debug, Clone, Copy)]
struct XScale {
    lo: f64,
    hi: f64,
    frame: Frame,
}

impl XScale {
    fn new(values: impl Iterator<Item = f64>, frame: Frame) -> Self {
        let (mut lo, mut hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if (hi - lo).abs() < f64::EPSILON {
            lo -= 1.0;
            hi += 1.0;
        }
        let pad = (hi - lo) * 0.05;
        Self {
            lo: lo - pad,
            hi: hi + pad,
            frame,
        }
    }

    fn map(self, v: f64) -> i32 {
        let t = (v - self.lo) / (self.hi - self.lo);
        self.frame.left + (t * self.frame.width()).round() as i32
    }

    fn ticks(self) -> Vec<f64> {
        (0..=4)
            .map(|i| self.lo + (self.hi - self.lo) * f64::from(i) / 4.0)
            .collect()
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
}

/// Blue (low) to red (high), the usual attribution palette.
fn diverging(t: f64) -> RGBColor {
    RGBColor(lerp(0, 255, t), lerp(139, 0, t), lerp(251, 81, t))
}

/// White to dark blue.
fn sequential(t: f64) -> RGBColor {
    RGBColor(lerp(247, 8, t), lerp(251, 48, t), lerp(255, 107, t))
}

fn shorten(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        label.to_string()
    } else {
        let kept: String = label.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

impl SvgReportSink {
    fn font(&self, size: f64, pos: Pos) -> TextStyle<'static> {
        TextStyle::from(("sans-serif", size * self.scale).into_font()).pos(pos)
    }

    fn canvas_header(
        &self,
        root: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
        width: i32,
        title: &str,
    ) -> DrawResult {
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            title.to_string(),
            (width / 2, self.px(28.0)),
            self.font(20.0, Pos::new(HPos::Center, VPos::Center)),
        ))?;
        Ok(())
    }

    fn draw_x_axis(
        &self,
        root: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
        scale: XScale,
        x_label: &str,
    ) -> DrawResult {
        let frame = scale.frame;
        root.draw(&PathElement::new(
            vec![(frame.left, frame.bottom), (frame.right, frame.bottom)],
            BLACK.stroke_width(1),
        ))?;
        for tick in scale.ticks() {
            let x = scale.map(tick);
            root.draw(&PathElement::new(
                vec![(x, frame.bottom), (x, frame.bottom + self.px(5.0))],
                BLACK.stroke_width(1),
            ))?;
            root.draw(&Text::new(
                format!("{tick:.3}"),
                (x, frame.bottom + self.px(16.0)),
                self.font(11.0, Pos::new(HPos::Center, VPos::Center)),
            ))?;
        }
        let zero = scale.map(0.0);
        root.draw(&PathElement::new(
            vec![(zero, frame.top), (zero, frame.bottom)],
            RGBColor(160, 160, 160).stroke_width(1),
        ))?;
        root.draw(&Text::new(
            x_label.to_string(),
            ((frame.left + frame.right) / 2, frame.bottom + self.px(40.0)),
            self.font(13.0, Pos::new(HPos::Center, VPos::Center)),
        ))?;
        Ok(())
    }

    fn row_frame(&self, n_rows: usize) -> (i32, i32, Frame) {
        let width = self.px(800.0);
        let height = self.px(120.0 + 28.0 * n_rows.max(1) as f64);
        let frame = Frame {
            left: self.px(240.0),
            top: self.px(55.0),
            right: width - self.px(40.0),
            bottom: height - self.px(60.0),
        };
        (width, height, frame)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_heatmap(
        &self,
        path: &Path,
        title: &str,
        x_label: &str,
        y_label: &str,
        row_labels: &[String],
        col_labels: &[String],
        values: &[Vec<f64>],
    ) -> DrawResult {
        let (width, height) = (self.px(640.0), self.px(560.0));
        let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
        self.canvas_header(&root, width, title)?;

        let frame = Frame {
            left: self.px(140.0),
            top: self.px(70.0),
            right: width - self.px(40.0),
            bottom: height - self.px(90.0),
        };
        let n_rows = values.len().max(1);
        let n_cols = values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let cell_w = frame.width() / n_cols as f64;
        let cell_h = frame.height() / n_rows as f64;
        let max = values.iter().flatten().copied().fold(0.0f64, f64::max);

        for (r, row) in values.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                let x0 = frame.left + (c as f64 * cell_w) as i32;
                let y0 = frame.top + (r as f64 * cell_h) as i32;
                let x1 = frame.left + ((c + 1) as f64 * cell_w) as i32;
                let y1 = frame.top + ((r + 1) as f64 * cell_h) as i32;
                let t = if max > 0.0 { v / max } else { 0.0 };
                root.draw(&Rectangle::new([(x0, y0), (x1, y1)], sequential(t).filled()))?;
                root.draw(&Rectangle::new([(x0, y0), (x1, y1)], WHITE.stroke_width(1)))?;
                let text_style = self.font(18.0, Pos::new(HPos::Center, VPos::Center));
                let text_style = if t > 0.5 {
                    text_style.color(&WHITE)
                } else {
                    text_style.color(&BLACK)
                };
                root.draw(&Text::new(
                    format!("{v}"),
                    ((x0 + x1) / 2, (y0 + y1) / 2),
                    text_style,
                ))?;
            }
        }

        for (r, label) in row_labels.iter().enumerate() {
            let y = frame.top + ((r as f64 + 0.5) * cell_h) as i32;
            root.draw(&Text::new(
                shorten(label, 16),
                (frame.left - self.px(10.0), y),
                self.font(13.0, Pos::new(HPos::Right, VPos::Center)),
            ))?;
        }
        for (c, label) in col_labels.iter().enumerate() {
            let x = frame.left + ((c as f64 + 0.5) * cell_w) as i32;
            root.draw(&Text::new(
                shorten(label, 16),
                (x, frame.bottom + self.px(18.0)),
                self.font(13.0, Pos::new(HPos::Center, VPos::Center)),
            ))?;
        }
        root.draw(&Text::new(
            x_label.to_string(),
            ((frame.left + frame.right) / 2, frame.bottom + self.px(50.0)),
            self.font(14.0, Pos::new(HPos::Center, VPos::Center)),
        ))?;
        root.draw(&Text::new(
            y_label.to_string(),
            (frame.left - self.px(10.0), frame.top - self.px(14.0)),
            self.font(14.0, Pos::new(HPos::Right, VPos::Center)),
        ))?;

        root.present()?;
        Ok(())
    }

    fn draw_bars(&self, path: &Path, title: &str, x_label: &str, bars: &[Bar]) -> DrawResult {
        let (width, height, frame) = self.row_frame(bars.len());
        let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
        self.canvas_header(&root, width, title)?;

        let scale = XScale::new(bars.iter().map(|b| b.value), frame);
        let row_h = frame.height() / bars.len().max(1) as f64;
        let zero = scale.map(0.0);

        for (i, bar) in bars.iter().enumerate() {
            let y_mid = frame.top + ((i as f64 + 0.5) * row_h) as i32;
            let half = (row_h * 0.35) as i32;
            let end = scale.map(bar.value);
            let color = if bar.value >= 0.0 { diverging(1.0) } else { diverging(0.0) };
            root.draw(&Rectangle::new(
                [(zero.min(end), y_mid - half), (zero.max(end), y_mid + half)],
                color.filled(),
            ))?;
            root.draw(&Text::new(
                shorten(&bar.label, 32),
                (frame.left - self.px(10.0), y_mid),
                self.font(12.0, Pos::new(HPos::Right, VPos::Center)),
            ))?;
            let (anchor, offset) = if bar.value >= 0.0 {
                (HPos::Left, self.px(4.0))
            } else {
                (HPos::Right, -self.px(4.0))
            };
            root.draw(&Text::new(
                format!("{:+.3}", bar.value),
                (end + offset, y_mid),
                self.font(10.0, Pos::new(anchor, VPos::Center)),
            ))?;
        }

        self.draw_x_axis(&root, scale, x_label)?;
        root.present()?;
        Ok(())
    }

    fn draw_waterfall(&self, path: &Path, title: &str, x_label: &str, base: f64, steps: &[Bar]) -> DrawResult {
        let (width, height, frame) = self.row_frame(steps.len());
        let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
        self.canvas_header(&root, width, title)?;

        let ends: Vec<f64> = steps
            .iter()
            .scan(base, |total, step| {
                *total += step.value;
                Some(*total)
            })
            .collect();
        let scale = XScale::new(std::iter::once(base).chain(ends.iter().copied()), frame);
        let row_h = frame.height() / steps.len().max(1) as f64;

        let base_x = scale.map(base);
        root.draw(&PathElement::new(
            vec![(base_x, frame.top), (base_x, frame.bottom)],
            RGBColor(120, 120, 120).stroke_width(1),
        ))?;

        let mut start = base;
        for (i, (step, &end)) in steps.iter().zip(&ends).enumerate() {
            let y_mid = frame.top + ((i as f64 + 0.5) * row_h) as i32;
            let half = (row_h * 0.35) as i32;
            let (x0, x1) = (scale.map(start), scale.map(end));
            let color = if step.value >= 0.0 { diverging(1.0) } else { diverging(0.0) };
            root.draw(&Rectangle::new(
                [(x0.min(x1), y_mid - half), (x0.max(x1).max(x0.min(x1) + 1), y_mid + half)],
                color.filled(),
            ))?;
            root.draw(&Text::new(
                shorten(&step.label, 32),
                (frame.left - self.px(10.0), y_mid),
                self.font(12.0, Pos::new(HPos::Right, VPos::Center)),
            ))?;
            root.draw(&Text::new(
                format!("{:+.3}", step.value),
                (x0.max(x1) + self.px(4.0), y_mid),
                self.font(10.0, Pos::new(HPos::Left, VPos::Center)),
            ))?;
            start = end;
        }

        self.draw_x_axis(&root, scale, x_label)?;
        root.draw(&Text::new(
            format!("E[f(x)] = {base:.3}   f(x) = {start:.3}"),
            (frame.right, frame.top - self.px(12.0)),
            self.font(11.0, Pos::new(HPos::Right, VPos::Center)),
        ))?;
        root.present()?;
        Ok(())
    }

    fn draw_beeswarm(&self, path: &Path, title: &str, x_label: &str, rows: &[SwarmRow]) -> DrawResult {
        let (width, height, frame) = self.row_frame(rows.len());
        let root = SVGBackend::new(path, (width as u32, height as u32)).into_drawing_area();
        self.canvas_header(&root, width, title)?;

        let scale = XScale::new(rows.iter().flat_map(|r| r.points.iter().map(|p| p.0)), frame);
        let row_h = frame.height() / rows.len().max(1) as f64;
        let radius = self.px(2.5).max(1);

        for (i, row) in rows.iter().enumerate() {
            let y_mid = frame.top + ((i as f64 + 0.5) * row_h) as i32;
            root.draw(&Text::new(
                shorten(&row.label, 32),
                (frame.left - self.px(10.0), y_mid),
                self.font(12.0, Pos::new(HPos::Right, VPos::Center)),
            ))?;
            for (j, &(x, colour)) in row.points.iter().enumerate() {
                // Deterministic vertical jitter in [-0.3, 0.3] of the row height.
                let jitter = ((j * 37) % 17) as f64 / 16.0 - 0.5;
                let y = y_mid + (jitter * row_h * 0.6) as i32;
                root.draw(&Circle::new((scale.map(x), y), radius, diverging(colour).filled()))?;
            }
        }

        self.draw_x_axis(&root, scale, x_label)?;
        root.draw(&Text::new(
            "feature value: low (blue) to high (red)".to_string(),
            (frame.right, frame.top - self.px(12.0)),
            self.font(11.0, Pos::new(HPos::Right, VPos::Center)),
        ))?;
        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn heatmap_writes_svg_with_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("confusion_matrix.svg");
        let chart = Chart::Heatmap {
            title: "Confusion Matrix".into(),
            x_label: "Predicted".into(),
            y_label: "Actual".into(),
            row_labels: vec!["0".into(), "1".into()],
            col_labels: vec!["0".into(), "1".into()],
            values: vec![vec![50.0, 3.0], vec![7.0, 40.0]],
        };
        SvgReportSink::default().render(&chart, &path).unwrap();
        let svg = read(&path);
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Confusion Matrix"));
        assert!(svg.lines().any(|l| l.trim() == "50"));
        assert!(svg.lines().any(|l| l.trim() == "7"));
    }

    #[test]
    fn bars_and_beeswarm_write_svg() {
        let dir = TempDir::new().unwrap();
        let bars = Chart::Bars {
            title: "Mean |SHAP|".into(),
            x_label: "mean(|SHAP value|)".into(),
            bars: vec![
                Bar {
                    label: "pay_0".into(),
                    value: 0.12,
                },
                Bar {
                    label: "limit_bal".into(),
                    value: -0.04,
                },
            ],
        };
        let swarm = Chart::Beeswarm {
            title: "SHAP summary".into(),
            x_label: "SHAP value".into(),
            rows: vec![SwarmRow {
                label: "pay_0".into(),
                points: vec![(0.1, 1.0), (-0.2, 0.0), (0.0, 0.5)],
            }],
        };
        let sink = SvgReportSink::new(300);
        sink.render(&bars, &dir.path().join("bar.svg")).unwrap();
        sink.render(&swarm, &dir.path().join("summary.svg")).unwrap();
        assert!(read(&dir.path().join("bar.svg")).contains("limit_bal"));
        assert!(read(&dir.path().join("summary.svg")).contains("<circle"));
    }

    #[test]
    fn waterfall_reports_base_and_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("waterfall.svg");
        let chart = Chart::Waterfall {
            title: "First prediction".into(),
            x_label: "model output".into(),
            base: 0.25,
            steps: vec![
                Bar {
                    label: "pay_0".into(),
                    value: 0.5,
                },
                Bar {
                    label: "limit_bal".into(),
                    value: -0.125,
                },
            ],
        };
        SvgReportSink::default().render(&chart, &path).unwrap();
        let svg = read(&path);
        assert!(svg.contains("E[f(x)] = 0.250"));
        assert!(svg.contains("f(x) = 0.625"));
    }

    #[test]
    fn unwritable_path_is_render_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("chart.svg");
        let chart = Chart::Bars {
            title: "t".into(),
            x_label: "x".into(),
            bars: vec![],
        };
        let err = SvgReportSink::default().render(&chart, &path).unwrap_err();
        assert!(matches!(err, IoError::RenderChart { .. }));
    }

    #[test]
    fn palette_endpoints() {
        assert_eq!(diverging(0.0), RGBColor(0, 139, 251));
        assert_eq!(diverging(1.0), RGBColor(255, 0, 81));
        assert_eq!(shorten("abcdef", 4), "abc…");
    }
}
