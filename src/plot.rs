//! Chart descriptions and the renderers that draw them.
//!
//! The rest of the crate only builds `ChartSpec`s; turning them into pixels
//! is the job of a `Render` implementation, so reports can go to SVG files,
//! a test double, or anything else.

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::evaluate::IQR_FENCE;
use crate::stats::{self, Describe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Each series drawn as a polyline.
    Line,
    /// Polyline plus a marker at every point.
    LineWithMarkers,
    /// Horizontal box plot of the `x` values of the first series.
    BoxPlot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Series {
            name: name.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Fixed y range; fitted to the data when `None`.
    pub y_range: Option<(f64, f64)>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        ChartSpec {
            kind,
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            y_range: None,
            series: vec![],
        }
    }

    pub fn labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.x_label = x.into();
        self.y_label = y.into();
        self
    }

    pub fn y_range(mut self, low: f64, high: f64) -> Self {
        self.y_range = Some((low, high));
        self
    }

    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }
}

/// A sink for charts and text reports.
pub trait Render {
    fn render(&mut self, chart: &ChartSpec) -> Result<()>;

    /// Show a block of text, such as a table. Printed to stdout by default.
    fn note(&mut self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

/// The pieces of a Tukey box plot.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme values still within 1.5 IQR of the box.
    pub whiskers: (f64, f64),
    /// Values beyond the whiskers.
    pub fliers: Vec<f64>,
}

impl BoxStats {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Result<BoxStats> {
        let s = stats::sorted(values);
        let d = Describe::of(s.iter().copied())?;
        let iqr = d.q75 - d.q25;
        let (lo_fence, hi_fence) = (d.q25 - IQR_FENCE * iqr, d.q75 + IQR_FENCE * iqr);
        let inside = |v: &&f64| lo_fence <= **v && **v <= hi_fence;
        // The median is always inside the fences, so both exist.
        let lo = s.iter().find(inside).copied().unwrap_or(d.median);
        let hi = s.iter().rev().find(inside).copied().unwrap_or(d.median);
        Ok(BoxStats {
            q1: d.q25,
            median: d.median,
            q3: d.q75,
            whiskers: (lo, hi),
            fliers: s.iter().filter(|v| !inside(v)).copied().collect(),
        })
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> Error {
    Error::Render(err.to_string())
}

/// `(low, high)` covering `values`, widened a little so nothing sits on the
/// frame, and never empty.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Writes every chart to its own numbered SVG file in a directory.
#[derive(Debug)]
pub struct SvgRenderer {
    dir: PathBuf,
    size: (u32, u32),
    written: Vec<PathBuf>,
    quiet: bool,
}

impl SvgRenderer {
    /// Create `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(SvgRenderer {
            dir: dir.as_ref().to_path_buf(),
            size: (1000, 600),
            written: vec![],
            quiet: false,
        })
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    /// Don't echo notes to stdout.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Files written so far, in order.
    pub fn files(&self) -> &[PathBuf] {
        &self.written
    }

    fn next_path(&self, title: &str) -> PathBuf {
        let slug: String = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|w| !w.is_empty())
            .take(6)
            .collect::<Vec<_>>()
            .join("-");
        self.dir.join(format!("{:02}-{slug}.svg", self.written.len() + 1))
    }

    fn draw_lines(&self, path: &Path, chart: &ChartSpec) -> Result<()> {
        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let all_points = || chart.series.iter().flat_map(|s| s.points.iter());
        let (x0, x1) = padded_range(all_points().map(|p| p.0));
        let (y0, y1) = chart
            .y_range
            .unwrap_or_else(|| padded_range(all_points().map(|p| p.1)));

        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(render_err)?;
        ctx.configure_mesh()
            .x_desc(chart.x_label.as_str())
            .y_desc(chart.y_label.as_str())
            .draw()
            .map_err(render_err)?;

        for (i, series) in chart.series.iter().enumerate() {
            let color = if chart.kind == ChartKind::LineWithMarkers {
                BLACK.to_rgba()
            } else {
                Palette99::pick(i).to_rgba()
            };
            ctx.draw_series(LineSeries::new(
                series.points.iter().copied(),
                color.stroke_width(2),
            ))
            .map_err(render_err)?
            .label(series.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

            if chart.kind == ChartKind::LineWithMarkers {
                ctx.draw_series(
                    series
                        .points
                        .iter()
                        .map(|&p| Circle::new(p, 3, RED.filled())),
                )
                .map_err(render_err)?;
            }
        }
        if chart.series.len() > 1 {
            ctx.configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(render_err)?;
        }

        root.present().map_err(render_err)
    }

    fn draw_box(&self, path: &Path, chart: &ChartSpec) -> Result<()> {
        let values: Vec<f64> = chart
            .series
            .first()
            .map(|s| s.points.iter().map(|p| p.0).collect())
            .unwrap_or_default();
        let b = BoxStats::of(values.iter().copied())?;

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let (x0, x1) = padded_range(values.iter().copied());
        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .build_cartesian_2d(x0..x1, 0.0..1.0)
            .map_err(render_err)?;
        ctx.configure_mesh()
            .disable_y_mesh()
            .x_desc(chart.x_label.as_str())
            .draw()
            .map_err(render_err)?;

        let (lo, hi) = b.whiskers;
        let style = BLUE.stroke_width(2);
        ctx.draw_series([Rectangle::new([(b.q1, 0.35), (b.q3, 0.65)], style)])
            .map_err(render_err)?;
        ctx.draw_series([
            PathElement::new(vec![(b.median, 0.35), (b.median, 0.65)], RED.stroke_width(2)),
            PathElement::new(vec![(lo, 0.5), (b.q1, 0.5)], style),
            PathElement::new(vec![(b.q3, 0.5), (hi, 0.5)], style),
            PathElement::new(vec![(lo, 0.42), (lo, 0.58)], style),
            PathElement::new(vec![(hi, 0.42), (hi, 0.58)], style),
        ])
        .map_err(render_err)?;
        ctx.draw_series(
            b.fliers
                .iter()
                .map(|&v| Circle::new((v, 0.5), 4, BLACK.stroke_width(1))),
        )
        .map_err(render_err)?;

        root.present().map_err(render_err)
    }
}

impl Render for SvgRenderer {
    fn render(&mut self, chart: &ChartSpec) -> Result<()> {
        let path = self.next_path(&chart.title);
        match chart.kind {
            ChartKind::Line | ChartKind::LineWithMarkers => self.draw_lines(&path, chart)?,
            ChartKind::BoxPlot => self.draw_box(&path, chart)?,
        }
        self.written.push(path);
        Ok(())
    }

    fn note(&mut self, text: &str) -> Result<()> {
        if !self.quiet {
            println!("{text}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_stats_split_fliers_from_whiskers() {
        let b = BoxStats::of([0.0, 0.0, 0.0, 0.0, 80.0]).unwrap();
        assert_eq!((b.q1, b.median, b.q3), (0.0, 0.0, 0.0));
        assert_eq!(b.whiskers, (0.0, 0.0));
        assert_eq!(b.fliers, vec![80.0]);

        let b = BoxStats::of([1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(b.whiskers, (1.0, 5.0));
        assert!(b.fliers.is_empty());
    }

    #[test]
    fn ranges_are_never_empty() {
        assert_eq!(padded_range([2.0].into_iter()), (1.0, 3.0));
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = padded_range([0.0, 10.0].into_iter());
        assert!(lo < 0.0 && hi > 10.0);
    }
}
