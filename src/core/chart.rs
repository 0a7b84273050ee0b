//! PNG charts for report tables.
//!
//! Whether charts can be drawn is decided once, when the [`ChartCapability`]
//! is resolved at startup: the `charts` feature must be compiled in, charts
//! must be enabled in the configuration, and a TrueType font must be found
//! for captions and labels. Renderers built with an unavailable capability
//! skip every job with a warning instead of failing.

use crate::domain::model::ChartJob;
use crate::utils::error::{EtlError, Result};
#[cfg(feature = "charts")]
use std::path::Path;
use std::path::PathBuf;

#[cfg(feature = "charts")]
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartCapability {
    Available,
    Unavailable(String),
}

impl ChartCapability {
    pub fn detect(enabled: bool, font: Option<&str>) -> Self {
        if !enabled {
            return ChartCapability::Unavailable("disabled by configuration".to_string());
        }
        backend::prepare(font)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ChartCapability::Available)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartOutcome {
    Rendered,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ChartRenderer {
    root: PathBuf,
    capability: ChartCapability,
    panel_size: (u32, u32),
}

impl ChartRenderer {
    pub fn new(root: impl Into<PathBuf>, capability: ChartCapability) -> Self {
        if let ChartCapability::Unavailable(reason) = &capability {
            tracing::warn!("Charts will be skipped: {}", reason);
        }
        Self {
            root: root.into(),
            capability,
            panel_size: (800, 600),
        }
    }

    pub fn disabled() -> Self {
        Self {
            root: PathBuf::from("."),
            capability: ChartCapability::Unavailable("disabled".to_string()),
            panel_size: (800, 600),
        }
    }

    pub fn capability(&self) -> &ChartCapability {
        &self.capability
    }

    /// Renders `job` to `relative_path` under the output root.
    pub fn render(&self, job: &ChartJob, relative_path: &str) -> Result<ChartOutcome> {
        if let ChartCapability::Unavailable(reason) = &self.capability {
            tracing::warn!("Skipping chart {} ({})", relative_path, reason);
            return Ok(ChartOutcome::Skipped);
        }

        check_job(job)?;

        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        backend::draw(&path, job, self.panel_size)?;
        tracing::debug!("Saved chart {}", path.display());
        Ok(ChartOutcome::Rendered)
    }
}

fn check_job(job: &ChartJob) -> Result<()> {
    if job.panels.is_empty() {
        return Err(EtlError::ChartError {
            message: format!("{} has no panels", job.file_name),
        });
    }
    for panel in &job.panels {
        if panel.values.is_empty() || panel.labels.len() != panel.values.len() {
            return Err(EtlError::ChartError {
                message: format!(
                    "'{}' needs one label per value ({} labels, {} values)",
                    panel.title,
                    panel.labels.len(),
                    panel.values.len()
                ),
            });
        }
        if panel.values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(EtlError::ChartError {
                message: format!("'{}' has negative or non-finite values", panel.title),
            });
        }
    }
    Ok(())
}

#[cfg(feature = "charts")]
fn find_font(configured: Option<&str>) -> Option<&Path> {
    match configured {
        Some(path) => Some(Path::new(path)),
        None => FONT_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|path| path.is_file()),
    }
}

#[cfg(feature = "charts")]
mod backend {
    use super::{find_font, ChartCapability};
    use crate::domain::model::{ChartJob, ChartKind, ChartSpec};
    use crate::utils::error::{EtlError, Result};
    use plotters::coord::Shift;
    use plotters::element::{Circle, Polygon, Rectangle, Text};
    use plotters::prelude::*;
    use plotters::style::{register_font, FontStyle};
    use std::f64::consts::{FRAC_PI_2, TAU};
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};

    const PALETTE: [RGBColor; 6] = [
        RGBColor(31, 119, 180),
        RGBColor(255, 127, 14),
        RGBColor(44, 160, 44),
        RGBColor(214, 39, 40),
        RGBColor(148, 103, 189),
        RGBColor(140, 86, 75),
    ];

    const FAMILY: &str = "sans-serif";

    type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

    static FONT: OnceLock<()> = OnceLock::new();
    static REGISTERING: Mutex<()> = Mutex::new(());

    /// Registers the chart font. The first successful registration holds for
    /// the whole process; failures are not remembered.
    pub fn prepare(font: Option<&str>) -> ChartCapability {
        if FONT.get().is_some() {
            return ChartCapability::Available;
        }
        let _guard = match REGISTERING.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if FONT.get().is_some() {
            return ChartCapability::Available;
        }
        match load_font(font) {
            Ok(()) => {
                let _ = FONT.set(());
                ChartCapability::Available
            }
            Err(reason) => ChartCapability::Unavailable(reason),
        }
    }

    fn load_font(font: Option<&str>) -> std::result::Result<(), String> {
        let path = find_font(font).ok_or_else(|| "no TrueType font found".to_string())?;
        let bytes =
            std::fs::read(path).map_err(|e| format!("cannot read font {}: {}", path.display(), e))?;
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        register_font(FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| format!("invalid font {}", path.display()))
    }

    fn chart_err<E: std::fmt::Debug>(e: E) -> EtlError {
        EtlError::ChartError {
            message: format!("{:?}", e),
        }
    }

    pub fn draw(path: &Path, job: &ChartJob, panel_size: (u32, u32)) -> Result<()> {
        let panels = job.panels.len();
        let root = BitMapBackend::new(path, (panel_size.0 * panels as u32, panel_size.1))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        for (area, spec) in root.split_evenly((1, panels)).iter().zip(&job.panels) {
            match spec.kind {
                ChartKind::Bar => draw_bar(area, spec)?,
                ChartKind::Line => draw_line(area, spec)?,
                ChartKind::Pie => draw_pie(area, spec)?,
            }
        }

        root.present().map_err(chart_err)?;
        Ok(())
    }

    fn ceiling(values: &[f64]) -> f64 {
        let max = values.iter().cloned().fold(0.0, f64::max);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }

    fn draw_bar(area: &Area<'_>, spec: &ChartSpec) -> Result<()> {
        let labels = &spec.labels;
        let mut chart = ChartBuilder::on(area)
            .caption(&spec.title, (FAMILY, 22))
            .margin(15)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d((0..labels.len()).into_segmented(), 0f64..ceiling(&spec.values))
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(labels.len())
            .x_label_formatter(&|v: &SegmentValue<usize>| match v {
                SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                    labels.get(*i).cloned().unwrap_or_default()
                }
                SegmentValue::Last => String::new(),
            })
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(spec.values.iter().enumerate().map(|(i, value)| {
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
                    PALETTE[i % PALETTE.len()].filled(),
                );
                bar.set_margin(0, 0, 6, 6);
                bar
            }))
            .map_err(chart_err)?;

        chart
            .draw_series(spec.values.iter().enumerate().map(|(i, value)| {
                Text::new(
                    format_value(*value),
                    (SegmentValue::CenterOf(i), *value),
                    (FAMILY, 13),
                )
            }))
            .map_err(chart_err)?;

        Ok(())
    }

    fn draw_line(area: &Area<'_>, spec: &ChartSpec) -> Result<()> {
        let labels = &spec.labels;
        let last = labels.len().saturating_sub(1).max(1);
        let mut chart = ChartBuilder::on(area)
            .caption(&spec.title, (FAMILY, 22))
            .margin(25)
            .x_label_area_size(70)
            .y_label_area_size(70)
            .build_cartesian_2d(0usize..last, 0f64..ceiling(&spec.values))
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .x_labels(labels.len())
            .x_label_formatter(&|i: &usize| labels.get(*i).cloned().unwrap_or_default())
            .draw()
            .map_err(chart_err)?;

        let color = PALETTE[0];
        chart
            .draw_series(LineSeries::new(
                spec.values.iter().enumerate().map(|(i, v)| (i, *v)),
                color.stroke_width(2),
            ))
            .map_err(chart_err)?;
        chart
            .draw_series(
                spec.values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Circle::new((i, *v), 5, color.filled())),
            )
            .map_err(chart_err)?;
        chart
            .draw_series(
                spec.values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Text::new(format_value(*v), (i, *v), (FAMILY, 13))),
            )
            .map_err(chart_err)?;

        Ok(())
    }

    fn draw_pie(area: &Area<'_>, spec: &ChartSpec) -> Result<()> {
        let area = area.titled(&spec.title, (FAMILY, 22)).map_err(chart_err)?;
        let total: f64 = spec.values.iter().sum();
        if total <= 0.0 {
            return Err(EtlError::ChartError {
                message: format!("'{}' has nothing to divide", spec.title),
            });
        }

        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = f64::from(width.min(height)) * 0.32;
        let point = |angle: f64, r: f64| {
            (
                center.0 + (r * angle.cos()).round() as i32,
                center.1 + (r * angle.sin()).round() as i32,
            )
        };

        let mut start = -FRAC_PI_2;
        for (i, (label, value)) in spec.labels.iter().zip(&spec.values).enumerate() {
            let sweep = value / total * TAU;
            let steps = ((sweep / TAU) * 180.0).ceil().max(2.0) as usize;
            let mut wedge = vec![center];
            wedge.extend((0..=steps).map(|s| point(start + sweep * s as f64 / steps as f64, radius)));
            area.draw(&Polygon::new(wedge, PALETTE[i % PALETTE.len()].filled()))
                .map_err(chart_err)?;

            let middle = start + sweep / 2.0;
            let text = format!("{} {:.1}%", label, value / total * 100.0);
            let anchor = point(middle, radius * 1.12);
            let offset = if middle.cos() < 0.0 { text.len() as i32 * 7 } else { 0 };
            area.draw(&Text::new(text, (anchor.0 - offset, anchor.1), (FAMILY, 14)))
                .map_err(chart_err)?;

            start += sweep;
        }
        Ok(())
    }

    fn format_value(value: f64) -> String {
        if value.fract() == 0.0 {
            format!("{}", value as i64)
        } else {
            format!("{:.2}", value)
        }
    }
}

#[cfg(not(feature = "charts"))]
mod backend {
    use super::ChartCapability;
    use crate::domain::model::ChartJob;
    use crate::utils::error::{EtlError, Result};
    use std::path::Path;

    pub fn prepare(_font: Option<&str>) -> ChartCapability {
        ChartCapability::Unavailable("built without the 'charts' feature".to_string())
    }

    pub fn draw(_path: &Path, _job: &ChartJob, _panel_size: (u32, u32)) -> Result<()> {
        Err(EtlError::ChartUnavailable)
    }
}
