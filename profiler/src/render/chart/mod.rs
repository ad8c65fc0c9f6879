pub mod linear;
pub mod log;
mod svg;

pub use linear::{BarDatum, BarLayout, bar_charts};
pub use log::{GroupedLayout, log_height, timeline_charts};

use common::config::ProfilerConfig;
use serde::Serialize;

pub const MIN_CHART_WIDTH: f64 = 600.0;
pub const DEFAULT_CHART_WIDTH: f64 = 1000.0;
pub const DEFAULT_CHART_HEIGHT: f64 = 320.0;

/// Maps any ratio into [0,1]. NaN becomes 0.
pub fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_CHART_WIDTH, DEFAULT_CHART_HEIGHT)
    }
}

impl ChartGeometry {
    /// `container_width` is widened to at least [`MIN_CHART_WIDTH`].
    pub fn new(container_width: f64, height: f64) -> Self {
        let width = if container_width.is_finite() && container_width > 0.0 {
            container_width.max(MIN_CHART_WIDTH)
        } else {
            DEFAULT_CHART_WIDTH
        };
        Self {
            width,
            height,
            padding: Padding {
                top: 30.0,
                right: 30.0,
                bottom: 110.0,
                left: 60.0,
            },
        }
    }

    pub fn from_config(config: &ProfilerConfig) -> Self {
        Self::new(config.chart_width, config.chart_height)
    }

    pub fn plot_width(&self) -> f64 {
        (self.width - self.padding.left - self.padding.right).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.height - self.padding.top - self.padding.bottom).max(0.0)
    }

    /// y of the x axis.
    pub fn baseline(&self) -> f64 {
        self.padding.top + self.plot_height()
    }
}

/// One rendered chart with an optional caption above it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPage {
    pub caption: Option<String>,
    pub svg: String,
}
