use super::{ChartGeometry, ChartPage, clamp_percentage, svg};
use crate::models::{DistributionResult, TimelinePoint, bucket_label};
use std::collections::{BTreeMap, BTreeSet};

pub const GROUP_BAR_WIDTH: f64 = 14.0;
pub const GROUP_GAP: f64 = 24.0;

const PALETTE: [&str; 8] = [
    "#4c9ffe", "#f5a623", "#50c878", "#e85d75", "#9b6dff", "#2bbbad", "#ff8a5c", "#7f8c9d",
];

/// `ln(count + 1) / ln(max_count + 1)` of the plot height; 0 when `max_count`
/// is 0. Strictly increasing in `count` up to `max_count`.
pub fn log_height(count: u64, max_count: u64, plot_height: f64) -> f64 {
    if max_count == 0 {
        return 0.0;
    }
    let ratio = (count as f64 + 1.0).ln() / (max_count as f64 + 1.0).ln();
    ratio.min(1.0) * plot_height
}

pub fn period_label(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedBar {
    pub period: usize,
    pub category: usize,
    pub count: u64,
    pub percentage: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedLayout {
    /// Widened so every group fits.
    pub geometry: ChartGeometry,
    pub max_count: u64,
    /// Chronological `(year, month)`.
    pub periods: Vec<(i32, u32)>,
    pub group_centers: Vec<f64>,
    pub legend: Vec<LegendItem>,
    pub bars: Vec<GroupedBar>,
}

/// Category order: `preferred` first, then the remaining values in order of
/// first appearance.
fn categories(points: &[TimelinePoint], preferred: &[&str]) -> Vec<String> {
    let present: BTreeSet<&str> = points.iter().map(|p| bucket_label(p.value.as_deref())).collect();
    let mut ordered: Vec<String> = Vec::new();
    let candidates = preferred
        .iter()
        .copied()
        .chain(points.iter().map(|p| bucket_label(p.value.as_deref())));
    for label in candidates {
        if present.contains(label) && !ordered.iter().any(|c| c == label) {
            ordered.push(label.to_string());
        }
    }
    ordered
}

/// Lays out one bar per (period, category). Counts of repeated points add up.
/// `None` when there is nothing to plot.
pub fn layout_timeline(
    points: &[TimelinePoint],
    preferred: &[&str],
    geometry: ChartGeometry,
) -> Option<GroupedLayout> {
    if points.is_empty() {
        return None;
    }

    let categories = categories(points, preferred);
    let periods: Vec<(i32, u32)> = points
        .iter()
        .map(|p| (p.year, p.month))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells: BTreeMap<(usize, usize), (u64, f64)> = BTreeMap::new();
    for point in points {
        let label = bucket_label(point.value.as_deref());
        let (Ok(period), Some(category)) = (
            periods.binary_search(&(point.year, point.month)),
            categories.iter().position(|c| c == label),
        ) else {
            continue;
        };
        let cell = cells.entry((period, category)).or_insert((0, 0.0));
        cell.0 += point.count;
        cell.1 = clamp_percentage(cell.1 + clamp_percentage(point.percentage));
    }
    let max_count = cells.values().map(|(count, _)| *count).max().unwrap_or(0);

    let group_width = categories.len() as f64 * GROUP_BAR_WIDTH;
    let stride = group_width + GROUP_GAP;
    let needed = geometry.padding.left + geometry.padding.right + periods.len() as f64 * stride;
    let geometry = ChartGeometry {
        width: geometry.width.max(needed),
        ..geometry
    };
    let plot_height = geometry.plot_height();
    let group_start = |period: usize| geometry.padding.left + GROUP_GAP / 2.0 + period as f64 * stride;

    let bars = cells
        .iter()
        .map(|(&(period, category), &(count, percentage))| {
            let height = log_height(count, max_count, plot_height);
            GroupedBar {
                period,
                category,
                count,
                percentage,
                x: group_start(period) + category as f64 * GROUP_BAR_WIDTH,
                y: geometry.baseline() - height,
                width: GROUP_BAR_WIDTH,
                height,
            }
        })
        .collect();

    let legend = categories
        .into_iter()
        .enumerate()
        .map(|(index, label)| LegendItem {
            label,
            color: PALETTE[index % PALETTE.len()],
        })
        .collect();

    Some(GroupedLayout {
        group_centers: (0..periods.len())
            .map(|p| group_start(p) + group_width / 2.0)
            .collect(),
        geometry,
        max_count,
        periods,
        legend,
        bars,
    })
}

/// One grouped chart per distribution result that carries a timeline.
pub fn timeline_charts(results: &[DistributionResult], geometry: ChartGeometry) -> Vec<ChartPage> {
    results
        .iter()
        .filter_map(|result| {
            let points = result.timeline.as_deref()?;
            let preferred: Vec<&str> = result
                .rows
                .iter()
                .map(|row| bucket_label(row.value.as_deref()))
                .collect();
            let layout = layout_timeline(points, &preferred, geometry)?;
            Some(ChartPage {
                caption: Some(format!("{} / {}", result.entity_label, result.field_label)),
                svg: svg::grouped_chart(&layout),
            })
        })
        .collect()
}
