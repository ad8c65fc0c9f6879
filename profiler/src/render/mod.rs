pub mod chart;
pub mod sort;
pub mod table;
pub mod view;

pub use chart::{ChartGeometry, ChartPage};
pub use sort::{SortDirection, SortKey, SortState};
pub use table::TableRow;
pub use view::{ReportView, ViewState};

use crate::report::{Report, ReportMode, ReportResults};
use serde::Serialize;

pub const REPORT_READY: &str = "Report ready.";

/// Everything needed to display a report, already sorted and formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedReport {
    pub report_id: String,
    pub mode: ReportMode,
    pub generated: String,
    pub status: String,
    pub sort_key: Option<SortKey>,
    pub sort_direction: SortDirection,
    pub rows: Vec<TableRow>,
    pub charts: Vec<ChartPage>,
    /// Terminal rendering of `rows`, plus per-value tables in distribution mode.
    #[serde(skip)]
    pub text: String,
}

/// Sorts and materializes a report's rows. Charts and per-value tables follow
/// run order and do not move with the table sort. Distribution reports get
/// the grouped timeline charts and never the fill-rate bar chart.
pub fn render_report(
    report: &Report,
    sort: SortState,
    page_size: usize,
    geometry: ChartGeometry,
) -> RenderedReport {
    let sorted = sort.apply(report.results());
    let rows = table::materialize(&sorted);
    let mut text = table::render_table(&rows);

    let charts = match report.results() {
        ReportResults::Summary(entries) => chart::bar_charts(entries, page_size, geometry),
        ReportResults::Distribution(results) => {
            for result in results {
                text.push_str(&format!(
                    "\n{} / {}\n{}",
                    result.entity_label,
                    result.field_label,
                    table::render_distribution_rows(result)
                ));
            }
            chart::timeline_charts(results, geometry)
        }
    };

    RenderedReport {
        report_id: report.id().to_string(),
        mode: report.mode(),
        generated: report.generated_line(),
        status: REPORT_READY.to_string(),
        sort_key: sort.key,
        sort_direction: sort.direction,
        rows,
        charts,
        text,
    }
}
