use super::{ChartGeometry, RenderedReport, SortKey, SortState, render_report};
use crate::report::{Report, ReportMode};
use common::{Error, Result};
use tracing::debug;

pub const MISSING_REPORT_ID: &str = "Missing report identifier.";
pub const NO_REPORT_DATA: &str = "No data available for this report.";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading { report_id: String },
    Summary(Report),
    Distribution(Report),
    Rendered { report: Report, output: RenderedReport },
    Failed(String),
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Loading { .. } => "loading",
            ViewState::Summary(_) => "summary",
            ViewState::Distribution(_) => "distribution",
            ViewState::Rendered { .. } => "rendered",
            ViewState::Failed(_) => "failed",
        }
    }
}

/// Drives one report display: `Idle -> Loading -> Summary | Distribution ->
/// Rendered`, or `Failed`. Loading restarts only for an id not seen before.
pub struct ReportView {
    state: ViewState,
    sort: SortState,
    seen: Vec<String>,
    page_size: usize,
    geometry: ChartGeometry,
}

impl ReportView {
    pub fn new(page_size: usize, geometry: ChartGeometry) -> Self {
        Self {
            state: ViewState::Idle,
            sort: SortState::default(),
            seen: Vec::new(),
            page_size,
            geometry,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Sort applied by the next render.
    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    /// Text for the status line.
    pub fn status_message(&self) -> Option<&str> {
        match &self.state {
            ViewState::Failed(message) => Some(message),
            ViewState::Rendered { output, .. } => Some(&output.status),
            _ => None,
        }
    }

    fn invalid(&self, action: &str) -> Error {
        Error::InvalidState(format!("cannot {} while {}", action, self.state.name()))
    }

    /// Starts loading `report_id`. A missing id fails the view.
    pub fn begin(&mut self, report_id: Option<&str>) -> Result<()> {
        let Some(report_id) = report_id.map(str::trim).filter(|id| !id.is_empty()) else {
            self.state = ViewState::Failed(MISSING_REPORT_ID.to_string());
            return Ok(());
        };
        if matches!(self.state, ViewState::Loading { .. }) || self.seen.iter().any(|id| id == report_id) {
            return Err(self.invalid("load a report"));
        }
        self.seen.push(report_id.to_string());
        self.sort = SortState::default();
        self.state = ViewState::Loading {
            report_id: report_id.to_string(),
        };
        Ok(())
    }

    /// Hands the fetched report to the view; the mode decides the branch.
    pub fn receive(&mut self, report: Option<Report>) -> Result<()> {
        if !matches!(self.state, ViewState::Loading { .. }) {
            return Err(self.invalid("receive a report"));
        }
        self.state = match report {
            Some(report) if !report.results().is_empty() => match report.mode() {
                ReportMode::Summary => ViewState::Summary(report),
                ReportMode::Distribution => ViewState::Distribution(report),
            },
            _ => ViewState::Failed(NO_REPORT_DATA.to_string()),
        };
        Ok(())
    }

    pub fn render(&mut self) -> Result<&RenderedReport> {
        let report = match std::mem::replace(&mut self.state, ViewState::Idle) {
            ViewState::Summary(report) | ViewState::Distribution(report) => report,
            ViewState::Rendered { report, .. } => report,
            other => {
                self.state = other;
                return Err(self.invalid("render"));
            }
        };
        let output = render_report(&report, self.sort, self.page_size, self.geometry);
        debug!(report_id = report.id(), rows = output.rows.len(), charts = output.charts.len(), "Rendered report");
        self.state = ViewState::Rendered { report, output };
        match &self.state {
            ViewState::Rendered { output, .. } => Ok(output),
            _ => Err(self.invalid("render")),
        }
    }

    /// Header click on a rendered table.
    pub fn sort_by(&mut self, key: SortKey) -> Result<&RenderedReport> {
        if !matches!(self.state, ViewState::Rendered { .. }) {
            return Err(self.invalid("sort"));
        }
        self.sort.select(key);
        self.render()
    }
}
