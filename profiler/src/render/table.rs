use crate::models::{DistributionResult, ResultEntry, bucket_label};
use crate::report::ReportResults;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;

pub const ABSENT: &str = "—";

pub const HEADERS: [&str; 6] = [
    "Object",
    "Field",
    "Total Records",
    "Non-Null Records",
    "Fill Rate",
    "Status",
];

/// `1234567` -> `1,234,567`.
pub fn format_count(value: Option<u64>) -> String {
    let Some(value) = value else {
        return ABSENT.to_string();
    };
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Ratio in [0,1] as `xx.xx%`.
pub fn format_percentage(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}%", v * 100.0),
        _ => ABSENT.to_string(),
    }
}

/// One materialized table row, every cell already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub entity: String,
    pub field: String,
    pub total_count: String,
    pub non_null_count: String,
    pub non_null_percentage: String,
    pub status: String,
}

impl TableRow {
    fn cells(&self) -> [&str; 6] {
        [
            &self.entity,
            &self.field,
            &self.total_count,
            &self.non_null_count,
            &self.non_null_percentage,
            &self.status,
        ]
    }
}

fn or_absent(text: &str) -> String {
    if text.is_empty() {
        ABSENT.to_string()
    } else {
        text.to_string()
    }
}

impl From<&ResultEntry> for TableRow {
    fn from(entry: &ResultEntry) -> Self {
        Self {
            entity: or_absent(&entry.entity_label),
            field: or_absent(&entry.field_label),
            total_count: format_count(entry.total_count),
            non_null_count: format_count(entry.non_null_count),
            non_null_percentage: format_percentage(entry.non_null_percentage),
            status: or_absent(&entry.status.to_string()),
        }
    }
}

impl From<&DistributionResult> for TableRow {
    fn from(result: &DistributionResult) -> Self {
        Self {
            entity: or_absent(&result.entity_label),
            field: or_absent(&result.field_label),
            total_count: format_count(result.record_count),
            non_null_count: ABSENT.to_string(),
            non_null_percentage: ABSENT.to_string(),
            status: or_absent(&result.status.to_string()),
        }
    }
}

/// Rows in the order given; sort first.
pub fn materialize(results: &ReportResults) -> Vec<TableRow> {
    match results {
        ReportResults::Summary(entries) => entries.iter().map(TableRow::from).collect(),
        ReportResults::Distribution(items) => items.iter().map(TableRow::from).collect(),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: &str) -> Cell {
    let cell = Cell::new(status);
    if status.starts_with("Error") {
        cell.fg(Color::Red)
    } else if status.starts_with("Skipped") {
        cell.fg(Color::DarkGrey)
    } else {
        cell
    }
}

/// Terminal rendering of the main report table.
pub fn render_table(rows: &[TableRow]) -> String {
    let mut table = styled_table();
    table.set_header(HEADERS.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    for row in rows {
        let cells = row.cells();
        let mut line: Vec<Cell> = cells[..5].iter().map(|c| Cell::new(c)).collect();
        line.push(status_cell(cells[5]));
        table.add_row(line);
    }
    for index in 2..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.to_string()
}

/// Per-value breakdown of one distribution result.
pub fn render_distribution_rows(result: &DistributionResult) -> String {
    let mut table = styled_table();
    table.set_header(vec![header_cell("Value"), header_cell("Count"), header_cell("Share")]);
    for row in &result.rows {
        table.add_row(vec![
            Cell::new(bucket_label(row.value.as_deref())),
            Cell::new(format_count(Some(row.count))),
            Cell::new(format_percentage(Some(row.percentage))),
        ]);
    }
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistributionRow, EntryStatus};

    #[test]
    fn test_format_count_groups_thousands() {
        assert_eq!(format_count(Some(0)), "0");
        assert_eq!(format_count(Some(999)), "999");
        assert_eq!(format_count(Some(1000)), "1,000");
        assert_eq!(format_count(Some(1_234_567)), "1,234,567");
        assert_eq!(format_count(None), "—");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(Some(0.256)), "25.60%");
        assert_eq!(format_percentage(Some(1.0)), "100.00%");
        assert_eq!(format_percentage(Some(f64::NAN)), "—");
        assert_eq!(format_percentage(None), "—");
    }

    #[test]
    fn test_skipped_entry_row() {
        let entry = ResultEntry {
            entity: "Account".into(),
            entity_label: "Account (Account)".into(),
            field: "Description".into(),
            field_label: "Description".into(),
            non_null_count: None,
            total_count: None,
            non_null_percentage: None,
            status: EntryStatus::Skipped("field metadata unavailable.".into()),
        };
        let row = TableRow::from(&entry);
        assert_eq!(row.total_count, "—");
        assert_eq!(row.non_null_percentage, "—");
        assert_eq!(row.status, "Skipped: field metadata unavailable.");

        let rendered = render_table(&[row]);
        assert!(rendered.contains("Fill Rate"));
        assert!(rendered.contains("Account (Account)"));
    }

    #[test]
    fn test_distribution_rows_label_blank_bucket() {
        let result = DistributionResult {
            entity_label: "Lead (Lead)".into(),
            field_label: "Source".into(),
            record_count: Some(2500),
            status: EntryStatus::Success,
            rows: vec![
                DistributionRow { value: Some("Web".into()), count: 2000, percentage: 0.8 },
                DistributionRow { value: None, count: 500, percentage: 0.2 },
            ],
            timeline: None,
        };
        assert_eq!(TableRow::from(&result).total_count, "2,500");
        let rendered = render_distribution_rows(&result);
        assert!(rendered.contains("(blank)"));
        assert!(rendered.contains("80.00%"));
    }
}
