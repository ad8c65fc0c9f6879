use super::{ChartGeometry, ChartPage, clamp_percentage, svg};
use crate::models::ResultEntry;

/// Bars shorter than this get dark value labels.
pub const DARK_LABEL_THRESHOLD: f64 = 30.0;
pub const MIN_BAR_WIDTH: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub label: String,
    /// Clamped to [0,1].
    pub value: f64,
}

impl BarDatum {
    pub fn new(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value: clamp_percentage(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bar {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn has_dark_label(&self) -> bool {
        self.height < DARK_LABEL_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub geometry: ChartGeometry,
    pub max_value: f64,
    pub bars: Vec<Bar>,
}

/// One bar per entry in the order given. Entries without a fill rate
/// (skipped or failed) draw as 0%.
pub fn bar_data(entries: &[ResultEntry]) -> Vec<BarDatum> {
    entries
        .iter()
        .map(|entry| {
            let label = [entry.field_label.as_str(), entry.field.as_str()]
                .into_iter()
                .find(|l| !l.is_empty())
                .unwrap_or("Field");
            BarDatum::new(label, entry.non_null_percentage.unwrap_or(0.0))
        })
        .collect()
}

/// Heights scale linearly against the largest value of the page. A page whose
/// values are all 0 renders flat.
pub fn layout(data: &[BarDatum], geometry: ChartGeometry) -> BarLayout {
    let plot_height = geometry.plot_height();
    let max_value = data.iter().map(|d| d.value).fold(0.0, f64::max);
    let spacing = if data.is_empty() {
        0.0
    } else {
        geometry.plot_width() / data.len() as f64
    };
    let width = MIN_BAR_WIDTH.max(spacing * 0.5);

    let bars = data
        .iter()
        .enumerate()
        .map(|(index, datum)| {
            let height = if max_value == 0.0 {
                0.0
            } else {
                datum.value / max_value * plot_height
            };
            let x = geometry.padding.left + index as f64 * spacing + (spacing - width) / 2.0;
            Bar {
                label: datum.label.clone(),
                value: datum.value,
                x,
                y: geometry.baseline() - height,
                width,
                height,
            }
        })
        .collect();

    BarLayout {
        geometry,
        max_value,
        bars,
    }
}

/// Splits `data` into pages of `page_size`. Captions read "Fields a-b" and
/// are only set when there is more than one page.
pub fn paginate(data: &[BarDatum], page_size: usize) -> Vec<(Option<String>, &[BarDatum])> {
    let page_size = page_size.max(1);
    let multi_page = data.len() > page_size;
    data.chunks(page_size)
        .enumerate()
        .map(|(index, page)| {
            let caption = multi_page.then(|| {
                let start = index * page_size + 1;
                format!("Fields {}-{}", start, start + page.len() - 1)
            });
            (caption, page)
        })
        .collect()
}

/// Summary chart pages. Empty only for an empty slice.
pub fn bar_charts(entries: &[ResultEntry], page_size: usize, geometry: ChartGeometry) -> Vec<ChartPage> {
    let data = bar_data(entries);
    paginate(&data, page_size)
        .into_iter()
        .map(|(caption, page)| ChartPage {
            caption,
            svg: svg::bar_chart(&layout(page, geometry)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryStatus;

    fn data(values: &[f64]) -> Vec<BarDatum> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| BarDatum::new(&format!("F{}", i), *v))
            .collect()
    }

    #[test]
    fn test_heights_scale_to_largest_value() {
        let layout = layout(&data(&[0.25, 0.5, 0.0]), ChartGeometry::default());
        let plot = layout.geometry.plot_height();
        assert_eq!(layout.max_value, 0.5);
        assert_eq!(layout.bars[1].height, plot);
        assert_eq!(layout.bars[0].height, plot / 2.0);
        assert_eq!(layout.bars[2].height, 0.0);
        assert_eq!(layout.bars[2].y, layout.geometry.baseline());
    }

    #[test]
    fn test_all_zero_values_render_flat() {
        let layout = layout(&data(&[0.0, 0.0]), ChartGeometry::default());
        assert!(layout.bars.iter().all(|b| b.height == 0.0 && b.height.is_finite()));
        assert!(layout.bars.iter().all(Bar::has_dark_label));
    }

    #[test]
    fn test_bar_width_and_spacing() {
        let geometry = ChartGeometry::default();
        let two = layout(&data(&[1.0, 1.0]), geometry);
        assert_eq!(two.bars[0].width, 227.5);
        assert_eq!(two.bars[0].x, 173.75);
        assert_eq!(two.bars[1].x, 173.75 + 455.0);

        let many = layout(&data(&[0.5; 50]), geometry);
        assert_eq!(many.bars[0].width, MIN_BAR_WIDTH);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let clamped = data(&[1.2, -0.1, f64::NAN]);
        assert_eq!(clamped.iter().map(|d| d.value).collect::<Vec<_>>(), vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pages_of_fifty_with_captions() {
        let values = data(&[0.1; 120]);
        let pages = paginate(&values, 50);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].0.as_deref(), Some("Fields 1-50"));
        assert_eq!(pages[2].0.as_deref(), Some("Fields 101-120"));
        assert_eq!(pages[2].1.len(), 20);

        let single = paginate(&values[..50], 50);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].0, None);
    }

    #[test]
    fn test_entries_without_fill_rate_draw_as_zero() {
        let entry = |field: &str, pct: Option<f64>| ResultEntry {
            entity: "Account".into(),
            entity_label: "Account (Account)".into(),
            field: field.into(),
            field_label: String::new(),
            non_null_count: None,
            total_count: None,
            non_null_percentage: pct,
            status: EntryStatus::Success,
        };
        let pages = bar_charts(
            &[entry("Name", Some(0.9)), entry("Notes", None)],
            50,
            ChartGeometry::default(),
        );
        assert_eq!(pages.len(), 1);
        assert!(pages[0].svg.contains(">Name</text>"));
        assert!(pages[0].svg.contains(">Notes</text>"));
        assert!(pages[0].svg.contains(">0.0%</text>"));

        let data = bar_data(&[entry("Notes", None), entry("Name", Some(0.9))]);
        assert_eq!(data, vec![BarDatum::new("Notes", 0.0), BarDatum::new("Name", 0.9)]);
        assert!(bar_charts(&[], 50, ChartGeometry::default()).is_empty());
    }
}
