use super::linear::BarLayout;
use super::log::{GroupedLayout, period_label};
use std::fmt::Write;

const AXIS_COLOR: &str = "#d0d7e5";
const BAR_COLOR: &str = "#4c9ffe";
const TEXT_DARK: &str = "#1f1f1f";
const TEXT_LIGHT: &str = "#ffffff";

pub(super) fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn open(svg: &mut String, width: f64, height: f64) {
    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='100%' height='{height:.0}' viewBox='0 0 {width:.0} {height:.0}' role='img'>"
    );
}

fn axes(svg: &mut String, left: f64, top: f64, plot_width: f64, plot_height: f64) {
    let _ = writeln!(
        svg,
        "  <path d='M{left:.2},{top:.2} V{:.2} H{:.2}' stroke='{AXIS_COLOR}' fill='none'/>",
        top + plot_height,
        left + plot_width
    );
}

pub(super) fn bar_chart(layout: &BarLayout) -> String {
    let g = &layout.geometry;
    let baseline = g.baseline();
    let mut svg = String::new();
    open(&mut svg, g.width, g.height);
    axes(&mut svg, g.padding.left, g.padding.top, g.plot_width(), g.plot_height());

    for bar in &layout.bars {
        let _ = writeln!(
            svg,
            "  <rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='{BAR_COLOR}'/>",
            bar.x, bar.y, bar.width, bar.height
        );

        let cx = bar.center_x();
        let cy = bar.y + bar.height / 2.0;
        let fill = if bar.has_dark_label() { TEXT_DARK } else { TEXT_LIGHT };
        let _ = writeln!(
            svg,
            "  <text x='{cx:.2}' y='{cy:.2}' transform='rotate(-90 {cx:.2} {cy:.2})' text-anchor='middle' fill='{fill}' font-size='12'>{:.1}%</text>",
            bar.value * 100.0
        );

        let ly = baseline + 20.0;
        let _ = writeln!(
            svg,
            "  <text x='{cx:.2}' y='{ly:.2}' transform='rotate(-45 {cx:.2} {ly:.2})' text-anchor='end' fill='{TEXT_DARK}' font-size='12'>{}</text>",
            escape_text(&bar.label)
        );
    }

    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='middle' fill='{TEXT_DARK}' font-size='12'>0%</text>",
        g.padding.left,
        baseline + 30.0
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='end' fill='{TEXT_DARK}' font-size='12'>{:.1}%</text>",
        g.padding.left - 5.0,
        g.padding.top + 10.0,
        layout.max_value * 100.0
    );
    svg.push_str("</svg>\n");
    svg
}

pub(super) fn grouped_chart(layout: &GroupedLayout) -> String {
    let g = &layout.geometry;
    let baseline = g.baseline();
    let mut svg = String::new();
    open(&mut svg, g.width, g.height);
    axes(&mut svg, g.padding.left, g.padding.top, g.plot_width(), g.plot_height());

    for bar in &layout.bars {
        let Some(item) = layout.legend.get(bar.category) else {
            continue;
        };
        let (year, month) = layout.periods[bar.period];
        let _ = writeln!(
            svg,
            "  <rect x='{:.2}' y='{:.2}' width='{:.2}' height='{:.2}' fill='{}'><title>{} {}: {} ({:.1}%)</title></rect>",
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            item.color,
            period_label(year, month),
            escape_text(&item.label),
            bar.count,
            bar.percentage * 100.0
        );
    }

    for (&(year, month), center) in layout.periods.iter().zip(&layout.group_centers) {
        let ly = baseline + 20.0;
        let _ = writeln!(
            svg,
            "  <text x='{center:.2}' y='{ly:.2}' transform='rotate(-45 {center:.2} {ly:.2})' text-anchor='end' fill='{TEXT_DARK}' font-size='12'>{}</text>",
            period_label(year, month)
        );
    }

    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='end' fill='{TEXT_DARK}' font-size='12'>{}</text>",
        g.padding.left - 5.0,
        g.padding.top + 10.0,
        layout.max_count
    );

    let legend_y = g.height - 16.0;
    let mut legend_x = g.padding.left;
    for item in &layout.legend {
        let _ = writeln!(
            svg,
            "  <rect x='{legend_x:.2}' y='{:.2}' width='10' height='10' fill='{}'/>",
            legend_y - 9.0,
            item.color
        );
        let _ = writeln!(
            svg,
            "  <text x='{:.2}' y='{legend_y:.2}' fill='{TEXT_DARK}' font-size='12'>{}</text>",
            legend_x + 14.0,
            escape_text(&item.label)
        );
        legend_x += 24.0 + 7.0 * item.label.chars().count() as f64;
    }
    svg.push_str("</svg>\n");
    svg
}
