//! Chart drawing. Every function here renders one SVG image.

use std::f64::consts::PI;

use chrono::NaiveDate;
use plotters::{
    coord::Shift,
    drawing::DrawingAreaErrorKind,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{participants::Gender, questionnaire::Scale, responses::Phase};

use super::{
    Chart, ReportRow,
    stats::{self, BUCKET_LABELS, BoxStats, GroupMeans},
};

#[derive(thiserror::Error, Debug)]
pub enum ChartError {
    #[error("could not draw chart: {0}")]
    Draw(String),
    #[error("no data to plot")]
    Empty,
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>>
    for ChartError
{
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        ChartError::Draw(e.to_string())
    }
}

const WIDE: (u32, u32) = (720, 420);
const SQUARE: (u32, u32) = (360, 360);
const FONT: &str = "sans-serif";

/// One colour per scale, and per pie slice.
const SERIES: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

fn phase_colour(phase: Phase) -> RGBColor {
    match phase {
        Phase::Before => SERIES[0],
        Phase::After => SERIES[1],
    }
}

fn centred(size: u32) -> TextStyle<'static> {
    TextStyle::from((FONT, size).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Draws onto a fresh white SVG canvas of `size` and returns the markup.
fn render<F>(title: &str, size: (u32, u32), draw: F) -> Result<Chart, ChartError>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> Result<(), ChartError>,
{
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        draw(&root)?;
        root.present()?;
    }
    Ok(Chart {
        title: title.to_string(),
        svg,
    })
}

/// Label for a categorical axis drawn on an `f64` range, where category `i`
/// sits at `x = i`.
fn category_label(names: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < names.len() {
        names[i as usize].clone()
    } else {
        String::new()
    }
}

/// Mean well-being, activity and mood side by side for every gender×phase
/// group.
pub fn grouped_bars(means: &[GroupMeans]) -> Result<Chart, ChartError> {
    if means.is_empty() {
        return Err(ChartError::Empty);
    }
    let title = "Mean scores by gender and phase";
    let names: Vec<String> = means
        .iter()
        .map(|g| format!("{} / {}", g.gender.label(), g.phase.code()))
        .collect();
    let n = means.len() as f64;

    render(title, WIDE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 20))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(-0.5f64..n - 0.5, 0f64..7.5f64)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(2 * means.len() + 1)
            .x_label_formatter(&|x| category_label(&names, *x))
            .x_desc("Gender / phase")
            .y_desc("Score")
            .draw()?;

        let width = 0.8 / Scale::ALL.len() as f64;
        for (k, scale) in Scale::ALL.into_iter().enumerate() {
            let colour = SERIES[k];
            chart
                .draw_series(means.iter().enumerate().map(|(i, group)| {
                    let x0 = i as f64 - 0.4 + k as f64 * width;
                    Rectangle::new(
                        [(x0, 0.0), (x0 + width * 0.9, group.scores.get(scale))],
                        colour.filled(),
                    )
                }))?
                .label(scale.label())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], colour.filled())
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// How mean scores move from before to after, one line per scale and
/// gender.
pub fn trend_lines(means: &[GroupMeans]) -> Result<Chart, ChartError> {
    if means.is_empty() {
        return Err(ChartError::Empty);
    }
    let title = "Change in mean scores by phase";
    let names: Vec<String> =
        Phase::ALL.iter().map(|p| p.code().to_string()).collect();

    render(title, WIDE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 20))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(-0.5f64..1.5f64, 1f64..7f64)?;

        chart
            .configure_mesh()
            .x_labels(5)
            .x_label_formatter(&|x| category_label(&names, *x))
            .x_desc("Phase")
            .y_desc("Score")
            .draw()?;

        for gender in Gender::ALL {
            let points_of = |scale: Scale| -> Vec<(f64, f64)> {
                Phase::ALL
                    .iter()
                    .enumerate()
                    .filter_map(|(x, phase)| {
                        means
                            .iter()
                            .find(|g| g.gender == gender && g.phase == *phase)
                            .map(|g| (x as f64, g.scores.get(scale)))
                    })
                    .collect()
            };

            for (k, scale) in Scale::ALL.into_iter().enumerate() {
                let points = points_of(scale);
                if points.is_empty() {
                    continue;
                }
                let colour = match gender {
                    Gender::Male => SERIES[k].to_rgba(),
                    Gender::Female => SERIES[k].mix(0.45),
                };
                chart
                    .draw_series(
                        LineSeries::new(points, colour.stroke_width(2))
                            .point_size(4),
                    )?
                    .label(format!("{} ({})", scale.label(), gender.code()))
                    .legend(move |(x, y)| {
                        PathElement::new(
                            vec![(x, y), (x + 20, y)],
                            colour.stroke_width(2),
                        )
                    });
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Share of well-being scores above 5, from 4 to 5, and below 4 for one
/// gender×phase group. Draws a "no data" panel when the group is empty.
pub fn wellbeing_pie(
    rows: &[ReportRow],
    gender: Gender,
    phase: Phase,
) -> Result<Chart, ChartError> {
    let title = format!("Well-being: {} / {}", gender.label(), phase.code());
    let buckets = stats::wellbeing_buckets(
        rows.iter()
            .filter(|r| r.gender == gender && r.phase == phase)
            .map(|r| r.scores.wellbeing),
    );
    let total: usize = buckets.iter().sum();

    render(&title, SQUARE, |root| {
        let area = root.titled(&title, (FONT, 18))?;
        let (w, h) = area.dim_in_pixel();
        let centre = (w as i32 / 2, h as i32 / 2);

        if total == 0 {
            area.draw(&Text::new("No data", centre, centred(16)))?;
            return Ok(());
        }

        let radius = f64::from(w.min(h)) * 0.38;
        let point = |angle: f64, r: f64| {
            (
                centre.0 + (r * angle.cos()).round() as i32,
                centre.1 - (r * angle.sin()).round() as i32,
            )
        };

        // Slices run anticlockwise from twelve o'clock.
        let mut start = PI / 2.0;
        for (i, &count) in buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let share = count as f64 / total as f64;
            let sweep = share * 2.0 * PI;
            let steps = ((sweep / (2.0 * PI)) * 90.0).ceil().max(2.0) as usize;

            let mut outline = vec![centre];
            outline.extend(
                (0..=steps)
                    .map(|s| point(start + sweep * s as f64 / steps as f64, radius)),
            );
            area.draw(&Polygon::new(outline, SERIES[i].filled()))?;

            let middle = start + sweep / 2.0;
            area.draw(&Text::new(
                format!("{} ({:.1}%)", BUCKET_LABELS[i], share * 100.0),
                point(middle, radius * 0.62),
                centred(13),
            ))?;
            start += sweep;
        }
        Ok(())
    })
}

/// Overall score against age, coloured by phase.
pub fn overall_vs_age(
    rows: &[ReportRow],
    today: NaiveDate,
) -> Result<Chart, ChartError> {
    if rows.is_empty() {
        return Err(ChartError::Empty);
    }
    let title = "Overall score vs age";
    let ages: Vec<f64> = rows.iter().map(|r| r.age_years(today)).collect();
    let lo = ages.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = ages.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.05).max(1.0);

    render(title, WIDE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 20))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d((lo - pad)..(hi + pad), 1f64..7f64)?;

        chart
            .configure_mesh()
            .x_desc("Age (years)")
            .y_desc("Overall score")
            .draw()?;

        for phase in Phase::ALL {
            let colour = phase_colour(phase);
            let points: Vec<(f64, f64)> = rows
                .iter()
                .zip(&ages)
                .filter(|(r, _)| r.phase == phase)
                .map(|(r, age)| (*age, r.scores.overall))
                .collect();
            if points.is_empty() {
                continue;
            }
            chart
                .draw_series(
                    points
                        .into_iter()
                        .map(|p| Circle::new(p, 4, colour.mix(0.5).filled())),
                )?
                .label(phase.code())
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, colour.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Box-and-whisker plots of the three scales, before and after side by side.
pub fn box_plots(rows: &[ReportRow]) -> Result<Chart, ChartError> {
    if rows.is_empty() {
        return Err(ChartError::Empty);
    }
    let title = "Score distribution by phase";
    let names: Vec<String> =
        Scale::ALL.iter().map(|s| s.label().to_string()).collect();

    render(title, WIDE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 20))
            .margin(15)
            .x_label_area_size(35)
            .y_label_area_size(45)
            .build_cartesian_2d(
                -0.5f64..(Scale::ALL.len() as f64 - 0.5),
                0.5f64..7.5f64,
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(2 * Scale::ALL.len() + 1)
            .x_label_formatter(&|x| category_label(&names, *x))
            .y_desc("Score")
            .draw()?;

        for (p, phase) in Phase::ALL.into_iter().enumerate() {
            let colour = phase_colour(phase);
            let offset = if p == 0 { -0.2 } else { 0.2 };
            let mut shapes: Vec<PathElement<(f64, f64)>> = Vec::new();
            let mut boxes: Vec<Rectangle<(f64, f64)>> = Vec::new();

            for (k, scale) in Scale::ALL.into_iter().enumerate() {
                let values: Vec<f64> = rows
                    .iter()
                    .filter(|r| r.phase == phase)
                    .map(|r| r.scores.get(scale))
                    .collect();
                let Some(BoxStats {
                    min,
                    q1,
                    median,
                    q3,
                    max,
                }) = BoxStats::of(&values)
                else {
                    continue;
                };

                let x = k as f64 + offset;
                let (left, right) = (x - 0.15, x + 0.15);
                let line = colour.stroke_width(2);
                boxes.push(Rectangle::new([(left, q1), (right, q3)], colour.mix(0.3).filled()));
                boxes.push(Rectangle::new([(left, q1), (right, q3)], line));
                shapes.push(PathElement::new(vec![(left, median), (right, median)], line));
                shapes.push(PathElement::new(vec![(x, q3), (x, max)], line));
                shapes.push(PathElement::new(vec![(x, q1), (x, min)], line));
                shapes.push(PathElement::new(vec![(x - 0.07, max), (x + 0.07, max)], line));
                shapes.push(PathElement::new(vec![(x - 0.07, min), (x + 0.07, min)], line));
            }

            if boxes.is_empty() {
                continue;
            }
            chart
                .draw_series(boxes)?
                .label(phase.code())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], colour.filled())
                });
            chart.draw_series(shapes)?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
        Ok(())
    })
}

/// Blue for -1, light grey for 0, red for 1.
fn diverging(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 { (MID, COLD, -v) } else { (MID, HOT, v) };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Pairwise correlations of the three scales and age, annotated with the
/// coefficient. Undefined coefficients are shown as "n/a".
pub fn correlation_heatmap(
    rows: &[ReportRow],
    today: NaiveDate,
) -> Result<Chart, ChartError> {
    if rows.is_empty() {
        return Err(ChartError::Empty);
    }
    let title = "Correlation between scores and age";
    let labels = ["Well-being", "Activity", "Mood", "Age"];
    let series = [
        rows.iter().map(|r| r.scores.wellbeing).collect::<Vec<_>>(),
        rows.iter().map(|r| r.scores.activity).collect(),
        rows.iter().map(|r| r.scores.mood).collect(),
        rows.iter().map(|r| r.age_years(today)).collect(),
    ];
    let matrix = stats::correlation_matrix(&series);
    let n = labels.len();

    render(title, (560, 500), |root| {
        // Cell (i, j) covers x in [j+1, j+2] and y in [n-i, n-i+1]; the
        // strips at x < 1 and y < 1 hold the labels.
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 20))
            .margin(15)
            .build_cartesian_2d(0f64..(n + 1) as f64, 0f64..(n + 1) as f64)?;

        let mut cells = Vec::with_capacity(n * n);
        let mut notes = Vec::with_capacity(n * n + 2 * n);
        for (i, row) in matrix.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let (x, y) = ((j + 1) as f64, (n - i) as f64);
                let fill = value.map(diverging).unwrap_or(RGBColor(245, 245, 245));
                cells.push(Rectangle::new([(x, y), (x + 1.0, y + 1.0)], fill.filled()));
                cells.push(Rectangle::new([(x, y), (x + 1.0, y + 1.0)], WHITE.stroke_width(2)));
                notes.push(Text::new(
                    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
                    (x + 0.5, y + 0.5),
                    centred(15),
                ));
            }
        }
        for (k, label) in labels.iter().enumerate() {
            notes.push(Text::new(
                label.to_string(),
                ((k + 1) as f64 + 0.5, 0.5),
                centred(14),
            ));
            notes.push(Text::new(
                label.to_string(),
                (0.5, (n - k) as f64 + 0.5),
                centred(14),
            ));
        }

        chart.draw_series(cells)?;
        chart.draw_series(notes)?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverging_scale_ends() {
        assert_eq!(diverging(-1.0), RGBColor(59, 76, 192));
        assert_eq!(diverging(0.0), RGBColor(221, 221, 221));
        assert_eq!(diverging(1.0), RGBColor(180, 4, 38));
        assert_eq!(diverging(7.0), diverging(1.0));
    }

    #[test]
    fn category_labels_only_at_whole_positions() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&names, 0.0), "a");
        assert_eq!(category_label(&names, 1.0), "b");
        assert_eq!(category_label(&names, 0.5), "");
        assert_eq!(category_label(&names, 2.0), "");
        assert_eq!(category_label(&names, -1.0), "");
    }

    #[test]
    fn empty_group_pie_is_a_no_data_panel() {
        let chart = wellbeing_pie(&[], Gender::Male, Phase::Before).unwrap();
        assert!(chart.svg.contains("No data"));
    }
}
