//! Plain-text table rendering.
//!
//! The table has no borders: a header row, one row per hour, columns
//! separated by two spaces and every cell centered in its column.

use crate::model::{HourlyForecast, RenderedReport};

const TIME_HEADER: &str = "Time";
const COLUMN_GAP: &str = "  ";
const MISSING: &str = "-";

/// Header shown for a forecast variable. Unknown variables keep their API name.
pub fn column_label(variable: &str) -> &str {
    match variable {
        "temperature_2m" => "t°C",
        "apparent_temperature" => "Feel like",
        "precipitation_probability" => "Fallouts %",
        other => other,
    }
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => MISSING.to_string(),
    }
}

pub fn render_table(forecast: &HourlyForecast) -> RenderedReport {
    // Column-major: each column starts with its header cell.
    let mut columns: Vec<Vec<String>> = Vec::with_capacity(forecast.series().len() + 1);

    columns.push(
        std::iter::once(TIME_HEADER.to_string())
            .chain(forecast.timestamps().iter().cloned())
            .collect(),
    );
    for series in forecast.series() {
        columns.push(
            std::iter::once(column_label(&series.variable).to_string())
                .chain(series.values.iter().copied().map(format_value))
                .collect(),
        );
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|cells| cells.iter().map(|c| c.chars().count()).max().unwrap_or(0))
        .collect();

    let lines: Vec<String> = (0..=forecast.len())
        .map(|row| {
            let line = columns
                .iter()
                .zip(&widths)
                .map(|(cells, &width)| format!("{:^width$}", cells[row]))
                .collect::<Vec<_>>()
                .join(COLUMN_GAP);
            line.trim_end().to_string()
        })
        .collect();

    RenderedReport::new(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Series;

    fn forecast(rows: &[(&str, f64, f64)]) -> HourlyForecast {
        HourlyForecast::new(
            rows.iter().map(|r| r.0.to_string()).collect(),
            vec![
                Series {
                    variable: "temperature_2m".into(),
                    values: rows.iter().map(|r| Some(r.1)).collect(),
                },
                Series {
                    variable: "apparent_temperature".into(),
                    values: rows.iter().map(|r| Some(r.2)).collect(),
                },
            ],
        )
        .expect("aligned series")
    }

    #[test]
    fn renders_centered_plain_table() {
        let table = render_table(&forecast(&[("00:00", 10.04, 9.0), ("01:00", 10.61, 9.9)]));

        assert_eq!(
            table.as_str(),
            "Time   t°C   Feel like\n\
             00:00  10.0     9.0\n\
             01:00  10.6     9.9"
        );
    }

    #[test]
    fn one_header_plus_one_row_per_hour() {
        let rows: Vec<(String, f64, f64)> =
            (0..24).map(|h| (format!("{h:02}:00"), h as f64 * 0.55, -1.25)).collect();
        let rows: Vec<(&str, f64, f64)> = rows.iter().map(|(t, a, b)| (t.as_str(), *a, *b)).collect();

        let table = render_table(&forecast(&rows));

        assert_eq!(table.as_str().lines().count(), 25);
    }

    #[test]
    fn missing_values_render_as_dash() {
        let f = HourlyForecast::new(
            vec!["05:00".into()],
            vec![Series { variable: "precipitation_probability".into(), values: vec![None] }],
        )
        .expect("aligned series");

        let table = render_table(&f);
        let lines: Vec<&str> = table.as_str().lines().collect();

        assert_eq!(lines[0], "Time   Fallouts %");
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), ["05:00", "-"]);
    }

    #[test]
    fn unknown_variables_keep_their_name() {
        assert_eq!(column_label("wind_speed_10m"), "wind_speed_10m");
        assert_eq!(column_label("temperature_2m"), "t°C");
    }

    #[test]
    fn empty_forecast_renders_header_only() {
        let f = HourlyForecast::new(Vec::new(), Vec::new()).expect("empty forecast");
        assert_eq!(render_table(&f).as_str(), "Time");
    }
}
