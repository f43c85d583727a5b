//! Renders classified rows as an aligned table or as CSV

use std::io::Write;

use crate::classify::Row;

const POINT_TYPE_WIDTH: usize = 17;
const DESCRIPTION_WIDTH: usize = 50;

/// Writes the rows as CSV, including a header record
///
/// Fields are written in full, dates as `YYYY-MM-DD`.
pub fn write_csv<W: Write>(writer: W, rows: &[Row]) -> anyhow::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        out.write_record(["Date", "Pointtype", "Description", "Base points", "Points"])?;
    }
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the rows as a fixed width table with a header and a dashed separator
///
/// Point types and descriptions are cut to fit their columns.
pub fn write_table<W: Write>(mut writer: W, rows: &[Row]) -> anyhow::Result<()> {
    let header = table_line("DATE", "POINTTYPE", "DESCRIPTION", "BASE", "POINTS");
    writeln!(writer, "{header}")?;
    writeln!(writer, "{}", "-".repeat(header.chars().count()))?;

    for row in rows {
        writeln!(
            writer,
            "{}",
            table_line(
                &row.date.format("%Y-%m-%d").to_string(),
                truncate(&row.point_type, POINT_TYPE_WIDTH),
                truncate(&row.description, DESCRIPTION_WIDTH),
                &row.base_points.to_string(),
                &row.points.to_string(),
            )
        )?;
    }
    Ok(())
}

fn table_line(date: &str, point_type: &str, description: &str, base: &str, points: &str) -> String {
    format!(
        "{date:<10} {point_type:<POINT_TYPE_WIDTH$} {description:<DESCRIPTION_WIDTH$} {base:>9} {points:>9}"
    )
}

fn truncate(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn row(point_type: &str, description: &str, base_points: i64, points: i64) -> Row {
        Row {
            date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            point_type: point_type.to_owned(),
            description: description.to_owned(),
            base_points,
            points,
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            row("Basic Points", "SK 1415 CPH-ARN", 1200, 1200),
            row("Points Used", "Award ticket, \"plus\" taxes", 0, -40000),
            row("Mastercard Status Points", &"x".repeat(80), 25, 0),
        ]
    }

    #[test]
    fn table_layout() {
        let mut out = Vec::new();
        write_table(&mut out, &rows()).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines = out.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("DATE       POINTTYPE         DESCRIPTION "));
        assert!(lines[0].ends_with("     BASE    POINTS"));
        assert_eq!(lines[0].len(), 99);
        assert_eq!(lines[1], "-".repeat(99));
        assert_eq!(
            lines[2],
            format!(
                "2023-03-01 Basic Points      {:<50}      1200      1200",
                "SK 1415 CPH-ARN"
            )
        );
        assert!(lines[3].ends_with("         0    -40000"));
    }

    #[test]
    fn table_truncates_long_fields() {
        let mut out = Vec::new();
        write_table(&mut out, &rows()[2..]).unwrap();
        let out = String::from_utf8(out).unwrap();
        let line = out.lines().nth(2).unwrap();

        assert_eq!(line.len(), 99);
        assert!(line.contains("Mastercard Status "));
        assert!(!line.contains("Mastercard Status Points"));
        assert_eq!(line.matches('x').count(), 50);
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("Försäljning", 4), "Förs");
        assert_eq!(truncate("kort", 17), "kort");
    }

    #[test]
    fn csv_keeps_full_fields() {
        let mut out = Vec::new();
        write_csv(&mut out, &rows()).unwrap();
        let out = String::from_utf8(out).unwrap();

        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Date,Pointtype,Description,Base points,Points")
        );
        assert_eq!(lines.next(), Some("2023-03-01,Basic Points,SK 1415 CPH-ARN,1200,1200"));
        assert_eq!(
            lines.next(),
            Some("2023-03-01,Points Used,\"Award ticket, \"\"plus\"\" taxes\",0,-40000")
        );
        assert!(out.contains(&"x".repeat(80)));
    }

    #[test]
    fn csv_round_trip_through_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_csv(std::fs::File::create(file.path()).unwrap(), &rows()).unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let read = reader
            .deserialize::<Row>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(read, rows());
    }

    #[test]
    fn csv_header_without_rows() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Date,Pointtype,Description,Base points,Points\n"
        );
    }
}
