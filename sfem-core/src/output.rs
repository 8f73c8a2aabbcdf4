//! Result file writer.
//!
//! The file is plain text: a signature line, a `Mesh` section repeating the
//! geometry and connectivity, and a `Results` section with one block per
//! field (name, `0`, vertex count, one value per line).

use crate::error::Result;
use crate::mesh::Mesh;
use crate::results::Results;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const SIGNATURE: &str = "FEM Solver Results File";
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y - %H:%M:%S";

/// Format `value` in C `%.{precision}e` style: two-digit signed exponent.
///
/// With `plus`, non-negative values carry a leading `+` (C `%+e`).
pub fn format_exp(value: f64, precision: usize, plus: bool) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.*e}", precision, value);
    let Some((mantissa, exponent)) = raw.split_once('e') else {
        return raw;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return raw;
    };
    let sign = if plus && !mantissa.starts_with('-') { "+" } else { "" };
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs())
}

fn write_rows(out: &mut impl Write, rows: &[Vec<usize>]) -> Result<()> {
    writeln!(out, "{}", rows.len())?;
    for row in rows {
        let line: Vec<String> = row.iter().map(usize::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}

/// Write the result file for `mesh` and `results` stamped with `timestamp`.
pub fn write_results(
    out: &mut impl Write,
    mesh: &Mesh,
    results: &Results,
    timestamp: DateTime<Local>,
) -> Result<()> {
    writeln!(out, "{}", SIGNATURE)?;
    writeln!(out, "Mesh")?;
    writeln!(out, "{}", mesh.fe_type())?;

    writeln!(out, "{}", mesh.n_nodes())?;
    for i in 0..mesh.n_nodes() {
        let coords: Vec<String> = mesh.coords(i).iter().map(|c| format!("{:.6}", c)).collect();
        writeln!(out, "{}", coords.join(" "))?;
    }
    write_rows(out, mesh.elements())?;
    write_rows(out, mesh.boundary_elements())?;

    writeln!(out, "Results")?;
    writeln!(out, "{}", timestamp.format(TIMESTAMP_FORMAT))?;
    writeln!(out, "{}", results.names().len())?;
    for (name, row) in results.names().iter().zip(results.values().row_iter()) {
        writeln!(out, "{}", name)?;
        writeln!(out, "0")?;
        writeln!(out, "{}", row.len())?;
        for value in row.iter() {
            writeln!(out, "{}", format_exp(*value, 8, false))?;
        }
    }
    Ok(())
}

/// Write the result file to `path`, stamped with the current local time.
pub fn save_results(path: impl AsRef<Path>, mesh: &Mesh, results: &Results) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    write_results(&mut out, mesh, results, Local::now())?;
    out.flush()?;
    log::info!("results written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FeType;
    use crate::types::Point3;
    use chrono::TimeZone;
    use nalgebra::DMatrix;

    #[test]
    fn test_format_exp() {
        assert_eq!(format_exp(1.5, 8, false), "1.50000000e+00");
        assert_eq!(format_exp(-0.000123, 8, false), "-1.23000000e-04");
        assert_eq!(format_exp(0.0, 8, false), "0.00000000e+00");
        assert_eq!(format_exp(6.02e23, 2, false), "6.02e+23");
        assert_eq!(format_exp(1e-300, 1, false), "1.0e-300");
        assert_eq!(format_exp(2.0, 6, true), "+2.000000e+00");
        assert_eq!(format_exp(-2.0, 6, true), "-2.000000e+00");
    }

    #[test]
    fn test_result_file_layout() {
        let mut mesh = Mesh::new(FeType::Bar2);
        mesh.add_node(Point3::new(0.0, 0.0, 0.0));
        mesh.add_node(Point3::new(1.0, 0.0, 0.0));
        mesh.add_element(vec![0, 1]).unwrap();
        mesh.add_boundary_element(vec![0]).unwrap();
        mesh.add_boundary_element(vec![1]).unwrap();

        let values = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        let results = Results::new(FeType::Bar2, values).unwrap();
        let timestamp = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();

        let mut out = Vec::new();
        write_results(&mut out, &mesh, &results, timestamp).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            &lines[..11],
            &[
                "FEM Solver Results File",
                "Mesh",
                "fe1d2",
                "2",
                "0.000000",
                "1.000000",
                "1",
                "0 1",
                "2",
                "0",
                "1",
            ]
        );
        assert_eq!(&lines[11..14], &["Results", "07.03.2024 - 09:05:01", "3"]);
        assert_eq!(&lines[14..19], &["U", "0", "2", "0.00000000e+00", "1.00000000e+00"]);
        assert_eq!(lines.len(), 14 + 3 * 5);
        assert_eq!(lines.last(), Some(&"2.00000000e+00"));
    }
}
