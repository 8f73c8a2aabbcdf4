//! Netgen `.vol` reader.
//!
//! Only the sections needed for a linear tetrahedral mesh are read:
//! `surfaceelements` (fields 6-8 are the triangle vertices), `volumeelements`
//! (fields 3-6 are the tetrahedron vertices) and `points`. Netgen indices are
//! 1-based.

use super::{parse_field, FeType, Mesh};
use crate::error::{Error, Result};
use crate::types::Point3;

/// Lines following the header `name`, preceded by their declared count.
fn section<'a, 'b>(lines: &'b [&'a str], name: &str) -> Result<(usize, &'b [&'a str])> {
    let start = lines
        .iter()
        .position(|line| line.trim() == name)
        .ok_or_else(|| Error::MeshFormat(format!("missing '{}' section", name)))?;
    let count: usize = parse_field(lines.get(start + 1).map(|l| l.trim()), name)?;
    let body = lines.get(start + 2..start + 2 + count).ok_or_else(|| {
        Error::MeshFormat(format!("'{}' section is shorter than {} lines", name, count))
    })?;
    Ok((count, body))
}

fn indices(line: &str, range: std::ops::Range<usize>, what: &str) -> Result<Vec<usize>> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    range
        .map(|k| {
            let index: usize = parse_field(fields.get(k).copied(), what)?;
            index
                .checked_sub(1)
                .ok_or_else(|| Error::MeshFormat(format!("{} index must be 1-based", what)))
        })
        .collect()
}

/// Parse the contents of a `.vol` file into a Tet4 mesh.
pub fn parse(text: &str) -> Result<Mesh> {
    let lines: Vec<&str> = text.lines().collect();

    let (_, surface) = section(&lines, "surfaceelements")?;
    let boundary = surface
        .iter()
        .map(|line| indices(line, 5..8, "surface element"))
        .collect::<Result<Vec<_>>>()?;

    let (_, volume) = section(&lines, "volumeelements")?;
    let elements = volume
        .iter()
        .map(|line| indices(line, 2..6, "volume element"))
        .collect::<Result<Vec<_>>>()?;

    let (count, points) = section(&lines, "points")?;
    let mut nodes = Vec::with_capacity(count);
    for line in points {
        let mut fields = line.split_whitespace();
        let mut p = Point3::zeros();
        for k in 0..3 {
            p[k] = parse_field(fields.next(), "point coordinate")?;
        }
        nodes.push(p);
    }

    Mesh::from_parts(FeType::Tet4, nodes, elements, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TET: &str = "mesh3d
dimension
3

geomtype
0

# surfnr    bcnr   domin  domout      np      p1      p2      p3
surfaceelements
2
       1       1       1       0       3       1       3       2
       2       1       1       0       3       1       4       3

#  matnr      np      p1      p2      p3      p4
volumeelements
1
       1       4       1       2       3       4

points
4
  0.0000000000000000      0.0000000000000000      0.0000000000000000
  1.0000000000000000      0.0000000000000000      0.0000000000000000
  0.0000000000000000      1.0000000000000000      0.0000000000000000
  0.0000000000000000      0.0000000000000000      1.0000000000000000

endmesh
";

    #[test]
    fn test_parse_single_tet() {
        let mesh = parse(TET).unwrap();
        assert_eq!(mesh.fe_type(), FeType::Tet4);
        assert_eq!(mesh.elements(), &[vec![0, 1, 2, 3]]);
        assert_eq!(mesh.boundary_elements(), &[vec![0, 2, 1], vec![0, 3, 2]]);
        assert_relative_eq!(mesh.fe_volume(0), 1.0 / 6.0, epsilon = 1e-14);
        assert_eq!(mesh.be_normal(0)[2], -1.0);
    }

    #[test]
    fn test_missing_section() {
        let text = TET.replace("volumeelements", "volumes");
        assert!(matches!(parse(&text), Err(Error::MeshFormat(_))));
    }

    #[test]
    fn test_zero_index_rejected() {
        let text = TET.replace("       1       4       1       2", "       1       4       0       2");
        assert!(matches!(parse(&text), Err(Error::MeshFormat(_))));
    }
}
