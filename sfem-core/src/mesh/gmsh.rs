//! Gmsh `.msh` version 4 reader (ASCII).
//!
//! Reads the `$Nodes` and `$Elements` blocks. The mesh is two-dimensional
//! when every node has |z| ≤ 1e-10; then 3-node triangles are finite
//! elements and 2-node lines are boundary elements. In 3D, tetrahedra are
//! finite elements and triangles are boundary elements; a 3D file without
//! tetrahedra becomes a ShellTri3 mesh built from its triangles.

use super::{parse_field, FeType, Mesh};
use crate::error::{Error, Result};
use crate::types::Point3;
use std::collections::HashMap;

const PLANAR_TOLERANCE: f64 = 1e-10;

const LINE2: usize = 1;
const TRIANGLE3: usize = 2;
const TETRAHEDRON4: usize = 4;

struct Lines<'a> {
    inner: std::iter::Map<std::str::Lines<'a>, fn(&str) -> &str>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().map(str::trim as fn(&str) -> &str),
        }
    }

    fn next_line(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| Error::MeshFormat(format!("unexpected end of file reading {}", what)))
    }

    /// Advance past the line equal to `header`.
    fn seek(&mut self, header: &str) -> Result<()> {
        self.inner
            .by_ref()
            .find(|line| *line == header)
            .map(|_| ())
            .ok_or_else(|| Error::MeshFormat(format!("missing {} block", header)))
    }

    fn expect(&mut self, header: &str) -> Result<()> {
        let line = self.next_line(header)?;
        if line == header {
            Ok(())
        } else {
            Err(Error::MeshFormat(format!("expected {}, found '{}'", header, line)))
        }
    }
}

fn fields<const N: usize>(line: &str, what: &str) -> Result<[usize; N]> {
    let mut tokens = line.split_whitespace();
    let mut out = [0; N];
    for value in out.iter_mut() {
        *value = parse_field(tokens.next(), what)?;
    }
    Ok(out)
}

fn read_nodes(lines: &mut Lines<'_>) -> Result<(Vec<Point3>, HashMap<usize, usize>)> {
    let [n_blocks, n_nodes] = fields::<2>(lines.next_line("$Nodes header")?, "$Nodes header")?;
    let mut nodes = Vec::with_capacity(n_nodes);
    let mut index = HashMap::with_capacity(n_nodes);

    for _ in 0..n_blocks {
        let [_, _, _, count] = fields::<4>(lines.next_line("node block")?, "node block header")?;
        let mut tags = Vec::with_capacity(count);
        for _ in 0..count {
            tags.push(parse_field::<usize>(Some(lines.next_line("node tag")?), "node tag")?);
        }
        for tag in tags {
            let mut tokens = lines.next_line("node coordinates")?.split_whitespace();
            let mut p = Point3::zeros();
            for k in 0..3 {
                p[k] = parse_field(tokens.next(), "node coordinate")?;
            }
            if index.insert(tag, nodes.len()).is_some() {
                return Err(Error::MeshFormat(format!("duplicate node tag {}", tag)));
            }
            nodes.push(p);
        }
    }
    lines.expect("$EndNodes")?;
    Ok((nodes, index))
}

/// Parse the contents of a `.msh` file.
pub fn parse(text: &str) -> Result<Mesh> {
    let mut lines = Lines::new(text);
    lines.expect("$MeshFormat")?;
    let version = lines.next_line("format version")?;
    if !version.starts_with('4') {
        return Err(Error::MeshFormat(format!(
            "unsupported MSH version '{}', expected 4.x ASCII",
            version
        )));
    }

    lines.seek("$Nodes")?;
    let (mut nodes, index) = read_nodes(&mut lines)?;
    let planar = nodes.iter().all(|p| p.z.abs() <= PLANAR_TOLERANCE);

    lines.seek("$Elements")?;
    let [n_blocks] = fields::<1>(lines.next_line("$Elements header")?, "$Elements header")?;
    let mut elements = Vec::new();
    let mut boundary = Vec::new();

    for _ in 0..n_blocks {
        let [dim, _, element_type, count] =
            fields::<4>(lines.next_line("element block")?, "element block header")?;
        let skip = dim == 0 || (dim == 1 && !planar);

        for _ in 0..count {
            let line = lines.next_line("element")?;
            if skip {
                continue;
            }
            let connectivity = line
                .split_whitespace()
                .skip(1)
                .map(|tag| {
                    let tag: usize = parse_field(Some(tag), "element node tag")?;
                    index
                        .get(&tag)
                        .copied()
                        .ok_or_else(|| Error::MeshFormat(format!("unknown node tag {}", tag)))
                })
                .collect::<Result<Vec<_>>>()?;

            match (element_type, planar) {
                (LINE2, true) => boundary.push(connectivity),
                (TRIANGLE3, true) => elements.push(connectivity),
                (TRIANGLE3, false) => boundary.push(connectivity),
                (TETRAHEDRON4, false) => elements.push(connectivity),
                (other, _) => {
                    return Err(Error::MeshFormat(format!(
                        "unsupported element type {} in {} mesh",
                        other,
                        if planar { "2D" } else { "3D" }
                    )))
                }
            }
        }
    }
    lines.expect("$EndElements")?;

    let fe_type = if planar {
        for p in nodes.iter_mut() {
            p.z = 0.0;
        }
        FeType::Tri3
    } else if elements.is_empty() {
        elements = std::mem::take(&mut boundary);
        FeType::ShellTri3
    } else {
        FeType::Tet4
    };

    Mesh::from_parts(fe_type, nodes, elements, boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> String {
        format!(
            "$MeshFormat
4.1 0 8
$EndMeshFormat
$Nodes
2 4 1 4
0 1 0 1
10
0 0 0
2 1 0 3
11
12
13
1 0 0
1 1 {z}
0 1 0
$EndNodes
$Elements
3 4 1 4
0 1 15 1
1 10
1 1 1 1
2 10 11
2 1 2 2
3 10 11 12
4 10 12 13
$EndElements
"
        )
    }

    #[test]
    fn test_planar_mesh_is_tri3() {
        let mesh = parse(&square(0.0)).unwrap();
        assert_eq!(mesh.fe_type(), FeType::Tri3);
        assert_eq!(mesh.n_nodes(), 4);
        assert_eq!(mesh.elements(), &[vec![0, 1, 2], vec![0, 2, 3]]);
        assert_eq!(mesh.boundary_elements(), &[vec![0, 1]]);
    }

    #[test]
    fn test_surface_mesh_becomes_shell() {
        let mesh = parse(&square(0.5)).unwrap();
        assert_eq!(mesh.fe_type(), FeType::ShellTri3);
        assert_eq!(mesh.n_elements(), 2);
        assert_eq!(mesh.boundary_elements(), mesh.elements());
    }

    #[test]
    fn test_rejects_other_versions_and_unknown_tags() {
        let old = square(0.0).replace("4.1 0 8", "2.2 0 8");
        assert!(matches!(parse(&old), Err(Error::MeshFormat(_))));
        let bad = square(0.0).replace("4 10 12 13", "4 10 12 99");
        assert!(matches!(parse(&bad), Err(Error::MeshFormat(_))));
    }

    #[test]
    fn test_tetrahedra_in_planar_mesh_rejected() {
        let text = square(0.0).replace("2 1 2 2", "2 1 4 2");
        assert!(matches!(parse(&text), Err(Error::MeshFormat(_))));
    }
}
