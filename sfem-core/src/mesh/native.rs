//! Native `.mesh` format.
//!
//! Whitespace-delimited tokens:
//!
//! ```text
//! <type tag>
//! <vertex count>
//! <dim coordinates per vertex>
//! <element count>
//! <fe_size 0-based indices per element>
//! <boundary element count>
//! <be_size 0-based indices per boundary element>
//! ```
//!
//! Shell meshes omit the boundary section; a trailing one is accepted and
//! ignored since boundary elements alias the finite elements.

use super::{parse_field, FeType, Mesh};
use crate::error::Result;
use crate::types::Point3;
use std::io::Write;

fn read_connectivity<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    size: usize,
    what: &str,
) -> Result<Vec<Vec<usize>>> {
    let count: usize = parse_field(tokens.next(), &format!("{} count", what))?;
    (0..count)
        .map(|_| {
            (0..size)
                .map(|_| parse_field(tokens.next(), &format!("{} index", what)))
                .collect()
        })
        .collect()
}

/// Parse the contents of a `.mesh` file.
pub fn parse(text: &str) -> Result<Mesh> {
    let mut tokens = text.split_whitespace();
    let fe_type: FeType = parse_field::<String>(tokens.next(), "element type")?.parse()?;
    let dim = fe_type.dim();

    let n_nodes: usize = parse_field(tokens.next(), "vertex count")?;
    let mut nodes = Vec::with_capacity(n_nodes);
    for _ in 0..n_nodes {
        let mut p = Point3::zeros();
        for k in 0..dim {
            p[k] = parse_field(tokens.next(), "coordinate")?;
        }
        nodes.push(p);
    }

    let elements = read_connectivity(&mut tokens, fe_type.fe_size(), "element")?;
    let boundary = if fe_type.is_shell() {
        if tokens.clone().next().is_some() {
            read_connectivity(&mut tokens, fe_type.be_size(), "boundary element")?;
        }
        Vec::new()
    } else {
        read_connectivity(&mut tokens, fe_type.be_size(), "boundary element")?
    };

    Mesh::from_parts(fe_type, nodes, elements, boundary)
}

fn write_connectivity(out: &mut impl Write, connectivity: &[Vec<usize>]) -> std::io::Result<()> {
    writeln!(out, "{}", connectivity.len())?;
    for nodes in connectivity {
        let line: Vec<String> = nodes.iter().map(usize::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    Ok(())
}

/// Write `mesh` in the native format.
///
/// Coordinates use the shortest representation that reads back to the same `f64`.
pub fn write(out: &mut impl Write, mesh: &Mesh) -> Result<()> {
    writeln!(out, "{}", mesh.fe_type())?;
    writeln!(out, "{}", mesh.n_nodes())?;
    for i in 0..mesh.n_nodes() {
        let line: Vec<String> = mesh.coords(i).iter().map(f64::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    write_connectivity(out, mesh.elements())?;
    if !mesh.fe_type().is_shell() {
        write_connectivity(out, mesh.boundary_elements())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SQUARE: &str = "fe2d4
4
0 0  1 0  1 1  0 1
1
0 1 2 3
4
0 1  1 2  2 3  3 0
";

    #[test]
    fn test_parse_quad() {
        let mesh = parse(SQUARE).unwrap();
        assert_eq!(mesh.fe_type(), FeType::Quad4);
        assert_eq!(mesh.n_nodes(), 4);
        assert_eq!(mesh.coords(2), &[1.0, 1.0]);
        assert_eq!(mesh.elements(), &[vec![0, 1, 2, 3]]);
        assert_eq!(mesh.n_boundary_elements(), 4);
        assert_eq!(mesh.mesh_map()[0], vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_write_then_parse_preserves_mesh() {
        let mesh = parse(SQUARE).unwrap();
        let mut buffer = Vec::new();
        write(&mut buffer, &mesh).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("fe2d4\n4\n0 0\n1 0\n"));
        let again = parse(&text).unwrap();
        assert_eq!(again.elements(), mesh.elements());
        assert_eq!(again.boundary_elements(), mesh.boundary_elements());
        assert_eq!(again.nodes(), mesh.nodes());
    }

    #[test]
    fn test_write_keeps_full_coordinate_precision() {
        let text = "fe1d2\n3\n0\n1.234567890123e-7\n0.1\n2\n0 1\n1 2\n2\n0\n2\n";
        let mesh = parse(text).unwrap();
        let mut buffer = Vec::new();
        write(&mut buffer, &mesh).unwrap();
        let again = parse(&String::from_utf8(buffer).unwrap()).unwrap();
        assert_eq!(again.coords(1), &[1.234567890123e-7]);
        assert_eq!(again.nodes(), mesh.nodes());
    }

    #[test]
    fn test_shell_without_boundary_section() {
        let text = "fe3d3s 3  0 0 0  1 0 0  0 1 0  1  0 1 2";
        let mesh = parse(text).unwrap();
        assert_eq!(mesh.fe_type(), FeType::ShellTri3);
        assert_eq!(mesh.boundary_elements(), mesh.elements());

        // A trailing boundary section is tolerated.
        let mesh = parse(&format!("{} 1 0 1 2", text)).unwrap();
        assert_eq!(mesh.n_boundary_elements(), 1);
    }

    #[test]
    fn test_malformed_files() {
        assert!(matches!(parse("fe9d9 0 0 0"), Err(Error::Config(_))));
        assert!(matches!(parse("fe2d3 3 0 0 1 0"), Err(Error::MeshFormat(_))));
        assert!(matches!(parse("fe2d3 1 0 0 x"), Err(Error::MeshFormat(_))));
        // Index out of range.
        assert!(matches!(
            parse("fe1d2 2 0 1 1 0 2 0"),
            Err(Error::MeshFormat(_))
        ));
    }
}
