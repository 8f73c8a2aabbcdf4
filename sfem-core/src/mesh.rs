//! Mesh data structure.
//!
//! Stores nodal coordinates, finite element connectivity, boundary element
//! connectivity and the vertex adjacency map. A mesh holds a single element
//! type. Loaders for the supported file formats live in the submodules:
//!
//! - [`native`] - whitespace-delimited `.mesh` files (read and write)
//! - [`netgen`] - Netgen `.vol` files
//! - [`gmsh`] - Gmsh `.msh` version 4 files

use crate::element::shape::ShapeKind;
use crate::error::{Error, Result};
use crate::linalg::{point, volume_1d2, volume_2d3, volume_2d4, volume_3d4, volume_3d8};
use crate::types::Point3;
use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

pub mod gmsh;
pub mod native;
pub mod netgen;

/// Supported finite element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeType {
    /// 2-node bar (1D).
    Bar2,
    /// 3-node triangle (plane stress).
    Tri3,
    /// 4-node quadrilateral (plane stress).
    Quad4,
    /// 4-node tetrahedron.
    Tet4,
    /// 8-node hexahedron.
    Hex8,
    /// 3-node flat shell.
    ShellTri3,
    /// 4-node flat shell.
    ShellQuad4,
}

impl FeType {
    /// All element types.
    pub const ALL: [FeType; 7] = [
        FeType::Bar2,
        FeType::Tri3,
        FeType::Quad4,
        FeType::Tet4,
        FeType::Hex8,
        FeType::ShellTri3,
        FeType::ShellQuad4,
    ];

    /// Nodes per boundary element.
    pub fn be_size(self) -> usize {
        match self {
            FeType::Bar2 => 1,
            FeType::Tri3 | FeType::Quad4 => 2,
            FeType::Tet4 | FeType::ShellTri3 => 3,
            FeType::Hex8 | FeType::ShellQuad4 => 4,
        }
    }

    /// Nodes per finite element.
    pub fn fe_size(self) -> usize {
        match self {
            FeType::Bar2 => 2,
            FeType::Tri3 | FeType::ShellTri3 => 3,
            FeType::Quad4 | FeType::Tet4 | FeType::ShellQuad4 => 4,
            FeType::Hex8 => 8,
        }
    }

    /// Spatial dimension of the vertex coordinates.
    pub fn dim(self) -> usize {
        match self {
            FeType::Bar2 => 1,
            FeType::Tri3 | FeType::Quad4 => 2,
            FeType::Tet4 | FeType::Hex8 | FeType::ShellTri3 | FeType::ShellQuad4 => 3,
        }
    }

    /// Degrees of freedom per vertex.
    pub fn dof(self) -> usize {
        match self {
            FeType::ShellTri3 | FeType::ShellQuad4 => 6,
            other => other.dim(),
        }
    }

    /// Whether this is a shell type (boundary elements alias finite elements).
    pub fn is_shell(self) -> bool {
        matches!(self, FeType::ShellTri3 | FeType::ShellQuad4)
    }

    /// Reference shape of the finite elements.
    pub fn shape_kind(self) -> ShapeKind {
        match self {
            FeType::Bar2 => ShapeKind::Line2,
            FeType::Tri3 | FeType::ShellTri3 => ShapeKind::Tri3,
            FeType::Quad4 | FeType::ShellQuad4 => ShapeKind::Quad4,
            FeType::Tet4 => ShapeKind::Tet4,
            FeType::Hex8 => ShapeKind::Hex8,
        }
    }

    /// Tag used in native mesh and result files.
    pub fn tag(self) -> &'static str {
        match self {
            FeType::Bar2 => "fe1d2",
            FeType::Tri3 => "fe2d3",
            FeType::Quad4 => "fe2d4",
            FeType::Tet4 => "fe3d4",
            FeType::Hex8 => "fe3d8",
            FeType::ShellTri3 => "fe3d3s",
            FeType::ShellQuad4 => "fe3d4s",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeType::Bar2 => "two-node bar",
            FeType::Tri3 => "three-node plane stress triangle",
            FeType::Quad4 => "four-node plane stress quadrilateral",
            FeType::Tet4 => "four-node tetrahedron",
            FeType::Hex8 => "eight-node hexahedron",
            FeType::ShellTri3 => "three-node triangular shell",
            FeType::ShellQuad4 => "four-node quadrilateral shell",
        }
    }
}

impl FromStr for FeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FeType::ALL
            .into_iter()
            .find(|t| t.tag() == s.trim())
            .ok_or_else(|| Error::Config(format!("unknown element type '{}'", s.trim())))
    }
}

impl fmt::Display for FeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Finite element mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    fe_type: FeType,
    /// Vertex coordinates; components beyond `dim` are zero.
    nodes: Vec<Point3>,
    elements: Vec<Vec<usize>>,
    /// Boundary elements; always empty for shells, which use `elements`.
    boundary: Vec<Vec<usize>>,
    /// For each vertex v, the sorted vertices u ≥ v sharing an element with v.
    mesh_map: Vec<Vec<usize>>,
}

impl Mesh {
    /// Create a new empty mesh of `fe_type` elements.
    pub fn new(fe_type: FeType) -> Self {
        Self {
            fe_type,
            nodes: Vec::new(),
            elements: Vec::new(),
            boundary: Vec::new(),
            mesh_map: Vec::new(),
        }
    }

    /// Build a mesh from raw parts, validating it and creating the mesh map.
    pub fn from_parts(
        fe_type: FeType,
        nodes: Vec<Point3>,
        elements: Vec<Vec<usize>>,
        boundary: Vec<Vec<usize>>,
    ) -> Result<Self> {
        let mut mesh = Self {
            fe_type,
            nodes,
            elements,
            boundary: if fe_type.is_shell() { Vec::new() } else { boundary },
            mesh_map: Vec::new(),
        };
        mesh.validate()?;
        mesh.create_mesh_map();
        Ok(mesh)
    }

    /// Load a mesh, choosing the format from the file extension (`.mesh`, `.vol`, `.msh`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let text = std::fs::read_to_string(path)?;
        let mesh = match extension.as_str() {
            "mesh" => native::parse(&text)?,
            "vol" => netgen::parse(&text)?,
            "msh" => gmsh::parse(&text)?,
            _ => {
                return Err(Error::MeshFormat(format!(
                    "unknown mesh format: {}",
                    path.display()
                )))
            }
        };
        log::info!(
            "loaded mesh {}: {} vertices, {} elements, {} boundary elements ({})",
            path.display(),
            mesh.n_nodes(),
            mesh.n_elements(),
            mesh.n_boundary_elements(),
            mesh.fe_type
        );
        Ok(mesh)
    }

    /// Save in the native `.mesh` format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        native::write(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    /// Add a vertex, returning its index. Components beyond the mesh dimension are dropped.
    pub fn add_node(&mut self, point: Point3) -> usize {
        let mut p = Point3::zeros();
        for k in 0..self.dim() {
            p[k] = point[k];
        }
        self.nodes.push(p);
        self.mesh_map.clear();
        self.nodes.len() - 1
    }

    fn check_connectivity(&self, nodes: &[usize], size: usize, what: &str) -> Result<()> {
        if nodes.len() != size {
            return Err(Error::MeshFormat(format!(
                "{} of type {} requires {} nodes, got {}",
                what,
                self.fe_type,
                size,
                nodes.len()
            )));
        }
        if let Some(&bad) = nodes.iter().find(|&&n| n >= self.nodes.len()) {
            return Err(Error::MeshFormat(format!(
                "{} node index {} out of bounds (mesh has {} nodes)",
                what,
                bad,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    /// Add a finite element, returning its index.
    pub fn add_element(&mut self, nodes: Vec<usize>) -> Result<usize> {
        self.check_connectivity(&nodes, self.fe_type.fe_size(), "element")?;
        self.elements.push(nodes);
        self.mesh_map.clear();
        Ok(self.elements.len() - 1)
    }

    /// Add a boundary element, returning its index.
    pub fn add_boundary_element(&mut self, nodes: Vec<usize>) -> Result<usize> {
        if self.fe_type.is_shell() {
            return Err(Error::MeshFormat(
                "shell meshes use their finite elements as boundary elements".into(),
            ));
        }
        self.check_connectivity(&nodes, self.fe_type.be_size(), "boundary element")?;
        self.boundary.push(nodes);
        Ok(self.boundary.len() - 1)
    }

    /// Element type.
    pub fn fe_type(&self) -> FeType {
        self.fe_type
    }

    /// Spatial dimension.
    pub fn dim(&self) -> usize {
        self.fe_type.dim()
    }

    /// Degrees of freedom per vertex.
    pub fn dof(&self) -> usize {
        self.fe_type.dof()
    }

    /// Number of vertices.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of finite elements.
    pub fn n_elements(&self) -> usize {
        self.elements.len()
    }

    /// Number of boundary elements.
    pub fn n_boundary_elements(&self) -> usize {
        self.boundary_elements().len()
    }

    /// Vertex coordinates.
    pub fn nodes(&self) -> &[Point3] {
        &self.nodes
    }

    /// Coordinates of vertex `i`, `dim` components.
    pub fn coords(&self, i: usize) -> &[f64] {
        &self.nodes[i].as_slice()[..self.dim()]
    }

    /// Finite element connectivity.
    pub fn elements(&self) -> &[Vec<usize>] {
        &self.elements
    }

    /// Boundary element connectivity (the finite elements for shells).
    pub fn boundary_elements(&self) -> &[Vec<usize>] {
        if self.fe_type.is_shell() {
            &self.elements
        } else {
            &self.boundary
        }
    }

    fn coord_matrix(&self, nodes: &[usize]) -> DMatrix<f64> {
        DMatrix::from_fn(nodes.len(), self.dim(), |i, k| self.nodes[nodes[i]][k])
    }

    fn center(&self, nodes: &[usize]) -> Vec<f64> {
        let mut c = vec![0.0; self.dim()];
        for &n in nodes {
            for (k, value) in c.iter_mut().enumerate() {
                *value += self.nodes[n][k];
            }
        }
        c.iter_mut().for_each(|v| *v /= nodes.len() as f64);
        c
    }

    /// Nodal coordinates of element `i` (fe_size × dim).
    pub fn fe_coord(&self, i: usize) -> DMatrix<f64> {
        self.coord_matrix(&self.elements[i])
    }

    /// Nodal coordinates of boundary element `i` (be_size × dim).
    pub fn be_coord(&self, i: usize) -> DMatrix<f64> {
        self.coord_matrix(&self.boundary_elements()[i])
    }

    /// Centroid of element `i`.
    pub fn fe_center(&self, i: usize) -> Vec<f64> {
        self.center(&self.elements[i])
    }

    /// Centroid of boundary element `i`.
    pub fn be_center(&self, i: usize) -> Vec<f64> {
        self.center(&self.boundary_elements()[i])
    }

    /// Length, area or volume of element `i`.
    pub fn fe_volume(&self, i: usize) -> f64 {
        let x = self.fe_coord(i);
        match self.fe_type {
            FeType::Bar2 => volume_1d2(&x),
            FeType::Tri3 | FeType::ShellTri3 => volume_2d3(&x),
            FeType::Quad4 | FeType::ShellQuad4 => volume_2d4(&x),
            FeType::Tet4 => volume_3d4(&x),
            FeType::Hex8 => volume_3d8(&x),
        }
    }

    /// Measure of boundary element `i` (1 for the end points of bars).
    pub fn be_volume(&self, i: usize) -> f64 {
        let x = self.be_coord(i);
        match self.fe_type {
            FeType::Bar2 => 1.0,
            FeType::Tri3 | FeType::Quad4 => volume_1d2(&x),
            FeType::Tet4 | FeType::ShellTri3 => volume_2d3(&x),
            FeType::Hex8 | FeType::ShellQuad4 => volume_2d4(&x),
        }
    }

    /// Unit normal of boundary element `i`.
    ///
    /// The axis in 1D, the edge rotated by +90° in 2D, and
    /// `(x1 - x0) × (x2 - x0)` in 3D; outward for counter-clockwise ordering
    /// seen from outside.
    pub fn be_normal(&self, i: usize) -> Vector3<f64> {
        let x = self.be_coord(i);
        let n = match self.dim() {
            1 => Vector3::x(),
            2 => Vector3::new(x[(0, 1)] - x[(1, 1)], x[(1, 0)] - x[(0, 0)], 0.0),
            _ => {
                let p0 = point(&x, 0);
                (point(&x, 1) - p0).cross(&(point(&x, 2) - p0))
            }
        };
        n.try_normalize(0.0).unwrap_or_else(Vector3::zeros)
    }

    /// Build the vertex adjacency map.
    pub fn create_mesh_map(&mut self) {
        let mut incident = vec![Vec::new(); self.nodes.len()];
        for (e, nodes) in self.elements.iter().enumerate() {
            for &v in nodes {
                incident[v].push(e);
            }
        }

        let elements = &self.elements;
        self.mesh_map = incident
            .par_iter()
            .enumerate()
            .map(|(v, incident)| {
                let mut neighbours: Vec<usize> = incident
                    .iter()
                    .flat_map(|&e| elements[e].iter().copied())
                    .filter(|&u| u >= v)
                    .collect();
                neighbours.sort_unstable();
                neighbours.dedup();
                neighbours
            })
            .collect();
    }

    /// Vertex adjacency map (empty until [`Mesh::create_mesh_map`] ran).
    pub fn mesh_map(&self) -> &[Vec<usize>] {
        &self.mesh_map
    }

    /// Check connectivity bounds and sizes and that every element has a positive measure.
    pub fn validate(&self) -> Result<()> {
        for nodes in &self.elements {
            self.check_connectivity(nodes, self.fe_type.fe_size(), "element")?;
        }
        for nodes in &self.boundary {
            self.check_connectivity(nodes, self.fe_type.be_size(), "boundary element")?;
        }

        (0..self.elements.len()).into_par_iter().try_for_each(|i| {
            let volume = self.fe_volume(i);
            if volume > 0.0 && volume.is_finite() {
                Ok(())
            } else {
                Err(Error::MeshFormat(format!(
                    "element {} has non-positive volume {}",
                    i, volume
                )))
            }
        })
    }

    /// Compute mesh bounding box.
    pub fn bounds(&self) -> Option<(Point3, Point3)> {
        let first = *self.nodes.first()?;
        let (mut min, mut max) = (first, first);

        for node in &self.nodes[1..] {
            for i in 0..3 {
                min[i] = min[i].min(node[i]);
                max[i] = max[i].max(node[i]);
            }
        }

        Some((min, max))
    }
}

/// Parse one field of a mesh file, reporting `what` on failure.
pub(crate) fn parse_field<T: FromStr>(token: Option<&str>, what: &str) -> Result<T> {
    let token = token
        .ok_or_else(|| Error::MeshFormat(format!("unexpected end of file reading {}", what)))?;
    token
        .parse()
        .map_err(|_| Error::MeshFormat(format!("invalid {} '{}'", what, token)))
}
