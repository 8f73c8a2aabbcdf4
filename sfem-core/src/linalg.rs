//! Small dense linear algebra and geometry helpers.
//!
//! Coordinate matrices follow the mesh convention: one row per node, one
//! column per spatial dimension.

use crate::error::{Error, Result};
use nalgebra::{DMatrix, Matrix3, Vector3};

/// Solve `A X = B` by Gauss elimination with partial pivoting.
///
/// Fails when a pivot falls below `eps` in magnitude.
pub fn gauss_solve(mut a: DMatrix<f64>, mut b: DMatrix<f64>, eps: f64) -> Result<DMatrix<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(Error::Numeric(format!(
            "gauss elimination: incompatible sizes {}x{} and {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }

    for k in 0..n {
        let pivot = (k..n)
            .max_by(|&i, &j| a[(i, k)].abs().total_cmp(&a[(j, k)].abs()))
            .unwrap_or(k);
        if a[(pivot, k)].abs() < eps {
            return Err(Error::Numeric(format!(
                "gauss elimination: matrix is singular at column {}",
                k
            )));
        }
        if pivot != k {
            a.swap_rows(pivot, k);
            b.swap_rows(pivot, k);
        }

        for i in k + 1..n {
            let factor = a[(i, k)] / a[(k, k)];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                a[(i, j)] -= factor * a[(k, j)];
            }
            for j in 0..b.ncols() {
                b[(i, j)] -= factor * b[(k, j)];
            }
        }
    }

    let mut x = DMatrix::zeros(n, b.ncols());
    for col in 0..b.ncols() {
        for i in (0..n).rev() {
            let mut sum = b[(i, col)];
            for j in i + 1..n {
                sum -= a[(i, j)] * x[(j, col)];
            }
            x[(i, col)] = sum / a[(i, i)];
        }
    }
    Ok(x)
}

/// Inverse of a square matrix via [`gauss_solve`].
pub fn invert(a: &DMatrix<f64>, eps: f64) -> Result<DMatrix<f64>> {
    gauss_solve(a.clone(), DMatrix::identity(a.nrows(), a.nrows()), eps)
}

fn distance(x: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    (x.row(i) - x.row(j)).norm()
}

/// Row `i` of a coordinate matrix as a 3D point, padding missing dimensions with zero.
pub fn point(x: &DMatrix<f64>, i: usize) -> Vector3<f64> {
    let mut p = Vector3::zeros();
    for k in 0..x.ncols().min(3) {
        p[k] = x[(i, k)];
    }
    p
}

/// Length of a 2-node segment.
pub fn volume_1d2(x: &DMatrix<f64>) -> f64 {
    distance(x, 0, 1)
}

/// Area of a triangle (Heron's formula).
pub fn volume_2d3(x: &DMatrix<f64>) -> f64 {
    let a = distance(x, 0, 1);
    let b = distance(x, 1, 2);
    let c = distance(x, 2, 0);
    let p = 0.5 * (a + b + c);
    (p * (p - a) * (p - b) * (p - c)).max(0.0).sqrt()
}

/// Area of a quadrilateral from its sides and diagonals (Bretschneider's formula).
pub fn volume_2d4(x: &DMatrix<f64>) -> f64 {
    let a = distance(x, 0, 1);
    let b = distance(x, 1, 2);
    let c = distance(x, 2, 3);
    let d = distance(x, 3, 0);
    let e = distance(x, 0, 2);
    let f = distance(x, 1, 3);
    let p = 0.5 * (a + b + c + d);
    let sides = (p - a) * (p - b) * (p - c) * (p - d);
    let diagonals = 0.25 * (e * f + a * c + b * d) * (e * f - a * c - b * d);
    (sides + diagonals).max(0.0).sqrt()
}

/// Volume of a tetrahedron.
pub fn volume_3d4(x: &DMatrix<f64>) -> f64 {
    let p0 = point(x, 0);
    let m = Matrix3::from_rows(&[
        (point(x, 1) - p0).transpose(),
        (point(x, 2) - p0).transpose(),
        (point(x, 3) - p0).transpose(),
    ]);
    m.determinant().abs() / 6.0
}

/// Split of a hexahedron into tetrahedra sharing the diagonal 1-7.
const HEX_TETS: [[usize; 4]; 6] = [
    [0, 1, 4, 7],
    [4, 1, 5, 7],
    [1, 2, 6, 7],
    [1, 5, 6, 7],
    [1, 2, 3, 7],
    [0, 3, 1, 7],
];

/// Volume of a hexahedron as the sum of six tetrahedra.
pub fn volume_3d8(x: &DMatrix<f64>) -> f64 {
    HEX_TETS
        .iter()
        .map(|tet| volume_3d4(&x.select_rows(tet.iter())))
        .sum()
}

/// Orthonormal local basis of a flat element, rows `(vx, vy, vz)`.
///
/// `vx` runs along the edge 0-1 and `vz` is the normal of the plane through
/// nodes 0, 1 and 2.
pub fn local_basis(x: &DMatrix<f64>) -> Result<Matrix3<f64>> {
    let p0 = point(x, 0);
    let vx = (point(x, 1) - p0)
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| Error::Numeric("degenerate shell element: zero-length edge".into()))?;
    let tmp = (point(x, 2) - p0)
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| Error::Numeric("degenerate shell element: zero-length edge".into()))?;
    let vz = vx
        .cross(&tmp)
        .try_normalize(f64::EPSILON)
        .ok_or_else(|| Error::Numeric("degenerate shell element: collinear nodes".into()))?;
    let vy = vz.cross(&vx).normalize();
    Ok(Matrix3::from_rows(&[vx.transpose(), vy.transpose(), vz.transpose()]))
}

/// Block-diagonal expansion of a 3×3 rotation over `n` consecutive triples.
pub fn expand_basis(t: &Matrix3<f64>, n: usize) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(3 * n, 3 * n);
    for block in 0..n {
        m.fixed_view_mut::<3, 3>(3 * block, 3 * block).copy_from(t);
    }
    m
}
