//! Gauss quadrature rules for numerical integration.
//!
//! Points are given in the natural coordinates of the reference element:
//! - line, quadrilateral and hexahedron: ξ, η, ψ ∈ [-1, 1]
//! - triangle: ξ, η ≥ 0, ξ + η ≤ 1 (area 1/2)
//! - tetrahedron: ξ, η, ψ ≥ 0, ξ + η + ψ ≤ 1 (volume 1/6)
//!
//! # Usage
//!
//! ```
//! use sfem_core::element::gauss::gauss_hex;
//!
//! let volume: f64 = gauss_hex(2).iter().map(|gp| gp.weight).sum();
//! assert!((volume - 8.0).abs() < 1e-14);
//! ```

/// A Gauss quadrature point with natural coordinates and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussPoint {
    /// Natural coordinates [ξ, η, ψ]; unused dimensions are zero.
    pub coords: [f64; 3],
    /// Integration weight.
    pub weight: f64,
}

impl GaussPoint {
    /// Create a new Gauss point.
    pub fn new(coords: [f64; 3], weight: f64) -> Self {
        Self { coords, weight }
    }

    /// Get ξ (first natural coordinate).
    #[inline]
    pub fn xi(&self) -> f64 {
        self.coords[0]
    }

    /// Get η (second natural coordinate).
    #[inline]
    pub fn eta(&self) -> f64 {
        self.coords[1]
    }

    /// Get ψ (third natural coordinate).
    #[inline]
    pub fn psi(&self) -> f64 {
        self.coords[2]
    }
}

/// Three-point rule of the two-node bar.
///
/// Abscissae at ±√(1/3) and 0 carrying the 3-point Legendre weights; the bar
/// integrand is constant, so any rule whose weights sum to 2 integrates it exactly.
pub fn gauss_bar() -> Vec<GaussPoint> {
    let p = (1.0 / 3.0_f64).sqrt();
    vec![
        GaussPoint::new([-p, 0.0, 0.0], 5.0 / 9.0),
        GaussPoint::new([0.0, 0.0, 0.0], 8.0 / 9.0),
        GaussPoint::new([p, 0.0, 0.0], 5.0 / 9.0),
    ]
}

/// 1D Gauss-Legendre quadrature points and weights on [-1, 1].
///
/// # Panics
///
/// Panics if `n` is not in 1..=3.
pub fn gauss_1d(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.0, 2.0)],
        2 => {
            let p = 1.0 / 3.0_f64.sqrt();
            vec![(-p, 1.0), (p, 1.0)]
        }
        3 => {
            let p = (3.0 / 5.0_f64).sqrt();
            vec![(-p, 5.0 / 9.0), (0.0, 8.0 / 9.0), (p, 5.0 / 9.0)]
        }
        _ => panic!("gauss_1d: n must be 1, 2, or 3, got {}", n),
    }
}

/// Triangle rule at the edge midpoints (degree 2), weight 1/6 each.
pub fn gauss_tri() -> Vec<GaussPoint> {
    let w = 1.0 / 6.0;
    vec![
        GaussPoint::new([0.0, 0.5, 0.0], w),
        GaussPoint::new([0.5, 0.0, 0.0], w),
        GaussPoint::new([0.5, 0.5, 0.0], w),
    ]
}

/// Quadrilateral tensor-product rule with `n` points per direction.
pub fn gauss_quad(n: usize) -> Vec<GaussPoint> {
    let rule_1d = gauss_1d(n);
    let mut points = Vec::with_capacity(n * n);

    for &(xi, w_xi) in &rule_1d {
        for &(eta, w_eta) in &rule_1d {
            points.push(GaussPoint::new([xi, eta, 0.0], w_xi * w_eta));
        }
    }

    points
}

/// Five-point tetrahedron rule (degree 3).
///
/// Centroid weight -4/30 (= -2/15), the other four points 9/120 (= 3/40);
/// the weights sum to the reference volume 1/6.
pub fn gauss_tet() -> Vec<GaussPoint> {
    let w_center = -4.0 / 30.0;
    let w = 9.0 / 120.0;
    let a = 0.5;
    let b = 1.0 / 6.0;
    vec![
        GaussPoint::new([0.25, 0.25, 0.25], w_center),
        GaussPoint::new([a, b, b], w),
        GaussPoint::new([b, a, b], w),
        GaussPoint::new([b, b, a], w),
        GaussPoint::new([b, b, b], w),
    ]
}

/// Hexahedral tensor-product rule with `n` points per direction.
pub fn gauss_hex(n: usize) -> Vec<GaussPoint> {
    let rule_1d = gauss_1d(n);
    let mut points = Vec::with_capacity(n * n * n);

    for &(xi, w_xi) in &rule_1d {
        for &(eta, w_eta) in &rule_1d {
            for &(psi, w_psi) in &rule_1d {
                points.push(GaussPoint::new([xi, eta, psi], w_xi * w_eta * w_psi));
            }
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gauss_1d_integrates_polynomials() {
        // 2-point rule integrates x² exactly: ∫_{-1}^{1} x² dx = 2/3
        let rule = gauss_1d(2);
        let integral: f64 = rule.iter().map(|&(x, w)| x.powi(2) * w).sum();
        assert_relative_eq!(integral, 2.0 / 3.0, epsilon = 1e-14);

        // 3-point rule integrates x⁴ exactly: 2/5
        let rule = gauss_1d(3);
        let integral: f64 = rule.iter().map(|&(x, w)| x.powi(4) * w).sum();
        assert_relative_eq!(integral, 2.0 / 5.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_bar_weights_sum() {
        let sum: f64 = gauss_bar().iter().map(|gp| gp.weight).sum();
        assert_relative_eq!(sum, 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_tri_integrates_quadratics() {
        let rule = gauss_tri();
        let area: f64 = rule.iter().map(|gp| gp.weight).sum();
        assert_relative_eq!(area, 0.5, epsilon = 1e-14);

        // ∫ ξ² dA = 1/12 over the unit triangle
        let integral: f64 = rule.iter().map(|gp| gp.xi().powi(2) * gp.weight).sum();
        assert_relative_eq!(integral, 1.0 / 12.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_tet_integrates_polynomials() {
        let rule = gauss_tet();
        let volume: f64 = rule.iter().map(|gp| gp.weight).sum();
        assert_relative_eq!(volume, 1.0 / 6.0, epsilon = 1e-14);

        // ∫ ξ dV = 1/24 and ∫ ξ η ψ dV = 1/720 over the unit tetrahedron
        let linear: f64 = rule.iter().map(|gp| gp.xi() * gp.weight).sum();
        assert_relative_eq!(linear, 1.0 / 24.0, epsilon = 1e-14);
        let cubic: f64 = rule
            .iter()
            .map(|gp| gp.xi() * gp.eta() * gp.psi() * gp.weight)
            .sum();
        assert_relative_eq!(cubic, 1.0 / 720.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_quad_and_hex_weights_sum() {
        let area: f64 = gauss_quad(2).iter().map(|gp| gp.weight).sum();
        assert_relative_eq!(area, 4.0, epsilon = 1e-14);
        let volume: f64 = gauss_hex(2).iter().map(|gp| gp.weight).sum();
        assert_relative_eq!(volume, 8.0, epsilon = 1e-14);
        assert_eq!(gauss_hex(2).len(), 8);
    }

    #[test]
    #[should_panic(expected = "gauss_1d: n must be")]
    fn test_gauss_1d_invalid_n() {
        gauss_1d(5);
    }
}
