//! End-to-end static analyses on programmatically built meshes.

use approx::assert_relative_eq;
use sfem_core::{Direction, FeType, Mesh, Point3, SolverType, StaticAnalysis};
use std::f64::consts::PI;

/// Rectangle [0, lx] × [y0, y0 + ly] of nx × ny Quad4 elements with the
/// boundary edges as boundary elements.
fn plate(nx: usize, ny: usize, lx: f64, y0: f64, ly: f64) -> Mesh {
    let mut mesh = Mesh::new(FeType::Quad4);
    let id = |i: usize, j: usize| j * (nx + 1) + i;
    for j in 0..=ny {
        for i in 0..=nx {
            mesh.add_node(Point3::new(
                i as f64 * lx / nx as f64,
                y0 + j as f64 * ly / ny as f64,
                0.0,
            ));
        }
    }
    for j in 0..ny {
        for i in 0..nx {
            mesh.add_element(vec![id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1)])
                .unwrap();
        }
    }
    for i in 0..nx {
        mesh.add_boundary_element(vec![id(i, 0), id(i + 1, 0)]).unwrap();
        mesh.add_boundary_element(vec![id(i + 1, ny), id(i, ny)]).unwrap();
    }
    for j in 0..ny {
        mesh.add_boundary_element(vec![id(nx, j), id(nx, j + 1)]).unwrap();
        mesh.add_boundary_element(vec![id(0, j + 1), id(0, j)]).unwrap();
    }
    mesh
}

/// Unit cube of n³ Hex8 elements.
fn cube(n: usize) -> Mesh {
    let mut mesh = Mesh::new(FeType::Hex8);
    let id = |i: usize, j: usize, k: usize| (k * (n + 1) + j) * (n + 1) + i;
    for k in 0..=n {
        for j in 0..=n {
            for i in 0..=n {
                let h = 1.0 / n as f64;
                mesh.add_node(Point3::new(i as f64 * h, j as f64 * h, k as f64 * h));
            }
        }
    }
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                mesh.add_element(vec![
                    id(i, j, k),
                    id(i + 1, j, k),
                    id(i + 1, j + 1, k),
                    id(i, j + 1, k),
                    id(i, j, k + 1),
                    id(i + 1, j, k + 1),
                    id(i + 1, j + 1, k + 1),
                    id(i, j + 1, k + 1),
                ])
                .unwrap();
            }
        }
    }
    for a in 0..n {
        for b in 0..n {
            mesh.add_boundary_element(vec![id(a, b, n), id(a + 1, b, n), id(a + 1, b + 1, n), id(a, b + 1, n)])
                .unwrap();
        }
    }
    mesh
}

/// Open cylinder of radius `r` and length `l` along z, ShellQuad4 facets
/// ordered so that the normals point outwards.
fn tube(r: f64, l: f64, n_theta: usize, n_z: usize) -> Mesh {
    let mut mesh = Mesh::new(FeType::ShellQuad4);
    let id = |i: usize, k: usize| k * n_theta + i % n_theta;
    for k in 0..=n_z {
        for i in 0..n_theta {
            let theta = 2.0 * PI * i as f64 / n_theta as f64;
            mesh.add_node(Point3::new(r * theta.cos(), r * theta.sin(), l * k as f64 / n_z as f64));
        }
    }
    for k in 0..n_z {
        for i in 0..n_theta {
            mesh.add_element(vec![id(i, k), id(i + 1, k), id(i + 1, k + 1), id(i, k + 1)])
                .unwrap();
        }
    }
    mesh
}

fn cantilever(solver: SolverType) -> StaticAnalysis {
    let mut analysis = StaticAnalysis::with_mesh(plate(160, 8, 10.0, -0.25, 0.5));
    analysis.set_solver(solver);
    analysis.add_young_modulus("203200", "").unwrap();
    analysis.add_poisson_ratio("0.27", "").unwrap();
    analysis.add_thickness("1", "").unwrap();
    analysis
        .add_boundary_condition("0", "x == 0", Direction::X | Direction::Y)
        .unwrap();
    analysis
}

/// Vertical displacement on the neutral axis at the free end.
fn tip_deflection(analysis: &StaticAnalysis) -> f64 {
    let mesh = analysis.mesh().unwrap();
    let tip = (0..mesh.n_nodes())
        .find(|&v| mesh.coords(v) == [10.0, 0.0])
        .unwrap();
    analysis.results().unwrap().value("V", tip).unwrap()
}

#[test]
fn test_cantilever_tip_load_matches_beam_theory() {
    let mut analysis = cantilever(SolverType::Sparse);
    analysis.add_point_load("-1/9", "x == 10", Direction::Y).unwrap();
    analysis.calculate().unwrap();

    // P L³ / (3 E I) with I = h³ / 12
    let expected = 0.15748;
    let v = tip_deflection(&analysis);
    assert!(v < 0.0);
    assert!((v.abs() - expected).abs() / expected < 0.05, "tip deflection {}", v);
}

#[test]
fn test_cantilever_distributed_load_matches_beam_theory() {
    let mut analysis = cantilever(SolverType::Sparse);
    analysis.add_surface_load("-1", "y == 0.25", Direction::Y).unwrap();
    analysis.calculate().unwrap();

    // q L⁴ / (8 E I)
    let expected = 0.59055;
    let v = tip_deflection(&analysis);
    assert!((v.abs() - expected).abs() / expected < 0.05, "tip deflection {}", v);

    // Bending stress at the clamped edge is tensile on top.
    let mesh = analysis.mesh().unwrap();
    let results = analysis.results().unwrap();
    let top = (0..mesh.n_nodes()).find(|&v| mesh.coords(v) == [0.0, 0.25]).unwrap();
    let bottom = (0..mesh.n_nodes()).find(|&v| mesh.coords(v) == [0.0, -0.25]).unwrap();
    assert!(results.value("Sxx", top).unwrap() > 0.0);
    assert!(results.value("Sxx", bottom).unwrap() < 0.0);
}

#[test]
fn test_bar_results_and_result_file() {
    let mut mesh = Mesh::new(FeType::Bar2);
    for i in 0..=10 {
        mesh.add_node(Point3::new(i as f64 / 10.0, 0.0, 0.0));
    }
    for i in 0..10 {
        mesh.add_element(vec![i, i + 1]).unwrap();
    }
    mesh.add_boundary_element(vec![0]).unwrap();
    mesh.add_boundary_element(vec![10]).unwrap();

    let mut analysis = StaticAnalysis::with_mesh(mesh);
    analysis.add_young_modulus("1", "").unwrap();
    analysis.add_thickness("1", "").unwrap();
    analysis.add_boundary_condition("0", "x == 0", Direction::X).unwrap();
    analysis.add_point_load("1", "x == 1", Direction::X).unwrap();
    let results = analysis.calculate().unwrap();

    for v in 0..=10 {
        assert_relative_eq!(results.value("U", v).unwrap(), v as f64 / 10.0, epsilon = 1e-10);
        assert_relative_eq!(results.value("Exx", v).unwrap(), 1.0, epsilon = 1e-10);
        assert_relative_eq!(results.value("Sxx", v).unwrap(), 1.0, epsilon = 1e-10);
    }
    let summary = results.summary();
    assert_relative_eq!(summary.get("U").unwrap().max, 1.0, epsilon = 1e-10);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bar.res");
    analysis.save_result(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "FEM Solver Results File");
    assert_eq!(lines[2], "fe1d2");
    let results_at = lines.iter().position(|&l| l == "Results").unwrap();
    assert_eq!(lines[results_at + 2], "3");
    assert_eq!(&lines[results_at + 3..results_at + 6], &["U", "0", "11"]);
    assert_eq!(lines[results_at + 16], "1.00000000e+00");
}

#[test]
fn test_cube_under_own_weight() {
    let mut analysis = StaticAnalysis::with_mesh(cube(4));
    analysis.add_young_modulus("1000", "").unwrap();
    analysis.add_poisson_ratio("0.3", "").unwrap();
    analysis.add_volume_load("-0.5", "", Direction::Z).unwrap();
    analysis.add_boundary_condition("0", "z == 0", Direction::ALL).unwrap();
    analysis.calculate().unwrap();

    let mesh = analysis.mesh().unwrap();
    let results = analysis.results().unwrap();
    let find = |x: f64, y: f64, z: f64| {
        (0..mesh.n_nodes())
            .find(|&v| mesh.coords(v) == [x, y, z])
            .unwrap()
    };

    // Settlement grows with height along the center column.
    let mut previous = 0.0;
    for k in 1..=4 {
        let w = results.value("W", find(0.5, 0.5, k as f64 / 4.0)).unwrap();
        assert!(w < previous, "W at level {} is {}", k, w);
        previous = w;
    }

    // Mirror symmetry about x = 0.5 and y = 0.5.
    for v in 0..mesh.n_nodes() {
        let c = mesh.coords(v);
        let w = results.value("W", v).unwrap();
        let mx = find(1.0 - c[0], c[1], c[2]);
        let my = find(c[0], 1.0 - c[1], c[2]);
        assert_relative_eq!(w, results.value("W", mx).unwrap(), epsilon = 1e-9);
        assert_relative_eq!(w, results.value("W", my).unwrap(), epsilon = 1e-9);
        assert_relative_eq!(
            results.value("U", v).unwrap(),
            -results.value("U", mx).unwrap(),
            epsilon = 1e-9
        );
    }

    // Vertical stress at the base carries the weight in compression.
    assert!(results.value("Szz", find(0.5, 0.5, 0.0)).unwrap() < 0.0);
}

#[test]
fn test_dense_and_sparse_solvers_agree() {
    let run = |solver: SolverType| {
        let mut analysis = StaticAnalysis::with_mesh(cube(2));
        analysis.set_solver(solver);
        analysis.set_num_threads(3).unwrap();
        analysis.add_young_modulus("210000", "").unwrap();
        analysis.add_poisson_ratio("0.25", "").unwrap();
        analysis.add_pressure_load("-10", "z == 1").unwrap();
        analysis.add_surface_load("5", "z == 1 and x < 0.75", Direction::X).unwrap();
        analysis.add_boundary_condition("0", "z == 0", Direction::ALL).unwrap();
        analysis.add_boundary_condition("0.001", "z == 0 and x == 1", Direction::Y).unwrap();
        analysis.calculate().unwrap().values().clone()
    };
    let dense = run(SolverType::Dense);
    let sparse = run(SolverType::Sparse);
    assert_eq!(dense.shape(), sparse.shape());
    for (d, s) in dense.iter().zip(sparse.iter()) {
        assert_relative_eq!(*d, *s, epsilon = 1e-9, max_relative = 1e-7);
    }
}

#[test]
fn test_region_dependent_modulus() {
    let mut analysis = StaticAnalysis::with_mesh(plate(8, 8, 2.0, 0.0, 1.0));
    analysis.add_young_modulus("2", "y > 0.5").unwrap();
    analysis.add_young_modulus("1", "").unwrap();
    analysis.add_poisson_ratio("0", "").unwrap();
    analysis.add_thickness("1", "").unwrap();
    analysis.add_boundary_condition("0", "x == 0", Direction::X).unwrap();
    analysis.add_boundary_condition("0", "x == 0 and y == 0", Direction::Y).unwrap();
    analysis.add_boundary_condition("0.01", "x == 2", Direction::X).unwrap();
    analysis.calculate().unwrap();

    let mesh = analysis.mesh().unwrap();
    let results = analysis.results().unwrap();
    let find = |x: f64, y: f64| (0..mesh.n_nodes()).find(|&v| mesh.coords(v) == [x, y]).unwrap();

    let top = results.value("Sxx", find(1.0, 1.0)).unwrap();
    let bottom = results.value("Sxx", find(1.0, 0.0)).unwrap();
    assert_relative_eq!(top, 0.01, max_relative = 1e-8);
    assert_relative_eq!(bottom, 0.005, max_relative = 1e-8);
    assert_relative_eq!(results.value("Exx", find(1.0, 0.25)).unwrap(), 0.005, max_relative = 1e-8);
    // The prescribed end displacement is honoured.
    assert_relative_eq!(results.value("U", find(2.0, 0.5)).unwrap(), 0.01, max_relative = 1e-12);
}

#[test]
fn test_boundary_predicate_selects_constrained_vertices() {
    let run = |predicate: &str| {
        let mut analysis = StaticAnalysis::with_mesh(plate(4, 2, 4.0, 0.0, 1.0));
        analysis.add_young_modulus("100", "").unwrap();
        analysis.add_poisson_ratio("0.3", "").unwrap();
        analysis.add_thickness("0.1", "").unwrap();
        analysis
            .add_boundary_condition("0", predicate, Direction::X | Direction::Y)
            .unwrap();
        analysis.add_point_load("-1", "x == 4 and y == 1", Direction::Y).unwrap();
        analysis.calculate().unwrap().clone()
    };
    let clamped = run("x == 0");
    let longer = run("x == 0 and y == 0 or x == 0 and y == 1");

    let mesh = plate(4, 2, 4.0, 0.0, 1.0);
    let middle = (0..mesh.n_nodes()).find(|&v| mesh.coords(v) == [0.0, 0.5]).unwrap();
    assert_eq!(clamped.value("U", middle), Some(0.0));
    assert_ne!(longer.value("U", middle), Some(0.0));
    let tip = (0..mesh.n_nodes()).find(|&v| mesh.coords(v) == [4.0, 1.0]).unwrap();
    assert!(longer.value("V", tip).unwrap() < clamped.value("V", tip).unwrap());
}

#[test]
fn test_pressurized_tube_hoop_displacement() {
    let (r, l, t, e, nu, p) = (1.0, 4.0, 0.0369, 1.0e4, 0.3, 1.0);
    let mut analysis = StaticAnalysis::with_mesh(tube(r, l, 32, 20));
    analysis.set_solver(SolverType::Sparse);
    analysis.add_variable("L", l);
    analysis.add_young_modulus(&e.to_string(), "").unwrap();
    analysis.add_poisson_ratio(&nu.to_string(), "").unwrap();
    analysis.add_thickness(&t.to_string(), "").unwrap();
    analysis
        .add_boundary_condition("0", "z < 1e-6 or z > L - 1e-6", Direction::ALL)
        .unwrap();
    analysis.add_pressure_load(&p.to_string(), "").unwrap();
    analysis.calculate().unwrap();

    // Membrane solution with restrained axial strain.
    let expected = p * r * r * (1.0 - nu * nu) / (e * t);
    let mesh = analysis.mesh().unwrap();
    let results = analysis.results().unwrap();
    let ring: Vec<usize> = (0..mesh.n_nodes())
        .filter(|&v| (mesh.coords(v)[2] - l / 2.0).abs() < 1e-9)
        .collect();
    assert_eq!(ring.len(), 32);
    for &v in &ring {
        let c = mesh.coords(v);
        let theta = c[1].atan2(c[0]);
        let radial = results.value("U", v).unwrap() * theta.cos()
            + results.value("V", v).unwrap() * theta.sin();
        assert!(
            (radial - expected).abs() / expected < 0.1,
            "radial displacement {} vs {}",
            radial,
            expected
        );
    }
}
