//! Problem parameters: materials, loads and boundary conditions.
//!
//! Every parameter record carries a value expression, an optional predicate
//! selecting the region it applies to, and a direction mask for loads and
//! boundary conditions. Records are kept in insertion order, which is also
//! their priority: material lookups return the first record whose predicate
//! holds.

use crate::error::{Error, Result};
use crate::expression::{Environment, Expression};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Default numeric tolerance.
pub const DEFAULT_EPS: f64 = 1e-10;

/// Kind of a parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    YoungModulus,
    PoissonRatio,
    Thickness,
    BoundaryCondition,
    PointLoad,
    VolumeLoad,
    SurfaceLoad,
    PressureLoad,
}

/// Set of coordinate axes a load or boundary condition acts along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Direction(u8);

impl Direction {
    pub const NONE: Direction = Direction(0);
    pub const X: Direction = Direction(1);
    pub const Y: Direction = Direction(2);
    pub const Z: Direction = Direction(4);
    pub const ALL: Direction = Direction(7);

    /// Direction from its bitmask (X = 1, Y = 2, Z = 4).
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits & !Self::ALL.0 == 0 {
            Ok(Direction(bits))
        } else {
            Err(Error::Config(format!("invalid direction mask {}", bits)))
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether axis `l` (0 = x, 1 = y, 2 = z) is selected.
    pub fn contains_axis(self, l: usize) -> bool {
        l < 3 && self.0 & (1 << l) != 0
    }

    /// Selected axes below `dim`.
    pub fn axes(self, dim: usize) -> impl Iterator<Item = usize> {
        (0..dim.min(3)).filter(move |&l| self.contains_axis(l))
    }
}

impl BitOr for Direction {
    type Output = Direction;

    fn bitor(self, rhs: Direction) -> Direction {
        Direction(self.0 | rhs.0)
    }
}

impl FromStr for Direction {
    type Err = Error;

    /// Parse `X`, `Y`, `Z` joined by `|`, case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let mut direction = Direction::NONE;
        for part in s.split('|') {
            direction = direction
                | match part.trim().to_ascii_uppercase().as_str() {
                    "X" => Direction::X,
                    "Y" => Direction::Y,
                    "Z" => Direction::Z,
                    _ => return Err(Error::Config(format!("invalid direction '{}'", s))),
                };
        }
        Ok(direction)
    }
}

impl TryFrom<String> for Direction {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Direction> for String {
    fn from(d: Direction) -> String {
        d.to_string()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = ["X", "Y", "Z"]
            .into_iter()
            .enumerate()
            .filter(|&(l, _)| self.contains_axis(l))
            .map(|(_, name)| name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

/// Variables visible to an expression evaluated at a point.
///
/// The coordinates shadow user variables: `x` always, `y` when the point has
/// two or more components, `z` when it has three.
pub struct PointEnvironment<'a> {
    coords: &'a [f64],
    variables: &'a HashMap<String, f64>,
}

impl<'a> PointEnvironment<'a> {
    pub fn new(coords: &'a [f64], variables: &'a HashMap<String, f64>) -> Self {
        Self { coords, variables }
    }
}

impl Environment for PointEnvironment<'_> {
    fn lookup(&self, name: &str) -> Option<f64> {
        let axis = match name {
            "x" => Some(0),
            "y" => Some(1),
            "z" => Some(2),
            _ => None,
        };
        match axis {
            Some(k) if k < self.coords.len() => Some(self.coords[k]),
            _ => self.variables.get(name).copied(),
        }
    }
}

/// One parameter record with compiled expressions.
#[derive(Debug, Clone)]
pub struct Parameter {
    kind: ParamKind,
    value: Expression,
    predicate: Option<Expression>,
    direction: Direction,
}

impl Parameter {
    /// Compile a record. An empty (or blank) predicate always holds.
    pub fn new(kind: ParamKind, value: &str, predicate: &str, direction: Direction) -> Result<Self> {
        let predicate = if predicate.trim().is_empty() {
            None
        } else {
            Some(Expression::parse(predicate)?)
        };
        Ok(Self {
            kind,
            value: Expression::parse(value)?,
            predicate,
            direction,
        })
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn value_expression(&self) -> &Expression {
        &self.value
    }

    pub fn predicate_expression(&self) -> Option<&Expression> {
        self.predicate.as_ref()
    }

    /// Value at `x`.
    pub fn value<E: Environment + ?Sized>(&self, env: &E) -> Result<f64> {
        self.value.evaluate(env)
    }

    /// Whether the record applies at `x`.
    pub fn applies<E: Environment + ?Sized>(&self, env: &E) -> Result<bool> {
        match &self.predicate {
            Some(predicate) => predicate.is_true(env),
            None => Ok(true),
        }
    }
}

/// Ordered parameter list with tolerance, thread count and user variables.
#[derive(Debug, Clone)]
pub struct FemParameters {
    params: Vec<Parameter>,
    variables: HashMap<String, f64>,
    eps: f64,
    threads: usize,
}

impl Default for FemParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl FemParameters {
    /// Empty parameter set with ε = 1e-10 and one worker per rayon thread.
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            variables: HashMap::new(),
            eps: DEFAULT_EPS,
            threads: rayon::current_num_threads().max(1),
        }
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn set_eps(&mut self, eps: f64) -> Result<()> {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(Error::Config(format!("tolerance must be positive, got {}", eps)));
        }
        self.eps = eps;
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn set_threads(&mut self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(Error::Config("thread count must be positive".into()));
        }
        self.threads = threads;
        Ok(())
    }

    pub fn variables(&self) -> &HashMap<String, f64> {
        &self.variables
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: f64) {
        self.variables.insert(name.into(), value);
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Append a compiled record.
    pub fn add(&mut self, param: Parameter) {
        self.params.push(param);
    }

    /// Compile and append a record.
    pub fn add_param(
        &mut self,
        kind: ParamKind,
        value: &str,
        predicate: &str,
        direction: Direction,
    ) -> Result<()> {
        self.add(Parameter::new(kind, value, predicate, direction)?);
        Ok(())
    }

    pub fn add_young_modulus(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.add_param(ParamKind::YoungModulus, value, predicate, Direction::NONE)
    }

    pub fn add_poisson_ratio(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.add_param(ParamKind::PoissonRatio, value, predicate, Direction::NONE)
    }

    pub fn add_thickness(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.add_param(ParamKind::Thickness, value, predicate, Direction::NONE)
    }

    pub fn add_boundary_condition(
        &mut self,
        value: &str,
        predicate: &str,
        direction: Direction,
    ) -> Result<()> {
        self.add_param(ParamKind::BoundaryCondition, value, predicate, direction)
    }

    pub fn add_point_load(&mut self, value: &str, predicate: &str, direction: Direction) -> Result<()> {
        self.add_param(ParamKind::PointLoad, value, predicate, direction)
    }

    pub fn add_volume_load(&mut self, value: &str, predicate: &str, direction: Direction) -> Result<()> {
        self.add_param(ParamKind::VolumeLoad, value, predicate, direction)
    }

    pub fn add_surface_load(
        &mut self,
        value: &str,
        predicate: &str,
        direction: Direction,
    ) -> Result<()> {
        self.add_param(ParamKind::SurfaceLoad, value, predicate, direction)
    }

    /// Pressure acts along the boundary normal, so all three axes are selected.
    pub fn add_pressure_load(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.add_param(ParamKind::PressureLoad, value, predicate, Direction::ALL)
    }

    /// Whether any record of `kind` exists.
    pub fn find_parameter(&self, kind: ParamKind) -> bool {
        self.params.iter().any(|p| p.kind == kind)
    }

    /// Records of `kind` in insertion order.
    pub fn of_kind(&self, kind: ParamKind) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(move |p| p.kind == kind)
    }

    /// Evaluation environment at point `x`.
    pub fn environment<'a>(&'a self, x: &'a [f64]) -> PointEnvironment<'a> {
        PointEnvironment::new(x, &self.variables)
    }

    /// Value of the first record of `kind` whose predicate holds at `x`, or 0.
    pub fn get_param_value(&self, x: &[f64], kind: ParamKind) -> Result<f64> {
        let env = self.environment(x);
        for param in self.of_kind(kind) {
            if param.applies(&env)? {
                return param.value(&env);
            }
        }
        Ok(0.0)
    }
}

/// Parse a condition line `value;predicate;directions`.
///
/// Predicate and directions may be omitted. Returns the value, the predicate
/// (possibly empty) and the direction mask (empty when absent).
pub fn parse_condition(line: &str) -> Result<(String, String, Direction)> {
    let mut parts = line.split(';');
    let value = parts.next().unwrap_or_default().trim();
    if value.is_empty() {
        return Err(Error::Config(format!("condition '{}' has no value", line)));
    }
    let predicate = parts.next().unwrap_or_default().trim();
    let direction = match parts.next().map(str::trim) {
        Some(d) if !d.is_empty() => d.parse()?,
        _ => Direction::NONE,
    };
    if parts.next().is_some() {
        return Err(Error::Config(format!("condition '{}' has too many fields", line)));
    }
    Ok((value.to_string(), predicate.to_string(), direction))
}
