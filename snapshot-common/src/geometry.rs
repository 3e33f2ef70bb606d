use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::snapshot::{Axis, Geometry, Snapshot};

/// Converts radius/angle samples to Cartesian positions for every
/// combination: `x[i, j] = r[i] cos(theta[j])`, `y[i, j] = r[i] sin(theta[j])`.
pub fn polar_to_cartesian(r: &[f64], theta: &[f64]) -> (Array2<f64>, Array2<f64>) {
    let x = Array2::from_shape_fn((r.len(), theta.len()), |(i, j)| r[i] * theta[j].cos());
    let y = Array2::from_shape_fn((r.len(), theta.len()), |(i, j)| r[i] * theta[j].sin());
    (x, y)
}

/// How native grid coordinates are placed on the figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Axis 1 horizontal, axis 2 vertical, no transform.
    Native,
    /// Axis 1 is a radius, axis 2 an angle; cells become annular sectors.
    Polar,
}

impl Projection {
    /// Polar snapshots are drawn as discs, everything else as-is.
    pub fn for_geometry(geometry: Geometry) -> Self {
        match geometry {
            Geometry::Polar => Projection::Polar,
            _ => Projection::Native,
        }
    }
}

impl FromStr for Projection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "cartesian" => Ok(Projection::Native),
            "polar" => Ok(Projection::Polar),
            other => Err(format!("unknown projection '{}'", other)),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Native => f.write_str("native"),
            Projection::Polar => f.write_str("polar"),
        }
    }
}

/// Corner positions of the plotted cells, shape `(n1 + 1, n2 + 1)`.
/// Cell `(i, j)` is the quad spanned by corners `(i, j)`, `(i + 1, j)`,
/// `(i + 1, j + 1)` and `(i, j + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
}

impl Mesh {
    /// Tensor-product grid of two edge arrays.
    pub fn rectilinear(x_edges: &[f64], y_edges: &[f64]) -> Self {
        let x = Array2::from_shape_fn((x_edges.len(), y_edges.len()), |(i, _)| x_edges[i]);
        let y = Array2::from_shape_fn((x_edges.len(), y_edges.len()), |(_, j)| y_edges[j]);
        Mesh { x, y }
    }

    /// Radius/angle edges mapped to the plane.
    pub fn polar(r_edges: &[f64], theta_edges: &[f64]) -> Self {
        let (x, y) = polar_to_cartesian(r_edges, theta_edges);
        Mesh { x, y }
    }

    /// Mesh of the first two axes of `snapshot`. A collapsed axis (1D runs)
    /// is drawn as a single cell of unit width around its node.
    pub fn from_snapshot(snapshot: &Snapshot, projection: Projection) -> Self {
        let e1 = plot_edges(&snapshot.axes[0]);
        let e2 = plot_edges(&snapshot.axes[1]);
        match projection {
            Projection::Native => Mesh::rectilinear(&e1, &e2),
            Projection::Polar => Mesh::polar(&e1, &e2),
        }
    }

    /// Number of cells along each direction.
    pub fn cells(&self) -> (usize, usize) {
        let (n1, n2) = self.x.dim();
        (n1.saturating_sub(1), n2.saturating_sub(1))
    }

    /// `(xmin, xmax, ymin, ymax)` over all corners.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let fold = |a: &Array2<f64>| {
            a.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
        };
        let (xmin, xmax) = fold(&self.x);
        let (ymin, ymax) = fold(&self.y);
        (xmin, xmax, ymin, ymax)
    }

    /// The four corners of cell `(i, j)` in drawing order.
    pub fn cell_corners(&self, i: usize, j: usize) -> [(f64, f64); 4] {
        [
            (self.x[[i, j]], self.y[[i, j]]),
            (self.x[[i + 1, j]], self.y[[i + 1, j]]),
            (self.x[[i + 1, j + 1]], self.y[[i + 1, j + 1]]),
            (self.x[[i, j + 1]], self.y[[i, j + 1]]),
        ]
    }
}

fn plot_edges(axis: &Axis) -> Vec<f64> {
    match axis.edges.as_slice() {
        [node] => vec![node - 0.5, node + 0.5],
        edges => edges.to_vec(),
    }
}
