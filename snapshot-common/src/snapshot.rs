use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::{Array3, ArrayView2, Axis as NdAxis};

use crate::config::SnapshotConfig;
use crate::error::SnapshotError;
use crate::vtk;

/// Coordinate system the solver ran in, as stored in the `GEOMETRY` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Geometry {
    #[default]
    Cartesian,
    Cylindrical,
    Polar,
    Spherical,
}

impl Geometry {
    /// Decodes the integer code written by the solver:
    /// 0 cartesian, 1 polar, 2 spherical, 3 cylindrical.
    pub fn from_code(code: i32) -> Result<Self, SnapshotError> {
        match code {
            0 => Ok(Geometry::Cartesian),
            1 => Ok(Geometry::Polar),
            2 => Ok(Geometry::Spherical),
            3 => Ok(Geometry::Cylindrical),
            other => Err(SnapshotError::format(format!("unknown GEOMETRY code {}", other))),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Geometry::Cartesian => 0,
            Geometry::Polar => 1,
            Geometry::Spherical => 2,
            Geometry::Cylindrical => 3,
        }
    }

    pub fn is_cartesian(self) -> bool {
        self == Geometry::Cartesian
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Geometry::Cartesian => "cartesian",
            Geometry::Cylindrical => "cylindrical",
            Geometry::Polar => "polar",
            Geometry::Spherical => "spherical",
        };
        f.write_str(name)
    }
}

/// Grid positions along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// Cell interfaces (n + 1 values), or a single node for a collapsed axis.
    pub edges: Vec<f64>,
    /// Cell centers (n values).
    pub centers: Vec<f64>,
}

impl Axis {
    /// Builds an axis from its node positions; centers are edge midpoints.
    pub fn from_edges(edges: Vec<f64>) -> Self {
        let centers = if edges.len() <= 1 {
            edges.clone()
        } else {
            edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
        };
        Axis { edges, centers }
    }

    /// Number of cells along this axis.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// True when the axis has been written as a single node (2D runs).
    pub fn is_collapsed(&self) -> bool {
        self.edges.len() <= 1
    }
}

/// A named physical quantity sampled on the cells of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    /// Indexed `[i, j, k]` along axis 1, 2 and 3.
    pub values: Array3<f64>,
}

impl Field {
    pub fn new(name: impl Into<String>, values: Array3<f64>) -> Self {
        Field { name: name.into(), values }
    }

    /// The 2D slice at depth index `k`.
    pub fn slice(&self, k: usize) -> Result<ArrayView2<'_, f64>, SnapshotError> {
        let depth = self.values.len_of(NdAxis(2));
        if k >= depth {
            return Err(SnapshotError::shape(format!(
                "field '{}' has depth {}, cannot take slice {}",
                self.name, depth, k
            )));
        }
        Ok(self.values.index_axis(NdAxis(2), k))
    }

    /// Smallest and largest finite value, or `None` if there are none.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// One timestep of saved simulation state: grid, fields and time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub geometry: Geometry,
    pub periodicity: Option<[bool; 3]>,
    pub axes: [Axis; 3],
    fields: Vec<Field>,
}

impl Snapshot {
    /// Creates an empty snapshot on the given grid.
    pub fn new(time: f64, geometry: Geometry, axes: [Axis; 3]) -> Self {
        Snapshot {
            time,
            geometry,
            periodicity: None,
            axes,
            fields: Vec::new(),
        }
    }

    /// Reads a snapshot file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|source| SnapshotError::Open {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let snapshot = vtk::read_snapshot(BufReader::new(file))?;
        let [n1, n2, n3] = snapshot.shape();
        info!(
            "Loaded {} ({} geometry, {}x{}x{} cells, {} fields, t={})",
            path_ref.display(),
            snapshot.geometry,
            n1,
            n2,
            n3,
            snapshot.fields.len(),
            snapshot.time
        );
        Ok(snapshot)
    }

    /// Cell counts along the three axes.
    pub fn shape(&self) -> [usize; 3] {
        [self.axes[0].len(), self.axes[1].len(), self.axes[2].len()]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Result<&Field, SnapshotError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SnapshotError::MissingField(name.to_string()))
    }

    /// Adds a field, replacing any field of the same name.
    /// The field must match the grid's cell shape.
    pub fn insert_field(&mut self, field: Field) -> Result<(), SnapshotError> {
        let expected = self.shape();
        if field.values.shape() != expected {
            return Err(SnapshotError::shape(format!(
                "field '{}' has shape {:?}, grid has {:?}",
                field.name,
                field.values.shape(),
                expected
            )));
        }
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        Ok(())
    }

    /// Keeps only the named fields, in the order given. Repeated names are
    /// kept once.
    pub fn retain_fields(&mut self, names: &[String]) -> Result<(), SnapshotError> {
        let mut kept: Vec<Field> = Vec::with_capacity(names.len());
        for name in names {
            if kept.iter().any(|f| &f.name == name) {
                warn!("Field {} selected more than once", name);
                continue;
            }
            kept.push(self.field(name)?.clone());
        }
        self.fields = kept;
        Ok(())
    }
}

/// Path of snapshot `index` inside `dir`, e.g. `dir/data.0042.vtk`.
pub fn snapshot_path<P: AsRef<Path>>(dir: P, index: u32, naming: &SnapshotConfig) -> PathBuf {
    dir.as_ref().join(snapshot_file_name(index, naming))
}

/// File name of snapshot `index`, zero-padded to the configured width.
pub fn snapshot_file_name(index: u32, naming: &SnapshotConfig) -> String {
    format!(
        "{}.{:0width$}.{}",
        naming.prefix,
        index,
        naming.extension,
        width = naming.digits
    )
}
