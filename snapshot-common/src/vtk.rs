//! Reader and writer for the legacy VTK dialect written by the Idefix solver.
//!
//! Snapshots are `RECTILINEAR_GRID` datasets for Cartesian runs and
//! `STRUCTURED_GRID` datasets (Cartesian point positions) for curvilinear
//! runs. Simulation metadata travels in a `FIELD FieldData` block (`TIME`,
//! `GEOMETRY`, `PERIODICITY`) and every physical quantity is a `SCALARS` entry
//! of the `CELL_DATA` section. Binary payloads are big-endian.

use std::f64::consts::PI;
use std::io::{Read, Write};

use log::{debug, warn};
use ndarray::Array3;

use crate::error::SnapshotError;
use crate::snapshot::{Axis, Field, Geometry, Snapshot};

const MAGIC: &str = "# vtk DataFile Version";

/// Payload encoding of a VTK file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Binary,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataType {
    Float,
    Double,
    Int,
}

impl DataType {
    fn parse(name: &str) -> Result<Self, SnapshotError> {
        match name.to_ascii_lowercase().as_str() {
            "float" => Ok(DataType::Float),
            "double" => Ok(DataType::Double),
            "int" => Ok(DataType::Int),
            other => Err(SnapshotError::format(format!("unsupported data type '{}'", other))),
        }
    }

    fn size(self) -> usize {
        match self {
            DataType::Float | DataType::Int => 4,
            DataType::Double => 8,
        }
    }

    fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            DataType::Float => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            DataType::Int => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            DataType::Double => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                f64::from_be_bytes(b)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dataset {
    Rectilinear,
    Structured,
}

/// Byte cursor over a whole file: header lines are text, payloads are
/// either raw big-endian bytes or whitespace-separated numbers.
struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
    encoding: Encoding,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Scanner { buf, pos: 0, encoding: Encoding::Binary }
    }

    /// Next line verbatim (without the line terminator).
    fn raw_line(&mut self) -> Result<Option<&'a str>, SnapshotError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let buf = self.buf;
        let rest = &buf[self.pos..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.pos += (end + 1).min(rest.len());
        let line = &rest[..end];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        std::str::from_utf8(line)
            .map(Some)
            .map_err(|_| SnapshotError::format("invalid UTF-8 in header"))
    }

    /// Next non-blank line, trimmed.
    fn line(&mut self) -> Result<Option<&'a str>, SnapshotError> {
        while let Some(line) = self.raw_line()? {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed));
            }
        }
        Ok(None)
    }

    fn expect_line(&mut self, what: &str) -> Result<&'a str, SnapshotError> {
        self.line()?
            .ok_or_else(|| SnapshotError::UnexpectedEof(what.to_string()))
    }

    fn values(&mut self, count: usize, ty: DataType, what: &str) -> Result<Vec<f64>, SnapshotError> {
        match self.encoding {
            Encoding::Binary => self.binary_values(count, ty, what),
            Encoding::Ascii => self.ascii_values(count, what),
        }
    }

    fn binary_values(&mut self, count: usize, ty: DataType, what: &str) -> Result<Vec<f64>, SnapshotError> {
        let len = checked_product(&[count, ty.size()], what)?;
        if len > self.buf.len() - self.pos {
            return Err(SnapshotError::UnexpectedEof(what.to_string()));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes.chunks_exact(ty.size()).map(|b| ty.decode(b)).collect())
    }

    fn ascii_values(&mut self, count: usize, what: &str) -> Result<Vec<f64>, SnapshotError> {
        // every token takes at least two bytes with its separator
        let mut out = Vec::with_capacity(count.min((self.buf.len() - self.pos) / 2 + 1));
        while out.len() < count {
            while self.pos < self.buf.len() && self.buf[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos >= self.buf.len() {
                return Err(SnapshotError::UnexpectedEof(what.to_string()));
            }
            let start = self.pos;
            while self.pos < self.buf.len() && !self.buf[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            let token = std::str::from_utf8(&self.buf[start..self.pos])
                .map_err(|_| SnapshotError::format(format!("invalid UTF-8 in {}", what)))?;
            let value = token.parse::<f64>().map_err(|_| {
                SnapshotError::format(format!("invalid number '{}' in {}", token, what))
            })?;
            out.push(value);
        }
        Ok(out)
    }
}

/// Product of header counts; overflow means the header is corrupt.
fn checked_product(factors: &[usize], what: &str) -> Result<usize, SnapshotError> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| SnapshotError::format(format!("size of {} overflows", what)))
}

fn parse_count(token: Option<&str>, line: &str) -> Result<usize, SnapshotError> {
    token
        .and_then(|t| t.parse::<usize>().ok())
        .ok_or_else(|| SnapshotError::format(format!("expected a count in '{}'", line)))
}

/// Parses a snapshot from any reader.
pub fn read_snapshot<R: Read>(mut reader: R) -> Result<Snapshot, SnapshotError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_snapshot(&buf)
}

/// Parses a snapshot held in memory.
pub fn parse_snapshot(buf: &[u8]) -> Result<Snapshot, SnapshotError> {
    let mut sc = Scanner::new(buf);

    let magic = sc.raw_line()?.ok_or_else(|| SnapshotError::UnexpectedEof("file header".into()))?;
    if !magic.starts_with(MAGIC) {
        return Err(SnapshotError::format("missing '# vtk DataFile Version' header"));
    }
    let title = sc.raw_line()?.ok_or_else(|| SnapshotError::UnexpectedEof("title line".into()))?;
    debug!("VTK title: {}", title.trim());

    sc.encoding = match sc.expect_line("encoding")?.to_ascii_uppercase().as_str() {
        "BINARY" => Encoding::Binary,
        "ASCII" => Encoding::Ascii,
        other => return Err(SnapshotError::format(format!("unknown encoding '{}'", other))),
    };

    let dataset_line = sc.expect_line("DATASET")?;
    let dataset = match dataset_line.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["DATASET", "RECTILINEAR_GRID"] => Dataset::Rectilinear,
        ["DATASET", "STRUCTURED_GRID"] => Dataset::Structured,
        _ => {
            return Err(SnapshotError::format(format!(
                "unsupported dataset '{}'",
                dataset_line
            )))
        }
    };

    let mut time = None;
    let mut geometry = Geometry::Cartesian;
    let mut periodicity = None;
    let mut dims: Option<[usize; 3]> = None;
    let mut coords: [Option<Vec<f64>>; 3] = [None, None, None];
    let mut points: Option<Vec<f64>> = None;
    let mut n_cells: Option<usize> = None;
    let mut fields: Vec<(String, Vec<f64>)> = Vec::new();

    while let Some(line) = sc.line()? {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        match keyword {
            "FIELD" => {
                let _name = tokens.next();
                let n_arrays = parse_count(tokens.next(), line)?;
                for _ in 0..n_arrays {
                    let entry = sc.expect_line("FIELD entry")?;
                    let mut t = entry.split_whitespace();
                    let name = t.next().unwrap_or_default();
                    let n_comp = parse_count(t.next(), entry)?;
                    let n_tuples = parse_count(t.next(), entry)?;
                    let ty = DataType::parse(t.next().unwrap_or_default())?;
                    let values = sc.values(checked_product(&[n_comp, n_tuples], name)?, ty, name)?;
                    match name {
                        "TIME" => time = values.first().copied(),
                        "GEOMETRY" => {
                            if let Some(&code) = values.first() {
                                geometry = Geometry::from_code(code as i32)?;
                            }
                        }
                        "PERIODICITY" if values.len() >= 3 => {
                            periodicity = Some([values[0] != 0.0, values[1] != 0.0, values[2] != 0.0]);
                        }
                        other => debug!("Skipping FieldData entry {}", other),
                    }
                }
            }
            "DIMENSIONS" => {
                let n1 = parse_count(tokens.next(), line)?;
                let n2 = parse_count(tokens.next(), line)?;
                let n3 = parse_count(tokens.next(), line)?;
                if n1 == 0 || n2 == 0 || n3 == 0 {
                    return Err(SnapshotError::format(format!("zero-sized grid in '{}'", line)));
                }
                dims = Some([n1, n2, n3]);
            }
            "X_COORDINATES" | "Y_COORDINATES" | "Z_COORDINATES" => {
                let dir = match keyword {
                    "X_COORDINATES" => 0,
                    "Y_COORDINATES" => 1,
                    _ => 2,
                };
                let n = parse_count(tokens.next(), line)?;
                let ty = DataType::parse(tokens.next().unwrap_or_default())?;
                coords[dir] = Some(sc.values(n, ty, keyword)?);
            }
            "POINTS" => {
                let n = parse_count(tokens.next(), line)?;
                let ty = DataType::parse(tokens.next().unwrap_or_default())?;
                points = Some(sc.values(checked_product(&[3, n], "POINTS")?, ty, "POINTS")?);
            }
            "CELL_DATA" => {
                n_cells = Some(parse_count(tokens.next(), line)?);
            }
            "SCALARS" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| SnapshotError::format("SCALARS without a name"))?
                    .to_string();
                let ty = DataType::parse(tokens.next().unwrap_or_default())?;
                let n_comp = match tokens.next() {
                    Some(t) => parse_count(Some(t), line)?,
                    None => 1,
                };
                if n_comp != 1 {
                    return Err(SnapshotError::format(format!(
                        "SCALARS '{}' has {} components, only 1 is supported",
                        name, n_comp
                    )));
                }
                let n = n_cells
                    .ok_or_else(|| SnapshotError::format(format!("SCALARS '{}' before CELL_DATA", name)))?;
                let lookup = sc.expect_line("LOOKUP_TABLE")?;
                if !lookup.starts_with("LOOKUP_TABLE") {
                    return Err(SnapshotError::format(format!(
                        "expected LOOKUP_TABLE after SCALARS '{}', found '{}'",
                        name, lookup
                    )));
                }
                let values = sc.values(n, ty, &name)?;
                fields.push((name, values));
            }
            other => {
                return Err(SnapshotError::format(format!("unsupported VTK section '{}'", other)));
            }
        }
    }

    let dims = dims.ok_or_else(|| SnapshotError::format("missing DIMENSIONS"))?;
    let edges = match dataset {
        Dataset::Rectilinear => rectilinear_edges(dims, coords)?,
        Dataset::Structured => {
            let points = points.ok_or_else(|| SnapshotError::format("STRUCTURED_GRID without POINTS"))?;
            structured_edges(dims, &points, geometry)?
        }
    };
    let [e1, e2, e3] = edges;
    let axes = [Axis::from_edges(e1), Axis::from_edges(e2), Axis::from_edges(e3)];

    let time = time.unwrap_or_else(|| {
        warn!("Snapshot has no TIME entry, assuming t=0");
        0.0
    });
    let mut snapshot = Snapshot::new(time, geometry, axes);
    snapshot.periodicity = periodicity;

    let shape = snapshot.shape();
    let expected = checked_product(&shape, "CELL_DATA")?;
    if let Some(n) = n_cells {
        if n != expected {
            return Err(SnapshotError::shape(format!(
                "CELL_DATA declares {} cells, grid has {}",
                n, expected
            )));
        }
    }
    for (name, values) in fields {
        let values = cells_to_array(values, shape)?;
        snapshot.insert_field(Field::new(name, values))?;
    }
    Ok(snapshot)
}

fn rectilinear_edges(dims: [usize; 3], coords: [Option<Vec<f64>>; 3]) -> Result<[Vec<f64>; 3], SnapshotError> {
    let mut out: [Vec<f64>; 3] = Default::default();
    for (dir, c) in coords.into_iter().enumerate() {
        let c = c.ok_or_else(|| SnapshotError::format(format!("missing {}_COORDINATES", ["X", "Y", "Z"][dir])))?;
        if c.len() != dims[dir] {
            return Err(SnapshotError::shape(format!(
                "axis {} has {} coordinates, DIMENSIONS says {}",
                dir + 1,
                c.len(),
                dims[dir]
            )));
        }
        out[dir] = c;
    }
    Ok(out)
}

/// Recovers native coordinates from the Cartesian point positions of a
/// structured grid. Points are stored x-fastest.
fn structured_edges(dims: [usize; 3], points: &[f64], geometry: Geometry) -> Result<[Vec<f64>; 3], SnapshotError> {
    let [n1, n2, n3] = dims;
    let n_points = checked_product(&dims, "DIMENSIONS")?;
    if points.len() / 3 != n_points || points.len() % 3 != 0 {
        return Err(SnapshotError::shape(format!(
            "POINTS holds {} points, DIMENSIONS says {}",
            points.len() / 3,
            n_points
        )));
    }
    let point = |i: usize, j: usize, k: usize| {
        let p = 3 * (i + n1 * (j + n2 * k));
        (points[p], points[p + 1], points[p + 2])
    };

    let edges = match geometry {
        Geometry::Polar => {
            let r: Vec<f64> = (0..n1)
                .map(|i| {
                    let (x, y, _) = point(i, 0, 0);
                    x.hypot(y)
                })
                .collect();
            let phi: Vec<f64> = (0..n2)
                .map(|j| {
                    let (x, y, _) = point(0, j, 0);
                    y.atan2(x)
                })
                .collect();
            let z: Vec<f64> = (0..n3).map(|k| point(0, 0, k).2).collect();
            [r, unwrap_angles(phi), z]
        }
        Geometry::Spherical => {
            let r: Vec<f64> = (0..n1)
                .map(|i| {
                    let (x, y, z) = point(i, 0, 0);
                    (x * x + y * y + z * z).sqrt()
                })
                .collect();
            let theta: Vec<f64> = (0..n2)
                .map(|j| {
                    let (x, y, z) = point(0, j, 0);
                    let r = (x * x + y * y + z * z).sqrt();
                    if r > 0.0 { (z / r).clamp(-1.0, 1.0).acos() } else { 0.0 }
                })
                .collect();
            // azimuth is undefined on the polar axis, sample it at the equator
            let phi: Vec<f64> = (0..n3)
                .map(|k| {
                    let (x, y, _) = point(0, n2 / 2, k);
                    y.atan2(x)
                })
                .collect();
            [r, theta, unwrap_angles(phi)]
        }
        Geometry::Cartesian | Geometry::Cylindrical => [
            (0..n1).map(|i| point(i, 0, 0).0).collect(),
            (0..n2).map(|j| point(0, j, 0).1).collect(),
            (0..n3).map(|k| point(0, 0, k).2).collect(),
        ],
    };
    Ok(edges)
}

/// Removes the 2π jumps `atan2` introduces so that the sequence is continuous.
pub fn unwrap_angles(mut angles: Vec<f64>) -> Vec<f64> {
    let mut offset = 0.0;
    for i in 1..angles.len() {
        let raw = angles[i] + offset;
        let delta = raw - angles[i - 1];
        if delta < -PI {
            offset += 2.0 * PI;
        } else if delta > PI {
            offset -= 2.0 * PI;
        }
        angles[i] += offset;
    }
    angles
}

fn cells_to_array(values: Vec<f64>, shape: [usize; 3]) -> Result<Array3<f64>, SnapshotError> {
    let [n1, n2, n3] = shape;
    let n_cells = checked_product(&shape, "CELL_DATA")?;
    if values.len() != n_cells {
        return Err(SnapshotError::shape(format!(
            "field holds {} values, grid has {} cells",
            values.len(),
            n_cells
        )));
    }
    // File order is i fastest, so the raw buffer is [k][j][i].
    let kji = Array3::from_shape_vec((n3, n2, n1), values)
        .map_err(|e| SnapshotError::shape(e.to_string()))?;
    Ok(kji.permuted_axes([2, 1, 0]).as_standard_layout().into_owned())
}

/// Writes `snapshot` in the same dialect. Binary files store coordinates and
/// fields as big-endian `float`; ASCII files store them as `double`.
pub fn write_snapshot<W: Write>(mut w: W, snapshot: &Snapshot, encoding: Encoding) -> Result<(), SnapshotError> {
    let ty = match encoding {
        Encoding::Binary => "float",
        Encoding::Ascii => "double",
    };
    let rectilinear = matches!(snapshot.geometry, Geometry::Cartesian | Geometry::Cylindrical);
    let dims = [
        snapshot.axes[0].edges.len(),
        snapshot.axes[1].edges.len(),
        snapshot.axes[2].edges.len(),
    ];

    writeln!(w, "{} 2.0", MAGIC)?;
    writeln!(w, "snapshot-plot export")?;
    writeln!(w, "{}", match encoding { Encoding::Binary => "BINARY", Encoding::Ascii => "ASCII" })?;
    writeln!(w, "DATASET {}", if rectilinear { "RECTILINEAR_GRID" } else { "STRUCTURED_GRID" })?;

    let n_meta = if snapshot.periodicity.is_some() { 3 } else { 2 };
    writeln!(w, "FIELD FieldData {}", n_meta)?;
    writeln!(w, "TIME 1 1 double")?;
    write_payload(&mut w, &[snapshot.time], encoding, Precision::Double)?;
    writeln!(w, "GEOMETRY 1 1 int")?;
    write_payload(&mut w, &[snapshot.geometry.code() as f64], encoding, Precision::Int)?;
    if let Some(p) = snapshot.periodicity {
        writeln!(w, "PERIODICITY 1 3 int")?;
        let flags: Vec<f64> = p.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect();
        write_payload(&mut w, &flags, encoding, Precision::Int)?;
    }

    writeln!(w, "DIMENSIONS {} {} {}", dims[0], dims[1], dims[2])?;
    let precision = match encoding {
        Encoding::Binary => Precision::Float,
        Encoding::Ascii => Precision::Double,
    };
    if rectilinear {
        for (dir, label) in ["X", "Y", "Z"].iter().enumerate() {
            writeln!(w, "{}_COORDINATES {} {}", label, dims[dir], ty)?;
            write_payload(&mut w, &snapshot.axes[dir].edges, encoding, precision)?;
        }
    } else {
        let points = cartesian_points(snapshot);
        writeln!(w, "POINTS {} {}", points.len() / 3, ty)?;
        write_payload(&mut w, &points, encoding, precision)?;
    }

    let [n1, n2, n3] = snapshot.shape();
    writeln!(w, "CELL_DATA {}", n1 * n2 * n3)?;
    for field in snapshot.fields() {
        writeln!(w, "SCALARS {} {}", field.name, ty)?;
        writeln!(w, "LOOKUP_TABLE default")?;
        // permuted view iterates k slowest, i fastest
        let kji: Vec<f64> = field.values.view().permuted_axes([2, 1, 0]).iter().copied().collect();
        write_payload(&mut w, &kji, encoding, precision)?;
    }
    w.flush()?;
    Ok(())
}

#[derive(Clone, Copy)]
enum Precision {
    Float,
    Double,
    Int,
}

fn write_payload<W: Write>(w: &mut W, values: &[f64], encoding: Encoding, precision: Precision) -> Result<(), SnapshotError> {
    match encoding {
        Encoding::Binary => {
            let mut bytes = Vec::with_capacity(values.len() * 8);
            for &v in values {
                match precision {
                    Precision::Float => bytes.extend_from_slice(&(v as f32).to_be_bytes()),
                    Precision::Double => bytes.extend_from_slice(&v.to_be_bytes()),
                    Precision::Int => bytes.extend_from_slice(&(v as i32).to_be_bytes()),
                }
            }
            w.write_all(&bytes)?;
            writeln!(w)?;
        }
        Encoding::Ascii => {
            for chunk in values.chunks(6) {
                let line: Vec<String> = chunk
                    .iter()
                    .map(|v| match precision {
                        Precision::Int => format!("{}", *v as i32),
                        _ => format!("{:e}", v),
                    })
                    .collect();
                writeln!(w, "{}", line.join(" "))?;
            }
        }
    }
    Ok(())
}

/// Cartesian positions of every grid node, x-fastest.
fn cartesian_points(snapshot: &Snapshot) -> Vec<f64> {
    let [a1, a2, a3] = &snapshot.axes;
    let mut points = Vec::with_capacity(3 * a1.edges.len() * a2.edges.len() * a3.edges.len());
    for &q3 in &a3.edges {
        for &q2 in &a2.edges {
            for &q1 in &a1.edges {
                let (x, y, z) = match snapshot.geometry {
                    Geometry::Polar => (q1 * q2.cos(), q1 * q2.sin(), q3),
                    Geometry::Spherical => (
                        q1 * q2.sin() * q3.cos(),
                        q1 * q2.sin() * q3.sin(),
                        q1 * q2.cos(),
                    ),
                    Geometry::Cartesian | Geometry::Cylindrical => (q1, q2, q3),
                };
                points.extend_from_slice(&[x, y, z]);
            }
        }
    }
    points
}
