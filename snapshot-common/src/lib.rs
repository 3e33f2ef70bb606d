pub mod config;
pub mod derive;
pub mod error;
pub mod geometry;
pub mod snapshot;
pub mod vtk;

// Re-export key types for easier use by dependent crates
pub use config::{OutputConfig, PlotConfig, RenderConfig, SnapshotConfig, VorticityConfig};
pub use derive::{curl_z, gradient, vorticity};
pub use error::{ConfigError, SnapshotError};
pub use geometry::{polar_to_cartesian, Mesh, Projection};
pub use snapshot::{snapshot_file_name, snapshot_path, Axis, Field, Geometry, Snapshot};
pub use vtk::{read_snapshot, write_snapshot, Encoding};
