use log::{debug, warn};
use ndarray::{Array3, Axis as NdAxis, Zip};

use crate::config::VorticityConfig;
use crate::error::SnapshotError;
use crate::snapshot::{Field, Snapshot};

/// Derivative of `values` along `axis` with respect to the sample positions
/// `coords`.
///
/// Interior points use the second-order centered scheme for uneven spacing,
/// end points use one-sided first-order differences. An axis of length 1 has
/// nothing to differentiate against and yields zeros.
pub fn gradient(values: &Array3<f64>, coords: &[f64], axis: usize) -> Result<Array3<f64>, SnapshotError> {
    if axis > 2 {
        return Err(SnapshotError::shape(format!("axis {} out of range for a 3D field", axis)));
    }
    let n = values.len_of(NdAxis(axis));
    if coords.len() != n {
        return Err(SnapshotError::shape(format!(
            "axis {} has {} samples but {} coordinates",
            axis,
            n,
            coords.len()
        )));
    }

    let mut out = Array3::zeros(values.raw_dim());
    if n < 2 {
        return Ok(out);
    }

    Zip::from(out.lanes_mut(NdAxis(axis)))
        .and(values.lanes(NdAxis(axis)))
        .for_each(|mut d, f| {
            d[0] = (f[1] - f[0]) / (coords[1] - coords[0]);
            for i in 1..n - 1 {
                let hs = coords[i] - coords[i - 1];
                let hd = coords[i + 1] - coords[i];
                d[i] = (hs * hs * f[i + 1] + (hd * hd - hs * hs) * f[i] - hd * hd * f[i - 1])
                    / (hs * hd * (hd + hs));
            }
            d[n - 1] = (f[n - 1] - f[n - 2]) / (coords[n - 1] - coords[n - 2]);
        });
    Ok(out)
}

/// z-component of the curl of the in-plane velocity `(vx1, vx2)`:
/// `d(vx2)/d(x1) - d(vx1)/d(x2)`.
pub fn curl_z(vx1: &Array3<f64>, vx2: &Array3<f64>, x1: &[f64], x2: &[f64]) -> Result<Array3<f64>, SnapshotError> {
    if vx1.shape() != vx2.shape() {
        return Err(SnapshotError::shape(format!(
            "velocity components differ in shape: {:?} vs {:?}",
            vx1.shape(),
            vx2.shape()
        )));
    }
    let dvx2_dx1 = gradient(vx2, x1, 0)?;
    let dvx1_dx2 = gradient(vx1, x2, 1)?;
    Ok(dvx2_dx1 - dvx1_dx2)
}

/// Computes the vorticity field of `snapshot` from the velocity components
/// named in `settings`, differentiating against the cell centers.
pub fn vorticity(snapshot: &Snapshot, settings: &VorticityConfig) -> Result<Field, SnapshotError> {
    let vx1 = snapshot.field(&settings.vx1)?;
    let vx2 = snapshot.field(&settings.vx2)?;
    if !snapshot.geometry.is_cartesian() {
        warn!(
            "Computing {} with plain coordinate derivatives in {} geometry (no metric terms)",
            settings.name, snapshot.geometry
        );
    }
    let values = curl_z(
        &vx1.values,
        &vx2.values,
        &snapshot.axes[0].centers,
        &snapshot.axes[1].centers,
    )?;
    let field = Field::new(settings.name.clone(), values);
    if let Some((lo, hi)) = field.finite_range() {
        debug!("{} range: [{}, {}]", field.name, lo, hi);
    }
    Ok(field)
}
