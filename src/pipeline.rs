use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use snapshot_common::{snapshot_path, vorticity, Geometry, Mesh, PlotConfig, Projection, Snapshot, SnapshotError};
use snapshot_visualizer::{figure_title, parse_color, render_field, Colormap, Figure, RenderOptions};

/// Display projection for `setting`; "auto" follows the snapshot geometry.
pub fn resolve_projection(setting: &str, geometry: Geometry) -> Result<Projection> {
    if setting.eq_ignore_ascii_case("auto") {
        return Ok(Projection::for_geometry(geometry));
    }
    setting.parse::<Projection>().map_err(|e| anyhow!(e))
}

/// True when `err` was caused by the content of a snapshot (bad format,
/// missing or mis-shaped field) rather than by I/O or settings.
pub fn is_data_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<SnapshotError>().map_or(false, SnapshotError::is_data_error))
}

fn parse_colormap(name: &str) -> Result<Colormap> {
    name.parse::<Colormap>().map_err(|e| anyhow!(e))
}

/// Loads snapshot `index`, derives the optional vorticity field and renders
/// one figure per field. Depth slice 0 is plotted for 3D data.
pub fn run(config: &PlotConfig, index: u32) -> Result<Vec<Figure>> {
    let colormap = parse_colormap(&config.render.colormap)?;
    let vorticity_colormap = parse_colormap(&config.render.vorticity_colormap)?;
    // Catch a bad projection name before touching the file.
    resolve_projection(&config.render.projection, Geometry::Cartesian)?;
    let background = parse_color(&config.render.background);

    let path = snapshot_path(&config.snapshot.directory, index, &config.snapshot);
    let mut snapshot =
        Snapshot::load(&path).with_context(|| format!("Failed to load snapshot {} ({})", index, path.display()))?;
    info!("Fields in file: {}", snapshot.field_names().collect::<Vec<_>>().join(", "));

    let derived = if config.vorticity.enabled {
        let field = vorticity(&snapshot, &config.vorticity)
            .with_context(|| format!("Failed to compute {} for snapshot {}", config.vorticity.name, index))?;
        Some(field)
    } else {
        None
    };

    if !config.output.fields.is_empty() {
        let selected: Vec<String> = config
            .output
            .fields
            .iter()
            .filter(|name| derived.as_ref().map_or(true, |d| d.name != **name))
            .cloned()
            .collect();
        snapshot
            .retain_fields(&selected)
            .with_context(|| format!("Field selection does not match snapshot {}", index))?;
    }
    let derived_name = derived.as_ref().map(|d| d.name.clone());
    if let Some(field) = derived {
        snapshot.insert_field(field)?;
    }

    let projection = resolve_projection(&config.render.projection, snapshot.geometry)?;
    if projection == Projection::Polar && snapshot.geometry != Geometry::Polar {
        warn!("Drawing {} geometry with a polar projection", snapshot.geometry);
    }
    let equal_aspect = config.render.equal_aspect.unwrap_or(projection == Projection::Polar);
    let mesh = Mesh::from_snapshot(&snapshot, projection);
    info!("Using {} projection (equal aspect: {})", projection, equal_aspect);

    let [_, _, depth] = snapshot.shape();
    if depth > 1 {
        info!("Snapshot has {} cells in depth, plotting slice 0", depth);
    }

    let mut figures = Vec::with_capacity(snapshot.fields().len());
    for field in snapshot.fields() {
        let is_derived = derived_name.as_deref() == Some(field.name.as_str());
        let cmap = if is_derived { vorticity_colormap } else { colormap };
        let options = RenderOptions {
            width: config.render.width,
            height: config.render.height,
            colormap: cmap,
            equal_aspect,
            background,
            symmetric: is_derived || cmap.is_diverging(),
        };
        if field.finite_range().map_or(false, |(lo, hi)| lo == hi) {
            warn!("Field {} is constant, padding its color range", field.name);
        }

        let title = figure_title(&field.name, snapshot.time);
        let figure = render_field(&mesh, field.slice(0)?, &field.name, &title, &options)?;
        info!("Rendered {} (range [{}, {}])", figure.title, figure.range.0, figure.range.1);
        figures.push(figure);
    }

    if figures.is_empty() {
        warn!("Snapshot {} holds no fields to plot", index);
    }
    Ok(figures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_projection() {
        assert_eq!(resolve_projection("auto", Geometry::Polar).unwrap(), Projection::Polar);
        assert_eq!(resolve_projection("auto", Geometry::Cartesian).unwrap(), Projection::Native);
        assert_eq!(resolve_projection("auto", Geometry::Spherical).unwrap(), Projection::Native);
        assert_eq!(resolve_projection("polar", Geometry::Cartesian).unwrap(), Projection::Polar);
        assert!(resolve_projection("mercator", Geometry::Polar).is_err());
    }

    #[test]
    fn test_bad_colormap_fails_before_io() {
        let mut config = PlotConfig::default();
        config.render.colormap = "jet".to_string();
        config.snapshot.directory = "/definitely/not/here".into();
        let err = run(&config, 0).unwrap_err();
        assert!(err.to_string().contains("unknown colormap"));
    }
}
