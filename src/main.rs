use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use snapshot_common::{snapshot_file_name, PlotConfig};
use snapshot_plot::{output, pipeline};
use snapshot_visualizer::parse_color;
use std::path::PathBuf;
use std::time::Instant;

/// Plot the fields of one Idefix VTK snapshot as PNG figures
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Snapshot index, e.g. 42 for data.0042.vtk
    index: u32,

    /// Directory holding the snapshot files (overrides snapshot.directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Optional path to a plot config TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the figures are written to (overrides output.directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How the grid is drawn: "auto" follows the GEOMETRY stored in the file
    #[arg(long, value_parser = ["auto", "native", "polar"])]
    geometry: Option<String>,

    /// Also plot the vorticity computed from VX1 and VX2
    #[arg(long, overrides_with = "no_vorticity")]
    vorticity: bool,

    /// Do not compute vorticity even if the config enables it
    #[arg(long, overrides_with = "vorticity")]
    no_vorticity: bool,

    /// Use the same scale on both axes
    #[arg(long)]
    equal_aspect: bool,

    /// Figure width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Figure height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Colormap for plain fields (viridis, magma, bwr, gray)
    #[arg(long)]
    colormap: Option<String>,

    /// Also write all figures tiled into one sheet
    #[arg(long)]
    sheet: bool,

    /// Comma separated list of fields to plot, e.g. RHO,VX1
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,
}

impl Args {
    /// Applies command-line overrides on top of a loaded configuration.
    fn apply(&self, config: &mut PlotConfig) {
        if let Some(dir) = &self.dir {
            config.snapshot.directory = dir.clone();
        }
        if let Some(out) = &self.output {
            config.output.directory = out.clone();
        }
        if let Some(geometry) = &self.geometry {
            config.render.projection = geometry.clone();
        }
        if self.vorticity {
            config.vorticity.enabled = true;
        } else if self.no_vorticity {
            config.vorticity.enabled = false;
        }
        if self.equal_aspect {
            config.render.equal_aspect = Some(true);
        }
        if let Some(width) = self.width {
            config.render.width = width;
        }
        if let Some(height) = self.height {
            config.render.height = height;
        }
        if let Some(colormap) = &self.colormap {
            config.render.colormap = colormap.clone();
        }
        if self.sheet {
            config.output.sheet = true;
        }
        if !self.fields.is_empty() {
            config.output.fields = self.fields.clone();
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env().filter(None, LevelFilter::Info).init();

    info!("Starting Snapshot Plotter...");

    // --- Load Configuration ---
    let mut config = match &args.config {
        Some(path) => {
            let config = PlotConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?;
            info!("Loaded plot configuration from {}", path.display());
            config
        }
        None => PlotConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid plot settings")?;

    // --- Render ---
    let start_time = Instant::now();
    let figures = match pipeline::run(&config, args.index) {
        Ok(figures) => figures,
        Err(e) => {
            if pipeline::is_data_failure(&e) {
                error!("Snapshot {} holds unusable data: {:#}", args.index, e);
            }
            return Err(e);
        }
    };
    if figures.is_empty() {
        warn!("Nothing to write.");
        return Ok(());
    }

    // --- Save Figures ---
    let file_name = snapshot_file_name(args.index, &config.snapshot);
    let stem = file_name
        .strip_suffix(&format!(".{}", config.snapshot.extension))
        .unwrap_or(&file_name);
    let out_dir = &config.output.directory;
    output::save_figures(&figures, out_dir, stem)?;
    if config.output.sheet {
        let background = parse_color(&config.render.background);
        output::save_sheet(&figures, out_dir, stem, config.output.sheet_columns as usize, background)?;
    }

    info!(
        "Plotted {} figures in {:.2?}",
        figures.len(),
        start_time.elapsed()
    );
    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_index_is_usage_error() {
        let err = Args::try_parse_from(["snapshot-plot", "forty-two"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = Args::try_parse_from(["snapshot-plot"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let err = Args::try_parse_from(["snapshot-plot", "-1"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = Args::try_parse_from([
            "snapshot-plot",
            "7",
            "--dir",
            "run1",
            "--geometry",
            "polar",
            "--vorticity",
            "--fields",
            "RHO,VX1",
            "--width",
            "800",
        ])
        .unwrap();
        assert_eq!(args.index, 7);

        let mut config = PlotConfig::default();
        args.apply(&mut config);
        assert_eq!(config.snapshot.directory, PathBuf::from("run1"));
        assert_eq!(config.render.projection, "polar");
        assert!(config.vorticity.enabled);
        assert_eq!(config.output.fields, vec!["RHO".to_string(), "VX1".to_string()]);
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.height, 480);
        assert_eq!(config.output.directory, PathBuf::from("plots"));
    }

    #[test]
    fn test_no_vorticity_wins_when_last() {
        let args = Args::try_parse_from(["snapshot-plot", "1", "--vorticity", "--no-vorticity"]).unwrap();
        let mut config = PlotConfig::default();
        config.vorticity.enabled = true;
        args.apply(&mut config);
        assert!(!config.vorticity.enabled);
    }

    #[test]
    fn test_unknown_geometry_is_rejected() {
        assert!(Args::try_parse_from(["snapshot-plot", "1", "--geometry", "torus"]).is_err());
    }
}
