use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::Rgb;
use log::info;
use snapshot_visualizer::{Figure, FigureSheet};

// Field names end up in file names.
fn file_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Writes each figure to `<dir>/<stem>.<field>.png` and returns the paths.
pub fn save_figures(figures: &[Figure], dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(figures.len());
    for figure in figures {
        let path = dir.join(format!("{}.{}.png", stem, file_component(&figure.name)));
        figure
            .save(&path)
            .with_context(|| format!("Failed to write figure {}", path.display()))?;
        info!("Figure saved to: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Writes all figures tiled into `<dir>/<stem>.sheet.png`.
pub fn save_sheet(figures: &[Figure], dir: &Path, stem: &str, columns: usize, background: Rgb<u8>) -> Result<Option<PathBuf>> {
    let Some(sheet) = FigureSheet::compose(figures, columns, background) else {
        return Ok(None);
    };
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(format!("{}.sheet.png", stem));
    sheet
        .save(&path)
        .with_context(|| format!("Failed to write figure sheet {}", path.display()))?;
    info!("Figure sheet saved to: {}", path.display());
    Ok(Some(path))
}
