use image::{imageops, Rgb, RgbImage};

use crate::figure::Figure;

/// Tiles several figures into one image, row by row.
pub struct FigureSheet;

impl FigureSheet {
    /// Every tile is sized to the largest figure; `None` when there is
    /// nothing to compose.
    pub fn compose(figures: &[Figure], columns: usize, background: Rgb<u8>) -> Option<RgbImage> {
        if figures.is_empty() {
            return None;
        }
        let columns = columns.clamp(1, figures.len());
        let rows = figures.len().div_ceil(columns);
        let tile_w = figures.iter().map(|f| f.image.width()).max().unwrap_or(0);
        let tile_h = figures.iter().map(|f| f.image.height()).max().unwrap_or(0);

        let mut sheet = RgbImage::from_pixel(tile_w * columns as u32, tile_h * rows as u32, background);
        for (n, figure) in figures.iter().enumerate() {
            let x = (n % columns) as i64 * tile_w as i64;
            let y = (n / columns) as i64 * tile_h as i64;
            imageops::overlay(&mut sheet, &figure.image, x, y);
        }
        Some(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(name: &str, w: u32, h: u32, c: [u8; 3]) -> Figure {
        Figure {
            name: name.to_string(),
            title: name.to_string(),
            range: (0.0, 1.0),
            image: RgbImage::from_pixel(w, h, Rgb(c)),
        }
    }

    #[test]
    fn test_compose_grid() {
        let figs = vec![
            solid("a", 10, 8, [255, 0, 0]),
            solid("b", 10, 8, [0, 255, 0]),
            solid("c", 6, 4, [0, 0, 255]),
        ];
        let sheet = FigureSheet::compose(&figs, 2, Rgb([0, 0, 0])).unwrap();
        assert_eq!(sheet.dimensions(), (20, 16));
        assert_eq!(*sheet.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*sheet.get_pixel(15, 3), Rgb([0, 255, 0]));
        assert_eq!(*sheet.get_pixel(2, 10), Rgb([0, 0, 255]));
        // padding around the smaller tile and the empty slot
        assert_eq!(*sheet.get_pixel(8, 14), Rgb([0, 0, 0]));
        assert_eq!(*sheet.get_pixel(15, 12), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_compose_single_row_and_empty() {
        let figs = vec![solid("a", 4, 4, [1, 2, 3]), solid("b", 4, 4, [4, 5, 6])];
        let sheet = FigureSheet::compose(&figs, 10, Rgb([0, 0, 0])).unwrap();
        assert_eq!(sheet.dimensions(), (8, 4));
        assert!(FigureSheet::compose(&[], 2, Rgb([0, 0, 0])).is_none());
    }
}
