//! Confusion-matrix heatmap rendering to PNG.
//!
//! Cells are shaded with a light-to-dark blue ramp scaled between the matrix
//! minimum and maximum. Cell text switches to white above half the maximum so
//! it stays readable on dark cells.

mod canvas;
mod glyphs;

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use thiserror::Error;

use canvas::{
    BLACK, WHITE, draw_text, draw_text_centered, draw_text_stacked, fill_rect, stroke_rect,
};
use glyphs::{GLYPH_HEIGHT, text_width};

const CELL_SIZE: u32 = 120;
const TITLE_SCALE: u32 = 2;
const VALUE_SCALE: u32 = 3;
const TICK_SCALE: u32 = 1;
const CAPTION_SCALE: u32 = 2;
const MARGIN: u32 = 16;
const COLORBAR_WIDTH: u32 = 20;
const COLORBAR_GAP: u32 = 24;

/// Anchor colors of the blue ramp, light to dark.
const BLUES: [[u8; 3]; 9] = [
    [247, 251, 255],
    [222, 235, 247],
    [198, 219, 239],
    [158, 202, 225],
    [107, 174, 214],
    [66, 146, 198],
    [33, 113, 181],
    [8, 81, 156],
    [8, 48, 107],
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(
        "confusion matrix must be square with one label per row, \
         got {rows} rows and {labels} labels"
    )]
    Shape { rows: usize, labels: usize },
    #[error("Failed to write image {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// How cell values are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    /// Integer counts.
    Count,
    /// Two-decimal fractions.
    Fraction,
}

impl CellFormat {
    fn format(self, value: f64) -> String {
        match self {
            Self::Count => format!("{}", value.round() as i64),
            Self::Fraction => format!("{value:.2}"),
        }
    }
}

/// Labelled heatmap of a square matrix.
#[derive(Debug, Clone)]
pub struct ConfusionPlot<'a> {
    pub title: &'a str,
    pub labels: &'a [&'a str],
    pub values: &'a [Vec<f64>],
    pub format: CellFormat,
}

impl ConfusionPlot<'_> {
    fn validate(&self) -> Result<(), RenderError> {
        let n = self.labels.len();
        if self.values.len() != n || self.values.iter().any(|row| row.len() != n) {
            return Err(RenderError::Shape {
                rows: self.values.len(),
                labels: n,
            });
        }
        Ok(())
    }

    fn max_value(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn min_value(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Rasterize the plot.
    pub fn render(&self) -> Result<RgbImage, RenderError> {
        self.validate()?;
        let n = self.labels.len() as u32;
        let max = self.max_value();
        let min = self.min_value();
        let threshold = max / 2.0;

        let tick_label_width = self
            .labels
            .iter()
            .map(|label| text_width(label, TICK_SCALE))
            .max()
            .unwrap_or(0);
        let caption_column = MARGIN + GLYPH_HEIGHT * CAPTION_SCALE + MARGIN;
        let grid_x = caption_column + tick_label_width + MARGIN;
        let grid_y = MARGIN * 2 + GLYPH_HEIGHT * TITLE_SCALE + MARGIN;
        let grid = n * CELL_SIZE;
        let colorbar_x = grid_x + grid + COLORBAR_GAP;
        let colorbar_labels = [self.format.format(max), self.format.format(min.min(max))];
        let colorbar_label_width = colorbar_labels
            .iter()
            .map(|label| text_width(label, TICK_SCALE))
            .max()
            .unwrap_or(0);
        let width = colorbar_x + COLORBAR_WIDTH + 6 + colorbar_label_width + MARGIN;
        let title_width = text_width(self.title, TITLE_SCALE) + 2 * MARGIN;
        let width = width.max(grid_x + title_width);
        let height = grid_y + grid + MARGIN + GLYPH_HEIGHT * TICK_SCALE + MARGIN
            + GLYPH_HEIGHT * CAPTION_SCALE
            + MARGIN;

        let mut image = RgbImage::from_pixel(width, height, WHITE);

        draw_text_centered(
            &mut image,
            grid_x + grid / 2,
            MARGIN * 2,
            self.title,
            TITLE_SCALE,
            BLACK,
        );

        for (row, values) in self.values.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                let x = grid_x + col as u32 * CELL_SIZE;
                let y = grid_y + row as u32 * CELL_SIZE;
                fill_rect(&mut image, x, y, CELL_SIZE, CELL_SIZE, shade(value, min, max));
                let text = self.format.format(value);
                let text_color = text_color(value, threshold);
                let text_y = y + (CELL_SIZE - GLYPH_HEIGHT * VALUE_SCALE) / 2;
                draw_text_centered(
                    &mut image,
                    x + CELL_SIZE / 2,
                    text_y,
                    &text,
                    VALUE_SCALE,
                    text_color,
                );
            }
        }
        stroke_rect(&mut image, grid_x, grid_y, grid, grid, BLACK);

        for (idx, label) in self.labels.iter().enumerate() {
            let center = idx as u32 * CELL_SIZE + CELL_SIZE / 2;
            let y_tick_x = grid_x - MARGIN / 2 - text_width(label, TICK_SCALE);
            let y_tick_y = grid_y + center - GLYPH_HEIGHT * TICK_SCALE / 2;
            draw_text(&mut image, y_tick_x, y_tick_y, label, TICK_SCALE, BLACK);
            draw_text_centered(
                &mut image,
                grid_x + center,
                grid_y + grid + MARGIN / 2,
                label,
                TICK_SCALE,
                BLACK,
            );
        }

        draw_text_stacked(
            &mut image,
            MARGIN,
            grid_y + grid / 2,
            "True label",
            CAPTION_SCALE,
            BLACK,
        );
        draw_text_centered(
            &mut image,
            grid_x + grid / 2,
            grid_y + grid + MARGIN + GLYPH_HEIGHT * TICK_SCALE + MARGIN,
            "Predicted label",
            CAPTION_SCALE,
            BLACK,
        );

        draw_colorbar(&mut image, colorbar_x, grid_y, grid, min, max);
        draw_text(
            &mut image,
            colorbar_x + COLORBAR_WIDTH + 6,
            grid_y,
            &colorbar_labels[0],
            TICK_SCALE,
            BLACK,
        );
        draw_text(
            &mut image,
            colorbar_x + COLORBAR_WIDTH + 6,
            grid_y + grid - GLYPH_HEIGHT * TICK_SCALE,
            &colorbar_labels[1],
            TICK_SCALE,
            BLACK,
        );

        Ok(image)
    }

    /// Render and write the plot as PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let image = self.render()?;
        image.save(path).map_err(|source| RenderError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Cell text color: white above `threshold`, black otherwise.
pub fn text_color(value: f64, threshold: f64) -> Rgb<u8> {
    if value > threshold { WHITE } else { BLACK }
}

/// Blue ramp color for `value` scaled into `[min, max]`.
pub fn shade(value: f64, min: f64, max: f64) -> Rgb<u8> {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = t * (BLUES.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(BLUES.len() - 1);
    let frac = scaled - lower as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (BLUES[lower], BLUES[upper]);
    Rgb([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])])
}

fn draw_colorbar(image: &mut RgbImage, x: u32, y: u32, height: u32, min: f64, max: f64) {
    if height == 0 {
        return;
    }
    for offset in 0..height {
        let t = 1.0 - offset as f64 / (height - 1).max(1) as f64;
        let value = min + (max - min) * t;
        fill_rect(image, x, y + offset, COLORBAR_WIDTH, 1, shade(value, min, max));
    }
    stroke_rect(image, x, y, COLORBAR_WIDTH, height, BLACK);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LABELS: [&str; 3] = ["Iris-setosa", "Iris-versicolor", "Iris-virginica"];

    fn counts() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 0.0, 0.0],
            vec![0.0, 9.0, 1.0],
            vec![0.0, 2.0, 8.0],
        ]
    }

    #[test]
    fn text_turns_white_above_half_max() {
        assert_eq!(text_color(6.0, 5.0), WHITE);
        assert_eq!(text_color(5.0, 5.0), BLACK);
        assert_eq!(text_color(0.0, 5.0), BLACK);
    }

    #[test]
    fn shade_spans_ramp_endpoints() {
        assert_eq!(shade(0.0, 0.0, 10.0), Rgb(BLUES[0]));
        assert_eq!(shade(10.0, 0.0, 10.0), Rgb(BLUES[8]));
        assert_eq!(shade(3.0, 3.0, 3.0), Rgb(BLUES[0]));
    }

    #[test]
    fn renders_cells_with_ramp_colors() {
        let values = counts();
        let plot = ConfusionPlot {
            title: "Confusion matrix",
            labels: &LABELS,
            values: &values,
            format: CellFormat::Count,
        };
        let image = plot.render().unwrap();
        assert!(image.width() > 3 * CELL_SIZE);
        assert!(image.height() > 3 * CELL_SIZE);
        // The darkest cell (10 counts) must contain the darkest ramp color.
        let darkest = Rgb(BLUES[8]);
        assert!(image.pixels().any(|pixel| *pixel == darkest));
    }

    #[test]
    fn rejects_non_square_input() {
        let values = vec![vec![1.0, 2.0]];
        let plot = ConfusionPlot {
            title: "bad",
            labels: &LABELS,
            values: &values,
            format: CellFormat::Count,
        };
        assert!(matches!(plot.render(), Err(RenderError::Shape { .. })));
    }

    #[test]
    fn writes_png_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("confusion_matrix_normalized.png");
        let values = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.9, 0.1],
            vec![0.0, 0.2, 0.8],
        ];
        let plot = ConfusionPlot {
            title: "Normalized confusion matrix",
            labels: &LABELS,
            values: &values,
            format: CellFormat::Fraction,
        };
        plot.save_png(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn fraction_cells_use_two_decimals() {
        assert_eq!(CellFormat::Fraction.format(0.333), "0.33");
        assert_eq!(CellFormat::Count.format(7.0), "7");
    }
}
