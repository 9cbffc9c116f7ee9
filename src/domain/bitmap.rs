use std::fs;
use std::path::Path;
use image::{ImageReader, RgbaImage};
use crate::error::{ConfigurationError, SimulationError};

/// Two-colour raster describing the domain geometry, one pixel per grid cell.
///
/// Row 0 is the top of the image, i.e. the top of the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: usize,
    height: usize,
    obstacle: Vec<bool>, // row-major
}

impl Bitmap {
    pub fn new(width: usize, height: usize, obstacle: Vec<bool>) -> Result<Self, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::MalformedBitmap("bitmap has no pixels".to_string()));
        }
        if obstacle.len() != width * height {
            return Err(ConfigurationError::MalformedBitmap(format!(
                "expected {} pixels for a {}x{} bitmap, found {}",
                width * height, width, height, obstacle.len()
            )));
        }
        Ok(Self { width, height, obstacle })
    }

    /// Character art, one string per row: `#` is an obstacle, `.` is fluid.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, ConfigurationError> {
        let height = rows.len();
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        let mut obstacle = Vec::with_capacity(width * height);
        for (row_idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(ConfigurationError::MalformedBitmap(format!(
                    "row {} has {} pixels, expected {}",
                    row_idx, row.chars().count(), width
                )));
            }
            for c in row.chars() {
                match c {
                    '#' => obstacle.push(true),
                    '.' => obstacle.push(false),
                    other => {
                        return Err(ConfigurationError::MalformedBitmap(format!(
                            "unexpected character '{}' in row {}",
                            other, row_idx
                        )))
                    }
                }
            }
        }
        Self::new(width, height, obstacle)
    }

    /// Pure black pixels are obstacles, every other colour is fluid.
    pub fn from_image(image: &RgbaImage) -> Result<Self, ConfigurationError> {
        let (width, height) = image.dimensions();
        let obstacle = image
            .pixels()
            .map(|pixel| {
                let [r, g, b, _] = pixel.0;
                r == 0 && g == 0 && b == 0
            })
            .collect();
        Self::new(width as usize, height as usize, obstacle)
    }

    /// Decodes a PNG or PBM image; `.txt` files are read as character art.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt")) {
            let text = fs::read_to_string(path)?;
            let rows: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
            return Ok(Self::from_rows(&rows)?);
        }

        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| ConfigurationError::MalformedBitmap(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_image(&image.to_rgba8())?)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_obstacle(&self, x: usize, row: usize) -> bool {
        self.obstacle[x + row * self.width]
    }
}
