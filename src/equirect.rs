// equirect.rs — 等距柱状投影图像 (2:1 经纬度平面图)
//
// Row 0 is latitude -π/2, the last row +π/2. Columns are linear in longitude.

use crate::config::GridResolution;
use crate::error::{GlobeError, Result};
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbImage};
use std::f64::consts::PI;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub type Rgb = [u8; 3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquirectangularImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl EquirectangularImage {
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GlobeError::InvalidImage(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(GlobeError::InvalidImage(format!(
                "{width}x{height} image needs {expected} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Result<Self> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self::new(width, height, pixels)
    }

    /// Alternating white/black latitude bands, one per stack.
    pub fn banded(stacks: u32) -> Result<Self> {
        Self::from_fn(2, stacks, |_, y| {
            if y % 2 == 0 {
                [255, 255, 255]
            } else {
                [0, 0, 0]
            }
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Nearest-neighbour sample; `u`/`v` in [0, 1] map to columns/rows
    /// `round(u * (w - 1))` / `round(v * (h - 1))`. Out-of-range and NaN
    /// coordinates clamp to the border.
    pub fn sample_uv(&self, u: f64, v: f64) -> Rgb {
        let x = nearest_index(u, self.width);
        let y = nearest_index(v, self.height);
        self.pixels[y * self.width as usize + x]
    }

    /// Sample at a latitude/longitude (radians), quantised to a reference
    /// grid first. Longitude wraps, so ±π land on the same column.
    pub fn sample_lat_lon(&self, lat: f64, lon: f64, reference: GridResolution) -> Rgb {
        let stacks = reference.stacks as f64;
        let slices = reference.slices as f64;

        let row = ((lat / PI + 0.5) * stacks).round().clamp(0.0, stacks);
        let col = ((lon / (2.0 * PI) + 0.5) * slices).round();
        let col = if col.is_finite() { col.rem_euclid(slices) } else { 0.0 };

        self.sample_uv(col / slices, row / stacks)
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(&self.pixels) {
            dst.0 = *src;
        }
        out
    }

    /// Interleaved RGB bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }
}

impl TryFrom<RgbImage> for EquirectangularImage {
    type Error = GlobeError;

    fn try_from(img: RgbImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        let pixels = img.pixels().map(|p| p.0).collect();
        Self::new(w, h, pixels)
    }
}

fn nearest_index(t: f64, len: u32) -> usize {
    let max = (len - 1) as f64;
    let t = if t.is_nan() { 0.0 } else { t };
    (t * max).round().clamp(0.0, max) as usize
}

/// Decode a map asset from disk.
pub fn load(path: &Path) -> Result<EquirectangularImage> {
    let asset_err = |source| GlobeError::Asset {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| asset_err(image::ImageError::IoError(e)))?;
    let img = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map_err(asset_err)?;

    let (w, h) = img.dimensions();
    log::info!("decoded map {:?} ({}x{})", path, w, h);

    EquirectangularImage::try_from(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> EquirectangularImage {
        EquirectangularImage::from_fn(w, h, |x, y| [x as u8, y as u8, 7]).unwrap()
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(
            EquirectangularImage::new(0, 4, vec![]),
            Err(GlobeError::InvalidImage(_))
        ));
        assert!(matches!(
            EquirectangularImage::new(4, 0, vec![]),
            Err(GlobeError::InvalidImage(_))
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = EquirectangularImage::new(2, 2, vec![[0; 3]; 3]).unwrap_err();
        assert!(matches!(err, GlobeError::InvalidImage(_)));
    }

    #[test]
    fn sample_uv_hits_corners_and_clamps() {
        let img = gradient(8, 4);
        assert_eq!(img.sample_uv(0.0, 0.0), [0, 0, 7]);
        assert_eq!(img.sample_uv(1.0, 1.0), [7, 3, 7]);
        assert_eq!(img.sample_uv(-3.0, 9.0), [0, 3, 7]);
        assert_eq!(img.sample_uv(f64::NAN, f64::NAN), [0, 0, 7]);
    }

    #[test]
    fn pixel_is_bounds_checked() {
        let img = gradient(3, 2);
        assert_eq!(img.pixel(2, 1), Some([2, 1, 7]));
        assert_eq!(img.pixel(3, 0), None);
        assert_eq!(img.pixel(0, 2), None);
    }

    #[test]
    fn longitude_seam_is_continuous() {
        let img = gradient(64, 32);
        let reference = GridResolution::new(64, 32);
        let east = img.sample_lat_lon(0.3, PI - 1e-9, reference);
        let west = img.sample_lat_lon(0.3, -PI + 1e-9, reference);
        let dist = (east[0] as i32 - west[0] as i32).rem_euclid(64);
        assert!(dist.min(64 - dist) <= 1, "east {east:?} west {west:?}");
    }

    #[test]
    fn poles_map_to_first_and_last_rows() {
        let img = gradient(16, 8);
        let reference = GridResolution::new(16, 8);
        assert_eq!(img.sample_lat_lon(-PI / 2.0, 0.0, reference)[1], 0);
        assert_eq!(img.sample_lat_lon(PI / 2.0, 0.0, reference)[1], 7);
    }

    #[test]
    fn banded_alternates_rows() {
        let img = EquirectangularImage::banded(4).unwrap();
        assert_eq!(img.pixel(0, 0), Some([255, 255, 255]));
        assert_eq!(img.pixel(1, 1), Some([0, 0, 0]));
        assert_eq!(img.height(), 4);
    }

    #[test]
    fn rgb_image_conversion_keeps_layout() {
        let img = gradient(5, 3);
        let rgb = img.to_rgb_image();
        assert_eq!(rgb.get_pixel(4, 2).0, [4, 2, 7]);
        let back = EquirectangularImage::try_from(rgb).unwrap();
        assert_eq!(back, img);
        assert_eq!(img.to_rgb_bytes().len(), 5 * 3 * 3);
    }

    #[test]
    fn missing_asset_is_an_asset_error() {
        let err = load(Path::new("definitely/not/here/map.jpg")).unwrap_err();
        assert!(matches!(err, GlobeError::Asset { .. }));
    }

    #[test]
    fn corrupt_asset_is_an_asset_error() {
        let path = std::env::temp_dir().join("globe_viewer_corrupt_map.png");
        std::fs::write(&path, b"not an image at all").unwrap();
        let err = load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, GlobeError::Asset { .. }));
    }

    #[test]
    fn loads_png_from_disk() {
        let path = std::env::temp_dir().join("globe_viewer_load_test.png");
        gradient(6, 3).to_rgb_image().save(&path).unwrap();
        let map = load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!((map.width(), map.height()), (6, 3));
        assert_eq!(map.pixel(5, 2), Some([5, 2, 7]));
    }
}
