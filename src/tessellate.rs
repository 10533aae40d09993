// tessellate.rs — 经纬度网格球体生成 + 逐顶点纹理采样
//
// One quad strip per latitude band; each strip alternates the lower and upper
// ring vertex for every longitude step. Colors come from the static map, the
// orientation is applied later as a model transform.

use crate::config::GridResolution;
use crate::equirect::{EquirectangularImage, Rgb};
use crate::error::{GlobeError, Result};
use crate::rotation::to_cartesian;
use glam::DVec3;
use std::f64::consts::PI;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereSample {
    pub latitude: f64,
    pub longitude: f64,
    pub position: DVec3,
    pub normal: DVec3,
    pub color: Rgb,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl SphereVertex {
    pub fn from_sample(sample: &SphereSample, radius: f32) -> Self {
        let p = sample.position.as_vec3();
        let [r, g, b] = sample.color;
        Self {
            position: (p * radius).to_array(),
            normal: sample.normal.as_vec3().to_array(),
            color: [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0],
        }
    }
}

/// How a band's two rings pick their texture row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandColoring {
    /// Each ring samples its own row; colors blend across the band.
    #[default]
    PerVertex,
    /// Both rings sample the band's middle row, so every band is one solid
    /// color. Used for the striped placeholder globe.
    PerBand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuadStrip {
    pub vertices: Vec<SphereVertex>,
}

/// Latitude of ring `ring` (0 = south pole, `stacks` = north pole).
pub fn ring_latitude(ring: u32, stacks: u32) -> f64 {
    PI * (ring as f64 / stacks as f64 - 0.5)
}

/// Grid node (`ring`, `j`), colored from texture row `v`.
fn sample_node(
    image: &EquirectangularImage,
    resolution: GridResolution,
    ring: u32,
    j: u32,
    v: f64,
) -> SphereSample {
    let latitude = ring_latitude(ring, resolution.stacks);
    let longitude = 2.0 * PI * j as f64 / resolution.slices as f64;
    let position = to_cartesian(latitude, longitude);

    let u = j as f64 / resolution.slices as f64;

    SphereSample {
        latitude,
        longitude,
        position,
        normal: position,
        color: image.sample_uv(u, v),
    }
}

pub fn tessellate(
    image: &EquirectangularImage,
    resolution: GridResolution,
    radius: f32,
) -> Result<Vec<QuadStrip>> {
    tessellate_with(image, resolution, radius, BandColoring::PerVertex)
}

pub fn tessellate_with(
    image: &EquirectangularImage,
    resolution: GridResolution,
    radius: f32,
    coloring: BandColoring,
) -> Result<Vec<QuadStrip>> {
    resolution.validate("sphere resolution")?;
    if !(radius > 0.0) {
        return Err(GlobeError::Configuration(format!(
            "sphere radius must be positive, got {radius}"
        )));
    }

    let strips = (0..resolution.stacks)
        .map(|i| {
            let mut vertices = Vec::with_capacity(2 * (resolution.slices as usize + 1));
            let stacks = resolution.stacks as f64;
            let (v0, v1) = match coloring {
                BandColoring::PerVertex => (i as f64 / stacks, (i + 1) as f64 / stacks),
                BandColoring::PerBand => {
                    let mid = (i as f64 + 0.5) / stacks;
                    (mid, mid)
                }
            };
            for j in 0..=resolution.slices {
                let lower = sample_node(image, resolution, i, j, v0);
                let upper = sample_node(image, resolution, i + 1, j, v1);
                vertices.push(SphereVertex::from_sample(&lower, radius));
                vertices.push(SphereVertex::from_sample(&upper, radius));
            }
            QuadStrip { vertices }
        })
        .collect();

    Ok(strips)
}

/// Red line through both poles, reaching past the surface. Drawn with the
/// same model transform as the sphere, so it shows the current tilt.
pub fn polar_axis(radius: f32) -> [SphereVertex; 2] {
    let end = |z: f32| SphereVertex {
        position: [0.0, 0.0, z * radius * AXIS_EXTENT],
        normal: [0.0, 0.0, z],
        color: [1.0, 0.0, 0.0],
    };
    [end(-1.0), end(1.0)]
}

const AXIS_EXTENT: f32 = 1.5;

/// Flatten strips into an indexed triangle list (two triangles per quad).
pub fn to_indexed(strips: &[QuadStrip]) -> (Vec<SphereVertex>, Vec<u32>) {
    let total: usize = strips.iter().map(|s| s.vertices.len()).sum();
    let mut vertices = Vec::with_capacity(total);
    let mut indices = Vec::with_capacity(total.saturating_sub(2) * 3);

    for strip in strips {
        let base = vertices.len() as u32;
        let quads = strip.vertices.len().saturating_sub(2) / 2;
        for q in 0..quads as u32 {
            let a = base + 2 * q;
            let b = a + 1;
            indices.extend_from_slice(&[a, a + 2, b, b, a + 2, b + 2]);
        }
        vertices.extend_from_slice(&strip.vertices);
    }

    (vertices, indices)
}

/// Holds the last tessellation and rebuilds only when the map, resolution,
/// radius or band coloring change.
#[derive(Debug, Default)]
pub struct SphereCache {
    key: Option<(Arc<EquirectangularImage>, GridResolution, u32, BandColoring)>,
    strips: Vec<QuadStrip>,
}

impl SphereCache {
    /// Returns the strips and whether they were rebuilt.
    pub fn get_or_build(
        &mut self,
        image: &Arc<EquirectangularImage>,
        resolution: GridResolution,
        radius: f32,
        coloring: BandColoring,
    ) -> Result<(&[QuadStrip], bool)> {
        let hit = matches!(
            &self.key,
            Some((img, res, r, c)) if Arc::ptr_eq(img, image)
                && *res == resolution
                && *r == radius.to_bits()
                && *c == coloring
        );
        if !hit {
            self.strips = tessellate_with(image, resolution, radius, coloring)?;
            self.key = Some((Arc::clone(image), resolution, radius.to_bits(), coloring));
        }
        Ok((&self.strips, !hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_4x2() -> EquirectangularImage {
        // column x -> red channel, row 0 red-ish, row 1 blue-ish
        EquirectangularImage::from_fn(4, 2, |x, y| {
            let c = (x * 60) as u8;
            if y == 0 {
                [c, 0, 0]
            } else {
                [c, 0, 255]
            }
        })
        .unwrap()
    }

    fn rgb(v: &SphereVertex) -> [u8; 3] {
        [
            (v.color[0] * 255.0).round() as u8,
            (v.color[1] * 255.0).round() as u8,
            (v.color[2] * 255.0).round() as u8,
        ]
    }

    #[test]
    fn strip_and_vertex_counts() {
        let img = EquirectangularImage::banded(8).unwrap();
        let strips = tessellate(&img, GridResolution::new(12, 7), 1.0).unwrap();
        assert_eq!(strips.len(), 7);
        for s in &strips {
            assert_eq!(s.vertices.len(), 2 * (12 + 1));
        }
    }

    #[test]
    fn four_by_two_gradient_sampling() {
        let img = gradient_4x2();
        let strips = tessellate(&img, GridResolution::new(4, 2), 1.0).unwrap();
        assert_eq!(strips.len(), 2);

        // j = 2 -> column round(2/4 * 3) = 2
        let band0 = &strips[0].vertices;
        assert_eq!(rgb(&band0[4]), [120, 0, 0]); // ring 0 -> row 0
        assert_eq!(rgb(&band0[5]), [120, 0, 255]); // ring 1 -> row round(0.5) = 1

        let band1 = &strips[1].vertices;
        assert_eq!(rgb(&band1[4]), [120, 0, 255]);
        assert_eq!(rgb(&band1[5]), [120, 0, 255]);

        // j = 1 -> round(0.75) = 1, j = 4 -> column 3
        assert_eq!(rgb(&band0[2]), [60, 0, 0]);
        assert_eq!(rgb(&band0[8]), [180, 0, 0]);
    }

    #[test]
    fn normals_are_unit_and_positions_scaled() {
        let img = EquirectangularImage::banded(4).unwrap();
        let strips = tessellate(&img, GridResolution::new(8, 4), 2.5).unwrap();
        for v in strips.iter().flat_map(|s| &s.vertices) {
            let n = glam::Vec3::from(v.normal);
            let p = glam::Vec3::from(v.position);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((p - n * 2.5).length() < 1e-5);
        }
    }

    #[test]
    fn bands_span_pole_to_pole() {
        let img = EquirectangularImage::banded(4).unwrap();
        let strips = tessellate(&img, GridResolution::new(8, 4), 1.0).unwrap();
        assert!((strips[0].vertices[0].position[2] + 1.0).abs() < 1e-6);
        assert!((strips[3].vertices[1].position[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_resolution() {
        let img = EquirectangularImage::banded(2).unwrap();
        assert!(matches!(
            tessellate(&img, GridResolution::new(0, 4), 1.0),
            Err(GlobeError::Configuration(_))
        ));
        assert!(matches!(
            tessellate(&img, GridResolution::new(4, 0), 1.0),
            Err(GlobeError::Configuration(_))
        ));
    }

    #[test]
    fn indexed_mesh_covers_every_quad() {
        let img = EquirectangularImage::banded(3).unwrap();
        let strips = tessellate(&img, GridResolution::new(5, 3), 1.0).unwrap();
        let (vertices, indices) = to_indexed(&strips);
        assert_eq!(vertices.len(), 3 * 2 * 6);
        assert_eq!(indices.len(), 3 * 5 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn cache_rebuilds_only_on_change() {
        let img = Arc::new(EquirectangularImage::banded(4).unwrap());
        let res = GridResolution::new(6, 4);
        let mut cache = SphereCache::default();

        let per_vertex = BandColoring::PerVertex;

        assert!(cache.get_or_build(&img, res, 1.0, per_vertex).unwrap().1);
        assert!(!cache.get_or_build(&img, res, 1.0, per_vertex).unwrap().1);
        assert!(cache.get_or_build(&img, GridResolution::new(6, 5), 1.0, per_vertex).unwrap().1);

        let swapped = Arc::new(EquirectangularImage::banded(4).unwrap());
        let res = GridResolution::new(6, 5);
        assert!(cache.get_or_build(&swapped, res, 1.0, per_vertex).unwrap().1);
        assert!(!cache.get_or_build(&swapped, res, 1.0, per_vertex).unwrap().1);
        assert!(cache.get_or_build(&swapped, res, 1.0, BandColoring::PerBand).unwrap().1);
    }

    #[test]
    fn banded_placeholder_paints_solid_stripes() {
        for stacks in [3u32, 8, 100] {
            let img = EquirectangularImage::banded(stacks).unwrap();
            let res = GridResolution::new(2 * stacks, stacks);
            let strips = tessellate_with(&img, res, 1.0, BandColoring::PerBand).unwrap();
            for (i, strip) in strips.iter().enumerate() {
                let expected = if i % 2 == 0 { [255, 255, 255] } else { [0, 0, 0] };
                for v in &strip.vertices {
                    assert_eq!(rgb(v), expected, "band {i} of {stacks}");
                }
            }
        }
    }

    #[test]
    fn polar_axis_pierces_both_poles() {
        let [south, north] = polar_axis(2.0);
        assert_eq!(south.position, [0.0, 0.0, -3.0]);
        assert_eq!(north.position, [0.0, 0.0, 3.0]);
        assert_eq!(north.color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn per_band_coloring_keeps_geometry() {
        let img = EquirectangularImage::banded(6).unwrap();
        let res = GridResolution::new(10, 6);
        let a = tessellate(&img, res, 1.0).unwrap();
        let b = tessellate_with(&img, res, 1.0, BandColoring::PerBand).unwrap();
        for (sa, sb) in a.iter().zip(&b) {
            for (va, vb) in sa.vertices.iter().zip(&sb.vertices) {
                assert_eq!(va.position, vb.position);
                assert_eq!(va.normal, vb.normal);
            }
        }
    }
}
