// rotation.rs — 球面旋转：(纬度, 经度) 经 yaw/tilt 变换及其精确逆变换
//
// Latitude/longitude are radians, yaw/tilt are degrees. The forward map is
// Rz(yaw) · Ry(tilt): tilt about Y first, then yaw about Z. The renderer's
// model transform is built from the same rotation (see `model_matrix`), so
// the sphere on screen and the reprojected map agree.

use crate::orientation::OrientationState;
use glam::{DMat3, DVec3};
use std::f64::consts::PI;

/// (x, y, z) on the unit sphere; z points at latitude +π/2.
#[inline]
pub fn to_cartesian(lat: f64, lon: f64) -> DVec3 {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Inverse of [`to_cartesian`]. `z` is clamped before `asin`; drift near the
/// poles would otherwise produce NaN.
#[inline]
pub fn from_cartesian(v: DVec3) -> (f64, f64) {
    let z = v.z.clamp(-1.0, 1.0);
    (z.asin(), v.y.atan2(v.x))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalRotation {
    yaw_deg: f64,
    tilt_deg: f64,
    sin_yaw: f64,
    cos_yaw: f64,
    sin_tilt: f64,
    cos_tilt: f64,
}

impl SphericalRotation {
    pub fn new(yaw_deg: f64, tilt_deg: f64) -> Self {
        let (sin_yaw, cos_yaw) = yaw_deg.to_radians().sin_cos();
        let (sin_tilt, cos_tilt) = tilt_deg.to_radians().sin_cos();
        Self {
            yaw_deg,
            tilt_deg,
            sin_yaw,
            cos_yaw,
            sin_tilt,
            cos_tilt,
        }
    }

    pub fn from_orientation(o: &OrientationState) -> Self {
        Self::new(o.yaw, o.tilt)
    }

    fn tilt(&self, v: DVec3, sign: f64) -> DVec3 {
        let s = sign * self.sin_tilt;
        DVec3::new(
            v.x * self.cos_tilt + v.z * s,
            v.y,
            -v.x * s + v.z * self.cos_tilt,
        )
    }

    fn yaw(&self, v: DVec3, sign: f64) -> DVec3 {
        let s = sign * self.sin_yaw;
        DVec3::new(
            v.x * self.cos_yaw - v.y * s,
            v.x * s + v.y * self.cos_yaw,
            v.z,
        )
    }

    /// Texture frame → world frame.
    pub fn rotate_vector(&self, v: DVec3) -> DVec3 {
        self.yaw(self.tilt(v, 1.0), 1.0)
    }

    /// World frame → texture frame. Undoes yaw, then tilt.
    pub fn unrotate_vector(&self, v: DVec3) -> DVec3 {
        self.tilt(self.yaw(v, -1.0), -1.0)
    }

    pub fn apply(&self, lat: f64, lon: f64) -> (f64, f64) {
        from_cartesian(self.rotate_vector(to_cartesian(lat, lon)))
    }

    pub fn invert(&self, lat: f64, lon: f64) -> (f64, f64) {
        from_cartesian(self.unrotate_vector(to_cartesian(lat, lon)))
    }

    /// Forward rotation as a matrix, for the GPU model transform.
    pub fn matrix(&self) -> DMat3 {
        DMat3::from_rotation_z(self.yaw_deg.to_radians())
            * DMat3::from_rotation_y(self.tilt_deg.to_radians())
    }

    /// Sphere mesh space → world. Mesh longitude `2π·j/slices` carries
    /// texture column `j/slices`, which in texture-frame longitude is
    /// `2π·(j/slices − 0.5)`: the mesh is a half turn about Z ahead of the
    /// texture frame.
    pub fn model_matrix(&self) -> DMat3 {
        self.matrix() * DMat3::from_rotation_z(PI)
    }
}

pub fn apply(yaw_deg: f64, tilt_deg: f64, lat: f64, lon: f64) -> (f64, f64) {
    SphericalRotation::new(yaw_deg, tilt_deg).apply(lat, lon)
}

pub fn invert(yaw_deg: f64, tilt_deg: f64, lat: f64, lon: f64) -> (f64, f64) {
    SphericalRotation::new(yaw_deg, tilt_deg).invert(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn lon_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(2.0 * PI);
        d.min(2.0 * PI - d)
    }

    #[test]
    fn identity_leaves_coordinates_alone() {
        let (lat, lon) = apply(0.0, 0.0, 0.4, -1.1);
        assert!((lat - 0.4).abs() < EPS);
        assert!((lon + 1.1).abs() < EPS);
    }

    #[test]
    fn yaw_shifts_longitude() {
        let (lat, lon) = apply(90.0, 0.0, 0.2, 0.0);
        assert!((lat - 0.2).abs() < EPS);
        assert!((lon - FRAC_PI_2).abs() < EPS);

        let (_, lon) = invert(90.0, 0.0, 0.2, 0.0);
        assert!((lon + FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn tilt_moves_equator_to_pole() {
        // x1 = cos(90)·1 = 0, z1 = -sin(90)·1 = -1
        let (lat, _) = apply(0.0, 90.0, 0.0, 0.0);
        assert!((lat + FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn invert_undoes_apply() {
        for &yaw in &[-170.0, -45.0, 0.0, 30.0, 135.0, 180.0] {
            for &tilt in &[-90.0, -60.0, -5.0, 0.0, 20.0, 75.0, 90.0] {
                for k in 1..12 {
                    let lat = -1.4 + 2.8 * k as f64 / 12.0;
                    for m in 0..16 {
                        let lon = -PI + 2.0 * PI * (m as f64 + 0.5) / 16.0;
                        let (la, lo) = invert(yaw, tilt, lat, lon);
                        let (lat2, lon2) = apply(yaw, tilt, la, lo);
                        assert!(
                            (lat2 - lat).abs() < 1e-7,
                            "lat yaw={yaw} tilt={tilt} {lat} -> {lat2}"
                        );
                        assert!(
                            lon_diff(lon2, lon) < 1e-7,
                            "lon yaw={yaw} tilt={tilt} {lon} -> {lon2}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn poles_never_produce_nan() {
        for &tilt in &[-90.0, 90.0] {
            for m in 0..=32 {
                let lon = -PI + 2.0 * PI * m as f64 / 32.0;
                for &lat in &[-FRAC_PI_2, 0.0, FRAC_PI_2] {
                    let (a, b) = apply(37.0, tilt, lat, lon);
                    let (c, d) = invert(37.0, tilt, lat, lon);
                    assert!(a.is_finite() && b.is_finite() && c.is_finite() && d.is_finite());
                    assert!(a.abs() <= FRAC_PI_2 && c.abs() <= FRAC_PI_2);
                }
            }
        }
    }

    #[test]
    fn from_cartesian_clamps_drift() {
        let (lat, _) = from_cartesian(DVec3::new(0.0, 0.0, 1.0 + 1e-12));
        assert_eq!(lat, FRAC_PI_2);
        let (lat, _) = from_cartesian(DVec3::new(0.0, 0.0, -1.0 - 1e-12));
        assert_eq!(lat, -FRAC_PI_2);
    }

    #[test]
    fn matrix_agrees_with_apply() {
        let rot = SphericalRotation::new(-63.0, 41.0);
        let m = rot.matrix();
        for &(lat, lon) in &[(0.3, 1.2), (-1.0, -2.5), (1.2, 3.0)] {
            let v = to_cartesian(lat, lon);
            let a = rot.rotate_vector(v);
            let b = m * v;
            assert!((a - b).length() < 1e-12, "{a:?} vs {b:?}");
            assert!((m.transpose() * a - v).length() < 1e-12);
        }
    }

    #[test]
    fn model_matrix_maps_mesh_longitude_into_texture_frame() {
        let rot = SphericalRotation::new(25.0, -35.0);
        let m = rot.model_matrix();
        for j in [1u32, 5, 9, 14] {
            let mesh = to_cartesian(0.4, 2.0 * PI * j as f64 / 16.0);
            let texture = to_cartesian(0.4, 2.0 * PI * (j as f64 / 16.0 - 0.5));
            assert!((m * mesh - rot.rotate_vector(texture)).length() < 1e-12);
        }
    }
}
