use super::Vec3;

/// Geographic location in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub fn project(self, radius: f64) -> Vec3 {
        project(self.lat_deg, self.lon_deg, radius)
    }
}

/// Maps latitude/longitude (degrees) onto a sphere of `radius` centred at the origin.
///
/// Convention: +Y is the north pole, and longitude is offset by 180° so that
/// the prime meridian lands on +X after the azimuth flip. Equirectangular
/// textures wrapped by `gpu::mesh::SphereMesh` use the same convention, so
/// the two must change together.
///
/// Inputs are not validated; out-of-range angles still produce a point on
/// the sphere.
pub fn project(lat_deg: f64, lon_deg: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lon_deg + 180.0).to_radians();

    let x = -radius * phi.sin() * theta.cos();
    let y = radius * phi.cos();
    let z = radius * phi.sin() * theta.sin();

    Vec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::{GeoPoint, project};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn poles_sit_on_the_y_axis() {
        let north = project(90.0, 0.0, 80.0);
        assert_close(north.x, 0.0, 1e-9);
        assert_close(north.y, 80.0, 1e-9);
        assert_close(north.z, 0.0, 1e-9);

        let south = project(-90.0, 45.0, 80.0);
        assert_close(south.y, -80.0, 1e-9);
    }

    #[test]
    fn prime_meridian_on_equator_is_positive_x() {
        let p = project(0.0, 0.0, 2.0);
        assert_close(p.x, 2.0, 1e-12);
        assert_close(p.y, 0.0, 1e-12);
        assert_close(p.z, 0.0, 1e-12);

        let east = project(0.0, 90.0, 2.0);
        assert_close(east.x, 0.0, 1e-12);
        assert_close(east.z, -2.0, 1e-12);
    }

    #[test]
    fn projected_points_lie_on_the_sphere() {
        for radius in [0.5, 1.0, 80.0, 81.0, 6_378_137.0] {
            let mut lat = -90.0;
            while lat <= 90.0 {
                let mut lon = -180.0;
                while lon <= 180.0 {
                    let p = project(lat, lon, radius);
                    assert_close(p.length(), radius, radius * 1e-12);
                    lon += 22.5;
                }
                lat += 15.0;
            }
        }
    }

    #[test]
    fn projection_is_deterministic() {
        let a = GeoPoint::new(20.5937, 78.9629).project(81.0);
        let b = GeoPoint::new(20.5937, 78.9629).project(81.0);
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_input_still_lands_on_sphere() {
        let p = project(135.0, 400.0, 10.0);
        assert_close(p.length(), 10.0, 1e-9);
    }
}
