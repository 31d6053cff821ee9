//! Map projections
//!
//! Only the pieces the scale math needs: inverse projection to geographic
//! coordinates and the ground distance covered by one display unit at a
//! point. The working CRS is ETRS-TM35FIN (EPSG:3067), a transverse Mercator
//! zone on the GRS80 ellipsoid.

use std::fmt;
use std::sync::Arc;

/// Sphere radius used for ground distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A projected coordinate reference system
pub trait Projection: Send + Sync + fmt::Debug {
    /// Registry code, e.g. `EPSG:3067`
    fn code(&self) -> &str;

    /// Meters per projected unit
    fn meters_per_unit(&self) -> f64 {
        1.0
    }

    /// Projected coordinates to `[lon, lat]` in degrees
    fn to_geographic(&self, point: [f64; 2]) -> [f64; 2];

    /// Ground distance, in projected units, covered by `resolution` units
    /// centered on `point`.
    ///
    /// Projects a horizontal and a vertical span of `resolution` to
    /// geographic coordinates and averages their great-circle lengths.
    fn point_resolution(&self, resolution: f64, point: [f64; 2]) -> f64 {
        let half = resolution / 2.0;
        let west = self.to_geographic([point[0] - half, point[1]]);
        let east = self.to_geographic([point[0] + half, point[1]]);
        let south = self.to_geographic([point[0], point[1] - half]);
        let north = self.to_geographic([point[0], point[1] + half]);

        let width = haversine_distance(west, east);
        let height = haversine_distance(south, north);
        ((width + height) / 2.0) / self.meters_per_unit()
    }
}

/// Great-circle distance in meters between two `[lon, lat]` points
pub fn haversine_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let lat1 = a[1].to_radians();
    let lat2 = b[1].to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b[0] - a[0]).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Unprojected local plane
///
/// Coordinates are plain meters with no distortion; the point resolution
/// equals the resolution everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planar;

impl Projection for Planar {
    fn code(&self) -> &str {
        "LOCAL"
    }

    fn to_geographic(&self, point: [f64; 2]) -> [f64; 2] {
        // Small-area equirectangular approximation around (0, 0)
        let deg_per_m = 180.0 / (std::f64::consts::PI * EARTH_RADIUS_M);
        [point[0] * deg_per_m, point[1] * deg_per_m]
    }

    fn point_resolution(&self, resolution: f64, _point: [f64; 2]) -> f64 {
        resolution
    }
}

/// Transverse Mercator on an ellipsoid
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    code: String,
    semi_major: f64,
    flattening: f64,
    central_meridian: f64,
    scale_factor: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    /// ETRS-TM35FIN: GRS80, zone 35 central meridian, meters
    pub fn etrs_tm35fin() -> Self {
        Self {
            code: "EPSG:3067".to_string(),
            semi_major: 6_378_137.0,
            flattening: 1.0 / 298.257_222_101,
            central_meridian: 27.0,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: 0.0,
        }
    }

    /// UTM zone on GRS80, northern hemisphere
    pub fn utm_north(zone: u8) -> Self {
        Self {
            code: format!("UTM:{}N", zone),
            central_meridian: f64::from(zone) * 6.0 - 183.0,
            ..Self::etrs_tm35fin()
        }
    }
}

impl Projection for TransverseMercator {
    fn code(&self) -> &str {
        &self.code
    }

    fn to_geographic(&self, point: [f64; 2]) -> [f64; 2] {
        let a = self.semi_major;
        let k0 = self.scale_factor;
        let e2 = self.flattening * (2.0 - self.flattening);
        let ep2 = e2 / (1.0 - e2);
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let x = point[0] - self.false_easting;
        let m = (point[1] - self.false_northing) / k0;

        // Footpoint latitude
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let sq = (1.0 - e2).sqrt();
        let e1 = (1.0 - sq) / (1.0 + sq);
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin1, cos1) = phi1.sin_cos();
        let tan1 = sin1 / cos1;
        let c1 = ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let w = 1.0 - e2 * sin1 * sin1;
        let n1 = a / w.sqrt();
        let r1 = a * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * k0);

        let lat = phi1
            - (n1 * tan1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);
        let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
                / 120.0)
            / cos1;

        [self.central_meridian + lon.to_degrees(), lat.to_degrees()]
    }
}

/// Look up a projection by its registry code
pub fn projection_for_code(code: &str) -> Option<Arc<dyn Projection>> {
    match code.to_uppercase().as_str() {
        "EPSG:3067" | "ETRS-TM35FIN" => Some(Arc::new(TransverseMercator::etrs_tm35fin())),
        "LOCAL" | "PLANAR" => Some(Arc::new(Planar)),
        _ => {
            tracing::debug!("Unknown projection code {}", code);
            None
        }
    }
}
