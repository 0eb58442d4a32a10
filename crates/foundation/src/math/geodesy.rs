/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// Mean Earth radius (meters), used for great-circle distances.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Geographic coordinates in degrees (WGS84, wkid 4326).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }

    /// Finite, longitude in [-180, 180], latitude in [-90, 90].
    pub fn is_valid(&self) -> bool {
        self.lon_deg.is_finite()
            && self.lat_deg.is_finite()
            && (-180.0..=180.0).contains(&self.lon_deg)
            && (-90.0..=90.0).contains(&self.lat_deg)
    }
}

pub fn wrap_lon_deg(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Great-circle distance in meters (haversine).
pub fn haversine_m(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.lat_deg.to_radians();
    let lat2 = b.lat_deg.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon_deg - a.lon_deg).to_radians();

    let h = (0.5 * dlat).sin().powi(2) + lat1.cos() * lat2.cos() * (0.5 * dlon).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
}
