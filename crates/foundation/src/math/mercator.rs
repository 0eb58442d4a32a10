use super::geodesy::{LonLat, WGS84_A, wrap_lon_deg};

pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

/// Web Mercator tile size the zoom levels are defined against.
pub const TILE_SIZE_PX: f64 = 256.0;

pub fn world_width_m() -> f64 {
    2.0 * std::f64::consts::PI * WGS84_A
}

pub fn mercator_x_m(lon_deg: f64) -> f64 {
    WGS84_A * lon_deg.to_radians()
}

pub fn mercator_y_m(lat_deg: f64) -> f64 {
    let lat = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    WGS84_A * (0.5 * (std::f64::consts::FRAC_PI_2 + lat)).tan().ln()
}

pub fn inverse_mercator_lon_deg(x_m: f64) -> f64 {
    (x_m / WGS84_A).to_degrees()
}

pub fn inverse_mercator_lat_deg(y_m: f64) -> f64 {
    let lat = 2.0 * (y_m / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2;
    lat.to_degrees()
}

/// Ground meters per screen pixel at the given zoom level.
pub fn meters_per_px(zoom: f64) -> f64 {
    world_width_m() / (TILE_SIZE_PX * 2f64.powf(zoom))
}

/// Projects lon/lat onto a screen of `w` x `h` pixels centered on `center`.
///
/// Screen y grows downward. Longitudes are wrapped so the nearest copy of
/// the point relative to the center is used.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MercatorProjector {
    center_x: f64,
    center_y: f64,
    scale_px_per_m: f64,
    width_px: f64,
    height_px: f64,
}

impl MercatorProjector {
    pub fn new(center: LonLat, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center_x: mercator_x_m(center.lon_deg),
            center_y: mercator_y_m(center.lat_deg),
            scale_px_per_m: 1.0 / meters_per_px(zoom),
            width_px,
            height_px,
        }
    }

    pub fn to_screen(&self, p: LonLat) -> (f64, f64) {
        let ww = world_width_m();
        let dx = (mercator_x_m(p.lon_deg) - self.center_x + 0.5 * ww).rem_euclid(ww) - 0.5 * ww;
        let dy = mercator_y_m(p.lat_deg) - self.center_y;
        (
            self.width_px * 0.5 + dx * self.scale_px_per_m,
            self.height_px * 0.5 - dy * self.scale_px_per_m,
        )
    }

    pub fn to_lon_lat(&self, x_px: f64, y_px: f64) -> LonLat {
        let x_m = self.center_x + (x_px - self.width_px * 0.5) / self.scale_px_per_m;
        let y_m = self.center_y + (self.height_px * 0.5 - y_px) / self.scale_px_per_m;
        LonLat::new(
            wrap_lon_deg(inverse_mercator_lon_deg(x_m)),
            inverse_mercator_lat_deg(y_m).clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG),
        )
    }
}
