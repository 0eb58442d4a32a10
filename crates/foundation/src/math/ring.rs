use super::geodesy::{EARTH_MEAN_RADIUS_M, LonLat};

/// Even-odd test of `p` against a closed ring of lon/lat vertices.
///
/// The ring may or may not repeat its first vertex at the end. Points on a
/// vertical edge count as inside for the left edge only, which keeps
/// adjacent polygons from both claiming a shared boundary point.
pub fn ring_contains(ring: &[LonLat], p: LonLat) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.lat_deg > p.lat_deg) != (b.lat_deg > p.lat_deg) {
            let t = (p.lat_deg - a.lat_deg) / (b.lat_deg - a.lat_deg);
            let x = a.lon_deg + t * (b.lon_deg - a.lon_deg);
            if p.lon_deg < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Even-odd over every ring, so inner rings act as holes.
pub fn rings_contain(rings: &[Vec<LonLat>], p: LonLat) -> bool {
    rings
        .iter()
        .filter(|ring| ring_contains(ring, p))
        .count()
        % 2
        == 1
}

/// Shortest distance in meters from `p` to the ring's boundary.
///
/// Uses a local equirectangular approximation around `p`, which is accurate
/// for the short buffer distances used in spatial queries.
pub fn distance_to_ring_m(ring: &[LonLat], p: LonLat) -> f64 {
    if ring.is_empty() {
        return f64::INFINITY;
    }
    let k_lat = EARTH_MEAN_RADIUS_M.to_radians();
    let k_lon = k_lat * p.lat_deg.to_radians().cos();
    let local = |q: LonLat| ((q.lon_deg - p.lon_deg) * k_lon, (q.lat_deg - p.lat_deg) * k_lat);

    let mut best = f64::INFINITY;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (ax, ay) = local(ring[j]);
        let (bx, by) = local(ring[i]);
        best = best.min(origin_to_segment(ax, ay, bx, by));
        j = i;
    }
    best
}

fn origin_to_segment(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let l2 = dx * dx + dy * dy;
    let t = if l2 <= 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / l2).clamp(0.0, 1.0)
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    (cx * cx + cy * cy).sqrt()
}
