use foundation::bounds::Aabb2;
use foundation::math::MercatorProjector;
use foundation::{LonLat, ScreenPoint};
use layers::registry::MarkerHandle;
use layers::{Layer, LayerId};

use crate::map::{Map, MapLayer};

/// A marker under the pointer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitResult {
    pub layer: LayerId,
    pub marker: MarkerHandle,
    /// The marker's own location.
    pub location: LonLat,
}

/// Visible markers whose symbol box contains `screen`.
///
/// Ordering contract:
/// - Results are topmost first: upper layers before lower ones, and within a
///   graphics layer later markers before earlier ones.
///
/// Notes:
/// - Hidden markers are never hit.
/// - Feature layers are not hit-tested; only local graphics are.
pub fn hit_test_markers(
    map: &Map,
    projector: &MercatorProjector,
    screen: ScreenPoint,
) -> Vec<HitResult> {
    let mut out = Vec::new();

    for layer in map.layers().iter().rev() {
        let MapLayer::Graphics(graphics) = layer else {
            continue;
        };
        let graphics = graphics.borrow();
        let layer_id = graphics.id();

        for (handle, marker) in graphics.markers().iter().rev() {
            if !marker.visible {
                continue;
            }
            let (x, y) = projector.to_screen(marker.point.location);
            let symbol = Aabb2::centered(
                ScreenPoint::new(x, y),
                f64::from(marker.style.width_px),
                f64::from(marker.style.height_px),
            );
            if symbol.contains(screen) {
                out.push(HitResult {
                    layer: layer_id,
                    marker: handle,
                    location: marker.point.location,
                });
            }
        }
    }

    out
}
