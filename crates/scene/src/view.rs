use foundation::math::MercatorProjector;
use foundation::{LonLat, ScreenPoint};

use crate::map::Map;
use crate::picking::{HitResult, hit_test_markers};
use crate::popup::PopupState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTestError {
    /// The view has no area yet (not laid out).
    ViewNotReady,
    NonFinitePoint,
}

impl std::fmt::Display for HitTestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitTestError::ViewNotReady => write!(f, "view has no size yet"),
            HitTestError::NonFinitePoint => write!(f, "screen point is not finite"),
        }
    }
}

impl std::error::Error for HitTestError {}

/// 2D Web Mercator view over a [`Map`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub center: LonLat,
    pub zoom: f64,
    width_px: f64,
    height_px: f64,
    popup: PopupState,
}

impl MapView {
    pub fn new(center: LonLat, zoom: f64, width_px: f64, height_px: f64) -> Self {
        Self {
            center,
            zoom,
            width_px: width_px.max(0.0),
            height_px: height_px.max(0.0),
            popup: PopupState::default(),
        }
    }

    pub fn resize(&mut self, width_px: f64, height_px: f64) {
        self.width_px = width_px.max(0.0);
        self.height_px = height_px.max(0.0);
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width_px, self.height_px)
    }

    pub fn is_ready(&self) -> bool {
        self.width_px > 0.0 && self.height_px > 0.0
    }

    pub fn projector(&self) -> MercatorProjector {
        MercatorProjector::new(self.center, self.zoom, self.width_px, self.height_px)
    }

    pub fn to_screen(&self, p: LonLat) -> ScreenPoint {
        let (x, y) = self.projector().to_screen(p);
        ScreenPoint::new(x, y)
    }

    pub fn to_map(&self, screen: ScreenPoint) -> LonLat {
        self.projector().to_lon_lat(screen.x, screen.y)
    }

    /// Markers of `map` under `screen`, topmost first.
    pub fn hit_test(&self, map: &Map, screen: ScreenPoint) -> Result<Vec<HitResult>, HitTestError> {
        if !self.is_ready() {
            return Err(HitTestError::ViewNotReady);
        }
        if !screen.is_finite() {
            return Err(HitTestError::NonFinitePoint);
        }
        Ok(hit_test_markers(map, &self.projector(), screen))
    }

    pub fn popup(&self) -> &PopupState {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut PopupState {
        &mut self.popup
    }
}
