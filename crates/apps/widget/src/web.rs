//! Browser bindings. The page owns the map canvas; this module owns the
//! widget state and answers clicks with popup JSON.

use console_error_panic_hook::set_once;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::{MapWidget, WidgetConfig, decode_points};
use foundation::ScreenPoint;

thread_local! {
    static STATE: RefCell<Option<MapWidget>> = const { RefCell::new(None) };
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

#[wasm_bindgen(start)]
pub fn start() {
    set_once();
}

/// Builds the widget, places `points_json` and starts every visibility check.
///
/// An empty `config_json` uses the defaults.
#[wasm_bindgen]
pub fn init_widget(config_json: &str, points_json: &str) -> Result<(), JsValue> {
    let config = if config_json.trim().is_empty() {
        WidgetConfig::default()
    } else {
        WidgetConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    let points = decode_points(points_json).map_err(|e| {
        log(&format!("ecomap: {e}"));
        JsValue::from_str(&e.to_string())
    })?;

    let widget = MapWidget::with_arcgis(config);
    let load = widget.load_reference_layer();
    spawn_local(async move {
        // Load errors are logged by the widget.
        let _ = load.await;
    });
    for point in points {
        let (_, check) = widget.place_and_resolve(point);
        spawn_local(async move {
            check.await;
        });
    }
    log(&format!("ecomap: {} markers placed", widget.registry().len()));

    STATE.with(|s| *s.borrow_mut() = Some(widget));
    Ok(())
}

/// Popup for a click at canvas pixel `(x, y)`, as JSON, or `undefined`.
#[wasm_bindgen]
pub fn on_click(x: f64, y: f64) -> Option<String> {
    STATE.with(|s| {
        let mut state = s.borrow_mut();
        let popup = state.as_mut()?.on_click(ScreenPoint::new(x, y))?;
        Some(
            serde_json::json!({
                "title": popup.title,
                "content": popup.content,
                "longitude": popup.location.lon_deg,
                "latitude": popup.location.lat_deg,
            })
            .to_string(),
        )
    })
}

/// Current marker states as a JSON array.
#[wasm_bindgen]
pub fn marker_states() -> String {
    STATE.with(|s| {
        let state = s.borrow();
        let summary = state.as_ref().map(MapWidget::summary).unwrap_or_default();
        serde_json::to_string(&summary).unwrap_or_else(|_| "[]".to_string())
    })
}

/// Resizes the view after the canvas changes size.
#[wasm_bindgen]
pub fn resize(width: f64, height: f64) {
    STATE.with(|s| {
        if let Some(widget) = s.borrow_mut().as_mut() {
            widget.view_mut().resize(width, height);
        }
    });
}
