//! EcoMap marker widget.
//!
//! Places category-styled markers on a map, hides the ones that fall outside
//! a reference polygon layer, and opens a popup for the marker under a click.
//!
//! Everything here runs on one thread. Visibility checks are futures the host
//! spawns on its local executor; each one only touches its own marker.

use std::cell::{Ref, RefCell};
use std::future::Future;
use std::rc::Rc;

use foundation::ScreenPoint;
use layers::arcgis::ArcGisFeatureService;
use layers::feature::{FeatureLayer, FeatureSource, FeatureSourceError, SourceInfo};
use layers::graphics::GraphicsLayer;
use layers::query::FeatureQuery;
use layers::registry::{Marker, MarkerHandle, MarkerRegistry, PlacedPoint};
use layers::{Layer, LayerId};
use runtime::event_bus::{EventBus, EventKind};
use scene::layer_view::FeatureLayerView;
use scene::popup::Popup;
use scene::{Map, MapLayer, MapView};
use serde::Serialize;
use tracing::{debug, info, warn};

pub mod config;
pub mod points;
#[cfg(target_arch = "wasm32")]
mod web;

pub use config::{ConfigError, WidgetConfig};
pub use points::{PointError, decode_points};

pub const REFERENCE_LAYER_ID: LayerId = LayerId(1);
pub const GRAPHICS_LAYER_ID: LayerId = LayerId(2);

/// How a visibility check ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// At least one reference feature intersects the marker.
    Visible,
    /// No reference feature intersects the marker; it is now hidden.
    Hidden,
    /// The query failed; the marker keeps its default visibility.
    Failed,
    /// The handle does not belong to this widget.
    UnknownMarker,
}

/// Per-marker state, as reported to hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSummary {
    pub index: u32,
    pub longitude: f64,
    pub latitude: f64,
    pub category: String,
    pub kind: String,
    pub icon: Option<&'static str>,
    pub visible: bool,
    pub name: Option<String>,
}

impl MarkerSummary {
    fn new(handle: MarkerHandle, marker: &Marker) -> Self {
        Self {
            index: handle.index(),
            longitude: marker.point.location.lon_deg,
            latitude: marker.point.location.lat_deg,
            category: marker.point.category.clone(),
            kind: format!("{:?}", marker.style.kind),
            icon: marker.style.icon,
            visible: marker.visible,
            name: marker.point.attribute_text("name"),
        }
    }
}

pub struct MapWidget {
    config: WidgetConfig,
    map: Rc<RefCell<Map>>,
    view: MapView,
    graphics: Rc<RefCell<GraphicsLayer>>,
    reference: FeatureLayerView,
    events: Rc<RefCell<EventBus>>,
}

impl MapWidget {
    /// Builds the map with `source` as the reference layer and an empty
    /// graphics layer on top of it.
    pub fn new(config: WidgetConfig, source: Rc<dyn FeatureSource>) -> Self {
        let reference = Rc::new(FeatureLayer::new(
            REFERENCE_LAYER_ID.0,
            "reference polygons",
            source,
        ));
        let graphics = Rc::new(RefCell::new(GraphicsLayer::new(
            GRAPHICS_LAYER_ID.0,
            "markers",
        )));

        let mut map = Map::new(config.basemap.clone());
        map.add(MapLayer::Feature(Rc::clone(&reference)));
        map.add(MapLayer::Graphics(Rc::clone(&graphics)));

        let mut view = MapView::new(
            config.center(),
            config.zoom,
            config.view_width_px,
            config.view_height_px,
        );
        // Popups only open through `on_click`.
        view.popup_mut().auto_open_enabled = false;

        info!(
            basemap = %config.basemap,
            layer = %config.feature_layer_url,
            "map widget initialized"
        );

        Self {
            config,
            map: Rc::new(RefCell::new(map)),
            view,
            graphics,
            reference: FeatureLayerView::new(reference),
            events: Rc::new(RefCell::new(EventBus::new())),
        }
    }

    /// Widget backed by the ArcGIS feature layer named in `config`.
    pub fn with_arcgis(config: WidgetConfig) -> Self {
        let source = ArcGisFeatureService::new(
            config.feature_layer_url.clone(),
            config.api_key.clone(),
        );
        Self::new(config, Rc::new(source))
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn map(&self) -> Ref<'_, Map> {
        self.map.borrow()
    }

    /// Adds an unrelated layer to the map, on top.
    pub fn add_layer(&self, layer: MapLayer) -> bool {
        self.map.borrow_mut().add(layer)
    }

    pub fn remove_layer(&self, id: LayerId) -> Option<MapLayer> {
        self.map.borrow_mut().remove(id)
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut MapView {
        &mut self.view
    }

    pub fn reference_view(&self) -> &FeatureLayerView {
        &self.reference
    }

    pub fn registry(&self) -> Ref<'_, MarkerRegistry> {
        Ref::map(self.graphics.borrow(), GraphicsLayer::markers)
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<Marker> {
        self.graphics.borrow().markers().get(handle).cloned()
    }

    pub fn events(&self) -> Ref<'_, EventBus> {
        self.events.borrow()
    }

    pub fn summary(&self) -> Vec<MarkerSummary> {
        self.registry()
            .iter()
            .map(|(handle, marker)| MarkerSummary::new(handle, marker))
            .collect()
    }

    /// Creates a marker for `point` on the graphics layer.
    pub fn place(&self, point: PlacedPoint) -> MarkerHandle {
        let handle = self.graphics.borrow_mut().place(point);
        debug!(marker = handle.index(), "marker placed");
        self.events
            .borrow_mut()
            .emit(EventKind::MarkerPlaced, Some(handle.index()), "placed");
        handle
    }

    pub fn place_all<I>(&self, points: I) -> Vec<MarkerHandle>
    where
        I: IntoIterator<Item = PlacedPoint>,
    {
        points.into_iter().map(|p| self.place(p)).collect()
    }

    /// Places `point` and starts its visibility check.
    pub fn place_and_resolve(
        &self,
        point: PlacedPoint,
    ) -> (MarkerHandle, impl Future<Output = Resolution> + 'static) {
        let handle = self.place(point);
        (handle, self.resolve_visibility(handle))
    }

    /// Re-adds the reference layer at the bottom of the map if it was removed.
    ///
    /// Returns `true` if the layer had to be added.
    pub fn ensure_reference_layer(&self) -> bool {
        let mut map = self.map.borrow_mut();
        if map.find_layer(REFERENCE_LAYER_ID).is_some() {
            return false;
        }
        map.add_at(MapLayer::Feature(Rc::clone(self.reference.layer())), 0);
        drop(map);

        debug!("reference layer re-attached");
        self.events.borrow_mut().emit(
            EventKind::ReferenceLayerAttached,
            None,
            self.reference.layer().title().to_string(),
        );
        true
    }

    /// Loads reference layer metadata. Queries issued meanwhile wait for it.
    pub fn load_reference_layer(
        &self,
    ) -> impl Future<Output = Result<SourceInfo, FeatureSourceError>> + 'static {
        let view = self.reference.clone();
        async move {
            let result = view.load().await;
            match &result {
                Ok(info) => info!(name = %info.name, "reference layer loaded"),
                Err(err) => warn!(error = %err, "reference layer failed to load"),
            }
            result
        }
    }

    /// Checks whether the marker lies on a reference polygon and hides it if not.
    ///
    /// The returned future owns everything it needs, so hosts can spawn it and
    /// forget it. A failed query leaves the marker visible.
    pub fn resolve_visibility(
        &self,
        handle: MarkerHandle,
    ) -> impl Future<Output = Resolution> + 'static {
        let location = self
            .graphics
            .borrow()
            .markers()
            .get(handle)
            .map(|m| m.point.location);
        if location.is_some() {
            self.ensure_reference_layer();
        }

        let distance_m = self.config.query_distance_m;
        let view = self.reference.clone();
        let graphics = Rc::clone(&self.graphics);
        let events = Rc::clone(&self.events);

        async move {
            let Some(location) = location else {
                debug!(marker = handle.index(), "visibility check for unknown marker");
                return Resolution::UnknownMarker;
            };
            let index = handle.index();
            let query = FeatureQuery::at(location).with_distance_m(distance_m);

            match view.query_features(query).await {
                Ok(set) if set.is_empty() => {
                    graphics.borrow_mut().markers_mut().hide(handle);
                    debug!(marker = index, "no reference feature; marker hidden");
                    events.borrow_mut().emit(
                        EventKind::MarkerHidden,
                        Some(index),
                        "no reference feature",
                    );
                    Resolution::Hidden
                }
                Ok(set) => {
                    debug!(marker = index, features = set.len(), "marker on reference layer");
                    events.borrow_mut().emit(
                        EventKind::MarkerKeptVisible,
                        Some(index),
                        format!("{} reference feature(s)", set.len()),
                    );
                    Resolution::Visible
                }
                Err(err) => {
                    warn!(marker = index, error = %err, "reference query failed; marker stays visible");
                    events
                        .borrow_mut()
                        .emit(EventKind::QueryFailed, Some(index), err.to_string());
                    Resolution::Failed
                }
            }
        }
    }

    /// One visibility check per placed marker, in placement order.
    pub fn resolve_all(&self) -> Vec<impl Future<Output = Resolution> + 'static> {
        let handles: Vec<_> = self.registry().handles().collect();
        handles
            .into_iter()
            .map(|h| self.resolve_visibility(h))
            .collect()
    }

    /// Opens a popup for this widget's topmost marker under `screen`.
    ///
    /// Returns `None`, without touching the current popup, when the hit test
    /// fails or finds none of this widget's markers.
    pub fn on_click(&mut self, screen: ScreenPoint) -> Option<Popup> {
        let hits = match self.view.hit_test(&self.map.borrow(), screen) {
            Ok(hits) => hits,
            Err(err) => {
                debug!(error = %err, "hit test failed");
                return None;
            }
        };

        let hit = hits.into_iter().find(|h| h.layer == GRAPHICS_LAYER_ID)?;
        let popup = {
            let graphics = self.graphics.borrow();
            let marker = graphics.markers().get(hit.marker)?;
            Popup::new(
                &marker.point.attribute_text("name").unwrap_or_default(),
                &marker.point.attribute_text("content").unwrap_or_default(),
                self.view.to_map(screen),
            )
        };

        self.view.popup_mut().open(popup.clone());
        self.events.borrow_mut().emit(
            EventKind::PopupOpened,
            Some(hit.marker.index()),
            popup.title.clone(),
        );
        Some(popup)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::{GRAPHICS_LAYER_ID, MapWidget, REFERENCE_LAYER_ID, Resolution, WidgetConfig};
    use foundation::{LonLat, ScreenPoint};
    use layers::LayerId;
    use layers::feature::{
        FeatureSource, FeatureSourceError, LocalBoxFuture, PolygonFeature, PolygonFeatureSource,
        SourceInfo,
    };
    use layers::graphics::GraphicsLayer;
    use layers::query::{Feature, FeatureQuery, FeatureSet};
    use layers::registry::{MarkerHandle, PlacedPoint};
    use layers::symbology::MarkerStyle;
    use pretty_assertions::assert_eq;
    use runtime::event_bus::EventKind;
    use scene::MapLayer;
    use tokio::sync::oneshot;

    enum Reply {
        Count(usize),
        Fail,
        Gate(oneshot::Receiver<usize>),
    }

    /// Answers each query by the longitude of its point.
    #[derive(Default)]
    struct Scripted {
        replies: RefCell<HashMap<u64, Reply>>,
        queries: Cell<usize>,
    }

    impl Scripted {
        fn reply(self, lon: f64, reply: Reply) -> Self {
            self.replies.borrow_mut().insert(lon.to_bits(), reply);
            self
        }
    }

    fn features(n: usize) -> FeatureSet {
        FeatureSet {
            features: vec![Feature::default(); n],
        }
    }

    impl FeatureSource for Scripted {
        fn load(&self) -> LocalBoxFuture<'_, Result<SourceInfo, FeatureSourceError>> {
            Box::pin(std::future::ready(Ok(SourceInfo::default())))
        }

        fn query(
            &self,
            query: FeatureQuery,
        ) -> LocalBoxFuture<'_, Result<FeatureSet, FeatureSourceError>> {
            self.queries.set(self.queries.get() + 1);
            let reply = self
                .replies
                .borrow_mut()
                .remove(&query.geometry.lon_deg.to_bits());
            Box::pin(async move {
                match reply {
                    Some(Reply::Count(n)) => Ok(features(n)),
                    Some(Reply::Fail) => Err(FeatureSourceError::Status(500)),
                    Some(Reply::Gate(rx)) => rx
                        .await
                        .map(features)
                        .map_err(|_| FeatureSourceError::Http("gate dropped".to_string())),
                    None => Ok(FeatureSet::empty()),
                }
            })
        }
    }

    const CENTER: LonLat = LonLat {
        lon_deg: -81.3789,
        lat_deg: 28.5384,
    };
    const P1: LonLat = LonLat {
        lon_deg: -81.40,
        lat_deg: 28.50,
    };
    const P2: LonLat = LonLat {
        lon_deg: -81.30,
        lat_deg: 28.60,
    };

    fn widget(source: Rc<Scripted>) -> MapWidget {
        MapWidget::new(WidgetConfig::default(), source)
    }

    #[test]
    fn init_stacks_reference_below_graphics() {
        let w = widget(Rc::new(Scripted::default()));
        let ids: Vec<_> = w.map().layers().iter().map(MapLayer::id).collect();
        assert_eq!(ids, vec![REFERENCE_LAYER_ID, GRAPHICS_LAYER_ID]);
        assert_eq!(w.map().basemap(), "arcgis-navigation");
        assert!(!w.view().popup().auto_open_enabled);
    }

    #[test]
    fn placement_keeps_input_order() {
        let w = widget(Rc::new(Scripted::default()));
        let points: Vec<_> = (0..4)
            .map(|i| PlacedPoint::new(LonLat::new(-81.0 - f64::from(i), 28.5), "5"))
            .collect();
        let handles = w.place_all(points.clone());

        let indices: Vec<_> = handles.iter().map(MarkerHandle::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let registry = w.registry();
        assert_eq!(registry.len(), 4);
        for ((_, marker), point) in registry.iter().zip(&points) {
            assert_eq!(&marker.point, point);
            assert!(marker.visible);
        }
        drop(registry);
        assert_eq!(w.events().count(EventKind::MarkerPlaced), 4);
    }

    #[tokio::test]
    async fn worked_example() {
        let source = Rc::new(
            Scripted::default()
                .reply(P1.lon_deg, Reply::Count(0))
                .reply(P2.lon_deg, Reply::Count(1)),
        );
        let w = widget(Rc::clone(&source));

        let (m0, r0) = w.place_and_resolve(PlacedPoint::new(P1, "2"));
        let (m1, r1) = w.place_and_resolve(PlacedPoint::new(P2, "99"));
        let (r0, r1) = tokio::join!(r0, r1);

        assert_eq!((r0, r1), (Resolution::Hidden, Resolution::Visible));
        let marker0 = w.marker(m0).expect("marker0");
        let marker1 = w.marker(m1).expect("marker1");
        assert_eq!(marker0.style, MarkerStyle::WATER);
        assert!(!marker0.visible);
        assert_eq!(marker1.style, MarkerStyle::FALLBACK);
        assert!(marker1.visible);
        assert_eq!(source.queries.get(), 2);
    }

    async fn resolve_with_order(b_first: bool) -> (Vec<bool>, Vec<u32>) {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let source = Rc::new(
            Scripted::default()
                .reply(P1.lon_deg, Reply::Gate(rx_a))
                .reply(P2.lon_deg, Reply::Gate(rx_b)),
        );
        let w = widget(source);
        let a = w.place(PlacedPoint::new(P1, "1"));
        let b = w.place(PlacedPoint::new(P2, "1"));

        let driver = async move {
            if b_first {
                tx_b.send(1).expect("b");
                tokio::task::yield_now().await;
                tx_a.send(0).expect("a");
            } else {
                tx_a.send(0).expect("a");
                tokio::task::yield_now().await;
                tx_b.send(1).expect("b");
            }
        };
        let (ra, rb, ()) = tokio::join!(w.resolve_visibility(a), w.resolve_visibility(b), driver);
        assert_eq!((ra, rb), (Resolution::Hidden, Resolution::Visible));

        let visible = w.registry().iter().map(|(_, m)| m.visible).collect();
        let completion = w
            .events()
            .events()
            .iter()
            .filter(|e| matches!(e.kind, EventKind::MarkerHidden | EventKind::MarkerKeptVisible))
            .filter_map(|e| e.subject)
            .collect();
        (visible, completion)
    }

    #[tokio::test]
    async fn outcome_does_not_depend_on_completion_order() {
        let (visible_ab, order_ab) = resolve_with_order(false).await;
        let (visible_ba, order_ba) = resolve_with_order(true).await;

        assert_eq!(order_ab, vec![0, 1]);
        assert_eq!(order_ba, vec![1, 0]);
        assert_eq!(visible_ab, vec![false, true]);
        assert_eq!(visible_ab, visible_ba);
    }

    #[tokio::test]
    async fn busy_reference_view_delays_the_query_once() {
        let source = Rc::new(Scripted::default().reply(P1.lon_deg, Reply::Count(0)));
        let w = widget(Rc::clone(&source));
        let h = w.place(PlacedPoint::new(P1, "3"));

        let updating = w.reference_view().updating().clone();
        updating.begin_update();

        let probe = Rc::clone(&source);
        let (res, ()) = tokio::join!(w.resolve_visibility(h), async move {
            tokio::task::yield_now().await;
            assert_eq!(probe.queries.get(), 0);
            updating.finish_update();
        });

        assert_eq!(res, Resolution::Hidden);
        assert_eq!(source.queries.get(), 1);
    }

    #[tokio::test]
    async fn query_failure_keeps_marker_visible() {
        let source = Rc::new(Scripted::default().reply(P1.lon_deg, Reply::Fail));
        let w = widget(source);
        let h = w.place(PlacedPoint::new(P1, "4"));

        assert_eq!(w.resolve_visibility(h).await, Resolution::Failed);
        assert!(w.marker(h).expect("marker").visible);
        assert_eq!(w.events().count(EventKind::QueryFailed), 1);
    }

    #[tokio::test]
    async fn unknown_handle_is_not_queried() {
        let source = Rc::new(Scripted::default());
        let w = widget(Rc::clone(&source));
        let stray = MarkerHandle(foundation::Handle::new(5));

        assert_eq!(w.resolve_visibility(stray).await, Resolution::UnknownMarker);
        assert_eq!(source.queries.get(), 0);
    }

    #[tokio::test]
    async fn removed_reference_layer_is_reattached_at_bottom() {
        let w = widget(Rc::new(Scripted::default().reply(P1.lon_deg, Reply::Count(1))));
        let h = w.place(PlacedPoint::new(P1, "1"));
        assert!(w.remove_layer(REFERENCE_LAYER_ID).is_some());

        let fut = w.resolve_visibility(h);
        assert_eq!(w.map().layers()[0].id(), REFERENCE_LAYER_ID);
        assert_eq!(fut.await, Resolution::Visible);

        // Already present: checking again changes nothing.
        assert!(!w.ensure_reference_layer());
        assert_eq!(w.events().count(EventKind::ReferenceLayerAttached), 1);
    }

    #[tokio::test]
    async fn polygon_source_end_to_end() {
        let ring = vec![
            LonLat::new(-81.5, 28.4),
            LonLat::new(-81.35, 28.4),
            LonLat::new(-81.35, 28.55),
            LonLat::new(-81.5, 28.55),
        ];
        let source = PolygonFeatureSource::new("city", vec![PolygonFeature::new(vec![ring])]);
        let w = MapWidget::new(WidgetConfig::default(), Rc::new(source));
        w.place_all([PlacedPoint::new(P1, "6"), PlacedPoint::new(P2, "7")]);

        let load = w.load_reference_layer();
        let checks = w.resolve_all();
        let (info, r0, r1) = async {
            let mut checks = checks.into_iter();
            let (Some(c0), Some(c1)) = (checks.next(), checks.next()) else {
                panic!("two checks expected");
            };
            tokio::join!(load, c0, c1)
        }
        .await;

        assert_eq!(info.expect("load").name, "city");
        assert_eq!((r0, r1), (Resolution::Visible, Resolution::Hidden));
        let visible: Vec<_> = w.summary().iter().map(|s| s.visible).collect();
        assert_eq!(visible, vec![true, false]);
    }

    #[test]
    fn click_on_marker_opens_sanitized_popup() {
        let mut w = widget(Rc::new(Scripted::default()));
        w.place(
            PlacedPoint::new(CENTER, "8")
                .with_attribute("name", "<b>Cleanup</b> day")
                .with_attribute("content", "Bring <i>gloves</i>"),
        );

        let popup = w.on_click(ScreenPoint::new(645.0, 355.0)).expect("popup");
        assert_eq!(popup.title, "Cleanup day");
        assert_eq!(popup.content, "Bring gloves");
        assert!((popup.location.lon_deg - CENTER.lon_deg).abs() < 0.05);
        assert_eq!(w.view().popup().current(), Some(&popup));
        assert_eq!(w.events().count(EventKind::PopupOpened), 1);
    }

    #[test]
    fn click_on_empty_space_opens_nothing() {
        let mut w = widget(Rc::new(Scripted::default()));
        w.place(PlacedPoint::new(CENTER, "1"));
        assert_eq!(w.on_click(ScreenPoint::new(10.0, 10.0)), None);
        assert!(w.view().popup().current().is_none());
    }

    #[test]
    fn click_on_other_layers_marker_opens_nothing() {
        let mut w = widget(Rc::new(Scripted::default()));
        let other = Rc::new(RefCell::new(GraphicsLayer::new(77, "someone else")));
        other
            .borrow_mut()
            .place(PlacedPoint::new(CENTER, "1").with_attribute("name", "foreign"));
        assert!(w.add_layer(MapLayer::Graphics(Rc::clone(&other))));

        assert_eq!(w.on_click(ScreenPoint::new(640.0, 360.0)), None);

        // With our own marker underneath, ours wins even though the other is on top.
        w.place(PlacedPoint::new(CENTER, "2").with_attribute("name", "ours"));
        let popup = w.on_click(ScreenPoint::new(640.0, 360.0)).expect("popup");
        assert_eq!(popup.title, "ours");
        assert_eq!(w.map().layers().last().map(MapLayer::id), Some(LayerId(77)));
    }

    #[test]
    fn click_on_hidden_marker_opens_nothing() {
        let mut w = widget(Rc::new(Scripted::default()));
        let h = w.place(PlacedPoint::new(CENTER, "1"));
        w.graphics.borrow_mut().markers_mut().hide(h);
        assert_eq!(w.on_click(ScreenPoint::new(640.0, 360.0)), None);
    }

    #[test]
    fn failed_hit_test_is_silent() {
        let mut w = widget(Rc::new(Scripted::default()));
        w.place(PlacedPoint::new(CENTER, "1"));
        w.view_mut().resize(0.0, 0.0);
        assert_eq!(w.on_click(ScreenPoint::new(0.0, 0.0)), None);
    }

    #[test]
    fn summary_reports_style_and_name() {
        let w = widget(Rc::new(Scripted::default()));
        w.place(PlacedPoint::new(P1, "10").with_attribute("name", "Market"));
        let summary = w.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].kind, "FoodEvent");
        assert_eq!(
            summary[0].icon,
            Some("https://maps.google.com/mapfiles/ms/icons/red-dot.png")
        );
        assert_eq!(summary[0].name.as_deref(), Some("Market"));
    }
}
