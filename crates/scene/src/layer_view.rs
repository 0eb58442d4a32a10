use std::rc::Rc;

use layers::feature::{FeatureLayer, FeatureSourceError, SourceInfo};
use layers::query::{FeatureQuery, FeatureSet};
use runtime::updating::{IdleWait, UpdateState};
use tracing::debug;

/// The view-side state of a feature layer: its source plus an update cycle.
///
/// Queries wait for any pending update to finish before they run.
#[derive(Debug, Clone)]
pub struct FeatureLayerView {
    layer: Rc<FeatureLayer>,
    updating: UpdateState,
}

impl FeatureLayerView {
    pub fn new(layer: Rc<FeatureLayer>) -> Self {
        Self::with_state(layer, UpdateState::idle())
    }

    pub fn with_state(layer: Rc<FeatureLayer>, updating: UpdateState) -> Self {
        Self { layer, updating }
    }

    pub fn layer(&self) -> &Rc<FeatureLayer> {
        &self.layer
    }

    pub fn updating(&self) -> &UpdateState {
        &self.updating
    }

    /// Loads the layer's source, reporting "updating" for the duration.
    pub async fn load(&self) -> Result<SourceInfo, FeatureSourceError> {
        self.updating.begin_update();
        let result = self.layer.source().load().await;
        self.updating.finish_update();
        result
    }

    /// Waits out a pending update (once), then queries the source.
    pub async fn query_features(&self, query: FeatureQuery) -> Result<FeatureSet, FeatureSourceError> {
        if self.updating.until_idle().await == IdleWait::AfterUpdate {
            debug!("layer view finished updating; querying");
        }
        self.layer.source().query(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::FeatureLayerView;
    use foundation::LonLat;
    use layers::feature::{
        FeatureLayer, FeatureSource, FeatureSourceError, LocalBoxFuture, SourceInfo,
    };
    use layers::query::{FeatureQuery, FeatureSet};
    use runtime::updating::UpdateState;

    #[derive(Default)]
    struct Counting {
        queries: Cell<usize>,
    }

    impl FeatureSource for Counting {
        fn load(&self) -> LocalBoxFuture<'_, Result<SourceInfo, FeatureSourceError>> {
            Box::pin(async { Err(FeatureSourceError::Status(503)) })
        }

        fn query(
            &self,
            _query: FeatureQuery,
        ) -> LocalBoxFuture<'_, Result<FeatureSet, FeatureSourceError>> {
            self.queries.set(self.queries.get() + 1);
            Box::pin(std::future::ready(Ok(FeatureSet::empty())))
        }
    }

    fn view(source: Rc<Counting>, updating: UpdateState) -> FeatureLayerView {
        FeatureLayerView::with_state(Rc::new(FeatureLayer::new(9, "ref", source)), updating)
    }

    #[tokio::test]
    async fn query_waits_for_busy_view() {
        let source = Rc::new(Counting::default());
        let state = UpdateState::new(true);
        let v = view(Rc::clone(&source), state.clone());

        let probe = Rc::clone(&source);
        let (result, ()) = tokio::join!(v.query_features(FeatureQuery::at(LonLat::new(0.0, 0.0))), async move {
            tokio::task::yield_now().await;
            assert_eq!(probe.queries.get(), 0, "query must not run while updating");
            state.finish_update();
        });

        assert!(result.expect("query").is_empty());
        assert_eq!(source.queries.get(), 1);
    }

    #[tokio::test]
    async fn failed_load_still_ends_update() {
        let source = Rc::new(Counting::default());
        let v = view(source, UpdateState::idle());
        let err = v.load().await.unwrap_err();
        assert_eq!(err, FeatureSourceError::Status(503));
        assert!(!v.updating().is_updating());
    }
}
