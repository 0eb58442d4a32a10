use std::rc::Rc;

use tokio::sync::watch;

/// How [`UpdateState::until_idle`] completed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdleWait {
    /// The view was already idle; no subscription was made.
    Immediate,
    /// The view was busy; the caller waited for one busy -> idle transition.
    AfterUpdate,
}

/// Busy flag of a layer view, with a one-shot "done updating" wait.
///
/// Clones share the same flag. This is single-threaded state (`Rc`), meant
/// to live on the UI event loop next to the view it describes.
#[derive(Debug, Clone)]
pub struct UpdateState {
    tx: Rc<watch::Sender<bool>>,
}

impl UpdateState {
    pub fn new(updating: bool) -> Self {
        let (tx, _rx) = watch::channel(updating);
        Self { tx: Rc::new(tx) }
    }

    pub fn idle() -> Self {
        Self::new(false)
    }

    pub fn is_updating(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns the previous value.
    pub fn set_updating(&self, updating: bool) -> bool {
        self.tx.send_replace(updating)
    }

    pub fn begin_update(&self) {
        self.set_updating(true);
    }

    pub fn finish_update(&self) {
        self.set_updating(false);
    }

    /// Resolves once the view is not updating.
    ///
    /// If the view is idle now this returns without subscribing. Otherwise it
    /// subscribes once and resolves on the first transition to idle.
    pub async fn until_idle(&self) -> IdleWait {
        let mut rx = self.tx.subscribe();
        if !*rx.borrow_and_update() {
            return IdleWait::Immediate;
        }
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|updating| !*updating).await;
        IdleWait::AfterUpdate
    }
}

impl Default for UpdateState {
    fn default() -> Self {
        Self::idle()
    }
}
