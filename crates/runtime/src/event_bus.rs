/// What happened to the widget.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventKind {
    MarkerPlaced,
    ReferenceLayerAttached,
    MarkerHidden,
    MarkerKeptVisible,
    QueryFailed,
    PopupOpened,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MarkerPlaced => "marker_placed",
            EventKind::ReferenceLayerAttached => "reference_layer_attached",
            EventKind::MarkerHidden => "marker_hidden",
            EventKind::MarkerKeptVisible => "marker_kept_visible",
            EventKind::QueryFailed => "query_failed",
            EventKind::PopupOpened => "popup_opened",
        }
    }
}

/// Minimal event record for traceability.
///
/// `seq` is assigned in emission order, so the log shows the real completion
/// order of asynchronous work. `subject` is the marker index, when one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: EventKind,
    pub subject: Option<u32>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_seq: u64,
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: EventKind, subject: Option<u32>, message: impl Into<String>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            seq,
            kind,
            subject,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
