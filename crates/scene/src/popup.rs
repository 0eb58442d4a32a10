use std::borrow::Cow;

use foundation::LonLat;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("valid tag regex"));

/// Removes `<...>` tags (and what is inside the brackets) from popup text.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    TAG.replace_all(s, "")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub title: String,
    pub content: String,
    pub location: LonLat,
}

impl Popup {
    /// Builds a popup with tag-free title and content.
    pub fn new(title: &str, content: &str, location: LonLat) -> Self {
        Self {
            title: strip_tags(title).into_owned(),
            content: strip_tags(content).into_owned(),
            location,
        }
    }
}

/// The view's popup slot. At most one popup is open.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupState {
    /// When false, clicks never open a popup on their own; the widget decides.
    pub auto_open_enabled: bool,
    current: Option<Popup>,
}

impl Default for PopupState {
    fn default() -> Self {
        Self {
            auto_open_enabled: true,
            current: None,
        }
    }
}

impl PopupState {
    /// Opens `popup`, replacing any open one.
    pub fn open(&mut self, popup: Popup) {
        self.current = Some(popup);
    }

    pub fn close(&mut self) -> Option<Popup> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&Popup> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Popup, PopupState, strip_tags};
    use foundation::LonLat;

    #[test]
    fn strips_tags_non_greedily() {
        assert_eq!(strip_tags("<b>Lake</b> Eola"), "Lake Eola");
        assert_eq!(strip_tags("a < b and c > d"), "a  d");
        assert_eq!(strip_tags("plain"), "plain");
    }

    #[test]
    fn popup_text_is_sanitized() {
        let p = Popup::new(
            "<script>x</script>Garden",
            "Open <i>daily</i>",
            LonLat::new(0.0, 0.0),
        );
        assert_eq!(p.title, "xGarden");
        assert_eq!(p.content, "Open daily");
    }

    #[test]
    fn open_replaces_previous_popup() {
        let mut state = PopupState::default();
        state.open(Popup::new("a", "", LonLat::new(0.0, 0.0)));
        state.open(Popup::new("b", "", LonLat::new(1.0, 1.0)));
        assert_eq!(state.current().map(|p| p.title.as_str()), Some("b"));
        assert!(state.close().is_some());
        assert!(state.current().is_none());
    }
}
