//! Scroll and navigation behaviors of the public page
//!
//! Pure functions over page geometry. The server renders the page's initial
//! state through them (closed menu, resting navbar, first link active). After
//! load the page script applies the same rules in the browser with the
//! constants defined here, so these functions are the tested model of that
//! script's scroll handling.

use serde::Serialize;

/// Scroll offset past which the navbar is raised
pub const NAVBAR_RAISE_THRESHOLD: f64 = 50.0;
/// Extra lead before a section counts as current
pub const SCROLL_SPY_LEAD: f64 = 50.0;

pub const RESTING_SHADOW: &str = "0 2px 4px rgba(0,0,0,0.1)";
pub const RAISED_SHADOW: &str = "0 2px 10px rgba(0,0,0,0.1)";

/// Open/closed state of the mobile navigation menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavMenu {
    open: bool,
}

impl NavMenu {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Following any menu link closes the menu
    pub fn link_clicked(&mut self) {
        self.open = false;
    }
}

/// A page section and its offset from the top of the document
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub top: f64,
}

impl Section {
    pub fn new(id: impl Into<String>, top: f64) -> Self {
        Self { id: id.into(), top }
    }
}

/// Scroll position for an in-page link, or `None` when there is nothing to do
pub fn smooth_scroll_target(href: &str, sections: &[Section], navbar_height: f64) -> Option<f64> {
    let id = href.strip_prefix('#')?;
    if id.is_empty() {
        return None;
    }
    sections
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.top - navbar_height)
}

/// Current section: the last one whose lead-adjusted top has been scrolled past
pub fn current_section<'a>(sections: &'a [Section], scroll_y: f64, navbar_height: f64) -> Option<&'a str> {
    sections
        .iter()
        .filter(|s| scroll_y >= s.top - navbar_height - SCROLL_SPY_LEAD)
        .last()
        .map(|s| s.id.as_str())
}

/// Whether a nav link points at the current section
pub fn is_active_link(href: &str, current: Option<&str>) -> bool {
    match (href.strip_prefix('#'), current) {
        (Some(target), Some(current)) => target == current,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavbarStyle {
    pub background: &'static str,
    pub box_shadow: &'static str,
}

pub fn navbar_style(scroll_y: f64) -> NavbarStyle {
    NavbarStyle {
        background: "#fff",
        box_shadow: if scroll_y > NAVBAR_RAISE_THRESHOLD {
            RAISED_SHADOW
        } else {
            RESTING_SHADOW
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<Section> {
        vec![
            Section::new("home", 0.0),
            Section::new("about", 600.0),
            Section::new("contact", 1400.0),
        ]
    }

    #[test]
    fn test_nav_menu() {
        let mut menu = NavMenu::default();
        menu.toggle();
        assert!(menu.is_open());
        menu.link_clicked();
        assert!(!menu.is_open());
        menu.link_clicked();
        assert!(!menu.is_open());
    }

    #[test]
    fn test_smooth_scroll() {
        let sections = sections();
        assert_eq!(smooth_scroll_target("#about", &sections, 70.0), Some(530.0));
        assert_eq!(smooth_scroll_target("#", &sections, 70.0), None);
        assert_eq!(smooth_scroll_target("#missing", &sections, 70.0), None);
        assert_eq!(smooth_scroll_target("/admin", &sections, 70.0), None);
    }

    #[test]
    fn test_scroll_spy_picks_last_passed_section() {
        let sections = sections();
        assert_eq!(current_section(&sections, 0.0, 70.0), Some("home"));
        assert_eq!(current_section(&sections, 479.0, 70.0), Some("home"));
        assert_eq!(current_section(&sections, 480.0, 70.0), Some("about"));
        assert_eq!(current_section(&sections, 5000.0, 70.0), Some("contact"));
        assert_eq!(current_section(&[], 100.0, 70.0), None);

        assert!(is_active_link("#about", Some("about")));
        assert!(!is_active_link("#home", Some("about")));
        assert!(!is_active_link("#home", None));
    }

    #[test]
    fn test_navbar_style() {
        assert_eq!(navbar_style(50.0).box_shadow, RESTING_SHADOW);
        assert_eq!(navbar_style(51.0).box_shadow, RAISED_SHADOW);
    }
}
