//! Cross-View Notifier
//!
//! Rebuilds the recipient pickers whenever the investor mirror changes.

use serde::Serialize;
use std::sync::{Arc, RwLock};

use super::events::DashboardEvents;
use super::model::{Investor, Recipient, ALL_RECIPIENTS};
use crate::live::{read, write, ViewListener, ViewUpdate};

/// Label of the synthetic "everyone" option
pub const ALL_INVESTORS_LABEL: &str = "All Investors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A recipient `<select>`: "All Investors" first, then one option per
/// investor in mirror order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientSelector {
    pub id: String,
    pub options: Vec<SelectOption>,
    pub selected: String,
}

impl RecipientSelector {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: vec![all_option()],
            selected: ALL_RECIPIENTS.to_string(),
        }
    }

    /// Replace the options, keeping the selection if it still exists
    pub fn rebuild(&mut self, investors: &[Investor]) {
        let mut options = Vec::with_capacity(investors.len() + 1);
        options.push(all_option());
        options.extend(investors.iter().map(|investor| SelectOption {
            value: investor.id.clone(),
            label: investor.name.clone(),
        }));
        self.options = options;

        if !self.contains(&self.selected) {
            self.selected = ALL_RECIPIENTS.to_string();
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// Select an existing option; unknown values are refused
    pub fn select(&mut self, value: &str) -> bool {
        if self.contains(value) {
            self.selected = value.to_string();
            true
        } else {
            false
        }
    }

    pub fn selected_recipient(&self) -> Recipient {
        Recipient::from(self.selected.as_str())
    }
}

fn all_option() -> SelectOption {
    SelectOption {
        value: ALL_RECIPIENTS.to_string(),
        label: ALL_INVESTORS_LABEL.to_string(),
    }
}

/// Propagates investor mirror changes to every dependent selector
pub struct CrossViewNotifier {
    selectors: Vec<Arc<RwLock<RecipientSelector>>>,
    events: Arc<dyn DashboardEvents>,
}

impl CrossViewNotifier {
    pub fn new(selector_ids: &[&str], events: Arc<dyn DashboardEvents>) -> Self {
        Self {
            selectors: selector_ids
                .iter()
                .map(|id| Arc::new(RwLock::new(RecipientSelector::new(*id))))
                .collect(),
            events,
        }
    }

    /// Listener to register on the investor view
    pub fn listener(self: &Arc<Self>) -> ViewListener<Investor> {
        let notifier = Arc::clone(self);
        Arc::new(move |update: &ViewUpdate<'_, Investor>| notifier.refresh(update.items))
    }

    /// Rebuild every selector from the given mirror contents
    pub fn refresh(&self, investors: &[Investor]) {
        for selector in &self.selectors {
            let rebuilt = {
                let mut selector = write(selector);
                selector.rebuild(investors);
                selector.clone()
            };
            self.events.recipients_changed(&rebuilt);
        }
        tracing::debug!(selectors = self.selectors.len(), investors = investors.len(), "Recipient selectors rebuilt");
    }

    pub fn selector(&self, id: &str) -> Option<RecipientSelector> {
        self.selectors
            .iter()
            .map(|s| read(s))
            .find(|s| s.id == id)
            .map(|s| s.clone())
    }

    pub fn selectors(&self) -> Vec<RecipientSelector> {
        self.selectors.iter().map(|s| read(s).clone()).collect()
    }

    /// Record the operator's choice on a selector
    pub fn select(&self, id: &str, value: &str) -> bool {
        self.selectors
            .iter()
            .find(|s| read(s).id == id)
            .map(|s| write(s).select(value))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::events::NoopEvents;
    use std::sync::Mutex;

    fn investor(id: &str, name: &str) -> Investor {
        Investor {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@x.com", id),
            created_at: None,
            last_login: None,
        }
    }

    #[test]
    fn test_all_option_first_then_mirror_order() {
        let mut selector = RecipientSelector::new("messageRecipient");
        selector.rebuild(&[investor("b", "Bea"), investor("a", "Al")]);

        let values: Vec<_> = selector.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["all", "b", "a"]);
        assert_eq!(selector.options[0].label, "All Investors");
        assert_eq!(
            selector.options.iter().filter(|o| o.value == "all").count(),
            1
        );
    }

    #[test]
    fn test_selection_survives_when_present() {
        let mut selector = RecipientSelector::new("documentRecipient");
        selector.rebuild(&[investor("a", "Al"), investor("b", "Bea")]);
        assert!(selector.select("b"));

        selector.rebuild(&[investor("c", "Cy"), investor("b", "Bea")]);
        assert_eq!(selector.selected, "b");

        selector.rebuild(&[investor("c", "Cy")]);
        assert_eq!(selector.selected, "all");
        assert_eq!(selector.selected_recipient(), Recipient::All);
    }

    #[test]
    fn test_unknown_selection_refused() {
        let mut selector = RecipientSelector::new("messageRecipient");
        assert!(!selector.select("ghost"));
        assert_eq!(selector.selected, "all");
    }

    struct Recorder(Mutex<Vec<String>>);

    impl DashboardEvents for Recorder {
        fn recipients_changed(&self, selector: &RecipientSelector) {
            self.0.lock().unwrap().push(selector.id.clone());
        }
    }

    #[test]
    fn test_notifier_rebuilds_every_selector() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let notifier = CrossViewNotifier::new(
            &["messageRecipient", "documentRecipient"],
            recorder.clone(),
        );
        notifier.refresh(&[investor("a", "Al")]);

        for selector in notifier.selectors() {
            assert_eq!(selector.options.len(), 2);
        }
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["messageRecipient", "documentRecipient"]
        );
    }

    #[test]
    fn test_notifier_select() {
        let notifier = CrossViewNotifier::new(&["messageRecipient"], Arc::new(NoopEvents));
        notifier.refresh(&[investor("a", "Al")]);
        assert!(notifier.select("messageRecipient", "a"));
        assert!(!notifier.select("nope", "a"));
        assert_eq!(notifier.selector("messageRecipient").unwrap().selected, "a");
    }
}
