//! The automation collaborator.
//!
//! Everything the invoice flow does to a web page goes through [`Page`].
//! The `chrome` module implements it on top of a real browser; tests use an
//! in-memory simulation of the portal.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::Result;
use crate::types::SelectOption;

/// How long and how often to poll while waiting for a page condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
    /// Pause after actions the site follows with client-side work we
    /// cannot observe directly.
    pub settle: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_millis(100),
            settle: Duration::from_millis(500),
        }
    }
}

/// A single browser tab.
///
/// Selectors are CSS unless the method name says XPath. Methods that read
/// or act on an element assume it exists; use the waiting helpers in
/// `primitives` first.
/// Picks out the network response a click is waiting for.
#[derive(Debug, Clone, Copy)]
pub struct ResponseFilter {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
}

pub trait Page: Send + Sync {
    fn navigate(&self, url: &str) -> Result<()>;

    fn exists(&self, selector: &str) -> Result<bool>;

    fn exists_xpath(&self, xpath: &str) -> Result<bool>;

    fn click(&self, selector: &str) -> Result<()>;

    fn click_xpath(&self, xpath: &str) -> Result<()>;

    /// Click and return only once the resulting navigation has settled.
    fn click_and_wait_for_navigation(&self, selector: &str) -> Result<()>;

    /// Click and return once a response accepted by `filter` has arrived.
    fn click_and_wait_for_response(&self, selector: &str, filter: ResponseFilter) -> Result<()>;

    /// Click an element that opens a new window and return that window.
    fn click_xpath_and_wait_for_popup(&self, xpath: &str) -> Result<Arc<dyn Page>>;

    /// Focus the element and type `text` with the keyboard. Appends to any
    /// existing content.
    fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    fn value(&self, selector: &str) -> Result<String>;

    /// Assign the element's value directly, without keyboard events.
    fn set_value(&self, selector: &str, value: &str) -> Result<()>;

    fn inner_text(&self, selector: &str) -> Result<Option<String>>;

    /// Choose an option of a `<select>` and fire its change handlers.
    fn select(&self, selector: &str, value: &str) -> Result<()>;

    /// Every `<option>` of a `<select>`, placeholders included.
    fn options(&self, selector: &str) -> Result<Vec<SelectOption>>;

    /// The `value` attribute of every element matching `selector`.
    fn input_values(&self, selector: &str) -> Result<Vec<String>>;

    /// Checkboxes matching `selector` as (element id, label text).
    fn checkboxes(&self, selector: &str) -> Result<Vec<SelectOption>>;

    fn check(&self, id: &str) -> Result<()>;

    /// Open the calendar widget attached to a date input.
    fn open_calendar(&self, selector: &str) -> Result<()>;

    /// Selectable days of the open calendar, formatted like the input.
    fn calendar_days(&self) -> Result<Vec<String>>;

    fn is_displayed(&self, selector: &str) -> Result<bool>;

    /// Auto-accept any confirm/alert dialog raised from now on.
    fn accept_dialogs(&self) -> Result<()>;

    fn evaluate(&self, script: &str) -> Result<Value>;

    fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::default()
    }
}

/// An isolated browsing context: private cookies and storage.
pub trait BrowsingContext: Send + Sync {
    /// The page the context was opened with.
    fn page(&self) -> Arc<dyn Page>;

    /// Close every page of the context and dispose of it. Idempotent.
    fn close(&self) -> Result<()>;
}

pub trait Browser: Send + Sync {
    fn new_isolated_context(&self) -> Result<Box<dyn BrowsingContext>>;
}
