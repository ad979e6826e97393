//! `headless_chrome` implementation of the automation collaborator.
//!
//! Reads go through small JavaScript snippets evaluated in the page;
//! selectors and values are embedded as JSON string literals so quoting in
//! selectors like `input[name="F1:username"]` is safe.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Target::DisposeBrowserContext;
use headless_chrome::{Browser as Chrome, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{FacturaError, Result};
use crate::page::{Browser, BrowsingContext, Page, ResponseFilter, WaitPolicy};
use crate::primitives::{VALID_DAYS_SELECTOR, poll_until};
use crate::types::SelectOption;

/// Set on `window` before a navigating click; gone once a new document loads.
const NAVIGATION_MARKER: &str = "__mntrbtPending";

const RESPONSE_HANDLER: &str = "mntrbt-response-wait";

/// Options for launching Chrome.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub path: Option<PathBuf>,
    pub wait: WaitPolicy,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            path: None,
            wait: WaitPolicy::default(),
        }
    }
}

/// A launched Chrome process. Dropping it terminates the process.
pub struct ChromeBrowser {
    browser: Chrome,
    wait: WaitPolicy,
}

impl ChromeBrowser {
    pub fn launch(options: &ChromeOptions) -> Result<Self> {
        let launch = LaunchOptions {
            headless: options.headless,
            path: options.path.clone(),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-infobars"),
            ],
            idle_browser_timeout: Duration::from_secs(60 * 60),
            ..Default::default()
        };

        info!(headless = options.headless, "launching Chrome");
        let browser = Chrome::new(launch).map_err(|e| FacturaError::browser("launch", e))?;

        Ok(Self {
            browser,
            wait: options.wait,
        })
    }
}

impl Browser for ChromeBrowser {
    fn new_isolated_context(&self) -> Result<Box<dyn BrowsingContext>> {
        let context = self
            .browser
            .new_context()
            .map_err(|e| FacturaError::browser("create incognito context", e))?;
        let id = context.get_id().to_string();
        let tab = context
            .new_tab()
            .map_err(|e| FacturaError::browser("open tab", e))?;
        tab.set_default_timeout(self.wait.timeout);
        debug!(context = %id, "opened isolated browsing context");

        let opened = Arc::new(Mutex::new(vec![Arc::clone(&tab)]));
        let page = ChromePage {
            browser: self.browser.clone(),
            tab,
            wait: self.wait,
            opened: Arc::clone(&opened),
        };

        Ok(Box::new(ChromeContext {
            id,
            browser: self.browser.clone(),
            page: Arc::new(page),
            opened,
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct ChromeContext {
    id: String,
    browser: Chrome,
    page: Arc<ChromePage>,
    opened: Arc<Mutex<Vec<Arc<Tab>>>>,
    closed: AtomicBool,
}

impl BrowsingContext for ChromeContext {
    fn page(&self) -> Arc<dyn Page> {
        self.page.clone()
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let tabs = self
            .opened
            .lock()
            .map_err(|_| FacturaError::browser("close context", "tab list lock poisoned"))?;

        // Disposal closes the context's pages as well. Prefer a carrier tab
        // outside the context so the reply is not lost with the page.
        let carrier = self.carrier(&tabs);
        match carrier.call_method(dispose_command(&self.id)) {
            Ok(_) => {
                info!(context = %self.id, tabs = tabs.len(), "browsing context disposed");
                return Ok(());
            }
            Err(e) => warn!(context = %self.id, "failed to dispose context: {e}"),
        }

        for tab in tabs.iter() {
            if let Err(e) = tab.close(true) {
                warn!(context = %self.id, "failed to close tab: {e}");
            }
        }
        info!(context = %self.id, tabs = tabs.len(), "browsing context closed");
        Ok(())
    }
}

impl ChromeContext {
    fn carrier(&self, own: &[Arc<Tab>]) -> Arc<Tab> {
        let own_ids: HashSet<&str> = own.iter().map(|t| t.get_target_id().as_str()).collect();
        self.browser
            .get_tabs()
            .lock()
            .ok()
            .and_then(|tabs| {
                tabs.iter()
                    .find(|t| !own_ids.contains(t.get_target_id().as_str()))
                    .cloned()
            })
            .unwrap_or_else(|| Arc::clone(&self.page.tab))
    }
}

fn dispose_command(id: &str) -> DisposeBrowserContext {
    DisposeBrowserContext {
        browser_context_id: id.to_string(),
    }
}

pub struct ChromePage {
    browser: Chrome,
    tab: Arc<Tab>,
    wait: WaitPolicy,
    opened: Arc<Mutex<Vec<Arc<Tab>>>>,
}

/// Embed a Rust string as a JavaScript string literal.
fn js(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// `Tab::evaluate` hands objects back by reference, so list reads
/// serialize in the page and come back as one JSON string.
fn stringified(script: &str) -> String {
    format!("JSON.stringify({script})")
}

fn decode_list<T: DeserializeOwned>(action: &str, value: Value) -> Result<Vec<T>> {
    match value {
        Value::String(json) => {
            serde_json::from_str(&json).map_err(|e| FacturaError::browser(action, e))
        }
        other => Err(FacturaError::browser(
            action,
            format!("expected a JSON string, got {other}"),
        )),
    }
}

impl ChromePage {
    fn eval(&self, action: &str, script: &str) -> Result<Value> {
        trace!(action, "evaluate");
        let object = self
            .tab
            .evaluate(script, false)
            .map_err(|e| FacturaError::browser(action, e))?;
        Ok(object.value.unwrap_or(Value::Null))
    }

    fn eval_list<T: DeserializeOwned>(&self, action: &str, script: &str) -> Result<Vec<T>> {
        let value = self.eval(action, &stringified(script))?;
        decode_list(action, value)
    }

    fn eval_bool(&self, action: &str, script: &str) -> bool {
        // Evaluation fails while a document is being replaced; that only
        // means "not yet" to the callers polling on this.
        match self.eval(action, script) {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                trace!("{e}");
                false
            }
        }
    }

    fn eval_string(&self, action: &str, script: &str) -> Result<String> {
        Ok(self
            .eval(action, script)?
            .as_str()
            .map(String::from)
            .unwrap_or_default())
    }

    fn document_replaced(&self) -> bool {
        self.eval_bool(
            "check navigation",
            &format!("window.{NAVIGATION_MARKER} === undefined && document.readyState === 'complete'"),
        )
    }

    fn location(&self) -> Option<String> {
        self.eval(
            "read location",
            "document.readyState === 'complete' ? window.location.href : null",
        )
        .ok()
        .and_then(|v| v.as_str().map(String::from))
    }

    /// Wait for the marked document to be replaced, then for the location
    /// to stay put for one settle window. The portal chains several
    /// redirects per click, so a single load event is not enough.
    fn wait_for_quiet(&self, what: &str) -> Result<()> {
        poll_until(self.wait, what, || Ok(self.document_replaced().then_some(())))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| FacturaError::browser("wait for navigation", e))?;

        poll_until(self.wait, what, || {
            let before = self.location();
            std::thread::sleep(self.wait.settle);
            let after = self.location();
            Ok((before.is_some() && before == after && self.document_replaced()).then_some(()))
        })
    }

    fn tab_ids(&self) -> Result<HashSet<String>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|_| FacturaError::browser("list tabs", "tab list lock poisoned"))?;
        Ok(tabs.iter().map(|t| t.get_target_id().to_string()).collect())
    }
}

impl Page for ChromePage {
    fn navigate(&self, url: &str) -> Result<()> {
        info!(url, "navigate");
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| FacturaError::browser(format!("navigate to {url}"), e))?;
        Ok(())
    }

    fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.eval_bool(
            "query selector",
            &format!("document.querySelector({}) !== null", js(selector)),
        ))
    }

    fn exists_xpath(&self, xpath: &str) -> Result<bool> {
        Ok(self.eval_bool(
            "query xpath",
            &format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue !== null",
                js(xpath)
            ),
        ))
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.tab
            .find_element(selector)
            .and_then(|el| el.click().map(|_| ()))
            .map_err(|e| FacturaError::browser(format!("click {selector}"), e))
    }

    fn click_xpath(&self, xpath: &str) -> Result<()> {
        self.tab
            .find_element_by_xpath(xpath)
            .and_then(|el| el.click().map(|_| ()))
            .map_err(|e| FacturaError::browser(format!("click {xpath}"), e))
    }

    fn click_and_wait_for_navigation(&self, selector: &str) -> Result<()> {
        self.eval("mark document", &format!("window.{NAVIGATION_MARKER} = true"))?;
        self.click(selector)?;
        self.wait_for_quiet(&format!("navigation after clicking {selector}"))
    }

    fn click_and_wait_for_response(&self, selector: &str, filter: ResponseFilter) -> Result<()> {
        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);

        self.tab
            .register_response_handling(
                RESPONSE_HANDLER,
                Box::new(
                    move |params: ResponseReceivedEventParams,
                          _body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
                        if (filter.matches)(&params.response.url) {
                            flag.store(true, Ordering::SeqCst);
                        } else {
                            trace!(url = %params.response.url, "ignored response");
                        }
                    },
                ),
            )
            .map_err(|e| FacturaError::browser("watch responses", e))?;

        let outcome = self.click(selector).and_then(|_| {
            poll_until(self.wait, filter.name, || {
                Ok(seen.load(Ordering::SeqCst).then_some(()))
            })
        });

        if let Err(e) = self.tab.deregister_response_handling(RESPONSE_HANDLER) {
            warn!("failed to remove response watcher: {e}");
        }
        outcome
    }

    fn click_xpath_and_wait_for_popup(&self, xpath: &str) -> Result<Arc<dyn Page>> {
        let before = self.tab_ids()?;
        self.click_xpath(xpath)?;

        let tab = poll_until(self.wait, &format!("popup opened by {xpath}"), || {
            let tabs = self
                .browser
                .get_tabs()
                .lock()
                .map_err(|_| FacturaError::browser("list tabs", "tab list lock poisoned"))?;
            Ok(tabs
                .iter()
                .find(|t| !before.contains(t.get_target_id().as_str()))
                .cloned())
        })?;

        tab.set_default_timeout(self.wait.timeout);
        tab.wait_until_navigated()
            .map_err(|e| FacturaError::browser("wait for popup", e))?;
        self.opened
            .lock()
            .map_err(|_| FacturaError::browser("track popup", "tab list lock poisoned"))?
            .push(Arc::clone(&tab));
        debug!(target = %tab.get_target_id(), "adopted popup");

        Ok(Arc::new(ChromePage {
            browser: self.browser.clone(),
            tab,
            wait: self.wait,
            opened: Arc::clone(&self.opened),
        }))
    }

    fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.click(selector)?;
        self.tab
            .type_str(text)
            .map_err(|e| FacturaError::browser(format!("type into {selector}"), e))?;
        Ok(())
    }

    fn value(&self, selector: &str) -> Result<String> {
        self.eval_string(
            "read value",
            &format!("String(document.querySelector({}).value ?? '')", js(selector)),
        )
    }

    fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        self.eval(
            "set value",
            &format!(
                "(function (s, v) {{
                    const el = document.querySelector(s);
                    if (window.jQuery) {{ window.jQuery(el).val(v); }} else {{ el.value = v; }}
                }})({}, {})",
                js(selector),
                js(value)
            ),
        )?;
        Ok(())
    }

    fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        let value = self.eval(
            "read text",
            &format!(
                "(function (s) {{ const el = document.querySelector(s); return el ? el.innerText : null; }})({})",
                js(selector)
            ),
        )?;
        Ok(value.as_str().map(String::from))
    }

    fn select(&self, selector: &str, value: &str) -> Result<()> {
        self.eval(
            "select option",
            &format!(
                "(function (s, v) {{
                    const el = document.querySelector(s);
                    el.value = v;
                    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                }})({}, {})",
                js(selector),
                js(value)
            ),
        )?;
        Ok(())
    }

    fn options(&self, selector: &str) -> Result<Vec<SelectOption>> {
        self.eval_list(
            "read options",
            &format!(
                "Array.from(document.querySelectorAll({} + ' > option')).map(o => ({{ value: o.value, label: o.innerText }}))",
                js(selector)
            ),
        )
    }

    fn input_values(&self, selector: &str) -> Result<Vec<String>> {
        self.eval_list(
            "read input values",
            &format!(
                "Array.from(document.querySelectorAll({})).map(e => e.value)",
                js(selector)
            ),
        )
    }

    fn checkboxes(&self, selector: &str) -> Result<Vec<SelectOption>> {
        self.eval_list(
            "read checkboxes",
            &format!(
                "Array.from(document.querySelectorAll({})).map(cb => {{
                    const label = document.querySelector('label[for=\"' + cb.id + '\"]');
                    return {{ value: cb.id, label: label ? label.innerText : cb.id }};
                }})",
                js(selector)
            ),
        )
    }

    fn check(&self, id: &str) -> Result<()> {
        self.eval(
            "check",
            &format!("document.getElementById({}).checked = true", js(id)),
        )?;
        Ok(())
    }

    fn open_calendar(&self, selector: &str) -> Result<()> {
        self.eval(
            "open calendar",
            &format!(
                "document.querySelector({}).nextElementSibling.click()",
                js(selector)
            ),
        )?;
        Ok(())
    }

    fn calendar_days(&self) -> Result<Vec<String>> {
        self.eval_list(
            "read calendar",
            &format!(
                "(function (s) {{
                    const tds = Array.from(document.querySelectorAll(s));
                    if (tds.length === 0) {{ return []; }}
                    const calendar = tds[0].calendar;
                    return tds.map(td => td.caldate.print(calendar.dateFormat));
                }})({})",
                js(VALID_DAYS_SELECTOR)
            ),
        )
    }

    fn is_displayed(&self, selector: &str) -> Result<bool> {
        Ok(self.eval_bool(
            "check display",
            &format!(
                "(function (s) {{ const el = document.querySelector(s); return !!el && el.style.display === 'block'; }})({})",
                js(selector)
            ),
        ))
    }

    fn accept_dialogs(&self) -> Result<()> {
        self.eval(
            "accept dialogs",
            "window.confirm = () => true; window.alert = () => undefined; true",
        )?;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        self.eval("evaluate", script)
    }

    fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }
}
