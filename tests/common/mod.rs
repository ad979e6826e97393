//! Shared fakes for integration tests: a simulated AFIP site and a scripted
//! console.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use monotributo::afip::selectors::*;
use monotributo::{
    Browser, BrowsingContext, FacturaError, Notice, Page, Prompter, ResponseFilter, Result,
    SelectOption, WaitPolicy,
};

pub const CUIT: &str = "20111111112";
pub const PASSWORD_OK: &str = "clave-correcta";
pub const BAD_CUIT_MESSAGE: &str = "Número de CUIT incorrecto";
pub const BAD_PASSWORD_MESSAGE: &str = "Clave o usuario incorrecto";
pub const LOOKUP_URL: &str =
    "https://serviciosjava2.afip.gob.ar/rcel/jsp/ajax.do?f=buscarReceptor&nroDocumento=30111222";

/// Short waits so timeouts surface quickly.
pub fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        timeout: Duration::from_millis(300),
        interval: Duration::from_millis(5),
        settle: Duration::ZERO,
    }
}

fn opt(value: &str, label: &str) -> SelectOption {
    SelectOption::new(value, label)
}

/// What the simulated site offers. Tests tweak fields before building pages.
#[derive(Debug, Clone)]
pub struct Site {
    pub businesses: Vec<String>,
    pub sale_points: Vec<SelectOption>,
    pub content_types: Vec<SelectOption>,
    pub iva_conditions: Vec<SelectOption>,
    pub legal_name: String,
    pub addresses: Vec<SelectOption>,
    pub payment_methods: Vec<SelectOption>,
    pub default_date: String,
    pub valid_dates: Vec<String>,
    /// Reads of the sale point select that still see only the placeholder.
    pub sale_point_load_reads: usize,
    pub has_generate_button: bool,
    /// A receipts keep-alive reply lands between the blur and the lookup reply.
    pub keep_alive_during_lookup: bool,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            businesses: vec!["PEREZ JUAN".into(), "PEREZ JUAN - SEGUNDA".into()],
            sale_points: vec![opt("1", "00001-Local"), opt("2", "00002-Online")],
            content_types: vec![
                opt("1", "Productos"),
                opt("2", "Servicios"),
                opt("3", "Productos y Servicios"),
            ],
            iva_conditions: vec![
                opt("1", "IVA Responsable Inscripto"),
                opt("4", "IVA Sujeto Exento"),
                opt("5", "Consumidor Final"),
            ],
            legal_name: "GOMEZ MARIA".into(),
            addresses: vec![opt("Av. Siempreviva 742", "Av. Siempreviva 742")],
            payment_methods: vec![
                opt("formadepago1", "Contado"),
                opt("formadepago2", "Tarjeta de Débito"),
                opt("formadepago3", "Transferencia Bancaria"),
            ],
            default_date: "10/03/2020".into(),
            valid_dates: vec![
                "09/03/2020".into(),
                "10/03/2020".into(),
                "11/03/2020".into(),
            ],
            sale_point_load_reads: 2,
            has_generate_button: true,
            keep_alive_during_lookup: false,
        }
    }
}

impl Site {
    /// Receipt types depend on the sale point.
    pub fn receipt_types(sale_point: &str) -> Vec<SelectOption> {
        match sale_point {
            "1" => vec![opt("11", "Factura C"), opt("12", "Nota de Débito C")],
            _ => vec![
                opt("13", "Nota de Crédito C"),
                opt("11", "Factura C"),
                opt("15", "Recibo C"),
            ],
        }
    }

    /// Document types depend on the IVA condition.
    pub fn document_types(iva_condition: &str) -> Vec<SelectOption> {
        match iva_condition {
            "5" => vec![opt("80", "CUIT"), opt("96", "DNI"), opt("99", "Doc. (Otro)")],
            _ => vec![opt("80", "CUIT")],
        }
    }
}

/// State shared by every page of one browsing context.
pub struct Recorder {
    pub site: Site,
    wait: WaitPolicy,
    log: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl Recorder {
    fn new(site: Site) -> Arc<Self> {
        Arc::new(Self {
            site,
            wait: fast_wait(),
            log: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.log().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Blank,
    Login,
    Password,
    Portal,
    Businesses,
    Menu,
    Header,
    Data,
    Receiver,
    Lines,
    Confirm,
    Done,
}

#[derive(Debug, Clone, Default)]
struct Element {
    value: String,
    options: Vec<SelectOption>,
    /// Option reads left before `options` shows up.
    loads_after: usize,
}

impl Element {
    fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            ..Self::default()
        }
    }

    fn with_options(options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

struct Dom {
    screen: Screen,
    elements: HashMap<String, Element>,
    xpaths: HashSet<String>,
    error: Option<String>,
    calendar_open: bool,
    dialogs_accepted: bool,
    checked: Vec<String>,
    lines: usize,
}

impl Dom {
    fn new(screen: Screen) -> Self {
        Self {
            screen,
            elements: HashMap::new(),
            xpaths: HashSet::new(),
            error: None,
            calendar_open: false,
            dialogs_accepted: false,
            checked: Vec::new(),
            lines: 0,
        }
    }

    fn show(&mut self, screen: Screen, elements: Vec<(&str, Element)>) {
        self.screen = screen;
        self.elements = elements
            .into_iter()
            .map(|(sel, el)| (sel.to_string(), el))
            .collect();
        self.xpaths.clear();
    }

    fn get(&self, selector: &str) -> Result<&Element> {
        self.elements
            .get(selector)
            .ok_or_else(|| FacturaError::browser("find element", format!("no element {selector}")))
    }

    fn get_mut(&mut self, selector: &str) -> Result<&mut Element> {
        self.elements
            .get_mut(selector)
            .ok_or_else(|| FacturaError::browser("find element", format!("no element {selector}")))
    }

    fn add_line(&mut self) {
        self.lines += 1;
        let n = self.lines;
        for sel in [line_description(n), line_quantity(n), line_price(n)] {
            self.elements.insert(sel, Element::default());
        }
    }

    fn total(&self) -> String {
        let number = |sel: String| -> f64 {
            self.elements
                .get(&sel)
                .and_then(|e| e.value.replace(',', ".").parse().ok())
                .unwrap_or(0.0)
        };
        let total: f64 = (1..=self.lines)
            .map(|n| number(line_quantity(n)) * number(line_price(n)))
            .sum();
        format!("{total:.2}")
    }
}

/// One simulated tab.
pub struct FakePage {
    recorder: Arc<Recorder>,
    dom: Mutex<Dom>,
}

impl FakePage {
    fn new(recorder: Arc<Recorder>, screen: Screen) -> Arc<Self> {
        Arc::new(Self {
            recorder,
            dom: Mutex::new(Dom::new(screen)),
        })
    }

    /// The online receipts application, as reached from the portal.
    pub fn receipts(site: Site) -> Arc<Self> {
        let page = Self::new(Recorder::new(site), Screen::Blank);
        page.show_businesses();
        page
    }

    pub fn recorder(&self) -> Arc<Recorder> {
        Arc::clone(&self.recorder)
    }

    fn site(&self) -> &Site {
        &self.recorder.site
    }

    fn show_businesses(&self) {
        let mut dom = self.dom.lock().unwrap();
        let mut elements = vec![(BUSINESS_BUTTONS, Element::default())];
        let buttons: Vec<String> = self.site().businesses.iter().map(|b| business_button(b)).collect();
        for button in &buttons {
            elements.push((button.as_str(), Element::default()));
        }
        dom.show(Screen::Businesses, elements);
    }

    fn live(&self, action: &str) -> Result<()> {
        if self.recorder.is_closed() {
            return Err(FacturaError::browser(action, "page is closed"));
        }
        Ok(())
    }

    fn on_click(&self, dom: &mut Dom, selector: &str) -> Result<()> {
        dom.get(selector)?;
        let site = self.site();

        match (dom.screen, selector) {
            (Screen::Login, SUBMIT) => {
                if dom.get(USERNAME)?.value == CUIT {
                    dom.show(
                        Screen::Password,
                        vec![(PASSWORD, Element::default()), (SUBMIT, Element::default())],
                    );
                    dom.error = None;
                } else {
                    dom.error = Some(format!("  {BAD_CUIT_MESSAGE}\n"));
                }
            }
            (Screen::Password, SUBMIT) => {
                if dom.get(PASSWORD)?.value == PASSWORD_OK {
                    dom.show(Screen::Portal, vec![]);
                    dom.error = None;
                } else {
                    dom.error = Some(BAD_PASSWORD_MESSAGE.to_string());
                }
            }
            (Screen::Businesses, _) if selector != BUSINESS_BUTTONS => {
                dom.show(Screen::Menu, vec![(GENERATE_RECEIPTS, Element::default())]);
            }
            (Screen::Menu, GENERATE_RECEIPTS) => {
                let sale_points = Element {
                    options: site.sale_points.clone(),
                    loads_after: site.sale_point_load_reads,
                    ..Element::default()
                };
                dom.show(
                    Screen::Header,
                    vec![
                        (SALE_POINT, sale_points),
                        (RECEIPT_TYPE, Element::default()),
                        (CONTINUE, Element::default()),
                    ],
                );
            }
            (Screen::Header, CONTINUE) => {
                if dom.get(RECEIPT_TYPE)?.value.is_empty() {
                    return Err(FacturaError::browser("continue", "receipt type missing"));
                }
                dom.show(
                    Screen::Data,
                    vec![
                        (ISSUE_DATE, Element::with_value(&site.default_date)),
                        (CONTENT_TYPE, Element::with_options(site.content_types.clone())),
                        (CONTINUE, Element::default()),
                    ],
                );
            }
            (Screen::Data, CONTINUE) => {
                dom.show(
                    Screen::Receiver,
                    vec![
                        (IVA_CONDITION, Element::with_options(site.iva_conditions.clone())),
                        (DOCUMENT_TYPE, Element::default()),
                        (DOCUMENT_NUMBER, Element::default()),
                        (LEGAL_NAME, Element::default()),
                        (ADDRESS_COMBO, Element::default()),
                        (ADDRESS_TEXT, Element::default()),
                        (PAYMENT_METHODS, Element::default()),
                        (CONTINUE, Element::default()),
                    ],
                );
                dom.checked.clear();
            }
            (Screen::Receiver, CONTINUE) => {
                if dom.checked.is_empty() {
                    return Err(FacturaError::browser("continue", "no payment method"));
                }
                dom.show(
                    Screen::Lines,
                    vec![
                        (ADD_LINE, Element::default()),
                        (TOTAL, Element::default()),
                        (CONTINUE, Element::default()),
                    ],
                );
                dom.lines = 0;
                dom.add_line();
            }
            (Screen::Lines, ADD_LINE) => dom.add_line(),
            (Screen::Lines, CONTINUE) => {
                let mut elements = vec![];
                if site.has_generate_button {
                    elements.push((GENERATE, Element::default()));
                }
                dom.show(Screen::Confirm, elements);
            }
            (Screen::Confirm, GENERATE) => {
                if !dom.dialogs_accepted {
                    return Err(FacturaError::browser("generate", "confirm dialog blocked"));
                }
                dom.show(
                    Screen::Done,
                    vec![(RECEIPT_BUTTONS, Element::default()), (PRINT, Element::default())],
                );
            }
            // Clicking a date input toggles its calendar.
            (_, ISSUE_DATE | BILLED_FROM | BILLED_TO | DUE_DATE) => dom.calendar_open = false,
            _ => {}
        }
        Ok(())
    }

    fn on_select(&self, dom: &mut Dom, selector: &str, value: &str) -> Result<()> {
        let element = dom.get_mut(selector)?;
        if !element.options.iter().any(|o| o.value == value) {
            return Err(FacturaError::browser(
                "select",
                format!("{value} is not an option of {selector}"),
            ));
        }
        element.value = value.to_string();

        let site = self.site();
        match selector {
            SALE_POINT => {
                dom.get_mut(RECEIPT_TYPE)?.options = Site::receipt_types(value);
            }
            CONTENT_TYPE if value == "1" => {
                for sel in [BILLED_FROM, BILLED_TO, DUE_DATE] {
                    dom.elements.remove(sel);
                }
            }
            CONTENT_TYPE => {
                for sel in [BILLED_FROM, BILLED_TO, DUE_DATE] {
                    dom.elements
                        .insert(sel.to_string(), Element::with_value(&site.default_date));
                }
            }
            IVA_CONDITION => {
                dom.get_mut(DOCUMENT_TYPE)?.options = Site::document_types(value);
            }
            _ => {}
        }
        Ok(())
    }
}

impl Page for FakePage {
    fn navigate(&self, url: &str) -> Result<()> {
        self.live("navigate")?;
        self.recorder.record(format!("navigate:{url}"));
        let mut dom = self.dom.lock().unwrap();
        match url {
            LOGIN_URL => dom.show(
                Screen::Login,
                vec![(USERNAME, Element::default()), (SUBMIT, Element::default())],
            ),
            PORTAL_URL => {
                dom.show(Screen::Portal, vec![]);
                dom.xpaths.insert(MY_SERVICES_XPATH.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn exists(&self, selector: &str) -> Result<bool> {
        self.live("exists")?;
        Ok(self.dom.lock().unwrap().elements.contains_key(selector))
    }

    fn exists_xpath(&self, xpath: &str) -> Result<bool> {
        self.live("exists")?;
        Ok(self.dom.lock().unwrap().xpaths.contains(xpath))
    }

    fn click(&self, selector: &str) -> Result<()> {
        self.live("click")?;
        self.recorder.record(format!("click:{selector}"));
        let mut dom = self.dom.lock().unwrap();
        self.on_click(&mut dom, selector)
    }

    fn click_xpath(&self, xpath: &str) -> Result<()> {
        self.live("click")?;
        self.recorder.record(format!("click_xpath:{xpath}"));
        let mut dom = self.dom.lock().unwrap();
        if dom.screen == Screen::Portal && xpath == MY_SERVICES_XPATH {
            dom.xpaths.insert(ONLINE_RECEIPTS_XPATH.to_string());
        }
        Ok(())
    }

    fn click_and_wait_for_navigation(&self, selector: &str) -> Result<()> {
        self.live("click")?;
        self.recorder.record(format!("click_nav:{selector}"));
        let mut dom = self.dom.lock().unwrap();
        self.on_click(&mut dom, selector)
    }

    fn click_and_wait_for_response(&self, selector: &str, filter: ResponseFilter) -> Result<()> {
        self.live("click")?;
        self.recorder
            .record(format!("click_response:{selector}:{}", filter.name));
        let mut dom = self.dom.lock().unwrap();
        dom.get(selector)?;

        if self.site().keep_alive_during_lookup {
            let ping = receipts_keep_alive_url();
            self.recorder.record(format!("response:{ping}"));
            if (filter.matches)(&ping) {
                return Ok(());
            }
        }

        if dom.screen == Screen::Receiver && !dom.get(DOCUMENT_NUMBER)?.value.is_empty() {
            let site = self.site();
            dom.get_mut(LEGAL_NAME)?.value = site.legal_name.clone();
            dom.get_mut(ADDRESS_COMBO)?.options = site.addresses.clone();
        }
        self.recorder.record(format!("response:{LOOKUP_URL}"));
        if !(filter.matches)(LOOKUP_URL) {
            return Err(FacturaError::NavigationTimeout {
                waiting_for: filter.name.to_string(),
                timeout: self.recorder.wait.timeout,
            });
        }
        Ok(())
    }

    fn click_xpath_and_wait_for_popup(&self, xpath: &str) -> Result<Arc<dyn Page>> {
        self.live("click")?;
        self.recorder.record(format!("popup:{xpath}"));
        if !self.dom.lock().unwrap().xpaths.contains(xpath) {
            return Err(FacturaError::browser("click", format!("no element {xpath}")));
        }
        let popup = Self::new(Arc::clone(&self.recorder), Screen::Blank);
        popup.show_businesses();
        Ok(popup as Arc<dyn Page>)
    }

    fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.live("type")?;
        self.recorder.record(format!("type:{selector}={text}"));
        let mut dom = self.dom.lock().unwrap();
        dom.get_mut(selector)?.value.push_str(text);
        Ok(())
    }

    fn value(&self, selector: &str) -> Result<String> {
        self.live("read")?;
        let dom = self.dom.lock().unwrap();
        if selector == TOTAL {
            dom.get(TOTAL)?;
            return Ok(dom.total());
        }
        Ok(dom.get(selector)?.value.clone())
    }

    fn set_value(&self, selector: &str, value: &str) -> Result<()> {
        self.live("set")?;
        self.recorder.record(format!("set:{selector}={value}"));
        let mut dom = self.dom.lock().unwrap();
        dom.get_mut(selector)?.value = value.to_string();
        Ok(())
    }

    fn inner_text(&self, selector: &str) -> Result<Option<String>> {
        self.live("read")?;
        let dom = self.dom.lock().unwrap();
        Ok(match selector {
            LOGIN_ERROR => dom.error.clone(),
            _ => None,
        })
    }

    fn select(&self, selector: &str, value: &str) -> Result<()> {
        self.live("select")?;
        self.recorder.record(format!("select:{selector}={value}"));
        let mut dom = self.dom.lock().unwrap();
        self.on_select(&mut dom, selector, value)
    }

    fn options(&self, selector: &str) -> Result<Vec<SelectOption>> {
        self.live("read")?;
        let mut dom = self.dom.lock().unwrap();
        let element = dom.get_mut(selector)?;
        let mut options = vec![SelectOption::new("", "Seleccionar...")];
        if element.loads_after > 0 {
            element.loads_after -= 1;
        } else {
            options.extend(element.options.iter().cloned());
        }
        Ok(options)
    }

    fn input_values(&self, selector: &str) -> Result<Vec<String>> {
        self.live("read")?;
        let dom = self.dom.lock().unwrap();
        Ok(match (dom.screen, selector) {
            (Screen::Businesses, BUSINESS_BUTTONS) => self.site().businesses.clone(),
            _ => Vec::new(),
        })
    }

    fn checkboxes(&self, selector: &str) -> Result<Vec<SelectOption>> {
        self.live("read")?;
        let dom = self.dom.lock().unwrap();
        dom.get(selector)?;
        Ok(self.site().payment_methods.clone())
    }

    fn check(&self, id: &str) -> Result<()> {
        self.live("check")?;
        self.recorder.record(format!("check:{id}"));
        if !self.site().payment_methods.iter().any(|o| o.value == id) {
            return Err(FacturaError::browser("check", format!("no checkbox {id}")));
        }
        self.dom.lock().unwrap().checked.push(id.to_string());
        Ok(())
    }

    fn open_calendar(&self, selector: &str) -> Result<()> {
        self.live("calendar")?;
        let mut dom = self.dom.lock().unwrap();
        dom.get(selector)?;
        dom.calendar_open = true;
        Ok(())
    }

    fn calendar_days(&self) -> Result<Vec<String>> {
        self.live("calendar")?;
        let dom = self.dom.lock().unwrap();
        Ok(if dom.calendar_open {
            self.site().valid_dates.clone()
        } else {
            Vec::new()
        })
    }

    fn is_displayed(&self, selector: &str) -> Result<bool> {
        self.exists(selector)
    }

    fn accept_dialogs(&self) -> Result<()> {
        self.live("dialogs")?;
        self.recorder.record("accept_dialogs".to_string());
        self.dom.lock().unwrap().dialogs_accepted = true;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        self.live("evaluate")?;
        self.recorder.record(format!("evaluate:{script}"));
        Ok(Value::Bool(true))
    }

    fn wait_policy(&self) -> WaitPolicy {
        self.recorder.wait
    }
}

pub struct FakeContext {
    recorder: Arc<Recorder>,
    page: Arc<FakePage>,
}

impl BrowsingContext for FakeContext {
    fn page(&self) -> Arc<dyn Page> {
        self.page.clone()
    }

    fn close(&self) -> Result<()> {
        if !self.recorder.closed.swap(true, Ordering::SeqCst) {
            self.recorder.record("close".to_string());
        }
        Ok(())
    }
}

/// Hands out a fresh simulated site per context and remembers each one.
#[derive(Default)]
pub struct FakeBrowser {
    pub site: Site,
    contexts: Mutex<Vec<Arc<Recorder>>>,
}

impl FakeBrowser {
    pub fn new(site: Site) -> Self {
        Self {
            site,
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn contexts(&self) -> Vec<Arc<Recorder>> {
        self.contexts.lock().unwrap().clone()
    }
}

impl Browser for FakeBrowser {
    fn new_isolated_context(&self) -> Result<Box<dyn BrowsingContext>> {
        let recorder = Recorder::new(self.site.clone());
        self.contexts.lock().unwrap().push(Arc::clone(&recorder));
        let page = FakePage::new(Arc::clone(&recorder), Screen::Blank);
        Ok(Box::new(FakeContext { recorder, page }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Password(String),
    Select(usize),
    Multi(Vec<usize>),
    Confirm(bool),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// A question the scripted console was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asked {
    pub message: String,
    pub items: Vec<String>,
}

/// Answers questions from a fixed script and records what was asked.
#[derive(Default)]
pub struct ScriptedPrompter {
    replies: Mutex<VecDeque<Reply>>,
    asked: Mutex<Vec<Asked>>,
    notices: Mutex<Vec<Notice>>,
}

impl ScriptedPrompter {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn asked(&self) -> Vec<Asked> {
        self.asked.lock().unwrap().clone()
    }

    pub fn was_asked(&self, message: &str) -> usize {
        self.asked().iter().filter(|a| a.message == message).count()
    }

    pub fn items_for(&self, message: &str) -> Option<Vec<String>> {
        self.asked()
            .into_iter()
            .find(|a| a.message == message)
            .map(|a| a.items)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next(&self, message: &str, items: &[String]) -> Result<Reply> {
        self.asked.lock().unwrap().push(Asked {
            message: message.to_string(),
            items: items.to_vec(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FacturaError::Prompt {
                reason: format!("script exhausted at \"{message}\""),
            })
    }
}

fn unexpected(message: &str, reply: Reply) -> FacturaError {
    FacturaError::Prompt {
        reason: format!("unexpected {reply:?} for \"{message}\""),
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, message: &str, default: Option<&str>) -> Result<String> {
        match self.next(message, &[])? {
            Reply::Text(t) if t.is_empty() => Ok(default.unwrap_or_default().to_string()),
            Reply::Text(t) => Ok(t),
            other => Err(unexpected(message, other)),
        }
    }

    fn password(&self, message: &str) -> Result<String> {
        match self.next(message, &[])? {
            Reply::Password(p) => Ok(p),
            other => Err(unexpected(message, other)),
        }
    }

    fn select(&self, message: &str, items: &[String], _default: usize) -> Result<usize> {
        match self.next(message, items)? {
            Reply::Select(i) => Ok(i),
            other => Err(unexpected(message, other)),
        }
    }

    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>> {
        match self.next(message, items)? {
            Reply::Multi(i) => Ok(i),
            other => Err(unexpected(message, other)),
        }
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        match self.next(message, &[])? {
            Reply::Confirm(b) => Ok(b),
            other => Err(unexpected(message, other)),
        }
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Replies from company selection through content type, choosing the
/// first business, sale point "1", the default issue date and goods.
pub fn header_replies() -> Vec<Reply> {
    vec![Reply::Select(0), Reply::Select(0), text(""), Reply::Select(0)]
}

/// Final consumer identified by DNI.
pub fn final_consumer_replies() -> Vec<Reply> {
    vec![Reply::Select(2), Reply::Select(1), text("30111222")]
}

pub fn item_replies(description: &str, quantity: &str, price: &str) -> Vec<Reply> {
    vec![text(description), text(quantity), text(price)]
}
