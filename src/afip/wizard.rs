//! The "generate receipt" wizard of the online receipts application.
//!
//! The wizard is a fixed graph of named [`WizardState`]s. Feeding an
//! [`Answer`] to the current state does two things:
//!
//! - [`transition`] decides the next state. It is pure and depends only on
//!   the answer and the [`WizardContext`] collected so far.
//! - [`Wizard::apply`] performs the answer on the page and reads the
//!   choices the page now offers for the next state.
//!
//! The page is the only channel that carries earlier answers forward on the
//! site, so a state cannot be reached without applying every answer before
//! it on a live page.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::afip::selectors::{
    ADD_LINE, ADDRESS_COMBO, ADDRESS_TEXT, BILLED_FROM, BILLED_TO, BUSINESS_BUTTONS, CONTENT_TYPE,
    CONTINUE, DOCUMENT_NUMBER, DOCUMENT_TYPE, DUE_DATE, GENERATE, GENERATE_RECEIPTS,
    ISSUE_DATE, IVA_CONDITION, LEGAL_NAME, PAYMENT_METHODS, PRINT, RECEIPT_BUTTONS,
    RECEIPT_TYPE, RECEIVER_LOOKUP, SALE_POINT, TOTAL, business_button, line_description,
    line_price, line_quantity,
};
use crate::error::{FacturaError, Result};
use crate::page::Page;
use crate::primitives::{
    OptionsWait, click_and_await_navigation, read_checkbox_options, read_date_field_constraints,
    read_field_value, read_select_options, set_field_value, settle, wait_for_selector,
    wait_until_displayed,
};
use crate::types::{DateField, LineItem, SelectOption};

/// Content type for goods only. Goods have no billing period or due date.
pub const GOODS_ONLY: &str = "1";

/// IVA condition code of a final consumer ("Consumidor Final").
pub const FINAL_CONSUMER: &str = "5";

/// The only receipt type the flow produces.
pub const ACCEPTED_RECEIPT_TYPE: &str = "Factura C";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardState {
    CompanySelection,
    SalePointSelection,
    ReceiptTypeSelection,
    IssueDateEntry,
    ContentTypeSelection,
    BilledPeriodFromEntry,
    BilledPeriodToEntry,
    PaymentDueDateEntry,
    IvaConditionSelection,
    DocumentTypeSelection,
    CommercialAddressSelection,
    PaymentMethodSelection,
    LineItemEntry,
    ReceiptGeneration,
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The receiver's commercial address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// One of the addresses the site has on file.
    Existing(String),
    /// Typed by the user.
    Other(String),
    Omitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "answer", content = "value")]
pub enum Answer {
    Business(String),
    SalePoint(String),
    ReceiptType(String),
    IssueDate(String),
    ContentType(String),
    BilledFrom(String),
    BilledTo(String),
    DueDate(String),
    IvaCondition(String),
    Document { kind: String, number: String },
    CommercialAddress(Address),
    PaymentMethods(Vec<String>),
    LineItem(LineItem),
    /// Stop adding line items.
    NoMoreItems,
    /// Whether to actually generate the receipt.
    Generate(bool),
}

impl Answer {
    fn name(&self) -> &'static str {
        match self {
            Answer::Business(_) => "Business",
            Answer::SalePoint(_) => "SalePoint",
            Answer::ReceiptType(_) => "ReceiptType",
            Answer::IssueDate(_) => "IssueDate",
            Answer::ContentType(_) => "ContentType",
            Answer::BilledFrom(_) => "BilledFrom",
            Answer::BilledTo(_) => "BilledTo",
            Answer::DueDate(_) => "DueDate",
            Answer::IvaCondition(_) => "IvaCondition",
            Answer::Document { .. } => "Document",
            Answer::CommercialAddress(_) => "CommercialAddress",
            Answer::PaymentMethods(_) => "PaymentMethods",
            Answer::LineItem(_) => "LineItem",
            Answer::NoMoreItems => "NoMoreItems",
            Answer::Generate(_) => "Generate",
        }
    }
}

/// Every answer given so far, plus what the site reported back.
///
/// Transitions never mutate a context; [`WizardContext::record`] returns an
/// updated copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardContext {
    pub business: Option<String>,
    pub sale_point: Option<String>,
    pub receipt_type: Option<String>,
    pub issue_date: Option<String>,
    pub content_type: Option<String>,
    pub billed_from: Option<String>,
    pub billed_to: Option<String>,
    pub due_date: Option<String>,
    pub iva_condition: Option<String>,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub legal_name: Option<String>,
    pub commercial_address: Option<Address>,
    pub payment_methods: Vec<String>,
    pub line_items: Vec<LineItem>,
    /// Running total as displayed by the site.
    pub total: Option<String>,
}

impl WizardContext {
    pub fn record(&self, answer: &Answer) -> WizardContext {
        let mut next = self.clone();
        match answer {
            Answer::Business(v) => next.business = Some(v.clone()),
            Answer::SalePoint(v) => next.sale_point = Some(v.clone()),
            Answer::ReceiptType(v) => next.receipt_type = Some(v.clone()),
            Answer::IssueDate(v) => next.issue_date = Some(v.clone()),
            Answer::ContentType(v) => next.content_type = Some(v.clone()),
            Answer::BilledFrom(v) => next.billed_from = Some(v.clone()),
            Answer::BilledTo(v) => next.billed_to = Some(v.clone()),
            Answer::DueDate(v) => next.due_date = Some(v.clone()),
            Answer::IvaCondition(v) => next.iva_condition = Some(v.clone()),
            Answer::Document { kind, number } => {
                next.document_type = Some(kind.clone());
                next.document_number = Some(number.clone());
            }
            Answer::CommercialAddress(a) => next.commercial_address = Some(a.clone()),
            Answer::PaymentMethods(ids) => next.payment_methods = ids.clone(),
            Answer::LineItem(item) => next.line_items.push(item.clone()),
            Answer::NoMoreItems | Answer::Generate(_) => {}
        }
        next
    }

    fn with_legal_name(mut self, legal_name: String) -> Self {
        self.legal_name = Some(legal_name);
        self
    }

    fn with_total(mut self, total: Option<String>) -> Self {
        self.total = total;
        self
    }

    pub fn is_final_consumer(&self) -> bool {
        self.iva_condition.as_deref() == Some(FINAL_CONSUMER)
    }
}

/// What the page offers for the state awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choices {
    Options(Vec<SelectOption>),
    Date(DateField),
    /// The receiver's legal name as looked up by the site, and the
    /// addresses it has on file.
    Counterparty {
        legal_name: String,
        addresses: Vec<SelectOption>,
    },
    PaymentMethods(Vec<SelectOption>),
    /// Next line number, and the running total once a line exists.
    LineItem {
        number: usize,
        total: Option<String>,
    },
    Confirmation {
        total: String,
    },
}

/// A state waiting for its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub state: WizardState,
    pub context: WizardContext,
    pub choices: Choices,
}

/// The end of the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub context: WizardContext,
    pub submitted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Pending(Pending),
    Finished(Receipt),
}

/// The wizard graph. `Ok(None)` means the wizard is over.
pub fn transition(
    state: WizardState,
    answer: &Answer,
    context: &WizardContext,
) -> Result<Option<WizardState>> {
    use WizardState::*;

    let next = match (state, answer) {
        (CompanySelection, Answer::Business(_)) => SalePointSelection,
        (SalePointSelection, Answer::SalePoint(_)) => ReceiptTypeSelection,
        (ReceiptTypeSelection, Answer::ReceiptType(_)) => IssueDateEntry,
        (IssueDateEntry, Answer::IssueDate(_)) => ContentTypeSelection,
        (ContentTypeSelection, Answer::ContentType(kind)) if kind == GOODS_ONLY => {
            IvaConditionSelection
        }
        (ContentTypeSelection, Answer::ContentType(_)) => BilledPeriodFromEntry,
        (BilledPeriodFromEntry, Answer::BilledFrom(_)) => BilledPeriodToEntry,
        (BilledPeriodToEntry, Answer::BilledTo(_)) => PaymentDueDateEntry,
        (PaymentDueDateEntry, Answer::DueDate(_)) => IvaConditionSelection,
        (IvaConditionSelection, Answer::IvaCondition(_)) => DocumentTypeSelection,
        (DocumentTypeSelection, Answer::Document { .. }) => CommercialAddressSelection,
        (CommercialAddressSelection, Answer::CommercialAddress(_)) => PaymentMethodSelection,
        (PaymentMethodSelection, Answer::PaymentMethods(ids)) if !ids.is_empty() => LineItemEntry,
        (LineItemEntry, Answer::LineItem(_)) => LineItemEntry,
        (LineItemEntry, Answer::NoMoreItems) if !context.line_items.is_empty() => {
            ReceiptGeneration
        }
        (ReceiptGeneration, Answer::Generate(_)) => return Ok(None),
        _ => {
            return Err(FacturaError::InvalidAnswer {
                state: state.to_string(),
                answer: answer.name().to_string(),
            });
        }
    };
    Ok(Some(next))
}

/// Drives the wizard on a receipts application page.
pub struct Wizard<'p> {
    page: &'p dyn Page,
}

impl<'p> Wizard<'p> {
    pub fn new(page: &'p dyn Page) -> Self {
        Self { page }
    }

    /// The businesses the user can issue receipts for.
    pub fn start(&self) -> Result<Pending> {
        let state = WizardState::CompanySelection;
        let (context, choices) = self.surface(state, WizardContext::default())?;
        Ok(Pending {
            state,
            context,
            choices,
        })
    }

    pub fn apply(&self, pending: Pending, answer: Answer) -> Result<StepResult> {
        let Pending { state, context, .. } = pending;

        let next = transition(state, &answer, &context)?;
        let context = context.record(&answer);
        info!(%state, answer = answer.name(), "applying answer");
        self.perform(&answer, &context)?;

        match next {
            None => Ok(StepResult::Finished(Receipt {
                submitted: answer == Answer::Generate(true),
                context,
            })),
            Some(state) => {
                let (context, choices) = self.surface(state, context)?;
                debug!(%state, ?choices, "next step");
                Ok(StepResult::Pending(Pending {
                    state,
                    context,
                    choices,
                }))
            }
        }
    }

    /// Apply an answer to the page. `context` already includes it.
    fn perform(&self, answer: &Answer, context: &WizardContext) -> Result<()> {
        let page = self.page;
        match answer {
            Answer::Business(name) => {
                click_and_await_navigation(page, &business_button(name))?;
                click_and_await_navigation(page, GENERATE_RECEIPTS)?;
            }
            Answer::SalePoint(value) => self.choose(SALE_POINT, value)?,
            Answer::ReceiptType(value) => {
                self.choose(RECEIPT_TYPE, value)?;
                click_and_await_navigation(page, CONTINUE)?;
            }
            Answer::IssueDate(date) => self.set_date(ISSUE_DATE, date)?,
            Answer::ContentType(kind) => {
                self.choose(CONTENT_TYPE, kind)?;
                if kind == GOODS_ONLY {
                    self.continue_to_receiver()?;
                }
            }
            Answer::BilledFrom(date) => self.set_date(BILLED_FROM, date)?,
            Answer::BilledTo(date) => self.set_date(BILLED_TO, date)?,
            Answer::DueDate(date) => {
                self.set_date(DUE_DATE, date)?;
                self.continue_to_receiver()?;
            }
            Answer::IvaCondition(value) => self.choose(IVA_CONDITION, value)?,
            Answer::Document { kind, number } => {
                self.choose(DOCUMENT_TYPE, kind)?;
                set_field_value(page, DOCUMENT_NUMBER, number)?;
                // Leaving the number field makes the site look the receiver
                // up; the legal name is filled in when that request returns.
                wait_for_selector(page, LEGAL_NAME)?;
                page.click_and_wait_for_response(LEGAL_NAME, RECEIVER_LOOKUP)?;
                settle(page);
            }
            Answer::CommercialAddress(address) => match address {
                Address::Existing(value) => self.choose(ADDRESS_COMBO, value)?,
                Address::Other(text) => set_field_value(page, ADDRESS_TEXT, text)?,
                Address::Omitted => {}
            },
            Answer::PaymentMethods(ids) => {
                for id in ids {
                    page.check(id)?;
                }
                click_and_await_navigation(page, CONTINUE)?;
            }
            Answer::LineItem(item) => {
                let n = context.line_items.len();
                if n > 1 {
                    wait_for_selector(page, ADD_LINE)?;
                    page.click(ADD_LINE)?;
                }
                set_field_value(page, &line_description(n), &item.description)?;
                set_field_value(page, &line_quantity(n), &item.quantity)?;
                set_field_value(page, &line_price(n), &item.unit_price)?;
            }
            Answer::NoMoreItems | Answer::Generate(false) => {}
            Answer::Generate(true) => self.generate()?,
        }
        Ok(())
    }

    /// Read what the page offers for `state`.
    fn surface(
        &self,
        state: WizardState,
        context: WizardContext,
    ) -> Result<(WizardContext, Choices)> {
        use WizardState::*;

        let page = self.page;
        let options = |selector| read_select_options(page, selector, OptionsWait::NonEmpty);

        let choices = match state {
            CompanySelection => {
                wait_for_selector(page, BUSINESS_BUTTONS)?;
                let businesses = page.input_values(BUSINESS_BUTTONS)?;
                Choices::Options(businesses.into_iter().map(SelectOption::plain).collect())
            }
            SalePointSelection => Choices::Options(options(SALE_POINT)?),
            ReceiptTypeSelection => Choices::Options(options(RECEIPT_TYPE)?),
            IssueDateEntry => Choices::Date(read_date_field_constraints(page, ISSUE_DATE)?),
            ContentTypeSelection => Choices::Options(options(CONTENT_TYPE)?),
            BilledPeriodFromEntry => Choices::Date(read_date_field_constraints(page, BILLED_FROM)?),
            BilledPeriodToEntry => Choices::Date(read_date_field_constraints(page, BILLED_TO)?),
            PaymentDueDateEntry => Choices::Date(read_date_field_constraints(page, DUE_DATE)?),
            IvaConditionSelection => Choices::Options(options(IVA_CONDITION)?),
            DocumentTypeSelection => Choices::Options(options(DOCUMENT_TYPE)?),
            CommercialAddressSelection => {
                let legal_name = read_field_value(page, LEGAL_NAME)?;
                let addresses = read_select_options(page, ADDRESS_COMBO, OptionsWait::Immediate)?;
                let context = context.with_legal_name(legal_name.clone());
                return Ok((
                    context,
                    Choices::Counterparty {
                        legal_name,
                        addresses,
                    },
                ));
            }
            PaymentMethodSelection => {
                Choices::PaymentMethods(read_checkbox_options(page, PAYMENT_METHODS)?)
            }
            LineItemEntry => {
                let total = if context.line_items.is_empty() {
                    None
                } else {
                    Some(read_field_value(page, TOTAL)?)
                };
                let number = context.line_items.len() + 1;
                let context = context.with_total(total.clone());
                return Ok((context, Choices::LineItem { number, total }));
            }
            ReceiptGeneration => Choices::Confirmation {
                total: context.total.clone().unwrap_or_default(),
            },
        };
        Ok((context, choices))
    }

    fn choose(&self, selector: &str, value: &str) -> Result<()> {
        wait_for_selector(self.page, selector)?;
        self.page.select(selector, value)
    }

    fn set_date(&self, selector: &str, date: &str) -> Result<()> {
        wait_for_selector(self.page, selector)?;
        self.page.set_value(selector, date)
    }

    /// Leave the receipt data screen for the receiver data screen.
    fn continue_to_receiver(&self) -> Result<()> {
        settle(self.page);
        click_and_await_navigation(self.page, CONTINUE)
    }

    fn generate(&self) -> Result<()> {
        let page = self.page;
        click_and_await_navigation(page, CONTINUE)?;

        if !page.exists(GENERATE)? {
            return Err(FacturaError::unexpected(
                "the confirmation screen has no \"generate\" button",
            ));
        }
        page.accept_dialogs()?;
        click_and_await_navigation(page, GENERATE)?;

        wait_until_displayed(page, RECEIPT_BUTTONS)?;
        wait_for_selector(page, PRINT)?;
        page.click(PRINT)?;
        info!("receipt generated");
        Ok(())
    }
}
