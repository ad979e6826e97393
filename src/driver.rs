//! Walks the receipt wizard with the user.
//!
//! [`Orchestrator`] turns each pending wizard state into questions for the
//! [`Prompter`], re-asking on invalid input, and feeds the answer back to
//! the wizard. [`factura`] is the whole run: login, portal navigation, the
//! wizard, and cleanup.

use std::sync::Arc;

use tracing::{info, warn};

use crate::afip::wizard::ACCEPTED_RECEIPT_TYPE;
use crate::afip::{
    Address, Answer, AuthenticatedSession, Authenticator, Choices, Pending, Receipt, StepResult,
    Wizard, WizardState,
};
use crate::config::Settings;
use crate::error::{FacturaError, Result};
use crate::page::{Browser, Page};
use crate::prompt::{Notice, Prompter};
use crate::types::{DateField, LineItem, SelectOption, decimal};

const OTHER_ADDRESS: &str = "Otro...";

/// Question and single-option notice for a selection step.
fn selection_messages(state: WizardState) -> (&'static str, &'static str) {
    use WizardState::*;
    match state {
        CompanySelection => ("Seleccione empresa:", "Única empresa disponible:"),
        SalePointSelection => (
            "Seleccione punto de venta:",
            "Único punto de venta disponible:",
        ),
        ContentTypeSelection => (
            "Seleccione el concepto a incluir:",
            "Único concepto disponible:",
        ),
        IvaConditionSelection => (
            "Seleccione la condición frente al IVA:",
            "Única condición frente al IVA disponible:",
        ),
        DocumentTypeSelection => (
            "Seleccione el tipo de documento:",
            "Único tipo de documento disponible:",
        ),
        _ => ("Seleccione una opción:", "Única opción disponible:"),
    }
}

fn date_message(state: WizardState) -> &'static str {
    use WizardState::*;
    match state {
        IssueDateEntry => "Fecha del comprobante (en formato DD/MM/AAAA):",
        BilledPeriodFromEntry => "Período facturado desde (en formato DD/MM/AAAA):",
        BilledPeriodToEntry => "Período facturado hasta (en formato DD/MM/AAAA):",
        _ => "Vencimiento para el pago (en formato DD/MM/AAAA):",
    }
}

pub struct Orchestrator<'a> {
    prompter: &'a dyn Prompter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(prompter: &'a dyn Prompter) -> Self {
        Self { prompter }
    }

    /// Run the wizard on an open receipts application page until the user
    /// confirms or declines generation.
    pub fn run_wizard(&self, page: &dyn Page) -> Result<Receipt> {
        let wizard = Wizard::new(page);
        let mut pending = wizard.start()?;

        loop {
            let answer = self.answer(&pending)?;
            match wizard.apply(pending, answer)? {
                StepResult::Pending(next) => pending = next,
                StepResult::Finished(receipt) => return Ok(receipt),
            }
        }
    }

    fn answer(&self, pending: &Pending) -> Result<Answer> {
        use WizardState::*;

        let state = pending.state;
        let answer = match (state, &pending.choices) {
            (ReceiptTypeSelection, Choices::Options(options)) => {
                Answer::ReceiptType(self.accepted_receipt_type(options)?)
            }
            (_, Choices::Options(options)) => {
                let (message, one) = selection_messages(state);
                let value = self.choose_one(message, one, options)?;
                match state {
                    CompanySelection => Answer::Business(value),
                    SalePointSelection => Answer::SalePoint(value),
                    ContentTypeSelection => Answer::ContentType(value),
                    IvaConditionSelection => Answer::IvaCondition(value),
                    DocumentTypeSelection => {
                        let label = options
                            .iter()
                            .find(|o| o.value == value)
                            .map(|o| o.label.as_str())
                            .unwrap_or("documento");
                        let number = self.prompter.input(&format!("Número de {label}:"), None)?;
                        Answer::Document {
                            kind: value,
                            number: number.trim().to_string(),
                        }
                    }
                    _ => return Err(mismatch(pending)),
                }
            }
            (_, Choices::Date(field)) => {
                let date = self.ask_date(date_message(state), field)?;
                match state {
                    IssueDateEntry => Answer::IssueDate(date),
                    BilledPeriodFromEntry => Answer::BilledFrom(date),
                    BilledPeriodToEntry => Answer::BilledTo(date),
                    PaymentDueDateEntry => Answer::DueDate(date),
                    _ => return Err(mismatch(pending)),
                }
            }
            (CommercialAddressSelection, Choices::Counterparty {
                legal_name,
                addresses,
            }) => {
                self.prompter
                    .notify(Notice::checked("Razón social:", legal_name.as_str()));
                let address =
                    self.ask_address(addresses, pending.context.is_final_consumer())?;
                Answer::CommercialAddress(address)
            }
            (PaymentMethodSelection, Choices::PaymentMethods(options)) => {
                Answer::PaymentMethods(self.ask_payment_methods(options)?)
            }
            (LineItemEntry, Choices::LineItem { number, total }) => {
                if let Some(total) = total {
                    self.prompter
                        .notify(Notice::Info(format!("Importe total: {total}")));
                    if !self.prompter.confirm("¿Desea agregar otro producto?")? {
                        return Ok(Answer::NoMoreItems);
                    }
                }
                Answer::LineItem(self.ask_line_item(*number)?)
            }
            (ReceiptGeneration, Choices::Confirmation { total }) => Answer::Generate(
                self.prompter
                    .confirm(&format!("¿Desea generar la factura por ${total}?"))?,
            ),
            _ => return Err(mismatch(pending)),
        };
        Ok(answer)
    }

    /// Pick one option. A single option is taken without asking.
    fn choose_one(&self, message: &str, one: &str, options: &[SelectOption]) -> Result<String> {
        match options {
            [] => Err(FacturaError::unexpected(format!(
                "no options available for \"{message}\""
            ))),
            [only] => {
                self.prompter.notify(Notice::checked(one, only.label.as_str()));
                Ok(only.value.clone())
            }
            _ => {
                let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
                let index = self.prompter.select(message, &labels, 0)?;
                options
                    .get(index)
                    .map(|o| o.value.clone())
                    .ok_or_else(|| FacturaError::Prompt {
                        reason: format!("selection {index} out of range"),
                    })
            }
        }
    }

    fn accepted_receipt_type(&self, options: &[SelectOption]) -> Result<String> {
        let accepted = options
            .iter()
            .find(|o| o.label.contains(ACCEPTED_RECEIPT_TYPE))
            .ok_or_else(|| {
                FacturaError::unexpected(format!(
                    "receipt type \"{ACCEPTED_RECEIPT_TYPE}\" is not offered"
                ))
            })?;
        self.prompter.notify(Notice::checked(
            "Tipo de comprobante:",
            accepted.label.as_str(),
        ));
        Ok(accepted.value.clone())
    }

    /// Ask until `validate` accepts the input. Only validation errors are
    /// retried.
    fn ask_until_valid(
        &self,
        message: &str,
        default: Option<&str>,
        validate: impl Fn(&str) -> Result<String>,
    ) -> Result<String> {
        loop {
            let raw = self.prompter.input(message, default)?;
            match validate(&raw) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() => self.prompter.notify(Notice::Error(e.to_string())),
                Err(e) => return Err(e),
            }
        }
    }

    fn ask_date(&self, message: &str, field: &DateField) -> Result<String> {
        self.ask_until_valid(message, Some(&field.default_value), |raw| {
            field.validate(raw)
        })
    }

    fn ask_address(&self, addresses: &[SelectOption], final_consumer: bool) -> Result<Address> {
        if addresses.is_empty() {
            let wanted = !final_consumer
                || self
                    .prompter
                    .confirm("¿Quiere agregar el domicilio comercial?")?;
            if !wanted {
                return Ok(Address::Omitted);
            }
            return self.ask_other_address();
        }

        let mut labels: Vec<String> = addresses.iter().map(|a| a.label.clone()).collect();
        labels.push(OTHER_ADDRESS.to_string());
        let index = self
            .prompter
            .select("Seleccione el domicilio comercial:", &labels, 0)?;

        match addresses.get(index) {
            Some(address) => Ok(Address::Existing(address.value.clone())),
            None => self.ask_other_address(),
        }
    }

    fn ask_other_address(&self) -> Result<Address> {
        let text = self.prompter.input("Domicilio comercial:", None)?;
        let text = text.trim();
        Ok(if text.is_empty() {
            Address::Omitted
        } else {
            Address::Other(text.to_string())
        })
    }

    fn ask_payment_methods(&self, options: &[SelectOption]) -> Result<Vec<String>> {
        let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
        loop {
            let chosen = self.prompter.multi_select("Medios de pago:", &labels)?;
            let ids: Vec<String> = chosen
                .into_iter()
                .filter_map(|i| options.get(i).map(|o| o.value.clone()))
                .collect();
            if !ids.is_empty() {
                return Ok(ids);
            }
            self.prompter.notify(Notice::Error(
                "Seleccione al menos un medio de pago".to_string(),
            ));
        }
    }

    fn ask_line_item(&self, number: usize) -> Result<LineItem> {
        self.prompter.notify(Notice::Title(format!("Producto {number}")));
        let description = self
            .prompter
            .input("Descripción del producto/servicio:", None)?;
        let quantity = self.ask_until_valid("Cantidad:", None, |raw| decimal("Cantidad", raw))?;
        let price = self.ask_until_valid("Precio:", None, |raw| decimal("Precio", raw))?;
        LineItem::new(&description, &quantity, &price)
    }
}

fn mismatch(pending: &Pending) -> FacturaError {
    FacturaError::unexpected(format!(
        "state {} cannot offer {:?}",
        pending.state, pending.choices
    ))
}

/// Run a blocking closure on tokio's blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FacturaError::browser("run blocking task", e))?
}

/// The complete `factura` run.
///
/// The login page opens while the user types the CUIT. Whatever happens
/// after login, the session is closed before this returns.
pub async fn factura(
    browser: Arc<dyn Browser>,
    prompter: Arc<dyn Prompter>,
    settings: &Settings,
) -> Result<Receipt> {
    let authenticator = Authenticator::new(settings.keep_alive_interval);

    let open = {
        let browser = Arc::clone(&browser);
        blocking(move || authenticator.open(browser.as_ref()))
    };
    let ask_cuit = {
        let prompter = Arc::clone(&prompter);
        let default = settings.cuit.clone();
        blocking(move || prompter.input("Ingrese CUIT:", default.as_deref()))
    };
    let (form, cuit) = tokio::join!(open, ask_cuit);
    let form = form?;
    let cuit = cuit?;

    blocking(move || {
        let form = form.submit_identifier(cuit.trim())?;
        let password = prompter.password("Ingrese Contraseña:")?;
        let mut session = form.submit_secret(&password)?;

        let result = drive(&mut session, prompter.as_ref());
        match session.close() {
            Ok(()) => result,
            Err(e) if result.is_err() => {
                warn!("failed to close session: {e}");
                result
            }
            Err(e) => Err(e),
        }
    })
    .await
}

fn drive(session: &mut AuthenticatedSession, prompter: &dyn Prompter) -> Result<Receipt> {
    let receipts = session.open_receipts_page()?;
    let receipt = Orchestrator::new(prompter).run_wizard(receipts.as_ref())?;
    info!(submitted = receipt.submitted, "wizard finished");

    prompter.confirm("¿Terminar?")?;
    Ok(receipt)
}
