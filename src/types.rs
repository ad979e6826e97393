use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FacturaError, Result};

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").expect("static regex"));

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+([.,][0-9]+)?$").expect("static regex"));

/// One entry of a `<select>` control or a checkbox group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Options whose value doubles as the label (e.g. button captions).
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Default value and selectable days of a calendar-backed date input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateField {
    pub default_value: String,
    pub valid_dates: Vec<String>,
}

impl DateField {
    /// Check a raw answer. Empty input falls back to the default value.
    pub fn validate(&self, input: &str) -> Result<String> {
        let input = input.trim();
        let date = if input.is_empty() {
            self.default_value.as_str()
        } else {
            input
        };

        if !DATE_FORMAT.is_match(date) {
            return Err(FacturaError::validation(
                "Formato de fecha inválido. Debe estar en el formato DD/MM/AAAA",
            ));
        }

        if !self.valid_dates.iter().any(|d| d == date) {
            return Err(FacturaError::validation(format!(
                "Fecha inválida. Las fechas posibles son {}",
                self.valid_dates.join(", ")
            )));
        }

        Ok(date.to_string())
    }
}

/// A single product or service line of the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
}

impl LineItem {
    pub fn new(description: &str, quantity: &str, unit_price: &str) -> Result<Self> {
        Ok(Self {
            description: description.trim().to_string(),
            quantity: decimal("Cantidad", quantity)?,
            unit_price: decimal("Precio", unit_price)?,
        })
    }
}

/// A non-negative decimal with `,` or `.` as separator, trimmed.
pub fn decimal(field: &str, raw: &str) -> Result<String> {
    let raw = raw.trim();
    if DECIMAL.is_match(raw) {
        Ok(raw.to_string())
    } else {
        Err(FacturaError::validation(format!(
            "{field} inválido: \"{raw}\". Ingrese un número"
        )))
    }
}

/// Login credentials. The secret is never printed.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}
