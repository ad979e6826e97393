//! Interactive "Factura C" generation on the AFIP online receipts site.
//!
//! The flow logs into the fiscal-key portal, opens the online receipts
//! application and walks its receipt wizard, asking the user for every
//! answer on the console.

pub mod afip;
pub mod chrome;
pub mod config;
pub mod driver;
pub mod error;
pub mod page;
pub mod primitives;
pub mod prompt;
pub mod types;

pub use config::{ConfigStore, Settings};
pub use driver::{Orchestrator, factura};
pub use error::{FacturaError, Result};
pub use page::{Browser, BrowsingContext, Page, ResponseFilter, WaitPolicy};
pub use prompt::{ConsolePrompter, Notice, Prompter};
pub use types::{Credentials, DateField, LineItem, SelectOption};
