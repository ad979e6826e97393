//! AFIP-specific flows: login, portal navigation and the receipt wizard.

pub mod keep_alive;
pub mod portal;
pub mod selectors;
pub mod session;
pub mod wizard;

pub use keep_alive::{KeepAlive, KeepAliveTarget};
pub use session::{AuthenticatedSession, Authenticator, LoginForm, PasswordForm};
pub use wizard::{
    Address, Answer, Choices, Pending, Receipt, StepResult, Wizard, WizardContext, WizardState,
};
