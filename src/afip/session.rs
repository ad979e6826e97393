//! Login to the AFIP portal.
//!
//! Login happens in two checkpoints, identifier then password, and the
//! portal can reject either one with an inline message. The types make the
//! order explicit: [`LoginForm`] → [`PasswordForm`] → [`AuthenticatedSession`].
//! Each login runs in its own isolated browsing context, and that context is
//! closed on every exit path.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::afip::keep_alive::{KeepAlive, KeepAliveTarget};
use crate::afip::portal;
use crate::afip::selectors::{LOGIN_ERROR, LOGIN_URL, PASSWORD, SUBMIT, USERNAME};
use crate::error::{FacturaError, Result};
use crate::page::{Browser, BrowsingContext, Page};
use crate::primitives::{click_and_await_navigation, set_field_value};
use crate::types::Credentials;

/// Closes the wrapped context when dropped.
struct ContextGuard(Option<Box<dyn BrowsingContext>>);

impl ContextGuard {
    fn close(mut self) -> Result<()> {
        match self.0.take() {
            Some(context) => context.close(),
            None => Ok(()),
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(context) = self.0.take() {
            if let Err(e) = context.close() {
                warn!("failed to close browsing context: {e}");
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    keep_alive_interval: Duration,
}

impl Authenticator {
    pub fn new(keep_alive_interval: Duration) -> Self {
        Self {
            keep_alive_interval,
        }
    }

    /// Open a private context on the login page.
    pub fn open(&self, browser: &dyn Browser) -> Result<LoginForm> {
        let context = ContextGuard(Some(browser.new_isolated_context()?));
        let page = context
            .0
            .as_ref()
            .map(|c| c.page())
            .ok_or_else(|| FacturaError::unexpected("browsing context vanished"))?;

        page.navigate(LOGIN_URL)?;

        Ok(LoginForm {
            context,
            page,
            keep_alive_interval: self.keep_alive_interval,
        })
    }

    pub fn login(&self, browser: &dyn Browser, credentials: &Credentials) -> Result<AuthenticatedSession> {
        self.open(browser)?
            .submit_identifier(&credentials.identifier)?
            .submit_secret(&credentials.secret)
    }
}

/// The inline error the portal shows under the form, if any.
fn inline_error(page: &dyn Page) -> Result<Option<String>> {
    Ok(page
        .inner_text(LOGIN_ERROR)?
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty()))
}

pub struct LoginForm {
    context: ContextGuard,
    page: Arc<dyn Page>,
    keep_alive_interval: Duration,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("keep_alive_interval", &self.keep_alive_interval)
            .finish_non_exhaustive()
    }
}

impl LoginForm {
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Submit the CUIT. On rejection the context is closed before the
    /// error is returned.
    pub fn submit_identifier(self, identifier: &str) -> Result<PasswordForm> {
        set_field_value(self.page.as_ref(), USERNAME, identifier)?;
        click_and_await_navigation(self.page.as_ref(), SUBMIT)?;

        if let Some(message) = inline_error(self.page.as_ref())? {
            warn!(%message, "identifier rejected");
            if let Err(e) = self.context.close() {
                warn!("failed to close browsing context: {e}");
            }
            return Err(FacturaError::Authentication { message });
        }

        info!("identifier accepted");
        Ok(PasswordForm {
            context: self.context,
            page: self.page,
            keep_alive_interval: self.keep_alive_interval,
        })
    }
}

pub struct PasswordForm {
    context: ContextGuard,
    page: Arc<dyn Page>,
    keep_alive_interval: Duration,
}

impl fmt::Debug for PasswordForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordForm")
            .field("keep_alive_interval", &self.keep_alive_interval)
            .finish_non_exhaustive()
    }
}

impl PasswordForm {
    pub fn submit_secret(self, secret: &str) -> Result<AuthenticatedSession> {
        set_field_value(self.page.as_ref(), PASSWORD, secret)?;
        click_and_await_navigation(self.page.as_ref(), SUBMIT)?;

        if let Some(message) = inline_error(self.page.as_ref())? {
            warn!(%message, "password rejected");
            if let Err(e) = self.context.close() {
                warn!("failed to close browsing context: {e}");
            }
            return Err(FacturaError::Authentication { message });
        }

        let keep_alive = KeepAlive::spawn(
            Arc::clone(&self.page),
            KeepAliveTarget::Portal,
            self.keep_alive_interval,
        )?;

        info!("logged in");
        Ok(AuthenticatedSession {
            keep_alives: vec![keep_alive],
            page: self.page,
            context: self.context,
            keep_alive_interval: self.keep_alive_interval,
        })
    }
}

/// A logged-in browsing context. Dropping it stops the keep-alive pings
/// and closes the context; [`AuthenticatedSession::close`] does the same
/// but reports failures.
pub struct AuthenticatedSession {
    // Declared before `context` so the pings stop before the pages close.
    keep_alives: Vec<KeepAlive>,
    page: Arc<dyn Page>,
    context: ContextGuard,
    keep_alive_interval: Duration,
}

impl fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("keep_alives", &self.keep_alive_targets())
            .field("keep_alive_interval", &self.keep_alive_interval)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedSession {
    pub fn page(&self) -> Arc<dyn Page> {
        Arc::clone(&self.page)
    }

    pub fn keep_alive_targets(&self) -> Vec<KeepAliveTarget> {
        self.keep_alives.iter().map(KeepAlive::target).collect()
    }

    /// Navigate the portal to the online receipts application and keep
    /// that window alive too.
    pub fn open_receipts_page(&mut self) -> Result<Arc<dyn Page>> {
        let receipts = portal::open_receipts_page(self.page.as_ref())?;
        self.keep_alives.push(KeepAlive::spawn(
            Arc::clone(&receipts),
            KeepAliveTarget::Receipts,
            self.keep_alive_interval,
        )?);
        Ok(receipts)
    }

    pub fn close(self) -> Result<()> {
        let AuthenticatedSession {
            keep_alives,
            context,
            ..
        } = self;
        drop(keep_alives);
        context.close()?;
        info!("session closed");
        Ok(())
    }
}
