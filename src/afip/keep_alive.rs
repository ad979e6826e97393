//! Periodic pings that keep a portal session from expiring.
//!
//! The ping is a `fetch` issued from inside the page so it carries the
//! session cookies. Each [`KeepAlive`] owns its task; dropping it cancels
//! the task.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::afip::selectors::{PORTAL_KEEP_ALIVE_URL, receipts_keep_alive_url};
use crate::error::{FacturaError, Result};
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveTarget {
    /// The fiscal-key portal, right after login.
    Portal,
    /// The receipts application. Each ping gets a fresh cache buster.
    Receipts,
}

impl KeepAliveTarget {
    pub fn url(&self) -> String {
        match self {
            KeepAliveTarget::Portal => PORTAL_KEEP_ALIVE_URL.to_string(),
            KeepAliveTarget::Receipts => receipts_keep_alive_url(),
        }
    }
}

pub struct KeepAlive {
    target: KeepAliveTarget,
    task: JoinHandle<()>,
}

impl KeepAlive {
    /// Start pinging every `period`, first ping one period from now.
    /// Must be called from within a tokio runtime (blocking threads count).
    pub fn spawn(page: Arc<dyn Page>, target: KeepAliveTarget, period: Duration) -> Result<Self> {
        let handle =
            Handle::try_current().map_err(|e| FacturaError::browser("start keep-alive", e))?;

        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let page = Arc::clone(&page);
                let script = format!("fetch({}); true", Value::String(target.url()));
                match tokio::task::spawn_blocking(move || page.evaluate(&script)).await {
                    Ok(Ok(_)) => debug!(?target, "keep-alive ping"),
                    Ok(Err(e)) => warn!(?target, "keep-alive ping failed: {e}"),
                    Err(e) => warn!(?target, "keep-alive task failed: {e}"),
                }
            }
        });

        debug!(?target, ?period, "keep-alive started");
        Ok(Self { target, task })
    }

    pub fn target(&self) -> KeepAliveTarget {
        self.target
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.task.abort();
        debug!(target = ?self.target, "keep-alive stopped");
    }
}
