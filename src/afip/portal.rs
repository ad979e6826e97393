use std::sync::Arc;

use tracing::info;

use crate::afip::selectors::{MY_SERVICES_XPATH, ONLINE_RECEIPTS_XPATH, PORTAL_URL};
use crate::error::Result;
use crate::page::Page;
use crate::primitives::wait_for_xpath;

/// From a logged-in page, reach the online receipts application.
///
/// The portal opens the application in a new window; that window is
/// returned and the portal page is left as is.
pub fn open_receipts_page(page: &dyn Page) -> Result<Arc<dyn Page>> {
    page.navigate(PORTAL_URL)?;

    wait_for_xpath(page, MY_SERVICES_XPATH)?;
    page.click_xpath(MY_SERVICES_XPATH)?;

    wait_for_xpath(page, ONLINE_RECEIPTS_XPATH)?;
    let receipts = page.click_xpath_and_wait_for_popup(ONLINE_RECEIPTS_XPATH)?;

    info!("receipts application opened");
    Ok(receipts)
}
