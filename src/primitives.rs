//! Step transition primitives shared by every wizard step.
//!
//! Each helper waits for its target before acting. A wait that runs out of
//! budget surfaces as [`FacturaError::NavigationTimeout`]; nothing here
//! retries.

use std::time::Instant;

use tracing::{debug, trace};

use crate::error::{FacturaError, Result};
use crate::page::{Page, WaitPolicy};
use crate::types::{DateField, SelectOption};

/// Calendar day cells that can be picked (not headers, not week numbers,
/// not disabled days).
pub const VALID_DAYS_SELECTOR: &str = ".calendar td:not(.name):not(.wn).day.false";

/// How [`read_select_options`] decides the options are ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionsWait {
    /// Block until at least one non-placeholder option exists. The site
    /// fills most selects from background requests.
    NonEmpty,
    /// Read whatever is there, possibly nothing.
    Immediate,
}

/// Poll `probe` until it yields `Some`, or fail with a navigation timeout
/// naming `what`.
pub fn poll_until<T>(
    policy: WaitPolicy,
    what: &str,
    mut probe: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let started = Instant::now();
    loop {
        if let Some(found) = probe()? {
            return Ok(found);
        }
        if started.elapsed() >= policy.timeout {
            return Err(FacturaError::NavigationTimeout {
                waiting_for: what.to_string(),
                timeout: policy.timeout,
            });
        }
        std::thread::sleep(policy.interval);
    }
}

fn until_true(page: &dyn Page, what: &str, mut probe: impl FnMut() -> Result<bool>) -> Result<()> {
    poll_until(page.wait_policy(), what, || Ok(probe()?.then_some(())))
}

pub fn wait_for_selector(page: &dyn Page, selector: &str) -> Result<()> {
    trace!(selector, "waiting for selector");
    until_true(page, selector, || page.exists(selector))
}

pub fn wait_for_xpath(page: &dyn Page, xpath: &str) -> Result<()> {
    trace!(xpath, "waiting for xpath");
    until_true(page, xpath, || page.exists_xpath(xpath))
}

pub fn wait_until_displayed(page: &dyn Page, selector: &str) -> Result<()> {
    until_true(page, &format!("{selector} to be displayed"), || {
        page.is_displayed(selector)
    })
}

/// Give the page's own scripts time to catch up.
pub fn settle(page: &dyn Page) {
    let pause = page.wait_policy().settle;
    if !pause.is_zero() {
        std::thread::sleep(pause);
    }
}

pub fn read_field_value(page: &dyn Page, selector: &str) -> Result<String> {
    wait_for_selector(page, selector)?;
    page.value(selector)
}

/// Overwrite the field's content with `value`. Never appends.
pub fn set_field_value(page: &dyn Page, selector: &str, value: &str) -> Result<()> {
    wait_for_selector(page, selector)?;
    page.set_value(selector, "")?;
    page.type_text(selector, value)
}

/// Click and resolve once the site's redirect chain has gone quiet.
pub fn click_and_await_navigation(page: &dyn Page, selector: &str) -> Result<()> {
    wait_for_selector(page, selector)?;
    debug!(selector, "click and wait for navigation");
    page.click_and_wait_for_navigation(selector)
}

/// Ordered options of a `<select>`, blank placeholder excluded.
pub fn read_select_options(
    page: &dyn Page,
    selector: &str,
    wait: OptionsWait,
) -> Result<Vec<SelectOption>> {
    let real = |options: Vec<SelectOption>| -> Vec<SelectOption> {
        options.into_iter().filter(|o| !o.value.is_empty()).collect()
    };

    match wait {
        OptionsWait::NonEmpty => poll_until(
            page.wait_policy(),
            &format!("options of {selector}"),
            || {
                if !page.exists(selector)? {
                    return Ok(None);
                }
                let options = real(page.options(selector)?);
                Ok((!options.is_empty()).then_some(options))
            },
        ),
        OptionsWait::Immediate => {
            wait_for_selector(page, selector)?;
            Ok(real(page.options(selector)?))
        }
    }
}

/// Checkbox ids with their label text.
pub fn read_checkbox_options(page: &dyn Page, selector: &str) -> Result<Vec<SelectOption>> {
    wait_for_selector(page, selector)?;
    page.checkboxes(selector)
}

/// Default value and selectable days of a calendar-backed date input.
///
/// Opens the calendar to make the site populate its day cells, reads them,
/// then clicks the input again to close it.
pub fn read_date_field_constraints(page: &dyn Page, selector: &str) -> Result<DateField> {
    wait_for_selector(page, selector)?;
    page.open_calendar(selector)?;

    let valid_dates = poll_until(
        page.wait_policy(),
        &format!("calendar days of {selector}"),
        || {
            let days = page.calendar_days()?;
            Ok((days.len() > 1).then_some(days))
        },
    )?;
    let default_value = page.value(selector)?;

    page.click(selector)?;

    debug!(selector, %default_value, days = valid_dates.len(), "read date constraints");
    Ok(DateField {
        default_value,
        valid_dates,
    })
}
