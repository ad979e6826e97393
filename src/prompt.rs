//! Console collaborator: questions to the user and status lines back.

use std::fmt;

use colored::Colorize;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};

use crate::error::Result;

/// A status line shown to the user between questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something settled without asking, e.g. the only available option.
    Checked { prefix: String, message: String },
    Error(String),
    Info(String),
    Title(String),
}

impl Notice {
    pub fn checked(prefix: impl Into<String>, message: impl Into<String>) -> Self {
        Notice::Checked {
            prefix: prefix.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Checked { prefix, message } => write!(f, "{prefix} {message}"),
            Notice::Error(msg) | Notice::Info(msg) | Notice::Title(msg) => f.write_str(msg),
        }
    }
}

pub trait Prompter: Send + Sync {
    /// Free text. With a default, empty input returns the default.
    fn input(&self, message: &str, default: Option<&str>) -> Result<String>;

    /// Masked input.
    fn password(&self, message: &str) -> Result<String>;

    /// Index of the chosen item.
    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize>;

    /// Indices of the checked items, possibly none.
    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>>;

    fn confirm(&self, message: &str) -> Result<bool>;

    fn notify(&self, notice: Notice);
}

/// Interactive terminal prompts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn input(&self, message: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(message).allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn password(&self, message: &str) -> Result<String> {
        Ok(Password::new().with_prompt(message).interact()?)
    }

    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize> {
        Ok(Select::new()
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact()?)
    }

    fn multi_select(&self, message: &str, items: &[String]) -> Result<Vec<usize>> {
        Ok(MultiSelect::new()
            .with_prompt(message)
            .items(items)
            .interact()?)
    }

    fn confirm(&self, message: &str) -> Result<bool> {
        Ok(Confirm::new().with_prompt(message).interact()?)
    }

    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Checked { prefix, message } => {
                println!("{} {} {}", "✔".green(), prefix.bold(), message.cyan())
            }
            Notice::Error(msg) => println!("{} {}", "⚠".red(), msg.bold()),
            Notice::Info(msg) => println!("{} {}", "ℹ".blue(), msg.bold()),
            Notice::Title(msg) => println!("{} {}", "●", msg.bold()),
        }
    }
}
