// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Log item and status tracker support for collecting validation
//! findings. Integrity and trust problems do not abort validation;
//! they are logged here and mapped to status codes afterward.

use std::fmt;

use crate::error::{Error, Result};

/// One validation finding tied to an addressable part of the store.
#[derive(Clone)]
pub struct LogItem {
    /// JUMBF URI or label of the item the finding applies to.
    pub label: String,

    /// Description of the finding.
    pub description: String,

    /// File and function that logged the finding.
    pub origin: String,

    /// Validation status code, when the finding maps to one.
    pub validation_status: Option<String>,

    /// Error string for findings that carry an error.
    pub error_str: Option<String>,
}

impl LogItem {
    pub fn new(label: &str, description: &str, origin: &str) -> Self {
        LogItem {
            label: label.to_string(),
            description: description.to_string(),
            origin: origin.to_string(),
            validation_status: None,
            error_str: None,
        }
    }

    /// Attaches an error to this log item.
    pub fn error(mut self, err: Error) -> Self {
        self.error_str = Some(format!("{err:?}"));
        self
    }

    /// Attaches a validation status code to this log item.
    pub fn validation_status(mut self, status: &str) -> Self {
        self.validation_status = Some(status.to_string());
        self
    }

    /// Returns `true` if this item carries an error.
    pub fn is_error(&self) -> bool {
        self.error_str.is_some()
    }
}

impl fmt::Debug for LogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogItem")
            .field("label", &self.label)
            .field("description", &self.description)
            .field("status", &self.validation_status)
            .field("error", &self.error_str)
            .finish()
    }
}

/// A `StatusTracker` receives validation log items as validation runs.
pub trait StatusTracker {
    /// Returns the items logged so far.
    fn get_log(&self) -> &Vec<LogItem>;

    /// Logs an item that carries an error. Implementations decide
    /// whether the error stops processing (returned as `Err`) or is
    /// recorded and swallowed.
    fn log(&mut self, log_item: LogItem, err: Option<Error>) -> Result<()>;

    /// Logs an informational item.
    fn log_silent(&mut self, log_item: LogItem);
}

/// Collects all log items and never halts on errors. Used for
/// verification, where every finding must be reported.
#[derive(Default, Debug)]
pub struct DetailedStatusTracker {
    logged_items: Vec<LogItem>,
}

impl DetailedStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the error-carrying items, leaving the log intact.
    pub fn take_errors(&mut self) -> Vec<LogItem> {
        self.logged_items
            .iter()
            .filter(|i| i.is_error())
            .cloned()
            .collect()
    }
}

impl StatusTracker for DetailedStatusTracker {
    fn get_log(&self) -> &Vec<LogItem> {
        &self.logged_items
    }

    fn log(&mut self, log_item: LogItem, _err: Option<Error>) -> Result<()> {
        self.logged_items.push(log_item);
        Ok(())
    }

    fn log_silent(&mut self, log_item: LogItem) {
        self.logged_items.push(log_item);
    }
}

/// Stops on the first error. Used for signing paths, where a bad store
/// must not be written.
#[derive(Default, Debug)]
pub struct OneShotStatusTracker {
    logged_items: Vec<LogItem>,
}

impl OneShotStatusTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusTracker for OneShotStatusTracker {
    fn get_log(&self) -> &Vec<LogItem> {
        &self.logged_items
    }

    fn log(&mut self, log_item: LogItem, err: Option<Error>) -> Result<()> {
        self.logged_items.push(log_item);
        match err {
            Some(e) => Err(e),
            None => Err(Error::OtherError("validation failure".to_string())),
        }
    }

    fn log_silent(&mut self, log_item: LogItem) {
        self.logged_items.push(log_item);
    }
}

/// Creates a [`LogItem`] tagged with the current file, line and
/// function.
#[macro_export]
macro_rules! log_item {
    ($label:expr, $description:expr, $function:expr) => {{
        $crate::status_tracker::LogItem::new(
            &$label.to_string(),
            $description,
            &format!("{}:{} {}", file!(), line!(), $function),
        )
    }};
}
