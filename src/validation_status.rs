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

//! Implements validation status for specific parts of a manifest.
//!
//! The constants here are the status codes attached to validation log
//! items and reported in [`crate::VerificationResult::failure_reasons`].

use serde::{Deserialize, Serialize};

use crate::status_tracker::{LogItem, StatusTracker};

// -- success codes --

/// The claim signature referenced in the claim validated.
pub const CLAIM_SIGNATURE_VALIDATED: &str = "claimSignature.validated";

/// The signing credential is listed on the validator's trust list.
pub const SIGNING_CREDENTIAL_TRUSTED: &str = "signingCredential.trusted";

/// The time stamp was valid and matched the signature.
pub const TIMESTAMP_VALIDATED: &str = "timeStamp.validated";

/// The hash of the the referenced assertion in the manifest matched.
pub const ASSERTION_HASHEDURI_MATCH: &str = "assertion.hashedURI.match";

/// Hash of a byte segment in the asset matched the hard binding.
pub const ASSERTION_DATAHASH_MATCH: &str = "assertion.dataHash.match";

// -- failure codes --

/// The referenced claim in the manifest could not be found.
pub const CLAIM_MISSING: &str = "claim.missing";

/// The cryptographic signature on the claim failed to validate.
pub const CLAIM_SIGNATURE_MISMATCH: &str = "claimSignature.mismatch";

/// The signing credential is not listed on the validator's trust list.
pub const SIGNING_CREDENTIAL_UNTRUSTED: &str = "signingCredential.untrusted";

/// The signing credential was expired at time of signing.
pub const SIGNING_CREDENTIAL_EXPIRED: &str = "signingCredential.expired";

/// The signing credential is not suitable for signing claims.
pub const SIGNING_CREDENTIAL_INVALID: &str = "signingCredential.invalid";

/// The time stamp does not correspond to the contents of the claim.
pub const TIMESTAMP_MISMATCH: &str = "timeStamp.mismatch";

/// The time stamp is outside the validity window of the credential.
pub const TIMESTAMP_OUTSIDE_VALIDITY: &str = "timeStamp.outsideValidity";

/// The hash of the referenced assertion does not match the manifest.
pub const ASSERTION_HASHEDURI_MISMATCH: &str = "assertion.hashedURI.mismatch";

/// An assertion listed in the claim could not be found in the manifest.
pub const ASSERTION_MISSING: &str = "assertion.missing";

/// The hash of a byte segment in the asset does not match the hard binding.
pub const ASSERTION_DATAHASH_MISMATCH: &str = "assertion.dataHash.mismatch";

/// A catch-all for unhandled errors during validation.
pub const GENERAL_ERROR: &str = "general.error";

/// A `ValidationStatus` reports a validation finding for one addressable
/// part of the manifest store.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationStatus {
    code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl ValidationStatus {
    pub fn new<S: Into<String>>(code: S) -> Self {
        Self {
            code: code.into(),
            url: None,
            explanation: None,
        }
    }

    /// Returns the status code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the JUMBF URI of the part this status applies to, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Returns a human-readable explanation, if any.
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn set_url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn set_explanation<S: Into<String>>(mut self, explanation: S) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// Returns `true` if this is a success status code.
    pub fn passed(&self) -> bool {
        is_success(&self.code)
    }

    /// Creates a status from a validation log item, if the item carries
    /// a status code.
    pub fn from_log_item(item: &LogItem) -> Option<Self> {
        item.validation_status.as_ref().map(|code| {
            let status = Self::new(code.to_string()).set_url(item.label.to_string());
            match item.error_str.as_ref() {
                Some(e) => status.set_explanation(e.to_string()),
                None => status.set_explanation(item.description.to_string()),
            }
        })
    }
}

/// Returns `true` if the status code is defined as a success.
pub fn is_success(code: &str) -> bool {
    matches!(
        code,
        CLAIM_SIGNATURE_VALIDATED
            | SIGNING_CREDENTIAL_TRUSTED
            | TIMESTAMP_VALIDATED
            | ASSERTION_HASHEDURI_MATCH
            | ASSERTION_DATAHASH_MATCH
    )
}

/// Collects the failure statuses from a status tracker.
pub fn status_for_store(tracker: &impl StatusTracker) -> Vec<ValidationStatus> {
    tracker
        .get_log()
        .iter()
        .filter_map(ValidationStatus::from_log_item)
        .filter(|s| !s.passed())
        .collect()
}
