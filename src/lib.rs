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

#![deny(warnings)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]

//! This library reads, verifies, creates and embeds C2PA manifests in
//! JPEG, PNG and ISO BMFF assets.
//!
//! Verification walks the embedded manifest store and reports every
//! finding instead of stopping at the first failure; see [`verify`].
//! Signing builds a manifest from a [`ManifestDefinition`], binds it to
//! the asset bytes and signs it with a [`SigningIdentity`]; see
//! [`sign`] and [`create_signer`].

/// The internal name of this SDK.
pub const NAME: &str = "c2pa-engine";

/// The version of this SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public modules
pub mod asset_io;
pub mod create_signer;
pub mod status_tracker;
pub mod trust_handler;
pub mod validation_status;

// Public exports
pub use assertions::{c2pa_action, Action, Actions, DataHash, SoftwareAgent, Thumbnail};
pub use builder::{sign, AssertionDefinition, ManifestDefinition, SignOptions};
pub use create_signer::{CertSubject, SigningIdentity};
pub use error::{Error, Result};
pub use reader::{
    verify, ManifestSummary, SignatureInfo, ValidationState, VerificationResult, VerifyOptions,
};
pub use signer::Signer;
pub use signing_alg::{SigningAlg, UnknownAlgorithmError};
pub use time_stamp::DEFAULT_TSA_URL;
pub use utils::hash_utils::{hash_stream_by_alg, HashRange};
pub use utils::mime::format_from_path;

// Internal modules
pub(crate) mod assertion;
pub(crate) mod assertions;
pub(crate) mod asset_handlers;
pub(crate) mod builder;
pub(crate) mod claim;
pub(crate) mod cose_sign;
pub(crate) mod cose_validator;
pub(crate) mod error;
pub(crate) mod hashed_uri;
pub(crate) mod jumbf;
pub(crate) mod jumbf_io;
pub(crate) mod reader;
pub(crate) mod signer;
pub(crate) mod signing_alg;
pub(crate) mod store;
pub(crate) mod time_stamp;
pub(crate) mod utils;
