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

//! Assertion helpers to build, validate and parse assertions.

mod actions;
pub use actions::{c2pa_action, Action, Actions, SoftwareAgent};

mod data_hash;
pub use data_hash::DataHash;

pub mod labels;

use crate::{
    assertion::{Assertion, AssertionBase},
    error::Result,
};

/// A thumbnail assertion: image bytes stored under
/// `c2pa.thumbnail.claim.<format>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    pub content_type: String,
    pub data: Vec<u8>,
    label: String,
}

impl Thumbnail {
    pub fn new(format: &str, data: Vec<u8>) -> Self {
        // normalize "image/jpeg" to a label suffix of "jpeg"
        let suffix = format.rsplit('/').next().unwrap_or(format);
        Thumbnail {
            content_type: crate::utils::mime::format_to_mime(format),
            data,
            label: format!("{}.{}", labels::CLAIM_THUMBNAIL, suffix),
        }
    }
}

impl AssertionBase for Thumbnail {
    const LABEL: &'static str = labels::CLAIM_THUMBNAIL;

    fn to_assertion(&self) -> Result<Assertion> {
        Ok(Assertion::from_data_binary(
            &self.label,
            &self.content_type,
            &self.data,
        ))
    }

    fn from_assertion(assertion: &Assertion) -> Result<Self> {
        Ok(Thumbnail {
            content_type: assertion.content_type(),
            data: assertion.data(),
            label: assertion.label(),
        })
    }
}
