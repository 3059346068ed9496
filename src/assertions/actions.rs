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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_cbor::Value;

use crate::{
    assertion::{Assertion, AssertionBase, AssertionCbor},
    assertions::labels,
    error::{Error, Result},
};

/// Specification defined C2PA actions
pub mod c2pa_action {
    /// Direct capture of an asset.
    pub const CREATED: &str = "c2pa.created";

    /// Changes to tone, saturation, etc.
    pub const COLOR_ADJUSTMENTS: &str = "c2pa.color_adjustments";

    /// The format of the asset was changed.
    pub const CONVERTED: &str = "c2pa.converted";

    /// Areas of the asset's "editorial" content were cropped out.
    pub const CROPPED: &str = "c2pa.cropped";

    /// Generalized actions that would be considered editorial
    /// transformations of the content.
    pub const EDITED: &str = "c2pa.edited";

    /// Changes using filters, such as blur or sharpening.
    pub const FILTERED: &str = "c2pa.filtered";

    /// The asset was opened from a pre-existing file.
    pub const OPENED: &str = "c2pa.opened";

    /// Asset is comprised of one or more assets.
    pub const PLACED: &str = "c2pa.placed";

    /// Changes to the direction and position of content.
    pub const ORIENTATION: &str = "c2pa.orientation";

    /// Changes to the dimensions of the asset.
    pub const RESIZED: &str = "c2pa.resized";
}

/// The software agent that performed an action, either a plain name
/// string or a structured record with a version.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum SoftwareAgent {
    String(String),
    Structured {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

impl From<&str> for SoftwareAgent {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

/// Defines a single action taken on an asset.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Action {
    /// The label associated with this action. See ([`c2pa_action`]).
    action: String,

    /// Timestamp of when the action occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    when: Option<String>,

    /// The software agent that performed the action.
    #[serde(rename = "softwareAgent", skip_serializing_if = "Option::is_none")]
    software_agent: Option<SoftwareAgent>,

    /// Additional parameters of the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<HashMap<String, Value>>,
}

impl Action {
    pub fn new(label: &str) -> Self {
        Self {
            action: label.to_owned(),
            ..Default::default()
        }
    }

    /// The label for this action.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn when(&self) -> Option<&str> {
        self.when.as_deref()
    }

    pub fn software_agent(&self) -> Option<&SoftwareAgent> {
        self.software_agent.as_ref()
    }

    pub fn parameters(&self) -> Option<&HashMap<String, Value>> {
        self.parameters.as_ref()
    }

    pub fn set_when<S: Into<String>>(mut self, when: S) -> Self {
        self.when = Some(when.into());
        self
    }

    pub fn set_software_agent<S: Into<SoftwareAgent>>(mut self, agent: S) -> Self {
        self.software_agent = Some(agent.into());
        self
    }

    pub fn set_parameter<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// An assertion containing a list of [`Action`]s describing what
/// happened to the asset.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Actions {
    /// A list of [`Action`]s.
    pub actions: Vec<Action>,

    /// Additional information about the assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl Actions {
    /// Label prefix for an [`Actions`] assertion.
    pub const LABEL: &'static str = labels::ACTIONS;

    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            metadata: None,
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn add_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// An actions assertion must contain at least one action and every
    /// action must carry a label.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.actions.is_empty() {
            return Err(Error::AssertionInvalid(
                "actions assertion has no actions".to_string(),
            ));
        }
        for action in &self.actions {
            if action.action.is_empty() {
                return Err(Error::AssertionInvalid(
                    "action without an action label".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl AssertionCbor for Actions {}

impl AssertionBase for Actions {
    const LABEL: &'static str = labels::ACTIONS;

    fn to_assertion(&self) -> Result<Assertion> {
        self.validate()?;
        self.to_cbor_assertion()
    }

    fn from_assertion(assertion: &Assertion) -> Result<Self> {
        Self::from_cbor_assertion(assertion)
    }
}
