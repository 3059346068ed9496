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

//! The top-level signing entry point: turn a manifest definition into
//! a signed manifest embedded in a new copy of the asset.

use crate::{
    assertion::{Assertion, AssertionBase},
    assertions::{Actions, Thumbnail},
    claim::Claim,
    create_signer::{self, SigningIdentity},
    error::{Error, Result},
    jumbf_io::resolve_handler,
    store::Store,
    utils::mime::format_to_mime,
};

const DEFAULT_RESERVE_SIZE: usize = 10240;

/// An assertion to include in a manifest under construction.
#[derive(Debug)]
pub enum AssertionDefinition {
    /// A `c2pa.actions` assertion.
    Actions(Actions),

    /// A claim thumbnail carrying preview image bytes.
    Thumbnail(Thumbnail),

    /// A custom JSON assertion under a caller-chosen label.
    Json {
        label: String,
        value: serde_json::Value,
    },

    /// A custom CBOR assertion under a caller-chosen label.
    Cbor { label: String, data: Vec<u8> },
}

/// What to put in the manifest. Everything is optional except the
/// assertions: a manifest must describe at least one action.
#[derive(Debug, Default)]
pub struct ManifestDefinition {
    /// Name/version of the application creating the manifest. Defaults
    /// to this library's own identity.
    pub claim_generator: Option<String>,

    /// Human readable title, e.g. the file name.
    pub title: Option<String>,

    /// MIME type of the asset; detected from the container when not
    /// given.
    pub format: Option<String>,

    pub assertions: Vec<AssertionDefinition>,
}

/// Signing controls.
#[derive(Debug)]
pub struct SignOptions {
    /// Bytes reserved for the COSE signature envelope.
    pub reserve_size: usize,

    /// RFC 3161 authority to time stamp the signature with.
    pub tsa_url: Option<String>,

    /// When set, failure to obtain a time stamp fails the signing
    /// operation instead of producing an unstamped manifest.
    pub timestamp_mandatory: bool,
}

impl Default for SignOptions {
    fn default() -> Self {
        SignOptions {
            reserve_size: DEFAULT_RESERVE_SIZE,
            tsa_url: None,
            timestamp_mandatory: false,
        }
    }
}

fn definition_to_assertion(def: &AssertionDefinition) -> Result<Assertion> {
    match def {
        AssertionDefinition::Actions(actions) => {
            actions.validate()?;
            actions.to_assertion()
        }
        AssertionDefinition::Thumbnail(thumbnail) => thumbnail.to_assertion(),
        AssertionDefinition::Json { label, value } => {
            if label.is_empty() {
                return Err(Error::AssertionInvalid(
                    "assertion label must not be empty".to_string(),
                ));
            }
            Assertion::from_data_json(label, &serde_json::to_vec(value)?)
        }
        AssertionDefinition::Cbor { label, data } => {
            if label.is_empty() {
                return Err(Error::AssertionInvalid(
                    "assertion label must not be empty".to_string(),
                ));
            }
            serde_cbor::from_slice::<serde_cbor::Value>(data).map_err(|_| {
                Error::AssertionInvalid(format!("assertion {label} is not valid cbor"))
            })?;
            Ok(Assertion::from_data_cbor(label, data))
        }
    }
}

/// Creates a manifest from `definition`, signs it with `identity` and
/// returns a new copy of the asset with the manifest embedded. Any
/// manifest already in the asset is replaced.
pub fn sign(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
    definition: &ManifestDefinition,
    identity: &SigningIdentity,
    options: &SignOptions,
) -> Result<Vec<u8>> {
    let handler = resolve_handler(asset_bytes, format_hint)?;

    if !definition
        .assertions
        .iter()
        .any(|d| matches!(d, AssertionDefinition::Actions(_)))
    {
        return Err(Error::AssertionInvalid(
            "a manifest requires an actions assertion".to_string(),
        ));
    }

    let format = match (&definition.format, format_hint) {
        (Some(format), _) => format.clone(),
        (None, Some(hint)) => format_to_mime(hint),
        (None, None) => handler
            .supported_types()
            .iter()
            .find(|t| t.contains('/'))
            .unwrap_or(&"application/octet-stream")
            .to_string(),
    };

    let claim_generator = definition
        .claim_generator
        .clone()
        .unwrap_or_else(|| format!("{}/{}", crate::NAME, crate::VERSION));

    let mut claim = Claim::new(&claim_generator, &format, definition.title.as_deref());
    for def in &definition.assertions {
        claim.add_assertion(&definition_to_assertion(def)?)?;
    }

    let mut store = Store::new();
    store.add_claim(claim)?;

    let signer = create_signer::from_identity(identity, options.reserve_size, options.tsa_url.clone())?;
    store.save_to_asset(
        asset_bytes,
        format_hint,
        signer.as_ref(),
        options.timestamp_mandatory,
    )
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        assertions::{c2pa_action, Action},
        asset_handlers::jpeg_io,
        create_signer::CertSubject,
    };

    fn created_definition() -> ManifestDefinition {
        ManifestDefinition {
            title: Some("test.jpg".to_string()),
            assertions: vec![AssertionDefinition::Actions(
                Actions::new().add_action(Action::new(c2pa_action::CREATED)),
            )],
            ..Default::default()
        }
    }

    #[test]
    fn manifest_requires_actions() {
        let identity =
            create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let definition = ManifestDefinition::default();
        let result = sign(
            &jpeg_io::tests::minimal_jpeg(),
            Some("jpg"),
            &definition,
            &identity,
            &SignOptions::default(),
        );
        assert!(matches!(result, Err(Error::AssertionInvalid(_))));
    }

    #[test]
    fn empty_actions_list_rejected() {
        let identity =
            create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let definition = ManifestDefinition {
            assertions: vec![AssertionDefinition::Actions(Actions::new())],
            ..Default::default()
        };
        let result = sign(
            &jpeg_io::tests::minimal_jpeg(),
            Some("jpg"),
            &definition,
            &identity,
            &SignOptions::default(),
        );
        assert!(matches!(result, Err(Error::AssertionInvalid(_))));
    }

    #[test]
    fn custom_cbor_assertion_round_trips() {
        let identity =
            create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let mut definition = created_definition();
        definition.assertions.push(AssertionDefinition::Cbor {
            label: "com.example.metadata".to_string(),
            data: serde_cbor::to_vec(&serde_cbor::Value::Text("camera A".to_string()))
                .unwrap(),
        });

        let signed = sign(
            &jpeg_io::tests::minimal_jpeg(),
            Some("jpg"),
            &definition,
            &identity,
            &SignOptions::default(),
        )
        .unwrap();

        let result = crate::verify(
            &signed,
            Some("jpg"),
            &crate::VerifyOptions {
                trust_anchors: vec![identity.cert_chain_der.last().unwrap().clone()],
                ..Default::default()
            },
        )
        .unwrap();
        assert!(result.failure_reasons.is_empty());
        let manifest = result.active_manifest.unwrap();
        assert!(manifest
            .assertion_labels
            .iter()
            .any(|l| l == "com.example.metadata"));
    }

    #[test]
    fn malformed_custom_cbor_rejected() {
        let identity =
            create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let mut definition = created_definition();
        definition.assertions.push(AssertionDefinition::Cbor {
            label: "com.example.metadata".to_string(),
            data: vec![0xFF, 0xFF],
        });
        let result = sign(
            &jpeg_io::tests::minimal_jpeg(),
            Some("jpg"),
            &definition,
            &identity,
            &SignOptions::default(),
        );
        assert!(matches!(result, Err(Error::AssertionInvalid(_))));
    }

    #[test]
    fn format_detected_from_container() {
        let identity =
            create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signed = sign(
            &jpeg_io::tests::minimal_jpeg(),
            None,
            &created_definition(),
            &identity,
            &SignOptions::default(),
        )
        .unwrap();

        let result = crate::verify(
            &signed,
            None,
            &crate::VerifyOptions {
                trust_anchors: vec![identity.cert_chain_der.last().unwrap().clone()],
                ..Default::default()
            },
        )
        .unwrap();
        let manifest = result.active_manifest.unwrap();
        assert_eq!(manifest.format, "image/jpeg");
        assert_eq!(manifest.title.as_deref(), Some("test.jpg"));
        assert!(manifest
            .claim_generator
            .starts_with(crate::NAME));
    }
}
