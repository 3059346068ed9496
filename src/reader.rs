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

//! The top-level verification entry point.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    jumbf_io::load_jumbf_from_bytes,
    status_tracker::DetailedStatusTracker,
    store::Store,
    trust_handler::{InMemoryTrustHandler, TrustHandlerConfig},
    validation_status::{status_for_store, ValidationStatus},
};

/// Overall outcome of verifying one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ValidationState {
    /// A manifest was found and every check passed.
    Valid,

    /// A manifest was found but at least one check failed.
    Invalid,

    /// The container is supported but carries no manifest.
    NoManifest,

    /// The container format has no handler.
    UnsupportedFormat,
}

/// Inputs controlling trust during verification.
#[derive(Debug, Default)]
pub struct VerifyOptions {
    /// Trust anchors, each entry PEM text or a DER certificate. With
    /// no anchors every signing credential is untrusted.
    pub trust_anchors: Vec<Vec<u8>>,

    /// Extra allowed leaf EKUs, one dotted OID per line.
    pub allowed_ekus: Option<String>,
}

/// Details about the signature on the active manifest.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SignatureInfo {
    /// Common name of the signing certificate's subject.
    pub common_name: Option<String>,

    /// Organization of the issuing certificate.
    pub issuer_org: Option<String>,

    /// Signing time from the time stamp, when one was present.
    pub time: Option<DateTime<Utc>>,
}

/// A readable digest of the active manifest.
#[derive(Clone, Debug, Serialize)]
pub struct ManifestSummary {
    pub label: String,
    pub claim_generator: String,
    pub format: String,
    pub title: Option<String>,
    pub instance_id: String,
    pub assertion_labels: Vec<String>,
    pub signature_info: Option<SignatureInfo>,
}

/// The result of [`verify`]. `failure_reasons` is empty exactly when
/// `state` is [`ValidationState::Valid`].
#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub state: ValidationState,
    pub failure_reasons: Vec<ValidationStatus>,
    pub active_manifest: Option<ManifestSummary>,
}

impl VerificationResult {
    fn stateless(state: ValidationState) -> Self {
        VerificationResult {
            state,
            failure_reasons: Vec::new(),
            active_manifest: None,
        }
    }
}

/// Verifies the manifest store in `asset_bytes`.
///
/// Trust and integrity failures are reported in the result, not as
/// errors. `Err` is reserved for structural problems: a damaged
/// container or a manifest block that cannot be parsed at all.
pub fn verify(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
    options: &VerifyOptions,
) -> Result<VerificationResult> {
    let jumbf = match load_jumbf_from_bytes(asset_bytes, format_hint) {
        Ok(Some(jumbf)) => jumbf,
        Ok(None) => return Ok(VerificationResult::stateless(ValidationState::NoManifest)),
        Err(Error::UnsupportedType(_)) => {
            return Ok(VerificationResult::stateless(
                ValidationState::UnsupportedFormat,
            ))
        }
        Err(e) => return Err(e),
    };

    let mut validation_log = DetailedStatusTracker::new();
    let store = Store::from_jumbf(&jumbf, &mut validation_log)?;

    let mut th = InMemoryTrustHandler::new();
    for anchor in &options.trust_anchors {
        th.load_trust_anchors_from_data(anchor)?;
    }
    if let Some(ekus) = &options.allowed_ekus {
        th.load_configuration(ekus.as_bytes())?;
    }

    let cert_info = store.verify_store(asset_bytes, &th, &mut validation_log)?;

    let failure_reasons = status_for_store(&validation_log);
    let state = if failure_reasons.is_empty() {
        ValidationState::Valid
    } else {
        ValidationState::Invalid
    };

    let active_manifest = store.provenance_claim().map(|claim| ManifestSummary {
        label: claim.label().to_string(),
        claim_generator: claim.claim_generator.clone(),
        format: claim.format().to_string(),
        title: claim.title().map(|t| t.to_string()),
        instance_id: claim.instance_id().to_string(),
        assertion_labels: claim
            .claim_assertion_store()
            .iter()
            .map(|ca| ca.label())
            .collect(),
        signature_info: cert_info.map(|info| SignatureInfo {
            common_name: info.common_name,
            issuer_org: info.issuer_org,
            time: info.date,
        }),
    });

    Ok(VerificationResult {
        state,
        failure_reasons,
        active_manifest,
    })
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        assertions::{c2pa_action, Action, Actions},
        asset_handlers::{bmff_io, jpeg_io, png_io},
        builder::{AssertionDefinition, ManifestDefinition, SignOptions},
        create_signer::{self, CertSubject, SigningIdentity},
        validation_status,
    };

    fn signed_asset(asset: &[u8], hint: &str, identity: &SigningIdentity) -> Vec<u8> {
        let definition = ManifestDefinition {
            title: Some(format!("test.{hint}")),
            assertions: vec![AssertionDefinition::Actions(
                Actions::new().add_action(Action::new(c2pa_action::CREATED)),
            )],
            ..Default::default()
        };
        crate::sign(asset, Some(hint), &definition, identity, &SignOptions::default()).unwrap()
    }

    fn anchored(identity: &SigningIdentity) -> VerifyOptions {
        VerifyOptions {
            trust_anchors: vec![identity.cert_chain_der.last().unwrap().clone()],
            ..Default::default()
        }
    }

    #[test]
    fn unsupported_format_is_a_state_not_an_error() {
        let result = verify(&[0u8; 32], Some("tiff"), &VerifyOptions::default()).unwrap();
        assert_eq!(result.state, ValidationState::UnsupportedFormat);
        assert!(result.failure_reasons.is_empty());
        assert!(result.active_manifest.is_none());
    }

    #[test]
    fn clean_assets_have_no_manifest() {
        for asset in [jpeg_io::tests::minimal_jpeg(), png_io::tests::minimal_png()] {
            let result = verify(&asset, None, &VerifyOptions::default()).unwrap();
            assert_eq!(result.state, ValidationState::NoManifest);
        }
    }

    #[test]
    fn sign_and_verify_round_trips() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let assets: [(Vec<u8>, &str); 3] = [
            (jpeg_io::tests::minimal_jpeg(), "jpg"),
            (png_io::tests::minimal_png(), "png"),
            (bmff_io::tests::minimal_mp4(), "mp4"),
        ];

        for (asset, hint) in assets {
            let signed = signed_asset(&asset, hint, &identity);
            let result = verify(&signed, Some(hint), &anchored(&identity)).unwrap();
            assert_eq!(result.state, ValidationState::Valid, "format {hint}");
            assert!(result.failure_reasons.is_empty(), "format {hint}");

            let manifest = result.active_manifest.unwrap();
            assert!(manifest
                .assertion_labels
                .iter()
                .any(|l| l.starts_with("c2pa.actions")));
            let signature = manifest.signature_info.unwrap();
            assert_eq!(signature.common_name.as_deref(), Some("C2PA Signer"));
        }
    }

    #[test]
    fn tampered_asset_reports_hard_binding_mismatch() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let mut signed = signed_asset(&jpeg_io::tests::minimal_jpeg(), "jpg", &identity);

        // flip a bit in the scan data, outside the manifest segment
        let last = signed.len() - 3;
        signed[last] ^= 0x01;

        let result = verify(&signed, Some("jpg"), &anchored(&identity)).unwrap();
        assert_eq!(result.state, ValidationState::Invalid);
        assert!(result
            .failure_reasons
            .iter()
            .any(|s| s.code() == validation_status::ASSERTION_DATAHASH_MISMATCH));
    }

    #[test]
    fn foreign_anchor_is_untrusted() {
        let signing = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let other = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signed = signed_asset(&jpeg_io::tests::minimal_jpeg(), "jpg", &signing);

        let result = verify(&signed, Some("jpg"), &anchored(&other)).unwrap();
        assert_eq!(result.state, ValidationState::Invalid);
        assert!(result
            .failure_reasons
            .iter()
            .any(|s| s.code() == validation_status::SIGNING_CREDENTIAL_UNTRUSTED));
    }

    #[test]
    fn no_anchors_means_untrusted() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signed = signed_asset(&jpeg_io::tests::minimal_jpeg(), "jpg", &identity);

        let result = verify(&signed, Some("jpg"), &VerifyOptions::default()).unwrap();
        assert_eq!(result.state, ValidationState::Invalid);
        assert!(result
            .failure_reasons
            .iter()
            .any(|s| s.code() == validation_status::SIGNING_CREDENTIAL_UNTRUSTED));
    }

    #[test]
    fn expired_credential_is_reported() {
        let identity = create_signer::issue_signing_identity_with_validity(
            &CertSubject::default(),
            (2020, 1, 1),
            (2021, 1, 1),
        )
        .unwrap();
        let signed = signed_asset(&jpeg_io::tests::minimal_jpeg(), "jpg", &identity);

        let result = verify(&signed, Some("jpg"), &anchored(&identity)).unwrap();
        assert_eq!(result.state, ValidationState::Invalid);
        assert!(result
            .failure_reasons
            .iter()
            .any(|s| s.code() == validation_status::SIGNING_CREDENTIAL_EXPIRED));
    }

    #[test]
    fn damaged_manifest_block_is_an_error() {
        // embed garbage that passes the container but fails JUMBF parsing
        let mut store = vec![0u8; 32];
        store[..4].copy_from_slice(&32u32.to_be_bytes());
        store[4..8].copy_from_slice(b"jumb");
        let asset = {
            use std::io::Cursor;
            use crate::asset_io::CAIWriter;
            let io = jpeg_io::JpegIO {};
            let mut out = Cursor::new(Vec::new());
            io.write_cai(
                &mut Cursor::new(jpeg_io::tests::minimal_jpeg()),
                &mut out,
                &store,
            )
            .unwrap();
            out.into_inner()
        };
        assert!(verify(&asset, None, &VerifyOptions::default()).is_err());
    }
}
