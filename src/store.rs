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

//! The manifest store: a collection of claims serialized to and from
//! the C2PA JUMBF block, plus verification and the embed-then-sign
//! flow that keeps the hard binding and the signature consistent.

use std::io::Cursor;

use crate::{
    asset_io::HashBlockObjectType,
    assertions::DataHash,
    assertion::AssertionBase,
    claim::{assertion_from_box, assertion_to_box, Claim},
    cose_sign, cose_validator,
    error::{Error, Result},
    hashed_uri::HashedUri,
    jumbf::{
        boxes::{
            uuid_from_hex, DataBox, DescriptionBox, SuperBox, CAI_ASSERTION_STORE_UUID,
            CAI_BLOCK_UUID, CAI_CLAIM_UUID, CAI_SIGNATURE_UUID, CAI_STORE_UUID,
            CAI_UPDATE_MANIFEST_UUID,
        },
        labels,
    },
    jumbf_io::{object_locations_from_bytes, save_jumbf_to_bytes},
    log_item,
    signer::Signer,
    status_tracker::StatusTracker,
    trust_handler::TrustHandlerConfig,
    utils::hash_utils::{hash_by_alg, vec_compare, HashRange},
    validation_status,
};

// embedding exclusion ranges must reach a fixed point within a few
// rounds; exceeding this means the container handler is not stable
const MAX_EMBED_ROUNDS: usize = 5;

/// A collection of claims ordered oldest first. The last claim is the
/// active (provenance) claim.
#[derive(Debug, Default)]
pub(crate) struct Store {
    claims: Vec<Claim>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn get_claim(&self, label: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.label() == label)
    }

    /// The active claim, whose hard binding covers the asset.
    pub fn provenance_claim(&self) -> Option<&Claim> {
        self.claims.last()
    }

    pub fn provenance_claim_mut(&mut self) -> Option<&mut Claim> {
        self.claims.last_mut()
    }

    pub fn add_claim(&mut self, claim: Claim) -> Result<()> {
        if self.get_claim(claim.label()).is_some() {
            return Err(Error::DuplicateManifestLabel(claim.label().to_string()));
        }
        self.claims.push(claim);
        Ok(())
    }

    /// Serializes the store to a JUMBF block. Claims without a
    /// signature get a placeholder of `min_reserve_size` bytes so the
    /// layout is final before signing.
    pub fn to_jumbf(&self, min_reserve_size: usize) -> Result<Vec<u8>> {
        let mut block = SuperBox::new(DescriptionBox::new(
            uuid_from_hex(CAI_BLOCK_UUID)?,
            Some(labels::MANIFEST_STORE.to_string()),
        ));

        for claim in &self.claims {
            let mut manifest = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(CAI_STORE_UUID)?,
                Some(claim.label().to_string()),
            ));

            let mut assertion_store = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(CAI_ASSERTION_STORE_UUID)?,
                Some(labels::ASSERTIONS.to_string()),
            ));
            for ca in claim.claim_assertion_store() {
                assertion_store.add_super_box(assertion_to_box(ca)?);
            }
            manifest.add_super_box(assertion_store);

            let mut claim_box = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(CAI_CLAIM_UUID)?,
                Some(labels::CLAIM.to_string()),
            ));
            claim_box.add_data_box(DataBox::new(b"cbor", claim.data()?));
            manifest.add_super_box(claim_box);

            let signature = if claim.signature_val().is_empty() {
                sign_claim_placeholder(claim, min_reserve_size)?
            } else {
                claim.signature_val().to_vec()
            };
            let mut sig_box = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(CAI_SIGNATURE_UUID)?,
                Some(labels::SIGNATURE.to_string()),
            ));
            let mut payload = uuid_from_hex(CAI_SIGNATURE_UUID)?.to_vec();
            payload.extend_from_slice(&signature);
            sig_box.add_data_box(DataBox::new(b"uuid", payload));
            manifest.add_super_box(sig_box);

            block.add_super_box(manifest);
        }

        block.to_vec()
    }

    /// Rebuilds a store from a JUMBF block. Structural problems are
    /// logged and returned as errors; a malformed store cannot be
    /// partially trusted.
    pub fn from_jumbf(
        block_bytes: &[u8],
        validation_log: &mut impl StatusTracker,
    ) -> Result<Store> {
        let block = SuperBox::from_slice(block_bytes)?;

        if block.desc().uuid() != &uuid_from_hex(CAI_BLOCK_UUID)?
            || block.desc().label() != Some(labels::MANIFEST_STORE)
        {
            return Err(Error::JumbfBoxMalformed(
                "top-level box is not a manifest store".to_string(),
            ));
        }

        let mut store = Store::new();
        for manifest_sb in block.super_boxes() {
            let label = manifest_sb
                .desc()
                .label()
                .ok_or_else(|| Error::JumbfBoxMalformed("manifest without label".to_string()))?
                .to_string();

            if manifest_sb.desc().uuid() == &uuid_from_hex(CAI_UPDATE_MANIFEST_UUID)? {
                // update manifests are not supported; flag and skip
                let item = log_item!(label, "update manifest not supported", "from_jumbf")
                    .error(Error::UnsupportedType("update manifest".to_string()))
                    .validation_status(validation_status::GENERAL_ERROR);
                validation_log.log(item, None)?;
                continue;
            }
            if manifest_sb.desc().uuid() != &uuid_from_hex(CAI_STORE_UUID)? {
                return Err(Error::JumbfBoxMalformed(
                    "manifest box has unknown uuid".to_string(),
                ));
            }

            // exactly one claim box per manifest
            let claim_boxes = manifest_sb
                .super_boxes()
                .filter(|sb| sb.desc().label() == Some(labels::CLAIM))
                .count();
            if claim_boxes != 1 {
                let item = log_item!(label, "one claim box required", "from_jumbf")
                    .error(Error::ClaimMissing {
                        label: label.clone(),
                    })
                    .validation_status(validation_status::CLAIM_MISSING);
                validation_log.log(item, None)?;
                return Err(Error::ClaimMissing { label });
            }

            let claim_sb = manifest_sb
                .find_by_label(labels::CLAIM)
                .ok_or(Error::ClaimMissing {
                    label: label.clone(),
                })?;
            let claim_cbor = claim_sb
                .data_box_of_type(b"cbor")
                .ok_or(Error::ClaimMissing {
                    label: label.clone(),
                })?;
            let mut claim = Claim::from_data(&label, &claim_cbor.data)?;

            let sig_sb = manifest_sb
                .find_by_label(labels::SIGNATURE)
                .ok_or(Error::JumbfBoxNotFound)?;
            let sig_db = sig_sb
                .data_box_of_type(b"uuid")
                .ok_or(Error::JumbfBoxNotFound)?;
            if sig_db.data.len() <= 16 {
                return Err(Error::JumbfBoxMalformed(
                    "signature box payload too short".to_string(),
                ));
            }
            claim.set_signature_val(sig_db.data[16..].to_vec());

            let assertion_store = manifest_sb
                .find_by_label(labels::ASSERTIONS)
                .ok_or(Error::JumbfBoxNotFound)?;
            for assertion_sb in assertion_store.super_boxes() {
                let (assertion, instance) = assertion_from_box(assertion_sb)?;
                // a claim reference may carry its own digest algorithm
                let box_label = assertion_sb.desc().label().unwrap_or_default();
                let alg = claim
                    .assertions()
                    .iter()
                    .find(|hu| {
                        labels::assertion_label_from_uri(&hu.url()).as_deref() == Some(box_label)
                    })
                    .and_then(|hu| hu.alg())
                    .unwrap_or_else(|| claim.alg().to_string());
                let hash = hash_by_alg(&alg, &assertion_sb.to_vec()?)?;
                let salt = assertion_sb.desc().salt().map(|s| s.to_vec());
                claim.put_restored_assertion(assertion, instance, hash, salt);
            }

            store.add_claim(claim)?;
        }

        if store.claims.is_empty() {
            return Err(Error::JumbfNotFound);
        }
        Ok(store)
    }

    /// Verifies the active claim against the asset: signature and
    /// chain, assertion references and the hard binding. Findings go
    /// to `validation_log`; details about the signing credential come
    /// back when the signature could be evaluated.
    pub fn verify_store(
        &self,
        asset_bytes: &[u8],
        th: &dyn TrustHandlerConfig,
        validation_log: &mut impl StatusTracker,
    ) -> Result<Option<cose_validator::CertificateInfo>> {
        let claim = self.provenance_claim().ok_or(Error::JumbfNotFound)?;

        let claim_bytes = claim.data()?;
        let sig_uri = claim.signature_uri().to_string();
        // evaluation failures are already logged inside
        let cert_info = cose_validator::verify_cose(
            claim.signature_val(),
            &claim_bytes,
            &sig_uri,
            th,
            validation_log,
        )
        .ok();

        for hashed_uri in claim.assertions() {
            self.verify_assertion_reference(claim, hashed_uri, validation_log)?;
        }

        self.verify_hard_binding(claim, asset_bytes, validation_log)?;
        Ok(cert_info)
    }

    fn verify_assertion_reference(
        &self,
        claim: &Claim,
        hashed_uri: &HashedUri,
        validation_log: &mut impl StatusTracker,
    ) -> Result<()> {
        let url = hashed_uri.url();

        // references into another manifest must at least resolve
        if let Some(target) = labels::manifest_label_from_uri(&url) {
            if target != claim.label() {
                if self.get_claim(&target).is_none() {
                    let item = log_item!(url, "referenced manifest not in store", "verify_store")
                        .error(Error::ClaimMissing {
                            label: target.clone(),
                        })
                        .validation_status(validation_status::CLAIM_MISSING);
                    validation_log.log(item, None)?;
                }
                return Ok(());
            }
        }

        let assertion_label = match labels::assertion_label_from_uri(&url) {
            Some(label) => label,
            None => {
                let item = log_item!(url, "unrecognized assertion reference", "verify_store")
                    .error(Error::AssertionMissing { url: url.clone() })
                    .validation_status(validation_status::GENERAL_ERROR);
                validation_log.log(item, None)?;
                return Ok(());
            }
        };

        match claim.get_claim_assertion(&assertion_label) {
            Some(ca) => {
                if vec_compare(&hashed_uri.hash(), ca.hash()) {
                    validation_log.log_silent(
                        log_item!(url, "assertion hash matches", "verify_store")
                            .validation_status(validation_status::ASSERTION_HASHEDURI_MATCH),
                    );
                } else {
                    let item = log_item!(url, "assertion hash mismatch", "verify_store")
                        .error(Error::AssertionInvalid(assertion_label.clone()))
                        .validation_status(validation_status::ASSERTION_HASHEDURI_MISMATCH);
                    validation_log.log(item, None)?;
                }
            }
            None => {
                let item = log_item!(url, "assertion not in store", "verify_store")
                    .error(Error::AssertionMissing { url: url.clone() })
                    .validation_status(validation_status::ASSERTION_MISSING);
                validation_log.log(item, None)?;
            }
        }
        Ok(())
    }

    fn verify_hard_binding(
        &self,
        claim: &Claim,
        asset_bytes: &[u8],
        validation_log: &mut impl StatusTracker,
    ) -> Result<()> {
        let data_hashes = claim.data_hash_assertions();
        if data_hashes.is_empty() {
            let item = log_item!(
                claim.label(),
                "claim has no hard binding assertion",
                "verify_store"
            )
            .error(Error::AssertionMissing {
                url: claim.label().to_string(),
            })
            .validation_status(validation_status::ASSERTION_MISSING);
            validation_log.log(item, None)?;
            return Ok(());
        }

        for (label, data_hash) in data_hashes {
            let uri = labels::to_assertion_uri(claim.label(), &label);
            match data_hash.verify_stream(&mut Cursor::new(asset_bytes), Some(claim.alg())) {
                Ok(()) => validation_log.log_silent(
                    log_item!(uri, "asset hash matches hard binding", "verify_store")
                        .validation_status(validation_status::ASSERTION_DATAHASH_MATCH),
                ),
                Err(e) => {
                    let item = log_item!(uri, "asset does not match hard binding", "verify_store")
                        .error(e)
                        .validation_status(validation_status::ASSERTION_DATAHASH_MISMATCH);
                    validation_log.log(item, None)?;
                }
            }
        }
        Ok(())
    }

    /// Embeds this store into the asset and signs the active claim.
    ///
    /// The layout is found by fixed point: embed with a placeholder
    /// signature, read back the framing exclusions, fold them into the
    /// hard binding, and repeat until the exclusions are stable. Only
    /// then is the asset hashed and the claim signed; the padded
    /// signature replaces the placeholder without moving a byte.
    pub fn save_to_asset(
        &mut self,
        asset_bytes: &[u8],
        format_hint: Option<&str>,
        signer: &dyn Signer,
        timestamp_mandatory: bool,
    ) -> Result<Vec<u8>> {
        let reserve_size = signer.reserve_size();

        // the active claim needs a hard binding placeholder up front
        {
            let claim = self.provenance_claim_mut().ok_or(Error::JumbfNotFound)?;
            if claim.data_hash_assertions().is_empty() {
                let alg = claim.alg().to_string();
                let data_hash = DataHash::new("jumbf manifest", &alg)?;
                claim.add_assertion(&data_hash.to_assertion()?)?;
            }
        }

        let mut exclusions: Vec<HashRange> = Vec::new();
        let mut scratch = Vec::new();
        let mut converged = false;
        for _ in 0..MAX_EMBED_ROUNDS {
            let jumbf = self.to_jumbf(reserve_size)?;
            scratch = save_jumbf_to_bytes(asset_bytes, format_hint, &jumbf)?;

            let found: Vec<HashRange> = object_locations_from_bytes(&scratch, format_hint)?
                .iter()
                .filter(|p| p.htype == HashBlockObjectType::Cai)
                .map(|p| HashRange::new(p.offset, p.length))
                .collect();
            if found == exclusions {
                converged = true;
                break;
            }
            exclusions = found;

            let claim = self.provenance_claim_mut().ok_or(Error::JumbfNotFound)?;
            let (_, mut data_hash) = claim
                .data_hash_assertions()
                .into_iter()
                .next()
                .ok_or(Error::JumbfBoxNotFound)?;
            data_hash.set_exclusions(exclusions.clone());
            claim.update_data_hash(&data_hash)?;
        }
        if !converged {
            return Err(Error::JumbfCreationError);
        }

        // hash the asset with the manifest spans excluded, then sign
        let claim = self.provenance_claim_mut().ok_or(Error::JumbfNotFound)?;
        let (_, mut data_hash) = claim
            .data_hash_assertions()
            .into_iter()
            .next()
            .ok_or(Error::JumbfBoxNotFound)?;
        data_hash.gen_hash_from_stream(&mut Cursor::new(&scratch))?;
        claim.update_data_hash(&data_hash)?;

        let claim_bytes = claim.data()?;
        let signature = cose_sign::sign_claim(
            &claim_bytes,
            signer,
            reserve_size,
            timestamp_mandatory,
        )?;
        claim.set_signature_val(signature);

        let jumbf = self.to_jumbf(reserve_size)?;
        let output = save_jumbf_to_bytes(asset_bytes, format_hint, &jumbf)?;

        // the signed embed must land on the same framing the hard
        // binding was computed against
        let final_exclusions: Vec<HashRange> = object_locations_from_bytes(&output, format_hint)?
            .iter()
            .filter(|p| p.htype == HashBlockObjectType::Cai)
            .map(|p| HashRange::new(p.offset, p.length))
            .collect();
        if final_exclusions != exclusions {
            return Err(Error::JumbfCreationError);
        }

        Ok(output)
    }
}

/// Deterministic placeholder filling the signature box before signing.
pub(crate) fn sign_claim_placeholder(claim: &Claim, min_reserve_size: usize) -> Result<Vec<u8>> {
    let seed = format!("signature placeholder:{}", claim.label());
    let mut placeholder = hash_by_alg("sha256", seed.as_bytes())?;
    placeholder.resize(min_reserve_size, 0);
    Ok(placeholder)
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        assertions::{c2pa_action, Action, Actions},
        asset_handlers::jpeg_io,
        create_signer::{self, CertSubject},
        status_tracker::DetailedStatusTracker,
        trust_handler::InMemoryTrustHandler,
    };

    fn claim_with_actions() -> Claim {
        let mut claim = Claim::new("test_app/1.0", "image/jpeg", Some("test.jpg"));
        let actions = Actions::new().add_action(Action::new(c2pa_action::CREATED));
        claim
            .add_assertion(&actions.to_assertion().unwrap())
            .unwrap();
        claim
    }

    fn failure_codes(tracker: &DetailedStatusTracker) -> Vec<String> {
        validation_status::status_for_store(tracker)
            .iter()
            .map(|s| s.code().to_string())
            .collect()
    }

    #[test]
    fn jumbf_round_trip_preserves_claims() {
        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let original_label = store.provenance_claim().unwrap().label().to_string();

        let jumbf = store.to_jumbf(1024).unwrap();
        let mut log = DetailedStatusTracker::new();
        let restored = Store::from_jumbf(&jumbf, &mut log).unwrap();

        let claim = restored.provenance_claim().unwrap();
        assert_eq!(claim.label(), original_label);
        assert_eq!(claim.claim_generator, "test_app/1.0");
        assert_eq!(claim.assertions().len(), 1);
        // placeholder signature came back at full size
        assert_eq!(claim.signature_val().len(), 1024);

        // restored assertion digests match the claim references
        let ca = claim.get_claim_assertion("c2pa.actions").unwrap();
        assert!(vec_compare(&claim.assertions()[0].hash(), ca.hash()));
    }

    #[test]
    fn duplicate_labels_rejected() {
        let mut store = Store::new();
        let claim = claim_with_actions();
        let copy = Claim::from_data(claim.label(), &claim.data().unwrap()).unwrap();
        store.add_claim(claim).unwrap();
        assert!(matches!(
            store.add_claim(copy),
            Err(Error::DuplicateManifestLabel(_))
        ));
    }

    #[test]
    fn missing_claim_box_is_structural() {
        // a manifest store with an empty manifest box
        let mut block = SuperBox::new(DescriptionBox::new(
            uuid_from_hex(CAI_BLOCK_UUID).unwrap(),
            Some(labels::MANIFEST_STORE.to_string()),
        ));
        block.add_super_box(SuperBox::new(DescriptionBox::new(
            uuid_from_hex(CAI_STORE_UUID).unwrap(),
            Some("urn:uuid:nope".to_string()),
        )));
        let bytes = block.to_vec().unwrap();

        let mut log = DetailedStatusTracker::new();
        assert!(matches!(
            Store::from_jumbf(&bytes, &mut log),
            Err(Error::ClaimMissing { .. })
        ));
    }

    #[test]
    fn tampered_assertion_store_flags_hashed_uri() {
        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let jumbf = store.to_jumbf(1024).unwrap();

        let mut log = DetailedStatusTracker::new();
        let mut restored = Store::from_jumbf(&jumbf, &mut log).unwrap();

        // rebuild the claim with an assertion store whose content no
        // longer matches the hashed reference in the claim body
        {
            let claim = restored.provenance_claim_mut().unwrap();
            let replacement = Actions::new()
                .add_action(Action::new(c2pa_action::EDITED))
                .to_assertion()
                .unwrap();
            let salt = claim
                .get_claim_assertion("c2pa.actions")
                .unwrap()
                .salt()
                .cloned();
            let mut tampered = Claim::from_data(claim.label(), &claim.data().unwrap()).unwrap();
            tampered.put_restored_assertion(
                replacement,
                1,
                hash_by_alg(tampered.alg(), b"different bytes").unwrap(),
                salt,
            );
            *claim = tampered;
        }

        let th = InMemoryTrustHandler::new();
        let mut verify_log = DetailedStatusTracker::new();
        restored
            .verify_store(&jpeg_io::tests::minimal_jpeg(), &th, &mut verify_log)
            .unwrap();
        assert!(failure_codes(&verify_log)
            .contains(&validation_status::ASSERTION_HASHEDURI_MISMATCH.to_string()));
    }

    #[test]
    fn sign_embed_and_verify_jpeg() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = create_signer::from_identity(&identity, 10240, None).unwrap();

        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let asset = jpeg_io::tests::minimal_jpeg();
        let signed = store
            .save_to_asset(&asset, Some("jpg"), signer.as_ref(), false)
            .unwrap();

        // read back and verify clean
        let jumbf = crate::jumbf_io::load_jumbf_from_bytes(&signed, None)
            .unwrap()
            .unwrap();
        let mut log = DetailedStatusTracker::new();
        let restored = Store::from_jumbf(&jumbf, &mut log).unwrap();

        let mut th = InMemoryTrustHandler::new();
        th.load_trust_anchors_from_data(identity.cert_chain_der.last().unwrap())
            .unwrap();
        restored.verify_store(&signed, &th, &mut log).unwrap();
        assert!(failure_codes(&log).is_empty());
    }

    #[test]
    fn signature_check_covers_stored_claim_bytes() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = create_signer::from_identity(&identity, 10240, None).unwrap();

        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let asset = jpeg_io::tests::minimal_jpeg();
        let signed = store
            .save_to_asset(&asset, Some("jpg"), signer.as_ref(), false)
            .unwrap();

        // the restored claim must hand back the exact claim box bytes,
        // not a re-encoding of the parsed struct
        let jumbf = crate::jumbf_io::load_jumbf_from_bytes(&signed, None)
            .unwrap()
            .unwrap();
        let block = SuperBox::from_slice(&jumbf).unwrap();
        let claim_cbor = block
            .super_boxes()
            .next()
            .and_then(|m| m.find_by_label(labels::CLAIM))
            .and_then(|c| c.data_box_of_type(b"cbor"))
            .unwrap()
            .data
            .clone();

        let mut log = DetailedStatusTracker::new();
        let restored = Store::from_jumbf(&jumbf, &mut log).unwrap();
        assert_eq!(
            restored.provenance_claim().unwrap().data().unwrap(),
            claim_cbor
        );
    }

    #[test]
    fn tampered_asset_byte_fails_hard_binding() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = create_signer::from_identity(&identity, 10240, None).unwrap();

        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let asset = jpeg_io::tests::minimal_jpeg();
        let mut signed = store
            .save_to_asset(&asset, Some("jpg"), signer.as_ref(), false)
            .unwrap();

        // flip a byte in the image entropy data at the very end
        let last = signed.len() - 3;
        signed[last] ^= 0xFF;

        let jumbf = crate::jumbf_io::load_jumbf_from_bytes(&signed, None)
            .unwrap()
            .unwrap();
        let mut log = DetailedStatusTracker::new();
        let restored = Store::from_jumbf(&jumbf, &mut log).unwrap();

        let mut th = InMemoryTrustHandler::new();
        th.load_trust_anchors_from_data(identity.cert_chain_der.last().unwrap())
            .unwrap();
        restored.verify_store(&signed, &th, &mut log).unwrap();
        assert!(failure_codes(&log)
            .contains(&validation_status::ASSERTION_DATAHASH_MISMATCH.to_string()));
    }

    #[test]
    fn tiny_reservation_overflows() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = create_signer::from_identity(&identity, 64, None).unwrap();

        let mut store = Store::new();
        store.add_claim(claim_with_actions()).unwrap();
        let asset = jpeg_io::tests::minimal_jpeg();
        assert!(matches!(
            store.save_to_asset(&asset, Some("jpg"), signer.as_ref(), false),
            Err(Error::ManifestTooLarge)
        ));
    }
}
