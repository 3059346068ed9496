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

//! Validates a claim's COSE_Sign1 signature and the certificate chain
//! behind it. Findings are logged to the supplied status tracker;
//! validation continues past failures so a report covers everything.

use chrono::{DateTime, Utc};
use coset::{
    cbor::value::Value, iana, CborSerializable, CoseSign1, Label, TaggedCborSerializable,
};
use ed25519_dalek::{Signature, VerifyingKey};
use x509_parser::prelude::*;

use crate::{
    error::{ChainError, Error, Result},
    log_item,
    status_tracker::StatusTracker,
    time_stamp,
    trust_handler::{has_allowed_oid, TrustHandlerConfig},
    validation_status,
};

const COSE_SIGN1_FN: &str = "verify_cose";
static ED25519_OID: asn1_rs::Oid<'static> = asn1_rs::oid!(1.3.101 .112);

/// Details about the signing credential, reported after validation.
#[derive(Debug, Default, Clone)]
pub struct CertificateInfo {
    /// Common name of the signing certificate's subject.
    pub common_name: Option<String>,

    /// Organization of the issuing certificate.
    pub issuer_org: Option<String>,

    /// Time of signing, from the time stamp token when one is present.
    pub date: Option<DateTime<Utc>>,
}

fn cose_err<E: std::fmt::Debug>(e: E) -> Error {
    Error::CoseSignature(format!("{e:?}"))
}

pub(crate) fn parse_cose_sign1(cose_bytes: &[u8]) -> Result<CoseSign1> {
    CoseSign1::from_tagged_slice(cose_bytes)
        .or_else(|_| CoseSign1::from_slice(cose_bytes))
        .map_err(cose_err)
}

/// Pulls the certificate chain out of the `x5chain` header, leaf first.
pub(crate) fn get_sign_cert_chain(sign1: &CoseSign1) -> Result<Vec<Vec<u8>>> {
    let x5chain = Label::Int(iana::HeaderParameter::X5Chain as i64);
    let value = sign1
        .protected
        .header
        .rest
        .iter()
        .chain(sign1.unprotected.rest.iter())
        .find(|(label, _)| *label == x5chain)
        .map(|(_, value)| value)
        .ok_or_else(|| Error::CoseSignature("x5chain header is missing".to_string()))?;

    match value {
        Value::Bytes(der) => Ok(vec![der.clone()]),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| match entry {
                Value::Bytes(der) => Ok(der.clone()),
                _ => Err(Error::CoseSignature("bad x5chain entry".to_string())),
            })
            .collect(),
        _ => Err(Error::CoseSignature("bad x5chain header".to_string())),
    }
}

fn get_timestamp_token(sign1: &CoseSign1) -> Option<Vec<u8>> {
    sign1
        .unprotected
        .rest
        .iter()
        .find(|(label, _)| *label == Label::Text(crate::cose_sign::SIGTST_HEADER.to_string()))
        .and_then(|(_, value)| match value {
            Value::Bytes(token) => Some(token.clone()),
            _ => None,
        })
}

fn verifying_key_from_spki(spki: &[u8]) -> Result<VerifyingKey> {
    let key: [u8; 32] = spki
        .try_into()
        .map_err(|_| Error::CertificateChainInvalid(ChainError::UnsupportedKeyAlgorithm))?;
    VerifyingKey::from_bytes(&key)
        .map_err(|_| Error::CertificateChainInvalid(ChainError::UnsupportedKeyAlgorithm))
}

// verifies the DER signature on `child` against `issuer`'s public key
fn verify_issuer_signature(child: &X509Certificate, issuer: &X509Certificate) -> Result<()> {
    if child.signature_algorithm.algorithm != ED25519_OID {
        return Err(Error::CertificateChainInvalid(
            ChainError::UnsupportedKeyAlgorithm,
        ));
    }
    let vk = verifying_key_from_spki(&issuer.tbs_certificate.subject_pki.subject_public_key.data)?;
    let sig_bytes: [u8; 64] = child
        .signature_value
        .data
        .as_ref()
        .try_into()
        .map_err(|_| Error::CertificateChainInvalid(ChainError::BadIssuerSignature))?;
    vk.verify_strict(
        child.tbs_certificate.as_ref(),
        &Signature::from_bytes(&sig_bytes),
    )
    .map_err(|_| Error::CertificateChainInvalid(ChainError::BadIssuerSignature))
}

/// Walks the chain leaf first: linkage, issuer signatures, validity at
/// signing time, leaf extensions and anchoring. Every problem found is
/// returned, not just the first.
pub(crate) fn validate_chain(
    certs_der: &[Vec<u8>],
    signing_time: DateTime<Utc>,
    th: &dyn TrustHandlerConfig,
) -> Vec<ChainError> {
    let mut findings = Vec::new();

    if certs_der.is_empty() {
        return vec![ChainError::EmptyChain];
    }

    let mut certs = Vec::new();
    for der in certs_der {
        match X509Certificate::from_der(der) {
            Ok((_, cert)) => certs.push(cert),
            Err(_) => return vec![ChainError::CertificateMalformed],
        }
    }

    // leaf must be an end entity with an allowed EKU
    let leaf = &certs[0];
    let leaf_is_ca = matches!(
        leaf.basic_constraints(),
        Ok(Some(bc)) if bc.value.ca
    );
    let leaf_eku_ok = matches!(
        leaf.extended_key_usage(),
        Ok(Some(eku)) if has_allowed_oid(eku.value, &th.get_auth_oids()).is_some()
    );
    if leaf_is_ca || !leaf_eku_ok {
        findings.push(ChainError::BadExtensions);
    }

    // every certificate must cover the signing time
    match ASN1Time::from_timestamp(signing_time.timestamp()) {
        Ok(at) => {
            if certs.iter().any(|cert| !cert.validity().is_valid_at(at)) {
                findings.push(ChainError::Expired);
            }
        }
        Err(_) => findings.push(ChainError::Expired),
    }

    // each certificate is issued by its successor
    for pair in certs.windows(2) {
        if pair[0].tbs_certificate.issuer.as_raw() != pair[1].tbs_certificate.subject.as_raw() {
            findings.push(ChainError::BrokenChain(
                pair[0].tbs_certificate.subject.to_string(),
            ));
        } else if verify_issuer_signature(&pair[0], &pair[1]).is_err() {
            findings.push(ChainError::BadIssuerSignature);
        }
    }

    // the last certificate must be a configured anchor, or be issued
    // and signed by one
    let last = match certs.last() {
        Some(c) => c,
        None => return findings,
    };
    let last_der = match certs_der.last() {
        Some(d) => d,
        None => return findings,
    };
    let anchors = th.get_anchors();
    let anchored = anchors.iter().any(|anchor_der| {
        if anchor_der == last_der {
            return true;
        }
        match X509Certificate::from_der(anchor_der) {
            Ok((_, anchor)) => {
                last.tbs_certificate.issuer.as_raw() == anchor.tbs_certificate.subject.as_raw()
                    && verify_issuer_signature(last, &anchor).is_ok()
            }
            Err(_) => false,
        }
    });
    if !anchored {
        findings.push(ChainError::UntrustedRoot);
    }

    findings
}

fn chain_error_status(err: &ChainError) -> &'static str {
    match err {
        ChainError::UntrustedRoot => validation_status::SIGNING_CREDENTIAL_UNTRUSTED,
        ChainError::Expired => validation_status::SIGNING_CREDENTIAL_EXPIRED,
        _ => validation_status::SIGNING_CREDENTIAL_INVALID,
    }
}

/// Verifies a COSE_Sign1 claim signature over detached `data`.
///
/// All findings, pass and fail, go to `validation_log`. An `Err` return
/// means the signature could not be evaluated at all; the failure is
/// logged before returning.
pub(crate) fn verify_cose(
    cose_bytes: &[u8],
    data: &[u8],
    sig_label: &str,
    th: &dyn TrustHandlerConfig,
    validation_log: &mut impl StatusTracker,
) -> Result<CertificateInfo> {
    let sign1 = match parse_cose_sign1(cose_bytes) {
        Ok(sign1) => sign1,
        Err(e) => {
            let item = log_item!(sig_label, "could not parse signature box", COSE_SIGN1_FN)
                .error(Error::CoseSignature("malformed COSE_Sign1".to_string()))
                .validation_status(validation_status::CLAIM_SIGNATURE_MISMATCH);
            validation_log.log(item, None)?;
            return Err(e);
        }
    };

    if sign1.protected.header.alg
        != Some(coset::Algorithm::Assigned(iana::Algorithm::EdDSA))
    {
        let item = log_item!(sig_label, "unsupported signature algorithm", COSE_SIGN1_FN)
            .error(Error::UnsupportedSigningAlgorithm("not EdDSA".to_string()))
            .validation_status(validation_status::SIGNING_CREDENTIAL_INVALID);
        validation_log.log(item, None)?;
        return Err(Error::UnsupportedSigningAlgorithm("not EdDSA".to_string()));
    }

    let certs_der = match get_sign_cert_chain(&sign1) {
        Ok(certs) if !certs.is_empty() => certs,
        _ => {
            let item = log_item!(sig_label, "signature carries no certificates", COSE_SIGN1_FN)
                .error(Error::CertificateChainInvalid(ChainError::EmptyChain))
                .validation_status(validation_status::SIGNING_CREDENTIAL_INVALID);
            validation_log.log(item, None)?;
            return Err(Error::CertificateChainInvalid(ChainError::EmptyChain));
        }
    };

    let leaf = match X509Certificate::from_der(&certs_der[0]) {
        Ok((_, cert)) => cert,
        Err(_) => {
            let item = log_item!(sig_label, "signing certificate unparseable", COSE_SIGN1_FN)
                .error(Error::CertificateChainInvalid(ChainError::CertificateMalformed))
                .validation_status(validation_status::SIGNING_CREDENTIAL_INVALID);
            validation_log.log(item, None)?;
            return Err(Error::CertificateChainInvalid(
                ChainError::CertificateMalformed,
            ));
        }
    };

    // the claim signature itself
    let sig_valid = match verifying_key_from_spki(
        &leaf.tbs_certificate.subject_pki.subject_public_key.data,
    ) {
        Ok(vk) => sign1
            .verify_detached_signature(data, b"", |sig, signed| {
                let sig: [u8; 64] = sig.try_into().map_err(|_| ())?;
                vk.verify_strict(signed, &Signature::from_bytes(&sig))
                    .map_err(|_| ())
            })
            .is_ok(),
        Err(_) => false,
    };

    if sig_valid {
        validation_log.log_silent(
            log_item!(sig_label, "claim signature valid", COSE_SIGN1_FN)
                .validation_status(validation_status::CLAIM_SIGNATURE_VALIDATED),
        );
    } else {
        let item = log_item!(sig_label, "claim signature mismatch", COSE_SIGN1_FN)
            .error(Error::CoseSignature("signature did not verify".to_string()))
            .validation_status(validation_status::CLAIM_SIGNATURE_MISMATCH);
        validation_log.log(item, None)?;
    }

    // time stamp, when present, fixes the time the chain is checked at
    let mut signing_time = None;
    if let Some(token) = get_timestamp_token(&sign1) {
        if time_stamp::token_covers_message(&token, &sign1.signature) {
            signing_time = time_stamp::gen_time_from_token(&token);
            match signing_time {
                Some(gen_time) => {
                    let leaf_valid_at = ASN1Time::from_timestamp(gen_time.timestamp())
                        .map(|at| leaf.validity().is_valid_at(at))
                        .unwrap_or(false);
                    if leaf_valid_at {
                        validation_log.log_silent(
                            log_item!(sig_label, "time stamp valid", COSE_SIGN1_FN)
                                .validation_status(validation_status::TIMESTAMP_VALIDATED),
                        );
                    } else {
                        let item = log_item!(
                            sig_label,
                            "time stamp outside certificate validity",
                            COSE_SIGN1_FN
                        )
                        .error(Error::CertificateChainInvalid(ChainError::Expired))
                        .validation_status(validation_status::TIMESTAMP_OUTSIDE_VALIDITY);
                        validation_log.log(item, None)?;
                    }
                }
                None => {
                    let item =
                        log_item!(sig_label, "time stamp token unreadable", COSE_SIGN1_FN)
                            .error(Error::CoseSignature("bad time stamp token".to_string()))
                            .validation_status(validation_status::TIMESTAMP_MISMATCH);
                    validation_log.log(item, None)?;
                }
            }
        } else {
            let item = log_item!(
                sig_label,
                "time stamp does not cover the signature",
                COSE_SIGN1_FN
            )
            .error(Error::CoseSignature("time stamp mismatch".to_string()))
            .validation_status(validation_status::TIMESTAMP_MISMATCH);
            validation_log.log(item, None)?;
        }
    }

    // without a trusted time stamp the chain is checked at current time
    let chain_time = signing_time.unwrap_or_else(Utc::now);
    let chain_findings = validate_chain(&certs_der, chain_time, th);
    if chain_findings.is_empty() {
        validation_log.log_silent(
            log_item!(sig_label, "signing credential trusted", COSE_SIGN1_FN)
                .validation_status(validation_status::SIGNING_CREDENTIAL_TRUSTED),
        );
    } else {
        for finding in chain_findings {
            let status = chain_error_status(&finding);
            let item = log_item!(sig_label, "signing credential rejected", COSE_SIGN1_FN)
                .error(Error::CertificateChainInvalid(finding))
                .validation_status(status);
            validation_log.log(item, None)?;
        }
    }

    let info = CertificateInfo {
        common_name: leaf
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .map(|cn| cn.to_string()),
        issuer_org: leaf
            .issuer()
            .iter_organization()
            .next()
            .and_then(|o| o.as_str().ok())
            .map(|o| o.to_string()),
        date: signing_time,
    };
    Ok(info)
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::{
        cose_sign::sign_claim,
        create_signer::{self, CertSubject},
        status_tracker::DetailedStatusTracker,
        trust_handler::InMemoryTrustHandler,
        validation_status,
    };

    const SIG_LABEL: &str = "self#jumbf=/c2pa/urn:uuid:test/c2pa.signature";

    fn signed_claim() -> (Vec<u8>, Vec<u8>, create_signer::SigningIdentity) {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = create_signer::from_identity(&identity, 4096, None).unwrap();
        let claim = b"claim bytes for verification".to_vec();
        let cose = sign_claim(&claim, signer.as_ref(), 4096, false).unwrap();
        (cose, claim, identity)
    }

    fn trust_for(identity: &create_signer::SigningIdentity) -> InMemoryTrustHandler {
        let mut th = InMemoryTrustHandler::new();
        th.load_trust_anchors_from_data(identity.cert_chain_der.last().unwrap())
            .unwrap();
        th
    }

    fn failure_codes(tracker: &DetailedStatusTracker) -> Vec<String> {
        validation_status::status_for_store(tracker)
            .iter()
            .map(|s| s.code().to_string())
            .collect()
    }

    #[test]
    fn good_signature_and_chain() {
        let (cose, claim, identity) = signed_claim();
        let th = trust_for(&identity);
        let mut log = DetailedStatusTracker::new();

        let info = verify_cose(&cose, &claim, SIG_LABEL, &th, &mut log).unwrap();
        assert!(failure_codes(&log).is_empty());
        assert_eq!(info.common_name.as_deref(), Some("C2PA Signer"));
    }

    #[test]
    fn tampered_claim_fails_signature() {
        let (cose, mut claim, identity) = signed_claim();
        claim[0] ^= 0xFF;
        let th = trust_for(&identity);
        let mut log = DetailedStatusTracker::new();

        verify_cose(&cose, &claim, SIG_LABEL, &th, &mut log).unwrap();
        assert!(failure_codes(&log)
            .contains(&validation_status::CLAIM_SIGNATURE_MISMATCH.to_string()));
    }

    #[test]
    fn unknown_root_is_untrusted() {
        let (cose, claim, _identity) = signed_claim();
        // anchors from a different issuance
        let other = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        let th = trust_for(&other);
        let mut log = DetailedStatusTracker::new();

        verify_cose(&cose, &claim, SIG_LABEL, &th, &mut log).unwrap();
        assert!(failure_codes(&log)
            .contains(&validation_status::SIGNING_CREDENTIAL_UNTRUSTED.to_string()));
    }

    #[test]
    fn no_anchors_means_untrusted() {
        let (cose, claim, _identity) = signed_claim();
        let th = InMemoryTrustHandler::new();
        let mut log = DetailedStatusTracker::new();

        verify_cose(&cose, &claim, SIG_LABEL, &th, &mut log).unwrap();
        assert!(failure_codes(&log)
            .contains(&validation_status::SIGNING_CREDENTIAL_UNTRUSTED.to_string()));
    }

    #[test]
    fn expired_credential_reported() {
        let identity = create_signer::issue_signing_identity_with_validity(
            &CertSubject::default(),
            (2020, 1, 1),
            (2021, 1, 1),
        )
        .unwrap();
        let signer = create_signer::from_identity(&identity, 4096, None).unwrap();
        let claim = b"claim".to_vec();
        let cose = sign_claim(&claim, signer.as_ref(), 4096, false).unwrap();
        let th = trust_for(&identity);
        let mut log = DetailedStatusTracker::new();

        verify_cose(&cose, &claim, SIG_LABEL, &th, &mut log).unwrap();
        assert!(failure_codes(&log)
            .contains(&validation_status::SIGNING_CREDENTIAL_EXPIRED.to_string()));
    }

    #[test]
    fn chain_findings_accumulate() {
        let identity = create_signer::issue_signing_identity(&CertSubject::default()).unwrap();
        // leaf alone, no issuer: broken anchoring
        let findings = validate_chain(
            &identity.cert_chain_der[..1].to_vec(),
            Utc::now(),
            &InMemoryTrustHandler::new(),
        );
        assert!(findings.contains(&ChainError::UntrustedRoot));

        assert_eq!(
            validate_chain(&[], Utc::now(), &InMemoryTrustHandler::new()),
            vec![ChainError::EmptyChain]
        );
    }

    #[test]
    fn garbage_cose_is_an_error() {
        let th = InMemoryTrustHandler::new();
        let mut log = DetailedStatusTracker::new();
        assert!(verify_cose(&[0u8; 16], b"claim", SIG_LABEL, &th, &mut log).is_err());
        assert!(!failure_codes(&log).is_empty());
    }
}
