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

//! Issues signing credentials and builds [`Signer`] instances from
//! them. Issuance produces a fresh CA and an Ed25519 leaf suitable for
//! claim signing, chain ordered leaf first.

use ed25519_dalek::{pkcs8::DecodePrivateKey, Signer as _, SigningKey};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyPair, KeyUsagePurpose, PKCS_ED25519,
};

use crate::{
    error::{Error, Result},
    signer::Signer,
    signing_alg::SigningAlg,
};

/// Subject naming for issued certificates.
#[derive(Debug, Clone)]
pub struct CertSubject {
    pub country: String,
    pub state: String,
    pub locality: String,
    pub org: String,
    pub org_unit: String,
    pub common_name: String,
}

impl Default for CertSubject {
    fn default() -> Self {
        CertSubject {
            country: "US".to_string(),
            state: "CA".to_string(),
            locality: "Somewhere".to_string(),
            org: "C2PA Test Signing Cert".to_string(),
            org_unit: "FOR TESTING_ONLY".to_string(),
            common_name: "C2PA Signer".to_string(),
        }
    }
}

/// A private key and its certificate chain, ready to sign claims.
///
/// The chain is leaf first, ending with the self-signed CA. The key is
/// PKCS #8 DER.
#[derive(Clone)]
pub struct SigningIdentity {
    pub alg: SigningAlg,
    pub private_key_der: Vec<u8>,
    pub cert_chain_der: Vec<Vec<u8>>,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("alg", &self.alg)
            .field("chain_len", &self.cert_chain_der.len())
            .finish()
    }
}

fn gen_err(e: rcgen::Error) -> Error {
    Error::CertificateGeneration(e.to_string())
}

fn distinguished_name(subject: &CertSubject, common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CountryName, subject.country.clone());
    dn.push(DnType::StateOrProvinceName, subject.state.clone());
    dn.push(DnType::LocalityName, subject.locality.clone());
    dn.push(DnType::OrganizationName, subject.org.clone());
    dn.push(DnType::OrganizationalUnitName, subject.org_unit.clone());
    dn.push(DnType::CommonName, common_name.to_string());
    dn
}

/// Issues an Ed25519 signing identity valid between the given dates
/// (year, month, day).
pub fn issue_signing_identity_with_validity(
    subject: &CertSubject,
    not_before: (i32, u8, u8),
    not_after: (i32, u8, u8),
) -> Result<SigningIdentity> {
    let ca_key = KeyPair::generate_for(&PKCS_ED25519).map_err(gen_err)?;
    let leaf_key = KeyPair::generate_for(&PKCS_ED25519).map_err(gen_err)?;

    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name =
        distinguished_name(subject, &format!("{} CA", subject.common_name));
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::CrlSign,
    ];
    ca_params.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    ca_params.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    let ca_cert = ca_params.self_signed(&ca_key).map_err(gen_err)?;

    let mut leaf_params = CertificateParams::default();
    leaf_params.distinguished_name = distinguished_name(subject, &subject.common_name);
    leaf_params.is_ca = IsCa::ExplicitNoCa;
    leaf_params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::ContentCommitment,
    ];
    leaf_params.extended_key_usages = vec![
        ExtendedKeyUsagePurpose::ClientAuth,
        ExtendedKeyUsagePurpose::EmailProtection,
    ];
    leaf_params.not_before = rcgen::date_time_ymd(not_before.0, not_before.1, not_before.2);
    leaf_params.not_after = rcgen::date_time_ymd(not_after.0, not_after.1, not_after.2);
    let leaf_cert = leaf_params
        .signed_by(&leaf_key, &ca_cert, &ca_key)
        .map_err(gen_err)?;

    Ok(SigningIdentity {
        alg: SigningAlg::Ed25519,
        private_key_der: leaf_key.serialize_der(),
        cert_chain_der: vec![leaf_cert.der().to_vec(), ca_cert.der().to_vec()],
    })
}

/// Issues an Ed25519 signing identity with a ten year validity window.
pub fn issue_signing_identity(subject: &CertSubject) -> Result<SigningIdentity> {
    issue_signing_identity_with_validity(subject, (2024, 1, 1), (2034, 1, 1))
}

/// A [`Signer`] backed by an in-memory Ed25519 key.
pub(crate) struct LocalSigner {
    signing_key: SigningKey,
    cert_chain_der: Vec<Vec<u8>>,
    reserve_size: usize,
    tsa_url: Option<String>,
}

impl Signer for LocalSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }

    fn alg(&self) -> SigningAlg {
        SigningAlg::Ed25519
    }

    fn certs(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.cert_chain_der.clone())
    }

    fn reserve_size(&self) -> usize {
        self.reserve_size
    }

    fn time_authority_url(&self) -> Option<String> {
        self.tsa_url.clone()
    }
}

/// Creates a signer from a [`SigningIdentity`].
pub fn from_identity(
    identity: &SigningIdentity,
    reserve_size: usize,
    tsa_url: Option<String>,
) -> Result<Box<dyn Signer>> {
    if identity.alg != SigningAlg::Ed25519 {
        return Err(Error::UnsupportedSigningAlgorithm(identity.alg.to_string()));
    }
    let signing_key = SigningKey::from_pkcs8_der(&identity.private_key_der)
        .map_err(|e| Error::OtherError(format!("bad signing key: {e}")))?;

    Ok(Box::new(LocalSigner {
        signing_key,
        cert_chain_der: identity.cert_chain_der.clone(),
        reserve_size,
        tsa_url,
    }))
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use ed25519_dalek::{Verifier, VerifyingKey};
    use x509_parser::prelude::*;

    use super::*;

    #[test]
    fn issued_chain_is_leaf_first_and_linked() {
        let identity = issue_signing_identity(&CertSubject::default()).unwrap();
        assert_eq!(identity.cert_chain_der.len(), 2);

        let (_, leaf) = X509Certificate::from_der(&identity.cert_chain_der[0]).unwrap();
        let (_, ca) = X509Certificate::from_der(&identity.cert_chain_der[1]).unwrap();

        assert_eq!(
            leaf.tbs_certificate.issuer.as_raw(),
            ca.tbs_certificate.subject.as_raw()
        );
        assert!(ca.basic_constraints().unwrap().map(|bc| bc.value.ca).unwrap_or(false));
        assert!(!leaf.basic_constraints().unwrap().map(|bc| bc.value.ca).unwrap_or(false));

        let eku = leaf.extended_key_usage().unwrap().unwrap();
        assert!(eku.value.email_protection);
        assert!(eku.value.client_auth);
    }

    #[test]
    fn local_signer_signature_verifies() {
        let identity = issue_signing_identity(&CertSubject::default()).unwrap();
        let signer = from_identity(&identity, 10240, None).unwrap();

        let sig = signer.sign(b"claim bytes").unwrap();
        assert_eq!(sig.len(), 64);

        let (_, leaf) = X509Certificate::from_der(&identity.cert_chain_der[0]).unwrap();
        let spki = &leaf.tbs_certificate.subject_pki.subject_public_key.data;
        let vk =
            VerifyingKey::from_bytes(spki.as_ref().try_into().unwrap()).unwrap();
        let sig_bytes: [u8; 64] = sig.as_slice().try_into().unwrap();
        vk.verify(b"claim bytes", &ed25519_dalek::Signature::from_bytes(&sig_bytes))
            .unwrap();
    }

    #[test]
    fn expired_window_is_respected() {
        let identity = issue_signing_identity_with_validity(
            &CertSubject::default(),
            (2020, 1, 1),
            (2021, 1, 1),
        )
        .unwrap();
        let (_, leaf) = X509Certificate::from_der(&identity.cert_chain_der[0]).unwrap();
        let t = ASN1Time::from_timestamp(1_700_000_000).unwrap(); // 2023
        assert!(!leaf.validity().is_valid_at(t));
    }
}
