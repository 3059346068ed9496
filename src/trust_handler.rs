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

//! Trust anchor storage and the extended key usage policy applied to
//! claim signing certificates.

use std::str::FromStr;

use asn1_rs::{oid, Oid};
use x509_parser::extensions::ExtendedKeyUsage;

use crate::error::{Error, Result};

pub(crate) static EMAIL_PROTECTION_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .3 .4);
pub(crate) static TIMESTAMPING_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .3 .8);
pub(crate) static OCSP_SIGNING_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .3 .9);
pub(crate) static DOCUMENT_SIGNING_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .3 .36);
pub(crate) static CLIENT_AUTH_OID: Oid<'static> = oid!(1.3.6 .1 .5 .5 .7 .3 .2);

/// A `TrustHandlerConfig` provides the trust anchors and the allowed
/// EKUs used when validating a claim signing credential.
pub trait TrustHandlerConfig: Sync + Send {
    fn new() -> Self
    where
        Self: Sized;

    /// Loads trust anchors from PEM text or a single DER certificate,
    /// appending to the current set.
    fn load_trust_anchors_from_data(&mut self, trust_data: &[u8]) -> Result<()>;

    /// Loads additional allowed EKUs, one dotted OID per line. Lines
    /// that do not parse as OIDs are ignored.
    fn load_configuration(&mut self, config_data: &[u8]) -> Result<()>;

    /// The configured anchors as DER.
    fn get_anchors(&self) -> Vec<Vec<u8>>;

    /// The EKUs a claim signing leaf may carry.
    fn get_auth_oids(&self) -> Vec<Oid<'static>>;

    fn clear(&mut self);
}

/// Checks a certificate's EKU extension against the allowed set,
/// returning the first allowed OID it carries.
pub(crate) fn has_allowed_oid<'a>(
    eku: &ExtendedKeyUsage,
    allowed_ekus: &'a [Oid<'a>],
) -> Option<&'a Oid<'a>> {
    if eku.email_protection {
        if let Some(oid) = allowed_ekus.iter().find(|o| **o == EMAIL_PROTECTION_OID) {
            return Some(oid);
        }
    }
    if eku.client_auth {
        if let Some(oid) = allowed_ekus.iter().find(|o| **o == CLIENT_AUTH_OID) {
            return Some(oid);
        }
    }
    if eku.time_stamping {
        if let Some(oid) = allowed_ekus.iter().find(|o| **o == TIMESTAMPING_OID) {
            return Some(oid);
        }
    }
    if eku.ocsp_signing {
        if let Some(oid) = allowed_ekus.iter().find(|o| **o == OCSP_SIGNING_OID) {
            return Some(oid);
        }
    }
    eku.other
        .iter()
        .find_map(|oid| allowed_ekus.iter().find(|allowed| *allowed == oid))
}

/// Extracts DER certificates from PEM text, ignoring everything outside
/// the `BEGIN CERTIFICATE` / `END CERTIFICATE` pairs.
pub(crate) fn load_trust_from_pem(trust_data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut certs = Vec::new();
    for pem_result in x509_parser::pem::Pem::iter_from_buffer(trust_data) {
        let pem = pem_result
            .map_err(|e| Error::OtherError(format!("bad trust anchor pem: {e}")))?;
        if pem.label == "CERTIFICATE" {
            certs.push(pem.contents);
        }
    }
    Ok(certs)
}

/// In-memory trust configuration. Anchors are supplied by the caller;
/// nothing is trusted implicitly.
pub struct InMemoryTrustHandler {
    anchors: Vec<Vec<u8>>,
    extra_oids: Vec<Oid<'static>>,
}

impl std::fmt::Debug for InMemoryTrustHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTrustHandler")
            .field("anchors", &self.anchors.len())
            .finish()
    }
}

impl TrustHandlerConfig for InMemoryTrustHandler {
    fn new() -> Self {
        InMemoryTrustHandler {
            anchors: Vec::new(),
            extra_oids: Vec::new(),
        }
    }

    fn load_trust_anchors_from_data(&mut self, trust_data: &[u8]) -> Result<()> {
        if trust_data.starts_with(b"-----BEGIN") {
            self.anchors.extend(load_trust_from_pem(trust_data)?);
        } else {
            self.anchors.push(trust_data.to_vec());
        }
        Ok(())
    }

    fn load_configuration(&mut self, config_data: &[u8]) -> Result<()> {
        let text = std::str::from_utf8(config_data)
            .map_err(|_| Error::OtherError("eku configuration is not utf-8".to_string()))?;
        for line in text.lines() {
            if let Ok(oid) = Oid::from_str(line.trim()) {
                self.extra_oids.push(oid);
            }
        }
        Ok(())
    }

    fn get_anchors(&self) -> Vec<Vec<u8>> {
        self.anchors.clone()
    }

    fn get_auth_oids(&self) -> Vec<Oid<'static>> {
        let mut oids = vec![
            EMAIL_PROTECTION_OID.to_owned(),
            DOCUMENT_SIGNING_OID.to_owned(),
            CLIENT_AUTH_OID.to_owned(),
        ];
        oids.extend(self.extra_oids.iter().cloned());
        oids
    }

    fn clear(&mut self) {
        self.anchors.clear();
        self.extra_oids.clear();
    }
}
