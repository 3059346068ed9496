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

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    assertion::{Assertion, AssertionBase, AssertionData},
    assertions::{labels as assertion_labels, DataHash},
    error::{Error, Result},
    hashed_uri::HashedUri,
    jumbf::{
        boxes::{
            uuid_from_hex, DataBox, DescriptionBox, SuperBox, JUMBF_CBOR_UUID,
            JUMBF_EMBEDDED_FILE_UUID, JUMBF_JSON_UUID,
        },
        labels,
    },
    utils::hash_utils::hash_by_alg,
};

const DEFAULT_CLAIM_ALG: &str = "sha256";
const SALT_LEN: usize = 16;

/// An assertion bound into a claim: the decoded assertion plus the
/// digest of its serialized superbox, its instance number and the salt
/// carried in its description box.
#[derive(Clone, Debug)]
pub(crate) struct ClaimAssertion {
    assertion: Assertion,
    instance: usize,
    hash: Vec<u8>,
    salt: Option<Vec<u8>>,
}

impl ClaimAssertion {
    pub fn new(assertion: Assertion, instance: usize, hash: Vec<u8>, salt: Option<Vec<u8>>) -> Self {
        ClaimAssertion {
            assertion,
            instance,
            hash,
            salt,
        }
    }

    pub fn assertion(&self) -> &Assertion {
        &self.assertion
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn salt(&self) -> Option<&Vec<u8>> {
        self.salt.as_ref()
    }

    /// The in-store label. The second and later instances of the same
    /// assertion label carry a `__{n}` suffix, n counting from 2.
    pub fn label(&self) -> String {
        let label = self.assertion.label();
        if self.instance > 1 {
            format!("{}__{}", label, self.instance)
        } else {
            label
        }
    }

    pub fn label_root(&self) -> String {
        self.assertion.label_root()
    }
}

/// A claim: the central data structure of a manifest, binding the
/// assertion store to the signature through hashed references.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Claim {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    #[serde(rename = "instanceID")]
    instance_id: String,

    #[serde(rename = "dc:format")]
    format: String,

    #[serde(rename = "dc:title", skip_serializing_if = "Option::is_none")]
    title: Option<String>,

    pub claim_generator: String,

    signature: String,

    assertions: Vec<HashedUri>,

    #[serde(skip_serializing_if = "Option::is_none")]
    redacted_assertions: Option<Vec<String>>,

    #[serde(skip)]
    label: String,

    #[serde(skip)]
    assertion_store: Vec<ClaimAssertion>,

    #[serde(skip)]
    signature_val: Vec<u8>,

    // exact CBOR bytes this claim was parsed from, when restored
    #[serde(skip)]
    original_bytes: Option<Vec<u8>>,
}

impl Claim {
    /// Creates a new claim with a fresh `urn:uuid` label and instance
    /// ID.
    pub fn new(claim_generator: &str, format: &str, title: Option<&str>) -> Self {
        let label = format!("urn:uuid:{}", Uuid::new_v4());
        Claim {
            alg: Some(DEFAULT_CLAIM_ALG.to_string()),
            instance_id: format!("xmp:iid:{}", Uuid::new_v4()),
            format: format.to_string(),
            title: title.map(|t| t.to_string()),
            claim_generator: claim_generator.to_string(),
            signature: labels::to_signature_uri(&label),
            assertions: Vec::new(),
            redacted_assertions: None,
            label,
            assertion_store: Vec::new(),
            signature_val: Vec::new(),
            original_bytes: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn alg(&self) -> &str {
        self.alg.as_deref().unwrap_or(DEFAULT_CLAIM_ALG)
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn signature_uri(&self) -> &str {
        &self.signature
    }

    pub fn signature_val(&self) -> &[u8] {
        &self.signature_val
    }

    pub fn set_signature_val(&mut self, signature: Vec<u8>) {
        self.signature_val = signature;
    }

    pub fn assertions(&self) -> &[HashedUri] {
        &self.assertions
    }

    pub fn claim_assertion_store(&self) -> &[ClaimAssertion] {
        &self.assertion_store
    }

    /// Adds an assertion to this claim's assertion store, recording a
    /// salted, hashed reference to it in the claim body.
    pub fn add_assertion(&mut self, assertion: &Assertion) -> Result<HashedUri> {
        self.original_bytes = None;
        let instance = self.next_instance(&assertion.label());
        let salt = generate_salt();

        let ca = ClaimAssertion::new(assertion.clone(), instance, Vec::new(), Some(salt));
        let sb = assertion_to_box(&ca)?;
        let hash = hash_by_alg(self.alg(), &sb.to_vec()?)?;

        let uri = labels::to_assertion_uri(&self.label, &ca.label());
        let hashed_uri = HashedUri::new(uri, None, &hash);

        self.assertions.push(hashed_uri.clone());
        self.assertion_store
            .push(ClaimAssertion::new(ca.assertion, instance, hash, ca.salt));

        Ok(hashed_uri)
    }

    // next free instance ordinal for a label (1 when unused)
    fn next_instance(&self, label: &str) -> usize {
        self.assertion_store
            .iter()
            .filter(|ca| ca.assertion.label() == label)
            .count()
            + 1
    }

    /// Restores an assertion parsed back out of JUMBF, keeping the
    /// box digest that was computed from the stored bytes.
    pub fn put_restored_assertion(
        &mut self,
        assertion: Assertion,
        instance: usize,
        hash: Vec<u8>,
        salt: Option<Vec<u8>>,
    ) {
        self.assertion_store
            .push(ClaimAssertion::new(assertion, instance, hash, salt));
    }

    /// Finds an assertion in the store by its in-store label.
    pub fn get_claim_assertion(&self, label: &str) -> Option<&ClaimAssertion> {
        self.assertion_store.iter().find(|ca| ca.label() == label)
    }

    /// All successfully decoded data hash assertions.
    pub fn data_hash_assertions(&self) -> Vec<(String, DataHash)> {
        self.assertion_store
            .iter()
            .filter(|ca| ca.label_root() == assertion_labels::DATA_HASH)
            .filter_map(|ca| {
                DataHash::from_assertion(ca.assertion())
                    .ok()
                    .map(|dh| (ca.label(), dh))
            })
            .collect()
    }

    /// Replaces the payload of the hard binding assertion and refreshes
    /// its digest in the claim body.
    pub fn update_data_hash(&mut self, data_hash: &DataHash) -> Result<()> {
        self.original_bytes = None;
        let alg = self.alg().to_string();

        let ca = self
            .assertion_store
            .iter_mut()
            .find(|ca| ca.label_root() == assertion_labels::DATA_HASH)
            .ok_or(Error::JumbfBoxNotFound)?;

        ca.assertion = data_hash.to_assertion()?;

        let refreshed = ClaimAssertion::new(
            ca.assertion.clone(),
            ca.instance,
            Vec::new(),
            ca.salt.clone(),
        );
        let sb = assertion_to_box(&refreshed)?;
        let hash = hash_by_alg(&alg, &sb.to_vec()?)?;
        ca.hash = hash.clone();

        let uri = labels::to_assertion_uri(&self.label, &refreshed.label());
        let entry = self
            .assertions
            .iter_mut()
            .find(|hu| hu.url() == uri)
            .ok_or(Error::AssertionMissing { url: uri })?;
        entry.update_hash(hash);

        Ok(())
    }

    /// The claim body CBOR, the exact bytes that get signed. A claim
    /// restored from JUMBF returns the stored bytes unchanged, even
    /// when they carry fields this model does not know, so signature
    /// checks never depend on a byte-exact re-encoding.
    pub fn data(&self) -> Result<Vec<u8>> {
        match &self.original_bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => serde_cbor::to_vec(self).map_err(|_| Error::ClaimEncoding),
        }
    }

    /// Rebuilds a claim from stored CBOR bytes plus the label its
    /// manifest superbox carried.
    pub fn from_data(label: &str, data: &[u8]) -> Result<Self> {
        let mut claim: Claim = serde_cbor::from_slice(data).map_err(|_| Error::ClaimDecoding)?;
        claim.label = label.to_string();
        claim.original_bytes = Some(data.to_vec());
        Ok(claim)
    }
}

/// Builds the JUMBF superbox for one assertion. The same function is
/// used when hashing an assertion at add time and when serializing the
/// assertion store, so the digests always cover identical bytes.
pub(crate) fn assertion_to_box(ca: &ClaimAssertion) -> Result<SuperBox> {
    let assertion = ca.assertion();
    let label = ca.label();

    let mut sb = match assertion.decode_data() {
        AssertionData::Json(json) => {
            let mut sb = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(JUMBF_JSON_UUID)?,
                Some(label),
            ));
            sb.add_data_box(DataBox::new(b"json", json.as_bytes().to_vec()));
            sb
        }
        AssertionData::Cbor(cbor) => {
            let mut sb = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(JUMBF_CBOR_UUID)?,
                Some(label),
            ));
            sb.add_data_box(DataBox::new(b"cbor", cbor.clone()));
            sb
        }
        AssertionData::Binary(data) => {
            let mut sb = SuperBox::new(DescriptionBox::new(
                uuid_from_hex(JUMBF_EMBEDDED_FILE_UUID)?,
                Some(label),
            ));
            // media type descriptor box then the raw payload
            let mut bfdb = vec![0u8]; // toggles: no file name
            bfdb.extend_from_slice(assertion.content_type().as_bytes());
            bfdb.push(0);
            sb.add_data_box(DataBox::new(b"bfdb", bfdb));
            sb.add_data_box(DataBox::new(b"bidb", data.clone()));
            sb
        }
    };

    if let Some(salt) = ca.salt() {
        sb.desc_mut().set_salt(salt.clone());
    }

    Ok(sb)
}

/// Rebuilds an [`Assertion`] from a stored assertion superbox.
pub(crate) fn assertion_from_box(sb: &SuperBox) -> Result<(Assertion, usize)> {
    let label = sb
        .desc()
        .label()
        .ok_or_else(|| Error::JumbfBoxMalformed("assertion box without label".to_string()))?;

    // strip the in-store instance suffix
    let (base_label, instance) = match label.rsplit_once("__") {
        Some((base, num)) => match num.parse::<usize>() {
            Ok(n) => (base, n),
            Err(_) => (label, 1),
        },
        None => (label, 1),
    };

    let uuid = sb.desc().uuid();

    let assertion = if uuid == &uuid_from_hex(JUMBF_JSON_UUID)? {
        let db = sb.data_box_of_type(b"json").ok_or(Error::JumbfBoxNotFound)?;
        Assertion::from_data_json(base_label, &db.data)?
    } else if uuid == &uuid_from_hex(JUMBF_CBOR_UUID)? {
        let db = sb.data_box_of_type(b"cbor").ok_or(Error::JumbfBoxNotFound)?;
        Assertion::from_data_cbor(base_label, &db.data)
    } else if uuid == &uuid_from_hex(JUMBF_EMBEDDED_FILE_UUID)? {
        let desc = sb.data_box_of_type(b"bfdb").ok_or(Error::JumbfBoxNotFound)?;
        let data = sb.data_box_of_type(b"bidb").ok_or(Error::JumbfBoxNotFound)?;
        let content_type = parse_media_type(&desc.data)?;
        Assertion::from_data_binary(base_label, &content_type, &data.data)
    } else {
        // unknown content kind: keep the payload opaque so its hash
        // can still be checked
        let db = sb.first_data_box().ok_or(Error::JumbfBoxNotFound)?;
        Assertion::from_data_binary(base_label, "application/octet-stream", &db.data)
    };

    Ok((assertion, instance))
}

// bfdb payload: toggles byte then a null terminated media type
fn parse_media_type(data: &[u8]) -> Result<String> {
    if data.len() < 2 {
        return Err(Error::JumbfBoxMalformed(
            "embedded file description too short".to_string(),
        ));
    }
    let end = data[1..]
        .iter()
        .position(|b| *b == 0)
        .map(|p| p + 1)
        .unwrap_or(data.len());
    String::from_utf8(data[1..end].to_vec())
        .map_err(|_| Error::JumbfBoxMalformed("media type is not utf-8".to_string()))
}

fn generate_salt() -> Vec<u8> {
    use rand::RngCore;
    let mut salt = vec![0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}
