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

//! Produces the COSE_Sign1 structure that carries a claim signature.
//!
//! The payload is detached; the claim CBOR lives in its own box and the
//! signature box holds only the tagged COSE envelope. The envelope is
//! padded to exactly the size reserved during claim serialization so
//! that signing never changes any byte offset in the asset.

use coset::{
    cbor::value::Value, iana, CoseSign1, CoseSign1Builder, HeaderBuilder, Label,
    TaggedCborSerializable,
};
use log::warn;

use crate::{
    error::{Error, Result},
    signer::Signer,
    signing_alg::SigningAlg,
};

pub(crate) const SIGTST_HEADER: &str = "sigTst";
const PAD_HEADER: &str = "pad";

fn cose_err<E: std::fmt::Debug>(e: E) -> Error {
    Error::CoseSignature(format!("{e:?}"))
}

fn build_x5chain(certs: &[Vec<u8>]) -> Value {
    if certs.len() == 1 {
        Value::Bytes(certs[0].clone())
    } else {
        Value::Array(certs.iter().map(|c| Value::Bytes(c.clone())).collect())
    }
}

fn set_unprotected(sign1: &mut CoseSign1, key: &str, value: Value) {
    sign1
        .unprotected
        .rest
        .retain(|(label, _)| *label != Label::Text(key.to_string()));
    sign1
        .unprotected
        .rest
        .push((Label::Text(key.to_string()), value));
}

/// Signs `claim_bytes` and returns a tagged COSE_Sign1 of exactly
/// `box_size` bytes.
pub(crate) fn sign_claim(
    claim_bytes: &[u8],
    signer: &dyn Signer,
    box_size: usize,
    timestamp_mandatory: bool,
) -> Result<Vec<u8>> {
    if signer.alg() != SigningAlg::Ed25519 {
        return Err(Error::UnsupportedSigningAlgorithm(signer.alg().to_string()));
    }

    let certs = signer.certs()?;
    if certs.is_empty() {
        return Err(Error::CoseSignature("signer has no certificates".to_string()));
    }

    let protected = HeaderBuilder::new()
        .algorithm(iana::Algorithm::EdDSA)
        .value(
            iana::HeaderParameter::X5Chain as i64,
            build_x5chain(&certs),
        )
        .build();

    let mut sign1 = CoseSign1Builder::new()
        .protected(protected)
        .try_create_detached_signature(claim_bytes, b"", |data| signer.sign(data))?
        .build();

    // a time stamp covers the final signature bytes, so it can only be
    // requested after signing; it rides in the unprotected headers
    match signer.timestamp_request(&sign1.signature) {
        Some(Ok(token)) => set_unprotected(&mut sign1, SIGTST_HEADER, Value::Bytes(token)),
        Some(Err(e)) if timestamp_mandatory => return Err(e),
        Some(Err(e)) => warn!("proceeding without time stamp: {e}"),
        None => {}
    }

    pad_to_size(sign1, box_size)
}

/// Grows the unprotected `pad` header until the tagged serialization
/// hits `box_size` exactly.
fn pad_to_size(mut sign1: CoseSign1, box_size: usize) -> Result<Vec<u8>> {
    let bytes = sign1.clone().to_tagged_vec().map_err(cose_err)?;
    if bytes.len() == box_size {
        return Ok(bytes);
    }
    if bytes.len() > box_size {
        return Err(Error::ManifestTooLarge);
    }

    let mut pad_len = (box_size - bytes.len()).saturating_sub(9);
    for _ in 0..100 {
        set_unprotected(&mut sign1, PAD_HEADER, Value::Bytes(vec![0u8; pad_len]));
        let padded = sign1.clone().to_tagged_vec().map_err(cose_err)?;
        match padded.len().cmp(&box_size) {
            std::cmp::Ordering::Equal => return Ok(padded),
            std::cmp::Ordering::Less => pad_len += box_size - padded.len(),
            std::cmp::Ordering::Greater => {
                let over = padded.len() - box_size;
                if pad_len < over {
                    return Err(Error::ManifestTooLarge);
                }
                pad_len -= over;
            }
        }
    }
    // the reservation leaves no room for the pad header itself
    Err(Error::ManifestTooLarge)
}
