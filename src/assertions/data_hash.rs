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

use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};

use crate::{
    assertion::{Assertion, AssertionBase, AssertionCbor},
    assertions::labels,
    error::{Error, Result},
    utils::hash_utils::{hash_stream_by_alg, vec_compare, HashRange},
};

/// The hard binding between a manifest and its asset: a digest of the
/// asset bytes with the manifest's own span excluded.
///
/// During manifest construction the hash is all zeroes until the final
/// exclusion ranges are known; [`DataHash::is_zero`] reports that
/// placeholder state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DataHash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<Vec<HashRange>>,

    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    #[serde(with = "serde_bytes")]
    pub hash: Vec<u8>,

    #[serde(with = "serde_bytes")]
    pub pad: Vec<u8>,
}

impl DataHash {
    /// Label prefix for a data hash assertion.
    pub const LABEL: &'static str = labels::DATA_HASH;

    /// Creates a placeholder hard binding with a zero hash of the
    /// right length for `alg`.
    pub fn new(name: &str, alg: &str) -> Result<Self> {
        Ok(DataHash {
            exclusions: None,
            name: Some(name.to_string()),
            alg: Some(alg.to_string()),
            hash: vec![0; crate::utils::hash_utils::hash_len_by_alg(alg)?],
            pad: Vec::new(),
        })
    }

    pub fn add_exclusion(&mut self, exclusion: HashRange) {
        self.exclusions
            .get_or_insert_with(Vec::new)
            .push(exclusion);
    }

    pub fn set_exclusions(&mut self, exclusions: Vec<HashRange>) {
        self.exclusions = Some(exclusions);
    }

    /// True while the hash is still the all-zero placeholder.
    pub fn is_zero(&self) -> bool {
        self.hash.iter().all(|b| *b == 0)
    }

    /// Computes the digest of the stream minus the exclusion ranges
    /// and stores it, keeping the byte length unchanged.
    pub fn gen_hash_from_stream<R>(&mut self, stream: &mut R) -> Result<()>
    where
        R: Read + Seek,
    {
        let alg = self.alg.clone().unwrap_or_else(|| "sha256".to_string());
        let exclusions = self.exclusions.clone().unwrap_or_default();
        self.hash = hash_stream_by_alg(&alg, stream, &exclusions)?;
        Ok(())
    }

    /// Recomputes the digest and compares it to the stored hash.
    pub fn verify_stream<R>(&self, stream: &mut R, claim_alg: Option<&str>) -> Result<()>
    where
        R: Read + Seek,
    {
        if self.is_zero() {
            return Err(Error::OtherError(
                "data hash was never filled in".to_string(),
            ));
        }

        let alg = match self.alg.as_deref() {
            Some(a) => a,
            None => claim_alg.unwrap_or("sha256"),
        };
        let exclusions = self.exclusions.clone().unwrap_or_default();
        let computed = hash_stream_by_alg(alg, stream, &exclusions)?;

        if vec_compare(&computed, &self.hash) {
            Ok(())
        } else {
            Err(Error::OtherError("asset hash mismatch".to_string()))
        }
    }
}

impl AssertionCbor for DataHash {}

impl AssertionBase for DataHash {
    const LABEL: &'static str = labels::DATA_HASH;

    fn to_assertion(&self) -> Result<Assertion> {
        self.to_cbor_assertion()
    }

    fn from_assertion(assertion: &Assertion) -> Result<Self> {
        Self::from_cbor_assertion(assertion)
    }
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use super::*;

    #[test]
    fn placeholder_then_fill() {
        let mut dh = DataHash::new("jumbf manifest", "sha256").unwrap();
        assert!(dh.is_zero());
        assert_eq!(dh.hash.len(), 32);

        let data = vec![3u8; 1000];
        dh.add_exclusion(HashRange::new(100, 50));
        dh.gen_hash_from_stream(&mut Cursor::new(data.clone()))
            .unwrap();
        assert!(!dh.is_zero());
        assert_eq!(dh.hash.len(), 32);

        // same bytes verify, a flipped byte outside the exclusion does not
        dh.verify_stream(&mut Cursor::new(data.clone()), None)
            .unwrap();

        let mut tampered = data.clone();
        tampered[500] ^= 1;
        assert!(dh.verify_stream(&mut Cursor::new(tampered), None).is_err());

        // changes inside the exclusion are invisible
        let mut excluded_change = data;
        excluded_change[120] ^= 1;
        dh.verify_stream(&mut Cursor::new(excluded_change), None)
            .unwrap();
    }

    #[test]
    fn assertion_round_trip_keeps_hash_len() {
        let mut dh = DataHash::new("jumbf manifest", "sha384").unwrap();
        dh.add_exclusion(HashRange::new(2, 10));
        dh.gen_hash_from_stream(&mut Cursor::new(vec![9u8; 64]))
            .unwrap();

        let assertion = dh.to_assertion().unwrap();
        assert_eq!(assertion.label(), DataHash::LABEL);
        let restored = DataHash::from_assertion(&assertion).unwrap();
        assert_eq!(restored, dh);
        assert_eq!(restored.hash.len(), 48);
    }
}
