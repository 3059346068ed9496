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

use std::io::{Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

const HASH_CHUNK: usize = 256 * 1024; // read streams in 256KB chunks

/// A byte range excluded from (or covered by) a hash computation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HashRange {
    start: usize,
    length: usize,
}

impl HashRange {
    pub fn new(start: usize, length: usize) -> Self {
        HashRange { start, length }
    }

    /// return start as usize
    pub fn start(&self) -> usize {
        self.start
    }

    /// return length as usize
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn set_start(&mut self, start: usize) {
        self.start = start;
    }

    pub fn set_length(&mut self, length: usize) {
        self.length = length;
    }
}

/// Compare two byte slices without early exit on the first mismatch.
/// Timing does not depend on where the slices differ.
pub fn vec_compare(va: &[u8], vb: &[u8]) -> bool {
    if va.len() != vb.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (a, b) in va.iter().zip(vb) {
        diff |= a ^ b;
    }
    diff == 0
}

#[derive(Clone)]
pub enum Hasher {
    SHA256(Sha256),
    SHA384(Sha384),
    SHA512(Sha512),
}

impl Hasher {
    /// Creates a hasher for one of the supported algorithm names
    /// ("sha256", "sha384", "sha512").
    pub fn new(alg: &str) -> Result<Self> {
        match alg {
            "sha256" => Ok(Hasher::SHA256(Sha256::new())),
            "sha384" => Ok(Hasher::SHA384(Sha384::new())),
            "sha512" => Ok(Hasher::SHA512(Sha512::new())),
            _ => Err(Error::UnsupportedHashAlgorithm(alg.to_string())),
        }
    }

    // update hash value with new data
    pub fn update(&mut self, data: &[u8]) {
        use Hasher::*;
        match self {
            SHA256(ref mut d) => d.update(data),
            SHA384(ref mut d) => d.update(data),
            SHA512(ref mut d) => d.update(data),
        }
    }

    // consume hasher and return the final digest
    pub fn finalize(hasher_enum: Hasher) -> Vec<u8> {
        use Hasher::*;
        match hasher_enum {
            SHA256(d) => d.finalize().to_vec(),
            SHA384(d) => d.finalize().to_vec(),
            SHA512(d) => d.finalize().to_vec(),
        }
    }

    /// Digest length in bytes for the wrapped algorithm.
    pub fn digest_len(&self) -> usize {
        use Hasher::*;
        match self {
            SHA256(_) => 32,
            SHA384(_) => 48,
            SHA512(_) => 64,
        }
    }
}

/// Digest length in bytes for a supported algorithm name.
pub fn hash_len_by_alg(alg: &str) -> Result<usize> {
    Ok(Hasher::new(alg)?.digest_len())
}

/// Hash a byte slice with the named algorithm.
pub fn hash_by_alg(alg: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut hasher = Hasher::new(alg)?;
    hasher.update(data);
    Ok(Hasher::finalize(hasher))
}

/// Hash a stream with the named algorithm, skipping the given exclusion
/// ranges. Exclusions must be sorted, non-overlapping and inside the
/// stream.
pub fn hash_stream_by_alg<R>(alg: &str, data: &mut R, exclusions: &[HashRange]) -> Result<Vec<u8>>
where
    R: Read + Seek,
{
    let stream_len = data.seek(SeekFrom::End(0))?;
    data.rewind()?;

    let mut sorted: Vec<HashRange> = exclusions.to_vec();
    sorted.sort_by_key(|r| r.start());

    let mut last_end: usize = 0;
    for range in &sorted {
        if range.start() < last_end {
            return Err(Error::BadHashRange(format!(
                "overlapping exclusion at {}",
                range.start()
            )));
        }
        let end = range
            .start()
            .checked_add(range.length())
            .ok_or_else(|| Error::BadHashRange("exclusion length overflow".to_string()))?;
        if end as u64 > stream_len {
            return Err(Error::BadHashRange(format!(
                "exclusion at {} extends past end of stream",
                range.start()
            )));
        }
        last_end = end;
    }

    let mut hasher = Hasher::new(alg)?;
    let mut pos: u64 = 0;

    for range in &sorted {
        hash_span(&mut hasher, data, pos, range.start() as u64)?;
        pos = (range.start() + range.length()) as u64;
    }
    hash_span(&mut hasher, data, pos, stream_len)?;

    Ok(Hasher::finalize(hasher))
}

// Hash the bytes in [start, end) of the stream.
fn hash_span<R>(hasher: &mut Hasher, data: &mut R, start: u64, end: u64) -> Result<()>
where
    R: Read + Seek,
{
    if end <= start {
        return Ok(());
    }

    data.seek(SeekFrom::Start(start))?;
    let mut remaining = (end - start) as usize;
    let mut buf = vec![0u8; HASH_CHUNK.min(remaining)];

    while remaining > 0 {
        let take = HASH_CHUNK.min(remaining);
        data.read_exact(&mut buf[..take])?;
        hasher.update(&buf[..take]);
        remaining -= take;
    }

    Ok(())
}
