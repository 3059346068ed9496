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

use crate::{error::Result, signing_alg::SigningAlg, time_stamp};

/// The `Signer` trait generates a cryptographic signature over a byte
/// array and supplies the credentials that go with it.
pub trait Signer {
    /// Returns a new signature for the supplied bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Returns the algorithm of the signer.
    fn alg(&self) -> SigningAlg;

    /// Returns the signing certificate chain, leaf first, as DER.
    fn certs(&self) -> Result<Vec<Vec<u8>>>;

    /// Size to reserve for the complete signature structure, padding
    /// and time stamp included.
    fn reserve_size(&self) -> usize;

    /// URL of an RFC 3161 time stamp authority, if the signature
    /// should carry a time stamp.
    fn time_authority_url(&self) -> Option<String> {
        None
    }

    /// Requests an RFC 3161 time stamp token over `message` from the
    /// signer's authority. `None` when the signer has no authority
    /// configured.
    fn timestamp_request(&self, message: &[u8]) -> Option<Result<Vec<u8>>> {
        self.time_authority_url()
            .map(|url| time_stamp::default_rfc3161_request(&url, message))
    }
}
