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

use thiserror::Error;

/// `Error` enumerates errors returned by most crate operations.
///
/// Structural problems (bad boxes, unsupported containers, missing
/// required boxes) surface as errors and abort the operation. Trust and
/// integrity findings are instead collected into the validation log and
/// reported through [`crate::VerificationResult`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // --- JUMBF parsing and serialization errors ---
    /// A JUMBF box could not be parsed.
    #[error("malformed JUMBF box: {0}")]
    JumbfBoxMalformed(String),

    /// The JUMBF box nesting exceeded the supported depth.
    #[error("JUMBF box nesting too deep")]
    JumbfBoxDepthExceeded,

    /// A box required by the manifest layout was not found.
    #[error("required JUMBF box was not found")]
    JumbfBoxNotFound,

    /// The JUMBF creation failed.
    #[error("could not create valid JUMBF for claim")]
    JumbfCreationError,

    // --- container / asset errors ---
    /// The container format is not recognized or has no handler.
    #[error("asset type is not supported: {0}")]
    UnsupportedType(String),

    /// The asset is recognized but its structure is damaged.
    #[error("could not parse the asset: {0}")]
    InvalidAsset(String),

    /// There is no manifest store in the asset.
    #[error("no claim found")]
    JumbfNotFound,

    // --- manifest store errors ---
    /// A required claim box is missing or duplicated.
    #[error("claim is missing from the manifest")]
    ClaimMissing { label: String },

    /// The claim CBOR could not be decoded.
    #[error("claim could not be decoded")]
    ClaimDecoding,

    /// The claim could not be re-encoded.
    #[error("claim could not be encoded")]
    ClaimEncoding,

    /// Two manifests in one store carry the same label.
    #[error("duplicate manifest label: {0}")]
    DuplicateManifestLabel(String),

    /// An assertion failed validation while building a manifest.
    #[error("assertion is invalid: {0}")]
    AssertionInvalid(String),

    /// An assertion referenced by the claim is not in the store.
    #[error("assertion is missing: {url}")]
    AssertionMissing { url: String },

    /// The manifest plus signature did not fit the reserved space.
    #[error("the manifest signature does not fit in the reserved space")]
    ManifestTooLarge,

    // --- hashing errors ---
    /// Unknown hash algorithm name.
    #[error("hash algorithm is not supported: {0}")]
    UnsupportedHashAlgorithm(String),

    /// Exclusion ranges overlap or fall outside the stream.
    #[error("bad hash range: {0}")]
    BadHashRange(String),

    // --- signing / trust errors ---
    /// The signing algorithm is not supported by this build.
    #[error("signing algorithm is not supported: {0}")]
    UnsupportedSigningAlgorithm(String),

    /// COSE structure could not be parsed or produced.
    #[error("COSE error: {0}")]
    CoseSignature(String),

    /// The signing certificate chain could not be used.
    #[error("certificate chain is invalid: {0}")]
    CertificateChainInvalid(#[from] ChainError),

    /// Certificate issuance failed.
    #[error("could not generate certificate: {0}")]
    CertificateGeneration(String),

    /// The time stamp authority could not be reached or answered badly.
    #[error("time stamp service unavailable: {0}")]
    TimeStampServiceUnavailable(String),

    // --- wrapped sources ---
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CBOR error: {0}")]
    CborError(#[from] serde_cbor::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    AssertionDecoding(#[from] crate::assertion::AssertionDecodeError),

    #[error("other error: {0}")]
    OtherError(String),
}

/// Sub-reasons for [`Error::CertificateChainInvalid`] and for the
/// corresponding validation findings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChainError {
    #[error("the chain does not end at a configured trust anchor")]
    UntrustedRoot,

    #[error("certificate is expired or not yet valid")]
    Expired,

    #[error("certificate order is broken: {0} is not issued by its successor")]
    BrokenChain(String),

    #[error("certificate signature did not verify against its issuer")]
    BadIssuerSignature,

    #[error("certificate extensions are unsuitable for claim signing")]
    BadExtensions,

    #[error("certificate uses an unsupported public key algorithm")]
    UnsupportedKeyAlgorithm,

    #[error("certificate could not be parsed")]
    CertificateMalformed,

    #[error("the chain is empty")]
    EmptyChain,
}

/// A specialized `Result` type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
