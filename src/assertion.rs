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

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;

/// Assertion data as binary CBOR or JSON depending upon the assertion
/// kind. For JSON assertions the data is a JSON string; binary
/// assertions carry raw bytes plus their content type.
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone)]
pub enum AssertionData {
    Json(String),
    Binary(Vec<u8>),
    Cbor(Vec<u8>),
}

impl fmt::Debug for AssertionData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Json(s) => write!(f, "{s:?}"),
            Self::Binary(_) => write!(f, "<omitted>"),
            Self::Cbor(s) => match serde_cbor::from_slice::<serde_cbor::Value>(s) {
                Ok(value) => write!(f, "{value:?}"),
                Err(_) => write!(f, "<invalid cbor>"),
            },
        }
    }
}

/// An assertion as carried in an assertion store: a label, an optional
/// schema version and the payload with its content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assertion {
    label: String,
    version: Option<usize>,
    data: AssertionData,
    content_type: String,
}

impl Assertion {
    pub(crate) fn new(label: &str, version: Option<usize>, data: AssertionData) -> Self {
        let content_type = match &data {
            AssertionData::Json(_) => "application/json",
            AssertionData::Cbor(_) => "application/cbor",
            AssertionData::Binary(_) => "application/octet-stream",
        };
        Self {
            label: label.to_owned(),
            version,
            data,
            content_type: content_type.to_owned(),
        }
    }

    pub(crate) fn set_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_owned();
        self
    }

    /// The label with its version suffix when the version is 2 or
    /// later, e.g. `c2pa.actions.v2`.
    pub fn label(&self) -> String {
        match self.version {
            Some(v) if v > 1 => format!("{}.v{}", self.label_root(), v),
            _ => self.label_root(),
        }
    }

    /// The label without any version suffix.
    pub fn label_root(&self) -> String {
        self.label.clone()
    }

    pub fn content_type(&self) -> String {
        self.content_type.clone()
    }

    pub fn decode_data(&self) -> &AssertionData {
        &self.data
    }

    /// The payload bytes as stored in the content box.
    pub fn data(&self) -> Vec<u8> {
        match &self.data {
            AssertionData::Json(s) => s.as_bytes().to_vec(),
            AssertionData::Binary(b) => b.clone(),
            AssertionData::Cbor(b) => b.clone(),
        }
    }

    /// Splits a versioned label like `c2pa.actions.v2` into its root
    /// and version.
    pub(crate) fn split_label(label: &str) -> (String, Option<usize>) {
        if let Some((root, suffix)) = label.rsplit_once(".v") {
            if let Ok(version) = suffix.parse::<usize>() {
                return (root.to_owned(), Some(version));
            }
        }
        (label.to_owned(), None)
    }

    pub(crate) fn from_data_cbor(label: &str, data: &[u8]) -> Self {
        let (root, version) = Self::split_label(label);
        Assertion::new(&root, version, AssertionData::Cbor(data.to_vec()))
    }

    pub(crate) fn from_data_json(label: &str, data: &[u8]) -> Result<Self> {
        let json = String::from_utf8(data.to_vec()).map_err(|_| {
            crate::error::Error::AssertionDecoding(AssertionDecodeError {
                label: label.to_owned(),
                content_type: "application/json".to_owned(),
                source: AssertionDecodeErrorCause::BinaryDataNotUtf8,
            })
        })?;
        let (root, version) = Self::split_label(label);
        Ok(Assertion::new(&root, version, AssertionData::Json(json)))
    }

    pub(crate) fn from_data_binary(label: &str, content_type: &str, data: &[u8]) -> Self {
        let (root, version) = Self::split_label(label);
        Assertion::new(&root, version, AssertionData::Binary(data.to_vec()))
            .set_content_type(content_type)
    }

    pub(crate) fn decode_error(&self, source: AssertionDecodeErrorCause) -> AssertionDecodeError {
        AssertionDecodeError {
            label: self.label(),
            content_type: self.content_type(),
            source,
        }
    }
}

/// Standard behaviors for assertion types that can convert to and from
/// the stored [`Assertion`] form.
pub trait AssertionBase
where
    Self: Sized,
{
    const LABEL: &'static str;
    const VERSION: Option<usize> = None;

    fn to_assertion(&self) -> Result<Assertion>;

    fn from_assertion(assertion: &Assertion) -> Result<Self>;
}

/// Default implementation for CBOR-serializable assertion types.
pub trait AssertionCbor: Serialize + DeserializeOwned + AssertionBase {
    fn to_cbor_assertion(&self) -> Result<Assertion> {
        let data = AssertionData::Cbor(serde_cbor::to_vec(self)?);
        Ok(Assertion::new(Self::LABEL, Self::VERSION, data))
    }

    fn from_cbor_assertion(assertion: &Assertion) -> Result<Self> {
        match assertion.decode_data() {
            AssertionData::Cbor(data) => serde_cbor::from_slice(data).map_err(|e| {
                assertion
                    .decode_error(AssertionDecodeErrorCause::CborError(e))
                    .into()
            }),
            data => Err(assertion
                .decode_error(AssertionDecodeErrorCause::UnexpectedDataType {
                    expected: "cbor".to_owned(),
                    found: data_type_name(data),
                })
                .into()),
        }
    }
}

fn data_type_name(data: &AssertionData) -> String {
    match data {
        AssertionData::Json(_) => "json".to_owned(),
        AssertionData::Binary(_) => "binary".to_owned(),
        AssertionData::Cbor(_) => "cbor".to_owned(),
    }
}

/// This error type is returned when an assertion can not be decoded.
#[non_exhaustive]
pub struct AssertionDecodeError {
    pub label: String,
    pub content_type: String,
    pub source: AssertionDecodeErrorCause,
}

impl AssertionDecodeError {
    fn fmt_internal(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "could not decode assertion {} (content type {}): {}",
            self.label, self.content_type, self.source
        )
    }
}

impl fmt::Debug for AssertionDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_internal(f)
    }
}

impl fmt::Display for AssertionDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_internal(f)
    }
}

impl std::error::Error for AssertionDecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// This error type is used inside `AssertionDecodeError` to describe
/// the root cause for the decoding error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssertionDecodeErrorCause {
    /// The assertion had an unexpected data type.
    #[error("the assertion had an unexpected data type: expected {expected}, found {found}")]
    UnexpectedDataType { expected: String, found: String },

    /// Binary data could not be interpreted as UTF-8.
    #[error("binary data could not be interpreted as UTF-8")]
    BinaryDataNotUtf8,

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    CborError(#[from] serde_cbor::Error),
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn versioned_labels() {
        let a = Assertion::new("c2pa.actions", Some(2), AssertionData::Cbor(vec![0xa0]));
        assert_eq!(a.label(), "c2pa.actions.v2");
        assert_eq!(a.label_root(), "c2pa.actions");

        let b = Assertion::new("c2pa.actions", Some(1), AssertionData::Cbor(vec![0xa0]));
        assert_eq!(b.label(), "c2pa.actions");

        assert_eq!(
            Assertion::split_label("c2pa.actions.v2"),
            ("c2pa.actions".to_owned(), Some(2))
        );
        assert_eq!(
            Assertion::split_label("com.example.thing"),
            ("com.example.thing".to_owned(), None)
        );
    }

    #[test]
    fn json_data_must_be_utf8() {
        assert!(Assertion::from_data_json("test", &[0xff, 0xfe]).is_err());
        let ok = Assertion::from_data_json("test", b"{\"a\":1}").unwrap();
        assert_eq!(ok.content_type(), "application/json");
    }
}
