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

//! RFC 3161 time stamping. Requests carry a SHA-256 imprint of the
//! message; the returned `TimeStampToken` is stored opaquely in the
//! signature's unprotected headers.

use asn1_rs::{FromDer, Integer, Sequence};
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
    error::{Error, Result},
    utils::hash_utils::hash_by_alg,
};

/// Default time stamp authority used when a signer asks for
/// timestamping without naming one.
pub const DEFAULT_TSA_URL: &str = "http://timestamp.digicert.com";

// TimeStampReq with version 1, a SHA-256 messageImprint and
// certReq TRUE. With a fixed digest algorithm every length byte is
// constant, so the request is a template with the digest spliced in.
const TIME_STAMP_REQ_TEMPLATE: [u8; 24] = [
    0x30, 0x39, // TimeStampReq
    0x02, 0x01, 0x01, // version 1
    0x30, 0x31, // messageImprint
    0x30, 0x0D, // AlgorithmIdentifier
    0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, // id-sha256
    0x05, 0x00, // NULL params
    0x04, 0x20, // OCTET STRING (32)
];
const TIME_STAMP_REQ_TRAILER: [u8; 3] = [0x01, 0x01, 0xFF]; // certReq TRUE

/// Builds a DER `TimeStampReq` over `message`.
pub(crate) fn time_stamp_request_body(message: &[u8]) -> Result<Vec<u8>> {
    let digest = hash_by_alg("sha256", message)?;

    let mut body = Vec::with_capacity(TIME_STAMP_REQ_TEMPLATE.len() + 32 + 3);
    body.extend_from_slice(&TIME_STAMP_REQ_TEMPLATE);
    body.extend_from_slice(&digest);
    body.extend_from_slice(&TIME_STAMP_REQ_TRAILER);
    Ok(body)
}

/// Extracts the `TimeStampToken` from a DER `TimeStampResp`, checking
/// that the authority granted the request.
pub(crate) fn token_from_response(response: &[u8]) -> Result<Vec<u8>> {
    let (_, resp) = Sequence::from_der(response)
        .map_err(|_| Error::TimeStampServiceUnavailable("bad response".to_string()))?;
    let content = resp.content.as_ref();

    // PKIStatusInfo, then the token as the remainder of the response
    let (token, status_info) = Sequence::from_der(content)
        .map_err(|_| Error::TimeStampServiceUnavailable("bad response".to_string()))?;
    let (_, status) = Integer::from_der(status_info.content.as_ref())
        .map_err(|_| Error::TimeStampServiceUnavailable("bad response".to_string()))?;
    let status = status
        .as_u32()
        .map_err(|_| Error::TimeStampServiceUnavailable("bad response".to_string()))?;

    // granted (0) or grantedWithMods (1)
    if status > 1 || token.is_empty() {
        return Err(Error::TimeStampServiceUnavailable(format!(
            "request was not granted (status {status})"
        )));
    }
    Ok(token.to_vec())
}

// a slow authority must not stall signing indefinitely
const TSA_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const TSA_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Requests a time stamp token for `message` from the authority at
/// `url`.
pub(crate) fn default_rfc3161_request(url: &str, message: &[u8]) -> Result<Vec<u8>> {
    let body = time_stamp_request_body(message)?;

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(TSA_CONNECT_TIMEOUT)
        .timeout(TSA_REQUEST_TIMEOUT)
        .build();
    let response = agent
        .post(url)
        .set("Content-Type", "application/timestamp-query")
        .send_bytes(&body)
        .map_err(|e| Error::TimeStampServiceUnavailable(e.to_string()))?;

    if response.status() != 200 {
        return Err(Error::TimeStampServiceUnavailable(format!(
            "http status {}",
            response.status()
        )));
    }

    let mut resp_bytes = Vec::new();
    use std::io::Read;
    response
        .into_reader()
        .take(1024 * 1024)
        .read_to_end(&mut resp_bytes)
        .map_err(|e| Error::TimeStampServiceUnavailable(e.to_string()))?;

    let token = token_from_response(&resp_bytes)?;

    // the token's imprint must cover the message we sent
    if !token_covers_message(&token, message) {
        return Err(Error::TimeStampServiceUnavailable(
            "token does not cover the signature".to_string(),
        ));
    }
    Ok(token)
}

/// Checks that the SHA-256 digest of `message` appears as the token's
/// message imprint.
pub(crate) fn token_covers_message(token: &[u8], message: &[u8]) -> bool {
    match hash_by_alg("sha256", message) {
        Ok(digest) => memchr::memmem::find(token, &digest).is_some(),
        Err(_) => false,
    }
}

/// Pulls the `genTime` out of a time stamp token. The token is not
/// fully parsed; the first GeneralizedTime in the TSTInfo is the
/// generation time.
pub(crate) fn gen_time_from_token(token: &[u8]) -> Option<DateTime<Utc>> {
    let mut pos = 0;
    while pos + 17 <= token.len() {
        if token[pos] == 0x18 && token[pos + 1] == 0x0F {
            let text = std::str::from_utf8(&token[pos + 2..pos + 17]).ok()?;
            let naive = NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%SZ").ok()?;
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
        pos += 1;
    }
    None
}
