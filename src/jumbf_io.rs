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

//! Dispatches manifest IO to the container handler for an asset,
//! selected by format hint or by sniffing the asset's magic bytes.

use std::io::Cursor;

use lazy_static::lazy_static;
use log::debug;

use crate::{
    asset_handlers::{bmff_io::BmffIO, jpeg_io::JpegIO, png_io::PngIO},
    asset_io::{AssetIO, CAIWriter, HashObjectPositions},
    error::{Error, Result},
    utils::mime::format_to_mime,
};

lazy_static! {
    static ref ASSET_HANDLERS: Vec<Box<dyn AssetIO>> = vec![
        Box::new(JpegIO {}),
        Box::new(PngIO {}),
        Box::new(BmffIO {}),
    ];
}

/// Finds the handler for a format hint (extension or MIME type).
pub(crate) fn get_assetio_handler(format: &str) -> Option<&'static dyn AssetIO> {
    let mime = format_to_mime(format);
    ASSET_HANDLERS
        .iter()
        .find(|h| {
            h.supported_types().contains(&format) || h.supported_types().contains(&mime.as_str())
        })
        .map(|h| h.as_ref())
}

/// Finds a handler by looking at the asset's leading bytes.
pub(crate) fn sniff_handler(asset_bytes: &[u8]) -> Option<&'static dyn AssetIO> {
    let header = &asset_bytes[..asset_bytes.len().min(16)];
    ASSET_HANDLERS
        .iter()
        .find(|h| h.supports_stream(header))
        .map(|h| h.as_ref())
}

/// Resolves a handler from an optional hint, falling back to sniffing.
/// The hint is ignored when the magic bytes say otherwise.
pub(crate) fn resolve_handler(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
) -> Result<&'static dyn AssetIO> {
    if let Some(handler) = sniff_handler(asset_bytes) {
        return Ok(handler);
    }
    if let Some(hint) = format_hint {
        if let Some(handler) = get_assetio_handler(hint) {
            debug!("handler for {hint} selected by hint only, magic bytes unknown");
            return Ok(handler);
        }
    }
    Err(Error::UnsupportedType(
        format_hint.unwrap_or("unknown").to_string(),
    ))
}

/// Loads the JUMBF block from an asset. `Ok(None)` means the container
/// is supported but carries no manifest.
pub(crate) fn load_jumbf_from_bytes(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
) -> Result<Option<Vec<u8>>> {
    let handler = resolve_handler(asset_bytes, format_hint)?;
    handler
        .get_reader()
        .read_cai(&mut Cursor::new(asset_bytes))
}

fn writer_for(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
) -> Result<&'static dyn CAIWriter> {
    let handler = resolve_handler(asset_bytes, format_hint)?;
    handler
        .get_writer()
        .ok_or_else(|| Error::UnsupportedType(format_hint.unwrap_or("unknown").to_string()))
}

/// Returns a copy of the asset with the JUMBF block embedded.
pub(crate) fn save_jumbf_to_bytes(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
    store_bytes: &[u8],
) -> Result<Vec<u8>> {
    let writer = writer_for(asset_bytes, format_hint)?;
    let mut output = Cursor::new(Vec::with_capacity(asset_bytes.len() + store_bytes.len()));
    writer.write_cai(&mut Cursor::new(asset_bytes), &mut output, store_bytes)?;
    Ok(output.into_inner())
}

/// Byte spans occupied by manifest framing in the asset.
pub(crate) fn object_locations_from_bytes(
    asset_bytes: &[u8],
    format_hint: Option<&str>,
) -> Result<Vec<HashObjectPositions>> {
    let writer = writer_for(asset_bytes, format_hint)?;
    writer.get_object_locations_from_stream(&mut Cursor::new(asset_bytes))
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::asset_handlers::{jpeg_io, png_io};

    #[test]
    fn handler_lookup_by_extension_and_mime() {
        assert!(get_assetio_handler("jpg").is_some());
        assert!(get_assetio_handler("image/png").is_some());
        assert!(get_assetio_handler("mp4").is_some());
        assert!(get_assetio_handler("tiff").is_none());
    }

    #[test]
    fn sniffing_beats_a_wrong_hint() {
        let png = png_io::tests::minimal_png();
        // hint says jpeg but the bytes are png; the png handler wins
        let loaded = load_jumbf_from_bytes(&png, Some("jpg")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn unknown_container_rejected() {
        let garbage = vec![0x00u8; 64];
        assert!(matches!(
            load_jumbf_from_bytes(&garbage, None),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test]
    fn save_and_load_round_trip() {
        let jpeg = jpeg_io::tests::minimal_jpeg();
        let mut store = vec![0u8; 64];
        store[..4].copy_from_slice(&64u32.to_be_bytes());
        store[4..8].copy_from_slice(b"jumb");

        let embedded = save_jumbf_to_bytes(&jpeg, None, &store).unwrap();
        let loaded = load_jumbf_from_bytes(&embedded, None).unwrap().unwrap();
        assert_eq!(loaded, store);

        let locations = object_locations_from_bytes(&embedded, None).unwrap();
        assert_eq!(locations.len(), 1);
    }
}
