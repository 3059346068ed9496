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

//! ISO BMFF handler (MP4, HEIC and friends). The manifest store rides
//! in a top-level `uuid` box placed after `ftyp`. Because insertion
//! shifts media data, every `stco`/`co64` chunk offset at or past the
//! insertion point is rebased by the inserted length.

use crate::{
    asset_io::{
        AssetIO, CAIRead, CAIReadWrite, CAIReader, CAIWriter, HashBlockObjectType,
        HashObjectPositions,
    },
    error::{Error, Result},
};

// extended type of the C2PA manifest uuid box
const C2PA_UUID: [u8; 16] = [
    0xD8, 0xFE, 0xC3, 0xD6, 0x1B, 0x0E, 0x48, 0x3C, 0x92, 0x97, 0x58, 0x28, 0x87, 0x7E, 0xC4,
    0x81,
];

const MANIFEST_PURPOSE: &[u8] = b"manifest\0";

// container boxes that may hold sample tables
const CONTAINER_BOXES: [&[u8; 4]; 9] = [
    b"moov", b"trak", b"mdia", b"minf", b"stbl", b"edts", b"dinf", b"udta", b"moof",
];

fn bad_bmff(what: &str) -> Error {
    Error::InvalidAsset(format!("bmff: {what}"))
}

#[derive(Clone, Debug)]
struct BoxInfo {
    name: [u8; 4],
    offset: usize,
    size: usize,
    header_len: usize,
}

impl BoxInfo {
    fn payload_range(&self) -> std::ops::Range<usize> {
        self.offset + self.header_len..self.offset + self.size
    }
}

// Reads the box starting at `pos`. A declared size of 0 means the box
// runs to the end of the buffer (only legal for the last top level
// box).
fn read_box_info(buf: &[u8], pos: usize) -> Result<BoxInfo> {
    if buf.len() < pos + 8 {
        return Err(bad_bmff("truncated box header"));
    }
    let size32 = u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]) as usize;
    let name = [buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]];

    let (size, header_len) = match size32 {
        0 => (buf.len() - pos, 8),
        1 => {
            if buf.len() < pos + 16 {
                return Err(bad_bmff("truncated largesize"));
            }
            let mut large = [0u8; 8];
            large.copy_from_slice(&buf[pos + 8..pos + 16]);
            (u64::from_be_bytes(large) as usize, 16)
        }
        s => (s, 8),
    };

    if size < header_len || pos + size > buf.len() {
        return Err(bad_bmff("box size out of bounds"));
    }

    Ok(BoxInfo {
        name,
        offset: pos,
        size,
        header_len,
    })
}

fn top_level_boxes(buf: &[u8]) -> Result<Vec<BoxInfo>> {
    let mut boxes = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let info = read_box_info(buf, pos)?;
        pos = info.offset + info.size;
        boxes.push(info);
    }
    Ok(boxes)
}

// Returns true when the box at `info` is the C2PA manifest uuid box.
fn is_c2pa_uuid_box(buf: &[u8], info: &BoxInfo) -> bool {
    if &info.name != b"uuid" {
        return false;
    }
    let payload = &buf[info.payload_range()];
    payload.len() >= 16 && payload[..16] == C2PA_UUID
}

// uuid payload: extended type, version/flags, purpose, merkle offset,
// then the JUMBF block
fn build_manifest_box(store_bytes: &[u8]) -> Vec<u8> {
    let payload_len = 16 + 4 + MANIFEST_PURPOSE.len() + 8 + store_bytes.len();
    let mut out = Vec::with_capacity(payload_len + 8);
    out.extend_from_slice(&((payload_len as u32 + 8).to_be_bytes()));
    out.extend_from_slice(b"uuid");
    out.extend_from_slice(&C2PA_UUID);
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(MANIFEST_PURPOSE);
    out.extend_from_slice(&0u64.to_be_bytes());
    out.extend_from_slice(store_bytes);
    out
}

fn parse_manifest_box(payload: &[u8]) -> Result<Vec<u8>> {
    // past extended type and version/flags
    let mut pos = 16 + 4;
    if payload.len() < pos {
        return Err(bad_bmff("manifest uuid box too short"));
    }
    let purpose_end = payload[pos..]
        .iter()
        .position(|b| *b == 0)
        .map(|p| pos + p + 1)
        .ok_or_else(|| bad_bmff("unterminated manifest purpose"))?;
    let purpose = &payload[pos..purpose_end - 1];
    if purpose != &MANIFEST_PURPOSE[..MANIFEST_PURPOSE.len() - 1] {
        return Err(bad_bmff("unexpected uuid box purpose"));
    }
    pos = purpose_end + 8; // skip merkle offset
    if pos > payload.len() {
        return Err(bad_bmff("manifest uuid box too short"));
    }
    Ok(payload[pos..].to_vec())
}

// Rebases stco/co64 chunk offset entries after bytes were inserted
// (positive delta) or removed (negative delta) at `point`.
fn adjust_chunk_offsets(buf: &mut [u8], start: usize, end: usize, point: u64, delta: i64) -> Result<()> {
    let mut pos = start;
    while pos < end {
        let info = read_box_info(buf, pos)?;
        let next = info.offset + info.size;

        if CONTAINER_BOXES.contains(&&info.name) {
            adjust_chunk_offsets(
                buf,
                info.offset + info.header_len,
                next,
                point,
                delta,
            )?;
        } else if &info.name == b"stco" || &info.name == b"co64" {
            let payload = info.payload_range();
            if payload.len() < 8 {
                return Err(bad_bmff("truncated chunk offset box"));
            }
            let base = payload.start;
            let count = u32::from_be_bytes([
                buf[base + 4],
                buf[base + 5],
                buf[base + 6],
                buf[base + 7],
            ]) as usize;
            let entries_start = base + 8;

            if &info.name == b"stco" {
                if entries_start + count * 4 > payload.end {
                    return Err(bad_bmff("stco entry count out of bounds"));
                }
                for i in 0..count {
                    let at = entries_start + i * 4;
                    let mut entry = [0u8; 4];
                    entry.copy_from_slice(&buf[at..at + 4]);
                    let offset = u32::from_be_bytes(entry) as u64;
                    if offset >= point {
                        let rebased = offset
                            .checked_add_signed(delta)
                            .ok_or_else(|| bad_bmff("chunk offset underflow"))?;
                        let rebased = u32::try_from(rebased)
                            .map_err(|_| bad_bmff("chunk offset no longer fits stco"))?;
                        buf[at..at + 4].copy_from_slice(&rebased.to_be_bytes());
                    }
                }
            } else {
                if entries_start + count * 8 > payload.end {
                    return Err(bad_bmff("co64 entry count out of bounds"));
                }
                for i in 0..count {
                    let at = entries_start + i * 8;
                    let mut entry = [0u8; 8];
                    entry.copy_from_slice(&buf[at..at + 8]);
                    let offset = u64::from_be_bytes(entry);
                    if offset >= point {
                        let rebased = offset
                            .checked_add_signed(delta)
                            .ok_or_else(|| bad_bmff("chunk offset underflow"))?;
                        buf[at..at + 8].copy_from_slice(&rebased.to_be_bytes());
                    }
                }
            }
        }

        pos = next;
    }
    Ok(())
}

fn read_all(reader: &mut dyn CAIRead) -> Result<Vec<u8>> {
    reader.rewind()?;
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

// Removes any existing manifest box, returning the cleaned asset.
fn strip_manifest_box(buf: &[u8]) -> Result<Vec<u8>> {
    let boxes = top_level_boxes(buf)?;
    let mut out = Vec::with_capacity(buf.len());
    let mut removed: Option<(usize, usize)> = None;

    for info in &boxes {
        if removed.is_none() && is_c2pa_uuid_box(buf, info) {
            removed = Some((info.offset, info.size));
            continue;
        }
        out.extend_from_slice(&buf[info.offset..info.offset + info.size]);
    }

    if let Some((offset, size)) = removed {
        let len = out.len();
        adjust_chunk_offsets(&mut out, 0, len, offset as u64, -(size as i64))?;
    }
    Ok(out)
}

/// Handler for ISO base media file format assets.
pub struct BmffIO {}

impl CAIReader for BmffIO {
    fn read_cai(&self, asset_reader: &mut dyn CAIRead) -> Result<Option<Vec<u8>>> {
        let buf = read_all(asset_reader)?;
        let boxes = top_level_boxes(&buf)?;

        if boxes.first().map(|b| b.name) != Some(*b"ftyp") {
            return Err(bad_bmff("missing ftyp"));
        }

        for info in &boxes {
            if is_c2pa_uuid_box(&buf, info) {
                return parse_manifest_box(&buf[info.payload_range()]).map(Some);
            }
        }
        Ok(None)
    }
}

impl CAIWriter for BmffIO {
    fn write_cai(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
        store_bytes: &[u8],
    ) -> Result<()> {
        let buf = read_all(input_stream)?;
        let cleaned = strip_manifest_box(&buf)?;

        let boxes = top_level_boxes(&cleaned)?;
        let ftyp = boxes
            .first()
            .filter(|b| &b.name == b"ftyp")
            .ok_or_else(|| bad_bmff("missing ftyp"))?;

        let manifest_box = build_manifest_box(store_bytes);
        let insert_at = ftyp.offset + ftyp.size;

        let mut out = Vec::with_capacity(cleaned.len() + manifest_box.len());
        out.extend_from_slice(&cleaned[..insert_at]);
        out.extend_from_slice(&manifest_box);
        out.extend_from_slice(&cleaned[insert_at..]);

        let len = out.len();
        adjust_chunk_offsets(
            &mut out,
            0,
            len,
            insert_at as u64,
            manifest_box.len() as i64,
        )?;

        output_stream.write_all(&out)?;
        Ok(())
    }

    fn get_object_locations_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
    ) -> Result<Vec<HashObjectPositions>> {
        let buf = read_all(input_stream)?;
        let boxes = top_level_boxes(&buf)?;
        Ok(boxes
            .iter()
            .filter(|info| is_c2pa_uuid_box(&buf, info))
            .map(|info| HashObjectPositions {
                offset: info.offset,
                length: info.size,
                htype: HashBlockObjectType::Cai,
            })
            .collect())
    }

    fn remove_cai_store_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
    ) -> Result<()> {
        let buf = read_all(input_stream)?;
        let cleaned = strip_manifest_box(&buf)?;
        output_stream.write_all(&cleaned)?;
        Ok(())
    }
}

impl AssetIO for BmffIO {
    fn supported_types(&self) -> &[&str] {
        &[
            "mp4",
            "m4a",
            "mov",
            "heic",
            "heif",
            "avif",
            "video/mp4",
            "audio/mp4",
            "video/quicktime",
            "image/heic",
            "image/heif",
            "image/avif",
        ]
    }

    fn supports_stream(&self, header: &[u8]) -> bool {
        header.len() >= 8 && &header[4..8] == b"ftyp"
    }

    fn get_reader(&self) -> &dyn CAIReader {
        self
    }

    fn get_writer(&self) -> Option<&dyn CAIWriter> {
        Some(self)
    }
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use super::*;

    fn raw_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&((payload.len() as u32 + 8).to_be_bytes()));
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out
    }

    // ftyp + moov(trak(mdia(minf(stbl(stco))))) + mdat, with the stco
    // entry pointing at the mdat payload
    pub fn minimal_mp4() -> Vec<u8> {
        let ftyp = raw_box(b"ftyp", b"isom\0\0\x02\0isommp41");

        // compute mdat payload offset: ftyp + moov + mdat header
        // moov is built twice, first to learn its size
        let stco_entry_placeholder = 0u32;
        let moov = build_moov(stco_entry_placeholder);
        let mdat_payload_offset = (ftyp.len() + moov.len() + 8) as u32;
        let moov = build_moov(mdat_payload_offset);

        let mdat = raw_box(b"mdat", &[0xDE, 0xAD, 0xBE, 0xEF]);

        [ftyp, moov, mdat].concat()
    }

    fn build_moov(chunk_offset: u32) -> Vec<u8> {
        let mut stco_payload = Vec::new();
        stco_payload.extend_from_slice(&0u32.to_be_bytes()); // version/flags
        stco_payload.extend_from_slice(&1u32.to_be_bytes()); // entry count
        stco_payload.extend_from_slice(&chunk_offset.to_be_bytes());
        let stco = raw_box(b"stco", &stco_payload);
        let stbl = raw_box(b"stbl", &stco);
        let minf = raw_box(b"minf", &stbl);
        let mdia = raw_box(b"mdia", &minf);
        let trak = raw_box(b"trak", &mdia);
        raw_box(b"moov", &trak)
    }

    fn stco_entry(buf: &[u8]) -> u32 {
        let pos = buf.windows(4).position(|w| w == b"stco").unwrap();
        let at = pos + 4 + 4 + 4; // type, version/flags, entry count
        u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn embed_extract_and_offset_patch() {
        let io = BmffIO {};
        let mp4 = minimal_mp4();
        let original_offset = stco_entry(&mp4);

        let store = vec![0x42u8; 333];
        let mut out = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(mp4.clone()), &mut out, &store)
            .unwrap();
        let embedded = out.into_inner();

        let read_back = io
            .read_cai(&mut Cursor::new(embedded.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(read_back, store);

        // stco entry moved by exactly the inserted box length
        let inserted = build_manifest_box(&store).len() as u32;
        assert_eq!(stco_entry(&embedded), original_offset + inserted);

        // the entry still points at the mdat payload
        let at = stco_entry(&embedded) as usize;
        assert_eq!(&embedded[at..at + 4], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn remove_restores_original() {
        let io = BmffIO {};
        let mp4 = minimal_mp4();

        let mut out = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(mp4.clone()), &mut out, &[7u8; 100])
            .unwrap();

        let mut removed = Cursor::new(Vec::new());
        io.remove_cai_store_from_stream(
            &mut Cursor::new(out.into_inner()),
            &mut removed,
        )
        .unwrap();
        assert_eq!(removed.into_inner(), mp4);
    }

    #[test]
    fn replace_existing_manifest() {
        let io = BmffIO {};
        let mp4 = minimal_mp4();

        let mut first = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(mp4), &mut first, &[1u8; 50])
            .unwrap();

        let store_b = vec![2u8; 90];
        let mut second = Cursor::new(Vec::new());
        io.write_cai(
            &mut Cursor::new(first.into_inner()),
            &mut second,
            &store_b,
        )
        .unwrap();

        let bytes = second.into_inner();
        assert_eq!(
            io.read_cai(&mut Cursor::new(bytes.clone())).unwrap().unwrap(),
            store_b
        );
        let locations = io
            .get_object_locations_from_stream(&mut Cursor::new(bytes))
            .unwrap();
        assert_eq!(locations.len(), 1);
    }

    #[test]
    fn truncated_box_rejected() {
        let io = BmffIO {};
        let mut mp4 = minimal_mp4();
        mp4.truncate(mp4.len() - 2);
        assert!(io.read_cai(&mut Cursor::new(mp4)).is_err());
    }

    #[test]
    fn no_manifest_reads_none() {
        let io = BmffIO {};
        assert!(io
            .read_cai(&mut Cursor::new(minimal_mp4()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn uuid_box_with_bare_extended_type_rejected() {
        let io = BmffIO {};
        let ftyp = raw_box(b"ftyp", b"isom\0\0\x02\0isommp41");
        // payload is exactly the 16 byte extended type, nothing after
        let uuid = raw_box(b"uuid", &C2PA_UUID);
        let asset = [ftyp, uuid].concat();
        assert!(matches!(
            io.read_cai(&mut Cursor::new(asset)),
            Err(Error::InvalidAsset(_))
        ));
    }

    #[test]
    fn stco_entry_overflowing_u32_rejected() {
        let io = BmffIO {};
        let ftyp = raw_box(b"ftyp", b"isom\0\0\x02\0isommp41");
        let moov = build_moov(u32::MAX - 8);
        let asset = [ftyp, moov].concat();

        let mut out = Cursor::new(Vec::new());
        assert!(matches!(
            io.write_cai(&mut Cursor::new(asset), &mut out, &[0u8; 64]),
            Err(Error::InvalidAsset(_))
        ));
    }
}
