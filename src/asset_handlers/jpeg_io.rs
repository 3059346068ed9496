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

//! JPEG handler. The manifest store rides in APP11 marker segments
//! using the JPEG XT box carriage of ISO 19566-5: each segment repeats
//! a common identifier ("JP"), a box instance number and an ascending
//! packet sequence number, then the superbox header and the next slice
//! of its payload.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    asset_io::{
        AssetIO, CAIRead, CAIReadWrite, CAIReader, CAIWriter, HashBlockObjectType,
        HashObjectPositions,
    },
    error::{Error, Result},
};

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP11: u8 = 0xEB;

// JPEG XT common identifier "JP"
const CI_JPEG_XT: u16 = 0x4A50;
// box instance number for the C2PA superbox
const C2PA_EN: u16 = 0x0001;

// box payload bytes carried per APP11 segment, leaving room for the
// marker, length, CI/En/Z fields and the repeated box header
const MAX_PACKET_CONTENT: usize = 65000;

fn bad_jpeg(what: &str) -> Error {
    Error::InvalidAsset(format!("jpeg: {what}"))
}

// One parsed marker segment.
struct Segment {
    marker: u8,
    // offset of the 0xFF marker byte in the asset
    offset: usize,
    // segment payload without the length field
    payload: Vec<u8>,
}

impl Segment {
    // full on-disk size: marker + length field + payload
    fn total_len(&self) -> usize {
        2 + 2 + self.payload.len()
    }

    fn is_c2pa(&self) -> bool {
        self.marker == APP11
            && self.payload.len() >= 8
            && u16::from_be_bytes([self.payload[0], self.payload[1]]) == CI_JPEG_XT
            && u16::from_be_bytes([self.payload[2], self.payload[3]]) == C2PA_EN
    }
}

// Parses all marker segments up to (not including) the entropy coded
// scan data. The remainder of the stream starting at SOS is returned
// as the trailer.
fn parse_segments(reader: &mut dyn CAIRead) -> Result<(Vec<Segment>, Vec<u8>)> {
    reader.rewind()?;

    let mut soi = [0u8; 2];
    reader
        .read_exact(&mut soi)
        .map_err(|_| bad_jpeg("too short"))?;
    if soi != [0xFF, SOI] {
        return Err(bad_jpeg("missing SOI"));
    }

    let mut segments = Vec::new();
    loop {
        let offset = reader.stream_position()? as usize;

        let prefix = reader.read_u8().map_err(|_| bad_jpeg("truncated marker"))?;
        if prefix != 0xFF {
            return Err(bad_jpeg("expected marker"));
        }
        // 0xFF fill bytes before the marker code are legal
        let mut marker = reader.read_u8().map_err(|_| bad_jpeg("truncated marker"))?;
        while marker == 0xFF {
            marker = reader.read_u8().map_err(|_| bad_jpeg("truncated marker"))?;
        }

        match marker {
            EOI => {
                return Ok((segments, vec![0xFF, EOI]));
            }
            SOS => {
                // keep SOS and everything after it verbatim
                let mut trailer = vec![0xFF, SOS];
                reader.read_to_end(&mut trailer)?;
                return Ok((segments, trailer));
            }
            0x01 | 0xD0..=0xD7 => {
                segments.push(Segment {
                    marker,
                    offset,
                    payload: Vec::new(),
                });
            }
            _ => {
                let len = reader
                    .read_u16::<BigEndian>()
                    .map_err(|_| bad_jpeg("truncated segment length"))? as usize;
                if len < 2 {
                    return Err(bad_jpeg("bad segment length"));
                }
                let mut payload = vec![0u8; len - 2];
                reader
                    .read_exact(&mut payload)
                    .map_err(|_| bad_jpeg("truncated segment"))?;
                segments.push(Segment {
                    marker,
                    offset,
                    payload,
                });
            }
        }
    }
}

// Reassembles the JUMBF block from the C2PA APP11 packets.
fn assemble_store(segments: &[Segment]) -> Result<Option<Vec<u8>>> {
    let mut packets: Vec<(u32, &[u8])> = Vec::new();

    for seg in segments.iter().filter(|s| s.is_c2pa()) {
        if seg.payload.len() < 16 {
            return Err(bad_jpeg("APP11 packet too short"));
        }
        let z = u32::from_be_bytes([
            seg.payload[4],
            seg.payload[5],
            seg.payload[6],
            seg.payload[7],
        ]);
        packets.push((z, &seg.payload[8..]));
    }

    if packets.is_empty() {
        return Ok(None);
    }

    packets.sort_by_key(|(z, _)| *z);

    let mut jumbf = Vec::new();
    for (i, (_, data)) in packets.iter().enumerate() {
        if i == 0 {
            if &data[4..8] != b"jumb" {
                return Err(bad_jpeg("APP11 payload is not a jumb box"));
            }
            jumbf.extend_from_slice(data);
        } else {
            // later packets repeat the 8 byte box header
            if data.len() < 8 {
                return Err(bad_jpeg("APP11 continuation too short"));
            }
            jumbf.extend_from_slice(&data[8..]);
        }
    }

    Ok(Some(jumbf))
}

// Splits a JUMBF block into APP11 segment payloads.
fn packetize_store(store_bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    if store_bytes.len() < 8 {
        return Err(Error::JumbfCreationError);
    }
    let header = &store_bytes[..8];
    let body = &store_bytes[8..];

    let mut packets = Vec::new();
    let mut z: u32 = 1;
    let mut chunks = body.chunks(MAX_PACKET_CONTENT).peekable();

    // an empty body still needs one packet for the header
    if chunks.peek().is_none() {
        let mut payload = Vec::with_capacity(16);
        payload.write_u16::<BigEndian>(CI_JPEG_XT)?;
        payload.write_u16::<BigEndian>(C2PA_EN)?;
        payload.write_u32::<BigEndian>(z)?;
        payload.extend_from_slice(header);
        packets.push(payload);
        return Ok(packets);
    }

    for chunk in chunks {
        let mut payload = Vec::with_capacity(16 + chunk.len());
        payload.write_u16::<BigEndian>(CI_JPEG_XT)?;
        payload.write_u16::<BigEndian>(C2PA_EN)?;
        payload.write_u32::<BigEndian>(z)?;
        payload.extend_from_slice(header);
        payload.extend_from_slice(chunk);
        packets.push(payload);
        z += 1;
    }

    Ok(packets)
}

fn write_segment(output: &mut dyn CAIReadWrite, marker: u8, payload: &[u8]) -> Result<()> {
    output.write_all(&[0xFF, marker])?;
    if marker != SOI && !(0xD0..=0xD9).contains(&marker) && marker != 0x01 {
        output.write_u16::<BigEndian>(payload.len() as u16 + 2)?;
    }
    output.write_all(payload)?;
    Ok(())
}

/// Handler for `image/jpeg` assets.
pub struct JpegIO {}

impl CAIReader for JpegIO {
    fn read_cai(&self, asset_reader: &mut dyn CAIRead) -> Result<Option<Vec<u8>>> {
        let (segments, _) = parse_segments(asset_reader)?;
        assemble_store(&segments)
    }
}

impl CAIWriter for JpegIO {
    fn write_cai(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
        store_bytes: &[u8],
    ) -> Result<()> {
        let (segments, trailer) = parse_segments(input_stream)?;
        let packets = packetize_store(store_bytes)?;

        // insert after the last APP0/APP1 run so JFIF/EXIF stay first
        let insert_after = segments
            .iter()
            .rposition(|s| s.marker == APP0 || s.marker == APP1);

        output_stream.write_all(&[0xFF, SOI])?;

        let mut inserted = false;
        for (i, seg) in segments.iter().enumerate() {
            if seg.is_c2pa() {
                continue; // replaced below
            }
            write_segment(output_stream, seg.marker, &seg.payload)?;
            if Some(i) == insert_after {
                for packet in &packets {
                    write_segment(output_stream, APP11, packet)?;
                }
                inserted = true;
            }
        }
        if !inserted {
            for packet in &packets {
                write_segment(output_stream, APP11, packet)?;
            }
        }

        output_stream.write_all(&trailer)?;
        Ok(())
    }

    fn get_object_locations_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
    ) -> Result<Vec<HashObjectPositions>> {
        let (segments, _) = parse_segments(input_stream)?;
        Ok(segments
            .iter()
            .filter(|s| s.is_c2pa())
            .map(|s| HashObjectPositions {
                offset: s.offset,
                length: s.total_len(),
                htype: HashBlockObjectType::Cai,
            })
            .collect())
    }

    fn remove_cai_store_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
    ) -> Result<()> {
        let (segments, trailer) = parse_segments(input_stream)?;

        output_stream.write_all(&[0xFF, SOI])?;
        for seg in segments.iter().filter(|s| !s.is_c2pa()) {
            write_segment(output_stream, seg.marker, &seg.payload)?;
        }
        output_stream.write_all(&trailer)?;
        Ok(())
    }
}

impl AssetIO for JpegIO {
    fn supported_types(&self) -> &[&str] {
        &["jpg", "jpeg", "image/jpeg"]
    }

    fn supports_stream(&self, header: &[u8]) -> bool {
        header.len() >= 3 && header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF
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

    // SOI + APP0 (JFIF stub) + DQT stub + SOS + fake scan + EOI
    pub fn minimal_jpeg() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        // APP0
        bytes.extend_from_slice(&[0xFF, 0xE0]);
        let app0_payload = b"JFIF\0\x01\x02\0\0\x01\0\x01\0\0";
        bytes.extend_from_slice(&((app0_payload.len() as u16 + 2).to_be_bytes()));
        bytes.extend_from_slice(app0_payload);
        // DQT
        bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x06, 0x00, 0x01, 0x02, 0x03]);
        // SOS + scan + EOI
        bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x04, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x12, 0x34, 0x56]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn fake_store(len: usize) -> Vec<u8> {
        let mut store = Vec::with_capacity(len);
        store.extend_from_slice(&((len as u32).to_be_bytes()));
        store.extend_from_slice(b"jumb");
        store.resize(len, 0x5A);
        store
    }

    #[test]
    fn embed_and_extract() {
        let jpeg = minimal_jpeg();
        let store = fake_store(600);

        let io = JpegIO {};
        let mut output = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(jpeg), &mut output, &store)
            .unwrap();

        let out_bytes = output.into_inner();
        let read_back = io
            .read_cai(&mut Cursor::new(out_bytes))
            .unwrap()
            .unwrap();
        assert_eq!(read_back, store);
    }

    #[test]
    fn large_store_fragments_across_segments() {
        let jpeg = minimal_jpeg();
        let store = fake_store(200_000); // forces several APP11 packets

        let io = JpegIO {};
        let mut output = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(jpeg), &mut output, &store)
            .unwrap();

        let out_bytes = output.into_inner();
        let mut stream = Cursor::new(out_bytes);
        let locations = io.get_object_locations_from_stream(&mut stream).unwrap();
        assert!(locations.len() > 1);

        // spans are adjacent and cover exactly the framing overhead
        // per packet: marker + length field + CI + En + Z + repeated box header
        let framed: usize = locations.iter().map(|l| l.length).sum();
        let packets = (store.len() - 8).div_ceil(MAX_PACKET_CONTENT);
        assert_eq!(framed, (store.len() - 8) + packets * (2 + 2 + 2 + 2 + 4 + 8));

        let read_back = stream_read(&io, stream.into_inner());
        assert_eq!(read_back, store);
    }

    fn stream_read(io: &JpegIO, bytes: Vec<u8>) -> Vec<u8> {
        io.read_cai(&mut Cursor::new(bytes)).unwrap().unwrap()
    }

    #[test]
    fn replace_existing_store() {
        let jpeg = minimal_jpeg();
        let io = JpegIO {};

        let mut first = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(jpeg), &mut first, &fake_store(300))
            .unwrap();

        let second_store = fake_store(700);
        let mut second = Cursor::new(Vec::new());
        io.write_cai(
            &mut Cursor::new(first.into_inner()),
            &mut second,
            &second_store,
        )
        .unwrap();

        let read_back = stream_read(&io, second.into_inner());
        assert_eq!(read_back, second_store);
    }

    #[test]
    fn remove_store_restores_original() {
        let jpeg = minimal_jpeg();
        let io = JpegIO {};

        let mut with_store = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(jpeg.clone()), &mut with_store, &fake_store(300))
            .unwrap();

        let mut removed = Cursor::new(Vec::new());
        io.remove_cai_store_from_stream(&mut Cursor::new(with_store.into_inner()), &mut removed)
            .unwrap();
        assert_eq!(removed.into_inner(), jpeg);
    }

    #[test]
    fn no_manifest_reads_none() {
        let io = JpegIO {};
        assert!(io
            .read_cai(&mut Cursor::new(minimal_jpeg()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn truncated_jpeg_rejected() {
        let io = JpegIO {};
        let mut jpeg = minimal_jpeg();
        jpeg.truncate(6); // inside the APP0 header
        assert!(io.read_cai(&mut Cursor::new(jpeg)).is_err());
    }
}
