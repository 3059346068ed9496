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

//! PNG handler. The manifest store rides in a single `caBX` chunk
//! placed right after `IHDR`, with its CRC computed like any other
//! chunk.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    asset_io::{
        AssetIO, CAIRead, CAIReadWrite, CAIReader, CAIWriter, HashBlockObjectType,
        HashObjectPositions,
    },
    error::{Error, Result},
};

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const CAI_CHUNK: [u8; 4] = *b"caBX";
const IHDR: [u8; 4] = *b"IHDR";

fn bad_png(what: &str) -> Error {
    Error::InvalidAsset(format!("png: {what}"))
}

struct Chunk {
    name: [u8; 4],
    // offset of the length field in the asset
    offset: usize,
    data: Vec<u8>,
}

impl Chunk {
    // full on-disk size: length + type + data + crc
    fn total_len(&self) -> usize {
        4 + 4 + self.data.len() + 4
    }
}

fn chunk_crc(name: &[u8; 4], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(name);
    hasher.update(data);
    hasher.finalize()
}

fn parse_chunks(reader: &mut dyn CAIRead) -> Result<Vec<Chunk>> {
    reader.rewind()?;

    let mut signature = [0u8; 8];
    reader
        .read_exact(&mut signature)
        .map_err(|_| bad_png("too short"))?;
    if signature != PNG_SIGNATURE {
        return Err(bad_png("bad signature"));
    }

    let mut chunks = Vec::new();
    loop {
        let offset = reader.stream_position()? as usize;
        let len = match reader.read_u32::<BigEndian>() {
            Ok(len) => len as usize,
            Err(_) => break, // end of stream
        };
        let mut name = [0u8; 4];
        reader
            .read_exact(&mut name)
            .map_err(|_| bad_png("truncated chunk type"))?;
        let mut data = vec![0u8; len];
        reader
            .read_exact(&mut data)
            .map_err(|_| bad_png("truncated chunk data"))?;
        let crc = reader
            .read_u32::<BigEndian>()
            .map_err(|_| bad_png("truncated chunk crc"))?;

        if name == CAI_CHUNK && crc != chunk_crc(&name, &data) {
            return Err(bad_png("manifest chunk crc mismatch"));
        }

        let done = name == *b"IEND";
        chunks.push(Chunk { name, offset, data });
        if done {
            break;
        }
    }

    if chunks.first().map(|c| c.name) != Some(IHDR) {
        return Err(bad_png("first chunk is not IHDR"));
    }

    Ok(chunks)
}

fn write_chunk(output: &mut dyn CAIReadWrite, name: &[u8; 4], data: &[u8]) -> Result<()> {
    output.write_u32::<BigEndian>(data.len() as u32)?;
    output.write_all(name)?;
    output.write_all(data)?;
    output.write_u32::<BigEndian>(chunk_crc(name, data))?;
    Ok(())
}

/// Handler for `image/png` assets.
pub struct PngIO {}

impl CAIReader for PngIO {
    fn read_cai(&self, asset_reader: &mut dyn CAIRead) -> Result<Option<Vec<u8>>> {
        let chunks = parse_chunks(asset_reader)?;
        Ok(chunks
            .into_iter()
            .find(|c| c.name == CAI_CHUNK)
            .map(|c| c.data))
    }
}

impl CAIWriter for PngIO {
    fn write_cai(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
        store_bytes: &[u8],
    ) -> Result<()> {
        let chunks = parse_chunks(input_stream)?;

        output_stream.write_all(&PNG_SIGNATURE)?;
        for chunk in chunks.iter().filter(|c| c.name != CAI_CHUNK) {
            write_chunk(output_stream, &chunk.name, &chunk.data)?;
            if chunk.name == IHDR {
                write_chunk(output_stream, &CAI_CHUNK, store_bytes)?;
            }
        }
        Ok(())
    }

    fn get_object_locations_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
    ) -> Result<Vec<HashObjectPositions>> {
        let chunks = parse_chunks(input_stream)?;
        Ok(chunks
            .iter()
            .filter(|c| c.name == CAI_CHUNK)
            .map(|c| HashObjectPositions {
                offset: c.offset,
                length: c.total_len(),
                htype: HashBlockObjectType::Cai,
            })
            .collect())
    }

    fn remove_cai_store_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
    ) -> Result<()> {
        let chunks = parse_chunks(input_stream)?;

        output_stream.write_all(&PNG_SIGNATURE)?;
        for chunk in chunks.iter().filter(|c| c.name != CAI_CHUNK) {
            write_chunk(output_stream, &chunk.name, &chunk.data)?;
        }
        Ok(())
    }
}

impl AssetIO for PngIO {
    fn supported_types(&self) -> &[&str] {
        &["png", "image/png"]
    }

    fn supports_stream(&self, header: &[u8]) -> bool {
        header.len() >= 8 && header[..8] == PNG_SIGNATURE
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

    pub fn minimal_png() -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();

        // IHDR for a 1x1 grayscale image
        let ihdr_data = [0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0];
        let mut cursor = Cursor::new(Vec::new());
        write_chunk(&mut cursor, &IHDR, &ihdr_data).unwrap();
        write_chunk(&mut cursor, b"IDAT", &[0x78, 0x9C, 0x62, 0x00, 0x00]).unwrap();
        write_chunk(&mut cursor, b"IEND", &[]).unwrap();
        bytes.extend_from_slice(&cursor.into_inner());
        bytes
    }

    #[test]
    fn embed_extract_and_replace() {
        let io = PngIO {};
        let png = minimal_png();

        let store_a = vec![0xAAu8; 500];
        let mut out_a = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(png.clone()), &mut out_a, &store_a)
            .unwrap();
        let bytes_a = out_a.into_inner();
        assert_eq!(
            io.read_cai(&mut Cursor::new(bytes_a.clone())).unwrap().unwrap(),
            store_a
        );

        let store_b = vec![0xBBu8; 100];
        let mut out_b = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(bytes_a), &mut out_b, &store_b)
            .unwrap();
        assert_eq!(
            io.read_cai(&mut Cursor::new(out_b.into_inner()))
                .unwrap()
                .unwrap(),
            store_b
        );
    }

    #[test]
    fn manifest_chunk_sits_after_ihdr() {
        let io = PngIO {};
        let mut out = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(minimal_png()), &mut out, &[1, 2, 3])
            .unwrap();

        let bytes = out.into_inner();
        let locations = io
            .get_object_locations_from_stream(&mut Cursor::new(bytes))
            .unwrap();
        assert_eq!(locations.len(), 1);
        // signature + IHDR chunk (13 data bytes)
        assert_eq!(locations[0].offset, 8 + 12 + 13);
        assert_eq!(locations[0].length, 12 + 3);
    }

    #[test]
    fn corrupted_manifest_crc_rejected() {
        let io = PngIO {};
        let mut out = Cursor::new(Vec::new());
        io.write_cai(&mut Cursor::new(minimal_png()), &mut out, &[9u8; 64])
            .unwrap();

        let mut bytes = out.into_inner();
        // flip a byte inside the caBX data
        let pos = bytes.windows(4).position(|w| w == b"caBX").unwrap() + 10;
        bytes[pos] ^= 0xFF;
        assert!(io.read_cai(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn non_png_rejected() {
        let io = PngIO {};
        assert!(io.read_cai(&mut Cursor::new(vec![0u8; 20])).is_err());
        assert!(!io.supports_stream(&[0xFF, 0xD8, 0xFF]));
        assert!(io.supports_stream(&PNG_SIGNATURE));
    }

    #[test]
    fn no_manifest_reads_none() {
        let io = PngIO {};
        assert!(io
            .read_cai(&mut Cursor::new(minimal_png()))
            .unwrap()
            .is_none());
    }
}
