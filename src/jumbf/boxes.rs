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

//! JUMBF box codec per ISO/IEC 19566-5 with the C2PA box vocabulary.
//!
//! A `jumb` superbox starts with a `jumd` description box (UUID,
//! toggles, optional label / box ID / signature / private salt box)
//! followed by content boxes. Parsing is bounds checked and depth
//! limited; serialization is byte exact for every well formed tree.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// UUID for the C2PA manifest store (block) superbox.
pub const CAI_BLOCK_UUID: &str = "6332706100110010800000AA00389B71"; // c2pa
/// UUID for a standard manifest superbox.
pub const CAI_STORE_UUID: &str = "63326D6100110010800000AA00389B71"; // c2ma
/// UUID for an update manifest superbox.
pub const CAI_UPDATE_MANIFEST_UUID: &str = "6332756D00110010800000AA00389B71"; // c2um
/// UUID for the assertion store superbox.
pub const CAI_ASSERTION_STORE_UUID: &str = "6332617300110010800000AA00389B71"; // c2as
/// UUID for the claim superbox.
pub const CAI_CLAIM_UUID: &str = "6332636C00110010800000AA00389B71"; // c2cl
/// UUID for the claim signature superbox.
pub const CAI_SIGNATURE_UUID: &str = "6332637300110010800000AA00389B71"; // c2cs
/// UUID for a JSON content superbox.
pub const JUMBF_JSON_UUID: &str = "6A736F6E00110010800000AA00389B71"; // json
/// UUID for a CBOR content superbox.
pub const JUMBF_CBOR_UUID: &str = "63626F7200110010800000AA00389B71"; // cbor
/// UUID for an embedded-file superbox.
pub const JUMBF_EMBEDDED_FILE_UUID: &str = "40CB0C32BB8A489DA70B2AD6F47F4369";

// jumd toggle bits
const TOGGLE_REQUESTABLE: u8 = 0x01;
const TOGGLE_LABEL: u8 = 0x02;
const TOGGLE_BOX_ID: u8 = 0x04;
const TOGGLE_SIGNATURE: u8 = 0x08;
const TOGGLE_PRIVATE_BOX: u8 = 0x10;

const MAX_BOX_DEPTH: usize = 32;

fn box_malformed(what: &str) -> Error {
    Error::JumbfBoxMalformed(what.to_string())
}

/// Decodes one of the hex UUID constants above.
pub fn uuid_from_hex(hex_uuid: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(hex_uuid).map_err(|_| box_malformed("bad uuid hex"))?;
    bytes
        .try_into()
        .map_err(|_| box_malformed("uuid must be 16 bytes"))
}

/// The parsed size + type prelude of an ISO box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxHeader {
    /// Four character box type.
    pub name: [u8; 4],
    /// Total box size including the header itself.
    pub size: u64,
    /// Size of the header prelude (8, or 16 with largesize).
    pub header_len: u64,
}

impl BoxHeader {
    /// Reads a box header. `size == 0` (box extends to end of file) is
    /// rejected here; only the BMFF asset walker tolerates it.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let size32 = reader
            .read_u32::<BigEndian>()
            .map_err(|_| box_malformed("truncated box header"))?;
        let mut name = [0u8; 4];
        reader
            .read_exact(&mut name)
            .map_err(|_| box_malformed("truncated box type"))?;

        let (size, header_len) = match size32 {
            0 => return Err(box_malformed("box with size 0 not allowed here")),
            1 => {
                let large = reader
                    .read_u64::<BigEndian>()
                    .map_err(|_| box_malformed("truncated largesize"))?;
                (large, 16u64)
            }
            s => (s as u64, 8u64),
        };

        if size < header_len {
            return Err(box_malformed("box size smaller than header"));
        }

        Ok(BoxHeader {
            name,
            size,
            header_len,
        })
    }

    /// Payload length in bytes.
    pub fn payload_len(&self) -> u64 {
        self.size - self.header_len
    }
}

// Writes a box header followed by the payload. Uses largesize only
// when the total cannot fit a u32.
fn write_box(out: &mut Vec<u8>, name: &[u8; 4], payload: &[u8]) -> Result<()> {
    let total = payload.len() as u64 + 8;
    if total <= u32::MAX as u64 {
        out.write_u32::<BigEndian>(total as u32)?;
        out.extend_from_slice(name);
    } else {
        out.write_u32::<BigEndian>(1)?;
        out.extend_from_slice(name);
        out.write_u64::<BigEndian>(total + 8)?;
    }
    out.extend_from_slice(payload);
    Ok(())
}

/// A leaf content box: raw payload under a four character type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataBox {
    /// Box type, e.g. `*b"cbor"`.
    pub name: [u8; 4],
    /// Raw payload bytes.
    pub data: Vec<u8>,
}

impl DataBox {
    pub fn new(name: &[u8; 4], data: Vec<u8>) -> Self {
        DataBox { name: *name, data }
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        write_box(out, &self.name, &self.data)
    }
}

/// The `jumd` description box carried as the first child of every
/// superbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptionBox {
    uuid: [u8; 16],
    requestable: bool,
    label: Option<String>,
    box_id: Option<u32>,
    signature: Option<[u8; 32]>,
    salt: Option<Vec<u8>>,
}

impl DescriptionBox {
    /// Creates a requestable description with a label, the common case
    /// for C2PA boxes.
    pub fn new(uuid: [u8; 16], label: Option<String>) -> Self {
        DescriptionBox {
            uuid,
            requestable: label.is_some(),
            label,
            box_id: None,
            signature: None,
            salt: None,
        }
    }

    pub fn uuid(&self) -> &[u8; 16] {
        &self.uuid
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.salt.as_deref()
    }

    pub fn set_salt(&mut self, salt: Vec<u8>) {
        self.salt = Some(salt);
    }

    fn toggles(&self) -> u8 {
        let mut t = 0u8;
        if self.requestable {
            t |= TOGGLE_REQUESTABLE;
        }
        if self.label.is_some() {
            t |= TOGGLE_LABEL;
        }
        if self.box_id.is_some() {
            t |= TOGGLE_BOX_ID;
        }
        if self.signature.is_some() {
            t |= TOGGLE_SIGNATURE;
        }
        if self.salt.is_some() {
            t |= TOGGLE_PRIVATE_BOX;
        }
        t
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut payload = Vec::with_capacity(32);
        payload.extend_from_slice(&self.uuid);
        payload.push(self.toggles());
        if let Some(label) = &self.label {
            payload.extend_from_slice(label.as_bytes());
            payload.push(0);
        }
        if let Some(id) = self.box_id {
            payload.write_u32::<BigEndian>(id)?;
        }
        if let Some(sig) = &self.signature {
            payload.extend_from_slice(sig);
        }
        if let Some(salt) = &self.salt {
            let mut salt_box = Vec::with_capacity(salt.len() + 8);
            write_box(&mut salt_box, b"c2sh", salt)?;
            payload.extend_from_slice(&salt_box);
        }
        write_box(out, b"jumd", &payload)
    }

    fn read(payload: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(payload);

        let mut uuid = [0u8; 16];
        cursor
            .read_exact(&mut uuid)
            .map_err(|_| box_malformed("description box too short for uuid"))?;
        let toggles = cursor
            .read_u8()
            .map_err(|_| box_malformed("description box missing toggles"))?;

        let label = if toggles & TOGGLE_LABEL != 0 {
            let mut bytes = Vec::new();
            loop {
                let b = cursor
                    .read_u8()
                    .map_err(|_| box_malformed("unterminated label"))?;
                if b == 0 {
                    break;
                }
                bytes.push(b);
            }
            Some(String::from_utf8(bytes).map_err(|_| box_malformed("label is not utf-8"))?)
        } else {
            None
        };

        if toggles & TOGGLE_REQUESTABLE != 0 && label.is_none() {
            return Err(box_malformed("requestable box without label"));
        }

        let box_id = if toggles & TOGGLE_BOX_ID != 0 {
            Some(
                cursor
                    .read_u32::<BigEndian>()
                    .map_err(|_| box_malformed("truncated box id"))?,
            )
        } else {
            None
        };

        let signature = if toggles & TOGGLE_SIGNATURE != 0 {
            let mut sig = [0u8; 32];
            cursor
                .read_exact(&mut sig)
                .map_err(|_| box_malformed("truncated description signature"))?;
            Some(sig)
        } else {
            None
        };

        let salt = if toggles & TOGGLE_PRIVATE_BOX != 0 {
            let header = BoxHeader::read(&mut cursor)?;
            if &header.name != b"c2sh" {
                return Err(box_malformed("private box is not c2sh"));
            }
            let mut salt = vec![0u8; header.payload_len() as usize];
            cursor
                .read_exact(&mut salt)
                .map_err(|_| box_malformed("truncated salt box"))?;
            Some(salt)
        } else {
            None
        };

        Ok(DescriptionBox {
            uuid,
            requestable: toggles & TOGGLE_REQUESTABLE != 0,
            label,
            box_id,
            signature,
            salt,
        })
    }
}

/// Any box inside a superbox: either a nested superbox or a leaf
/// content box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JumbfBox {
    SuperBox(SuperBox),
    DataBox(DataBox),
}

impl JumbfBox {
    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            JumbfBox::SuperBox(sb) => sb.write(out),
            JumbfBox::DataBox(db) => db.write(out),
        }
    }

    /// Returns the nested superbox if this is one.
    pub fn as_super_box(&self) -> Option<&SuperBox> {
        match self {
            JumbfBox::SuperBox(sb) => Some(sb),
            JumbfBox::DataBox(_) => None,
        }
    }

    /// Returns the leaf box if this is one.
    pub fn as_data_box(&self) -> Option<&DataBox> {
        match self {
            JumbfBox::DataBox(db) => Some(db),
            JumbfBox::SuperBox(_) => None,
        }
    }
}

/// A `jumb` superbox: description plus ordered children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuperBox {
    desc: DescriptionBox,
    children: Vec<JumbfBox>,
}

impl SuperBox {
    pub fn new(desc: DescriptionBox) -> Self {
        SuperBox {
            desc,
            children: Vec::new(),
        }
    }

    pub fn desc(&self) -> &DescriptionBox {
        &self.desc
    }

    pub fn desc_mut(&mut self) -> &mut DescriptionBox {
        &mut self.desc
    }

    pub fn add_data_box(&mut self, db: DataBox) {
        self.children.push(JumbfBox::DataBox(db));
    }

    pub fn add_super_box(&mut self, sb: SuperBox) {
        self.children.push(JumbfBox::SuperBox(sb));
    }

    /// Child superboxes in order.
    pub fn super_boxes(&self) -> impl Iterator<Item = &SuperBox> {
        self.children.iter().filter_map(|c| c.as_super_box())
    }

    /// Finds a direct child superbox by its description label.
    pub fn find_by_label(&self, label: &str) -> Option<&SuperBox> {
        self.super_boxes().find(|sb| sb.desc.label() == Some(label))
    }

    /// First leaf box with the given four character type.
    pub fn data_box_of_type(&self, name: &[u8; 4]) -> Option<&DataBox> {
        self.children
            .iter()
            .filter_map(|c| c.as_data_box())
            .find(|db| &db.name == name)
    }

    /// First leaf box regardless of type.
    pub fn first_data_box(&self) -> Option<&DataBox> {
        self.children.iter().find_map(|c| c.as_data_box())
    }

    fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut payload = Vec::new();
        self.desc.write(&mut payload)?;
        for child in &self.children {
            child.write(&mut payload)?;
        }
        write_box(out, b"jumb", &payload)
    }

    /// Serializes the complete superbox.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// Parses a superbox from a buffer that contains exactly one
    /// `jumb` box.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let header = BoxHeader::read(&mut cursor)?;
        if &header.name != b"jumb" {
            return Err(box_malformed("top-level box is not jumb"));
        }
        if header.size != data.len() as u64 {
            return Err(box_malformed("jumb box size does not match buffer"));
        }
        read_super_box_payload(&mut cursor, header.payload_len(), 0)
    }
}

// Reads the payload of a jumb box (description plus children) from the
// current cursor position.
fn read_super_box_payload<R: Read + Seek>(
    reader: &mut R,
    payload_len: u64,
    depth: usize,
) -> Result<SuperBox> {
    if depth > MAX_BOX_DEPTH {
        return Err(Error::JumbfBoxDepthExceeded);
    }

    let payload_start = reader.stream_position()?;
    let payload_end = payload_start
        .checked_add(payload_len)
        .ok_or_else(|| box_malformed("box size overflow"))?;

    // first child must be the description box
    let desc_header = BoxHeader::read(reader)?;
    if &desc_header.name != b"jumd" {
        return Err(box_malformed("superbox does not start with jumd"));
    }
    let desc_end = reader
        .stream_position()?
        .checked_add(desc_header.payload_len())
        .ok_or_else(|| box_malformed("box size overflow"))?;
    if desc_end > payload_end {
        return Err(box_malformed("description box overruns parent"));
    }
    let mut desc_payload = vec![0u8; desc_header.payload_len() as usize];
    reader
        .read_exact(&mut desc_payload)
        .map_err(|_| box_malformed("truncated description box"))?;
    let desc = DescriptionBox::read(&desc_payload)?;

    let mut sb = SuperBox::new(desc);

    while reader.stream_position()? < payload_end {
        let header = BoxHeader::read(reader)?;
        let child_end = reader
            .stream_position()?
            .checked_add(header.payload_len())
            .ok_or_else(|| box_malformed("box size overflow"))?;
        if child_end > payload_end {
            return Err(box_malformed("child box overruns parent"));
        }

        if &header.name == b"jumb" {
            let child = read_super_box_payload(reader, header.payload_len(), depth + 1)?;
            sb.add_super_box(child);
        } else {
            let mut data = vec![0u8; header.payload_len() as usize];
            reader
                .read_exact(&mut data)
                .map_err(|_| box_malformed("truncated content box"))?;
            sb.add_data_box(DataBox::new(&header.name, data));
        }

        // guard against readers that consumed short
        reader.seek(SeekFrom::Start(child_end))?;
    }

    Ok(sb)
}

#[cfg(test)]
pub mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn labeled_box(uuid_hex: &str, label: &str) -> SuperBox {
        SuperBox::new(DescriptionBox::new(
            uuid_from_hex(uuid_hex).unwrap(),
            Some(label.to_string()),
        ))
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let mut store = labeled_box(CAI_ASSERTION_STORE_UUID, "c2pa.assertions");

        let mut actions = labeled_box(JUMBF_CBOR_UUID, "c2pa.actions");
        actions.add_data_box(DataBox::new(b"cbor", vec![0xa1, 0x01, 0x02]));
        actions.desc_mut().set_salt(vec![7u8; 16]);
        store.add_super_box(actions);

        let mut claim_thumb = labeled_box(JUMBF_JSON_UUID, "c2pa.thumbnail.claim.jpeg");
        claim_thumb.add_data_box(DataBox::new(b"json", b"{\"k\":1}".to_vec()));
        store.add_super_box(claim_thumb);

        let bytes = store.to_vec().unwrap();
        let parsed = SuperBox::from_slice(&bytes).unwrap();
        assert_eq!(parsed, store);
        assert_eq!(parsed.to_vec().unwrap(), bytes);
    }

    #[test]
    fn find_by_label_walks_children() {
        let mut block = labeled_box(CAI_BLOCK_UUID, "c2pa");
        let mut manifest = labeled_box(CAI_STORE_UUID, "urn:uuid:abc");
        let mut claim = labeled_box(CAI_CLAIM_UUID, "c2pa.claim");
        claim.add_data_box(DataBox::new(b"cbor", vec![0xa0]));
        manifest.add_super_box(claim);
        block.add_super_box(manifest);

        let bytes = block.to_vec().unwrap();
        let parsed = SuperBox::from_slice(&bytes).unwrap();

        let found = parsed
            .find_by_label("urn:uuid:abc")
            .and_then(|m| m.find_by_label("c2pa.claim"))
            .and_then(|c| c.data_box_of_type(b"cbor"))
            .unwrap();
        assert_eq!(found.data, vec![0xa0]);
    }

    #[test]
    fn truncated_box_rejected() {
        let store = labeled_box(CAI_BLOCK_UUID, "c2pa");
        let mut bytes = store.to_vec().unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(SuperBox::from_slice(&bytes).is_err());
    }

    #[test]
    fn child_overrunning_parent_rejected() {
        let mut inner = labeled_box(JUMBF_CBOR_UUID, "x");
        inner.add_data_box(DataBox::new(b"cbor", vec![1, 2, 3, 4]));
        let mut outer = labeled_box(CAI_BLOCK_UUID, "c2pa");
        outer.add_super_box(inner);
        let mut bytes = outer.to_vec().unwrap();

        // inflate the inner cbor box length field so it runs past its parent
        let pos = bytes.windows(4).position(|w| w == b"cbor").unwrap() - 4;
        bytes[pos..pos + 4].copy_from_slice(&0xFFFFu32.to_be_bytes());
        assert!(SuperBox::from_slice(&bytes).is_err());
    }

    #[test]
    fn size_zero_rejected_in_jumbf() {
        let store = labeled_box(CAI_BLOCK_UUID, "c2pa");
        let mut bytes = store.to_vec().unwrap();
        bytes[0..4].copy_from_slice(&0u32.to_be_bytes());
        assert!(SuperBox::from_slice(&bytes).is_err());
    }

    #[test]
    fn requestable_without_label_rejected() {
        // hand-build a jumd whose toggles claim requestable but no label
        let mut desc_payload = Vec::new();
        desc_payload.extend_from_slice(&uuid_from_hex(CAI_BLOCK_UUID).unwrap());
        desc_payload.push(TOGGLE_REQUESTABLE);
        let mut desc = Vec::new();
        write_box(&mut desc, b"jumd", &desc_payload).unwrap();
        let mut jumb = Vec::new();
        write_box(&mut jumb, b"jumb", &desc).unwrap();
        assert!(SuperBox::from_slice(&jumb).is_err());
    }

    #[test]
    fn largesize_overflowing_u64_rejected() {
        // outer jumb of 24 bytes whose jumd declares largesize u64::MAX,
        // which would wrap the end-of-box arithmetic
        let mut bytes = Vec::new();
        bytes.write_u32::<BigEndian>(24).unwrap();
        bytes.extend_from_slice(b"jumb");
        bytes.write_u32::<BigEndian>(1).unwrap();
        bytes.extend_from_slice(b"jumd");
        bytes.write_u64::<BigEndian>(u64::MAX).unwrap();
        assert!(matches!(
            SuperBox::from_slice(&bytes),
            Err(Error::JumbfBoxMalformed(_))
        ));
    }

    #[test]
    fn largesize_header_parses() {
        let mut payload = Vec::new();
        payload.write_u32::<BigEndian>(1).unwrap();
        payload.extend_from_slice(b"free");
        payload.write_u64::<BigEndian>(20).unwrap();
        payload.extend_from_slice(&[0u8; 4]);

        let mut cursor = Cursor::new(payload);
        let header = BoxHeader::read(&mut cursor).unwrap();
        assert_eq!(&header.name, b"free");
        assert_eq!(header.size, 20);
        assert_eq!(header.header_len, 16);
        assert_eq!(header.payload_len(), 4);
    }
}
