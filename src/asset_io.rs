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

use std::io::{Read, Seek, Write};

use crate::error::Result;

/// Stream capabilities needed by handlers reading an asset.
pub trait CAIRead: Read + Seek + Send {}

impl<T> CAIRead for T where T: Read + Seek + Send {}

/// Stream capabilities needed by handlers writing an asset.
pub trait CAIReadWrite: Read + Write + Seek + Send {}

impl<T> CAIReadWrite for T where T: Read + Write + Seek + Send {}

/// What kind of object a byte span in the asset represents, used to
/// derive hash exclusions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashBlockObjectType {
    /// The manifest store framing itself.
    Cai,
    /// Any other bookkeeping span a handler wants excluded.
    Other,
}

/// A byte span in the output asset, as reported by a handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HashObjectPositions {
    /// Offset from the start of the asset.
    pub offset: usize,
    /// Span length in bytes.
    pub length: usize,
    /// What the span holds.
    pub htype: HashBlockObjectType,
}

/// Reads manifest store bytes out of an asset.
pub trait CAIReader: Sync + Send {
    /// Returns the complete JUMBF block carried by the asset, or
    /// `None` when the asset has no manifest.
    fn read_cai(&self, asset_reader: &mut dyn CAIRead) -> Result<Option<Vec<u8>>>;
}

/// Embeds and removes manifest store bytes in an asset.
pub trait CAIWriter: Sync + Send {
    /// Copies the input asset to the output with `store_bytes` embedded
    /// as its manifest, replacing any existing manifest.
    fn write_cai(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
        store_bytes: &[u8],
    ) -> Result<()>;

    /// Reports the byte spans occupied by manifest framing in the
    /// given asset. Used to build hard binding exclusions.
    fn get_object_locations_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
    ) -> Result<Vec<HashObjectPositions>>;

    /// Copies the input asset to the output with any manifest removed.
    fn remove_cai_store_from_stream(
        &self,
        input_stream: &mut dyn CAIRead,
        output_stream: &mut dyn CAIReadWrite,
    ) -> Result<()>;
}

/// One container format handler.
pub trait AssetIO: Sync + Send {
    /// Extensions and MIME types this handler serves.
    fn supported_types(&self) -> &[&str];

    /// Returns `true` if the asset's magic bytes match this format.
    fn supports_stream(&self, header: &[u8]) -> bool;

    fn get_reader(&self) -> &dyn CAIReader;

    fn get_writer(&self) -> Option<&dyn CAIWriter>;
}
