//! MagicaVoxel VOX decoder.
//!
//! Voxel models are the asset kind that needs GPU preparation: each model is
//! packed into an instance buffer on every upload context.
//!
//! ## VOX Format Reference
//!
//! ```text
//! VOX File Structure:
//! ├── "VOX " (4 bytes) - Magic number
//! ├── Version (4 bytes) - File version (150)
//! └── MAIN Chunk
//!     ├── SIZE Chunk - Model dimensions
//!     ├── XYZI Chunk - Voxel data
//!     └── RGBA Chunk - Palette (optional)
//! ```
//!
//! Only the first model of a multi-model file is kept.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::VoxError;

/// VOX file magic number.
const VOX_MAGIC: [u8; 4] = *b"VOX ";

/// Oldest and newest versions accepted.
const VOX_VERSIONS: std::ops::RangeInclusive<u32> = 150..=200;

/// Upper bound on the voxel list reserved before reading an XYZI chunk.
const MAX_PREALLOCATED_VOXELS: usize = 4096;

/// Color entry in a VOX palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoxColor {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255).
    pub a: u8,
}

impl VoxColor {
    /// Returns as normalized float array [r, g, b, a].
    #[inline]
    #[must_use]
    pub fn as_float(&self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

/// 256-entry palette. Index 0 is always transparent.
#[derive(Debug, Clone)]
pub struct VoxPalette {
    /// Color entries.
    pub colors: [VoxColor; 256],
}

impl Default for VoxPalette {
    /// Grey ramp used when a file carries no RGBA chunk.
    fn default() -> Self {
        let mut colors = [VoxColor::default(); 256];
        for (i, color) in colors.iter_mut().enumerate().skip(1) {
            let level = u8::try_from(255 - i).unwrap_or(0);
            *color = VoxColor {
                r: level,
                g: level,
                b: level,
                a: 255,
            };
        }
        Self { colors }
    }
}

impl VoxPalette {
    /// Gets color at index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u8) -> VoxColor {
        self.colors[usize::from(index)]
    }
}

/// Single voxel of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelVoxel {
    /// X position.
    pub x: u8,
    /// Y position (engine up axis).
    pub y: u8,
    /// Z position.
    pub z: u8,
    /// Palette index.
    pub color_index: u8,
}

/// Decoded voxel model.
#[derive(Debug, Clone)]
pub struct VoxelModel {
    /// Model name (file stem).
    pub name: String,
    /// Dimensions in engine axes (x, y-up, z).
    pub size: [u32; 3],
    /// Solid voxels.
    pub voxels: Vec<ModelVoxel>,
    /// Color palette.
    pub palette: VoxPalette,
}

impl VoxelModel {
    /// Returns the number of voxels.
    #[inline]
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Color of a voxel.
    #[inline]
    #[must_use]
    pub fn color_of(&self, voxel: &ModelVoxel) -> VoxColor {
        self.palette.get(voxel.color_index)
    }
}

/// VOX file decoder.
pub struct VoxDecoder;

impl VoxDecoder {
    /// Decodes a VOX file from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or has invalid format.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<VoxelModel, VoxError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        let mut reader = io::BufReader::new(File::open(path)?);
        Self::parse(&mut reader, name)
    }

    /// Decodes a VOX file from memory.
    ///
    /// # Errors
    ///
    /// Returns error if the data has invalid format.
    pub fn decode(data: &[u8], name: impl Into<String>) -> Result<VoxelModel, VoxError> {
        Self::parse(&mut io::Cursor::new(data), name.into())
    }

    fn parse<R: Read + Seek>(reader: &mut R, name: String) -> Result<VoxelModel, VoxError> {
        let magic = read_id(reader)?;
        if magic != VOX_MAGIC {
            return Err(VoxError::InvalidFormat(format!(
                "expected 'VOX ', got '{}'",
                String::from_utf8_lossy(&magic)
            )));
        }

        let version = read_u32(reader)?;
        if !VOX_VERSIONS.contains(&version) {
            return Err(VoxError::UnsupportedVersion(version));
        }

        if read_id(reader)? != *b"MAIN" {
            return Err(VoxError::InvalidFormat("expected MAIN chunk".to_string()));
        }
        let main_content = read_u32(reader)?;
        let main_children = read_u32(reader)?;
        reader.seek(SeekFrom::Current(i64::from(main_content)))?;

        let end = reader.stream_position()? + u64::from(main_children);
        let mut size: Option<[u32; 3]> = None;
        let mut voxels: Option<Vec<ModelVoxel>> = None;
        let mut palette = VoxPalette::default();

        while reader.stream_position()? < end {
            let chunk = read_id(reader)?;
            let content = read_u32(reader)?;
            let children = read_u32(reader)?;
            let body_start = reader.stream_position()?;

            match &chunk {
                b"SIZE" if size.is_none() => {
                    // VOX is Z-up; swap to Y-up
                    let x = read_u32(reader)?;
                    let z = read_u32(reader)?;
                    let y = read_u32(reader)?;
                    size = Some([x, y, z]);
                }
                b"XYZI" if voxels.is_none() => {
                    let count = read_u32(reader)?;
                    if u64::from(count) * 4 + 4 > u64::from(content) {
                        return Err(VoxError::InvalidChunk(format!(
                            "XYZI claims {count} voxels in {content} bytes"
                        )));
                    }
                    // The count is untrusted until the voxels are actually read
                    let reserve = (count as usize).min(MAX_PREALLOCATED_VOXELS);
                    let mut list = Vec::with_capacity(reserve);
                    for _ in 0..count {
                        let [x, z, y, color_index] = read_bytes::<4, _>(reader)?;
                        list.push(ModelVoxel { x, y, z, color_index });
                    }
                    voxels = Some(list);
                }
                b"RGBA" => {
                    if content < 1024 {
                        return Err(VoxError::InvalidChunk(format!(
                            "RGBA chunk is {content} bytes"
                        )));
                    }
                    // File entry i maps to palette index i + 1
                    for slot in 1..=255 {
                        let [r, g, b, a] = read_bytes::<4, _>(reader)?;
                        palette.colors[slot] = VoxColor { r, g, b, a };
                    }
                }
                _ => {}
            }

            // Always resync to the declared chunk end
            reader.seek(SeekFrom::Start(
                body_start + u64::from(content) + u64::from(children),
            ))?;
        }

        let size = size.ok_or(VoxError::MissingChunk("SIZE"))?;
        if size.contains(&0) {
            return Err(VoxError::InvalidChunk(format!("degenerate size {size:?}")));
        }
        let voxels = voxels.ok_or(VoxError::MissingChunk("XYZI"))?;

        Ok(VoxelModel {
            name,
            size,
            voxels,
            palette,
        })
    }
}

fn read_bytes<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N], VoxError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, VoxError> {
    Ok(u32::from_le_bytes(read_bytes::<4, _>(reader)?))
}

fn read_id<R: Read>(reader: &mut R) -> Result<[u8; 4], VoxError> {
    read_bytes::<4, _>(reader)
}
