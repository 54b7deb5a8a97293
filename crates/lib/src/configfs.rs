//! ConfigFS image generation.
//!
//! ConfigFS is the read-only filesystem image exposing per-device
//! configuration to the OS at runtime. This module produces its contents
//! at build time: the `v1/` file-tree rendering of the platform config,
//! the minified `v1/identity.json`, and the packed `identity.bin` blob
//! used by the early-boot identity probe. The blob layout must stay in
//! sync with the C reader in the OS image.

use std::collections::HashMap;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::process::Command;

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use serde_json::Value;
use unibuild_utils::CommandRunExt;

use crate::config;
use crate::identity::{DeviceIdentity, IdentityType};

/// Version of the identity blob format.
pub const STRUCT_VERSION: u32 = 0;
/// Size of the blob header: version, identity type, entry count, and
/// four reserved bytes.
pub const HEADER_SIZE: usize = 16;
/// Size of one entry: flags, model match offset, SKU id, whitelabel
/// match offset.
pub const ENTRY_SIZE: usize = 16;

/// The flag bits at the beginning of each identity entry.
pub mod entry_flags {
    /// The entry matches on a numeric SKU id.
    pub const HAS_SKU_ID: u32 = 1 << 0;
    /// The entry matches on a whitelabel tag.
    pub const HAS_WHITELABEL: u32 = 1 << 1;
    /// The entry uses a customization ID from VPD to match instead of a
    /// whitelabel tag. This is deprecated for new devices since 2017, so
    /// it should only be set for old pre-unibuild migrations.
    pub const USES_CUSTOMIZATION_ID: u32 = 1 << 2;
    /// For ARM only: use a portion of the FRID to match the device
    /// instead of a device-tree compatible string.
    pub const USES_FIRMWARE_NAME: u32 = 1 << 3;
    /// For x86 only: this device has an SMBIOS name to match.
    pub const HAS_SMBIOS_NAME: u32 = 1 << 4;
}

/// Deduplicating table of NUL-terminated lower-cased strings.
///
/// Offsets are byte offsets from the base of the table; strings are kept
/// in first-seen order so that serialization is deterministic.
#[derive(Debug, Default)]
struct StringTable {
    data: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    /// Intern a string and return its offset. Repeated strings (after
    /// lower-casing) share one slot.
    fn intern(&mut self, s: &str) -> u32 {
        let lowered = s.to_lowercase();
        if let Some(&offset) = self.offsets.get(&lowered) {
            return offset;
        }
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(lowered.as_bytes());
        self.data.push(0);
        self.offsets.insert(lowered, offset);
        offset
    }
}

/// Serialize the identity blob for `root` into `out`.
///
/// Identical inputs produce byte-identical output: entries are emitted
/// in config order and the string table dedups in insertion order.
#[context("Serializing identity blob")]
pub fn write_identity_struct(root: &Value, out: &mut impl Write) -> Result<()> {
    let identities = config::device_configs(root)?
        .iter()
        .map(DeviceIdentity::from_config)
        .collect::<Result<Vec<_>>>()?;
    let identity_type = IdentityType::detect(&identities);

    let mut strings = StringTable::default();
    let mut entries = Vec::with_capacity(identities.len());
    for identity in &identities {
        let mut flags = 0u32;
        let mut sku_id = 0u32;
        if let Some(sku) = identity.sku_id {
            flags |= entry_flags::HAS_SKU_ID;
            sku_id = sku;
        }

        let model_offset = match identity_type {
            IdentityType::X86 => match identity.smbios_name_match.as_deref() {
                Some(name) => {
                    flags |= entry_flags::HAS_SMBIOS_NAME;
                    strings.intern(name)
                }
                None => 0,
            },
            IdentityType::Arm => {
                if let Some(name) = identity.firmware_name.as_deref() {
                    flags |= entry_flags::USES_FIRMWARE_NAME;
                    strings.intern(name)
                } else {
                    let compat = identity.device_tree_compatible_match.as_deref().context(
                        "ARM identity requires a device-tree compatible match or firmware name",
                    )?;
                    strings.intern(compat)
                }
            }
        };

        let whitelabel_offset = if let Some(id) = identity.customization_id.as_deref() {
            flags |= entry_flags::USES_CUSTOMIZATION_ID;
            strings.intern(id)
        } else if let Some(tag) = identity.whitelabel_tag.as_deref() {
            flags |= entry_flags::HAS_WHITELABEL;
            strings.intern(tag)
        } else {
            0
        };

        entries.push([flags, model_offset, sku_id, whitelabel_offset]);
    }

    let entry_count = u32::try_from(entries.len()).context("Too many device configs")?;
    out.write_all(&STRUCT_VERSION.to_le_bytes())?;
    out.write_all(&(identity_type as u32).to_le_bytes())?;
    out.write_all(&entry_count.to_le_bytes())?;
    out.write_all(&[0u8; 4])?;
    for entry in entries {
        for field in entry {
            out.write_all(&field.to_le_bytes())?;
        }
    }
    out.write_all(&strings.data)?;
    Ok(())
}

/// A parse failure for an identity blob.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The blob is shorter than its header and entry table claim.
    #[error("Truncated identity blob: need {expected} bytes, got {actual}")]
    Truncated {
        /// Minimum byte count implied by the header.
        expected: usize,
        /// Actual byte count of the input.
        actual: usize,
    },
    /// The version field does not match [`STRUCT_VERSION`].
    #[error("Unsupported identity blob version {0}")]
    UnsupportedVersion(u32),
    /// The identity type field is out of range.
    #[error("Unknown identity type {0}")]
    UnknownIdentityType(u32),
    /// A string offset points outside the string table, or at a string
    /// missing its NUL terminator.
    #[error("Invalid string table offset {0}")]
    BadStringOffset(u32),
    /// The string table holds non-UTF-8 bytes.
    #[error("String table is not UTF-8 at offset {0}")]
    BadUtf8(u32),
}

/// One parsed entry of an identity blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEntry {
    /// Raw flag bits, see [`entry_flags`].
    pub flags: u32,
    /// Model match string: the SMBIOS name, device-tree compatible
    /// string, or firmware name depending on identity type and flags.
    pub model_match: Option<String>,
    /// SKU id, present iff [`entry_flags::HAS_SKU_ID`] is set.
    pub sku_id: Option<u32>,
    /// Whitelabel tag, or customization id when
    /// [`entry_flags::USES_CUSTOMIZATION_ID`] is set.
    pub whitelabel_match: Option<String>,
}

/// A fully parsed identity blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityTable {
    /// The matching scheme covering every entry.
    pub identity_type: IdentityType,
    /// Per-device entries, in config order.
    pub entries: Vec<IdentityEntry>,
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, BlobError> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(BlobError::Truncated {
            expected: offset + 4,
            actual: data.len(),
        })?;
    // get() above guarantees the length
    Ok(u32::from_le_bytes(bytes.try_into().unwrap_or([0; 4])))
}

fn read_string(table: &[u8], offset: u32) -> Result<String, BlobError> {
    let start = offset as usize;
    let tail = table
        .get(start..)
        .ok_or(BlobError::BadStringOffset(offset))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(BlobError::BadStringOffset(offset))?;
    std::str::from_utf8(&tail[..end])
        .map(str::to_owned)
        .map_err(|_| BlobError::BadUtf8(offset))
}

impl IdentityTable {
    /// Parse an identity blob, validating the header and recovering the
    /// per-entry strings from the table.
    pub fn parse(data: &[u8]) -> Result<Self, BlobError> {
        let version = read_u32(data, 0)?;
        if version != STRUCT_VERSION {
            return Err(BlobError::UnsupportedVersion(version));
        }
        let raw_type = read_u32(data, 4)?;
        let identity_type =
            IdentityType::try_from(raw_type).map_err(|_| BlobError::UnknownIdentityType(raw_type))?;
        let entry_count = read_u32(data, 8)? as usize;

        let table_base = HEADER_SIZE + ENTRY_SIZE * entry_count;
        let string_table = data.get(table_base..).ok_or(BlobError::Truncated {
            expected: table_base,
            actual: data.len(),
        })?;

        let mut entries = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let offset = HEADER_SIZE + ENTRY_SIZE * i;
            let flags = read_u32(data, offset)?;
            let model_offset = read_u32(data, offset + 4)?;
            let sku_id = read_u32(data, offset + 8)?;
            let whitelabel_offset = read_u32(data, offset + 12)?;

            // Offset 0 is a valid slot (the first interned string), so
            // presence is decided by the flags and identity type, never
            // by the offset value.
            let has_model = match identity_type {
                IdentityType::X86 => flags & entry_flags::HAS_SMBIOS_NAME != 0,
                IdentityType::Arm => true,
            };
            let model_match = has_model
                .then(|| read_string(string_table, model_offset))
                .transpose()?;
            let has_whitelabel =
                flags & (entry_flags::HAS_WHITELABEL | entry_flags::USES_CUSTOMIZATION_ID) != 0;
            let whitelabel_match = has_whitelabel
                .then(|| read_string(string_table, whitelabel_offset))
                .transpose()?;
            let sku_id = (flags & entry_flags::HAS_SKU_ID != 0).then_some(sku_id);

            entries.push(IdentityEntry {
                flags,
                model_match,
                sku_id,
                whitelabel_match,
            });
        }

        Ok(Self {
            identity_type,
            entries,
        })
    }
}

impl std::fmt::Display for IdentityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identity_type = match self.identity_type {
            IdentityType::X86 => "x86",
            IdentityType::Arm => "arm",
        };
        writeln!(f, "identity-type {identity_type}")?;
        writeln!(f, "entries {}", self.entries.len())?;
        for (i, entry) in self.entries.iter().enumerate() {
            write!(f, "{i}: flags {:#x}", entry.flags)?;
            if let Some(model) = entry.model_match.as_deref() {
                write!(f, " model {model}")?;
            }
            if let Some(sku) = entry.sku_id {
                write!(f, " sku {sku}")?;
            }
            if let Some(whitelabel) = entry.whitelabel_match.as_deref() {
                write!(f, " whitelabel {whitelabel}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Render a scalar config value to its file representation.
fn serialize_leaf(value: &Value) -> Vec<u8> {
    match value {
        Value::Bool(true) => b"true".to_vec(),
        Value::Bool(false) => b"false".to_vec(),
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Number(n) => n.to_string().into_bytes(),
        // Objects and arrays are handled by the tree writer; null
        // renders as an empty file.
        _ => Vec::new(),
    }
}

/// Recursively render a config out to files and directories.
///
/// Objects become directories keyed by field name, arrays become
/// directories keyed by decimal index, and leaves become files holding
/// the scalar rendering.
#[context("Writing config tree at {path}")]
pub fn write_configfs_files(config: &Value, path: &Utf8Path) -> Result<()> {
    match config {
        Value::Object(map) => {
            std::fs::DirBuilder::new().mode(0o755).create(path)?;
            for (name, entry) in map {
                write_configfs_files(entry, &path.join(name))?;
            }
        }
        Value::Array(items) => {
            std::fs::DirBuilder::new().mode(0o755).create(path)?;
            for (index, entry) in items.iter().enumerate() {
                write_configfs_files(entry, &path.join(index.to_string()))?;
            }
        }
        leaf => {
            std::fs::write(path, serialize_leaf(leaf))?;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
        }
    }
    Ok(())
}

/// Stage the full ConfigFS contents in a temporary directory.
///
/// Produces the `v1/` tree, `v1/identity.json` and `identity.bin`
/// underneath `stage`.
#[context("Staging ConfigFS contents")]
pub fn stage_contents(root: &Value, stage: &Utf8Path) -> Result<()> {
    write_configfs_files(root, &stage.join("v1"))?;
    // Both the JSON and struct renditions of the identity data are
    // emitted while runtime consumers migrate to the struct format.
    let identity = config::identity_json(root)?;
    std::fs::write(stage.join("v1/identity.json"), serde_json::to_vec(&identity)?)?;
    let mut blob = Vec::new();
    write_identity_struct(root, &mut blob)?;
    std::fs::write(stage.join("identity.bin"), blob)?;
    Ok(())
}

/// Generate the ConfigFS squashfs image for `root` at `output`.
///
/// Requires `mksquashfs` from squashfs-tools on PATH.
#[context("Generating ConfigFS image {output}")]
pub fn generate_image(root: &Value, output: &Utf8Path) -> Result<()> {
    let tempdir = tempfile::Builder::new().prefix("configfs.").tempdir()?;
    let stage = Utf8Path::from_path(tempdir.path()).context("Non-UTF-8 temporary directory")?;
    std::fs::set_permissions(stage, std::fs::Permissions::from_mode(0o755))?;
    stage_contents(root, stage)?;
    tracing::debug!("running mksquashfs for {output}");
    Command::new("mksquashfs")
        .arg(stage)
        .arg(output)
        .args(["-no-xattrs", "-noappend", "-all-root"])
        .run()
}
