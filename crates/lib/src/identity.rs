//! Typed view of the `identity` section of a device config.
//!
//! The identity fields are what the OS uses at runtime to decide which
//! config variant applies to the running hardware, so they are the one
//! part of the platform JSON we model as a struct instead of working
//! with untyped values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// The set of fields used at runtime to match a config variant to the
/// running hardware.
///
/// All fields are optional; which combinations are meaningful depends on
/// the identity type of the whole config (x86 matches on SMBIOS names,
/// ARM on device-tree compatible strings or firmware names).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceIdentity {
    /// Redundant human-readable platform name, kept for legacy tooling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    /// Numeric SKU id, present when a single model ships multiple SKUs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_id: Option<u32>,
    /// x86: SMBIOS name to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smbios_name_match: Option<String>,
    /// ARM: device-tree compatible string to match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_tree_compatible_match: Option<String>,
    /// ARM: match on a portion of the firmware name (FRID) instead of the
    /// device-tree compatible string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_name: Option<String>,
    /// Legacy customization id from VPD. Deprecated for new devices;
    /// only set for pre-unibuild migrations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customization_id: Option<String>,
    /// Whitelabel tag distinguishing rebranded variants of one design.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelabel_tag: Option<String>,
}

impl DeviceIdentity {
    /// Extract the identity section from an untyped device config.
    /// A config without an `identity` key yields an empty identity.
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        match config.get("identity") {
            Some(v) => serde_json::from_value(v.clone()).context("Parsing identity"),
            None => Ok(Self::default()),
        }
    }

    /// True if this identity requires ARM style matching.
    pub fn is_arm(&self) -> bool {
        self.device_tree_compatible_match.is_some() || self.firmware_name.is_some()
    }
}

/// The matching scheme used by an identity data file; one per file,
/// covering every entry in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IdentityType {
    /// Match on SMBIOS names.
    X86 = 0,
    /// Match on device-tree compatible strings or firmware names.
    Arm = 1,
}

impl IdentityType {
    /// Detect the identity type for a set of device configs: ARM iff any
    /// identity carries a device-tree compatible match or firmware name,
    /// else x86.
    pub fn detect<'a>(identities: impl IntoIterator<Item = &'a DeviceIdentity>) -> Self {
        if identities.into_iter().any(|i| i.is_arm()) {
            Self::Arm
        } else {
            Self::X86
        }
    }
}

impl TryFrom<u32> for IdentityType {
    type Error = anyhow::Error;

    fn try_from(v: u32) -> Result<Self> {
        match v {
            0 => Ok(Self::X86),
            1 => Ok(Self::Arm),
            o => anyhow::bail!("Unknown identity type {o}"),
        }
    }
}
