//! Message types for the binary-proto configuration bundles.
//!
//! These are maintained by hand rather than generated; the schema is
//! small and owning the types keeps protoc out of the build. Field tags
//! are part of the wire format and must never be reused or renumbered.

/// A partner organization (ODM or OEM) referenced from designs and
/// device brands.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Partner {
    /// Unique id, the join key for `odm_id`/`oem_id` references.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
}

/// A program: the umbrella for a family of hardware designs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Program {
    /// Unique id, the join key for `program_id` references.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Display name.
    #[prost(string, tag = "2")]
    pub name: String,
}

/// Version stamp of a firmware payload.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FirmwareVersion {
    /// Major version.
    #[prost(uint32, tag = "1")]
    pub major: u32,
    /// Minor version.
    #[prost(uint32, tag = "2")]
    pub minor: u32,
    /// Patch level.
    #[prost(uint32, tag = "3")]
    pub patch: u32,
}

/// One downloadable firmware image.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FirmwarePayload {
    /// Image name as published to the binary component server.
    #[prost(string, tag = "1")]
    pub firmware_image_name: String,
    /// The build target producing this payload.
    #[prost(string, tag = "2")]
    pub build_target_name: String,
    /// Image version.
    #[prost(message, optional, tag = "3")]
    pub version: Option<FirmwareVersion>,
}

/// Firmware configuration of a software config.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FirmwareConfig {
    /// Read-only main firmware.
    #[prost(message, optional, tag = "1")]
    pub main_ro_payload: Option<FirmwarePayload>,
    /// Read-write main firmware.
    #[prost(message, optional, tag = "2")]
    pub main_rw_payload: Option<FirmwarePayload>,
    /// Read-only EC firmware.
    #[prost(message, optional, tag = "3")]
    pub ec_ro_payload: Option<FirmwarePayload>,
    /// Read-only PD firmware.
    #[prost(message, optional, tag = "4")]
    pub pd_ro_payload: Option<FirmwarePayload>,
    /// Extra EC build artifacts.
    #[prost(string, repeated, tag = "5")]
    pub ec_extras: Vec<String>,
}

/// The hardware-probing half of an identity: how the running device is
/// recognized as this config variant.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IdentityScanConfig {
    /// Numeric firmware SKU.
    #[prost(uint32, tag = "1")]
    pub firmware_sku: u32,
    /// x86: SMBIOS name to match.
    #[prost(string, tag = "2")]
    pub smbios_name_match: String,
    /// ARM: device-tree compatible string to match.
    #[prost(string, tag = "3")]
    pub device_tree_compatible_match: String,
}

/// Audio configuration of a software config.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioConfig {
    /// ALSA card name.
    #[prost(string, tag = "1")]
    pub card_name: String,
    /// UCM config file source path.
    #[prost(string, tag = "2")]
    pub ucm_file: String,
    /// Sound-server card config source path.
    #[prost(string, tag = "3")]
    pub card_config_file: String,
    /// DSP config source path.
    #[prost(string, tag = "4")]
    pub dsp_file: String,
}

/// Per-design-config software configuration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SoftwareConfig {
    /// Unique id, referenced by [`HardwareConfig::software_config_id`].
    #[prost(string, tag = "1")]
    pub id: String,
    /// Identity probing config.
    #[prost(message, optional, tag = "2")]
    pub scan_config: Option<IdentityScanConfig>,
    /// Firmware payloads; absent means a firmware-less config.
    #[prost(message, optional, tag = "3")]
    pub firmware: Option<FirmwareConfig>,
    /// Audio setup.
    #[prost(message, optional, tag = "4")]
    pub audio_config: Option<AudioConfig>,
}

/// The brand-specific half of an identity scan.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BrandScanConfig {
    /// Whitelabel tag to match, from VPD.
    #[prost(string, tag = "1")]
    pub whitelabel_tag: String,
}

/// Brand-level configuration, keyed by device brand.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BrandConfig {
    /// The device brand this applies to.
    #[prost(string, tag = "1")]
    pub brand_id: String,
    /// Brand identity probing config.
    #[prost(message, optional, tag = "2")]
    pub scan_config: Option<BrandScanConfig>,
    /// Default wallpaper asset name.
    #[prost(string, tag = "3")]
    pub wallpaper: String,
}

/// A brand under which a design ships.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceBrand {
    /// Unique id, the join key for brand configs.
    #[prost(string, tag = "1")]
    pub id: String,
    /// The design this brand applies to.
    #[prost(string, tag = "2")]
    pub design_id: String,
    /// OEM partner id.
    #[prost(string, tag = "3")]
    pub oem_id: String,
    /// Marketing name.
    #[prost(string, tag = "4")]
    pub brand_name: String,
    /// Four-letter brand code.
    #[prost(string, tag = "5")]
    pub brand_code: String,
}

/// Container-image build metadata of a build target.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArcBuildMetadata {
    /// Device build property.
    #[prost(string, tag = "1")]
    pub device: String,
    /// First supported API level.
    #[prost(uint32, tag = "2")]
    pub first_api_level: u32,
}

/// A build target: what the builders produce for a design.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BuildTarget {
    /// Unique id, referenced by [`Design::build_target_id`].
    #[prost(string, tag = "1")]
    pub id: String,
    /// Private overlay name.
    #[prost(string, tag = "2")]
    pub overlay_name: String,
    /// Container build metadata, when the target ships the container
    /// runtime.
    #[prost(message, optional, tag = "3")]
    pub arc: Option<ArcBuildMetadata>,
}

/// Where a fingerprint sensor is located on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FingerprintLocation {
    /// Not specified.
    Unknown = 0,
    /// On the power button, top left of the keyboard.
    PowerButtonTopLeft = 1,
    /// Bottom left of the keyboard.
    KeyboardBottomLeft = 2,
    /// Bottom right of the keyboard.
    KeyboardBottomRight = 3,
    /// Top right of the keyboard.
    KeyboardTopRight = 4,
    /// On the right side of the device.
    RightSide = 5,
    /// On the left side of the device.
    LeftSide = 6,
    /// The design has no fingerprint sensor.
    NotPresent = 7,
}

impl FingerprintLocation {
    /// The lower-kebab rendering used in platform JSON.
    pub fn as_kebab(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::PowerButtonTopLeft => "power-button-top-left",
            Self::KeyboardBottomLeft => "keyboard-bottom-left",
            Self::KeyboardBottomRight => "keyboard-bottom-right",
            Self::KeyboardTopRight => "keyboard-top-right",
            Self::RightSide => "right-side",
            Self::LeftSide => "left-side",
            Self::NotPresent => "not-present",
        }
    }
}

/// Fingerprint hardware of a design config.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FingerprintTopology {
    /// Sensor location.
    #[prost(enumeration = "FingerprintLocation", tag = "1")]
    pub location: i32,
    /// Fingerprint MCU board.
    #[prost(string, tag = "2")]
    pub board: String,
}

/// Hardware feature topology of a design config.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HardwareTopology {
    /// Fingerprint hardware, when present.
    #[prost(message, optional, tag = "1")]
    pub fingerprint: Option<FingerprintTopology>,
}

/// One hardware configuration (roughly, one SKU) of a design.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HardwareConfig {
    /// Unique id, used in error reporting.
    #[prost(string, tag = "1")]
    pub id: String,
    /// The software config for this hardware config; required.
    #[prost(string, tag = "2")]
    pub software_config_id: String,
    /// Hardware features.
    #[prost(message, optional, tag = "3")]
    pub hardware_topology: Option<HardwareTopology>,
}

/// A hardware design and its per-SKU configs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Design {
    /// Unique id, the join key for `design_id` references.
    #[prost(string, tag = "1")]
    pub id: String,
    /// Code name of the design; lower-cased for derived fields.
    #[prost(string, tag = "2")]
    pub name: String,
    /// The program this design belongs to.
    #[prost(string, tag = "3")]
    pub program_id: String,
    /// The ODM building this design.
    #[prost(string, tag = "4")]
    pub odm_id: String,
    /// The build target producing images for this design.
    #[prost(string, tag = "5")]
    pub build_target_id: String,
    /// Per-SKU hardware configs.
    #[prost(message, repeated, tag = "6")]
    pub configs: Vec<HardwareConfig>,
}

/// The top-level bundle: everything a program and its projects declare.
///
/// Program- and project-level files each carry a partial bundle; they
/// are combined with protobuf merge semantics before transformation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigBundle {
    /// Partner organizations.
    #[prost(message, repeated, tag = "1")]
    pub partners: Vec<Partner>,
    /// Programs.
    #[prost(message, repeated, tag = "2")]
    pub programs: Vec<Program>,
    /// Hardware designs.
    #[prost(message, repeated, tag = "3")]
    pub designs: Vec<Design>,
    /// Brands the designs ship under.
    #[prost(message, repeated, tag = "4")]
    pub device_brands: Vec<DeviceBrand>,
    /// Software configs referenced by the designs.
    #[prost(message, repeated, tag = "5")]
    pub software_configs: Vec<SoftwareConfig>,
    /// Brand configs keyed by device brand.
    #[prost(message, repeated, tag = "6")]
    pub brand_configs: Vec<BrandConfig>,
    /// Build targets referenced by the designs.
    #[prost(message, repeated, tag = "7")]
    pub build_targets: Vec<BuildTarget>,
}
