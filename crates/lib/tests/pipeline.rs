//! End-to-end test of the config pipeline: proto bundle in, staged
//! ConfigFS contents out (squashfs packing excluded, it needs an
//! external tool).

use anyhow::Result;
use camino::Utf8Path;
use prost::Message;

use unibuild_lib::config;
use unibuild_lib::configfs::{self, entry_flags, IdentityTable};
use unibuild_lib::identity::IdentityType;
use unibuild_lib::proto::{self, bundle::*};

fn sku(id: &str, sw: &str) -> HardwareConfig {
    HardwareConfig {
        id: id.into(),
        software_config_id: sw.into(),
        hardware_topology: None,
    }
}

fn software(id: &str, firmware_sku: u32, smbios: &str) -> SoftwareConfig {
    SoftwareConfig {
        id: id.into(),
        scan_config: Some(IdentityScanConfig {
            firmware_sku,
            smbios_name_match: smbios.into(),
            device_tree_compatible_match: String::new(),
        }),
        firmware: None,
        audio_config: None,
    }
}

fn test_bundle() -> ConfigBundle {
    ConfigBundle {
        programs: vec![Program {
            id: "program:reef".into(),
            name: "Reef".into(),
        }],
        designs: vec![Design {
            id: "design:basking".into(),
            name: "Basking".into(),
            program_id: "program:reef".into(),
            odm_id: String::new(),
            build_target_id: String::new(),
            configs: vec![sku("config:1", "sw:a"), sku("config:2", "sw:b")],
        }],
        device_brands: vec![DeviceBrand {
            id: "brand:asun".into(),
            design_id: "design:basking".into(),
            oem_id: String::new(),
            brand_name: "Basking".into(),
            brand_code: "ASUN".into(),
        }],
        software_configs: vec![software("sw:a", 0, "Reef"), software("sw:b", 4, "Reef")],
        brand_configs: vec![BrandConfig {
            brand_id: "brand:asun".into(),
            scan_config: Some(BrandScanConfig {
                whitelabel_tag: "WL1".into(),
            }),
            wallpaper: String::new(),
        }],
        ..Default::default()
    }
}

#[test]
fn test_proto_to_configfs_pipeline() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = Utf8Path::from_path(dir.path()).unwrap();

    // Write the bundle out and read it back through the file API.
    let bundle_path = base.join("program.binaryproto");
    std::fs::write(&bundle_path, test_bundle().encode_to_vec())?;
    let bundle = proto::read_merged_bundle(&bundle_path, &Vec::<&Utf8Path>::new())?;

    let root = proto::transform_bundle(&bundle)?;
    config::validate(&root)?;

    // Stage the ConfigFS contents and inspect the identity blob.
    let stage = base.join("stage");
    std::fs::create_dir(&stage)?;
    configfs::stage_contents(&root, &stage)?;

    let blob = std::fs::read(stage.join("identity.bin"))?;
    let table = IdentityTable::parse(&blob).expect("parse blob");
    assert_eq!(table.identity_type, IdentityType::X86);
    assert_eq!(table.entries.len(), 2);

    // SKU 0 is omitted from the identity section entirely, so only the
    // second entry matches on a SKU.
    assert_eq!(table.entries[0].flags & entry_flags::HAS_SKU_ID, 0);
    assert_eq!(table.entries[1].sku_id, Some(4));

    // Both entries share the lower-cased model string and whitelabel tag.
    for entry in &table.entries {
        assert_eq!(entry.model_match.as_deref(), Some("reef"));
        assert_eq!(entry.whitelabel_match.as_deref(), Some("wl1"));
    }

    // The file tree mirrors the identity fields.
    assert_eq!(
        std::fs::read(stage.join("v1/unibuild/configs/0/identity/smbios-name-match"))?,
        b"Reef"
    );
    assert_eq!(
        std::fs::read(stage.join("v1/unibuild/configs/1/identity/sku-id"))?,
        b"4"
    );
    Ok(())
}
