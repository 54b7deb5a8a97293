//! Transforms merged config bundles into the flattened platform JSON.
//!
//! One output config is produced per design x device-brand x hardware
//! config combination, with all cross-referenced entities joined in.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};

use super::bundle::{
    AudioConfig, BrandConfig, BrandScanConfig, BuildTarget, ConfigBundle, Design, DeviceBrand,
    FingerprintLocation, FirmwarePayload, HardwareConfig, IdentityScanConfig, Partner,
    SoftwareConfig,
};
use crate::config;

/// Everything resolved for one output config variant.
struct Joined<'a> {
    design: &'a Design,
    hardware: &'a HardwareConfig,
    brand: &'a DeviceBrand,
    oem: Option<&'a Partner>,
    software: &'a SoftwareConfig,
    brand_config: &'a BrandConfig,
    build_target: Option<&'a BuildTarget>,
}

/// Resolve an id against a lookup table. An empty id resolves to
/// `None`; a non-empty id that is not in the table is an error.
fn lookup<'a, T>(id: &str, map: &HashMap<&str, &'a T>, kind: &str) -> Result<Option<&'a T>> {
    if id.is_empty() {
        return Ok(None);
    }
    map.get(id)
        .copied()
        .map(Some)
        .with_context(|| format!("Failed to look up {kind} with id: {id}"))
}

fn set_str(target: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        target.insert(key.to_owned(), json!(value));
    }
}

fn set_obj(target: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    match value {
        Some(Value::Object(o)) if o.is_empty() => {}
        Some(v) => {
            target.insert(key.to_owned(), v);
        }
        None => {}
    }
}

fn build_identity(
    scan: Option<&IdentityScanConfig>,
    brand_scan: Option<&BrandScanConfig>,
) -> Value {
    let mut identity = Map::new();
    if let Some(scan) = scan {
        if scan.firmware_sku != 0 {
            identity.insert("sku-id".into(), json!(scan.firmware_sku));
        }
        set_str(&mut identity, "smbios-name-match", &scan.smbios_name_match);
        // Platform name is a redundant relic of legacy probing tools.
        set_str(&mut identity, "platform-name", &scan.smbios_name_match);
        set_str(
            &mut identity,
            "device-tree-compatible-match",
            &scan.device_tree_compatible_match,
        );
    }
    if let Some(brand_scan) = brand_scan {
        set_str(&mut identity, "whitelabel-tag", &brand_scan.whitelabel_tag);
    }
    Value::Object(identity)
}

fn build_arc(joined: &Joined) -> Option<Value> {
    let arc = joined.build_target?.arc.as_ref()?;
    let mut props = Map::new();
    props.insert("device".into(), json!(arc.device));
    props.insert("first-api-level".into(), json!(arc.first_api_level));
    props.insert("marketing-name".into(), json!(joined.brand.brand_name));
    props.insert("metrics-tag".into(), json!(joined.design.name.to_lowercase()));
    props.insert("product".into(), json!(joined.design.name.to_lowercase()));
    if let Some(oem) = joined.oem {
        set_str(&mut props, "oem", &oem.name);
    }
    Some(json!({ "build-properties": props }))
}

fn bcs_path(payload: Option<&FirmwarePayload>) -> Option<String> {
    let payload = payload?;
    if payload.firmware_image_name.is_empty() {
        return None;
    }
    let version = payload.version.clone().unwrap_or_default();
    Some(format!(
        "bcs://{}.{}.{}.0.tbz2",
        payload.firmware_image_name, version.major, version.minor
    ))
}

fn payload_build_target(payload: Option<&FirmwarePayload>) -> Option<&str> {
    payload
        .map(|p| p.build_target_name.as_str())
        .filter(|n| !n.is_empty())
}

fn build_firmware(joined: &Joined) -> Value {
    let Some(fw) = joined.software.firmware.as_ref() else {
        return json!({ "no-firmware": true });
    };

    let mut targets = Map::new();
    let pairs = [
        ("coreboot", fw.main_rw_payload.as_ref()),
        ("depthcharge", fw.main_ro_payload.as_ref()),
        ("ec", fw.ec_ro_payload.as_ref()),
        ("libpayload", fw.pd_ro_payload.as_ref()),
    ];
    for (key, payload) in pairs {
        if let Some(name) = payload_build_target(payload) {
            targets.insert(key.into(), json!(name));
        }
    }
    if !fw.ec_extras.is_empty() {
        targets.insert("ec_extras".into(), json!(fw.ec_extras));
    }

    let mut result = Map::new();
    if let Some(bt) = joined.build_target {
        set_str(&mut result, "bcs-overlay", &bt.overlay_name);
    }
    result.insert("build-targets".into(), Value::Object(targets));
    if let Some(main_ro) = fw.main_ro_payload.as_ref() {
        set_str(&mut result, "image-name", &main_ro.firmware_image_name);
    }
    for (key, payload) in [
        ("main-ro-image", fw.main_ro_payload.as_ref()),
        ("main-rw-image", fw.main_rw_payload.as_ref()),
        ("ec-ro-image", fw.ec_ro_payload.as_ref()),
        ("pd-ro-image", fw.pd_ro_payload.as_ref()),
    ] {
        if let Some(path) = bcs_path(payload) {
            result.insert(key.into(), json!(path));
        }
    }
    Value::Object(result)
}

fn build_fw_signing(joined: &Joined) -> Option<Value> {
    joined.software.firmware.as_ref()?;
    Some(json!({
        "key-id": "DEFAULT",
        "signature-id": joined.design.name.to_lowercase(),
    }))
}

fn audio_file(source: &str, destination: String) -> Value {
    json!({ "destination": destination, "source": source })
}

fn build_audio(joined: &Joined) -> Option<Value> {
    const ALSA_PATH: &str = "/usr/share/alsa/ucm";
    const CRAS_PATH: &str = "/etc/cras";
    // File that matches the card name when installed and points to HiFi.conf
    const CARD_NAME_FILE: &str = "audio-defaults/card-name-file.conf";

    let audio: &AudioConfig = joined.software.audio_config.as_ref()?;
    let project = joined.design.name.to_lowercase();
    let card = &audio.card_name;

    let mut files = Vec::new();
    if !audio.ucm_file.is_empty() {
        files.push(audio_file(
            &audio.ucm_file,
            format!("{ALSA_PATH}/{card}/HiFi.conf"),
        ));
        files.push(audio_file(
            CARD_NAME_FILE,
            format!("{ALSA_PATH}/{card}/{card}.conf"),
        ));
    }
    if !audio.card_config_file.is_empty() {
        files.push(audio_file(
            &audio.card_config_file,
            format!("{CRAS_PATH}/{project}/{card}"),
        ));
    }
    if !audio.dsp_file.is_empty() {
        files.push(audio_file(&audio.dsp_file, format!("{CRAS_PATH}/{project}/dsp.ini")));
    }

    Some(json!({
        "main": {
            "cras-config-dir": project,
            "files": files,
        }
    }))
}

fn build_fingerprint(hardware: &HardwareConfig) -> Option<Value> {
    let fp = hardware.hardware_topology.as_ref()?.fingerprint.as_ref()?;
    let location =
        FingerprintLocation::try_from(fp.location).unwrap_or(FingerprintLocation::Unknown);
    let mut result = Map::new();
    result.insert("sensor-location".into(), json!(location.as_kebab()));
    set_str(&mut result, "board", &fp.board);
    Some(Value::Object(result))
}

fn build_config(joined: &Joined) -> Value {
    let mut result = Map::new();
    result.insert(
        "identity".into(),
        build_identity(
            joined.software.scan_config.as_ref(),
            joined.brand_config.scan_config.as_ref(),
        ),
    );
    set_obj(&mut result, "arc", build_arc(joined));
    set_obj(&mut result, "audio", build_audio(joined));
    set_str(&mut result, "brand-code", &joined.brand.brand_code);
    set_obj(&mut result, "firmware", Some(build_firmware(joined)));
    set_obj(&mut result, "firmware-signing", build_fw_signing(joined));
    set_obj(&mut result, "fingerprint", build_fingerprint(joined.hardware));
    Value::Object(result)
}

/// Join and flatten a merged bundle into the platform config document.
pub fn transform_bundle(bundle: &ConfigBundle) -> Result<Value> {
    let partners: HashMap<_, _> = bundle.partners.iter().map(|p| (p.id.as_str(), p)).collect();
    let programs: HashMap<_, _> = bundle.programs.iter().map(|p| (p.id.as_str(), p)).collect();
    let build_targets: HashMap<_, _> = bundle
        .build_targets
        .iter()
        .map(|t| (t.id.as_str(), t))
        .collect();
    let software_configs: HashMap<_, _> = bundle
        .software_configs
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect();
    let brand_configs: HashMap<_, _> = bundle
        .brand_configs
        .iter()
        .map(|b| (b.brand_id.as_str(), b))
        .collect();

    let default_brand = DeviceBrand::default();
    let default_brand_config = BrandConfig::default();

    let mut results = Vec::new();
    for design in &bundle.designs {
        let brands: Vec<&DeviceBrand> = bundle
            .device_brands
            .iter()
            .filter(|b| b.design_id == design.id)
            .collect();
        let brands = if brands.is_empty() {
            vec![&default_brand]
        } else {
            brands
        };

        for brand in brands {
            // Brand config may be missing; platform JSON allows it.
            let brand_config = brand_configs
                .get(brand.id.as_str())
                .copied()
                .unwrap_or(&default_brand_config);

            for hardware in &design.configs {
                let software =
                    lookup(&hardware.software_config_id, &software_configs, "software config")?
                        .with_context(|| {
                            format!("Software config is required for: {}", hardware.id)
                        })?;
                let oem = lookup(&brand.oem_id, &partners, "partner")?;
                let build_target =
                    lookup(&design.build_target_id, &build_targets, "build target")?;
                // Dangling program/ODM references are still errors even
                // though nothing in the output uses them directly.
                lookup(&design.program_id, &programs, "program")?;
                lookup(&design.odm_id, &partners, "partner")?;

                results.push(build_config(&Joined {
                    design,
                    hardware,
                    brand,
                    oem,
                    software,
                    brand_config,
                    build_target,
                }));
            }
        }
    }

    Ok(config::wrap_configs(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::bundle::*;

    fn payload(name: &str, target: &str, major: u32, minor: u32) -> Option<FirmwarePayload> {
        Some(FirmwarePayload {
            firmware_image_name: name.into(),
            build_target_name: target.into(),
            version: Some(FirmwareVersion {
                major,
                minor,
                patch: 0,
            }),
        })
    }

    fn test_bundle() -> ConfigBundle {
        ConfigBundle {
            partners: vec![
                Partner {
                    id: "partner:odm".into(),
                    name: "SomeODM".into(),
                },
                Partner {
                    id: "partner:oem".into(),
                    name: "SomeOEM".into(),
                },
            ],
            programs: vec![Program {
                id: "program:reef".into(),
                name: "Reef".into(),
            }],
            designs: vec![Design {
                id: "design:basking".into(),
                name: "Basking".into(),
                program_id: "program:reef".into(),
                odm_id: "partner:odm".into(),
                build_target_id: "target:reef".into(),
                configs: vec![HardwareConfig {
                    id: "config:basking:1".into(),
                    software_config_id: "sw:basking".into(),
                    hardware_topology: Some(HardwareTopology {
                        fingerprint: Some(FingerprintTopology {
                            location: FingerprintLocation::PowerButtonTopLeft as i32,
                            board: "dartmonkey".into(),
                        }),
                    }),
                }],
            }],
            device_brands: vec![DeviceBrand {
                id: "brand:asun".into(),
                design_id: "design:basking".into(),
                oem_id: "partner:oem".into(),
                brand_name: "Basking Pro".into(),
                brand_code: "ASUN".into(),
            }],
            software_configs: vec![SoftwareConfig {
                id: "sw:basking".into(),
                scan_config: Some(IdentityScanConfig {
                    firmware_sku: 4,
                    smbios_name_match: "Reef".into(),
                    device_tree_compatible_match: String::new(),
                }),
                firmware: Some(FirmwareConfig {
                    main_ro_payload: payload("Reef", "reef-ro", 9042, 87),
                    main_rw_payload: payload("Reef", "reef", 9042, 110),
                    ec_ro_payload: payload("Reef_EC", "reef-ec", 9042, 87),
                    pd_ro_payload: None,
                    ec_extras: vec!["extra1".into()],
                }),
                audio_config: Some(AudioConfig {
                    card_name: "bxtda7219max".into(),
                    ucm_file: "audio/ucm/HiFi.conf".into(),
                    card_config_file: "audio/cras/card".into(),
                    dsp_file: "audio/cras/dsp.ini".into(),
                }),
            }],
            brand_configs: vec![BrandConfig {
                brand_id: "brand:asun".into(),
                scan_config: Some(BrandScanConfig {
                    whitelabel_tag: "asun-tag".into(),
                }),
                wallpaper: "default".into(),
            }],
            build_targets: vec![BuildTarget {
                id: "target:reef".into(),
                overlay_name: "overlay-reef-private".into(),
                arc: Some(ArcBuildMetadata {
                    device: "basking_cheets".into(),
                    first_api_level: 25,
                }),
            }],
        }
    }

    #[test]
    fn test_transform_full_bundle() -> Result<()> {
        let root = transform_bundle(&test_bundle())?;
        let rendered = config::format_json(&root)?;
        similar_asserts::assert_eq!(
            rendered,
            indoc::indoc! {r#"
                {
                  "unibuild": {
                    "configs": [
                      {
                        "arc": {
                          "build-properties": {
                            "device": "basking_cheets",
                            "first-api-level": 25,
                            "marketing-name": "Basking Pro",
                            "metrics-tag": "basking",
                            "oem": "SomeOEM",
                            "product": "basking"
                          }
                        },
                        "audio": {
                          "main": {
                            "cras-config-dir": "basking",
                            "files": [
                              {
                                "destination": "/usr/share/alsa/ucm/bxtda7219max/HiFi.conf",
                                "source": "audio/ucm/HiFi.conf"
                              },
                              {
                                "destination": "/usr/share/alsa/ucm/bxtda7219max/bxtda7219max.conf",
                                "source": "audio-defaults/card-name-file.conf"
                              },
                              {
                                "destination": "/etc/cras/basking/bxtda7219max",
                                "source": "audio/cras/card"
                              },
                              {
                                "destination": "/etc/cras/basking/dsp.ini",
                                "source": "audio/cras/dsp.ini"
                              }
                            ]
                          }
                        },
                        "brand-code": "ASUN",
                        "fingerprint": {
                          "board": "dartmonkey",
                          "sensor-location": "power-button-top-left"
                        },
                        "firmware": {
                          "bcs-overlay": "overlay-reef-private",
                          "build-targets": {
                            "coreboot": "reef",
                            "depthcharge": "reef-ro",
                            "ec": "reef-ec",
                            "ec_extras": [
                              "extra1"
                            ]
                          },
                          "ec-ro-image": "bcs://Reef_EC.9042.87.0.tbz2",
                          "image-name": "Reef",
                          "main-ro-image": "bcs://Reef.9042.87.0.tbz2",
                          "main-rw-image": "bcs://Reef.9042.110.0.tbz2"
                        },
                        "firmware-signing": {
                          "key-id": "DEFAULT",
                          "signature-id": "basking"
                        },
                        "identity": {
                          "platform-name": "Reef",
                          "sku-id": 4,
                          "smbios-name-match": "Reef",
                          "whitelabel-tag": "asun-tag"
                        }
                      }
                    ]
                  }
                }
            "#}
        );
        Ok(())
    }

    #[test]
    fn test_no_firmware() -> Result<()> {
        let mut bundle = test_bundle();
        bundle.software_configs[0].firmware = None;
        let root = transform_bundle(&bundle)?;
        let configs = config::device_configs(&root)?;
        assert_eq!(configs[0]["firmware"], json!({"no-firmware": true}));
        assert!(configs[0].get("firmware-signing").is_none());
        Ok(())
    }

    #[test]
    fn test_missing_software_config_is_error() {
        let mut bundle = test_bundle();
        bundle.designs[0].configs[0].software_config_id = "sw:gone".into();
        let e = transform_bundle(&bundle).expect_err("dangling reference");
        assert!(format!("{e:#}").contains("sw:gone"), "{e:#}");
    }

    #[test]
    fn test_design_without_brand_gets_default() -> Result<()> {
        let mut bundle = test_bundle();
        bundle.device_brands.clear();
        let root = transform_bundle(&bundle)?;
        let configs = config::device_configs(&root)?;
        assert_eq!(configs.len(), 1);
        assert!(configs[0].get("brand-code").is_none());
        let identity = &configs[0]["identity"];
        assert!(identity.get("whitelabel-tag").is_none());
        Ok(())
    }

    #[test]
    fn test_one_config_per_brand_and_sku() -> Result<()> {
        let mut bundle = test_bundle();
        bundle.device_brands.push(DeviceBrand {
            id: "brand:besk".into(),
            design_id: "design:basking".into(),
            oem_id: String::new(),
            brand_name: "Besk".into(),
            brand_code: "BESK".into(),
        });
        bundle.designs[0].configs.push(HardwareConfig {
            id: "config:basking:2".into(),
            software_config_id: "sw:basking".into(),
            hardware_topology: None,
        });
        let root = transform_bundle(&bundle)?;
        assert_eq!(config::device_configs(&root)?.len(), 4);
        Ok(())
    }

    #[test]
    fn test_arm_identity() -> Result<()> {
        let mut bundle = test_bundle();
        bundle.software_configs[0].scan_config = Some(IdentityScanConfig {
            firmware_sku: 0,
            smbios_name_match: String::new(),
            device_tree_compatible_match: "google,basking".into(),
        });
        let root = transform_bundle(&bundle)?;
        let identity = &config::device_configs(&root)?[0]["identity"];
        assert_eq!(
            identity["device-tree-compatible-match"],
            json!("google,basking")
        );
        assert!(identity.get("sku-id").is_none());
        assert!(identity.get("smbios-name-match").is_none());
        assert!(identity.get("platform-name").is_none());
        Ok(())
    }
}
