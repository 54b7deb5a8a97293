//! The unibuild CLI: one binary dispatching to the individual
//! config-pipeline tools.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};

use crate::{config, configfs, events, proto};

/// Build-time tools for the device configuration pipeline.
#[derive(Debug, Parser)]
#[clap(name = "unibuild", version, about)]
pub struct Opt {
    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Convert source proto config bundles into platform JSON config.
    ProtoConvert {
        /// Path to the source program-level protobinary file.
        #[clap(long = "program-config", short = 'p')]
        program_config: Utf8PathBuf,
        /// Source protobinary project config files.
        #[clap(long = "project-configs", short = 'c', num_args = 1..)]
        project_configs: Vec<Utf8PathBuf>,
        /// Output file; stdout when omitted.
        #[clap(long, short = 'o')]
        output: Option<Utf8PathBuf>,
    },
    /// Merge platform config files (JSON or YAML) into one document.
    Merge {
        /// Config files, merged in order.
        #[clap(required = true, num_args = 1..)]
        configs: Vec<Utf8PathBuf>,
        /// Only keep device configs whose name matches this regex.
        #[clap(long)]
        model_filter: Option<String>,
        /// Output file; stdout when omitted.
        #[clap(long, short = 'o')]
        output: Option<Utf8PathBuf>,
    },
    /// Write the packed identity blob for a platform config.
    Identity {
        /// The platform config (JSON).
        config: Utf8PathBuf,
        /// Output file for the blob.
        #[clap(long, short = 'o')]
        output: Utf8PathBuf,
    },
    /// Print the contents of a packed identity blob.
    DumpIdentity {
        /// The identity blob file.
        blob: Utf8PathBuf,
    },
    /// Build the ConfigFS squashfs image for a platform config.
    Configfs {
        /// The platform config (JSON).
        config: Utf8PathBuf,
        /// The squashfs image to create.
        output: Utf8PathBuf,
    },
    /// Generate C++ metrics event classes from an events description.
    GenEvents {
        /// The events description (JSON).
        events: Utf8PathBuf,
        /// Directory for the generated sources.
        #[clap(long, short = 'o')]
        output: Utf8PathBuf,
    },
}

/// Write `contents` to `output`, or to stdout when no path was given.
fn write_output(output: Option<&Utf8Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, contents).with_context(|| format!("Writing {path}"))?
        }
        None => print!("{contents}"),
    }
    Ok(())
}

/// Parse the process arguments and run the selected tool.
pub fn run() -> Result<()> {
    match Opt::parse().cmd {
        Cmd::ProtoConvert {
            program_config,
            project_configs,
            output,
        } => {
            let bundle = proto::read_merged_bundle(&program_config, &project_configs)?;
            let root = proto::transform_bundle(&bundle)?;
            write_output(output.as_deref(), &config::format_json(&root)?)
        }
        Cmd::Merge {
            configs,
            model_filter,
            output,
        } => {
            let mut root = config::merge_config_files(&configs)?;
            if let Some(pattern) = model_filter.as_deref() {
                let filter = regex::Regex::new(pattern)
                    .with_context(|| format!("Invalid model filter {pattern:?}"))?;
                config::filter_models(&mut root, &filter)?;
            }
            config::validate(&root)?;
            write_output(output.as_deref(), &config::format_json(&root)?)
        }
        Cmd::Identity { config, output } => {
            let root = config::load_config(&config)?;
            let mut blob = Vec::new();
            configfs::write_identity_struct(&root, &mut blob)?;
            std::fs::write(&output, blob).with_context(|| format!("Writing {output}"))
        }
        Cmd::DumpIdentity { blob } => {
            let data =
                std::fs::read(&blob).with_context(|| format!("Reading {blob}"))?;
            let table = configfs::IdentityTable::parse(&data)
                .with_context(|| format!("Parsing {blob}"))?;
            print!("{table}");
            Ok(())
        }
        Cmd::Configfs { config, output } => {
            let root = config::load_config(&config)?;
            config::validate(&root)?;
            configfs::generate_image(&root, &output)
        }
        Cmd::GenEvents { events, output } => {
            let description = events::load_description(&events)?;
            events::generate_all(&description, &output)
        }
    }
}
