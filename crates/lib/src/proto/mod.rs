//! Reading, merging and transforming binary-proto config bundles.

pub mod bundle;
mod convert;

pub use convert::transform_bundle;

use anyhow::{Context, Result};
use camino::Utf8Path;
use fn_error_context::context;
use prost::Message;

use bundle::ConfigBundle;

/// Read a binary-encoded [`ConfigBundle`] from a file.
#[context("Reading proto config {path}")]
pub fn read_bundle(path: &Utf8Path) -> Result<ConfigBundle> {
    let bytes = std::fs::read(path)?;
    ConfigBundle::decode(bytes.as_slice()).context("Decoding config bundle")
}

/// Read and merge a program-level bundle with its project bundles.
///
/// Merging follows protobuf semantics: repeated fields append, scalar
/// fields take the last set value, nested messages merge field-wise.
#[context("Merging proto configs")]
pub fn read_merged_bundle(
    program: &Utf8Path,
    projects: &[impl AsRef<Utf8Path>],
) -> Result<ConfigBundle> {
    let mut bundle = read_bundle(program)?;
    for project in projects {
        let path = project.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Reading proto config {path}"))?;
        bundle
            .merge(bytes.as_slice())
            .with_context(|| format!("Merging proto config {path}"))?;
    }
    Ok(bundle)
}
