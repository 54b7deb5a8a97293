//! The unibuild binary: argument dispatch lives in
//! [`unibuild_lib::cli`], this is just the entrypoint.

use anyhow::Result;

fn main() -> Result<()> {
    unibuild_utils::initialize_tracing();
    unibuild_lib::cli::run()
}
