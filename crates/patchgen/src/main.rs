//! Renders the JSON patches of a ClusterClass patch for a generate patches request and prints
//! the response as JSON.
//!
//! ```text
//! patchgen --patch patch.yaml --request request.yaml
//! kubectl get ... | patchgen --patch patch.yaml --request - --decode-patches
//! ```

use std::{io, path::PathBuf};

use clap::Parser;
use snafu::{ResultExt, Snafu, ensure};
use stackable_cluster_patches::{
    JsonPatchGenerator,
    api::{ClusterClassPatch, Generator},
    hooks::GeneratePatchesRequest,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod input;
mod output;

/// Environment variable holding the log filter, e.g. `debug` or `stackable_cluster_patches=debug`.
const LOG_ENV: &str = "PATCHGEN_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to read patch"))]
    ReadPatch { source: input::Error },

    #[snafu(display("failed to read generate patches request"))]
    ReadRequest { source: input::Error },

    #[snafu(display("failed to write response"))]
    WriteResponse { source: output::Error },

    #[snafu(display("failed to generate patches: {message}"))]
    GeneratePatches { message: String },
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// ClusterClass patch with the patch definitions to render, as YAML or JSON.
    #[arg(short, long, env = "PATCHGEN_PATCH")]
    patch: PathBuf,

    /// Generate patches request, as YAML or JSON. Use `-` to read it from stdin.
    #[arg(short, long, env = "PATCHGEN_REQUEST", default_value = "-")]
    request: PathBuf,

    /// Print the generated patches as JSON instead of base64 encoded.
    #[arg(long)]
    decode_patches: bool,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    initialize_logging();
    let cli = Cli::parse();

    let patch: ClusterClassPatch = input::read(&cli.patch).context(ReadPatchSnafu)?;
    let request: GeneratePatchesRequest = input::read(&cli.request).context(ReadRequestSnafu)?;
    info!(
        patch = %patch.name,
        items = request.items.len(),
        "generating patches"
    );

    let response = JsonPatchGenerator::new(patch).generate(&request);
    output::write(io::stdout().lock(), &response, cli.decode_patches)
        .context(WriteResponseSnafu)?;

    ensure!(
        response.is_success(),
        GeneratePatchesSnafu {
            message: response.message
        }
    );
    info!(patches = response.items.len(), "generated patches");

    Ok(())
}

/// Logs to stderr, so that stdout only contains the response. Defaults to INFO if [`LOG_ENV`]
/// is not set or invalid.
fn initialize_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
