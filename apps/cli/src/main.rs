//! ParcelMosaic CLI — merge per-map CAD parcel geometry into a county-wide
//! mosaic of parcel polygons and boundary lines.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
