//! Removes PCR duplicates from a SAM file: of all reads sharing a UMI and a corrected 5' start on
//! the same chromosome only the first one is written.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;

mod app;
pub mod cigar;
pub mod dups;
pub mod io;
pub mod markdups;
pub mod metrics;
pub mod record;
pub mod sort;
pub mod umi;

use app::{App, Config};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let mut app = App::new(config).await?;
    app.run().await?;

    Ok(())
}
