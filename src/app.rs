use std::path::{Path, PathBuf};

use clap::Parser;
use log::{info, warn};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{self, AsyncWrite},
};

use crate::{
    io::SamIo,
    markdups::{self, MarkError},
    metrics::Metrics,
    sort::{GroupedInput, InputStream, Presorted, SamtoolsSort, SortError},
    umi::{AllowList, UmiError},
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Config {
    /// The input SAM file. umidedup reads from stdin when omitted, which requires --presorted
    #[clap(short, long)]
    pub file: Option<PathBuf>,

    /// The output SAM file. umidedup writes to stdout when omitted
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// File with the known UMIs, one per line
    #[clap(short, long)]
    pub umi: Option<PathBuf>,

    /// Input contains paired-end reads. Not supported
    #[clap(short, long)]
    pub paired: bool,

    /// The deduplication metrics file, if missing metrics will be written to stderr
    #[clap(short = 'm', long)]
    pub metrics: Option<PathBuf>,

    /// Length of the UMI at the end of the read name
    #[clap(short = 'l', long, default_value = "8")]
    pub umi_length: usize,

    /// Input is already grouped by chromosome, don't sort it first
    #[clap(long)]
    pub presorted: bool,

    /// The samtools executable used to sort the input
    #[clap(long, default_value = "samtools")]
    pub samtools: PathBuf,

    /// Location of the sorted intermediate SAM file. Defaults to <input>_sorted.sam
    #[clap(long)]
    pub sorted: Option<PathBuf>,
}

impl Config {
    /// Reject unsupported or incomplete option combinations before any work is done.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paired {
            return Err(ConfigError::PairedEnd);
        }
        if self.umi.is_none() {
            return Err(ConfigError::NoUmiFile);
        }
        if self.umi_length == 0 {
            return Err(ConfigError::UmiLength);
        }
        if !self.presorted && self.file.is_none() {
            return Err(ConfigError::SortNeedsFile);
        }
        Ok(())
    }
}

pub struct App {
    config: Config,
    allow_list: AllowList,
    samio: SamIo<InputStream, Box<dyn AsyncWrite + Unpin + Send>>,
    metrics: Metrics,
    partial_output: Option<PathBuf>,
}

impl App {
    pub async fn new(config: Config) -> Result<App, UmiDedupError> {
        config.validate()?;

        let umi_path = config.umi.as_ref().ok_or(ConfigError::NoUmiFile)?;
        let allow_list = AllowList::load(umi_path, config.umi_length).await?;
        info!("Loaded {} UMIs from {}", allow_list.len(), umi_path.display());

        let read = match &config.file {
            Some(file) if !config.presorted => {
                SamtoolsSort::new(config.samtools.clone(), file.clone(), config.sorted.clone())
                    .open()
                    .await?
            }
            file => Presorted::new(file.clone()).open().await?,
        };

        // Output files are written under a temporary name and only renamed once the run succeeds.
        let partial_output = config.output.as_deref().map(partial_path);
        let write: Box<dyn AsyncWrite + Unpin + Send> = if let Some(p) = partial_output.as_ref() {
            Box::new(File::create(p).await?)
        } else {
            Box::new(io::stdout())
        };

        Ok(App {
            config,
            allow_list,
            samio: SamIo::new(read, write),
            metrics: Metrics::default(),
            partial_output,
        })
    }

    /// Stream the grouped input once, writing headers and the first read of every
    /// UMI/position pair per chromosome.
    pub async fn run(&mut self) -> Result<(), UmiDedupError> {
        if let Err(e) = self.dedup().await {
            if let Some(partial) = &self.partial_output {
                if let Err(rm) = tokio::fs::remove_file(partial).await {
                    warn!("Could not remove {}: {}", partial.display(), rm);
                }
            }
            return Err(e);
        }
        if let (Some(partial), Some(output)) = (&self.partial_output, &self.config.output) {
            tokio::fs::rename(partial, output).await?;
        }

        info!(
            "Examined {} records on {} chromosomes, kept {}, removed {} duplicates",
            self.metrics.records_examined(),
            self.metrics.chromosomes(),
            self.metrics.unique_reads(),
            self.metrics.duplicates()
        );

        // print/write the metrics (sync)
        if let Some(path) = &self.config.metrics {
            use std::io::Write;
            let mut mout = std::fs::File::create(path)?;
            write!(mout, "{}", self.metrics)?;
        } else {
            eprint!("{}", self.metrics);
        }

        Ok(())
    }

    async fn dedup(&mut self) -> Result<(), UmiDedupError> {
        markdups::dedup_stream(&mut self.samio, &self.allow_list, &mut self.metrics).await?;
        self.samio.shutdown().await?;
        Ok(())
    }
}

/// `out.sam` is written as `out.sam.tmp` until the run completes.
fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("paired-end reads not supported")]
    PairedEnd,
    #[error("randomers not supported, provide a UMI file with --umi")]
    NoUmiFile,
    #[error("UMI length must be at least 1")]
    UmiLength,
    #[error("sorting requires an input file, use --file or --presorted")]
    SortNeedsFile,
}

#[derive(Debug, Error)]
pub enum UmiDedupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("IoError")]
    IoError(#[from] std::io::Error),
    #[error("Error loading UMIs")]
    Umi(#[from] UmiError),
    #[error("Error preparing sorted input")]
    Sort(#[from] SortError),
    #[error("Error deduplicating records")]
    Mark(#[from] MarkError),
}
