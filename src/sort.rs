//! Sources of chromosome grouped SAM input.
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use log::info;
use thiserror::Error;
use tokio::{fs::File, io::AsyncRead, process::Command};

pub type InputStream = Box<dyn AsyncRead + Unpin + Send>;

/// Provides a SAM stream in which the records of each chromosome are contiguous.
pub trait GroupedInput {
    fn open(self) -> impl Future<Output = Result<InputStream, SortError>> + Send;
}

/// Input that is already grouped by chromosome. Reads stdin when no path is given.
pub struct Presorted {
    path: Option<PathBuf>,
}

impl Presorted {
    pub fn new(path: Option<PathBuf>) -> Presorted {
        Presorted { path }
    }
}

impl GroupedInput for Presorted {
    async fn open(self) -> Result<InputStream, SortError> {
        match self.path {
            Some(p) => {
                let file = File::open(&p)
                    .await
                    .map_err(|source| SortError::Open { path: p, source })?;
                Ok(Box::new(file))
            }
            None => Ok(Box::new(tokio::io::stdin())),
        }
    }
}

/// Sorts the input with `samtools sort` into an intermediate SAM file, then reads that file.
/// The sort runs to completion before any record is read.
pub struct SamtoolsSort {
    samtools: PathBuf,
    input: PathBuf,
    sorted: PathBuf,
}

impl SamtoolsSort {
    pub fn new(samtools: PathBuf, input: PathBuf, sorted: Option<PathBuf>) -> SamtoolsSort {
        let sorted = sorted.unwrap_or_else(|| sorted_path(&input));
        SamtoolsSort { samtools, input, sorted }
    }

    pub fn sorted(&self) -> &Path {
        &self.sorted
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.samtools);
        cmd.arg("sort")
            .arg("-O")
            .arg("sam")
            .arg("-o")
            .arg(&self.sorted)
            .arg(&self.input);
        cmd
    }
}

impl GroupedInput for SamtoolsSort {
    async fn open(self) -> Result<InputStream, SortError> {
        info!("Sorting {} into {}", self.input.display(), self.sorted().display());
        let status = self
            .command()
            .status()
            .await
            .map_err(|source| SortError::Spawn {
                program: self.samtools.clone(),
                source,
            })?;
        if !status.success() {
            return Err(SortError::Failed(status));
        }
        info!("Finished sorting");

        Presorted::new(Some(self.sorted)).open().await
    }
}

/// `dir/reads.sam` sorts into `dir/reads_sorted.sam`.
pub fn sorted_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_sorted.sam", stem))
}

#[derive(Debug, Error)]
pub enum SortError {
    #[error("Could not start sort program {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Sort program failed: {0}")]
    Failed(ExitStatus),
    #[error("Could not open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn sorted_names() {
        assert_eq!(
            sorted_path(Path::new("/data/run1/reads.sam")),
            PathBuf::from("/data/run1/reads_sorted.sam")
        );
        assert_eq!(sorted_path(Path::new("reads")), PathBuf::from("reads_sorted.sam"));
    }

    #[test]
    fn samtools_arguments() {
        let sort = SamtoolsSort::new("samtools".into(), "in.sam".into(), None);
        assert_eq!(sort.sorted(), Path::new("in_sorted.sam"));
        let cmd = sort.command();
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, ["sort", "-O", "sam", "-o", "in_sorted.sam", "in.sam"]);
    }

    #[tokio::test]
    async fn missing_sort_program() {
        let sort = SamtoolsSort::new(
            "/nonexistent/samtools".into(),
            "in.sam".into(),
            Some("out.sam".into()),
        );
        assert!(matches!(sort.open().await, Err(SortError::Spawn { .. })));
    }

    #[tokio::test]
    async fn presorted_file() {
        let path = std::env::temp_dir().join(format!("umidedup-presorted-{}.sam", std::process::id()));
        tokio::fs::write(&path, b"@HD\tVN:1.6\n").await.unwrap();

        let mut input = Presorted::new(Some(path.clone())).open().await.unwrap();
        let mut content = Vec::new();
        input.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"@HD\tVN:1.6\n");

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn presorted_missing_file() {
        let res = Presorted::new(Some("/nonexistent/in.sam".into())).open().await;
        assert!(matches!(res, Err(SortError::Open { .. })));
    }
}
