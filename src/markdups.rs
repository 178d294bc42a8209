//! Single pass UMI deduplication of a chromosome grouped SAM stream.
//!
//! Records of one chromosome must be contiguous. Within a chromosome the order does not matter:
//! every record computes its own corrected 5' position, and the first record seen for a given
//! UMI and position is kept while later ones are dropped.
use log::debug;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::dups::DupTracker;
use crate::io::SamIo;
use crate::metrics::{Metrics, Status};
use crate::record::{self, RecordError, UmiRecord};
use crate::umi::AllowList;

/// Outcome of processing one input line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkResult {
    Header,
    Unique,
    Duplicate,
    UmiNotAllowed,
    Unmapped,
}

impl MarkResult {
    /// Whether the line is written to the output.
    pub fn is_emitted(&self) -> bool {
        matches!(self, MarkResult::Header | MarkResult::Unique)
    }
}

impl From<MarkResult> for Status {
    fn from(r: MarkResult) -> Status {
        match r {
            MarkResult::Header => Status::Header,
            MarkResult::Unique => Status::Unique,
            MarkResult::Duplicate => Status::Duplicate,
            MarkResult::UmiNotAllowed => Status::UmiNotAllowed,
            MarkResult::Unmapped => Status::Unmapped,
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
enum State {
    AwaitingRecord,
    InChromosome(Vec<u8>),
}

/// Owns the duplicate tracker and resets it whenever the chromosome changes.
pub struct Deduplicator<'a> {
    allow_list: &'a AllowList,
    tracker: DupTracker,
    state: State,
}

impl<'a> Deduplicator<'a> {
    pub fn new(allow_list: &'a AllowList) -> Deduplicator<'a> {
        Deduplicator {
            allow_list,
            tracker: DupTracker::new(),
            state: State::AwaitingRecord,
        }
    }

    /// Current chromosome, `None` before the first data record.
    pub fn chromosome(&self) -> Option<&[u8]> {
        match &self.state {
            State::AwaitingRecord => None,
            State::InChromosome(name) => Some(name),
        }
    }

    /// Classify a single SAM line and update the tracker. Returns the outcome and whether the
    /// line started a new chromosome.
    pub fn mark(&mut self, line: &[u8]) -> Result<(MarkResult, bool), RecordError> {
        if record::is_header(line) {
            return Ok((MarkResult::Header, false));
        }

        let record = UmiRecord::parse(line)?;
        let new_chromosome = self.chromosome() != Some(record.reference_name());
        if new_chromosome {
            debug!(
                "Start of chromosome {}",
                String::from_utf8_lossy(record.reference_name())
            );
            self.tracker.reset(self.allow_list);
            self.state = State::InChromosome(record.reference_name().to_vec());
        }

        let umi = match record
            .umi(self.allow_list.umi_length())
            .and_then(|umi| self.allow_list.get(umi))
        {
            Some(umi) => umi,
            None => return Ok((MarkResult::UmiNotAllowed, new_chromosome)),
        };

        let result = match record.corrected_position()? {
            None => MarkResult::Unmapped,
            Some(pos) => {
                if self.tracker.is_duplicate_and_record(umi, pos) {
                    MarkResult::Duplicate
                } else {
                    MarkResult::Unique
                }
            }
        };

        Ok((result, new_chromosome))
    }
}

/// Copy headers and unique records from the input of `samio` to its output.
pub async fn dedup_stream<R, W>(
    samio: &mut SamIo<R, W>,
    allow_list: &AllowList,
    metrics: &mut Metrics,
) -> Result<(), MarkError>
where
    R: AsyncRead + std::marker::Unpin,
    W: AsyncWrite + std::marker::Unpin,
{
    let mut dedup = Deduplicator::new(allow_list);
    let mut line = Vec::new();

    while samio.read_line(&mut line).await? {
        let (result, new_chromosome) = dedup.mark(&line).map_err(|source| MarkError::Record {
            line: samio.line_number(),
            source,
        })?;

        if result != MarkResult::Header {
            metrics.count(Status::Examined);
        }
        if new_chromosome {
            metrics.count(Status::Chromosome);
        }
        metrics.count(result.into());

        if result.is_emitted() {
            samio.write_line(&line).await?;
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum MarkError {
    #[error("IoError")]
    IoError(#[from] std::io::Error),
    #[error("Malformed record on line {line}")]
    Record {
        line: u64,
        #[source]
        source: RecordError,
    },
}
