//! Decoding of CIGAR strings and correction of reported alignment starts to the true 5' start of
//! a read.
//!
//! Corrected positions are signed: forward reads keep a positive coordinate and reverse reads are
//! stored negated. One position set per UMI can then hold both strands without a forward and a
//! reverse alignment at the same coordinate ever being considered duplicates of each other.
use std::fmt;

use noodles_sam::alignment::record::cigar::{op::Kind, Op};
use smallvec::SmallVec;
use thiserror::Error;

/// Most CIGARs of short reads have only a handful of operations.
pub type Ops = SmallVec<[Op; 8]>;

/// Signed 5' start of a read. Positive for forward reads, negative for reverse reads.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CorrectedPosition(i64);

impl CorrectedPosition {
    /// Marker for "no position seen yet". Seeded into every fresh tracker entry.
    pub const SENTINEL: CorrectedPosition = CorrectedPosition(0);

    #[cfg(test)]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for CorrectedPosition {
    fn from(p: i64) -> CorrectedPosition {
        CorrectedPosition(p)
    }
}

impl fmt::Display for CorrectedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a CIGAR string like `5S40M2I10M` into its operations. `*` is an empty CIGAR.
pub fn parse(cigar: &[u8]) -> Result<Ops, CigarError> {
    let mut ops = Ops::new();
    if cigar == b"*" {
        return Ok(ops);
    }

    let mut rest = cigar;
    while !rest.is_empty() {
        if !rest[0].is_ascii_digit() {
            return Err(CigarError::MissingLength(String::from_utf8_lossy(cigar).into_owned()));
        }
        let (len, n) = lexical_core::parse_partial::<u32>(rest)
            .map_err(|_| CigarError::LengthOverflow(String::from_utf8_lossy(cigar).into_owned()))?;
        let code = *rest
            .get(n)
            .ok_or_else(|| CigarError::MissingOperation(String::from_utf8_lossy(cigar).into_owned()))?;
        ops.push(Op::new(kind(code)?, len as usize));
        rest = &rest[n + 1..];
    }

    Ok(ops)
}

fn kind(code: u8) -> Result<Kind, CigarError> {
    match code {
        b'M' => Ok(Kind::Match),
        b'I' => Ok(Kind::Insertion),
        b'D' => Ok(Kind::Deletion),
        b'N' => Ok(Kind::Skip),
        b'S' => Ok(Kind::SoftClip),
        b'H' => Ok(Kind::HardClip),
        b'P' => Ok(Kind::Pad),
        b'=' => Ok(Kind::SequenceMatch),
        b'X' => Ok(Kind::SequenceMismatch),
        c => Err(CigarError::UnknownOperation(c as char)),
    }
}

/// True 5' start of a forward read: the reported start shifted left by every soft clip that
/// precedes the first match operation.
pub fn forward_start(ops: &[Op], start: i64) -> Result<CorrectedPosition, CigarError> {
    let mut pos = start;
    for op in ops {
        match op.kind() {
            Kind::Match => return Ok(CorrectedPosition(pos)),
            Kind::SoftClip => pos -= op.len() as i64,
            _ => {}
        }
    }

    Err(CigarError::NoMatch)
}

/// True 5' start of a reverse read, negated. Starting at the first match operation (inclusive),
/// walks right over every reference consuming operation and trailing soft clips.
pub fn reverse_start(ops: &[Op], start: i64) -> CorrectedPosition {
    let mut pos = start;
    let mut match_seen = false;
    for op in ops {
        match_seen |= op.kind() == Kind::Match;
        if match_seen && shifts_reverse_start(op.kind()) {
            pos += op.len() as i64;
        }
    }

    CorrectedPosition(-pos)
}

fn shifts_reverse_start(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Match
            | Kind::SequenceMatch
            | Kind::SequenceMismatch
            | Kind::Skip
            | Kind::Deletion
            | Kind::SoftClip
    )
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CigarError {
    #[error("CIGAR operation without length in '{0}'")]
    MissingLength(String),
    #[error("CIGAR length without operation in '{0}'")]
    MissingOperation(String),
    #[error("CIGAR operation length too large in '{0}'")]
    LengthOverflow(String),
    #[error("Unknown CIGAR operation '{0}'")]
    UnknownOperation(char),
    #[error("No match operation in CIGAR of forward read")]
    NoMatch,
}
