use noodles_sam::alignment::record::Flags;
use thiserror::Error;

use crate::cigar::{self, CigarError, CorrectedPosition};

const QNAME: usize = 0;
const FLAG: usize = 1;
const RNAME: usize = 2;
const POS: usize = 3;
const CIGAR: usize = 5;

/// Strand of an alignment as derived from its flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strand {
    Unmapped,
    Forward,
    Reverse,
}

impl From<Flags> for Strand {
    fn from(flags: Flags) -> Strand {
        if flags.is_unmapped() {
            Strand::Unmapped
        } else if flags.is_reverse_complemented() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

/// Borrowed view on the fields of a SAM data line needed for deduplication.
#[derive(Debug)]
pub struct UmiRecord<'a> {
    read_name: &'a [u8],
    flags: Flags,
    reference_name: &'a [u8],
    position: i64,
    cigar: &'a [u8],
}

impl<'a> UmiRecord<'a> {
    pub fn parse(line: &'a [u8]) -> Result<UmiRecord<'a>, RecordError> {
        let line = trim_newline(line);
        let mut fields: [&[u8]; CIGAR + 1] = [&[]; CIGAR + 1];
        let mut n = 0;
        for (slot, field) in fields.iter_mut().zip(line.split(|&b| b == b'\t')) {
            *slot = field;
            n += 1;
        }
        if n <= CIGAR {
            return Err(RecordError::MissingFields(n));
        }

        let flags = lexical_core::parse::<u16>(fields[FLAG])
            .map(Flags::from)
            .map_err(|_| RecordError::InvalidFlags(lossy(fields[FLAG])))?;
        let position = lexical_core::parse::<i64>(fields[POS])
            .ok()
            .filter(|&p| p >= 0)
            .ok_or_else(|| RecordError::InvalidPosition(lossy(fields[POS])))?;

        Ok(UmiRecord {
            read_name: fields[QNAME],
            flags,
            reference_name: fields[RNAME],
            position,
            cigar: fields[CIGAR],
        })
    }

    pub fn strand(&self) -> Strand {
        self.flags.into()
    }

    pub fn reference_name(&self) -> &'a [u8] {
        self.reference_name
    }

    #[cfg(test)]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// The UMI is the last `len` bytes of the read name.
    pub fn umi(&self, len: usize) -> Option<&'a [u8]> {
        self.read_name
            .len()
            .checked_sub(len)
            .map(|start| &self.read_name[start..])
    }

    /// Signed 5' start of the read, `None` for unmapped reads.
    pub fn corrected_position(&self) -> Result<Option<CorrectedPosition>, RecordError> {
        let corrected = match self.strand() {
            Strand::Unmapped => return Ok(None),
            Strand::Forward => cigar::forward_start(&cigar::parse(self.cigar)?, self.position)?,
            Strand::Reverse => cigar::reverse_start(&cigar::parse(self.cigar)?, self.position),
        };
        Ok(Some(corrected))
    }
}

/// Header lines start with `@`.
pub fn is_header(line: &[u8]) -> bool {
    line.first() == Some(&b'@')
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn lossy(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Expected at least 6 tab separated fields, found {0}")]
    MissingFields(usize),
    #[error("Invalid flag field '{0}'")]
    InvalidFlags(String),
    #[error("Invalid position field '{0}'")]
    InvalidPosition(String),
    #[error("Invalid CIGAR")]
    Cigar(#[from] CigarError),
}

#[cfg(test)]
mod test {
    use super::*;

    const LINE: &[u8] =
        b"NS500451:154:HWKTMBGXX:1:11101:24260:1121:CTGTTCAC\t0\t2\t76814284\t36\t71M\t*\t0\t0\tTCCACCACAATCTTACCATCCTTCCTCCAGACCACATCGCGTTCTTTGTTCAACTCACAGCTTTTCAACCGTC\t6<EAEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEEE\tMD:Z:71\tNH:i:1\n";

    fn with_fields(flag: &str, pos: &str, cigar: &str) -> Vec<u8> {
        format!("read:AAAAAAAA\t{flag}\tchr1\t{pos}\t255\t{cigar}\t*\t0\t0\tACGT\tIIII\n").into_bytes()
    }

    #[test]
    fn strand_from_flags() {
        assert_eq!(Strand::from(Flags::from(20)), Strand::Unmapped);
        assert_eq!(Strand::from(Flags::from(165)), Strand::Unmapped);
        assert_eq!(Strand::from(Flags::from(769)), Strand::Forward);
        assert_eq!(Strand::from(Flags::from(784)), Strand::Reverse);
        assert_eq!(Strand::from(Flags::from(0)), Strand::Forward);
    }

    #[test]
    fn parse_line() {
        let r = UmiRecord::parse(LINE).unwrap();
        assert_eq!(r.reference_name(), b"2");
        assert_eq!(r.position(), 76814284);
        assert_eq!(r.strand(), Strand::Forward);
        assert_eq!(r.umi(8), Some(&b"CTGTTCAC"[..]));
        assert_eq!(r.corrected_position().unwrap(), Some(CorrectedPosition::from(76814284)));
    }

    #[test]
    fn umi_from_short_name() {
        let line = b"AAA\t0\tchr1\t5\t255\t3M\n";
        let r = UmiRecord::parse(line).unwrap();
        assert_eq!(r.umi(8), None);
        assert_eq!(r.umi(3), Some(&b"AAA"[..]));
    }

    #[test]
    fn corrected_positions() {
        let line = with_fields("16", "100", "5S20M3S");
        let r = UmiRecord::parse(&line).unwrap();
        assert_eq!(r.corrected_position().unwrap(), Some(CorrectedPosition::from(-123)));

        let line = with_fields("4", "0", "*");
        let r = UmiRecord::parse(&line).unwrap();
        assert_eq!(r.corrected_position().unwrap(), None);
    }

    #[test]
    fn malformed() {
        assert!(matches!(
            UmiRecord::parse(b"read\t0\tchr1\t100\n"),
            Err(RecordError::MissingFields(4))
        ));
        assert!(matches!(
            UmiRecord::parse(&with_fields("zero", "100", "10M")),
            Err(RecordError::InvalidFlags(_))
        ));
        assert!(matches!(
            UmiRecord::parse(&with_fields("0", "1e5", "10M")),
            Err(RecordError::InvalidPosition(_))
        ));
        assert!(matches!(
            UmiRecord::parse(&with_fields("0", "-3", "10M")),
            Err(RecordError::InvalidPosition(_))
        ));

        let line = with_fields("0", "100", "10S");
        let r = UmiRecord::parse(&line).unwrap();
        assert!(matches!(
            r.corrected_position(),
            Err(RecordError::Cigar(CigarError::NoMatch))
        ));
    }
}
