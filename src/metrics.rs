use std::fmt;

/// Deduplication metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    header_records: usize,
    records_examined: usize,
    umi_not_allowed: usize,
    unmapped_reads: usize,
    duplicates: usize,
    unique_reads: usize,
    chromosomes: usize,
}

pub enum Status {
    Header,
    Examined,
    UmiNotAllowed,
    Unmapped,
    Duplicate,
    Unique,
    Chromosome,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HEADER_RECORDS\tRECORDS_EXAMINED\tUMI_NOT_ALLOWED\tUNMAPPED_READS\tDUPLICATES\tUNIQUE_READS\tCHROMOSOMES\tPERCENT_DUPLICATION")?;
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.6}",
            self.header_records,
            self.records_examined,
            self.umi_not_allowed,
            self.unmapped_reads,
            self.duplicates,
            self.unique_reads,
            self.chromosomes,
            self.percent_duplication()
        )
    }
}

impl Metrics {
    /// Fraction of deduplicated reads that were duplicates.
    pub fn percent_duplication(&self) -> f64 {
        let total = self.duplicates + self.unique_reads;
        if total == 0 {
            0.0
        } else {
            self.duplicates as f64 / total as f64
        }
    }

    pub fn count(&mut self, status: Status) {
        self.count_many(status, 1);
    }

    pub fn count_many(&mut self, status: Status, count: usize) {
        match status {
            Status::Header => self.header_records += count,
            Status::Examined => self.records_examined += count,
            Status::UmiNotAllowed => self.umi_not_allowed += count,
            Status::Unmapped => self.unmapped_reads += count,
            Status::Duplicate => self.duplicates += count,
            Status::Unique => self.unique_reads += count,
            Status::Chromosome => self.chromosomes += count,
        }
    }

    pub fn records_examined(&self) -> usize {
        self.records_examined
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn unique_reads(&self) -> usize {
        self.unique_reads
    }

    pub fn chromosomes(&self) -> usize {
        self.chromosomes
    }
}
