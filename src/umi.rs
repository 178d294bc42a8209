use std::path::Path;

use ahash::AHashMap;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Dense index of a barcode in the allow-list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct UmiIndex(pub usize);

/// The set of valid UMIs. Each distinct barcode is assigned a dense index in file order.
#[derive(Debug)]
pub struct AllowList {
    index: AHashMap<Vec<u8>, UmiIndex>,
    umi_length: usize,
}

impl AllowList {
    pub async fn load<P: AsRef<Path>>(path: P, umi_length: usize) -> Result<AllowList, UmiError> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        AllowList::from_reader(BufReader::new(file), umi_length).await
    }

    /// Read one barcode per line. Surrounding whitespace is ignored, as are blank lines.
    pub async fn from_reader<R>(mut reader: R, umi_length: usize) -> Result<AllowList, UmiError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut index = AHashMap::new();
        let mut line = Vec::new();
        let mut lineno = 0;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            lineno += 1;

            let umi = line.trim_ascii();
            if umi.is_empty() {
                continue;
            }
            if umi.len() != umi_length {
                return Err(UmiError::Length {
                    line: lineno,
                    umi: String::from_utf8_lossy(umi).into_owned(),
                    expected: umi_length,
                });
            }
            let next = UmiIndex(index.len());
            index.entry(umi.to_vec()).or_insert(next);
        }

        if index.is_empty() {
            return Err(UmiError::Empty);
        }

        Ok(AllowList { index, umi_length })
    }

    pub fn get(&self, umi: &[u8]) -> Option<UmiIndex> {
        self.index.get(umi).copied()
    }

    #[cfg(test)]
    pub fn contains(&self, umi: &[u8]) -> bool {
        self.index.contains_key(umi)
    }

    pub fn indices(&self) -> impl Iterator<Item = UmiIndex> + '_ {
        self.index.values().copied()
    }

    pub fn umi_length(&self) -> usize {
        self.umi_length
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum UmiError {
    #[error("Error reading UMI file")]
    IoError(#[from] std::io::Error),
    #[error("UMI '{umi}' on line {line} does not have the expected length {expected}")]
    Length {
        line: usize,
        umi: String,
        expected: usize,
    },
    #[error("UMI file contains no UMIs")]
    Empty,
}
