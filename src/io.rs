use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

/// SamIo pairs a SAM text reader with a writer. Lines are handed out and written back byte for
/// byte, line endings included, so passed through records are identical to their input.
pub struct SamIo<R, W>
where
    R: AsyncRead,
    W: AsyncWrite,
{
    in_sam: BufReader<R>,
    out_sam: BufWriter<W>,
    lines_read: u64,
}

impl<R, W> SamIo<R, W>
where
    R: AsyncRead + std::marker::Unpin,
    W: AsyncWrite + std::marker::Unpin,
{
    pub fn new(read: R, write: W) -> SamIo<R, W> {
        SamIo {
            in_sam: BufReader::new(read),
            out_sam: BufWriter::new(write),
            lines_read: 0,
        }
    }

    /// Replace the contents of `line` with the next line of input. Returns `false` at the end of
    /// the stream.
    pub async fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<bool> {
        line.clear();
        if self.in_sam.read_until(b'\n', line).await? == 0 {
            return Ok(false);
        }
        self.lines_read += 1;
        Ok(true)
    }

    /// 1-based number of the line last returned by `read_line`.
    pub fn line_number(&self) -> u64 {
        self.lines_read
    }

    pub async fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.out_sam.write_all(line).await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.out_sam.shutdown().await
    }

    /// Flush pending output and return the writer.
    #[cfg(test)]
    pub async fn into_writer(mut self) -> io::Result<W> {
        self.out_sam.flush().await?;
        Ok(self.out_sam.into_inner())
    }
}
