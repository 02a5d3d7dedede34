//! File loading.

use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Read the first `head` and last `tail` bytes of a file into one buffer.
///
/// Files no longer than `head + tail` are returned whole, so the buffer's
/// length is only meaningful for short files; for longer ones the head and
/// tail of the result equal the head and tail of the file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, sized, or read.
pub async fn read_window(path: &Path, head: usize, tail: usize) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path).await?;
    let len = file.metadata().await?.len();
    let window = (head + tail) as u64;

    if len <= window {
        let mut buf = Vec::with_capacity(len as usize);
        file.read_to_end(&mut buf).await?;
        return Ok(buf);
    }

    let mut buf = vec![0u8; head + tail];
    file.read_exact(&mut buf[..head]).await?;
    file.seek(SeekFrom::End(-(tail as i64))).await?;
    file.read_exact(&mut buf[head..]).await?;

    Ok(buf)
}
