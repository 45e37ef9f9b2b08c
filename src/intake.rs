use anyhow::{Context, Result};
use std::io::{ErrorKind, Read};
use std::path::Path;

const CHUNK_SIZE: usize = 8 * 1024;

/// Join chunks in arrival order into one buffer.
pub fn collect_chunks<I, C>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    chunks.into_iter().fold(Vec::new(), |mut buf, chunk| {
        buf.extend_from_slice(chunk.as_ref());
        buf
    })
}

/// Drain `reader` completely. Nothing is decoded until the stream ends.
pub fn read_stream<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => chunks.push(buf[..n].to_vec()),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading photo stream"),
        }
    }
    log::debug!("received photo in {} chunk(s)", chunks.len());
    Ok(collect_chunks(chunks))
}

/// Read a photo from a path, or from stdin when `source` is `-`.
pub fn read_photo(source: &Path) -> Result<Vec<u8>> {
    if source == Path::new("-") {
        return read_stream(std::io::stdin().lock());
    }
    let file = std::fs::File::open(source)
        .with_context(|| format!("opening {}", source.display()))?;
    read_stream(file).with_context(|| format!("reading {}", source.display()))
}
