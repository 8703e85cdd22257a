//! Streaming zstd compression with progress reporting
//!
//! Compressed output embeds a content checksum, so decompression detects
//! corrupted artifacts instead of restoring garbage.

use std::io::{self, Read, Write};

use crate::error::{BackupError, BackupResult};

/// Default chunk size for streaming reads (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// A reader that reports the length of every non-empty read
pub struct ProgressReader<'a, R> {
    inner: R,
    on_read: Option<&'a mut dyn FnMut(u64)>,
}

impl<'a, R: Read> ProgressReader<'a, R> {
    /// Wrap `inner`, reporting byte counts to `on_read` if set
    pub fn new(inner: R, on_read: Option<&'a mut dyn FnMut(u64)>) -> Self {
        Self { inner, on_read }
    }
}

impl<R: Read> Read for ProgressReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Some(callback) = self.on_read.as_mut() {
                callback(n as u64);
            }
        }
        Ok(n)
    }
}

/// zstd stream transform between a byte source and a byte sink
#[derive(Debug, Clone, Copy)]
pub struct CompressionPipeline {
    level: i32,
    chunk_size: usize,
}

impl Default for CompressionPipeline {
    fn default() -> Self {
        Self::new(zstd::DEFAULT_COMPRESSION_LEVEL)
    }
}

impl CompressionPipeline {
    /// Create a pipeline with the given zstd level and the default chunk size
    pub fn new(level: i32) -> Self {
        Self {
            level,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the streaming chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Compress everything from `source` into `sink`
    ///
    /// `on_progress` receives the length of each chunk read from `source`.
    /// Returns the number of input bytes consumed.
    pub fn compress<R: Read, W: Write>(
        &self,
        source: R,
        sink: W,
        on_progress: Option<&mut dyn FnMut(u64)>,
    ) -> BackupResult<u64> {
        let mut reader = ProgressReader::new(source, on_progress);

        let mut encoder = zstd::stream::Encoder::new(sink, self.level)
            .map_err(|e| codec_error("zstd init", e))?;
        encoder
            .include_checksum(true)
            .map_err(|e| codec_error("zstd init", e))?;

        let copied = self.pump(&mut reader, &mut encoder, "zstd compress")?;

        let mut sink = encoder.finish().map_err(|e| codec_error("zstd finish", e))?;
        sink.flush().map_err(|e| codec_error("zstd flush", e))?;

        Ok(copied)
    }

    /// Decompress everything from `source` into `sink`
    ///
    /// `on_progress` receives the length of each chunk read from the
    /// compressed `source`. Returns the number of decompressed bytes written.
    pub fn decompress<R: Read, W: Write>(
        &self,
        source: R,
        mut sink: W,
        on_progress: Option<&mut dyn FnMut(u64)>,
    ) -> BackupResult<u64> {
        let reader = ProgressReader::new(source, on_progress);

        let mut decoder =
            zstd::stream::Decoder::new(reader).map_err(|e| codec_error("zstd init", e))?;

        let written = self.pump(&mut decoder, &mut sink, "zstd decompress")?;
        sink.flush().map_err(|e| codec_error("zstd flush", e))?;

        Ok(written)
    }

    fn pump<R: Read, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        context: &str,
    ) -> BackupResult<u64> {
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(codec_error(context, e)),
            };
            writer
                .write_all(&buffer[..n])
                .map_err(|e| codec_error(context, e))?;
            total += n as u64;
        }

        Ok(total)
    }
}

fn codec_error(context: &str, err: io::Error) -> BackupError {
    BackupError::Codec(format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_content() -> Vec<u8> {
        (0..200_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
    }

    #[test]
    fn test_compress_decompress_hello_world() {
        let content = b"hello world";
        let pipeline = CompressionPipeline::default();

        let mut compressed = Vec::new();
        pipeline.compress(&content[..], &mut compressed, None).unwrap();

        let mut restored = Vec::new();
        pipeline
            .decompress(Cursor::new(compressed), &mut restored, None)
            .unwrap();

        assert_eq!(restored, content);
    }

    #[test]
    fn test_progress_sums_to_input_length() {
        let content = sample_content();
        let pipeline = CompressionPipeline::new(3).with_chunk_size(4096);

        let mut compressed = Vec::new();
        let mut compress_total = 0u64;
        let mut on_compress = |n: u64| compress_total += n;
        let consumed = pipeline
            .compress(Cursor::new(&content), &mut compressed, Some(&mut on_compress))
            .unwrap();
        assert_eq!(compress_total, content.len() as u64);
        assert_eq!(consumed, content.len() as u64);

        let mut restored = Vec::new();
        let mut decompress_total = 0u64;
        let mut on_decompress = |n: u64| decompress_total += n;
        let written = pipeline
            .decompress(
                Cursor::new(&compressed),
                &mut restored,
                Some(&mut on_decompress),
            )
            .unwrap();
        assert_eq!(decompress_total, compressed.len() as u64);
        assert_eq!(written, content.len() as u64);
        assert_eq!(restored, content);
    }

    #[test]
    fn test_empty_input() {
        let pipeline = CompressionPipeline::default();
        let mut compressed = Vec::new();
        pipeline.compress(io::empty(), &mut compressed, None).unwrap();

        let mut restored = Vec::new();
        pipeline
            .decompress(Cursor::new(compressed), &mut restored, None)
            .unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_corrupted_stream_is_codec_error() {
        let content = sample_content();
        let pipeline = CompressionPipeline::default();
        let mut compressed = Vec::new();
        pipeline.compress(Cursor::new(&content), &mut compressed, None).unwrap();

        let middle = compressed.len() / 2;
        compressed[middle] ^= 0xFF;

        let mut restored = Vec::new();
        let err = pipeline
            .decompress(Cursor::new(compressed), &mut restored, None)
            .unwrap_err();
        assert!(matches!(err, BackupError::Codec(_)));
    }

    #[test]
    fn test_garbage_input_is_codec_error() {
        let pipeline = CompressionPipeline::default();
        let mut restored = Vec::new();
        let err = pipeline
            .decompress(&b"definitely not zstd"[..], &mut restored, None)
            .unwrap_err();
        assert!(matches!(err, BackupError::Codec(_)));
    }
}
