use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;

use crate::config::Codec;

/// A stream that must be finalized explicitly (encoders write trailers).
pub trait Finish: Write {
    /// What finalizing yields.
    type Output;

    /// Flush, write any trailer and release the stream.
    fn finish(self) -> io::Result<Self::Output>;
}

impl Finish for Vec<u8> {
    type Output = Vec<u8>;

    fn finish(self) -> io::Result<Self::Output> {
        Ok(self)
    }
}

/// File-backed output stream, plain or compressed.
pub enum FileStream {
    /// Uncompressed text.
    Plain(BufWriter<File>),
    /// gzip.
    Gzip(GzEncoder<BufWriter<File>>),
    /// Zstandard, optionally multithreaded.
    Zstd(zstd::stream::write::Encoder<'static, BufWriter<File>>),
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            FileStream::Plain(_) => "plain",
            FileStream::Gzip(_) => "gzip",
            FileStream::Zstd(_) => "zstd",
        };
        f.debug_tuple("FileStream").field(&kind).finish()
    }
}

impl FileStream {
    /// Create an uncompressed stream.
    pub fn plain(path: &Path) -> io::Result<Self> {
        Ok(FileStream::Plain(BufWriter::new(File::create(path)?)))
    }

    /// Create a stream with `codec` at `level`; `threads` applies to zstd.
    pub fn create(path: &Path, codec: Codec, level: i32, threads: u32) -> io::Result<Self> {
        let inner = BufWriter::new(File::create(path)?);
        Ok(match codec {
            Codec::None => FileStream::Plain(inner),
            Codec::Gzip => FileStream::Gzip(GzEncoder::new(
                inner,
                flate2::Compression::new(level.clamp(0, 9) as u32),
            )),
            Codec::Zstd => {
                let mut encoder = zstd::stream::write::Encoder::new(inner, level)?;
                if threads > 1 {
                    encoder.multithread(threads)?;
                }
                FileStream::Zstd(encoder)
            }
        })
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileStream::Plain(w) => w.write(buf),
            FileStream::Gzip(w) => w.write(buf),
            FileStream::Zstd(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            FileStream::Plain(w) => w.write_all(buf),
            FileStream::Gzip(w) => w.write_all(buf),
            FileStream::Zstd(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileStream::Plain(w) => w.flush(),
            FileStream::Gzip(w) => w.flush(),
            FileStream::Zstd(w) => w.flush(),
        }
    }
}

impl Finish for FileStream {
    type Output = ();

    fn finish(self) -> io::Result<()> {
        let mut inner = match self {
            FileStream::Plain(w) => w,
            FileStream::Gzip(w) => w.finish()?,
            FileStream::Zstd(w) => w.finish()?,
        };
        inner.flush()
    }
}
