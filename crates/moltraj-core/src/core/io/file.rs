//! Line-oriented text streams with byte positions and transparent gzip support.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::format::FormatKind;
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

trait Source: BufRead + Seek + Send {}
impl<T: BufRead + Seek + Send> Source for T {}

pub(crate) fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}

/// A text file read line by line, with byte offsets usable for seeking.
///
/// Gzip files are decompressed in memory when opened, so offsets always refer
/// to the decompressed text.
pub struct TextFile {
    path: PathBuf,
    source: Box<dyn Source>,
    position: u64,
    line_start: u64,
}

impl TextFile {
    pub fn open(path: impl AsRef<Path>) -> FormatResult<Self> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| FormatError::Io {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(io_error)?;
        let source: Box<dyn Source> = if is_gzip(&path) {
            let mut content = Vec::new();
            MultiGzDecoder::new(BufReader::new(file))
                .read_to_end(&mut content)
                .map_err(io_error)?;
            Box::new(Cursor::new(content))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self {
            path,
            source,
            position: 0,
            line_start: 0,
        })
    }

    /// Reads from an in-memory string; `path` is only used in error messages.
    pub fn from_string(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: Box::new(Cursor::new(content.into().into_bytes())),
            position: 0,
            line_start: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of the next line to be read.
    pub fn tell(&self) -> u64 {
        self.position
    }

    /// Byte offset of the start of the last line returned.
    pub fn line_start(&self) -> u64 {
        self.line_start
    }

    pub fn seek(&mut self, position: u64) -> FormatResult<()> {
        self.source
            .seek(SeekFrom::Start(position))
            .map_err(|source| self.io_error(source))?;
        self.position = position;
        self.line_start = position;
        Ok(())
    }

    pub fn eof(&mut self) -> FormatResult<bool> {
        let empty = self.source.fill_buf().map(|buffer| buffer.is_empty());
        empty.map_err(|source| self.io_error(source))
    }

    /// Reads one line without its terminator, or `None` at end of file.
    pub fn try_read_line(&mut self) -> FormatResult<Option<String>> {
        let mut line = String::new();
        let count = self
            .source
            .read_line(&mut line)
            .map_err(|source| self.io_error(source))?;
        if count == 0 {
            return Ok(None);
        }
        self.line_start = self.position;
        self.position += count as u64;
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Reads one line, failing with `UnexpectedEof` at end of file.
    pub fn read_line(&mut self, expected: &str) -> FormatResult<String> {
        match self.try_read_line()? {
            Some(line) => Ok(line),
            None => Err(self.eof_error(expected)),
        }
    }

    pub fn read_lines(&mut self, count: usize, expected: &str) -> FormatResult<Vec<String>> {
        (0..count).map(|_| self.read_line(expected)).collect()
    }

    pub fn skip_lines(&mut self, count: usize, expected: &str) -> FormatResult<()> {
        for _ in 0..count {
            self.read_line(expected)?;
        }
        Ok(())
    }

    /// Whether everything left in the file is blank. The position is unchanged.
    pub fn at_blank_tail(&mut self) -> FormatResult<bool> {
        let (position, line_start) = (self.position, self.line_start);
        let mut blank = true;
        while let Some(line) = self.try_read_line()? {
            if !line.trim().is_empty() {
                blank = false;
                break;
            }
        }
        self.seek(position)?;
        self.line_start = line_start;
        Ok(blank)
    }

    pub fn io_error(&self, source: io::Error) -> FormatError {
        FormatError::Io {
            path: self.path.clone(),
            source,
        }
    }

    pub fn eof_error(&self, expected: impl Into<String>) -> FormatError {
        FormatError::UnexpectedEof {
            path: self.path.clone(),
            position: self.position,
            expected: expected.into(),
        }
    }

    /// A parse error located at the start of the last line read.
    pub fn parse_error(&self, format: FormatKind, kind: ParseErrorKind) -> FormatError {
        FormatError::Parse {
            format,
            path: self.path.clone(),
            position: self.line_start,
            kind,
        }
    }
}

impl fmt::Debug for TextFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFile")
            .field("path", &self.path)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    #[cfg(test)]
    Memory(Vec<u8>),
}

impl Sink {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Plain(writer) => writer,
            Self::Gzip(writer) => writer,
            #[cfg(test)]
            Self::Memory(buffer) => buffer,
        }
    }
}

/// A text file written line by line, gzip-compressed when the path ends in `.gz`.
pub struct TextWriter {
    path: PathBuf,
    sink: Sink,
    written: u64,
}

impl TextWriter {
    /// Creates (or truncates) the file, or opens it for appending.
    pub fn create(path: impl AsRef<Path>, append: bool) -> FormatResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|source| FormatError::Io {
                path: path.clone(),
                source,
            })?;
        let writer = BufWriter::new(file);
        let sink = if is_gzip(&path) {
            Sink::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Sink::Plain(writer)
        };
        Ok(Self {
            path,
            sink,
            written: 0,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_memory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sink: Sink::Memory(Vec::new()),
            written: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn contents(&self) -> String {
        match &self.sink {
            Sink::Memory(buffer) => String::from_utf8_lossy(buffer).into_owned(),
            _ => String::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of (uncompressed) bytes written through this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Writes `content` followed by a newline.
    pub fn line(&mut self, content: impl fmt::Display) -> FormatResult<()> {
        let mut text = content.to_string();
        text.push('\n');
        self.sink
            .writer()
            .write_all(text.as_bytes())
            .map_err(|source| FormatError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.written += text.len() as u64;
        Ok(())
    }

    /// Flushes buffered data and writes the gzip trailer, if any.
    pub fn finish(&mut self) -> FormatResult<()> {
        let result = match &mut self.sink {
            Sink::Plain(writer) => writer.flush(),
            Sink::Gzip(writer) => writer.try_finish().and_then(|()| writer.get_mut().flush()),
            #[cfg(test)]
            Sink::Memory(_) => Ok(()),
        };
        result.map_err(|source| FormatError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl fmt::Debug for TextWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextWriter")
            .field("path", &self.path)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}
