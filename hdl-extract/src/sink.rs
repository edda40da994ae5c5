//! Output seam for downstream consumers of extractions.

use std::io::{self, Write};

use crate::Extraction;

/// Receives finished extractions, one call per module.
///
/// Knowledge-graph writers, summarizers and embedders sit behind this trait;
/// the crate itself only ships [`JsonSink`].
pub trait ExtractionSink {
    fn accept(&mut self, extraction: &Extraction) -> io::Result<()>;

    /// Called once after the last extraction.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes each extraction as one JSON document.
///
/// Compact documents are newline-delimited; pretty documents are separated
/// by a blank line.
pub struct JsonSink<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExtractionSink for JsonSink<W> {
    fn accept(&mut self, extraction: &Extraction) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, extraction)?;
            writeln!(self.writer)?;
        } else {
            serde_json::to_writer(&mut self.writer, extraction)?;
        }
        writeln!(self.writer)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<S: ExtractionSink + ?Sized> ExtractionSink for &mut S {
    fn accept(&mut self, extraction: &Extraction) -> io::Result<()> {
        (**self).accept(extraction)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}
