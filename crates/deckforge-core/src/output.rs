//! Writing outline records as JSON or JSON Lines.

use crate::types::TopicRecord;
use std::io::{self, Write};
use std::str::FromStr;

/// Serialization of the `outline` command's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array holding every record
    #[default]
    Json,
    /// One record per line
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!("unknown output format '{other}' (expected json or jsonl)")),
        }
    }
}

/// Streams [`TopicRecord`]s to any writer.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    written: usize,
    fallbacks: usize,
}

impl<W: Write> RecordWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            written: 0,
            fallbacks: 0,
        }
    }

    /// Write a batch of records and flush.
    pub fn write_records(&mut self, records: &[TopicRecord]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let result = if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, records)
                } else {
                    serde_json::to_writer(&mut self.writer, records)
                };
                result.map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
            OutputFormat::JsonLines => {
                for record in records {
                    serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                }
            }
        }

        self.written += records.len();
        self.fallbacks += records.iter().filter(|r| r.is_fallback()).count();
        self.writer.flush()
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// How many written records carry diagnostic placeholder content.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(topic: &str) -> TopicRecord {
        TopicRecord {
            topic: topic.to_string(),
            summary: vec!["[Summary Sentence 1: x.]".to_string()],
            code: None,
            slides: "Title: T\n---".to_string(),
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("JSONL".parse::<OutputFormat>(), Ok(OutputFormat::JsonLines));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_json_array() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json, false);
        writer.write_records(&[record("A"), record("B")]).unwrap();
        assert_eq!(writer.written(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let parsed: Vec<TopicRecord> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, vec![record("A"), record("B")]);
    }

    #[test]
    fn test_json_lines() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::JsonLines, true);
        writer.write_records(&[record("A"), record("B")]).unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: TopicRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.topic, "B");
    }

    #[test]
    fn test_counts_fallbacks() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json, true);
        let fallback = record(&format!("{}rust", crate::outline::TOPIC_FALLBACK_PREFIX));
        writer.write_records(&[record("ok"), fallback]).unwrap();
        assert_eq!(writer.fallbacks(), 1);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(out.contains("\n  "));
    }
}
