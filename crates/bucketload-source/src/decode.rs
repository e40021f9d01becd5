//! Per-object decoders for JSON lines and CSV bodies.

use std::io::Cursor;

use bucketload_types::{Format, Record};
use serde_json::Value;

use crate::error::{self, SourceError};

/// Records of a single object, decoded lazily one line/row at a time.
pub(crate) enum ObjectRecords {
    Jsonl {
        key: String,
        /// `(1-based line number, line text)` for every non-blank line.
        lines: std::vec::IntoIter<(usize, String)>,
    },
    Csv {
        key: String,
        headers: Vec<String>,
        rows: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
    },
}

impl ObjectRecords {
    /// Check the body is UTF-8 and prepare a decoder for it.
    pub(crate) fn open(key: &str, format: Format, body: Vec<u8>) -> error::Result<Self> {
        let text = String::from_utf8(body).map_err(|source| SourceError::Utf8 {
            key: key.to_string(),
            source,
        })?;

        match format {
            Format::Jsonl => {
                let lines: Vec<(usize, String)> = text
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(idx, line)| (idx + 1, line.trim().to_string()))
                    .collect();
                Ok(Self::Jsonl {
                    key: key.to_string(),
                    lines: lines.into_iter(),
                })
            }
            Format::Csv => {
                let mut reader = csv::ReaderBuilder::new()
                    .flexible(true)
                    .from_reader(Cursor::new(text.into_bytes()));
                let headers = reader
                    .headers()
                    .map_err(|source| SourceError::Csv {
                        key: key.to_string(),
                        source,
                    })?
                    .iter()
                    .map(str::to_string)
                    .collect();
                Ok(Self::Csv {
                    key: key.to_string(),
                    headers,
                    rows: reader.into_records(),
                })
            }
        }
    }
}

impl Iterator for ObjectRecords {
    type Item = error::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Jsonl { key, lines } => {
                let (line_no, line) = lines.next()?;
                Some(parse_json_line(key, line_no, &line))
            }
            Self::Csv { key, headers, rows } => {
                let row = rows.next()?;
                Some(
                    row.map(|row| {
                        headers
                            .iter()
                            .zip(row.iter())
                            .map(|(h, v)| (h.clone(), Value::String(v.to_string())))
                            .collect()
                    })
                    .map_err(|source| SourceError::Csv {
                        key: key.clone(),
                        source,
                    }),
                )
            }
        }
    }
}

fn parse_json_line(key: &str, line_no: usize, line: &str) -> error::Result<Record> {
    let value: Value = serde_json::from_str(line).map_err(|source| SourceError::Json {
        key: key.to_string(),
        line: line_no,
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SourceError::NotAnObject {
            key: key.to_string(),
            line: line_no,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(format: Format, body: &str) -> Vec<error::Result<Record>> {
        ObjectRecords::open("k", format, body.as_bytes().to_vec())
            .unwrap()
            .collect()
    }

    #[test]
    fn jsonl_skips_blank_lines() {
        let body = "{\"patient_id\":\"P1\"}\n\n   \n{\"patient_id\":\"P2\",\"n\":3}\r\n";
        let records: Vec<Record> = decode(Format::Jsonl, body)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["patient_id"], json!("P1"));
        assert_eq!(records[1]["n"], json!(3));
    }

    #[test]
    fn jsonl_malformed_line_reports_line_number_after_earlier_records() {
        let body = "{\"a\":1}\n\n{not json}\n{\"a\":2}\n";
        let items = decode(Format::Jsonl, body);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(SourceError::Json { line, .. }) => assert_eq!(*line, 3),
            other => panic!("expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn jsonl_non_object_is_error() {
        let items = decode(Format::Jsonl, "[1,2,3]\n");
        assert!(matches!(
            items[0],
            Err(SourceError::NotAnObject { line: 1, .. })
        ));
    }

    #[test]
    fn csv_rows_map_headers_to_strings() {
        let body = "patient_id,encounter_date,claim_amount\nP1,2025-08-01,10.5\nP2,2025-08-02\n";
        let records: Vec<Record> = decode(Format::Csv, body)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["claim_amount"], json!("10.5"));
        assert_eq!(records[1]["encounter_date"], json!("2025-08-02"));
        assert!(!records[1].contains_key("claim_amount"));
    }

    #[test]
    fn csv_quoted_fields() {
        let body = "patient_id,status_code\n\"P,1\",\"say \"\"hi\"\"\"\n";
        let records: Vec<Record> = decode(Format::Csv, body)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(records[0]["patient_id"], json!("P,1"));
        assert_eq!(records[0]["status_code"], json!("say \"hi\""));
    }

    #[test]
    fn empty_csv_has_no_records() {
        assert!(decode(Format::Csv, "").is_empty());
    }

    #[test]
    fn non_utf8_body_is_rejected() {
        let err = ObjectRecords::open("bad", Format::Jsonl, vec![0xff, 0xfe, b'\n']).err();
        assert!(matches!(err, Some(SourceError::Utf8 { .. })));
    }
}
