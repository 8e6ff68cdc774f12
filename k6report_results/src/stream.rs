//! Reader for the streaming JSON dialect of k6 results files
//!
//! k6 writes one JSON object per record and nothing between them but
//! whitespace, if that. The reader pulls values one after another off a
//! single [`serde_json::StreamDeserializer`], so no enclosing array and no
//! rewriting of the text is needed.

use serde_json::Value;
use tracing::debug;

use crate::record::Record;

/// Errors produced by [`read_records`]. Every variant means the source as a
/// whole is unusable.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The source holds no records at all.
    #[error("source is empty")]
    Empty,
    /// The text is not a sequence of JSON values.
    #[error("malformed JSON at byte {offset}: {source}")]
    Json {
        /// Byte offset into the text where reading stopped.
        offset: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A top-level value is valid JSON but not an object.
    #[error("value {index} is not a JSON object")]
    NotAnObject {
        /// Zero-based position of the offending value.
        index: usize,
    },
}

/// Read every record out of `text`.
///
/// Objects that do not decode as a [`Record`] are skipped. Only a
/// structurally broken stream is an error.
///
/// # Errors
///
/// Returns [`Error::Empty`] for blank input, [`Error::Json`] when the text is
/// not a whitespace-separated sequence of JSON values and
/// [`Error::NotAnObject`] when a top-level value is not an object.
pub fn read_records(text: &str) -> Result<Vec<Record>, Error> {
    if text.trim().is_empty() {
        return Err(Error::Empty);
    }

    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let mut records = Vec::new();
    let mut index = 0;
    while let Some(value) = stream.next() {
        let value = value.map_err(|source| Error::Json {
            offset: stream.byte_offset(),
            source,
        })?;
        if !value.is_object() {
            return Err(Error::NotAnObject { index });
        }
        match Record::from_value(value) {
            Some(record) => records.push(record),
            None => debug!("skipping undecodable record {index}"),
        }
        index += 1;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const POINT: &str = r#"{"type":"Point","metric":"http_reqs","data":{"value":1}}"#;

    #[test]
    fn reads_back_to_back_objects() {
        let text = format!("{POINT}{POINT}{POINT}");
        let records = read_records(&text).expect("valid stream");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn reads_whitespace_separated_objects() {
        let text = format!("  {POINT} \n\n\t{POINT}\n");
        let records = read_records(&text).expect("valid stream");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn braces_inside_strings_are_not_boundaries() {
        let text = r#"{"type":"Point","metric":"vus","data":{"value":3,"tags":{"group":"}{"}}}"#;
        let records = read_records(text).expect("valid stream");
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn empty_source_is_an_error() {
        assert!(matches!(read_records(""), Err(Error::Empty)));
        assert!(matches!(read_records(" \n\t "), Err(Error::Empty)));
    }

    #[test]
    fn truncated_object_is_an_error() {
        let text = format!("{POINT}{{\"type\":");
        assert!(matches!(read_records(&text), Err(Error::Json { .. })));
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        let text = format!("{POINT}x");
        assert!(matches!(read_records(&text), Err(Error::Json { .. })));
    }

    #[test]
    fn non_object_values_are_an_error() {
        assert!(matches!(
            read_records("[]"),
            Err(Error::NotAnObject { index: 0 })
        ));
        assert!(matches!(
            read_records(&format!("{POINT} 1")),
            Err(Error::NotAnObject { index: 1 })
        ));
    }

    #[test]
    fn undecodable_objects_are_skipped() {
        let text = format!(r#"{POINT}{{"hello":"world"}}{POINT}"#);
        let records = read_records(&text).expect("valid stream");
        assert_eq!(records.len(), 2);
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_text(text in "\\PC*") {
            let _ = read_records(&text);
        }

        #[test]
        fn reads_every_object_regardless_of_spacing(
            separators in prop::collection::vec("[ \t\r\n]{0,3}", 1..20),
        ) {
            let mut text = String::new();
            for sep in &separators {
                text.push_str(POINT);
                text.push_str(sep);
            }
            let records = read_records(&text).expect("valid stream");
            prop_assert_eq!(records.len(), separators.len());
        }
    }
}
