use crate::format::{format_header_row, format_row, quote};
use crate::observation::{ObservationPayload, ObservationValue};
use bytes::Bytes;

/// Fourth line of every record body
pub const OBSERVATIONS_MARKER: &str = "\"observations:\"";

/// CSV record for a single timestamp of a SYNOP message
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub topic: String,
    pub headers: Vec<String>,
    pub logger_id: String,
    pub timestamp: String,
    pub values: Vec<ObservationValue>,
}

impl CsvRecord {
    /// Render the record body
    ///
    /// Five newline-terminated lines: quoted topic, quoted headers, quoted
    /// logger id, the observations marker and the formatted values. The
    /// header and value lines are not checked against each other.
    pub fn body(&self) -> String {
        let lines = [
            quote(&self.topic),
            format_header_row(&self.headers),
            quote(&self.logger_id),
            OBSERVATIONS_MARKER.to_string(),
            format_row(&self.values),
        ];

        let mut body = String::new();
        for line in lines {
            body.push_str(&line);
            body.push('\n');
        }
        body
    }

    /// UTF-8 bytes of the body, ready for upload
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.body())
    }
}

/// Build one record per timestamp, in payload order
pub fn build_records(topic: &str, payload: &ObservationPayload) -> Vec<CsvRecord> {
    payload
        .observations
        .iter()
        .map(|entry| CsvRecord {
            topic: topic.to_string(),
            headers: payload.headers.clone(),
            logger_id: payload.logger_id.clone(),
            timestamp: entry.timestamp.clone(),
            values: entry.values.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::TimestampedValues;

    const TOPIC: &str = "data-incoming/zmb/campbell-v1/MetDpt-WIS2Test/data/cr1000x/34769/SYNOP";

    fn sample_payload() -> ObservationPayload {
        ObservationPayload {
            headers: vec!["a".to_string(), "b".to_string()],
            logger_id: "34769".to_string(),
            observations: vec![
                TimestampedValues {
                    timestamp: "2023-04-28T15:32:00Z".to_string(),
                    values: vec![ObservationValue::from("x"), ObservationValue::from(1)],
                },
                TimestampedValues {
                    timestamp: "2023-04-28T15:33:00Z".to_string(),
                    values: vec![ObservationValue::Null, ObservationValue::from(true)],
                },
            ],
        }
    }

    #[test]
    fn test_one_record_per_timestamp() {
        let records = build_records(TOPIC, &sample_payload());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, "2023-04-28T15:32:00Z");
        assert_eq!(records[1].timestamp, "2023-04-28T15:33:00Z");
        assert!(records.iter().all(|r| r.topic == TOPIC && r.logger_id == "34769"));
    }

    #[test]
    fn test_record_body_layout() {
        let records = build_records("t/SYNOP", &sample_payload());

        assert_eq!(
            records[0].body(),
            "\"t/SYNOP\"\n\"a\",\"b\"\n\"34769\"\n\"observations:\"\n\"x\",1\n"
        );
        assert_eq!(
            records[1].body(),
            "\"t/SYNOP\"\n\"a\",\"b\"\n\"34769\"\n\"observations:\"\n,true\n"
        );
    }

    #[test]
    fn test_record_body_has_five_lines() {
        for record in build_records(TOPIC, &sample_payload()) {
            let body = record.body();
            assert!(body.ends_with('\n'));
            assert_eq!(body.matches('\n').count(), 5);
            assert_eq!(body.lines().nth(3), Some(OBSERVATIONS_MARKER));
        }
    }

    #[test]
    fn test_mismatched_lengths_are_kept() {
        let mut payload = sample_payload();
        payload.observations[0].values.push(ObservationValue::from(99));

        let body = build_records(TOPIC, &payload)[0].body();
        assert_eq!(body.lines().last(), Some("\"x\",1,99"));
    }

    #[test]
    fn test_empty_values_still_produce_five_lines() {
        let mut payload = sample_payload();
        payload.observations[0].values.clear();

        let body = build_records(TOPIC, &payload)[0].body();
        assert_eq!(body.matches('\n').count(), 5);
        assert!(body.ends_with("\"observations:\"\n\n"));
    }

    #[test]
    fn test_no_timestamps_no_records() {
        let mut payload = sample_payload();
        payload.observations.clear();
        assert!(build_records(TOPIC, &payload).is_empty());
    }

    #[test]
    fn test_to_bytes_matches_body() {
        let record = &build_records(TOPIC, &sample_payload())[0];
        assert_eq!(record.to_bytes(), Bytes::from(record.body()));
    }
}
