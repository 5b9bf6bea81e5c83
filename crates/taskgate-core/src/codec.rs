use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error)]
#[error("malformed task collection: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Encodes the full collection as a JSON array.
pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(tasks)?)
}

pub fn decode_tasks(raw: &str) -> Result<Vec<Task>, DecodeError> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{decode_tasks, encode_tasks};
    use crate::task::{Priority, Task};

    #[test]
    fn collection_roundtrips() {
        let tasks = vec![
            Task {
                id: 1,
                title: "a".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                priority: Priority::Least,
                description: "first\nline two".to_string(),
                completed: true,
                created_at: Utc.timestamp_millis_opt(1_704_067_200_123).unwrap(),
            },
            Task {
                id: 2,
                title: "b".to_string(),
                start_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                priority: Priority::Important,
                description: String::new(),
                completed: false,
                created_at: Utc.timestamp_millis_opt(1_706_745_600_000).unwrap(),
            },
        ];

        let raw = encode_tasks(&tasks).expect("encode tasks");
        assert_eq!(decode_tasks(&raw).unwrap(), tasks);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_tasks("not json").is_err());
        assert!(decode_tasks(r#"{"id": 1}"#).is_err());
        assert!(decode_tasks(r#"[{"id": 1, "title": "x"}]"#).is_err());
        assert_eq!(decode_tasks("[]").unwrap(), vec![]);
    }
}
