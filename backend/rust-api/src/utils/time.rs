use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;

/// Convert a chrono timestamp into the BSON date type used in update documents.
pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_preserves_millisecond_precision() {
        let dt = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(chrono_to_bson(dt).timestamp_millis(), 1_700_000_000_123);
    }
}
