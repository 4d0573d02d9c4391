use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format read by the ingestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub timestamp: String,
    pub temp: f64,
    pub humidity: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn generate_reading(rng: &mut impl Rng) -> ReadingPayload {
    ReadingPayload {
        timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        temp: round2(rng.gen_range(20.0..30.0)),
        humidity: round2(rng.gen_range(40.0..60.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_generated_values_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let reading = generate_reading(&mut rng);
            assert!((20.0..=30.0).contains(&reading.temp));
            assert!((40.0..=60.0).contains(&reading.humidity));
            assert_eq!(round2(reading.temp), reading.temp);
        }
    }

    #[test]
    fn test_timestamp_format() {
        let reading = generate_reading(&mut rand::thread_rng());

        assert!(NaiveDateTime::parse_from_str(&reading.timestamp, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn test_wire_field_names() {
        let reading = ReadingPayload {
            timestamp: "2024-01-01 00:00:00".to_string(),
            temp: 22.5,
            humidity: 55.0,
        };

        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["temp"], 22.5);
        assert_eq!(value["humidity"], 55.0);
        assert_eq!(value["timestamp"], "2024-01-01 00:00:00");
        assert!(value.get("temperature").is_none());
    }
}
