// legal-backend/src/shared/datetime.rs

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// UTCのISO-8601（ミリ秒, Z付き）
pub fn to_iso_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 文字列の日時を UTC ISO-8601 に正規化する。解釈できない値はそのまま返す
pub fn normalize_timestamp(value: &Value) -> Value {
    let Value::String(raw) = value else {
        return value.clone();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Value::String(to_iso_millis(parsed.with_timezone(&Utc)));
    }
    // タイムゾーンなしの値はUTCとして扱う
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Value::String(to_iso_millis(naive.and_utc()));
        }
    }
    value.clone()
}

/// DateTime<Utc> を ISO-8601（ミリ秒）でシリアライズする
pub mod iso_millis {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_iso_millis(*date))
    }
}

pub mod optional_iso_millis {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => serializer.serialize_str(&to_iso_millis(*dt)),
            None => serializer.serialize_none(),
        }
    }
}
