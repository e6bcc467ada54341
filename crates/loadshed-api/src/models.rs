// Wire models for the loadshedding web API.
//
// Towns, slots, days and schedules keep every field the server sends
// in an `extra` map so that a schedule written back out mirrors what
// was received.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `GET /api/stage` and the `stage-update` push payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageReading {
    /// Current loadshedding stage. Absent or `null` decodes as 0.
    #[serde(default, deserialize_with = "stage_or_zero")]
    pub stage: i32,
}

fn stage_or_zero<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or(0))
}

/// One entry of `GET /api/towns/{province}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Town {
    pub name: String,

    /// Everything else the places service attaches (province, etc.).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Town {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: Map::new(),
        }
    }
}

/// A packed time-of-day value used for slot boundaries.
///
/// The schedule service serializes a time of day as `[hour, minute]` and
/// drops trailing zero components, so `[18]` is 18:00. A bare number is an
/// hour on its own; a string carries the same components separated by `,`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackedTime {
    Hour(u32),
    Parts(Vec<u32>),
    Text(String),
}

/// A single loadshedding window within a day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub start: Option<PackedTime>,
    #[serde(default)]
    pub end: Option<PackedTime>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Day {
    #[serde(default)]
    pub slots: Vec<Slot>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /api/schedule/{province}/{town}`.
///
/// Days carry no date of their own: day `N` falls on `start_date + N`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "WireSchedule", into = "WireSchedule")]
pub struct Schedule {
    pub start_date: Option<NaiveDate>,

    pub days: Vec<Day>,

    pub extra: Map<String, Value>,

    /// `startDate` as received. Written back verbatim while it still
    /// names `start_date`.
    pub raw_start_date: Option<Value>,
}

#[derive(Serialize, Deserialize)]
struct WireSchedule {
    #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
    start_date: Option<Value>,

    #[serde(default)]
    days: Vec<Day>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<WireSchedule> for Schedule {
    type Error = String;

    fn try_from(wire: WireSchedule) -> Result<Self, Self::Error> {
        let raw_start_date = wire.start_date.filter(|v| !v.is_null());
        let start_date = raw_start_date.as_ref().map(parse_start_date).transpose()?;
        Ok(Self {
            start_date,
            days: wire.days,
            extra: wire.extra,
            raw_start_date,
        })
    }
}

impl From<Schedule> for WireSchedule {
    fn from(schedule: Schedule) -> Self {
        let start_date = match (schedule.raw_start_date, schedule.start_date) {
            (Some(raw), Some(date)) if parse_start_date(&raw).ok() == Some(date) => Some(raw),
            (_, date) => date.map(|d| Value::String(d.format(START_DATE_FORMAT).to_string())),
        };
        Self {
            start_date,
            days: schedule.days,
            extra: schedule.extra,
        }
    }
}

const START_DATE_FORMAT: &str = "%Y-%m-%d";

/// `startDate` arrives as `"YYYY-MM-DD"` (optionally followed by a time)
/// or as a `[year, month, day]` triple.
fn parse_start_date(value: &Value) -> Result<NaiveDate, String> {
    match value {
        Value::String(text) => {
            let date_part = text.get(..10).unwrap_or(text);
            NaiveDate::parse_from_str(date_part, START_DATE_FORMAT)
                .map_err(|e| format!("invalid startDate {text:?}: {e}"))
        }
        Value::Array(parts) => {
            let part = |i: usize| parts.get(i).and_then(Value::as_i64);
            let date = match (parts.len(), part(0), part(1), part(2)) {
                (3, Some(year), Some(month), Some(day)) => {
                    match (i32::try_from(year), u32::try_from(month), u32::try_from(day)) {
                        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
                        _ => None,
                    }
                }
                _ => None,
            };
            date.ok_or_else(|| format!("invalid startDate {value}"))
        }
        other => Err(format!("invalid startDate {other}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn stage_defaults_to_zero_when_absent_or_null() {
        let absent: StageReading = serde_json::from_value(json!({})).unwrap();
        let null: StageReading = serde_json::from_value(json!({ "stage": null })).unwrap();
        let set: StageReading = serde_json::from_value(json!({ "stage": 4 })).unwrap();
        assert_eq!(absent.stage, 0);
        assert_eq!(null.stage, 0);
        assert_eq!(set.stage, 4);
    }

    #[test]
    fn town_keeps_unknown_fields() {
        let town: Town =
            serde_json::from_value(json!({ "name": "Soweto", "province": "Gauteng" })).unwrap();
        assert_eq!(town.name, "Soweto");
        assert_eq!(town.extra["province"], "Gauteng");
    }

    #[test]
    fn packed_time_accepts_all_encodings() {
        let slot: Slot = serde_json::from_value(json!({ "start": [2, 30], "end": 4 })).unwrap();
        assert_eq!(slot.start, Some(PackedTime::Parts(vec![2, 30])));
        assert_eq!(slot.end, Some(PackedTime::Hour(4)));

        let text: Slot = serde_json::from_value(json!({ "start": "10,15" })).unwrap();
        assert_eq!(text.start, Some(PackedTime::Text("10,15".into())));
        assert_eq!(text.end, None);
    }

    #[test]
    fn schedule_start_date_from_string_or_triple() {
        let iso: Schedule =
            serde_json::from_value(json!({ "startDate": "2024-03-01", "days": [] })).unwrap();
        let triple: Schedule =
            serde_json::from_value(json!({ "startDate": [2024, 3, 1], "days": [] })).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(iso.start_date, expected);
        assert_eq!(triple.start_date, expected);
    }

    #[test]
    fn schedule_without_start_date() {
        let schedule: Schedule = serde_json::from_value(json!({ "days": [{}] })).unwrap();
        assert_eq!(schedule.start_date, None);
        assert_eq!(schedule.days.len(), 1);
        assert!(schedule.days[0].slots.is_empty());
    }

    #[test]
    fn invalid_start_date_is_rejected() {
        let result: Result<Schedule, _> =
            serde_json::from_value(json!({ "startDate": "2024-13-40", "days": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn schedule_serializes_back_to_same_shape() {
        let raw = json!({
            "startDate": "2024-03-01",
            "days": [
                { "slots": [ { "start": [2], "end": [4, 30] } ] },
                { "slots": [] }
            ],
            "stage": 2
        });
        let schedule: Schedule = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&schedule).unwrap(), raw);
    }

    #[test]
    fn slot_keeps_unknown_fields() {
        let raw = json!({
            "startDate": "2024-03-01",
            "days": [ { "slots": [ { "start": [2, 0], "end": [4, 0], "stage": 3 } ] } ]
        });
        let schedule: Schedule = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(schedule.days[0].slots[0].extra["stage"], 3);
        assert_eq!(serde_json::to_value(&schedule).unwrap(), raw);
    }

    #[test]
    fn start_date_is_written_back_as_received() {
        let with_time = json!({ "startDate": "2024-03-01T00:00:00+02:00", "days": [] });
        let schedule: Schedule = serde_json::from_value(with_time.clone()).unwrap();
        assert_eq!(schedule.start_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(serde_json::to_value(&schedule).unwrap(), with_time);

        let triple = json!({ "startDate": [2024, 3, 1], "days": [] });
        let schedule: Schedule = serde_json::from_value(triple.clone()).unwrap();
        assert_eq!(serde_json::to_value(&schedule).unwrap(), triple);
    }

    #[test]
    fn missing_start_date_is_omitted_on_write() {
        let schedule: Schedule = serde_json::from_value(json!({ "days": [] })).unwrap();
        assert_eq!(
            serde_json::to_value(&schedule).unwrap(),
            json!({ "days": [] })
        );
    }

    #[test]
    fn replaced_start_date_is_written_from_the_date() {
        let mut schedule: Schedule =
            serde_json::from_value(json!({ "startDate": "2024-03-01", "days": [] })).unwrap();
        schedule.start_date = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(
            serde_json::to_value(&schedule).unwrap()["startDate"],
            "2024-03-05"
        );
    }
}
