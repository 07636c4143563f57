use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A persisted state document.
///
/// Decoding never fails loudly: a record that cannot be understood is
/// reported as `None` and the caller falls back to `Default`.
pub trait Record: Serialize + Default + Sized {
    /// Decode the on-disk text of a record
    fn decode(raw: &str) -> Option<Self>;
}

/// Who a state document belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateScope {
    /// Shared by every session in the project
    Project,
    /// One agent session
    Session(String),
}

/// Logical identity of a state document: scope plus concern name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub scope: StateScope,
    pub concern: &'static str,
}

impl StateKey {
    pub fn project(concern: &'static str) -> Self {
        Self {
            scope: StateScope::Project,
            concern,
        }
    }

    pub fn session(session_id: impl Into<String>, concern: &'static str) -> Self {
        Self {
            scope: StateScope::Session(session_id.into()),
            concern,
        }
    }

    /// Session scope when a session id is known, project scope otherwise
    pub fn session_or_project(session_id: Option<&str>, concern: &'static str) -> Self {
        match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::session(id, concern),
            None => Self::project(concern),
        }
    }
}

/// Suppresses a repeated reminder inside a cooldown window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleRecord {
    #[serde(default, alias = "lastShownAt", deserialize_with = "lenient_u64")]
    pub last_triggered_at_epoch_ms: u64,

    #[serde(default, alias = "lastCommand")]
    pub last_value: String,

    /// Fields written by other tools, preserved on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ThrottleRecord {
    /// Whether `now_ms` still falls inside the cooldown of the last trigger
    pub fn is_cooling_down(&self, now_ms: u64, cooldown_ms: u64) -> bool {
        self.last_triggered_at_epoch_ms != 0
            && cooldown_ms > 0
            && now_ms.saturating_sub(self.last_triggered_at_epoch_ms) < cooldown_ms
    }

    /// Record a trigger, keeping unrelated fields
    pub fn triggered(&self, now_ms: u64, value: impl Into<String>) -> Self {
        Self {
            last_triggered_at_epoch_ms: now_ms,
            last_value: value.into(),
            extra: self.extra.clone(),
        }
    }
}

impl Record for ThrottleRecord {
    fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Monotonic counter with a periodic re-trigger timestamp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecord {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count: u64,

    #[serde(default, alias = "lastSuggestedAt", deserialize_with = "lenient_u64")]
    pub last_suggested_at_epoch_ms: u64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for CounterRecord {
    fn decode(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw)
            .ok()
            .or_else(|| raw.trim().parse::<u64>().ok().map(Value::from))?;

        match value {
            // Older counters were stored as a bare integer
            Value::Number(n) => Some(Self {
                count: n.as_u64().unwrap_or(0),
                ..Default::default()
            }),
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }
}

/// Distinct project-relative paths touched since the last flush, in the
/// order they were first edited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccumulatedFileSet {
    files: Vec<String>,
}

impl AccumulatedFileSet {
    /// Append a path; returns `true` if it was not already present
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f == path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in first-edit order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for AccumulatedFileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for path in iter {
            set.insert(path);
        }
        set
    }
}

impl Record for AccumulatedFileSet {
    fn decode(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw).ok()? {
            Value::Array(items) => Some(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) if !s.is_empty() => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Accept integers, floats and numeric strings; anything else reads as zero
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_throttle_accepts_legacy_fields() {
        let record =
            ThrottleRecord::decode(r#"{"lastShownAt": 1000, "lastCommand": "npm install"}"#)
                .unwrap();
        assert_eq!(record.last_triggered_at_epoch_ms, 1000);
        assert_eq!(record.last_value, "npm install");
    }

    #[test]
    fn test_throttle_preserves_unknown_fields() {
        let record = ThrottleRecord::decode(
            r#"{"lastTriggeredAtEpochMs": 5, "lastValue": "x", "owner": "someone"}"#,
        )
        .unwrap();
        let next = record.triggered(10, "y");

        let json = serde_json::to_value(&next).unwrap();
        assert_eq!(json["lastTriggeredAtEpochMs"], 10);
        assert_eq!(json["lastValue"], "y");
        assert_eq!(json["owner"], "someone");
    }

    #[test]
    fn test_throttle_cooldown() {
        let fresh = ThrottleRecord::default();
        assert!(!fresh.is_cooling_down(1_000, 60_000));

        let record = fresh.triggered(1_000, "cmd");
        assert!(record.is_cooling_down(30_000, 60_000));
        assert!(!record.is_cooling_down(61_000, 60_000));
        assert!(!record.is_cooling_down(30_000, 0));
    }

    #[test]
    fn test_counter_decodes_bare_integer() {
        assert_eq!(CounterRecord::decode("42").unwrap().count, 42);
        assert_eq!(CounterRecord::decode(" 7\n").unwrap().count, 7);
    }

    #[test]
    fn test_counter_decodes_lenient_numbers() {
        let record = CounterRecord::decode(r#"{"count": "12", "lastSuggestedAt": 99}"#).unwrap();
        assert_eq!(record.count, 12);
        assert_eq!(record.last_suggested_at_epoch_ms, 99);
    }

    #[test]
    fn test_counter_rejects_garbage() {
        assert_eq!(CounterRecord::decode("{not json"), None);
        assert_eq!(CounterRecord::decode(r#"["a"]"#), None);
    }

    #[test]
    fn test_file_set_filters_non_strings() {
        let set = AccumulatedFileSet::decode(r#"["b.py", 3, "", "a.py", "b.py"]"#).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b.py", "a.py"]);
        assert_eq!(AccumulatedFileSet::decode(r#"{"files": []}"#), None);
    }

    #[test]
    fn test_file_set_keeps_edit_order() {
        let mut set: AccumulatedFileSet = ["src/b.ts", "src/a.ts"].into_iter().collect();
        assert!(!set.insert("src/b.ts"));
        assert!(set.insert("src/0.ts"));
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["src/b.ts","src/a.ts","src/0.ts"]"#
        );
    }

    #[test]
    fn test_session_or_project_key() {
        assert_eq!(
            StateKey::session_or_project(Some("abc"), "x").scope,
            StateScope::Session("abc".to_string())
        );
        assert_eq!(
            StateKey::session_or_project(Some("  "), "x").scope,
            StateScope::Project
        );
        assert_eq!(StateKey::session_or_project(None, "x").scope, StateScope::Project);
    }
}
