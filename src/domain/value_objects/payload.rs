use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object carried by records and queued tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncPayload(Value);

impl SyncPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// Top-level string field, also accepting numbers since server ids arrive either way.
    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn job_id(&self) -> Option<String> {
        self.str_field("jobId")
    }

    pub fn technician_id(&self) -> Option<String> {
        self.str_field("technicianId")
    }

    pub fn customer_id(&self) -> Option<String> {
        self.str_field("customerId")
    }

    pub fn status(&self) -> Option<String> {
        self.str_field("status")
    }

    /// Shallow merge of `other` into this payload; keys in `other` win.
    pub fn merged_with(&self, other: &SyncPayload) -> SyncPayload {
        let mut map = match &self.0 {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let Value::Object(patch) = &other.0 {
            for (key, value) in patch {
                map.insert(key.clone(), value.clone());
            }
        }
        SyncPayload(Value::Object(map))
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Sync payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<SyncPayload> for Value {
    fn from(payload: SyncPayload) -> Self {
        payload.0
    }
}
