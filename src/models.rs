use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Submission request body - name/email required, school/source optional
#[derive(Deserialize, Clone)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub school: Option<String>,
    pub source: Option<String>,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
}

// A normalized entry ready for insertion. `school`/`source` are None when
// the client omitted them or sent only whitespace; the store keeps NULL,
// display labels are applied on the read path only.
#[derive(Serialize, Clone, Debug)]
pub struct NewEntry {
    pub name: String,
    pub email: String,
    pub school: Option<String>,
    pub source: Option<String>,
}

// A stored row as the store returns it. `created_at` is optional because
// the aggregation queries project only the columns they need.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WaitlistEntry {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub school: Option<String>,
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// Projection used by the frequency tables
#[derive(Deserialize, Clone, Debug)]
pub struct TagRow {
    pub source: Option<String>,
    pub school: Option<String>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct CountEntry {
    pub key: String,
    pub count: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: u64,
    pub by_source: Vec<CountEntry>,
    pub by_location: Vec<CountEntry>,
    pub recent: Vec<WaitlistEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StatsResponse {
    pub fn empty(note: impl Into<String>) -> Self {
        Self {
            total: 0,
            by_source: Vec::new(),
            by_location: Vec::new(),
            recent: Vec::new(),
            note: Some(note.into()),
        }
    }
}
