use std::collections::HashMap;
use tracing::error;

use crate::models::{CountEntry, StatsResponse, WaitlistEntry};
use crate::store::WaitlistStore;

// Sentinel display labels for absent optional fields. Stored values stay
// NULL; these only exist in the read path.
pub const DIRECT: &str = "direct";
pub const UNSPECIFIED: &str = "unspecified";

// Frequency table over one categorical column. Null/blank values count
// under the fallback label. Sorted by count descending, ties by key.
pub fn to_counts<I>(values: I, fallback: &str) -> Vec<CountEntry>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut counts: HashMap<String, u64> = HashMap::new();
    for value in values {
        let trimmed = value.as_deref().unwrap_or("").trim();
        let key = if trimmed.is_empty() { fallback } else { trimmed };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }

    let mut table: Vec<CountEntry> = counts
        .into_iter()
        .map(|(key, count)| CountEntry { key, count })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    table
}

// Partial PII mask for the dashboard: keep the first three characters of
// the local part, replace the rest with `***`, leave the domain intact.
// Short local parts (and strings without an '@') pass through unchanged.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    if local.chars().count() <= 3 {
        return email.to_string();
    }
    let prefix: String = local.chars().take(3).collect();
    format!("{prefix}***@{domain}")
}

// Best-effort dashboard summary. Read failures never fail the response:
// each portion degrades to zero/empty with a note, and the underlying
// error goes to the log instead of the client.
pub async fn build_stats(
    store: &dyn WaitlistStore,
    row_cap: usize,
    recent_limit: usize,
) -> StatsResponse {
    let total = match store.count().await {
        Ok(total) => total,
        Err(err) => {
            error!(%err, "stats count failed");
            return StatsResponse::empty("count unavailable");
        }
    };

    let rows = match store.tag_rows(row_cap).await {
        Ok(rows) => rows,
        Err(err) => {
            error!(%err, "stats aggregation fetch failed");
            return StatsResponse {
                total,
                by_source: Vec::new(),
                by_location: Vec::new(),
                recent: Vec::new(),
                note: Some("aggregation unavailable".to_string()),
            };
        }
    };

    let by_source = to_counts(rows.iter().map(|r| r.source.clone()), DIRECT);
    let by_location = to_counts(rows.iter().map(|r| r.school.clone()), UNSPECIFIED);

    let (recent, note) = match store.recent(recent_limit).await {
        Ok(rows) => (
            rows.into_iter()
                .map(|mut entry: WaitlistEntry| {
                    entry.email = mask_email(&entry.email);
                    entry
                })
                .collect(),
            None,
        ),
        Err(err) => {
            error!(%err, "stats recent fetch failed");
            (Vec::new(), Some("recent activity unavailable".to_string()))
        }
    };

    StatsResponse {
        total,
        by_source,
        by_location,
        recent,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEntry;
    use crate::store::{MemoryStore, StoreError, WaitlistStore};
    use crate::models::TagRow;
    use async_trait::async_trait;

    fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn counts_group_sort_and_substitute_sentinel() {
        let table = to_counts(owned(&[Some("a"), Some("a"), Some("b"), None]), DIRECT);
        assert_eq!(
            table,
            vec![
                CountEntry { key: "a".to_string(), count: 2 },
                CountEntry { key: "b".to_string(), count: 1 },
                CountEntry { key: DIRECT.to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn count_ties_break_by_key_ascending() {
        let table = to_counts(owned(&[Some("b"), Some("a"), Some("c"), Some("a")]), DIRECT);
        let keys: Vec<&str> = table.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn blank_values_count_as_sentinel() {
        let table = to_counts(owned(&[Some("   "), Some(""), None]), UNSPECIFIED);
        assert_eq!(
            table,
            vec![CountEntry { key: UNSPECIFIED.to_string(), count: 3 }]
        );
    }

    #[test]
    fn mask_keeps_first_three_chars_of_long_locals() {
        assert_eq!(mask_email("abcdef@example.com"), "abc***@example.com");
        assert_eq!(mask_email("abcd@example.com"), "abc***@example.com");
    }

    #[test]
    fn mask_leaves_short_locals_alone() {
        assert_eq!(mask_email("ab@example.com"), "ab@example.com");
        assert_eq!(mask_email("abc@example.com"), "abc@example.com");
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[tokio::test]
    async fn stats_over_a_populated_store() {
        let store = MemoryStore::new();
        let rows = [
            ("Ada", "adalovelace@example.com", None, Some("a")),
            ("Grace", "grace@example.com", Some("MIT"), Some("a")),
            ("Alan", "alan@example.com", None, Some("b")),
            ("Edsger", "edsger@example.com", Some("MIT"), None),
        ];
        for (name, email, school, source) in rows {
            store
                .insert(&NewEntry {
                    name: name.to_string(),
                    email: email.to_string(),
                    school: school.map(str::to_string),
                    source: source.map(str::to_string),
                })
                .await
                .unwrap();
        }

        let stats = build_stats(&store, 20_000, 2).await;
        assert_eq!(stats.total, 4);
        assert_eq!(
            stats.by_source,
            vec![
                CountEntry { key: "a".to_string(), count: 2 },
                CountEntry { key: "b".to_string(), count: 1 },
                CountEntry { key: DIRECT.to_string(), count: 1 },
            ]
        );
        assert_eq!(
            stats.by_location,
            vec![
                CountEntry { key: "MIT".to_string(), count: 2 },
                CountEntry { key: UNSPECIFIED.to_string(), count: 2 },
            ]
        );
        assert_eq!(stats.recent.len(), 2);
        assert_eq!(stats.recent[0].email, "eds***@example.com");
        assert!(stats.note.is_none());
    }

    // Store that fails every read, for the degradation contract
    struct BrokenStore;

    #[async_trait]
    impl WaitlistStore for BrokenStore {
        async fn insert(&self, _entry: &NewEntry) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
        async fn count(&self) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
        async fn tag_rows(&self, _cap: usize) -> Result<Vec<TagRow>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
        async fn recent(&self, _limit: usize) -> Result<Vec<WaitlistEntry>, StoreError> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn read_failures_degrade_instead_of_erroring() {
        let stats = build_stats(&BrokenStore, 20_000, 25).await;
        assert_eq!(stats.total, 0);
        assert!(stats.by_source.is_empty());
        assert!(stats.by_location.is_empty());
        assert!(stats.recent.is_empty());
        assert_eq!(stats.note.as_deref(), Some("count unavailable"));
    }
}
