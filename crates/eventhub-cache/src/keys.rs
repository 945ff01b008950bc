//! Cache key builders for all EventHub cache entries.
//!
//! Centralising key construction keeps every list key under the
//! `events:` prefix that [`event_list_pattern`] invalidates, and makes two
//! semantically equal list requests produce the same key.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use eventhub_core::types::pagination::PageRequest;
use eventhub_entity::event::EventQuery;

// ── Event keys ─────────────────────────────────────────────

/// Cache key for a single event by ID.
pub fn event_by_id(event_id: Uuid) -> String {
    format!("event:{event_id}")
}

/// Cache key for one page of an event list.
///
/// Every parameter appears in a fixed order; absent filters render as `-`
/// and the title is trimmed and lowercased, matching the case-insensitive
/// filter it feeds.
pub fn event_list(query: &EventQuery, page: &PageRequest) -> String {
    let title = query
        .title_filter()
        .map(|t| escape(&t.to_lowercase()))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "events:page={}:limit={}:title={}:start={}:end={}:available={}:sort={}:order={}",
        page.page,
        page.page_size,
        title,
        instant(query.start_date),
        instant(query.end_date),
        query.available_only,
        query.sort_by.column(),
        query.order.as_sql(),
    )
}

/// Pattern matching every cached event list.
pub fn event_list_pattern() -> &'static str {
    "events:*"
}

fn instant(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|v| v.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| "-".to_string())
}

/// Keep user text from forging the `:name=` separators.
fn escape(value: &str) -> String {
    value.replace('%', "%25").replace(':', "%3A").replace('*', "%2A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use eventhub_core::types::SortDirection;
    use eventhub_entity::event::EventSortField;

    #[test]
    fn test_event_key() {
        let id = Uuid::nil();
        assert_eq!(
            event_by_id(id),
            "event:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_default_list_key() {
        let key = event_list(&EventQuery::default(), &PageRequest::default());
        assert_eq!(
            key,
            "events:page=1:limit=10:title=-:start=-:end=-:available=false:sort=date:order=ASC"
        );
    }

    #[test]
    fn test_list_key_is_canonical() {
        let a = EventQuery {
            title: Some("  RustConf ".to_string()),
            ..Default::default()
        };
        let b = EventQuery {
            title: Some("rustconf".to_string()),
            ..Default::default()
        };
        let page = PageRequest::new(2, 5);
        assert_eq!(event_list(&a, &page), event_list(&b, &page));
    }

    #[test]
    fn test_list_key_distinguishes_parameters() {
        let page = PageRequest::default();
        let base = EventQuery::default();
        let sorted = EventQuery {
            sort_by: EventSortField::Title,
            order: SortDirection::Desc,
            ..Default::default()
        };
        let dated = EventQuery {
            start_date: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let keys = [
            event_list(&base, &page),
            event_list(&sorted, &page),
            event_list(&dated, &page),
            event_list(&base, &PageRequest::new(2, 10)),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_list_keys_share_invalidation_prefix() {
        let prefix = event_list_pattern().trim_end_matches('*');
        let key = event_list(
            &EventQuery {
                title: Some("a:b*".to_string()),
                available_only: true,
                ..Default::default()
            },
            &PageRequest::default(),
        );
        assert!(key.starts_with(prefix));
        assert!(key.contains("title=a%3Ab%2A"));
        assert!(!event_by_id(Uuid::new_v4()).starts_with(prefix));
    }
}
