//! Lead tracking and phone extraction.

use database::{lead, Database, DatabaseError, Lead, LeadUpdate};
use notifier::{Alert, AlertKind, Dispatcher};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Phone patterns, most specific first. Each one is bounded by non-digits
/// so it never matches inside a longer number.
static PHONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\+380\d{9}",
        r"380\d{9}",
        r"0\d{9}",
        r"(?:\+\d{1,3}[\s\-]?)?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(&format!(r"(?:^|[^\d+])({})(?:$|\D)", p)).unwrap())
    .collect()
});

/// First phone number found in `text`, trying each pattern in order.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_PATTERNS
        .iter()
        .find_map(|re| re.captures(text)?.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Keeps the per-customer commercial profile and announces new leads.
#[derive(Clone)]
pub struct LeadTracker {
    dispatcher: Dispatcher,
}

impl LeadTracker {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Insert or merge the lead. Emits a new-lead alert on first contact.
    pub async fn upsert(
        &self,
        db: &Database,
        customer_id: &str,
        update: LeadUpdate,
        preview: &str,
    ) -> Result<Lead, DatabaseError> {
        let lead = lead::upsert_lead(db.pool(), customer_id, &update).await?;
        debug!(customer_id = %customer_id, messages = lead.messages_count, "Lead upserted");

        if lead.messages_count == 1 {
            info!(customer_id = %customer_id, "New lead");
            self.dispatcher
                .notify(
                    Alert::new(AlertKind::NewLead, customer_id)
                        .field_opt("Ім'я", lead.display_name.clone())
                        .field_opt("Телефон", update.phone.or_else(|| lead.phone.clone()))
                        .field("Повідомлення", preview),
                )
                .await;
        }

        Ok(lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier::MemoryNotifier;

    #[test]
    fn test_extract_phone_patterns() {
        assert_eq!(extract_phone("мій номер +380687034410").as_deref(), Some("+380687034410"));
        assert_eq!(extract_phone("380687034410 це я").as_deref(), Some("380687034410"));
        assert_eq!(extract_phone("тел 0687034410").as_deref(), Some("0687034410"));
        assert_eq!(extract_phone("call (068) 703 44 10").as_deref(), Some("(068) 703 44 10"));
        assert_eq!(extract_phone("сукня за 950 грн"), None);
        assert_eq!(extract_phone(""), None);
    }

    #[test]
    fn test_long_numbers_are_not_phones() {
        assert_eq!(extract_phone("Артикул 2024051512345, розмір M"), None);
        assert_eq!(extract_phone("замовлення 10687034410"), None);
        assert_eq!(
            extract_phone("+38 (068) 703-44-10").as_deref(),
            Some("+38 (068) 703-44-10")
        );
    }

    #[test]
    fn test_international_form_wins() {
        let text = "0671112233 або +380687034410";
        assert_eq!(extract_phone(text).as_deref(), Some("+380687034410"));
    }

    #[tokio::test]
    async fn test_new_lead_alert_only_once() {
        let db = Database::in_memory().await.unwrap();
        let memory = MemoryNotifier::new();
        let tracker = LeadTracker::new(Dispatcher::new(memory.clone()));

        let update = LeadUpdate {
            phone: Some("0687034410".into()),
            ..LeadUpdate::default()
        };
        let lead = tracker.upsert(&db, "maria", update, "Хочу сукню").await.unwrap();
        assert_eq!(lead.messages_count, 1);
        tracker
            .upsert(&db, "maria", LeadUpdate::default(), "Ще питання")
            .await
            .unwrap();

        let alerts = memory.of_kind(AlertKind::NewLead);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].get("Телефон"), Some("0687034410"));
        assert_eq!(alerts[0].get("Повідомлення"), Some("Хочу сукню"));
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_phone() {
        let db = Database::in_memory().await.unwrap();
        let tracker = LeadTracker::new(Dispatcher::new(MemoryNotifier::new()));

        tracker
            .upsert(
                &db,
                "maria",
                LeadUpdate {
                    phone: Some("+380687034410".into()),
                    ..LeadUpdate::default()
                },
                "",
            )
            .await
            .unwrap();
        let lead = tracker
            .upsert(
                &db,
                "maria",
                LeadUpdate {
                    city: Some("Київ".into()),
                    ..LeadUpdate::default()
                },
                "",
            )
            .await
            .unwrap();

        assert_eq!(lead.phone.as_deref(), Some("+380687034410"));
        assert_eq!(lead.city.as_deref(), Some("Київ"));
        assert_eq!(lead.messages_count, 2);
    }
}
