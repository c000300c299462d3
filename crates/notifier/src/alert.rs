//! Templated operator alerts.

use serde::{Deserialize, Serialize};

/// Longest field value rendered into an alert.
const FIELD_PREVIEW_CHARS: usize = 300;

/// What the operator is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Escalation,
    NewLead,
    NewOrder,
    Error,
    UnusualQuestion,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Escalation => "escalation",
            AlertKind::NewLead => "new_lead",
            AlertKind::NewOrder => "new_order",
            AlertKind::Error => "error",
            AlertKind::UnusualQuestion => "unusual_question",
        }
    }

    /// Alert headline.
    pub fn title(&self) -> &'static str {
        match self {
            AlertKind::Escalation => "🚨 Потрібен менеджер",
            AlertKind::NewLead => "🆕 Новий лід",
            AlertKind::NewOrder => "🛒 Нове замовлення",
            AlertKind::Error => "⚠️ Помилка",
            AlertKind::UnusualQuestion => "❓ Нестандартне питання",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert about one customer, with labelled fields in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub customer_id: String,
    pub fields: Vec<(String, String)>,
}

impl Alert {
    pub fn new(kind: AlertKind, customer_id: impl Into<String>) -> Self {
        Self {
            kind,
            customer_id: customer_id.into(),
            fields: Vec::new(),
        }
    }

    /// Add a labelled field. Empty values are skipped.
    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.push((label.into(), value));
        }
        self
    }

    /// Add a field only when a value is present.
    pub fn field_opt(self, label: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.field(label, value),
            None => self,
        }
    }

    /// Value of the first field with this label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Plain-text message body.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n👤 Клієнт: {}", self.kind.title(), self.customer_id);
        for (label, value) in &self.fields {
            out.push('\n');
            out.push_str(label);
            out.push_str(": ");
            out.push_str(&preview(value));
        }
        out
    }
}

fn preview(value: &str) -> String {
    if value.chars().count() <= FIELD_PREVIEW_CHARS {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(FIELD_PREVIEW_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escalation() {
        let alert = Alert::new(AlertKind::Escalation, "maria")
            .field("Причина", "менеджер")
            .field("Повідомлення", "хочу поговорити з менеджером")
            .field("Порожнє", "  ");

        assert_eq!(
            alert.render(),
            "🚨 Потрібен менеджер\n👤 Клієнт: maria\nПричина: менеджер\nПовідомлення: хочу поговорити з менеджером"
        );
        assert_eq!(alert.get("Причина"), Some("менеджер"));
        assert_eq!(alert.fields.len(), 2);
    }

    #[test]
    fn test_long_values_truncated() {
        let alert = Alert::new(AlertKind::Error, "x").field("Деталі", "я".repeat(1000));
        let rendered = alert.render();
        assert!(rendered.ends_with('…'));
        assert!(rendered.chars().count() < 400);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(AlertKind::UnusualQuestion.as_str(), "unusual_question");
        assert_eq!(AlertKind::NewLead.to_string(), "new_lead");
        let alert = Alert::new(AlertKind::NewLead, "a").field_opt("Телефон", None::<String>);
        assert!(alert.fields.is_empty());
    }
}
