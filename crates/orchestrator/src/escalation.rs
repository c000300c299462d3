//! Detection of messages that need a human operator.

/// Case-insensitive substring classifier over a fixed phrase list.
#[derive(Debug, Clone)]
pub struct EscalationClassifier {
    phrases: Vec<String>,
}

impl EscalationClassifier {
    pub fn new(phrases: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// The first configured phrase contained in the text, if any.
    pub fn classify(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| text.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ESCALATION_PHRASES;

    fn classifier() -> EscalationClassifier {
        EscalationClassifier::new(DEFAULT_ESCALATION_PHRASES.iter())
    }

    #[test]
    fn test_manager_request() {
        assert_eq!(
            classifier().classify("хочу поговорити з менеджером"),
            Some("менеджер")
        );
    }

    #[test]
    fn test_case_insensitive_across_languages() {
        assert_eq!(classifier().classify("Это МОШЕННИК!"), Some("мошенник"));
        assert_eq!(classifier().classify("Can I talk to a Human?"), Some("human"));
    }

    #[test]
    fn test_first_configured_phrase_wins() {
        let classifier = EscalationClassifier::new(["скарга", "менеджер"]);
        assert_eq!(classifier.classify("менеджер, у мене скарга"), Some("скарга"));
    }

    #[test]
    fn test_ordinary_message() {
        assert_eq!(classifier().classify("Є сукня розміру M?"), None);
        assert_eq!(EscalationClassifier::new(Vec::<String>::new()).classify("менеджер"), None);
    }
}
