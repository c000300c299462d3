//! Scripted behavior-rule matching.

use catalog::BehaviorRule;

/// A rule that fired, with the trigger that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub rule: &'a BehaviorRule,
    pub trigger: &'a str,
}

/// First rule (in list order) with a trigger contained in the text.
///
/// Triggers within a rule are tried in order; matching is case-insensitive.
pub fn find_rule<'a>(text: &str, rules: &'a [BehaviorRule]) -> Option<RuleMatch<'a>> {
    let text = text.to_lowercase();
    rules.iter().find_map(|rule| {
        rule.triggers
            .iter()
            .find(|trigger| !trigger.is_empty() && text.contains(&trigger.to_lowercase()))
            .map(|trigger| RuleMatch {
                rule,
                trigger: trigger.as_str(),
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<BehaviorRule> {
        vec![
            BehaviorRule::new("Доставка", ["доставка", "нова пошта"], "Відправляємо щодня Новою Поштою."),
            BehaviorRule::new("Оплата", ["оплата", "накладений"], "Можлива оплата при отриманні."),
            BehaviorRule::new("Дубль", ["пошта"], "не має спрацювати першим"),
        ]
    }

    #[test]
    fn test_first_rule_wins() {
        let rules = rules();
        let hit = find_rule("А як оплата і доставка?", &rules).unwrap();
        assert_eq!(hit.rule.situation, "Доставка");
        assert_eq!(hit.trigger, "доставка");
    }

    #[test]
    fn test_case_insensitive() {
        let rules = rules();
        let hit = find_rule("Відправите НОВА ПОШТА?", &rules).unwrap();
        assert_eq!(hit.rule.response_text, "Відправляємо щодня Новою Поштою.");
        assert_eq!(hit.trigger, "нова пошта");
    }

    #[test]
    fn test_no_match() {
        assert!(find_rule("Яка тканина?", &rules()).is_none());
        assert!(find_rule("доставка", &[]).is_none());
    }
}
