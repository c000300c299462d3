//! Line item to CRM product (`pid`) and variant (`mid`) resolution.

use std::time::Duration;

use brain_core::{Brain, ChatTurn, GenerationRequest};
use crm_client::{CrmClient, CrmVariant};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Characters removed before names are compared.
const QUOTES_AND_BRACKETS: &[char] = &[
    '"', '\'', '«', '»', '„', '“', '”', '‘', '’', '`', '(', ')', '[', ']', '{', '}', '<', '>',
];

/// CRM product list page size.
const PRODUCT_PAGE_SIZE: u32 = 50;

/// Pages fetched before giving up on the CRM product list.
const MAX_PRODUCT_PAGES: u32 = 20;

/// Lowercase, drop quotes and brackets, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !QUOTES_AND_BRACKETS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact normalized match, then substring either way, in map order.
fn match_name(name: &str, candidates: &[(String, i64)]) -> Option<i64> {
    let name = normalize_name(name);
    if name.is_empty() {
        return None;
    }

    candidates
        .iter()
        .find(|(key, _)| *key == name)
        .or_else(|| {
            candidates.iter().find(|(key, _)| {
                !key.is_empty() && (name.contains(key.as_str()) || key.contains(name.as_str()))
            })
        })
        .map(|(_, pid)| *pid)
}

/// Resolves product names for one order push.
///
/// The CRM product list is fetched at most once per resolver.
pub struct PidResolver<'a> {
    known: Vec<(String, i64)>,
    crm: Option<&'a CrmClient>,
    crm_products: Option<Vec<(String, i64)>>,
}

impl<'a> PidResolver<'a> {
    pub fn new(product_ids: &IndexMap<String, i64>, crm: Option<&'a CrmClient>) -> Self {
        Self {
            known: product_ids
                .iter()
                .map(|(name, pid)| (normalize_name(name), *pid))
                .collect(),
            crm,
            crm_products: None,
        }
    }

    /// Look a name up in the configured map only.
    pub fn lookup_known(&self, name: &str) -> Option<i64> {
        match_name(name, &self.known)
    }

    /// Resolve a name: configured map first, then the CRM product list.
    pub async fn resolve(&mut self, name: &str) -> Option<i64> {
        if let Some(pid) = self.lookup_known(name) {
            debug!(name = %name, pid, "Resolved product from map");
            return Some(pid);
        }

        let crm_products = self.crm_products().await;
        let pid = match_name(name, crm_products);
        match pid {
            Some(pid) => debug!(name = %name, pid, "Resolved product from CRM list"),
            None => info!(name = %name, "No CRM product matched"),
        }
        pid
    }

    async fn crm_products(&mut self) -> &[(String, i64)] {
        if self.crm_products.is_none() {
            let mut products = Vec::new();
            if let Some(crm) = self.crm {
                for page in 0..MAX_PRODUCT_PAGES {
                    match crm.list_products(PRODUCT_PAGE_SIZE, page * PRODUCT_PAGE_SIZE).await {
                        Ok(batch) => {
                            let done = (batch.len() as u32) < PRODUCT_PAGE_SIZE;
                            products.extend(batch.into_iter().map(|p| (normalize_name(&p.name), p.id)));
                            if done {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("CRM product list unavailable: {}", e);
                            break;
                        }
                    }
                }
            }
            self.crm_products = Some(products);
        }
        self.crm_products.as_deref().unwrap_or(&[])
    }
}

/// How a variant was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantChoice {
    /// The product has exactly one variant.
    Single(i64),
    /// The generation API picked among several.
    Disambiguated(i64),
    /// Disambiguation failed; the first variant was used.
    FirstVariant(i64),
}

impl VariantChoice {
    pub fn mid(&self) -> i64 {
        match self {
            VariantChoice::Single(mid)
            | VariantChoice::Disambiguated(mid)
            | VariantChoice::FirstVariant(mid) => *mid,
        }
    }
}

const VARIANT_INSTRUCTION: &str = "You match order lines to product variants. \
Answer with the id of the single best-matching variant and nothing else.";

/// Prompt listing the variants of one product for an order line.
pub fn variant_prompt(order_line: &str, variants: &[CrmVariant]) -> GenerationRequest {
    let listing = variants
        .iter()
        .map(|v| format!("- {}", v.describe()))
        .collect::<Vec<_>>()
        .join("\n");
    let question = format!(
        "Order line: {}\nVariants:\n{}\nReply with the bare variant id only.",
        order_line, listing
    );

    GenerationRequest::new(VARIANT_INSTRUCTION)
        .with_turn(ChatTurn::user(question))
        .with_temperature(0.0)
        .with_max_tokens(16)
}

/// Pick the variant (`mid`) for an order line.
///
/// One variant is used directly. Several are disambiguated by the brain;
/// a failed call, a reply without digits, or an id not in the list falls
/// back to the first variant. `None` only when there are no variants.
pub async fn choose_variant(
    brain: Option<&dyn Brain>,
    order_line: &str,
    variants: &[CrmVariant],
    timeout: Duration,
) -> Option<VariantChoice> {
    let first = variants.first()?;
    if variants.len() == 1 {
        return Some(VariantChoice::Single(first.id));
    }

    let Some(brain) = brain else {
        return Some(VariantChoice::FirstVariant(first.id));
    };

    let request = variant_prompt(order_line, variants);
    let reply = match tokio::time::timeout(timeout, brain.generate(request)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            warn!(kind = %e.kind(), "Variant disambiguation failed: {}", e);
            return Some(VariantChoice::FirstVariant(first.id));
        }
        Err(_) => {
            warn!("Variant disambiguation timed out");
            return Some(VariantChoice::FirstVariant(first.id));
        }
    };

    let chosen = DIGITS
        .find(&reply)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .filter(|id| variants.iter().any(|v| v.id == *id));

    match chosen {
        Some(mid) => {
            debug!(order_line = %order_line, mid, "Variant disambiguated");
            Some(VariantChoice::Disambiguated(mid))
        }
        None => {
            warn!(reply = %reply.trim(), "Unusable variant reply, using first variant");
            Some(VariantChoice::FirstVariant(first.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::BrainError;
    use crm_client::CrmConfig;
    use mock_brain::ScriptedBrain;
    use mockito::{Matcher, Server};

    fn variants(ids: &[i64]) -> Vec<CrmVariant> {
        ids.iter()
            .zip(["S", "M", "L", "XL"])
            .map(|(id, size)| {
                let mut v = CrmVariant::new(*id);
                v.size = Some(size.to_string());
                v
            })
            .collect()
    }

    fn map() -> IndexMap<String, i64> {
        let mut map = IndexMap::new();
        map.insert("Сукня \"Лілія\"".to_string(), 10);
        map.insert("Шарф (Осінь)".to_string(), 20);
        map
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Сукня «Лілія»   (M) "), "сукня лілія m");
        assert_eq!(normalize_name("\"Шарф\"\t'Осінь'"), "шарф осінь");
    }

    #[test]
    fn test_known_map_exact_and_substring() {
        let resolver = PidResolver::new(&map(), None);
        assert_eq!(resolver.lookup_known("сукня лілія"), Some(10));
        assert_eq!(resolver.lookup_known("Сукня Лілія М"), Some(10));
        assert_eq!(resolver.lookup_known("шарф"), Some(20));
        assert_eq!(resolver.lookup_known("Пальто"), None);
        assert_eq!(resolver.lookup_known("  "), None);
    }

    #[tokio::test]
    async fn test_crm_list_fallback_fetched_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/products")
            .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
            .with_status(200)
            .with_body(r#"{"data": [{"id": 77, "name": "Пальто Зима"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let crm = CrmClient::new(CrmConfig::new(server.url(), "key")).unwrap();
        let mut resolver = PidResolver::new(&map(), Some(&crm));

        assert_eq!(resolver.resolve("Пальто Зима XL").await, Some(77));
        assert_eq!(resolver.resolve("Невідомий товар").await, None);
        assert_eq!(resolver.resolve("Сукня Лілія").await, Some(10));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_single_variant_skips_brain() {
        let brain = ScriptedBrain::new().with_reply("999");
        let choice = choose_variant(Some(&brain), "Сукня M", &variants(&[5]), Duration::from_secs(1)).await;

        assert_eq!(choice, Some(VariantChoice::Single(5)));
        assert_eq!(brain.call_count(), 0);
    }

    #[tokio::test]
    async fn test_brain_disambiguates() {
        let brain = ScriptedBrain::new().with_reply("Variant id: 102");
        let choice = choose_variant(
            Some(&brain),
            "Сукня Лілія L",
            &variants(&[101, 102, 103]),
            Duration::from_secs(1),
        )
        .await;

        assert_eq!(choice, Some(VariantChoice::Disambiguated(102)));
        let request = brain.last_request().unwrap();
        let prompt = &request.turns[0].text;
        assert!(prompt.contains("Сукня Лілія L"));
        assert!(prompt.contains("id=102; size=M"));
    }

    #[tokio::test]
    async fn test_fallbacks_to_first_variant() {
        let vs = variants(&[101, 102]);
        let timeout = Duration::from_secs(1);

        let unknown_id = ScriptedBrain::new().with_reply("555");
        assert_eq!(
            choose_variant(Some(&unknown_id), "x", &vs, timeout).await,
            Some(VariantChoice::FirstVariant(101))
        );

        let no_digits = ScriptedBrain::new().with_reply("не знаю");
        assert_eq!(
            choose_variant(Some(&no_digits), "x", &vs, timeout).await,
            Some(VariantChoice::FirstVariant(101))
        );

        let failing = ScriptedBrain::new().with_error(BrainError::Authentication("no key".into()));
        assert_eq!(
            choose_variant(Some(&failing), "x", &vs, timeout).await,
            Some(VariantChoice::FirstVariant(101))
        );

        assert_eq!(
            choose_variant(None, "x", &vs, timeout).await,
            Some(VariantChoice::FirstVariant(101))
        );
        assert_eq!(choose_variant(None, "x", &[], timeout).await, None);
    }
}
