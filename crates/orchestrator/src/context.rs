//! Context assembly for reply generation.

use brain_core::{ChatTurn, GenerationRequest, TurnRole};
use catalog::CatalogEntry;
use database::Message;

use crate::markers::{ORDER_END, ORDER_START, UNUSUAL};

/// Output contract appended to every system instruction.
pub fn output_contract() -> String {
    format!(
        "Коли клієнт підтвердив замовлення (є ПІБ, телефон, місто, відділення і товари), \
додай наприкінці відповіді блок:\n\
{start}\nПІБ: ...\nТелефон: ...\nМісто: ...\nВідділення: ...\nТовари:\n<назва> - <ціна> грн\nСума: ... грн\n\
Тип: допродаж (лише якщо це додаткове замовлення до вже оформленого)\n{end}\n\
Якщо на питання немає відповіді в даних про товари, почни відповідь з {unusual}.",
        start = ORDER_START,
        end = ORDER_END,
        unusual = UNUSUAL,
    )
}

/// Context gathered for one reply.
///
/// Product hits and the customer's name are folded into the system
/// instruction; history and the current turn become chat turns.
#[derive(Debug, Clone, Default)]
pub struct Context {
    products: Vec<CatalogEntry>,
    display_name: Option<String>,
}

impl Context {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add catalog hits for the current message.
    pub fn add_products(&mut self, products: impl IntoIterator<Item = CatalogEntry>) {
        self.products.extend(products);
    }

    pub fn set_display_name(&mut self, name: Option<&str>) {
        self.display_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
    }

    /// Check if any products were found.
    pub fn has_products(&self) -> bool {
        !self.products.is_empty()
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// System prompt, output contract, product context and customer name.
    pub fn system_instruction(&self, system_prompt: &str) -> String {
        let mut instruction = format!("{}\n\n{}", system_prompt.trim(), output_contract());

        if self.has_products() {
            instruction.push_str("\n\n[ТОВАРИ]\n");
            for product in &self.products {
                instruction.push_str("- ");
                instruction.push_str(&product.summary());
                instruction.push('\n');
            }
        }

        if let Some(name) = &self.display_name {
            instruction.push_str(&format!("\n\nІм'я клієнта: {}", name));
        }

        instruction
    }

    /// Build the generation request: history (chronological) then the current turn.
    pub fn into_request(
        self,
        system_prompt: &str,
        history: &[Message],
        current: ChatTurn,
    ) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.system_instruction(system_prompt));
        request.turns = history
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| match TurnRole::from_stored(&m.role) {
                TurnRole::Assistant => ChatTurn::assistant(m.content.clone()),
                TurnRole::User => ChatTurn::user(m.content.clone()),
            })
            .collect();
        request.turns.push(current);
        request
    }

    /// Format the context as a string for logging/debugging.
    pub fn format_summary(&self) -> String {
        if self.products.is_empty() {
            return "No product context".to_string();
        }
        let names: Vec<_> = self.products.iter().map(|p| p.name.as_str()).collect();
        format!("{} product(s): {}", self.products.len(), names.join(", "))
    }
}
