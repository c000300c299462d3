//! AI reply generation with a safe fallback.

use std::sync::Arc;
use std::time::Duration;

use brain_core::{Brain, BrainError, BrainErrorKind, ChatTurn, ImageInput};
use catalog::{CatalogEntry, CatalogProvider, LocalCatalog};
use database::Message;
use notifier::{Alert, AlertKind, Dispatcher};
use tracing::{debug, error, warn};

use crate::context::Context;

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Ai,
    /// Generation failed with this kind; the fallback text was used.
    Fallback(BrainErrorKind),
}

/// A reply ready for marker parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
    pub source: ReplySource,
}

/// What the generator needs to know about the current message.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub customer_id: &'a str,
    pub text: &'a str,
    pub image: Option<&'a ImageInput>,
    pub display_name: Option<&'a str>,
    /// Recent transcript, oldest first.
    pub history: &'a [Message],
}

/// Builds context and calls the brain.
pub struct ResponseGenerator {
    brain: Arc<dyn Brain>,
    catalog: Arc<dyn CatalogProvider>,
    local_products: Option<Arc<LocalCatalog>>,
    dispatcher: Dispatcher,
    system_prompt: String,
    fallback_reply: String,
    product_limit: usize,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(
        brain: Arc<dyn Brain>,
        catalog: Arc<dyn CatalogProvider>,
        dispatcher: Dispatcher,
        system_prompt: impl Into<String>,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            brain,
            catalog,
            local_products: None,
            dispatcher,
            system_prompt: system_prompt.into(),
            fallback_reply: fallback_reply.into(),
            product_limit: 5,
            timeout: Duration::from_secs(60),
        }
    }

    /// Local product store searched when the catalog is unreachable.
    pub fn with_local_products(mut self, local: Arc<LocalCatalog>) -> Self {
        self.local_products = Some(local);
        self
    }

    pub fn with_product_limit(mut self, limit: usize) -> Self {
        self.product_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fallback_reply(&self) -> &str {
        &self.fallback_reply
    }

    pub fn brain(&self) -> &Arc<dyn Brain> {
        &self.brain
    }

    /// Catalog hits for a query, from the local store if the catalog fails.
    pub async fn product_context(&self, query: &str) -> Vec<CatalogEntry> {
        match self.catalog.search_products(query, self.product_limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(catalog = self.catalog.name(), "Product search failed, using local store: {}", e);
                match &self.local_products {
                    Some(local) => local
                        .search_products(query, self.product_limit)
                        .await
                        .unwrap_or_default(),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Generate a reply. Never fails: errors yield the fallback text.
    pub async fn generate(&self, input: GenerationInput<'_>) -> GeneratedReply {
        let mut context = Context::new();
        context.add_products(self.product_context(input.text).await);
        context.set_display_name(input.display_name);
        debug!(customer_id = %input.customer_id, "Context: {}", context.format_summary());

        let current = match input.image {
            Some(image) => ChatTurn::user_with_image(input.text, image.clone()),
            None => ChatTurn::user(input.text),
        };
        let request = context.into_request(&self.system_prompt, input.history, current);

        let outcome = match tokio::time::timeout(self.timeout, self.brain.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(BrainError::Timeout),
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => GeneratedReply {
                text,
                source: ReplySource::Ai,
            },
            Ok(_) => self.fail(&input, BrainError::EmptyResponse).await,
            Err(e) => self.fail(&input, e).await,
        }
    }

    async fn fail(&self, input: &GenerationInput<'_>, e: BrainError) -> GeneratedReply {
        let kind = e.kind();
        error!(
            customer_id = %input.customer_id,
            brain = self.brain.name(),
            kind = %kind,
            "Generation failed: {}",
            e
        );

        self.dispatcher
            .notify(
                Alert::new(AlertKind::Error, input.customer_id)
                    .field("Етап", "генерація відповіді")
                    .field("Тип", kind.label())
                    .field("Деталі", e.to_string())
                    .field("Повідомлення", input.text),
            )
            .await;

        GeneratedReply {
            text: self.fallback_reply.clone(),
            source: ReplySource::Fallback(kind),
        }
    }
}
