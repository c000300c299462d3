//! Per-message pipeline: dedup, escalation, rules, generation, persistence,
//! delivery, then lead and order side effects.

use std::sync::Arc;

use brain_core::Brain;
use catalog::{CatalogProvider, LocalCatalog, UnusualQuestion};
use database::{
    lead, message, order, order_status, Database, DatabaseError, LeadStatus, LeadUpdate, NewMessage,
    NewOrder,
};
use notifier::{Alert, AlertKind, Dispatcher};
use tracing::{debug, error, info, warn};

use crate::config::OrchestratorConfig;
use crate::dedup::{DedupKey, Deduplicator};
use crate::error::OrchestratorError;
use crate::escalation::EscalationClassifier;
use crate::leads::{extract_phone, LeadTracker};
use crate::markers::{parse_reply, ConfirmedOrder};
use crate::order::{OrderPipeline, OrderPush, PushOutcome};
use crate::responder::{GenerationInput, ReplySource, ResponseGenerator};
use crate::rules::find_rule;
use crate::source::{InboundEvent, MessageSource};

const ESCALATION_TEMPLATE: &str = "escalation";

/// Which stage produced the reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Escalation { phrase: String },
    Rule { situation: String },
    Ai,
    Fallback,
}

/// A handled message and its stored reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub question_id: i64,
    pub reply_id: i64,
    /// Text sent to the customer.
    pub reply: String,
    pub route: Route,
    /// Whether the transport accepted the reply.
    pub delivered: bool,
    /// Order row created from a confirmation in this reply.
    pub order_id: Option<i64>,
}

/// Terminal state of one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Already processed; nothing was stored or sent.
    Duplicate,
    Replied(Exchange),
}

impl ProcessOutcome {
    pub fn exchange(&self) -> Option<&Exchange> {
        match self {
            ProcessOutcome::Replied(exchange) => Some(exchange),
            ProcessOutcome::Duplicate => None,
        }
    }
}

/// Reply chosen for a message, before persistence.
struct Decision {
    reply: String,
    route: Route,
    order: Option<ConfirmedOrder>,
    unusual: bool,
}

/// Coordinates message processing for one storefront.
///
/// Messages are handled one at a time. The store's unique index on
/// `(customer_id, channel_timestamp)` makes persistence exactly-once; the
/// reply is sent only after the exchange is stored.
pub struct Orchestrator<S: MessageSource> {
    db: Database,
    config: OrchestratorConfig,
    classifier: EscalationClassifier,
    dedup: Deduplicator,
    catalog: Arc<dyn CatalogProvider>,
    responder: ResponseGenerator,
    leads: LeadTracker,
    pipeline: Option<OrderPipeline>,
    dispatcher: Dispatcher,
    source: S,
}

impl<S: MessageSource> Orchestrator<S> {
    pub fn new(
        config: OrchestratorConfig,
        db: Database,
        brain: Arc<dyn Brain>,
        catalog: Arc<dyn CatalogProvider>,
        dispatcher: Dispatcher,
        source: S,
    ) -> Self {
        let responder = ResponseGenerator::new(
            brain,
            catalog.clone(),
            dispatcher.clone(),
            config.system_prompt.clone(),
            config.fallback_reply.clone(),
        )
        .with_product_limit(config.product_context_limit)
        .with_timeout(config.generation_timeout);

        Self {
            classifier: EscalationClassifier::new(&config.escalation_phrases),
            dedup: Deduplicator::new(config.dedup_capacity),
            leads: LeadTracker::new(dispatcher.clone()),
            pipeline: None,
            responder,
            catalog,
            dispatcher,
            source,
            config,
            db,
        }
    }

    /// Enable CRM order push.
    pub fn with_order_pipeline(mut self, pipeline: OrderPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Local product store used when the catalog search fails.
    pub fn with_local_products(mut self, local: Arc<LocalCatalog>) -> Self {
        self.responder = self.responder.with_local_products(local);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn has_order_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Take one event from the source and handle it.
    pub async fn poll_once(&self) -> Result<Option<ProcessOutcome>, OrchestratorError> {
        match self.source.next_event().await? {
            Some(event) => self.handle_event(event).await.map(Some),
            None => Ok(None),
        }
    }

    /// Run one inbound event through the pipeline.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<ProcessOutcome, OrchestratorError> {
        let customer_id = event.customer_id.as_str();
        let key = DedupKey::new(customer_id, event.channel_timestamp.as_deref(), &event.text);

        if self.dedup.is_processed(&self.db, &key).await? {
            debug!(customer_id = %customer_id, "Skipping already processed message");
            return Ok(ProcessOutcome::Duplicate);
        }

        let text = event.rendered_text();
        info!(customer_id = %customer_id, kind = ?event.kind, "Processing message: {}", preview(&text));

        let decision = self.decide(&event, &text).await;

        let question = NewMessage {
            customer_id: event.customer_id.clone(),
            content: text.clone(),
            display_name: event.display_name.clone(),
            channel_timestamp: event.channel_timestamp.clone(),
        };
        let (question_id, reply_id) = match self.persist(&question, &decision.reply).await {
            Ok(ids) => ids,
            Err(OrchestratorError::DuplicateMessage { .. }) => {
                info!(customer_id = %customer_id, "Message stored concurrently, stopping");
                self.dedup.remember(key);
                return Ok(ProcessOutcome::Duplicate);
            }
            Err(e) => {
                error!(customer_id = %customer_id, "Failed to store exchange: {}", e);
                self.alert_error(customer_id, "збереження", &e.to_string()).await;
                self.deliver(customer_id, &decision.reply).await;
                return Err(e);
            }
        };
        self.dedup.remember(key);

        let delivered = self.deliver(customer_id, &decision.reply).await;

        if decision.unusual {
            self.log_unusual(customer_id, &text, &decision.reply).await;
        }

        let order_id = match &decision.order {
            Some(confirmed) => self.record_order(&event, confirmed, &text).await,
            None => None,
        };

        Ok(ProcessOutcome::Replied(Exchange {
            question_id,
            reply_id,
            reply: decision.reply,
            route: decision.route,
            delivered,
            order_id,
        }))
    }

    /// Re-run the CRM push for a stored order still in the `new` state.
    pub async fn retry_order_push(&self, order_id: i64) -> Result<PushOutcome, OrchestratorError> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or_else(|| OrchestratorError::DependencyUnavailable {
                dependency: "crm",
                reason: "CRM push is not configured".into(),
            })?;

        let stored = order::get_order(self.db.pool(), order_id).await?;
        if stored.status != order_status::NEW {
            return Err(OrchestratorError::AlreadyPushed {
                order_id,
                status: stored.status,
            });
        }

        info!(order_id, customer_id = %stored.customer_id, "Retrying CRM push");
        self.push_order(pipeline, order_id, &OrderPush::from(&stored)).await
    }

    /// Catalog template `escalation` wins over the configured acknowledgement.
    async fn escalation_reply(&self) -> String {
        match self.catalog.templates().await {
            Ok(templates) => templates
                .get(ESCALATION_TEMPLATE)
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| self.config.escalation_reply.clone()),
            Err(e) => {
                debug!(catalog = self.catalog.name(), "Templates unavailable: {}", e);
                self.config.escalation_reply.clone()
            }
        }
    }

    async fn decide(&self, event: &InboundEvent, text: &str) -> Decision {
        let customer_id = event.customer_id.as_str();

        if let Some(phrase) = self.classifier.classify(text) {
            info!(customer_id = %customer_id, phrase, "Escalating to a human");
            self.dispatcher
                .notify(
                    Alert::new(AlertKind::Escalation, customer_id)
                        .field_opt("Ім'я", event.display_name.clone())
                        .field("Причина", format!("фраза \"{}\"", phrase))
                        .field("Повідомлення", text),
                )
                .await;
            return Decision {
                reply: self.escalation_reply().await,
                route: Route::Escalation {
                    phrase: phrase.to_string(),
                },
                order: None,
                unusual: false,
            };
        }

        match self.catalog.behavior_rules().await {
            Ok(rules) => {
                if let Some(matched) = find_rule(text, &rules) {
                    info!(
                        customer_id = %customer_id,
                        situation = %matched.rule.situation,
                        trigger = matched.trigger,
                        "Behavior rule matched"
                    );
                    if matched.rule.escalates() {
                        self.dispatcher
                            .notify(
                                Alert::new(AlertKind::Escalation, customer_id)
                                    .field_opt("Ім'я", event.display_name.clone())
                                    .field("Причина", matched.rule.situation.clone())
                                    .field("Повідомлення", text),
                            )
                            .await;
                    }
                    return Decision {
                        reply: matched.rule.response_text.clone(),
                        route: Route::Rule {
                            situation: matched.rule.situation.clone(),
                        },
                        order: None,
                        unusual: false,
                    };
                }
            }
            Err(e) => warn!(catalog = self.catalog.name(), "Behavior rules unavailable: {}", e),
        }

        let history =
            match message::recent_messages(self.db.pool(), customer_id, self.config.history_limit).await {
                Ok(history) => history,
                Err(e) => {
                    warn!(customer_id = %customer_id, "History unavailable: {}", e);
                    Vec::new()
                }
            };

        let generated = self
            .responder
            .generate(GenerationInput {
                customer_id,
                text,
                image: event.media.as_ref(),
                display_name: event.display_name.as_deref(),
                history: &history,
            })
            .await;

        match generated.source {
            ReplySource::Ai => {
                let parsed = parse_reply(&generated.text);
                let reply = if parsed.text.is_empty() {
                    self.config.fallback_reply.clone()
                } else {
                    parsed.text
                };
                Decision {
                    reply,
                    route: Route::Ai,
                    order: parsed.order,
                    unusual: parsed.unusual,
                }
            }
            ReplySource::Fallback(_) => Decision {
                reply: generated.text,
                route: Route::Fallback,
                order: None,
                unusual: false,
            },
        }
    }

    async fn persist(&self, question: &NewMessage, reply: &str) -> Result<(i64, i64), OrchestratorError> {
        message::record_exchange(self.db.pool(), question, reply)
            .await
            .map_err(|e| match e {
                DatabaseError::AlreadyExists { .. } => OrchestratorError::DuplicateMessage {
                    customer_id: question.customer_id.clone(),
                },
                other => OrchestratorError::Database(other),
            })
    }

    async fn deliver(&self, customer_id: &str, reply: &str) -> bool {
        match self.source.send_text(customer_id, reply).await {
            Ok(()) => true,
            Err(e) => {
                error!(customer_id = %customer_id, "Failed to send reply: {}", e);
                self.alert_error(customer_id, "відправка", &e.to_string()).await;
                false
            }
        }
    }

    async fn log_unusual(&self, customer_id: &str, question: &str, reply: &str) {
        let unusual = UnusualQuestion {
            customer_id: customer_id.to_string(),
            question: question.to_string(),
            context: reply.to_string(),
        };
        if let Err(e) = self.catalog.log_unusual_question(unusual).await {
            warn!(customer_id = %customer_id, "Failed to log unusual question: {}", e);
        }
        self.dispatcher
            .notify(Alert::new(AlertKind::UnusualQuestion, customer_id).field("Питання", question))
            .await;
    }

    /// Upsert the lead, store the order and push it. Returns the order id.
    async fn record_order(&self, event: &InboundEvent, confirmed: &ConfirmedOrder, text: &str) -> Option<i64> {
        let customer_id = event.customer_id.as_str();
        let phone = confirmed.phone.clone().or_else(|| extract_phone(&event.text));

        let update = LeadUpdate {
            display_name: event.display_name.clone(),
            phone: phone.clone(),
            city: confirmed.city.clone(),
            delivery_address: confirmed.delivery_point.clone(),
            interested_products: Some(confirmed.products.clone()),
            status: Some(LeadStatus::Qualified),
            ..LeadUpdate::default()
        };
        if let Err(e) = self.leads.upsert(&self.db, customer_id, update, text).await {
            error!(customer_id = %customer_id, "Lead upsert failed, order not stored: {}", e);
            self.alert_error(customer_id, "збереження ліда", &e.to_string()).await;
            return None;
        }

        let new_order = NewOrder {
            customer_id: customer_id.to_string(),
            display_name: event.display_name.clone(),
            full_name: confirmed.full_name.clone(),
            phone,
            city: confirmed.city.clone(),
            delivery_point: confirmed.delivery_point.clone(),
            products: confirmed.products.clone(),
            total_price: confirmed.total_price,
            is_upsell: confirmed.is_upsell,
        };
        let order_id = match order::create_order(self.db.pool(), &new_order).await {
            Ok(id) => id,
            Err(e) => {
                error!(customer_id = %customer_id, "Failed to store order: {}", e);
                self.alert_error(customer_id, "збереження замовлення", &e.to_string()).await;
                return None;
            }
        };
        info!(customer_id = %customer_id, order_id, upsell = confirmed.is_upsell, "Order confirmed");

        self.dispatcher
            .notify(
                Alert::new(AlertKind::NewOrder, customer_id)
                    .field("Замовлення", format!("#{}", order_id))
                    .field_opt("ПІБ", confirmed.full_name.clone())
                    .field_opt("Телефон", new_order.phone.clone())
                    .field_opt("Місто", confirmed.city.clone())
                    .field_opt("Відділення", confirmed.delivery_point.clone())
                    .field("Товари", confirmed.products.clone())
                    .field_opt("Сума", confirmed.total_price.map(|t| format!("{} грн", t)))
                    .field_opt("Тип", confirmed.is_upsell.then_some("допродаж")),
            )
            .await;

        match &self.pipeline {
            Some(pipeline) => {
                let push = OrderPush::from(&new_order);
                // Failure is alerted inside; the row stays `new` for a retry.
                let _ = self.push_order(pipeline, order_id, &push).await;
            }
            None => debug!(order_id, "CRM push disabled"),
        }

        Some(order_id)
    }

    async fn push_order(
        &self,
        pipeline: &OrderPipeline,
        order_id: i64,
        push: &OrderPush,
    ) -> Result<PushOutcome, OrchestratorError> {
        match pipeline.push(push).await {
            Ok(outcome) => {
                order::update_order_status(self.db.pool(), order_id, order_status::SALED).await?;
                if let Err(e) =
                    lead::update_status(self.db.pool(), &push.customer_id, LeadStatus::Converted).await
                {
                    warn!(customer_id = %push.customer_id, "Failed to mark lead converted: {}", e);
                }
                info!(order_id, sale_id = outcome.sale_id, "Order marked as saled");
                Ok(outcome)
            }
            Err(e) => {
                error!(customer_id = %push.customer_id, order_id, "CRM push failed: {}", e);
                self.dispatcher
                    .notify(
                        Alert::new(AlertKind::Error, push.customer_id.clone())
                            .field("Етап", "CRM")
                            .field("Замовлення", format!("#{}", order_id))
                            .field("Деталі", e.to_string()),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn alert_error(&self, customer_id: &str, phase: &str, details: &str) {
        self.dispatcher
            .notify(
                Alert::new(AlertKind::Error, customer_id)
                    .field("Етап", phase)
                    .field("Деталі", details),
            )
            .await;
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(80).collect();
    if preview.len() < text.len() {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::{BehaviorRule, CatalogEntry};
    use mock_brain::ScriptedBrain;
    use notifier::MemoryNotifier;

    use crate::source::MemorySource;

    async fn orchestrator(brain: Arc<ScriptedBrain>, memory: &MemoryNotifier) -> Orchestrator<MemorySource> {
        let catalog = LocalCatalog::new(
            vec![CatalogEntry::new("Сукня Лілія", 950.0)],
            vec![BehaviorRule::new("Доставка", ["доставка"], "Доставляємо Новою Поштою.")],
        );
        Orchestrator::new(
            OrchestratorConfig::builder().build(),
            Database::in_memory().await.unwrap(),
            brain,
            Arc::new(catalog),
            Dispatcher::new(memory.clone()),
            MemorySource::new(),
        )
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("коротко"), "коротко");
        let long = "я".repeat(100);
        assert_eq!(preview(&long).chars().count(), 81);
    }

    #[tokio::test]
    async fn test_ai_route_sends_and_stores() {
        let brain = Arc::new(ScriptedBrain::new().with_reply("Вітаю! Чим допомогти?"));
        let memory = MemoryNotifier::new();
        let orch = orchestrator(brain.clone(), &memory).await;

        let outcome = orch
            .handle_event(InboundEvent::text("maria", "Привіт").with_timestamp("t1"))
            .await
            .unwrap();
        let exchange = outcome.exchange().unwrap();
        assert_eq!(exchange.route, Route::Ai);
        assert!(exchange.delivered);
        assert_eq!(
            orch.source().sent(),
            vec![("maria".to_string(), "Вітаю! Чим допомогти?".to_string())]
        );

        let stored = message::get_message(orch.database().pool(), exchange.question_id)
            .await
            .unwrap();
        assert_eq!(stored.answer_id, Some(exchange.reply_id));
    }

    #[tokio::test]
    async fn test_escalation_template_overrides_config() {
        let brain = Arc::new(ScriptedBrain::new());
        let memory = MemoryNotifier::new();
        let catalog = LocalCatalog::empty().with_templates(std::collections::HashMap::from([(
            "escalation".to_string(),
            "Зараз покличу менеджерку.".to_string(),
        )]));
        let orch = Orchestrator::new(
            OrchestratorConfig::builder().build(),
            Database::in_memory().await.unwrap(),
            brain.clone(),
            Arc::new(catalog),
            Dispatcher::new(memory.clone()),
            MemorySource::new(),
        );

        let outcome = orch
            .handle_event(InboundEvent::text("maria", "Покличте оператора"))
            .await
            .unwrap();
        let exchange = outcome.exchange().unwrap();
        assert_eq!(exchange.reply, "Зараз покличу менеджерку.");
        assert_eq!(
            exchange.route,
            Route::Escalation {
                phrase: "оператор".into()
            }
        );
        assert_eq!(brain.call_count(), 0);
        assert_eq!(memory.of_kind(AlertKind::Escalation).len(), 1);
    }

    #[tokio::test]
    async fn test_rule_with_escalate_action_notifies() {
        let brain = Arc::new(ScriptedBrain::new());
        let memory = MemoryNotifier::new();
        let catalog = LocalCatalog::new(
            vec![],
            vec![BehaviorRule::new("Скарга", ["брак"], "Передаю менеджеру.").with_action("escalate")],
        );
        let orch = Orchestrator::new(
            OrchestratorConfig::builder().escalation_phrases(["оператор"]).build(),
            Database::in_memory().await.unwrap(),
            brain.clone(),
            Arc::new(catalog),
            Dispatcher::new(memory.clone()),
            MemorySource::new(),
        );

        let outcome = orch
            .handle_event(InboundEvent::text("maria", "Сукня з браком"))
            .await
            .unwrap();
        assert_eq!(
            outcome.exchange().unwrap().route,
            Route::Rule {
                situation: "Скарга".into()
            }
        );
        assert_eq!(brain.call_count(), 0);
        let alerts = memory.of_kind(AlertKind::Escalation);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].get("Причина"), Some("Скарга"));
    }

    #[tokio::test]
    async fn test_send_failure_still_persists() {
        let brain = Arc::new(ScriptedBrain::new().with_reply("Так"));
        let memory = MemoryNotifier::new();
        let orch = Orchestrator::new(
            OrchestratorConfig::builder().build(),
            Database::in_memory().await.unwrap(),
            brain,
            Arc::new(LocalCatalog::empty()),
            Dispatcher::new(memory.clone()),
            MemorySource::failing_sends(),
        );

        let outcome = orch.handle_event(InboundEvent::text("maria", "Є?")).await.unwrap();
        assert!(!outcome.exchange().unwrap().delivered);
        assert_eq!(memory.of_kind(AlertKind::Error)[0].get("Етап"), Some("відправка"));
        let count = message::count_messages(orch.database().pool(), "maria", None)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_phone_outside_order_creates_no_lead() {
        let brain = Arc::new(ScriptedBrain::new().with_reply("Дякую!"));
        let memory = MemoryNotifier::new();
        let orch = orchestrator(brain, &memory).await;

        orch.handle_event(InboundEvent::text("maria", "Мій номер 0687034410"))
            .await
            .unwrap();

        assert!(matches!(
            lead::get_lead(orch.database().pool(), "maria").await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(memory.of_kind(AlertKind::NewLead).is_empty());
    }

    #[tokio::test]
    async fn test_order_phone_falls_back_to_message() {
        let brain = Arc::new(ScriptedBrain::new().with_reply(
            "Оформлено!\n[ORDER_CONFIRMED]\nПІБ: Марія Коваленко\nТовари:\nСукня Лілія - 950 грн\n[/ORDER_CONFIRMED]",
        ));
        let memory = MemoryNotifier::new();
        let orch = orchestrator(brain, &memory).await;

        let outcome = orch
            .handle_event(InboundEvent::text("maria", "Оформлюйте, мій номер 0687034410"))
            .await
            .unwrap();
        let order_id = outcome.exchange().unwrap().order_id.unwrap();

        let stored = lead::get_lead(orch.database().pool(), "maria").await.unwrap();
        assert_eq!(stored.phone.as_deref(), Some("0687034410"));
        assert_eq!(stored.messages_count, 1);
        let placed = order::get_order(orch.database().pool(), order_id).await.unwrap();
        assert_eq!(placed.phone.as_deref(), Some("0687034410"));
        assert_eq!(memory.of_kind(AlertKind::NewLead).len(), 1);
        assert_eq!(
            memory.of_kind(AlertKind::NewOrder)[0].get("Телефон"),
            Some("0687034410")
        );
    }

    #[tokio::test]
    async fn test_unusual_marker_is_logged() {
        let brain = Arc::new(ScriptedBrain::new().with_reply("[UNUSUAL] Уточню у колег."));
        let memory = MemoryNotifier::new();
        let catalog = Arc::new(LocalCatalog::empty());
        let orch = Orchestrator::new(
            OrchestratorConfig::builder().build(),
            Database::in_memory().await.unwrap(),
            brain,
            catalog.clone(),
            Dispatcher::new(memory.clone()),
            MemorySource::new(),
        );

        let outcome = orch
            .handle_event(InboundEvent::text("maria", "Чи можна прати в машинці?"))
            .await
            .unwrap();
        assert_eq!(outcome.exchange().unwrap().reply, "Уточню у колег.");
        assert_eq!(catalog.unusual_questions().len(), 1);
        assert_eq!(memory.of_kind(AlertKind::UnusualQuestion).len(), 1);
    }

    #[tokio::test]
    async fn test_retry_without_pipeline_is_unavailable() {
        let memory = MemoryNotifier::new();
        let orch = orchestrator(Arc::new(ScriptedBrain::new()), &memory).await;
        let result = orch.retry_order_push(1).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::DependencyUnavailable { dependency: "crm", .. })
        ));
    }
}
