//! Pushing a confirmed order into the CRM.

use std::sync::Arc;
use std::time::Duration;

use brain_core::Brain;
use crm_client::{CrmClient, NewClient, NewSale, SaleItem};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{OrchestratorError, PushStage};
use crate::order::parse::{parse_products, round_cents, LineItem};
use crate::order::resolve::{choose_variant, PidResolver, VariantChoice};

/// Order data the push needs, from a fresh confirmation or a stored row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderPush {
    pub customer_id: String,
    pub display_name: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub delivery_point: Option<String>,
    pub products: String,
    pub total_price: Option<f64>,
    pub is_upsell: bool,
}

impl From<&database::NewOrder> for OrderPush {
    fn from(order: &database::NewOrder) -> Self {
        Self {
            customer_id: order.customer_id.clone(),
            display_name: order.display_name.clone(),
            full_name: order.full_name.clone(),
            phone: order.phone.clone(),
            city: order.city.clone(),
            delivery_point: order.delivery_point.clone(),
            products: order.products.clone(),
            total_price: order.total_price,
            is_upsell: order.is_upsell,
        }
    }
}

impl From<&database::Order> for OrderPush {
    fn from(order: &database::Order) -> Self {
        Self {
            customer_id: order.customer_id.clone(),
            display_name: order.display_name.clone(),
            full_name: order.full_name.clone(),
            phone: order.phone.clone(),
            city: order.city.clone(),
            delivery_point: order.delivery_point.clone(),
            products: order.products.clone(),
            total_price: order.total_price,
            is_upsell: order.is_upsell,
        }
    }
}

/// A line item with whatever CRM ids could be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub item: LineItem,
    pub pid: Option<i64>,
    pub variant: Option<VariantChoice>,
}

impl ResolvedItem {
    pub fn to_sale_item(&self) -> SaleItem {
        SaleItem {
            pid: self.pid,
            mid: self.variant.map(|v| v.mid()),
            ..SaleItem::new(self.item.name.clone(), self.item.price)
        }
    }
}

/// Result of a successful push.
#[derive(Debug, Clone, PartialEq)]
pub struct PushOutcome {
    pub client_id: i64,
    pub sale_id: i64,
    pub items: Vec<ResolvedItem>,
    pub amount: f64,
}

/// Parses, resolves and submits confirmed orders.
pub struct OrderPipeline {
    crm: CrmClient,
    brain: Option<Arc<dyn Brain>>,
    product_ids: IndexMap<String, i64>,
    timeout: Duration,
}

impl OrderPipeline {
    pub fn new(crm: CrmClient, product_ids: IndexMap<String, i64>) -> Self {
        Self {
            crm,
            brain: None,
            product_ids,
            timeout: Duration::from_secs(30),
        }
    }

    /// Use a brain to disambiguate between variants.
    pub fn with_brain(mut self, brain: Arc<dyn Brain>) -> Self {
        self.brain = Some(brain);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn crm(&self) -> &CrmClient {
        &self.crm
    }

    /// Parse the product list and resolve `pid`/`mid` for every line.
    pub async fn resolve_items(&self, products: &str, total: Option<f64>) -> Vec<ResolvedItem> {
        let mut resolver = PidResolver::new(&self.product_ids, Some(&self.crm));
        let mut resolved = Vec::new();

        for item in parse_products(products, total) {
            let pid = resolver.resolve(&item.name).await;
            let variant = match pid {
                Some(pid) => match self.crm.product_variants(pid).await {
                    Ok(variants) => {
                        choose_variant(self.brain.as_deref(), &item.source_line, &variants, self.timeout)
                            .await
                    }
                    Err(e) => {
                        warn!(pid, "Variant lookup failed: {}", e);
                        None
                    }
                },
                None => None,
            };
            resolved.push(ResolvedItem { item, pid, variant });
        }

        resolved
    }

    /// Create the client, then the sale.
    ///
    /// Nothing is rolled back on failure; the push can be retried.
    pub async fn push(&self, order: &OrderPush) -> Result<PushOutcome, OrchestratorError> {
        let items = self.resolve_items(&order.products, order.total_price).await;

        let client = NewClient {
            full_name: order
                .full_name
                .clone()
                .or_else(|| order.display_name.clone())
                .unwrap_or_else(|| order.customer_id.clone()),
            phone: order.phone.clone().unwrap_or_default(),
            username: order.customer_id.clone(),
        };
        let client_id = self
            .crm
            .create_client(&client)
            .await
            .map_err(|e| OrchestratorError::CrmPushFailed {
                stage: PushStage::Client,
                reason: e.to_string(),
            })?;

        let amount = order
            .total_price
            .unwrap_or_else(|| round_cents(items.iter().map(|i| i.item.price).sum()));
        let sale = NewSale {
            client_id,
            source_id: None,
            products: items.iter().map(ResolvedItem::to_sale_item).collect(),
            amount,
            net_amount: amount,
            comment: sale_comment(order),
        };
        let sale_id = self
            .crm
            .create_sale(&sale)
            .await
            .map_err(|e| OrchestratorError::CrmPushFailed {
                stage: PushStage::Sale,
                reason: e.to_string(),
            })?;

        info!(
            customer_id = %order.customer_id,
            client_id,
            sale_id,
            items = items.len(),
            "Order pushed to CRM"
        );

        Ok(PushOutcome {
            client_id,
            sale_id,
            items,
            amount,
        })
    }
}

/// Sale comment: sale type, product list, delivery address.
pub fn sale_comment(order: &OrderPush) -> String {
    let sale_type = if order.is_upsell {
        "🔁 ДОПРОДАЖ"
    } else {
        "🆕 Новий продаж"
    };
    format!(
        "{}\n{}\n{} | {} відд. {}",
        sale_type,
        order.products.trim(),
        order.full_name.as_deref().unwrap_or("-"),
        order.city.as_deref().unwrap_or("-"),
        order.delivery_point.as_deref().unwrap_or("-"),
    )
}
