//! Confirmed-order handling: parsing, CRM id resolution and the CRM push.

pub mod parse;
pub mod pipeline;
pub mod resolve;

pub use parse::{backfill_prices, parse_amount, parse_lines, parse_products, LineItem};
pub use pipeline::{sale_comment, OrderPipeline, OrderPush, PushOutcome, ResolvedItem};
pub use resolve::{choose_variant, normalize_name, variant_prompt, PidResolver, VariantChoice};
