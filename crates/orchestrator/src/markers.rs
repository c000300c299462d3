//! Structured markers inside assistant replies.
//!
//! The assistant signals a confirmed order with a labelled block:
//!
//! ```text
//! [ORDER_CONFIRMED]
//! ПІБ: Марія Коваленко
//! Телефон: 0671234567
//! Місто: Київ
//! Відділення: 12
//! Товари:
//! Сукня М - 950 грн
//! Шарф - 300 грн
//! Сума: 1250 грн
//! Тип: допродаж
//! [/ORDER_CONFIRMED]
//! ```
//!
//! and an unanswerable question with a leading `[UNUSUAL]`. Marker lines
//! never reach the customer; the block's fields do.

use crate::order::parse::parse_amount;

pub const ORDER_START: &str = "[ORDER_CONFIRMED]";
pub const ORDER_END: &str = "[/ORDER_CONFIRMED]";
pub const UNUSUAL: &str = "[UNUSUAL]";

/// Order details confirmed by the customer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfirmedOrder {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub delivery_point: Option<String>,
    /// Free-text product list, one item per line.
    pub products: String,
    pub total_price: Option<f64>,
    pub is_upsell: bool,
}

/// An assistant reply split into customer-visible text and markers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedReply {
    pub text: String,
    pub order: Option<ConfirmedOrder>,
    pub unusual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FullName,
    Phone,
    City,
    DeliveryPoint,
    Products,
    Total,
    SaleType,
}

const LABELS: &[(&str, Field)] = &[
    ("піб", Field::FullName),
    ("фио", Field::FullName),
    ("full name", Field::FullName),
    ("name", Field::FullName),
    ("телефон", Field::Phone),
    ("phone", Field::Phone),
    ("місто", Field::City),
    ("город", Field::City),
    ("city", Field::City),
    ("відділення", Field::DeliveryPoint),
    ("отделение", Field::DeliveryPoint),
    ("branch", Field::DeliveryPoint),
    ("delivery point", Field::DeliveryPoint),
    ("товари", Field::Products),
    ("товары", Field::Products),
    ("products", Field::Products),
    ("сума", Field::Total),
    ("сумма", Field::Total),
    ("total", Field::Total),
    ("тип", Field::SaleType),
    ("type", Field::SaleType),
];

/// Split a raw assistant reply.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let unusual = raw.contains(UNUSUAL);
    let without_unusual = raw.replace(UNUSUAL, "");

    let mut visible = Vec::new();
    let mut block = Vec::new();
    let mut in_block = false;
    let mut saw_block = false;

    for line in without_unusual.lines() {
        let trimmed = line.trim();
        if trimmed == ORDER_START {
            in_block = true;
            saw_block = true;
            continue;
        }
        if trimmed == ORDER_END {
            in_block = false;
            continue;
        }
        if in_block {
            block.push(line);
        }
        visible.push(line);
    }

    let order = if saw_block {
        parse_order_block(&block)
    } else {
        None
    };

    ParsedReply {
        text: visible.join("\n").trim().to_string(),
        order,
        unusual,
    }
}

fn parse_order_block(lines: &[&str]) -> Option<ConfirmedOrder> {
    let mut order = ConfirmedOrder::default();
    let mut products = Vec::new();
    let mut current: Option<Field> = None;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match split_label(trimmed) {
            Some((field, value)) => {
                current = Some(field);
                let value = value.trim();
                match field {
                    Field::Products => {
                        if !value.is_empty() {
                            products.push(value.to_string());
                        }
                    }
                    Field::FullName => order.full_name = non_empty(value),
                    Field::Phone => order.phone = non_empty(value),
                    Field::City => order.city = non_empty(value),
                    Field::DeliveryPoint => order.delivery_point = non_empty(value),
                    Field::Total => order.total_price = parse_amount(value),
                    Field::SaleType => {
                        let value = value.to_lowercase();
                        order.is_upsell = value.contains("допродаж") || value.contains("upsell");
                    }
                }
            }
            None if current == Some(Field::Products) => products.push(trimmed.to_string()),
            None => {}
        }
    }

    if products.is_empty() {
        return None;
    }
    order.products = products.join("\n");
    Some(order)
}

fn split_label(line: &str) -> Option<(Field, &str)> {
    let (label, value) = line.split_once(':')?;
    let label = label
        .trim()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, field)| (*field, value))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
