//! Order records as persisted in the `orders` collection.
//!
//! Field names serialize in the camelCase wire form the storefront and
//! admin dashboard already read, so records written here are directly
//! consumable by the existing views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocator::OrderId;

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    /// Unit price in whole NT$.
    pub price: u64,
    pub quantity: u32,
}

impl OrderItem {
    pub fn line_total(&self) -> u64 {
        self.price * u64::from(self.quantity)
    }
}

/// A customer submission, before an identifier has been minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub note: String,
    pub items: Vec<OrderItem>,
}

impl OrderDraft {
    pub fn total_amount(&self) -> u64 {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Workflow status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    New,
    Processing,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// The persisted order record.
///
/// `id` is minted exactly once at creation and immutable thereafter; the
/// record is also keyed by it in the `orders` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub note: String,
    pub items: Vec<OrderItem>,
    pub total_amount: u64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds the record committed alongside the counter increment.
    pub(crate) fn from_draft(id: OrderId, draft: &OrderDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            note: draft.note.clone(),
            items: draft.items.clone(),
            total_amount: draft.total_amount(),
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Unpaid,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> OrderDraft {
        OrderDraft {
            name: "Chen".into(),
            phone: "0912345678".into(),
            note: String::new(),
            items: vec![
                OrderItem {
                    name: "Braised Pork".into(),
                    price: 780,
                    quantity: 2,
                },
                OrderItem {
                    name: "Chicken Soup".into(),
                    price: 980,
                    quantity: 1,
                },
            ],
        }
    }

    #[test]
    fn total_amount_sums_line_totals() {
        assert_eq!(sample_draft().total_amount(), 780 * 2 + 980);
    }

    #[test]
    fn new_order_starts_processing_and_unpaid() {
        let order = Order::from_draft(OrderId::new(1), &sample_draft(), Utc::now());
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.total_amount, 2540);
    }

    #[test]
    fn order_serializes_in_wire_form() {
        let order = Order::from_draft(OrderId::new(3), &sample_draft(), Utc::now());
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["id"], "A3");
        assert_eq!(value["status"], "processing");
        assert_eq!(value["paymentStatus"], "unpaid");
        assert_eq!(value["totalAmount"], 2540);
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn order_round_trips_through_json() {
        let order = Order::from_draft(OrderId::new(12), &sample_draft(), Utc::now());
        let value = serde_json::to_value(&order).unwrap();
        let back: Order = serde_json::from_value(value).unwrap();
        assert_eq!(back, order);
    }
}
