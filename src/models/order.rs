use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    DigitalPayment,
    Wallet,
    OfflinePayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Assigned,
    Handover,
    PickedUp,
    OutForDelivery,
    Delivered,
    Canceled,
    Failed,
}

impl OrderStatus {
    pub const ACTIVE: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::OutForDelivery,
    ];

    /// Statuses that count toward a courier's workload.
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub payment_method: PaymentMethod,
    pub order_amount: f64,
    pub status: OrderStatus,
    pub required_equipment: Option<String>,
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    /// Address payload as received from checkout; either a JSON object or a
    /// string holding one, with `latitude`/`longitude` as numbers or strings.
    pub delivery_address: Option<Value>,
    pub delivery_man_id: Option<Uuid>,
    pub reserved_delivery_man_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(payment_method: PaymentMethod, order_amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payment_method,
            order_amount,
            status: OrderStatus::Pending,
            required_equipment: None,
            zone: None,
            order_type: None,
            delivery_address: None,
            delivery_man_id: None,
            reserved_delivery_man_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        self.payment_method == PaymentMethod::CashOnDelivery
    }

    /// Whether this order names the courier as confirmed or reserved assignee.
    pub fn references(&self, courier_id: Uuid) -> bool {
        self.delivery_man_id == Some(courier_id)
            || self.reserved_delivery_man_id == Some(courier_id)
    }

    pub fn assignee_ids(&self) -> impl Iterator<Item = Uuid> {
        self.delivery_man_id
            .into_iter()
            .chain(self.reserved_delivery_man_id)
    }

    pub fn delivery_point(&self) -> Option<GeoPoint> {
        let address = match self.delivery_address.as_ref()? {
            Value::String(raw) => serde_json::from_str::<Value>(raw).ok()?,
            other => other.clone(),
        };

        let lat = coordinate(address.get("latitude")?)?;
        let lng = coordinate(address.get("longitude")?)?;
        let point = GeoPoint::new(lat, lng);

        point.is_usable().then_some(point)
    }
}

/// A partial order update. Assignee fields distinguish "absent" (leave as is)
/// from `null` (clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    #[serde(default, deserialize_with = "present")]
    pub delivery_man_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present")]
    pub reserved_delivery_man_id: Option<Option<Uuid>>,
    pub delivery_address: Option<Value>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.delivery_man_id.is_none()
            && self.reserved_delivery_man_id.is_none()
            && self.delivery_address.is_none()
    }

    pub fn apply(&self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(delivery_man_id) = self.delivery_man_id {
            order.delivery_man_id = delivery_man_id;
        }
        if let Some(reserved) = self.reserved_delivery_man_id {
            order.reserved_delivery_man_id = reserved;
        }
        if let Some(address) = &self.delivery_address {
            order.delivery_address = Some(address.clone());
        }
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}
