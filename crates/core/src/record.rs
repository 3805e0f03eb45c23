// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entity records mirrored into the local replica.
//!
//! Records arrive as loosely-typed JSON from the remote service and are
//! decoded into these types before any write. Updates replace a record
//! whole; fields are never merged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The owning business scope that every query and subscription is filtered by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        TenantId(id.to_string())
    }
}

/// The entity types mirrored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Location,
    Order,
    Customer,
}

impl EntityKind {
    /// Returns the remote table name this kind is fed from.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Location => "locations",
            EntityKind::Order => "orders",
            EntityKind::Customer => "customers",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "locations" => Ok(EntityKind::Location),
            "orders" => Ok(EntityKind::Order),
            "customers" => Ok(EntityKind::Customer),
            _ => Err(Error::Decode(format!("unknown entity table: '{}'", s))),
        }
    }
}

/// Common surface of the mirrored record types.
///
/// `KIND` ties a record type to its remote table. `parent_refs` enumerates
/// foreign keys so a syncer can note references that do not resolve locally
/// yet; a dangling reference is tolerated and heals on a later sync.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The entity type this record mirrors.
    const KIND: EntityKind;

    /// The record's unique id within its entity type.
    fn id(&self) -> &str;

    /// Foreign keys to parent records, if any.
    fn parent_refs(&self) -> Vec<(EntityKind, &str)> {
        Vec::new()
    }
}

/// Decode a raw remote row into a typed record.
pub fn decode_record<R: Record>(value: serde_json::Value) -> Result<R> {
    serde_json::from_value(value).map_err(|e| Error::Decode(format!("{} row: {}", R::KIND, e)))
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Started but not yet placed.
    Draft,
    /// Placed and awaiting fulfillment.
    Open,
    /// Fulfilled.
    Completed,
    /// Abandoned or voided.
    Cancelled,
}

impl OrderStatus {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Open => "open",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(OrderStatus::Draft),
            "open" => Ok(OrderStatus::Open),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(Error::Decode(format!("invalid order status: '{}'", s))),
        }
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(Error::Decode(format!("invalid payment status: '{}'", s))),
        }
    }
}

/// A physical store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub active: bool,
}

impl Record for LocationRecord {
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> &str {
        &self.id
    }
}

/// One sellable line within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

/// A customer order, including its line items.
///
/// Line items are written remotely in a separate transaction from the order
/// row, so a freshly-inserted order may be visible before its items are.
/// The live-feed insert path waits a grace period before fetching for
/// exactly this reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: f64,
    pub tax_total: f64,
    pub total: f64,
    pub currency: String,
    #[serde(default)]
    pub shipping_name: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<OrderLineRecord>,
}

impl Record for OrderRecord {
    const KIND: EntityKind = EntityKind::Order;

    fn id(&self) -> &str {
        &self.id
    }

    fn parent_refs(&self) -> Vec<(EntityKind, &str)> {
        let mut refs = Vec::new();
        if let Some(ref id) = self.location_id {
            refs.push((EntityKind::Location, id.as_str()));
        }
        if let Some(ref id) = self.customer_id {
            refs.push((EntityKind::Customer, id.as_str()));
        }
        refs
    }
}

/// A customer profile with loyalty and spend aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub loyalty_points: i64,
    pub total_spent: f64,
    pub visit_count: u32,
}

impl Record for CustomerRecord {
    const KIND: EntityKind = EntityKind::Customer;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
