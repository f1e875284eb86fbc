/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! New Order Single construction.
//!
//! An [`OrderRequest`] is validated and turned into the body of a
//! NewOrderSingle (35=D). Header stamping (CompIDs, MsgSeqNum, SendingTime)
//! is left to the session.

use primefix_core::error::ValidationError;
use primefix_core::message::{Message, MsgType};
use primefix_core::tags;
use primefix_core::types::{OrdType, Side, TimeInForce};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Parameters of a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client order ID; generated at build time when `None`.
    pub cl_ord_id: Option<String>,
    /// Instrument, e.g. "ETH-USD".
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Limit or market.
    pub ord_type: OrdType,
    /// Order quantity in base units.
    pub quantity: Decimal,
    /// Limit price; required for limit orders.
    pub price: Option<Decimal>,
    /// Time in force; limit orders default to GTC, market orders are IOC.
    pub time_in_force: Option<TimeInForce>,
    /// Portfolio ID sent as Account (1).
    pub account: String,
}

impl OrderRequest {
    /// Creates a limit order request.
    #[must_use]
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        account: impl Into<String>,
    ) -> Self {
        Self {
            cl_ord_id: None,
            symbol: symbol.into(),
            side,
            ord_type: OrdType::Limit,
            quantity,
            price: Some(price),
            time_in_force: None,
            account: account.into(),
        }
    }

    /// Creates a market order request.
    #[must_use]
    pub fn market(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        account: impl Into<String>,
    ) -> Self {
        Self {
            cl_ord_id: None,
            symbol: symbol.into(),
            side,
            ord_type: OrdType::Market,
            quantity,
            price: None,
            time_in_force: None,
            account: account.into(),
        }
    }

    /// Sets an explicit client order ID.
    #[must_use]
    pub fn with_cl_ord_id(mut self, cl_ord_id: impl Into<String>) -> Self {
        self.cl_ord_id = Some(cl_ord_id.into());
        self
    }

    /// Overrides the time in force of a limit order.
    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = Some(tif);
        self
    }

    /// Checks the request without building anything.
    ///
    /// # Errors
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidQuantity {
                quantity: self.quantity.to_string(),
            });
        }
        if self.ord_type == OrdType::Limit {
            match self.price {
                None => return Err(ValidationError::MissingPrice),
                Some(price) if price < Decimal::ZERO => {
                    return Err(ValidationError::NegativePrice {
                        price: price.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Time in force that goes on the wire.
    #[must_use]
    pub fn effective_time_in_force(&self) -> TimeInForce {
        match self.ord_type {
            OrdType::Market => TimeInForce::ImmediateOrCancel,
            OrdType::Limit => self.time_in_force.unwrap_or(TimeInForce::GoodTillCancel),
        }
    }
}

/// Process-unique client order ID source.
///
/// The counter is seeded from the wall clock so IDs do not repeat across
/// restarts, and advanced atomically so clones of an `Arc` can share it.
#[derive(Debug)]
pub struct ClOrdIdGenerator {
    next: AtomicU64,
}

impl ClOrdIdGenerator {
    /// Creates a generator seeded from the current time in nanoseconds.
    #[must_use]
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(1);
        Self::starting_at(seed)
    }

    /// Creates a generator that starts at a fixed value.
    #[must_use]
    pub const fn starting_at(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// Returns the next ID.
    #[must_use]
    pub fn next_id(&self) -> String {
        let mut buf = itoa::Buffer::new();
        buf.format(self.next.fetch_add(1, Ordering::Relaxed))
            .to_string()
    }
}

impl Default for ClOrdIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a NewOrderSingle (35=D) for `request`.
///
/// # Errors
/// Returns a [`ValidationError`] if the request cannot be sent.
pub fn build_order(
    request: &OrderRequest,
    ids: &ClOrdIdGenerator,
) -> Result<Message, ValidationError> {
    request.validate()?;

    let cl_ord_id = match request.cl_ord_id {
        Some(ref id) if !id.is_empty() => id.clone(),
        _ => ids.next_id(),
    };

    let mut msg = Message::new("FIX.4.2", MsgType::NewOrderSingle);
    msg.set(tags::ACCOUNT, request.account.as_str());
    msg.set(tags::CL_ORD_ID, cl_ord_id);
    msg.set(tags::SYMBOL, request.symbol.as_str());
    msg.set(tags::SIDE, request.side);
    msg.set(tags::ORDER_QTY, request.quantity);
    msg.set(tags::ORD_TYPE, request.ord_type);
    msg.set(tags::TIME_IN_FORCE, request.effective_time_in_force());
    if let (OrdType::Limit, Some(price)) = (request.ord_type, request.price) {
        msg.set(tags::PRICE, price);
    }
    msg.set(tags::TARGET_STRATEGY, request.ord_type.target_strategy());
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn eth_limit() -> OrderRequest {
        OrderRequest::limit(
            "ETH-USD",
            Side::Buy,
            Decimal::new(15, 4),
            Decimal::from(1001),
            "portfolio-1",
        )
    }

    #[test]
    fn test_limit_order_body() {
        let ids = ClOrdIdGenerator::starting_at(100);
        let msg = build_order(&eth_limit(), &ids).unwrap();

        assert_eq!(msg.msg_type(), Some(MsgType::NewOrderSingle));
        assert_eq!(msg.get_str(tags::ACCOUNT), Some("portfolio-1"));
        assert_eq!(msg.get_str(tags::CL_ORD_ID), Some("100"));
        assert_eq!(msg.get_str(tags::SYMBOL), Some("ETH-USD"));
        assert_eq!(msg.get_str(tags::SIDE), Some("1"));
        assert_eq!(msg.get_str(tags::ORDER_QTY), Some("0.0015"));
        assert_eq!(msg.get_str(tags::ORD_TYPE), Some("2"));
        assert_eq!(msg.get_str(tags::TIME_IN_FORCE), Some("1"));
        assert_eq!(msg.get_str(tags::PRICE), Some("1001"));
        assert_eq!(msg.get_str(tags::TARGET_STRATEGY), Some("L"));
    }

    #[test]
    fn test_market_order_is_ioc_without_price() {
        let ids = ClOrdIdGenerator::new();
        let request = OrderRequest::market("BTC-USD", Side::Sell, Decimal::ONE, "p");
        let msg = build_order(&request, &ids).unwrap();

        assert_eq!(msg.get_str(tags::ORD_TYPE), Some("1"));
        assert_eq!(msg.get_str(tags::SIDE), Some("2"));
        assert_eq!(msg.get_str(tags::TIME_IN_FORCE), Some("3"));
        assert_eq!(msg.get_str(tags::TARGET_STRATEGY), Some("M"));
        assert!(msg.get_str(tags::PRICE).is_none());
    }

    #[test]
    fn test_explicit_cl_ord_id_and_time_in_force() {
        let ids = ClOrdIdGenerator::starting_at(1);
        let request = eth_limit()
            .with_cl_ord_id("my-order")
            .with_time_in_force(TimeInForce::FillOrKill);
        let msg = build_order(&request, &ids).unwrap();

        assert_eq!(msg.get_str(tags::CL_ORD_ID), Some("my-order"));
        assert_eq!(msg.get_str(tags::TIME_IN_FORCE), Some("4"));
        assert_eq!(ids.next_id(), "1");
    }

    #[test]
    fn test_validation_errors() {
        let ids = ClOrdIdGenerator::new();

        let mut request = eth_limit();
        request.quantity = Decimal::ZERO;
        assert_eq!(
            build_order(&request, &ids),
            Err(ValidationError::InvalidQuantity {
                quantity: "0".to_string()
            })
        );

        let mut request = eth_limit();
        request.price = None;
        assert_eq!(build_order(&request, &ids), Err(ValidationError::MissingPrice));

        let mut request = eth_limit();
        request.price = Some(Decimal::from(-1));
        assert!(matches!(
            build_order(&request, &ids),
            Err(ValidationError::NegativePrice { .. })
        ));

        let mut request = eth_limit();
        request.symbol = "  ".to_string();
        assert_eq!(build_order(&request, &ids), Err(ValidationError::EmptySymbol));
    }

    #[test]
    fn test_cl_ord_ids_unique_across_threads() {
        let ids = Arc::new(ClOrdIdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
