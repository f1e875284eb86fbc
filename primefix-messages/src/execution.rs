/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Execution Report (35=8) parsing.

use primefix_core::error::ParseError;
use primefix_core::field::Field;
use primefix_core::message::{Message, MsgType};
use primefix_core::tags;
use primefix_core::types::{ExecType, OrdStatus, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Typed view of an inbound Execution Report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// ExecType (150).
    pub exec_type: ExecType,
    /// OrderID (37), assigned by the venue.
    pub order_id: String,
    /// ClOrdID (11).
    pub cl_ord_id: String,
    /// Side (54).
    pub side: Side,
    /// OrderQty (38).
    pub order_qty: Decimal,
    /// ExecID (17).
    pub exec_id: Option<String>,
    /// OrdStatus (39).
    pub ord_status: Option<OrdStatus>,
    /// Symbol (55).
    pub symbol: Option<String>,
    /// Price (44).
    pub price: Option<Decimal>,
    /// LastPx (31).
    pub last_px: Option<Decimal>,
    /// LastShares (32).
    pub last_qty: Option<Decimal>,
    /// CumQty (14).
    pub cum_qty: Option<Decimal>,
    /// LeavesQty (151).
    pub leaves_qty: Option<Decimal>,
    /// AvgPx (6).
    pub avg_px: Option<Decimal>,
    /// Text (58), usually the reject reason.
    pub text: Option<String>,
    /// OrdRejReason (103).
    pub ord_rej_reason: Option<u32>,
}

impl ExecutionReport {
    /// Returns true if this report carries a fill.
    #[must_use]
    pub const fn is_fill(&self) -> bool {
        self.exec_type.is_fill()
    }

    /// Returns true if the order was rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.exec_type == ExecType::Rejected
    }
}

/// Parses an Execution Report.
///
/// # Errors
/// Returns `ParseError::UnexpectedMsgType` for anything but 35=8,
/// `ParseError::MissingField` when a required tag is absent and
/// `ParseError::InvalidValue` when a value does not parse.
pub fn parse_execution_report(msg: &Message) -> Result<ExecutionReport, ParseError> {
    match msg.msg_type() {
        Some(MsgType::ExecutionReport) => {}
        other => {
            return Err(ParseError::UnexpectedMsgType {
                expected: MsgType::ExecutionReport.as_str().to_string(),
                actual: other.map(|t| t.as_str().to_string()).unwrap_or_default(),
            });
        }
    }

    let exec_type = char_enum(required(msg, tags::EXEC_TYPE)?, ExecType::from_char)?;
    let order_id = required(msg, tags::ORDER_ID)?.as_str().to_string();
    let cl_ord_id = required(msg, tags::CL_ORD_ID)?.as_str().to_string();
    let side = char_enum(required(msg, tags::SIDE)?, Side::from_char)?;
    let order_qty = required(msg, tags::ORDER_QTY)?.as_decimal()?;

    Ok(ExecutionReport {
        exec_type,
        order_id,
        cl_ord_id,
        side,
        order_qty,
        exec_id: text(msg, tags::EXEC_ID),
        ord_status: msg
            .body
            .get(tags::ORD_STATUS)
            .map(|f| char_enum(f, OrdStatus::from_char))
            .transpose()?,
        symbol: text(msg, tags::SYMBOL),
        price: decimal(msg, tags::PRICE)?,
        last_px: decimal(msg, tags::LAST_PX)?,
        last_qty: decimal(msg, tags::LAST_QTY)?,
        cum_qty: decimal(msg, tags::CUM_QTY)?,
        leaves_qty: decimal(msg, tags::LEAVES_QTY)?,
        avg_px: decimal(msg, tags::AVG_PX)?,
        text: text(msg, tags::TEXT),
        ord_rej_reason: msg
            .body
            .get(tags::ORD_REJ_REASON)
            .map(Field::parse::<u32>)
            .transpose()?,
    })
}

fn required(msg: &Message, tag: u32) -> Result<&Field, ParseError> {
    msg.body.get(tag).ok_or(ParseError::MissingField { tag })
}

fn text(msg: &Message, tag: u32) -> Option<String> {
    msg.body.get_str(tag).map(str::to_string)
}

fn decimal(msg: &Message, tag: u32) -> Result<Option<Decimal>, ParseError> {
    msg.body.get(tag).map(Field::as_decimal).transpose()
}

fn char_enum<T>(field: &Field, from_char: fn(char) -> Option<T>) -> Result<T, ParseError> {
    let c = field.as_char()?;
    from_char(c).ok_or_else(|| ParseError::InvalidValue {
        tag: field.tag,
        reason: format!("unknown code '{c}'"),
    })
}
