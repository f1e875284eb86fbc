/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tag numbers used by the client and the catalog strict decoding checks
//! against.
//!
//! Tags are plain `u32` constants rather than an enum so they can be used
//! directly with the codec and message accessors.

/// Account (portfolio ID on the venue).
pub const ACCOUNT: u32 = 1;
/// Average fill price.
pub const AVG_PX: u32 = 6;
/// First sequence number of a resend range.
pub const BEGIN_SEQ_NO: u32 = 7;
/// Protocol version.
pub const BEGIN_STRING: u32 = 8;
/// Body length, computed by the encoder.
pub const BODY_LENGTH: u32 = 9;
/// Checksum, computed by the encoder.
pub const CHECK_SUM: u32 = 10;
/// Client order ID.
pub const CL_ORD_ID: u32 = 11;
/// Cumulative filled quantity.
pub const CUM_QTY: u32 = 14;
/// Last sequence number of a resend range (0 = infinity).
pub const END_SEQ_NO: u32 = 16;
/// Execution ID.
pub const EXEC_ID: u32 = 17;
/// Last fill price.
pub const LAST_PX: u32 = 31;
/// Last fill quantity.
pub const LAST_QTY: u32 = 32;
/// Message sequence number.
pub const MSG_SEQ_NUM: u32 = 34;
/// Message type.
pub const MSG_TYPE: u32 = 35;
/// New sequence number in a SequenceReset.
pub const NEW_SEQ_NO: u32 = 36;
/// Venue order ID.
pub const ORDER_ID: u32 = 37;
/// Order quantity.
pub const ORDER_QTY: u32 = 38;
/// Order status.
pub const ORD_STATUS: u32 = 39;
/// Order type.
pub const ORD_TYPE: u32 = 40;
/// Possible duplicate flag.
pub const POSS_DUP_FLAG: u32 = 43;
/// Limit price.
pub const PRICE: u32 = 44;
/// Referenced sequence number (Reject).
pub const REF_SEQ_NUM: u32 = 45;
/// Sender company ID.
pub const SENDER_COMP_ID: u32 = 49;
/// Sender sub ID.
pub const SENDER_SUB_ID: u32 = 50;
/// Sending time.
pub const SENDING_TIME: u32 = 52;
/// Side.
pub const SIDE: u32 = 54;
/// Symbol.
pub const SYMBOL: u32 = 55;
/// Target company ID.
pub const TARGET_COMP_ID: u32 = 56;
/// Target sub ID.
pub const TARGET_SUB_ID: u32 = 57;
/// Free text.
pub const TEXT: u32 = 58;
/// Time in force.
pub const TIME_IN_FORCE: u32 = 59;
/// Transaction time.
pub const TRANSACT_TIME: u32 = 60;
/// Signature length.
pub const SIGNATURE_LENGTH: u32 = 93;
/// Signature.
pub const SIGNATURE: u32 = 89;
/// Raw data; carries the logon signature on the venue.
pub const RAW_DATA: u32 = 96;
/// Possible resend flag.
pub const POSS_RESEND: u32 = 97;
/// Encryption method.
pub const ENCRYPT_METHOD: u32 = 98;
/// Order reject reason.
pub const ORD_REJ_REASON: u32 = 103;
/// Heartbeat interval in seconds.
pub const HEART_BT_INT: u32 = 108;
/// Test request ID.
pub const TEST_REQ_ID: u32 = 112;
/// On-behalf-of company ID.
pub const ON_BEHALF_OF_COMP_ID: u32 = 115;
/// Original sending time of a resent message.
pub const ORIG_SENDING_TIME: u32 = 122;
/// Gap fill flag in a SequenceReset.
pub const GAP_FILL_FLAG: u32 = 123;
/// Deliver-to company ID.
pub const DELIVER_TO_COMP_ID: u32 = 128;
/// Reset sequence numbers on logon.
pub const RESET_SEQ_NUM_FLAG: u32 = 141;
/// Execution type.
pub const EXEC_TYPE: u32 = 150;
/// Remaining quantity.
pub const LEAVES_QTY: u32 = 151;
/// Referenced tag (Reject).
pub const REF_TAG_ID: u32 = 371;
/// Referenced message type (Reject).
pub const REF_MSG_TYPE: u32 = 372;
/// Session reject reason.
pub const SESSION_REJECT_REASON: u32 = 373;
/// Password; carries the passphrase on the venue.
pub const PASSWORD: u32 = 554;
/// Target strategy (L = limit, M = market on the venue).
pub const TARGET_STRATEGY: u32 = 847;
/// Drop copy flag (venue-specific).
pub const DROP_COPY_FLAG: u32 = 9406;
/// Access key (venue-specific).
pub const ACCESS_KEY: u32 = 9407;

/// Tags that belong to the standard header.
pub const HEADER_TAGS: &[u32] = &[
    BEGIN_STRING,
    BODY_LENGTH,
    MSG_TYPE,
    SENDER_COMP_ID,
    TARGET_COMP_ID,
    ON_BEHALF_OF_COMP_ID,
    DELIVER_TO_COMP_ID,
    MSG_SEQ_NUM,
    SENDER_SUB_ID,
    TARGET_SUB_ID,
    POSS_DUP_FLAG,
    POSS_RESEND,
    SENDING_TIME,
    ORIG_SENDING_TIME,
];

/// Tags that belong to the standard trailer.
pub const TRAILER_TAGS: &[u32] = &[SIGNATURE_LENGTH, SIGNATURE, CHECK_SUM];

/// Body tags the client understands.
const BODY_TAGS: &[u32] = &[
    ACCOUNT,
    AVG_PX,
    BEGIN_SEQ_NO,
    CL_ORD_ID,
    CUM_QTY,
    END_SEQ_NO,
    EXEC_ID,
    LAST_PX,
    LAST_QTY,
    NEW_SEQ_NO,
    ORDER_ID,
    ORDER_QTY,
    ORD_STATUS,
    ORD_TYPE,
    PRICE,
    REF_SEQ_NUM,
    SIDE,
    SYMBOL,
    TEXT,
    TIME_IN_FORCE,
    TRANSACT_TIME,
    RAW_DATA,
    ENCRYPT_METHOD,
    ORD_REJ_REASON,
    HEART_BT_INT,
    TEST_REQ_ID,
    GAP_FILL_FLAG,
    RESET_SEQ_NUM_FLAG,
    EXEC_TYPE,
    LEAVES_QTY,
    REF_TAG_ID,
    REF_MSG_TYPE,
    SESSION_REJECT_REASON,
    PASSWORD,
    TARGET_STRATEGY,
    DROP_COPY_FLAG,
    ACCESS_KEY,
];

/// Tags whose values must never reach a log line.
pub const SENSITIVE_TAGS: &[u32] = &[RAW_DATA, PASSWORD, ACCESS_KEY];

/// Returns true if the tag belongs to the standard header.
#[inline]
#[must_use]
pub fn is_header(tag: u32) -> bool {
    HEADER_TAGS.contains(&tag)
}

/// Returns true if the tag belongs to the standard trailer.
#[inline]
#[must_use]
pub fn is_trailer(tag: u32) -> bool {
    TRAILER_TAGS.contains(&tag)
}

/// Returns true if the tag is part of the known catalog.
#[must_use]
pub fn is_known(tag: u32) -> bool {
    is_header(tag) || is_trailer(tag) || BODY_TAGS.contains(&tag)
}

/// Returns true if the tag carries credential material.
#[inline]
#[must_use]
pub fn is_sensitive(tag: u32) -> bool {
    SENSITIVE_TAGS.contains(&tag)
}
