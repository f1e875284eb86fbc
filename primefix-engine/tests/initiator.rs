/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use primefix_core::error::{ProtocolFatal, SessionError};
use primefix_core::message::{Message, MsgType};
use primefix_core::tags;
use primefix_core::types::{CompId, Side, Timestamp};
use primefix_engine::{Application, EngineBuilder, Initiator, RejectReason, SessionHandle};
use primefix_messages::{ExecutionReport, OrderRequest};
use primefix_session::{
    ConnectionConfig, Credentials, DisconnectReason, ReconnectPolicy, SessionConfig, SessionEvent,
    SessionId,
};
use primefix_store::{MemoryStore, MessageStore};
use primefix_tagvalue::encode;
use primefix_transport::{FixCodec, TcpConnector};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const WAIT: Duration = Duration::from_secs(5);

/// Minimal counterparty speaking FIX over a real socket.
struct Acceptor {
    framed: Framed<TcpStream, FixCodec>,
    next_seq: u64,
}

impl Acceptor {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        Self {
            framed: Framed::new(stream, FixCodec::new()),
            next_seq: 1,
        }
    }

    async fn recv(&mut self) -> Message {
        timeout(WAIT, self.framed.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .expect("framing error")
            .expect("undecodable message")
    }

    async fn send(&mut self, msg: Message) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.send_with_seq(msg, seq).await;
    }

    async fn send_with_seq(&mut self, mut msg: Message, seq: u64) {
        msg.set(tags::SENDER_COMP_ID, "COIN");
        msg.set(tags::TARGET_COMP_ID, "CLIENT");
        msg.set(tags::MSG_SEQ_NUM, seq);
        msg.set(tags::SENDING_TIME, Timestamp::now());
        self.framed.send(encode(&msg).unwrap()).await.unwrap();
    }

    async fn accept_logon(&mut self) -> Message {
        let logon = self.recv().await;
        assert_eq!(logon.msg_type(), Some(MsgType::Logon));
        let mut reply = Message::new("FIX.4.2", MsgType::Logon);
        reply.set(tags::ENCRYPT_METHOD, 0u64);
        reply.set(tags::HEART_BT_INT, 30u64);
        self.send(reply).await;
        logon
    }
}

struct Recorder {
    order: Option<OrderRequest>,
    reports: mpsc::UnboundedSender<ExecutionReport>,
    events: mpsc::UnboundedSender<SessionEvent>,
    disconnects: mpsc::UnboundedSender<DisconnectReason>,
}

struct Observed {
    reports: mpsc::UnboundedReceiver<ExecutionReport>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    disconnects: mpsc::UnboundedReceiver<DisconnectReason>,
}

fn recorder(order: Option<OrderRequest>) -> (Recorder, Observed) {
    let (reports_tx, reports) = mpsc::unbounded_channel();
    let (events_tx, events) = mpsc::unbounded_channel();
    let (disconnects_tx, disconnects) = mpsc::unbounded_channel();
    (
        Recorder {
            order,
            reports: reports_tx,
            events: events_tx,
            disconnects: disconnects_tx,
        },
        Observed {
            reports,
            events,
            disconnects,
        },
    )
}

#[async_trait]
impl Application for Recorder {
    async fn on_create(&self, _session_id: &SessionId) {}

    async fn on_event(&self, _session_id: &SessionId, event: &SessionEvent) {
        let _ = self.events.send(event.clone());
    }

    async fn on_active(&self, _session_id: &SessionId, handle: &SessionHandle) {
        if let Some(ref order) = self.order {
            handle.send_order(order).await.unwrap();
        }
    }

    async fn on_disconnected(&self, _session_id: &SessionId, reason: &DisconnectReason) {
        let _ = self.disconnects.send(reason.clone());
    }

    async fn on_execution_report(&self, _session_id: &SessionId, report: ExecutionReport) {
        let _ = self.reports.send(report);
    }

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> Result<(), RejectReason> {
        Ok(())
    }
}

fn credentials() -> Credentials {
    Credentials::new("api-key", "secret", "passphrase", "portfolio-1")
}

fn eth_limit() -> OrderRequest {
    OrderRequest::limit(
        "ETH-USD",
        Side::Buy,
        Decimal::new(15, 4),
        Decimal::from(1001),
        "portfolio-1",
    )
}

async fn start(
    app: Recorder,
) -> (
    TcpListener,
    Initiator<Recorder, TcpConnector, MemoryStore>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let initiator = EngineBuilder::new()
        .with_application(app)
        .with_session(SessionConfig::new(
            CompId::new("CLIENT").unwrap(),
            CompId::new("COIN").unwrap(),
            "FIX.4.2",
        ))
        .with_credentials(credentials())
        .with_connection(ConnectionConfig::new("127.0.0.1", port))
        .with_reconnect(ReconnectPolicy::disabled())
        .with_tick_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    (listener, initiator)
}

#[tokio::test]
async fn test_logon_order_fill_logout() {
    let (app, mut observed) = recorder(Some(eth_limit()));
    let (listener, initiator) = start(app).await;
    let handle = initiator.handle();
    let store = initiator.store();
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    let logon = acceptor.accept_logon().await;
    assert_eq!(logon.seq_num(), Some(1));
    let sending_time = logon.get_str(tags::SENDING_TIME).unwrap();
    let signature = credentials().sign_logon(sending_time, 1, "COIN").unwrap();
    assert_eq!(logon.get_str(tags::RAW_DATA), Some(signature.as_str()));
    assert_eq!(logon.get_str(tags::ACCESS_KEY), Some("api-key"));

    let order = acceptor.recv().await;
    assert_eq!(order.msg_type(), Some(MsgType::NewOrderSingle));
    assert_eq!(order.seq_num(), Some(2));
    assert_eq!(order.get_str(tags::SENDER_COMP_ID), Some("CLIENT"));
    assert_eq!(order.get_str(tags::ORDER_QTY), Some("0.0015"));
    assert_eq!(order.get_str(tags::PRICE), Some("1001"));
    assert_eq!(order.get_str(tags::ORD_TYPE), Some("2"));
    let cl_ord_id = order.get_str(tags::CL_ORD_ID).unwrap().to_string();

    let mut report = Message::new("FIX.4.2", MsgType::ExecutionReport);
    report.set(tags::ORDER_ID, "ord-1");
    report.set(tags::CL_ORD_ID, cl_ord_id.as_str());
    report.set(tags::EXEC_ID, "exec-1");
    report.set(tags::EXEC_TYPE, '0');
    report.set(tags::ORD_STATUS, '0');
    report.set(tags::SYMBOL, "ETH-USD");
    report.set(tags::SIDE, '1');
    report.set(tags::ORDER_QTY, "0.0015");
    acceptor.send(report).await;

    let report = timeout(WAIT, observed.reports.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.cl_ord_id, cl_ord_id);
    assert_eq!(report.order_id, "ord-1");

    handle.logout(Some("done")).await.unwrap();
    let logout = acceptor.recv().await;
    assert_eq!(logout.msg_type(), Some(MsgType::Logout));
    assert_eq!(logout.seq_num(), Some(3));
    acceptor
        .send(Message::new("FIX.4.2", MsgType::Logout))
        .await;

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert_eq!(
        observed.disconnects.recv().await,
        Some(DisconnectReason::LogoutCompleted)
    );
    assert_eq!(observed.events.recv().await, Some(SessionEvent::LogonSent));
    assert_eq!(observed.events.recv().await, Some(SessionEvent::Active));

    assert_eq!(store.next_sender_seq(), 4);
    assert_eq!(store.next_target_seq(), 4);
    let stored = store.get_range(1, 0).await.unwrap();
    let seqs: Vec<u64> = stored.iter().map(|(seq, _)| *seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_resend_request_is_replayed() {
    let (app, _observed) = recorder(Some(eth_limit()));
    let (listener, initiator) = start(app).await;
    let shutdown = initiator.cancellation_token();
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.accept_logon().await;
    let original = acceptor.recv().await;
    assert_eq!(original.seq_num(), Some(2));

    let mut request = Message::new("FIX.4.2", MsgType::ResendRequest);
    request.set(tags::BEGIN_SEQ_NO, 1u64);
    request.set(tags::END_SEQ_NO, 0u64);
    acceptor.send(request).await;

    let gap_fill = acceptor.recv().await;
    assert_eq!(gap_fill.msg_type(), Some(MsgType::SequenceReset));
    assert_eq!(gap_fill.seq_num(), Some(1));
    assert_eq!(gap_fill.get_str(tags::GAP_FILL_FLAG), Some("Y"));
    assert_eq!(gap_fill.get_str(tags::NEW_SEQ_NO), Some("2"));
    assert!(gap_fill.is_poss_dup());

    let resent = acceptor.recv().await;
    assert_eq!(resent.msg_type(), Some(MsgType::NewOrderSingle));
    assert_eq!(resent.seq_num(), Some(2));
    assert!(resent.is_poss_dup());
    assert_eq!(
        resent.get_str(tags::ORIG_SENDING_TIME),
        original.get_str(tags::SENDING_TIME)
    );
    assert_eq!(
        resent.get_str(tags::CL_ORD_ID),
        original.get_str(tags::CL_ORD_ID)
    );

    shutdown.cancel();
    let logout = acceptor.recv().await;
    assert_eq!(logout.msg_type(), Some(MsgType::Logout));
    assert_eq!(logout.seq_num(), Some(3));
    acceptor
        .send(Message::new("FIX.4.2", MsgType::Logout))
        .await;

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_inbound_gap_requests_resend() {
    let (app, mut observed) = recorder(None);
    let (listener, initiator) = start(app).await;
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.accept_logon().await;
    acceptor
        .send_with_seq(Message::new("FIX.4.2", MsgType::Heartbeat), 5)
        .await;

    let request = acceptor.recv().await;
    assert_eq!(request.msg_type(), Some(MsgType::ResendRequest));
    assert_eq!(request.get_str(tags::BEGIN_SEQ_NO), Some("2"));
    assert_eq!(request.get_str(tags::END_SEQ_NO), Some("0"));

    let mut logout = Message::new("FIX.4.2", MsgType::Logout);
    logout.set(tags::TEXT, "maintenance");
    acceptor.send_with_seq(logout, 6).await;
    let reply = acceptor.recv().await;
    assert_eq!(reply.msg_type(), Some(MsgType::Logout));

    // Reconnects are disabled, so a counterparty logout ends the run.
    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(matches!(result, Err(SessionError::Connection(_))));

    let mut events = Vec::new();
    while let Ok(event) = observed.events.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&SessionEvent::GapDetected { begin: 2, end: 5 }));
    assert!(events.contains(&SessionEvent::LogoutReceived {
        text: Some("maintenance".to_string())
    }));
}

async fn wait_for_active(observed: &mut Observed) {
    loop {
        let event = timeout(WAIT, observed.events.recv()).await.unwrap().unwrap();
        if event == SessionEvent::Active {
            return;
        }
    }
}

fn assert_resumed_logon(logon: &Message, seq: u64) {
    assert_eq!(logon.msg_type(), Some(MsgType::Logon));
    assert_eq!(logon.seq_num(), Some(seq));
    assert!(logon.get_str(tags::RESET_SEQ_NUM_FLAG).is_none());
    let sending_time = logon.get_str(tags::SENDING_TIME).unwrap();
    let signature = credentials().sign_logon(sending_time, seq, "COIN").unwrap();
    assert_eq!(logon.get_str(tags::RAW_DATA), Some(signature.as_str()));
}

#[tokio::test]
async fn test_dropped_connection_reconnects_with_resumed_sequences() {
    let (app, mut observed) = recorder(None);
    let (listener, initiator) = start(app).await;
    // One failure is tolerated; a second drop in a row would exhaust it.
    let initiator = initiator.with_reconnect(
        ReconnectPolicy::default()
            .with_initial_delay(Duration::from_millis(50))
            .with_max_attempts(Some(1)),
    );
    let store = initiator.store();
    let shutdown = initiator.cancellation_token();
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    let logon = acceptor.accept_logon().await;
    assert_eq!(logon.seq_num(), Some(1));
    wait_for_active(&mut observed).await;
    drop(acceptor);
    assert_eq!(
        timeout(WAIT, observed.disconnects.recv()).await.unwrap(),
        Some(DisconnectReason::TransportClosed)
    );

    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.next_seq = 2;
    let logon = acceptor.accept_logon().await;
    assert_resumed_logon(&logon, 2);
    wait_for_active(&mut observed).await;
    drop(acceptor);
    assert_eq!(
        timeout(WAIT, observed.disconnects.recv()).await.unwrap(),
        Some(DisconnectReason::TransportClosed)
    );

    // Reaching Active restarted the failure count, so this retry is allowed.
    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.next_seq = 3;
    let logon = acceptor.accept_logon().await;
    assert_resumed_logon(&logon, 3);
    wait_for_active(&mut observed).await;

    shutdown.cancel();
    let logout = acceptor.recv().await;
    assert_eq!(logout.msg_type(), Some(MsgType::Logout));
    assert_eq!(logout.seq_num(), Some(4));
    acceptor
        .send(Message::new("FIX.4.2", MsgType::Logout))
        .await;

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert_eq!(store.next_sender_seq(), 5);
    assert_eq!(store.next_target_seq(), 5);
}

#[tokio::test]
async fn test_unencodable_message_keeps_sequence_contiguous() {
    let (app, mut observed) = recorder(None);
    let (listener, initiator) = start(app).await;
    let handle = initiator.handle();
    let shutdown = initiator.cancellation_token();
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.accept_logon().await;
    wait_for_active(&mut observed).await;

    let mut bad = Message::new("FIX.4.2", MsgType::NewOrderSingle);
    bad.set(tags::TEXT, "split\x01value");
    handle.send(bad).await.unwrap();
    handle.send_order(&eth_limit()).await.unwrap();

    let order = acceptor.recv().await;
    assert_eq!(order.msg_type(), Some(MsgType::NewOrderSingle));
    assert_eq!(order.seq_num(), Some(2));
    assert!(order.get_str(tags::TEXT).is_none());

    shutdown.cancel();
    let logout = acceptor.recv().await;
    assert_eq!(logout.seq_num(), Some(3));
    acceptor
        .send(Message::new("FIX.4.2", MsgType::Logout))
        .await;
    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_rejected_logon_is_not_retried() {
    let (app, _observed) = recorder(None);
    let (listener, initiator) = start(app).await;
    let initiator = initiator.with_reconnect(ReconnectPolicy::default());
    let task = tokio::spawn(initiator.run());

    let mut acceptor = Acceptor::accept(&listener).await;
    acceptor.recv().await;
    let mut logout = Message::new("FIX.4.2", MsgType::Logout);
    logout.set(tags::TEXT, "invalid signature");
    acceptor.send(logout).await;

    let result = timeout(WAIT, task).await.unwrap().unwrap();
    assert_eq!(
        result,
        Err(SessionError::Fatal(ProtocolFatal::LogonRejected {
            reason: "invalid signature".to_string()
        }))
    );
}

#[tokio::test]
async fn test_unreachable_counterparty_exhausts_reconnects() {
    let (app, mut observed) = recorder(None);
    let (listener, initiator) = start(app).await;
    drop(listener);

    let result = timeout(WAIT, initiator.run()).await.unwrap();
    assert!(matches!(result, Err(SessionError::Connection(_))));
    assert!(matches!(
        observed.disconnects.recv().await,
        Some(DisconnectReason::TransportError(_))
    ));
}
