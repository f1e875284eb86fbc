/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Coinbase Prime order entry client.
//!
//! Reads the session and credentials from the environment
//! (`FIX_SENDER_COMP_ID`, `FIX_HOST`, `FIX_PORT`, `ACCESS_KEY`, `SIGNING_KEY`,
//! `PASSPHRASE` and `PORTFOLIO_ID`), logs on, places one limit order and
//! logs out once the order is acknowledged.
//!
//! Run with: `cargo run -p primefix --example prime_client`

use async_trait::async_trait;
use primefix::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{info, warn};

struct OrderOnce {
    order: OrderRequest,
    handle: Mutex<Option<SessionHandle>>,
}

#[async_trait]
impl Application for OrderOnce {
    async fn on_create(&self, session_id: &SessionId) {
        info!(session = %session_id, "session created");
    }

    async fn on_event(&self, session_id: &SessionId, event: &SessionEvent) {
        info!(session = %session_id, ?event, "session event");
    }

    async fn on_active(&self, session_id: &SessionId, handle: &SessionHandle) {
        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle.clone());
        }
        match handle.send_order(&self.order).await {
            Ok(cl_ord_id) => info!(session = %session_id, %cl_ord_id, "order sent"),
            Err(err) => warn!(session = %session_id, %err, "order not sent"),
        }
    }

    async fn on_disconnected(&self, session_id: &SessionId, reason: &DisconnectReason) {
        info!(session = %session_id, %reason, "disconnected");
    }

    async fn on_execution_report(&self, session_id: &SessionId, report: ExecutionReport) {
        info!(
            session = %session_id,
            cl_ord_id = %report.cl_ord_id,
            exec_type = %report.exec_type,
            ord_status = ?report.ord_status,
            text = ?report.text,
            "execution report"
        );
        let handle = self.handle.lock().ok().and_then(|slot| slot.clone());
        if let Some(handle) = handle
            && let Err(err) = handle.logout(Some("order acknowledged")).await
        {
            warn!(session = %session_id, %err, "logout not sent");
        }
    }

    async fn from_app(
        &self,
        _message: &Message,
        _session_id: &SessionId,
    ) -> std::result::Result<(), RejectReason> {
        Ok(())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let credentials = Credentials::from_env()?;
    let order = OrderRequest::limit(
        "ETH-USD",
        Side::Buy,
        Decimal::from_str("0.0015")?,
        Decimal::from(1001),
        credentials.portfolio_id(),
    );

    let initiator = EngineBuilder::from_env()?
        .with_application(OrderOnce {
            order,
            handle: Mutex::new(None),
        })
        .build_with_file_store("./primefix-store")
        .await?;

    let shutdown = initiator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    initiator.run().await?;
    info!("client stopped");
    Ok(())
}
