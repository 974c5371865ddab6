//! Channels between clients and the bank.
//!
//! A client announces a session on the shared announcement queue, then uses a
//! private reply channel for exactly one round trip: its request goes in, the
//! teller's response comes back, and both ends are dropped.

use crate::domain::account::Amount;
use crate::domain::transaction::{
    AccountRef, OperationKind, SessionId, TransactionRequest, TransactionResponse,
};
use crate::error::{BankError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Sent once per client on the announcement queue.
pub struct SessionAnnouncement {
    pub session_id: SessionId,
    pub reply: ServerSession,
}

/// The bank's end of a session's reply channel.
pub struct ServerSession {
    request_rx: oneshot::Receiver<TransactionRequest>,
    response_tx: oneshot::Sender<TransactionResponse>,
}

impl ServerSession {
    /// Waits for the client's transaction.
    pub async fn receive(&mut self) -> Result<TransactionRequest> {
        (&mut self.request_rx)
            .await
            .map_err(|_| BankError::ChannelError("client closed the session before sending".into()))
    }

    /// Sends the single response and discards the channel.
    pub fn respond(self, response: TransactionResponse) -> Result<()> {
        self.response_tx
            .send(response)
            .map_err(|_| BankError::ChannelError("client left before the response".into()))
    }
}

/// The client's end of a session's reply channel.
pub struct ClientSession {
    pub session_id: SessionId,
    request_tx: Option<oneshot::Sender<TransactionRequest>>,
    response_rx: oneshot::Receiver<TransactionResponse>,
}

impl ClientSession {
    pub fn send(&mut self, request: TransactionRequest) -> Result<()> {
        self.request_tx
            .take()
            .ok_or_else(|| BankError::ChannelError("request already sent".into()))?
            .send(request)
            .map_err(|_| BankError::ChannelError("teller is gone".into()))
    }

    pub async fn response(self) -> Result<TransactionResponse> {
        self.response_rx
            .await
            .map_err(|_| BankError::ChannelError("session closed without a response".into()))
    }
}

/// Opens both ends of a fresh reply channel.
pub fn session_pair(session_id: SessionId) -> (ClientSession, ServerSession) {
    let (request_tx, request_rx) = oneshot::channel();
    let (response_tx, response_rx) = oneshot::channel();
    (
        ClientSession {
            session_id,
            request_tx: Some(request_tx),
            response_rx,
        },
        ServerSession {
            request_rx,
            response_tx,
        },
    )
}

/// One operation a client wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRequest {
    pub account: AccountRef,
    pub operation: OperationKind,
    pub amount: Amount,
}

impl ClientRequest {
    pub fn new(account: AccountRef, operation: OperationKind, amount: Amount) -> Self {
        Self {
            account,
            operation,
            amount,
        }
    }
}

/// Connects to a running bank. Cheap to clone; every clone shares the session counter.
#[derive(Clone)]
pub struct BankClient {
    announce_tx: mpsc::Sender<SessionAnnouncement>,
    next_session: Arc<AtomicU64>,
}

impl BankClient {
    pub fn new(announce_tx: mpsc::Sender<SessionAnnouncement>) -> Self {
        Self {
            announce_tx,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Runs one full session and returns the teller's answer.
    pub async fn submit(&self, request: ClientRequest) -> Result<TransactionResponse> {
        let session_id = SessionId(self.next_session.fetch_add(1, Ordering::Relaxed));
        let (mut client, server) = session_pair(session_id);

        self.announce_tx
            .send(SessionAnnouncement {
                session_id,
                reply: server,
            })
            .await
            .map_err(|_| BankError::ChannelError("bank is not accepting sessions".into()))?;
        debug!(session = %session_id, "session announced");

        client.send(TransactionRequest::new(
            session_id,
            request.account,
            request.operation,
            request.amount,
        ))?;
        client.response().await
    }

    /// Submits every request in its own concurrent session.
    ///
    /// Results come back in the order of `requests`; a failed session does not
    /// affect the others.
    pub async fn submit_batch(
        &self,
        requests: Vec<ClientRequest>,
    ) -> Vec<Result<TransactionResponse>> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let client = self.clone();
                tokio::spawn(async move { client.submit(request).await })
            })
            .collect();

        let mut responses = Vec::with_capacity(handles.len());
        for handle in handles {
            responses.push(handle.await.map_err(BankError::from).and_then(|r| r));
        }
        responses
    }
}
