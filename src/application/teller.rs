use super::serializer::LedgerReader;
use crate::domain::ledger::Assessment;
use crate::domain::transaction::{SessionId, TransactionRequest, TransactionResponse};
use crate::error::{BankError, Result};
use crate::interfaces::session::ServerSession;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Serves exactly one session: read, assess, forward, answer.
pub struct Teller {
    session_id: SessionId,
    session: ServerSession,
    ledger: LedgerReader,
    ingress: mpsc::Sender<TransactionRequest>,
}

impl Teller {
    pub fn new(
        session_id: SessionId,
        session: ServerSession,
        ledger: LedgerReader,
        ingress: mpsc::Sender<TransactionRequest>,
    ) -> Self {
        Self {
            session_id,
            session,
            ledger,
            ingress,
        }
    }

    /// Handles the session and returns what the teller decided.
    ///
    /// The request is forwarded to the serializer before the client is answered,
    /// but the answer reflects the teller's own read of the ledger. The
    /// serializer may still reach a different conclusion.
    pub async fn serve(mut self) -> Result<Assessment> {
        let mut request = self.session.receive().await?;
        if request.session_id != self.session_id {
            warn!(
                announced = %self.session_id,
                received = %request.session_id,
                "session id mismatch, using the announced one"
            );
            request.session_id = self.session_id;
        }
        request.feasible = false;

        let assessment = {
            let ledger = self.ledger.read().await;
            ledger.assess(&request.account, &request.operation, request.amount)
        };
        request.feasible = assessment.is_feasible();
        debug!(
            session = %self.session_id,
            account = %request.account,
            operation = %request.operation,
            amount = %request.amount,
            feasible = request.feasible,
            "request assessed"
        );

        self.ingress
            .send(request)
            .await
            .map_err(|_| BankError::ChannelError("serializer ingress is closed".into()))?;

        self.session
            .respond(TransactionResponse::new(assessment.to_string()))?;
        Ok(assessment)
    }
}
