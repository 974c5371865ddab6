use crate::domain::account::Amount;
use crate::domain::transaction::{AccountRef, OperationKind};
use crate::error::{BankError, Result};
use crate::interfaces::session::ClientRequest;
use std::io::Read;
use tracing::warn;

/// Reads client requests, one `<accountId|N> <operation> <amount>` per line.
///
/// Fields are separated by spaces or tabs; runs of either are tolerated. Operation
/// names are passed through as-is so the bank can answer unknown ones itself.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily parses each line.
    pub fn requests(self) -> impl Iterator<Item = Result<ClientRequest>> {
        self.reader
            .into_records()
            .map(|record| record.map_err(BankError::from).and_then(|r| parse_record(&r)))
    }

    /// Collects every well-formed request, logging and skipping the rest.
    pub fn valid_requests(self) -> Vec<ClientRequest> {
        self.requests()
            .enumerate()
            .filter_map(|(line, result)| match result {
                Ok(request) => Some(request),
                Err(e) => {
                    warn!(line = line + 1, error = %e, "skipping malformed request");
                    None
                }
            })
            .collect()
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<ClientRequest> {
    let fields: Vec<&str> = record.iter().flat_map(str::split_whitespace).collect();
    let [account, operation, amount] = fields.as_slice() else {
        return Err(BankError::ValidationError(format!(
            "expected `<account> <operation> <amount>`, got {} fields",
            fields.len()
        )));
    };

    let amount = amount
        .parse::<u64>()
        .map_err(|e| BankError::ValidationError(format!("invalid amount {amount:?}: {e}")))?;
    let Ok(account) = account.parse::<AccountRef>();
    let Ok(operation) = operation.parse::<OperationKind>();

    Ok(ClientRequest::new(account, operation, Amount::new(amount)?))
}
