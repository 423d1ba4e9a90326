use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("Insufficient funds. Error: {0}")]
    InsufficientFunds(String),
    #[error("Nonce too low. Error: {0}")]
    NonceTooLow(String),
    #[error("Nonce too high. Error: {0}")]
    NonceTooHigh(String),
    #[error("Transaction reverted. Error: {0}")]
    Reverted(String),
    #[error("Transaction mined with failure status. Error: {0}")]
    MinedFailure(String),
    #[error("Timeout. Error: {0}")]
    Timeout(String),
    #[error("Other error. Error: {0}")]
    Other(String),
}

/// Report category of a failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    InsufficientFunds,
    Nonce,
    Reverted,
    Timeout,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Nonce => "nonce_error",
            ErrorKind::Reverted => "reverted",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            TxError::NonceTooLow(_) | TxError::NonceTooHigh(_) => ErrorKind::Nonce,
            TxError::Reverted(_) | TxError::MinedFailure(_) => ErrorKind::Reverted,
            TxError::Timeout(_) => ErrorKind::Timeout,
            TxError::Other(_) => ErrorKind::Other,
        }
    }

    /// Resubmitting after a nonce conflict or a funding shortfall fails the
    /// same way. A receipt timeout leaves the transaction possibly pending.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TxError::Reverted(_) | TxError::MinedFailure(_) | TxError::Other(_)
        )
    }

    /// Keep an error that is already typed, classify the rest by message
    pub fn from_send_error(err: anyhow::Error) -> TxError {
        match err.downcast::<TxError>() {
            Ok(tx_err) => tx_err,
            Err(err) => classify_send_error(format!("{err:#}")),
        }
    }

    /// Category of an arbitrary error, looking through `anyhow` context
    pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
        match err.downcast_ref::<TxError>() {
            Some(tx_err) => tx_err.kind(),
            None => classify_send_error(format!("{err:#}")).kind(),
        }
    }

    pub fn is_retryable_error(err: &anyhow::Error) -> bool {
        match err.downcast_ref::<TxError>() {
            Some(tx_err) => tx_err.is_retryable(),
            None => classify_send_error(format!("{err:#}")).is_retryable(),
        }
    }
}

/// Map a node error message onto a [`TxError`]
pub fn classify_send_error(error: String) -> TxError {
    let lower = error.to_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        TxError::InsufficientFunds(error)
    } else if lower.contains("nonce too high") {
        TxError::NonceTooHigh(error)
    } else if lower.contains("nonce")
        || lower.contains("already known")
        || lower.contains("replacement transaction underpriced")
    {
        TxError::NonceTooLow(error)
    } else if lower.contains("revert") {
        TxError::Reverted(error)
    } else {
        TxError::Other(error)
    }
}
