//! Transport error types

use contracts::ContractError;
use thiserror::Error;

/// Local bus errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// An endpoint is already bound to the address
    #[error("address {address} already in use")]
    AddressInUse {
        /// Endpoint address
        address: String,
    },

    /// No publisher bound to the address
    #[error("no endpoint bound at {address}")]
    EndpointNotFound {
        /// Endpoint address
        address: String,
    },

    /// Publisher side went away
    #[error("endpoint {address} disconnected")]
    Disconnected {
        /// Endpoint address
        address: String,
    },
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::EndpointNotFound { ref address } => {
                ContractError::transport_connect(address.clone(), 1, err.to_string())
            }
            IngestionError::AddressInUse { ref address } => {
                ContractError::transport_connect(address.clone(), 1, err.to_string())
            }
            IngestionError::Disconnected { ref address } => {
                ContractError::transport(address.clone(), err.to_string())
            }
        }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
