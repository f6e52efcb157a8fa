// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider, IP discovery, and reconciliation error types.
//!
//! This module provides specialized error types for:
//! - Namesilo HTTP API operations (list, add, update, delete)
//! - Public IP discovery
//! - Cache refreshes
//! - Ingress-driven reconciliation
//!
//! Pure computation (record derivation and classification) returns these
//! errors without logging them; only the manager and event loop decide whether
//! an error is fatal, logged, or dropped.

use thiserror::Error;

/// Errors that can occur while talking to the DNS provider API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Update or delete requested for a record that carries no provider id
    ///
    /// The provider addresses existing records by id only, so an id-less
    /// mutation can never be correct. Nothing is sent over the wire.
    #[error("Cannot {operation} DNS record {record_type}:{host} without a record id")]
    MissingId {
        /// The operation that was refused (`update` or `delete`)
        operation: String,
        /// Record type of the refused record
        record_type: String,
        /// Host of the refused record
        host: String,
    },

    /// No connection could be made, so the request never reached the provider
    #[error("HTTP request for {operation} failed: {reason}")]
    HttpConnectionFailed {
        /// The provider operation (e.g. `dnsListRecords`)
        operation: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The request was sent but no complete response came back (timeout,
    /// dropped connection, unreadable body)
    ///
    /// The provider may or may not have acted on it.
    #[error("HTTP request for {operation} was interrupted: {reason}")]
    RequestInterrupted {
        /// The provider operation
        operation: String,
        /// What cut the exchange short
        reason: String,
    },

    /// The provider answered with a non-success HTTP status
    #[error("Unexpected HTTP status {status_code} for {operation}")]
    UnexpectedHttpStatus {
        /// The provider operation
        operation: String,
        /// HTTP status code
        status_code: u16,
    },

    /// The response body could not be decoded as the expected XML document
    #[error("Invalid response for {operation}: {reason}")]
    InvalidResponse {
        /// The provider operation
        operation: String,
        /// Decoder error
        reason: String,
    },

    /// The provider processed the request and rejected it
    #[error("Namesilo {operation} failed with: {detail}")]
    ApiRejected {
        /// The provider operation
        operation: String,
        /// The `detail` string returned by the provider
        detail: String,
    },
}

impl ProviderError {
    /// Returns true if the failure happened in transport and the request may be retried.
    ///
    /// Rejections by the provider itself and client-side validation failures are
    /// permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpConnectionFailed { .. } | Self::RequestInterrupted { .. } => true,
            Self::UnexpectedHttpStatus { status_code, .. } => {
                *status_code == 429 || (500..600).contains(status_code)
            }
            Self::MissingId { .. } | Self::InvalidResponse { .. } | Self::ApiRejected { .. } => {
                false
            }
        }
    }

    /// Returns true if the provider certainly did not act on the request.
    ///
    /// Only these failures may be retried for calls that must not be applied
    /// twice, such as adding a record.
    #[must_use]
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            Self::HttpConnectionFailed { .. } => true,
            Self::UnexpectedHttpStatus { status_code, .. } => *status_code == 429,
            Self::RequestInterrupted { .. }
            | Self::MissingId { .. }
            | Self::InvalidResponse { .. }
            | Self::ApiRejected { .. } => false,
        }
    }
}

/// Errors that can occur while discovering the public IP address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpDiscoveryError {
    /// HTTP connection to the discovery service failed
    #[error("HTTP connection to {endpoint} failed: {reason}")]
    HttpConnectionFailed {
        /// Discovery service URL
        endpoint: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The discovery service answered with a non-success HTTP status
    #[error("Unexpected HTTP status {status_code} from {endpoint}")]
    UnexpectedHttpStatus {
        /// Discovery service URL
        endpoint: String,
        /// HTTP status code
        status_code: u16,
    },

    /// The discovery service returned something that is not an IP address
    #[error("{endpoint} returned '{body}', which is not an IP address")]
    InvalidAddress {
        /// Discovery service URL
        endpoint: String,
        /// The trimmed response body
        body: String,
    },
}

impl IpDiscoveryError {
    /// Returns true if the lookup may succeed when repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpConnectionFailed { .. } => true,
            Self::UnexpectedHttpStatus { status_code, .. } => {
                *status_code == 429 || (500..600).contains(status_code)
            }
            Self::InvalidAddress { .. } => false,
        }
    }
}

/// Errors that can occur while refreshing the state cache.
///
/// A failed refresh leaves the previous snapshot untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Listing the provider's records failed
    #[error("Failed to list provider records: {0}")]
    Provider(#[from] ProviderError),

    /// Discovering the public IP failed
    #[error("Failed to discover public IP: {0}")]
    PublicIp(#[from] IpDiscoveryError),
}

/// Composite error type for the reconciliation path.
///
/// This is the error type returned by the manager's ingress handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    /// Missing domain name, ingress class, credentials, or pod identity
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The `Ingress` has no rules or an empty hostname on its first rule
    #[error("Malformed ingress '{ingress}': {reason}")]
    MalformedIngress {
        /// `namespace/name` of the offending ingress
        ingress: String,
        /// What is missing
        reason: String,
    },

    /// A provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Deletion requested for a record absent from the cache
    #[error("failed to find record: {record_type}:{host}")]
    RecordNotFound {
        /// Record type that was looked up
        record_type: String,
        /// Host that was looked up
        host: String,
    },

    /// A cache refresh failed
    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

impl DnsError {
    /// Returns the category label used for error metrics and log fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::MalformedIngress { .. } => "MalformedIngress",
            Self::Provider(_) => "ProviderError",
            Self::RecordNotFound { .. } => "RecordNotFound",
            Self::Refresh(_) => "RefreshError",
        }
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
