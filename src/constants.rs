// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Namesilo ingress DNS controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Kubernetes Constants
// ============================================================================

/// Annotation that selects which ingress controller (and therefore which
/// DNS manager) an `Ingress` belongs to
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Environment variable carrying the namespace of the running pod
pub const POD_NAMESPACE_ENV: &str = "POD_NAMESPACE";

/// Environment variable carrying the name of the running pod
pub const POD_NAME_ENV: &str = "POD_NAME";

// ============================================================================
// DNS Record Constants
// ============================================================================

/// TTL applied to every record this controller creates or updates
pub const MANAGED_RECORD_TTL_SECS: u32 = 7207;

/// Distance (priority) applied to every record this controller creates
pub const MANAGED_RECORD_DISTANCE: u32 = 0;

// ============================================================================
// Namesilo API Constants
// ============================================================================

/// Default prefix for Namesilo API operations
pub const NAMESILO_API_URL: &str = "https://www.namesilo.com/api";

/// Environment variable holding the Namesilo API key
pub const NAMESILO_API_KEY_ENV: &str = "NAMESILO_API_KEY";

/// Namesilo API protocol version sent with every request
pub const NAMESILO_API_VERSION: &str = "1";

/// Response format requested from Namesilo
pub const NAMESILO_RESPONSE_TYPE: &str = "xml";

/// `detail` value Namesilo returns for a successful operation
pub const NAMESILO_SUCCESS_DETAIL: &str = "success";

// ============================================================================
// Public IP Discovery Constants
// ============================================================================

/// Default service used to discover the cluster's public address
pub const PUBLIC_IP_URL: &str = "https://icanhazip.com";

// ============================================================================
// HTTP Client Constants
// ============================================================================

/// Default timeout applied to every outbound HTTP request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default upper bound on time spent retrying a transient HTTP failure
pub const DEFAULT_HTTP_RETRY_MAX_SECS: u64 = 120;

// ============================================================================
// Cache Refresh Constants
// ============================================================================

/// Interval between forced full cache refreshes (1 hour)
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3600;

/// Interval at which every known ingress is replayed through the manager (1 minute)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Capacity of the ingress event channel between watcher and manager
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (30 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 30;

/// Default grace period before lease expiry at which it is renewed (5 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint served next to metrics
pub const HEALTH_SERVER_PATH: &str = "/healthz";
