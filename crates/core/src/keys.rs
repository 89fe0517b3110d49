//! Annotation keys understood by the sidecar injector.
//!
//! Every key lives under [`PREFIX`]. The builder emits them in the order they
//! are declared here, `enabled` first.

pub const PREFIX: &str = "dapr.io/";

pub const ENABLED: &str = "dapr.io/enabled";
pub const APP_ID: &str = "dapr.io/app-id";
pub const CONFIG: &str = "dapr.io/config";

// networking
pub const APP_PORT: &str = "dapr.io/app-port";
pub const APP_PROTOCOL: &str = "dapr.io/app-protocol";
pub const APP_SSL: &str = "dapr.io/app-ssl";
pub const APP_MAX_CONCURRENCY: &str = "dapr.io/app-max-concurrency";
pub const LISTEN_ADDRESSES: &str = "dapr.io/sidecar-listen-addresses";
pub const UNIX_DOMAIN_SOCKET_PATH: &str = "dapr.io/unix-domain-socket-path";
pub const PLACEMENT_HOST_ADDRESS: &str = "dapr.io/placement-host-address";

// observability
pub const LOG_LEVEL: &str = "dapr.io/log-level";
pub const LOG_AS_JSON: &str = "dapr.io/log-as-json";
pub const ENABLE_API_LOGGING: &str = "dapr.io/enable-api-logging";
pub const ENABLE_METRICS: &str = "dapr.io/enable-metrics";
pub const METRICS_PORT: &str = "dapr.io/metrics-port";
pub const ENABLE_DEBUG: &str = "dapr.io/enable-debug";
pub const DEBUG_PORT: &str = "dapr.io/debug-port";
pub const ENABLE_PROFILING: &str = "dapr.io/enable-profiling";

// environment and secrets
pub const ENV: &str = "dapr.io/env";
pub const API_TOKEN_SECRET: &str = "dapr.io/api-token-secret";
pub const APP_TOKEN_SECRET: &str = "dapr.io/app-token-secret";

// resource sizing
pub const CPU_LIMIT: &str = "dapr.io/sidecar-cpu-limit";
pub const MEMORY_LIMIT: &str = "dapr.io/sidecar-memory-limit";
pub const CPU_REQUEST: &str = "dapr.io/sidecar-cpu-request";
pub const MEMORY_REQUEST: &str = "dapr.io/sidecar-memory-request";

// health probes
pub const LIVENESS_PROBE_DELAY: &str = "dapr.io/sidecar-liveness-probe-delay-seconds";
pub const LIVENESS_PROBE_TIMEOUT: &str = "dapr.io/sidecar-liveness-probe-timeout-seconds";
pub const LIVENESS_PROBE_PERIOD: &str = "dapr.io/sidecar-liveness-probe-period-seconds";
pub const LIVENESS_PROBE_THRESHOLD: &str = "dapr.io/sidecar-liveness-probe-threshold";
pub const READINESS_PROBE_DELAY: &str = "dapr.io/sidecar-readiness-probe-delay-seconds";
pub const READINESS_PROBE_TIMEOUT: &str = "dapr.io/sidecar-readiness-probe-timeout-seconds";
pub const READINESS_PROBE_PERIOD: &str = "dapr.io/sidecar-readiness-probe-period-seconds";
pub const READINESS_PROBE_THRESHOLD: &str = "dapr.io/sidecar-readiness-probe-threshold";

// misc
pub const SIDECAR_IMAGE: &str = "dapr.io/sidecar-image";
pub const HTTP_MAX_REQUEST_SIZE: &str = "dapr.io/http-max-request-size";
pub const HTTP_READ_BUFFER_SIZE: &str = "dapr.io/http-read-buffer-size";
pub const HTTP_STREAM_REQUEST_BODY: &str = "dapr.io/http-stream-request-body";
pub const GRACEFUL_SHUTDOWN_SECONDS: &str = "dapr.io/graceful-shutdown-seconds";
pub const VOLUME_MOUNTS: &str = "dapr.io/volume-mounts";
pub const VOLUME_MOUNTS_RW: &str = "dapr.io/volume-mounts-rw";
pub const DISABLE_BUILTIN_K8S_SECRET_STORE: &str = "dapr.io/disable-builtin-k8s-secret-store";
