//! Annotation set builders.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use sidecar_core::{keys, AnnotationSet};

/// Source of the annotations an [`Engine`](crate::Engine) injects.
pub trait AnnotationBuilder {
    fn annotations(&self) -> AnnotationSet;
}

/// A prebuilt set is its own builder; callers that already hold their mapping
/// (e.g. an admission-style hook) hand it over as is.
impl AnnotationBuilder for AnnotationSet {
    fn annotations(&self) -> AnnotationSet {
        self.clone()
    }
}

/// Typed sidecar settings. Every field is optional: `None` emits no annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AnnotateOptions {
    pub app_id: Option<String>,
    pub config: Option<String>,

    pub app_port: Option<u16>,
    pub app_protocol: Option<String>,
    pub app_ssl: Option<bool>,
    pub app_max_concurrency: Option<u32>,
    pub listen_addresses: Option<String>,
    pub unix_domain_socket_path: Option<String>,
    pub placement_host_address: Option<String>,

    pub log_level: Option<String>,
    pub log_as_json: Option<bool>,
    pub enable_api_logging: Option<bool>,
    pub enable_metrics: Option<bool>,
    pub metrics_port: Option<u16>,
    pub enable_debug: Option<bool>,
    pub debug_port: Option<u16>,
    pub enable_profiling: Option<bool>,

    pub env: Option<String>,
    pub api_token_secret: Option<String>,
    pub app_token_secret: Option<String>,

    pub cpu_limit: Option<String>,
    pub memory_limit: Option<String>,
    pub cpu_request: Option<String>,
    pub memory_request: Option<String>,

    pub liveness_probe_delay: Option<u32>,
    pub liveness_probe_timeout: Option<u32>,
    pub liveness_probe_period: Option<u32>,
    pub liveness_probe_threshold: Option<u32>,
    pub readiness_probe_delay: Option<u32>,
    pub readiness_probe_timeout: Option<u32>,
    pub readiness_probe_period: Option<u32>,
    pub readiness_probe_threshold: Option<u32>,

    pub sidecar_image: Option<String>,
    pub max_request_body_size: Option<u32>,
    pub http_read_buffer_size: Option<u32>,
    pub http_stream_request_body: Option<bool>,
    pub graceful_shutdown_seconds: Option<u32>,
    pub volume_mounts: Option<String>,
    pub volume_mounts_rw: Option<String>,
    pub disable_builtin_k8s_secret_store: Option<bool>,
}

impl AnnotateOptions {
    /// Layer `over` onto `self`: every field set in `over` wins, unset fields
    /// keep the value from `self`.
    pub fn overlay(self, over: AnnotateOptions) -> serde_json::Result<AnnotateOptions> {
        let mut base = match serde_json::to_value(self)? {
            Json::Object(m) => m,
            _ => serde_json::Map::new(),
        };
        if let Json::Object(top) = serde_json::to_value(over)? {
            for (k, v) in top {
                if !v.is_null() {
                    base.insert(k, v);
                }
            }
        }
        serde_json::from_value(Json::Object(base))
    }
}

impl AnnotationBuilder for AnnotateOptions {
    fn annotations(&self) -> AnnotationSet {
        let mut set = AnnotationSet::enabled();
        set.insert_opt(keys::APP_ID, self.app_id.as_deref());
        set.insert_opt(keys::CONFIG, self.config.as_deref());

        set.insert_opt(keys::APP_PORT, self.app_port);
        set.insert_opt(keys::APP_PROTOCOL, self.app_protocol.as_deref());
        set.insert_opt(keys::APP_SSL, self.app_ssl);
        set.insert_opt(keys::APP_MAX_CONCURRENCY, self.app_max_concurrency);
        set.insert_opt(keys::LISTEN_ADDRESSES, self.listen_addresses.as_deref());
        set.insert_opt(keys::UNIX_DOMAIN_SOCKET_PATH, self.unix_domain_socket_path.as_deref());
        set.insert_opt(keys::PLACEMENT_HOST_ADDRESS, self.placement_host_address.as_deref());

        set.insert_opt(keys::LOG_LEVEL, self.log_level.as_deref());
        set.insert_opt(keys::LOG_AS_JSON, self.log_as_json);
        set.insert_opt(keys::ENABLE_API_LOGGING, self.enable_api_logging);
        set.insert_opt(keys::ENABLE_METRICS, self.enable_metrics);
        set.insert_opt(keys::METRICS_PORT, self.metrics_port);
        set.insert_opt(keys::ENABLE_DEBUG, self.enable_debug);
        set.insert_opt(keys::DEBUG_PORT, self.debug_port);
        set.insert_opt(keys::ENABLE_PROFILING, self.enable_profiling);

        set.insert_opt(keys::ENV, self.env.as_deref());
        set.insert_opt(keys::API_TOKEN_SECRET, self.api_token_secret.as_deref());
        set.insert_opt(keys::APP_TOKEN_SECRET, self.app_token_secret.as_deref());

        set.insert_opt(keys::CPU_LIMIT, self.cpu_limit.as_deref());
        set.insert_opt(keys::MEMORY_LIMIT, self.memory_limit.as_deref());
        set.insert_opt(keys::CPU_REQUEST, self.cpu_request.as_deref());
        set.insert_opt(keys::MEMORY_REQUEST, self.memory_request.as_deref());

        set.insert_opt(keys::LIVENESS_PROBE_DELAY, self.liveness_probe_delay);
        set.insert_opt(keys::LIVENESS_PROBE_TIMEOUT, self.liveness_probe_timeout);
        set.insert_opt(keys::LIVENESS_PROBE_PERIOD, self.liveness_probe_period);
        set.insert_opt(keys::LIVENESS_PROBE_THRESHOLD, self.liveness_probe_threshold);
        set.insert_opt(keys::READINESS_PROBE_DELAY, self.readiness_probe_delay);
        set.insert_opt(keys::READINESS_PROBE_TIMEOUT, self.readiness_probe_timeout);
        set.insert_opt(keys::READINESS_PROBE_PERIOD, self.readiness_probe_period);
        set.insert_opt(keys::READINESS_PROBE_THRESHOLD, self.readiness_probe_threshold);

        set.insert_opt(keys::SIDECAR_IMAGE, self.sidecar_image.as_deref());
        set.insert_opt(keys::HTTP_MAX_REQUEST_SIZE, self.max_request_body_size);
        set.insert_opt(keys::HTTP_READ_BUFFER_SIZE, self.http_read_buffer_size);
        set.insert_opt(keys::HTTP_STREAM_REQUEST_BODY, self.http_stream_request_body);
        set.insert_opt(keys::GRACEFUL_SHUTDOWN_SECONDS, self.graceful_shutdown_seconds);
        set.insert_opt(keys::VOLUME_MOUNTS, self.volume_mounts.as_deref());
        set.insert_opt(keys::VOLUME_MOUNTS_RW, self.volume_mounts_rw.as_deref());
        set.insert_opt(keys::DISABLE_BUILTIN_K8S_SECRET_STORE, self.disable_builtin_k8s_secret_store);
        set
    }
}
