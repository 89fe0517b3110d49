use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sidecar_annotate::{AnnotateOptions, Engine, RunReport};
use sidecar_core::TargetSelector;
use tracing::info;

mod input;

#[derive(Parser, Debug)]
#[command(name = "sidecarctl", version, about = "Sidecar runtime operations CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add sidecar annotations to one workload in a manifest stream and print the result
    Annotate(AnnotateArgs),
}

#[derive(Args, Debug)]
struct AnnotateArgs {
    /// Manifest inputs: files, directories, http(s) URLs, or "-" for stdin (default: stdin)
    inputs: Vec<String>,

    /// Name of the resource to annotate (default: first supported workload)
    #[arg(short = 'r', long = "resource")]
    resource: Option<String>,

    /// Namespace of the resource to annotate; requires --resource
    #[arg(short = 'n', long = "namespace")]
    namespace: Option<String>,

    /// YAML file with sidecar settings (kebab-case keys); flags override it
    #[arg(long = "options-file")]
    options_file: Option<String>,

    #[command(flatten)]
    settings: SidecarFlags,
}

/// Sidecar settings. Unset flags add no annotation.
#[derive(Args, Debug, Default)]
struct SidecarFlags {
    /// Application id
    #[arg(short = 'a', long = "app-id")]
    app_id: Option<String>,
    /// Configuration resource to use
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Port the application listens on
    #[arg(short = 'p', long = "app-port")]
    app_port: Option<u16>,
    /// Application protocol (http, grpc, https, grpcs, h2c)
    #[arg(long = "app-protocol")]
    app_protocol: Option<String>,
    /// Talk to the application over TLS
    #[arg(long = "app-ssl", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    app_ssl: Option<bool>,
    /// Maximum concurrent requests delivered to the application
    #[arg(long = "max-concurrency")]
    app_max_concurrency: Option<u32>,
    /// Comma separated addresses the sidecar listens on
    #[arg(long = "listen-addresses")]
    listen_addresses: Option<String>,
    /// Directory for unix domain sockets
    #[arg(long = "unix-domain-socket-path")]
    unix_domain_socket_path: Option<String>,
    /// Placement service address
    #[arg(long = "placement-host-address")]
    placement_host_address: Option<String>,

    /// Sidecar log level
    #[arg(long = "log-level")]
    log_level: Option<String>,
    /// Emit sidecar logs as JSON
    #[arg(long = "log-as-json", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    log_as_json: Option<bool>,
    /// Log every API call
    #[arg(long = "enable-api-logging", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    enable_api_logging: Option<bool>,
    /// Expose sidecar metrics
    #[arg(long = "enable-metrics", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    enable_metrics: Option<bool>,
    /// Metrics port
    #[arg(long = "metrics-port")]
    metrics_port: Option<u16>,
    /// Run the sidecar under a debugger
    #[arg(long = "enable-debug", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    enable_debug: Option<bool>,
    /// Debugger port
    #[arg(long = "debug-port")]
    debug_port: Option<u16>,
    /// Expose the profiling endpoint
    #[arg(long = "enable-profile", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    enable_profiling: Option<bool>,

    /// Extra environment variables for the sidecar (KEY=VALUE,...)
    #[arg(long = "env")]
    env: Option<String>,
    /// Secret holding the API token
    #[arg(long = "api-token-secret")]
    api_token_secret: Option<String>,
    /// Secret holding the app token
    #[arg(long = "app-token-secret")]
    app_token_secret: Option<String>,

    #[arg(long = "cpu-limit")]
    cpu_limit: Option<String>,
    #[arg(long = "memory-limit")]
    memory_limit: Option<String>,
    #[arg(long = "cpu-request")]
    cpu_request: Option<String>,
    #[arg(long = "memory-request")]
    memory_request: Option<String>,

    #[arg(long = "liveness-probe-delay")]
    liveness_probe_delay: Option<u32>,
    #[arg(long = "liveness-probe-timeout")]
    liveness_probe_timeout: Option<u32>,
    #[arg(long = "liveness-probe-period")]
    liveness_probe_period: Option<u32>,
    #[arg(long = "liveness-probe-threshold")]
    liveness_probe_threshold: Option<u32>,
    #[arg(long = "readiness-probe-delay")]
    readiness_probe_delay: Option<u32>,
    #[arg(long = "readiness-probe-timeout")]
    readiness_probe_timeout: Option<u32>,
    #[arg(long = "readiness-probe-period")]
    readiness_probe_period: Option<u32>,
    #[arg(long = "readiness-probe-threshold")]
    readiness_probe_threshold: Option<u32>,

    /// Override the sidecar container image
    #[arg(long = "sidecar-image")]
    sidecar_image: Option<String>,
    /// Maximum request body size in MB
    #[arg(long = "max-request-body-size")]
    max_request_body_size: Option<u32>,
    /// HTTP read buffer size in KB
    #[arg(long = "http-read-buffer-size")]
    http_read_buffer_size: Option<u32>,
    /// Stream request bodies instead of buffering them
    #[arg(long = "http-stream-request-body", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    http_stream_request_body: Option<bool>,
    /// Seconds to wait for in-flight work on shutdown
    #[arg(long = "graceful-shutdown-seconds")]
    graceful_shutdown_seconds: Option<u32>,
    /// Read-only volume mounts (name:path,...)
    #[arg(long = "volume-mounts")]
    volume_mounts: Option<String>,
    /// Read-write volume mounts (name:path,...)
    #[arg(long = "volume-mounts-rw")]
    volume_mounts_rw: Option<String>,
    /// Disable the built-in Kubernetes secret store
    #[arg(long = "disable-builtin-k8s-secret-store", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    disable_builtin_k8s_secret_store: Option<bool>,
}

impl From<SidecarFlags> for AnnotateOptions {
    fn from(f: SidecarFlags) -> Self {
        AnnotateOptions {
            app_id: f.app_id,
            config: f.config,
            app_port: f.app_port,
            app_protocol: f.app_protocol,
            app_ssl: f.app_ssl,
            app_max_concurrency: f.app_max_concurrency,
            listen_addresses: f.listen_addresses,
            unix_domain_socket_path: f.unix_domain_socket_path,
            placement_host_address: f.placement_host_address,
            log_level: f.log_level,
            log_as_json: f.log_as_json,
            enable_api_logging: f.enable_api_logging,
            enable_metrics: f.enable_metrics,
            metrics_port: f.metrics_port,
            enable_debug: f.enable_debug,
            debug_port: f.debug_port,
            enable_profiling: f.enable_profiling,
            env: f.env,
            api_token_secret: f.api_token_secret,
            app_token_secret: f.app_token_secret,
            cpu_limit: f.cpu_limit,
            memory_limit: f.memory_limit,
            cpu_request: f.cpu_request,
            memory_request: f.memory_request,
            liveness_probe_delay: f.liveness_probe_delay,
            liveness_probe_timeout: f.liveness_probe_timeout,
            liveness_probe_period: f.liveness_probe_period,
            liveness_probe_threshold: f.liveness_probe_threshold,
            readiness_probe_delay: f.readiness_probe_delay,
            readiness_probe_timeout: f.readiness_probe_timeout,
            readiness_probe_period: f.readiness_probe_period,
            readiness_probe_threshold: f.readiness_probe_threshold,
            sidecar_image: f.sidecar_image,
            max_request_body_size: f.max_request_body_size,
            http_read_buffer_size: f.http_read_buffer_size,
            http_stream_request_body: f.http_stream_request_body,
            graceful_shutdown_seconds: f.graceful_shutdown_seconds,
            volume_mounts: f.volume_mounts,
            volume_mounts_rw: f.volume_mounts_rw,
            disable_builtin_k8s_secret_store: f.disable_builtin_k8s_secret_store,
        }
    }
}

fn init_tracing() {
    // stdout carries the manifest stream; logs go to stderr
    let env = std::env::var("SIDECARCTL_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("SIDECARCTL_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid SIDECARCTL_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_options_file(path: &Path) -> Result<AnnotateOptions> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading options file {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing options file {}", path.display()))
}

/// Flags layered over the optional options file.
fn resolve_options(args: &mut AnnotateArgs) -> Result<AnnotateOptions> {
    let flags = AnnotateOptions::from(std::mem::take(&mut args.settings));
    match args.options_file.as_deref() {
        Some(path) => load_options_file(Path::new(path))?.overlay(flags).context("merging options file with flags"),
        None => Ok(flags),
    }
}

async fn run_annotate(mut args: AnnotateArgs) -> Result<()> {
    let selector = TargetSelector { resource: args.resource.take(), namespace: args.namespace.take() };
    let options = resolve_options(&mut args)?;
    info!(selector = ?selector, "annotate invoked");
    // validates the selector before any input is touched
    let engine = Engine::new(selector, options)?;

    let sources = input::resolve(&args.inputs)?;
    let timeout = input::http_timeout();
    let handle = tokio::runtime::Handle::current();
    // inputs stream through blocking reads; keep them off the runtime workers
    let report = tokio::task::spawn_blocking(move || -> Result<RunReport> {
        let readers = input::readers(sources, timeout, handle)?;
        let stdout = std::io::stdout();
        Ok(engine.run(readers, BufWriter::new(stdout.lock()))?)
    })
    .await
    .context("annotate worker failed")??;
    match report.target {
        Some(t) => info!(documents = report.documents, target = %t, "annotated"),
        None => info!(documents = report.documents, "no resource annotated"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match cli.command {
        Commands::Annotate(args) => run_annotate(args).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> AnnotateArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Annotate(a) => a,
        }
    }

    #[test]
    fn flags_map_onto_options() {
        let mut args = parse(&[
            "sidecarctl", "annotate", "-r", "web", "-n", "prod", "--app-id", "web", "-p", "3000",
            "--enable-metrics", "--log-as-json=false", "--cpu-limit", "0.5", "deploy.yaml", "-",
        ]);
        assert_eq!(args.inputs, vec!["deploy.yaml".to_string(), "-".to_string()]);
        assert_eq!(args.resource.as_deref(), Some("web"));
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        let opts = resolve_options(&mut args).unwrap();
        assert_eq!(opts.app_id.as_deref(), Some("web"));
        assert_eq!(opts.app_port, Some(3000));
        assert_eq!(opts.enable_metrics, Some(true));
        assert_eq!(opts.log_as_json, Some(false));
        assert_eq!(opts.cpu_limit.as_deref(), Some("0.5"));
        assert_eq!(opts.enable_debug, None);
    }

    #[test]
    fn options_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sidecar.yaml");
        std::fs::write(&file, "app-id: from-file\nmetrics-port: 9091\n").unwrap();
        let mut args = parse(&["sidecarctl", "annotate", "--options-file", file.to_str().unwrap(), "--app-id", "from-flag"]);
        let opts = resolve_options(&mut args).unwrap();
        assert_eq!(opts.app_id.as_deref(), Some("from-flag"));
        assert_eq!(opts.metrics_port, Some(9091));
    }

    #[test]
    fn unknown_options_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.yaml");
        std::fs::write(&file, "app-idd: typo\n").unwrap();
        let err = load_options_file(&file).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing options file"), "{:#}", err);
    }

    #[test]
    fn namespace_without_resource_fails_before_inputs() {
        let args = parse(&["sidecarctl", "annotate", "-n", "prod", "/definitely/not/here.yaml"]);
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = rt.block_on(run_annotate(args)).unwrap_err();
        let err = err.downcast::<sidecar_core::AnnotateError>().unwrap();
        assert!(matches!(err, sidecar_core::AnnotateError::Configuration(_)));
    }
}
