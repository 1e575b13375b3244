//! Observability wiring for the marketplace service.
//!
//! # Purpose
//! Initializes tracing with optional OTLP export, W3C trace-context
//! extraction for incoming requests, and the Prometheus recorder behind
//! `/metrics`. Also owns the auth counters:
//! `duka_auth_rejections_total{stage}`, `duka_sessions_issued_total{role}`
//! and `duka_policy_denials_total{reason}`.
//!
//! # Notes
//! Initialization is guarded by `OnceLock` so tests can call it repeatedly.
use duka_authz::{DenyReason, Role};
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static OBS_INIT: OnceLock<()> = OnceLock::new();
static PROPAGATOR_INIT: OnceLock<()> = OnceLock::new();

pub fn init_observability(service_name: &str) -> PrometheusHandle {
    OBS_INIT.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );

        let provider = build_tracer_provider(service_name);
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer();
        let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);
        if let Some(provider) = provider {
            let tracer = provider.tracer(service_name.to_string());
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            let _ = registry.with(otel_layer).try_init();
        } else {
            let _ = registry.try_init();
        }
    });

    install_metrics_recorder()
}

fn build_tracer_provider(
    service_name: &str,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
        .ok()?;
    Some(
        opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

/// Resource attributes read from the environment, keyed by OTel name.
const RESOURCE_ENV: &[(&str, &[&str])] = &[
    ("service.instance.id", &["DUKA_SERVICE_INSTANCE_ID", "HOSTNAME"]),
    ("k8s.cluster.name", &["K8S_CLUSTER_NAME"]),
    ("k8s.namespace.name", &["K8S_NAMESPACE_NAME"]),
    ("k8s.pod.name", &["K8S_POD_NAME"]),
    ("deployment.environment", &["DEPLOYMENT_ENVIRONMENT"]),
];

fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let mut attrs = vec![KeyValue::new("service.name", service_name.to_string())];
    attrs.extend(RESOURCE_ENV.iter().filter_map(|(key, vars)| {
        vars.iter()
            .find_map(|var| std::env::var(var).ok())
            .filter(|value| !value.trim().is_empty())
            .map(|value| KeyValue::new(*key, value))
    }));
    attrs
}

pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    PROPAGATOR_INIT.get_or_init(|| {
        global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
    });
    global::get_text_map_propagator(|prop| prop.extract(&HeaderMapExtractor(headers)))
}

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderMapExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Serve `/metrics` on its own listener until `shutdown` resolves.
pub async fn serve_metrics<F>(
    handle: PrometheusHandle,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listener bound");
    serve_metrics_with_listener(handle, listener, shutdown).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    );
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn record_auth_rejection(stage: &'static str) {
    metrics::counter!("duka_auth_rejections_total", "stage" => stage).increment(1);
}

pub fn record_session_issued(role: Role) {
    metrics::counter!("duka_sessions_issued_total", "role" => role.as_str()).increment(1);
}

pub fn record_policy_denial(reason: DenyReason) {
    metrics::counter!("duka_policy_denials_total", "reason" => reason.as_str()).increment(1);
}

fn install_metrics_recorder() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(err) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %err, "metrics recorder already installed");
            }
            handle
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{TraceContextExt, TraceId};
    use serial_test::serial;
    use std::time::Duration;

    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn with_env<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        let previous: Vec<_> = vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        let out = f();
        for (key, value) in previous {
            match value {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
        out
    }

    fn attribute(attrs: &[KeyValue], key: &str) -> Option<String> {
        attrs
            .iter()
            .find(|attr| attr.key.as_str() == key)
            .map(|attr| attr.value.to_string())
    }

    #[test]
    #[serial]
    fn resource_attributes_read_deployment_env() {
        let attrs = with_env(
            &[
                ("DUKA_SERVICE_INSTANCE_ID", Some("mkt-7")),
                ("K8S_NAMESPACE_NAME", Some("duka")),
                ("DEPLOYMENT_ENVIRONMENT", Some("staging")),
                ("K8S_POD_NAME", Some("  ")),
            ],
            || resource_attributes("marketplace"),
        );
        assert_eq!(attribute(&attrs, "service.name").as_deref(), Some("marketplace"));
        assert_eq!(attribute(&attrs, "service.instance.id").as_deref(), Some("mkt-7"));
        assert_eq!(attribute(&attrs, "k8s.namespace.name").as_deref(), Some("duka"));
        assert_eq!(
            attribute(&attrs, "deployment.environment").as_deref(),
            Some("staging")
        );
        assert_eq!(attribute(&attrs, "k8s.pod.name"), None);
    }

    #[test]
    #[serial]
    fn instance_id_falls_back_to_hostname() {
        let attrs = with_env(
            &[("DUKA_SERVICE_INSTANCE_ID", None), ("HOSTNAME", Some("node-3"))],
            || resource_attributes("marketplace"),
        );
        assert_eq!(attribute(&attrs, "service.instance.id").as_deref(), Some("node-3"));
    }

    #[test]
    fn trace_context_is_taken_from_traceparent() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("traceparent", TRACEPARENT.parse().expect("header"));
        headers.insert(
            "x-broken",
            axum::http::HeaderValue::from_bytes(b"\xFF").expect("header"),
        );
        assert!(HeaderMapExtractor(&headers).get("x-broken").is_none());

        let context = trace_context_from_headers(&headers);
        let span = context.span();
        assert_eq!(
            span.span_context().trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").expect("trace id")
        );
    }

    #[test]
    #[serial]
    fn auth_counters_render() {
        let handle = install_metrics_recorder();
        record_auth_rejection("verify");
        record_session_issued(Role::Admin);
        record_policy_denial(DenyReason::NotOwner);
        let rendered = handle.render();
        assert!(rendered.contains("duka_auth_rejections_total"));
        assert!(rendered.contains("duka_sessions_issued_total"));
        assert!(rendered.contains("reason=\"not_owner\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[serial]
    async fn metrics_endpoint_serves_rendered_counters() {
        let handle = init_observability("marketplace-test");
        record_auth_rejection("extract");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_metrics_with_listener(handle, listener, async move {
            let _ = shutdown_rx.await;
        }));

        let body = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .no_proxy()
            .build()
            .expect("client")
            .get(format!("http://{addr}/metrics"))
            .send()
            .await
            .expect("GET /metrics")
            .text()
            .await
            .expect("body");
        assert!(body.contains("duka_auth_rejections_total"));

        let _ = shutdown_tx.send(());
        let _ = tokio::time::timeout(Duration::from_secs(1), server).await;
    }
}
