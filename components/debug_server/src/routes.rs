//! Route table and handlers for the `/debug/profiling/` namespace

use axum::extract::{Path, Query, RawQuery, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use profiler_runtime::{parse_addresses, resolve_symbol, CpuSampler, HeapSnapshotter, ProfileFormat};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DebugServerConfig;
use crate::error::{DebugServerError, Result};

/// Path prefix every debug route lives under
pub const ROUTE_PREFIX: &str = "/debug/profiling";

/// Named profiles served by the index catch-all
const NAMED_PROFILES: &[(&str, &str)] = &[(
    "heap",
    "A sampling of memory allocations of live objects, taken from the allocator profiler.",
)];

/// Shared state handed to every handler
///
/// Handlers only talk to the process-wide runtime backends, never to capture
/// session state.
#[derive(Clone)]
pub struct DebugState {
    cpu: Arc<dyn CpuSampler>,
    heap: Arc<dyn HeapSnapshotter>,
    config: Arc<DebugServerConfig>,
}

impl DebugState {
    /// Create handler state over the given runtime backends
    pub fn new(
        config: DebugServerConfig,
        cpu: Arc<dyn CpuSampler>,
        heap: Arc<dyn HeapSnapshotter>,
    ) -> Self {
        Self {
            cpu,
            heap,
            config: Arc::new(config),
        }
    }

    /// Configuration the handlers run with
    pub fn config(&self) -> &DebugServerConfig {
        &self.config
    }
}

/// Query string accepted by the sampling endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DurationQuery {
    /// Sampling window in seconds; absent or zero selects the default
    pub seconds: Option<u64>,
}

/// Build the debug router
pub fn router(state: DebugState) -> Router {
    Router::new()
        .route("/debug/profiling/", get(index))
        .route("/debug/profiling/cmdline", get(cmdline))
        .route("/debug/profiling/profile", get(profile))
        .route(
            "/debug/profiling/symbol",
            get(symbol_from_query).post(symbol_from_body),
        )
        .route("/debug/profiling/trace", get(trace))
        // Any other single segment resolves through the index handler
        .route("/debug/profiling/{name}", get(named_profile))
        .with_state(state)
}

/// Stops the sampler if the request is dropped mid-window
struct SamplingWindow {
    sampler: Arc<dyn CpuSampler>,
    finished: bool,
}

impl SamplingWindow {
    fn open(sampler: Arc<dyn CpuSampler>) -> Result<Self> {
        sampler.start()?;
        Ok(Self {
            sampler,
            finished: false,
        })
    }

    fn close(mut self, format: ProfileFormat) -> Result<Vec<u8>> {
        self.finished = true;
        Ok(self.sampler.stop(format)?)
    }
}

impl Drop for SamplingWindow {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Sampling request abandoned, detaching sampler");
            let _ = self.sampler.stop(ProfileFormat::Pprof);
        }
    }
}

fn resolve_seconds(requested: Option<u64>, default: u64, max: u64) -> Result<u64> {
    let seconds = match requested {
        None | Some(0) => default,
        Some(seconds) => seconds,
    };
    if seconds > max {
        return Err(DebugServerError::DurationTooLong {
            requested: seconds,
            max,
        });
    }
    Ok(seconds)
}

async fn sample(state: &DebugState, seconds: u64, format: ProfileFormat) -> Result<Vec<u8>> {
    let window = SamplingWindow::open(Arc::clone(&state.cpu))?;
    info!(seconds, ?format, "Sampling CPU for debug request");
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    window.close(format)
}

fn attachment(content_type: &str, filename: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        body,
    )
        .into_response()
}

async fn index(State(state): State<DebugState>) -> Html<String> {
    let heap_available = state.heap.is_available().await;

    let mut page = String::new();
    page.push_str("<html>\n<head>\n<title>/debug/profiling/</title>\n</head>\n<body>\n");
    page.push_str("/debug/profiling/\n<br>\n<br>\n");
    page.push_str("Types of profiles available:\n<table>\n<thead><td>Available</td><td>Profile</td></thead>\n");
    for (name, _) in NAMED_PROFILES {
        let available = if heap_available { "yes" } else { "no" };
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td><a href=\"{}\">{}</a></td></tr>",
            available, name, name
        );
    }
    page.push_str("</table>\n");
    page.push_str("<a href=\"profile\">CPU profile</a> (<code>?seconds=N</code>)<br>\n");
    page.push_str("<a href=\"trace\">trace</a> (<code>?seconds=N</code>)<br>\n");
    page.push_str("<a href=\"cmdline\">cmdline</a><br>\n");
    page.push_str("<a href=\"symbol\">symbol</a><br>\n");
    page.push_str("<br>\n<p>\nProfile Descriptions:\n<ul>\n");
    for (name, description) in NAMED_PROFILES {
        let _ = writeln!(page, "<li><div class=profile-name>{}: </div> {}</li>", name, description);
    }
    page.push_str("</ul>\n</p>\n</body>\n</html>\n");

    Html(page)
}

async fn named_profile(State(state): State<DebugState>, Path(name): Path<String>) -> Result<Response> {
    match name.as_str() {
        "heap" => {
            let snapshot = state.heap.snapshot().await?;
            Ok(attachment("application/octet-stream", "heap", snapshot))
        }
        _ => Err(DebugServerError::UnknownProfile(name)),
    }
}

async fn cmdline() -> Response {
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        args.join("\0"),
    )
        .into_response()
}

async fn profile(State(state): State<DebugState>, Query(query): Query<DurationQuery>) -> Result<Response> {
    let config = state.config();
    let seconds = resolve_seconds(
        query.seconds,
        config.default_profile_seconds,
        config.max_profile_seconds,
    )?;
    let bytes = sample(&state, seconds, ProfileFormat::Pprof).await?;
    Ok(attachment("application/octet-stream", "profile", bytes))
}

async fn trace(State(state): State<DebugState>, Query(query): Query<DurationQuery>) -> Result<Response> {
    let config = state.config();
    let seconds = resolve_seconds(
        query.seconds,
        config.default_trace_seconds,
        config.max_profile_seconds,
    )?;
    let svg = sample(&state, seconds, ProfileFormat::Flamegraph).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

fn symbol_report(input: &str) -> Response {
    let mut body = String::from("num_symbols: 1\n");
    for addr in parse_addresses(input) {
        if addr == 0 {
            continue;
        }
        if let Some(name) = resolve_symbol(addr) {
            let _ = writeln!(body, "{:#x} {}", addr, name);
        }
    }
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

async fn symbol_from_query(RawQuery(query): RawQuery) -> Response {
    symbol_report(query.as_deref().unwrap_or_default())
}

async fn symbol_from_body(body: String) -> Response {
    symbol_report(&body)
}
