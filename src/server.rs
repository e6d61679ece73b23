//! HTTP server for the dashboard page and its form actions

use crate::actions::{self, parse_action_path, ItemAction, Notice};
use crate::catalog::{load_catalog, Catalog};
use crate::dashboard::{self, render_page, Page};
use crate::error::{json_error_response, DashboardErrorCode};
use crate::form::{CreateAppForm, CreateRequest};
use crate::hub::Platform;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HOST, ORIGIN};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(body.into()))
        .expect("valid response with StatusCode enum and static header")
}

/// Settings the request handlers need
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Path the page is served under, without a trailing slash
    pub route: String,
    /// Public hub URL used in app links
    pub base_url: String,
    /// host[:port] values allowed in the Origin header
    pub allowed_origins: Vec<String>,
}

struct DashboardState<P> {
    platform: Arc<P>,
    settings: DashboardSettings,
}

/// Serves the dashboard until the shutdown channel flips to true
pub struct DashboardServer<P> {
    bind_addr: SocketAddr,
    state: Arc<DashboardState<P>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<P: Platform + 'static> DashboardServer<P> {
    pub fn new(
        bind_addr: SocketAddr,
        platform: Arc<P>,
        mut settings: DashboardSettings,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        settings.route = settings.route.trim_end_matches('/').to_string();
        Self {
            bind_addr,
            state: Arc::new(DashboardState { platform, settings }),
            shutdown_rx,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, route = %self.state.settings.route, "Dashboard listening");

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, state).await {
                                    debug!(addr = %addr, error = %e, "Dashboard connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept dashboard connection");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Dashboard shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection<P: Platform + 'static>(
    stream: TcpStream,
    state: Arc<DashboardState<P>>,
) -> anyhow::Result<()> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { handle_request(req, state).await }
    });

    AutoBuilder::new(TokioExecutor::new())
        .serve_connection(io, service)
        .await
        .map_err(|e| anyhow::anyhow!("Dashboard connection error: {}", e))?;

    Ok(())
}

/// `http://host:port` -> `host:port`
fn origin_authority(origin: &str) -> &str {
    let without_scheme = origin
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(origin);
    without_scheme.trim_end_matches('/')
}

/// Requests without an Origin header, same-origin requests and listed origins pass
pub fn origin_allowed<B>(req: &Request<B>, allowed: &[String]) -> bool {
    let origin = match req.headers().get(ORIGIN).and_then(|v| v.to_str().ok()) {
        Some(origin) => origin_authority(origin),
        None => return true,
    };

    let same_origin = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| host.eq_ignore_ascii_case(origin))
        .unwrap_or(false);

    same_origin || allowed.iter().any(|a| a.eq_ignore_ascii_case(origin))
}

async fn handle_request<P: Platform>(
    req: Request<hyper::body::Incoming>,
    state: Arc<DashboardState<P>>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let settings = &state.settings;

    debug!(%method, %path, "Dashboard request");

    match (&method, path.as_str()) {
        (&Method::GET, "/health") => return Ok(json_response(StatusCode::OK, r#"{"status":"ok"}"#)),
        (&Method::GET, "/version") => {
            let version_info = serde_json::json!({
                "name": PKG_NAME,
                "version": VERSION,
            });
            return Ok(json_response(StatusCode::OK, version_info.to_string()));
        }
        _ => {}
    }

    if !origin_allowed(&req, &settings.allowed_origins) {
        let origin = req
            .headers()
            .get(ORIGIN)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        warn!(%origin, %path, "Rejected cross-origin request");
        return Ok(json_error_response(
            DashboardErrorCode::OriginNotAllowed,
            format!("origin {} is not allowed", origin),
        ));
    }

    let rest = match path.strip_prefix(settings.route.as_str()) {
        Some(rest) => rest.to_string(),
        None => {
            return Ok(json_error_response(
                DashboardErrorCode::NotFound,
                format!("no route {}", path),
            ))
        }
    };

    let response = match (&method, rest.as_str()) {
        (&Method::GET, "") | (&Method::GET, "/") => {
            render(&state, CreateAppForm::new(), None, StatusCode::OK).await
        }
        (&Method::GET, "/style.css") => dashboard::serve_css(),
        (&Method::POST, "/create") => {
            let body = req.collect().await?.to_bytes();
            create_app(&state, &body).await
        }
        (method, rest) => match parse_action_path(rest) {
            Some((server_name, ItemAction::Edit)) if method == Method::GET => {
                info!(server = %server_name, "Edit requested");
                let notice = Notice::EditUnavailable { server_name };
                render(&state, CreateAppForm::new(), Some(notice), StatusCode::NOT_IMPLEMENTED)
                    .await
            }
            Some((server_name, action)) if method == Method::POST => {
                item_action(&state, &server_name, action).await
            }
            _ => json_error_response(DashboardErrorCode::NotFound, format!("no route {}", path)),
        },
    };

    Ok(response)
}

async fn render<P: Platform>(
    state: &DashboardState<P>,
    form: CreateAppForm,
    notice: Option<Notice>,
    status: StatusCode,
) -> Response<Full<Bytes>> {
    let catalog = load_catalog(state.platform.as_ref()).await;
    render_with(state, &catalog, &form, notice.as_ref(), status)
}

fn render_with<P>(
    state: &DashboardState<P>,
    catalog: &Catalog,
    form: &CreateAppForm,
    notice: Option<&Notice>,
    status: StatusCode,
) -> Response<Full<Bytes>> {
    let page = render_page(&Page {
        route: &state.settings.route,
        base_url: &state.settings.base_url,
        catalog,
        form,
        notice,
    });
    dashboard::serve_page(status, page)
}

async fn create_app<P: Platform>(
    state: &DashboardState<P>,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let mut form = CreateAppForm::new();

    let request = match CreateRequest::from_form_body(body) {
        Ok(request) => request,
        Err(message) => {
            warn!(%message, "Rejected create form");
            form.fail(CreateRequest::default(), message);
            return render(state, form, None, StatusCode::BAD_REQUEST).await;
        }
    };

    let user = match state.platform.get_user().await {
        Ok(user) => user.name,
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Cannot create app without a hub user");
            form.fail(request, e.to_string());
            return render_with(state, &Catalog::default(), &form, None, StatusCode::OK);
        }
    };

    // Failures are shown inline by the form
    let _ = form
        .submit(state.platform.as_ref(), &user, &state.settings.base_url, request)
        .await;

    render(state, form, None, StatusCode::OK).await
}

/// Start, stop or delete one app, then show the refreshed list with the outcome
async fn item_action<P: Platform>(
    state: &DashboardState<P>,
    server_name: &str,
    action: ItemAction,
) -> Response<Full<Bytes>> {
    let platform = state.platform.as_ref();
    let notice = match platform.get_user().await {
        Ok(user) => match action {
            ItemAction::Start => actions::start_app(platform, &user, server_name).await,
            ItemAction::Stop => actions::stop_app(platform, &user.name, server_name).await,
            ItemAction::Delete => actions::delete_app(platform, &user.name, server_name).await,
            ItemAction::Edit => Notice::EditUnavailable {
                server_name: server_name.to_string(),
            },
        },
        Err(e) => {
            warn!(server = %server_name, error = %e, kind = e.kind(), "No hub user for app action");
            Notice::Failed {
                action,
                server_name: server_name.to_string(),
                message: e.to_string(),
            }
        }
    };

    // Re-fetch so the list reflects the change
    render(state, CreateAppForm::new(), Some(notice), StatusCode::OK).await
}
