//! Server-rendered dashboard page
//!
//! One page with the create form on the left and the user's apps on the
//! right. The stylesheet is a static asset served from `<route>/style.css`.

use crate::actions::{action_path, view_url, ItemAction, Notice};
use crate::catalog::{AppItem, AppStatus, Catalog, Framework};
use crate::form::{CreateAppForm, FormOutcome};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use maud::{html, Markup, PreEscaped, DOCTYPE};

/// Everything needed to render the page once
pub struct Page<'a> {
    pub route: &'a str,
    /// Hub base URL, prefixed to server paths for "View"
    pub base_url: &'a str,
    pub catalog: &'a Catalog,
    pub form: &'a CreateAppForm,
    pub notice: Option<&'a Notice>,
}

/// Serve a rendered page with the given status
pub fn serve_page(status: StatusCode, page: Markup) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Full::new(Bytes::from(page.into_string())))
        .expect("valid response with StatusCode enum and static header")
}

/// Serve dashboard CSS
pub fn serve_css() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/css")
        .body(Full::new(Bytes::from(DASHBOARD_CSS)))
        .expect("valid response with static header")
}

pub fn render_page(page: &Page<'_>) -> Markup {
    let route = page.route.trim_end_matches('/');

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "App Launcher" }
                link rel="stylesheet" href={ (route) "/style.css" };
            }
            body {
                nav.navbar {
                    div.nav-brand { h1 { "App Launcher" } }
                    div.nav-user { (page.catalog.user.as_deref().unwrap_or("")) }
                }
                main.container {
                    @if let Some(notice) = page.notice {
                        div class=(if notice.is_error() { "notice error" } else { "notice success" }) {
                            (notice.message())
                        }
                    }
                    div.layout {
                        (render_form(route, page.form))
                        (render_catalog(route, page.base_url, &page.catalog.items))
                    }
                }
                script { (PreEscaped(SUBMIT_JS)) }
            }
        }
    }
}

fn render_form(route: &str, form: &CreateAppForm) -> Markup {
    let values = form.values();

    html! {
        section class="panel create-form" {
            h2 { "Create Apps" }
            form id="create-app-form" method="post" action={ (route) "/create" } {
                div.form-group {
                    label for="app-name" { "Name" }
                    input type="text" id="app-name" name="name" value=(values.name);
                }
                div.form-group {
                    label for="app-filepath" { "Filepath" }
                    input type="text" id="app-filepath" name="filepath" value=(values.filepath);
                }
                div.form-group {
                    label for="app-description" { "Description" }
                    textarea id="app-description" name="description" { (values.description) }
                }
                div.form-group {
                    label for="app-framework" { "Framework" }
                    select id="app-framework" name="framework" {
                        @for framework in Framework::ALL {
                            option value=(framework.id()) selected[framework.id() == values.framework] {
                                (framework.display_name())
                            }
                        }
                    }
                }
                div.form-actions {
                    button type="submit" id="create-app-button" class="btn btn-primary" disabled[!form.submit_enabled()] {
                        "Create Dashboard"
                    }
                    span id="create-app-spinner" class="spinner" hidden {}
                }
            }
            @match form.outcome() {
                FormOutcome::Idle => {}
                FormOutcome::Created { link } => {
                    div class="form-result success" {
                        "Dashboard created: "
                        a href=(link) target="_blank" rel="noopener" { (link) }
                    }
                }
                FormOutcome::Failed { message } => {
                    div class="form-result error" { (message) }
                }
            }
        }
    }
}

fn render_catalog(route: &str, base_url: &str, items: &[AppItem]) -> Markup {
    html! {
        section class="panel app-list" {
            h2 { "Your Apps" }
            @if items.is_empty() {
                div.empty-state { p { "No apps yet" } }
            }
            @for item in items {
                (render_item(route, base_url, item))
            }
        }
    }
}

fn render_item(route: &str, base_url: &str, item: &AppItem) -> Markup {
    let status_class = match item.status {
        AppStatus::Ready => "status-ready",
        AppStatus::Pending => "status-pending",
        AppStatus::Stopped => "status-stopped",
    };
    let can_start = item.status.can_start();

    html! {
        div class="list-item" {
            @match item.logo {
                Some(src) => {
                    img.app-logo src=(src) alt="";
                }
                None => {
                    span.app-logo {}
                }
            }
            strong class="app-description" { (item.description) }
            span class={ "status-badge " (status_class) } { (item.status.label()) }
            a class="btn btn-primary" href=(view_url(base_url, &item.link)) target="_blank" rel="noopener" {
                "View"
            }
            form.inline-form method="post" action=(action_path(route, &item.server_name, ItemAction::Start)) {
                button type="submit" class="btn btn-success" disabled[!can_start] { "Start" }
            }
            form.inline-form method="post" action=(action_path(route, &item.server_name, ItemAction::Stop)) {
                button type="submit" class="btn btn-secondary" disabled[can_start] { "Stop" }
            }
            a class="btn btn-warning" href=(action_path(route, &item.server_name, ItemAction::Edit)) {
                "Edit"
            }
            form.inline-form method="post" action=(action_path(route, &item.server_name, ItemAction::Delete)) {
                button type="submit" class="btn btn-danger" { "Delete" }
            }
        }
    }
}

/// Disables the create button and shows the spinner while the request is in flight
const SUBMIT_JS: &str = r#"
document.getElementById("create-app-form").addEventListener("submit", function () {
    document.getElementById("create-app-button").disabled = true;
    document.getElementById("create-app-spinner").hidden = false;
});
"#;

const DASHBOARD_CSS: &str = r##"
:root {
    --primary: #6366f1;
    --primary-dark: #4f46e5;
    --success: #10b981;
    --warning: #f59e0b;
    --danger: #ef4444;
    --gray-100: #f3f4f6;
    --gray-200: #e5e7eb;
    --gray-300: #d1d5db;
    --gray-500: #6b7280;
    --gray-700: #374151;
    --gray-800: #1f2937;
    --gray-900: #111827;
}

* {
    box-sizing: border-box;
    margin: 0;
    padding: 0;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: var(--gray-100);
    color: var(--gray-800);
    line-height: 1.5;
}

.navbar {
    background: var(--gray-900);
    color: white;
    padding: 0 1.5rem;
    height: 60px;
    display: flex;
    align-items: center;
    justify-content: space-between;
}

.nav-brand h1 {
    font-size: 1.25rem;
    font-weight: 600;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 1.5rem;
}

.layout {
    display: flex;
    gap: 1.5rem;
    align-items: flex-start;
}

.panel {
    background: white;
    border-radius: 0.5rem;
    padding: 1.25rem;
    box-shadow: 0 1px 3px rgba(0,0,0,0.1);
}

.panel h2 {
    font-size: 1.25rem;
    font-weight: 600;
    margin-bottom: 1rem;
}

.create-form {
    width: 400px;
    flex-shrink: 0;
}

.app-list {
    flex: 1;
}

.list-item {
    display: flex;
    align-items: center;
    gap: 0.75rem;
    border: 1px solid #e0e0e0;
    padding: 5px;
    border-radius: 4px;
    width: 100%;
    margin-bottom: 0.5rem;
}

.app-logo {
    width: 50px;
    min-width: 50px;
}

.app-description {
    flex: 1;
    margin: 0 20px 0 10px;
}

.status-badge {
    padding: 0.25rem 0.5rem;
    border-radius: 9999px;
    font-size: 0.75rem;
    font-weight: 500;
}

.status-ready {
    background: #d1fae5;
    color: #065f46;
}

.status-pending {
    background: #fef3c7;
    color: #92400e;
}

.status-stopped {
    background: var(--gray-200);
    color: var(--gray-700);
}

.btn {
    display: inline-flex;
    align-items: center;
    padding: 0.5rem 1rem;
    border: none;
    border-radius: 0.375rem;
    font-size: 0.875rem;
    font-weight: 500;
    cursor: pointer;
    text-decoration: none;
}

.btn:disabled {
    opacity: 0.5;
    cursor: not-allowed;
}

.btn-primary {
    background: var(--primary);
    color: white;
}

.btn-primary:hover {
    background: var(--primary-dark);
}

.btn-warning {
    background: var(--warning);
    color: white;
}

.btn-danger {
    background: var(--danger);
    color: white;
}

.btn-success {
    background: var(--success);
    color: white;
}

.btn-secondary {
    background: var(--gray-500);
    color: white;
}

.inline-form {
    display: inline;
}

.form-group {
    margin-bottom: 1rem;
}

.form-group label {
    display: block;
    font-size: 0.875rem;
    font-weight: 500;
    margin-bottom: 0.25rem;
    color: var(--gray-700);
}

.form-group input,
.form-group select,
.form-group textarea {
    width: 100%;
    padding: 0.5rem 0.75rem;
    border: 1px solid var(--gray-300);
    border-radius: 0.375rem;
    font-size: 0.875rem;
}

.form-actions {
    display: flex;
    align-items: center;
    gap: 0.5rem;
}

.spinner {
    width: 30px;
    height: 30px;
    border: 3px solid var(--gray-300);
    border-top-color: var(--gray-700);
    border-radius: 50%;
    animation: spin 1s linear infinite;
}

@keyframes spin {
    to { transform: rotate(360deg); }
}

.form-result,
.notice {
    margin-top: 1rem;
    padding: 0.75rem 1rem;
    border-radius: 0.375rem;
}

.notice {
    margin: 0 0 1rem 0;
}

.success {
    background: #d1fae5;
    color: #065f46;
}

.error {
    background: #fee2e2;
    color: #991b1b;
}

.empty-state {
    text-align: center;
    padding: 3rem;
    color: var(--gray-500);
}
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::logo_for;

    const HUB: &str = "http://localhost:8000";

    fn item(name: &str, description: &str, status: AppStatus) -> AppItem {
        AppItem {
            server_name: name.to_string(),
            logo: logo_for("panel"),
            description: description.to_string(),
            link: format!("/user/alice/{}/", name),
            status,
        }
    }

    fn render(catalog: &Catalog, form: &CreateAppForm, notice: Option<&Notice>) -> String {
        render_page(&Page {
            route: "/app/",
            base_url: HUB,
            catalog,
            form,
            notice,
        })
        .into_string()
    }

    #[test]
    fn test_empty_page() {
        let html = render(&Catalog::default(), &CreateAppForm::new(), None);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("No apps yet"));
        assert_eq!(html.matches("class=\"list-item\"").count(), 0);
        assert!(html.contains(r#"action="/app/create""#));
        assert!(html.contains(r#"href="/app/style.css""#));
        assert!(html.contains(r#"id="create-app-button" class="btn btn-primary">"#));
        assert_eq!(html.matches("<option ").count(), Framework::ALL.len());
        assert!(html.contains(r#"<option value="plotlydash">Plotly</option>"#));
    }

    #[test]
    fn test_catalog_rows_and_actions() {
        let catalog = Catalog {
            user: Some("alice".to_string()),
            items: vec![
                item("demo", "Demo app", AppStatus::Ready),
                item("sales", "Sales", AppStatus::Stopped),
            ],
        };
        let html = render(&catalog, &CreateAppForm::new(), None);

        assert_eq!(html.matches("class=\"list-item\"").count(), 2);
        assert!(html.contains(r#"href="http://localhost:8000/user/alice/demo/" target="_blank""#));
        assert!(html.contains(r#"href="/app/apps/demo/edit""#));
        assert!(html.contains(r#"action="/app/apps/sales/delete""#));
        assert!(html.contains(r#"action="/app/apps/sales/start""#));
        assert!(html.contains("Demo app"));
        assert!(!html.contains("No apps yet"));
    }

    #[test]
    fn test_start_and_stop_follow_status() {
        for (status, start_disabled, stop_disabled) in [
            (AppStatus::Ready, true, false),
            (AppStatus::Pending, true, false),
            (AppStatus::Stopped, false, true),
        ] {
            let html = render_item("/app", HUB, &item("demo", "Demo", status)).into_string();
            assert_eq!(
                html.contains(r#"class="btn btn-success" disabled>Start"#),
                start_disabled
            );
            assert_eq!(
                html.contains(r#"class="btn btn-secondary" disabled>Stop"#),
                stop_disabled
            );
        }
    }

    #[test]
    fn test_user_text_is_escaped() {
        let catalog = Catalog {
            user: Some("alice".to_string()),
            items: vec![item("x", "<script>alert(1)</script>", AppStatus::Ready)],
        };
        let mut form = CreateAppForm::new();
        form.fail(Default::default(), "bad \"name\" <b>");
        let html = render(&catalog, &form, None);

        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("bad &quot;name&quot; &lt;b&gt;"));
    }

    #[test]
    fn test_notice_rendering() {
        let notice = Notice::Failed {
            action: ItemAction::Delete,
            server_name: "demo".to_string(),
            message: "not found: demo".to_string(),
        };
        let html = render(&Catalog::default(), &CreateAppForm::new(), Some(&notice));

        assert!(html.contains(r#"class="notice error""#));
        assert!(html.contains("Could not delete app demo: not found: demo"));
    }
}
