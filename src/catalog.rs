//! The "Your Apps" list: hub servers tagged as apps, turned into display entries

use crate::hub::{Platform, ServerRecord, User};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Dashboard frameworks an app can be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Panel,
    Bokeh,
    Streamlit,
    Voila,
    Plotly,
    Gradio,
}

impl Framework {
    /// In the order the create form lists them
    pub const ALL: [Framework; 6] = [
        Framework::Panel,
        Framework::Bokeh,
        Framework::Streamlit,
        Framework::Voila,
        Framework::Plotly,
        Framework::Gradio,
    ];

    /// Label shown in the form
    pub fn display_name(&self) -> &'static str {
        match self {
            Framework::Panel => "Panel",
            Framework::Bokeh => "Bokeh",
            Framework::Streamlit => "Streamlit",
            Framework::Voila => "Voila",
            Framework::Plotly => "Plotly",
            Framework::Gradio => "Gradio",
        }
    }

    /// Identifier stored in the server options and understood by the hub
    pub fn id(&self) -> &'static str {
        match self {
            Framework::Panel => "panel",
            Framework::Bokeh => "bokeh",
            Framework::Streamlit => "streamlit",
            Framework::Voila => "voila",
            Framework::Plotly => "plotlydash",
            Framework::Gradio => "gradio",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }
}

const PANEL_LOGO: &str =
    "https://raw.githubusercontent.com/holoviz/panel/main/doc/_static/logo_stacked.png";
const STREAMLIT_LOGO: &str = "https://streamlit.io/images/brand/streamlit-mark-color.png";
const BOKEH_LOGO: &str = "https://static.bokeh.org/branding/icons/bokeh-icon@5x.png";
const VOILA_LOGO: &str =
    "https://raw.githubusercontent.com/voila-dashboards/voila/main/docs/voila-logo.svg";
const PLOTLY_LOGO: &str = "https://repository-images.githubusercontent.com/33702544/b4400c80-718b-11e9-9f3a-306c07a5f3de";

/// Logo for a framework identifier. Unknown identifiers have none.
pub fn logo_for(framework_id: &str) -> Option<&'static str> {
    match framework_id {
        "panel" => Some(PANEL_LOGO),
        "streamlit" => Some(STREAMLIT_LOGO),
        "bokeh" => Some(BOKEH_LOGO),
        "voila" => Some(VOILA_LOGO),
        "plotly" | "plotlydash" => Some(PLOTLY_LOGO),
        _ => None,
    }
}

/// Whether the app's server is up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Ready,
    Pending,
    Stopped,
}

impl AppStatus {
    fn of(server: &ServerRecord) -> Self {
        if server.pending.is_some() {
            AppStatus::Pending
        } else if server.ready {
            AppStatus::Ready
        } else {
            AppStatus::Stopped
        }
    }

    /// Stopped apps can be started; running or spawning ones can be stopped
    pub fn can_start(&self) -> bool {
        matches!(self, AppStatus::Stopped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppStatus::Ready => "Ready",
            AppStatus::Pending => "Pending",
            AppStatus::Stopped => "Stopped",
        }
    }
}

/// One row of the catalog. Rebuilt on every render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppItem {
    /// Server name, used in the row action paths
    pub server_name: String,
    pub logo: Option<&'static str>,
    pub description: String,
    /// Server path on the hub, as reported by it; "View" opens `<base_url><link>`
    pub link: String,
    pub status: AppStatus,
}

/// Build catalog entries from a server map, skipping servers not flagged as apps.
pub fn build_catalog(servers: &BTreeMap<String, ServerRecord>) -> Vec<AppItem> {
    servers
        .iter()
        .filter_map(|(server_name, server)| {
            let options = match server.app_options() {
                Some(options) => options,
                None => {
                    debug!(server = %server_name, "Skipping non-app server");
                    return None;
                }
            };

            let description = match options.description.as_deref() {
                Some(desc) if !desc.is_empty() => desc.to_string(),
                _ => options.name.clone(),
            };

            Some(AppItem {
                server_name: server_name.clone(),
                logo: logo_for(&options.framework),
                description,
                link: server.url.clone(),
                status: AppStatus::of(server),
            })
        })
        .collect()
}

/// The user and their apps for one page render
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub user: Option<String>,
    pub items: Vec<AppItem>,
}

/// Fetch the current user and build their catalog.
///
/// Any hub failure yields an empty catalog: a first visit or a missing token
/// shows "no apps" instead of an error page. Every page load re-fetches.
pub async fn load_catalog<P: Platform>(platform: &P) -> Catalog {
    match platform.get_user().await {
        Ok(User { name, servers }) => {
            let items = build_catalog(&servers);
            info!(user = %name, apps = items.len(), servers = servers.len(), "Catalog loaded");
            Catalog {
                user: Some(name),
                items,
            }
        }
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "No user found, showing empty catalog");
            Catalog::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HubError;
    use crate::testing::FakeHub;
    use serde_json::json;

    fn app_server(name: &str, framework: &str, description: Option<&str>) -> ServerRecord {
        ServerRecord {
            name: name.to_lowercase(),
            url: format!("/user/alice/{}/", name.to_lowercase()),
            ready: true,
            pending: None,
            user_options: Some(json!({
                "jhub_app": true,
                "name": name,
                "description": description,
                "framework": framework,
                "filepath": "main.py"
            })),
        }
    }

    #[test]
    fn test_non_app_servers_are_skipped() {
        let mut servers = BTreeMap::new();
        servers.insert("".to_string(), ServerRecord::default());
        servers.insert(
            "notebook".to_string(),
            ServerRecord {
                user_options: Some(json!({"jhub_app": false, "name": "nb"})),
                ..ServerRecord::default()
            },
        );
        servers.insert(
            "profile".to_string(),
            ServerRecord {
                user_options: Some(json!({"profile": ["large"], "image": null})),
                ..ServerRecord::default()
            },
        );

        assert!(build_catalog(&servers).is_empty());
    }

    #[test]
    fn test_foreign_options_next_to_real_app() {
        let mut servers = BTreeMap::new();
        servers.insert(
            "lab".to_string(),
            ServerRecord {
                user_options: Some(json!({"name": ["big"], "cpu": 4})),
                ..ServerRecord::default()
            },
        );
        servers.insert(
            "broken".to_string(),
            ServerRecord {
                user_options: Some(json!({"jhub_app": true, "framework": {"x": 1}})),
                ..ServerRecord::default()
            },
        );
        servers.insert("demo".to_string(), app_server("Demo", "panel", None));

        let items = build_catalog(&servers);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].server_name, "demo");
    }

    #[test]
    fn test_description_falls_back_to_name() {
        let mut servers = BTreeMap::new();
        servers.insert("a".to_string(), app_server("A", "panel", Some("Sales dashboard")));
        servers.insert("b".to_string(), app_server("B", "panel", Some("")));
        servers.insert("c".to_string(), app_server("C", "panel", None));

        let items = build_catalog(&servers);
        let descriptions: Vec<&str> = items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Sales dashboard", "B", "C"]);
    }

    #[test]
    fn test_unknown_framework_has_no_logo() {
        let mut servers = BTreeMap::new();
        servers.insert("x".to_string(), app_server("X", "shiny", None));
        servers.insert("p".to_string(), app_server("P", "plotlydash", None));

        let items = build_catalog(&servers);
        assert_eq!(items.len(), 2);
        assert!(items[0].logo.is_some());
        assert_eq!(items[0].server_name, "p");
        assert_eq!(items[1].logo, None);
    }

    #[test]
    fn test_item_fields() {
        let mut servers = BTreeMap::new();
        let mut server = app_server("Demo", "streamlit", Some("d"));
        server.ready = false;
        server.pending = Some("spawn".to_string());
        servers.insert("demo".to_string(), server);

        let items = build_catalog(&servers);
        assert_eq!(
            items[0],
            AppItem {
                server_name: "demo".to_string(),
                logo: logo_for("streamlit"),
                description: "d".to_string(),
                link: "/user/alice/demo/".to_string(),
                status: AppStatus::Pending,
            }
        );
    }

    #[test]
    fn test_framework_ids() {
        assert_eq!(Framework::Plotly.id(), "plotlydash");
        assert_eq!(Framework::from_id("panel"), Some(Framework::Panel));
        assert_eq!(Framework::from_id("Panel"), None);
        assert!(Framework::ALL.iter().all(|f| Framework::from_id(f.id()) == Some(*f)));
    }

    #[tokio::test]
    async fn test_load_catalog_swallows_every_error() {
        let errors = [
            HubError::Auth("a".into()),
            HubError::NotFound("n".into()),
            HubError::Conflict("c".into()),
            HubError::Validation("v".into()),
            HubError::Transport("t".into()),
        ];
        for error in errors {
            let hub = FakeHub::failing_user(error);
            let catalog = load_catalog(&hub).await;
            assert!(catalog.items.is_empty());
            assert!(catalog.user.is_none());
        }
    }

    #[tokio::test]
    async fn test_load_catalog_for_user() {
        let hub = FakeHub::new("alice");
        hub.add_server("demo", app_server("Demo", "panel", None));
        hub.add_server("", ServerRecord::default());

        let catalog = load_catalog(&hub).await;
        assert_eq!(catalog.user.as_deref(), Some("alice"));
        assert_eq!(catalog.items.len(), 1);
        assert_eq!(catalog.items[0].server_name, "demo");
    }
}
