//! Per-app actions offered on each catalog row: start, stop, edit and delete.
//! "View" is a plain link built by `view_url`.

use crate::hub::{Platform, User};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Start,
    Stop,
    Edit,
    Delete,
}

impl ItemAction {
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "start" => Some(ItemAction::Start),
            "stop" => Some(ItemAction::Stop),
            "edit" => Some(ItemAction::Edit),
            "delete" => Some(ItemAction::Delete),
            _ => None,
        }
    }

    pub fn as_segment(&self) -> &'static str {
        match self {
            ItemAction::Start => "start",
            ItemAction::Stop => "stop",
            ItemAction::Edit => "edit",
            ItemAction::Delete => "delete",
        }
    }

    fn past_tense(&self) -> &'static str {
        match self {
            ItemAction::Start => "Started",
            ItemAction::Stop => "Stopped",
            ItemAction::Edit => "Edited",
            ItemAction::Delete => "Deleted",
        }
    }
}

/// Path of an action for a server under the dashboard route
pub fn action_path(route: &str, server_name: &str, action: ItemAction) -> String {
    format!(
        "{}/apps/{}/{}",
        route.trim_end_matches('/'),
        urlencoding::encode(server_name),
        action.as_segment()
    )
}

/// Split `/apps/<server>/<action>` (relative to the route) into its parts
pub fn parse_action_path(rest: &str) -> Option<(String, ItemAction)> {
    let rest = rest.strip_prefix("/apps/")?;
    let (server, action) = rest.rsplit_once('/')?;
    let action = ItemAction::from_segment(action)?;
    let server = urlencoding::decode(server).ok()?.into_owned();
    Some((server, action))
}

/// Where "View" sends the browser: `<base_url><server.url>`
pub fn view_url(base_url: &str, server_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), server_url)
}

/// Banner shown above the catalog after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Done {
        action: ItemAction,
        server_name: String,
    },
    Failed {
        action: ItemAction,
        server_name: String,
        message: String,
    },
    EditUnavailable {
        server_name: String,
    },
    Error {
        message: String,
    },
}

impl Notice {
    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::Done { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Notice::Done {
                action,
                server_name,
            } => format!("{} app {}", action.past_tense(), server_name),
            Notice::Failed {
                action,
                server_name,
                message,
            } => format!(
                "Could not {} app {}: {}",
                action.as_segment(),
                server_name,
                message
            ),
            Notice::EditUnavailable { server_name } => {
                format!("Editing {} is not implemented yet", server_name)
            }
            Notice::Error { message } => message.clone(),
        }
    }

    fn outcome(
        action: ItemAction,
        user: &str,
        server_name: &str,
        result: Result<(), String>,
    ) -> Self {
        let server_name = server_name.to_string();
        match result {
            Ok(()) => {
                info!(user, server = %server_name, action = action.as_segment(), "App action done");
                Notice::Done {
                    action,
                    server_name,
                }
            }
            Err(message) => Notice::Failed {
                action,
                server_name,
                message,
            },
        }
    }
}

/// Remove `server_name` for `user`. Failures, a missing server included,
/// become a notice rather than an error.
pub async fn delete_app<P: Platform>(platform: &P, user: &str, server_name: &str) -> Notice {
    info!(user, server = %server_name, "Deleting app");
    let result = platform.delete_server(user, server_name).await.map_err(|e| {
        warn!(user, server = %server_name, error = %e, kind = e.kind(), "App deletion failed");
        e.to_string()
    });
    Notice::outcome(ItemAction::Delete, user, server_name, result)
}

/// Stop `server_name`, keeping it listed so it can be started again
pub async fn stop_app<P: Platform>(platform: &P, user: &str, server_name: &str) -> Notice {
    info!(user, server = %server_name, "Stopping app");
    let result = platform.stop_server(user, server_name).await.map_err(|e| {
        warn!(user, server = %server_name, error = %e, kind = e.kind(), "App stop failed");
        e.to_string()
    });
    Notice::outcome(ItemAction::Stop, user, server_name, result)
}

/// Start a stopped app again with the options it was created with
pub async fn start_app<P: Platform>(platform: &P, user: &User, server_name: &str) -> Notice {
    let Some(options) = user
        .servers
        .get(server_name)
        .and_then(|server| server.app_options())
    else {
        warn!(user = %user.name, server = %server_name, "No such app to start");
        return Notice::Failed {
            action: ItemAction::Start,
            server_name: server_name.to_string(),
            message: "no such app".to_string(),
        };
    };

    info!(user = %user.name, server = %server_name, framework = %options.framework, "Starting app");
    let result = platform
        .start_server(&user.name, server_name, &options)
        .await
        .map_err(|e| {
            warn!(user = %user.name, server = %server_name, error = %e, kind = e.kind(), "App start failed");
            e.to_string()
        });
    Notice::outcome(ItemAction::Start, &user.name, server_name, result)
}
