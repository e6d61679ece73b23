//! The "Create Apps" form and the request it submits to the hub

use crate::catalog::Framework;
use crate::error::HubError;
use crate::hub::{AppOptions, Platform};
use serde::Deserialize;
use tracing::{info, warn};

/// Form fields captured at submit time, passed through to the hub as-is
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CreateRequest {
    pub name: String,
    pub filepath: String,
    pub description: String,
    /// Framework identifier, e.g. "panel"
    pub framework: String,
}

impl CreateRequest {
    /// Decode an `application/x-www-form-urlencoded` body. Only the framework
    /// is checked, since it comes from a fixed select; the rest is left to the hub.
    pub fn from_form_body(body: &[u8]) -> Result<Self, String> {
        let request: Self = serde_urlencoded::from_bytes(body)
            .map_err(|e| format!("invalid form body: {}", e))?;

        if Framework::from_id(&request.framework).is_none() {
            return Err(format!("unknown framework \"{}\"", request.framework));
        }
        Ok(request)
    }

    /// Hub server name for this app. Lowercased, nothing else.
    pub fn server_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn options(&self) -> AppOptions {
        AppOptions {
            jhub_app: true,
            name: self.name.clone(),
            description: Some(self.description.clone()),
            framework: self.framework.clone(),
            filepath: self.filepath.clone(),
        }
    }
}

/// Link to a newly created app: `<base_url>/user/<user>/<server_name>`
pub fn app_link(base_url: &str, user: &str, server_name: &str) -> String {
    format!(
        "{}/user/{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(user),
        urlencoding::encode(server_name)
    )
}

/// What the form shows below its fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormOutcome {
    #[default]
    Idle,
    Created { link: String },
    Failed { message: String },
}

/// State of the create form for one render
#[derive(Debug, Clone, Default)]
pub struct CreateAppForm {
    submitting: bool,
    outcome: FormOutcome,
    /// Values to put back into the fields after a failed submit
    values: CreateRequest,
}

impl CreateAppForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the submit button accepts clicks
    pub fn submit_enabled(&self) -> bool {
        !self.submitting
    }

    pub fn outcome(&self) -> &FormOutcome {
        &self.outcome
    }

    pub fn values(&self) -> &CreateRequest {
        &self.values
    }

    /// Record a failure that happened before the hub was asked, e.g. a bad form body
    pub fn fail(&mut self, values: CreateRequest, message: impl Into<String>) {
        self.submitting = false;
        self.values = values;
        self.outcome = FormOutcome::Failed {
            message: message.into(),
        };
    }

    /// Submit `request` for `user`. The form is disabled for the duration of
    /// the hub call and usable again afterwards, whatever the result.
    pub async fn submit<P: Platform>(
        &mut self,
        platform: &P,
        user: &str,
        base_url: &str,
        request: CreateRequest,
    ) -> Result<(), HubError> {
        self.submitting = true;
        let server_name = request.server_name();

        info!(
            user,
            server = %server_name,
            framework = %request.framework,
            filepath = %request.filepath,
            "Creating app"
        );

        let result = platform
            .create_server(user, &server_name, &request.options())
            .await;
        self.submitting = false;

        match result {
            Ok(()) => {
                let link = app_link(base_url, user, &server_name);
                info!(user, server = %server_name, %link, "App created");
                self.values = CreateRequest::default();
                self.outcome = FormOutcome::Created { link };
                Ok(())
            }
            Err(e) => {
                warn!(user, server = %server_name, error = %e, kind = e.kind(), "App creation failed");
                self.fail(request, e.to_string());
                Err(e)
            }
        }
    }
}
