//! In-memory hub for unit tests

use crate::error::HubError;
use crate::hub::{AppOptions, Platform, ServerRecord, User};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetUser,
    Create {
        user: String,
        server_name: String,
        options: AppOptions,
    },
    Start {
        user: String,
        server_name: String,
        options: AppOptions,
    },
    Stop {
        user: String,
        server_name: String,
    },
    Delete {
        user: String,
        server_name: String,
    },
}

pub struct FakeHub {
    user: String,
    servers: Mutex<BTreeMap<String, ServerRecord>>,
    user_error: Option<HubError>,
    create_error: Mutex<Option<HubError>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeHub {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            servers: Mutex::new(BTreeMap::new()),
            user_error: None,
            create_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_user(error: HubError) -> Self {
        Self {
            user_error: Some(error),
            ..Self::new("")
        }
    }

    pub fn add_server(&self, name: &str, record: ServerRecord) {
        self.servers.lock().unwrap().insert(name.to_string(), record);
    }

    pub fn server(&self, name: &str) -> Option<ServerRecord> {
        self.servers.lock().unwrap().get(name).cloned()
    }

    pub fn fail_create(&self, error: HubError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn missing(server_name: &str) -> HubError {
        HubError::NotFound(format!("no server named {}", server_name))
    }
}

impl Platform for FakeHub {
    async fn get_user(&self) -> Result<User, HubError> {
        self.record(Call::GetUser);
        if let Some(e) = &self.user_error {
            return Err(e.clone());
        }
        Ok(User {
            name: self.user.clone(),
            servers: self.servers.lock().unwrap().clone(),
        })
    }

    async fn create_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> Result<(), HubError> {
        self.record(Call::Create {
            user: user.to_string(),
            server_name: server_name.to_string(),
            options: options.clone(),
        });
        if let Some(e) = self.create_error.lock().unwrap().clone() {
            return Err(e);
        }

        let mut servers = self.servers.lock().unwrap();
        if servers.contains_key(server_name) {
            return Err(HubError::Conflict(format!("{} already exists", server_name)));
        }
        servers.insert(
            server_name.to_string(),
            ServerRecord {
                name: server_name.to_string(),
                url: format!("/user/{}/{}/", user, server_name),
                ready: false,
                pending: Some("spawn".to_string()),
                user_options: Some(serde_json::to_value(options).unwrap()),
            },
        );
        Ok(())
    }

    async fn start_server(
        &self,
        user: &str,
        server_name: &str,
        options: &AppOptions,
    ) -> Result<(), HubError> {
        self.record(Call::Start {
            user: user.to_string(),
            server_name: server_name.to_string(),
            options: options.clone(),
        });
        let mut servers = self.servers.lock().unwrap();
        let server = servers
            .get_mut(server_name)
            .ok_or_else(|| Self::missing(server_name))?;
        if server.ready || server.pending.is_some() {
            return Err(HubError::Conflict(format!("{} is already running", server_name)));
        }
        server.ready = true;
        Ok(())
    }

    async fn stop_server(&self, user: &str, server_name: &str) -> Result<(), HubError> {
        self.record(Call::Stop {
            user: user.to_string(),
            server_name: server_name.to_string(),
        });
        let mut servers = self.servers.lock().unwrap();
        let server = servers
            .get_mut(server_name)
            .ok_or_else(|| Self::missing(server_name))?;
        server.ready = false;
        server.pending = None;
        Ok(())
    }

    async fn delete_server(&self, user: &str, server_name: &str) -> Result<(), HubError> {
        self.record(Call::Delete {
            user: user.to_string(),
            server_name: server_name.to_string(),
        });
        match self.servers.lock().unwrap().remove(server_name) {
            Some(_) => Ok(()),
            None => Err(Self::missing(server_name)),
        }
    }
}
