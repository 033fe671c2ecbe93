//! Client registry: named torrent client instances from configuration.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;

/// Errors from resolving client names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Client '{0}' not found in configuration")]
    UnknownClient(String),

    #[error("No clients given")]
    EmptyClientList,
}

/// A configured reference to one instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientDescriptor {
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    /// Category subtree every operation on this client is restricted to.
    pub category: Option<String>,
    pub timeout_secs: u32,
}

impl std::fmt::Debug for ClientDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDescriptor")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("category", &self.category)
            .finish()
    }
}

/// Read-only lookup from client name to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, Arc<ClientDescriptor>>,
}

impl ClientRegistry {
    /// Build the registry from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        let clients = config
            .clients
            .iter()
            .map(|(name, c)| {
                let descriptor = ClientDescriptor {
                    name: name.clone(),
                    url: c.url.clone(),
                    username: c.username.clone(),
                    password: c.password.clone(),
                    category: c.category.clone(),
                    timeout_secs: c.timeout_secs,
                };
                (name.clone(), Arc::new(descriptor))
            })
            .collect();
        Self { clients }
    }

    /// Build a registry from descriptors directly.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ClientDescriptor>) -> Self {
        let clients = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect();
        Self { clients }
    }

    /// Look up one client by exact name.
    pub fn get(&self, name: &str) -> Result<Arc<ClientDescriptor>, RegistryError> {
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownClient(name.to_string()))
    }

    /// Configured client names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Resolve a comma-separated list of names into an ordered target set.
    ///
    /// First appearance wins; later duplicates are dropped. Blank segments
    /// are ignored.
    pub fn resolve(&self, names_csv: &str) -> Result<Vec<Arc<ClientDescriptor>>, RegistryError> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for name in names_csv.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let descriptor = self.get(name)?;
            if seen.insert(descriptor.name.clone()) {
                resolved.push(descriptor);
            }
        }

        if resolved.is_empty() {
            return Err(RegistryError::EmptyClientList);
        }
        Ok(resolved)
    }
}
