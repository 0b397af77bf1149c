//! The administrative control plane: credential verification, the persisted
//! blocklist/local-override manifests, and the HTTP surface that exposes them.

pub mod blocklist_manifest;
pub mod credentials;
pub mod http;
pub mod local_overrides;

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum ControlError {
    Credential(credentials::CredentialError),
    Manifest(blocklist_manifest::ManifestError),
    Overrides(local_overrides::OverrideError),
    Config(crate::config::ConfigError),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
