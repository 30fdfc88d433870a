//! Error type shared by the gateway and the orchestration layers.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("docker engine request failed")]
    Docker(#[from] bollard::errors::Error),

    #[error("this host is not a manager node of an active swarm ({reason})")]
    NotSwarmManager { reason: String },

    #[error("failed to set up {resource}")]
    Bootstrap {
        resource: String,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to package build context {}", .path.display())]
    BuildContext {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("building image '{tag}' failed: {message}")]
    ImageBuild { tag: String, message: String },

    #[error("invalid configuration")]
    Config(#[from] Box<figment::Error>),
}

impl Error {
    /// True when the engine refused a create because the object already exists.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code, ..
            }) => *status_code == 409,
            Error::Bootstrap { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// The message followed by every underlying cause, `: `-separated.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }

    pub(crate) fn bootstrap(resource: impl Into<String>, source: Error) -> Self {
        Error::Bootstrap {
            resource: resource.into(),
            source: Box::new(source),
        }
    }
}
