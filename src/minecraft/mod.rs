pub mod command;
pub mod download;
pub mod install;
pub mod java;
pub mod manifest;
pub mod version;

#[cfg(test)]
pub(crate) mod test_server;

pub use command::{build_command, LaunchOptions};
pub use download::{ChannelProgress, InstallStatus};
pub use install::install_version;
pub use java::find_java;
pub use manifest::{available_versions, preselect, VersionSummary};

/// Where version metadata and asset objects are fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub manifest_url: String,
    pub resources_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            manifest_url: manifest::VERSION_MANIFEST_URL.to_string(),
            resources_url: install::RESOURCES_URL.to_string(),
        }
    }
}
