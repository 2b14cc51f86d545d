use thiserror::Error;

/// A single failed package install. Recovered locally by the bootstrapper:
/// the failure is reported as a `status` message and the sequence continues.
#[derive(Debug, Error)]
#[error("failed to install {package}: {reason}")]
pub struct InstallError {
    pub package: String,
    pub reason: String,
}

impl InstallError {
    pub fn new(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            reason: reason.into(),
        }
    }
}

/// One entry of the install list, parsed into structured fields up front so
/// nothing downstream has to re-derive names from positional string splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRequirement {
    /// Plain registry identifier, optionally pinned (`name==version`).
    Registry {
        name: String,
        version: Option<String>,
    },
    /// Direct package-archive URL. Name and version are read from the archive
    /// filename (`{name}-{version}-...`).
    Archive {
        url: String,
        name: String,
        version: String,
    },
}

impl PackageRequirement {
    pub fn parse(spec: &str) -> Self {
        if spec.ends_with(".whl") {
            let filename = spec.rsplit('/').next().unwrap_or(spec);
            let mut segments = filename.split('-');
            let name = segments.next().unwrap_or(filename).to_string();
            let version = segments.next().unwrap_or("").to_string();
            return Self::Archive {
                url: spec.to_string(),
                name,
                version,
            };
        }

        match spec.split_once("==") {
            Some((name, version)) => Self::Registry {
                name: name.to_string(),
                version: Some(version.to_string()),
            },
            None => Self::Registry {
                name: spec.to_string(),
                version: None,
            },
        }
    }

    /// Name used in progress messages: the bare name for archives, the full
    /// identifier (pin included) for registry requirements. Purely
    /// informational; never affects install behavior.
    pub fn display_name(&self) -> String {
        match self {
            Self::Registry {
                name,
                version: Some(version),
            } => format!("{name}=={version}"),
            Self::Registry { name, version: None } => name.clone(),
            Self::Archive { name, .. } => name.clone(),
        }
    }

    /// The identifier handed to the installer.
    pub fn source(&self) -> &str {
        match self {
            Self::Registry { name, .. } => name,
            Self::Archive { url, .. } => url,
        }
    }
}
