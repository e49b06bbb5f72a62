use std::ffi::OsString;

use serde::Deserialize;

/// Remote locations of the tools this helper fetches
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub pip: String,
    pub winetricks: String,
    pub dotnet48: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            pip: "https://bootstrap.pypa.io/pip/pip.pyz".to_string(),
            winetricks: "https://github.com/Winetricks/winetricks/raw/master/src/winetricks"
                .to_string(),
            dotnet48: "https://download.visualstudio.microsoft.com/download/pr/7afca223-55d2-470a-8edc-6a1739ae3252/abd170b4b0ec15ad0222a809b761a036/ndp48-x86-x64-allos-enu.exe".to_string(),
        }
    }
}

/// A command line handed to `sh -c`, plus extra environment for the child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub command: String,
    pub env: Vec<(OsString, OsString)>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl From<&str> for ShellCommand {
    fn from(command: &str) -> Self {
        Self::new(command)
    }
}

impl From<String> for ShellCommand {
    fn from(command: String) -> Self {
        Self::new(command)
    }
}
