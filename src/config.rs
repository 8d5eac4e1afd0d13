//! Configuration file loading and parsing.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const CONFIG_FILE_NAME: &str = "asgen-config.json";

/// AppStream format version, e.g. `0.10`. Compared to decide whether
/// reverse-DNS desktop-file names lose their `.desktop` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FormatVersion {
    pub major: u16,
    pub minor: u16,
}

impl FormatVersion {
    /// First format version with reverse-DNS component-id rewriting.
    pub const REVERSE_DNS_CUTOFF: FormatVersion = FormatVersion { major: 0, minor: 10 };

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl FromStr for FormatVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((major, minor)) = s.split_once('.') else {
            bail!("format version {s:?} is not of the form MAJOR.MINOR");
        };
        Ok(Self {
            major: major.parse().with_context(|| format!("bad format version {s:?}"))?,
            minor: minor.parse().with_context(|| format!("bad format version {s:?}"))?,
        })
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One suite of the archive, with the sections and architectures to process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suite {
    pub name: String,
    pub sections: Vec<String>,
    pub archs: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root for derived outputs (HTML export, the on-disk database).
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    /// Disambiguates vendor template directory lookups.
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Injected as `root_url` into every rendered page.
    #[serde(default = "default_html_base_url")]
    pub html_base_url: String,

    #[serde(default)]
    pub suites: Vec<Suite>,

    /// Threshold for the desktop-id rewriting rule.
    #[serde(default = "default_format_version")]
    pub format_version: FormatVersion,

    /// Scratch space for downloaded files.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Archive root: a local path or an http(s) URL.
    pub archive_root: String,

    /// Root of the vendor template directories.
    #[serde(default = "default_template_root")]
    pub template_root: PathBuf,

    /// Root under which package payload trees are found, resolved against
    /// each package's `Filename` field. Defaults to the archive root for
    /// local archives.
    #[serde(default)]
    pub payload_root: Option<PathBuf>,
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("./workspace")
}

fn default_project_name() -> String {
    "default".to_string()
}

fn default_html_base_url() -> String {
    "/".to_string()
}

fn default_format_version() -> FormatVersion {
    FormatVersion::REVERSE_DNS_CUTOFF
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("/tmp/asgen")
}

fn default_template_root() -> PathBuf {
    PathBuf::from("templates")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let conf: Config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        conf.validate()?;
        Ok(conf)
    }

    /// A missing workspace is fatal: every derived output lands there.
    pub fn validate(&self) -> Result<()> {
        if !self.workspace_dir.is_dir() {
            bail!(
                "workspace directory {} does not exist",
                self.workspace_dir.display()
            );
        }
        Ok(())
    }

    pub fn db_dir(&self) -> PathBuf {
        self.workspace_dir.join("db")
    }

    pub fn html_export_dir(&self) -> PathBuf {
        self.workspace_dir.join("export").join("html")
    }

    pub fn payload_root(&self) -> PathBuf {
        match &self.payload_root {
            Some(root) => root.clone(),
            None => PathBuf::from(&self.archive_root),
        }
    }
}

/// Default configuration written by `asgen init`.
pub fn default_config_json() -> String {
    r#"{
    "workspaceDir": "./workspace",
    "projectName": "default",
    "htmlBaseUrl": "/",
    "archiveRoot": "/srv/archive",
    "formatVersion": "0.10",
    "tmpDir": "/tmp/asgen",
    "suites": [
        {
            "name": "sid",
            "sections": ["main"],
            "archs": ["amd64"]
        }
    ]
}
"#
    .to_string()
}
