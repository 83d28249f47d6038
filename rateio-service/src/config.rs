use serde::Deserialize;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct CondominiumConfig {
    pub name: Option<String>,
    /// Plain-text file whose first line holds the condominium name.
    pub name_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub condominium: CondominiumConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_max_connections() -> u32 {
    1
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("RATEIO_CONFIG").unwrap_or_else(|_| "rateio-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Inline `name` wins over `name_file`.
    ///
    /// The name becomes part of the report file name, so path separators are
    /// rejected.
    pub fn condominium_name(&self) -> anyhow::Result<String> {
        let name = self.raw_condominium_name()?;
        if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
            anyhow::bail!("condominium name {name:?} cannot be used in a file name");
        }
        Ok(name)
    }

    fn raw_condominium_name(&self) -> anyhow::Result<String> {
        if let Some(name) = self.condominium.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Ok(name.to_string());
            }
        }

        let Some(path) = &self.condominium.name_file else {
            anyhow::bail!("condominium.name or condominium.name_file must be set");
        };
        let contents = fs::read_to_string(path)?;
        match contents.lines().next().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => anyhow::bail!("{} has no condominium name on its first line", path.display()),
        }
    }
}
