use anyhow::Context;
use reqplan::{ConverterConfig, RequestConverter, ResourceMetadata, ResourceRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub file: ConfigFile,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;

        let file = ConfigFile::parse(&raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to load config file {}: {e:#}",
                config_path.display()
            )
        })?;

        Ok(Self { config_path, file })
    }

    /// Build a converter over every resource declared in the file.
    pub fn converter(&self) -> anyhow::Result<RequestConverter<ResourceRegistry>> {
        Ok(RequestConverter::new(self.file.registry()?).with_config(self.file.converter.clone()))
    }

    /// `--database` wins over `database.url`.
    pub fn database_url(&self, cli_override: Option<&str>) -> anyhow::Result<String> {
        if let Some(url) = cli_override {
            return Ok(url.to_string());
        }
        match &self.file.database {
            Some(db) => Ok(db.url.clone()),
            None => anyhow::bail!(
                "no database configured: add [database] url to {} or pass --database",
                self.config_path.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,

    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub resources: BTreeMap<String, ResourceMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl ConfigFile {
    /// Parse, expand `${VAR}` references and validate.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw)?;
        file.expand_env()?;
        file.validate()?;
        Ok(file)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        if let Some(db) = self.database.as_mut() {
            db.url = expand_env_vars(&db.url)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.version.trim() != "1" {
            anyhow::bail!("unsupported config version: {}", self.version);
        }
        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                anyhow::bail!("database.url must not be empty");
            }
        }
        if self.resources.is_empty() {
            anyhow::bail!("at least one [resources.<type>] entry is required");
        }
        if self.converter.default_per_page == 0 || self.converter.max_per_page == 0 {
            anyhow::bail!("converter page sizes must be positive");
        }
        Ok(())
    }

    pub fn registry(&self) -> anyhow::Result<ResourceRegistry> {
        let mut registry = ResourceRegistry::new();
        for (type_id, meta) in &self.resources {
            registry
                .register(type_id.clone(), meta.clone())
                .with_context(|| format!("invalid resource {type_id}"))?;
        }
        Ok(registry)
    }
}

fn expand_env_vars(input: &str) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = std::env::var(&key)
                .map_err(|_| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
