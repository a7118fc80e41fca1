use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default)]
    pub ssl: bool,
}

impl DatabaseConnection {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            ssl: false,
        }
    }

    pub fn to_connection_string(&self) -> String {
        let mut conn = format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.database
        );
        if self.ssl {
            conn.push_str(" sslmode=require");
        }
        conn
    }
}

impl Default for DatabaseConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub host: String,
    pub port: u16,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Hard cap on a single completion call, stream included.
    pub timeout_secs: u64,
}

impl LlmSettings {
    pub fn completion_url(&self) -> String {
        format!("http://{}:{}/completion", self.host, self.port)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            host: "llama-service".to_string(),
            port: 8080,
            temperature: 0.1,
            max_tokens: 500,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub schema: String,
    pub sample_limit: usize,
    pub explain_row_limit: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            sample_limit: 3,
            explain_row_limit: 10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub connections: Vec<DatabaseConnection>,
    pub last_connection_index: Option<usize>,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl Config {
    pub fn new() -> Self {
        Self {
            connections: vec![],
            last_connection_index: None,
            llm: LlmSettings::default(),
            analysis: AnalysisSettings::default(),
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::new())
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;
        tracing::debug!("saved config to {}", config_path.display());
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".config").join("db-assistant").join("config.json"))
    }

    /// Adds a profile, replacing an existing one with the same name.
    pub fn upsert_connection(&mut self, connection: DatabaseConnection) -> usize {
        match self.find_connection(&connection.name) {
            Some(index) => {
                self.connections[index] = connection;
                index
            }
            None => {
                self.connections.push(connection);
                self.connections.len() - 1
            }
        }
    }

    pub fn delete_connection(&mut self, index: usize) {
        if index < self.connections.len() {
            self.connections.remove(index);

            if let Some(last_idx) = self.last_connection_index {
                if last_idx == index {
                    self.last_connection_index = None;
                } else if last_idx > index {
                    self.last_connection_index = Some(last_idx - 1);
                }
            }
        }
    }

    pub fn find_connection(&self, name: &str) -> Option<usize> {
        self.connections.iter().position(|c| c.name == name)
    }

    pub fn get_last_connection(&self) -> Option<&DatabaseConnection> {
        self.last_connection_index
            .and_then(|idx| self.connections.get(idx))
    }

    /// Picks the connection string to use: a named profile, then an explicit
    /// URL, then the last profile used. Returns the string and its TLS flag.
    pub fn resolve_connection(&mut self, name: Option<&str>, url: Option<&str>, ssl: bool) -> Result<(String, bool)> {
        if let Some(name) = name {
            let index = self
                .find_connection(name)
                .ok_or_else(|| anyhow::anyhow!("No saved connection named '{}'", name))?;
            self.last_connection_index = Some(index);
            let conn = &self.connections[index];
            return Ok((conn.to_connection_string(), conn.ssl));
        }

        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            return Ok((url.to_string(), ssl));
        }

        self.get_last_connection()
            .map(|conn| (conn.to_connection_string(), conn.ssl))
            .ok_or_else(|| anyhow::anyhow!("No database configured; pass --database-url or add a connection"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
