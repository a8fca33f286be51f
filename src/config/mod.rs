use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::SourceKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub page_delay_ms: u64,
    pub source_timeout_secs: u64,
    pub max_results: u32,
    pub hellowork: HelloWorkConfig,
    pub wttj: WttjConfig,
    pub indeed: IndeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelloWorkConfig {
    pub enabled: bool,
    pub search_url: String,
    pub page_size: u32,
    pub default_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WttjConfig {
    pub enabled: bool,
    pub search_url: String,
    pub page_size: u32,
    pub default_results: u32,
    pub country_code: String,
    pub around_lat_lng: String,
    pub around_radius: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndeedConfig {
    pub enabled: bool,
    pub api_url: String,
    pub page_size: u32,
    pub default_results: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub default_results: u32,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3002".to_string(),
    ]
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_secs: 60,
            page_delay_ms: 2000,
            source_timeout_secs: 120,
            max_results: 200,
            hellowork: HelloWorkConfig::default(),
            wttj: WttjConfig::default(),
            indeed: IndeedConfig::default(),
        }
    }
}

impl Default for HelloWorkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.hellowork.com/fr-fr/emploi/recherche.html".to_string(),
            page_size: 20,
            default_results: 60,
        }
    }
}

impl Default for WttjConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_url: "https://www.welcometothejungle.com/fr/jobs".to_string(),
            page_size: 20,
            default_results: 30,
            country_code: "FR".to_string(),
            around_lat_lng: "44.84044,-0.5805".to_string(),
            around_radius: 20,
        }
    }
}

impl Default for IndeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: "http://127.0.0.1:8000/jobs".to_string(),
            page_size: 20,
            default_results: 10,
        }
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            default_results: 30,
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Listings returned by a single-source search when the caller asks for none
    pub fn default_results(&self, kind: SourceKind) -> u32 {
        match kind {
            SourceKind::HelloWork => self.hellowork.default_results,
            SourceKind::WelcomeToTheJungle => self.wttj.default_results,
            SourceKind::Indeed => self.indeed.default_results,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./job-aggregator.db".to_string(),
                max_connections: Some(10),
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                base_url: "http://localhost:3001".to_string(),
                cors_origins: default_cors_origins(),
            },
            scraper: ScraperConfig::default(),
            aggregate: AggregateConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            Ok(default_config)
        }
    }
}
