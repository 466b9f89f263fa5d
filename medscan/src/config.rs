use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated env var into trimmed, non-empty entries.
fn parse_env_list(var: &str, default: &str) -> Vec<String> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Upload limit in bytes, enforced by the scan handler.
    pub max_upload_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub languages: String,
    pub tessdata_path: Option<String>,
    pub timeout_secs: u64,
    pub canonical_width: u32,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
    /// Bound on variants preprocessed / recognized at once.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Source identifiers in priority order.
    pub sources: Vec<String>,
    pub openfda_base_url: String,
    pub openfda_api_key: Option<String>,
    pub rxnav_base_url: String,
    pub medlineplus_base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_size: usize,
    pub concurrency: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            tessdata_path: None,
            timeout_secs: 30,
            canonical_width: 1800,
            max_image_dimension: 4096,
            min_image_dimension: 16,
            concurrency: 3,
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            openfda_base_url: "https://api.fda.gov".to_string(),
            openfda_api_key: None,
            rxnav_base_url: "https://rxnav.nlm.nih.gov".to_string(),
            medlineplus_base_url: "https://connect.medlineplus.gov".to_string(),
            timeout_secs: 5,
            cache_ttl_secs: 3600,
            cache_size: 1000,
            concurrency: 4,
        }
    }
}

/// Enrichment sources known to the service, in default priority order.
pub const DEFAULT_SOURCES: &[&str] = &["openfda", "rxnorm", "medlineplus"];

/// 10 MB, the documented upload limit.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

impl Default for Config {
    fn default() -> Self {
        let ocr_defaults = OcrConfig::default();
        let enrichment_defaults = EnrichmentConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("MEDSCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MEDSCAN_PORT", 5000),
                cors_origins: parse_env_list(
                    "CORS_ORIGINS",
                    "http://localhost:3000,http://localhost:5173",
                ),
                max_upload_size: parse_env_or("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE),
            },
            ocr: OcrConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr_defaults.languages),
                tessdata_path: env::var("TESSDATA_PATH").ok(),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
                canonical_width: parse_env_or("OCR_CANONICAL_WIDTH", ocr_defaults.canonical_width),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    ocr_defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    ocr_defaults.min_image_dimension,
                ),
                concurrency: parse_env_or("OCR_CONCURRENCY", ocr_defaults.concurrency).max(1),
            },
            enrichment: EnrichmentConfig {
                sources: parse_env_list("ENRICHMENT_SOURCES", &DEFAULT_SOURCES.join(",")),
                openfda_base_url: env::var("OPENFDA_BASE_URL")
                    .unwrap_or(enrichment_defaults.openfda_base_url),
                openfda_api_key: env::var("OPENFDA_API_KEY").ok(),
                rxnav_base_url: env::var("RXNAV_BASE_URL")
                    .unwrap_or(enrichment_defaults.rxnav_base_url),
                medlineplus_base_url: env::var("MEDLINEPLUS_BASE_URL")
                    .unwrap_or(enrichment_defaults.medlineplus_base_url),
                timeout_secs: parse_env_or("ENRICHMENT_TIMEOUT", enrichment_defaults.timeout_secs),
                cache_ttl_secs: parse_env_or(
                    "ENRICHMENT_CACHE_TTL",
                    enrichment_defaults.cache_ttl_secs,
                ),
                cache_size: parse_env_or("ENRICHMENT_CACHE_SIZE", enrichment_defaults.cache_size)
                    .max(1),
                concurrency: parse_env_or(
                    "ENRICHMENT_CONCURRENCY",
                    enrichment_defaults.concurrency,
                )
                .max(1),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
