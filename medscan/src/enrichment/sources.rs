use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::Html;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use url::Url;

use super::merge::{source_text, SourceRecord};
use crate::config::EnrichmentConfig;
use crate::error::{Result, ScanError};

pub const OPENFDA: &str = "openfda";
pub const RXNORM: &str = "rxnorm";
pub const MEDLINEPLUS: &str = "medlineplus";

/// HL7 OID of the RxNorm code system, as MedlinePlus Connect expects it.
const RXNORM_CODE_SYSTEM: &str = "2.16.840.1.113883.6.88";

/// One external medication-information source.
///
/// `Ok(None)` means the source answered but knows nothing about the name.
/// Any `Err` is treated by the caller as the source being unavailable.
#[async_trait]
pub trait ExternalSourceClient: Send + Sync {
    fn id(&self) -> &str;

    async fn lookup(&self, name: &str) -> Result<Option<SourceRecord>>;
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Validated base URL without a trailing slash.
fn base(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn unexpected_status(source: &str, status: StatusCode) -> ScanError {
    ScanError::source_unavailable(source, format!("unexpected status {status}"))
}

/// Build the configured sources in priority order. Unknown ids are skipped.
pub fn build_sources(config: &EnrichmentConfig) -> Result<Vec<Arc<dyn ExternalSourceClient>>> {
    let mut sources: Vec<Arc<dyn ExternalSourceClient>> = Vec::new();

    for id in &config.sources {
        match id.as_str() {
            OPENFDA => sources.push(Arc::new(OpenFdaClient::new(config)?)),
            RXNORM => sources.push(Arc::new(RxNormClient::new(config)?)),
            MEDLINEPLUS => sources.push(Arc::new(MedlinePlusClient::new(config)?)),
            other => warn!(source = other, "Unknown enrichment source, skipping"),
        }
    }

    Ok(sources)
}

// ---------------------------------------------------------------------------
// openFDA drug labels
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct OpenFdaClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FdaResponse {
    #[serde(default)]
    results: Vec<FdaLabel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FdaLabel {
    openfda: FdaIdentity,
    indications_and_usage: Vec<String>,
    purpose: Vec<String>,
    adverse_reactions: Vec<String>,
    warnings: Vec<String>,
    boxed_warning: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FdaIdentity {
    generic_name: Vec<String>,
    brand_name: Vec<String>,
}

fn first_text(values: &[String]) -> Option<String> {
    values.first().and_then(|v| source_text(v))
}

impl OpenFdaClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: base(&config.openfda_base_url)?,
            api_key: config.openfda_api_key.clone(),
        })
    }

    fn to_record(&self, label: FdaLabel) -> SourceRecord {
        let mut brand_names: Vec<String> = Vec::new();
        for brand in label.openfda.brand_name {
            let brand = brand.trim().to_string();
            if !brand.is_empty() && !brand_names.contains(&brand) {
                brand_names.push(brand);
            }
        }

        SourceRecord {
            source: OPENFDA.to_string(),
            generic_name: first_text(&label.openfda.generic_name),
            brand_names,
            used_for: first_text(&label.indications_and_usage).or_else(|| first_text(&label.purpose)),
            side_effects: first_text(&label.adverse_reactions),
            warnings: first_text(&label.warnings).or_else(|| first_text(&label.boxed_warning)),
        }
    }
}

#[async_trait]
impl ExternalSourceClient for OpenFdaClient {
    fn id(&self) -> &str {
        OPENFDA
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceRecord>> {
        let term = name.replace('"', "");
        let search = format!(r#"openfda.generic_name:"{term}" OR openfda.brand_name:"{term}""#);

        let mut request = self
            .client
            .get(format!("{}/drug/label.json", self.base_url))
            .query(&[("search", search.as_str()), ("limit", "1")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let resp = request.send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(unexpected_status(OPENFDA, status)),
            _ => {}
        }

        let body: FdaResponse = resp.json().await?;
        let record = body.results.into_iter().next().map(|label| self.to_record(label));
        Ok(record.filter(|r| !r.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// RxNorm (NLM RxNav)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct RxNormClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RxDrugsResponse {
    #[serde(rename = "drugGroup", default)]
    drug_group: RxDrugGroup,
}

#[derive(Debug, Default, Deserialize)]
struct RxDrugGroup {
    #[serde(rename = "conceptGroup", default)]
    concept_group: Vec<RxConceptGroup>,
}

#[derive(Debug, Deserialize)]
struct RxConceptGroup {
    #[serde(default)]
    tty: String,
    #[serde(rename = "conceptProperties", default)]
    concept_properties: Vec<RxConcept>,
}

#[derive(Debug, Deserialize)]
struct RxConcept {
    name: String,
}

/// Brand name from the bracketed suffix of a branded concept name, e.g.
/// `aspirin 81 MG Oral Tablet [Bayer Aspirin]` → `Bayer Aspirin`.
fn bracketed_brand(concept_name: &str) -> Option<&str> {
    let trimmed = concept_name.trim_end();
    let inner = trimmed.strip_suffix(']')?;
    let start = inner.rfind('[')?;
    let brand = inner[start + 1..].trim();
    (!brand.is_empty()).then_some(brand)
}

impl RxNormClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: base(&config.rxnav_base_url)?,
        })
    }
}

#[async_trait]
impl ExternalSourceClient for RxNormClient {
    fn id(&self) -> &str {
        RXNORM
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceRecord>> {
        let resp = self
            .client
            .get(format!("{}/REST/drugs.json", self.base_url))
            .query(&[("name", name)])
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(unexpected_status(RXNORM, status)),
            _ => {}
        }

        let body: RxDrugsResponse = resp.json().await?;
        let mut record = SourceRecord::new(RXNORM);

        for group in body.drug_group.concept_group {
            for concept in group.concept_properties {
                match group.tty.as_str() {
                    "IN" if record.generic_name.is_none() => {
                        record.generic_name = Some(concept.name.trim().to_string());
                    }
                    "SBD" | "BPCK" => {
                        if let Some(brand) = bracketed_brand(&concept.name) {
                            if !record.brand_names.iter().any(|b| b == brand) {
                                record.brand_names.push(brand.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok((!record.is_empty()).then_some(record))
    }
}

// ---------------------------------------------------------------------------
// MedlinePlus Connect
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MedlinePlusClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MedlineResponse {
    #[serde(default)]
    feed: MedlineFeed,
}

#[derive(Debug, Default, Deserialize)]
struct MedlineFeed {
    #[serde(default)]
    entry: Vec<MedlineEntry>,
}

#[derive(Debug, Deserialize)]
struct MedlineEntry {
    summary: Option<MedlineValue>,
}

#[derive(Debug, Deserialize)]
struct MedlineValue {
    #[serde(rename = "_value", default)]
    value: String,
}

/// Visible text of an HTML fragment.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment.root_element().text().collect::<Vec<_>>().join(" ")
}

impl MedlinePlusClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            base_url: base(&config.medlineplus_base_url)?,
        })
    }
}

#[async_trait]
impl ExternalSourceClient for MedlinePlusClient {
    fn id(&self) -> &str {
        MEDLINEPLUS
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceRecord>> {
        let resp = self
            .client
            .get(format!("{}/service", self.base_url))
            .query(&[
                ("mainSearchCriteria.v.cs", RXNORM_CODE_SYSTEM),
                ("mainSearchCriteria.v.dn", name),
                ("informationRecipient.languageCode.c", "en"),
                ("knowledgeResponseType", "application/json"),
            ])
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(unexpected_status(MEDLINEPLUS, status)),
            _ => {}
        }

        let body: MedlineResponse = resp.json().await?;
        let used_for = body
            .feed
            .entry
            .into_iter()
            .find_map(|entry| entry.summary)
            .and_then(|summary| source_text(&html_to_text(&summary.value)));

        Ok(used_for.map(|used_for| SourceRecord {
            used_for: Some(used_for),
            ..SourceRecord::new(MEDLINEPLUS)
        }))
    }
}
