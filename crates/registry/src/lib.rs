//! Registry sources for prior-mark retrieval.
//!
//! Provides the `RegistrySource` trait and its implementations: a CSV
//! dataset, an HTTP JSON registry, an in-memory source and a fallback
//! chain. Sources only deliver raw `RegistryRecord`s; validation into
//! `Mark`s happens at the boundary in `markscreen-features`.

use markscreen_features::normalize;
use markscreen_model::{RegistryQuery, RegistryRecord};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Dataset '{0}' was not found; create it with columns for trademark name, class and status")]
    DatasetNotFound(String),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset headers must include columns for trademark name, class and status (missing: {0})")]
    MissingColumns(String),

    #[error("Dataset contains no valid trademark records")]
    NoRecords,

    #[error("Registry not available")]
    Unavailable,
}

/// Trait for registry sources (CSV, HTTP, etc.)
///
/// This abstraction allows swapping sources without changing scoring logic.
pub trait RegistrySource {
    /// Fetch prior-mark records relevant to the query.
    fn fetch(
        &self,
        query: &RegistryQuery,
    ) -> impl Future<Output = Result<Vec<RegistryRecord>, RegistryError>> + Send;

    /// Get the source name for logging and reports.
    fn name(&self) -> &'static str;
}

/// Drop repeated rows, keeping the first occurrence.
///
/// Rows are the same when name, class and status match after
/// normalization.
pub fn dedup_records(records: Vec<RegistryRecord>) -> Vec<RegistryRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((normalize(&r.name), normalize(&r.nice_class), normalize(&r.status))))
        .collect()
}

const NAME_COLUMNS: &[&str] = &["existing trademark name", "trademark name", "name", "marca", "nome"];
const CLASS_COLUMNS: &[&str] = &["class", "nice class", "classe", "ncl"];
const STATUS_COLUMNS: &[&str] = &["status", "situation", "situacao", "situação"];
const NUMBER_COLUMNS: &[&str] = &["numero", "número", "processo"];
const OWNER_COLUMNS: &[&str] = &["titular", "requerente", "owner"];

/// Parse a registry CSV export.
///
/// Headers are matched case-insensitively against known English and
/// Portuguese names. Rows without a mark name are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<RegistryRecord>, RegistryError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RegistryError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let resolve = |aliases: &[&str]| {
        aliases
            .iter()
            .find_map(|alias| headers.iter().position(|h| h == alias))
    };

    let name_col = resolve(NAME_COLUMNS);
    let class_col = resolve(CLASS_COLUMNS);
    let status_col = resolve(STATUS_COLUMNS);
    let number_col = resolve(NUMBER_COLUMNS);
    let owner_col = resolve(OWNER_COLUMNS);

    let (name_col, class_col, status_col) = match (name_col, class_col, status_col) {
        (Some(n), Some(c), Some(s)) => (n, c, s),
        _ => {
            let missing: Vec<&str> = [("name", name_col), ("class", class_col), ("status", status_col)]
                .into_iter()
                .filter(|(_, col)| col.is_none())
                .map(|(label, _)| label)
                .collect();
            return Err(RegistryError::MissingColumns(missing.join(", ")));
        }
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        let row = row.map_err(|e| RegistryError::ParseError(e.to_string()))?;
        let field = |col: Option<usize>| {
            col.and_then(|i| row.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        let name = field(Some(name_col));
        if name.is_empty() {
            skipped += 1;
            continue;
        }

        records.push(RegistryRecord {
            name,
            nice_class: field(Some(class_col)),
            status: field(Some(status_col)),
            number: field(number_col),
            owner: field(owner_col),
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped CSV rows without a mark name");
    }
    if records.is_empty() {
        return Err(RegistryError::NoRecords);
    }

    Ok(records)
}

/// Registry backed by a local CSV dataset.
///
/// Returns every row; relevance is left to the classifier.
#[derive(Debug, Clone)]
pub struct CsvRegistry {
    path: PathBuf,
}

impl CsvRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistrySource for CsvRegistry {
    async fn fetch(&self, _query: &RegistryQuery) -> Result<Vec<RegistryRecord>, RegistryError> {
        let path_text = self.path.display().to_string();
        tracing::debug!(path = %path_text, "Reading CSV registry");

        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => RegistryError::DatasetNotFound(path_text.clone()),
                _ => RegistryError::Io {
                    path: path_text.clone(),
                    source,
                },
            })?;

        parse_csv(&text)
    }

    fn name(&self) -> &'static str {
        "CSV"
    }
}

/// HTTP registry configuration.
#[derive(Debug, Clone)]
pub struct HttpRegistryConfig {
    /// Base URL of the registry search service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpRegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Registry reached over a JSON search API.
pub struct HttpRegistry {
    config: HttpRegistryConfig,
    client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(config: HttpRegistryConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Parse a search response into records.
    ///
    /// Hits without a class inherit the queried class, since the registry
    /// was searched within it.
    fn parse_response(
        &self,
        response: serde_json::Value,
        query: &RegistryQuery,
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        let hits = response
            .get("hits")
            .and_then(|h| h.as_array())
            .ok_or_else(|| RegistryError::ParseError("Missing hits array".to_string()))?;

        let pick = |hit: &serde_json::Value, keys: &[&str]| -> String {
            keys.iter()
                .find_map(|key| hit.get(*key))
                .map(|value| match value {
                    serde_json::Value::String(s) => s.trim().to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    _ => String::new(),
                })
                .unwrap_or_default()
        };

        let records = hits
            .iter()
            .map(|hit| {
                let mut nice_class = pick(hit, &["class", "nice_class", "classe", "ncl"]);
                if nice_class.is_empty() {
                    nice_class = query.nice_class.to_string();
                }
                let mut status = pick(hit, &["status", "situacao", "situação"]);
                if status.is_empty() {
                    status = "N/D".to_string();
                }

                RegistryRecord {
                    name: pick(hit, &["name", "marca", "mark_text"]),
                    nice_class,
                    status,
                    number: pick(hit, &["number", "numero", "número", "processo"]),
                    owner: pick(hit, &["owner", "titular", "requerente"]),
                }
            })
            .filter(|record| !record.name.is_empty())
            .collect();

        Ok(dedup_records(records))
    }

    /// Check if the registry is healthy.
    pub async fn health_check(&self) -> Result<(), RegistryError> {
        let response = self
            .client
            .get(self.url("health"))
            .send()
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RegistryError::Unavailable)
        }
    }
}

impl RegistrySource for HttpRegistry {
    async fn fetch(&self, query: &RegistryQuery) -> Result<Vec<RegistryRecord>, RegistryError> {
        let url = self.url("search");
        tracing::debug!(url = %url, mark = %query.mark_text, class = %query.nice_class, "Querying HTTP registry");

        let response = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::QueryFailed(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RegistryError::ParseError(e.to_string()))?;

        self.parse_response(json, query)
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

/// Fixed set of records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    records: Vec<RegistryRecord>,
}

impl MemoryRegistry {
    pub fn new(records: Vec<RegistryRecord>) -> Self {
        Self { records }
    }
}

impl RegistrySource for MemoryRegistry {
    async fn fetch(&self, _query: &RegistryQuery) -> Result<Vec<RegistryRecord>, RegistryError> {
        Ok(self.records.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Tries a primary source, falling back to a secondary one when the
/// primary fails or finds nothing.
pub struct FallbackRegistry<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackRegistry<P, S>
where
    P: RegistrySource + Sync,
    S: RegistrySource + Sync,
{
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    /// Fetch records along with the name of the source that produced them.
    pub async fn fetch_labeled(
        &self,
        query: &RegistryQuery,
    ) -> Result<(Vec<RegistryRecord>, &'static str), RegistryError> {
        match self.primary.fetch(query).await {
            Ok(records) if !records.is_empty() => {
                tracing::info!(source = self.primary.name(), records = records.len(), "Registry records loaded");
                return Ok((records, self.primary.name()));
            }
            Ok(_) => tracing::warn!(
                source = self.primary.name(),
                fallback = self.secondary.name(),
                "Primary registry returned no records, falling back"
            ),
            Err(e) => tracing::warn!(
                source = self.primary.name(),
                fallback = self.secondary.name(),
                error = %e,
                "Primary registry failed, falling back"
            ),
        }

        let records = self.secondary.fetch(query).await?;
        tracing::info!(source = self.secondary.name(), records = records.len(), "Registry records loaded");
        Ok((records, self.secondary.name()))
    }
}

impl<P, S> RegistrySource for FallbackRegistry<P, S>
where
    P: RegistrySource + Sync,
    S: RegistrySource + Sync,
{
    async fn fetch(&self, query: &RegistryQuery) -> Result<Vec<RegistryRecord>, RegistryError> {
        self.fetch_labeled(query).await.map(|(records, _)| records)
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markscreen_model::NiceClass;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    struct FailingRegistry;

    impl RegistrySource for FailingRegistry {
        async fn fetch(&self, _query: &RegistryQuery) -> Result<Vec<RegistryRecord>, RegistryError> {
            Err(RegistryError::Unavailable)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn query() -> RegistryQuery {
        RegistryQuery::new("ACME", NiceClass::new(9).unwrap())
    }

    #[test]
    fn test_parse_csv_with_portuguese_headers() {
        let text = "\u{feff}Marca,Classe,Situação,Número,Titular\n\
                    Acme,9,Registro de marca em vigor,900001,Acme SA\n\
                    ,9,vigente,900002,\n\
                    Akme,NCL(11) 9,Arquivado,900003,Akme Ltda\n";
        let records = parse_csv(text).unwrap();

        assert_eq!(
            records,
            vec![
                RegistryRecord::new("Acme", "9")
                    .with_status("Registro de marca em vigor")
                    .with_number("900001")
                    .with_owner("Acme SA"),
                RegistryRecord::new("Akme", "NCL(11) 9")
                    .with_status("Arquivado")
                    .with_number("900003")
                    .with_owner("Akme Ltda"),
            ]
        );
    }

    #[test]
    fn test_parse_csv_optional_columns() {
        let text = "Existing Trademark Name,Class,Status\nZENTRA,42,registered\n";
        let records = parse_csv(text).unwrap();
        assert_eq!(records, vec![RegistryRecord::new("ZENTRA", "42").with_status("registered")]);
    }

    #[test]
    fn test_parse_csv_missing_columns() {
        let err = parse_csv("name,owner\nACME,someone\n").unwrap_err();
        assert!(matches!(err, RegistryError::MissingColumns(ref m) if m == "class, status"));
        assert!(matches!(parse_csv(""), Err(RegistryError::MissingColumns(_))));
    }

    #[test]
    fn test_parse_csv_without_rows() {
        assert!(matches!(parse_csv("name,class,status\n"), Err(RegistryError::NoRecords)));
    }

    #[test]
    fn test_dedup_records() {
        let records = vec![
            RegistryRecord::new("ACME", "9").with_status("Vigente").with_number("1"),
            RegistryRecord::new("Acme ", "9").with_status("vigente").with_number("2"),
            RegistryRecord::new("ACME", "9").with_status("Arquivado"),
        ];
        let deduped = dedup_records(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].number, "1");
    }

    #[test]
    fn test_parse_http_response() {
        let registry = HttpRegistry::new(HttpRegistryConfig::default()).unwrap();
        let response = serde_json::json!({
            "hits": [
                {"marca": "AKME", "classe": "9", "situacao": "Deferido", "numero": 900001, "titular": "Akme Ltda"},
                {"name": "ACME TOOLS", "status": "registered"},
                {"name": "AKME", "class": "9", "status": "deferido"},
                {"name": "", "class": "9"}
            ]
        });
        let records = registry.parse_response(response, &query()).unwrap();

        assert_eq!(
            records,
            vec![
                RegistryRecord::new("AKME", "9")
                    .with_status("Deferido")
                    .with_number("900001")
                    .with_owner("Akme Ltda"),
                RegistryRecord::new("ACME TOOLS", "9").with_status("registered"),
            ]
        );
    }

    #[test]
    fn test_parse_http_response_without_hits() {
        let registry = HttpRegistry::new(HttpRegistryConfig::default()).unwrap();
        let err = registry
            .parse_response(serde_json::json!({"error": "boom"}), &query())
            .unwrap_err();
        assert!(matches!(err, RegistryError::ParseError(_)));
    }

    #[test]
    fn test_http_url_joining() {
        let registry = HttpRegistry::new(HttpRegistryConfig {
            base_url: "http://registry.local/api/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(registry.url("search"), "http://registry.local/api/search");
    }

    #[tokio::test]
    async fn test_csv_registry_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name,class,status,processo").unwrap();
        writeln!(file, "AKME,9,registered,900001").unwrap();

        let registry = CsvRegistry::new(file.path());
        let records = registry.fetch(&query()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].number, "900001");
    }

    #[tokio::test]
    async fn test_csv_registry_missing_file() {
        let registry = CsvRegistry::new("/nonexistent/marcas.csv");
        let err = registry.fetch(&query()).await.unwrap_err();
        assert!(matches!(err, RegistryError::DatasetNotFound(ref path) if path == "/nonexistent/marcas.csv"));
    }

    #[tokio::test]
    async fn test_fallback_on_error() {
        let secondary = MemoryRegistry::new(vec![RegistryRecord::new("AKME", "9")]);
        let registry = FallbackRegistry::new(FailingRegistry, secondary);

        let (records, source) = registry.fetch_labeled(&query()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source, "memory");
    }

    #[tokio::test]
    async fn test_fallback_on_empty_primary() {
        let primary = MemoryRegistry::default();
        let secondary = MemoryRegistry::new(vec![RegistryRecord::new("AKME", "9")]);
        let registry = FallbackRegistry::new(primary, secondary);

        assert_eq!(registry.fetch(&query()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_preferred() {
        let primary = MemoryRegistry::new(vec![RegistryRecord::new("ACME", "9")]);
        let registry = FallbackRegistry::new(primary, FailingRegistry);

        let (records, source) = registry.fetch_labeled(&query()).await.unwrap();
        assert_eq!(records[0].name, "ACME");
        assert_eq!(source, "memory");
    }

    #[tokio::test]
    async fn test_both_sources_failing() {
        let registry = FallbackRegistry::new(FailingRegistry, FailingRegistry);
        assert!(matches!(
            registry.fetch(&query()).await,
            Err(RegistryError::Unavailable)
        ));
    }
}
