use super::traits::{LiteratureQuery, LiteratureSource, ProviderError, ProviderResult, SortMode};
use crate::client::{HttpClientConfig, LiteratureItem, PUBMED_ORIGIN};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// ESearch response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    esearchresult: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    error: Option<String>,
}

/// ESummary response envelope. `result` mixes a `uids` array with one
/// object per id, so records are decoded individually.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    result: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryRecord {
    uid: String,
    title: String,
    authors: Vec<SummaryAuthor>,
    source: String,
    fulljournalname: String,
    pubdate: String,
    epubdate: String,
    articleids: Vec<ArticleId>,
    /// Set instead of the document fields for ids the index cannot resolve
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryAuthor {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleId {
    idtype: String,
    value: String,
}

/// PubMed literature index via NCBI E-utilities
pub struct PubMedProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    tool: Option<String>,
    email: Option<String>,
}

impl PubMedProvider {
    /// Create a provider from the literature section of the configuration
    pub fn new(config: &Config) -> ProviderResult<Self> {
        let client =
            HttpClientConfig::from_config(config, config.literature.timeout_secs).build()?;

        Ok(Self {
            client,
            base_url: config.literature.base_url.trim_end_matches('/').to_string(),
            api_key: config.literature.api_key.clone(),
            tool: config.literature.tool.clone(),
            email: config.literature.email.clone(),
        })
    }

    fn endpoint(&self, name: &str) -> ProviderResult<Url> {
        let mut url = Url::parse(&format!("{}/{name}", self.base_url))
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("db", "pubmed").append_pair("retmode", "json");
            if let Some(key) = &self.api_key {
                pairs.append_pair("api_key", key);
            }
            if let Some(tool) = &self.tool {
                pairs.append_pair("tool", tool);
            }
            if let Some(email) = &self.email {
                pairs.append_pair("email", email);
            }
        }

        Ok(url)
    }

    fn sort_param(sort: SortMode) -> &'static str {
        match sort {
            SortMode::Relevance => "relevance",
            SortMode::Date => "pub_date",
            SortMode::Citation => {
                debug!("E-utilities has no citation sort, falling back to relevance");
                "relevance"
            }
        }
    }

    fn build_search_url(&self, query: &LiteratureQuery) -> ProviderResult<Url> {
        let mut url = self.endpoint("esearch.fcgi")?;
        url.query_pairs_mut()
            .append_pair("term", &query.query)
            .append_pair("retmax", &query.limit.to_string())
            .append_pair("sort", Self::sort_param(query.sort));
        Ok(url)
    }

    fn build_summary_url(&self, ids: &[String]) -> ProviderResult<Url> {
        let mut url = self.endpoint("esummary.fcgi")?;
        url.query_pairs_mut().append_pair("id", &ids.join(","));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ProviderResult<T> {
        debug!("PubMed request: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Parse(format!("Failed to parse PubMed JSON: {e}")))
    }

    /// Phase one: identifier search
    async fn search_ids(&self, query: &LiteratureQuery) -> ProviderResult<Vec<String>> {
        let url = self.build_search_url(query)?;
        let response: SearchResponse = self.get_json(url).await?;

        if let Some(error) = response.esearchresult.error {
            warn!("PubMed search reported an error: {}", error);
        }

        Ok(response.esearchresult.idlist)
    }

    /// Phase two: one batched summary fetch for all identifiers
    async fn fetch_summaries(&self, ids: &[String]) -> ProviderResult<Vec<LiteratureItem>> {
        let url = self.build_summary_url(ids)?;
        let response: SummaryResponse = self.get_json(url).await?;
        Ok(Self::convert_summaries(ids, &response.result))
    }

    /// Map summary records to literature items in search order, skipping
    /// ids the summary does not contain
    fn convert_summaries(
        ids: &[String],
        result: &HashMap<String, serde_json::Value>,
    ) -> Vec<LiteratureItem> {
        ids.iter()
            .filter_map(|id| {
                let Some(value) = result.get(id) else {
                    debug!("PubMed summary missing record for {}", id);
                    return None;
                };
                match serde_json::from_value::<SummaryRecord>(value.clone()) {
                    Ok(SummaryRecord {
                        error: Some(error), ..
                    }) => {
                        warn!("Skipping PubMed summary {}: {}", id, error);
                        None
                    }
                    Ok(record) => Some(Self::convert_record(id, record)),
                    Err(e) => {
                        warn!("Skipping malformed PubMed summary {}: {}", id, e);
                        None
                    }
                }
            })
            .collect()
    }

    fn convert_record(id: &str, record: SummaryRecord) -> LiteratureItem {
        let pmid = if record.uid.is_empty() {
            id.to_string()
        } else {
            record.uid
        };

        let authors = record
            .authors
            .iter()
            .map(|a| a.name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let journal = if record.source.is_empty() {
            record.fulljournalname
        } else {
            record.source
        };

        let publish_date = if record.pubdate.trim().is_empty() {
            record.epubdate
        } else {
            record.pubdate
        };

        let external_id = record
            .articleids
            .into_iter()
            .find(|a| a.idtype.eq_ignore_ascii_case("doi") && !a.value.is_empty())
            .map(|a| a.value);

        LiteratureItem {
            url: format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"),
            id: pmid,
            title: record.title.trim().to_string(),
            authors,
            journal,
            publish_date: publish_date.trim().to_string(),
            abstract_text: String::new(),
            external_id,
            relevance_score: 0,
            source: PUBMED_ORIGIN.to_string(),
        }
    }
}

#[async_trait]
impl LiteratureSource for PubMedProvider {
    fn name(&self) -> &str {
        "pubmed"
    }

    async fn search(&self, query: &LiteratureQuery) -> ProviderResult<Vec<LiteratureItem>> {
        let start_time = Instant::now();
        info!("Searching PubMed for: {} (limit {})", query.query, query.limit);

        let ids = self.search_ids(query).await?;
        if ids.is_empty() {
            debug!("PubMed returned no identifiers for '{}'", query.query);
            return Ok(Vec::new());
        }

        let items = self.fetch_summaries(&ids).await?;
        info!(
            "PubMed search completed: {} records in {:?}",
            items.len(),
            start_time.elapsed()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> PubMedProvider {
        let mut config = Config::default();
        config.literature.api_key = Some("k3y".to_string());
        PubMedProvider::new(&config).unwrap()
    }

    #[test]
    fn test_search_url_building() {
        let query = LiteratureQuery {
            query: "type 2 diabetes".to_string(),
            limit: 5,
            sort: SortMode::Date,
        };

        let url = provider().build_search_url(&query).unwrap().to_string();
        assert!(url.contains("esearch.fcgi"));
        assert!(url.contains("term=type+2+diabetes"));
        assert!(url.contains("retmax=5"));
        assert!(url.contains("sort=pub_date"));
        assert!(url.contains("api_key=k3y"));
        assert!(url.contains("retmode=json"));
    }

    #[test]
    fn test_summary_url_batches_ids() {
        let ids = vec!["1".to_string(), "22".to_string(), "333".to_string()];
        let url = provider().build_summary_url(&ids).unwrap();
        let id_param = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned());
        assert_eq!(id_param.as_deref(), Some("1,22,333"));
    }

    #[test]
    fn test_convert_summaries_keeps_search_order() {
        let ids = vec!["2".to_string(), "1".to_string(), "9".to_string()];
        let result: HashMap<String, serde_json::Value> = serde_json::from_value(json!({
            "uids": ["1", "2"],
            "1": {
                "uid": "1",
                "title": "First",
                "authors": [{"name": "Smith J"}, {"name": "Doe A"}],
                "source": "Lancet",
                "pubdate": "2022 Mar",
                "articleids": [{"idtype": "pubmed", "value": "1"}, {"idtype": "doi", "value": "10.1/x"}]
            },
            "2": {"uid": "2", "title": "Second"}
        }))
        .unwrap();

        let items = PubMedProvider::convert_summaries(&ids, &result);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "2");
        assert_eq!(items[1].authors, "Smith J, Doe A");
        assert_eq!(items[1].external_id.as_deref(), Some("10.1/x"));
        assert_eq!(items[1].url, "https://pubmed.ncbi.nlm.nih.gov/1/");
        assert_eq!(items[0].source, "PubMed");
        assert!(items[0].publish_date.is_empty());
    }

    #[test]
    fn test_convert_summaries_skips_unresolved_ids() {
        let ids = vec!["1".to_string(), "999999999999".to_string()];
        let result: HashMap<String, serde_json::Value> = serde_json::from_value(json!({
            "uids": ["1", "999999999999"],
            "1": {"uid": "1", "title": "Asthma control in children", "pubdate": "2023"},
            "999999999999": {"uid": "999999999999", "error": "cannot get document summary"}
        }))
        .unwrap();

        let items = PubMedProvider::convert_summaries(&ids, &result);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].title, "Asthma control in children");
    }
}
