//! Shop catalog integration (`catalog` namespace), credential-gated.
//!
//! Searches the product catalog and places reservations. The API key
//! arrives with the dispatch request and is held only for that request.

use maestro_core::{Capability, DispatchContext, SkillError, SkillSet, RESULT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "catalog";
const ENV_CATALOG_API_URL: &str = "MAESTRO_CATALOG_API_URL";
const DEFAULT_API_URL: &str = "https://catalog.example/api/v1";
const QUERY_KEY: &str = "query";
const ITEM_ID_KEY: &str = "item_id";
const MATCHES_KEY: &str = "catalog_matches";
const RESERVATION_ID_KEY: &str = "reservation_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogItem {
    id: String,
    name: String,
    price: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<CatalogItem>,
}

#[derive(Serialize)]
struct ReserveRequest<'a> {
    item_id: &'a str,
}

#[derive(Deserialize)]
struct ReserveResponse {
    reservation_id: String,
}

struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CatalogClient {
    fn new(api_key: &str) -> Self {
        let base_url =
            std::env::var(ENV_CATALOG_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            api_key: api_key.to_string(),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>, SkillError> {
        let url = format!(
            "{}/items?q={}",
            self.base_url,
            urlencoding::encode(query)
        );
        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?
            .error_for_status()?;
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.items)
    }

    async fn reserve(&self, item_id: &str) -> Result<String, SkillError> {
        let response = self
            .client
            .post(format!("{}/reservations", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&ReserveRequest { item_id })
            .send()
            .await?
            .error_for_status()?;
        let parsed: ReserveResponse = response.json().await?;
        Ok(parsed.reservation_id)
    }
}

/// Skill set for the `catalog` namespace, constructed per dispatch from
/// the request credential.
pub struct CatalogSkills {
    client: Arc<CatalogClient>,
}

impl CatalogSkills {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Arc::new(CatalogClient::new(api_key)),
        }
    }
}

impl SkillSet for CatalogSkills {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        vec![
            Arc::new(Search {
                client: Arc::clone(&self.client),
            }),
            Arc::new(Reserve {
                client: Arc::clone(&self.client),
            }),
        ]
    }
}

fn search_summary(query: &str, items: &[CatalogItem]) -> String {
    if items.is_empty() {
        return format!("No catalog items matched \"{}\".", query);
    }
    let listed: Vec<String> = items
        .iter()
        .take(3)
        .map(|item| format!("{} ({})", item.name, item.price))
        .collect();
    format!(
        "{} item(s) matched \"{}\": {}.",
        items.len(),
        query,
        listed.join(", ")
    )
}

/// `catalog.search` — finds items matching the `query` variable (or the
/// raw input) and stores the matches for later steps.
struct Search {
    client: Arc<CatalogClient>,
}

#[async_trait::async_trait]
impl Capability for Search {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the shop catalog for matching items"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let query = ctx
            .get(QUERY_KEY)
            .unwrap_or_else(|| ctx.input())
            .to_string();
        let items = self.client.search(&query).await?;
        if let Some(first) = items.first() {
            ctx.set(ITEM_ID_KEY, first.id.clone());
        }
        ctx.set(MATCHES_KEY, serde_json::to_string(&items)?);
        ctx.set(RESULT_KEY, search_summary(&query, &items));
        Ok(())
    }
}

/// `catalog.reserve` — reserves the item referenced by `item_id`
/// (typically set by a preceding `catalog.search` step).
struct Reserve {
    client: Arc<CatalogClient>,
}

#[async_trait::async_trait]
impl Capability for Reserve {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "reserve"
    }

    fn description(&self) -> &str {
        "Reserve a catalog item by its id"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let item_id = ctx
            .get(ITEM_ID_KEY)
            .ok_or("catalog.reserve requires the item_id variable")?
            .to_string();
        let reservation_id = self.client.reserve(&item_id).await?;
        tracing::info!(reservation_id = %reservation_id, "catalog item reserved");
        ctx.set(RESERVATION_ID_KEY, reservation_id.clone());
        ctx.set(
            RESULT_KEY,
            format!("Reserved item {} (reservation {}).", item_id, reservation_id),
        );
        Ok(())
    }
}
