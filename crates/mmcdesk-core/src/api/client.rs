//! Typed access to the console's resources.
//!
//! Every call goes through [`AuthGateway`], so credentials, refresh and
//! session termination are handled there. This layer owns rate-limit
//! backoff, error mapping and envelope decoding.

use std::time::Duration;

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    Customer, CustomerInput, ExportLink, ListQuery, Page, Product, ProductInput, Transaction,
    TransactionInput,
};

use super::gateway::AuthGateway;
use super::request::ApiRequest;
use super::{envelope, ApiError};

// ============================================================================
// Constants
// ============================================================================

const CUSTOMERS: &str = "/api/v1/customers";
const PRODUCTS: &str = "/api/v1/products";
const PRODUCTS_EXPORT: &str = "/api/v1/products/export";
const TRANSACTIONS: &str = "/api/v1/transactions";
const HEALTH: &str = "/api/v1/health";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Page size used when loading pick lists for the transaction form.
const CHOICES_LIMIT: u32 = 50;

/// Customers and products a new transaction can reference.
#[derive(Debug, Clone)]
pub struct TransactionChoices {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
}

#[derive(Clone)]
pub struct ApiClient {
    gateway: AuthGateway,
    initial_backoff: Duration,
}

impl ApiClient {
    pub fn new(gateway: AuthGateway) -> Self {
        Self {
            gateway,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first rate-limit backoff; later retries double it.
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    // ===== Request Helpers =====

    /// Send through the gateway, backing off on 429 and mapping any other
    /// failure status to an error.
    async fn send(&self, req: &ApiRequest) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.gateway.request(req).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status.as_u16() != 429 {
                return Err(ApiError::from_response(response).await);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(
                path = %req.path,
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        let response = self.send(&req).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{} {}: {}", req.method, req.path, e)))?;
        envelope::decode(body)
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, query: &ListQuery) -> Result<Page<T>, ApiError> {
        let page: Page<T> = self.fetch(ApiRequest::get(path).query(query.to_pairs())).await?;
        debug!(path, count = page.data.len(), total = page.total, "Fetched page");
        Ok(page)
    }

    async fn create<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.fetch(ApiRequest::post(path).json(body)?).await
    }

    async fn update<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(ApiRequest::put(item_path(path, id)?).json(body)?).await
    }

    // ===== Customers =====

    pub async fn list_customers(&self, query: &ListQuery) -> Result<Page<Customer>, ApiError> {
        self.list(CUSTOMERS, query).await
    }

    pub async fn get_customer(&self, id: &str) -> Result<Customer, ApiError> {
        self.fetch(ApiRequest::get(item_path(CUSTOMERS, id)?)).await
    }

    pub async fn create_customer(&self, input: CustomerInput) -> Result<Customer, ApiError> {
        self.create(CUSTOMERS, &input.normalized()).await
    }

    pub async fn update_customer(&self, id: &str, input: CustomerInput) -> Result<Customer, ApiError> {
        self.update(CUSTOMERS, id, &input.normalized()).await
    }

    // ===== Products =====

    pub async fn list_products(&self, query: &ListQuery) -> Result<Page<Product>, ApiError> {
        self.list(PRODUCTS, query).await
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, ApiError> {
        self.fetch(ApiRequest::get(item_path(PRODUCTS, id)?)).await
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, ApiError> {
        self.create(PRODUCTS, &input.normalized()).await
    }

    pub async fn update_product(&self, id: &str, input: ProductInput) -> Result<Product, ApiError> {
        self.update(PRODUCTS, id, &input.normalized()).await
    }

    /// Ask the backend to build a spreadsheet of the products matching
    /// `query` and return where to download it.
    pub async fn export_products(&self, query: &ListQuery) -> Result<ExportLink, ApiError> {
        let link: ExportLink = self
            .fetch(ApiRequest::get(PRODUCTS_EXPORT).query(query.to_pairs()))
            .await?;
        if link.download_url.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Export response did not include a download link".to_string(),
            ));
        }
        Ok(link)
    }

    // ===== Transactions =====

    pub async fn list_transactions(&self, query: &ListQuery) -> Result<Page<Transaction>, ApiError> {
        self.list(TRANSACTIONS, query).await
    }

    pub async fn get_transaction(&self, id: &str) -> Result<Transaction, ApiError> {
        self.fetch(ApiRequest::get(item_path(TRANSACTIONS, id)?)).await
    }

    pub async fn create_transaction(&self, input: TransactionInput) -> Result<Transaction, ApiError> {
        self.create(TRANSACTIONS, &input.normalized()).await
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        input: TransactionInput,
    ) -> Result<Transaction, ApiError> {
        self.update(TRANSACTIONS, id, &input.normalized()).await
    }

    /// Load the customer and product pick lists concurrently.
    pub async fn transaction_choices(&self) -> Result<TransactionChoices, ApiError> {
        let query = ListQuery::new().limit(CHOICES_LIMIT);
        let (customers, products) = futures::try_join!(
            self.list_customers(&query),
            self.list_products(&query)
        )?;
        Ok(TransactionChoices {
            customers: customers.data,
            products: products.data,
        })
    }

    // ===== Diagnostics =====

    /// Backend health probe. The payload shape is not fixed, so it is
    /// returned as-is after unwrapping the envelope.
    pub async fn health(&self) -> Result<Value, ApiError> {
        let response = self.send(&ApiRequest::get(HEALTH)).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let body = serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
        Ok(envelope::unwrap_data(body))
    }
}

/// `{collection}/{id}`, rejecting ids that would escape the collection.
fn item_path(collection: &str, id: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidRequest(format!("Invalid id: {:?}", id)));
    }
    Ok(format!("{}/{}", collection, id))
}
