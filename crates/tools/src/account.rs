//! Backend account API client and the auth-gated account tools
//!
//! Every tool here requires an authenticated session; the registry refuses
//! them before any network call when no bearer token is present. The token is
//! forwarded verbatim as `Authorization: Bearer` and never inspected.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use voice_gateway_config::{BackendSettings, ToolArgSpec, ToolSchema};
use voice_gateway_core::SessionContext;

use crate::{Tool, ToolError, ToolOutcome};

/// Largest transaction listing a single call may request.
const MAX_TRANSACTION_LIMIT: u64 = 20;
const DEFAULT_TRANSACTION_LIMIT: u64 = 5;

/// Thin client for the backend account API.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| ToolError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, token: &str, path: &str) -> Result<Value, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;
        parse_response(response).await
    }

    async fn post(&self, token: &str, path: &str) -> Result<Value, ToolError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport_error)?;
        parse_response(response).await
    }
}

fn map_transport_error(e: reqwest::Error) -> ToolError {
    if e.is_timeout() {
        ToolError::BackendTimeout
    } else {
        ToolError::Internal(format!("account service unreachable: {}", e))
    }
}

async fn parse_response(response: reqwest::Response) -> Result<Value, ToolError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ToolError::Unauthenticated);
    }
    if !status.is_success() {
        return Err(ToolError::BackendHttp {
            status: status.as_u16(),
        });
    }
    response
        .json()
        .await
        .map_err(|e| ToolError::Internal(format!("bad account service response: {}", e)))
}

fn token_of(ctx: &SessionContext) -> Result<&str, ToolError> {
    ctx.auth_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(ToolError::Unauthenticated)
}

fn no_arg_schema(name: &str, description: &str) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        arguments: BTreeMap::new(),
    }
}

// ---------------------------------------------------------------------------
// Response formatting. Kept as free functions so the wording is testable
// without a backend.
// ---------------------------------------------------------------------------

fn num(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

pub(crate) fn format_balance(body: &Value) -> String {
    let main = num(body, "main");
    let savings = num(body, "savings");
    let currency = text(body, "currency");
    format!(
        "Main account: {:.2} {currency}\nSavings: {:.2} {currency}\nTotal: {:.2} {currency}",
        main,
        savings,
        main + savings,
    )
}

pub(crate) fn format_details(body: &Value) -> String {
    let mut lines = vec![
        format!("Account number: {}", text(body, "account_no")),
        format!("Holder: {}", text(body, "holder")),
        format!("Type: {}", text(body, "type")),
    ];
    if let Some(object) = body.as_object() {
        for (key, value) in object {
            if matches!(key.as_str(), "account_no" | "holder" | "type") {
                continue;
            }
            match value {
                Value::String(s) => lines.push(format!("{}: {}", key, s)),
                Value::Number(n) => lines.push(format!("{}: {}", key, n)),
                Value::Bool(b) => lines.push(format!("{}: {}", key, b)),
                _ => {}
            }
        }
    }
    lines.join("\n")
}

pub(crate) fn format_transactions(body: &Value) -> String {
    let Some(items) = body.as_array() else {
        return "No recent transactions.".to_string();
    };
    if items.is_empty() {
        return "No recent transactions.".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{}: {}{:.2} {}",
                text(item, "date"),
                text(item, "sign"),
                num(item, "amount"),
                text(item, "description"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn format_card(body: &Value) -> String {
    format!(
        "Card {} is {}.\nCredit limit: {:.2}\nAvailable: {:.2}\nExpires: {}",
        text(body, "masked_pan"),
        text(body, "state"),
        num(body, "credit_limit"),
        num(body, "available"),
        text(body, "expiry"),
    )
}

pub(crate) fn format_card_state(body: &Value) -> String {
    match text(body, "state") {
        "frozen" => "Your card is now frozen. No new payments will go through.".to_string(),
        "active" => "Your card is active again.".to_string(),
        other => format!("Your card state is now: {}", other),
    }
}

pub(crate) fn format_ownership(product_type: &str, owned: bool) -> String {
    if owned {
        format!(
            "Yes, you already have a {}. You can manage it from the app.",
            product_type
        )
    } else {
        format!(
            "You don't have a {} yet. I can explain how to open one if you'd like.",
            product_type
        )
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// GET /api/account/balance
pub struct AccountBalanceTool {
    backend: Arc<BackendClient>,
}

impl AccountBalanceTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for AccountBalanceTool {
    fn name(&self) -> &str {
        "get_account_balance"
    }

    fn description(&self) -> &str {
        "Get the caller's current account balances"
    }

    fn schema(&self) -> ToolSchema {
        no_arg_schema(self.name(), self.description())
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        _args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let body = self.backend.get(token_of(ctx)?, "/api/account/balance").await?;
        Ok(ToolOutcome::Text(format_balance(&body)))
    }
}

/// GET /api/account/details
pub struct AccountDetailsTool {
    backend: Arc<BackendClient>,
}

impl AccountDetailsTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for AccountDetailsTool {
    fn name(&self) -> &str {
        "get_account_details"
    }

    fn description(&self) -> &str {
        "Get the caller's account details"
    }

    fn schema(&self) -> ToolSchema {
        no_arg_schema(self.name(), self.description())
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        _args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let body = self.backend.get(token_of(ctx)?, "/api/account/details").await?;
        Ok(ToolOutcome::Text(format_details(&body)))
    }
}

/// GET /api/transactions/recent?limit=N
pub struct RecentTransactionsTool {
    backend: Arc<BackendClient>,
}

impl RecentTransactionsTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for RecentTransactionsTool {
    fn name(&self) -> &str {
        "get_recent_transactions"
    }

    fn description(&self) -> &str {
        "List the caller's most recent transactions"
    }

    fn schema(&self) -> ToolSchema {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "limit".to_string(),
            ToolArgSpec {
                arg_type: "integer".to_string(),
                required: false,
                description: Some("How many transactions to list, at most 20".to_string()),
            },
        );
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments,
        }
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
            .clamp(1, MAX_TRANSACTION_LIMIT);

        let path = format!("/api/transactions/recent?limit={}", limit);
        let body = self.backend.get(token_of(ctx)?, &path).await?;
        Ok(ToolOutcome::Text(format_transactions(&body)))
    }
}

/// GET /api/card/details
pub struct CardDetailsTool {
    backend: Arc<BackendClient>,
}

impl CardDetailsTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for CardDetailsTool {
    fn name(&self) -> &str {
        "get_card_details"
    }

    fn description(&self) -> &str {
        "Get the caller's card details and state"
    }

    fn schema(&self) -> ToolSchema {
        no_arg_schema(self.name(), self.description())
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        _args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let body = self.backend.get(token_of(ctx)?, "/api/card/details").await?;
        Ok(ToolOutcome::Text(format_card(&body)))
    }
}

/// POST /api/card/freeze
pub struct FreezeCardTool {
    backend: Arc<BackendClient>,
}

impl FreezeCardTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for FreezeCardTool {
    fn name(&self) -> &str {
        "freeze_card"
    }

    fn description(&self) -> &str {
        "Freeze the caller's card so no new payments go through"
    }

    fn schema(&self) -> ToolSchema {
        no_arg_schema(self.name(), self.description())
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        _args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let body = self.backend.post(token_of(ctx)?, "/api/card/freeze").await?;
        Ok(ToolOutcome::Text(format_card_state(&body)))
    }
}

/// POST /api/card/unfreeze
pub struct UnfreezeCardTool {
    backend: Arc<BackendClient>,
}

impl UnfreezeCardTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for UnfreezeCardTool {
    fn name(&self) -> &str {
        "unfreeze_card"
    }

    fn description(&self) -> &str {
        "Unfreeze the caller's card"
    }

    fn schema(&self) -> ToolSchema {
        no_arg_schema(self.name(), self.description())
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        _args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let body = self.backend.post(token_of(ctx)?, "/api/card/unfreeze").await?;
        Ok(ToolOutcome::Text(format_card_state(&body)))
    }
}

/// Ownership check derived from account details.
pub struct ProductOwnershipTool {
    backend: Arc<BackendClient>,
}

impl ProductOwnershipTool {
    pub fn new(backend: Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for ProductOwnershipTool {
    fn name(&self) -> &str {
        "check_product_ownership"
    }

    fn description(&self) -> &str {
        "Check whether the caller already holds a given product"
    }

    fn schema(&self) -> ToolSchema {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "product_type".to_string(),
            ToolArgSpec {
                arg_type: "string".to_string(),
                required: true,
                description: Some("Product to check, e.g. savings, credit card".to_string()),
            },
        );
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments,
        }
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let product = args
            .get("product_type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolError::BadArguments("argument 'product_type' required".to_string())
            })?;

        let body = self.backend.get(token_of(ctx)?, "/api/account/details").await?;
        Ok(ToolOutcome::Text(format_ownership(
            product,
            owns_product(&body, product),
        )))
    }
}

/// A product counts as owned when the account type or any entry of a
/// `products` array mentions it, case-insensitively.
pub(crate) fn owns_product(details: &Value, product_type: &str) -> bool {
    let needle = product_type.to_lowercase();

    if text(details, "type").to_lowercase().contains(&needle) {
        return true;
    }

    details
        .get("products")
        .and_then(Value::as_array)
        .map(|products| {
            products
                .iter()
                .filter_map(Value::as_str)
                .any(|p| p.to_lowercase().contains(&needle))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use voice_gateway_core::AgentRole;

    #[test]
    fn test_format_balance_totals() {
        let body = json!({"main": 1234.5, "savings": 200.0, "currency": "GBP"});
        let out = format_balance(&body);
        assert!(out.contains("Main account: 1234.50 GBP"));
        assert!(out.contains("Savings: 200.00 GBP"));
        assert!(out.contains("Total: 1434.50 GBP"));
    }

    #[test]
    fn test_format_details_includes_extras() {
        let body = json!({
            "account_no": "****1234",
            "holder": "Priya Shah",
            "type": "current",
            "branch": "Manchester",
        });
        let out = format_details(&body);
        assert!(out.contains("Account number: ****1234"));
        assert!(out.contains("Holder: Priya Shah"));
        assert!(out.contains("branch: Manchester"));
    }

    #[test]
    fn test_format_transactions() {
        let body = json!([
            {"date": "2026-07-01", "description": "Coffee", "amount": 3.5, "sign": "-"},
            {"date": "2026-07-02", "description": "Salary", "amount": 2100.0, "sign": "+"},
        ]);
        let out = format_transactions(&body);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "2026-07-01: -3.50 Coffee");
        assert_eq!(lines[1], "2026-07-02: +2100.00 Salary");
    }

    #[test]
    fn test_format_transactions_empty() {
        assert_eq!(format_transactions(&json!([])), "No recent transactions.");
    }

    #[test]
    fn test_format_card_states() {
        assert!(format_card_state(&json!({"state": "frozen"})).contains("frozen"));
        assert!(format_card_state(&json!({"state": "active"})).contains("active"));
    }

    #[test]
    fn test_owns_product() {
        let details = json!({"type": "current", "products": ["savings pot", "credit card"]});
        assert!(owns_product(&details, "savings"));
        assert!(owns_product(&details, "Credit Card"));
        assert!(owns_product(&details, "current"));
        assert!(!owns_product(&details, "mortgage"));
    }

    #[test]
    fn test_format_ownership_wording() {
        assert!(format_ownership("savings", true).starts_with("Yes"));
        assert!(format_ownership("mortgage", false).contains("don't have a mortgage"));
    }

    #[tokio::test]
    async fn test_tools_refuse_without_token_before_any_network() {
        // Unroutable base URL: if the tool tried the network the error would
        // mention the transport, not authentication.
        let backend = Arc::new(
            BackendClient::new(&BackendSettings {
                base_url: "http://192.0.2.1:1".to_string(),
                timeout_ms: 50,
            })
            .unwrap(),
        );
        let ctx = SessionContext::new("s1", AgentRole::General, None, "Guest");

        let err = AccountBalanceTool::new(backend)
            .execute(&ctx, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Unauthenticated));
        assert!(err.to_string().starts_with("error: authentication required"));
    }
}
