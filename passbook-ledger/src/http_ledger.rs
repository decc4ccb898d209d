//! Actual Budget ledger over actual-http-api.
//!
//! Endpoints used:
//!   GET  /v1/budgets/{budget}/accounts/{account}/transactions?since_date=..&until_date=..
//!   GET  /v1/budgets/{budget}/categories
//!   POST /v1/budgets/{budget}/accounts/{account}/transactions/batch
//!
//! Amounts travel as integer minor units. Staged rows are posted as one batch per account on
//! commit, so a failure leaves nothing behind.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use passbook_core::{ExistingRecord, Transaction, format_amount};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category_rules::categorize;
use crate::error::SinkError;
use crate::sink::LedgerSink;

#[derive(Debug, Clone, Serialize)]
struct NewTransaction {
    date: NaiveDate,
    amount: i64,
    payee_name: String,
    imported_payee: String,
    imported_id: String,
    notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    cleared: bool,
    /// Resolved to `category` at commit.
    #[serde(skip)]
    category_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    learn_categories: bool,
    run_transfers: bool,
    transactions: &'a [NewTransaction],
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PostedTransaction {
    date: NaiveDate,
    amount: i64,
    #[serde(default)]
    imported_payee: Option<String>,
    #[serde(default)]
    payee_name: Option<String>,
}

impl PostedTransaction {
    fn into_existing(self) -> ExistingRecord {
        let description = self
            .imported_payee
            .filter(|p| !p.is_empty())
            .or(self.payee_name)
            .unwrap_or_default();
        ExistingRecord::new(self.date, description, Decimal::new(self.amount, 2))
    }
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: String,
    name: String,
}

/// Signed amount in minor units (paise / cents).
pub fn minor_units(amount: Decimal) -> Option<i64> {
    let mut value = amount.round_dp(2);
    value.rescale(2);
    i64::try_from(value.mantissa()).ok()
}

pub struct ActualHttpLedger {
    client: reqwest::Client,
    base_url: String,
    budget: String,
    api_key: String,
    staged: BTreeMap<String, Vec<NewTransaction>>,
    categories: Option<HashMap<String, String>>,
}

impl ActualHttpLedger {
    pub fn new(
        base_url: impl Into<String>,
        budget: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            budget: budget.into(),
            api_key: api_key.into(),
            staged: BTreeMap::new(),
            categories: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/budgets/{}{}", self.base_url, self.budget, path)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SinkError> {
        let resp = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let resp = check(resp).await?;
        let out: DataResponse<T> = resp
            .json()
            .await
            .map_err(|e| SinkError::Unavailable(format!("parse {url}: {e}")))?;
        Ok(out.data)
    }

    async fn category_ids(&mut self) -> Result<&HashMap<String, String>, SinkError> {
        if self.categories.is_none() {
            let entries: Vec<CategoryEntry> = self.get(&self.url("/categories"), &[]).await?;
            self.categories = Some(entries.into_iter().map(|c| (c.name, c.id)).collect());
        }
        Ok(self.categories.get_or_insert_with(HashMap::new))
    }
}

fn transport(e: reqwest::Error) -> SinkError {
    SinkError::Unavailable(e.to_string())
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SinkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let txt = resp.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        Err(SinkError::Conflict(txt))
    } else {
        Err(SinkError::Unavailable(format!("{status} {txt}")))
    }
}

#[async_trait]
impl LedgerSink for ActualHttpLedger {
    async fn list_existing(
        &mut self,
        account: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExistingRecord>, SinkError> {
        let url = self.url(&format!("/accounts/{account}/transactions"));
        let query = [
            ("since_date", from.to_string()),
            ("until_date", to.to_string()),
        ];
        let posted: Vec<PostedTransaction> = self.get(&url, &query).await?;
        Ok(posted
            .into_iter()
            .filter(|t| t.date >= from && t.date <= to)
            .map(PostedTransaction::into_existing)
            .collect())
    }

    async fn create(&mut self, account: &str, txn: &Transaction) -> Result<(), SinkError> {
        let staged = self.staged.entry(account.to_string()).or_default();
        let imported_id = txn.fingerprint().to_string();
        if staged.iter().any(|t| t.imported_id == imported_id) {
            return Err(SinkError::Conflict(format!("{imported_id} already staged")));
        }
        let amount = minor_units(txn.amount()).ok_or_else(|| {
            SinkError::Unavailable(format!("amount {} out of range", txn.amount()))
        })?;

        staged.push(NewTransaction {
            date: txn.date(),
            amount,
            payee_name: txn.description().to_string(),
            imported_payee: txn.description().to_string(),
            imported_id,
            notes: format!(
                "Page {} | Balance: {}",
                txn.page() + 1,
                format_amount(txn.balance())
            ),
            category: None,
            cleared: true,
            category_name: categorize(txn).name().to_string(),
        });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), SinkError> {
        if self.staged.values().all(|v| v.is_empty()) {
            return Ok(());
        }

        let ids = self.category_ids().await?.clone();
        let accounts: Vec<String> = self.staged.keys().cloned().collect();
        for account in accounts {
            let url = self.url(&format!("/accounts/{account}/transactions/batch"));
            let Some(batch) = self.staged.get_mut(&account) else {
                continue;
            };
            for txn in batch.iter_mut() {
                txn.category = ids.get(&txn.category_name).cloned();
            }
            let body = BatchRequest {
                learn_categories: false,
                run_transfers: false,
                transactions: batch,
            };
            let resp = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(transport)?;
            check(resp).await?;
            debug!(%account, rows = batch.len(), "posted batch");
            // A retried commit only resends batches still staged.
            self.staged.remove(&account);
        }
        Ok(())
    }

    async fn rollback(&mut self) {
        self.staged.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_core::Fingerprint;

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units(Decimal::new(-1200, 2)), Some(-1200));
        assert_eq!(minor_units(Decimal::new(65760705, 2)), Some(65760705));
        assert_eq!(minor_units(Decimal::new(5, 0)), Some(500));
        assert_eq!(minor_units(Decimal::new(12345, 3)), Some(1234));
    }

    #[test]
    fn test_posted_transaction_to_existing() {
        let body = r#"{"data": [
            {"id": "a", "date": "2025-07-01", "amount": -1200, "imported_payee": "UPI/merchant/ref", "payee_name": "merchant"},
            {"id": "b", "date": "2025-07-02", "amount": 500000, "payee_name": "Opening Balance"}
        ]}"#;
        let parsed: DataResponse<PostedTransaction> = serde_json::from_str(body).unwrap();
        let existing: Vec<ExistingRecord> =
            parsed.data.into_iter().map(PostedTransaction::into_existing).collect();
        assert_eq!(existing[0].description, "UPI/merchant/ref");
        assert_eq!(existing[0].amount, Decimal::new(-1200, 2));
        assert_eq!(existing[1].description, "Opening Balance");
    }

    #[tokio::test]
    async fn test_stage_and_rollback() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let amount = Decimal::new(-1200, 2);
        let txn = Transaction::new(
            date,
            "UPI/merchant/ref",
            "UPI",
            amount,
            Decimal::new(65760705, 2),
            "icici",
            2,
            Fingerprint::compute(date, "UPI/merchant/ref", amount, 0),
        );

        let mut ledger = ActualHttpLedger::new("http://127.0.0.1:1/", "budget", "key");
        ledger.create("acct", &txn).await.unwrap();
        let staged = &ledger.staged["acct"][0];
        assert_eq!(staged.amount, -1200);
        assert_eq!(staged.notes, "Page 3 | Balance: 657607.05");
        assert_eq!(staged.imported_id, txn.fingerprint().as_str());

        assert!(matches!(
            ledger.create("acct", &txn).await,
            Err(SinkError::Conflict(_))
        ));

        ledger.rollback().await;
        assert!(ledger.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let mut ledger = ActualHttpLedger::new("http://127.0.0.1:1", "budget", "key");
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let err = ledger.list_existing("acct", date, date).await.unwrap_err();
        assert!(matches!(err, SinkError::Unavailable(_)));
    }

    #[test]
    fn test_batch_body_shape() {
        let body = BatchRequest {
            learn_categories: false,
            run_transfers: false,
            transactions: &[],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["learnCategories"], false);
        assert_eq!(json["runTransfers"], false);
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }
}
