use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::models::{Company, Employee, Invitation};
use super::PayrollBackend;
use crate::error::{PayflowError, Result};
use crate::invoicing::{Invoice, InvoiceStatus};
use crate::payroll::{MonthlyVariables, Payslip, PayslipStatus};

const COMPANIES: &str = "companies";
const EMPLOYEES: &str = "employees";
const MONTHLY_VARIABLES: &str = "monthly_variables";
const PAYSLIPS: &str = "payslips";
const INVOICES: &str = "invoices";
const INVITATIONS: &str = "invitations";

/// Backend over a PostgREST-style HTTP API (`{url}/rest/v1/{table}`).
///
/// The key is sent both as `apikey` and as a bearer token, and is
/// redacted from debug output.
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    key: SecretString,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl RestBackend {
    /// Create a client for the API at `url`.
    pub fn new(url: &str, key: impl Into<SecretString>, timeout: Duration) -> Result<Self> {
        let url = url.trim().trim_end_matches('/');
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PayflowError::bad_request(format!(
                "Backend URL must start with http:// or https://, got {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("payflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PayflowError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", url),
            key: key.into(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let key = self.key.expose_secret();
        self.client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", key)
            .bearer_auth(key)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, filters: &[(&str, String)]) -> Result<Vec<T>> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, column: &str, value: &str) -> Result<Option<T>> {
        let rows = self
            .select(table, &[(column, eq(value)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Patch one row by id; an empty representation means the id is unknown.
    async fn patch_by_id(&self, table: &str, id: &str, body: serde_json::Value) -> Result<()> {
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&[("id", eq(id))])
            .json(&body)
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = check(response).await?.json().await?;
        if rows.is_empty() {
            return Err(PayflowError::not_found(format!("{} row {}", table, id)));
        }
        Ok(())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Map non-success statuses to errors, keeping the response body for context.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        target: "payflow::backend",
        status = %status,
        body = %body,
        "Backend request failed"
    );
    Err(match status.as_u16() {
        404 => PayflowError::not_found(format!("Backend resource: {}", body)),
        409 => PayflowError::bad_request(format!("Conflict: {}", body)),
        400 | 422 => PayflowError::bad_request(format!("Rejected by backend: {}", body)),
        502..=504 => PayflowError::unavailable(format!("Backend returned {}", status)),
        _ => PayflowError::remote(format!("Backend returned {}: {}", status, body)),
    })
}

#[async_trait]
impl PayrollBackend for RestBackend {
    async fn insert_company(&self, company: &Company) -> Result<()> {
        self.insert(COMPANIES, company).await
    }

    async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        self.select_one(COMPANIES, "id", id).await
    }

    async fn list_clients(&self, provider_id: &str) -> Result<Vec<Company>> {
        self.select(
            COMPANIES,
            &[
                ("provider_id", eq(provider_id)),
                ("kind", eq("client")),
                ("deleted_at", "is.null".to_string()),
                ("order", "name.asc".to_string()),
            ],
        )
        .await
    }

    async fn soft_delete_company(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        self.patch_by_id(COMPANIES, id, json!({ "deleted_at": deleted_at })).await
    }

    async fn restore_company(&self, company: &Company) -> Result<()> {
        let mut restored = company.clone();
        restored.deleted_at = None;
        self.upsert(COMPANIES, &restored).await
    }

    async fn insert_employee(&self, employee: &Employee) -> Result<()> {
        self.insert(EMPLOYEES, employee).await
    }

    async fn get_employee(&self, id: &str) -> Result<Option<Employee>> {
        self.select_one(EMPLOYEES, "id", id).await
    }

    async fn list_employees_for_client(&self, client_company_id: &str) -> Result<Vec<Employee>> {
        self.select(
            EMPLOYEES,
            &[
                ("client_company_id", eq(client_company_id)),
                ("deleted_at", "is.null".to_string()),
                ("order", "last_name.asc,first_name.asc".to_string()),
            ],
        )
        .await
    }

    async fn count_active_employees(&self, company_id: &str) -> Result<u32> {
        let rows: Vec<serde_json::Value> = self
            .select(
                EMPLOYEES,
                &[
                    ("company_id", eq(company_id)),
                    ("deleted_at", "is.null".to_string()),
                ],
            )
            .await?;
        u32::try_from(rows.len()).map_err(|_| PayflowError::internal("Employee count overflow"))
    }

    async fn soft_delete_employee(&self, id: &str, deleted_at: DateTime<Utc>) -> Result<()> {
        self.patch_by_id(EMPLOYEES, id, json!({ "deleted_at": deleted_at })).await
    }

    async fn restore_employee(&self, employee: &Employee) -> Result<()> {
        let mut restored = employee.clone();
        restored.deleted_at = None;
        self.upsert(EMPLOYEES, &restored).await
    }

    async fn save_variables(&self, variables: &MonthlyVariables) -> Result<()> {
        self.upsert(MONTHLY_VARIABLES, variables).await
    }

    async fn get_variables(&self, id: &str) -> Result<Option<MonthlyVariables>> {
        self.select_one(MONTHLY_VARIABLES, "id", id).await
    }

    async fn insert_payslip(&self, payslip: &Payslip) -> Result<()> {
        self.insert(PAYSLIPS, payslip).await
    }

    async fn get_payslip(&self, id: &str) -> Result<Option<Payslip>> {
        self.select_one(PAYSLIPS, "id", id).await
    }

    async fn find_payslip_by_variables(&self, variables_id: &str) -> Result<Option<Payslip>> {
        self.select_one(PAYSLIPS, "variables_id", variables_id).await
    }

    async fn update_payslip_status(&self, id: &str, status: PayslipStatus) -> Result<()> {
        self.patch_by_id(PAYSLIPS, id, json!({ "status": status })).await
    }

    async fn list_payslips_for_employee(&self, employee_id: &str) -> Result<Vec<Payslip>> {
        self.select(
            PAYSLIPS,
            &[
                ("employee_id", eq(employee_id)),
                ("order", "year.desc,month.desc".to_string()),
            ],
        )
        .await
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        self.insert(INVOICES, invoice).await
    }

    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>> {
        self.select_one(INVOICES, "id", id).await
    }

    async fn update_invoice_status(&self, id: &str, status: InvoiceStatus) -> Result<()> {
        self.patch_by_id(INVOICES, id, json!({ "status": status })).await
    }

    async fn list_invoices_for_client(&self, client_company_id: &str) -> Result<Vec<Invoice>> {
        self.select(
            INVOICES,
            &[
                ("client_company_id", eq(client_company_id)),
                ("order", "issue_date.desc".to_string()),
            ],
        )
        .await
    }

    async fn insert_invitation(&self, invitation: &Invitation) -> Result<()> {
        self.insert(INVITATIONS, invitation).await
    }

    async fn find_invitation_by_token(&self, token: &str) -> Result<Option<Invitation>> {
        self.select_one(INVITATIONS, "token", token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let backend = RestBackend::new(
            "https://db.example.com/",
            SecretString::from("anon-key"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(backend.base_url(), "https://db.example.com/rest/v1");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = RestBackend::new("db.example.com", "anon-key", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, PayflowError::BadRequest(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let backend =
            RestBackend::new("https://db.example.com", "super-secret", Duration::from_secs(5)).unwrap();
        let debug = format!("{:?}", backend);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_filter_format() {
        assert_eq!(eq("abc"), "eq.abc");
    }

    mod http {
        use super::*;
        use chrono::TimeZone;
        use rust_decimal_macros::dec;
        use wiremock::matchers::{body_partial_json, header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn backend(server: &MockServer) -> RestBackend {
            RestBackend::new(&server.uri(), "anon-key", Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn test_get_company_selects_by_id() {
            let server = MockServer::start().await;
            let company = Company::provider("Provider A");

            Mock::given(method("GET"))
                .and(path("/rest/v1/companies"))
                .and(header("apikey", "anon-key"))
                .and(header("authorization", "Bearer anon-key"))
                .and(query_param("select", "*"))
                .and(query_param("id", format!("eq.{}", company.id)))
                .and(query_param("limit", "1"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([company])))
                .expect(1)
                .mount(&server)
                .await;

            let found = backend(&server).await.get_company(&company.id).await.unwrap();
            assert_eq!(found, Some(company));
        }

        #[tokio::test]
        async fn test_get_company_empty_result_is_none() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/companies"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;

            assert!(backend(&server).await.get_company("missing").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn test_insert_employee_posts_minimal() {
            let server = MockServer::start().await;
            let employee = Employee::new("provider_a", "Jeanne", "Martin", "j@example.com", dec!(45));

            Mock::given(method("POST"))
                .and(path("/rest/v1/employees"))
                .and(header("prefer", "return=minimal"))
                .and(header("apikey", "anon-key"))
                .and(body_partial_json(json!({ "id": employee.id, "company_id": "provider_a" })))
                .respond_with(ResponseTemplate::new(201))
                .expect(1)
                .mount(&server)
                .await;

            backend(&server).await.insert_employee(&employee).await.unwrap();
        }

        #[tokio::test]
        async fn test_soft_delete_patches_deleted_at() {
            let server = MockServer::start().await;
            let deleted_at = Utc.with_ymd_and_hms(2025, 3, 31, 17, 0, 0).unwrap();

            Mock::given(method("PATCH"))
                .and(path("/rest/v1/employees"))
                .and(query_param("id", "eq.emp_1"))
                .and(header("prefer", "return=representation"))
                .and(body_partial_json(json!({ "deleted_at": deleted_at })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "emp_1" }])))
                .expect(1)
                .mount(&server)
                .await;

            backend(&server)
                .await
                .soft_delete_employee("emp_1", deleted_at)
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_patch_of_unknown_id_is_not_found() {
            let server = MockServer::start().await;
            Mock::given(method("PATCH"))
                .and(path("/rest/v1/invoices"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;

            let err = backend(&server)
                .await
                .update_invoice_status("inv_1", InvoiceStatus::Paid)
                .await
                .unwrap_err();
            assert!(matches!(err, PayflowError::NotFound(_)));
        }

        #[tokio::test]
        async fn test_status_mapping() {
            let cases = [
                (404, "not_found"),
                (409, "bad_request"),
                (422, "bad_request"),
                (503, "unavailable"),
                (500, "remote"),
            ];

            for (status, expected) in cases {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path("/rest/v1/invitations"))
                    .respond_with(ResponseTemplate::new(status).set_body_string("rejected"))
                    .mount(&server)
                    .await;

                let invitation = Invitation::new(
                    "provider_a",
                    "b@example.com",
                    crate::backend::InvitationRole::Client,
                    Utc::now(),
                );
                let err = backend(&server)
                    .await
                    .insert_invitation(&invitation)
                    .await
                    .unwrap_err();
                let kind = match err {
                    PayflowError::NotFound(_) => "not_found",
                    PayflowError::BadRequest(_) => "bad_request",
                    PayflowError::Unavailable(_) => "unavailable",
                    PayflowError::Remote(_) => "remote",
                    other => panic!("unexpected error for {}: {:?}", status, other),
                };
                assert_eq!(kind, expected, "status {}", status);
            }
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let backend =
            RestBackend::new("http://127.0.0.1:9", "anon-key", Duration::from_secs(2)).unwrap();
        let err = backend.get_company("c1").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }
}
