// Remote Sheet Store
//
// Appends loan rows to a named sheet on a spreadsheet service.
// Authentication and sheet lookup happen once, at connect time.

use std::fs;
use std::path::Path;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument};

use super::{LoanStore, StoreError};
use crate::record::LoanRecord;

/// Scope requested for the service account.
pub const SHEETS_SCOPE: &str = "spreadsheets.readwrite";

/// Service-account credential file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCredentials {
    pub client_email: String,
    pub client_secret: String,
    pub token_uri: String,
    pub api_base: String,
}

impl ServiceCredentials {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read_to_string(path).map_err(|e| {
            StoreError::Connection(format!("cannot read credentials {}: {e}", path.display()))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            StoreError::Connection(format!("invalid credentials {}: {e}", path.display()))
        })
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_email: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SheetLookup {
    id: String,
}

#[derive(Debug, Serialize)]
struct AppendRequest {
    values: Vec<Vec<Value>>,
}

#[derive(Debug)]
pub struct RemoteSheetStore {
    client: Client,
    headers: HeaderMap,
    api_base: String,
    sheet_name: String,
    sheet_id: String,
}

impl RemoteSheetStore {
    /// Read credentials from `credentials_path` and connect.
    pub fn connect(credentials_path: &Path, sheet_name: &str) -> Result<Self, StoreError> {
        let credentials = ServiceCredentials::from_file(credentials_path)?;
        Self::connect_with(&credentials, sheet_name)
    }

    /// Authenticate and resolve `sheet_name` to a sheet id.
    ///
    /// Fails fast with [`StoreError::Connection`]; there is no retry.
    #[instrument(name = "remote_sheet_connect", skip(credentials), fields(client = %credentials.client_email))]
    pub fn connect_with(
        credentials: &ServiceCredentials,
        sheet_name: &str,
    ) -> Result<Self, StoreError> {
        let connection = StoreError::Connection;
        let client = Client::builder()
            .build()
            .map_err(|e| connection(format!("http client: {e}")))?;

        let token: TokenResponse = expect_success(
            client
                .post(&credentials.token_uri)
                .json(&TokenRequest {
                    client_email: &credentials.client_email,
                    client_secret: &credentials.client_secret,
                    scope: SHEETS_SCOPE,
                })
                .send(),
            "authentication",
        )
        .map_err(connection)?
        .json()
        .map_err(|e| connection(format!("authentication response: {e}")))?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|e| connection(format!("invalid access token: {e}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let api_base = credentials.api_base.trim_end_matches('/').to_string();
        let lookup: SheetLookup = expect_success(
            client
                .get(format!("{api_base}/spreadsheets"))
                .headers(headers.clone())
                .query(&[("title", sheet_name)])
                .send(),
            "sheet lookup",
        )
        .map_err(connection)?
        .json()
        .map_err(|e| connection(format!("sheet lookup response: {e}")))?;

        info!(sheet = sheet_name, id = %lookup.id, "connected to remote sheet");

        Ok(Self {
            client,
            headers,
            api_base,
            sheet_name: sheet_name.to_string(),
            sheet_id: lookup.id,
        })
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }
}

impl LoanStore for RemoteSheetStore {
    #[instrument(name = "remote_sheet_append", skip(self, record), fields(sheet = %self.sheet_name))]
    fn append(&mut self, record: &LoanRecord) -> Result<(), StoreError> {
        let url = format!("{}/spreadsheets/{}/values:append", self.api_base, self.sheet_id);
        let body = AppendRequest {
            values: vec![record.row()],
        };

        let sent = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(&body)
            .send();

        match expect_success(sent, "append") {
            Ok(_) => {
                info!(barcode = record.barcode_number(), "row appended");
                Ok(())
            }
            Err(reason) => {
                error!(%reason, "remote append failed");
                Err(StoreError::RemoteWrite(reason))
            }
        }
    }

    fn location(&self) -> String {
        format!("sheet '{}'", self.sheet_name)
    }
}

fn expect_success(sent: reqwest::Result<Response>, what: &str) -> Result<Response, String> {
    match sent {
        Ok(resp) if resp.status().is_success() => Ok(resp),
        Ok(resp) => {
            let status = resp.status();
            let detail = resp.text().unwrap_or_default();
            Err(format!("{what} failed status={status} {}", detail.trim()))
        }
        Err(e) => Err(format!("{what} failed: {e}")),
    }
}
