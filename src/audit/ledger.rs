// Copyright (c) 2026 open-pit-labs
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/open-pit-labs/pitwatch-rs

//! External immutable-ledger client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AuditConfig;

/// Boundary to the external immutable ledger.
///
/// `anchor` may fail or time out; callers treat failure as terminal for the
/// record (no retry) and the record stays valid without an anchor.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a content reference, returning the ledger transaction reference.
    async fn anchor(&self, record_id: &str, payload_hash: &str) -> Result<String>;
}

#[derive(Serialize)]
struct AnchorRequest<'a> {
    record_id: &'a str,
    payload_hash: &'a str,
}

#[derive(Deserialize)]
struct AnchorResponse {
    tx_ref: String,
}

/// HTTP client for the ledger gateway
pub struct HttpLedgerClient {
    client: reqwest::Client,
    url: String,
}

impl HttpLedgerClient {
    pub fn new(config: &AuditConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.anchor_timeout_secs))
            .build()
            .context("failed to build ledger HTTP client")?;

        Ok(Self {
            client,
            url: config.ledger_url.clone(),
        })
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn anchor(&self, record_id: &str, payload_hash: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnchorRequest {
                record_id,
                payload_hash,
            })
            .send()
            .await
            .context("ledger request failed")?
            .error_for_status()
            .context("ledger rejected anchor request")?;

        let body: AnchorResponse = response
            .json()
            .await
            .context("malformed ledger response")?;

        Ok(body.tx_ref)
    }
}
