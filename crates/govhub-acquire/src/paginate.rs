//! Offset-paginated JSON collection
//!
//! Assembles a complete [`Table`] from a cursor/offset-paginated API.
//! Government APIs disagree on response envelopes: some return a bare
//! array, others wrap the page in `data`, `results` or `items`. The probe
//! order is fixed.
//!
//! A page failure does not discard what was already collected; the partial
//! table is returned as-is (an empty table is a valid result when the first
//! page fails).

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::transport::{FetchOutcome, TransportClient};
use govhub_common::config::DownloadSettings;
use govhub_common::types::{EndpointSpec, Record, Table};

/// Envelope keys probed, in priority order, when a page is an object.
const ENVELOPE_KEYS: [&str; 3] = ["data", "results", "items"];

/// Collects all pages of an offset-paginated JSON endpoint.
pub struct PaginatedCollector<'a> {
    transport: &'a TransportClient,
    retry: RetryPolicy,
    page_size: usize,
    max_pages: u32,
    rate_limit_delay: Duration,
}

impl<'a> PaginatedCollector<'a> {
    pub fn new(
        transport: &'a TransportClient,
        retry: RetryPolicy,
        page_size: usize,
        max_pages: u32,
        rate_limit_delay: Duration,
    ) -> Self {
        Self {
            transport,
            retry,
            page_size,
            max_pages,
            rate_limit_delay,
        }
    }

    pub fn from_settings(transport: &'a TransportClient, settings: &DownloadSettings) -> Self {
        Self::new(
            transport,
            RetryPolicy::from_settings(settings),
            settings.page_size,
            settings.max_pages,
            settings.rate_limit_delay(),
        )
    }

    /// Collect every available page into one table.
    ///
    /// Terminates on a short page, an empty or unrecognizable payload,
    /// `max_pages`, or a final page failure; collected pages survive all of
    /// these.
    pub async fn collect_all(&self, endpoint: &EndpointSpec) -> Table {
        let mut table = Table::new();

        for page in 0..self.max_pages {
            let params = [
                ("offset", (page as usize * self.page_size).to_string()),
                ("limit", self.page_size.to_string()),
            ];
            info!(page = page + 1, max_pages = self.max_pages, "collecting page");

            let outcome = self
                .retry
                .run(|| self.transport.fetch(&endpoint.url, &endpoint.headers, Some(&params)))
                .await;

            let response = match outcome {
                FetchOutcome::Success(response) => response,
                failed => {
                    warn!(
                        page = page + 1,
                        reason = %failed.reason(),
                        "page failed, keeping {} records collected so far",
                        table.len()
                    );
                    break;
                },
            };

            let payload: Value = match response.json().await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(page = page + 1, error = %e, "response is not valid JSON");
                    break;
                },
            };

            let items = match extract_page(&payload) {
                Some(items) => items,
                None => {
                    warn!(page = page + 1, "unexpected response envelope");
                    break;
                },
            };

            if items.is_empty() {
                info!("no more data to collect");
                break;
            }

            let page_len = items.len();
            for item in items {
                if let Some(record) = record_from_json(item) {
                    table.push_row(record);
                } else {
                    debug!("skipping non-object page entry");
                }
            }
            info!(page = page + 1, records = page_len, "page collected");

            if page_len < self.page_size {
                info!("short page, collection complete");
                break;
            }

            // Always pause between pages, upstream services are shared
            // infrastructure.
            tokio::time::sleep(self.rate_limit_delay).await;
        }

        info!(records = table.len(), "pagination finished");
        table
    }
}

/// Pull the record array out of a page payload.
///
/// Bare arrays win; objects are probed for `data`, `results`, `items` in
/// that order. Anything else is an unrecognizable envelope.
fn extract_page(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => ENVELOPE_KEYS.iter().find_map(|key| {
            map.get(*key).and_then(|value| value.as_array())
        }),
        _ => None,
    }
}

/// Flatten one JSON object into a record.
///
/// Scalars are stringified, null becomes a missing column (not an empty
/// value), nested structures are kept as compact JSON text.
fn record_from_json(value: &Value) -> Option<Record> {
    let map = value.as_object()?;
    let mut record = Record::new();
    for (key, value) in map {
        match value {
            Value::Null => {},
            Value::String(s) => record.insert(key, s.clone()),
            Value::Number(n) => record.insert(key, n.to_string()),
            Value::Bool(b) => record.insert(key, b.to_string()),
            nested => record.insert(key, nested.to_string()),
        }
    }
    Some(record)
}

// ============================================================================
// Tests
// ============================================================================
