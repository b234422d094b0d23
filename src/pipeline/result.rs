// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scan result returned to clients

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::text::{ExtractedFields, PRIMARY_FIELDS};

/// Result of one scan, serialized as the `POST /api/v1/scan` body
///
/// Missing first-class fields serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResponse {
    pub scan_id: String,
    pub detected_language: String,
    #[serde(default)]
    pub raw_text: String,
    pub id_number: Option<String>,
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ScanResponse {
    /// Split extracted fields into first-class fields and metadata
    pub fn new(
        scan_id: impl Into<String>,
        detected_language: impl Into<String>,
        raw_text: impl Into<String>,
        mut fields: ExtractedFields,
    ) -> Self {
        let [id_number, name, date_of_birth, address] =
            PRIMARY_FIELDS.map(|field| fields.remove(field));

        let metadata = fields
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();

        Self {
            scan_id: scan_id.into(),
            detected_language: detected_language.into(),
            raw_text: raw_text.into(),
            id_number,
            name,
            date_of_birth,
            address,
            metadata,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
