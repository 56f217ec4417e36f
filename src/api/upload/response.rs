// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::pipeline::ViolationRecord;

/// Response from processing an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    /// One record per plate reading, in frame order
    pub results: Vec<ViolationRecord>,
}

impl UploadResponse {
    pub fn new(results: Vec<ViolationRecord>) -> Self {
        Self { results }
    }
}
