// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Upload-time content checks

use scriptvault_core::VersioningConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("content is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),
}

/// Reject malformed schedule content before anything is uploaded. Blank
/// content is always allowed; it is what a replacement default version holds.
pub fn validate_content(content: &[u8], config: &VersioningConfig) -> Result<(), ContentError> {
    if !config.validate_json {
        return Ok(());
    }

    let text = std::str::from_utf8(content)?;
    if text.trim().is_empty() {
        return Ok(());
    }

    serde_json::from_str::<serde_json::Value>(text)?;
    Ok(())
}
