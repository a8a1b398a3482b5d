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

//! Script references and the caller's session context

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptRefError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must not contain a path separator: {value:?}")]
    InvalidCharacter { field: &'static str, value: String },

    #[error("{field} must not be a relative path component: {value:?}")]
    Reserved { field: &'static str, value: String },
}

/// Identifies one script: its owner and its id. Both segments end up in blob
/// paths, so neither may be empty, contain a path separator, or be `.`/`..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawScriptRef")]
pub struct ScriptRef {
    owner_id: String,
    script_id: String,
}

impl ScriptRef {
    pub fn new(
        owner_id: impl Into<String>,
        script_id: impl Into<String>,
    ) -> Result<Self, ScriptRefError> {
        let owner_id = owner_id.into();
        let script_id = script_id.into();
        validate_segment("owner_id", &owner_id)?;
        validate_segment("script_id", &script_id)?;
        Ok(Self {
            owner_id,
            script_id,
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn script_id(&self) -> &str {
        &self.script_id
    }
}

/// Unchecked wire form; deserialization goes through [`ScriptRef::new`].
#[derive(Deserialize)]
struct RawScriptRef {
    owner_id: String,
    script_id: String,
}

impl TryFrom<RawScriptRef> for ScriptRef {
    type Error = ScriptRefError;

    fn try_from(raw: RawScriptRef) -> Result<Self, Self::Error> {
        Self::new(raw.owner_id, raw.script_id)
    }
}

impl fmt::Display for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.script_id)
    }
}

/// Who is acting. Passed explicitly into every operation instead of being
/// read from ambient client state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionContext")]
pub struct SessionContext {
    user_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Result<Self, ScriptRefError> {
        let user_id = user_id.into();
        validate_segment("user_id", &user_id)?;
        Ok(Self { user_id })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Reference a script owned by the session's user.
    pub fn script(&self, script_id: impl Into<String>) -> Result<ScriptRef, ScriptRefError> {
        ScriptRef::new(self.user_id.clone(), script_id)
    }
}

#[derive(Deserialize)]
struct RawSessionContext {
    user_id: String,
}

impl TryFrom<RawSessionContext> for SessionContext {
    type Error = ScriptRefError;

    fn try_from(raw: RawSessionContext) -> Result<Self, Self::Error> {
        Self::new(raw.user_id)
    }
}

fn validate_segment(field: &'static str, value: &str) -> Result<(), ScriptRefError> {
    if value.trim().is_empty() {
        return Err(ScriptRefError::Empty { field });
    }
    if value.contains('/') || value.contains('\\') {
        return Err(ScriptRefError::InvalidCharacter {
            field,
            value: value.to_string(),
        });
    }
    if value == "." || value == ".." {
        return Err(ScriptRefError::Reserved {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
