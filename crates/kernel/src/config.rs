// Copyright (C) 2026 The Loomhaven Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Configuration knobs, plus logging verbosity. Built by the embedding
//! host and passed into [`crate::engine::ScriptEngine`] at construction.

use loom_compiler::PrecompileOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Execution limits and compilation policy, plus the ambient logging knob
/// a complete core needs a place to carry even though startup wiring owns
/// installing the actual subscriber.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Per-invocation wall-clock deadline, in milliseconds.
    pub max_execution_time_ms: u64,
    /// Maximum nested verb+function depth.
    pub max_call_depth: u32,
    /// Whether compilation warnings fail the unit.
    pub warnings_as_errors: bool,
    /// Warning codes excluded from `warnings_as_errors`.
    pub filtered_warning_codes: HashSet<String>,
    /// `tracing`/`tracing-subscriber` env-filter directive for the
    /// embedding host to install (e.g. `"loom_kernel=debug,info"`). The
    /// core never installs a global subscriber itself; it only carries the
    /// preferred default so the host doesn't have to invent one.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_execution_time_ms: 5000,
            max_call_depth: 32,
            warnings_as_errors: true,
            filtered_warning_codes: ["nullable-assignment", "nullable-member-access"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn precompile_options(&self) -> PrecompileOptions {
        PrecompileOptions {
            warnings_as_errors: self.warnings_as_errors,
            filtered_warning_codes: self.filtered_warning_codes.clone(),
        }
    }

    pub fn max_execution_time(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.max_execution_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_execution_time_ms, 5000);
        assert_eq!(config.max_call_depth, 32);
        assert!(config.warnings_as_errors);
        assert!(config
            .filtered_warning_codes
            .contains("nullable-assignment"));
    }
}
