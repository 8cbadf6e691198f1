// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use uagraph_config::UaGraphConfig;

use crate::cli::{Cli, ValidateArgs};
use crate::error::BinResult;

use super::print_json;

/// Executes the `validate` command.
///
/// The configuration has already been loaded and validated by the time this
/// runs; this reports the outcome and the warnings worth knowing about.
pub fn validate(cli: &Cli, config: &UaGraphConfig, args: &ValidateArgs) -> BinResult<()> {
    let warnings = collect_warnings(config);

    let output = serde_json::json!({
        "valid": true,
        "config_path": cli.config.as_ref().map(|p| p.display().to_string()),
        "summary": {
            "max_references_per_node": config.browse.max_references_per_node,
            "max_continuations": config.browse.max_continuations,
            "single_writer": config.expansion.create_single_writer,
            "levels_to_expand": config.expansion.levels_to_expand,
            "operation_deadline": config
                .engine
                .operation_deadline
                .map(|d| humantime::format_duration(d).to_string()),
            "log_level": config.logging.level.as_str(),
        },
        "warnings": warnings,
        "config": if args.show_config { Some(config) } else { None },
    });
    print_json(&output)
}

fn collect_warnings(config: &UaGraphConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.engine.operation_deadline.is_none() {
        warnings.push("No operation deadline configured; operations run until completion".to_string());
    }
    if config.expansion.discard_errors {
        warnings.push("expansion.discard_errors hides failing branches from the output".to_string());
    }
    if config.codec.max_array_length == 0 && !config.codec.strict_dimensions {
        warnings.push("Array shapes are not validated before writes".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_collect_warnings() {
        let mut config = UaGraphConfig::default();
        assert_eq!(collect_warnings(&config).len(), 1);

        config.engine.operation_deadline = Some(Duration::from_secs(5));
        config.expansion.discard_errors = true;
        config.codec.strict_dimensions = false;
        assert_eq!(collect_warnings(&config).len(), 2);
    }
}
