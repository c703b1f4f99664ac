use serde_json::json;

use crate::control::contract_registry;
use crate::error::Result;
use crate::output::{OutputFormat, ResultBuilder, print_result};

/// Print the full command/error contract report for this binary.
pub fn execute(format: OutputFormat) -> Result<()> {
	let report = contract_registry::build();
	let data = json!({
		"name": report.name,
		"version": report.version,
		"contractSchemaVersion": report.contract_schema_version,
		"commands": report.commands,
		"errors": report.errors,
		"contractFingerprint": report.contract_fingerprint,
	});

	let result = ResultBuilder::new("contract").data(data).build();
	print_result(&result, format);
	Ok(())
}
