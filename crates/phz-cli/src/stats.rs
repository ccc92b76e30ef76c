//! `--statistics` output.

use anyhow::Result;
use phz_checker::AnalysisResult;
use serde_json::json;

pub fn print(result: &AnalysisResult, as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({
            "lines": result.total_lines,
            "errors": result.diagnostics.len(),
            "checked_files": result.files_checked,
            "ignored_files": result.files_ignored,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!("Lines analyzed:   {}", result.total_lines);
    println!("Errors:           {}", result.diagnostics.len());
    println!("Checked files:    {}", result.files_checked.len());
    for file in &result.files_checked {
        println!("  {file}");
    }
    println!("Ignored files:    {}", result.files_ignored.len());
    for file in &result.files_ignored {
        println!("  {file}");
    }
    Ok(())
}
