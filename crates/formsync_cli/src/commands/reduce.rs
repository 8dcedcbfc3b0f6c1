//! Reduce command implementation.

use crate::commands::report::SnapshotReport;
use formsync_core::{reducer, Reduction, Snapshot};
use formsync_protocol::Action;
use std::path::Path;
use tracing::info;

/// Reads an action list from `path` and reduces it onto an empty snapshot.
pub fn reduce_file(path: &Path) -> Result<Reduction, Box<dyn std::error::Error>> {
    info!("Reducing actions from {:?}", path);
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    let actions = Action::decode_batch(&bytes)?;
    let reduction = reducer::apply(&Snapshot::new(), &actions, None);
    info!(
        "Reduced {} actions, {} rejected",
        actions.len(),
        reduction.rejected.len()
    );
    Ok(reduction)
}

/// Runs the reduce command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reduction = reduce_file(path)?;
    let report = SnapshotReport::new(&reduction.snapshot);

    match format {
        "json" => {
            let rejected: Vec<String> = reduction.rejected.iter().map(ToString::to_string).collect();
            let output = serde_json::json!({
                "snapshot": report,
                "rejected": rejected,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            print!("{}", report.to_text());
            if !reduction.is_clean() {
                println!("\nRejected actions ({}):", reduction.rejected.len());
                for err in &reduction.rejected {
                    println!("  {err}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reduce_action_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"type": "ITEM", "item": {{"id": "q1", "type": "group", "items": ["a1"]}}}},
                {{"type": "ITEM", "item": {{"id": "a1", "type": "text"}}}},
                {{"type": "ANSWER", "id": "a1", "value": "hello"}},
                {{"type": "ANSWER", "id": "q1", "value": "nope"}}
            ]"#
        )
        .unwrap();

        let reduction = reduce_file(file.path()).unwrap();

        assert_eq!(reduction.rejected.len(), 1);
        assert_eq!(
            reduction.snapshot.item("a1").unwrap().value,
            Some(serde_json::json!("hello"))
        );
        assert!(reduction.snapshot.parents_of("a1").unwrap().contains("q1"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(reduce_file(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = reduce_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}
