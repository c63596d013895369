use std::fmt;

use serde::Serialize;

use crate::models::{FileError, FileResult};

/// End-of-run summary printed by the command.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LoadReport {
    #[serde(flatten)]
    pub result: FileResult,
    /// Set when converting to NDF: output root and generations written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndf_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndf_generations: Option<u64>,
}

impl LoadReport {
    pub fn new(result: FileResult) -> Self {
        Self {
            result,
            ndf_output: None,
            ndf_generations: None,
        }
    }

    pub fn with_ndf(mut self, out_dir: impl Into<String>, generations: u64) -> Self {
        self.ndf_output = Some(out_dir.into());
        self.ndf_generations = Some(generations);
        self
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, entries: &[FileError]) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "{title}:")?;
    for entry in entries {
        writeln!(f, "  {} ({})", entry.file, entry.count())?;
        for message in &entry.messages {
            writeln!(f, "    - {message}")?;
        }
    }
    Ok(())
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = &self.result;
        writeln!(
            f,
            "Processed {} file(s): {} succeeded, {} failed, {} record(s) read",
            result.total,
            result.succeed,
            result.failed(),
            result.records
        )?;
        if let (Some(out), Some(generations)) = (&self.ndf_output, self.ndf_generations) {
            writeln!(f, "NDF output: {generations} generation(s) written to {out}")?;
        }
        write_section(f, "Mutation errors", &result.mutation_errors)?;
        write_section(f, "Data errors", &result.data_errors)?;
        write_section(f, "NDF errors", &result.ndf_errors)?;
        write_section(f, "Upload errors", &result.upload_errors)?;
        write_section(f, "Partial results", &result.partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileOutcome, FileStatus};
    use serde_json::json;

    fn sample() -> FileResult {
        let mut result = FileResult::default();
        result.record(FileOutcome::new(
            "users.json",
            FileStatus::Converted {
                records: 1,
                errors: vec!["record 1 (id 'a'): duplicate id 'a'".into()],
            },
        ));
        result.record(FileOutcome::new(
            "posts.csv",
            FileStatus::MutationFailed("mutation 'createPost' is not defined in the schema".into()),
        ));
        result
    }

    #[test]
    fn renders_sections_for_non_empty_categories() {
        let text = LoadReport::new(sample()).with_ndf("out", 1).to_string();
        assert_eq!(
            text,
            "Processed 2 file(s): 0 succeeded, 2 failed, 1 record(s) read\n\
             NDF output: 1 generation(s) written to out\n\
             Mutation errors:\n  posts.csv (1)\n    - mutation 'createPost' is not defined in the schema\n\
             NDF errors:\n  users.json (1)\n    - record 1 (id 'a'): duplicate id 'a'\n"
        );
    }

    #[test]
    fn serializes_flat() {
        let value = serde_json::to_value(LoadReport::new(sample())).unwrap();
        assert_eq!(value["total"], json!(2));
        assert_eq!(value["mutation_errors"][0]["file"], json!("posts.csv"));
        assert!(value.get("ndf_output").is_none());
    }
}
