use serde::Serialize;

/// Messages attributed to one input file.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FileError {
    pub file: String,
    pub messages: Vec<String>,
}

impl FileError {
    pub fn new(file: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            file: file.into(),
            messages,
        }
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }
}

/// How processing one file ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// The mutation, its input type or a record's fit against it could not be
    /// resolved; nothing was sent.
    MutationFailed(String),
    ReadFailed(String),
    Converted {
        records: usize,
        errors: Vec<String>,
    },
    Uploaded {
        records: usize,
        batches: usize,
        errors: Vec<String>,
        partial: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub file: String,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn new(file: impl Into<String>, status: FileStatus) -> Self {
        Self {
            file: file.into(),
            status,
        }
    }

    /// Partial-null batches do not count against a file.
    pub fn succeeded(&self) -> bool {
        match &self.status {
            FileStatus::MutationFailed(_) | FileStatus::ReadFailed(_) => false,
            FileStatus::Converted { errors, .. } | FileStatus::Uploaded { errors, .. } => {
                errors.is_empty()
            }
        }
    }
}

/// Aggregate over every file of one invocation.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct FileResult {
    pub total: usize,
    pub succeed: usize,
    pub records: usize,
    pub mutation_errors: Vec<FileError>,
    pub data_errors: Vec<FileError>,
    pub ndf_errors: Vec<FileError>,
    pub upload_errors: Vec<FileError>,
    pub partial: Vec<FileError>,
}

impl FileResult {
    pub fn record(&mut self, outcome: FileOutcome) {
        self.total += 1;
        if outcome.succeeded() {
            self.succeed += 1;
        }

        let file = outcome.file;
        match outcome.status {
            FileStatus::MutationFailed(message) => {
                self.mutation_errors.push(FileError::new(file, vec![message]));
            }
            FileStatus::ReadFailed(message) => {
                self.data_errors.push(FileError::new(file, vec![message]));
            }
            FileStatus::Converted { records, errors } => {
                self.records += records;
                if !errors.is_empty() {
                    self.ndf_errors.push(FileError::new(file, errors));
                }
            }
            FileStatus::Uploaded {
                records,
                errors,
                partial,
                ..
            } => {
                self.records += records;
                if !errors.is_empty() {
                    self.upload_errors.push(FileError::new(file.clone(), errors));
                }
                if !partial.is_empty() {
                    self.partial.push(FileError::new(file, partial));
                }
            }
        }
    }

    pub fn merge(&mut self, other: FileResult) {
        self.total += other.total;
        self.succeed += other.succeed;
        self.records += other.records;
        self.mutation_errors.extend(other.mutation_errors);
        self.data_errors.extend(other.data_errors);
        self.ndf_errors.extend(other.ndf_errors);
        self.upload_errors.extend(other.upload_errors);
        self.partial.extend(other.partial);
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeed
    }

    pub fn is_success(&self) -> bool {
        self.total == self.succeed
    }
}

/// The result of a single file, ready to be merged into a run-wide total.
impl From<FileOutcome> for FileResult {
    fn from(outcome: FileOutcome) -> Self {
        let mut result = FileResult::default();
        result.record(outcome);
        result
    }
}
