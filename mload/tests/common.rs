use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use gqlfetcher::{GraphQLResponse, GraphQLTransport};
use mload::Schema;
use serde_json::{Value, json};
use tempfile::TempDir;

pub const SCHEMA: &str = r#"
    type Person {
        id: ID!
        name: String
        age: Int
        active: Boolean
        born: Date
        nicknames: [String]
        employer: Company
        friends: [Person]
        status: Status
    }
    enum Status { ACTIVE RETIRED }
    type Company { id: ID! name: String }
    input PersonInput {
        id: ID
        name: String
        age: Int
        active: Boolean
        born: Date
        nicknames: [String]
        status: Status
    }
    type Mutation {
        createPerson(input: PersonInput!): Person
        createPeople(input: [PersonInput!]!): [Person]
    }
"#;

/// Records every query and answers with a null-free result for each alias.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of aliased calls in each request, in order.
    pub fn calls_per_request(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .map(|query| query.matches(": createPerson(").count())
            .collect()
    }
}

#[async_trait]
impl GraphQLTransport for MockTransport {
    async fn request(&self, query: &str) -> gqlfetcher::Result<GraphQLResponse> {
        self.requests.lock().unwrap().push(query.to_string());
        let calls = query.matches("(input:").count();
        let data: serde_json::Map<String, Value> = (0..calls)
            .map(|i| (format!("m{i}"), json!({"id": format!("r{i}")})))
            .collect();
        Ok(GraphQLResponse::with_data(Value::Object(data)))
    }
}

#[allow(dead_code)]
pub struct TestContext {
    pub temp_dir: TempDir,
    pub schema: Schema,
}

#[allow(dead_code)]
impl TestContext {
    pub fn input(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("input").join(name)
    }

    pub fn out_dir(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub async fn write_input(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.input(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    pub async fn write_json(&self, name: &str, value: &Value) -> anyhow::Result<PathBuf> {
        self.write_input(name, &serde_json::to_string(value)?).await
    }
}

pub fn init_test_context() -> anyhow::Result<TestContext> {
    Ok(TestContext {
        temp_dir: tempfile::tempdir()?,
        schema: Schema::from_sdl(SCHEMA)?,
    })
}

#[allow(dead_code)]
pub fn people(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({"id": format!("p{i}"), "name": format!("Person {i}"), "age": i}))
            .collect(),
    )
}

/// Concatenated `values` of every generation in `out/<category>`, in file
/// order.
#[allow(dead_code)]
pub async fn read_category(out: &Path, category: &str) -> anyhow::Result<(usize, Vec<Value>)> {
    let dir = out.join(category);
    if !dir.exists() {
        return Ok((0, Vec::new()));
    }
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        files.push(entry.path());
    }
    files.sort();

    let mut values = Vec::new();
    for file in &files {
        let document: Value = serde_json::from_str(&tokio::fs::read_to_string(file).await?)?;
        anyhow::ensure!(document["valueType"] == json!(category), "wrong valueType in {}", file.display());
        if let Value::Array(items) = &document["values"] {
            values.extend(items.iter().cloned());
        }
    }
    Ok((files.len(), values))
}
