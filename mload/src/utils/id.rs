use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use crate::errors::RecordError;

/// Longest identifier the target store accepts.
pub const MAX_ID_LEN: usize = 25;

pub fn uuid_v5_u128(ns: Uuid, name: &str) -> u128 {
    Uuid::new_v5(&ns, name.as_bytes()).as_u128()
}

/// Maps an external id onto one of at most `MAX_ID_LEN` characters.
///
/// Short ids pass through untouched. Longer ones become the v5 UUID of the raw
/// id, base64url-encoded (22 characters), so the mapping is stable across runs.
pub fn normalize_id(raw: &str) -> String {
    if raw.chars().count() <= MAX_ID_LEN {
        return raw.to_string();
    }
    let digest = uuid_v5_u128(Uuid::NAMESPACE_OID, raw);
    URL_SAFE_NO_PAD.encode(digest.to_be_bytes())
}

/// Per-file dedupe table keyed by normalized id.
#[derive(Debug, Default)]
pub struct IdRegistry {
    seen: HashMap<String, String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the normalized id for `raw` without recording it, or
    /// `DuplicateId` when that normalized id is already taken, whether by the
    /// same raw id or by another one that hashes to it.
    pub fn check(&self, raw: &str) -> Result<String, RecordError> {
        let normalized = normalize_id(raw);
        match self.seen.get(&normalized) {
            Some(existing) => Err(RecordError::DuplicateId {
                raw: raw.to_string(),
                normalized,
                existing: existing.clone(),
            }),
            None => Ok(normalized),
        }
    }

    /// Marks a normalized id returned by [`IdRegistry::check`] as used.
    pub fn claim(&mut self, raw: &str, normalized: String) {
        self.seen.entry(normalized).or_insert_with(|| raw.to_string());
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
