use std::collections::HashMap;
use std::path::Path;

use crate::error::ReconError;

/// `patient_id → name` lookup used to backfill claim rows that carry no name.
#[derive(Debug, Clone, Default)]
pub struct PatientDirectory {
    names: HashMap<String, String>,
}

impl PatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `patient_id,name` CSV. Rows with an empty id or name are skipped.
    pub fn from_csv(csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ReconError::PatientDirectory(e.to_string()))?
            .clone();
        let idx = |name: &str| -> Result<usize, ReconError> {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| ReconError::PatientDirectory(format!("missing column '{name}'")))
        };
        let id_idx = idx("patient_id")?;
        let name_idx = idx("name")?;

        let mut names = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::PatientDirectory(e.to_string()))?;
            let id = record.get(id_idx).unwrap_or("");
            let name = record.get(name_idx).unwrap_or("");
            if id.is_empty() || name.is_empty() {
                continue;
            }
            names.insert(id.to_string(), name.to_string());
        }

        Ok(Self { names })
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let csv_data = std::fs::read_to_string(path).map_err(|e| {
            ReconError::PatientDirectory(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_csv(&csv_data)
    }

    pub fn insert(&mut self, patient_id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(patient_id.into(), name.into());
    }

    pub fn get(&self, patient_id: &str) -> Option<&str> {
        self.names.get(patient_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Display name for a claim: its own name, then the directory, then `Patient {id}`.
    pub fn resolve(&self, patient_id: &str, explicit: Option<&str>) -> String {
        explicit
            .or_else(|| self.get(patient_id))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Patient {patient_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_directory() {
        let dir = PatientDirectory::from_csv(
            "patient_id,name\n1,Mark Mcdowell\n2,William Fernandez\n3,\n",
        )
        .unwrap();
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.get("1"), Some("Mark Mcdowell"));
        assert_eq!(dir.get("3"), None);
    }

    #[test]
    fn resolve_precedence() {
        let mut dir = PatientDirectory::new();
        dir.insert("1", "Mark Mcdowell");
        assert_eq!(dir.resolve("1", Some("Alice")), "Alice");
        assert_eq!(dir.resolve("1", None), "Mark Mcdowell");
        assert_eq!(dir.resolve("42", None), "Patient 42");
    }

    #[test]
    fn missing_name_column() {
        let err = PatientDirectory::from_csv("patient_id,full_name\n1,A\n").unwrap_err();
        assert!(err.to_string().contains("'name'"));
    }
}
