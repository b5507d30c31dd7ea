use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::Result;

use super::builtin::stable_table;
use super::table::OffsetTable;

pub fn load_table<P: AsRef<Path>>(path: P) -> Result<OffsetTable> {
    let content = fs::read_to_string(&path)?;
    parse_table(&content)
}

pub fn save_table<P: AsRef<Path>>(path: P, table: &OffsetTable) -> Result<()> {
    table.validate()?;
    let content = serde_json::to_string_pretty(table)?;
    fs::write(path, content)?;
    Ok(())
}

/// Parse and validate a table from JSON.
pub fn parse_table(content: &str) -> Result<OffsetTable> {
    let table: OffsetTable = serde_json::from_str(content)?;
    table.validate()?;
    Ok(table)
}

/// The set of tables version detection chooses from.
///
/// Tables are tried in registration order.
#[derive(Debug, Clone, Default)]
pub struct OffsetRegistry {
    tables: Vec<Arc<OffsetTable>>,
}

impl OffsetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the compiled-in tables.
    pub fn builtin() -> Self {
        Self {
            tables: vec![Arc::new(stable_table())],
        }
    }

    /// Add a table, replacing any table of the same family.
    pub fn register(&mut self, table: OffsetTable) -> Result<Arc<OffsetTable>> {
        table.validate()?;
        let table = Arc::new(table);
        match self.tables.iter_mut().find(|t| t.family == table.family) {
            Some(slot) => {
                info!("Replacing offset table '{}'", table.family);
                *slot = Arc::clone(&table);
            }
            None => self.tables.push(Arc::clone(&table)),
        }
        Ok(table)
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<OffsetTable>> {
        let table = load_table(&path)?;
        info!(
            "Loaded offset table '{}' from {}",
            table.family,
            path.as_ref().display()
        );
        self.register(table)
    }

    pub fn tables(&self) -> &[Arc<OffsetTable>] {
        &self.tables
    }

    pub fn get(&self, family: &str) -> Option<&Arc<OffsetTable>> {
        self.tables.iter().find(|t| t.family == family)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::offset::table::fields;

    #[test]
    fn test_parse_builtin_json() {
        let json = serde_json::to_string(&stable_table()).unwrap();
        let table = parse_table(&json).unwrap();
        assert_eq!(table, stable_table());
    }

    #[test]
    fn test_parse_rejects_incomplete_table() {
        let mut table = stable_table();
        table.fields.remove(fields::MD5);
        let json = serde_json::to_string(&table).unwrap();

        assert!(matches!(
            parse_table(&json),
            Err(Error::InvalidOffsetTable(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        assert!(matches!(parse_table("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_registry_replaces_same_family() {
        let mut registry = OffsetRegistry::builtin();
        let mut table = stable_table();
        table.anchors[0].pattern = "F8 01 74 ?? 83".parse().unwrap();
        table.version_signature = table.anchors[0].pattern.clone();

        registry.register(table.clone()).unwrap();
        assert_eq!(registry.tables().len(), 1);
        assert_eq!(registry.get("stable").unwrap().as_ref(), &table);
    }

    #[test]
    fn test_registry_appends_new_family() {
        let mut registry = OffsetRegistry::builtin();
        let mut table = stable_table();
        table.family = "stable-old".to_string();

        registry.register(table).unwrap();
        assert_eq!(registry.tables().len(), 2);
        assert!(registry.get("stable-old").is_some());
    }
}
