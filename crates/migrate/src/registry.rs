//! Ordered, validated list of migrations.

use barbcut_core::migration_id::parse_migration_number;

use crate::error::MigrationError;
use crate::migrations;
use crate::Migration;

pub struct MigrationRegistry {
    /// Index `i` holds migration number `i + 1`.
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Validate ids and numbering. Numbers must run 1, 2, 3, ... in the
    /// order given.
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> Result<Self, MigrationError> {
        for (index, migration) in migrations.iter().enumerate() {
            let id = migration.id();
            let number = parse_migration_number(id)
                .map_err(|e| MigrationError::InvalidRegistry(e.to_string()))?;
            let expected = index as u32 + 1;
            if number < expected {
                return Err(MigrationError::InvalidRegistry(format!(
                    "Duplicate or out-of-order migration '{id}' at position {expected}"
                )));
            }
            if number > expected {
                return Err(MigrationError::InvalidRegistry(format!(
                    "Gap before migration '{id}': expected number {expected:03}"
                )));
            }
        }
        Ok(Self { migrations })
    }

    /// The migrations shipped with this crate.
    pub fn builtin() -> Result<Self, MigrationError> {
        Self::new(migrations::all())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Migration with the given number.
    pub fn get(&self, number: u32) -> Option<&dyn Migration> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.migrations.get(index).map(|m| m.as_ref())
    }

    /// Migrations numbered above `version`, ascending.
    pub fn pending(&self, version: u32) -> impl Iterator<Item = (u32, &dyn Migration)> {
        self.migrations
            .iter()
            .enumerate()
            .map(|(i, m)| (i as u32 + 1, m.as_ref()))
            .filter(move |(number, _)| *number > version)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.migrations.iter().map(|m| m.id()).collect()
    }
}
