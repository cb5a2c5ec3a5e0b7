//! Migration id format: a zero-padded three digit number, an underscore and
//! a snake_case description (`003_normalize_user_data`).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

static MIGRATION_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{3})_[a-z0-9_]+$").expect("migration id pattern is valid")
});

/// Extract the version number from a migration id.
pub fn parse_migration_number(id: &str) -> Result<u32, CoreError> {
    let captures = MIGRATION_ID.captures(id).ok_or_else(|| {
        CoreError::Validation(format!(
            "Invalid migration id '{id}'. Expected NNN_description"
        ))
    })?;
    captures[1]
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid migration number in '{id}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_number_prefix() {
        assert_eq!(parse_migration_number("001_init_styles_from_data").unwrap(), 1);
        assert_eq!(parse_migration_number("042_x").unwrap(), 42);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse_migration_number("1_init").is_err());
        assert!(parse_migration_number("001-init").is_err());
        assert!(parse_migration_number("001_").is_err());
        assert!(parse_migration_number("001_Init").is_err());
        assert!(parse_migration_number("init").is_err());
    }
}
