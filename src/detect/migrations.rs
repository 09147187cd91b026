// ABOUTME: Migration detection over git diff output.
// ABOUTME: Builds the database reminder command from the app's config.json.

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::LazyLock;

use super::DetectionError;

static GENERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)migrations/.*\.(sql|js)").unwrap());

static FLEXIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)migrations/flexible/.*\.xml").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// `migrations/*.sql` and `migrations/*.js`
    General,
    /// `migrations/flexible/*.xml`
    Flexible,
}

impl MigrationKind {
    fn pattern(self) -> &'static Regex {
        match self {
            MigrationKind::General => &GENERAL,
            MigrationKind::Flexible => &FLEXIBLE,
        }
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationKind::General => write!(f, "migrations"),
            MigrationKind::Flexible => write!(f, "flexible migrations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScan {
    pub kind: MigrationKind,
    pub has_migrations: bool,
    /// Matched paths in diff order, without duplicates.
    pub files: Vec<String>,
}

/// Find migration paths of one kind in a diff listing.
///
/// Matching is a case-insensitive substring search, so any path that merely
/// contains `migrations/...sql` counts.
pub fn scan(diff: &str, kind: MigrationKind) -> MigrationScan {
    let mut files: Vec<String> = Vec::new();
    for found in kind.pattern().find_iter(diff) {
        let path = found.as_str();
        if !files.iter().any(|f| f == path) {
            files.push(path.to_string());
        }
    }
    MigrationScan {
        kind,
        has_migrations: !files.is_empty(),
        files,
    }
}

/// Both migration kinds found in one diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub general: MigrationScan,
    pub flexible: MigrationScan,
}

impl MigrationReport {
    pub fn from_diff(diff: &str) -> Self {
        Self {
            general: scan(diff, MigrationKind::General),
            flexible: scan(diff, MigrationKind::Flexible),
        }
    }

    pub fn has_migrations(&self) -> bool {
        self.general.has_migrations || self.flexible.has_migrations
    }
}

#[derive(Debug, Deserialize)]
struct AppConfig {
    mysql: DatabaseSettings,
}

#[derive(Debug, Deserialize)]
struct DatabaseSettings {
    host: String,
    user: String,
    password: String,
    database: String,
}

/// One `mysql ... < <file>` line per migration, from the app's `config.json`.
pub fn database_reminders(
    config_json: &str,
    files: &[String],
) -> Result<Vec<String>, DetectionError> {
    let config: AppConfig = serde_json::from_str(config_json)?;
    let db = config.mysql;
    let client = format!(
        "mysql -h{} -u{} -p'{}' {}",
        db.host, db.user, db.password, db.database
    );
    Ok(files.iter().map(|f| format!("{client} < {f}")).collect())
}
