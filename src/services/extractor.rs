//! Application extraction from a launcher's `favorites` table.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::ApplicationRecord;

const COMPONENT_MARKER: &str = "component=";

static COMPONENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"component=([^/]+)/").expect("component pattern is valid"));

/// Package identifier named by an intent descriptor, if it has one.
///
/// `...;component=com.miui.video/.Launcher1;end` yields `com.miui.video`.
pub fn parse_package(intent: &str) -> Option<&str> {
    if intent.is_empty() || !intent.contains(COMPONENT_MARKER) {
        return None;
    }
    COMPONENT_PATTERN
        .captures(intent)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Read every launchable application from the launcher database at `path`.
///
/// Rows without an intent, or whose intent names no component, are skipped.
pub fn extract_apps(path: &Path) -> Result<Vec<ApplicationRecord>> {
    if !path.exists() {
        return Err(Error::DataSourceMissing(path.to_path_buf()));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |source| Error::DataSource {
            path: path.to_path_buf(),
            source,
        },
    )?;

    let mut stmt = conn.prepare("SELECT title, intent FROM favorites")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let mut apps = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        let (title, intent) = row?;
        let Some(package) = intent.as_deref().and_then(parse_package) else {
            skipped += 1;
            continue;
        };
        let name = match title {
            Some(title) if !title.trim().is_empty() => title,
            _ => package.to_string(),
        };
        apps.push(ApplicationRecord::new(name, package));
    }

    if skipped > 0 {
        debug!("Skipped {} favorites rows without a component", skipped);
    }
    info!("Extracted {} applications from {}", apps.len(), path.display());
    Ok(apps)
}

/// Create a small launcher database for demos, unless `path` already exists.
///
/// Returns `true` when a new database was written.
pub fn seed_demo_database(path: &Path) -> Result<bool> {
    if path.exists() {
        info!("Database {} already exists, leaving it untouched", path.display());
        return Ok(false);
    }

    let mut conn = Connection::open(path).map_err(|source| Error::DataSource {
        path: path.to_path_buf(),
        source,
    })?;

    let tx = conn.transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS favorites (
            _id INTEGER PRIMARY KEY,
            title TEXT,
            intent TEXT,
            container INTEGER,
            screen INTEGER,
            cellX INTEGER,
            cellY INTEGER,
            itemType INTEGER,
            iconPackage TEXT,
            launchCount TEXT,
            label TEXT
        );",
    )?;

    let rows: [(i64, &str, Option<&str>, i64, i64, Option<&str>); 3] = [
        (
            1,
            "com.miui.home:string/new_default_folder_title_tools",
            None,
            -100,
            2,
            None,
        ),
        (
            6,
            "小米商城",
            Some("#Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;launchFlags=0x10200000;component=com.xiaomi.shop/.activity.MainTabActivity;end"),
            327,
            0,
            Some("com.xiaomi.shop"),
        ),
        (
            7,
            "小米视频",
            Some("#Intent;action=android.intent.action.MAIN;category=android.intent.category.LAUNCHER;launchFlags=0x10200000;component=com.miui.video/.Launcher1;end"),
            325,
            0,
            Some("com.miui.video"),
        ),
    ];

    {
        let mut insert = tx.prepare(
            "INSERT INTO favorites (_id, title, intent, container, itemType, iconPackage, label)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?2)",
        )?;
        for (id, title, intent, container, item_type, icon_package) in rows {
            insert.execute(params![id, title, intent, container, item_type, icon_package])?;
        }
    }
    tx.commit()?;

    info!("Created demo launcher database {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_with(rows: &[(Option<&str>, Option<&str>)]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE favorites (_id INTEGER PRIMARY KEY, title TEXT, intent TEXT)")
            .unwrap();
        for (title, intent) in rows {
            conn.execute(
                "INSERT INTO favorites (title, intent) VALUES (?1, ?2)",
                params![title, intent],
            )
            .unwrap();
        }
        (dir, path)
    }

    #[test]
    fn test_parse_package() {
        assert_eq!(
            parse_package("#Intent;component=com.tencent.mm/.ui.LauncherUI;end"),
            Some("com.tencent.mm")
        );
        assert_eq!(parse_package("component=x.y/z"), Some("x.y"));
        assert_eq!(parse_package("#Intent;action=MAIN;end"), None);
        assert_eq!(parse_package("component=no.slash.here"), None);
        assert_eq!(parse_package(""), None);
    }

    #[test]
    fn test_extract_skips_rows_without_component() {
        let (_dir, path) = database_with(&[
            (Some("WeChat"), Some("#Intent;component=com.tencent.mm/.ui.LauncherUI;end")),
            (Some("Tools"), None),
            (Some("Shortcut"), Some("#Intent;action=android.intent.action.VIEW;end")),
            (Some("Video"), Some("#Intent;component=com.miui.video/.Launcher1;end")),
            (Some("Empty"), Some("")),
        ]);

        let apps = extract_apps(&path).unwrap();
        assert_eq!(
            apps,
            vec![
                ApplicationRecord::new("WeChat", "com.tencent.mm"),
                ApplicationRecord::new("Video", "com.miui.video"),
            ]
        );
    }

    #[test]
    fn test_untitled_row_uses_package_as_name() {
        let (_dir, path) =
            database_with(&[(None, Some("#Intent;component=org.example.app/.Main;end"))]);
        let apps = extract_apps(&path).unwrap();
        assert_eq!(apps[0].name, "org.example.app");
    }

    #[test]
    fn test_duplicates_are_kept() {
        let intent = "#Intent;component=com.tencent.mm/.ui.LauncherUI;end";
        let (_dir, path) = database_with(&[(Some("WeChat"), Some(intent)), (Some("WeChat"), Some(intent))]);
        assert_eq!(extract_apps(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.db");
        let err = extract_apps(&path).unwrap_err();
        assert!(matches!(err, Error::DataSourceMissing(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_table_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE workspaces (id INTEGER)")
            .unwrap();

        let err = extract_apps(&path).unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_seed_demo_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher4x7.db");

        assert!(seed_demo_database(&path).unwrap());
        assert!(!seed_demo_database(&path).unwrap());

        let apps = extract_apps(&path).unwrap();
        let packages: Vec<&str> = apps.iter().map(|a| a.package.as_str()).collect();
        assert_eq!(packages, ["com.xiaomi.shop", "com.miui.video"]);
        assert_eq!(apps[0].name, "小米商城");
    }
}
