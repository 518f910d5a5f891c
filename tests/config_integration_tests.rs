//! Integration tests for loading and saving autotitle.yaml

use autotitle::config::{ConfigManager, SETTINGS_FILE_NAME, environment};
use autotitle::{DebounceMode, RenameSettings};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

fn manager() -> (ConfigManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = Utf8PathBuf::try_from(temp_dir.path().join("config")).unwrap();
    (ConfigManager::new(&config_dir).unwrap(), temp_dir)
}

fn no_env() -> config::Environment {
    environment().source(Some(config::Map::new()))
}

#[test]
fn test_config_dir_is_created() {
    let (manager, _temp_dir) = manager();
    assert!(manager.config_dir().exists());
    assert!(manager.settings_path().ends_with(SETTINGS_FILE_NAME));
}

#[test]
fn test_load_hand_written_settings() {
    let (manager, _temp_dir) = manager();
    fs::write(
        manager.settings_path(),
        r#"
include_folders:
  - Journal
  - Inbox/Drafts
use_header: false
support_yaml: false
include_emojis: true
char_count: 30
check_interval: 1000
skip_named_files: true
debounce_mode: per_document
"#,
    )
    .unwrap();

    let settings = manager.load_settings_with(no_env()).unwrap();

    assert_eq!(
        settings.include_folders.iter().collect::<Vec<_>>(),
        vec!["Journal", "Inbox/Drafts"]
    );
    assert!(!settings.use_header);
    assert!(settings.use_first_line);
    assert!(!settings.support_yaml);
    assert!(settings.include_emojis);
    assert_eq!(settings.char_count, 30);
    assert_eq!(settings.check_interval, 1000);
    assert!(settings.skip_named_files);
    assert_eq!(settings.debounce_mode, DebounceMode::PerDocument);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (manager, _temp_dir) = manager();
    fs::write(manager.settings_path(), "char_count: 20\n").unwrap();

    let settings = manager.load_settings_with(no_env()).unwrap();

    assert_eq!(
        settings,
        RenameSettings {
            char_count: 20,
            ..RenameSettings::default()
        }
    );
}

#[test]
fn test_small_char_count_is_raised() {
    let (manager, _temp_dir) = manager();
    fs::write(manager.settings_path(), "char_count: 2\n").unwrap();

    let settings = manager.load_settings_with(no_env()).unwrap();
    assert_eq!(settings.char_count, 10);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (manager, _temp_dir) = manager();
    fs::write(manager.settings_path(), "char_count: [not a number\n").unwrap();

    assert!(manager.load_settings_with(no_env()).is_err());
}

#[test]
fn test_environment_list_override() {
    let (manager, _temp_dir) = manager();
    let env = environment().source(Some(
        [(
            "AUTOTITLE__INCLUDE_FOLDERS".to_string(),
            "Journal,Projects".to_string(),
        )]
        .into_iter()
        .collect(),
    ));

    let settings = manager.load_settings_with(env).unwrap();

    assert!(settings.includes_folder("Journal/2024"));
    assert!(settings.includes_folder("Projects"));
    assert!(!settings.includes_folder("Inbox"));
}

#[test]
fn test_saved_file_is_readable_yaml() {
    let (manager, _temp_dir) = manager();
    manager.save_settings(&RenameSettings::default()).unwrap();

    let raw = fs::read_to_string(manager.settings_path()).unwrap();
    let parsed: RenameSettings = serde_yaml_ng::from_str(&raw).unwrap();
    assert_eq!(parsed, RenameSettings::default());
    assert!(raw.contains("debounce_mode: single_slot"));
}
