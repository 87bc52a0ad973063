//! Integration tests for encrypted configuration fields

use conftree::adapters::crypt::{CryptAdapter, LocalSymmetric};
use conftree::config::env::{KEY_FILE_ENVIRONMENT, KEY_FILE_ENVIRONMENT_LEGACY};
use conftree::config::secret_string;
use conftree::core::Resolver;
use conftree::domain::{ConfError, CryptError};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use test_case::test_case;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn adapter(dir: &TempDir) -> LocalSymmetric {
    let crypt = LocalSymmetric::new(Some(dir.path().join("key.key")));
    crypt
        .generate_key(&secret_string("1234".to_string()), true)
        .unwrap();
    crypt
}

#[test_case("http://database-url" ; "url")]
#[test_case("" ; "empty")]
#[test_case("with\0null\0bytes" ; "embedded nul")]
#[test_case("línea con acentos y 🚀" ; "non ascii")]
#[test_case("a much longer value that spans more than one AES block of sixteen bytes" ; "multi block")]
fn test_round_trip(message: &str) {
    let dir = TempDir::new().unwrap();
    let crypt = adapter(&dir);

    let token = crypt.encrypt(message).unwrap();
    assert_eq!(crypt.decrypt(&token).unwrap(), message);
}

#[test]
fn test_encrypted_field_in_config_file() {
    let dir = TempDir::new().unwrap();
    let crypt = adapter(&dir);
    let token = crypt.encrypt("http://db").unwrap();

    let config_path = dir.path().join("config.yml");
    fs::write(
        &config_path,
        format!(
            "pyms:\n  crypt:\n    method: fernet\n  config:\n    enc_database_url: \"{token}\"\n    ENC_SQLALCHEMY_DATABASE_URI: \"{token}\"\n"
        ),
    )
    .unwrap();

    let resolver = Resolver::builder()
        .path(&config_path)
        .key_file(dir.path().join("key.key"))
        .build();
    let config = resolver.resolve("pyms.config").unwrap();

    assert_eq!(config.get("database_url").unwrap(), "http://db");
    assert_eq!(config.get("SQLALCHEMY_DATABASE_URI").unwrap(), "http://db");
    assert!(!config.contains("enc_database_url"));
    assert!(!config.contains("ENC_SQLALCHEMY_DATABASE_URI"));
}

#[test]
fn test_injected_adapter() {
    let dir = TempDir::new().unwrap();
    let crypt = Arc::new(adapter(&dir));
    let token = crypt.encrypt("s3cr3t").unwrap();

    let config_path = dir.path().join("config.yml");
    fs::write(&config_path, format!("pyms:\n  config:\n    enc-password: \"{token}\"\n")).unwrap();

    let resolver = Resolver::builder().path(&config_path).crypt(crypt).build();
    let config = resolver.resolve("pyms.config").unwrap();
    assert_eq!(config.get_str("password").unwrap(), "s3cr3t");
}

#[test]
fn test_missing_key_aborts_resolution() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.yml");
    fs::write(
        &config_path,
        "pyms:\n  crypt:\n    method: fernet\n  config:\n    enc_database_url: token\n",
    )
    .unwrap();

    let resolver = Resolver::builder()
        .path(&config_path)
        .key_file(dir.path().join("absent.key"))
        .build();
    let err = resolver.resolve("pyms.config").unwrap_err();

    match &err {
        ConfError::Decrypt { field, source } => {
            assert_eq!(field, "pyms.config.enc_database_url");
            assert!(matches!(source, CryptError::KeyNotFound { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(resolver.generation(), None);
}

#[test]
fn test_bad_ciphertext_aborts_resolution() {
    let dir = TempDir::new().unwrap();
    adapter(&dir);
    let config_path = dir.path().join("config.yml");
    fs::write(
        &config_path,
        "pyms:\n  crypt:\n    method: fernet\n  config:\n    enc_database_url: not-a-token\n",
    )
    .unwrap();

    let resolver = Resolver::builder()
        .path(&config_path)
        .key_file(dir.path().join("key.key"))
        .build();
    let err = resolver.resolve("pyms.config").unwrap_err();
    assert!(matches!(
        err.crypt_error(),
        Some(CryptError::DecryptFailure(_))
    ));
}

#[test]
fn test_key_file_from_env() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let explicit = adapter(&dir);
    let token = explicit.encrypt("from env").unwrap();

    std::env::remove_var(KEY_FILE_ENVIRONMENT);
    std::env::set_var(KEY_FILE_ENVIRONMENT_LEGACY, dir.path().join("key.key"));
    let legacy = LocalSymmetric::new(None);
    assert_eq!(legacy.decrypt(&token).unwrap(), "from env");

    std::env::set_var(KEY_FILE_ENVIRONMENT, dir.path().join("other.key"));
    let canonical = LocalSymmetric::new(None);
    assert!(canonical.key_path().ends_with("other.key"));
    match canonical.decrypt(&token).unwrap_err() {
        CryptError::KeyNotFound { hint, .. } => assert!(hint.contains(KEY_FILE_ENVIRONMENT)),
        other => panic!("unexpected error: {other:?}"),
    }

    std::env::remove_var(KEY_FILE_ENVIRONMENT);
    std::env::remove_var(KEY_FILE_ENVIRONMENT_LEGACY);
}
