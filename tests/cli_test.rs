use std::io::Write;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;
use secrecy::{ExposeSecret, SecretString};

use ringkeeper::adapters::crypto::age_backend::AgeBackend;

/// Run ringkeeper against a data directory.
fn ringkeeper(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("ringkeeper");
    cmd.env_remove("RINGKEEPER_PASSPHRASE")
        .env_remove("RUST_LOG")
        .arg("--dir")
        .arg(dir.path());
    cmd
}

/// Write a plain age identity file and return (path, recipient).
fn identity_file(dir: &assert_fs::TempDir, name: &str) -> (std::path::PathBuf, String) {
    let identity = age::x25519::Identity::generate();
    let recipient = identity.to_public().to_string();
    let file = dir.child(name);
    file.write_str(&format!(
        "# public key: {recipient}\n{}\n",
        identity.to_string().expose_secret()
    ))
    .unwrap();
    (file.path().to_path_buf(), recipient)
}

/// Write a passphrase-protected identity file and return (path, recipient).
fn sealed_identity_file(
    dir: &assert_fs::TempDir,
    name: &str,
    passphrase: &str,
) -> (std::path::PathBuf, String) {
    let identity = age::x25519::Identity::generate();
    let encryptor =
        age::Encryptor::with_user_passphrase(SecretString::from(passphrase.to_string()));
    let mut output = Vec::new();
    let armored =
        age::armor::ArmoredWriter::wrap_output(&mut output, age::armor::Format::AsciiArmor)
            .unwrap();
    let mut writer = encryptor.wrap_output(armored).unwrap();
    writer
        .write_all(identity.to_string().expose_secret().as_bytes())
        .unwrap();
    writer.finish().unwrap().finish().unwrap();

    let file = dir.child(name);
    file.write_binary(&output).unwrap();
    (file.path().to_path_buf(), identity.to_public().to_string())
}

// ─── Keyrings ────────────────────────────────────────────────────

#[test]
fn fresh_directory_has_main_keyring() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .args(["keyring", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* main"));

    dir.child("store.json").assert(predicate::path::exists());
}

#[test]
fn create_and_delete_keyring() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .args(["keyring", "create", "work"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Created keyring 'work'"));

    ringkeeper(&dir)
        .args(["keyring", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work"));

    ringkeeper(&dir)
        .args(["keyring", "delete", "work"])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["keyring", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work").not());
}

#[test]
fn duplicate_and_invalid_keyrings_fail() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .args(["keyring", "create", "main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ringkeeper(&dir)
        .args(["keyring", "create", "../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid keyring name"));

    ringkeeper(&dir)
        .args(["keyring", "delete", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Keyring 'ghost' not found"));
}

// ─── Keys ────────────────────────────────────────────────────────

#[test]
fn import_list_and_remove_keys() {
    let dir = assert_fs::TempDir::new().unwrap();
    let (identity, recipient) = identity_file(&dir, "me.txt");
    let (_, friend) = identity_file(&dir, "friend.txt");
    let friend_fpr = AgeBackend::fingerprint(&friend);

    ringkeeper(&dir)
        .args(["keys", "import", "--keyring", "main", "--identity"])
        .arg(&identity)
        .args(["--uid", "Me <me@example.com>", "--default"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Default key of 'main'"));

    ringkeeper(&dir)
        .args(["keys", "import", "--keyring", "main", "--recipient", &friend])
        .args(["--uid", "Friend <friend@example.com>"])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["keys", "list", "--keyring", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Me <me@example.com>"))
        .stdout(predicate::str::contains(AgeBackend::fingerprint(&recipient)))
        .stdout(predicate::str::contains("Friend <friend@example.com>"));

    // Importing the same recipient again changes nothing.
    ringkeeper(&dir)
        .args(["keys", "import", "--keyring", "main", "--recipient", &friend])
        .assert()
        .success()
        .stderr(predicate::str::contains("already present"));

    ringkeeper(&dir)
        .args(["keys", "remove", "--keyring", "main", &friend_fpr])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["keys", "list", "--keyring", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Friend").not());
}

#[test]
fn import_rejects_bad_recipient() {
    let dir = assert_fs::TempDir::new().unwrap();
    ringkeeper(&dir)
        .args(["keys", "import", "--recipient", "age1nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid key"));
}

// ─── Attributes & sync ───────────────────────────────────────────

#[test]
fn set_and_get_attributes() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .args(["attr", "set", "--keyring", "main", "default_key", "123456789"])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["attr", "get", "--keyring", "main", "default_key"])
        .assert()
        .success()
        .stdout(predicate::str::diff("123456789\n"));

    ringkeeper(&dir)
        .args(["attr", "set", "--keyring", "main", "flags", r#"{"sync": true}"#])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["attr", "get", "--keyring", "main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_key\": 123456789"))
        .stdout(predicate::str::contains("\"sync\": true"));
}

#[test]
fn sync_copies_public_key_between_keyrings() {
    let dir = assert_fs::TempDir::new().unwrap();
    let (_, friend) = identity_file(&dir, "friend.txt");
    let friend_fpr = AgeBackend::fingerprint(&friend);

    ringkeeper(&dir)
        .args(["keys", "import", "--keyring", "main", "--recipient", &friend])
        .args(["--uid", "friend@example.com"])
        .assert()
        .success();
    ringkeeper(&dir)
        .args(["keyring", "create", "work"])
        .assert()
        .success();

    ringkeeper(&dir)
        .args(["sync", "--keyring", "work", &friend_fpr[24..], "ffffffffffffffff"])
        .assert()
        .success()
        .stderr(predicate::str::contains(format!("Copied {friend_fpr}")))
        .stderr(predicate::str::contains("No keyring holds key ffffffffffffffff"));

    ringkeeper(&dir)
        .args(["keys", "list", "--keyring", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("friend@example.com"));
}

// ─── Encrypt / decrypt ───────────────────────────────────────────

#[test]
fn encrypt_then_decrypt_with_default_key() {
    let dir = assert_fs::TempDir::new().unwrap();
    let (identity, recipient) = identity_file(&dir, "me.txt");
    let fpr = AgeBackend::fingerprint(&recipient);

    ringkeeper(&dir)
        .args(["keyring", "create", "work"])
        .assert()
        .success();
    ringkeeper(&dir)
        .args(["keys", "import", "--keyring", "work", "--default", "--identity"])
        .arg(&identity)
        .assert()
        .success();

    dir.child("plain.txt").write_str("meet at noon\n").unwrap();

    // "work" holds the only private key, so it is the preferred keyring.
    ringkeeper(&dir)
        .args(["encrypt", "--to", &fpr, "--input"])
        .arg(dir.child("plain.txt").path())
        .arg("--output")
        .arg(dir.child("msg.age").path())
        .assert()
        .success();

    dir.child("msg.age")
        .assert(predicate::str::contains("BEGIN AGE ENCRYPTED FILE"));

    ringkeeper(&dir)
        .args(["decrypt", "--input"])
        .arg(dir.child("msg.age").path())
        .assert()
        .success()
        .stdout(predicate::str::diff("meet at noon\n"));
}

#[test]
fn encrypt_to_unknown_recipient_fails() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .args(["encrypt", "--to", "771f9119b823e06c0de306d466663688a83e9763"])
        .write_stdin("data")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Key not found"));
}

#[test]
fn decrypt_without_default_key_fails() {
    let dir = assert_fs::TempDir::new().unwrap();

    ringkeeper(&dir)
        .arg("decrypt")
        .write_stdin("anything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no default key"));
}

#[test]
fn protected_identity_needs_passphrase() {
    let dir = assert_fs::TempDir::new().unwrap();
    let (identity, recipient) = sealed_identity_file(&dir, "sealed.age", "hunter2");
    let fpr = AgeBackend::fingerprint(&recipient);

    ringkeeper(&dir)
        .args(["keys", "import", "--default", "--identity"])
        .arg(&identity)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cancelled"));

    ringkeeper(&dir)
        .env("RINGKEEPER_PASSPHRASE", "hunter2")
        .args(["keys", "import", "--default", "--identity"])
        .arg(&identity)
        .assert()
        .success();

    let ciphertext = ringkeeper(&dir)
        .args(["encrypt", "--to", &fpr])
        .write_stdin("sealed secret")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    ringkeeper(&dir)
        .arg("decrypt")
        .write_stdin(ciphertext.clone())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cancelled"));

    ringkeeper(&dir)
        .args(["decrypt", "--passphrase", "wrong"])
        .write_stdin(ciphertext.clone())
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong passphrase"));

    ringkeeper(&dir)
        .env("RINGKEEPER_PASSPHRASE", "hunter2")
        .arg("decrypt")
        .write_stdin(ciphertext)
        .assert()
        .success()
        .stdout(predicate::str::diff("sealed secret"));
}

// ─── Config ──────────────────────────────────────────────────────

#[test]
fn config_sets_storage_file_and_main_keyring() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("config.toml")
        .write_str("[ringkeeper]\nmain_keyring = \"primary\"\n\n[storage]\nfile = \"rings.json\"\n")
        .unwrap();

    ringkeeper(&dir)
        .args(["keyring", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* primary"));

    dir.child("rings.json").assert(predicate::path::exists());
    dir.child("store.json").assert(predicate::path::missing());
}

#[test]
fn invalid_config_is_reported() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("config.toml")
        .write_str("[storage]\nfile = \"../outside.json\"\n")
        .unwrap();

    ringkeeper(&dir)
        .args(["keyring", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}
