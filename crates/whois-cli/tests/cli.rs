use assert_cmd::Command;
use predicates::prelude::*;

fn whoisd() -> Command {
    let mut cmd = Command::cargo_bin("whoisd").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("WHOISD_CONFIG");
    cmd
}

#[test]
fn test_help() {
    whoisd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("query"));
}

#[test]
fn test_init_creates_storage_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let data = tmp.path().join("data");

    whoisd()
        .args(["--config", "/nonexistent/whoisd.toml", "--data-dir"])
        .arg(&data)
        .arg("init")
        .assert()
        .success();

    for dir in ["ipv4", "ipv6", "domain", "asn"] {
        assert!(data.join(dir).is_dir(), "{dir} missing");
    }
}

#[test]
fn test_check_reports_records() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("ipv4")).unwrap();
    std::fs::create_dir_all(root.join("domain")).unwrap();
    std::fs::write(root.join("ipv4").join("10.0.0.0_8"), "netname: TEN").unwrap();
    std::fs::write(
        root.join("domain").join("example.org"),
        "_PULL: whois.pir.org\nDomain Name: EXAMPLE.ORG",
    )
    .unwrap();

    whoisd()
        .args(["--config", "/nonexistent/whoisd.toml", "--data-dir"])
        .arg(root)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("built at:      "))
        .stdout(predicate::str::contains("addresses:     1 (0 from feed)"))
        .stdout(predicate::str::contains("example.org <- whois.pir.org:43"));
}

#[test]
fn test_bad_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let config = tmp.path().join("config.toml");
    std::fs::write(&config, "[ipam]\nenabled = true\n").unwrap();

    whoisd()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ipam.url"));
}
