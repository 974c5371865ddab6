use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

mod common;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = dir.path().join("database.txt");
    let log = dir.path().join("AdaBank.bankLog");
    let requests = dir.path().join("clients.txt");
    common::write_lines(&db, &["BankID_01 50", "BankID_02 30"])?;
    common::write_lines(&requests, &["N deposit 100"])?;

    let mut cmd = Command::new(cargo_bin!("adabank"));
    cmd.arg(&requests)
        .arg("--db")
        .arg(&db)
        .arg("--log")
        .arg(&log)
        .arg("--once");

    cmd.assert().success().stdout(predicate::str::contains(
        "Response from server for request 1: New account request accepted with balance 100.",
    ));

    // Two accounts were loaded, so the next id is BankID_03.
    assert_eq!(
        std::fs::read_to_string(&db)?,
        "BankID_01 50\nBankID_02 30\nBankID_03 100\n"
    );
    let log = std::fs::read_to_string(&log)?;
    let lines: Vec<&str> = log.lines().collect();
    assert!(lines[0].starts_with("# Adabank Log file updated @"));
    assert_eq!(&lines[1..], ["BankID_03 D 100", "## end of log."]);

    Ok(())
}

#[test]
fn test_cli_responses_follow_request_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = dir.path().join("database.txt");
    let requests = dir.path().join("clients.txt");
    common::write_lines(&db, &["BankID_01 50", "BankID_02 30"])?;
    common::write_lines(
        &requests,
        &[
            "BankID_01 withdraw 50",
            "BankID_02 withdraw 50",
            "BankID_07 deposit 5",
        ],
    )?;

    let mut cmd = Command::new(cargo_bin!("adabank"));
    cmd.arg(&requests)
        .arg("--db")
        .arg(&db)
        .arg("--log")
        .arg(dir.path().join("bank.log"))
        .arg("--once");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Response from server for request 1: Withdrawal successful. Account BankID_01 removed.",
        ))
        .stdout(predicate::str::contains(
            "Response from server for request 2: Insufficient balance.",
        ))
        .stdout(predicate::str::contains(
            "Response from server for request 3: Invalid account.",
        ));

    assert_eq!(std::fs::read_to_string(&db)?, "BankID_02 30\n");
    Ok(())
}

#[test]
fn test_cli_starts_without_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let db = dir.path().join("database.txt");

    let mut cmd = Command::new(cargo_bin!("adabank"));
    cmd.arg("--db")
        .arg(&db)
        .arg("--log")
        .arg(dir.path().join("bank.log"))
        .arg("--once");

    cmd.assert().success();
    assert_eq!(std::fs::read_to_string(&db)?, "");
    Ok(())
}

/// Ctrl-C while request files are still being processed goes through the
/// normal shutdown: the snapshot matches the audit log and the trailer is written.
#[cfg(unix)]
#[test]
fn test_cli_interrupt_during_batch_persists_ledger() -> Result<(), Box<dyn std::error::Error>> {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = tempdir()?;
    let db = dir.path().join("database.txt");
    let log = dir.path().join("bank.log");
    let requests = dir.path().join("clients.txt");
    common::write_lines(&db, &["BankID_01 5"])?;
    let lines = vec!["BankID_01 deposit 1"; 5_000];
    common::write_lines(&requests, &lines)?;

    let mut child = Command::new(cargo_bin!("adabank"))
        .arg(&requests)
        .arg("--db")
        .arg(&db)
        .arg("--log")
        .arg(&log)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    // Interrupt as soon as the first deposit reaches the audit log.
    let deadline = Instant::now() + Duration::from_secs(10);
    while !std::fs::read_to_string(&log).unwrap_or_default().contains("BankID_01 D 1") {
        assert!(Instant::now() < deadline, "bank never applied a request");
        std::thread::sleep(Duration::from_millis(2));
    }
    let killed = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()?;
    assert!(killed.success());

    let status = child.wait()?;
    assert!(status.success(), "bank exited with {status}");

    let log = std::fs::read_to_string(&log)?;
    assert_eq!(log.lines().last(), Some("## end of log."));
    let deposits = log.lines().filter(|l| *l == "BankID_01 D 1").count();
    assert!(deposits > 0);
    assert_eq!(
        std::fs::read_to_string(&db)?,
        format!("BankID_01 {}\n", 5 + deposits)
    );
    Ok(())
}
