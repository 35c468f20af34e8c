use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn quote_prints_discounted_total_rounded_to_cents() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("mkp")?;
    cmd.args(["quote", "--price", "12.50", "--discount", "20", "--qty", "3"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("total=30.00"))
        .stdout(predicate::str::contains("total_micros=30000000"));
    Ok(())
}

#[test]
fn quote_rounds_half_up() -> anyhow::Result<()> {
    // 0.05 * 0.90 = 0.045 -> 0.05
    let mut cmd = Command::cargo_bin("mkp")?;
    cmd.args(["quote", "--price", "0.05", "--discount", "10", "--qty", "1"]);
    cmd.assert().success().stdout(predicate::str::contains("total=0.05"));
    Ok(())
}

#[test]
fn quote_rejects_out_of_range_discount_and_zero_qty() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("mkp")?;
    cmd.args(["quote", "--price", "1", "--discount", "101", "--qty", "1"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("discount must be within 0..=100"));

    let mut cmd = Command::cargo_bin("mkp")?;
    cmd.args(["quote", "--price", "1", "--qty", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("quantity must be >= 1"));
    Ok(())
}
