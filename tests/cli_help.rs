use std::process::Command;

#[test]
fn help_exits_zero_and_shows_usage() {
    let bin = env!("CARGO_BIN_EXE_uranio-sync");

    let output = Command::new(bin).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Uranio monorepo"));
    assert!(stdout.contains("<REPO>"));
    assert!(stdout.contains("<MONOREPO>"));
}

#[test]
fn short_help_flag_works_too() {
    let bin = env!("CARGO_BIN_EXE_uranio-sync");

    let output = Command::new(bin).arg("-h").output().unwrap();

    assert!(output.status.success());
}

#[test]
fn version_flag_prints_version() {
    let bin = env!("CARGO_BIN_EXE_uranio-sync");

    let output = Command::new(bin).arg("--version").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}
