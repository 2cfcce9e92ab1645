// tests/session.rs
mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use ckernel::engine::{ExecutionStatus, Session, Stage};
use ckernel_test_utils::{FakeToolchain, RecordingSink};

#[tokio::test]
async fn failing_compile_is_still_handled() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::failing("error: boom", 2);
    let mut session = Session::new(toolchain.config());
    let mut sink = RecordingSink::new();

    let status = with_timeout(session.execute("int main(void) { boom }\n", &mut sink)).await?;

    assert_eq!(status, ExecutionStatus::Handled);
    assert!(sink.stderr().contains("compiler exited with code 2"));
    assert_eq!(session.execution_count(), 1);

    session.shutdown()?;
    Ok(())
}

#[tokio::test]
async fn crashing_program_is_still_handled() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("echo before; kill -SEGV $$");
    let mut session = Session::new(toolchain.config());
    let mut sink = RecordingSink::new();

    let report = with_timeout(session.run("int main(void) {}\n", &mut sink)).await?;

    assert_eq!(report.final_stage, Stage::Done);
    assert_eq!(report.run_exit, Some(-11));
    assert_eq!(sink.stdout(), "before\n");
    assert!(sink.stderr().contains("executable exited with code -11"));

    session.shutdown()?;
    Ok(())
}

#[tokio::test]
async fn temp_files_live_until_shutdown_and_are_removed_once() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("echo ok");
    let mut session = Session::new(toolchain.config());
    let mut sink = RecordingSink::new();

    with_timeout(session.execute("int main(void) {}\n", &mut sink)).await?;
    with_timeout(session.execute("int main(void) { return 0; }\n", &mut sink)).await?;

    assert_eq!(session.execution_count(), 2);
    let tracked = session.tracked_files().paths();
    assert_eq!(tracked.len(), 4, "source + binary per request");
    for path in &tracked {
        assert!(path.exists(), "{} should exist before shutdown", path.display());
        assert!(path.starts_with(toolchain.work_dir()));
    }
    assert_eq!(toolchain.work_files().len(), 4);

    session.shutdown()?;

    assert!(session.tracked_files().is_empty());
    for path in &tracked {
        assert!(!path.exists(), "{} should be removed", path.display());
    }
    assert!(toolchain.work_files().is_empty());

    // A second shutdown has nothing left to remove.
    session.shutdown()?;
    Ok(())
}

#[tokio::test]
async fn dropping_a_session_releases_its_files() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("true");
    {
        let mut session = Session::new(toolchain.config());
        with_timeout(session.execute("int main(void) {}\n", &mut RecordingSink::new())).await?;
        assert_eq!(toolchain.work_files().len(), 2);
    }
    assert!(toolchain.work_files().is_empty());
    Ok(())
}

#[tokio::test]
async fn file_removed_behind_the_trackers_back_is_not_an_error() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("true");
    let mut session = Session::new(toolchain.config());
    with_timeout(session.execute("int main(void) {}\n", &mut RecordingSink::new())).await?;

    let first = session.tracked_files().paths()[0].clone();
    std::fs::remove_file(&first)?;

    session.shutdown()?;
    assert!(toolchain.work_files().is_empty());
    Ok(())
}
