// tests/pipeline.rs
mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::path::PathBuf;

use ckernel::directive::parse;
use ckernel::engine::{compile_args, ExecutionPipeline, Stage};
use ckernel::fs::TempFileTracker;
use ckernel_test_utils::{FakeToolchain, KernelConfigBuilder, RecordingSink};

const HELLO: &str = "#include <stdio.h>\nint main(void) { puts(\"hi\"); return 0; }\n";

#[test]
fn compile_args_put_link_flags_last() {
    let config = KernelConfigBuilder::new().baseline_flags(&["-g", "-fPIC"]).build();
    let directives = parse("//%cflags: -Wall -Werror\n//%ldflags: -lm\n");

    let args = compile_args(
        &config,
        &directives,
        &PathBuf::from("/tmp/a.c"),
        &PathBuf::from("/tmp/a.out"),
    );

    assert_eq!(
        args,
        vec!["-g", "-fPIC", "-Wall", "-Werror", "/tmp/a.c", "-o", "/tmp/a.out", "-lm"]
    );
}

#[tokio::test]
async fn successful_compile_runs_program_with_cflags() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("echo program ran");
    let config = toolchain.config();
    let source = format!("//%cflags: -Wall -Werror\n{HELLO}");
    let directives = parse(&source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    let report = with_timeout(
        ExecutionPipeline::new(&config).run(&source, &directives, &mut files, &mut sink),
    )
    .await?;

    assert_eq!(report.final_stage, Stage::Done);
    assert_eq!(report.compile_exit, 0);
    assert_eq!(report.run_exit, Some(0));
    assert_eq!(sink.stdout(), "program ran\n");
    assert_eq!(sink.stderr(), "", "no diagnostics expected");

    let args = toolchain.recorded_args().expect("compiler was invoked");
    assert_eq!(&args[..2], &["-Wall", "-Werror"]);
    assert_eq!(args[3], "-o");
    assert!(args[2].ends_with(".c"));
    assert!(args[4].ends_with(".out"));
    assert_eq!(std::fs::read_to_string(&args[2])?, source);

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn compile_failure_aborts_before_run() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::failing("main.c:1:1: error: expected declaration", 1);
    let config = toolchain.config();
    let source = "//%stdin: \"1\"\nint main(void) { oops }\n";
    let directives = parse(source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    let report = with_timeout(
        ExecutionPipeline::new(&config).run(source, &directives, &mut files, &mut sink),
    )
    .await?;

    assert_eq!(report.final_stage, Stage::Aborted);
    assert_eq!(report.compile_exit, 1);
    assert_eq!(report.run_exit, None);
    assert!(report.binary.is_none());

    let stderr = sink.stderr();
    assert!(stderr.contains("error: expected declaration"));
    assert!(stderr.contains("compiler exited with code 1"));
    assert!(stderr.contains(&toolchain.work_dir().display().to_string()));
    // Run-stage guidance is never shown: the run stage was not entered.
    assert!(!stderr.contains("input:"));
    assert_eq!(sink.stdout(), "");

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn stdin_and_args_reach_the_program() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding(
        r#"for a in "$@"; do echo "arg:$a"; done
while read line; do echo "got:$line"; done"#,
    );
    let config = toolchain.config();
    let source = "//%stdin: \"5\" \"3\"\n//%args: \"--verbose\", foo\nint main(void) {}\n";
    let directives = parse(source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    with_timeout(ExecutionPipeline::new(&config).run(source, &directives, &mut files, &mut sink))
        .await?;

    assert_eq!(sink.stdout(), "arg:--verbose\narg:foo\ngot:5\ngot:3\n");
    assert_eq!(sink.stderr(), "input: 5\n3\n");

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn guidance_is_emitted_before_the_program_runs() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("echo done");
    let config = toolchain.config();
    let source = "//%stdout: \"done\"\n//%memexpect: 64\n//%memaux: 16\nint main(void) {}\n";
    let directives = parse(source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    with_timeout(ExecutionPipeline::new(&config).run(source, &directives, &mut files, &mut sink))
        .await?;

    let texts: Vec<&str> = sink.events().iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(texts[0], "expected output: done\n");
    assert_eq!(
        texts[1],
        "Some memory hints which you might like to verify for this question:\n"
    );
    assert!(texts[2].contains("only the pointers to each string"));
    assert!(texts[3].contains("about  64 bytes"));
    assert_eq!(texts[4], "done\n");

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn failing_program_still_runs_test_scripts() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("echo partial; exit 4");
    let first = toolchain.write("first.sh", "echo \"checking $1\"\nexit 0\n");
    let second = toolchain.write("second.sh", "echo failed >&2\nexit 2\n");
    let config = toolchain.config();
    let source = format!(
        "//%test_script: {}\n//%test_script: {}\nint main(void) {{}}\n",
        first.display(),
        second.display()
    );
    let directives = parse(&source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    let report = with_timeout(
        ExecutionPipeline::new(&config).run(&source, &directives, &mut files, &mut sink),
    )
    .await?;

    assert_eq!(report.final_stage, Stage::Done);
    assert_eq!(report.run_exit, Some(4));
    assert_eq!(report.script_exits, vec![0, 2]);

    let binary = report.binary.expect("binary path");
    assert_eq!(
        sink.stdout(),
        format!("partial\nchecking {}\n", binary.display())
    );

    let stderr = sink.stderr();
    assert!(stderr.contains("executable exited with code 4"));
    assert!(stderr.contains(&format!("Testing with script: {}.", first.display())));
    assert!(stderr.contains(&format!(
        "Command: [\"/bin/sh\", \"{}\", \"{}\"]",
        second.display(),
        binary.display()
    )));
    assert!(stderr.contains(&format!("test script {} exited with code 2", second.display())));

    // The run-stage diagnostic precedes the first script banner.
    let run_diag = stderr.find("executable exited").expect("run diagnostic");
    let first_banner = stderr.find("Testing with script").expect("script banner");
    assert!(run_diag < first_banner);

    files.cleanup()?;
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_scripts_are_made_executable() -> TestResult {
    use std::os::unix::fs::PermissionsExt;

    init_tracing();

    let toolchain = FakeToolchain::succeeding("true");
    let script = toolchain.write("check.sh", "exit 0\n");
    let config = toolchain.config_builder().script_mode(0o750).build();
    let source = format!("//%test_script: {}\n", script.display());
    let directives = parse(&source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));

    with_timeout(ExecutionPipeline::new(&config).run(
        &source,
        &directives,
        &mut files,
        &mut RecordingSink::new(),
    ))
    .await?;

    let mode = std::fs::metadata(&script)?.permissions().mode() & 0o7777;
    assert_eq!(mode, 0o750);

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn missing_test_script_is_only_a_diagnostic() -> TestResult {
    init_tracing();

    let toolchain = FakeToolchain::succeeding("true");
    let config = toolchain.config();
    let missing = toolchain.path("nope.sh");
    let source = format!("//%test_script: {}\n", missing.display());
    let directives = parse(&source);
    let mut files = TempFileTracker::new(Some(toolchain.work_dir()));
    let mut sink = RecordingSink::new();

    let report = with_timeout(
        ExecutionPipeline::new(&config).run(&source, &directives, &mut files, &mut sink),
    )
    .await?;

    assert_eq!(report.final_stage, Stage::Done);
    assert_eq!(report.script_exits.len(), 1);
    assert_ne!(report.script_exits[0], 0);
    assert!(sink.stderr().contains("could not make"));

    files.cleanup()?;
    Ok(())
}

#[tokio::test]
async fn missing_compiler_is_a_backend_error() -> TestResult {
    init_tracing();

    let work = tempfile::tempdir()?;
    let config = KernelConfigBuilder::new()
        .compiler("/no/such/compiler")
        .temp_dir(work.path())
        .build();
    let directives = parse(HELLO);
    let mut files = TempFileTracker::new(Some(work.path().to_path_buf()));
    let mut sink = RecordingSink::new();

    let result = ExecutionPipeline::new(&config)
        .run(HELLO, &directives, &mut files, &mut sink)
        .await;

    assert!(matches!(result, Err(ckernel::errors::KernelError::Spawn { .. })));
    // Files created before the failure are still tracked for cleanup.
    assert_eq!(files.len(), 2);
    files.cleanup()?;
    assert!(files.is_empty());
    Ok(())
}
