use std::fs;
use std::path::{Path, PathBuf};

use ckernel::config::KernelConfig;
use tempfile::TempDir;

use crate::builders::KernelConfigBuilder;

/// A stand-in for a C compiler, built from shell scripts.
///
/// The "compiler" is `/bin/sh` running `cc.sh`, which records its
/// arguments in `args.log` and either installs a prepared shell program
/// as the output binary or fails like a compiler with errors would.
/// Everything lives in a private temp directory; temp files created by a
/// session go to its `work/` subdirectory.
pub struct FakeToolchain {
    dir: TempDir,
}

impl FakeToolchain {
    /// A compiler that succeeds and whose "binary" runs `program_body`
    /// with `/bin/sh`.
    pub fn succeeding(program_body: &str) -> Self {
        let toolchain = Self::empty();
        toolchain.write("program.sh", &format!("#!/bin/sh\n{program_body}\n"));
        let cc = format!(
            r#"printf '%s\n' "$@" > '{log}'
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
cp '{program}' "$out" && chmod 755 "$out"
"#,
            log = toolchain.args_log().display(),
            program = toolchain.path("program.sh").display(),
        );
        toolchain.write("cc.sh", &cc);
        toolchain
    }

    /// A compiler that prints `diagnostic` on stderr and exits with `code`.
    pub fn failing(diagnostic: &str, code: i32) -> Self {
        let toolchain = Self::empty();
        let cc = format!(
            "printf '%s\\n' \"$@\" > '{log}'\necho '{diagnostic}' >&2\nexit {code}\n",
            log = toolchain.args_log().display(),
        );
        toolchain.write("cc.sh", &cc);
        toolchain
    }

    fn empty() -> Self {
        let dir = tempfile::tempdir().expect("create fake toolchain dir");
        fs::create_dir(dir.path().join("work")).expect("create work dir");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Where sessions using [`config`](Self::config) put their temp files.
    pub fn work_dir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file into the toolchain directory and return its path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("write fake toolchain file");
        path
    }

    /// Builder preset to use this toolchain, with `/bin/sh` running test
    /// scripts.
    pub fn config_builder(&self) -> KernelConfigBuilder {
        KernelConfigBuilder::new()
            .compiler("/bin/sh")
            .baseline_flags(&[self.path("cc.sh").to_str().expect("utf-8 temp path")])
            .temp_dir(self.work_dir())
            .interpreter("/bin/sh")
    }

    pub fn config(&self) -> KernelConfig {
        self.config_builder().build()
    }

    fn args_log(&self) -> PathBuf {
        self.path("args.log")
    }

    /// Arguments the compiler was last invoked with, or `None` if it never
    /// ran.
    pub fn recorded_args(&self) -> Option<Vec<String>> {
        let log = fs::read_to_string(self.args_log()).ok()?;
        Some(log.lines().map(str::to_string).collect())
    }

    /// Files currently in the work directory.
    pub fn work_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(self.work_dir())
            .expect("read work dir")
            .map(|entry| entry.expect("dir entry").path())
            .collect();
        files.sort();
        files
    }
}
