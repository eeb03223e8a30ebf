//! Docker sandbox runner
//!
//! One fresh container per submission: no network, memory and pid caps,
//! dropped capabilities, read-only root filesystem with a small writable
//! tmpfs scratch, non-root user. Compilation happens once, then each test
//! is an `exec` with a `timeout`-bounded wall clock. The container is force
//! removed when the run ends, however it ends.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context};
use base64::Engine;
use bollard::{
    container::LogOutput,
    exec::{CreateExecOptions, StartExecResults},
    models::ContainerCreateBody,
    query_parameters::{CreateContainerOptionsBuilder, RemoveContainerOptionsBuilder},
    Docker,
};
use futures::StreamExt;
use uuid::Uuid;

use crate::constants::{
    OVERALL_GRACE_SECONDS, PER_TEST_GRACE_SECONDS, SANDBOX_MEMORY_LIMIT_MB, SANDBOX_PIDS_LIMIT,
    SANDBOX_SCRATCH_MB,
};
use crate::models::TestCase;

use super::languages::LanguageHandler;
use super::{FatalError, JudgeOutcome, TestVerdict, Verdict};

/// Checker driver executed inside the sandbox. Exit code 0 means accepted,
/// 1 wrong answer, anything else a checker failure.
const CHECKER_DRIVER: &str = r#"
import sys, traceback
sys.path.insert(0, "/scratch")
try:
    import checker
    inp = open("/scratch/input.txt").read()
    out = open("/scratch/output.txt").read()
    exp = open("/scratch/expected.txt").read()
    ok = checker.check(inp, out, exp)
except Exception:
    traceback.print_exc()
    sys.exit(2)
sys.exit(0 if ok else 1)
"#;

/// `timeout` reports an expired command with this exit code
const TIMEOUT_EXIT_CODE: i32 = 124;

/// Whitespace-token equality, the default answer comparison
pub fn outputs_match(user_output: &str, expected_output: &str) -> bool {
    user_output.split_whitespace().eq(expected_output.split_whitespace())
}

struct ExecResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

/// Sandbox runner over a shared Docker client
#[derive(Clone)]
pub struct SandboxRunner {
    docker: Docker,
}

impl SandboxRunner {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Judge one submission against its tests. Internal failures never
    /// surface as `Err`; they come back as a fatal outcome.
    pub async fn run(
        &self,
        language: &str,
        source_code: &str,
        tests: &[TestCase],
        checker: Option<&str>,
    ) -> JudgeOutcome {
        let Some(handler) = LanguageHandler::for_language(language) else {
            return JudgeOutcome::fatal(FatalError::System(format!(
                "unsupported language: {}",
                language
            )));
        };

        let container_id = match self.create_container(&handler).await {
            Ok(id) => id,
            Err(e) => {
                return JudgeOutcome::fatal(FatalError::System(format!(
                    "container create failed: {:#}",
                    e
                )))
            }
        };

        let budget = tests
            .iter()
            .map(|t| t.time_limit + PER_TEST_GRACE_SECONDS)
            .sum::<f64>()
            + OVERALL_GRACE_SECONDS;

        let result = tokio::time::timeout(
            Duration::from_secs_f64(budget),
            self.run_inner(&container_id, &handler, source_code, tests, checker),
        )
        .await;

        self.remove_container(&container_id).await;

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => JudgeOutcome::fatal(FatalError::System(format!("{:#}", e))),
            Err(_) => JudgeOutcome::fatal(FatalError::OverallTimeout),
        }
    }

    async fn run_inner(
        &self,
        container_id: &str,
        handler: &LanguageHandler,
        source_code: &str,
        tests: &[TestCase],
        checker: Option<&str>,
    ) -> anyhow::Result<JudgeOutcome> {
        self.write_file(container_id, &handler.source_path(), source_code)
            .await
            .context("writing source")?;

        if let Some(compile_cmd) = handler.compile_command() {
            let compile = self
                .exec(container_id, compile_cmd)
                .await
                .context("compile step")?;
            if compile.exit_code != 0 {
                let diagnostics = format!("{}{}", compile.stdout, compile.stderr);
                return Ok(JudgeOutcome::fatal(FatalError::Compilation(diagnostics)));
            }
        }

        if let Some(checker_code) = checker {
            self.write_file(container_id, "/scratch/checker.py", checker_code)
                .await
                .context("writing checker")?;
            self.write_file(container_id, "/scratch/checkrun.py", CHECKER_DRIVER)
                .await
                .context("writing checker driver")?;
        }

        let mut verdicts = Vec::with_capacity(tests.len());
        for test in tests {
            let verdict = self
                .run_test(container_id, handler, test, checker.is_some())
                .await
                .context("running test")?;
            verdicts.push(verdict);
        }

        Ok(JudgeOutcome {
            verdicts,
            fatal: None,
        })
    }

    async fn run_test(
        &self,
        container_id: &str,
        handler: &LanguageHandler,
        test: &TestCase,
        has_checker: bool,
    ) -> anyhow::Result<TestVerdict> {
        self.write_file(container_id, "/scratch/input.txt", &test.input)
            .await?;

        let limit = test.time_limit + PER_TEST_GRACE_SECONDS;
        let cmd = format!(
            "cd /scratch && timeout {:.1} {} < /scratch/input.txt",
            limit,
            handler.run_command()
        );
        let run = self.exec(container_id, &cmd).await?;

        if run.exit_code == TIMEOUT_EXIT_CODE {
            return Ok(TestVerdict {
                verdict: Verdict::TimeLimitExceeded,
                stdout: run.stdout,
                stderr: run.stderr,
            });
        }
        if run.exit_code != 0 {
            return Ok(TestVerdict {
                verdict: Verdict::RuntimeError,
                stdout: run.stdout,
                stderr: run.stderr,
            });
        }

        let verdict = if has_checker {
            self.write_file(container_id, "/scratch/output.txt", &run.stdout)
                .await?;
            self.write_file(container_id, "/scratch/expected.txt", &test.expected_output)
                .await?;
            let check = self
                .exec(container_id, "python3 /scratch/checkrun.py")
                .await?;
            match check.exit_code {
                0 => Verdict::Accepted,
                1 => Verdict::WrongAnswer,
                _ => Verdict::JudgeError,
            }
        } else if outputs_match(&run.stdout, &test.expected_output) {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        };

        Ok(TestVerdict {
            verdict,
            stdout: run.stdout,
            stderr: run.stderr,
        })
    }

    async fn create_container(&self, handler: &LanguageHandler) -> anyhow::Result<String> {
        let container_name = format!("arbiter-{}", Uuid::new_v4().simple());

        let options = CreateContainerOptionsBuilder::default()
            .name(&container_name)
            .build();

        let host_config = bollard::models::HostConfig {
            memory: Some(SANDBOX_MEMORY_LIMIT_MB * 1024 * 1024),
            memory_swap: Some(SANDBOX_MEMORY_LIMIT_MB * 1024 * 1024),
            cpu_period: Some(100_000),
            cpu_quota: Some(100_000),
            network_mode: Some("none".to_string()),
            pids_limit: Some(SANDBOX_PIDS_LIMIT),
            cap_drop: Some(vec!["ALL".to_string()]),
            readonly_rootfs: Some(true),
            tmpfs: Some(HashMap::from([(
                "/scratch".to_string(),
                format!("rw,size={}m", SANDBOX_SCRATCH_MB),
            )])),
            ..Default::default()
        };

        let config = ContainerCreateBody {
            image: Some(handler.image().to_string()),
            tty: Some(true),
            user: Some("nobody".to_string()),
            host_config: Some(host_config),
            working_dir: Some("/scratch".to_string()),
            env: Some(vec!["LANG=C.UTF-8".to_string()]),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container(Some(options), config)
            .await
            .context("create_container")?;

        self.docker
            .start_container(
                &container.id,
                None::<bollard::query_parameters::StartContainerOptions>,
            )
            .await
            .context("start_container")?;

        Ok(container.id)
    }

    async fn remove_container(&self, container_id: &str) {
        let options = RemoveContainerOptionsBuilder::default().force(true).build();
        if let Err(e) = self
            .docker
            .remove_container(container_id, Some(options))
            .await
        {
            tracing::error!(container_id, "failed to remove sandbox container: {}", e);
        }
    }

    /// Ferry file content into the container via base64 to survive any bytes
    async fn write_file(
        &self,
        container_id: &str,
        path: &str,
        content: &str,
    ) -> anyhow::Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let cmd = format!("echo '{}' | base64 -d > {}", encoded, path);
        let result = self.exec(container_id, &cmd).await?;
        if result.exit_code != 0 {
            return Err(anyhow!("writing {} failed: {}", path, result.stderr));
        }
        Ok(())
    }

    async fn exec(&self, container_id: &str, cmd: &str) -> anyhow::Result<ExecResult> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(vec!["/bin/sh", "-c", cmd]),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .context("create_exec")?;

        let output = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .context("start_exec")?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } = output {
            while let Some(msg) = output.next().await {
                match msg.context("exec stream")? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await.context("inspect_exec")?;
        let exit_code = inspect.exit_code.unwrap_or(-1) as i32;

        Ok(ExecResult {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison_ignores_whitespace_shape() {
        assert!(outputs_match("1 2 3\n", "1  2\n3"));
        assert!(outputs_match("hello\n", "hello"));
        assert!(outputs_match("", "   \n "));
        assert!(!outputs_match("1 2", "1 2 3"));
        assert!(!outputs_match("1 23", "1 2 3"));
    }
}
