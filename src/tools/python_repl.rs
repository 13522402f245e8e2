//! Python code execution tool
//!
//! Keeps one interpreter process alive between calls so that variables
//! persist. Each call is a JSON line on the interpreter's stdin, answered by
//! a JSON line on its stdout. A timeout or broken pipe drops the process and
//! the next call starts a fresh one.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::traits::{query_arg, query_schema, Tool, ToolResult};
use crate::config::ToolsConfig;
use crate::error::{Error, Result};

/// Imports available to every snippet. The scientific stack is optional.
const PRELUDE: &str = "\
import math
import statistics
from math import pi, e, sin, cos, tan, log, exp, sqrt
from statistics import mean, median, stdev
try:
    import numpy as np
except Exception:
    pass
try:
    import pandas as pd
except Exception:
    pass
try:
    from scipy import stats
except Exception:
    pass
";

/// Request loop run inside the interpreter. The prelude arrives as argv[1].
const DRIVER: &str = r#"
import io, json, sys, traceback
from contextlib import redirect_stderr, redirect_stdout

_requests = sys.stdin
_replies = sys.stdout
sys.stdin = io.StringIO()
_globals = {"__name__": "__main__", "__builtins__": __builtins__}


def _reply(ok, out, err):
    _replies.write(json.dumps({"ok": ok, "stdout": out, "stderr": err}) + "\n")
    _replies.flush()


exec(sys.argv[1], _globals)
_reply(True, "", "")

while True:
    _line = _requests.readline()
    if not _line:
        break
    _code = json.loads(_line)["code"]
    _out, _err = io.StringIO(), io.StringIO()
    _ok = True
    with redirect_stdout(_out), redirect_stderr(_err):
        try:
            exec(compile(_code, "<repl>", "exec"), _globals)
        except BaseException:
            _ok = False
            traceback.print_exc()
    _reply(_ok, _out.getvalue(), _err.getvalue())
"#;

/// Time allowed for the interpreter to load the prelude
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Strip markdown fences and turn literal `\n` escapes into newlines
pub fn prepare_code(raw: &str) -> String {
    let trimmed = raw.trim();

    let code = if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6 {
        let inner = &trimmed[3..trimmed.len() - 3];
        let mut lines: Vec<&str> = inner.lines().collect();
        while lines.first().is_some_and(|l| l.trim().is_empty()) {
            lines.remove(0);
        }
        if lines
            .first()
            .is_some_and(|l| matches!(l.trim().to_lowercase().as_str(), "python" | "py"))
        {
            lines.remove(0);
        }
        lines.join("\n")
    } else {
        trimmed.to_string()
    };

    code.replace("\\n", "\n")
}

#[derive(Debug, Deserialize)]
struct Reply {
    ok: bool,
    stdout: String,
    stderr: String,
}

impl From<Reply> for ToolResult {
    fn from(reply: Reply) -> Self {
        let stdout = reply.stdout.trim();
        let stderr = reply.stderr.trim();

        if !reply.ok {
            ToolResult::failure(if stderr.is_empty() {
                "Execution failed"
            } else {
                stderr
            })
        } else if !stdout.is_empty() {
            ToolResult::success(stdout)
        } else if !stderr.is_empty() {
            ToolResult::success(stderr)
        } else {
            ToolResult::success("Code executed successfully.")
        }
    }
}

/// A running interpreter and its pipes
struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    async fn send(&mut self, code: &str) -> Result<()> {
        let mut request = serde_json::to_string(&serde_json::json!({ "code": code }))?;
        request.push('\n');
        self.stdin.write_all(request.as_bytes()).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Reply> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line).await? == 0 {
            return Err(Error::Tool("Python interpreter exited".to_string()));
        }
        Ok(serde_json::from_str(&line)?)
    }

    async fn exchange(&mut self, code: &str, timeout: Duration) -> Result<Reply> {
        let round_trip = async {
            self.send(code).await?;
            self.receive().await
        };
        match tokio::time::timeout(timeout, round_trip).await {
            Ok(reply) => reply,
            Err(_) => Err(Error::Timeout(format!(
                "Execution timed out after {}s",
                timeout.as_secs_f64()
            ))),
        }
    }

    fn kill(mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Python interpreter already gone: {}", e);
        }
    }
}

/// Text shown to the model for a failed call
fn failure_text(error: Error) -> String {
    match error {
        Error::Tool(message) | Error::Timeout(message) => message,
        other => other.to_string(),
    }
}

/// Built-in tool: run Python code
pub struct PythonReplTool {
    python_bin: String,
    timeout: Duration,
    workspace: PathBuf,
    session: Mutex<Option<Session>>,
}

impl PythonReplTool {
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            python_bin: config.python_bin.clone(),
            timeout: Duration::from_secs(config.code_timeout_secs),
            workspace: config.workspace.clone(),
            session: Mutex::new(None),
        }
    }

    async fn spawn(&self) -> Result<Session> {
        let interpreter = which::which(&self.python_bin).map_err(|_| {
            Error::Tool(format!("Python interpreter '{}' not found", self.python_bin))
        })?;
        tokio::fs::create_dir_all(&self.workspace).await?;

        debug!("Starting Python interpreter {}", interpreter.display());
        let mut child = Command::new(interpreter)
            .arg("-u")
            .arg("-c")
            .arg(DRIVER)
            .arg(PRELUDE)
            .current_dir(&self.workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, BufReader::new(stdout)),
            _ => return Err(Error::Tool("Python interpreter pipes unavailable".to_string())),
        };
        let mut session = Session {
            child,
            stdin,
            stdout,
        };

        match tokio::time::timeout(STARTUP_TIMEOUT, session.receive()).await {
            Ok(Ok(_)) => Ok(session),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Timeout(
                "Python interpreter did not start in time".to_string(),
            )),
        }
    }

    async fn run(&self, code: &str) -> ToolResult {
        let mut slot = self.session.lock().await;

        let mut session = match slot.take() {
            Some(session) => session,
            None => match self.spawn().await {
                Ok(session) => session,
                Err(e) => return ToolResult::failure(failure_text(e)),
            },
        };

        debug!("Running {} line(s) of Python", code.lines().count());
        match session.exchange(code, self.timeout).await {
            Ok(reply) => {
                *slot = Some(session);
                reply.into()
            }
            Err(e) => {
                warn!("Restarting Python interpreter: {}", e);
                session.kill();
                ToolResult::failure(failure_text(e))
            }
        }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Execute Python code and return what it prints. Supports multiple statements; \
         math and statistics are pre-imported (sin, cos, sqrt, mean, median, stdev, ...), \
         plus np, pd and stats when numpy, pandas and scipy are installed. \
         Use print() to produce output. Variables persist between calls until the \
         conversation is cleared."
    }

    fn parameters_schema(&self) -> Value {
        query_schema("Python code to execute")
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let code = prepare_code(query_arg(&args)?);
        if code.trim().is_empty() {
            return Ok(ToolResult::failure("No code provided"));
        }
        Ok(self.run(&code).await)
    }

    fn reset(&self) {
        match self.session.try_lock() {
            Ok(mut slot) => {
                if let Some(session) = slot.take() {
                    debug!("Discarding Python interpreter state");
                    session.kill();
                }
            }
            Err(_) => warn!("Python interpreter busy, state not cleared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tool(dir: &std::path::Path, timeout_secs: u64) -> PythonReplTool {
        let config = ToolsConfig {
            workspace: dir.to_path_buf(),
            code_timeout_secs: timeout_secs,
            ..ToolsConfig::default()
        };
        PythonReplTool::new(&config)
    }

    fn python_available() -> bool {
        which::which("python3").is_ok()
    }

    async fn run(tool: &PythonReplTool, code: &str) -> ToolResult {
        tool.execute(serde_json::json!({ "query": code })).await.unwrap()
    }

    #[test]
    fn test_prepare_code() {
        assert_eq!(prepare_code("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(prepare_code("```\npy\nx = 2\nprint(x)\n```"), "x = 2\nprint(x)");
        assert_eq!(prepare_code("x = 1\\nprint(x)"), "x = 1\nprint(x)");
        assert_eq!(prepare_code("  print('hi')  "), "print('hi')");
    }

    #[test]
    fn test_reply_rendering() {
        let reply = |ok: bool, stdout: &str, stderr: &str| {
            ToolResult::from(Reply {
                ok,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            })
            .to_string()
        };

        assert_eq!(reply(true, "6.0\n", ""), "6.0");
        assert_eq!(reply(true, "", "warning\n"), "warning");
        assert_eq!(reply(true, "", ""), "Code executed successfully.");
        assert_eq!(reply(false, "", "Traceback"), "Error: Traceback");
        assert_eq!(reply(false, "", ""), "Error: Execution failed");
    }

    #[tokio::test]
    async fn test_prints_output() {
        if !python_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let result = run(&tool(dir.path(), 30), "print(mean([1, 2, 3]) + sqrt(16))").await;

        assert!(result.success);
        assert_eq!(result.to_string(), "6.0");
    }

    #[tokio::test]
    async fn test_no_output_and_errors() {
        if !python_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let tool = tool(dir.path(), 30);

        let quiet = run(&tool, "x = 1").await;
        assert_eq!(quiet.to_string(), "Code executed successfully.");

        let failing = run(&tool, "1 / 0").await;
        assert!(!failing.success);
        assert!(failing.to_string().contains("ZeroDivisionError"));

        // An exception does not cost the session its state
        assert_eq!(run(&tool, "print(x + 1)").await.to_string(), "2");
    }

    #[tokio::test]
    async fn test_variables_persist_between_calls() {
        if !python_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let tool = tool(dir.path(), 30);

        run(&tool, "leftover = 42\ndef twice(n):\n    return 2 * n").await;
        let result = run(&tool, "print(twice(leftover))").await;
        assert!(result.success);
        assert_eq!(result.to_string(), "84");
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        if !python_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let tool = tool(dir.path(), 30);

        run(&tool, "leftover = 42").await;
        tool.reset();

        let result = run(&tool, "print(leftover)").await;
        assert!(!result.success);
        assert!(result.to_string().contains("NameError"));
    }

    #[tokio::test]
    async fn test_timeout_restarts_interpreter() {
        if !python_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let mut tool = tool(dir.path(), 30);
        run(&tool, "leftover = 1").await;
        tool.timeout = Duration::from_millis(200);

        let result = run(&tool, "import time\ntime.sleep(10)").await;
        assert!(!result.success);
        assert!(result.to_string().contains("timed out"));

        tool.timeout = Duration::from_secs(30);
        let fresh = run(&tool, "print('leftover' in globals())").await;
        assert_eq!(fresh.to_string(), "False");
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let dir = tempdir().unwrap();
        let config = ToolsConfig {
            workspace: dir.path().to_path_buf(),
            python_bin: "definitely-not-a-python-binary".to_string(),
            ..ToolsConfig::default()
        };
        let result = run(&PythonReplTool::new(&config), "print(1)").await;

        assert_eq!(
            result.to_string(),
            "Error: Python interpreter 'definitely-not-a-python-binary' not found"
        );
    }
}
