// Runs package managers (and hook scripts) as child processes.

use colored::Colorize;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::log_debug;
use crate::schemas::errors::ModuleError;

/// Everything a finished child process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// stdout and stderr together, for failure-marker checks and error reports.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// The combined output, followed by how the process ended when it did not succeed.
    pub fn failure_report(&self) -> String {
        let output = self.combined().trim().to_string();
        if self.success {
            return output;
        }
        let ending = match self.code {
            Some(code) => format!("exit code {code}"),
            None => "terminated by a signal".to_string(),
        };
        if output.is_empty() { ending } else { format!("{output}\n({ending})") }
    }
}

pub trait ProcessRunner {
    /// Runs to completion and captures both streams.
    fn run(&self, program: &Path, args: &[&str]) -> Result<ProcessOutput, ModuleError>;

    /// Like `run`, but hands every stderr line to `on_line` as soon as it is printed.
    fn run_streaming(
        &self,
        program: &Path,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutput, ModuleError>;
}

/// Spawns real processes.
pub struct SystemRunner;

fn spawn_error(program: &Path) -> impl FnOnce(std::io::Error) -> ModuleError {
    ModuleError::io("cannot run", program)
}

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<ProcessOutput, ModuleError> {
        log_debug!("[Process] {} {}", program.display().to_string().blue(), args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(spawn_error(program))?;
        Ok(ProcessOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_streaming(
        &self,
        program: &Path,
        args: &[&str],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutput, ModuleError> {
        log_debug!("[Process] {} {} (streaming)", program.display().to_string().blue(), args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error(program))?;

        let mut stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        // stdout is drained on its own thread so a chatty child can never block
        // on a full pipe while we are reading stderr.
        let (stdout, stderr) = std::thread::scope(|scope| {
            let stdout_reader = scope.spawn(move || {
                let mut buffer = Vec::new();
                if let Some(pipe) = stdout_pipe.as_mut() {
                    let _ = pipe.read_to_end(&mut buffer);
                }
                String::from_utf8_lossy(&buffer).into_owned()
            });

            let mut stderr = String::new();
            if let Some(pipe) = stderr_pipe {
                for line in BufReader::new(pipe).lines().map_while(Result::ok) {
                    on_line(&line);
                    stderr.push_str(&line);
                    stderr.push('\n');
                }
            }
            (stdout_reader.join().unwrap_or_default(), stderr)
        });

        let status = child.wait().map_err(spawn_error(program))?;
        Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout,
            stderr,
        })
    }
}
