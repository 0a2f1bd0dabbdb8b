//! 外部命令执行（阻塞捕获 / 流式输出）

use super::error::{PipError, Result};
use super::parser::clean_terminal_output;
use super::types::{CommandOutput, StreamLine};
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

/// 当前流式子进程的 PID（同一时刻最多一个变更操作在运行）
static CHILD_PID: AtomicU32 = AtomicU32::new(0);

/// 外部工具调用接口，测试中用假实现替换
pub trait ProcessRunner: Send + Sync {
    /// 启动并阻塞到进程结束，返回全部输出
    fn run_capture(&self, args: &[&str]) -> Result<CommandOutput>;

    /// 启动并逐行回调 `sink`，两条输出流都关闭且进程退出后返回退出码
    fn run_streamed(&self, args: &[&str], sink: &mut dyn FnMut(StreamLine)) -> Result<Option<i32>>;
}

/// 基于 `std::process::Command` 的真实实现
#[derive(Debug, Clone)]
pub struct SystemRunner {
    program: String,
    base_args: Vec<String>,
}

impl SystemRunner {
    /// `base_args` 会放在每次调用的参数之前，例如 `python3` + `["-m", "pip"]`
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd.args(args);
        cmd.env("PIP_DISABLE_PIP_VERSION_CHECK", "1");
        cmd.env("PIP_NO_INPUT", "1");
        cmd.env("PYTHONUNBUFFERED", "1");
        cmd.stdin(Stdio::null());
        cmd
    }

    fn launch_error(&self, source: std::io::Error) -> PipError {
        PipError::Launch {
            program: self.program.clone(),
            source,
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run_capture(&self, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("run_capture: {} {:?}", self.program, args);
        let output = self
            .command(args)
            .output()
            .map_err(|e| self.launch_error(e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        })
    }

    fn run_streamed(&self, args: &[&str], sink: &mut dyn FnMut(StreamLine)) -> Result<Option<i32>> {
        log::debug!("run_streamed: {} {:?}", self.program, args);
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        #[cfg(target_os = "linux")]
        {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(|| {
                    // 独立进程组，退出时可以连同 pip 启动的构建子进程一起结束
                    libc::setpgid(0, 0);
                    libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                    Ok(())
                });
            }
        }
        let mut child = cmd.spawn().map_err(|e| self.launch_error(e))?;
        let pid = child.id();
        CHILD_PID.store(pid, Ordering::SeqCst);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let line_tx_err = line_tx.clone();
        let stdout_handle = std::thread::spawn(move || read_stream_lines(stdout, &line_tx, false));
        let stderr_handle =
            std::thread::spawn(move || read_stream_lines(stderr, &line_tx_err, true));

        // 两个读取线程都结束后 channel 才会关闭
        while let Some(line) = line_rx.blocking_recv() {
            sink(line);
        }

        let stdout_result = stdout_handle.join();
        let stderr_result = stderr_handle.join();
        // 回收前清除：wait 之后 PID 可能被复用
        release_child_pid(pid);
        let status = child.wait();

        for joined in [stdout_result, stderr_result] {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(PipError::execution(format!("读取输出失败: {}", e))),
                Err(_) => return Err(PipError::execution("输出读取线程异常退出")),
            }
        }

        let status = status.map_err(|e| PipError::execution(format!("等待进程结束失败: {}", e)))?;
        Ok(status.code())
    }
}

/// 从流中读取行并发送到 channel。
/// `\n` 结尾为普通行，`\r` 结尾为进度刷新行；空白行丢弃。
fn read_stream_lines(
    stream: Option<impl Read>,
    tx: &mpsc::UnboundedSender<StreamLine>,
    is_stderr: bool,
) -> std::io::Result<()> {
    let Some(mut reader) = stream else {
        return Ok(());
    };
    let mut buffer = [0u8; 1024];
    let mut line_buffer: Vec<u8> = Vec::new();

    let emit = |bytes: &[u8], progress: bool| {
        let cleaned = clean_terminal_output(&String::from_utf8_lossy(bytes));
        if cleaned.trim().is_empty() {
            return;
        }
        let line = if progress {
            StreamLine::Progress(cleaned)
        } else if is_stderr {
            StreamLine::Stderr(cleaned)
        } else {
            StreamLine::Stdout(cleaned)
        };
        let _ = tx.send(line);
    };

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        // 按字节切分，避免多字节字符被 1024 字节边界截断
        for &b in &buffer[..n] {
            match b {
                b'\n' => {
                    emit(&line_buffer, false);
                    line_buffer.clear();
                }
                b'\r' => {
                    emit(&line_buffer, true);
                    line_buffer.clear();
                }
                _ => line_buffer.push(b),
            }
        }
    }
    if !line_buffer.is_empty() {
        emit(&line_buffer, false);
    }
    Ok(())
}

/// 仅当记录的仍是 `pid` 时清除
fn release_child_pid(pid: u32) {
    let _ = CHILD_PID.compare_exchange(pid, 0, Ordering::SeqCst, Ordering::SeqCst);
}

/// 退出应用时结束残留的流式子进程（整个进程组）
pub fn terminate_running_child() {
    let pid = CHILD_PID.swap(0, Ordering::SeqCst);
    if pid == 0 {
        return;
    }
    log::info!("terminate_running_child: 向进程组 {} 发送 SIGTERM", pid);
    unsafe {
        libc::kill(-(pid as i32), libc::SIGTERM);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    /// 读写 CHILD_PID 的测试串行执行
    static PID_LOCK: Mutex<()> = Mutex::new(());

    fn pid_lock() -> MutexGuard<'static, ()> {
        PID_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn shell(script: &str) -> SystemRunner {
        SystemRunner::new("sh", vec!["-c".to_string(), script.to_string(), "sh".to_string()])
    }

    #[test]
    fn capture_collects_both_streams_and_exit_code() {
        let runner = shell("echo hi; echo oops >&2; exit 2");
        let out = runner.run_capture(&[]).unwrap();
        assert_eq!(out.stdout, "hi\n");
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.code, Some(2));
        assert!(!out.success());
        assert_eq!(out.first_error_line(), Some("oops"));
    }

    #[test]
    fn capture_passes_arguments_after_base_args() {
        let runner = shell("echo \"$1-$2\"");
        let out = runner.run_capture(&["show", "requests"]).unwrap();
        assert_eq!(out.stdout, "show-requests\n");
        assert!(out.success());
    }

    #[test]
    fn streamed_preserves_stdout_order() {
        let runner = shell("printf 'Collecting x\\n\\nInstalling x\\n'; printf 'careful\\n' >&2; printf 'Done'");
        let mut lines = Vec::new();
        let _guard = pid_lock();
        let code = runner.run_streamed(&[], &mut |l| lines.push(l)).unwrap();
        assert_eq!(code, Some(0));

        let stdout: Vec<_> = lines
            .iter()
            .filter_map(|l| match l {
                StreamLine::Stdout(s) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, ["Collecting x", "Installing x", "Done"]);
        assert!(lines.contains(&StreamLine::Stderr("careful".to_string())));
    }

    #[test]
    fn streamed_carriage_returns_become_progress() {
        let runner = shell("printf '10%%\\r100%%\\rfinished\\n'; exit 1");
        let mut lines = Vec::new();
        let _guard = pid_lock();
        let code = runner.run_streamed(&[], &mut |l| lines.push(l)).unwrap();
        assert_eq!(code, Some(1));
        assert_eq!(
            lines,
            [
                StreamLine::Progress("10%".to_string()),
                StreamLine::Progress("100%".to_string()),
                StreamLine::Stdout("finished".to_string()),
            ]
        );
    }

    #[test]
    fn child_pid_recorded_while_streaming_and_cleared_before_return() {
        let runner = shell("echo \"$$\"; echo done");
        let mut first: Option<String> = None;
        let mut seen_pid = 0;
        let _guard = pid_lock();
        runner
            .run_streamed(&[], &mut |line| {
                if let StreamLine::Stdout(s) = line {
                    if first.is_none() {
                        first = Some(s);
                        seen_pid = CHILD_PID.load(Ordering::SeqCst);
                    }
                }
            })
            .unwrap();
        let own: u32 = first.unwrap().parse().unwrap();
        assert_eq!(seen_pid, own);
        assert_eq!(CHILD_PID.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn release_leaves_newer_child_alone() {
        let _guard = pid_lock();
        CHILD_PID.store(4_000_000, Ordering::SeqCst);
        release_child_pid(1);
        assert_eq!(CHILD_PID.load(Ordering::SeqCst), 4_000_000);
        release_child_pid(4_000_000);
        assert_eq!(CHILD_PID.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_executable_is_launch_error() {
        let runner = SystemRunner::new("/nonexistent/lian-pip-no-such-binary", Vec::new());
        match runner.run_capture(&["list"]) {
            Err(PipError::Launch { program, .. }) => {
                assert_eq!(program, "/nonexistent/lian-pip-no-such-binary")
            }
            other => panic!("expected launch error, got {:?}", other),
        }
        let mut called = false;
        let result = runner.run_streamed(&["install", "x"], &mut |_| called = true);
        assert!(matches!(result, Err(PipError::Launch { .. })));
        assert!(!called);
    }
}
