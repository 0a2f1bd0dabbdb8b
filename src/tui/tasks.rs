//! 后台任务：查询走 tokio 阻塞线程池，安装/卸载各占一个专用线程。
//! 结果一律通过 channel 送回主循环，由主循环修改界面状态。

use super::state::{App, AppEvent, Submission};
use crate::pip::{run_operation, OperationRequest, PipError};
use tokio::sync::mpsc;

/// 重新加载已安装包列表
pub fn spawn_refresh_task(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let generation = app.begin_refresh();
    let pip = app.pip.clone();
    let tx_clone = tx.clone();
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || pip.list_installed())
            .await
            .unwrap_or_else(|e| Err(PipError::execution(format!("后台任务异常: {}", e))));
        let _ = tx_clone
            .send(AppEvent::PackagesLoaded { generation, result })
            .await;
    });
}

/// 获取包详情
pub fn spawn_describe_task(app: &mut App, tx: &mpsc::Sender<AppEvent>, name: String) {
    app.show_detail(super::state::DetailView::Message(format!(
        "正在获取 '{}' 的信息...",
        name
    )));
    let pip = app.pip.clone();
    let tx_clone = tx.clone();
    tokio::spawn(async move {
        let lookup = name.clone();
        let result = tokio::task::spawn_blocking(move || pip.describe(&lookup))
            .await
            .unwrap_or_else(|e| Err(PipError::execution(format!("后台任务异常: {}", e))));
        let _ = tx_clone.send(AppEvent::DetailLoaded { name, result }).await;
    });
}

/// 提交安装/卸载请求：空闲时立即开始，否则排队
pub fn submit_operation(app: &mut App, tx: &mpsc::Sender<AppEvent>, request: OperationRequest) {
    match app.queue.submit(request.clone()) {
        Submission::Started(request) => spawn_operation_task(app, tx, request),
        Submission::Queued(position) => {
            app.append_log(format!(
                "已加入队列: {}（前面还有 {} 个操作）",
                request.describe(),
                position
            ));
        }
        Submission::Duplicate => {
            app.append_log(format!("{} 已在进行或排队中。", request.describe()));
        }
    }
}

/// 在专用线程中执行一次安装/卸载
pub fn spawn_operation_task(app: &mut App, tx: &mpsc::Sender<AppEvent>, request: OperationRequest) {
    app.append_log(format!("==> {}", request.describe()));
    app.follow_log();

    let pip = app.pip.clone();
    let tx_clone = tx.clone();
    std::thread::spawn(move || {
        let phase = run_operation(&pip, &request, &mut |event| {
            let _ = tx_clone.blocking_send(AppEvent::Operation(event));
        });
        log::info!("{} 结束: {:?}", request.describe(), phase);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pip::error::Result;
    use crate::pip::{CommandOutput, Pip, PresenceCheck, ProcessRunner, StreamLine};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// 第一次 `pip list` 很慢且返回旧列表，之后立即返回新列表
    struct SlowFirstList {
        calls: AtomicUsize,
    }

    impl ProcessRunner for SlowFirstList {
        fn run_capture(&self, _args: &[&str]) -> Result<CommandOutput> {
            let stdout = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                std::thread::sleep(Duration::from_millis(300));
                "six==1.16.0\nrequests==2.31.0\n"
            } else {
                "requests==2.31.0\n"
            };
            Ok(CommandOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                code: Some(0),
            })
        }

        fn run_streamed(&self, _args: &[&str], _sink: &mut dyn FnMut(StreamLine)) -> Result<Option<i32>> {
            Ok(Some(0))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_refreshes_keep_latest_list() {
        let runner = Arc::new(SlowFirstList {
            calls: AtomicUsize::new(0),
        });
        let pip = Pip::new(runner, PresenceCheck::Index, "pip");
        let mut app = App::new(Config::default(), pip);
        let (tx, mut rx) = mpsc::channel(16);

        spawn_refresh_task(&mut app, &tx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        spawn_refresh_task(&mut app, &tx);

        // 按到达顺序处理，与主循环一致
        for _ in 0..2 {
            match rx.recv().await {
                Some(AppEvent::PackagesLoaded { generation, result }) => {
                    app.on_packages_loaded(generation, result)
                }
                other => panic!("unexpected event {:?}", other),
            }
        }

        let names: Vec<&str> = app.packages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["requests"]);
        assert!(!app.loading);
    }
}
