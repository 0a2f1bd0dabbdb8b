mod config;
mod pip;
mod tui;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 加载配置（LIAN_PIP_BIN 可覆盖 pip 可执行文件）
    let config = config::Config::load_or_default()?;
    log::info!(
        "pip: {} {:?}, 检查方式: {}",
        config.pip,
        config.pip_args,
        config.presence_check.label()
    );

    tui::run(config).await?;

    Ok(())
}
