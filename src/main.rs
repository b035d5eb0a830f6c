use anyhow::Result;
use page_questions::utils::logging;
use page_questions::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let stats = App::initialize(config).await?.run().await?;

    if stats.failed > 0 {
        anyhow::bail!("{} 个文档处理失败", stats.failed);
    }

    Ok(())
}
