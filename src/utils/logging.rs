/// 日志工具模块
///
/// 初始化 tracing 输出，并提供批次开始/结束时的横幅日志
use std::path::Path;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`，否则 `verbose` 时为 debug，默认 info。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("batch_upscale={default_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量图片处理模式");
    info!("📂 输入目录: {}", config.input_dir.display());
    info!("📂 输出目录: {}", config.output_dir.display());
    info!("🧭 处理模式: {}", config.pipeline.mode_name);
    info!("💬 提示词: {}", truncate_text(&config.pipeline.prompt, 60));
    info!(
        "🔁 最大尝试次数: {} | 间隔: {:?} ~ {:?}",
        config.pipeline.max_retries, config.pipeline.min_delay, config.pipeline.max_delay
    );
    info!("{}", "=".repeat(60));
}

/// 记录待处理图片信息
///
/// # 参数
/// - `pending`: 本次待处理数量
/// - `already_done`: 之前运行已完成、被跳过的数量
pub fn log_items_loaded(pending: usize, already_done: usize) {
    info!("✓ 找到 {} 张待处理的图片", pending);
    if already_done > 0 {
        info!("⏭️ 跳过 {} 张已完成的图片", already_done);
    }
}

/// 记录单张图片开始处理
pub fn log_item_start(index: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("🖼️ [{}/{}] 开始处理: {}", index, total, name);
}

/// 打印最终统计信息
pub fn print_final_stats(success: usize, failed: usize, total: usize, run_log: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", run_log.display());
}

/// 把等待时长格式化成 "1m05s" 的形式
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "5s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m05s");
        assert_eq!(format_elapsed(Duration::from_millis(120_900)), "2m00s");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("放大这张图片", 2), "放大...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
