//! 程序配置
//!
//! 解析顺序（后者覆盖前者）：默认值 → TOML 配置文件 → 环境变量 → 命令行参数

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// 进度记录文件名（位于输出目录）
pub const STATE_FILE_NAME: &str = ".upscale_state.json";
/// 运行日志文件名（位于输出目录）
pub const RUN_LOG_FILE_NAME: &str = "upscale_log.txt";
const DOWNLOAD_STAGING_DIR: &str = ".downloads";
const DEBUG_DIR: &str = "debug";

/// 单次运行的流水线配置，运行期间只读
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// 发送给页面的处理提示词
    pub prompt: String,
    /// 处理模式名称
    pub mode_name: String,
    /// 两张图片之间的最小间隔
    pub min_delay: Duration,
    /// 两张图片之间的最大间隔
    pub max_delay: Duration,
    /// 每张图片的最大尝试次数
    pub max_retries: u32,
    /// 指数退避的基数
    pub base_backoff: Duration,
    /// 能力探测的轮询间隔
    pub poll_interval: Duration,
    /// 长时间等待时的心跳间隔
    pub heartbeat_interval: Duration,
    pub ready_timeout: Duration,
    pub auth_timeout: Duration,
    pub completion_timeout: Duration,
    pub download_timeout: Duration,
    /// 本次最多处理的图片数量
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prompt: "Upscale this image to the highest resolution you can. Keep every detail, \
                     colour and composition exactly the same."
                .to_string(),
            mode_name: "Pro".to_string(),
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(15),
            max_retries: 3,
            base_backoff: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(60),
            auth_timeout: Duration::from_secs(30 * 60),
            completion_timeout: Duration::from_secs(10 * 60),
            download_timeout: Duration::from_secs(2 * 60),
            limit: None,
        }
    }
}

impl PipelineConfig {
    /// 修正不合理的取值
    pub fn normalized(mut self) -> Self {
        if self.max_retries == 0 {
            self.max_retries = 1;
        }
        if self.min_delay > self.max_delay {
            std::mem::swap(&mut self.min_delay, &mut self.max_delay);
        }
        if self.poll_interval < Duration::from_millis(50) {
            self.poll_interval = Duration::from_millis(50);
        }
        self
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 待处理图片目录
    pub input_dir: PathBuf,
    /// 结果输出目录（同时存放进度记录和运行日志）
    pub output_dir: PathBuf,
    /// 浏览器会话配置目录（保存登录状态）
    pub profile_dir: PathBuf,
    /// 目标URL
    pub target_url: String,
    /// 是否无头运行
    pub headless: bool,
    /// 连接已有浏览器的调试端口，设置后不再自行启动浏览器
    pub browser_debug_port: Option<u16>,
    /// 阶段失败时保存截图和页面 HTML
    pub debug_artifacts: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            profile_dir: PathBuf::from("browser_profile"),
            target_url: "https://gemini.google.com/app".to_string(),
            headless: false,
            browser_debug_port: None,
            debug_artifacts: false,
            verbose_logging: false,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// 按 默认值 → 配置文件 → 环境变量 → 命令行 的顺序解析
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = &cli.config {
            config = FileConfig::read(path)?.apply(config);
        }
        let config = cli.apply(config.merge_env());
        Ok(Self {
            pipeline: config.pipeline.normalized(),
            ..config
        })
    }

    fn merge_env(self) -> Self {
        let p = self.pipeline;
        Self {
            input_dir: env_path("INPUT_DIR").unwrap_or(self.input_dir),
            output_dir: env_path("OUTPUT_DIR").unwrap_or(self.output_dir),
            profile_dir: env_path("PROFILE_DIR").unwrap_or(self.profile_dir),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            headless: env_parse("HEADLESS").unwrap_or(self.headless),
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT").or(self.browser_debug_port),
            debug_artifacts: env_parse("DEBUG_ARTIFACTS").unwrap_or(self.debug_artifacts),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            pipeline: PipelineConfig {
                prompt: std::env::var("PROMPT").unwrap_or(p.prompt),
                mode_name: std::env::var("MODE_NAME").unwrap_or(p.mode_name),
                min_delay: env_secs("MIN_DELAY_SECS").unwrap_or(p.min_delay),
                max_delay: env_secs("MAX_DELAY_SECS").unwrap_or(p.max_delay),
                max_retries: env_parse("MAX_RETRIES").unwrap_or(p.max_retries),
                base_backoff: env_secs("BASE_BACKOFF_SECS").unwrap_or(p.base_backoff),
                poll_interval: p.poll_interval,
                heartbeat_interval: env_secs("HEARTBEAT_SECS").unwrap_or(p.heartbeat_interval),
                ready_timeout: env_secs("READY_TIMEOUT_SECS").unwrap_or(p.ready_timeout),
                auth_timeout: env_secs("AUTH_TIMEOUT_SECS").unwrap_or(p.auth_timeout),
                completion_timeout: env_secs("COMPLETION_TIMEOUT_SECS")
                    .unwrap_or(p.completion_timeout),
                download_timeout: env_secs("DOWNLOAD_TIMEOUT_SECS").unwrap_or(p.download_timeout),
                limit: env_parse("LIMIT").or(p.limit),
            },
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.output_dir.join(STATE_FILE_NAME)
    }

    pub fn run_log_file(&self) -> PathBuf {
        self.output_dir.join(RUN_LOG_FILE_NAME)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.output_dir.join(DOWNLOAD_STAGING_DIR)
    }

    pub fn debug_dir(&self) -> Option<PathBuf> {
        self.debug_artifacts
            .then(|| self.output_dir.join(DEBUG_DIR))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<f64>(key)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).map(PathBuf::from)
}

/// 命令行参数，所有字段可选，未给出时沿用配置文件/环境变量/默认值
#[derive(Parser, Debug, Default)]
#[command(
    name = "batch-upscale",
    version,
    about = "通过浏览器页面批量放大图片，支持断点续跑"
)]
pub struct Cli {
    /// TOML 配置文件
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// 最多处理的图片数量
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
    /// 待处理图片目录
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// 输出目录
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// 浏览器会话配置目录
    #[arg(long)]
    pub profile: Option<PathBuf>,
    /// 目标页面地址
    #[arg(long)]
    pub url: Option<String>,
    /// 处理提示词
    #[arg(long)]
    pub prompt: Option<String>,
    /// 处理模式名称
    #[arg(long)]
    pub mode: Option<String>,
    /// 最小间隔（秒）
    #[arg(long)]
    pub min_delay: Option<f64>,
    /// 最大间隔（秒）
    #[arg(long)]
    pub max_delay: Option<f64>,
    /// 每张图片的最大尝试次数
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// 页面就绪超时（秒）
    #[arg(long)]
    pub ready_timeout: Option<u64>,
    /// 等待登录超时（秒）
    #[arg(long)]
    pub auth_timeout: Option<u64>,
    /// 等待处理完成超时（秒）
    #[arg(long)]
    pub completion_timeout: Option<u64>,
    /// 下载超时（秒）
    #[arg(long)]
    pub download_timeout: Option<u64>,
    /// 连接已打开的浏览器调试端口
    #[arg(long)]
    pub debug_port: Option<u16>,
    /// 无头模式
    #[arg(long)]
    pub headless: bool,
    /// 阶段失败时保存截图
    #[arg(long)]
    pub debug_artifacts: bool,
    /// 详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn apply(&self, config: Config) -> Config {
        let p = config.pipeline;
        Config {
            input_dir: self.input.clone().unwrap_or(config.input_dir),
            output_dir: self.output.clone().unwrap_or(config.output_dir),
            profile_dir: self.profile.clone().unwrap_or(config.profile_dir),
            target_url: self.url.clone().unwrap_or(config.target_url),
            headless: self.headless || config.headless,
            browser_debug_port: self.debug_port.or(config.browser_debug_port),
            debug_artifacts: self.debug_artifacts || config.debug_artifacts,
            verbose_logging: self.verbose || config.verbose_logging,
            pipeline: PipelineConfig {
                prompt: self.prompt.clone().unwrap_or(p.prompt),
                mode_name: self.mode.clone().unwrap_or(p.mode_name),
                min_delay: secs_f64(self.min_delay).unwrap_or(p.min_delay),
                max_delay: secs_f64(self.max_delay).unwrap_or(p.max_delay),
                max_retries: self.max_retries.unwrap_or(p.max_retries),
                ready_timeout: self.ready_timeout.map(Duration::from_secs).unwrap_or(p.ready_timeout),
                auth_timeout: self.auth_timeout.map(Duration::from_secs).unwrap_or(p.auth_timeout),
                completion_timeout: self
                    .completion_timeout
                    .map(Duration::from_secs)
                    .unwrap_or(p.completion_timeout),
                download_timeout: self
                    .download_timeout
                    .map(Duration::from_secs)
                    .unwrap_or(p.download_timeout),
                limit: self.limit.or(p.limit),
                ..p
            },
        }
    }
}

fn secs_f64(v: Option<f64>) -> Option<Duration> {
    v.filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
}

/// TOML 配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
    pub target_url: Option<String>,
    pub headless: Option<bool>,
    pub browser_debug_port: Option<u16>,
    pub debug_artifacts: Option<bool>,
    pub prompt: Option<String>,
    pub mode_name: Option<String>,
    pub min_delay_secs: Option<f64>,
    pub max_delay_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub base_backoff_secs: Option<f64>,
    pub poll_interval_ms: Option<u64>,
    pub heartbeat_secs: Option<u64>,
    pub ready_timeout_secs: Option<u64>,
    pub auth_timeout_secs: Option<u64>,
    pub completion_timeout_secs: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub limit: Option<usize>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| AppError::Config(format!("无法解析配置文件 {}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn apply(self, config: Config) -> Config {
        let p = config.pipeline;
        Config {
            input_dir: self.input_dir.unwrap_or(config.input_dir),
            output_dir: self.output_dir.unwrap_or(config.output_dir),
            profile_dir: self.profile_dir.unwrap_or(config.profile_dir),
            target_url: self.target_url.unwrap_or(config.target_url),
            headless: self.headless.unwrap_or(config.headless),
            browser_debug_port: self.browser_debug_port.or(config.browser_debug_port),
            debug_artifacts: self.debug_artifacts.unwrap_or(config.debug_artifacts),
            verbose_logging: config.verbose_logging,
            pipeline: PipelineConfig {
                prompt: self.prompt.unwrap_or(p.prompt),
                mode_name: self.mode_name.unwrap_or(p.mode_name),
                min_delay: secs_f64(self.min_delay_secs).unwrap_or(p.min_delay),
                max_delay: secs_f64(self.max_delay_secs).unwrap_or(p.max_delay),
                max_retries: self.max_retries.unwrap_or(p.max_retries),
                base_backoff: secs_f64(self.base_backoff_secs).unwrap_or(p.base_backoff),
                poll_interval: self
                    .poll_interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(p.poll_interval),
                heartbeat_interval: self
                    .heartbeat_secs
                    .map(Duration::from_secs)
                    .unwrap_or(p.heartbeat_interval),
                ready_timeout: self
                    .ready_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(p.ready_timeout),
                auth_timeout: self
                    .auth_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(p.auth_timeout),
                completion_timeout: self
                    .completion_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(p.completion_timeout),
                download_timeout: self
                    .download_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(p.download_timeout),
                limit: self.limit.or(p.limit),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_fixes_bad_values() {
        let p = PipelineConfig {
            max_retries: 0,
            min_delay: Duration::from_secs(9),
            max_delay: Duration::from_secs(2),
            poll_interval: Duration::ZERO,
            ..Default::default()
        }
        .normalized();

        assert_eq!(p.max_retries, 1);
        assert_eq!(p.min_delay, Duration::from_secs(2));
        assert_eq!(p.max_delay, Duration::from_secs(9));
        assert_eq!(p.poll_interval, Duration::from_millis(50));
    }

    #[test]
    fn test_file_config_overrides_defaults() {
        let file = FileConfig::parse(
            r#"
            input_dir = "photos"
            mode_name = "Fast"
            max_retries = 5
            min_delay_secs = 0.5
            completion_timeout_secs = 90
            limit = 10
            "#,
        )
        .unwrap();

        let config = file.apply(Config::default());
        assert_eq!(config.input_dir, PathBuf::from("photos"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.pipeline.mode_name, "Fast");
        assert_eq!(config.pipeline.max_retries, 5);
        assert_eq!(config.pipeline.min_delay, Duration::from_millis(500));
        assert_eq!(config.pipeline.completion_timeout, Duration::from_secs(90));
        assert_eq!(config.pipeline.limit, Some(10));
        assert_eq!(config.pipeline.auth_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::parse("max_retry = 3").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "batch-upscale",
            "-n",
            "2",
            "--output",
            "results",
            "--max-retries",
            "4",
            "--auth-timeout",
            "60",
            "--headless",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(config.pipeline.limit, Some(2));
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.pipeline.max_retries, 4);
        assert_eq!(config.pipeline.auth_timeout, Duration::from_secs(60));
        assert!(config.headless);
        assert_eq!(config.state_file(), PathBuf::from("results").join(STATE_FILE_NAME));
    }

    #[test]
    fn test_debug_dir_only_when_enabled() {
        let mut config = Config::default();
        assert!(config.debug_dir().is_none());
        config.debug_artifacts = true;
        assert_eq!(config.debug_dir(), Some(PathBuf::from("output").join("debug")));
    }
}
