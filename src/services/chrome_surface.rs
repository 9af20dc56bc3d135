//! 浏览器页面适配器 - 业务能力层
//!
//! 用 `Prober` + 候选定位列表实现 `Surface` 的每个阶段。
//! 只处理"一张图片"的页面交互，不关心重试和批次。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use futures::StreamExt;
use tokio::fs;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::browser::{self, BrowserSession};
use crate::config::Config;
use crate::error::{AppError, SurfaceError};
use crate::infrastructure::{JsExecutor, Prober};
use crate::services::locator::{self, Locator};
use crate::services::surface::{Surface, SurfaceProvider};
use crate::utils::logging::format_elapsed;

/// 点击发送、菜单等短交互的等待时间
const SHORT_TIMEOUT: Duration = Duration::from_secs(5);
/// 等待"处理中"标志出现的时间
const PROGRESS_TIMEOUT: Duration = Duration::from_secs(15);
/// 附件预览出现的等待时间
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(20);
/// 点击上传入口后等待文件对话框的时间
const CHOOSER_TIMEOUT: Duration = Duration::from_secs(10);
/// 上传入口可能先弹出菜单，先短暂等待对话框
const CHOOSER_FIRST_WAIT: Duration = Duration::from_secs(2);

type Result<T> = std::result::Result<T, SurfaceError>;

/// 浏览器适配器的配置
#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub target_url: String,
    pub profile_dir: PathBuf,
    pub headless: bool,
    pub debug_port: Option<u16>,
    /// 下载暂存目录
    pub download_dir: PathBuf,
    /// 调试现场保存目录，`None` 时不保存
    pub debug_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub ready_timeout: Duration,
    pub auth_timeout: Duration,
    pub completion_timeout: Duration,
    pub download_timeout: Duration,
}

impl ChromeSettings {
    pub fn from_config(config: &Config) -> Self {
        let p = &config.pipeline;
        Self {
            target_url: config.target_url.clone(),
            profile_dir: config.profile_dir.clone(),
            headless: config.headless,
            debug_port: config.browser_debug_port,
            download_dir: config.download_dir(),
            debug_dir: config.debug_dir(),
            poll_interval: p.poll_interval,
            heartbeat_interval: p.heartbeat_interval,
            ready_timeout: p.ready_timeout,
            auth_timeout: p.auth_timeout,
            completion_timeout: p.completion_timeout,
            download_timeout: p.download_timeout,
        }
    }
}

/// 打开浏览器会话的工厂
pub struct ChromeProvider {
    settings: ChromeSettings,
}

impl ChromeProvider {
    pub fn new(settings: ChromeSettings) -> Self {
        Self { settings }
    }
}

impl SurfaceProvider for ChromeProvider {
    type Session = ChromeSurface;

    async fn open(&mut self) -> std::result::Result<ChromeSurface, AppError> {
        let settings = self.settings.clone();
        let (session, page) = match settings.debug_port {
            Some(port) => browser::connect_to_browser(port, &settings.target_url).await?,
            None => {
                let session = browser::launch_browser(&settings.profile_dir, settings.headless).await?;
                let page = session.new_page(&settings.target_url).await?;
                (session, page)
            }
        };
        info!("✓ 浏览器会话已就绪: {}", settings.target_url);
        Ok(ChromeSurface::new(session, JsExecutor::new(page), settings))
    }
}

/// 文件提交方式，按顺序尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileMechanism {
    DirectInput,
    ShadowInput,
    FileChooser,
}

impl FileMechanism {
    const ORDER: [FileMechanism; 3] = [
        FileMechanism::DirectInput,
        FileMechanism::ShadowInput,
        FileMechanism::FileChooser,
    ];

    fn label(self) -> &'static str {
        match self {
            FileMechanism::DirectInput => "file-input",
            FileMechanism::ShadowInput => "shadow-file-input",
            FileMechanism::FileChooser => "file-chooser",
        }
    }
}

/// 基于 chromiumoxide 的页面会话
pub struct ChromeSurface {
    session: BrowserSession,
    executor: JsExecutor,
    prober: Prober,
    settings: ChromeSettings,
    /// 当前页面已经被上一次尝试修改过，需要重新打开
    dirty: bool,
}

impl ChromeSurface {
    pub fn new(session: BrowserSession, executor: JsExecutor, settings: ChromeSettings) -> Self {
        Self {
            session,
            executor,
            prober: Prober::new(settings.poll_interval),
            settings,
            dirty: false,
        }
    }

    /// 单轮检查，返回第一个可用的候选
    async fn find<'a>(&self, candidates: &'a [Locator]) -> Option<&'a Locator> {
        let executor = &self.executor;
        self.prober
            .find_any(candidates, move |l| executor.eval_flag(l.usable_js()))
            .await
    }

    /// 单轮检查，元素存在即可
    async fn find_present<'a>(&self, candidates: &'a [Locator]) -> Option<&'a Locator> {
        let executor = &self.executor;
        self.prober
            .find_any(candidates, move |l| executor.eval_flag(l.present_js()))
            .await
    }

    async fn wait_for<'a>(
        &self,
        capability: &'static str,
        candidates: &'a [Locator],
        limit: Duration,
    ) -> Result<&'a Locator> {
        let executor = &self.executor;
        let found = self
            .prober
            .await_any(candidates, limit, move |l| executor.eval_flag(l.usable_js()))
            .await
            .map_err(|_| SurfaceError::CapabilityTimeout {
                capability,
                timeout: limit,
            })?;
        debug!("能力 [{}] 命中候选: {}", capability, found);
        Ok(found)
    }

    async fn click(&self, capability: &'static str, locator: &Locator) -> Result<()> {
        if self.executor.eval_flag(locator.click_js()).await {
            Ok(())
        } else {
            Err(SurfaceError::NotFound { capability })
        }
    }

    fn on_target_page(&self, url: Option<&str>) -> bool {
        url.map(|u| u.trim_end_matches('/') == self.settings.target_url.trim_end_matches('/'))
            .unwrap_or(false)
    }

    /// 用一种方式挂载文件，返回是否执行了挂载
    async fn attach_with(&self, mechanism: FileMechanism, file: &str) -> Result<bool> {
        match mechanism {
            FileMechanism::DirectInput => self.attach_to_input(locator::FILE_INPUT, file).await,
            FileMechanism::ShadowInput => {
                self.attach_to_input(locator::SHADOW_FILE_INPUT, file).await
            }
            FileMechanism::FileChooser => self.attach_via_chooser(file).await,
        }
    }

    async fn attach_to_input(&self, candidates: &[Locator], file: &str) -> Result<bool> {
        let Some(input) = self.find_present(candidates).await else {
            return Ok(false);
        };
        let Some(object_id) = self.executor.resolve_object(input.lookup_js()).await? else {
            return Ok(false);
        };
        self.executor
            .set_files_on_object(object_id, vec![file.to_string()])
            .await?;
        debug!("已通过 {} 挂载文件", input);
        Ok(true)
    }

    async fn attach_via_chooser(&self, file: &str) -> Result<bool> {
        let page = self.executor.page();
        page.execute(SetInterceptFileChooserDialogParams::new(true))
            .await?;

        let result = self.fill_file_chooser(file).await;

        if let Err(e) = page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await
        {
            debug!("关闭文件对话框拦截失败: {}", e);
        }
        result
    }

    /// 点击下载并等待完成，返回暂存文件路径
    ///
    /// 文件以下载 guid 命名，不会和暂存目录里的其他文件冲突
    async fn download_to_staging(&self, staging: &Path) -> Result<PathBuf> {
        let page = self.executor.page();
        let mut behavior =
            SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::AllowAndName);
        behavior.download_path = Some(staging.to_string_lossy().to_string());
        page.execute(behavior).await?;

        let mut begins = page.event_listener::<EventDownloadWillBegin>().await?;
        let mut progress = page.event_listener::<EventDownloadProgress>().await?;

        let button = match self.find_present(locator::DOWNLOAD_BUTTON).await {
            Some(button) => button,
            None => {
                self.wait_for("download button", locator::DOWNLOAD_BUTTON, SHORT_TIMEOUT)
                    .await?
            }
        };
        self.click("download button", button).await?;

        let limit = self.settings.download_timeout;
        let deadline = Instant::now() + limit;
        let download_timeout = || SurfaceError::CapabilityTimeout {
            capability: "download",
            timeout: limit,
        };
        let closed = || SurfaceError::Driver("下载事件流已关闭".to_string());

        let begin = timeout_at(deadline, begins.next())
            .await
            .map_err(|_| download_timeout())?
            .ok_or_else(closed)?;
        debug!("开始下载: {} ({})", begin.suggested_filename, begin.guid);

        loop {
            let event = timeout_at(deadline, progress.next())
                .await
                .map_err(|_| download_timeout())?
                .ok_or_else(closed)?;
            if event.guid != begin.guid {
                continue;
            }
            match event.state {
                DownloadProgressState::Completed => break,
                DownloadProgressState::Canceled => {
                    return Err(SurfaceError::Driver("下载被取消".to_string()))
                }
                _ => {}
            }
        }

        Ok(staged_path(staging, &begin.guid))
    }

    /// 点击上传入口，拦截弹出的文件对话框并填入文件
    async fn fill_file_chooser(&self, file: &str) -> Result<bool> {
        let page = self.executor.page();
        let mut opened = page.event_listener::<EventFileChooserOpened>().await?;

        let Some(trigger) = self.find(locator::UPLOAD_TRIGGER).await else {
            return Ok(false);
        };
        self.click("upload trigger", trigger).await?;

        let event = match timeout(CHOOSER_FIRST_WAIT, opened.next()).await {
            Ok(event) => event,
            Err(_) => {
                // 入口弹出的是菜单
                if let Some(item) = self.find(locator::UPLOAD_MENU_ITEM).await {
                    self.click("upload menu item", item).await?;
                }
                timeout(CHOOSER_TIMEOUT, opened.next())
                    .await
                    .map_err(|_| SurfaceError::CapabilityTimeout {
                        capability: "file chooser",
                        timeout: CHOOSER_TIMEOUT,
                    })?
            }
        };
        let event =
            event.ok_or_else(|| SurfaceError::Driver("文件对话框事件流已关闭".to_string()))?;
        let node = event
            .backend_node_id
            .clone()
            .ok_or_else(|| SurfaceError::SubmissionRejected {
                what: "file",
                reason: "文件对话框没有关联的输入元素".to_string(),
            })?;

        let mut params = SetFileInputFilesParams::new(vec![file.to_string()]);
        params.backend_node_id = Some(node);
        page.execute(params).await?;
        Ok(true)
    }
}

impl Surface for ChromeSurface {
    async fn ensure_ready(&mut self) -> Result<()> {
        let url = self.executor.url().await?;
        if !self.dirty
            && self.on_target_page(url.as_deref())
            && self.find(locator::PROMPT_INPUT).await.is_some()
        {
            debug!("页面已就绪，无需重新打开");
            return Ok(());
        }

        info!("🌐 打开新的会话页面: {}", self.settings.target_url);
        self.executor.goto(&self.settings.target_url).await?;
        self.dirty = false;

        self.wait_for("prompt input", locator::PROMPT_INPUT, self.settings.ready_timeout)
            .await?;
        Ok(())
    }

    async fn ensure_authenticated(&mut self) -> Result<()> {
        let executor = &self.executor;
        let signed_in = self
            .prober
            .check_any(locator::SIGNED_IN, move |l| executor.eval_flag(l.usable_js()))
            .await;
        if signed_in {
            debug!("已检测到登录状态");
            return Ok(());
        }

        let limit = self.settings.auth_timeout;
        warn!(
            "🔐 未检测到登录状态，请在浏览器窗口中完成登录（最长等待 {}）",
            format_elapsed(limit)
        );

        self.prober
            .await_any_with_heartbeat(
                locator::SIGNED_IN,
                limit,
                self.settings.heartbeat_interval,
                |elapsed| info!("⏳ 仍在等待登录... 已等待 {}", format_elapsed(elapsed)),
                move |l| executor.eval_flag(l.usable_js()),
            )
            .await
            .map_err(|_| SurfaceError::CapabilityTimeout {
                capability: "signed-in indicator",
                timeout: limit,
            })?;

        info!("✓ 登录成功");
        Ok(())
    }

    async fn select_mode(&mut self, mode_name: &str) -> Result<()> {
        let confirm = [Locator::text(
            "button[aria-haspopup='menu'], bard-mode-switcher button",
            mode_name.to_string(),
        )];
        if self.find(&confirm).await.is_some() {
            debug!("模式已是 {}", mode_name);
            return Ok(());
        }

        let Some(menu) = self.find(locator::MODE_MENU).await else {
            debug!("未找到模式菜单，跳过模式选择");
            return Ok(());
        };
        self.click("mode menu", menu).await?;

        let option = [Locator::text(
            "[role='menuitem'], [role='menuitemradio'], [role='option']",
            mode_name.to_string(),
        )];
        let option = self.wait_for("mode option", &option, SHORT_TIMEOUT).await?;
        self.click("mode option", option).await?;
        self.dirty = true;

        self.wait_for("mode confirmation", &confirm, SHORT_TIMEOUT)
            .await?;
        info!("✓ 已选择模式: {}", mode_name);
        Ok(())
    }

    async fn submit_file(&mut self, path: &Path) -> Result<()> {
        let file = fs::canonicalize(path).await?.to_string_lossy().to_string();
        self.dirty = true;

        let this = &*self;
        let file = file.as_str();
        let result = first_accepted(
            move |mechanism| this.attach_with(mechanism, file),
            move || async move {
                this.wait_for("attachment preview", locator::ATTACHMENT_PREVIEW, ACCEPT_TIMEOUT)
                    .await
                    .is_ok()
            },
            move || async move { this.find(locator::ATTACHMENT_PREVIEW).await.is_some() },
        )
        .await;

        match result {
            Ok(mechanism) => {
                info!("📎 文件已上传 ({})", mechanism.label());
                Ok(())
            }
            Err(failures) => Err(SurfaceError::SubmissionRejected {
                what: "file",
                reason: failures.join("; "),
            }),
        }
    }

    async fn submit_prompt(&mut self, text: &str) -> Result<()> {
        let input = self
            .wait_for("prompt input", locator::PROMPT_INPUT, self.settings.ready_timeout)
            .await?;

        if !self.executor.eval_flag(input.focus_js()).await {
            return Err(SurfaceError::SubmissionRejected {
                what: "prompt",
                reason: "输入框无法获得焦点".to_string(),
            });
        }
        self.executor.insert_text(text).await?;
        self.dirty = true;

        let value: String = self.executor.eval_as(input.text_value_js()).await?;
        if value.trim().is_empty() {
            return Err(SurfaceError::SubmissionRejected {
                what: "prompt",
                reason: "输入框内容为空".to_string(),
            });
        }
        debug!("提示词已填写 ({} 字符)", value.chars().count());
        Ok(())
    }

    async fn send(&mut self) -> Result<()> {
        self.dirty = true;
        match self.wait_for("send button", locator::SEND_BUTTON, SHORT_TIMEOUT).await {
            Ok(button) => self.click("send button", button).await?,
            Err(_) => {
                warn!("⚠️ 未找到发送按钮，改用回车提交");
                let input = self
                    .find(locator::PROMPT_INPUT)
                    .await
                    .ok_or(SurfaceError::NotFound {
                        capability: "prompt input",
                    })?;
                self.executor.eval_flag(input.focus_js()).await;
                self.executor.press_enter().await?;
            }
        }
        info!("📤 已发送请求");
        Ok(())
    }

    async fn await_completion(&mut self) -> Result<()> {
        match self
            .wait_for("in-progress indicator", locator::IN_PROGRESS, PROGRESS_TIMEOUT)
            .await
        {
            Ok(_) => info!("⏳ 页面正在处理..."),
            Err(_) => debug!("未检测到处理中标志，直接等待结果"),
        }

        let limit = self.settings.completion_timeout;
        let executor = &self.executor;
        let found = self
            .prober
            .await_any_with_heartbeat(
                locator::RESULT_READY,
                limit,
                self.settings.heartbeat_interval,
                |elapsed| info!("⏳ 仍在处理中... 已等待 {}", format_elapsed(elapsed)),
                move |l| executor.eval_flag(l.usable_js()),
            )
            .await
            .map_err(|_| SurfaceError::CapabilityTimeout {
                capability: "result",
                timeout: limit,
            })?;

        info!("✓ 处理完成 ({})", found);
        Ok(())
    }

    async fn retrieve_result(&mut self, destination: &Path) -> Result<()> {
        let staging = &self.settings.download_dir;
        fs::create_dir_all(staging).await?;
        let staging = fs::canonicalize(staging).await?;

        // 上一次超时的下载可能稍后才落盘
        clear_staging(&staging).await?;

        let staged = match self.download_to_staging(&staging).await {
            Ok(staged) => staged,
            Err(e) => {
                if let Err(clean) = clear_staging(&staging).await {
                    debug!("清理下载暂存目录失败: {}", clean);
                }
                return Err(e);
            }
        };
        move_file(&staged, destination).await?;

        let size = fs::metadata(destination).await?.len();
        if size == 0 {
            fs::remove_file(destination).await?;
            return Err(SurfaceError::EmptyResult {
                path: destination.to_path_buf(),
            });
        }

        info!("💾 已保存结果: {} ({} 字节)", destination.display(), size);
        Ok(())
    }

    async fn capture_debug(&mut self, label: &str) -> Result<()> {
        let Some(dir) = self.settings.debug_dir.clone() else {
            return Ok(());
        };
        fs::create_dir_all(&dir).await?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let base = dir.join(format!("{}_{}", stamp, sanitize_label(label)));

        let png = self.executor.screenshot().await?;
        fs::write(base.with_extension("png"), png).await?;
        let html = self.executor.content().await?;
        fs::write(base.with_extension("html"), html).await?;

        info!("🪲 已保存调试现场: {}", base.display());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|e| SurfaceError::Driver(e.to_string()))
    }
}

/// 按顺序尝试各种挂载方式，返回第一个被页面接受的方式
///
/// 已挂载过文件时，换下一种方式前先检查一次附件是否已经出现，
/// 避免同一个文件被挂载两次
async fn first_accepted<A, AF, W, WF, C, CF>(
    mut attach: A,
    mut await_accept: W,
    mut already_accepted: C,
) -> std::result::Result<FileMechanism, Vec<String>>
where
    A: FnMut(FileMechanism) -> AF,
    AF: Future<Output = Result<bool>>,
    W: FnMut() -> WF,
    WF: Future<Output = bool>,
    C: FnMut() -> CF,
    CF: Future<Output = bool>,
{
    let mut failures = Vec::new();
    let mut attached: Option<FileMechanism> = None;

    for mechanism in FileMechanism::ORDER {
        if let Some(previous) = attached {
            if already_accepted().await {
                return Ok(previous);
            }
        }
        match attach(mechanism).await {
            Ok(true) => {
                if await_accept().await {
                    return Ok(mechanism);
                }
                attached = Some(mechanism);
                failures.push(format!("{}: 页面未显示附件", mechanism.label()));
            }
            Ok(false) => failures.push(format!("{}: 不可用", mechanism.label())),
            Err(e) => failures.push(format!("{}: {}", mechanism.label(), e)),
        }
    }

    if let Some(previous) = attached {
        if already_accepted().await {
            return Ok(previous);
        }
    }
    Err(failures)
}

/// `AllowAndName` 模式下文件以 guid 命名
fn staged_path(staging: &Path, guid: &str) -> PathBuf {
    staging.join(guid)
}

/// 删除暂存目录里的残留文件
async fn clear_staging(staging: &Path) -> Result<()> {
    let mut entries = fs::read_dir(staging).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// 同一文件系统内直接重命名，否则复制后删除
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_err() {
        fs::copy(from, to).await?;
        fs::remove_file(from).await?;
    }
    Ok(())
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("a.jpg submit_file"), "a_jpg_submit_file");
        assert_eq!(sanitize_label("图片-1"), "图片-1");
    }

    #[test]
    fn test_file_mechanism_order() {
        let labels: Vec<&str> = FileMechanism::ORDER.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["file-input", "shadow-file-input", "file-chooser"]);
    }

    #[tokio::test]
    async fn test_move_file() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("staged.png");
        let to = dir.path().join("a_upscaled.png");
        std::fs::write(&from, b"png").unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_clear_staging_removes_leftover_downloads() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image.png"), b"stale").unwrap();
        std::fs::write(dir.path().join("3f2a-guid"), b"stale").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        clear_staging(dir.path()).await.unwrap();

        let left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(left, vec!["keep"]);
    }

    #[test]
    fn test_staged_path_uses_guid() {
        let staging = Path::new("/tmp/.downloads");
        // 建议文件名和残留文件重名时，guid 仍然唯一
        assert_eq!(
            staged_path(staging, "8d1c-44e0"),
            PathBuf::from("/tmp/.downloads/8d1c-44e0")
        );
    }

    #[tokio::test]
    async fn test_late_preview_stops_next_mechanism() {
        let attaches = Cell::new(0);
        let result = first_accepted(
            |_| {
                attaches.set(attaches.get() + 1);
                async { Ok::<_, SurfaceError>(true) }
            },
            || async { false },
            || async { true },
        )
        .await;

        assert_eq!(result, Ok(FileMechanism::DirectInput));
        assert_eq!(attaches.get(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_mechanism_falls_through() {
        let tried = RefCell::new(Vec::new());
        let result = first_accepted(
            |mechanism| {
                tried.borrow_mut().push(mechanism);
                async move { Ok::<_, SurfaceError>(mechanism == FileMechanism::ShadowInput) }
            },
            || async { true },
            || async { false },
        )
        .await;

        assert_eq!(result, Ok(FileMechanism::ShadowInput));
        assert_eq!(
            *tried.borrow(),
            vec![FileMechanism::DirectInput, FileMechanism::ShadowInput]
        );
    }

    #[tokio::test]
    async fn test_all_mechanisms_rejected() {
        let checks = Cell::new(0);
        let result = first_accepted(
            |mechanism| async move {
                match mechanism {
                    FileMechanism::DirectInput => Ok(false),
                    FileMechanism::ShadowInput => Err(SurfaceError::Driver("detached".to_string())),
                    FileMechanism::FileChooser => Ok(true),
                }
            },
            || async { false },
            || {
                checks.set(checks.get() + 1);
                async { false }
            },
        )
        .await;

        let failures = result.unwrap_err();
        assert_eq!(failures.len(), 3);
        assert!(failures[0].starts_with("file-input"));
        assert!(failures[1].contains("detached"));
        assert!(failures[2].starts_with("file-chooser"));
        // 只有文件选择器挂载过文件，最后再确认一次
        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.debug_artifacts = true;
        config.pipeline.completion_timeout = Duration::from_secs(42);

        let settings = ChromeSettings::from_config(&config);
        assert_eq!(settings.completion_timeout, Duration::from_secs(42));
        assert_eq!(settings.download_dir, config.download_dir());
        assert!(settings.debug_dir.is_some());
    }
}
