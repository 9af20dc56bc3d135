use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};

/// Chromium 在配置目录中创建的进程锁
const SINGLETON_LOCK: &str = "SingletonLock";
const WINDOWS_LOCK: &str = "lockfile";

/// 一个浏览器会话
///
/// 自行启动的浏览器在 `close` 时一并关闭；通过调试端口连接的浏览器只断开
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    owned: bool,
}

impl BrowserSession {
    /// 打开一个新页面并导航
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let page = self.browser.new_page(url).await.map_err(|e| {
            error!("创建页面失败: {}", e);
            AppError::Browser(format!("创建页面失败: {}", e))
        })?;
        debug!("已打开页面: {}", url);
        Ok(page)
    }

    pub async fn close(mut self) -> Result<()> {
        if self.owned {
            info!("🧹 正在关闭浏览器...");
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                warn!("等待浏览器退出失败: {}", e);
            }
        }
        self.handler.abort();
        Ok(())
    }
}

/// 使用持久化配置目录启动浏览器
pub async fn launch_browser(profile_dir: &Path, headless: bool) -> Result<BrowserSession> {
    info!("🚀 启动浏览器，配置目录: {}", profile_dir.display());

    check_profile_lock(profile_dir)?;
    std::fs::create_dir_all(profile_dir)?;

    let builder = BrowserConfig::builder()
        .user_data_dir(profile_dir)
        .viewport(None)
        .window_size(1400, 1000)
        .args(vec![
            "--no-first-run",
            "--no-default-browser-check",
            "--disable-blink-features=AutomationControlled",
        ]);
    let builder = if headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        AppError::Browser(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        let msg = e.to_string();
        error!("启动浏览器失败: {}", msg);
        if mentions_singleton(&msg) {
            AppError::SessionLockConflict {
                profile: profile_dir.to_path_buf(),
                holder: msg,
            }
        } else {
            AppError::Browser(format!("启动浏览器失败: {}", msg))
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    Ok(BrowserSession {
        browser,
        handler,
        owned: true,
    })
}

/// 连接到已打开的浏览器，优先复用地址匹配的页面
pub async fn connect_to_browser(port: u16, target_url: &str) -> Result<(BrowserSession, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        AppError::Browser(format!("无法连接到浏览器 (端口: {}): {}", port, e))
    })?;
    debug!("浏览器连接成功");

    let handler = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(Duration::from_millis(300)).await;

    let session = BrowserSession {
        browser,
        handler,
        owned: false,
    };

    let pages = session
        .browser
        .pages()
        .await
        .map_err(|e| AppError::Browser(format!("获取页面列表失败: {}", e)))?;
    debug!("获取到 {} 个页面", pages.len());

    let host = url_prefix(target_url);
    for p in pages {
        if let Ok(Some(url)) = p.url().await {
            if url.starts_with(host) {
                info!("✓ 找到目标页面: {}", url);
                return Ok((session, p));
            }
        }
    }

    debug!("未找到匹配的页面，将创建新页面");
    let page = session.new_page(target_url).await?;
    Ok((session, page))
}

/// 检查配置目录是否被另一个存活的浏览器占用
///
/// 持有进程已退出的陈旧锁会被删除；无法判断时保留锁，
/// 交给浏览器启动时自己报告冲突
pub fn check_profile_lock(profile_dir: &Path) -> Result<()> {
    let lock = profile_dir.join(SINGLETON_LOCK);
    if lock.symlink_metadata().is_ok() {
        let holder = std::fs::read_link(&lock)
            .map(|target| target.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        match lock_status(&holder, local_hostname().as_deref()) {
            LockStatus::Live => {
                return Err(AppError::SessionLockConflict {
                    profile: profile_dir.to_path_buf(),
                    holder,
                });
            }
            LockStatus::Stale => {
                warn!("⚠️ 发现陈旧的浏览器锁 ({})，已删除", holder);
                std::fs::remove_file(&lock)?;
            }
            LockStatus::Unknown => {
                debug!("无法确认浏览器锁 ({}) 是否有效，交给浏览器判断", holder);
            }
        }
    }

    // Windows 下锁文件被占用时无法删除
    let win_lock = profile_dir.join(WINDOWS_LOCK);
    if win_lock.exists() && std::fs::remove_file(&win_lock).is_err() {
        return Err(AppError::SessionLockConflict {
            profile: profile_dir.to_path_buf(),
            holder: WINDOWS_LOCK.to_string(),
        });
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockStatus {
    Live,
    Stale,
    Unknown,
}

/// 锁内容形如 `hostname-pid`，主机名本身可能带 `-`
///
/// 只有本机的锁才能通过 `/proc` 判断进程是否存活
fn lock_status(holder: &str, local_host: Option<&str>) -> LockStatus {
    let Some((host, pid)) = holder.rsplit_once('-') else {
        return LockStatus::Unknown;
    };
    let Ok(pid) = pid.parse::<u32>() else {
        return LockStatus::Unknown;
    };
    if !cfg!(target_os = "linux") || local_host != Some(host) {
        return LockStatus::Unknown;
    }
    if Path::new("/proc").join(pid.to_string()).exists() {
        LockStatus::Live
    } else {
        LockStatus::Stale
    }
}

fn local_hostname() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn mentions_singleton(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("singletonlock") || msg.contains("processsingleton") || msg.contains("profile in use")
}

/// `https://host/path` → `https://host`
fn url_prefix(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}
