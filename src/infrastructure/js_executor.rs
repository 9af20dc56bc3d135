//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 发送 CDP 命令"的能力

use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, RemoteObjectId};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::SurfaceError;

type Result<T> = std::result::Result<T, SurfaceError>;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 和少量输入/文件能力
/// - 不认识页面上的具体元素
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于事件监听等操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        result
            .into_value()
            .map_err(|e| SurfaceError::Driver(format!("脚本返回值解析失败: {}", e)))
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        serde_json::from_value(json_value)
            .map_err(|e| SurfaceError::Driver(format!("脚本返回值解析失败: {}", e)))
    }

    /// 执行返回布尔值的探测脚本，任何错误都视为 false
    pub async fn eval_flag(&self, js_code: impl Into<String>) -> bool {
        match self.eval(js_code).await {
            Ok(JsonValue::Bool(flag)) => flag,
            Ok(_) => false,
            Err(e) => {
                debug!("探测脚本执行失败: {}", e);
                false
            }
        }
    }

    /// 执行返回 DOM 元素的脚本，拿到远程对象 ID（用于设置文件）
    pub async fn resolve_object(&self, js_code: impl Into<String>) -> Result<Option<RemoteObjectId>> {
        let mut params = EvaluateParams::new(js_code.into());
        params.return_by_value = Some(false);
        let response = self.page.execute(params).await?;
        Ok(response.result.result.object_id.clone())
    }

    /// 通过远程对象把本地文件挂到 `<input type=file>` 上
    pub async fn set_files_on_object(&self, object_id: RemoteObjectId, files: Vec<String>) -> Result<()> {
        let mut params = SetFileInputFilesParams::new(files);
        params.object_id = Some(object_id);
        self.page.execute(params).await?;
        Ok(())
    }

    /// 在当前焦点处插入文本
    pub async fn insert_text(&self, text: &str) -> Result<()> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    /// 发送一次回车按键
    pub async fn press_enter(&self) -> Result<()> {
        let events = [
            (DispatchKeyEventType::KeyDown, Some("\r")),
            (DispatchKeyEventType::KeyUp, None),
        ];
        for (kind, text) in events {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(kind)
                .key("Enter")
                .code("Enter")
                .windows_virtual_key_code(13)
                .native_virtual_key_code(13);
            if let Some(text) = text {
                builder = builder.text(text);
            }
            let params = builder.build().map_err(SurfaceError::Driver)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    /// 当前页面地址
    pub async fn url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    /// 导航到指定地址
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    /// 整页截图
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page.screenshot(params).await?)
    }

    /// 页面 HTML
    pub async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }
}
