//! 元素定位候选
//!
//! 每个能力对应一张按优先级排列的 `Locator` 列表。页面改版时只需要在
//! 这里增删候选，调用代码不用改动。

use std::borrow::Cow;
use std::fmt::Display;

/// 一种定位页面元素的方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS 选择器，取第一个匹配
    Css(&'static str),
    /// CSS 选择器，取最后一个匹配（最新生成的结果）
    LastCss(&'static str),
    /// CSS 选择器，同时搜索所有开放的 shadow root
    Deep(&'static str),
    /// `tag` 元素中可见文本包含 `text` 的第一个（忽略大小写）
    Text {
        tag: &'static str,
        text: Cow<'static, str>,
    },
}

/// 在 document 及所有 shadow root 中查找
const DEEP_QUERY_FN: &str = r#"function deepQuery(root, sel) {
    const hit = root.querySelector(sel);
    if (hit) return hit;
    for (const el of root.querySelectorAll('*')) {
        if (el.shadowRoot) {
            const found = deepQuery(el.shadowRoot, sel);
            if (found) return found;
        }
    }
    return null;
}"#;

impl Locator {
    pub fn text(tag: &'static str, text: impl Into<Cow<'static, str>>) -> Self {
        Locator::Text {
            tag,
            text: text.into(),
        }
    }

    /// 返回一个求值结果为元素或 null 的 JS 表达式
    pub fn lookup_js(&self) -> String {
        match self {
            Locator::Css(sel) => format!("document.querySelector({})", js_str(sel)),
            Locator::LastCss(sel) => format!(
                "(() => {{ const all = document.querySelectorAll({}); return all.length ? all[all.length - 1] : null; }})()",
                js_str(sel)
            ),
            Locator::Deep(sel) => format!("({})(document, {})", DEEP_QUERY_FN, js_str(sel)),
            Locator::Text { tag, text } => format!(
                "Array.from(document.querySelectorAll({})).find(e => ((e.innerText || e.textContent || '') + ' ' + (e.getAttribute('aria-label') || '')).toLowerCase().includes({}.toLowerCase())) || null",
                js_str(tag),
                js_str(text)
            ),
        }
    }

    /// 元素存在、有尺寸且未禁用
    pub fn usable_js(&self) -> String {
        format!(
            r#"(() => {{
    try {{
        const el = {};
        if (!el) return false;
        if (el.disabled || el.getAttribute('aria-disabled') === 'true') return false;
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    }} catch (e) {{
        return false;
    }}
}})()"#,
            self.lookup_js()
        )
    }

    /// 元素存在即可（悬停才显示的按钮用这个）
    pub fn present_js(&self) -> String {
        format!(
            "(() => {{ try {{ return !!({}); }} catch (e) {{ return false; }} }})()",
            self.lookup_js()
        )
    }

    pub fn click_js(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return false; el.scrollIntoView({{block: 'center'}}); el.click(); return true; }})()",
            self.lookup_js()
        )
    }

    pub fn focus_js(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return false; el.click(); el.focus(); return document.activeElement === el || el.contains(document.activeElement); }})()",
            self.lookup_js()
        )
    }

    /// 输入框当前的文本（textarea 取 value，可编辑 div 取 innerText）
    pub fn text_value_js(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) return ''; return ('value' in el && typeof el.value === 'string') ? el.value : (el.innerText || ''); }})()",
            self.lookup_js()
        )
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(sel) => write!(f, "css({})", sel),
            Locator::LastCss(sel) => write!(f, "last({})", sel),
            Locator::Deep(sel) => write!(f, "deep({})", sel),
            Locator::Text { tag, text } => write!(f, "text({} ~ \"{}\")", tag, text),
        }
    }
}

fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// 提示词输入框
pub const PROMPT_INPUT: &[Locator] = &[
    Locator::Css("rich-textarea div.ql-editor[contenteditable='true']"),
    Locator::Css("div[contenteditable='true'][role='textbox']"),
    Locator::Css("textarea[aria-label*='prompt' i]"),
    Locator::Deep("div[contenteditable='true']"),
    Locator::Css("textarea"),
];

/// 已登录标志
pub const SIGNED_IN: &[Locator] = &[
    Locator::Css("a[aria-label*='Google Account' i]"),
    Locator::Css("button[aria-label*='account' i] img"),
    Locator::Css("img[alt*='profile' i]"),
    Locator::Css("[data-test-id='user-avatar']"),
];

/// 模式菜单按钮
pub const MODE_MENU: &[Locator] = &[
    Locator::Css("button[data-test-id='bard-mode-menu-button']"),
    Locator::Css("bard-mode-switcher button"),
    Locator::Css("button[aria-haspopup='menu'][aria-label*='mode' i]"),
    Locator::Css("button[aria-haspopup='menu'][aria-label*='model' i]"),
];

/// 上传入口（触发文件选择对话框）
pub const UPLOAD_TRIGGER: &[Locator] = &[
    Locator::Css("button[aria-label*='upload' i]"),
    Locator::Css("button[aria-label*='add files' i]"),
    Locator::Css("uploader button"),
    Locator::Text {
        tag: "button, [role='menuitem']",
        text: Cow::Borrowed("upload"),
    },
];

/// 上传菜单中的"上传文件"项（部分页面上传入口是一个二级菜单）
pub const UPLOAD_MENU_ITEM: &[Locator] = &[
    Locator::Css("[data-test-id='local-image-file-uploader-button']"),
    Locator::Css("button[data-test-id*='file-uploader' i]"),
    Locator::Text {
        tag: "[role='menuitem'], button",
        text: Cow::Borrowed("upload file"),
    },
];

/// 直接可用的文件输入框
pub const FILE_INPUT: &[Locator] = &[
    Locator::Css("input[type='file'][accept*='image']"),
    Locator::Css("input[type='file']"),
];

/// shadow root 中的文件输入框
pub const SHADOW_FILE_INPUT: &[Locator] = &[Locator::Deep("input[type='file']")];

/// 附件预览（表示文件已被接受）
pub const ATTACHMENT_PREVIEW: &[Locator] = &[
    Locator::Css("[data-test-id='image-preview']"),
    Locator::Css("uploader-file-preview"),
    Locator::Css("[class*='file-preview'] img"),
    Locator::Deep("img[src^='blob:']"),
];

/// 发送按钮
pub const SEND_BUTTON: &[Locator] = &[
    Locator::Css("button[aria-label*='send message' i]"),
    Locator::Css("button.send-button"),
    Locator::Css("button[aria-label*='send' i]"),
    Locator::Css("form button[type='submit']"),
];

/// 处理中标志
pub const IN_PROGRESS: &[Locator] = &[
    Locator::Css("button[aria-label*='stop' i]"),
    Locator::Css("[role='progressbar']"),
    Locator::Css("mat-progress-spinner"),
    Locator::Css(".loading-indicator"),
];

/// 结果可用标志
pub const RESULT_READY: &[Locator] = &[
    Locator::LastCss("download-generated-image-button button"),
    Locator::LastCss("button[aria-label*='download' i]"),
    Locator::LastCss("generated-image img"),
    Locator::LastCss("single-image img.image.loaded"),
];

/// 下载按钮
pub const DOWNLOAD_BUTTON: &[Locator] = &[
    Locator::LastCss("button[aria-label*='download full size' i]"),
    Locator::LastCss("download-generated-image-button button"),
    Locator::LastCss("button[aria-label*='download' i]"),
    Locator::Deep("button[aria-label*='download' i]"),
];
