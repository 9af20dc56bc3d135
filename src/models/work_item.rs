use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

/// 支持的图片扩展名（比较时忽略大小写）
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

/// 输出文件名后缀
const OUTPUT_SUFFIX: &str = "_upscaled";

/// 一张待处理的源图片
///
/// `id` 是绝对路径字符串，作为进度记录中的稳定键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub path: PathBuf,
}

impl WorkItem {
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: path.to_string_lossy().to_string(),
            path,
        }
    }

    /// 文件名（用于日志）
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// 扫描输入目录，返回按路径字典序排列的图片列表
///
/// 只看目录第一层，不递归
pub async fn discover_work_items(folder: &Path) -> Result<Vec<WorkItem>> {
    if !folder.is_dir() {
        anyhow::bail!("输入目录不存在: {}", folder.display());
    }

    let folder = fs::canonicalize(folder)
        .await
        .with_context(|| format!("无法解析输入目录: {}", folder.display()))?;

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_supported_image(&path) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths.into_iter().map(WorkItem::new).collect())
}

/// 为一张图片分配输出路径
///
/// `<basename>_upscaled<ext>`，若已存在则依次尝试 `_2`、`_3` …，
/// 返回第一个不存在的路径，保证不会覆盖已有文件
pub fn assign_output(output_dir: &Path, item: &WorkItem) -> PathBuf {
    let stem = item
        .path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let ext = item
        .path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let first = output_dir.join(format!("{stem}{OUTPUT_SUFFIX}{ext}"));
    if !first.exists() {
        return first;
    }

    (2u64..)
        .map(|n| output_dir.join(format!("{stem}{OUTPUT_SUFFIX}_{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_supported_extension_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a.JPG")));
        assert!(is_supported_image(Path::new("b.Png")));
        assert!(is_supported_image(Path::new("c.webp")));
        assert!(!is_supported_image(Path::new("d.gif")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["c.png", "a.JPG", "b.jpeg", "readme.txt", "z.gif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let items = discover_work_items(dir.path()).await.unwrap();
        let names: Vec<String> = items.iter().map(|i| i.file_name()).collect();

        assert_eq!(names, vec!["a.JPG", "b.jpeg", "c.png"]);
        assert!(items.iter().all(|i| i.path.is_absolute()));
        assert_eq!(items[0].id, items[0].path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_discover_missing_folder_fails() {
        let dir = tempdir().unwrap();
        let result = discover_work_items(&dir.path().join("missing")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_assign_output_never_overwrites() {
        let dir = tempdir().unwrap();
        let item = WorkItem::new(PathBuf::from("/photos/a.jpg"));

        let first = assign_output(dir.path(), &item);
        assert_eq!(first, dir.path().join("a_upscaled.jpg"));
        std::fs::write(&first, b"1").unwrap();

        let second = assign_output(dir.path(), &item);
        assert_eq!(second, dir.path().join("a_upscaled_2.jpg"));
        std::fs::write(&second, b"2").unwrap();

        let third = assign_output(dir.path(), &item);
        assert_eq!(third, dir.path().join("a_upscaled_3.jpg"));
    }

    #[test]
    fn test_assign_output_fills_first_gap() {
        let dir = tempdir().unwrap();
        let item = WorkItem::new(PathBuf::from("/photos/a.jpg"));
        std::fs::write(dir.path().join("a_upscaled.jpg"), b"1").unwrap();
        std::fs::write(dir.path().join("a_upscaled_3.jpg"), b"3").unwrap();

        assert_eq!(
            assign_output(dir.path(), &item),
            dir.path().join("a_upscaled_2.jpg")
        );
    }

    #[test]
    fn test_assign_output_without_extension() {
        let dir = tempdir().unwrap();
        let item = WorkItem::new(PathBuf::from("/photos/raw"));
        assert_eq!(assign_output(dir.path(), &item), dir.path().join("raw_upscaled"));
    }
}
