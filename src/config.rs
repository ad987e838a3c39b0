// ============================================================
// config.rs — 构建会话配置 + 固定常量
// ============================================================
// 集中管理所有动作共享的配置和固定文件名。
// BuildConfig 由编排器在会话开始时加载一次，按引用传给各动作；
// 单个动作自己的选项见各动作模块的 *Options 结构体。
// ============================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── 临时文件（相对于动作的工作目录） ──

/// 提取出的版本资源文本
pub const TMP_VERSION_RC: &str = "tmpversioninfo.rc";
/// 编译后的版本资源
pub const TMP_VERSION_RES: &str = "tmpversioninfo.res";
/// 资源提取步骤的工具日志
pub const VERSION_EXTRACT_LOG: &str = "versionExtract.log";
/// 资源写回步骤的工具日志
pub const VERSION_OVERWRITE_LOG: &str = "versionOverwrite.log";

// ── 超时 ──

/// 拉取 CI 任务元数据的超时（小文件）
pub const HTTP_TIMEOUT_SECS: u64 = 30;
/// 构建产物下载超时（客户端二进制可能上百 MB）
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

// ── Windows 进程创建标志 ──

/// 创建子进程时不弹出控制台窗口
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// 构建会话的共享配置。
///
/// 这里的字段对所有动作可见；动作私有的选项不放在这里。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// 工程根目录（.uproject 所在目录），
    /// 工具路径和产物落盘目录都以此为基准解析
    pub project_root: PathBuf,

    /// 打包输出目录（不含 _client / _server 后缀，
    /// 后缀由打包时的构建类型决定）
    pub builds_path: PathBuf,

    /// 配置的版本号：1~4 段数字，点分隔，如 "1.2" 或 "1.2.3.4"
    pub version_str: String,

    /// 是否为无人值守构建（CI 上为 true）。
    /// 交互模式下致命错误会等待操作员确认后再退出。
    #[serde(default)]
    pub automated: bool,
}

impl BuildConfig {
    /// 从 JSON 文件加载构建配置。
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("读取构建配置失败: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("解析构建配置失败: {}", path.display()))
    }
}
