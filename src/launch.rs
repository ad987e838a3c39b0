// ============================================================
// launch.rs — 外部工具启动
// ============================================================
// 资源工具都是对参数顺序敏感的命令行程序，
// 这里只负责按给定顺序传参、阻塞等待退出并带回退出码；
// 退出码的含义由调用方（各动作的具体步骤）解释，
// 这样每个步骤可以给出自己的错误描述。
// ============================================================

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// 外部进程启动接口。
///
/// 返回进程退出码；只有在进程无法启动（工具不存在等）
/// 时才返回 Err。测试中用记录参数的假实现替换。
pub trait Launcher {
    fn launch(&self, exe: &Path, args: &[String]) -> Result<i32>;
}

/// 生产实现：std::process::Command，阻塞等待退出。
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, exe: &Path, args: &[String]) -> Result<i32> {
        let mut cmd = Command::new(exe);
        cmd.args(args);

        // Windows 下不弹出控制台窗口
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(crate::config::CREATE_NO_WINDOW);
        }

        let status = cmd
            .status()
            .with_context(|| format!("启动外部工具失败: {}", exe.display()))?;

        // 被信号终止等场景没有退出码，按 -1 处理
        Ok(status.code().unwrap_or(-1))
    }
}
