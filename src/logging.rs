// ============================================================
// logging.rs — 文件日志 + 致命退出
// ============================================================
// 将动作的过程信息写入系统临时目录下的日志文件，
// 构建失败时编排器可直接读取全文展示给操作员。
//
// 日志文件路径: %TEMP%/uebuild-actions.log
//
// 另外提供 fatal_exit：用于"继续执行必然产出错版二进制"
// 的场景，直接终止整个构建进程，不走普通的动作失败路径。
// ============================================================

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// 全局日志文件路径（初始化后不可变）
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// 初始化日志文件。
///
/// 在系统临时目录创建（或清空）日志文件。
/// 应在编排器启动时调用一次；不调用则写入静默丢弃。
pub fn init() {
    let path = std::env::temp_dir().join("uebuild-actions.log");
    // 清空旧日志
    let _ = fs::write(&path, "");
    LOG_PATH.set(path).ok();
}

/// 获取日志文件路径。
pub fn path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// 向日志文件追加一行。
pub fn write(msg: impl std::fmt::Display) {
    if let Some(path) = LOG_PATH.get() {
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = f.write_all(format!("{}\r\n", msg).as_bytes());
        }
    }
}

/// 读取完整日志内容。
pub fn read_all() -> String {
    match LOG_PATH.get() {
        Some(path) => fs::read_to_string(path).unwrap_or_default(),
        None => String::new(),
    }
}

/// 终止整个构建进程。
///
/// 区别于普通的动作失败（交由编排器决定去留），这里用于
/// 继续执行必然产出坏产物的场合。`pause` 为 true 时
/// （交互模式）等待操作员按回车确认后再退出，
/// 避免控制台窗口一闪而过看不到原因。
pub fn fatal_exit(msg: &str, pause: bool) -> ! {
    write(format!("[致命] {}", msg));
    eprintln!("[致命] {}", msg);
    if pause {
        eprintln!("按回车键退出...");
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    }
    std::process::exit(1)
}
