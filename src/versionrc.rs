// ============================================================
// versionrc.rs — 版本资源改写动作
// ============================================================
// 把版本号 / 指纹 / 描述等元数据改写进打包产物 exe 的
// Windows 版本资源块（VERSIONINFO），主 exe 和快捷副本各一份。
//
// 完整流程（严格顺序，任何一步失败立即中止，不重试）：
//   0. 清掉上次运行残留的临时文件
//   1. 按构建类型推导目标 exe 和快捷副本路径
//   2. 资源工具 extract 模式：把 VERSIONINFO 提取成 .rc 文本
//   3. 版本号补齐到 4 段数字
//   4. 版本编辑工具就地改写 .rc 的各个字段
//   5. 定位 .rc 里的 PRODUCTVERSION / ProductVersion 两处值
//      （找不到或出现多次 → 致命中止，继续会产出错版二进制）
//   6. 用配置的版本号替换两处值并写回
//   7~8. 清掉旧 .res，调用 rc 编译器产出新 .res
//   9~10. 资源工具 addoverwrite 模式把 .res 写回两个 exe
//
// 临时文件落在 work_dir 下，固定文件名（见 config.rs），
// 同一工作目录内并发运行同一动作不安全，由编排器串行化。
// ============================================================

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::action::{Action, ArgDoc};
use crate::config::{self, BuildConfig};
use crate::launch::{Launcher, ProcessLauncher};
use crate::logging;
use crate::meta::{BuildMeta, BuildType};

/// VersionRc 识别的全部选项。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionRcOptions {
    /// 版本编辑工具路径（相对于工程根目录）
    #[serde(default)]
    pub resource_editor_path: PathBuf,

    /// rc 编译器路径（相对于工程根目录）
    #[serde(default)]
    pub resource_compiler_path: PathBuf,

    /// 资源提取 / 写回工具路径（相对于工程根目录）
    #[serde(default)]
    pub resource_hacker_path: PathBuf,

    /// 项目指纹，写入版本资源供托盘应用校验
    #[serde(default)]
    pub project_fingerprint: String,

    /// SDK 版本号
    #[serde(default)]
    pub sdk_version: String,

    /// 项目名（也是产物 exe 的基础名）
    #[serde(default)]
    pub project_name: String,

    /// 项目描述（FileDescription 字段）
    #[serde(default)]
    pub project_description: String,

    /// 公司名（CompanyName 字段）
    #[serde(default)]
    pub company_name: String,

    /// 构建类型覆盖：不配置时取打包步骤写进元数据的值
    #[serde(default)]
    pub build_type: Option<BuildType>,

    /// 临时文件的工作目录
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

/// 版本资源改写动作。
pub struct VersionRc {
    config: BuildConfig,
    opts: VersionRcOptions,
    launcher: Box<dyn Launcher>,
}

static ARG_DOCS: &[ArgDoc] = &[
    ArgDoc {
        name: "resource_editor_path",
        doc: "版本编辑工具路径（相对于工程根目录）",
    },
    ArgDoc {
        name: "resource_compiler_path",
        doc: "rc 编译器路径（相对于工程根目录）",
    },
    ArgDoc {
        name: "resource_hacker_path",
        doc: "资源提取/写回工具路径（相对于工程根目录）",
    },
    ArgDoc {
        name: "project_fingerprint",
        doc: "项目指纹，写入版本资源供托盘应用校验",
    },
    ArgDoc {
        name: "sdk_version",
        doc: "SDK 版本号",
    },
    ArgDoc {
        name: "project_name",
        doc: "项目名，同时决定产物 exe 的基础名",
    },
    ArgDoc {
        name: "project_description",
        doc: "项目描述（FileDescription 字段）",
    },
    ArgDoc {
        name: "company_name",
        doc: "公司名（CompanyName 字段）",
    },
    ArgDoc {
        name: "build_type",
        doc: "构建类型覆盖（client/server/standalone），默认取打包步骤写入元数据的值",
    },
    ArgDoc {
        name: "work_dir",
        doc: "临时 .rc / .res / 工具日志的落盘目录，默认当前目录",
    },
];

impl VersionRc {
    pub fn new(config: BuildConfig, opts: VersionRcOptions) -> Self {
        Self::with_launcher(config, opts, Box::new(ProcessLauncher))
    }

    /// 注入启动器的构造入口（测试用假实现替换真实进程）。
    pub fn with_launcher(
        config: BuildConfig,
        opts: VersionRcOptions,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            config,
            opts,
            launcher,
        }
    }

    /// 按构建类型推导目标 exe 和快捷副本的路径。
    ///
    /// 目标:     <输出目录><后缀>/<平台目录>/<项目名>/Binaries/Win64/<exe 名>.exe
    /// 快捷副本: <输出目录><后缀>/<平台目录>/<exe 名>.exe
    fn target_paths(&self, build_type: BuildType) -> (PathBuf, PathBuf) {
        // 打包输出目录带构建类型后缀，如 Builds_client
        let mut builds = self.config.builds_path.as_os_str().to_os_string();
        builds.push(build_type.builds_path_suffix());
        let builds = PathBuf::from(builds);

        let folder = build_type.windows_folder();
        let exe_name = format!("{}{}.exe", self.opts.project_name, build_type.exe_suffix());

        let exe_path = builds
            .join(folder)
            .join(&self.opts.project_name)
            .join("Binaries")
            .join("Win64")
            .join(&exe_name);
        let exe_shortcut_path = builds.join(folder).join(&exe_name);
        (exe_path, exe_shortcut_path)
    }
}

impl Action for VersionRc {
    fn name(&self) -> &'static str {
        "versionrc"
    }

    fn arg_docs(&self) -> &'static [ArgDoc] {
        ARG_DOCS
    }

    fn verify(&self, meta: &BuildMeta) -> Result<()> {
        if self.opts.project_fingerprint.is_empty() {
            bail!("版本戳参数未设置: project_fingerprint");
        }
        if self.opts.sdk_version.is_empty() {
            bail!("版本戳参数未设置: sdk_version");
        }
        if self.opts.project_name.is_empty() {
            bail!("版本戳参数未设置: project_name");
        }
        if self.opts.project_description.is_empty() {
            bail!("版本戳参数未设置: project_description");
        }
        if self.opts.company_name.is_empty() {
            bail!("版本戳参数未设置: company_name");
        }
        if self.opts.resource_editor_path.as_os_str().is_empty() {
            bail!("工具路径未设置: resource_editor_path");
        }
        if self.opts.resource_compiler_path.as_os_str().is_empty() {
            bail!("工具路径未设置: resource_compiler_path");
        }
        if self.opts.resource_hacker_path.as_os_str().is_empty() {
            bail!("工具路径未设置: resource_hacker_path");
        }
        if self.opts.build_type.is_none() && meta.cur_build_type.is_none() {
            bail!(
                "无法确定构建类型：VersionRc 需要知道上一个打包步骤产出的构建类型 \
                 (client/server/standalone)。打包动作会把它写进会话元数据的 \
                 cur_build_type；没有打包步骤时也可以直接给本动作配置 build_type 选项。"
            );
        }
        Ok(())
    }

    fn run(&mut self, meta: &mut BuildMeta) -> Result<()> {
        // 编排器漏调 verify 时在这里兜底
        self.verify(meta)?;

        let build_type = self
            .opts
            .build_type
            .or(meta.cur_build_type)
            .unwrap_or(BuildType::Standalone);

        let rc_path = self.opts.work_dir.join(config::TMP_VERSION_RC);
        let res_path = self.opts.work_dir.join(config::TMP_VERSION_RES);
        let extract_log = self.opts.work_dir.join(config::VERSION_EXTRACT_LOG);
        let overwrite_log = self.opts.work_dir.join(config::VERSION_OVERWRITE_LOG);

        // 0. 清掉上次运行残留的临时文件（不存在不算错）
        remove_if_exists(&rc_path)?;
        remove_if_exists(&overwrite_log)?;

        // 1. 推导目标 exe 和快捷副本路径
        let (exe_path, exe_shortcut_path) = self.target_paths(build_type);

        // 2. 把 exe 里现有的版本资源提取成 .rc 文本
        let hacker = self.config.project_root.join(&self.opts.resource_hacker_path);
        let args = vec![
            "-open".to_string(),
            path_arg(&exe_path),
            "-save".to_string(),
            path_arg(&rc_path),
            "-action".to_string(),
            "extract".to_string(),
            "-mask".to_string(),
            "VERSIONINFO,,".to_string(),
            "-log".to_string(),
            path_arg(&extract_log),
        ];
        if self.launcher.launch(&hacker, &args)? != 0 {
            bail!("提取版本资源失败 (resource hacker extract)");
        }

        // 3. 版本号不足 4 段时补 .0，资源工具只认 a.b.c.d 形式
        let ver_str = pad_version(&self.config.version_str);

        // 4. 版本编辑工具就地改写 .rc 的各个字段。
        //    工具对参数顺序敏感，这里的顺序不能动。
        let editor = self.config.project_root.join(&self.opts.resource_editor_path);
        let args = vec![
            "-i".to_string(),
            path_arg(&rc_path),
            "-o".to_string(),
            path_arg(&rc_path),
            "-v".to_string(),
            ver_str,
            "-n".to_string(),
            self.opts.project_description.clone(),
            "-c".to_string(),
            self.opts.company_name.clone(),
            "-f".to_string(),
            format!("{}.exe", self.opts.project_name),
            "-a".to_string(),
            self.opts.project_fingerprint.clone(),
            "-s".to_string(),
            self.opts.sdk_version.clone(),
        ];
        if self.launcher.launch(&editor, &args)? != 0 {
            bail!("改写版本资源字段失败 (版本编辑工具)");
        }

        // 5~6. 产品版本两处值用配置的版本号替换。
        //     定位失败说明资源格式和预期不符，继续下去会产出
        //     错版二进制，直接致命中止整个构建。
        let contents = fs::read_to_string(&rc_path)
            .with_context(|| format!("读取临时资源文本失败: {}", rc_path.display()))?;
        let new_contents = match rewrite_product_version(&contents, &self.config.version_str) {
            Ok(text) => text,
            Err(e) => logging::fatal_exit(&format!("{e:#}"), !self.config.automated),
        };
        fs::write(&rc_path, new_contents)
            .with_context(|| format!("写回临时资源文本失败: {}", rc_path.display()))?;

        // 7~8. 清掉旧 .res，编译出新的
        remove_if_exists(&res_path)?;
        let compiler = self
            .config
            .project_root
            .join(&self.opts.resource_compiler_path);
        if self.launcher.launch(&compiler, &[path_arg(&rc_path)])? != 0 {
            bail!("编译版本资源失败 (rc 编译器)");
        }

        // 9. 把编译好的 .res 写回主 exe
        let mut args = vec![
            "-open".to_string(),
            path_arg(&exe_path),
            "-save".to_string(),
            path_arg(&exe_path),
            "-action".to_string(),
            "addoverwrite".to_string(),
            "-res".to_string(),
            path_arg(&res_path),
            "-mask".to_string(),
            "VERSIONINFO,,".to_string(),
            "-log".to_string(),
            path_arg(&overwrite_log),
        ];
        if self.launcher.launch(&hacker, &args)? != 0 {
            bail!("把新版本资源写回主 exe 失败");
        }

        // 10. 快捷副本：同一组参数，只换 -open/-save 的目标
        args[1] = path_arg(&exe_shortcut_path);
        args[3] = path_arg(&exe_shortcut_path);
        if self.launcher.launch(&hacker, &args)? != 0 {
            bail!("把新版本资源写回快捷副本 exe 失败");
        }

        logging::write(format!("版本资源已更新: {}", exe_path.display()));
        Ok(())
    }
}

/// 命令行参数用的路径文本。
fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// 删除文件，不存在不算错。
fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("清理临时文件失败: {}", path.display()))
        }
    }
}

/// 把版本号补齐到 4 段数字，资源工具只认 a.b.c.d 形式。
///
/// "1.2" → "1.2.0.0"；已有 4 段则原样返回。
pub fn pad_version(version: &str) -> String {
    let missing = 4usize.saturating_sub(version.split('.').count());
    let mut out = String::from(version);
    for _ in 0..missing {
        out.push_str(".0");
    }
    out
}

/// 在提取出的 .rc 文本里定位两处产品版本并替换：
///
///   PRODUCTVERSION 1,0,0,0              → 逗号分隔
///   VALUE "ProductVersion", "1.0.0.0"   → 点分隔
///
/// 两处都必须恰好出现一次；缺失或重复说明资源格式和预期
/// 不符，返回 Err 交给调用方致命中止。除这两个值外，
/// 原文其余字节保持不变。
pub fn rewrite_product_version(contents: &str, version: &str) -> Result<String> {
    let (num_start, num_end) =
        locate_unique_value(contents, "PRODUCTVERSION", productversion_span)?;
    let (str_start, str_end) = locate_unique_value(
        contents,
        "ProductVersion 字符串",
        productversion_string_span,
    )?;

    // 提取出来的资源里数值行在字符串块之前，顺序反了按格式异常处理
    if str_start < num_end {
        bail!("资源文本中 ProductVersion 字符串出现在 PRODUCTVERSION 之前");
    }

    let mut out = String::with_capacity(contents.len());
    out.push_str(&contents[..num_start]);
    out.push_str(&version.replace('.', ","));
    out.push_str(&contents[num_end..str_start]);
    out.push_str(version);
    out.push_str(&contents[str_end..]);
    Ok(out)
}

/// 逐行扫描，要求匹配器恰好命中一行，返回值的全局字节区间。
fn locate_unique_value(
    contents: &str,
    what: &str,
    matcher: impl Fn(&str) -> Option<(usize, usize)>,
) -> Result<(usize, usize)> {
    let mut found = None;
    let mut offset = 0;
    for line in contents.split_inclusive('\n') {
        if let Some((start, end)) = matcher(line) {
            if found.is_some() {
                bail!("资源文本中 {what} 出现了多次");
            }
            found = Some((offset + start, offset + end));
        }
        offset += line.len();
    }
    found.with_context(|| format!("资源文本中找不到 {what}"))
}

/// 匹配 `PRODUCTVERSION 1,0,0,0` 行，返回值部分在行内的区间。
fn productversion_span(line: &str) -> Option<(usize, usize)> {
    let key = "PRODUCTVERSION";
    let at = line.find(key)?;
    let after = &line[at + key.len()..];
    // 关键字后必须紧跟空白，避免命中更长的标识符
    if !after.starts_with([' ', '\t']) {
        return None;
    }
    let ws = after.len() - after.trim_start_matches([' ', '\t']).len();
    let start = at + key.len() + ws;
    let end = start + line[start..].trim_end().len();
    if end <= start {
        return None;
    }
    Some((start, end))
}

/// 匹配 `VALUE "ProductVersion", "1.0.0.0"` 行，返回引号内值的区间。
fn productversion_string_span(line: &str) -> Option<(usize, usize)> {
    let key = "\"ProductVersion\"";
    let at = line.find(key)?;
    // 前面得是 VALUE 语句
    if !line[..at].trim_start().starts_with("VALUE") {
        return None;
    }
    let rest = &line[at + key.len()..];
    let comma = rest.find(',')?;
    let after_comma = &rest[comma + 1..];
    let quote = after_comma.find('"')?;
    // 逗号和引号之间只允许空白
    if !after_comma[..quote].chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    let value_start = at + key.len() + comma + 1 + quote + 1;
    let close = line[value_start..].find('"')?;
    Some((value_start, value_start + close))
}
