// ============================================================
// download.rs — 构建产物下载
// ============================================================
// 把一个 URL 指向的文件下载到指定目录，文件名取 URL 最后一段。
// 流式写盘（64KB 缓冲），大文件不会整体载入内存。
// 下载失败直接返回 Err，由调用方决定是否中止；
// 本 crate 对外部调用一律只尝试一次，不做重试。
// ============================================================

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use crate::config;

/// 文件下载接口。测试中用计数 / 记录的假实现替换。
pub trait Downloader {
    /// 下载 url 指向的文件到 dir_to 目录（文件名取自 URL 最后一段）。
    fn download(&self, url: &str, dir_to: &Path) -> Result<()>;
}

/// 生产实现：ureq 流式下载。
#[derive(Debug, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dir_to: &Path) -> Result<()> {
        let file_name = file_name_from_url(url)?;

        // 确保目标目录存在
        fs::create_dir_all(dir_to)
            .with_context(|| format!("创建下载目录失败: {}", dir_to.display()))?;
        let dest = dir_to.join(file_name);

        // 产物可能是上百 MB 的二进制，使用较长超时
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config::DOWNLOAD_TIMEOUT_SECS)))
            .build()
            .into();

        let response = agent
            .get(url)
            .call()
            .with_context(|| format!("下载失败: {url}"))?;

        let mut reader = response.into_body().into_reader();
        let mut file = fs::File::create(&dest)
            .with_context(|| format!("创建文件失败: {}", dest.display()))?;

        let mut buf = [0u8; 65536]; // 64KB 缓冲区
        loop {
            let n = reader.read(&mut buf).context("读取下载数据失败")?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).context("写入文件失败")?;
        }

        Ok(())
    }
}

/// 从 URL 中取出最后一段作为本地文件名。
///
/// 产物 URL 形如 `.../artifact/Binaries/Win64/Game.exe`；
/// 以 `/` 结尾或根本没有路径段的 URL 视为配置错误。
fn file_name_from_url(url: &str) -> Result<&str> {
    // 查询串和锚点不参与文件名
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != trimmed => Ok(name),
        _ => bail!("产物 URL 无法确定文件名: {url}"),
    }
}
