// ============================================================
// artifacts.rs — CI 构建产物同步动作
// ============================================================
// 从 CI 服务器的任务 API 读取最近一次成功构建的构建号，
// 与会话元数据里记住的构建号对比：
//   不同 → 按拉取清单逐项下载产物，全部成功后写回新构建号
//   相同 → 不做任何下载，报告已是最新
//
// CI 返回的是 "python 风味" 的 JSON（None/True/False），
// 解析前先整体做字面量替换归一化（已知局限见 DESIGN.md）。
// ============================================================

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::action::{Action, ArgDoc};
use crate::config::{self, BuildConfig};
use crate::download::{Downloader, HttpDownloader};
use crate::logging;
use crate::meta::BuildMeta;

/// 产物拉取清单项：一个目标目录 + 若干产物相对路径。
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactPullItem {
    /// 下载落盘目录（相对于工程根目录解析）
    pub dir_to: PathBuf,
    /// CI 产物的相对路径列表
    pub artifacts: Vec<String>,
}

/// ArtifactSync 识别的全部选项。
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSyncOptions {
    /// CI 任务地址，必填，以 / 结尾
    #[serde(default)]
    pub job_url: String,

    /// 任务元数据 API 的相对地址
    #[serde(default = "default_meta_url")]
    pub meta_url: String,

    /// 拉取清单
    #[serde(default)]
    pub pull_list: Vec<ArtifactPullItem>,
}

fn default_meta_url() -> String {
    "api/python?pretty=true".to_string()
}

/// 消费的任务元数据子集（其余字段一律忽略）。
#[derive(Debug, Deserialize)]
struct JobMeta {
    #[serde(rename = "lastSuccessfulBuild")]
    last_successful_build: LastSuccessfulBuild,
}

#[derive(Debug, Deserialize)]
struct LastSuccessfulBuild {
    /// 最近一次成功构建的构建号
    number: u64,
    /// 该次构建的根地址，产物挂在 url + "artifact/" 下
    url: String,
}

/// 构建产物同步动作。
pub struct ArtifactSync {
    config: BuildConfig,
    opts: ArtifactSyncOptions,
    downloader: Box<dyn Downloader>,
}

static ARG_DOCS: &[ArgDoc] = &[
    ArgDoc {
        name: "job_url",
        doc: "要拉取产物的 CI 任务地址",
    },
    ArgDoc {
        name: "meta_url",
        doc: "任务元数据 API 的相对地址，默认 python 风味的 pretty JSON",
    },
    ArgDoc {
        name: "pull_list",
        doc: "拉取清单：每项一个目标目录 + 若干产物相对路径",
    },
];

impl ArtifactSync {
    pub fn new(config: BuildConfig, opts: ArtifactSyncOptions) -> Self {
        Self::with_downloader(config, opts, Box::new(HttpDownloader))
    }

    /// 注入下载器的构造入口（测试用假实现替换真实 HTTP）。
    pub fn with_downloader(
        config: BuildConfig,
        opts: ArtifactSyncOptions,
        downloader: Box<dyn Downloader>,
    ) -> Self {
        Self {
            config,
            opts,
            downloader,
        }
    }

    /// 拉取任务元数据原文。
    fn fetch_job_meta(&self) -> Result<String> {
        let url = format!("{}{}", self.opts.job_url, self.opts.meta_url);

        // 协议不对直接按 URL 格式错误报出，与"连不上服务器"区分开
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("CI 任务 URL 格式不正确: {url}");
        }

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config::HTTP_TIMEOUT_SECS)))
            .build()
            .into();

        let mut response = agent
            .get(&url)
            .call()
            .context("无法连接到 CI 服务器，请确认网络 / VPN 可用")?;

        response
            .body_mut()
            .read_to_string()
            .context("读取 CI 任务元数据失败")
    }

    /// 对比构建号，需要时按清单逐项下载，全部成功后写回新构建号。
    ///
    /// 中途失败时：已下载的文件留在磁盘上（不回滚），
    /// 构建号保持旧值，下次运行会重新拉取整个清单。
    fn pull(&self, job: &JobMeta, meta: &mut BuildMeta) -> Result<()> {
        let new_build_num = job.last_successful_build.number;
        if new_build_num == meta.last_client_app_build_num {
            logging::write("客户端产物已是最新");
            return Ok(());
        }

        let artifacts_url = &job.last_successful_build.url;
        for item in &self.opts.pull_list {
            let dir_to = self.config.project_root.join(&item.dir_to);
            for artifact in &item.artifacts {
                let url = format!("{artifacts_url}artifact/{artifact}");
                self.downloader
                    .download(&url, &dir_to)
                    .with_context(|| format!("拉取产物失败: {artifact}"))?;
            }
        }

        meta.last_client_app_build_num = new_build_num;
        logging::write(format!("客户端产物已更新到构建 {new_build_num}"));
        Ok(())
    }
}

impl Action for ArtifactSync {
    fn name(&self) -> &'static str {
        "artifacts"
    }

    fn arg_docs(&self) -> &'static [ArgDoc] {
        ARG_DOCS
    }

    fn verify(&self, _meta: &BuildMeta) -> Result<()> {
        if self.opts.job_url.is_empty() {
            bail!("CI 任务 URL 未配置 (job_url)");
        }
        Ok(())
    }

    fn run(&mut self, meta: &mut BuildMeta) -> Result<()> {
        let body = self.fetch_job_meta()?;
        let job = parse_job_meta(&body)?;
        self.pull(&job, meta)
    }
}

/// 把 python 风味的字面量整体替换成合法 JSON。
///
/// 注意这是无语法边界的纯文本替换：字符串值里恰好含有
/// 裸词 None/True/False 时会被误伤（已知局限，见 DESIGN.md）。
fn normalize_python_literals(body: &str) -> String {
    body.replace("None", "null")
        .replace("True", "true")
        .replace("False", "false")
}

/// 归一化 + 解析任务元数据。
fn parse_job_meta(body: &str) -> Result<JobMeta> {
    let normalized = normalize_python_literals(body);
    serde_json::from_str(&normalized).context("解析 CI 任务元数据失败")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    /// 记录每次下载请求的假下载器，可按序号注入失败。
    struct RecordingDownloader {
        calls: Rc<RefCell<Vec<(String, PathBuf)>>>,
        /// 第 n 次调用（从 1 数）返回 Err
        fail_on: Option<usize>,
    }

    impl Downloader for RecordingDownloader {
        fn download(&self, url: &str, dir_to: &Path) -> Result<()> {
            let mut calls = self.calls.borrow_mut();
            calls.push((url.to_string(), dir_to.to_path_buf()));
            if Some(calls.len()) == self.fail_on {
                bail!("模拟下载失败");
            }
            Ok(())
        }
    }

    fn test_config() -> BuildConfig {
        BuildConfig {
            project_root: PathBuf::from("C:/proj"),
            builds_path: PathBuf::from("C:/proj/Builds"),
            version_str: "1.0".to_string(),
            automated: true,
        }
    }

    fn test_options() -> ArtifactSyncOptions {
        ArtifactSyncOptions {
            job_url: "https://ci.example.com/job/client-app/".to_string(),
            meta_url: default_meta_url(),
            pull_list: vec![
                ArtifactPullItem {
                    dir_to: PathBuf::from("Binaries/Win64"),
                    artifacts: vec![
                        "out/Game.exe".to_string(),
                        "out/Game.pdb".to_string(),
                    ],
                },
                ArtifactPullItem {
                    dir_to: PathBuf::from("Saved/Tray"),
                    artifacts: vec!["out/Tray.exe".to_string()],
                },
            ],
        }
    }

    fn sync_with_fake(
        fail_on: Option<usize>,
    ) -> (ArtifactSync, Rc<RefCell<Vec<(String, PathBuf)>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let downloader = RecordingDownloader {
            calls: Rc::clone(&calls),
            fail_on,
        };
        let sync =
            ArtifactSync::with_downloader(test_config(), test_options(), Box::new(downloader));
        (sync, calls)
    }

    fn job_meta(number: u64) -> JobMeta {
        JobMeta {
            last_successful_build: LastSuccessfulBuild {
                number,
                url: "https://ci.example.com/job/client-app/42/".to_string(),
            },
        }
    }

    #[test]
    fn new_build_downloads_every_artifact_and_updates_meta() {
        let (sync, calls) = sync_with_fake(None);
        let mut meta = BuildMeta {
            last_client_app_build_num: 41,
            cur_build_type: None,
        };

        sync.pull(&job_meta(42), &mut meta).unwrap();

        let calls = calls.borrow();
        // 清单里共 3 个产物，每个恰好下载一次
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0].0,
            "https://ci.example.com/job/client-app/42/artifact/out/Game.exe"
        );
        assert_eq!(calls[0].1, PathBuf::from("C:/proj/Binaries/Win64"));
        assert_eq!(
            calls[1].0,
            "https://ci.example.com/job/client-app/42/artifact/out/Game.pdb"
        );
        assert_eq!(
            calls[2].0,
            "https://ci.example.com/job/client-app/42/artifact/out/Tray.exe"
        );
        assert_eq!(calls[2].1, PathBuf::from("C:/proj/Saved/Tray"));

        assert_eq!(meta.last_client_app_build_num, 42);
    }

    #[test]
    fn same_build_number_downloads_nothing() {
        let (sync, calls) = sync_with_fake(None);
        let mut meta = BuildMeta {
            last_client_app_build_num: 42,
            cur_build_type: None,
        };

        sync.pull(&job_meta(42), &mut meta).unwrap();

        assert!(calls.borrow().is_empty());
        assert_eq!(meta.last_client_app_build_num, 42);
    }

    #[test]
    fn failed_download_keeps_old_build_number() {
        // 第 2 个产物下载失败：之前的下载不回滚，但构建号保持旧值，
        // 下次运行会重新拉取整个清单
        let (sync, calls) = sync_with_fake(Some(2));
        let mut meta = BuildMeta {
            last_client_app_build_num: 41,
            cur_build_type: None,
        };

        let err = sync.pull(&job_meta(42), &mut meta).unwrap_err();

        assert!(format!("{err:#}").contains("拉取产物失败"));
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(meta.last_client_app_build_num, 41);
    }

    #[test]
    fn python_literals_normalize_to_json() {
        let body = r#"{"a": None, "b": True, "c": False}"#;
        let value: serde_json::Value =
            serde_json::from_str(&normalize_python_literals(body)).unwrap();
        assert_eq!(value, serde_json::json!({"a": null, "b": true, "c": false}));
    }

    #[test]
    fn job_meta_parses_python_flavored_body() {
        let body = r#"{
          "displayName": "client-app",
          "inQueue": False,
          "keepDependencies": None,
          "lastSuccessfulBuild": {
            "number": 42,
            "url": "https://ci.example.com/job/client-app/42/"
          },
          "lastUnsuccessfulBuild": None
        }"#;

        let job = parse_job_meta(body).unwrap();
        assert_eq!(job.last_successful_build.number, 42);
        assert_eq!(
            job.last_successful_build.url,
            "https://ci.example.com/job/client-app/42/"
        );
    }

    #[test]
    fn verify_rejects_missing_job_url() {
        let (mut sync, _calls) = sync_with_fake(None);
        sync.opts.job_url.clear();

        let err = sync.verify(&BuildMeta::default()).unwrap_err();
        assert!(format!("{err:#}").contains("job_url"));
    }

    #[test]
    fn non_http_job_url_is_a_format_error() {
        let (mut sync, _calls) = sync_with_fake(None);
        sync.opts.job_url = "ftp://ci.example.com/job/client-app/".to_string();

        let err = sync.fetch_job_meta().unwrap_err();
        assert!(format!("{err:#}").contains("URL 格式不正确"));
    }
}
