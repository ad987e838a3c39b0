// ============================================================
// lib.rs — crate 入口
// ============================================================
// 游戏构建流水线的两个可配置动作（Action）：
//   1. ArtifactSync — 对比 CI 最近一次成功构建的构建号，
//      有新构建时按清单拉取客户端产物
//   2. VersionRc    — 把版本号 / 指纹等元数据改写进打包产物
//      exe 的 Windows 版本资源块（含快捷副本）
//
// 两个动作互不依赖，由外部构建编排器构造并依次调用
// verify() / run()；跨步骤的共享状态只有 BuildMeta。
// ============================================================

pub mod action;
pub mod artifacts;
pub mod config;
pub mod download;
pub mod launch;
pub mod logging;
pub mod meta;
pub mod versionrc;

pub use action::{Action, ArgDoc};
pub use artifacts::{ArtifactPullItem, ArtifactSync, ArtifactSyncOptions};
pub use config::BuildConfig;
pub use download::{Downloader, HttpDownloader};
pub use launch::{Launcher, ProcessLauncher};
pub use meta::{BuildMeta, BuildType};
pub use versionrc::{VersionRc, VersionRcOptions};
