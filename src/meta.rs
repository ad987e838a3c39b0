// ============================================================
// meta.rs — 构建会话元数据
// ============================================================
// 跨动作共享的可变状态，由编排器持有：
//   - last_client_app_build_num: 上次同步的 CI 构建号
//   - cur_build_type: 上一个打包步骤产出的构建类型
//
// 访问约定：verify() 只读（&BuildMeta），run() 可写
// （&mut BuildMeta）。目前唯一的写入方是 ArtifactSync，
// 成功拉取后把新构建号写回，后续步骤（及下次构建）可见。
// ============================================================

use serde::{Deserialize, Serialize};

/// 打包步骤产出的构建类型，决定产物的平台子目录和 exe 命名。
///
/// 打包步骤写入的是任意小写字符串，未识别的取值
/// （含空串）一律按独立版处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum BuildType {
    /// 客户端打包 → WindowsClient / <项目名>Client.exe / <输出目录>_client
    Client,
    /// 专用服务器打包 → WindowsServer / <项目名>Server.exe / <输出目录>_server
    Server,
    /// 独立版 → WindowsNoEditor，无任何后缀
    Standalone,
}

impl From<String> for BuildType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "client" => BuildType::Client,
            "server" => BuildType::Server,
            _ => BuildType::Standalone,
        }
    }
}

impl BuildType {
    /// 产物所在的 Windows 平台子目录名
    pub fn windows_folder(self) -> &'static str {
        match self {
            BuildType::Client => "WindowsClient",
            BuildType::Server => "WindowsServer",
            BuildType::Standalone => "WindowsNoEditor",
        }
    }

    /// exe 名称后缀（拼在项目名之后）
    pub fn exe_suffix(self) -> &'static str {
        match self {
            BuildType::Client => "Client",
            BuildType::Server => "Server",
            BuildType::Standalone => "",
        }
    }

    /// 打包输出目录后缀
    pub fn builds_path_suffix(self) -> &'static str {
        match self {
            BuildType::Client => "_client",
            BuildType::Server => "_server",
            BuildType::Standalone => "",
        }
    }
}

/// 构建会话元数据。
///
/// 编排器持有唯一实例并负责跨会话持久化；
/// 本 crate 不定义它的落盘格式。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMeta {
    /// 上次成功同步的 CI 构建号，0 表示从未同步过
    #[serde(default)]
    pub last_client_app_build_num: u64,

    /// 上一个打包步骤记录的构建类型；
    /// None 表示本次会话还没有打包步骤写入过
    #[serde(default)]
    pub cur_build_type: Option<BuildType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_type_parses_lowercase_strings() {
        let client: BuildType = serde_json::from_str(r#""client""#).unwrap();
        let server: BuildType = serde_json::from_str(r#""server""#).unwrap();
        assert_eq!(client, BuildType::Client);
        assert_eq!(server, BuildType::Server);
    }

    #[test]
    fn unknown_build_type_falls_back_to_standalone() {
        // 打包步骤可能写入任意字符串，未识别的一律按独立版处理
        let editor: BuildType = serde_json::from_str(r#""editor""#).unwrap();
        let empty: BuildType = serde_json::from_str(r#""""#).unwrap();
        assert_eq!(editor, BuildType::Standalone);
        assert_eq!(empty, BuildType::Standalone);
    }

    #[test]
    fn build_type_path_mapping() {
        assert_eq!(BuildType::Client.windows_folder(), "WindowsClient");
        assert_eq!(BuildType::Client.exe_suffix(), "Client");
        assert_eq!(BuildType::Client.builds_path_suffix(), "_client");

        assert_eq!(BuildType::Server.windows_folder(), "WindowsServer");
        assert_eq!(BuildType::Server.exe_suffix(), "Server");
        assert_eq!(BuildType::Server.builds_path_suffix(), "_server");

        assert_eq!(BuildType::Standalone.windows_folder(), "WindowsNoEditor");
        assert_eq!(BuildType::Standalone.exe_suffix(), "");
        assert_eq!(BuildType::Standalone.builds_path_suffix(), "");
    }

    #[test]
    fn meta_defaults_to_never_synced() {
        let meta = BuildMeta::default();
        assert_eq!(meta.last_client_app_build_num, 0);
        assert!(meta.cur_build_type.is_none());
    }
}
