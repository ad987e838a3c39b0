// ============================================================
// action.rs — 构建动作契约
// ============================================================
// 每个流水线步骤实现 Action trait，由编排器统一驱动：
//   构造（共享配置 + 动作选项） → verify() 前置检查 → run() 执行
//
// verify 只读元数据；run 可以写回（单写者约定见 meta.rs）。
// 失败通过 anyhow 错误链携带可读信息，编排器决定是否
// 中止整个构建；动作内部不做重试。
// ============================================================

use anyhow::Result;

use crate::meta::BuildMeta;

/// 动作选项的静态说明（选项名 → 人类可读描述），
/// 供编排器生成配置帮助信息。
#[derive(Debug, Clone, Copy)]
pub struct ArgDoc {
    /// 选项名，与该动作选项结构体的字段名一致
    pub name: &'static str,
    /// 用途描述
    pub doc: &'static str,
}

/// 构建流水线动作。
///
/// 动作每次构建只被调用一次，动作之间不共享运行期状态，
/// 唯一的跨步骤通道是 BuildMeta。
pub trait Action {
    /// 动作名（日志用）
    fn name(&self) -> &'static str;

    /// 本动作识别的全部选项及说明
    fn arg_docs(&self) -> &'static [ArgDoc];

    /// 前置检查。配置不完整时返回带说明的错误，不产生副作用。
    fn verify(&self, meta: &BuildMeta) -> Result<()>;

    /// 执行动作。失败返回 Err（可恢复，编排器决定去留）。
    fn run(&mut self, meta: &mut BuildMeta) -> Result<()>;
}
