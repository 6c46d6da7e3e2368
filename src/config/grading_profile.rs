use crate::domain::unit::DEFAULT_POINT_SCALE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 评分制度配置（持久化对象）
///
/// 存储位置：JSON 文件（维护二进制经环境变量 GRADE_ENGINE_PROFILE 指定，
/// 缺省用内置默认值）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingProfile {
    /// 新建评估组成时的默认满分制（法式制度为 20 分制）
    #[serde(default = "default_point_scale")]
    pub default_point_scale: f64,

    /// 批量导入参数
    #[serde(default)]
    pub import: ImportOptions,

    /// 按层级预置的评议阈值（首次启动时写入 deliberation_params）
    #[serde(default)]
    pub deliberation_seeds: Vec<DeliberationSeed>,
}

/// 批量导入参数（CSV）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 字段分隔符（单字节）
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// 首行是否为表头
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
}

/// 评议阈值预置项（对应 deliberation_params 一行）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationSeed {
    /// 学业层级（如 L1/L2/L3）
    pub academic_level: String,

    /// 最低学分获得百分比
    pub min_capitalization_pct: f64,

    /// 最多容忍的未获学分单元数
    pub max_non_capitalized: i32,
}

fn default_point_scale() -> f64 {
    DEFAULT_POINT_SCALE
}

fn default_delimiter() -> char {
    ','
}

fn default_has_headers() -> bool {
    true
}

impl Default for GradingProfile {
    fn default() -> Self {
        Self {
            default_point_scale: default_point_scale(),
            import: ImportOptions::default(),
            deliberation_seeds: Vec::new(),
        }
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_headers: default_has_headers(),
        }
    }
}

impl GradingProfile {
    /// 从 JSON 文件加载配置（文件不存在时报错，由调用方决定是否回退默认值）
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let profile: GradingProfile = serde_json::from_str(&raw)?;
        Ok(profile)
    }
}
