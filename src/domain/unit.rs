// ==========================================
// 成绩聚合与评议引擎 - 教学单元领域模型
// ==========================================
// 用途: 教务配置系统写入，本引擎只读并校验权重闭合
// 红线: 归档后的教学单元不可再修改；存在评估历史的单元不可删除
// ==========================================

use crate::domain::types::{ComponentKind, UnitStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 学分上限（单个教学单元）
pub const MAX_UNIT_CREDITS: i32 = 60;

/// 默认评分满分（20 分制）
pub const DEFAULT_POINT_SCALE: f64 = 20.0;

// ==========================================
// TeachingUnit - 教学单元 (UE)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeachingUnit {
    // ===== 主键 =====
    pub code: String, // 单元代码（全局唯一，如 INF301）

    // ===== 基础信息 =====
    pub name: String,           // 单元名称
    pub academic_level: String, // 学业层级
    pub program: String,        // 所属专业
    pub credits: i32,           // 学分权重（正整数，有界）
    pub academic_year: String,  // 学年

    // ===== 生命周期 =====
    pub status: UnitStatus, // ACTIVE / INACTIVE / ARCHIVED

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl TeachingUnit {
    /// 归档后不可修改
    pub fn is_mutable(&self) -> bool {
        self.status != UnitStatus::Archived
    }
}

// ==========================================
// EvaluationComponent - 评估组成
// ==========================================
// 不变式: 同一教学单元的组成权重之和必须等于 100 (容差 0.01)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationComponent {
    // ===== 主键与关联 =====
    pub component_id: String, // 组成唯一标识（UUID）
    pub unit_code: String,    // 所属教学单元（FK）

    // ===== 组成定义 =====
    pub kind: ComponentKind, // 组成类别（同一单元内唯一）
    pub name: String,        // 展示名称
    pub weight_pct: f64,     // 权重百分比 [0, 100]
    pub point_scale: f64,    // 满分分值（默认 20）
    pub ordering: i32,       // 展示顺序
}
