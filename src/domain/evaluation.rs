// ==========================================
// 成绩聚合与评议引擎 - 评估记录领域模型
// ==========================================
// 红线: 同一 (学生, 组成) 至多一条记录；重复提交走更新并递增 version
// 红线: version 为乐观并发计数器，不可跳变、不可回退
// ==========================================

use crate::domain::types::{EntryMode, EntryStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EvaluationEntry - 评估记录（账本行）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationEntry {
    // ===== 主键与关联 =====
    pub entry_id: String,     // 记录唯一标识（UUID）
    pub student_id: String,   // 学号（FK student）
    pub component_id: String, // 评估组成（FK evaluation_component）

    // ===== 成绩 =====
    pub mark: f64,         // 原始分 [0, point_scale]
    pub mark_over_20: f64, // 折算 20 分制（派生，只读）

    // ===== 录入信息 =====
    pub entry_date: NaiveDate,   // 评估日期
    pub author: String,          // 录入人（外部身份系统提供）
    pub status: EntryStatus,     // 生命周期状态
    pub mode: EntryMode,         // 录入方式
    pub comment: Option<String>, // 备注

    // ===== 并发控制 =====
    pub version: i32, // 单调递增版本号（乐观锁）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// EntryPatch - 评估记录修改载荷
// ==========================================
// 用途: update_entry 的部分更新；None 字段保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    pub mark: Option<f64>,
    pub entry_date: Option<NaiveDate>,
    pub comment: Option<Option<String>>, // Some(None) 表示清空备注
}

// ==========================================
// RecordEntryRequest - 成绩录入请求
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntryRequest {
    pub student_id: String,
    pub component_id: String,
    pub mark: f64,
    pub entry_date: NaiveDate,
    pub author: String,
    pub mode: EntryMode,
    pub comment: Option<String>,
}
