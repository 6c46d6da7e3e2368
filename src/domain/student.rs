// ==========================================
// 成绩聚合与评议引擎 - 学籍领域模型
// ==========================================
// 用途: 身份/学籍系统写入，本引擎只读
// 红线: 引擎只用于引用校验与汇总键，不做任何学籍管理
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学籍登记
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,     // 学号（外部身份系统主键）
    pub full_name: String,      // 姓名
    pub academic_level: String, // 学业层级（如 L1/L2/L3/M1）
    pub academic_year: String,  // 学年（如 2024-2025）
    pub created_at: DateTime<Utc>, // 记录创建时间
}
