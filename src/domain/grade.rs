// ==========================================
// 成绩聚合与评议引擎 - 派生成绩领域模型
// ==========================================
// 红线: FinalGrade / StudentRecap / UeStatistics 均为可丢弃的派生缓存，
//       唯一事实来源是评估账本 + 教学单元配置，任何时刻可全量重建
// ==========================================

use crate::domain::types::{Mention, OverallDecision};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 学分获得（capitalisation）阈值：最终成绩 ≥ 10/20
pub const CAPITALIZATION_THRESHOLD: f64 = 10.0;

// ==========================================
// FinalGrade - 单元最终成绩
// ==========================================
// 键: (student_id, unit_code, academic_year)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalGrade {
    pub student_id: String,
    pub unit_code: String,
    pub academic_year: String,

    pub grade: f64,        // 最终成绩 [0, 20]，两位小数
    pub capitalized: bool, // 是否获得学分（grade ≥ 10）
    pub mention: Mention,  // 评定等级

    pub computation_version: i32,     // 计算版本（单调递增，仅在结果变化时递增）
    pub computed_at: DateTime<Utc>,   // 计算时间
}

// ==========================================
// StudentRecap - 学生学业汇总
// ==========================================
// 键: (student_id, academic_level, academic_year)
// 说明: 缺失的 FinalGrade 视为"尚未评定"，不计入平均但计入 ue_total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecap {
    pub student_id: String,
    pub academic_level: String,
    pub academic_year: String,

    // ===== 平均成绩 =====
    pub unweighted_avg: Option<f64>, // 简单平均（无已评单元时为 None）
    pub weighted_avg: Option<f64>,   // 学分加权平均

    // ===== 学分获得 =====
    pub capitalization_pct: f64, // 已获学分占层级总学分百分比（分母恒为层级总学分）
    pub ue_capitalized: i32,     // 已获学分单元数
    pub ue_total: i32,           // 层级单元总数
    pub credits_obtained: i32,   // 已获学分
    pub credits_total: i32,      // 层级总学分

    // ===== 排名与评议 =====
    pub rank: Option<i32>,               // 排名（未运行排名前为 None）
    pub subject_to_deliberation: bool,   // 是否须进入评议
    pub eligible_for_deliberation: bool, // 是否满足评议资格（由资格评定器写入）
    pub has_been_deliberated: bool,      // 是否已评议（外部评议流程写入）
    pub decision: Option<OverallDecision>, // 总体结论
    pub mention: Option<Mention>,        // 总体评定等级（按加权平均推导）

    pub computed_at: DateTime<Utc>, // 计算时间
}

// ==========================================
// UeStatistics - 教学单元描述统计
// ==========================================
// 键: (unit_code, academic_year)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UeStatistics {
    pub unit_code: String,
    pub academic_year: String,

    pub grade_count: i64, // 样本数 N
    pub mean: f64,        // 算术平均
    pub std_dev: f64,     // 总体标准差（除以 N）
    pub min: f64,
    pub max: f64,
    pub q1: f64,     // 第一四分位（线性插值）
    pub median: f64, // 中位数（线性插值）
    pub q3: f64,     // 第三四分位（线性插值）

    pub pass_count: i64, // 成绩 ≥ 10 的人数
    pub fail_count: i64, // N - pass_count
    pub pass_rate: f64,  // pass / N × 100

    pub computed_at: DateTime<Utc>, // 计算时间
}

// ==========================================
// DeliberationParams - 评议资格阈值
// ==========================================
// 用途: 教务管理端按层级配置，本引擎只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliberationParams {
    pub academic_level: String,
    pub min_capitalization_pct: f64, // 最低学分获得百分比
    pub max_non_capitalized: i32,    // 最多容忍的未获学分单元数
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// EligibilityCriterion / EligibilityReport - 资格评定输出
// ==========================================
// 红线: 所有判定必须输出 reason（可解释性）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriterion {
    pub name: String,   // 判据名称
    pub observed: f64,  // 实际观测值
    pub threshold: f64, // 配置阈值
    pub passed: bool,   // 是否满足
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub student_id: String,
    pub academic_level: String,
    pub academic_year: String,
    pub eligible: bool,                      // 两项判据同时满足才具资格
    pub criteria: Vec<EligibilityCriterion>, // 逐项判据明细
    pub reasons: Vec<String>,                // 未满足判据的可读说明（具资格时为空）
}

// ==========================================
// RankedStudent - 排名条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStudent {
    pub rank: i32, // 1 起始；并列者仍获得不同的连续名次（非竞赛排名，刻意保持）
    pub student_id: String,
    pub unweighted_avg: Option<f64>,
    pub weighted_avg: Option<f64>,
}
