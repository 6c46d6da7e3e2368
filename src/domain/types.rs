// ==========================================
// 成绩聚合与评议引擎 - 领域类型定义
// ==========================================
// 红线: 全部为封闭枚举，序列化格式 SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 教学单元状态 (Unit Status)
// ==========================================
// 红线: ARCHIVED 后不可再修改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Active,   // 开设中
    Inactive, // 停开
    Archived, // 已归档
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl UnitStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => UnitStatus::Active,
            "INACTIVE" => UnitStatus::Inactive,
            "ARCHIVED" => UnitStatus::Archived,
            _ => UnitStatus::Active, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            UnitStatus::Active => "ACTIVE",
            UnitStatus::Inactive => "INACTIVE",
            UnitStatus::Archived => "ARCHIVED",
        }
    }
}

// ==========================================
// 评估组成类别 (Component Kind)
// ==========================================
// 同一教学单元内类别唯一（数据库 UNIQUE 约束保证）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentKind {
    ContinuousAssessment, // 平时成绩 (CC)
    NormalSession,        // 正考 (SN)
    RetakeSession,        // 补考 (SR / rattrapage)
    Practical,            // 实验 (TP)
    Project,              // 项目
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ComponentKind {
    /// 从字符串解析类别（兼容简码 CC/SN/SR/TP）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CONTINUOUS_ASSESSMENT" | "CC" => Some(ComponentKind::ContinuousAssessment),
            "NORMAL_SESSION" | "SN" => Some(ComponentKind::NormalSession),
            "RETAKE_SESSION" | "SR" => Some(ComponentKind::RetakeSession),
            "PRACTICAL" | "TP" => Some(ComponentKind::Practical),
            "PROJECT" => Some(ComponentKind::Project),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ComponentKind::ContinuousAssessment => "CONTINUOUS_ASSESSMENT",
            ComponentKind::NormalSession => "NORMAL_SESSION",
            ComponentKind::RetakeSession => "RETAKE_SESSION",
            ComponentKind::Practical => "PRACTICAL",
            ComponentKind::Project => "PROJECT",
        }
    }
}

// ==========================================
// 评估记录状态 (Entry Status)
// ==========================================
// 状态机:
// - {PENDING, PROVISIONAL} → {PROVISIONAL, FINAL, CANCELLED, RETAKE}
// - FINAL → {CANCELLED, RETAKE}   (FINAL 不可静默回退为 PROVISIONAL)
// - CANCELLED 为终态
// - RETAKE → {FINAL, CANCELLED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Pending,     // 待录入确认
    Provisional, // 暂定
    Final,       // 定稿
    Cancelled,   // 作废
    Retake,      // 补考替换
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl EntryStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(EntryStatus::Pending),
            "PROVISIONAL" => Some(EntryStatus::Provisional),
            "FINAL" => Some(EntryStatus::Final),
            "CANCELLED" => Some(EntryStatus::Cancelled),
            "RETAKE" => Some(EntryStatus::Retake),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Provisional => "PROVISIONAL",
            EntryStatus::Final => "FINAL",
            EntryStatus::Cancelled => "CANCELLED",
            EntryStatus::Retake => "RETAKE",
        }
    }

    /// 状态机判定：当前状态是否允许转换到目标状态
    pub fn can_transition_to(&self, target: EntryStatus) -> bool {
        use EntryStatus::*;
        match self {
            Pending | Provisional => matches!(target, Provisional | Final | Cancelled | Retake),
            Final => matches!(target, Cancelled | Retake),
            Cancelled => false,
            Retake => matches!(target, Final | Cancelled),
        }
    }

    /// 是否参与最终成绩聚合（仅 FINAL / RETAKE 记录计入）
    pub fn counts_toward_final_grade(&self) -> bool {
        matches!(self, EntryStatus::Final | EntryStatus::Retake)
    }
}

// ==========================================
// 录入方式 (Entry Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryMode {
    Manual,       // 人工录入
    Import,       // 批量导入
    System,       // 系统生成
    Compensation, // 补偿调整
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl EntryMode {
    /// 从字符串解析录入方式
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IMPORT" => EntryMode::Import,
            "SYSTEM" => EntryMode::System,
            "COMPENSATION" => EntryMode::Compensation,
            _ => EntryMode::Manual, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntryMode::Manual => "MANUAL",
            EntryMode::Import => "IMPORT",
            EntryMode::System => "SYSTEM",
            EntryMode::Compensation => "COMPENSATION",
        }
    }
}

// ==========================================
// 评定等级 (Mention)
// ==========================================
// 分数段（降序，首个命中生效）:
// ≥18 EXCELLENT / ≥16 VERY_GOOD / ≥14 GOOD / ≥12 FAIRLY_GOOD
// / ≥10 PASS / ≥5 FAIL / 其余 ELIMINATED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mention {
    Excellent,  // 优秀
    VeryGood,   // 良好
    Good,       // 较好
    FairlyGood, // 中等
    Pass,       // 及格
    Fail,       // 不及格
    Eliminated, // 淘汰
}

impl fmt::Display for Mention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Mention {
    /// 按 20 分制成绩推导评定等级
    pub fn from_grade(grade: f64) -> Self {
        if grade >= 18.0 {
            Mention::Excellent
        } else if grade >= 16.0 {
            Mention::VeryGood
        } else if grade >= 14.0 {
            Mention::Good
        } else if grade >= 12.0 {
            Mention::FairlyGood
        } else if grade >= 10.0 {
            Mention::Pass
        } else if grade >= 5.0 {
            Mention::Fail
        } else {
            Mention::Eliminated
        }
    }

    /// 从字符串解析评定等级
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EXCELLENT" => Some(Mention::Excellent),
            "VERY_GOOD" => Some(Mention::VeryGood),
            "GOOD" => Some(Mention::Good),
            "FAIRLY_GOOD" => Some(Mention::FairlyGood),
            "PASS" => Some(Mention::Pass),
            "FAIL" => Some(Mention::Fail),
            "ELIMINATED" => Some(Mention::Eliminated),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Mention::Excellent => "EXCELLENT",
            Mention::VeryGood => "VERY_GOOD",
            Mention::Good => "GOOD",
            Mention::FairlyGood => "FAIRLY_GOOD",
            Mention::Pass => "PASS",
            Mention::Fail => "FAIL",
            Mention::Eliminated => "ELIMINATED",
        }
    }
}

// ==========================================
// 总体评议结论 (Overall Decision)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallDecision {
    Admitted, // 通过
    Failed,   // 未通过
    Deferred, // 待定（未评完或待评议）
}

impl fmt::Display for OverallDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OverallDecision {
    /// 从字符串解析评议结论
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADMITTED" => Some(OverallDecision::Admitted),
            "FAILED" => Some(OverallDecision::Failed),
            "DEFERRED" => Some(OverallDecision::Deferred),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OverallDecision::Admitted => "ADMITTED",
            OverallDecision::Failed => "FAILED",
            OverallDecision::Deferred => "DEFERRED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_bands() {
        assert_eq!(Mention::from_grade(18.0), Mention::Excellent);
        assert_eq!(Mention::from_grade(16.5), Mention::VeryGood);
        assert_eq!(Mention::from_grade(14.0), Mention::Good);
        assert_eq!(Mention::from_grade(13.4), Mention::FairlyGood);
        assert_eq!(Mention::from_grade(10.0), Mention::Pass);
        assert_eq!(Mention::from_grade(9.99), Mention::Fail);
        assert_eq!(Mention::from_grade(4.99), Mention::Eliminated);
        assert_eq!(Mention::from_grade(0.0), Mention::Eliminated);
    }

    #[test]
    fn test_entry_status_state_machine() {
        use EntryStatus::*;

        // PENDING / PROVISIONAL 可去向全部非 PENDING 状态
        for from in [Pending, Provisional] {
            assert!(from.can_transition_to(Provisional));
            assert!(from.can_transition_to(Final));
            assert!(from.can_transition_to(Cancelled));
            assert!(from.can_transition_to(Retake));
            assert!(!from.can_transition_to(Pending));
        }

        // FINAL 不允许回退为 PROVISIONAL
        assert!(!Final.can_transition_to(Provisional));
        assert!(!Final.can_transition_to(Pending));
        assert!(Final.can_transition_to(Cancelled));
        assert!(Final.can_transition_to(Retake));

        // CANCELLED 为终态
        for target in [Pending, Provisional, Final, Cancelled, Retake] {
            assert!(!Cancelled.can_transition_to(target));
        }

        // RETAKE 只能定稿或作废
        assert!(Retake.can_transition_to(Final));
        assert!(Retake.can_transition_to(Cancelled));
        assert!(!Retake.can_transition_to(Provisional));
    }

    #[test]
    fn test_db_str_roundtrip() {
        assert_eq!(
            EntryStatus::from_str(EntryStatus::Retake.to_db_str()),
            Some(EntryStatus::Retake)
        );
        assert_eq!(
            ComponentKind::from_str("CC"),
            Some(ComponentKind::ContinuousAssessment)
        );
        assert_eq!(EntryMode::from_str("import"), EntryMode::Import);
    }
}
