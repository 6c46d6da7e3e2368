// ==========================================
// 成绩聚合与评议引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义成绩重算事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，调度层（API/批处理）实现适配器
// 用途: 账本写入只"标脏"，重算由下游按至少一次语义消费（重算幂等可重入）
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 成绩事件类型
// ==========================================

/// 成绩事件触发类型
///
/// Engine 层定义的事件类型，用于通知下游重算调度
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeEventType {
    /// 账本变更导致最终成绩失效（status 进出 FINAL/RETAKE，或 FINAL/RETAKE 行被改写）
    FinalGradeDirty,
    /// 最终成绩已重算（下游应重算学生汇总与单元统计）
    FinalGradeRecomputed,
    /// 学生汇总已重算（下游应重算排名）
    RecapRecomputed,
    /// 手动触发
    ManualTrigger,
}

impl GradeEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            GradeEventType::FinalGradeDirty => "FinalGradeDirty",
            GradeEventType::FinalGradeRecomputed => "FinalGradeRecomputed",
            GradeEventType::RecapRecomputed => "RecapRecomputed",
            GradeEventType::ManualTrigger => "ManualTrigger",
        }
    }
}

/// 成绩事件
///
/// Engine 层发布的事件，定位到 (学生, 教学单元, 学年) 分区
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeEvent {
    /// 学号
    pub student_id: String,
    /// 教学单元代码
    pub unit_code: String,
    /// 学年
    pub academic_year: String,
    /// 事件类型
    pub event_type: GradeEventType,
    /// 事件来源描述
    pub source: Option<String>,
}

impl GradeEvent {
    /// 创建事件
    pub fn new(
        student_id: &str,
        unit_code: &str,
        academic_year: &str,
        event_type: GradeEventType,
        source: Option<String>,
    ) -> Self {
        Self {
            student_id: student_id.to_string(),
            unit_code: unit_code.to_string(),
            academic_year: academic_year.to_string(),
            event_type,
            source,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 成绩事件发布者 Trait
///
/// Engine 层定义，调度层实现
/// 通过 trait 实现依赖倒置，解除 Engine → 调度层的直接依赖
pub trait GradeEventPublisher: Send + Sync {
    /// 发布成绩事件
    ///
    /// # 返回
    /// - `Ok(task_id)`: 任务 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: GradeEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl GradeEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: GradeEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - student_id={}, unit_code={}, event_type={}",
            event.student_id,
            event.unit_code,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn GradeEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn GradeEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn GradeEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: GradeEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - student_id={}, event_type={}",
                    event.student_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_event_new() {
        let event = GradeEvent::new(
            "S2024001",
            "INF301",
            "2024-2025",
            GradeEventType::FinalGradeDirty,
            Some("EvaluationLedger".to_string()),
        );

        assert_eq!(event.student_id, "S2024001");
        assert_eq!(event.unit_code, "INF301");
        assert_eq!(event.event_type.as_str(), "FinalGradeDirty");
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = GradeEvent::new(
            "S2024001",
            "INF301",
            "2024-2025",
            GradeEventType::ManualTrigger,
            None,
        );

        let result = publisher.publish(event);
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());

        let event = GradeEvent::new(
            "S2024001",
            "INF301",
            "2024-2025",
            GradeEventType::ManualTrigger,
            None,
        );

        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_with_noop() {
        let noop = Arc::new(NoOpEventPublisher) as Arc<dyn GradeEventPublisher>;
        let publisher = OptionalEventPublisher::with_publisher(noop);
        assert!(publisher.is_configured());

        let event = GradeEvent::new(
            "S2024001",
            "INF301",
            "2024-2025",
            GradeEventType::FinalGradeRecomputed,
            None,
        );

        assert!(publisher.publish(event).is_ok());
    }
}
