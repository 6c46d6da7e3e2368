// ==========================================
// 成绩聚合与评议引擎 - 评估账本引擎
// ==========================================
// 职责: 成绩录入 / 修改 / 状态流转，维护账本不变式
// 红线: 同一 (学生, 组成) 至多一条记录；重复提交走更新并恰好 +1 版本
// 红线: 进出 FINAL/RETAKE 的每次成功写入都必须标脏所属最终成绩
// ==========================================

use crate::domain::evaluation::{EntryPatch, EvaluationEntry, RecordEntryRequest};
use crate::domain::types::EntryStatus;
use crate::domain::unit::EvaluationComponent;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::events::{GradeEvent, GradeEventPublisher, GradeEventType, OptionalEventPublisher};
use crate::engine::grade_core::GradeCore;
use crate::repository::{
    EvaluationComponentRepository, EvaluationEntryRepository, StudentRepository,
    TeachingUnitRepository,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// EvaluationLedger - 评估账本引擎
// ==========================================
pub struct EvaluationLedger {
    // 仓储依赖
    entry_repo: Arc<EvaluationEntryRepository>,
    component_repo: Arc<EvaluationComponentRepository>,
    unit_repo: Arc<TeachingUnitRepository>,
    student_repo: Arc<StudentRepository>,

    // 事件发布器 (依赖倒置: Engine 定义 trait, 调度层实现)
    event_publisher: OptionalEventPublisher,
}

impl EvaluationLedger {
    /// 创建新的EvaluationLedger实例
    pub fn new(
        entry_repo: Arc<EvaluationEntryRepository>,
        component_repo: Arc<EvaluationComponentRepository>,
        unit_repo: Arc<TeachingUnitRepository>,
        student_repo: Arc<StudentRepository>,
        event_publisher: Option<Arc<dyn GradeEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            entry_repo,
            component_repo,
            unit_repo,
            student_repo,
            event_publisher,
        }
    }

    /// 录入成绩（存在即更新）
    ///
    /// # 规则
    /// - mark 必须落在 [0, point_scale]，否则 InvalidRange
    /// - 组成 / 学生必须存在，否则 UnknownComponent / UnknownStudent
    /// - 已存在 (学生, 组成) 记录时覆盖 mark/entry_date/comment，version 恰好 +1
    /// - mark_over_20 = mark × 20 / point_scale（point_scale 为 0 时取 0）
    #[instrument(skip(self, request), fields(student_id = %request.student_id, component_id = %request.component_id))]
    pub fn record_entry(&self, request: &RecordEntryRequest) -> EngineResult<EvaluationEntry> {
        let component = self.resolve_component(&request.component_id)?;
        self.resolve_student(&request.student_id)?;

        if !GradeCore::mark_in_range(request.mark, component.point_scale) {
            return Err(EngineError::InvalidRange {
                mark: request.mark,
                max: component.point_scale,
            });
        }

        let now = Utc::now();
        let candidate = EvaluationEntry {
            entry_id: Uuid::new_v4().to_string(),
            student_id: request.student_id.clone(),
            component_id: request.component_id.clone(),
            mark: request.mark,
            mark_over_20: GradeCore::normalize_mark(request.mark, component.point_scale),
            entry_date: request.entry_date,
            author: request.author.clone(),
            status: EntryStatus::Provisional,
            mode: request.mode,
            comment: request.comment.clone(),
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let written = self
            .entry_repo
            .upsert_mark(&candidate)
            .map_err(EngineError::from_repo)?;

        tracing::info!(
            entry_id = %written.entry_id,
            version = written.version,
            mark = written.mark,
            author = %written.author,
            "成绩已录入"
        );

        // 覆盖了 FINAL/RETAKE 行 → 所属最终成绩失效
        if written.status.counts_toward_final_grade() {
            self.mark_final_grade_dirty(&component, &written.student_id);
        }

        Ok(written)
    }

    /// 修改账本行（带乐观并发检查）
    ///
    /// # 并发控制
    /// expected_version 来自调用方最近一次读取；不匹配返回 ConcurrentModification，
    /// 调用方应重读后重试，绝不静默覆盖
    #[instrument(skip(self, patch))]
    pub fn update_entry(
        &self,
        entry_id: &str,
        patch: &EntryPatch,
        expected_version: i32,
    ) -> EngineResult<EvaluationEntry> {
        let entry = self.resolve_entry(entry_id)?;
        let component = self.resolve_component(&entry.component_id)?;

        let new_mark = patch.mark.unwrap_or(entry.mark);
        if !GradeCore::mark_in_range(new_mark, component.point_scale) {
            return Err(EngineError::InvalidRange {
                mark: new_mark,
                max: component.point_scale,
            });
        }

        let updated = EvaluationEntry {
            mark: new_mark,
            mark_over_20: GradeCore::normalize_mark(new_mark, component.point_scale),
            entry_date: patch.entry_date.unwrap_or(entry.entry_date),
            comment: match &patch.comment {
                Some(c) => c.clone(),
                None => entry.comment.clone(),
            },
            version: expected_version,
            updated_at: Utc::now(),
            ..entry
        };

        self.entry_repo
            .update_with_version_check(&updated)
            .map_err(EngineError::from_repo)?;

        let written = self.resolve_entry(entry_id)?;

        if written.status.counts_toward_final_grade() {
            self.mark_final_grade_dirty(&component, &written.student_id);
        }

        Ok(written)
    }

    /// 状态流转
    ///
    /// # 状态机
    /// - {PENDING, PROVISIONAL} → {PROVISIONAL, FINAL, CANCELLED, RETAKE}
    /// - FINAL → {CANCELLED, RETAKE}   (定稿不可静默回退为暂定)
    /// - CANCELLED 为终态
    /// - RETAKE → {FINAL, CANCELLED}
    #[instrument(skip(self))]
    pub fn set_status(
        &self,
        entry_id: &str,
        new_status: EntryStatus,
        actor: &str,
    ) -> EngineResult<EvaluationEntry> {
        let entry = self.resolve_entry(entry_id)?;

        if !entry.status.can_transition_to(new_status) {
            return Err(EngineError::InvalidStatusTransition {
                from: entry.status.to_db_str().to_string(),
                to: new_status.to_db_str().to_string(),
            });
        }

        self.entry_repo
            .update_status(entry_id, new_status, Utc::now())
            .map_err(EngineError::from_repo)?;

        tracing::info!(
            entry_id = %entry_id,
            from = %entry.status,
            to = %new_status,
            actor = %actor,
            "账本状态已流转"
        );

        // 进出 FINAL/RETAKE 均需标脏所属最终成绩
        if entry.status.counts_toward_final_grade() || new_status.counts_toward_final_grade() {
            let component = self.resolve_component(&entry.component_id)?;
            self.mark_final_grade_dirty(&component, &entry.student_id);
        }

        self.resolve_entry(entry_id)
    }

    /// 解析账本行（NotFound 直接上抛）
    fn resolve_entry(&self, entry_id: &str) -> EngineResult<EvaluationEntry> {
        self.entry_repo.find_by_id(entry_id)?.ok_or_else(|| {
            EngineError::Repository(crate::repository::RepositoryError::NotFound {
                entity: "EvaluationEntry".to_string(),
                id: entry_id.to_string(),
            })
        })
    }

    /// 解析评估组成（UnknownComponent）
    fn resolve_component(&self, component_id: &str) -> EngineResult<EvaluationComponent> {
        self.component_repo
            .find_by_id(component_id)?
            .ok_or_else(|| EngineError::UnknownComponent(component_id.to_string()))
    }

    /// 解析学生（UnknownStudent）
    fn resolve_student(&self, student_id: &str) -> EngineResult<()> {
        self.student_repo
            .find_by_id(student_id)?
            .map(|_| ())
            .ok_or_else(|| EngineError::UnknownStudent(student_id.to_string()))
    }

    /// 标脏所属最终成绩（发布事件，失败仅记日志——重算由批处理兜底）
    fn mark_final_grade_dirty(&self, component: &EvaluationComponent, student_id: &str) {
        let academic_year = match self.unit_repo.find_by_code(&component.unit_code) {
            Ok(Some(unit)) => unit.academic_year,
            _ => {
                tracing::warn!(
                    unit_code = %component.unit_code,
                    "标脏失败: 教学单元不存在，等待批处理重算兜底"
                );
                return;
            }
        };

        let event = GradeEvent::new(
            student_id,
            &component.unit_code,
            &academic_year,
            GradeEventType::FinalGradeDirty,
            Some("EvaluationLedger".to_string()),
        );

        if let Err(e) = self.event_publisher.publish(event) {
            tracing::warn!(
                student_id = %student_id,
                unit_code = %component.unit_code,
                error = %e,
                "成绩事件发布失败，等待批处理重算兜底"
            );
        }
    }
}
