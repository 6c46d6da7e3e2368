// ==========================================
// 成绩聚合与评议引擎 - 教学单元配置 API
// ==========================================
// 职责: 教学单元 / 评估组成 / 评议阈值的配置入口
// 红线: 归档单元不可修改；存在评估历史的单元/组成不可删除
// 红线: 任一单元存在组成时，权重合计必须为 100 ± 0.01（写入点把关）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::grade::DeliberationParams;
use crate::domain::types::ComponentKind;
use crate::domain::unit::{EvaluationComponent, TeachingUnit, MAX_UNIT_CREDITS};
use crate::engine::error::EngineError;
use crate::engine::grade_core::GradeCore;
use crate::repository::{
    DeliberationParamsRepository, EvaluationComponentRepository, EvaluationEntryRepository,
    TeachingUnitRepository,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// 组成定义（配置写入用，不含 component_id——由 API 按类别对齐或新建）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub kind: ComponentKind,
    pub name: String,
    pub weight_pct: f64,
    /// 满分分值；缺省时用配置的默认满分制
    #[serde(default)]
    pub point_scale: Option<f64>,
    pub ordering: i32,
}

// ==========================================
// ConfigApi - 教学单元配置 API
// ==========================================
pub struct ConfigApi {
    unit_repo: Arc<TeachingUnitRepository>,
    component_repo: Arc<EvaluationComponentRepository>,
    entry_repo: Arc<EvaluationEntryRepository>,
    params_repo: Arc<DeliberationParamsRepository>,
    default_point_scale: f64, // ComponentSpec 未指定满分时的回退值（配置项）
}

impl ConfigApi {
    /// 创建新的ConfigApi实例
    pub fn new(
        unit_repo: Arc<TeachingUnitRepository>,
        component_repo: Arc<EvaluationComponentRepository>,
        entry_repo: Arc<EvaluationEntryRepository>,
        params_repo: Arc<DeliberationParamsRepository>,
        default_point_scale: f64,
    ) -> Self {
        Self {
            unit_repo,
            component_repo,
            entry_repo,
            params_repo,
            default_point_scale,
        }
    }

    /// 创建教学单元
    #[instrument(skip(self, unit), fields(code = %unit.code))]
    pub fn create_unit(&self, unit: &TeachingUnit) -> ApiResult<String> {
        Self::validate_unit(unit)?;
        let code = self.unit_repo.create(unit)?;
        tracing::info!(code = %code, "教学单元已创建");
        Ok(code)
    }

    /// 更新教学单元（归档单元拒绝）
    #[instrument(skip(self, unit), fields(code = %unit.code))]
    pub fn update_unit(&self, unit: &TeachingUnit) -> ApiResult<()> {
        Self::validate_unit(unit)?;

        let existing = self
            .unit_repo
            .find_by_code(&unit.code)?
            .ok_or_else(|| ApiError::NotFound(format!("教学单元(code={})不存在", unit.code)))?;

        if !existing.is_mutable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "教学单元{}已归档，不可修改",
                unit.code
            )));
        }

        self.unit_repo.update(unit)?;
        Ok(())
    }

    /// 删除教学单元（存在评估历史时拒绝）
    #[instrument(skip(self))]
    pub fn delete_unit(&self, code: &str) -> ApiResult<()> {
        self.unit_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::NotFound(format!("教学单元(code={})不存在", code)))?;

        if self.entry_repo.has_history_for_unit(code)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "教学单元{}存在评估历史，不可删除",
                code
            )));
        }

        for component in self.component_repo.find_by_unit(code)? {
            self.component_repo.delete(&component.component_id)?;
        }
        self.unit_repo.delete(code)?;

        tracing::info!(code = %code, "教学单元已删除");
        Ok(())
    }

    /// 整组替换教学单元的评估组成
    ///
    /// # 规则
    /// - 归档单元拒绝
    /// - 类别不得重复；权重 ∈ [0, 100]，合计 100 ± 0.01
    /// - 满分必须为正；未指定满分的组成落到配置的默认满分制
    /// - 按类别对齐: 已有类别原位更新（保留 component_id，账本行不脱钩），
    ///   新类别插入，落选类别仅在无账本历史时删除，否则整体拒绝
    #[instrument(skip(self, specs))]
    pub fn replace_components(
        &self,
        unit_code: &str,
        specs: &[ComponentSpec],
    ) -> ApiResult<Vec<EvaluationComponent>> {
        let unit = self
            .unit_repo
            .find_by_code(unit_code)?
            .ok_or_else(|| ApiError::NotFound(format!("教学单元(code={})不存在", unit_code)))?;

        if !unit.is_mutable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "教学单元{}已归档，不可修改",
                unit_code
            )));
        }

        Self::validate_specs(unit_code, specs, self.default_point_scale)?;

        let existing = self.component_repo.find_by_unit(unit_code)?;

        // 先做删除校验，保证整组操作不会部分生效
        let removed: Vec<&EvaluationComponent> = existing
            .iter()
            .filter(|c| !specs.iter().any(|s| s.kind == c.kind))
            .collect();
        for component in &removed {
            if self.entry_repo.has_history_for_component(&component.component_id)? {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "评估组成{}（{}）存在账本历史，不可删除",
                    component.component_id,
                    component.kind.to_db_str()
                )));
            }
        }

        let mut result = Vec::with_capacity(specs.len());
        for spec in specs {
            let point_scale = spec.point_scale.unwrap_or(self.default_point_scale);
            match existing.iter().find(|c| c.kind == spec.kind) {
                Some(current) => {
                    let updated = EvaluationComponent {
                        component_id: current.component_id.clone(),
                        unit_code: unit_code.to_string(),
                        kind: spec.kind,
                        name: spec.name.clone(),
                        weight_pct: spec.weight_pct,
                        point_scale,
                        ordering: spec.ordering,
                    };
                    self.component_repo.update(&updated)?;
                    result.push(updated);
                }
                None => {
                    let created = EvaluationComponent {
                        component_id: uuid::Uuid::new_v4().to_string(),
                        unit_code: unit_code.to_string(),
                        kind: spec.kind,
                        name: spec.name.clone(),
                        weight_pct: spec.weight_pct,
                        point_scale,
                        ordering: spec.ordering,
                    };
                    self.component_repo.create(&created)?;
                    result.push(created);
                }
            }
        }

        for component in removed {
            self.component_repo.delete(&component.component_id)?;
        }

        tracing::info!(
            unit_code = %unit_code,
            component_count = result.len(),
            "评估组成已替换"
        );

        Ok(result)
    }

    /// 查询教学单元的评估组成
    pub fn list_components(&self, unit_code: &str) -> ApiResult<Vec<EvaluationComponent>> {
        Ok(self.component_repo.find_by_unit(unit_code)?)
    }

    /// 写入层级评议阈值
    #[instrument(skip(self, params), fields(academic_level = %params.academic_level))]
    pub fn set_deliberation_params(&self, params: &DeliberationParams) -> ApiResult<()> {
        if params.min_capitalization_pct < 0.0 || params.min_capitalization_pct > 100.0 {
            return Err(ApiError::InvalidInput(format!(
                "最低学分获得百分比越界: {}（允许 [0, 100]）",
                params.min_capitalization_pct
            )));
        }
        if params.max_non_capitalized < 0 {
            return Err(ApiError::InvalidInput(format!(
                "未获学分单元上限不得为负: {}",
                params.max_non_capitalized
            )));
        }

        self.params_repo.upsert(params)?;
        tracing::info!(academic_level = %params.academic_level, "评议阈值已写入");
        Ok(())
    }

    /// 单元字段校验
    fn validate_unit(unit: &TeachingUnit) -> ApiResult<()> {
        if unit.code.trim().is_empty() {
            return Err(ApiError::InvalidInput("单元代码不能为空".to_string()));
        }
        if unit.credits <= 0 || unit.credits > MAX_UNIT_CREDITS {
            return Err(ApiError::InvalidInput(format!(
                "学分越界: {}（允许 [1, {}]）",
                unit.credits, MAX_UNIT_CREDITS
            )));
        }
        Ok(())
    }

    /// 组成定义整组校验（类别唯一、权重范围、权重闭合、满分为正）
    fn validate_specs(
        unit_code: &str,
        specs: &[ComponentSpec],
        default_point_scale: f64,
    ) -> ApiResult<()> {
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.kind == spec.kind) {
                return Err(ApiError::InvalidInput(format!(
                    "评估组成类别重复: {}",
                    spec.kind.to_db_str()
                )));
            }
            if spec.weight_pct < 0.0 || spec.weight_pct > 100.0 {
                return Err(ApiError::InvalidInput(format!(
                    "权重越界: {}（允许 [0, 100]）",
                    spec.weight_pct
                )));
            }
            let point_scale = spec.point_scale.unwrap_or(default_point_scale);
            if point_scale <= 0.0 {
                return Err(ApiError::InvalidInput(format!(
                    "满分必须为正: {}",
                    point_scale
                )));
            }
        }

        let weights: Vec<f64> = specs.iter().map(|s| s.weight_pct).collect();
        if !GradeCore::weights_are_valid(&weights) {
            return Err(EngineError::InvalidComponentWeights {
                unit_code: unit_code.to_string(),
                sum: GradeCore::weights_sum(&weights),
            }
            .into());
        }

        Ok(())
    }
}
