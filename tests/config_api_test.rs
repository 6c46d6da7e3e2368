// ==========================================
// 教学单元配置 API 测试
// ==========================================
// 职责: 验证权重闭合把关、归档不可变、历史删除保护
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod config_api_test {
    use chrono::Utc;
    use grade_engine::api::config_api::ComponentSpec;
    use grade_engine::api::error::ApiError;
    use grade_engine::config::GradingProfile;
    use grade_engine::domain::grade::DeliberationParams;
    use grade_engine::domain::types::{ComponentKind, UnitStatus};
    use grade_engine::domain::unit::TeachingUnit;

    use crate::test_helpers::{
        create_test_context, create_test_context_with_profile, record_final_mark, seed_student,
        seed_unit_with_components,
    };

    fn test_unit(code: &str, status: UnitStatus) -> TeachingUnit {
        let now = Utc::now();
        TeachingUnit {
            code: code.to_string(),
            name: format!("测试单元{}", code),
            academic_level: "L3".to_string(),
            program: "INFO".to_string(),
            credits: 6,
            academic_year: "2025-2026".to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn spec(kind: ComponentKind, weight: f64) -> ComponentSpec {
        ComponentSpec {
            kind,
            name: kind.to_db_str().to_string(),
            weight_pct: weight,
            point_scale: None,
            ordering: 0,
        }
    }

    #[test]
    fn test_component_weights_must_sum_to_100() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        ctx.config_api
            .create_unit(&test_unit("INF301", UnitStatus::Active))
            .expect("单元创建失败");

        // 30 + 60 = 90 ≠ 100 → 拒绝
        let result = ctx.config_api.replace_components(
            "INF301",
            &[
                spec(ComponentKind::ContinuousAssessment, 30.0),
                spec(ComponentKind::NormalSession, 60.0),
            ],
        );
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

        // 容差内允许: 33.33 + 33.33 + 33.34
        ctx.config_api
            .replace_components(
                "INF301",
                &[
                    spec(ComponentKind::ContinuousAssessment, 33.33),
                    spec(ComponentKind::NormalSession, 33.33),
                    spec(ComponentKind::Practical, 33.34),
                ],
            )
            .expect("容差内权重应通过");
    }

    #[test]
    fn test_duplicate_component_kind_rejected() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        ctx.config_api
            .create_unit(&test_unit("INF301", UnitStatus::Active))
            .expect("单元创建失败");

        let result = ctx.config_api.replace_components(
            "INF301",
            &[
                spec(ComponentKind::NormalSession, 50.0),
                spec(ComponentKind::NormalSession, 50.0),
            ],
        );
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_archived_unit_is_immutable() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        ctx.config_api
            .create_unit(&test_unit("INF301", UnitStatus::Archived))
            .expect("单元创建失败");

        let mut updated = test_unit("INF301", UnitStatus::Archived);
        updated.name = "改名".to_string();
        let result = ctx.config_api.update_unit(&updated);
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

        let result = ctx
            .config_api
            .replace_components("INF301", &[spec(ComponentKind::NormalSession, 100.0)]);
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
    }

    #[test]
    fn test_unit_with_history_cannot_be_deleted() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);
        record_final_mark(&ctx, "S001", &cc, 12.0);

        let result = ctx.config_api.delete_unit("INF301");
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

        // 无历史的单元允许删除
        seed_unit_with_components(&ctx, "MAT302", "L3", "2025-2026", 4);
        ctx.config_api.delete_unit("MAT302").expect("删除失败");
        assert!(ctx
            .unit_repo
            .find_by_code("MAT302")
            .expect("查询失败")
            .is_none());
    }

    #[test]
    fn test_component_with_history_cannot_be_dropped() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);
        record_final_mark(&ctx, "S001", &cc, 12.0);

        // 新列表不含平时组成（有账本历史）→ 整组拒绝
        let result = ctx
            .config_api
            .replace_components("INF301", &[spec(ComponentKind::NormalSession, 100.0)]);
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

        // 原组成仍在
        let components = ctx.config_api.list_components("INF301").expect("查询失败");
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn test_replace_keeps_component_id_for_existing_kind() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        let (cc, sn) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        // 调整权重: 已有类别原位更新，component_id 不变
        let replaced = ctx
            .config_api
            .replace_components(
                "INF301",
                &[
                    ComponentSpec {
                        kind: ComponentKind::ContinuousAssessment,
                        name: "平时成绩".to_string(),
                        weight_pct: 40.0,
                        point_scale: Some(20.0),
                        ordering: 1,
                    },
                    ComponentSpec {
                        kind: ComponentKind::NormalSession,
                        name: "正考".to_string(),
                        weight_pct: 60.0,
                        point_scale: Some(20.0),
                        ordering: 2,
                    },
                ],
            )
            .expect("替换失败");

        let ids: Vec<&str> = replaced.iter().map(|c| c.component_id.as_str()).collect();
        assert!(ids.contains(&cc.as_str()));
        assert!(ids.contains(&sn.as_str()));
        assert_eq!(replaced[0].weight_pct, 40.0);
    }

    #[test]
    fn test_missing_point_scale_falls_back_to_default() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        ctx.config_api
            .create_unit(&test_unit("INF301", UnitStatus::Active))
            .expect("单元创建失败");

        // 未指定满分的组成取默认 20 分制，显式满分保持原值
        let replaced = ctx
            .config_api
            .replace_components(
                "INF301",
                &[
                    spec(ComponentKind::ContinuousAssessment, 30.0),
                    ComponentSpec {
                        kind: ComponentKind::NormalSession,
                        name: "正考".to_string(),
                        weight_pct: 70.0,
                        point_scale: Some(100.0),
                        ordering: 2,
                    },
                ],
            )
            .expect("替换失败");

        assert_eq!(replaced[0].point_scale, 20.0);
        assert_eq!(replaced[1].point_scale, 100.0);
    }

    #[test]
    fn test_profile_default_point_scale_applies() {
        let profile = GradingProfile {
            default_point_scale: 10.0,
            ..GradingProfile::default()
        };
        let (_tmp, ctx) = create_test_context_with_profile(&profile).expect("测试上下文创建失败");
        ctx.config_api
            .create_unit(&test_unit("INF301", UnitStatus::Active))
            .expect("单元创建失败");

        let replaced = ctx
            .config_api
            .replace_components("INF301", &[spec(ComponentKind::NormalSession, 100.0)])
            .expect("替换失败");
        assert_eq!(replaced[0].point_scale, 10.0);

        // 持久化行同样取配置默认值
        let stored = ctx
            .component_repo
            .find_by_id(&replaced[0].component_id)
            .expect("查询失败")
            .expect("组成缺失");
        assert_eq!(stored.point_scale, 10.0);
    }

    #[test]
    fn test_invalid_unit_credits_rejected() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");

        let mut unit = test_unit("INF301", UnitStatus::Active);
        unit.credits = 0;
        assert!(matches!(
            ctx.config_api.create_unit(&unit),
            Err(ApiError::InvalidInput(_))
        ));

        unit.credits = 61;
        assert!(matches!(
            ctx.config_api.create_unit(&unit),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deliberation_params_validation() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");

        let result = ctx.config_api.set_deliberation_params(&DeliberationParams {
            academic_level: "L3".to_string(),
            min_capitalization_pct: 120.0,
            max_non_capitalized: 2,
            updated_at: Utc::now(),
        });
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));

        ctx.config_api
            .set_deliberation_params(&DeliberationParams {
                academic_level: "L3".to_string(),
                min_capitalization_pct: 80.0,
                max_non_capitalized: 2,
                updated_at: Utc::now(),
            })
            .expect("阈值写入失败");

        let stored = ctx
            .params_repo
            .find_by_level("L3")
            .expect("查询失败")
            .expect("阈值缺失");
        assert_eq!(stored.min_capitalization_pct, 80.0);
    }
}
