// ==========================================
// 评议批处理端到端测试
// ==========================================
// 职责: 验证一键批处理（成绩 → 汇总 → 排名 → 统计 → 资格）与幂等重入
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod deliberation_session_test {
    use grade_engine::api::error::ApiError;

    use crate::test_helpers::{
        create_test_context, record_final_mark, seed_deliberation_params, seed_student,
        seed_unit_with_components,
    };

    #[tokio::test]
    async fn test_run_session_end_to_end() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_deliberation_params(&ctx, "L3", 50.0, 2);

        for sid in ["S001", "S002"] {
            seed_student(&ctx, sid, "L3", "2025-2026");
        }
        let (cc1, sn1) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);
        let (cc2, sn2) = seed_unit_with_components(&ctx, "MAT302", "L3", "2025-2026", 4);

        // S001 两个单元均获得；S002 一个单元未获得 → 须评议
        for (cc, sn) in [(&cc1, &sn1), (&cc2, &sn2)] {
            record_final_mark(&ctx, "S001", cc, 14.0);
            record_final_mark(&ctx, "S001", sn, 14.0);
        }
        record_final_mark(&ctx, "S002", &cc1, 12.0);
        record_final_mark(&ctx, "S002", &sn1, 12.0);
        record_final_mark(&ctx, "S002", &cc2, 8.0);
        record_final_mark(&ctx, "S002", &sn2, 8.0);

        let summary = ctx
            .deliberation_api
            .run_session("L3", "2025-2026")
            .await
            .expect("批处理失败");

        assert_eq!(summary.unit_count, 2);
        assert_eq!(summary.student_count, 2);
        assert_eq!(summary.final_grades_written, 4);
        assert_eq!(summary.recaps_recomputed, 2);
        assert_eq!(summary.units_with_statistics, 2);
        // 仅 S002 须评议；60% ≥ 50% 且未获得 1 ≤ 2 → 有资格
        assert_eq!(summary.eligibility_evaluated, 1);
        assert_eq!(summary.eligible_count, 1);

        // 排名已回写: S001 (13.0) 第 1，S002 (10.4) 第 2
        let recap1 = ctx
            .recap_repo
            .find("S001", "L3", "2025-2026")
            .expect("查询失败")
            .expect("汇总行缺失");
        let recap2 = ctx
            .recap_repo
            .find("S002", "L3", "2025-2026")
            .expect("查询失败")
            .expect("汇总行缺失");
        assert_eq!(recap1.rank, Some(1));
        assert_eq!(recap2.rank, Some(2));
        assert!(recap2.eligible_for_deliberation);
    }

    #[tokio::test]
    async fn test_run_session_is_idempotent() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_deliberation_params(&ctx, "L3", 50.0, 2);
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc, sn) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);
        record_final_mark(&ctx, "S001", &cc, 13.0);
        record_final_mark(&ctx, "S001", &sn, 13.0);

        ctx.deliberation_api
            .run_session("L3", "2025-2026")
            .await
            .expect("批处理失败");
        let grade_before = ctx
            .grade_repo
            .find("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");

        // 账本未变化: 重复执行不得触发任何覆盖写
        ctx.deliberation_api
            .run_session("L3", "2025-2026")
            .await
            .expect("批处理失败");
        let grade_after = ctx
            .grade_repo
            .find("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");

        assert_eq!(grade_after, grade_before);
        assert_eq!(grade_after.computation_version, 1);
    }

    #[tokio::test]
    async fn test_run_session_without_students_is_an_error() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        let result = ctx.deliberation_api.run_session("L3", "2025-2026").await;
        assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));
    }
}
