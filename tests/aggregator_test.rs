// ==========================================
// 最终成绩聚合引擎测试
// ==========================================
// 职责: 验证加权聚合、部分评定不写分、幂等重算
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod aggregator_test {
    use grade_engine::domain::evaluation::RecordEntryRequest;
    use grade_engine::domain::types::{EntryMode, EntryStatus, Mention};
    use grade_engine::engine::aggregator::FinalGradeAggregator;

    use crate::test_helpers::{
        create_test_context, record_final_mark, seed_student, seed_unit_with_components, test_date,
    };

    #[test]
    fn test_weighted_aggregation_cc30_sn70() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc_id, sn_id) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        // 平时 12/20 权重 30% + 正考 14/20 权重 70%
        record_final_mark(&ctx, "S001", &cc_id, 12.0);
        record_final_mark(&ctx, "S001", &sn_id, 14.0);

        let grade = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");

        assert_eq!(grade.grade, 13.4);
        assert!(grade.capitalized);
        assert_eq!(grade.mention, Mention::FairlyGood);
    }

    #[test]
    fn test_no_qualifying_entries_writes_nothing() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc_id, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        // 仅暂定行: 不得被误读为 0 分
        ctx.grade_api
            .record_entry(&RecordEntryRequest {
                student_id: "S001".to_string(),
                component_id: cc_id,
                mark: 12.0,
                entry_date: test_date(),
                author: "teacher01".to_string(),
                mode: EntryMode::Manual,
                comment: None,
            })
            .expect("录入失败");

        let grade = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败");
        assert!(grade.is_none());
    }

    #[test]
    fn test_cancelling_last_qualifying_entry_removes_grade() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc_id, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        record_final_mark(&ctx, "S001", &cc_id, 12.0);
        assert!(ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .is_some());

        // 唯一 FINAL 行作废 → 存量成绩随之清除
        let entry = ctx
            .entry_repo
            .find_by_student_component("S001", &cc_id)
            .expect("查询失败")
            .expect("账本行缺失");
        ctx.grade_api
            .set_status(&entry.entry_id, EntryStatus::Cancelled, "jury01")
            .expect("作废失败");

        let grade = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败");
        assert!(grade.is_none());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc_id, sn_id) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        record_final_mark(&ctx, "S001", &cc_id, 12.0);
        record_final_mark(&ctx, "S001", &sn_id, 14.0);

        let aggregator = FinalGradeAggregator::new(
            ctx.entry_repo.clone(),
            ctx.unit_repo.clone(),
            ctx.grade_repo.clone(),
        );

        let first = aggregator
            .recompute_final_grade("S001", "INF301", "2025-2026")
            .expect("重算失败")
            .expect("最终成绩缺失");

        // 账本未变化: 重复重算保持行字节不变
        let second = aggregator
            .recompute_final_grade("S001", "INF301", "2025-2026")
            .expect("重算失败")
            .expect("最终成绩缺失");

        assert_eq!(second, first);
        assert_eq!(second.computation_version, first.computation_version);
        assert_eq!(second.computed_at, first.computed_at);
    }

    #[test]
    fn test_changed_ledger_bumps_computation_version() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc_id, sn_id) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        record_final_mark(&ctx, "S001", &cc_id, 12.0);
        let first = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");
        // 仅平时成绩定稿: 12×0.3 = 3.6
        assert_eq!(first.grade, 3.6);
        assert!(!first.capitalized);
        assert_eq!(first.computation_version, 1);

        record_final_mark(&ctx, "S001", &sn_id, 14.0);
        let second = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");
        assert_eq!(second.grade, 13.4);
        assert_eq!(second.computation_version, 2);
    }

    #[test]
    fn test_eliminated_and_fail_mentions() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        seed_student(&ctx, "S002", "L3", "2025-2026");
        let (cc_id, sn_id) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        // 加权 2.7 → 淘汰
        record_final_mark(&ctx, "S001", &cc_id, 3.0);
        record_final_mark(&ctx, "S001", &sn_id, 2.5);
        let grade = ctx
            .grade_api
            .get_final_grade("S001", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");
        assert_eq!(grade.mention, Mention::Eliminated);
        assert!(!grade.capitalized);

        // 加权 8.0 → 不及格（≥ 5）
        record_final_mark(&ctx, "S002", &cc_id, 8.0);
        record_final_mark(&ctx, "S002", &sn_id, 8.0);
        let grade = ctx
            .grade_api
            .get_final_grade("S002", "INF301", "2025-2026")
            .expect("查询失败")
            .expect("最终成绩缺失");
        assert_eq!(grade.mention, Mention::Fail);
    }
}
