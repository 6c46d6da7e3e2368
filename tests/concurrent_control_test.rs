// ==========================================
// 乐观并发控制测试
// ==========================================
// 职责: 验证账本行版本检查在并发写入下恰好放行一个写者
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod concurrent_control_test {
    use grade_engine::api::error::ApiError;
    use grade_engine::domain::evaluation::{EntryPatch, RecordEntryRequest};
    use grade_engine::domain::types::EntryMode;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::{
        create_test_context, seed_student, seed_unit_with_components, test_date,
    };

    #[test]
    fn test_stale_version_is_rejected_sequentially() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        let entry = ctx
            .grade_api
            .record_entry(&RecordEntryRequest {
                student_id: "S001".to_string(),
                component_id: cc.clone(),
                mark: 12.0,
                entry_date: test_date(),
                author: "teacher01".to_string(),
                mode: EntryMode::Manual,
                comment: None,
            })
            .expect("录入失败");
        assert_eq!(entry.version, 1);

        let patch = EntryPatch {
            mark: Some(14.0),
            entry_date: None,
            comment: None,
        };

        // 第一次写: version 1 → 2
        let updated = ctx
            .grade_api
            .update_entry(&entry.entry_id, &patch, 1)
            .expect("更新失败");
        assert_eq!(updated.version, 2);

        // 仍持旧版本的第二次写必须被拒绝
        let result = ctx.grade_api.update_entry(&entry.entry_id, &patch, 1);
        assert!(matches!(result, Err(ApiError::ConcurrentModification(_))));
    }

    #[test]
    fn test_two_writers_same_version_exactly_one_wins() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        let (cc, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        let entry = ctx
            .grade_api
            .record_entry(&RecordEntryRequest {
                student_id: "S001".to_string(),
                component_id: cc.clone(),
                mark: 12.0,
                entry_date: test_date(),
                author: "teacher01".to_string(),
                mode: EntryMode::Manual,
                comment: None,
            })
            .expect("录入失败");

        let grade_api = ctx.grade_api.clone();
        let entry_id = Arc::new(entry.entry_id.clone());

        let mut handles = Vec::new();
        for mark in [15.0, 16.0] {
            let api = grade_api.clone();
            let id = entry_id.clone();
            handles.push(thread::spawn(move || {
                let patch = EntryPatch {
                    mark: Some(mark),
                    entry_date: None,
                    comment: None,
                };
                api.update_entry(&id, &patch, 1)
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("线程执行失败"))
            .collect();

        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        let conflict_count = results
            .iter()
            .filter(|r| matches!(r, Err(ApiError::ConcurrentModification(_))))
            .count();

        // 同一期望版本的两个写者: 恰好一个成功，另一个冲突
        assert_eq!(ok_count, 1);
        assert_eq!(conflict_count, 1);

        let stored = ctx
            .entry_repo
            .find_by_id(&entry.entry_id)
            .expect("查询失败")
            .expect("账本行缺失");
        assert_eq!(stored.version, 2);
        assert!(stored.mark == 15.0 || stored.mark == 16.0);
    }
}
