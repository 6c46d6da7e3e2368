// ==========================================
// 成绩批量导入测试
// ==========================================
// 职责: 验证 CSV 导入、逐行错误收集、导入后联动重算
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod importer_test {
    use grade_engine::domain::types::EntryMode;
    use grade_engine::importer::error::ImportError;
    use grade_engine::importer::mark_importer::MarkImporter;
    use std::io::Write;

    use crate::test_helpers::{create_test_context, seed_student, seed_unit_with_components};

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("CSV 文件创建失败");
        file.write_all(content.as_bytes()).expect("CSV 写入失败");
        path
    }

    #[tokio::test]
    async fn test_import_valid_rows() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        seed_student(&ctx, "S002", "L3", "2025-2026");
        let (cc, _) = seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        let dir = tempfile::tempdir().expect("临时目录创建失败");
        let path = write_csv(
            &dir,
            "marks.csv",
            "student_id,unit_code,component_kind,mark,entry_date,comment\n\
             S001,INF301,CC,12.5,2026-06-15,课堂表现良好\n\
             S002,INF301,CC,9.0,2026-06-15,\n",
        );

        let summary = ctx
            .importer
            .import_from_csv(&path, "secretary01")
            .await
            .expect("导入失败");

        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.ok_count, 2);
        assert_eq!(summary.failed_count, 0);

        let entry = ctx
            .entry_repo
            .find_by_student_component("S001", &cc)
            .expect("查询失败")
            .expect("账本行缺失");
        assert_eq!(entry.mark, 12.5);
        assert_eq!(entry.mode, EntryMode::Import);
        assert_eq!(entry.author, "secretary01");
        assert_eq!(entry.comment.as_deref(), Some("课堂表现良好"));
    }

    #[tokio::test]
    async fn test_bad_rows_are_collected_not_fatal() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");
        seed_student(&ctx, "S001", "L3", "2025-2026");
        seed_unit_with_components(&ctx, "INF301", "L3", "2025-2026", 6);

        let dir = tempfile::tempdir().expect("临时目录创建失败");
        let path = write_csv(
            &dir,
            "marks.csv",
            "student_id,unit_code,component_kind,mark,entry_date,comment\n\
             S001,INF301,CC,12.5,2026-06-15,\n\
             S001,INF301,XX,10.0,2026-06-15,\n\
             S001,INF301,SN,abc,2026-06-15,\n\
             S001,INF301,SN,25.0,2026-06-15,\n\
             GHOST,INF301,SN,10.0,2026-06-15,\n",
        );

        let summary = ctx
            .importer
            .import_from_csv(&path, "secretary01")
            .await
            .expect("导入失败");

        // 未知类别 / 非数值 / 分数越界 / 学生不存在 → 4 行失败，首行成功
        assert_eq!(summary.total_rows, 5);
        assert_eq!(summary.ok_count, 1);
        assert_eq!(summary.failed_count, 4);
        assert_eq!(summary.row_errors.len(), 4);
        assert_eq!(
            summary.row_errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
    }

    #[tokio::test]
    async fn test_missing_file_and_wrong_extension() {
        let (_tmp, ctx) = create_test_context().expect("测试上下文创建失败");

        let result = ctx
            .importer
            .import_from_csv(std::path::Path::new("/no/such/file.csv"), "secretary01")
            .await;
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));

        let dir = tempfile::tempdir().expect("临时目录创建失败");
        let path = write_csv(&dir, "marks.xlsx", "x");
        let result = ctx.importer.import_from_csv(&path, "secretary01").await;
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
