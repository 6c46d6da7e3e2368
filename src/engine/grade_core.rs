// ==========================================
// 成绩聚合与评议引擎 - Grade Core 纯函数库
// ==========================================
// 职责: 提供分数折算、加权聚合、权重校验、描述统计的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::grade::CAPITALIZATION_THRESHOLD;

/// 权重闭合容差（百分比点）
pub const WEIGHT_EPSILON: f64 = 0.01;

// ==========================================
// GradeCore - 纯函数工具类
// ==========================================
pub struct GradeCore;

impl GradeCore {
    /// 两位小数四舍五入（0.5 远离零）
    ///
    /// 说明: f64::round 的 0.5 即远离零，与制度规定一致
    pub fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }

    /// 原始分折算 20 分制
    ///
    /// # 规则
    /// - mark_over_20 = mark × 20 / point_scale
    /// - point_scale = 0 时返回 0（避免除零，视为无效组成）
    pub fn normalize_mark(mark: f64, point_scale: f64) -> f64 {
        if point_scale == 0.0 {
            return 0.0;
        }
        mark * 20.0 / point_scale
    }

    /// 分数是否在组成允许范围内 [0, point_scale]
    pub fn mark_in_range(mark: f64, point_scale: f64) -> bool {
        mark >= 0.0 && mark <= point_scale
    }

    /// 聚合最终成绩
    ///
    /// # 规则
    /// - 每条记录贡献 = mark_over_20 × (weight_pct / 100)
    /// - 最终成绩 = 贡献之和，两位小数
    ///
    /// # 参数
    /// - contributions: (mark_over_20, weight_pct) 列表
    pub fn aggregate_final_grade(contributions: &[(f64, f64)]) -> f64 {
        let total: f64 = contributions
            .iter()
            .map(|(mark_over_20, weight_pct)| mark_over_20 * weight_pct / 100.0)
            .sum();
        Self::round2(total)
    }

    /// 是否获得学分（最终成绩 ≥ 10/20）
    pub fn is_capitalized(grade: f64) -> bool {
        grade >= CAPITALIZATION_THRESHOLD
    }

    /// 组成权重是否闭合（合计 100 ± 0.01；无组成时视为闭合）
    pub fn weights_are_valid(weights: &[f64]) -> bool {
        if weights.is_empty() {
            return true;
        }
        (Self::weights_sum(weights) - 100.0).abs() <= WEIGHT_EPSILON
    }

    /// 组成权重合计
    pub fn weights_sum(weights: &[f64]) -> f64 {
        weights.iter().sum()
    }

    /// 算术平均
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// 总体标准差（除以 N，不是 N-1）
    pub fn population_std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mean = Self::mean(values);
        let variance =
            values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }

    /// 百分位（线性插值法）
    ///
    /// # 规则
    /// - 秩 = (p / 100) × (N − 1)（0 起始）
    /// - 在 floor(秩) 与 ceil(秩) 的顺序统计量之间按小数部分插值
    /// - 四分位/中位数共用同一插值方法（p = 25 / 50 / 75）
    ///
    /// # 参数
    /// - sorted: 升序排列的样本
    /// - p: 百分位 [0, 100]
    pub fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        if sorted.len() == 1 {
            return sorted[0];
        }
        let rank = p / 100.0 * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        if lo == hi {
            return sorted[lo];
        }
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2_half_away_from_zero() {
        // 13.125 二进制可精确表示: ×100 = 1312.5，恰好落在 0.5 上
        assert_eq!(GradeCore::round2(13.125), 13.13);
        assert_eq!(GradeCore::round2(-13.125), -13.13);
        assert_eq!(GradeCore::round2(13.404), 13.4);
        assert_eq!(GradeCore::round2(10.0), 10.0);
    }

    #[test]
    fn test_normalize_mark() {
        assert_eq!(GradeCore::normalize_mark(12.0, 20.0), 12.0);
        assert_eq!(GradeCore::normalize_mark(45.0, 100.0), 9.0);
        // point_scale = 0 时返回 0，不得 panic
        assert_eq!(GradeCore::normalize_mark(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_aggregate_final_grade() {
        // CC 12/20 权重 30% + SN 14/20 权重 70% = 13.40
        let contributions = vec![(12.0, 30.0), (14.0, 70.0)];
        assert_eq!(GradeCore::aggregate_final_grade(&contributions), 13.4);
        assert!(GradeCore::is_capitalized(13.4));
    }

    #[test]
    fn test_weights_validation() {
        assert!(GradeCore::weights_are_valid(&[]));
        assert!(GradeCore::weights_are_valid(&[30.0, 70.0]));
        assert!(GradeCore::weights_are_valid(&[33.33, 33.33, 33.34]));
        // 容差 0.01
        assert!(GradeCore::weights_are_valid(&[30.0, 70.005]));
        assert!(!GradeCore::weights_are_valid(&[30.0, 70.02]));
        assert!(!GradeCore::weights_are_valid(&[30.0, 60.0]));
    }

    #[test]
    fn test_population_std_dev() {
        // 总体标准差除以 N: [2, 4, 4, 4, 5, 5, 7, 9] → 2.0
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((GradeCore::population_std_dev(&values) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = vec![8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0];
        // N=7: 中位数秩 = 3.0 → 14.0
        assert_eq!(GradeCore::percentile(&sorted, 50.0), 14.0);
        // Q1 秩 = 1.5 → 10 + (12-10)×0.5 = 11.0
        assert_eq!(GradeCore::percentile(&sorted, 25.0), 11.0);
        // Q3 秩 = 4.5 → 16 + (18-16)×0.5 = 17.0
        assert_eq!(GradeCore::percentile(&sorted, 75.0), 17.0);
        // 单样本
        assert_eq!(GradeCore::percentile(&[13.0], 75.0), 13.0);
    }
}
