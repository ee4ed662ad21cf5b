//! 边界切片搜索.

use super::LabelStatistics;
use crate::{Label, AXES};

/// 目标切片两侧最近的、含有给定标签的切片. 满足 `lower < target < upper`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundingSlices {
    /// 下侧切片索引.
    pub lower: usize,
    /// 上侧切片索引.
    pub upper: usize,
}

impl BoundingSlices {
    /// 目标切片到下侧切片的相对距离.
    ///
    /// `target` 位于 `(lower, upper)` 内时取值 `(0, 1)`, 位于区间外时截断到 `[0, 1]`.
    #[inline]
    pub fn weight(&self, target: usize) -> f64 {
        relative_position(self.lower, target, self.upper)
    }
}

/// `target` 在 `[lower, upper]` 中的相对位置, 截断到 `[0, 1]`. 区间退化时为 `0`.
pub(crate) fn relative_position(lower: usize, target: usize, upper: usize) -> f64 {
    let span = upper.saturating_sub(lower);
    if span == 0 {
        return 0.0;
    }
    (target.saturating_sub(lower) as f64 / span as f64).min(1.0)
}

/// 在时间步 `t` 的第 `axis` 轴上, 搜索 `target` 两侧最近的含有 `label` 的切片.
///
/// 从 `target - 1` 向下、从 `target + 1` 向上逐个检查, 各取第一个计数为正的切片.
/// 任一侧找不到, 或 `target` 位于边缘 (`0` 或 `extent - 1`), 或任一参数越界时返回 `None`.
///
/// 这里不检查 `target` 本身是否已含有 `label`.
pub fn find_bounds(stats: &LabelStatistics, axis: usize, target: usize, t: usize, label: Label) -> Option<BoundingSlices> {
    if axis >= AXES || t >= stats.time_steps() || label as usize >= stats.label_count() {
        return None;
    }
    let extent = stats.extent(axis);
    if target == 0 || target + 1 >= extent {
        return None;
    }
    let hit = |s: &usize| stats.contains(t, axis, *s, label);
    let lower = (0..target).rev().find(hit)?;
    let upper = (target + 1..extent).find(hit)?;
    Some(BoundingSlices { lower, upper })
}

#[cfg(test)]
mod tests {
    use super::{find_bounds, BoundingSlices};
    use crate::stats::tests::{brute_force, random_volume};
    use crate::stats::{scan_full_volume, LabelStatistics};

    #[test]
    fn test_bounds_match_brute_force() {
        // 标签较多使得很多切片不含某些标签.
        let v = random_volume((1, 7, 6, 8), 40, 3);
        let mut s = LabelStatistics::new();
        s.reset(1, v.label_count(), v.extents());
        scan_full_volume(&v, 0, &mut s, false).unwrap();

        for axis in 0..3 {
            let extent = v.extent(axis);
            for target in 0..extent {
                for label in 0..40 {
                    let has = |i: usize| brute_force(&v, 0, axis, i, label) > 0;
                    let expected = if target == 0 || target + 1 == extent {
                        None
                    } else {
                        let lower = (0..target).rev().find(|&i| has(i));
                        let upper = (target + 1..extent).find(|&i| has(i));
                        lower.zip(upper).map(|(lower, upper)| BoundingSlices { lower, upper })
                    };
                    assert_eq!(find_bounds(&s, axis, target, 0, label), expected);
                }
            }
        }
    }

    #[test]
    fn test_weight() {
        let b = BoundingSlices { lower: 2, upper: 7 };
        assert!((b.weight(4) - 0.4).abs() < 1e-12);
        assert!((b.weight(6) - 0.8).abs() < 1e-12);

        // 区间外截断.
        assert_eq!(b.weight(0), 0.0);
        assert_eq!(b.weight(9), 1.0);
        assert_eq!(BoundingSlices { lower: 5, upper: 5 }.weight(5), 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut s = LabelStatistics::new();
        s.reset(1, 2, [5, 5, 5]);
        s.increment(0, 2, 0, 1, 1).unwrap();
        s.increment(0, 2, 4, 1, 1).unwrap();
        assert_eq!(find_bounds(&s, 2, 2, 0, 1), Some(BoundingSlices { lower: 0, upper: 4 }));
        assert_eq!(find_bounds(&s, 3, 2, 0, 1), None);
        assert_eq!(find_bounds(&s, 2, 2, 1, 1), None);
        assert_eq!(find_bounds(&s, 2, 2, 0, 2), None);
        assert_eq!(find_bounds(&s, 2, 0, 0, 1), None);
        assert_eq!(find_bounds(&s, 2, 4, 0, 1), None);
        assert_eq!(find_bounds(&LabelStatistics::new(), 0, 1, 0, 0), None);
    }
}
