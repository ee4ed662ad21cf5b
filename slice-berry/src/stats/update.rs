//! 单切片增量更新.

use super::LabelStatistics;
use crate::error::StatisticsError;
use crate::{orthogonal_axes, LabelSlice, AXES};

/// 某个切片的一次净变化: 从 `before` 变为 `after`.
///
/// 两者的形状都必须是该切片在体数据中的形状: 列沿 `dim0` 增长, 行沿 `dim1` 增长,
/// 其中 `(dim0, dim1) = orthogonal_axes(axis)`.
pub struct SliceChange<'a> {
    /// 切片法向所在的轴.
    pub axis: usize,
    /// 切片索引.
    pub index: usize,
    /// 时间步.
    pub time_step: usize,
    /// 修改前的内容.
    pub before: LabelSlice<'a>,
    /// 修改后的内容.
    pub after: LabelSlice<'a>,
}

impl SliceChange<'_> {
    /// 将这次变化应用到统计索引. 返回发生变化的像素个数.
    ///
    /// 对每个变化的像素 `(行 j, 列 i)`, 在 `(axis, index)`, `(dim0, i)`, `(dim1, j)`
    /// 三处将旧标签计数减一、新标签计数加一. 结果与对修改后体数据全量扫描一致.
    ///
    /// 先完成全部检查再修改, 返回 `Err` 时统计索引保持原样.
    pub fn apply(&self, stats: &mut LabelStatistics) -> Result<usize, StatisticsError> {
        self.validate(stats)?;
        let (t, axis, index) = (self.time_step, self.axis, self.index);
        let (dim0, dim1) = orthogonal_axes(axis);

        let mut changed = 0;
        for (((j, i), &old), &new) in self.before.indexed_iter().zip(self.after.iter()) {
            if old == new {
                continue;
            }
            changed += 1;
            for (a, s) in [(axis, index), (dim0, i), (dim1, j)] {
                stats.increment(t, a, s, old, -1)?;
                stats.increment(t, a, s, new, 1)?;
            }
        }
        Ok(changed)
    }

    fn validate(&self, stats: &LabelStatistics) -> Result<(), StatisticsError> {
        let out_of_range = |label| StatisticsError::OutOfRange {
            time_step: self.time_step,
            axis: self.axis,
            slice: self.index,
            label,
        };
        if self.axis >= AXES || self.time_step >= stats.time_steps() || self.index >= stats.extent(self.axis) {
            return Err(out_of_range(0));
        }

        let (dim0, dim1) = orthogonal_axes(self.axis);
        let expected = (stats.extent(dim1), stats.extent(dim0));
        for actual in [self.before.shape(), self.after.shape()] {
            if actual != expected {
                return Err(StatisticsError::ShapeMismatch {
                    expected: vec![expected.0, expected.1],
                    actual: vec![actual.0, actual.1],
                });
            }
        }

        let labels = stats.label_count();
        for s in [&self.before, &self.after] {
            match s.max_label() {
                Some(m) if m as usize >= labels => return Err(StatisticsError::LabelOutOfRange(m, labels)),
                _ => {}
            }
        }
        Ok(())
    }
}
