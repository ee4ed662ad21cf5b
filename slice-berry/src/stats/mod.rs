//! 标签统计索引: 每个时间步、每个轴、每个切片、每个标签的体素计数.
//!
//! 对于时间步 `t`, 第 `a` 轴第 `i` 个切片上标签 `l` 的计数, 等于
//! 该时间步中 "第 `a` 个坐标为 `i` 且值为 `l`" 的体素个数.
//! 这使得 "某切片是否含有某标签" 的查询成为 O(1) 操作.

mod scan;
mod search;
mod update;

pub use scan::scan_full_volume;
pub use search::{find_bounds, BoundingSlices};
pub(crate) use search::relative_position;
pub use update::SliceChange;

use crate::error::StatisticsError;
use crate::{Label, AXES};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 标签统计索引.
///
/// 数据以扁平数组存储: 每个时间步占据 `(e0 + e1 + e2) * labels` 个计数器,
/// 第 `a` 轴的计数块从 `(e0 + ... + e(a-1)) * labels` 开始,
/// 块内 `(slice, label)` 位于 `slice * labels + label`.
///
/// 计数被减为负数被视为程序错误, 程序直接 panic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelStatistics {
    time_steps: usize,
    labels: usize,
    extents: [usize; 3],
    counts: Vec<usize>,
}

impl LabelStatistics {
    /// 创建空的统计索引. 在 `reset` 之前, 任何访问都会越界.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 丢弃所有计数, 按给定维度重新分配并清零.
    pub fn reset(&mut self, time_steps: usize, labels: usize, extents: [usize; 3]) {
        self.time_steps = time_steps;
        self.labels = labels;
        self.extents = extents;
        self.counts.clear();
        self.counts.resize(time_steps * self.block_len(), 0);
    }

    /// 时间步个数.
    #[inline]
    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// 标签个数.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels
    }

    /// 按轴序排列的三个空间维度大小.
    #[inline]
    pub fn extents(&self) -> [usize; 3] {
        self.extents
    }

    /// 第 `axis` 轴的切片个数. `axis > 2` 时 panic.
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.extents[axis]
    }

    /// 是否没有任何计数器 (未 `reset`, 或某一维度为 0).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// 单个时间步的计数器个数.
    #[inline]
    pub(crate) fn block_len(&self) -> usize {
        self.extents.iter().sum::<usize>() * self.labels
    }

    /// 第 `axis` 轴的计数块在时间步块内的起始位置.
    #[inline]
    pub(crate) fn axis_base(&self, axis: usize) -> usize {
        self.extents[..axis].iter().sum::<usize>() * self.labels
    }

    /// 计算 `(t, axis, slice)` 对应切片的计数在扁平数组中的起始位置.
    fn slice_offset(&self, t: usize, axis: usize, slice: usize, label: Label) -> Result<usize, StatisticsError> {
        if t >= self.time_steps || axis >= AXES || slice >= self.extents[axis] || label as usize >= self.labels {
            return Err(StatisticsError::OutOfRange {
                time_step: t,
                axis,
                slice,
                label,
            });
        }
        Ok(t * self.block_len() + self.axis_base(axis) + slice * self.labels)
    }

    /// 获取时间步 `t`, 第 `axis` 轴第 `slice` 个切片上标签 `label` 的体素个数.
    #[inline]
    pub fn get(&self, t: usize, axis: usize, slice: usize, label: Label) -> Result<usize, StatisticsError> {
        let offset = self.slice_offset(t, axis, slice, label)?;
        Ok(self.counts[offset + label as usize])
    }

    /// 第 `axis` 轴第 `slice` 个切片是否含有标签 `label`? 越界时返回 `false`.
    #[inline]
    pub fn contains(&self, t: usize, axis: usize, slice: usize, label: Label) -> bool {
        self.get(t, axis, slice, label).is_ok_and(|c| c > 0)
    }

    /// 获取某个切片上所有标签的计数, 以标签值为下标.
    pub fn slice_counts(&self, t: usize, axis: usize, slice: usize) -> Result<&[usize], StatisticsError> {
        let offset = self.slice_offset(t, axis, slice, 0)?;
        Ok(&self.counts[offset..offset + self.labels])
    }

    /// 将计数 `(t, axis, slice, label)` 加上 `delta`.
    ///
    /// 索引越界时返回 `Err`. 计数将变为负数时 panic.
    pub fn increment(
        &mut self,
        t: usize,
        axis: usize,
        slice: usize,
        label: Label,
        delta: isize,
    ) -> Result<(), StatisticsError> {
        let offset = self.slice_offset(t, axis, slice, label)? + label as usize;
        let old = self.counts[offset];
        self.counts[offset] = old.checked_add_signed(delta).unwrap_or_else(|| {
            panic!("计数 (t = {t}, axis = {axis}, slice = {slice}, label = {label}) = {old} 加上 {delta} 后为负数")
        });
        Ok(())
    }

    /// 时间步 `t` 的整个计数块. 越界时 panic.
    #[inline]
    pub(crate) fn time_step_block_mut(&mut self, t: usize) -> &mut [usize] {
        let len = self.block_len();
        &mut self.counts[t * len..(t + 1) * len]
    }
}
