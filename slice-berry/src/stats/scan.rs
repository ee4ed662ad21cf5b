//! 单个时间步的全量扫描.

use super::LabelStatistics;
use crate::error::StatisticsError;
use crate::{Label, LabelVolume};
use ndarray::{ArrayView2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 扫描过程中不变的布局信息.
#[derive(Copy, Clone)]
struct Layout {
    labels: usize,
    /// 第 1 轴计数块的起始位置.
    base1: usize,
    /// 第 2 轴计数块的起始位置.
    base2: usize,
}

impl Layout {
    fn of(stats: &LabelStatistics) -> Self {
        Self {
            labels: stats.label_count(),
            base1: stats.axis_base(1),
            base2: stats.axis_base(2),
        }
    }

    /// 把第 `z` 个水平切片 `plane` (`[h, w]`) 的贡献累加到 `block`.
    fn accumulate(&self, block: &mut [usize], z: usize, plane: ArrayView2<Label>) -> Result<(), StatisticsError> {
        let l = self.labels;
        for ((y, x), &label) in plane.indexed_iter() {
            let p = label as usize;
            if p >= l {
                return Err(StatisticsError::LabelOutOfRange(label, l));
            }
            block[x * l + p] += 1;
            block[self.base1 + y * l + p] += 1;
            block[self.base2 + z * l + p] += 1;
        }
        Ok(())
    }
}

/// 对工作体数据的时间步 `t` 做一次全量扫描, 覆写统计索引中该时间步的全部计数.
///
/// 每个体素恰好被访问一次: 第 0 轴在 `x` 处、第 1 轴在 `y` 处、第 2 轴在 `z` 处计数加一.
/// 打开 `rayon` feature 且 `parallel` 为 `true` 时, 各水平切片被并行扫描后再求和,
/// 结果与串行扫描完全一致.
///
/// 统计索引的维度与体数据不符, 或体素标签超出统计范围时返回 `Err`, 且不修改统计索引.
pub fn scan_full_volume(
    volume: &LabelVolume,
    t: usize,
    stats: &mut LabelStatistics,
    parallel: bool,
) -> Result<(), StatisticsError> {
    if volume.extents() != stats.extents() {
        return Err(StatisticsError::ShapeMismatch {
            expected: stats.extents().to_vec(),
            actual: volume.extents().to_vec(),
        });
    }
    if t >= stats.time_steps() || t >= volume.time_steps() {
        return Err(StatisticsError::OutOfRange {
            time_step: t,
            axis: 0,
            slice: 0,
            label: 0,
        });
    }

    let layout = Layout::of(stats);
    let len = stats.block_len();
    let block = if parallel {
        scan_parallel(volume, t, layout, len)?
    } else {
        scan_sequential(volume, t, layout, len)?
    };
    stats.time_step_block_mut(t).copy_from_slice(&block);
    log::debug!("时间步 {t} 全量扫描完成 (parallel = {parallel})");
    Ok(())
}

fn scan_sequential(volume: &LabelVolume, t: usize, layout: Layout, len: usize) -> Result<Vec<usize>, StatisticsError> {
    let mut block = vec![0; len];
    for (z, plane) in volume.time_step(t).axis_iter(Axis(0)).enumerate() {
        layout.accumulate(&mut block, z, plane)?;
    }
    Ok(block)
}

#[cfg(feature = "rayon")]
fn scan_parallel(volume: &LabelVolume, t: usize, layout: Layout, len: usize) -> Result<Vec<usize>, StatisticsError> {
    volume
        .time_step(t)
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_fold(
            || vec![0; len],
            |mut block, (z, plane)| {
                layout.accumulate(&mut block, z, plane)?;
                Ok(block)
            },
        )
        .try_reduce(
            || vec![0; len],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                Ok(a)
            },
        )
}

#[cfg(not(feature = "rayon"))]
#[inline]
fn scan_parallel(volume: &LabelVolume, t: usize, layout: Layout, len: usize) -> Result<Vec<usize>, StatisticsError> {
    scan_sequential(volume, t, layout, len)
}

#[cfg(test)]
mod tests {
    use super::scan_full_volume;
    use crate::error::StatisticsError;
    use crate::stats::tests::{brute_force, random_volume};
    use crate::stats::LabelStatistics;

    #[test]
    fn test_full_scan_matches_brute_force() {
        let v = random_volume((2, 4, 5, 6), 4, 7);
        let mut s = LabelStatistics::new();
        s.reset(v.time_steps(), v.label_count(), v.extents());
        for t in 0..v.time_steps() {
            scan_full_volume(&v, t, &mut s, false).unwrap();
        }
        for t in 0..2 {
            for axis in 0..3 {
                for slice in 0..v.extent(axis) {
                    for label in 0..4 {
                        assert_eq!(s.get(t, axis, slice, label), Ok(brute_force(&v, t, axis, slice, label)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_parallel_scan_equals_sequential() {
        let v = random_volume((1, 9, 7, 5), 3, 42);
        let mut a = LabelStatistics::new();
        a.reset(1, 3, v.extents());
        let mut b = a.clone();
        scan_full_volume(&v, 0, &mut a, false).unwrap();
        scan_full_volume(&v, 0, &mut b, true).unwrap();
        assert_eq!(a, b);

        // 重复扫描不会累加.
        scan_full_volume(&v, 0, &mut b, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scan_rejects_mismatch() {
        let v = random_volume((1, 3, 3, 3), 3, 1);
        let mut s = LabelStatistics::new();
        s.reset(1, 3, [3, 3, 4]);
        assert!(matches!(
            scan_full_volume(&v, 0, &mut s, false),
            Err(StatisticsError::ShapeMismatch { .. })
        ));

        s.reset(1, 2, [3, 3, 3]);
        assert!(matches!(
            scan_full_volume(&v, 0, &mut s, true),
            Err(StatisticsError::LabelOutOfRange(2, 2))
        ));
        assert_eq!(s.get(0, 0, 0, 0), Ok(0));

        s.reset(1, 3, [3, 3, 3]);
        assert!(scan_full_volume(&v, 1, &mut s, false).is_err());
    }
}
