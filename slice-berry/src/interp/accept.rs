//! 接受插值建议: 把插值结果合并进工作体数据.

use super::SliceInterpolator;
use crate::error::{InterpResult, InterpolationError};
use crate::{CuttingPlane, Label, LabelSet, LabelSlice, LabelSliceMut, OwnedLabelSlice};

/// 把预览 `preview` 中的非背景像素以 `overwrite` 写入 `target`. 返回被改写的像素个数.
///
/// 规则:
/// 1. 当前标签为背景时, 无条件写入;
/// 2. 否则, 当 `overwrite` 不为背景时, 跳过当前值被锁定的像素;
/// 3. 否则 (擦除), 只擦除当前值等于当前标签的像素.
///
/// 两者形状不符时 panic.
pub fn merge_preview(target: &mut LabelSliceMut, preview: &LabelSlice, labels: &LabelSet, overwrite: Label) -> usize {
    assert_eq!(target.shape(), preview.shape(), "切片形状不符");
    let active = labels.active();
    let writable = |current: Label| {
        if active == 0 {
            true
        } else if overwrite != 0 {
            !labels.is_locked(current)
        } else {
            current == active
        }
    };

    let mut written = 0;
    for (p, &v) in target.iter_mut().zip(preview.iter()) {
        if v != 0 && writable(*p) {
            written += usize::from(*p != overwrite);
            *p = overwrite;
        }
    }
    written
}

impl SliceInterpolator {
    /// 计算切片插值建议, 并以当前标签合并进工作体数据.
    ///
    /// 没有插值建议时返回 `Ok(false)`. 写入失败时返回 `Err`.
    pub fn accept_interpolation(&mut self, axis: usize, index: usize, plane: &CuttingPlane, t: usize) -> InterpResult<bool> {
        let Some(preview) = self.interpolate(axis, index, plane, t) else {
            return Ok(false);
        };
        self.merge_and_write(&preview, axis, index, t)?;
        Ok(true)
    }

    /// 对沿 `axis` 轴的每一个切片计算插值建议, 并全部合并进工作体数据.
    ///
    /// 所有建议都基于调用时的统计计算, 之后才依次写入, 因此写入不会影响其余切片的建议.
    /// 返回被写入的切片个数.
    pub fn accept_all_interpolations(&mut self, axis: usize, plane: &CuttingPlane, t: usize) -> InterpResult<usize> {
        let volume = self.working_image().ok_or(InterpolationError::NoWorkingImage)?;
        let (extent, geometry) = {
            let v = volume.borrow();
            if axis >= crate::AXES {
                return Err(InterpolationError::AxisOutOfRange(axis));
            }
            (v.extent(axis), *v.geometry())
        };

        let previews: Vec<_> = (0..extent)
            .filter_map(|index| {
                let p = plane.translated_to(&geometry, axis, index);
                self.interpolate(axis, index, &p, t).map(|s| (index, s))
            })
            .collect();
        for (index, preview) in previews.iter() {
            self.merge_and_write(preview, axis, *index, t)?;
        }
        log::info!("沿轴 {axis} 接受了 {} 个切片的插值建议", previews.len());
        Ok(previews.len())
    }

    fn merge_and_write(&mut self, preview: &OwnedLabelSlice, axis: usize, index: usize, t: usize) -> InterpResult<()> {
        let volume = self.working_image().ok_or(InterpolationError::NoWorkingImage)?;
        let (mut merged, labels) = {
            let v = volume.borrow();
            (v.slice_at(t, axis, index).to_owned(), v.labels().clone())
        };
        let active = labels.active();
        merge_preview(&mut merged.as_mutable(), &preview.as_immut(), &labels, active);
        self.write_slice(&merged.as_immut(), axis, index, t)
    }
}

#[cfg(test)]
mod tests {
    use super::merge_preview;
    use crate::interp::tests::scenario_volume;
    use crate::interp::{InterpolatorRegistry, SliceInterpolator};
    use crate::{CuttingPlane, LabelSet, OwnedLabelSlice};
    use ndarray::{array, Array2};

    fn labels(count: usize, active: u16, locked: &[u16]) -> LabelSet {
        let data = Array2::from_elem((1, 1), 0).insert_axis(ndarray::Axis(0)).insert_axis(ndarray::Axis(0));
        let mut v = crate::LabelVolume::new(data, Default::default()).unwrap();
        v.set_label_count(count).unwrap();
        v.set_active_label(active).unwrap();
        for &l in locked {
            v.lock_label(l).unwrap();
        }
        v.labels().clone()
    }

    #[test]
    fn test_merge_rules() {
        let preview = OwnedLabelSlice::from_raw(array![[1, 1, 1, 0]]);
        let origin = OwnedLabelSlice::from_raw(array![[0, 2, 3, 3]]);

        // 当前标签为背景: 无条件写入.
        let mut t = origin.clone();
        let n = merge_preview(&mut t.as_mutable(), &preview.as_immut(), &labels(4, 0, &[2]), 0);
        assert_eq!((n, t.into_raw()), (2, array![[0, 0, 0, 3]]));

        // 写入: 跳过被锁定的标签.
        let mut t = origin.clone();
        let n = merge_preview(&mut t.as_mutable(), &preview.as_immut(), &labels(4, 1, &[2]), 1);
        assert_eq!((n, t.into_raw()), (2, array![[1, 2, 1, 3]]));

        // 擦除: 只擦除当前标签.
        let mut t = OwnedLabelSlice::from_raw(array![[1, 2, 1, 1]]);
        let n = merge_preview(&mut t.as_mutable(), &preview.as_immut(), &labels(4, 1, &[]), 0);
        assert_eq!((n, t.into_raw()), (2, array![[0, 2, 0, 1]]));
    }

    #[test]
    fn test_accept_interpolation() {
        let registry = InterpolatorRegistry::new();
        let volume = scenario_volume();
        let interp = SliceInterpolator::new(&registry);
        interp.borrow_mut().set_working_image(Some(&volume));

        let geometry = *volume.borrow().geometry();
        let plane = CuttingPlane::axis_aligned(&geometry, 2, 4);
        assert!(interp.borrow_mut().accept_interpolation(2, 4, &plane, 0).unwrap());
        assert_eq!(volume.borrow().slice_at(0, 2, 4).count(1), 16);
        assert!(interp.borrow().statistics().contains(0, 2, 4, 1));

        // 已含有标签, 不再给出建议.
        assert!(!interp.borrow_mut().accept_interpolation(2, 4, &plane, 0).unwrap());
    }

    #[test]
    fn test_accept_all_fills_gaps() {
        let registry = InterpolatorRegistry::new();
        let volume = scenario_volume();
        let interp = SliceInterpolator::new(&registry);
        interp.borrow_mut().set_working_image(Some(&volume));

        let geometry = *volume.borrow().geometry();
        let plane = CuttingPlane::axis_aligned(&geometry, 2, 0);
        assert_eq!(interp.borrow_mut().accept_all_interpolations(2, &plane, 0).unwrap(), 4);
        let v = volume.borrow();
        for z in 2..=7 {
            assert_eq!(v.slice_at(0, 2, z).count(1), 16, "z = {z}");
        }
        for z in [0, 1, 8, 9] {
            assert!(v.slice_at(0, 2, z).is_background());
        }
        drop(v);

        let incremental = interp.borrow().statistics().clone();
        interp.borrow_mut().reset_label_count();
        assert_eq!(interp.borrow().statistics(), &incremental);
    }
}
