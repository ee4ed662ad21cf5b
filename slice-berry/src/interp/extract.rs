//! 从体数据中提取切片.

use crate::error::ExtractError;
use crate::{CuttingPlane, LabelVolume, OwnedLabelSlice};

/// 按切割平面从标签体数据中提取二维切片.
pub trait SliceExtractor {
    /// 提取时间步 `t` 中被 `plane` 切到的切片.
    fn extract(&self, volume: &LabelVolume, plane: &CuttingPlane, t: usize) -> Result<OwnedLabelSlice, ExtractError>;
}

/// 只支持与坐标轴正交的切割平面. 平面位置四舍五入到最近的切片.
#[derive(Copy, Clone, Debug, Default)]
pub struct AxisAlignedExtractor;

impl SliceExtractor for AxisAlignedExtractor {
    fn extract(&self, volume: &LabelVolume, plane: &CuttingPlane, t: usize) -> Result<OwnedLabelSlice, ExtractError> {
        if t >= volume.time_steps() {
            return Err(ExtractError::TimeStepOutOfRange(t, volume.time_steps()));
        }
        let axis = plane.normal_axis().ok_or(ExtractError::ObliquePlane(plane.normal()))?;
        let geometry = volume.geometry();
        let (_, index) = geometry
            .affected_slice(volume.extents(), plane)
            .ok_or_else(|| ExtractError::OutsideVolume {
                axis,
                position: geometry.world_to_index(axis, plane.origin()[axis]),
            })?;
        Ok(volume.slice_at(t, axis, index).to_owned())
    }
}
