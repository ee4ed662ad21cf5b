//! 切片插值器: 对外入口.
//!
//! 插值器挂载一个工作体数据 (只持有 `Weak` 引用), 在其上维护标签统计索引,
//! 并针对当前标签给出空切片的插值建议.
//!
//! # 使用流程
//!
//! 1. 通过 [`SliceInterpolator::new`] 创建插值器, 并调用 `set_working_image` 挂载体数据.
//! 2. 每次修改某个切片之前调用 `set_changed_slice` (或直接用 `write_slice` 写入).
//! 3. 调用 `interpolate` 获得某个空切片的插值建议.

mod accept;
mod edt;
mod extract;
mod registry;
mod shape;

pub use accept::merge_preview;
pub use edt::{signed_distance, squared_edt};
pub use extract::{AxisAlignedExtractor, SliceExtractor};
pub use registry::InterpolatorRegistry;
pub use shape::{InterpolationRequest, ShapeBasedInterpolation, ShapeInterpolation};

use crate::consts::BACKGROUND;
use crate::error::{InterpResult, InterpolationError};
use crate::stats::{find_bounds, scan_full_volume, LabelStatistics, SliceChange};
use crate::{
    orthogonal_axes, CuttingPlane, Label, LabelSlice, LabelVolume, OwnedLabelSlice, ScanVolume,
    SharedScan, SharedVolume, VolumeId, AXES,
};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单线程共享的插值器.
pub type SharedInterpolator = Rc<RefCell<SliceInterpolator>>;

/// 插值器的运行参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpolatorSpec {
    /// 全量扫描时是否并行. 仅在打开 `rayon` feature 时生效.
    parallel_scan: bool,

    /// `write_slice` 发现统计过期 (标签个数变化) 时, 是否在写入后自动全量重扫.
    auto_rescan: bool,
}

impl Default for InterpolatorSpec {
    /// 打开 `rayon` feature 时并行扫描; 不自动重扫.
    fn default() -> Self {
        Self {
            parallel_scan: cfg!(feature = "rayon"),
            auto_rescan: false,
        }
    }
}

impl InterpolatorSpec {
    /// 设置全量扫描是否并行.
    #[inline]
    pub fn with_parallel_scan(mut self, parallel: bool) -> Self {
        self.parallel_scan = parallel;
        self
    }

    /// 设置统计过期时是否自动重扫.
    #[inline]
    pub fn with_auto_rescan(mut self, auto: bool) -> Self {
        self.auto_rescan = auto;
        self
    }

    /// 全量扫描是否并行.
    #[inline]
    pub fn parallel_scan(&self) -> bool {
        self.parallel_scan
    }

    /// 统计过期时是否自动重扫.
    #[inline]
    pub fn auto_rescan(&self) -> bool {
        self.auto_rescan
    }
}

/// 基于切片统计的标签插值器.
///
/// 所有操作都应在同一个线程中串行调用. 插值器只通过 `Weak` 引用观察工作体数据与参考图像,
/// 它们被释放后, 相关操作会以 [`InterpolationError::NoWorkingImage`] 失败.
///
/// # 注意
///
/// 调用插值器的方法时, 调用者不能持有工作体数据的 `RefCell` 可变借用;
/// 调用 `write_slice` 与接受插值结果时, 也不能持有其不可变借用.
pub struct SliceInterpolator {
    registry: InterpolatorRegistry,
    this: Weak<RefCell<SliceInterpolator>>,
    working: Option<(VolumeId, Weak<RefCell<LabelVolume>>)>,
    reference: Option<Weak<RefCell<ScanVolume>>>,
    stats: LabelStatistics,
    extractor: Box<dyn SliceExtractor>,
    algorithm: Box<dyn ShapeInterpolation>,
    spec: InterpolatorSpec,
}

impl SliceInterpolator {
    /// 以默认的切片提取器与插值算法创建插值器, 并关联到注册表 `registry`.
    pub fn new(registry: &InterpolatorRegistry) -> SharedInterpolator {
        Self::with_parts(
            registry,
            Box::new(AxisAlignedExtractor),
            Box::<ShapeBasedInterpolation>::default(),
            InterpolatorSpec::default(),
        )
    }

    /// 以指定的切片提取器、插值算法与运行参数创建插值器.
    pub fn with_parts(
        registry: &InterpolatorRegistry,
        extractor: Box<dyn SliceExtractor>,
        algorithm: Box<dyn ShapeInterpolation>,
        spec: InterpolatorSpec,
    ) -> SharedInterpolator {
        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                registry: registry.clone(),
                this: this.clone(),
                working: None,
                reference: None,
                stats: LabelStatistics::new(),
                extractor,
                algorithm,
                spec,
            })
        })
    }

    /// 运行参数.
    #[inline]
    pub fn spec(&self) -> &InterpolatorSpec {
        &self.spec
    }

    /// 当前的标签统计索引.
    #[inline]
    pub fn statistics(&self) -> &LabelStatistics {
        &self.stats
    }

    /// 当前挂载的 (仍然存活的) 工作体数据.
    #[inline]
    pub fn working_image(&self) -> Option<SharedVolume> {
        self.working.as_ref().and_then(|(_, w)| w.upgrade())
    }

    /// 当前挂载的 (仍然存活的) 参考图像.
    #[inline]
    pub fn reference_image(&self) -> Option<SharedScan> {
        self.reference.as_ref().and_then(Weak::upgrade)
    }

    /// 挂载工作体数据. `None` 表示卸载.
    ///
    /// 与当前体数据相同时什么都不做. 否则从注册表注销旧体数据、注册新体数据,
    /// 并重新全量统计. 与新体数据不匹配的参考图像会被丢弃.
    pub fn set_working_image(&mut self, volume: Option<&SharedVolume>) {
        let same = match (volume, &self.working) {
            (Some(v), Some((_, w))) => std::ptr::eq(Rc::as_ptr(v), w.as_ptr()),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }

        if let Some((id, _)) = self.working.take() {
            self.registry.unregister(id, &self.this);
        }
        match volume {
            Some(v) => {
                let id = v.borrow().id();
                self.working = Some((id, Rc::downgrade(v)));
                self.registry.register(id, self.this.clone());
                if let Some(scan) = self.reference_image() {
                    if !dims_match(&v.borrow(), &scan.borrow()) {
                        log::info!("参考图像与新的工作体数据不匹配, 已丢弃");
                        self.reference = None;
                    }
                }
                log::info!("挂载工作体数据 {id:?}");
            }
            None => {
                self.reference = None;
                log::info!("卸载工作体数据");
            }
        }
        self.reset_label_count();
    }

    /// 挂载参考图像. `None` 表示卸载, 总是成功.
    ///
    /// 只有在已挂载工作体数据, 且两者的时间步个数与三个空间维度都一致时才接受,
    /// 否则忽略并返回 `false`.
    pub fn set_reference_image(&mut self, scan: Option<&SharedScan>) -> bool {
        let Some(scan) = scan else {
            self.reference = None;
            return true;
        };
        let Some(volume) = self.working_image() else {
            log::warn!("没有挂载工作体数据, 忽略参考图像");
            return false;
        };
        if !dims_match(&volume.borrow(), &scan.borrow()) {
            log::warn!("参考图像的维度与工作体数据不一致, 忽略");
            return false;
        }
        self.reference = Some(Rc::downgrade(scan));
        true
    }

    /// 按当前工作体数据重建统计索引: 重新分配并对每个时间步全量扫描.
    ///
    /// 没有挂载工作体数据时清空统计索引.
    pub fn reset_label_count(&mut self) {
        let Some(volume) = self.working_image() else {
            self.stats = LabelStatistics::new();
            return;
        };
        let volume = volume.borrow();
        self.stats
            .reset(volume.time_steps(), volume.label_count(), volume.extents());
        for t in 0..volume.time_steps() {
            if let Err(e) = scan_full_volume(&volume, t, &mut self.stats, self.spec.parallel_scan) {
                log::error!("全量扫描失败: {e}");
                self.stats = LabelStatistics::new();
                return;
            }
        }
        log::debug!(
            "统计索引已重建: {} 个时间步, {} 个标签, 维度 {:?}",
            volume.time_steps(),
            volume.label_count(),
            volume.extents()
        );
    }

    /// 通知插值器: 时间步 `t` 沿 `axis` 轴的第 `index` 个切片即将被改写为 `slice`.
    ///
    /// 修改前的内容从工作体数据中读取, 因此必须在写回体数据 **之前** 调用.
    /// 标签个数与统计索引不一致时返回 [`InterpolationError::StatisticsStale`],
    /// 此时应调用 `reset_label_count`.
    pub fn set_changed_slice(&mut self, slice: &LabelSlice, axis: usize, index: usize, t: usize) -> InterpResult<()> {
        let volume = self.working_image().ok_or(InterpolationError::NoWorkingImage)?;
        let volume = volume.borrow();
        self.check_slice_args(&volume, axis, index, t)?;
        self.check_fresh(&volume)?;

        let expected = volume.slice_shape(axis);
        if slice.shape() != expected {
            return Err(InterpolationError::SliceShapeMismatch {
                expected,
                actual: slice.shape(),
            });
        }
        let change = SliceChange {
            axis,
            index,
            time_step: t,
            before: volume.slice_at(t, axis, index),
            after: slice.shallow_copy(),
        };
        let changed = change.apply(&mut self.stats)?;
        log::debug!("切片 (t = {t}, axis = {axis}, index = {index}) 有 {changed} 个像素变化");
        Ok(())
    }

    /// 增量更新统计索引, 并把 `slice` 写入工作体数据.
    ///
    /// 统计过期时, 如果打开了 `auto_rescan`, 则先写入再全量重扫; 否则返回错误, 不写入.
    pub fn write_slice(&mut self, slice: &LabelSlice, axis: usize, index: usize, t: usize) -> InterpResult<()> {
        let volume = self.working_image().ok_or(InterpolationError::NoWorkingImage)?;
        match self.set_changed_slice(slice, axis, index, t) {
            Ok(()) => {
                volume.borrow_mut().write_slice(t, axis, index, slice)?;
                Ok(())
            }
            Err(InterpolationError::StatisticsStale { recorded, current }) if self.spec.auto_rescan => {
                log::warn!("统计已过期 ({recorded} -> {current} 个标签), 写入后全量重扫");
                volume.borrow_mut().write_slice(t, axis, index, slice)?;
                self.reset_label_count();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// 对时间步 `t` 沿 `axis` 轴的第 `index` 个切片, 针对当前标签给出插值建议.
    ///
    /// 无法插值时返回 `None`. 其中切片提取失败以 `error` 级别记录日志,
    /// 其余 (常规的) 前置条件失败以 `debug` 级别记录.
    pub fn interpolate(&self, axis: usize, index: usize, plane: &CuttingPlane, t: usize) -> Option<OwnedLabelSlice> {
        match self.try_interpolate(axis, index, plane, t) {
            Ok(s) => Some(s),
            Err(e @ InterpolationError::Extraction(_)) => {
                log::error!("切片 (axis = {axis}, index = {index}) 插值失败: {e}");
                None
            }
            Err(e) => {
                log::debug!("切片 (axis = {axis}, index = {index}) 没有插值建议: {e}");
                None
            }
        }
    }

    /// 与 `interpolate` 相同, 但返回失败原因.
    ///
    /// 依次检查:
    /// 1. 已挂载工作体数据, 且统计索引未过期, 时间步与轴合法, 切割平面法向沿 `axis`;
    /// 2. `index` 合法且不在边缘;
    /// 3. 目标切片尚不含当前标签;
    /// 4. 两侧存在含当前标签的切片;
    /// 5. 两侧切片提取成功.
    ///
    /// 结果切片与目标切片形状相同, 插值形状内为当前标签, 其余为背景.
    pub fn try_interpolate(
        &self,
        axis: usize,
        index: usize,
        plane: &CuttingPlane,
        t: usize,
    ) -> InterpResult<OwnedLabelSlice> {
        let volume = self.working_image().ok_or(InterpolationError::NoWorkingImage)?;
        let volume = volume.borrow();
        self.check_fresh(&volume)?;
        if t >= self.stats.time_steps() {
            return Err(InterpolationError::TimeStepOutOfRange(t, self.stats.time_steps()));
        }
        if axis >= AXES {
            return Err(InterpolationError::AxisOutOfRange(axis));
        }
        if plane.normal_axis() != Some(axis) {
            return Err(InterpolationError::PlaneAxisMismatch(axis));
        }
        let extent = self.stats.extent(axis);
        if index >= extent {
            return Err(InterpolationError::SliceOutOfRange(index, extent));
        }
        if index == 0 || index + 1 == extent {
            return Err(InterpolationError::EdgeSlice(index));
        }

        let label = volume.active_label();
        if self.stats.contains(t, axis, index, label) {
            return Err(InterpolationError::AlreadySegmented { index, label });
        }
        let bounds = find_bounds(&self.stats, axis, index, t, label)
            .ok_or(InterpolationError::NoBoundingSlices { index, label })?;

        let geometry = volume.geometry();
        let shape = volume.slice_shape(axis);
        let extract = |i: usize| -> InterpResult<OwnedLabelSlice> {
            let s = self
                .extractor
                .extract(&volume, &plane.translated_to(geometry, axis, i), t)?;
            if s.shape() != shape {
                return Err(InterpolationError::SliceShapeMismatch {
                    expected: shape,
                    actual: s.shape(),
                });
            }
            Ok(mask(s, label))
        };
        let lower = extract(bounds.lower)?;
        let upper = extract(bounds.upper)?;

        let reference = self.reference_image();
        let reference = reference.as_ref().map(|r| r.borrow());
        let spacing = geometry.spacing();
        let (dim0, dim1) = orthogonal_axes(axis);
        let request = InterpolationRequest {
            lower: lower.as_immut(),
            lower_index: bounds.lower,
            upper: upper.as_immut(),
            upper_index: bounds.upper,
            target_index: index,
            reference_time_step: 0,
            label,
            reference: reference
                .as_ref()
                .filter(|r| t < r.time_steps())
                .map(|r| r.slice_at(t, axis, index)),
            spacing: (spacing[dim1], spacing[dim0]),
        };

        let mut output = OwnedLabelSlice::zeros(shape);
        self.algorithm.interpolate(&request, &mut output.as_mutable());
        log::debug!(
            "切片 (t = {t}, axis = {axis}, index = {index}) 由 {} 与 {} 插值得到",
            bounds.lower,
            bounds.upper
        );
        Ok(output)
    }

    /// 检查切片参数是否合法.
    fn check_slice_args(&self, volume: &LabelVolume, axis: usize, index: usize, t: usize) -> InterpResult<()> {
        if t >= volume.time_steps() || t >= self.stats.time_steps() {
            return Err(InterpolationError::TimeStepOutOfRange(t, self.stats.time_steps()));
        }
        if axis >= AXES {
            return Err(InterpolationError::AxisOutOfRange(axis));
        }
        if index >= volume.extent(axis) {
            return Err(InterpolationError::SliceOutOfRange(index, volume.extent(axis)));
        }
        Ok(())
    }

    /// 检查统计索引记录的标签个数是否仍与体数据一致.
    fn check_fresh(&self, volume: &LabelVolume) -> InterpResult<()> {
        let (recorded, current) = (self.stats.label_count(), volume.label_count());
        if recorded == current {
            Ok(())
        } else {
            log::warn!("统计已过期: 索引记录 {recorded} 个标签, 体数据现有 {current} 个");
            Err(InterpolationError::StatisticsStale { recorded, current })
        }
    }
}

impl Drop for SliceInterpolator {
    fn drop(&mut self) {
        if let Some((id, _)) = self.working.take() {
            self.registry.unregister(id, &self.this);
        }
    }
}

/// 查找挂载了 `volume` 的插值器. 有多个时返回最近挂载的那个.
#[inline]
pub fn interpolator_for(registry: &InterpolatorRegistry, volume: &SharedVolume) -> Option<SharedInterpolator> {
    registry.lookup(volume.borrow().id())
}

/// 参考图像与工作体数据的时间步个数与空间维度是否一致?
#[inline]
fn dims_match(volume: &LabelVolume, scan: &ScanVolume) -> bool {
    volume.time_steps() == scan.time_steps() && volume.extents() == scan.extents()
}

/// 只保留 `label`, 其余像素置为背景.
fn mask(mut slice: OwnedLabelSlice, label: Label) -> OwnedLabelSlice {
    slice
        .as_mutable()
        .iter_mut()
        .filter(|p| **p != label)
        .for_each(|p| *p = BACKGROUND);
    slice
}
