use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::{Array3, Array4, ArrayD, ArrayView3, Axis, Ix3, Ix4};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::MAX_LABEL_COUNT;
use crate::error::VolumeError;
use crate::{orthogonal_axes, Idx2d, Label, Voxel, AXES};

mod geometry;
pub mod slice;

pub use geometry::{CuttingPlane, VolumeGeometry};

pub use slice::{
    ImgWriteRaw, ImgWriteVis, LabelSlice, LabelSliceMut, OwnedLabelSlice, OwnedScanSlice,
    ScanSlice,
};

/// 单线程共享的标签体数据. 插值器只持有它的 `Weak` 引用.
pub type SharedVolume = Rc<RefCell<LabelVolume>>;

/// 单线程共享的参考体数据. 插值器只持有它的 `Weak` 引用.
pub type SharedScan = Rc<RefCell<ScanVolume>>;

static NEXT_VOLUME_ID: AtomicU64 = AtomicU64::new(1);

/// 体数据的不透明身份标识.
///
/// 每个被构造 (或被克隆) 出来的体数据都会获得一个进程内唯一的标识,
/// 插值器注册表以它为键, 而不是以指针为键.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(u64);

impl VolumeId {
    #[inline]
    fn next() -> Self {
        Self(NEXT_VOLUME_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 第 `axis` 个空间轴在单个时间步 `[z, h, w]` 存储中的位置.
#[inline]
const fn storage_axis(axis: usize) -> Axis {
    Axis(2 - axis)
}

/// nifti 数据按 `[w, h, z]` 或 `[w, h, z, t]` 组织, 这里统一转换成 `[t, z, h, w]`.
fn to_time_major<T: Clone>(data: ArrayD<T>) -> Result<Array4<T>, VolumeError> {
    let data = match data.ndim() {
        3 => data
            .into_dimensionality::<Ix3>()?
            .permuted_axes([2, 1, 0])
            .insert_axis(Axis(0)),
        4 => data
            .into_dimensionality::<Ix4>()?
            .permuted_axes([3, 2, 1, 0]),
        n => return Err(VolumeError::UnsupportedDimension(n)),
    };
    Ok(data.as_standard_layout().into_owned())
}

/// 从 nifti header 获取几何信息. 间距非法时退化为默认几何.
fn geometry_from_header(h: &NiftiHeader) -> VolumeGeometry {
    let [_, w, hh, z, ..] = h.pixdim;
    let spacing = [w as f64, hh as f64, z as f64];
    let origin = [h.quatern_x as f64, h.quatern_y as f64, h.quatern_z as f64];
    VolumeGeometry::new(origin, spacing).unwrap_or_else(|| {
        log::warn!("nifti header 中的体素间距 {spacing:?} 非法, 使用默认几何");
        VolumeGeometry::default()
    })
}

/// 检查 `[t, z, h, w]` 形状是否含有 0.
fn check_not_empty(shape: &[usize]) -> Result<(), VolumeError> {
    if shape.iter().any(|&d| d == 0) {
        Err(VolumeError::EmptyVolume(shape.to_vec()))
    } else {
        Ok(())
    }
}

/// 标签集合: 标签个数, 当前 (活动) 标签与被锁定的标签.
///
/// 合法标签值为 `0..count`. 被锁定的标签在接受插值结果时不会被覆写.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSet {
    count: usize,
    active: Label,
    locked: BTreeSet<Label>,
}

impl LabelSet {
    /// 创建包含 `count` 个标签的集合. 活动标签为第一个前景标签 (若存在), 否则为背景.
    ///
    /// `count` 为 0 时 panic.
    pub fn new(count: usize) -> Self {
        assert_ne!(count, 0, "标签集合至少包含背景标签");
        Self {
            count,
            active: if count > 1 { 1 } else { 0 },
            locked: BTreeSet::new(),
        }
    }

    /// 标签个数.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// 当前 (活动) 标签.
    #[inline]
    pub fn active(&self) -> Label {
        self.active
    }

    /// `label` 是否属于该集合?
    #[inline]
    pub fn contains(&self, label: Label) -> bool {
        (label as usize) < self.count
    }

    /// `label` 是否被锁定?
    #[inline]
    pub fn is_locked(&self, label: Label) -> bool {
        self.locked.contains(&label)
    }

    #[inline]
    fn check(&self, label: Label) -> Result<(), VolumeError> {
        if self.contains(label) {
            Ok(())
        } else {
            Err(VolumeError::LabelOutOfRange(label, self.count))
        }
    }
}

/// 3D/4D 标签体数据, 包括几何信息与标签集合. 标签值以 [`Label`] 保存.
///
/// 数据按 `[t, z, h, w]` 存储, 对外一律按轴序 `[axis0, axis1, axis2] = [w, h, z]` 访问.
///
/// # 不变量
///
/// 所有体素值都属于标签集合. 所有公开的写入方法都会检查这一点.
#[derive(Debug)]
pub struct LabelVolume {
    id: VolumeId,
    data: Array4<Label>,
    geometry: VolumeGeometry,
    labels: LabelSet,
}

/// 克隆得到的是另一个体数据, 因此会分配新的 [`VolumeId`].
impl Clone for LabelVolume {
    fn clone(&self) -> Self {
        Self {
            id: VolumeId::next(),
            data: self.data.clone(),
            geometry: self.geometry,
            labels: self.labels.clone(),
        }
    }
}

impl LabelVolume {
    /// 由 `[t, z, h, w]` 格式的 4D 数据创建标签体数据.
    ///
    /// 标签个数取 `最大体素值 + 1`. 任一维度为 0 时返回 `Err`.
    pub fn new(data: Array4<Label>, geometry: VolumeGeometry) -> Result<Self, VolumeError> {
        check_not_empty(data.shape())?;
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let count = data.iter().copied().max().unwrap_or(0) as usize + 1;
        Ok(Self {
            id: VolumeId::next(),
            data,
            geometry,
            labels: LabelSet::new(count),
        })
    }

    /// 由 `[z, h, w]` 格式的 3D 数据创建单时间步的标签体数据.
    #[inline]
    pub fn from_3d(data: Array3<Label>, geometry: VolumeGeometry) -> Result<Self, VolumeError> {
        Self::new(data.insert_axis(Axis(0)), geometry)
    }

    /// 打开 nii 文件格式的 3D/4D 标签. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let geometry = geometry_from_header(obj.header());
        let data = obj.into_volume().into_ndarray::<Label>()?;
        Self::new(to_time_major(data)?, geometry)
    }

    /// 转换为单线程共享的形式.
    #[inline]
    pub fn into_shared(self) -> SharedVolume {
        Rc::new(RefCell::new(self))
    }

    /// 身份标识.
    #[inline]
    pub fn id(&self) -> VolumeId {
        self.id
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 标签集合.
    #[inline]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// 标签个数.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.count
    }

    /// 当前 (活动) 标签. 插值总是针对该标签进行.
    #[inline]
    pub fn active_label(&self) -> Label {
        self.labels.active
    }

    /// 设置当前 (活动) 标签. 标签不属于标签集合时返回 `Err`.
    pub fn set_active_label(&mut self, label: Label) -> Result<(), VolumeError> {
        self.labels.check(label)?;
        self.labels.active = label;
        Ok(())
    }

    /// 新增一个标签并返回其值. 标签值超出 `Label` 的表示范围时返回 `Err`.
    pub fn add_label(&mut self) -> Result<Label, VolumeError> {
        let count = self.labels.count;
        let label = Label::try_from(count).map_err(|_| VolumeError::TooManyLabels(count + 1))?;
        self.labels.count += 1;
        Ok(label)
    }

    /// 直接设置标签个数.
    ///
    /// 缩减标签集合时, 如果被删除的标签仍被体素使用则返回 `Err`.
    /// 活动标签被删除时回退为背景, 被删除标签的锁定状态一并清除.
    pub fn set_label_count(&mut self, count: usize) -> Result<(), VolumeError> {
        if count == 0 {
            return Err(VolumeError::LabelOutOfRange(0, 0));
        }
        if count > MAX_LABEL_COUNT {
            return Err(VolumeError::TooManyLabels(count));
        }
        if count < self.labels.count {
            if let Some(&used) = self.data.iter().find(|&&p| p as usize >= count) {
                return Err(VolumeError::LabelInUse(used));
            }
            if self.labels.active as usize >= count {
                self.labels.active = 0;
            }
            self.labels.locked.retain(|&l| (l as usize) < count);
        }
        self.labels.count = count;
        Ok(())
    }

    /// 锁定标签 `label`. 标签不属于标签集合时返回 `Err`.
    pub fn lock_label(&mut self, label: Label) -> Result<(), VolumeError> {
        self.labels.check(label)?;
        self.labels.locked.insert(label);
        Ok(())
    }

    /// 解锁标签 `label`.
    #[inline]
    pub fn unlock_label(&mut self, label: Label) {
        self.labels.locked.remove(&label);
    }

    /// 时间步个数.
    #[inline]
    pub fn time_steps(&self) -> usize {
        self.data.shape()[0]
    }

    /// 按轴序排列的三个空间维度大小.
    #[inline]
    pub fn extents(&self) -> [usize; 3] {
        let &[_, z, h, w] = self.data.shape() else {
            unreachable!()
        };
        [w, h, z]
    }

    /// 第 `axis` 轴的切片个数. `axis > 2` 时 panic.
    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.extents()[axis]
    }

    /// 获取数据体素个数 (单个时间步).
    #[inline]
    pub fn size(&self) -> usize {
        self.extents().iter().product()
    }

    /// 沿 `axis` 轴的切片形状 (行, 列). 列沿 `dim0` 增长, 行沿 `dim1` 增长.
    #[inline]
    pub fn slice_shape(&self, axis: usize) -> Idx2d {
        let (dim0, dim1) = orthogonal_axes(axis);
        let e = self.extents();
        (e[dim1], e[dim0])
    }

    /// 检查 `(t, axis, index)` 是否指向一个存在的切片.
    #[inline]
    pub fn check_slice(&self, t: usize, axis: usize, index: usize) -> bool {
        t < self.time_steps() && axis < AXES && index < self.extent(axis)
    }

    /// 获取时间步 `t`, 位置 `pos` 处的体素值. 越界时 panic.
    #[inline]
    pub fn voxel(&self, t: usize, [x, y, z]: Voxel) -> Label {
        self.data[[t, z, y, x]]
    }

    /// 获取时间步 `t`, 位置 `pos` 处的体素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, t: usize, [x, y, z]: Voxel) -> Option<Label> {
        self.data.get([t, z, y, x]).copied()
    }

    /// 设置时间步 `t`, 位置 `pos` 处的体素值.
    ///
    /// 越界或标签不属于标签集合时返回 `Err`, 且不修改数据.
    pub fn set_voxel(&mut self, t: usize, [x, y, z]: Voxel, label: Label) -> Result<(), VolumeError> {
        self.labels.check(label)?;
        let index = [t, z, y, x];
        match self.data.get_mut(index) {
            Some(p) => {
                *p = label;
                Ok(())
            }
            None => Err(VolumeError::IndexOutOfRange {
                time_step: t,
                axis: AXES,
                index: x.max(y).max(z),
            }),
        }
    }

    /// 获得时间步 `t` 的 `[z, h, w]` 不可变视图. 越界时 panic.
    #[inline]
    pub fn time_step(&self, t: usize) -> ArrayView3<'_, Label> {
        self.data.index_axis(Axis(0), t)
    }

    /// 获取时间步 `t` 沿 `axis` 轴的第 `index` 个切片.
    ///
    /// 任一索引越界时 panic.
    #[inline]
    pub fn slice_at(&self, t: usize, axis: usize, index: usize) -> LabelSlice<'_> {
        LabelSlice::new(self.time_step(t).index_axis_move(storage_axis(axis), index))
    }

    /// 用 `slice` 覆写时间步 `t` 沿 `axis` 轴的第 `index` 个切片.
    ///
    /// 索引越界、形状不符或者存在不属于标签集合的像素时返回 `Err`, 且不修改数据.
    pub fn write_slice(
        &mut self,
        t: usize,
        axis: usize,
        index: usize,
        slice: &LabelSlice,
    ) -> Result<(), VolumeError> {
        if !self.check_slice(t, axis, index) {
            return Err(VolumeError::IndexOutOfRange {
                time_step: t,
                axis,
                index,
            });
        }
        let expected = self.slice_shape(axis);
        if slice.shape() != expected {
            return Err(VolumeError::SliceShapeMismatch {
                expected,
                actual: slice.shape(),
            });
        }
        if let Some(max) = slice.max_label() {
            self.labels.check(max)?;
        }
        let mut dst = LabelSliceMut::new(
            self.data
                .index_axis_mut(Axis(0), t)
                .index_axis_move(storage_axis(axis), index),
        );
        dst.assign(slice);
        Ok(())
    }

    /// 获取时间步 `t` 中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, t: usize, label: Label) -> usize {
        self.time_step(t).iter().filter(|p| **p == label).count()
    }
}

/// 3D/4D 参考图像 (如原始 CT 扫描), 体素值以 `f32` 保存.
///
/// 仅作为插值算法的辅助输入. 存储格式与 [`LabelVolume`] 相同.
#[derive(Debug)]
pub struct ScanVolume {
    id: VolumeId,
    data: Array4<f32>,
    geometry: VolumeGeometry,
}

impl ScanVolume {
    /// 由 `[t, z, h, w]` 格式的 4D 数据创建. 任一维度为 0 时返回 `Err`.
    pub fn new(data: Array4<f32>, geometry: VolumeGeometry) -> Result<Self, VolumeError> {
        check_not_empty(data.shape())?;
        Ok(Self {
            id: VolumeId::next(),
            data: data.as_standard_layout().into_owned(),
            geometry,
        })
    }

    /// 由 `[z, h, w]` 格式的 3D 数据创建单时间步的参考图像.
    #[inline]
    pub fn from_3d(data: Array3<f32>, geometry: VolumeGeometry) -> Result<Self, VolumeError> {
        Self::new(data.insert_axis(Axis(0)), geometry)
    }

    /// 打开 nii 文件格式的 3D/4D 扫描.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VolumeError> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let geometry = geometry_from_header(obj.header());
        let data = obj.into_volume().into_ndarray::<f32>()?;
        Self::new(to_time_major(data)?, geometry)
    }

    /// 转换为单线程共享的形式.
    #[inline]
    pub fn into_shared(self) -> SharedScan {
        Rc::new(RefCell::new(self))
    }

    /// 身份标识.
    #[inline]
    pub fn id(&self) -> VolumeId {
        self.id
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// 时间步个数.
    #[inline]
    pub fn time_steps(&self) -> usize {
        self.data.shape()[0]
    }

    /// 按轴序排列的三个空间维度大小.
    #[inline]
    pub fn extents(&self) -> [usize; 3] {
        let &[_, z, h, w] = self.data.shape() else {
            unreachable!()
        };
        [w, h, z]
    }

    /// 获取时间步 `t` 沿 `axis` 轴的第 `index` 个切片. 任一索引越界时 panic.
    #[inline]
    pub fn slice_at(&self, t: usize, axis: usize, index: usize) -> ScanSlice<'_> {
        ScanSlice::new(
            self.data
                .index_axis(Axis(0), t)
                .index_axis_move(storage_axis(axis), index),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LabelVolume, VolumeGeometry};
    use crate::consts::MAX_LABEL_COUNT;
    use crate::error::VolumeError;
    use crate::{Label, OwnedLabelSlice};
    use ndarray::{Array2, Array3, Array4};

    /// `[z, h, w]` = `[2, 3, 4]`, 体素值为 `(x + y + z) % 3`.
    fn sample() -> LabelVolume {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| ((x + y + z) % 3) as u16);
        LabelVolume::from_3d(data, VolumeGeometry::default()).unwrap()
    }

    #[test]
    fn test_extents_and_labels() {
        let v = sample();
        assert_eq!(v.extents(), [4, 3, 2]);
        assert_eq!(v.time_steps(), 1);
        assert_eq!(v.label_count(), 3);
        assert_eq!(v.active_label(), 1);
        assert_eq!(v.voxel(0, [3, 2, 1]), 0);
        assert_eq!(v.voxel(0, [1, 0, 1]), 2);
        assert_eq!(v.get(0, [4, 0, 0]), None);
    }

    #[test]
    fn test_slice_orientation() {
        let v = sample();
        for axis in 0..3 {
            let (rows, cols) = v.slice_shape(axis);
            let (dim0, dim1) = crate::orthogonal_axes(axis);
            for index in 0..v.extent(axis) {
                let s = v.slice_at(0, axis, index);
                assert_eq!(s.shape(), (rows, cols));
                for ((j, i), &p) in s.indexed_iter() {
                    let mut pos = [0; 3];
                    pos[axis] = index;
                    pos[dim0] = i;
                    pos[dim1] = j;
                    assert_eq!(p, v.voxel(0, pos));
                }
            }
        }
    }

    #[test]
    fn test_write_slice_validates() {
        let mut v = sample();
        let good = OwnedLabelSlice::from_raw(Array2::from_elem((3, 4), 2));
        v.write_slice(0, 2, 1, &good.as_immut()).unwrap();
        assert_eq!(v.slice_at(0, 2, 1).count(2), 12);

        let bad_label = OwnedLabelSlice::from_raw(Array2::from_elem((3, 4), 7));
        assert!(matches!(
            v.write_slice(0, 2, 0, &bad_label.as_immut()),
            Err(VolumeError::LabelOutOfRange(7, 3))
        ));
        let bad_shape = OwnedLabelSlice::zeros((4, 3));
        assert!(matches!(
            v.write_slice(0, 2, 0, &bad_shape.as_immut()),
            Err(VolumeError::SliceShapeMismatch { .. })
        ));
        assert!(matches!(
            v.write_slice(0, 2, 2, &good.as_immut()),
            Err(VolumeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_label_count_limit() {
        let mut v = sample();
        assert!(matches!(
            v.set_label_count(MAX_LABEL_COUNT + 1),
            Err(VolumeError::TooManyLabels(_))
        ));
        v.set_label_count(MAX_LABEL_COUNT - 1).unwrap();
        assert_eq!(v.add_label().unwrap(), Label::MAX);
        assert!(matches!(v.add_label(), Err(VolumeError::TooManyLabels(_))));
        assert_eq!(v.label_count(), MAX_LABEL_COUNT);
    }

    #[test]
    fn test_label_set_changes() {
        let mut v = sample();
        assert_eq!(v.add_label().unwrap(), 3);
        assert_eq!(v.label_count(), 4);
        v.set_active_label(3).unwrap();
        v.lock_label(3).unwrap();
        assert!(v.labels().is_locked(3));

        assert!(matches!(v.set_label_count(2), Err(VolumeError::LabelInUse(2))));
        v.set_label_count(3).unwrap();
        assert_eq!(v.active_label(), 0);
        assert!(!v.labels().is_locked(3));
        assert!(v.set_active_label(3).is_err());
    }

    #[test]
    fn test_identity() {
        let v = sample();
        let c = v.clone();
        assert_ne!(v.id(), c.id());
        assert!(LabelVolume::new(Array4::zeros((1, 0, 2, 2)), VolumeGeometry::default()).is_err());
    }
}
