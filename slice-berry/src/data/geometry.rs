//! 体数据几何信息与切割平面.

use crate::AXES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 法向量与坐标轴平行的判定容差.
const AXIS_ALIGNED_EPS: f64 = 1e-6;

/// 体数据的几何信息: 世界坐标原点与体素间距 (单位: 毫米), 均按轴序排列.
///
/// 这里只建模轴对齐的体数据 (无旋转), 即第 `a` 轴的世界坐标为
/// `origin[a] + index * spacing[a]`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeGeometry {
    origin: [f64; 3],
    spacing: [f64; 3],
}

impl Default for VolumeGeometry {
    /// 原点为 0, 各向同性的 1 毫米间距.
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            spacing: [1.0; 3],
        }
    }
}

impl VolumeGeometry {
    /// 构建几何信息.
    ///
    /// `spacing` 的每个分量都必须为正的有限值, 否则返回 `None`.
    pub fn new(origin: [f64; 3], spacing: [f64; 3]) -> Option<Self> {
        let valid = spacing.iter().all(|s| s.is_finite() && *s > 0.0)
            && origin.iter().all(|o| o.is_finite());
        valid.then_some(Self { origin, spacing })
    }

    /// 世界坐标原点.
    #[inline]
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// 体素间距.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 第 `axis` 轴上索引 `index` 处的世界坐标.
    #[inline]
    pub fn index_to_world(&self, axis: usize, index: usize) -> f64 {
        self.origin[axis] + index as f64 * self.spacing[axis]
    }

    /// 第 `axis` 轴上世界坐标 `world` 对应的连续体素索引.
    #[inline]
    pub fn world_to_index(&self, axis: usize, world: f64) -> f64 {
        (world - self.origin[axis]) / self.spacing[axis]
    }

    /// 判断平面 `plane` 切到了哪个切片. 返回 `(轴, 切片索引)`.
    ///
    /// 如果平面不与坐标轴正交, 或者落在 `extents` 描述的体数据之外, 则返回 `None`.
    pub fn affected_slice(&self, extents: [usize; 3], plane: &CuttingPlane) -> Option<(usize, usize)> {
        let axis = plane.normal_axis()?;
        let pos = self.world_to_index(axis, plane.origin()[axis]).round();
        (pos >= 0.0 && pos < extents[axis] as f64).then_some((axis, pos as usize))
    }
}

/// 世界坐标中的切割平面, 由平面上一点 `origin` 与法向量 `normal` 描述.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CuttingPlane {
    origin: [f64; 3],
    normal: [f64; 3],
}

impl CuttingPlane {
    /// 构建切割平面. 法向量必须非零且为有限值, 否则返回 `None`.
    pub fn new(origin: [f64; 3], normal: [f64; 3]) -> Option<Self> {
        let norm = normal.iter().map(|v| v * v).sum::<f64>().sqrt();
        (norm.is_finite() && norm > 0.0).then(|| Self {
            origin,
            normal: normal.map(|v| v / norm),
        })
    }

    /// 构建与第 `axis` 轴正交、经过该轴第 `index` 个切片的平面.
    ///
    /// `axis > 2` 时 panic.
    pub fn axis_aligned(geometry: &VolumeGeometry, axis: usize, index: usize) -> Self {
        assert!(axis < AXES, "轴的取值只能为 0, 1 或 2");
        let mut origin = geometry.origin();
        origin[axis] = geometry.index_to_world(axis, index);
        let mut normal = [0.0; 3];
        normal[axis] = 1.0;
        Self { origin, normal }
    }

    /// 平面上的一点.
    #[inline]
    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    /// 单位法向量.
    #[inline]
    pub fn normal(&self) -> [f64; 3] {
        self.normal
    }

    /// 如果法向量与某个坐标轴平行, 则返回该轴.
    pub fn normal_axis(&self) -> Option<usize> {
        (0..AXES).find(|&a| (self.normal[a].abs() - 1.0).abs() < AXIS_ALIGNED_EPS)
    }

    /// 将平面沿第 `axis` 轴平移, 使其经过该轴第 `index` 个切片. 返回新的平面.
    pub fn translated_to(&self, geometry: &VolumeGeometry, axis: usize, index: usize) -> Self {
        let mut origin = self.origin;
        origin[axis] = geometry.index_to_world(axis, index);
        Self {
            origin,
            normal: self.normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CuttingPlane, VolumeGeometry};

    #[test]
    fn test_geometry_invalid_spacing() {
        assert!(VolumeGeometry::new([0.0; 3], [1.0, 0.0, 1.0]).is_none());
        assert!(VolumeGeometry::new([0.0; 3], [1.0, f64::NAN, 1.0]).is_none());
        assert!(VolumeGeometry::new([1.0, 2.0, 3.0], [0.5, 0.5, 2.5]).is_some());
    }

    #[test]
    fn test_affected_slice() {
        let g = VolumeGeometry::new([10.0, -5.0, 100.0], [0.5, 0.5, 2.5]).unwrap();
        let extents = [20, 20, 8];
        for axis in 0..3 {
            for index in [0, 3, 7] {
                let p = CuttingPlane::axis_aligned(&g, axis, index);
                assert_eq!(p.normal_axis(), Some(axis));
                assert_eq!(g.affected_slice(extents, &p), Some((axis, index)));
            }
        }

        let p = CuttingPlane::axis_aligned(&g, 2, 0).translated_to(&g, 2, 8);
        assert_eq!(g.affected_slice(extents, &p), None);

        let oblique = CuttingPlane::new([0.0; 3], [1.0, 1.0, 0.0]).unwrap();
        assert_eq!(oblique.normal_axis(), None);
        assert_eq!(g.affected_slice(extents, &oblique), None);
    }

    #[test]
    fn test_flipped_normal_is_still_axis_aligned() {
        let p = CuttingPlane::new([0.0; 3], [0.0, -3.0, 0.0]).unwrap();
        assert_eq!(p.normal_axis(), Some(1));
        assert!(CuttingPlane::new([0.0; 3], [0.0; 3]).is_none());
    }
}
