//! 基于形状的切片插值.

use super::edt::signed_distance;
use crate::consts::BACKGROUND;
use crate::stats::relative_position;
use crate::{Label, LabelSlice, LabelSliceMut, ScanSlice};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一次插值所需的全部输入.
///
/// `lower` 与 `upper` 是当前标签的掩膜: 像素值只有 `label` 与背景两种.
pub struct InterpolationRequest<'a> {
    /// 下侧切片.
    pub lower: LabelSlice<'a>,
    /// 下侧切片索引.
    pub lower_index: usize,
    /// 上侧切片.
    pub upper: LabelSlice<'a>,
    /// 上侧切片索引.
    pub upper_index: usize,
    /// 目标切片索引.
    pub target_index: usize,
    /// 参考时间步. 目前恒为 0.
    pub reference_time_step: usize,
    /// 当前标签.
    pub label: Label,
    /// 参考图像在目标位置的切片 (如果挂载了参考图像).
    pub reference: Option<ScanSlice<'a>>,
    /// (行方向, 列方向) 的像素间距 (单位: 毫米).
    pub spacing: (f64, f64),
}

impl InterpolationRequest<'_> {
    /// 目标切片到下侧切片的相对距离, 取值 `(0, 1)`. 索引次序不对时截断到 `[0, 1]`.
    #[inline]
    pub fn weight(&self) -> f64 {
        relative_position(self.lower_index, self.target_index, self.upper_index)
    }
}

/// 插值算法.
pub trait ShapeInterpolation {
    /// 根据 `request` 计算目标切片, 写入 `output`.
    ///
    /// `output` 与输入切片形状相同, 调用时为全背景.
    /// 算法应在插值得到的形状内写入 `request.label`, 其余保持背景.
    fn interpolate(&self, request: &InterpolationRequest, output: &mut LabelSliceMut);
}

/// 有符号距离图线性混合.
///
/// 分别计算两侧掩膜的有符号距离图 (内部为负), 按目标切片的位置线性混合,
/// 混合值为负的像素属于插值结果. 两侧掩膜相同时, 结果与之完全一致.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeBasedInterpolation {
    /// 计算距离时是否考虑各向异性的像素间距.
    pub use_spacing: bool,
}

impl Default for ShapeBasedInterpolation {
    fn default() -> Self {
        Self { use_spacing: true }
    }
}

impl ShapeInterpolation for ShapeBasedInterpolation {
    fn interpolate(&self, request: &InterpolationRequest, output: &mut LabelSliceMut) {
        assert_eq!(request.lower.shape(), output.shape());
        assert_eq!(request.upper.shape(), output.shape());

        let spacing = if self.use_spacing {
            request.spacing
        } else {
            (1.0, 1.0)
        };
        let label = request.label;
        let lower = signed_distance(request.lower.mask_of(label).view(), spacing);
        let upper = signed_distance(request.upper.mask_of(label).view(), spacing);
        let w = request.weight();

        for ((out, a), b) in output.iter_mut().zip(lower.iter()).zip(upper.iter()) {
            *out = if (1.0 - w) * a + w * b < 0.0 {
                label
            } else {
                BACKGROUND
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InterpolationRequest, ShapeBasedInterpolation, ShapeInterpolation};
    use crate::{Label, OwnedLabelSlice};
    use ndarray::Array2;

    /// 以 `(cy, cx)` 为中心、半径为 `r` 的实心圆.
    fn disk(shape: (usize, usize), (cy, cx): (f64, f64), r: f64, label: Label) -> OwnedLabelSlice {
        OwnedLabelSlice::from_raw(Array2::from_shape_fn(shape, |(y, x)| {
            let (dy, dx) = (y as f64 - cy, x as f64 - cx);
            if dy * dy + dx * dx <= r * r {
                label
            } else {
                0
            }
        }))
    }

    fn request<'a>(lower: &'a OwnedLabelSlice, upper: &'a OwnedLabelSlice, (l, t, u): (usize, usize, usize), label: Label) -> InterpolationRequest<'a> {
        InterpolationRequest {
            lower: lower.as_immut(),
            lower_index: l,
            upper: upper.as_immut(),
            upper_index: u,
            target_index: t,
            reference_time_step: 0,
            label,
            reference: None,
            spacing: (1.0, 1.0),
        }
    }

    fn run(lower: &OwnedLabelSlice, upper: &OwnedLabelSlice, indices: (usize, usize, usize), label: Label) -> OwnedLabelSlice {
        let request = request(lower, upper, indices, label);
        let mut out = OwnedLabelSlice::zeros(lower.shape());
        ShapeBasedInterpolation::default().interpolate(&request, &mut out.as_mutable());
        out
    }

    #[test]
    fn test_request_weight() {
        let a = disk((5, 5), (2.0, 2.0), 1.0, 1);
        assert_eq!(request(&a, &a, (2, 3, 6), 1).weight(), 0.25);
        assert_eq!(request(&a, &a, (5, 3, 7), 1).weight(), 0.0);
        assert_eq!(request(&a, &a, (2, 9, 6), 1).weight(), 1.0);
    }

    #[test]
    fn test_identical_masks_reproduce() {
        let a = disk((20, 20), (9.0, 10.0), 5.5, 3);
        let out = run(&a, &a, (2, 4, 7), 3);
        assert_eq!(out, a);
    }

    #[test]
    fn test_growing_disk() {
        let small = disk((31, 31), (15.0, 15.0), 4.0, 1);
        let big = disk((31, 31), (15.0, 15.0), 12.0, 1);
        let mid = run(&small, &big, (0, 5, 10), 1);
        let count = |s: &OwnedLabelSlice| s.as_immut().count(1);
        assert!(count(&small) < count(&mid) && count(&mid) < count(&big));
        // 半径约为 8.
        assert_eq!(mid[(15, 15 + 7)], 1);
        assert_eq!(mid[(15, 15 + 9)], 0);
    }

    #[test]
    fn test_moving_disk() {
        let left = disk((21, 41), (10.0, 15.0), 8.0, 2);
        let right = disk((21, 41), (10.0, 25.0), 8.0, 2);
        let mid = run(&left, &right, (1, 2, 3), 2);
        let mid = mid.as_immut();
        // 中间切片只含有当前标签与背景.
        assert!(mid.iter().all(|&p| p == 0 || p == 2));
        assert_eq!(mid[(10, 20)], 2);
        assert_eq!(mid[(10, 5)], 0);
        assert_eq!(mid[(10, 35)], 0);
    }
}
