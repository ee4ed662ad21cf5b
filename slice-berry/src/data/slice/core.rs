use crate::consts::is_background;
use crate::{Idx2d, Label};
use ndarray::iter::{Iter, IterMut};
use ndarray::{Array2, ArrayView2, ArrayViewMut2, Ix2};
use std::ops::{Index, IndexMut};

/// 不可变、借用的二维标签切片.
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::LabelVolume`] 或 [`OwnedLabelSlice`].
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, Label>,
}

impl Index<Idx2d> for LabelSlice<'_> {
    type Output = Label;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

/// 可变、借用的二维标签切片.
pub struct LabelSliceMut<'a> {
    /// 底层数据的轻量级视图.
    ///
    /// 这里有意把代码写死为 `ArrayViewMut` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayViewMut2<'a, Label>,
}

/// 可变方法集合.
impl<'a> LabelSliceMut<'a> {
    /// 获得 **底层** 数据的一份可变 shallow copy.
    #[inline]
    pub fn array_view_mut(&mut self) -> ArrayViewMut2<Label> {
        self.data.view_mut()
    }

    /// 获取可以迭代并修改图像像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, Label, Ix2> {
        self.data.iter_mut()
    }

    /// 获取给定位置 (行, 列) 的像素值, 并可就地修改. 越界时返回 `None`.
    #[inline]
    pub fn get_mut(&mut self, pos: Idx2d) -> Option<&mut Label> {
        self.data.get_mut(pos)
    }

    /// 将所有像素填充为 `label`.
    #[inline]
    pub fn fill(&mut self, label: Label) {
        self.data.fill(label);
    }

    /// 将切片中值为 `old` 的像素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: Label, new: Label) -> usize {
        let mut cnt = 0usize;
        self.iter_mut().filter(|pix| **pix == old).for_each(|p| {
            cnt += 1;
            *p = new;
        });
        cnt
    }

    /// 用 `src` 覆写 `self` 的内容.
    ///
    /// 如果两者形状不符, 则程序 panic.
    pub fn assign(&mut self, src: &LabelSlice) {
        assert_eq!(self.shape(), src.shape(), "切片形状不符");
        self.data.assign(&src.data);
    }
}

impl Index<Idx2d> for LabelSliceMut<'_> {
    type Output = Label;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for LabelSliceMut<'_> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// label 不可变方法集合.
macro_rules! impl_label_slice_immut {
    ($life: lifetime, $slice: ty, $array: ty) => {
        /// 不可变方法集合.
        impl<$life> $slice {
            /// 直接初始化.
            #[inline]
            pub(crate) fn new(data: $array) -> Self {
                Self { data }
            }

            /// 获得 **底层** 数据的一份不可变 shallow copy.
            #[inline]
            pub fn array_view(&self) -> ArrayView2<Label> {
                self.data.view()
            }

            /// 获取可以迭代图像像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, Label, Ix2> {
                self.data.iter()
            }

            /// 获取给定位置 (行, 列) 的像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&Label> {
                self.data.get(pos)
            }

            /// 该图是否为全背景图?
            #[inline]
            pub fn is_background(&self) -> bool {
                self.data.iter().copied().all(is_background)
            }

            /// 图像的分辨率 (行, 列).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                let &[h, w] = self.data.shape() else {
                    unreachable!()
                };
                (h, w)
            }

            /// 图像的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                let (h, w) = self.shape();
                h * w
            }

            /// 判断一个索引是否合法 (未越界).
            #[inline]
            pub fn check(&self, (h, w): Idx2d) -> bool {
                let (h_len, w_len) = self.shape();
                h < h_len && w < w_len
            }

            /// 统计图像中值为 `label` 的像素总个数.
            #[inline]
            pub fn count(&self, label: Label) -> usize {
                self.data.iter().filter(|&p| *p == label).count()
            }

            /// 判断图像中是否存在值为 `label` 的像素.
            #[inline]
            pub fn contains(&self, label: Label) -> bool {
                self.data.iter().any(|&p| p == label)
            }

            /// 获取图像中最大的标签值. 图像为空时返回 `None`.
            #[inline]
            pub fn max_label(&self) -> Option<Label> {
                self.data.iter().copied().max()
            }

            /// 获得一份不可变的 **本体** shallow copy.
            #[inline]
            pub fn shallow_copy(&self) -> LabelSlice {
                LabelSlice { data: self.array_view() }
            }

            /// 克隆自己, 获得一个拥有所有权的切片对象.
            pub fn to_owned(&self) -> OwnedLabelSlice {
                OwnedLabelSlice {
                    data: self.data.to_owned(),
                }
            }

            /// 获得图像的高 (行数).
            #[inline]
            pub fn height(&self) -> usize {
                self.shape().0
            }

            /// 获得图像的宽 (列数).
            #[inline]
            pub fn width(&self) -> usize {
                self.shape().1
            }

            /// 以行优先规则, 获取能迭代图像所有索引的迭代器.
            #[inline]
            pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
                let (h, w) = self.shape();
                itertools::iproduct!(0..h, 0..w)
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &Label)> {
                self.data.indexed_iter()
            }

            /// 获取值为 `label` 的二值掩膜: 该标签为 `true`, 其余为 `false`.
            pub fn mask_of(&self, label: Label) -> Array2<bool> {
                self.data.map(|&p| p == label)
            }
        }
    };
}
impl_label_slice_immut!('a, LabelSlice<'a>, ArrayView2<'a, Label>);
impl_label_slice_immut!('a, LabelSliceMut<'a>, ArrayViewMut2<'a, Label>);

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 拥有所有权的二维标签切片.
///
/// `OwnedLabelSlice` 仅提供到 `LabelSlice` 和 `LabelSliceMut`
/// 的轻量转换和底层数据移动. 插值结果以该类型返回.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedLabelSlice {
    data: Array2<Label>,
}

impl OwnedLabelSlice {
    /// 创建形状为 `(h, w)` 的全背景切片.
    #[inline]
    pub fn zeros((h, w): Idx2d) -> Self {
        Self {
            data: Array2::zeros((h, w)),
        }
    }

    /// 直接由底层数据创建.
    #[inline]
    pub fn from_raw(data: Array2<Label>) -> Self {
        Self { data }
    }

    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immut(&self) -> LabelSlice<'_> {
        LabelSlice::new(self.data.view())
    }

    /// 获得可变切片引用.
    #[inline]
    pub fn as_mutable(&mut self) -> LabelSliceMut<'_> {
        LabelSliceMut::new(self.data.view_mut())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<Label> {
        self.data
    }

    /// 图像的分辨率 (行, 列).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.as_immut().shape()
    }
}

impl Index<Idx2d> for OwnedLabelSlice {
    type Output = Label;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for OwnedLabelSlice {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 不可变、借用的二维参考图像 (扫描) 切片.
#[derive(Clone)]
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::ScanVolume`].
    data: ArrayView2<'a, f32>,
}

impl Index<Idx2d> for ScanSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> ScanSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView2<f32> {
        self.data.view()
    }

    /// 获取给定位置 (行, 列) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&f32> {
        self.data.get(pos)
    }

    /// 图像的分辨率 (行, 列).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 克隆自己, 获得一个拥有所有权的切片对象.
    pub fn to_owned(&self) -> OwnedScanSlice {
        OwnedScanSlice {
            data: self.data.to_owned(),
        }
    }
}

/// 拥有所有权的二维参考图像切片.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OwnedScanSlice {
    data: Array2<f32>,
}

impl OwnedScanSlice {
    /// 获得不可变切片引用.
    #[inline]
    pub fn as_immutable(&self) -> ScanSlice<'_> {
        ScanSlice::new(self.data.view())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::OwnedLabelSlice;
    use ndarray::array;

    #[test]
    fn test_replace_and_count() {
        let mut s = OwnedLabelSlice::from_raw(array![[0, 1, 1], [2, 1, 0]]);
        assert_eq!(s.as_immut().count(1), 3);
        assert_eq!(s.as_mutable().replace(1, 3), 3);
        assert_eq!(s.as_immut().count(1), 0);
        assert_eq!(s.as_immut().count(3), 3);
        assert_eq!(s.as_immut().max_label(), Some(3));
        assert!(!s.as_immut().is_background());

        s.as_mutable().fill(0);
        assert!(s.as_immut().is_background());
    }

    #[test]
    fn test_mask_and_pos_iter() {
        let s = OwnedLabelSlice::from_raw(array![[0, 4], [4, 4], [1, 0]]);
        let v = s.as_immut();
        assert_eq!(v.shape(), (3, 2));
        let mask = v.mask_of(4);
        let hits: Vec<_> = v.pos_iter().filter(|&p| mask[p]).collect();
        assert_eq!(hits, vec![(0, 1), (1, 0), (1, 1)]);
    }
}
