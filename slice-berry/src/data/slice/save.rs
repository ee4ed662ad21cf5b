//! 标签切片的持久化存储.

use super::{LabelSlice, LabelSliceMut, OwnedLabelSlice};
use crate::Label;
use image::ImageResult;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 标签切片通常只含有很小的整数, 直接保存几乎全黑.
/// `ImgWriteVis` 在保存时会将标签映射到肉眼较易区分的灰度.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 标签按原值以 16-bit 单通道格式保存, 因此保存格式必须支持 16-bit 灰度 (如 PNG).
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 使像素更有利于单通道可视化.
#[inline]
pub(crate) fn pretty(label: Label) -> u8 {
    use crate::consts::gray::*;
    match label {
        // 背景为黑色
        0 => BLACK,

        // 第一个前景标签为白色
        1 => WHITE,

        2 => LIGHT_GRAY,

        3 => DARK_GRAY,

        // 其余标签散列到 [48, 240) 之间
        any_else => (any_else as u32 * 37 % 192 + 48) as u8,
    }
}

macro_rules! impl_label_save {
    ($($slice: ty),+) => {
        $(
            /// 背景为黑色, 标签 1/2/3 分别为白色/亮灰色/暗灰色, 其余标签散列为中间灰度.
            impl ImgWriteVis for $slice {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, image::Luma([pretty(pix)]));
                    }
                    buf.save(path)
                }
            }

            /// 按原样以 16-bit 灰度存储.
            impl ImgWriteRaw for $slice {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    let mut buf =
                        image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

impl_label_save!(LabelSlice<'_>, LabelSliceMut<'_>);

impl ImgWriteVis for OwnedLabelSlice {
    #[inline]
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.as_immut().save(path)
    }
}

impl ImgWriteRaw for OwnedLabelSlice {
    #[inline]
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.as_immut().save_raw(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{pretty, ImgWriteRaw, ImgWriteVis};
    use crate::OwnedLabelSlice;
    use ndarray::array;

    #[test]
    fn test_pretty_distinguishes_common_labels() {
        let v: Vec<u8> = (0..4).map(pretty).collect();
        for (i, a) in v.iter().enumerate() {
            for b in v.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        assert!((48..240).contains(&pretty(17)));
    }

    #[test]
    fn test_save_round_trip_raw() {
        let s = OwnedLabelSlice::from_raw(array![[0, 1, 2], [300, 0, 1]]);
        let dir = std::env::temp_dir();
        let raw = dir.join("slice_berry_save_raw_test.png");
        let vis = dir.join("slice_berry_save_vis_test.png");
        s.save_raw(&raw).unwrap();
        s.save(&vis).unwrap();

        let back = image::open(&raw).unwrap().into_luma16();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(0, 1).0, [300]);
        assert_eq!(back.get_pixel(2, 0).0, [2]);

        let _ = std::fs::remove_file(raw);
        let _ = std::fs::remove_file(vis);
    }
}
