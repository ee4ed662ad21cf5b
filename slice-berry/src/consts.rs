//! 通用常量.

use crate::Label;

/// 背景 (exterior) 标签值.
pub const BACKGROUND: Label = 0;

/// 标签集合最多可容纳的标签个数.
pub const MAX_LABEL_COUNT: usize = Label::MAX as usize + 1;

/// 原 LiTS 数据集中, 肝脏的像素值.
pub const LITS_LIVER: Label = 1;

/// 原 LiTS 数据集中, 肿瘤的像素值.
pub const LITS_TUMOR: Label = 2;

/// LiTS 训练集大小.
pub const LITS_TRAINING_SET_LEN: u32 = 131;

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;
}

/// 像素是否是背景?
#[inline]
pub const fn is_background(p: Label) -> bool {
    p == BACKGROUND
}

/// 像素是否是前景 (任意非背景标签)?
#[inline]
pub const fn is_foreground(p: Label) -> bool {
    !is_background(p)
}
