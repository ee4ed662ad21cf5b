//! 二维标签/参考图像切片对象的操作.

mod core;
mod save;

pub use core::{LabelSlice, LabelSliceMut, OwnedLabelSlice, OwnedScanSlice, ScanSlice};

pub use save::{ImgWriteRaw, ImgWriteVis};
