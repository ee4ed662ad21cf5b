//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Label, Voxel};

pub use crate::{
    CuttingPlane, ImgWriteRaw, ImgWriteVis, LabelSlice, LabelSliceMut, LabelVolume, OwnedLabelSlice,
    ScanSlice, ScanVolume, SharedScan, SharedVolume, VolumeGeometry,
};

pub use crate::consts::{BACKGROUND, LITS_LIVER, LITS_TRAINING_SET_LEN, LITS_TUMOR};

pub use crate::error::{InterpResult, InterpolationError, VolumeError};

pub use crate::interp::{
    interpolator_for, InterpolatorRegistry, InterpolatorSpec, SharedInterpolator, SliceInterpolator,
};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, lits_train};
