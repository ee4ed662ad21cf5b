//! 运行时错误.

use crate::Label;
use thiserror::Error;

/// 标签统计索引的访问/更新错误.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatisticsError {
    /// 索引超出 `reset` 时确定的范围.
    ///
    /// 各字段依次为时间步、轴、切片索引、标签.
    #[error("统计索引越界: (t = {time_step}, axis = {axis}, slice = {slice}, label = {label})")]
    OutOfRange {
        /// 时间步.
        time_step: usize,
        /// 轴.
        axis: usize,
        /// 切片索引.
        slice: usize,
        /// 标签.
        label: Label,
    },

    /// 体数据或切片形状与统计索引不一致.
    #[error("形状与统计索引不一致: 期望 {expected:?}, 实际 {actual:?}")]
    ShapeMismatch {
        /// 统计索引所要求的形状.
        expected: Vec<usize>,
        /// 实际形状.
        actual: Vec<usize>,
    },

    /// 标签值超出统计索引记录的标签个数. 第一个参数为标签, 第二个参数为标签个数.
    #[error("标签 {0} 超出统计范围 (共 {1} 个标签)")]
    LabelOutOfRange(Label, usize),
}

/// 从体数据中提取切片的错误.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    /// 时间步越界. 第一个参数为请求的时间步, 第二个参数为时间步总数.
    #[error("时间步 {0} 越界 (共 {1} 个时间步)")]
    TimeStepOutOfRange(usize, usize),

    /// 切割平面不与任何坐标轴正交.
    #[error("切割平面法向量 {0:?} 不平行于任何坐标轴")]
    ObliquePlane([f64; 3]),

    /// 切割平面落在体数据之外.
    #[error("切割平面 (axis = {axis}, 连续索引 = {position}) 位于体数据之外")]
    OutsideVolume {
        /// 平面法向所在的轴.
        axis: usize,
        /// 平面在该轴上的连续体素索引.
        position: f64,
    },
}

/// 体数据构造、加载与写入错误.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// nifti 文件读取错误.
    #[error("nifti 读取错误: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 数组形状错误.
    #[error("数组形状错误: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// 体数据的某个维度为 0.
    #[error("体数据为空: 形状 {0:?}")]
    EmptyVolume(Vec<usize>),

    /// 仅支持 3D 或 4D 体数据.
    #[error("不支持的维数 {0}, 仅支持 3D 或 4D")]
    UnsupportedDimension(usize),

    /// 标签值不在标签集合内. 第一个参数为标签, 第二个参数为标签个数.
    #[error("标签 {0} 不在标签集合内 (共 {1} 个标签)")]
    LabelOutOfRange(Label, usize),

    /// 标签个数超出 `Label` 的表示范围.
    #[error("标签个数 {0} 超出上限")]
    TooManyLabels(usize),

    /// 想要删除的标签仍被体素使用.
    #[error("标签 {0} 仍被体素使用")]
    LabelInUse(Label),

    /// 写入切片的形状与体数据不符.
    #[error("切片形状不符: 期望 {expected:?}, 实际 {actual:?}")]
    SliceShapeMismatch {
        /// 体数据要求的形状 (行, 列).
        expected: (usize, usize),
        /// 实际形状 (行, 列).
        actual: (usize, usize),
    },

    /// 时间步、轴或切片索引越界.
    #[error("索引越界: (t = {time_step}, axis = {axis}, index = {index})")]
    IndexOutOfRange {
        /// 时间步.
        time_step: usize,
        /// 轴.
        axis: usize,
        /// 切片索引.
        index: usize,
    },
}

/// 插值器操作错误.
///
/// 其中绝大部分是交互编辑时的 "常规" 前置条件失败, 调用者通常直接跳过即可.
#[derive(Debug, Error)]
pub enum InterpolationError {
    /// 没有挂载工作体数据 (或其已被释放).
    #[error("没有挂载工作体数据")]
    NoWorkingImage,

    /// 轴不是 0, 1 或 2.
    #[error("轴 {0} 越界")]
    AxisOutOfRange(usize),

    /// 时间步超出统计范围. 第一个参数为请求值, 第二个参数为时间步总数.
    #[error("时间步 {0} 越界 (共 {1} 个时间步)")]
    TimeStepOutOfRange(usize, usize),

    /// 切片索引越界. 第一个参数为请求值, 第二个参数为该轴切片总数.
    #[error("切片索引 {0} 越界 (共 {1} 个切片)")]
    SliceOutOfRange(usize, usize),

    /// 目标切片位于体数据边缘, 某一侧没有切片可供插值.
    #[error("切片 {0} 位于边缘, 无法插值")]
    EdgeSlice(usize),

    /// 切割平面法向与插值轴不一致.
    #[error("切割平面法向与轴 {0} 不一致")]
    PlaneAxisMismatch(usize),

    /// 目标切片已经含有当前标签.
    #[error("切片 {index} 已含有标签 {label}")]
    AlreadySegmented {
        /// 切片索引.
        index: usize,
        /// 当前标签.
        label: Label,
    },

    /// 找不到上下两侧的含标签切片.
    #[error("切片 {index} 两侧找不到含有标签 {label} 的切片")]
    NoBoundingSlices {
        /// 切片索引.
        index: usize,
        /// 当前标签.
        label: Label,
    },

    /// 输入切片形状与体数据不符.
    #[error("切片形状不符: 期望 {expected:?}, 实际 {actual:?}")]
    SliceShapeMismatch {
        /// 体数据要求的形状 (行, 列).
        expected: (usize, usize),
        /// 实际形状 (行, 列).
        actual: (usize, usize),
    },

    /// 统计索引记录的标签个数与工作体数据不再一致, 需要重新全量扫描.
    #[error("统计已过期: 索引记录 {recorded} 个标签, 体数据现有 {current} 个")]
    StatisticsStale {
        /// 统计索引记录的标签个数.
        recorded: usize,
        /// 工作体数据当前的标签个数.
        current: usize,
    },

    /// 切片提取失败.
    #[error("切片提取失败: {0}")]
    Extraction(#[from] ExtractError),

    /// 统计索引错误.
    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    /// 体数据错误.
    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// 插值器操作结果.
pub type InterpResult<T> = Result<T, InterpolationError>;
