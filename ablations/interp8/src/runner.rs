//! 程序运行函数.

use crate::profile::Profile;
use crate::result::AblationResult;
use slice_berry::prelude::*;
use std::env;
use std::path::Path;
use std::thread;
use utils::loader;

/// 相邻两个保留切片之间默认擦除的切片个数.
const DEFAULT_STRIDE: usize = 2;

/// 沿 z 轴.
const AXIS: usize = 2;

/// 从 `$INTERP8_STRIDE` 读取擦除步长.
fn stride_from_env() -> usize {
    match env::var("INTERP8_STRIDE").map(|s| s.parse::<usize>()) {
        Ok(Ok(n)) if n > 0 => n,
        Ok(_) => {
            log::warn!("$INTERP8_STRIDE 非法, 使用默认值 {DEFAULT_STRIDE}");
            DEFAULT_STRIDE
        }
        Err(_) => DEFAULT_STRIDE,
    }
}

/// 实际运行.
pub fn run() -> AblationResult {
    let label_dir = loader::label_dir_from_env_or_home().expect("无法确定 LiTS 标签目录");
    assert!(label_dir.is_dir(), "{} 不是目录", label_dir.display());
    let p = label_dir.as_path();
    let stride = stride_from_env();

    // 短路判断
    assert!(
        loader::label_loader([0], p)
            .next()
            .is_some_and(|(_, r)| r.is_ok()),
        "Loading dataset config error"
    );

    let workers = utils::cpus();
    println!("Running ablation studies with {workers} workers, stride = {stride}...");
    let profile = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|w| {
                let indices = (0..LITS_TRAINING_SET_LEN).filter(move |i| *i as usize % workers == w);
                s.spawn(move || run_cases(indices, p, stride))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Thread joining error"))
            .fold(Profile::new(), |acc, p| acc.merge(&p))
    });
    AblationResult::new(stride, profile.finish())
}

/// 处理一组病例. 每个线程拥有自己的体数据与插值器.
fn run_cases<I: IntoIterator<Item = u32>>(indices: I, path: &Path, stride: usize) -> Profile {
    let mut profile = Profile::new();
    let registry = InterpolatorRegistry::new();
    for (idx, volume) in loader::label_loader(indices, path) {
        match volume {
            Ok(v) => match run_case(v, &registry, stride, &mut profile) {
                Ok(()) => profile.count_case(),
                Err(e) => {
                    log::warn!("病例 {idx} 被跳过: {e}");
                    profile.count_skipped();
                }
            },
            Err(e) => {
                log::warn!("病例 {idx} 加载失败: {e}");
                profile.count_skipped();
            }
        }
    }
    profile
}

/// 擦除单个病例中的部分肝脏切片, 再插值补回.
fn run_case(mut volume: LabelVolume, registry: &InterpolatorRegistry, stride: usize, profile: &mut Profile) -> InterpResult<()> {
    // 肿瘤视为肝脏的一部分.
    for z in 0..volume.extent(AXIS) {
        let mut s = volume.slice_at(0, AXIS, z).to_owned();
        if s.as_mutable().replace(LITS_TUMOR, LITS_LIVER) > 0 {
            volume.write_slice(0, AXIS, z, &s.as_immut())?;
        }
    }
    volume.set_label_count(2)?;
    volume.set_active_label(LITS_LIVER)?;

    let volume = volume.into_shared();
    let interp = SliceInterpolator::new(registry);
    profile.scan_start();
    interp.borrow_mut().set_working_image(Some(&volume));
    profile.scan_elapsed();

    let slices: Vec<usize> = {
        let i = interp.borrow();
        let stats = i.statistics();
        (0..stats.extent(AXIS))
            .filter(|&z| stats.contains(0, AXIS, z, LITS_LIVER))
            .collect()
    };
    let (Some(&lo), Some(&hi)) = (slices.first(), slices.last()) else {
        return Err(InterpolationError::NoBoundingSlices {
            index: 0,
            label: LITS_LIVER,
        });
    };

    // 擦除 (lo, hi) 之间不在步长网格上的切片, 保留标准答案.
    let mut erased = Vec::new();
    for z in (lo + 1..hi).filter(|z| (z - lo) % (stride + 1) != 0) {
        let truth = volume.borrow().slice_at(0, AXIS, z).to_owned();
        let mut blank = truth.clone();
        blank.as_mutable().replace(LITS_LIVER, BACKGROUND);
        interp.borrow_mut().write_slice(&blank.as_immut(), AXIS, z, 0)?;
        erased.push((z, truth));
    }

    let geometry = *volume.borrow().geometry();
    let i = interp.borrow();
    for (z, truth) in erased.iter() {
        let plane = CuttingPlane::axis_aligned(&geometry, AXIS, *z);
        let truth_count = truth.as_immut().count(LITS_LIVER) as u64;

        profile.interp_start();
        let suggestion = i.interpolate(AXIS, *z, &plane, 0);
        profile.interp_elapsed();

        match suggestion {
            Some(s) => {
                let s = s.as_immut();
                let predicted = s.count(LITS_LIVER) as u64;
                let overlap = s
                    .iter()
                    .zip(truth.as_immut().iter())
                    .filter(|(a, b)| **a == LITS_LIVER && **b == LITS_LIVER)
                    .count() as u64;
                profile.count_dice(truth_count, predicted, overlap);
            }
            None => profile.count_missing(truth_count),
        }
    }
    log::info!("病例完成: 肝脏切片 {lo}..={hi}, 擦除 {} 个切片", erased.len());
    Ok(())
}
