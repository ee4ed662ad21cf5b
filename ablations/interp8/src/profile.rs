//! 插值运行统计.

use std::time::{Duration, Instant};

/// 可以中途暂停、再继续累加的计时器.
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时视为已经开始计时.
    #[inline]
    fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始一轮计时.
    #[inline]
    fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束本轮计时并累加. 返回本轮时长.
    #[inline]
    fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (微秒).
    #[inline]
    fn total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }

    /// 合并另一个计时器的累计时间.
    #[inline]
    fn absorb(&mut self, other: &Self) {
        self.consumed += other.consumed;
    }
}

/// 留空切片实验的数据统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 成功处理的病例数.
    cases: u64,

    /// 加载失败或不含肝脏的病例数.
    skipped: u64,

    /// 被擦除并尝试插值的切片数.
    attempted: u64,

    /// 插值器没有给出建议的切片数.
    missing: u64,

    /// 每个切片 Dice 系数之和.
    dice_sum: f64,

    /// 全部切片的交集与 "标准 + 预测" 像素总数, 用于计算全局 Dice.
    overlap: u64,
    volume: u64,

    /// 插值本身花费的时间.
    interp_time: AccTimer,

    /// 建立统计索引 (全量扫描) 花费的时间.
    scan_time: AccTimer,

    /// 整个任务花费的时间.
    real_time: AccTimer,

    /// 最耗时的一次插值.
    most: Duration,
}

impl Profile {
    /// 初始化. 同时开始整体计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            cases: 0,
            skipped: 0,
            attempted: 0,
            missing: 0,
            dice_sum: 0.0,
            overlap: 0,
            volume: 0,
            interp_time: AccTimer::new(),
            scan_time: AccTimer::new(),
            real_time: AccTimer::new(),
            most: Duration::ZERO,
        }
    }

    /// 记录一个成功处理的病例.
    #[inline]
    pub fn count_case(&mut self) {
        self.cases += 1;
    }

    /// 记录一个被跳过的病例.
    #[inline]
    pub fn count_skipped(&mut self) {
        self.skipped += 1;
    }

    /// 开始一次全量扫描计时.
    #[inline]
    pub fn scan_start(&mut self) {
        self.scan_time.start();
    }

    /// 结束一次全量扫描计时.
    #[inline]
    pub fn scan_elapsed(&mut self) {
        self.scan_time.elapsed();
    }

    /// 开始一次插值计时.
    #[inline]
    pub fn interp_start(&mut self) {
        self.attempted += 1;
        self.interp_time.start();
    }

    /// 结束一次插值计时.
    #[inline]
    pub fn interp_elapsed(&mut self) {
        let d = self.interp_time.elapsed();
        self.most = self.most.max(d);
    }

    /// 记录一次没有插值建议的切片. 其 Dice 视为 0.
    #[inline]
    pub fn count_missing(&mut self, truth: u64) {
        self.missing += 1;
        self.volume += truth;
    }

    /// 记录一次插值结果: 标准像素数 `truth`, 预测像素数 `predicted`, 交集 `overlap`.
    pub fn count_dice(&mut self, truth: u64, predicted: u64, overlap: u64) {
        let denom = truth + predicted;
        self.dice_sum += if denom == 0 {
            1.0
        } else {
            2.0 * overlap as f64 / denom as f64
        };
        self.overlap += overlap;
        self.volume += denom;
    }

    /// 合并另一个 (其他线程的) 统计. 整体时间不合并.
    pub fn merge(mut self, other: &Self) -> Self {
        self.cases += other.cases;
        self.skipped += other.skipped;
        self.attempted += other.attempted;
        self.missing += other.missing;
        self.dice_sum += other.dice_sum;
        self.overlap += other.overlap;
        self.volume += other.volume;
        self.interp_time.absorb(&other.interp_time);
        self.scan_time.absorb(&other.scan_time);
        self.most = self.most.max(other.most);
        self
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 成功处理的病例数.
    #[inline]
    pub fn cases(&self) -> u64 {
        self.cases
    }

    /// 被跳过的病例数.
    #[inline]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// 尝试插值的切片数.
    #[inline]
    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    /// 没有插值建议的切片数.
    #[inline]
    pub fn missing(&self) -> u64 {
        self.missing
    }

    /// 切片平均 Dice.
    #[inline]
    pub fn mean_dice(&self) -> Option<f64> {
        (self.attempted != 0).then(|| self.dice_sum / self.attempted as f64)
    }

    /// 全局 Dice: 所有切片像素一起计算.
    #[inline]
    pub fn global_dice(&self) -> Option<f64> {
        (self.volume != 0).then(|| 2.0 * self.overlap as f64 / self.volume as f64)
    }

    /// 插值总时间 (微秒).
    #[inline]
    pub fn interp_time_us(&self) -> u64 {
        self.interp_time.total_us()
    }

    /// 平均每次插值时间 (微秒).
    #[inline]
    pub fn avg_interp_time_us(&self) -> Option<f64> {
        (self.attempted != 0).then(|| self.interp_time_us() as f64 / self.attempted as f64)
    }

    /// 全量扫描总时间 (微秒).
    #[inline]
    pub fn scan_time_us(&self) -> u64 {
        self.scan_time.total_us()
    }

    /// 整体运行时间 (微秒).
    #[inline]
    pub fn real_time_us(&self) -> u64 {
        self.real_time.total_us()
    }

    /// 最耗时的一次插值.
    #[inline]
    pub fn most_time_consuming(&self) -> Option<Duration> {
        (self.attempted != 0).then_some(self.most)
    }
}

#[cfg(test)]
mod tests {
    use super::Profile;

    #[test]
    fn test_dice_accumulation() {
        let mut p = Profile::new();
        assert_eq!(p.mean_dice(), None);

        p.interp_start();
        p.interp_elapsed();
        p.count_dice(10, 10, 10);
        p.interp_start();
        p.interp_elapsed();
        p.count_missing(10);

        let mut q = Profile::new();
        q.interp_start();
        q.interp_elapsed();
        q.count_dice(4, 0, 0);

        let p = p.merge(&q).finish();
        assert_eq!(p.attempted(), 3);
        assert_eq!(p.missing(), 1);
        assert!((p.mean_dice().unwrap() - 1.0 / 3.0).abs() < 1e-12);
        assert!((p.global_dice().unwrap() - 20.0 / 34.0).abs() < 1e-12);
    }
}
