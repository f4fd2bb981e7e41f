use std::f64::consts::PI;

use rayon::prelude::*;

use super::calc::{
    asset_gain_for_age, cash_flow_breakdown, expenses_for_age, housing_outlay_for_age,
    net_income_for_age,
};
use super::types::{
    AssetPoint, ExitScoreDetail, KeyMetrics, MAX_AGE, PercentilePaths, Profile, ReadinessBand,
    ScoreLevel, SimulationResult,
};

pub const SIMULATION_RUNS: u32 = 1000;
pub const DEFAULT_SEED: u64 = 42;

// Debt is allowed but bounded; pathological negative compounding would
// otherwise diverge numerically.
pub const ASSET_FLOOR: f64 = -10_000.0;

const SAFE_WITHDRAWAL_RATE: f64 = 0.04;

#[derive(Copy, Clone, Debug)]
pub struct SimConfig {
    pub runs: u32,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            runs: SIMULATION_RUNS,
            seed: DEFAULT_SEED,
        }
    }
}

pub trait NormalSource {
    fn standard_normal(&mut self) -> f64;
}

pub fn derive_seed(base_seed: u64, stream: u32, run: u32) -> u64 {
    let mixed = base_seed ^ ((stream as u64) << 32) ^ run as u64;
    splitmix64(mixed)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub struct SimRng {
    state: u64,
    cached_normal: Option<f64>,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0xA5A5_A5A5_A5A5_A5A5 } else { seed };
        Self {
            state,
            cached_normal: None,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }
}

impl NormalSource for SimRng {
    // Box-Muller transform; the second variate is cached for the next call.
    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.cached_normal.take() {
            return z;
        }

        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        let z0 = r * theta.cos();
        let z1 = r * theta.sin();
        self.cached_normal = Some(z1);
        z0
    }
}

pub fn simulate_one_path(profile: &Profile, source: &mut impl NormalSource) -> Vec<AssetPoint> {
    let real_return = (profile.expected_return - profile.inflation_rate) / 100.0;
    let inflation = 1.0 + profile.inflation_rate / 100.0;

    let mut assets = profile.asset_cash + profile.asset_invest + profile.asset_dc;
    let mut path = Vec::with_capacity((MAX_AGE.saturating_sub(profile.current_age) + 1) as usize);

    for age in profile.current_age..=MAX_AGE {
        // Start-of-year wealth, before this year's flows.
        path.push(AssetPoint {
            age,
            assets: assets.round(),
        });

        let inflation_factor = inflation.powi((age - profile.current_age) as i32);
        let income = net_income_for_age(profile, age);
        let expenses = expenses_for_age(profile, age, inflation_factor, None);
        let dc_contribution = if age < profile.target_retire_age {
            profile.dc_contribution_annual
        } else {
            0.0
        };
        let one_shot = asset_gain_for_age(&profile.life_events, age)
            - housing_outlay_for_age(&profile.life_events, age);

        let year_return = real_return + profile.volatility * source.standard_normal();
        assets += (income - expenses) + dc_contribution + one_shot + assets * year_return;

        if assets < ASSET_FLOOR {
            assets = ASSET_FLOOR;
        }
    }

    path
}

pub fn run_simulation(profile: &Profile) -> SimulationResult {
    run_simulation_with(profile, &SimConfig::default())
}

pub fn run_simulation_with(profile: &Profile, config: &SimConfig) -> SimulationResult {
    run_simulation_stream(profile, config, 0)
}

// Each run draws from its own derived seed, so the fan-out is deterministic
// regardless of thread count or completion order.
pub(crate) fn run_simulation_stream(
    profile: &Profile,
    config: &SimConfig,
    stream: u32,
) -> SimulationResult {
    let all_paths: Vec<Vec<AssetPoint>> = (0..config.runs)
        .into_par_iter()
        .map(|run| {
            let mut rng = SimRng::new(derive_seed(config.seed, stream, run));
            simulate_one_path(profile, &mut rng)
        })
        .collect();

    let paths = PercentilePaths {
        p10: percentile_path(&all_paths, 10.0),
        p25: percentile_path(&all_paths, 25.0),
        median: percentile_path(&all_paths, 50.0),
        p75: percentile_path(&all_paths, 75.0),
        p90: percentile_path(&all_paths, 90.0),
    };

    let metrics = derive_metrics(&all_paths, &paths.median, profile);
    let score = compute_exit_score(&metrics, profile, &paths);

    SimulationResult {
        paths,
        metrics,
        cash_flow: cash_flow_breakdown(profile),
        score,
    }
}

// Nearest-rank order statistic: floor(N * p / 100), clamped to the last
// index. Downstream thresholds are tuned against this rule; do not switch
// to interpolation.
fn percentile_path(all_paths: &[Vec<AssetPoint>], percentile: f64) -> Vec<AssetPoint> {
    let Some(first) = all_paths.first() else {
        return Vec::new();
    };
    let n = all_paths.len();
    let index = ((n as f64 * percentile / 100.0).floor() as usize).min(n - 1);

    (0..first.len())
        .map(|i| {
            let mut values: Vec<f64> = all_paths.iter().map(|path| path[i].assets).collect();
            values.sort_by(f64::total_cmp);
            AssetPoint {
                age: first[i].age,
                assets: values[index],
            }
        })
        .collect()
}

pub(crate) fn target_retirement_expenses(profile: &Profile) -> f64 {
    let years = profile.target_retire_age.saturating_sub(profile.current_age);
    let inflation_factor = (1.0 + profile.inflation_rate / 100.0).powi(years as i32);
    expenses_for_age(profile, profile.target_retire_age, inflation_factor, None)
}

fn derive_metrics(
    all_paths: &[Vec<AssetPoint>],
    median: &[AssetPoint],
    profile: &Profile,
) -> KeyMetrics {
    let surviving = all_paths
        .iter()
        .filter(|path| path.iter().all(|point| point.assets >= 0.0))
        .count();
    let survival_rate = if all_paths.is_empty() {
        0.0
    } else {
        surviving as f64 / all_paths.len() as f64 * 100.0
    };

    let asset_at_100 = median.last().map(|point| point.assets).unwrap_or(0.0);

    // 4% safe-withdrawal test against expenses at the target retirement age,
    // walked along the median path only.
    let target_expenses = target_retirement_expenses(profile);
    let fire_age = median
        .iter()
        .find(|point| point.assets * SAFE_WITHDRAWAL_RATE >= target_expenses)
        .map(|point| point.age);

    KeyMetrics {
        fire_age,
        years_to_fire: fire_age.map(|age| age - profile.current_age),
        asset_at_100,
        survival_rate,
    }
}

pub fn compute_exit_score(
    metrics: &KeyMetrics,
    profile: &Profile,
    paths: &PercentilePaths,
) -> ExitScoreDetail {
    let survival = metrics.survival_rate.clamp(0.0, 100.0);

    // 20 years of expense coverage scores 100.
    let target_expenses = target_retirement_expenses(profile);
    let initial_assets = paths.median.first().map(|point| point.assets).unwrap_or(0.0);
    let lifestyle = if target_expenses > 0.0 {
        (initial_assets / target_expenses * 5.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    let invested_ratio =
        profile.asset_invest / (profile.asset_cash + profile.asset_invest + 1.0);
    let risk = (100.0 - invested_ratio * profile.volatility * 500.0).clamp(0.0, 100.0);

    // 50% cash scores 100.
    let total_assets = profile.asset_cash + profile.asset_invest + profile.asset_dc;
    let liquidity_ratio = if total_assets > 0.0 {
        profile.asset_cash / total_assets
    } else {
        0.0
    };
    let liquidity = (liquidity_ratio * 200.0).clamp(0.0, 100.0);

    let overall =
        (0.4 * survival + 0.3 * lifestyle + 0.15 * risk + 0.15 * liquidity).round() as u32;

    ExitScoreDetail {
        overall,
        level: ScoreLevel::from_overall(overall),
        band: ReadinessBand::from_overall(overall),
        survival: survival.round() as u32,
        lifestyle: lifestyle.round() as u32,
        risk: risk.round() as u32,
        liquidity: liquidity.round() as u32,
    }
}
