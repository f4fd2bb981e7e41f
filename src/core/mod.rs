mod branch;
mod calc;
mod catalog;
mod engine;
mod tax;
mod types;

pub use branch::{
    BranchImpact, WorldlineRun, branch_to_life_events, build_profile_for_candidate,
    default_branches, default_candidate_budget, find_most_impactful_branch,
    generate_worldline_candidates, score_candidates,
};
pub use calc::{
    HousingOverrides, PENSION_START_AGE, annual_mortgage_payment, annual_pension,
    asset_gain_for_age, cash_flow_breakdown, expenses_for_age, housing_outlay_for_age,
    income_adjustment_for_age, net_income_for_age, rental_income_for_age,
};
pub use catalog::{
    BundleEvent, BundleEventKind, BundlePreset, EventCategory, PresetEvent, PresetKind,
    bundle_by_id, bundle_presets, default_amount_for, instantiate_bundle, instantiate_preset,
    preset_by_id, preset_events,
};
pub use engine::{
    ASSET_FLOOR, DEFAULT_SEED, NormalSource, SIMULATION_RUNS, SimConfig, SimRng,
    compute_exit_score, derive_seed, run_simulation, run_simulation_with, simulate_one_path,
};
pub use tax::{EstimatedTaxRates, effective_tax_rate, estimated_tax_rates};
pub use types::{
    AssetPoint, Branch, BranchCertainty, BranchEvent, CashFlowBreakdown, EventTarget,
    ExitScoreDetail, HomeStatus, HouseholdMode, HousingPurchaseDetails, KeyMetrics, LifeEvent,
    LifeEventKind, MAX_AGE, PercentilePaths, Profile, ReadinessBand, ScoreLevel,
    SimulationResult, WorldlineCandidate,
};
