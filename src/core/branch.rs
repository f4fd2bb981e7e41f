use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::debug;

use super::engine::{SimConfig, run_simulation_stream};
use super::types::{
    Branch, BranchCertainty, BranchEvent, EventTarget, HomeStatus, HouseholdMode,
    HousingPurchaseDetails, LifeEvent, LifeEventKind, MAX_AGE, Profile, WorldlineCandidate,
};

const DEFAULT_CANDIDATE_BUDGET: usize = 5;

const CHILDCARE_ANNUAL_COST: f64 = 100.0;
const CHILDCARE_YEARS: u32 = 6;
const EDUCATION_ANNUAL_COST: f64 = 150.0;
const EDUCATION_YEARS: u32 = 16;

pub fn default_branches(profile: &Profile) -> Vec<Branch> {
    let total_income = profile.gross_income + profile.partner_gross_income;
    let mut branches = vec![
        Branch {
            id: "age".to_string(),
            label: "Grow older".to_string(),
            detail: format!("{} -> {}", profile.current_age, MAX_AGE),
            certainty: BranchCertainty::Confirmed,
            age: None,
            auto: true,
            event: BranchEvent::Auto,
        },
        Branch {
            id: "pension".to_string(),
            label: "Draw pension".to_string(),
            detail: "from age 65".to_string(),
            certainty: BranchCertainty::Confirmed,
            age: None,
            auto: true,
            event: BranchEvent::Auto,
        },
    ];

    if profile.home_status == HomeStatus::Renter {
        // Property sized at 5x combined income, clamped to a realistic range.
        let sized = (total_income * 5.0 / 100.0).round() * 100.0;
        let property_price = sized.clamp(6000.0, 10000.0);
        branches.push(Branch {
            id: "housing_purchase".to_string(),
            label: "Buy a home".to_string(),
            detail: format!("{property_price} man-yen"),
            certainty: BranchCertainty::Planned,
            age: Some(profile.current_age + 2),
            auto: false,
            event: BranchEvent::HousingPurchase {
                property_price,
                down_payment: 1500.0,
                loan_years: 35,
                interest_rate: 0.5,
                owner_annual_cost: 40.0,
            },
        });
    }

    if profile.mode == HouseholdMode::Couple {
        for (child_number, offset) in [(1u32, 2u32), (2, 4)] {
            branches.push(Branch {
                id: format!("child_{child_number}"),
                label: match child_number {
                    1 => "First child".to_string(),
                    _ => "Second child".to_string(),
                },
                detail: format!("at age {}", profile.current_age + offset),
                certainty: BranchCertainty::Planned,
                age: Some(profile.current_age + offset),
                auto: false,
                event: BranchEvent::Child { child_number },
            });
        }
    }

    branches.push(Branch {
        id: "income_down_20".to_string(),
        label: "Income -20%".to_string(),
        detail: format!("{} man-yen less", (profile.gross_income * 0.2).round()),
        certainty: BranchCertainty::Uncertain,
        age: Some(profile.current_age + 3),
        auto: false,
        event: BranchEvent::IncomeChange {
            change_percent: -20.0,
            duration: None,
        },
    });
    branches.push(Branch {
        id: "pacedown".to_string(),
        label: "Pace down".to_string(),
        detail: format!(
            "income -50% ({} man-yen less)",
            (profile.gross_income * 0.5).round()
        ),
        certainty: BranchCertainty::Uncertain,
        age: Some(profile.target_retire_age.saturating_sub(5)),
        auto: false,
        event: BranchEvent::IncomeChange {
            change_percent: -50.0,
            duration: None,
        },
    });
    branches.push(Branch {
        id: "expat".to_string(),
        label: "Expat assignment".to_string(),
        detail: "income +30% for 2 years".to_string(),
        certainty: BranchCertainty::Uncertain,
        age: Some(profile.current_age + 3),
        auto: false,
        event: BranchEvent::IncomeChange {
            change_percent: 30.0,
            duration: Some(2),
        },
    });

    if profile.mode == HouseholdMode::Couple {
        branches.push(Branch {
            id: "partner_quit".to_string(),
            label: "Partner stops working".to_string(),
            detail: format!("{} man-yen -> 0", profile.partner_gross_income),
            certainty: BranchCertainty::Uncertain,
            age: Some(profile.current_age + 2),
            auto: false,
            event: BranchEvent::PartnerIncomeChange { new_income: 0.0 },
        });
    }

    branches
}

pub fn branch_to_life_events(branch: &Branch, profile: &Profile) -> Vec<LifeEvent> {
    match branch.event {
        BranchEvent::Auto => Vec::new(),

        BranchEvent::HousingPurchase {
            property_price,
            down_payment,
            loan_years,
            interest_rate,
            owner_annual_cost,
        } => vec![LifeEvent {
            id: format!("branch-{}", branch.id),
            name: branch.label.clone(),
            age: branch.age.unwrap_or(profile.current_age + 2),
            is_recurring: false,
            kind: LifeEventKind::HousingPurchase {
                purchase_details: HousingPurchaseDetails {
                    property_price,
                    down_payment,
                    purchase_cost_rate: 7.0,
                    mortgage_years: loan_years,
                    interest_rate,
                    owner_annual_cost,
                },
            },
        }],

        BranchEvent::Child { child_number } => {
            let base_age = branch.age.unwrap_or(profile.current_age + 2);
            vec![
                LifeEvent {
                    id: format!("branch-{}-childcare", branch.id),
                    name: format!("Child {child_number} childcare"),
                    age: base_age,
                    is_recurring: true,
                    kind: LifeEventKind::ExpenseIncrease {
                        amount: CHILDCARE_ANNUAL_COST,
                        duration: Some(CHILDCARE_YEARS),
                    },
                },
                LifeEvent {
                    id: format!("branch-{}-education", branch.id),
                    name: format!("Child {child_number} education"),
                    age: base_age + CHILDCARE_YEARS,
                    is_recurring: true,
                    kind: LifeEventKind::ExpenseIncrease {
                        amount: EDUCATION_ANNUAL_COST,
                        duration: Some(EDUCATION_YEARS),
                    },
                },
            ]
        }

        BranchEvent::IncomeChange {
            change_percent,
            duration,
        } => {
            let amount = (profile.gross_income * change_percent.abs() / 100.0).round();
            if amount == 0.0 {
                return Vec::new();
            }
            vec![LifeEvent {
                id: format!("branch-{}", branch.id),
                name: branch.label.clone(),
                age: branch.age.unwrap_or(profile.current_age + 3),
                is_recurring: false,
                kind: if change_percent > 0.0 {
                    LifeEventKind::IncomeIncrease {
                        amount,
                        duration,
                        target: EventTarget::Main,
                    }
                } else {
                    LifeEventKind::IncomeDecrease {
                        amount,
                        duration,
                        target: EventTarget::Main,
                    }
                },
            }]
        }

        BranchEvent::PartnerIncomeChange { .. } => {
            if profile.partner_gross_income <= 0.0 {
                return Vec::new();
            }
            vec![LifeEvent {
                id: format!("branch-{}", branch.id),
                name: branch.label.clone(),
                age: branch.age.unwrap_or(profile.current_age + 2),
                is_recurring: false,
                kind: LifeEventKind::IncomeDecrease {
                    amount: profile.partner_gross_income,
                    duration: None,
                    target: EventTarget::Partner,
                },
            }]
        }
    }
}

pub fn generate_worldline_candidates(
    selected: &[Branch],
    max: usize,
) -> Vec<WorldlineCandidate> {
    let confirmed: Vec<&Branch> = selected
        .iter()
        .filter(|b| b.certainty == BranchCertainty::Confirmed)
        .collect();
    let planned: Vec<&Branch> = selected
        .iter()
        .filter(|b| b.certainty == BranchCertainty::Planned)
        .collect();
    let uncertain: Vec<&Branch> = selected
        .iter()
        .filter(|b| b.certainty == BranchCertainty::Uncertain)
        .collect();

    let baseline_branches: Vec<Branch> = confirmed
        .iter()
        .chain(planned.iter())
        .map(|b| (*b).clone())
        .collect();

    let mut candidates = vec![WorldlineCandidate {
        id: "baseline".to_string(),
        label: "Baseline".to_string(),
        description: if planned.is_empty() {
            "current plan only".to_string()
        } else {
            format!(
                "as planned: {}",
                planned
                    .iter()
                    .map(|b| b.label.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            )
        },
        branches: baseline_branches.clone(),
        score: None,
        result: None,
    }];

    for branch in &uncertain {
        if candidates.len() >= max {
            break;
        }
        let mut branches = baseline_branches.clone();
        branches.push((*branch).clone());
        candidates.push(WorldlineCandidate {
            id: format!("variant-{}", branch.id),
            label: branch.label.clone(),
            description: format!("baseline + {}", branch.label),
            branches,
            score: None,
            result: None,
        });
    }

    if uncertain.len() >= 2 && candidates.len() < max {
        let mut branches = baseline_branches;
        branches.extend(uncertain.iter().map(|b| (*b).clone()));
        candidates.push(WorldlineCandidate {
            id: "worst-case".to_string(),
            label: "Complex risk".to_string(),
            description: format!(
                "all uncertainties: {}",
                uncertain
                    .iter()
                    .map(|b| b.label.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            ),
            branches,
            score: None,
            result: None,
        });
    }

    candidates.truncate(max);
    candidates
}

pub fn default_candidate_budget() -> usize {
    DEFAULT_CANDIDATE_BUDGET
}

// Every candidate gets its own deep copy of the event list; candidates must
// stay independently mutable.
pub fn build_profile_for_candidate(profile: &Profile, candidate: &WorldlineCandidate) -> Profile {
    let mut derived = profile.clone();

    for branch in &candidate.branches {
        derived
            .life_events
            .extend(branch_to_life_events(branch, profile));
        if matches!(branch.event, BranchEvent::HousingPurchase { .. }) {
            derived.home_status = HomeStatus::Planning;
        }
    }

    derived
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldlineRun {
    pub candidates: Vec<WorldlineCandidate>,
    pub cancelled: bool,
}

// Candidates run in order so progress reporting is meaningful; the 1000 paths
// inside each candidate are parallel. Cancellation is checked between
// candidates only, and already-scored candidates are returned.
pub fn score_candidates(
    profile: &Profile,
    mut candidates: Vec<WorldlineCandidate>,
    config: &SimConfig,
    mut progress: impl FnMut(usize, usize),
    cancel: &AtomicBool,
) -> WorldlineRun {
    let total = candidates.len();
    let mut cancelled = false;

    for index in 0..candidates.len() {
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }

        let derived = build_profile_for_candidate(profile, &candidates[index]);
        let result = run_simulation_stream(&derived, config, (index + 1) as u32);
        candidates[index].score = Some(result.score.overall);
        debug!(
            candidate = %candidates[index].id,
            score = result.score.overall,
            "worldline candidate scored"
        );
        candidates[index].result = Some(result);
        progress(index + 1, total);
    }

    WorldlineRun {
        candidates,
        cancelled,
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchImpact {
    pub branch: Branch,
    pub score_diff: u32,
}

pub fn find_most_impactful_branch(candidates: &[WorldlineCandidate]) -> Option<BranchImpact> {
    let baseline = candidates.iter().find(|c| c.id == "baseline")?;
    let baseline_score = baseline.score?;

    let mut max_diff = 0;
    let mut impact_branch: Option<&Branch> = None;

    for candidate in candidates {
        if candidate.id == "baseline" {
            continue;
        }
        let Some(score) = candidate.score else {
            continue;
        };
        let diff = baseline_score.abs_diff(score);
        if diff > max_diff {
            let baseline_ids: Vec<&str> =
                baseline.branches.iter().map(|b| b.id.as_str()).collect();
            if let Some(unique) = candidate
                .branches
                .iter()
                .find(|b| !baseline_ids.contains(&b.id.as_str()))
            {
                max_diff = diff;
                impact_branch = Some(unique);
            }
        }
    }

    impact_branch.map(|branch| BranchImpact {
        branch: branch.clone(),
        score_diff: max_diff,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch_ids(branches: &[Branch]) -> Vec<&str> {
        branches.iter().map(|b| b.id.as_str()).collect()
    }

    fn couple_profile() -> Profile {
        Profile {
            mode: HouseholdMode::Couple,
            gross_income: 1600.0,
            partner_gross_income: 800.0,
            ..Profile::default()
        }
    }

    #[test]
    fn solo_renter_gets_housing_but_no_children() {
        let branches = default_branches(&Profile::default());
        let ids = branch_ids(&branches);
        assert_eq!(
            ids,
            vec![
                "age",
                "pension",
                "housing_purchase",
                "income_down_20",
                "pacedown",
                "expat"
            ]
        );
    }

    #[test]
    fn couple_gets_children_and_partner_quit() {
        let branches = default_branches(&couple_profile());
        let ids = branch_ids(&branches);
        assert!(ids.contains(&"child_1"));
        assert!(ids.contains(&"child_2"));
        assert!(ids.contains(&"partner_quit"));
    }

    #[test]
    fn owner_gets_no_housing_branch() {
        let profile = Profile {
            home_status: HomeStatus::Owner,
            ..Profile::default()
        };
        let ids: Vec<String> = default_branches(&profile)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert!(!ids.iter().any(|id| id == "housing_purchase"));
    }

    #[test]
    fn housing_branch_price_is_clamped() {
        // Combined income 2400 sizes to 12000, clamped to the 10000 ceiling.
        let branches = default_branches(&couple_profile());
        let housing = branches
            .iter()
            .find(|b| b.id == "housing_purchase")
            .expect("renter couple gets a housing branch");
        let BranchEvent::HousingPurchase { property_price, .. } = housing.event else {
            panic!("wrong event kind");
        };
        assert!((6000.0..=10000.0).contains(&property_price));
        assert_eq!(property_price, 10000.0);

        // Low income clamps up to the floor.
        let modest = Profile {
            gross_income: 400.0,
            ..Profile::default()
        };
        let branches = default_branches(&modest);
        let housing = branches
            .iter()
            .find(|b| b.id == "housing_purchase")
            .expect("renter gets a housing branch");
        let BranchEvent::HousingPurchase { property_price, .. } = housing.event else {
            panic!("wrong event kind");
        };
        assert_eq!(property_price, 6000.0);
    }

    #[test]
    fn auto_branches_translate_to_no_events() {
        let profile = Profile::default();
        for branch in default_branches(&profile).iter().filter(|b| b.auto) {
            assert!(branch_to_life_events(branch, &profile).is_empty());
        }
    }

    #[test]
    fn child_branch_expands_to_childcare_and_education() {
        let profile = couple_profile();
        let branches = default_branches(&profile);
        let child = branches.iter().find(|b| b.id == "child_1").expect("child");
        let events = branch_to_life_events(child, &profile);
        assert_eq!(events.len(), 2);

        let childcare = &events[0];
        assert_eq!(childcare.age, profile.current_age + 2);
        assert_eq!(
            childcare.kind,
            LifeEventKind::ExpenseIncrease {
                amount: 100.0,
                duration: Some(6),
            }
        );

        let education = &events[1];
        assert_eq!(education.age, childcare.age + 6);
        assert_eq!(
            education.kind,
            LifeEventKind::ExpenseIncrease {
                amount: 150.0,
                duration: Some(16),
            }
        );
    }

    #[test]
    fn income_change_is_sized_from_gross_income() {
        let profile = Profile::default();
        let branch = Branch {
            id: "income_down_20".to_string(),
            label: "Income -20%".to_string(),
            detail: String::new(),
            certainty: BranchCertainty::Uncertain,
            age: Some(38),
            auto: false,
            event: BranchEvent::IncomeChange {
                change_percent: -20.0,
                duration: None,
            },
        };
        let events = branch_to_life_events(&branch, &profile);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].kind,
            LifeEventKind::IncomeDecrease {
                amount: 240.0,
                duration: None,
                target: EventTarget::Main,
            }
        );
    }

    #[test]
    fn zero_percent_income_change_is_suppressed() {
        let branch = Branch {
            id: "noop".to_string(),
            label: "noop".to_string(),
            detail: String::new(),
            certainty: BranchCertainty::Uncertain,
            age: None,
            auto: false,
            event: BranchEvent::IncomeChange {
                change_percent: 0.0,
                duration: None,
            },
        };
        assert!(branch_to_life_events(&branch, &Profile::default()).is_empty());
    }

    #[test]
    fn partner_quit_uses_full_partner_income() {
        let profile = couple_profile();
        let branches = default_branches(&profile);
        let quit = branches
            .iter()
            .find(|b| b.id == "partner_quit")
            .expect("partner quit");
        let events = branch_to_life_events(quit, &profile);
        assert_eq!(
            events[0].kind,
            LifeEventKind::IncomeDecrease {
                amount: 800.0,
                duration: None,
                target: EventTarget::Partner,
            }
        );
    }

    #[test]
    fn partner_quit_is_suppressed_without_partner_income() {
        let profile = Profile {
            mode: HouseholdMode::Couple,
            partner_gross_income: 0.0,
            ..Profile::default()
        };
        let branch = Branch {
            id: "partner_quit".to_string(),
            label: "Partner stops working".to_string(),
            detail: String::new(),
            certainty: BranchCertainty::Uncertain,
            age: None,
            auto: false,
            event: BranchEvent::PartnerIncomeChange { new_income: 0.0 },
        };
        assert!(branch_to_life_events(&branch, &profile).is_empty());
    }

    #[test]
    fn baseline_comes_first_and_carries_planned_branches() {
        let branches = default_branches(&couple_profile());
        let candidates = generate_worldline_candidates(&branches, 5);
        assert_eq!(candidates[0].id, "baseline");
        let baseline_ids: Vec<&str> = candidates[0]
            .branches
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert!(baseline_ids.contains(&"age"));
        assert!(baseline_ids.contains(&"child_1"));
        assert!(!baseline_ids.contains(&"income_down_20"));
    }

    #[test]
    fn candidate_count_never_exceeds_max() {
        let branches = default_branches(&couple_profile());
        for max in 1..=6 {
            let candidates = generate_worldline_candidates(&branches, max);
            assert!(candidates.len() <= max);
            assert_eq!(candidates[0].id, "baseline");
        }
    }

    #[test]
    fn worst_case_appears_iff_two_or_more_uncertain() {
        let branches = default_branches(&Profile::default());
        let uncertain: Vec<Branch> = branches
            .iter()
            .filter(|b| b.certainty == BranchCertainty::Uncertain)
            .cloned()
            .collect();
        assert!(uncertain.len() >= 2);

        let with_many = generate_worldline_candidates(&branches, 10);
        assert!(with_many.iter().any(|c| c.id == "worst-case"));

        let single: Vec<Branch> = branches
            .iter()
            .filter(|b| b.certainty != BranchCertainty::Uncertain)
            .cloned()
            .chain(uncertain.iter().take(1).cloned())
            .collect();
        let with_one = generate_worldline_candidates(&single, 10);
        assert!(!with_one.iter().any(|c| c.id == "worst-case"));
    }

    #[test]
    fn candidate_profile_is_a_deep_copy() {
        let profile = Profile::default();
        let branches = default_branches(&profile);
        let candidates = generate_worldline_candidates(&branches, 5);
        let variant = candidates
            .iter()
            .find(|c| c.id == "variant-income_down_20")
            .expect("variant");

        let derived = build_profile_for_candidate(&profile, variant);
        assert!(!derived.life_events.is_empty());
        assert!(profile.life_events.is_empty());
        // Housing branch in the baseline set flips the home status.
        assert_eq!(derived.home_status, HomeStatus::Planning);
    }

    #[test]
    fn scoring_fills_scores_and_reports_progress() {
        let profile = Profile::default();
        let branches = default_branches(&profile);
        let candidates = generate_worldline_candidates(&branches, 3);
        let expected = candidates.len();

        let mut calls = Vec::new();
        let cancel = AtomicBool::new(false);
        let run = score_candidates(
            &profile,
            candidates,
            &SimConfig { runs: 40, seed: 9 },
            |done, total| calls.push((done, total)),
            &cancel,
        );

        assert!(!run.cancelled);
        assert_eq!(calls.len(), expected);
        assert!(run.candidates.iter().all(|c| c.score.is_some()));
        assert!(run.candidates.iter().all(|c| c.result.is_some()));
        assert!(
            run.candidates
                .iter()
                .all(|c| c.score.expect("scored") <= 100)
        );
    }

    #[test]
    fn cancellation_stops_between_candidates() {
        let profile = Profile::default();
        let branches = default_branches(&profile);
        let candidates = generate_worldline_candidates(&branches, 5);

        let cancel = AtomicBool::new(false);
        let run = score_candidates(
            &profile,
            candidates,
            &SimConfig { runs: 40, seed: 9 },
            |done, _| {
                if done == 1 {
                    cancel.store(true, Ordering::Relaxed);
                }
            },
            &cancel,
        );

        assert!(run.cancelled);
        assert_eq!(
            run.candidates.iter().filter(|c| c.score.is_some()).count(),
            1
        );
    }

    #[test]
    fn most_impactful_branch_is_the_largest_deviation() {
        let profile = Profile::default();
        let branches = default_branches(&profile);
        let candidates = generate_worldline_candidates(&branches, 5);
        let cancel = AtomicBool::new(false);
        let run = score_candidates(
            &profile,
            candidates,
            &SimConfig { runs: 60, seed: 21 },
            |_, _| {},
            &cancel,
        );

        let baseline_score = run.candidates[0].score.expect("baseline scored");
        if let Some(impact) = find_most_impactful_branch(&run.candidates) {
            let max_diff = run
                .candidates
                .iter()
                .skip(1)
                .filter_map(|c| c.score)
                .map(|s| baseline_score.abs_diff(s))
                .max()
                .unwrap_or(0);
            assert_eq!(impact.score_diff, max_diff);
            assert_eq!(impact.branch.certainty, BranchCertainty::Uncertain);
        }
    }

    #[test]
    fn unscored_candidates_yield_no_impact() {
        let branches = default_branches(&Profile::default());
        let candidates = generate_worldline_candidates(&branches, 5);
        assert!(find_most_impactful_branch(&candidates).is_none());
    }
}
