use super::tax::{earner_tax_rate, main_earner_base, partner_earner_base};
use super::types::{
    CashFlowBreakdown, EventTarget, HomeStatus, HouseholdMode, HousingPurchaseDetails, LifeEvent,
    LifeEventKind, Profile,
};

pub const PENSION_START_AGE: u32 = 65;

// Post-retirement business income is credited after a flat 20% haircut.
const POST_RETIRE_INCOME_RETENTION: f64 = 0.8;

// Pension model: basic pension accrued over 40 years plus an
// earnings-related component on the capped standard remuneration.
const BASIC_PENSION_FULL: f64 = 78.0;
const EARNINGS_ACCRUAL: f64 = 0.005481;
const REMUNERATION_CAP: f64 = 1560.0;
const MAX_CONTRIBUTION_YEARS: u32 = 40;

const DIVIDEND_YIELD: f64 = 0.03;

#[derive(Copy, Clone, Debug, Default)]
pub struct HousingOverrides {
    pub home_status: Option<HomeStatus>,
    pub housing_cost_annual: Option<f64>,
}

pub fn income_adjustment_for_age(events: &[LifeEvent], age: u32, target: EventTarget) -> f64 {
    let mut adjustment = 0.0;
    for event in events {
        if !event.is_active_at(age) {
            continue;
        }
        match event.kind {
            LifeEventKind::IncomeIncrease {
                amount, target: t, ..
            } if t == target => adjustment += amount,
            LifeEventKind::IncomeDecrease {
                amount, target: t, ..
            } if t == target => adjustment -= amount,
            LifeEventKind::RetirementPartial { amount, .. } if target == EventTarget::Main => {
                adjustment -= amount;
            }
            _ => {}
        }
    }
    adjustment
}

pub fn rental_income_for_age(events: &[LifeEvent], age: u32) -> f64 {
    events
        .iter()
        .filter(|event| event.is_active_at(age))
        .map(|event| match event.kind {
            LifeEventKind::RentalIncome { amount, .. } => amount,
            _ => 0.0,
        })
        .sum()
}

pub fn asset_gain_for_age(events: &[LifeEvent], age: u32) -> f64 {
    events
        .iter()
        .filter(|event| event.age == age)
        .map(|event| match event.kind {
            LifeEventKind::AssetGain { amount } => amount,
            _ => 0.0,
        })
        .sum()
}

// One-shot cash outflow in the purchase year: down payment plus transaction
// costs. The financed remainder is carried by the mortgage payment.
pub fn housing_outlay_for_age(events: &[LifeEvent], age: u32) -> f64 {
    events
        .iter()
        .filter(|event| event.age == age)
        .map(|event| match event.kind {
            LifeEventKind::HousingPurchase { purchase_details } => {
                purchase_details.down_payment
                    + purchase_details.property_price * purchase_details.purchase_cost_rate / 100.0
            }
            _ => 0.0,
        })
        .sum()
}

pub fn annual_mortgage_payment(details: &HousingPurchaseDetails) -> f64 {
    let principal = (details.property_price - details.down_payment).max(0.0);
    if principal <= 0.0 {
        return 0.0;
    }
    if details.mortgage_years == 0 {
        return principal;
    }
    let years = details.mortgage_years as f64;
    let rate = details.interest_rate / 100.0;
    if rate <= 0.0 {
        principal / years
    } else {
        principal * rate / (1.0 - (1.0 + rate).powf(-years))
    }
}

fn active_housing_purchase(events: &[LifeEvent], age: u32) -> Option<(u32, HousingPurchaseDetails)> {
    events
        .iter()
        .filter(|event| event.is_active_at(age))
        .filter_map(|event| match event.kind {
            LifeEventKind::HousingPurchase { purchase_details } => {
                Some((event.age, purchase_details))
            }
            _ => None,
        })
        .min_by_key(|(purchase_age, _)| *purchase_age)
}

pub fn net_income_for_age(profile: &Profile, age: u32) -> f64 {
    let events = &profile.life_events;
    let rental = rental_income_for_age(events, age);

    if age >= profile.target_retire_age {
        let pension = if age >= PENSION_START_AGE {
            annual_pension(profile)
        } else {
            0.0
        };
        let business = if age < profile.post_retire_income_end_age {
            profile.post_retire_income * POST_RETIRE_INCOME_RETENTION
        } else {
            0.0
        };
        return pension + business + profile.retire_passive_income + rental;
    }

    // Each earner is taxed on their own adjusted base. Summing first and
    // taxing once would understate progressivity.
    let main_base = (main_earner_base(profile)
        + income_adjustment_for_age(events, age, EventTarget::Main))
    .max(0.0);
    let mut net = main_base * (1.0 - earner_tax_rate(profile, main_base) / 100.0);

    if profile.mode == HouseholdMode::Couple {
        let partner_base = (partner_earner_base(profile)
            + income_adjustment_for_age(events, age, EventTarget::Partner))
        .max(0.0);
        net += partner_base * (1.0 - earner_tax_rate(profile, partner_base) / 100.0);
    }

    net + rental
}

pub fn expenses_for_age(
    profile: &Profile,
    age: u32,
    inflation_factor: f64,
    overrides: Option<&HousingOverrides>,
) -> f64 {
    let events = &profile.life_events;
    let home_status = overrides
        .and_then(|o| o.home_status)
        .unwrap_or(profile.home_status);
    let base_housing = overrides
        .and_then(|o| o.housing_cost_annual)
        .unwrap_or(profile.housing_cost_annual);

    let housing = if let Some((purchase_age, details)) = active_housing_purchase(events, age) {
        // Mortgage and running costs are nominal-fixed from the purchase year.
        if age < purchase_age + details.mortgage_years {
            annual_mortgage_payment(&details) + details.owner_annual_cost
        } else {
            details.owner_annual_cost
        }
    } else {
        match home_status {
            HomeStatus::Renter | HomeStatus::Planning => {
                let rate = profile
                    .rent_inflation_rate
                    .unwrap_or(profile.inflation_rate);
                let years = age.saturating_sub(profile.current_age);
                base_housing * (1.0 + rate / 100.0).powi(years as i32)
            }
            HomeStatus::Owner | HomeStatus::Relocating => base_housing,
        }
    };

    let mut total = profile.living_cost_annual * inflation_factor + housing;

    for event in events {
        if !event.is_active_at(age) {
            continue;
        }
        match event.kind {
            LifeEventKind::ExpenseIncrease { amount, .. }
            | LifeEventKind::ChildBirth { amount, .. }
            | LifeEventKind::Education { amount, .. } => total += amount * inflation_factor,
            LifeEventKind::ExpenseDecrease { amount, .. } => total -= amount * inflation_factor,
            _ => {}
        }
    }

    if age >= profile.target_retire_age {
        total *= profile.retire_spending_multiplier;
    }

    total.max(0.0)
}

pub fn annual_pension(profile: &Profile) -> f64 {
    let years = profile
        .target_retire_age
        .saturating_sub(profile.start_working_age)
        .min(MAX_CONTRIBUTION_YEARS) as f64;

    let earner = |base: f64| {
        if base <= 0.0 {
            return 0.0;
        }
        BASIC_PENSION_FULL * years / MAX_CONTRIBUTION_YEARS as f64
            + base.min(REMUNERATION_CAP) * EARNINGS_ACCRUAL * years
    };

    let mut pension = earner(profile.gross_income + profile.rsu_annual);
    if profile.mode == HouseholdMode::Couple {
        pension += earner(profile.partner_gross_income + profile.partner_rsu_annual);
    }
    pension
}

// At-retirement snapshot used by the dashboard: what comes in and goes out
// in the first retired year.
pub fn cash_flow_breakdown(profile: &Profile) -> CashFlowBreakdown {
    let retire_age = profile.target_retire_age;
    let years = retire_age.saturating_sub(profile.current_age);
    let inflation_factor = (1.0 + profile.inflation_rate / 100.0).powi(years as i32);

    let income = profile.retire_passive_income;
    let pension = if retire_age >= PENSION_START_AGE {
        annual_pension(profile)
    } else {
        0.0
    };
    let dividends = profile.asset_invest * DIVIDEND_YIELD;
    let expenses = expenses_for_age(profile, retire_age, inflation_factor, None);

    CashFlowBreakdown {
        income,
        pension,
        dividends,
        expenses,
        net_cash_flow: income + pension + dividends - expenses,
    }
}
