use serde::{Deserialize, Serialize};

pub const MAX_AGE: u32 = 100;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseholdMode {
    #[default]
    Solo,
    Couple,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeStatus {
    #[default]
    Renter,
    Owner,
    Relocating,
    Planning,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTarget {
    #[default]
    #[serde(rename = "self")]
    Main,
    Partner,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousingPurchaseDetails {
    pub property_price: f64,
    pub down_payment: f64,
    pub purchase_cost_rate: f64,
    pub mortgage_years: u32,
    pub interest_rate: f64,
    pub owner_annual_cost: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum LifeEventKind {
    IncomeIncrease {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
        #[serde(default)]
        target: EventTarget,
    },
    IncomeDecrease {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
        #[serde(default)]
        target: EventTarget,
    },
    ExpenseIncrease {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    ExpenseDecrease {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    RentalIncome {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    AssetGain {
        amount: f64,
    },
    HousingPurchase {
        purchase_details: HousingPurchaseDetails,
    },
    ChildBirth {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    Education {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    RetirementPartial {
        amount: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeEvent {
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(flatten)]
    pub kind: LifeEventKind,
}

impl LifeEvent {
    pub fn duration(&self) -> Option<u32> {
        match self.kind {
            LifeEventKind::IncomeIncrease { duration, .. }
            | LifeEventKind::IncomeDecrease { duration, .. }
            | LifeEventKind::ExpenseIncrease { duration, .. }
            | LifeEventKind::ExpenseDecrease { duration, .. }
            | LifeEventKind::RentalIncome { duration, .. }
            | LifeEventKind::ChildBirth { duration, .. }
            | LifeEventKind::Education { duration, .. }
            | LifeEventKind::RetirementPartial { duration, .. } => duration,
            LifeEventKind::AssetGain { .. } | LifeEventKind::HousingPurchase { .. } => None,
        }
    }

    // Active window is [age, age + duration); an unset or zero duration runs
    // through MAX_AGE.
    pub fn is_active_at(&self, age: u32) -> bool {
        if age < self.age {
            return false;
        }
        match self.duration() {
            Some(d) if d > 0 => age < self.age + d,
            _ => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub current_age: u32,
    pub target_retire_age: u32,
    pub mode: HouseholdMode,
    pub start_working_age: u32,

    pub gross_income: f64,
    pub rsu_annual: f64,
    pub side_income_net: f64,
    pub partner_gross_income: f64,
    pub partner_rsu_annual: f64,
    pub use_auto_tax_rate: bool,
    pub effective_tax_rate: f64,

    pub living_cost_annual: f64,
    pub housing_cost_annual: f64,
    pub home_status: HomeStatus,
    pub rent_inflation_rate: Option<f64>,

    pub asset_cash: f64,
    pub asset_invest: f64,
    pub asset_dc: f64,
    pub dc_contribution_annual: f64,

    pub expected_return: f64,
    pub inflation_rate: f64,
    pub volatility: f64,

    pub retire_spending_multiplier: f64,
    pub retire_passive_income: f64,
    pub post_retire_income: f64,
    pub post_retire_income_end_age: u32,

    pub life_events: Vec<LifeEvent>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            current_age: 35,
            target_retire_age: 55,
            mode: HouseholdMode::Solo,
            start_working_age: 23,
            gross_income: 1200.0,
            rsu_annual: 0.0,
            side_income_net: 0.0,
            partner_gross_income: 0.0,
            partner_rsu_annual: 0.0,
            use_auto_tax_rate: true,
            effective_tax_rate: 25.0,
            living_cost_annual: 360.0,
            housing_cost_annual: 180.0,
            home_status: HomeStatus::Renter,
            rent_inflation_rate: None,
            asset_cash: 500.0,
            asset_invest: 2000.0,
            asset_dc: 300.0,
            dc_contribution_annual: 66.0,
            expected_return: 5.0,
            inflation_rate: 2.0,
            volatility: 0.15,
            retire_spending_multiplier: 0.8,
            retire_passive_income: 0.0,
            post_retire_income: 0.0,
            post_retire_income_end_age: 70,
            life_events: Vec::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPoint {
    pub age: u32,
    pub assets: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentilePaths {
    pub p10: Vec<AssetPoint>,
    pub p25: Vec<AssetPoint>,
    pub median: Vec<AssetPoint>,
    pub p75: Vec<AssetPoint>,
    pub p90: Vec<AssetPoint>,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub fire_age: Option<u32>,
    pub years_to_fire: Option<u32>,
    pub asset_at_100: f64,
    pub survival_rate: f64,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowBreakdown {
    pub income: f64,
    pub pension: f64,
    pub dividends: f64,
    pub expenses: f64,
    pub net_cash_flow: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Solid,
    Caution,
    AtRisk,
}

impl ScoreLevel {
    pub fn from_overall(overall: u32) -> Self {
        if overall >= 70 {
            Self::Solid
        } else if overall >= 40 {
            Self::Caution
        } else {
            Self::AtRisk
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl ReadinessBand {
    pub fn from_overall(overall: u32) -> Self {
        if overall >= 70 {
            Self::Green
        } else if overall >= 55 {
            Self::Yellow
        } else if overall >= 40 {
            Self::Orange
        } else {
            Self::Red
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitScoreDetail {
    pub overall: u32,
    pub level: ScoreLevel,
    pub band: ReadinessBand,
    pub survival: u32,
    pub lifestyle: u32,
    pub risk: u32,
    pub liquidity: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub paths: PercentilePaths,
    pub metrics: KeyMetrics,
    pub cash_flow: CashFlowBreakdown,
    pub score: ExitScoreDetail,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchCertainty {
    Confirmed,
    Planned,
    Uncertain,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "eventType",
    content = "eventParams",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum BranchEvent {
    #[serde(rename = "_auto")]
    Auto,
    HousingPurchase {
        property_price: f64,
        down_payment: f64,
        loan_years: u32,
        interest_rate: f64,
        owner_annual_cost: f64,
    },
    Child {
        child_number: u32,
    },
    IncomeChange {
        change_percent: f64,
        #[serde(default)]
        duration: Option<u32>,
    },
    PartnerIncomeChange {
        new_income: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub label: String,
    pub detail: String,
    pub certainty: BranchCertainty,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub auto: bool,
    #[serde(flatten)]
    pub event: BranchEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldlineCandidate {
    pub id: String,
    pub label: String,
    pub description: String,
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub result: Option<SimulationResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense_event(age: u32, amount: f64, duration: Option<u32>) -> LifeEvent {
        LifeEvent {
            id: "test-expense".to_string(),
            name: "test".to_string(),
            age,
            is_recurring: true,
            kind: LifeEventKind::ExpenseIncrease { amount, duration },
        }
    }

    #[test]
    fn event_window_with_duration_is_half_open() {
        let event = expense_event(40, 50.0, Some(5));
        assert!(!event.is_active_at(39));
        assert!(event.is_active_at(40));
        assert!(event.is_active_at(44));
        assert!(!event.is_active_at(45));
    }

    #[test]
    fn event_without_duration_runs_to_max_age() {
        let event = expense_event(40, 50.0, None);
        assert!(event.is_active_at(40));
        assert!(event.is_active_at(MAX_AGE));
    }

    #[test]
    fn zero_duration_is_treated_as_open_ended() {
        let event = expense_event(40, 50.0, Some(0));
        assert!(event.is_active_at(99));
    }

    #[test]
    fn life_event_serde_round_trips_with_type_tag() {
        let event = LifeEvent {
            id: "e1".to_string(),
            name: "raise".to_string(),
            age: 40,
            is_recurring: false,
            kind: LifeEventKind::IncomeIncrease {
                amount: 300.0,
                duration: Some(5),
                target: EventTarget::Main,
            },
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "income_increase");
        assert_eq!(json["target"], "self");
        let back: LifeEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn branch_event_serde_uses_event_type_and_params() {
        let branch = Branch {
            id: "income_down_20".to_string(),
            label: "Income -20%".to_string(),
            detail: "240 man-yen less".to_string(),
            certainty: BranchCertainty::Uncertain,
            age: Some(38),
            auto: false,
            event: BranchEvent::IncomeChange {
                change_percent: -20.0,
                duration: None,
            },
        };
        let json = serde_json::to_value(&branch).expect("serialize");
        assert_eq!(json["eventType"], "income_change");
        assert_eq!(json["eventParams"]["changePercent"], -20.0);
        let back: Branch = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, branch);
    }

    #[test]
    fn auto_branch_serde_round_trips_without_params() {
        let branch = Branch {
            id: "age".to_string(),
            label: "Grow older".to_string(),
            detail: "35 -> 100".to_string(),
            certainty: BranchCertainty::Confirmed,
            age: None,
            auto: true,
            event: BranchEvent::Auto,
        };
        let json = serde_json::to_value(&branch).expect("serialize");
        assert_eq!(json["eventType"], "_auto");
        let back: Branch = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, branch);
    }

    #[test]
    fn profile_deserializes_from_partial_json() {
        let profile: Profile =
            serde_json::from_str(r#"{"currentAge":40,"grossIncome":800}"#).expect("deserialize");
        assert_eq!(profile.current_age, 40);
        assert_eq!(profile.gross_income, 800.0);
        assert_eq!(profile.target_retire_age, 55);
        assert!(profile.life_events.is_empty());
    }
}
