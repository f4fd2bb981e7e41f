use super::types::{
    EventTarget, HousingPurchaseDetails, LifeEvent, LifeEventKind, Profile,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventCategory {
    Family,
    Career,
    Lifestyle,
    Asset,
    Housing,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PresetKind {
    IncomeIncrease(EventTarget),
    IncomeDecrease(EventTarget),
    ExpenseIncrease,
    ExpenseDecrease,
    AssetGain,
    RentalIncome,
    HousingPurchase(HousingPurchaseDetails),
}

#[derive(Copy, Clone, Debug)]
pub struct PresetEvent {
    pub id: &'static str,
    pub name: &'static str,
    pub category: EventCategory,
    pub description: &'static str,
    pub age_offset: u32,
    pub default_amount: f64,
    // 0 means one-shot/permanent depending on the kind; see instantiate_preset.
    pub default_duration: u32,
    pub is_recurring: bool,
    pub kind: PresetKind,
}

static PRESET_EVENTS: [PresetEvent; 25] = [
    // family
    PresetEvent {
        id: "wedding",
        name: "Wedding",
        category: EventCategory::Family,
        description: "One-off ceremony and reception costs",
        age_offset: 1,
        default_amount: 350.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "child1",
        name: "First child (childcare)",
        category: EventCategory::Family,
        description: "Childcare costs from birth to primary school",
        age_offset: 2,
        default_amount: 100.0,
        default_duration: 6,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "child2",
        name: "Second child (childcare)",
        category: EventCategory::Family,
        description: "Childcare costs for a second child",
        age_offset: 4,
        default_amount: 100.0,
        default_duration: 6,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "edu_private_elem",
        name: "Private elementary school",
        category: EventCategory::Family,
        description: "Annual private elementary tuition",
        age_offset: 8,
        default_amount: 150.0,
        default_duration: 6,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "edu_private_middle",
        name: "Private middle school",
        category: EventCategory::Family,
        description: "Annual private middle-school tuition",
        age_offset: 14,
        default_amount: 130.0,
        default_duration: 3,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "edu_university",
        name: "University",
        category: EventCategory::Family,
        description: "Annual university tuition",
        age_offset: 20,
        default_amount: 180.0,
        default_duration: 4,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "nursing_care_parent",
        name: "Parent care",
        category: EventCategory::Family,
        description: "Annual cost of caring for a parent",
        age_offset: 25,
        default_amount: 120.0,
        default_duration: 10,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "nursing_care_self",
        name: "Own care",
        category: EventCategory::Family,
        description: "Late-life care costs for yourself",
        age_offset: 45,
        default_amount: 180.0,
        default_duration: 5,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    // career
    PresetEvent {
        id: "promotion",
        name: "Promotion",
        category: EventCategory::Career,
        description: "Permanent salary increase",
        age_offset: 3,
        default_amount: 100.0,
        default_duration: 0,
        is_recurring: false,
        kind: PresetKind::IncomeIncrease(EventTarget::Main),
    },
    PresetEvent {
        id: "job_change",
        name: "Job change",
        category: EventCategory::Career,
        description: "Salary change from switching employers",
        age_offset: 2,
        default_amount: 150.0,
        default_duration: 0,
        is_recurring: false,
        kind: PresetKind::IncomeIncrease(EventTarget::Main),
    },
    PresetEvent {
        id: "overseas_assignment",
        name: "Overseas assignment",
        category: EventCategory::Career,
        description: "Expat allowance for a fixed term",
        age_offset: 3,
        default_amount: 200.0,
        default_duration: 3,
        is_recurring: true,
        kind: PresetKind::IncomeIncrease(EventTarget::Main),
    },
    PresetEvent {
        id: "side_business",
        name: "Side business",
        category: EventCategory::Career,
        description: "Additional income from a side business",
        age_offset: 1,
        default_amount: 50.0,
        default_duration: 10,
        is_recurring: true,
        kind: PresetKind::IncomeIncrease(EventTarget::Main),
    },
    PresetEvent {
        id: "partner_childcare_leave",
        name: "Partner childcare leave",
        category: EventCategory::Career,
        description: "Partner income drop during childcare leave",
        age_offset: 2,
        default_amount: 0.0, // sized from partner income
        default_duration: 1,
        is_recurring: true,
        kind: PresetKind::IncomeDecrease(EventTarget::Partner),
    },
    PresetEvent {
        id: "partner_part_time",
        name: "Partner part-time",
        category: EventCategory::Career,
        description: "Partner income drop from reduced hours",
        age_offset: 3,
        default_amount: 0.0, // sized from partner income
        default_duration: 3,
        is_recurring: true,
        kind: PresetKind::IncomeDecrease(EventTarget::Partner),
    },
    PresetEvent {
        id: "partner_career_change",
        name: "Partner job change",
        category: EventCategory::Career,
        description: "Partner salary change from switching employers",
        age_offset: 3,
        default_amount: 100.0,
        default_duration: 0,
        is_recurring: false,
        kind: PresetKind::IncomeIncrease(EventTarget::Partner),
    },
    // lifestyle
    PresetEvent {
        id: "world_trip",
        name: "Round-the-world trip",
        category: EventCategory::Lifestyle,
        description: "One-off long travel budget",
        age_offset: 5,
        default_amount: 200.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "overseas_relocation",
        name: "Move abroad",
        category: EventCategory::Lifestyle,
        description: "Extra annual cost of living abroad",
        age_offset: 5,
        default_amount: 100.0,
        default_duration: 5,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "car_purchase",
        name: "Car purchase",
        category: EventCategory::Lifestyle,
        description: "One-off vehicle purchase",
        age_offset: 2,
        default_amount: 300.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "renovation",
        name: "Renovation",
        category: EventCategory::Lifestyle,
        description: "One-off home renovation",
        age_offset: 10,
        default_amount: 500.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "travel",
        name: "Annual travel",
        category: EventCategory::Lifestyle,
        description: "Recurring yearly travel budget",
        age_offset: 0,
        default_amount: 50.0,
        default_duration: 10,
        is_recurring: true,
        kind: PresetKind::ExpenseIncrease,
    },
    PresetEvent {
        id: "expense_cut",
        name: "Cost cutting",
        category: EventCategory::Lifestyle,
        description: "Savings from trimming fixed costs",
        age_offset: 0,
        default_amount: 60.0,
        default_duration: 20,
        is_recurring: true,
        kind: PresetKind::ExpenseDecrease,
    },
    // asset
    PresetEvent {
        id: "inheritance",
        name: "Inheritance",
        category: EventCategory::Asset,
        description: "One-off asset increase from an inheritance",
        age_offset: 25,
        default_amount: 2000.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::AssetGain,
    },
    PresetEvent {
        id: "housing_gift",
        name: "Housing gift",
        category: EventCategory::Asset,
        description: "Family support toward a home purchase",
        age_offset: 2,
        default_amount: 1000.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::AssetGain,
    },
    PresetEvent {
        id: "severance",
        name: "Severance pay",
        category: EventCategory::Asset,
        description: "Lump-sum retirement payout",
        age_offset: 30,
        default_amount: 3000.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::AssetGain,
    },
    // housing
    PresetEvent {
        id: "housing_purchase",
        name: "Home purchase",
        category: EventCategory::Housing,
        description: "Buy a home with a mortgage",
        age_offset: 2,
        default_amount: 8000.0,
        default_duration: 1,
        is_recurring: false,
        kind: PresetKind::HousingPurchase(HousingPurchaseDetails {
            property_price: 8000.0,
            down_payment: 1500.0,
            purchase_cost_rate: 7.0,
            mortgage_years: 35,
            interest_rate: 0.5,
            owner_annual_cost: 40.0,
        }),
    },
];

pub fn preset_events() -> &'static [PresetEvent] {
    &PRESET_EVENTS
}

pub fn preset_by_id(id: &str) -> Option<&'static PresetEvent> {
    PRESET_EVENTS.iter().find(|preset| preset.id == id)
}

// Partner-scoped presets are sized from the partner's current income.
pub fn default_amount_for(preset: &PresetEvent, profile: &Profile) -> f64 {
    match preset.id {
        "partner_childcare_leave" => (profile.partner_gross_income * 0.3).round(),
        "partner_part_time" => (profile.partner_gross_income * 0.25).round(),
        _ => preset.default_amount,
    }
}

pub fn instantiate_preset(preset: &PresetEvent, profile: &Profile, age: Option<u32>) -> LifeEvent {
    let age = age.unwrap_or(profile.current_age + preset.age_offset);
    let amount = default_amount_for(preset, profile);
    let duration = if preset.default_duration > 0 {
        Some(preset.default_duration)
    } else {
        None
    };

    let kind = match preset.kind {
        PresetKind::IncomeIncrease(target) => LifeEventKind::IncomeIncrease {
            amount,
            duration,
            target,
        },
        PresetKind::IncomeDecrease(target) => LifeEventKind::IncomeDecrease {
            amount,
            duration,
            target,
        },
        PresetKind::ExpenseIncrease => LifeEventKind::ExpenseIncrease { amount, duration },
        PresetKind::ExpenseDecrease => LifeEventKind::ExpenseDecrease { amount, duration },
        PresetKind::AssetGain => LifeEventKind::AssetGain { amount },
        PresetKind::RentalIncome => LifeEventKind::RentalIncome { amount, duration },
        PresetKind::HousingPurchase(purchase_details) => {
            LifeEventKind::HousingPurchase { purchase_details }
        }
    };

    LifeEvent {
        id: format!("preset-{}-{age}", preset.id),
        name: preset.name.to_string(),
        age,
        is_recurring: preset.is_recurring,
        kind,
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BundleEvent {
    pub name: &'static str,
    pub kind: BundleEventKind,
    pub amount: fn(&Profile) -> f64,
    pub duration: u32,
    pub is_recurring: bool,
    pub age_offset: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BundleEventKind {
    IncomeIncrease(EventTarget),
    IncomeDecrease(EventTarget),
    ExpenseIncrease,
    ExpenseDecrease,
    RentalIncome,
}

#[derive(Copy, Clone, Debug)]
pub struct BundlePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: EventCategory,
    pub default_age_offset: u32,
    pub couple_only: bool,
    pub events: &'static [BundleEvent],
}

fn expat_allowance(_: &Profile) -> f64 {
    200.0
}

fn housing_subsidy(profile: &Profile) -> f64 {
    profile.housing_cost_annual
}

fn home_rental_income(profile: &Profile) -> f64 {
    (profile.housing_cost_annual * 0.8).round()
}

fn partner_leave_reduction(profile: &Profile) -> f64 {
    (profile.partner_gross_income * 0.3).round()
}

fn partner_part_time_reduction(profile: &Profile) -> f64 {
    (profile.partner_gross_income * 0.25).round()
}

fn birth_cost(_: &Profile) -> f64 {
    100.0
}

static BUNDLE_PRESETS: [BundlePreset; 3] = [
    BundlePreset {
        id: "overseas_with_home",
        name: "Expat assignment (home owner)",
        description: "Allowance + housing subsidy + renting out the home (3 years)",
        category: EventCategory::Career,
        default_age_offset: 3,
        couple_only: false,
        events: &[
            BundleEvent {
                name: "Expat allowance",
                kind: BundleEventKind::IncomeIncrease(EventTarget::Main),
                amount: expat_allowance,
                duration: 3,
                is_recurring: true,
                age_offset: 0,
            },
            BundleEvent {
                name: "Housing subsidy",
                kind: BundleEventKind::ExpenseDecrease,
                amount: housing_subsidy,
                duration: 3,
                is_recurring: true,
                age_offset: 0,
            },
            BundleEvent {
                name: "Home rental income",
                kind: BundleEventKind::RentalIncome,
                amount: home_rental_income,
                duration: 3,
                is_recurring: true,
                age_offset: 0,
            },
        ],
    },
    BundlePreset {
        id: "overseas_renter",
        name: "Expat assignment (renting)",
        description: "Allowance + housing subsidy (3 years)",
        category: EventCategory::Career,
        default_age_offset: 3,
        couple_only: false,
        events: &[
            BundleEvent {
                name: "Expat allowance",
                kind: BundleEventKind::IncomeIncrease(EventTarget::Main),
                amount: expat_allowance,
                duration: 3,
                is_recurring: true,
                age_offset: 0,
            },
            BundleEvent {
                name: "Housing subsidy",
                kind: BundleEventKind::ExpenseDecrease,
                amount: housing_subsidy,
                duration: 3,
                is_recurring: true,
                age_offset: 0,
            },
        ],
    },
    BundlePreset {
        id: "partner_childcare_package",
        name: "Partner leave + part-time package",
        description: "One year of leave, two years part-time, plus birth costs",
        category: EventCategory::Family,
        default_age_offset: 2,
        couple_only: true,
        events: &[
            BundleEvent {
                name: "Partner childcare leave",
                kind: BundleEventKind::IncomeDecrease(EventTarget::Partner),
                amount: partner_leave_reduction,
                duration: 1,
                is_recurring: true,
                age_offset: 0,
            },
            BundleEvent {
                name: "Partner part-time",
                kind: BundleEventKind::IncomeDecrease(EventTarget::Partner),
                amount: partner_part_time_reduction,
                duration: 2,
                is_recurring: true,
                age_offset: 1,
            },
            BundleEvent {
                name: "Birth costs",
                kind: BundleEventKind::ExpenseIncrease,
                amount: birth_cost,
                duration: 1,
                is_recurring: false,
                age_offset: 0,
            },
        ],
    },
];

pub fn bundle_presets() -> &'static [BundlePreset] {
    &BUNDLE_PRESETS
}

pub fn bundle_by_id(id: &str) -> Option<&'static BundlePreset> {
    BUNDLE_PRESETS.iter().find(|bundle| bundle.id == id)
}

pub fn instantiate_bundle(
    bundle: &BundlePreset,
    profile: &Profile,
    base_age: Option<u32>,
) -> Vec<LifeEvent> {
    let base_age = base_age.unwrap_or(profile.current_age + bundle.default_age_offset);

    bundle
        .events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let amount = (event.amount)(profile);
            let duration = if event.duration > 0 {
                Some(event.duration)
            } else {
                None
            };
            let kind = match event.kind {
                BundleEventKind::IncomeIncrease(target) => LifeEventKind::IncomeIncrease {
                    amount,
                    duration,
                    target,
                },
                BundleEventKind::IncomeDecrease(target) => LifeEventKind::IncomeDecrease {
                    amount,
                    duration,
                    target,
                },
                BundleEventKind::ExpenseIncrease => {
                    LifeEventKind::ExpenseIncrease { amount, duration }
                }
                BundleEventKind::ExpenseDecrease => {
                    LifeEventKind::ExpenseDecrease { amount, duration }
                }
                BundleEventKind::RentalIncome => {
                    LifeEventKind::RentalIncome { amount, duration }
                }
            };
            LifeEvent {
                id: format!("bundle-{}-{index}", bundle.id),
                name: event.name.to_string(),
                age: base_age + event.age_offset,
                is_recurring: event.is_recurring,
                kind,
            }
        })
        .collect()
}
