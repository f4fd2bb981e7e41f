use serde::Serialize;

use super::types::{HouseholdMode, Profile};

// Combined income tax + resident tax + social insurance approximation, as
// marginal rates over gross annual income in man-yen.
struct TaxBand {
    upper: f64,
    rate: f64,
}

const TAX_BANDS: [TaxBand; 7] = [
    TaxBand {
        upper: 200.0,
        rate: 0.15,
    },
    TaxBand {
        upper: 400.0,
        rate: 0.20,
    },
    TaxBand {
        upper: 700.0,
        rate: 0.25,
    },
    TaxBand {
        upper: 1000.0,
        rate: 0.30,
    },
    TaxBand {
        upper: 1500.0,
        rate: 0.35,
    },
    TaxBand {
        upper: 3000.0,
        rate: 0.40,
    },
    TaxBand {
        upper: f64::INFINITY,
        rate: 0.45,
    },
];

pub fn effective_tax_rate(gross_income: f64) -> f64 {
    if gross_income <= 0.0 {
        return 0.0;
    }

    let mut tax = 0.0;
    let mut lower = 0.0;
    for band in &TAX_BANDS {
        let taxable = (gross_income.min(band.upper) - lower).max(0.0);
        tax += taxable * band.rate;
        if gross_income <= band.upper {
            break;
        }
        lower = band.upper;
    }

    tax / gross_income * 100.0
}

// Rate applied to one earner's taxable base. Manual mode uses the same rate
// for both earners; auto mode brackets each earner independently.
pub fn earner_tax_rate(profile: &Profile, taxable_base: f64) -> f64 {
    if profile.use_auto_tax_rate {
        effective_tax_rate(taxable_base)
    } else {
        profile.effective_tax_rate
    }
}

pub fn main_earner_base(profile: &Profile) -> f64 {
    profile.gross_income + profile.rsu_annual + profile.side_income_net
}

pub fn partner_earner_base(profile: &Profile) -> f64 {
    match profile.mode {
        HouseholdMode::Couple => profile.partner_gross_income + profile.partner_rsu_annual,
        HouseholdMode::Solo => 0.0,
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedTaxRates {
    pub main: f64,
    pub partner: f64,
    pub combined: f64,
}

// The combined rate is the contribution-weighted average of the per-earner
// rates, never the bracket rate of the summed income: summing first and then
// taxing understates progressivity for unequal incomes.
pub fn estimated_tax_rates(profile: &Profile) -> EstimatedTaxRates {
    if !profile.use_auto_tax_rate {
        return EstimatedTaxRates {
            main: profile.effective_tax_rate,
            partner: profile.effective_tax_rate,
            combined: profile.effective_tax_rate,
        };
    }

    let main_base = main_earner_base(profile);
    let partner_base = partner_earner_base(profile);
    let main = effective_tax_rate(main_base);
    let partner = effective_tax_rate(partner_base);
    let total = main_base + partner_base;
    let combined = if total > 0.0 {
        (main_base * main + partner_base * partner) / total
    } else {
        0.0
    };

    EstimatedTaxRates {
        main,
        partner,
        combined,
    }
}
