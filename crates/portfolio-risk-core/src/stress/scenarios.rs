use serde::Serialize;

use crate::types::AssetClass;

/// A historical market crisis replayed as fixed per-asset-class shocks.
#[derive(Debug, Clone, Serialize)]
pub struct CrisisScenario {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub start_date: &'static str,
    pub end_date: &'static str,
    /// Broad-market peak-to-trough move, percent (negative = decline)
    pub peak_to_trough_pct: f64,
    pub recovery_days: u32,
    /// Percent move applied to holdings of each listed class
    pub shocks: &'static [(AssetClass, f64)],
    pub characteristics: &'static [&'static str],
}

impl CrisisScenario {
    /// Shock for an asset class; classes the scenario does not list take
    /// the stock shock.
    pub fn shock_for(&self, class: AssetClass) -> f64 {
        self.listed_shock(class)
            .or_else(|| self.listed_shock(AssetClass::Stock))
            .unwrap_or(0.0)
    }

    fn listed_shock(&self, class: AssetClass) -> Option<f64> {
        self.shocks
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, s)| *s)
    }
}

/// Compiled-in crisis reference table.
pub static CRISIS_SCENARIOS: [CrisisScenario; 5] = [
    CrisisScenario {
        id: "financial_crisis_2008",
        name: "Global Financial Crisis",
        description: "Subprime mortgage collapse and banking-system failure following the Lehman Brothers bankruptcy",
        start_date: "2007-10-09",
        end_date: "2009-03-09",
        peak_to_trough_pct: -56.8,
        recovery_days: 1400,
        shocks: &[
            (AssetClass::Stock, -50.0),
            (AssetClass::Bond, 5.0),
            (AssetClass::Commodity, -35.0),
            (AssetClass::Forex, -10.0),
        ],
        characteristics: &[
            "Credit freeze and interbank funding stress",
            "Flight to quality into government bonds",
            "Correlations across risk assets converged toward 1",
        ],
    },
    CrisisScenario {
        id: "covid_crash_2020",
        name: "COVID-19 Crash",
        description: "Pandemic-driven liquidity shock and fastest bear market on record",
        start_date: "2020-02-19",
        end_date: "2020-03-23",
        peak_to_trough_pct: -33.9,
        recovery_days: 148,
        shocks: &[
            (AssetClass::Stock, -34.0),
            (AssetClass::Crypto, -50.0),
            (AssetClass::Bond, 3.0),
            (AssetClass::Commodity, -25.0),
            (AssetClass::Forex, -5.0),
        ],
        characteristics: &[
            "Dash for cash across all asset classes",
            "Volatility index above 80",
            "Rapid policy response and V-shaped recovery",
        ],
    },
    CrisisScenario {
        id: "dotcom_bubble_2000",
        name: "Dot-Com Bubble Burst",
        description: "Collapse of technology valuations after the late-1990s internet speculation",
        start_date: "2000-03-10",
        end_date: "2002-10-09",
        peak_to_trough_pct: -49.1,
        recovery_days: 2500,
        shocks: &[
            (AssetClass::Stock, -49.0),
            (AssetClass::Bond, 10.0),
            (AssetClass::Commodity, -10.0),
            (AssetClass::Forex, -5.0),
        ],
        characteristics: &[
            "Growth and technology stocks hit hardest",
            "Prolonged multi-year drawdown",
            "Bonds rallied as rates were cut",
        ],
    },
    CrisisScenario {
        id: "black_monday_1987",
        name: "Black Monday",
        description: "Single-day equity crash amplified by portfolio insurance and program trading",
        start_date: "1987-10-19",
        end_date: "1987-10-19",
        peak_to_trough_pct: -33.5,
        recovery_days: 400,
        shocks: &[
            (AssetClass::Stock, -22.6),
            (AssetClass::Bond, 2.0),
            (AssetClass::Commodity, -5.0),
            (AssetClass::Forex, -3.0),
        ],
        characteristics: &[
            "Largest one-day percentage decline in index history",
            "Market-structure driven selling",
            "Limited spillover into the real economy",
        ],
    },
    CrisisScenario {
        id: "crypto_winter_2022",
        name: "Crypto Winter",
        description: "Stablecoin collapse, exchange failures and tightening monetary policy",
        start_date: "2021-11-10",
        end_date: "2022-11-21",
        peak_to_trough_pct: -77.0,
        recovery_days: 730,
        shocks: &[
            (AssetClass::Crypto, -75.0),
            (AssetClass::Stock, -25.0),
            (AssetClass::Bond, -15.0),
            (AssetClass::Commodity, 10.0),
            (AssetClass::Forex, -5.0),
        ],
        characteristics: &[
            "Contagion across crypto lenders and exchanges",
            "Simultaneous stock and bond drawdown",
            "Commodities supported by inflation",
        ],
    },
];

pub fn crisis_scenario(id: &str) -> Option<&'static CrisisScenario> {
    CRISIS_SCENARIOS.iter().find(|s| s.id == id)
}

pub fn list_crisis_scenarios() -> &'static [CrisisScenario] {
    &CRISIS_SCENARIOS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        let s = crisis_scenario("financial_crisis_2008").unwrap();
        assert_eq!(s.shock_for(AssetClass::Stock), -50.0);
        assert_eq!(s.shock_for(AssetClass::Bond), 5.0);
        assert!(crisis_scenario("tulip_mania_1637").is_none());
    }

    #[test]
    fn test_unlisted_class_takes_stock_shock() {
        let s = crisis_scenario("financial_crisis_2008").unwrap();
        assert_eq!(s.shock_for(AssetClass::Crypto), -50.0);
    }

    #[test]
    fn test_ids_unique_and_every_table_has_stock() {
        let ids: std::collections::HashSet<_> = CRISIS_SCENARIOS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), CRISIS_SCENARIOS.len());
        for s in list_crisis_scenarios() {
            assert!(s.shocks.iter().any(|(c, _)| *c == AssetClass::Stock), "{}", s.id);
            assert!(s.peak_to_trough_pct < 0.0);
        }
    }
}
