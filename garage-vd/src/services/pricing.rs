//! Provider price list
//!
//! Maps (provider, package) to the cost of one call. Government providers
//! are always free; unknown paid packages cost nothing and are logged.

use std::collections::HashMap;
use tracing::warn;

use crate::types::{packages, DataType, Provider};

/// Cost per call of each paid package
#[derive(Debug, Clone, PartialEq)]
pub struct PriceList {
    prices: HashMap<Provider, HashMap<String, f64>>,
}

impl Default for PriceList {
    fn default() -> Self {
        let vdg = [
            (packages::VEHICLE_DETAILS, 0.05),
            (packages::VEHICLE_DETAILS_WITH_IMAGE, 0.14),
            (packages::SPEC_AND_OPTION_DETAILS, 0.18),
            (packages::TYRE_DETAILS, 0.04),
            (packages::MOT_HISTORY_DETAILS, 0.05),
        ];
        let sws = [(packages::TECHNICAL_DATA, 0.12)];

        let mut prices = HashMap::new();
        prices.insert(
            Provider::Vdg,
            vdg.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
        );
        prices.insert(
            Provider::Sws,
            sws.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
        );

        Self { prices }
    }
}

impl PriceList {
    /// Default prices with `[prices]` config overrides applied
    ///
    /// Override keys are provider names (case-insensitive) mapping package
    /// names to costs.
    pub fn with_overrides(overrides: &HashMap<String, HashMap<String, f64>>) -> Self {
        let mut list = Self::default();
        for (provider_name, package_prices) in overrides {
            let provider = match provider_name.parse::<Provider>() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Ignoring price override: {}", e);
                    continue;
                }
            };
            if provider.is_free() {
                warn!(provider = %provider, "Ignoring price override for free provider");
                continue;
            }
            let entry = list.prices.entry(provider).or_default();
            for (package, cost) in package_prices {
                entry.insert(package.clone(), *cost);
            }
        }
        list
    }

    /// Cost of one package call
    pub fn cost(&self, provider: Provider, package: &str) -> f64 {
        if provider.is_free() {
            return 0.0;
        }
        match self.prices.get(&provider).and_then(|p| p.get(package)) {
            Some(cost) => *cost,
            None => {
                warn!(provider = %provider, package, "No price configured for package");
                0.0
            }
        }
    }

    /// Cost of a multi-package call (sum of its packages)
    pub fn packages_cost(&self, provider: Provider, package_names: &[&str]) -> f64 {
        package_names.iter().map(|p| self.cost(provider, p)).sum()
    }

    /// What the paid path for a data type would cost
    ///
    /// Reported against cache hits as the saving they produced.
    pub fn estimated_saving(&self, data_type: DataType) -> f64 {
        match data_type {
            DataType::Basic => self.cost(Provider::Vdg, packages::VEHICLE_DETAILS),
            DataType::Technical => self.packages_cost(
                Provider::Vdg,
                &[packages::SPEC_AND_OPTION_DETAILS, packages::TYRE_DETAILS],
            ),
            DataType::Comprehensive => self.packages_cost(Provider::Vdg, &packages::COMPREHENSIVE),
            DataType::Image => self.cost(Provider::Vdg, packages::VEHICLE_DETAILS_WITH_IMAGE),
            DataType::Mot => self.cost(Provider::Vdg, packages::MOT_HISTORY_DETAILS),
            DataType::Service => self.cost(Provider::Sws, packages::TECHNICAL_DATA),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_free_providers_cost_nothing() {
        let prices = PriceList::default();
        assert_eq!(prices.cost(Provider::Dvla, packages::VEHICLE_ENQUIRY), 0.0);
        assert_eq!(prices.cost(Provider::Dvsa, packages::MOT_HISTORY), 0.0);
    }

    #[test]
    fn test_multi_package_cost_is_sum() {
        let prices = PriceList::default();
        let cost = prices.packages_cost(Provider::Vdg, &packages::COMPREHENSIVE);
        assert!(approx(cost, 0.05 + 0.18 + 0.04));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut vdg = HashMap::new();
        vdg.insert("VehicleDetails".to_string(), 0.07);
        let mut overrides = HashMap::new();
        overrides.insert("vdg".to_string(), vdg);
        overrides.insert("nobody".to_string(), HashMap::new());

        let prices = PriceList::with_overrides(&overrides);
        assert!(approx(prices.cost(Provider::Vdg, packages::VEHICLE_DETAILS), 0.07));
        assert!(approx(prices.cost(Provider::Vdg, packages::TYRE_DETAILS), 0.04));
    }

    #[test]
    fn test_estimated_saving_follows_paid_path() {
        let prices = PriceList::default();
        assert!(approx(prices.estimated_saving(DataType::Basic), 0.05));
        assert!(approx(prices.estimated_saving(DataType::Technical), 0.22));
        assert!(approx(prices.estimated_saving(DataType::Service), 0.12));
    }

    #[test]
    fn test_unknown_package_is_free() {
        let prices = PriceList::default();
        assert_eq!(prices.cost(Provider::Vdg, "Unknown"), 0.0);
    }
}
