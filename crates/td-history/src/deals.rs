use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use td_schemas::{PriceRecord, Tier};

/// Best offer found for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub price: f64,
}

/// Tier -> best deal. Tiers without a usable price are simply missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestDeals(BTreeMap<Tier, Deal>);

impl BestDeals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tier: Tier, deal: Deal) -> Self {
        self.0.insert(tier, deal);
        self
    }

    pub fn get(&self, tier: Tier) -> Option<&Deal> {
        self.0.get(&tier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a loosely-typed snapshot shaped like
    /// `{"under25": {"id": "A1", "under25": 30}, "over50": null, ...}`.
    ///
    /// Each tier's deal carries its price under the tier's own key. Anything
    /// missing, null or non-numeric is skipped.
    pub fn from_value(snapshot: &Value) -> Self {
        let mut deals = BTreeMap::new();
        for tier in Tier::ALL {
            let Some(deal) = snapshot.get(tier.as_str()) else {
                continue;
            };
            let Some(price) = deal.get(tier.as_str()).and_then(Value::as_f64) else {
                continue;
            };
            let id = deal.get("id").and_then(Value::as_str).map(str::to_string);
            deals.insert(tier, Deal { id, price });
        }
        Self(deals)
    }

    /// Highest price per tier among records that are not closed.
    /// Ties keep the earlier record.
    pub fn from_records(records: &[PriceRecord]) -> Self {
        let mut deals: BTreeMap<Tier, Deal> = BTreeMap::new();
        for record in records.iter().filter(|r| r.is_open()) {
            for tier in Tier::ALL {
                let price = record.tier(tier);
                let better = deals.get(&tier).map_or(true, |d| price > d.price);
                if better {
                    deals.insert(
                        tier,
                        Deal {
                            id: Some(record.id.clone()),
                            price,
                        },
                    );
                }
            }
        }
        Self(deals)
    }

    /// Maximum price across all tiers, if any tier has one.
    pub fn highest(&self) -> Option<f64> {
        self.0.values().map(|d| d.price).reduce(f64::max)
    }
}
