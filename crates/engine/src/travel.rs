//! Travel cost estimator adapter.
//!
//! Distance and fare lookups live in an external estimator; this module only
//! folds its components into the single `calculated_travel_cost` stored on a
//! booking.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ResultEngine};

/// Cost components of a round trip. Missing components count as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelCostComponents {
    pub outbound: Option<Money>,
    pub return_leg: Option<Money>,
    pub local_cab: Option<Money>,
    pub accommodation: Option<Money>,
}

impl TravelCostComponents {
    /// Builds the components from raw form fields; blank fields are zero.
    pub fn from_inputs(
        outbound: Option<&str>,
        return_leg: Option<&str>,
        local_cab: Option<&str>,
        accommodation: Option<&str>,
    ) -> ResultEngine<Self> {
        Ok(Self {
            outbound: Some(Money::parse_or_zero(outbound)?),
            return_leg: Some(Money::parse_or_zero(return_leg)?),
            local_cab: Some(Money::parse_or_zero(local_cab)?),
            accommodation: Some(Money::parse_or_zero(accommodation)?),
        })
    }
}

/// Sums the components into one travel estimate.
pub fn aggregate_travel_cost(components: &TravelCostComponents) -> ResultEngine<Money> {
    let parts = [
        ("outbound", components.outbound),
        ("return", components.return_leg),
        ("local cab", components.local_cab),
        ("accommodation", components.accommodation),
    ];

    let mut total = Money::ZERO;
    for (label, amount) in parts {
        let amount = amount.unwrap_or(Money::ZERO);
        if amount.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "{label} travel cost must be >= 0, got {amount}"
            )));
        }
        total = total
            .checked_add(amount)
            .ok_or_else(|| EngineError::InvalidAmount("travel cost too large".to_string()))?;
    }
    Ok(total)
}

/// What the external estimator needs to price a trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub booking_number: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
}

/// External travel pricing (distance, mode, fares).
///
/// Implementations report upstream failures as
/// [`EngineError::TravelEstimate`]; they must never fall back to zero.
pub trait TravelEstimator {
    fn estimate(
        &self,
        request: &TravelRequest,
    ) -> impl Future<Output = ResultEngine<TravelCostComponents>> + Send;
}

/// Asks `estimator` for the trip and returns the aggregated cost.
pub async fn estimate_travel_cost<E: TravelEstimator>(
    estimator: &E,
    request: &TravelRequest,
) -> ResultEngine<Money> {
    let components = estimator.estimate(request).await.map_err(|err| match err {
        EngineError::TravelEstimate(_) => err,
        other => EngineError::TravelEstimate(other.to_string()),
    })?;
    tracing::debug!(
        booking = %request.booking_number,
        ?components,
        "travel estimate received"
    );
    aggregate_travel_cost(&components)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEstimator(ResultEngine<TravelCostComponents>);

    impl TravelEstimator for FixedEstimator {
        async fn estimate(&self, _request: &TravelRequest) -> ResultEngine<TravelCostComponents> {
            match &self.0 {
                Ok(components) => Ok(*components),
                Err(err) => Err(EngineError::TravelEstimate(err.to_string())),
            }
        }
    }

    fn request() -> TravelRequest {
        TravelRequest {
            booking_number: "HPJ-9921".to_string(),
            origin: "Varanasi".to_string(),
            destination: "Prayagraj".to_string(),
            departure: Utc::now(),
        }
    }

    #[test]
    fn sums_all_components() {
        let components = TravelCostComponents {
            outbound: Some(Money::new(350)),
            return_leg: Some(Money::new(350)),
            local_cab: Some(Money::new(100)),
            accommodation: None,
        };
        assert_eq!(aggregate_travel_cost(&components).unwrap(), Money::new(800));
    }

    #[test]
    fn blank_inputs_count_as_zero() {
        let components =
            TravelCostComponents::from_inputs(Some("450"), Some(""), None, Some("  ")).unwrap();
        assert_eq!(aggregate_travel_cost(&components).unwrap(), Money::new(450));
    }

    #[test]
    fn negative_component_is_rejected() {
        let components = TravelCostComponents {
            local_cab: Some(Money::new(-20)),
            ..Default::default()
        };
        assert!(matches!(
            aggregate_travel_cost(&components),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn estimator_result_is_aggregated() {
        let estimator = FixedEstimator(Ok(TravelCostComponents {
            outbound: Some(Money::new(1_200)),
            return_leg: Some(Money::new(1_200)),
            local_cab: Some(Money::new(300)),
            accommodation: Some(Money::new(900)),
        }));
        let total = estimate_travel_cost(&estimator, &request()).await.unwrap();
        assert_eq!(total, Money::new(3_600));
    }

    #[tokio::test]
    async fn estimator_failure_is_surfaced_not_zeroed() {
        let estimator = FixedEstimator(Err(EngineError::TravelEstimate(
            "upstream timeout".to_string(),
        )));
        let err = estimate_travel_cost(&estimator, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TravelEstimate(_)));
    }
}
