//! Multi-source merge of solar indices
//!
//! Two providers publish overlapping solar readings. Merging is per field:
//! - Solar flux and sunspot number come from the flux provider (NOAA SWPC)
//! - K-index and A-index come from the geomagnetic provider (HamQSL)
//! - Any field missing from its preferred provider falls back to the other
//!
//! The merged label names every provider that contributed a field.

use crate::SolarIndices;

/// Merge readings from the flux-preferred and geomagnetic-preferred providers.
///
/// Returns `None` only when both are absent. With a single provider the
/// reading is returned unchanged, label included.
pub fn merge_solar_indices(
    flux_provider: Option<&SolarIndices>,
    geomagnetic_provider: Option<&SolarIndices>,
) -> Option<SolarIndices> {
    match (flux_provider, geomagnetic_provider) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(flux), Some(geo)) => {
            // Both providers always contribute a field, so the label names both
            let source = join_labels(&flux.source, &geo.source);

            Some(SolarIndices {
                solar_flux: flux.solar_flux,
                a_index: geo.a_index,
                k_index: geo.k_index,
                sunspot_number: flux.sunspot_number.or(geo.sunspot_number),
                timestamp: flux.timestamp.max(geo.timestamp),
                source,
            })
        }
    }
}

fn join_labels(first: &str, second: &str) -> String {
    if first == second {
        first.to_string()
    } else {
        format!("{} + {}", first, second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_merge_both_absent() {
        assert_eq!(merge_solar_indices(None, None), None);
    }

    #[test]
    fn test_merge_single_provider_keeps_label() {
        let now = Utc::now();
        let noaa = SolarIndices::new(152.0, 8.0, 2.0, Some(131), now, "NOAA SWPC").unwrap();

        let merged = merge_solar_indices(Some(&noaa), None).unwrap();
        assert_eq!(merged, noaa);
        assert_eq!(merged.source(), "NOAA SWPC");

        let hamqsl = SolarIndices::new(149.0, 12.0, 3.0, None, now, "HamQSL").unwrap();
        let merged = merge_solar_indices(None, Some(&hamqsl)).unwrap();
        assert_eq!(merged, hamqsl);
    }

    #[test]
    fn test_merge_is_field_level() {
        let now = Utc::now();
        let noaa = SolarIndices::new(152.0, 8.0, 2.0, Some(131), now - Duration::hours(3), "NOAA SWPC").unwrap();
        let hamqsl = SolarIndices::new(149.0, 12.0, 3.67, Some(120), now, "HamQSL").unwrap();

        let merged = merge_solar_indices(Some(&noaa), Some(&hamqsl)).unwrap();
        assert_eq!(merged.solar_flux(), 152.0);
        assert_eq!(merged.sunspot_number(), Some(131));
        assert_eq!(merged.k_index(), 3.67);
        assert_eq!(merged.a_index(), 12.0);
        assert_eq!(merged.timestamp(), now);
        assert_eq!(merged.source(), "NOAA SWPC + HamQSL");
    }

    #[test]
    fn test_merge_sunspot_fallback() {
        let now = Utc::now();
        let noaa = SolarIndices::new(152.0, 8.0, 2.0, None, now, "NOAA SWPC").unwrap();
        let hamqsl = SolarIndices::new(149.0, 12.0, 3.0, Some(118), now, "HamQSL").unwrap();

        let merged = merge_solar_indices(Some(&noaa), Some(&hamqsl)).unwrap();
        assert_eq!(merged.sunspot_number(), Some(118));
    }
}
