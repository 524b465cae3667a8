//! Read-side dashboard
//!
//! Built from whatever the cache slots hold at the moment of the call;
//! nothing here fetches or waits. Degraded slots contribute nothing, and
//! every section reports which providers fed it and whether any of them
//! is stale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use propwatch_core::{
    merge_solar_indices, rank_by_score, Activation, ActivationKind, ActivationsSummary, BandCondition, Contest,
    ContestStatus, MeteorShower, MeteorStatus, Ranked, Scoreable, SolarIndices,
};
use propwatch_fetch::{Snapshot, SourceHealth};
use propwatch_sources::PropagationReport;

/// Activations listed individually; the rest only count toward totals
pub const TOP_ACTIVATIONS: usize = 20;

/// Current slot contents, one entry per source (`None` when disabled or
/// not yet fetched)
#[derive(Default)]
pub struct DashboardInputs {
    pub noaa: Option<Arc<Snapshot<Option<SolarIndices>>>>,
    pub hamqsl: Option<Arc<Snapshot<PropagationReport>>>,
    pub pota: Option<Arc<Snapshot<Vec<Activation>>>>,
    pub sota: Option<Arc<Snapshot<Vec<Activation>>>>,
    pub contests: Option<Arc<Snapshot<Vec<Contest>>>>,
    pub meteors: Option<Arc<Snapshot<Vec<MeteorShower>>>>,
    pub health: Vec<SourceHealth>,
}

/// Where a section's data came from
#[derive(Debug, Clone, Default, Serialize)]
pub struct Provenance {
    /// Labels of the snapshots holding real data
    pub sources: Vec<String>,
    /// Some contributing snapshot is past its staleness bound or was
    /// served by the fallback path
    pub stale: bool,
}

impl Provenance {
    fn add<T>(&mut self, snapshot: Option<&Snapshot<T>>, now: DateTime<Utc>) {
        let Some(snapshot) = snapshot.filter(|s| s.has_data()) else {
            return;
        };
        self.sources.push(snapshot.source_label.clone());
        self.stale |= snapshot.serving_stale || snapshot.is_stale_at(now);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section<T> {
    pub items: Vec<Ranked<T>>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolarSection {
    pub reading: Ranked<SolarIndices>,
    pub geomagnetic_activity: String,
    pub solar_flux_level: String,
    #[serde(flatten)]
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationsSection {
    pub score: u8,
    pub favorable: bool,
    pub total: usize,
    pub pota: usize,
    pub sota: usize,
    /// Highest-scoring activations, at most [`TOP_ACTIVATIONS`]
    pub top: Vec<Ranked<Activation>>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// Everything a display needs, ranked as of `generated_at`
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub solar: Option<SolarSection>,
    pub bands: Section<BandCondition>,
    pub activations: ActivationsSection,
    pub meteor_showers: Section<MeteorShower>,
    pub contests: Section<Contest>,
    pub sources: Vec<SourceHealth>,
}

impl Dashboard {
    pub fn assemble(inputs: &DashboardInputs, now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now,
            solar: solar_section(inputs, now),
            bands: bands_section(inputs, now),
            activations: activations_section(inputs, now),
            meteor_showers: meteor_section(inputs, now),
            contests: contest_section(inputs, now),
            sources: inputs.health.clone(),
        }
    }

    /// Number of highlighted items across all sections
    pub fn favorable_count(&self) -> usize {
        let solar = self.solar.iter().filter(|s| s.reading.favorable).count();
        let bands = self.bands.items.iter().filter(|r| r.favorable).count();
        let activations = self.activations.top.iter().filter(|r| r.favorable).count();
        let meteors = self.meteor_showers.items.iter().filter(|r| r.favorable).count();
        let contests = self.contests.items.iter().filter(|r| r.favorable).count();
        solar + bands + activations + meteors + contests
    }
}

fn solar_section(inputs: &DashboardInputs, now: DateTime<Utc>) -> Option<SolarSection> {
    let noaa = inputs.noaa.as_deref();
    let hamqsl = inputs.hamqsl.as_deref();

    let flux_provider = noaa.and_then(Snapshot::real_value).and_then(Option::as_ref);
    let geomagnetic_provider = hamqsl.and_then(Snapshot::real_value).and_then(|r| r.solar.as_ref());
    let merged = merge_solar_indices(flux_provider, geomagnetic_provider)?;

    let mut provenance = Provenance::default();
    if flux_provider.is_some() {
        provenance.add(noaa, now);
    }
    if geomagnetic_provider.is_some() {
        provenance.add(hamqsl, now);
    }

    Some(SolarSection {
        geomagnetic_activity: merged.geomagnetic_activity().to_string(),
        solar_flux_level: merged.solar_flux_level().to_string(),
        reading: Ranked::new(merged, now),
        provenance,
    })
}

fn bands_section(inputs: &DashboardInputs, now: DateTime<Utc>) -> Section<BandCondition> {
    let hamqsl = inputs.hamqsl.as_deref();
    let bands = hamqsl
        .and_then(Snapshot::real_value)
        .map(|report| report.bands.clone())
        .unwrap_or_default();

    let mut provenance = Provenance::default();
    provenance.add(hamqsl, now);

    Section {
        items: rank_by_score(bands, now),
        provenance,
    }
}

fn activations_section(inputs: &DashboardInputs, now: DateTime<Utc>) -> ActivationsSection {
    let feeds = [inputs.pota.as_deref(), inputs.sota.as_deref()];

    let mut provenance = Provenance::default();
    let mut all = Vec::new();
    let mut last_updated = None;
    for snapshot in feeds.into_iter().flatten() {
        if let Some(activations) = snapshot.real_value() {
            all.extend(activations.iter().cloned());
            last_updated = last_updated.max(snapshot.last_success_at);
        }
        provenance.add(Some(snapshot), now);
    }

    let summary = ActivationsSummary::new(all, last_updated.unwrap_or(now));
    let mut top = rank_by_score(summary.activations().iter().cloned(), now);
    top.truncate(TOP_ACTIVATIONS);

    ActivationsSection {
        score: summary.score_at(now),
        favorable: summary.is_favorable_at(now),
        total: summary.total(),
        pota: summary.count(ActivationKind::Pota),
        sota: summary.count(ActivationKind::Sota),
        top,
        provenance,
    }
}

fn meteor_section(inputs: &DashboardInputs, now: DateTime<Utc>) -> Section<MeteorShower> {
    let meteors = inputs.meteors.as_deref();
    let live = meteors
        .and_then(Snapshot::real_value)
        .into_iter()
        .flatten()
        .filter(|shower| shower.status(now) != MeteorStatus::Ended)
        .cloned();

    let mut provenance = Provenance::default();
    provenance.add(meteors, now);

    Section {
        items: rank_by_score(live, now),
        provenance,
    }
}

fn contest_section(inputs: &DashboardInputs, now: DateTime<Utc>) -> Section<Contest> {
    let contests = inputs.contests.as_deref();
    let live = contests
        .and_then(Snapshot::real_value)
        .into_iter()
        .flatten()
        .filter(|contest| contest.status(now) != ContestStatus::Ended)
        .cloned();

    let mut provenance = Provenance::default();
    provenance.add(contests, now);

    Section {
        items: rank_by_score(live, now),
        provenance,
    }
}
