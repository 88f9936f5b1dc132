use crate::dataset::Dataset;
use crate::hotspot::{Alert, HazardKind, Hotspot, Located, Severity};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    counts: [usize; 4],
}

impl SeverityCounts {
    pub fn tally<'a, T, I>(items: I) -> Self
    where
        T: Located + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut counts = Self::default();
        for item in items {
            counts.counts[item.severity() as usize] += 1;
        }
        counts
    }

    pub fn get(&self, severity: Severity) -> usize {
        self.counts[severity as usize]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Worst severity first.
    pub fn iter(&self) -> impl Iterator<Item = (Severity, usize)> + '_ {
        Severity::ALL
            .into_iter()
            .map(move |severity| (severity, self.get(severity)))
    }
}

pub fn total_displaced(alerts: &[Alert]) -> f64 {
    alerts.iter().map(|alert| alert.displaced).sum()
}

pub fn mean_confidence(alerts: &[Alert]) -> Option<f64> {
    if alerts.is_empty() {
        return None;
    }
    Some(alerts.iter().map(|alert| alert.confidence).sum::<f64>() / alerts.len() as f64)
}

/// Live feed order: worst severity first, then most displaced, then name.
pub fn live_feed(alerts: &[Alert]) -> Vec<&Alert> {
    let mut feed: Vec<&Alert> = alerts.iter().collect();
    feed.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.displaced.total_cmp(&a.displaced))
            .then_with(|| a.name.cmp(&b.name))
    });
    feed
}

/// Displaced people per country, largest first.
pub fn displaced_by_country(hotspots: &[Hotspot]) -> Vec<(String, u64)> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for hotspot in hotspots {
        *totals.entry(hotspot.country.as_str()).or_default() += hotspot.displaced;
    }
    let mut rows: Vec<(String, u64)> = totals
        .into_iter()
        .map(|(country, displaced)| (country.to_string(), displaced))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityInfrastructure {
    pub city_id: String,
    pub name: String,
    pub severity: Severity,
    pub nodes: usize,
    pub edges: usize,
    /// Node count per `status` value.
    pub statuses: BTreeMap<String, usize>,
}

impl CityInfrastructure {
    pub fn status(&self, status: &str) -> usize {
        self.statuses.get(status).copied().unwrap_or_default()
    }
}

/// Per-city infrastructure rollup, most nodes first.
pub fn infrastructure_by_city(dataset: &Dataset) -> Vec<CityInfrastructure> {
    let mut rows: Vec<CityInfrastructure> = dataset
        .cities()
        .iter()
        .map(|city| {
            let mut statuses = BTreeMap::new();
            let mut nodes = 0;
            for node in dataset.nodes_for_city(&city.city_id) {
                nodes += 1;
                let status = node.text("status").unwrap_or("unknown").to_lowercase();
                *statuses.entry(status).or_default() += 1;
            }
            CityInfrastructure {
                city_id: city.city_id.clone(),
                name: city.display_name(),
                severity: city.severity,
                nodes,
                edges: dataset.edges_for_city(&city.city_id).count(),
                statuses,
            }
        })
        .collect();
    rows.sort_by(|a, b| match b.nodes.cmp(&a.nodes) {
        Ordering::Equal => a.city_id.cmp(&b.city_id),
        other => other,
    });
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct HotspotFilter {
    pub min_severity: Severity,
    /// Empty means every hazard kind.
    pub kinds: Vec<HazardKind>,
    pub min_confidence: f64,
}

impl Default for HotspotFilter {
    fn default() -> Self {
        Self {
            min_severity: Severity::Low,
            kinds: Vec::new(),
            min_confidence: 0.0,
        }
    }
}

impl HotspotFilter {
    pub fn toggle_kind(&mut self, kind: HazardKind) {
        if let Some(position) = self.kinds.iter().position(|existing| *existing == kind) {
            self.kinds.remove(position);
        } else {
            self.kinds.push(kind);
        }
    }

    pub fn matches_hotspot(&self, hotspot: &Hotspot) -> bool {
        hotspot.severity >= self.min_severity
            && (self.kinds.is_empty() || self.kinds.contains(&hotspot.kind))
    }

    pub fn matches_alert(&self, alert: &Alert) -> bool {
        alert.severity >= self.min_severity && alert.confidence >= self.min_confidence
    }

    pub fn hotspots<'a>(&self, hotspots: &'a [Hotspot]) -> Vec<&'a Hotspot> {
        hotspots
            .iter()
            .filter(|hotspot| self.matches_hotspot(hotspot))
            .collect()
    }

    pub fn alerts<'a>(&self, alerts: &'a [Alert]) -> Vec<&'a Alert> {
        alerts.iter().filter(|alert| self.matches_alert(alert)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::GeoCoord;
    use crate::hotspot::builtin_hotspots;

    fn alert(name: &str, severity: Severity, displaced: f64, confidence: f64) -> Alert {
        Alert {
            id: name.to_lowercase(),
            name: name.to_string(),
            coord: GeoCoord::new(0.0, 0.0),
            severity,
            displaced,
            confidence,
        }
    }

    fn alerts() -> Vec<Alert> {
        vec![
            alert("Riyadh", Severity::Medium, 450.0, 0.82),
            alert("Manila", Severity::Critical, 2400.0, 0.94),
            alert("Dubai", Severity::Critical, 520.0, 0.87),
            alert("Jakarta", Severity::High, 3200.0, 0.78),
        ]
    }

    #[test]
    fn tallies_severities() {
        let counts = SeverityCounts::tally(&builtin_hotspots());
        assert_eq!(counts.get(Severity::Critical), 2);
        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.get(Severity::Medium), 2);
        assert_eq!(counts.get(Severity::Low), 0);
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.iter().next(), Some((Severity::Critical, 2)));
    }

    #[test]
    fn feed_orders_by_severity_then_displacement() {
        let alerts = alerts();
        let names: Vec<&str> = live_feed(&alerts).iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Manila", "Dubai", "Jakarta", "Riyadh"]);
    }

    #[test]
    fn totals_and_means() {
        let alerts = alerts();
        assert_eq!(total_displaced(&alerts), 6570.0);
        assert!((mean_confidence(&alerts).unwrap() - 0.8525).abs() < 1e-9);
        assert_eq!(mean_confidence(&[]), None);
    }

    #[test]
    fn groups_displacement_by_country() {
        let rows = displaced_by_country(&builtin_hotspots());
        assert_eq!(rows[0], ("Philippines".to_string(), 3_600));
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn filter_by_severity_and_kind() {
        let hotspots = builtin_hotspots();
        let mut filter = HotspotFilter {
            min_severity: Severity::High,
            ..HotspotFilter::default()
        };
        assert_eq!(filter.hotspots(&hotspots).len(), 4);

        filter.toggle_kind(HazardKind::Cyclone);
        let matched = filter.hotspots(&hotspots);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, "cebu-cyclone");

        filter.toggle_kind(HazardKind::Cyclone);
        assert!(filter.kinds.is_empty());
    }

    #[test]
    fn filter_alerts_by_confidence() {
        let alerts = alerts();
        let filter = HotspotFilter {
            min_confidence: 0.85,
            ..HotspotFilter::default()
        };
        assert_eq!(filter.alerts(&alerts).len(), 2);
    }

    #[test]
    fn rolls_up_infrastructure_per_city() {
        let dataset = Dataset::from_csv(
            "city_id,city,country,lat,lon,severity\nC1,Dubai,UAE,25,55,high\nC2,Manila,Philippines,14,121,low\n",
            "city_id,node_id,status\nC2,N1,Offline\nC2,N2,operational\nC2,N3,offline\nC1,N4,degraded\n",
            "city_id,source,target\nC2,N1,N2\n",
        )
        .unwrap();
        let rows = infrastructure_by_city(&dataset);
        assert_eq!(rows[0].city_id, "C2");
        assert_eq!(rows[0].nodes, 3);
        assert_eq!(rows[0].edges, 1);
        assert_eq!(rows[0].status("offline"), 2);
        assert_eq!(rows[1].status("degraded"), 1);
        assert_eq!(rows[1].status("offline"), 0);
    }
}
