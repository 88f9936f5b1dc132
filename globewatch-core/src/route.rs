use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    GlobalOverview,
    RiskAssessment,
    InfrastructureImpact,
    PopulationDisplacement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    View(View),
    NotFound(String),
}

impl View {
    pub const ALL: [View; 4] = [
        View::GlobalOverview,
        View::RiskAssessment,
        View::InfrastructureImpact,
        View::PopulationDisplacement,
    ];

    pub fn path(self) -> &'static str {
        match self {
            View::GlobalOverview => "/global-disaster-overview",
            View::RiskAssessment => "/risk-assessment-hub",
            View::InfrastructureImpact => "/infrastructure-impact",
            View::PopulationDisplacement => "/population-displacement",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::GlobalOverview => "Global Disaster Overview",
            View::RiskAssessment => "Risk Assessment Hub",
            View::InfrastructureImpact => "Infrastructure Impact",
            View::PopulationDisplacement => "Population Displacement",
        }
    }

    pub fn index(self) -> usize {
        View::ALL
            .iter()
            .position(|view| *view == self)
            .unwrap_or_default()
    }

    pub fn from_index(index: usize) -> Option<View> {
        View::ALL.get(index).copied()
    }
}

/// Resolves a client-side path (optionally hash-prefixed, with or without
/// query string) to a view.
pub fn resolve(path: &str) -> Route {
    let trimmed = path.trim();
    let without_hash = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let without_query = without_hash
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let normalized = without_query.trim_end_matches('/');

    if normalized.is_empty() {
        return Route::View(View::GlobalOverview);
    }

    View::ALL
        .into_iter()
        .find(|view| view.path() == normalized)
        .map(Route::View)
        .unwrap_or_else(|| Route::NotFound(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_maps_to_overview() {
        assert_eq!(resolve("/"), Route::View(View::GlobalOverview));
        assert_eq!(resolve(""), Route::View(View::GlobalOverview));
        assert_eq!(resolve("#/"), Route::View(View::GlobalOverview));
    }

    #[test]
    fn every_view_resolves_from_its_path() {
        for view in View::ALL {
            assert_eq!(resolve(view.path()), Route::View(view));
            assert_eq!(resolve(&format!("#{}/", view.path())), Route::View(view));
        }
    }

    #[test]
    fn ignores_query_string() {
        assert_eq!(
            resolve("/risk-assessment-hub?hazard=flood"),
            Route::View(View::RiskAssessment)
        );
    }

    #[test]
    fn unknown_paths_are_not_found() {
        assert_eq!(
            resolve("/settings"),
            Route::NotFound("/settings".to_string())
        );
    }

    #[test]
    fn index_round_trips() {
        for view in View::ALL {
            assert_eq!(View::from_index(view.index()), Some(view));
        }
        assert_eq!(View::from_index(9), None);
    }
}
